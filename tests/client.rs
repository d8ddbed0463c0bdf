use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use medportal::client::{ClientError, MemorySessionStore, PortalClient, RegisterForm, SessionStore};
use medportal::models::{
    AppointmentId, AppointmentType, DoctorId, MessageId, NewAppointment, PatientId, Role, UserId,
};

const USER: &str = "7f1c2e9a-3b4d-4e5f-8a6b-9c0d1e2f3a4b";
const PATIENT: &str = "0b6f5a3e-8c1d-4f2a-9e7b-1c2d3e4f5a6b";
const DOCTOR: &str = "5d4c3b2a-1f0e-4d9c-8b7a-6f5e4d3c2b1a";
const APPOINTMENT: &str = "a1b2c3d4-e5f6-4a7b-8c9d-0e1f2a3b4c5d";

fn user_json() -> serde_json::Value {
    json!({
        "id": USER,
        "email": "alex@example.com",
        "role": "patient",
        "fullName": "Alex Doe",
        "createdAt": "2025-01-01T00:00:00Z"
    })
}

fn appointment_json(status: &str) -> serde_json::Value {
    json!({
        "id": APPOINTMENT,
        "patientId": PATIENT,
        "doctorId": DOCTOR,
        "appointmentDate": "2025-03-01T09:00:00Z",
        "type": "Check-up",
        "status": status,
        "notes": null,
        "createdAt": "2025-01-02T00:00:00Z"
    })
}

#[tokio::test]
async fn login_keeps_user_and_profile_apart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "email": "alex@example.com", "password": "secret123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": user_json(),
            "profile": {
                "id": PATIENT,
                "userId": USER,
                "dateOfBirth": "1990-05-17",
                "phone": null,
                "address": null,
                "bloodType": "O+",
                "allergies": ["penicillin"],
                "createdAt": "2025-01-01T00:00:00Z"
            }
        })))
        .mount(&server)
        .await;

    let client = PortalClient::new(server.uri());
    let session = client.login("alex@example.com", "secret123").await.unwrap();

    assert_eq!(session.user.id, USER.parse::<UserId>().unwrap());
    assert_eq!(session.patient_id(), Some(PATIENT.parse::<PatientId>().unwrap()));
    assert_eq!(session.doctor_id(), None);

    let store = MemorySessionStore::new();
    store.save(&session).unwrap();
    assert_eq!(store.load().unwrap(), Some(session));
}

#[tokio::test]
async fn failed_login_surfaces_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid credentials",
            "kind": "InvalidCredentials"
        })))
        .mount(&server)
        .await;

    let err = PortalClient::new(server.uri())
        .login("alex@example.com", "nope")
        .await
        .unwrap_err();
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "invalid credentials");
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn register_posts_camel_case_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .and(body_json(json!({
            "email": "alex@example.com",
            "password": "secret123",
            "role": "patient",
            "fullName": "Alex Doe"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": user_json() })))
        .expect(1)
        .mount(&server)
        .await;

    let user = PortalClient::new(server.uri())
        .register(&RegisterForm {
            email: "alex@example.com".into(),
            password: "secret123".into(),
            role: Role::Patient,
            full_name: "Alex Doe".into(),
            specialty: None,
            phone: None,
        })
        .await
        .unwrap();
    assert_eq!(user.full_name, "Alex Doe");
}

#[tokio::test]
async fn booking_sends_wire_spelling_of_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/appointments"))
        .and(body_json(json!({
            "patientId": PATIENT,
            "doctorId": DOCTOR,
            "appointmentDate": "2025-03-01T09:00:00Z",
            "type": "Check-up",
            "notes": null
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(appointment_json("upcoming")))
        .mount(&server)
        .await;

    let booked = PortalClient::new(server.uri())
        .book_appointment(&NewAppointment {
            patient_id: PATIENT.parse().unwrap(),
            doctor_id: DOCTOR.parse().unwrap(),
            appointment_date: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            kind: AppointmentType::CheckUp,
            status: None,
            notes: None,
        })
        .await
        .unwrap();
    assert_eq!(booked.kind, AppointmentType::CheckUp);
}

#[tokio::test]
async fn cancel_patches_only_the_status() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(format!("/api/appointments/{}", APPOINTMENT)))
        .and(body_json(json!({ "status": "cancelled" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(appointment_json("cancelled")))
        .expect(1)
        .mount(&server)
        .await;

    let cancelled = PortalClient::new(server.uri())
        .cancel_appointment(APPOINTMENT.parse::<AppointmentId>().unwrap())
        .await
        .unwrap();
    assert_eq!(cancelled.status.as_str(), "cancelled");
}

#[tokio::test]
async fn lists_use_profile_ids_in_the_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/appointments/patient/{}", PATIENT)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_json("upcoming")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/appointments/doctor/{}", DOCTOR)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = PortalClient::new(format!("{}/", server.uri()));
    let mine = client
        .appointments_for_patient(PATIENT.parse::<PatientId>().unwrap())
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    let theirs = client
        .appointments_for_doctor(DOCTOR.parse::<DoctorId>().unwrap())
        .await
        .unwrap();
    assert!(theirs.is_empty());
}

#[tokio::test]
async fn mark_read_ignores_body() {
    let server = MockServer::start().await;
    let id = MessageId::generate();
    Mock::given(method("PATCH"))
        .and(path(format!("/api/messages/{}/read", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    PortalClient::new(server.uri()).mark_read(id).await.unwrap();
}

#[tokio::test]
async fn server_errors_without_json_keep_raw_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/doctors"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = PortalClient::new(server.uri()).doctors().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Api { status: 502, ref message } if message == "bad gateway"
    ));
}
