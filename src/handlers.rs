use actix_web::{web, HttpResponse, Responder};
use serde_json::{json, Value};

use crate::auth;
use crate::crypto::CredentialHasher;
use crate::error::{PortalError, PortalResult};
use crate::models::{AppointmentId, DoctorId, MedicalRecordId, MessageId, PatientId, UserId};
use crate::storage::Storage;
use crate::validation;

type Store = web::Data<dyn Storage>;
type Body = web::Json<Value>;

// Runs blocking storage work off the async workers.
async fn blocking<T, F>(f: F) -> PortalResult<T>
where
    F: FnOnce() -> PortalResult<T> + Send + 'static,
    T: Send + 'static,
{
    web::block(f)
        .await
        .map_err(|e| PortalError::Internal(format!("blocking task failed: {}", e)))?
}

fn success() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true }))
}

pub async fn hello() -> impl Responder {
    HttpResponse::Ok().body("Hello, MedPortal!")
}

// Handler to register a user together with its patient or doctor profile
pub async fn register(
    storage: Store,
    hasher: web::Data<CredentialHasher>,
    body: Body,
) -> Result<HttpResponse, PortalError> {
    let registration = validation::registration(&body)?;
    let user = blocking(move || auth::register_user(storage.get_ref(), &hasher, registration)).await?;
    Ok(HttpResponse::Ok().json(json!({ "user": user })))
}

// Handler to log in; answers with the user and its profile
pub async fn login(
    storage: Store,
    hasher: web::Data<CredentialHasher>,
    body: Body,
) -> Result<HttpResponse, PortalError> {
    let credentials = validation::credentials(&body)?;
    let (user, profile) =
        blocking(move || auth::authenticate_user(storage.get_ref(), &hasher, credentials)).await?;
    Ok(HttpResponse::Ok().json(json!({ "user": user, "profile": profile })))
}

// Handler to get a user by ID
pub async fn get_user(storage: Store, id: web::Path<UserId>) -> Result<HttpResponse, PortalError> {
    let id = id.into_inner();
    let user = blocking(move || storage.get_user(id)).await?;
    let user = user.ok_or(PortalError::NotFound("user"))?;
    Ok(HttpResponse::Ok().json(user))
}

// Handler to get the patient profile owned by a user
pub async fn get_patient_by_user(
    storage: Store,
    user_id: web::Path<UserId>,
) -> Result<HttpResponse, PortalError> {
    let user_id = user_id.into_inner();
    let patient = blocking(move || storage.get_patient_by_user(user_id)).await?;
    let patient = patient.ok_or(PortalError::NotFound("patient"))?;
    Ok(HttpResponse::Ok().json(patient))
}

// Handler to update a patient profile
pub async fn update_patient(
    storage: Store,
    id: web::Path<PatientId>,
    body: Body,
) -> Result<HttpResponse, PortalError> {
    let changes = validation::patient_changes(&body)?;
    let id = id.into_inner();
    let patient = blocking(move || storage.update_patient(id, changes)).await?;
    let patient = patient.ok_or(PortalError::NotFound("patient"))?;
    Ok(HttpResponse::Ok().json(patient))
}

// Handler to list every doctor
pub async fn list_doctors(storage: Store) -> Result<HttpResponse, PortalError> {
    let doctors = blocking(move || storage.list_doctors()).await?;
    Ok(HttpResponse::Ok().json(doctors))
}

// Handler to get the doctor profile owned by a user
pub async fn get_doctor_by_user(
    storage: Store,
    user_id: web::Path<UserId>,
) -> Result<HttpResponse, PortalError> {
    let user_id = user_id.into_inner();
    let doctor = blocking(move || storage.get_doctor_by_user(user_id)).await?;
    let doctor = doctor.ok_or(PortalError::NotFound("doctor"))?;
    Ok(HttpResponse::Ok().json(doctor))
}

// Handler to update a doctor profile
pub async fn update_doctor(
    storage: Store,
    id: web::Path<DoctorId>,
    body: Body,
) -> Result<HttpResponse, PortalError> {
    let changes = validation::doctor_changes(&body)?;
    let id = id.into_inner();
    let doctor = blocking(move || storage.update_doctor(id, changes)).await?;
    let doctor = doctor.ok_or(PortalError::NotFound("doctor"))?;
    Ok(HttpResponse::Ok().json(doctor))
}

// Handler to list a patient's appointments, latest first
pub async fn appointments_for_patient(
    storage: Store,
    patient_id: web::Path<PatientId>,
) -> Result<HttpResponse, PortalError> {
    let patient_id = patient_id.into_inner();
    let appointments = blocking(move || storage.list_appointments_for_patient(patient_id)).await?;
    Ok(HttpResponse::Ok().json(appointments))
}

// Handler to list a doctor's appointments, latest first
pub async fn appointments_for_doctor(
    storage: Store,
    doctor_id: web::Path<DoctorId>,
) -> Result<HttpResponse, PortalError> {
    let doctor_id = doctor_id.into_inner();
    let appointments = blocking(move || storage.list_appointments_for_doctor(doctor_id)).await?;
    Ok(HttpResponse::Ok().json(appointments))
}

// Handler to book an appointment
pub async fn create_appointment(storage: Store, body: Body) -> Result<HttpResponse, PortalError> {
    let appointment = validation::new_appointment(&body)?;
    let appointment = blocking(move || storage.create_appointment(appointment)).await?;
    Ok(HttpResponse::Ok().json(appointment))
}

// Handler to get an appointment by ID
pub async fn get_appointment(
    storage: Store,
    id: web::Path<AppointmentId>,
) -> Result<HttpResponse, PortalError> {
    let id = id.into_inner();
    let appointment = blocking(move || storage.get_appointment(id)).await?;
    let appointment = appointment.ok_or(PortalError::NotFound("appointment"))?;
    Ok(HttpResponse::Ok().json(appointment))
}

// Handler to reschedule, annotate or change the status of an appointment
pub async fn update_appointment(
    storage: Store,
    id: web::Path<AppointmentId>,
    body: Body,
) -> Result<HttpResponse, PortalError> {
    let changes = validation::appointment_changes(&body)?;
    let id = id.into_inner();
    let appointment = blocking(move || storage.update_appointment(id, changes)).await?;
    let appointment = appointment.ok_or(PortalError::NotFound("appointment"))?;
    Ok(HttpResponse::Ok().json(appointment))
}

// Handler to delete an appointment
pub async fn delete_appointment(
    storage: Store,
    id: web::Path<AppointmentId>,
) -> Result<HttpResponse, PortalError> {
    let id = id.into_inner();
    blocking(move || storage.delete_appointment(id)).await?;
    Ok(success())
}

// Handler to list a patient's health metrics, latest first
pub async fn health_metrics_for_patient(
    storage: Store,
    patient_id: web::Path<PatientId>,
) -> Result<HttpResponse, PortalError> {
    let patient_id = patient_id.into_inner();
    let metrics = blocking(move || storage.list_health_metrics(patient_id)).await?;
    Ok(HttpResponse::Ok().json(metrics))
}

// Handler to record a health metric
pub async fn create_health_metric(storage: Store, body: Body) -> Result<HttpResponse, PortalError> {
    let metric = validation::new_health_metric(&body)?;
    let metric = blocking(move || storage.create_health_metric(metric)).await?;
    Ok(HttpResponse::Ok().json(metric))
}

// Same as create_health_metric, with the patient taken from the path
pub async fn create_health_metric_for_patient(
    storage: Store,
    patient_id: web::Path<PatientId>,
    body: Body,
) -> Result<HttpResponse, PortalError> {
    let body = validation::with_path_id(body.into_inner(), "patientId", patient_id.into_inner())?;
    let metric = validation::new_health_metric(&body)?;
    let metric = blocking(move || storage.create_health_metric(metric)).await?;
    Ok(HttpResponse::Ok().json(metric))
}

// Handler to list a patient's medical records, latest first
pub async fn medical_records_for_patient(
    storage: Store,
    patient_id: web::Path<PatientId>,
) -> Result<HttpResponse, PortalError> {
    let patient_id = patient_id.into_inner();
    let records = blocking(move || storage.list_medical_records(patient_id)).await?;
    Ok(HttpResponse::Ok().json(records))
}

// Handler to file a medical record
pub async fn create_medical_record(storage: Store, body: Body) -> Result<HttpResponse, PortalError> {
    let record = validation::new_medical_record(&body)?;
    let record = blocking(move || storage.create_medical_record(record)).await?;
    Ok(HttpResponse::Ok().json(record))
}

pub async fn create_medical_record_for_patient(
    storage: Store,
    patient_id: web::Path<PatientId>,
    body: Body,
) -> Result<HttpResponse, PortalError> {
    let body = validation::with_path_id(body.into_inner(), "patientId", patient_id.into_inner())?;
    let record = validation::new_medical_record(&body)?;
    let record = blocking(move || storage.create_medical_record(record)).await?;
    Ok(HttpResponse::Ok().json(record))
}

// Handler to delete a medical record
pub async fn delete_medical_record(
    storage: Store,
    id: web::Path<MedicalRecordId>,
) -> Result<HttpResponse, PortalError> {
    let id = id.into_inner();
    blocking(move || storage.delete_medical_record(id)).await?;
    Ok(success())
}

// Handler to get the conversation between two users, oldest first
pub async fn conversation(
    storage: Store,
    pair: web::Path<(UserId, UserId)>,
) -> Result<HttpResponse, PortalError> {
    let (a, b) = pair.into_inner();
    let messages = blocking(move || storage.list_conversation(a, b)).await?;
    Ok(HttpResponse::Ok().json(messages))
}

// Handler to send a message
pub async fn send_message(storage: Store, body: Body) -> Result<HttpResponse, PortalError> {
    let message = validation::new_message(&body)?;
    let message = blocking(move || storage.create_message(message)).await?;
    Ok(HttpResponse::Ok().json(message))
}

// Handler to mark a message as read
pub async fn mark_message_read(
    storage: Store,
    id: web::Path<MessageId>,
) -> Result<HttpResponse, PortalError> {
    let id = id.into_inner();
    blocking(move || storage.mark_message_read(id)).await?;
    Ok(success())
}
