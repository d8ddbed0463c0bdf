//! Typed HTTP client for the portal API.
//!
//! Every call is a plain request against `/api`; nothing is cached. The
//! logged-in state lives in an explicit [`Session`] value which callers keep
//! in a [`SessionStore`] of their choosing.

use std::fmt;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::models::{
    Appointment, AppointmentChanges, AppointmentId, AppointmentStatus, Doctor, DoctorId,
    HealthMetric, MedicalRecord, Message, MessageId, NewAppointment, NewHealthMetric,
    NewMessage, Patient, PatientId, Profile, Role, User, UserId,
};

mod session;

pub use session::{FileSessionStore, MemorySessionStore, Session, SessionStore};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status}: {message}")]
    Api { status: u16, message: String },

    #[error("session store failure: {0}")]
    Session(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// What the sign-up form posts.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl fmt::Debug for RegisterForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterForm")
            .field("email", &self.email)
            .field("role", &self.role)
            .field("full_name", &self.full_name)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct Registered {
    user: User,
}

#[derive(Deserialize)]
struct LoggedIn {
    user: User,
    profile: Option<Profile>,
}

#[derive(Clone)]
pub struct PortalClient {
    http: Client,
    base_url: String,
}

impl PortalClient {
    /// `base_url` is the server root, e.g. `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/api{}", self.base_url, path))
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> ClientResult<T> {
        let response = check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn register(&self, form: &RegisterForm) -> ClientResult<User> {
        let registered: Registered =
            Self::send(self.request(Method::POST, "/auth/register").json(form)).await?;
        Ok(registered.user)
    }

    /// Logs in and returns the session to keep.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Session> {
        let body = json!({ "email": email, "password": password });
        let logged_in: LoggedIn =
            Self::send(self.request(Method::POST, "/auth/login").json(&body)).await?;
        Ok(Session::new(logged_in.user, logged_in.profile))
    }

    pub async fn patient_for_user(&self, user_id: UserId) -> ClientResult<Patient> {
        Self::send(self.request(Method::GET, &format!("/patients/{}", user_id))).await
    }

    pub async fn doctors(&self) -> ClientResult<Vec<Doctor>> {
        Self::send(self.request(Method::GET, "/doctors")).await
    }

    pub async fn appointments_for_patient(
        &self,
        patient_id: PatientId,
    ) -> ClientResult<Vec<Appointment>> {
        let path = format!("/appointments/patient/{}", patient_id);
        Self::send(self.request(Method::GET, &path)).await
    }

    pub async fn appointments_for_doctor(
        &self,
        doctor_id: DoctorId,
    ) -> ClientResult<Vec<Appointment>> {
        let path = format!("/appointments/doctor/{}", doctor_id);
        Self::send(self.request(Method::GET, &path)).await
    }

    pub async fn book_appointment(&self, appointment: &NewAppointment) -> ClientResult<Appointment> {
        Self::send(self.request(Method::POST, "/appointments").json(appointment)).await
    }

    pub async fn update_appointment(
        &self,
        id: AppointmentId,
        changes: &AppointmentChanges,
    ) -> ClientResult<Appointment> {
        let path = format!("/appointments/{}", id);
        Self::send(self.request(Method::PATCH, &path).json(changes)).await
    }

    pub async fn cancel_appointment(&self, id: AppointmentId) -> ClientResult<Appointment> {
        let changes = AppointmentChanges {
            status: Some(AppointmentStatus::Cancelled),
            ..Default::default()
        };
        self.update_appointment(id, &changes).await
    }

    pub async fn health_metrics(&self, patient_id: PatientId) -> ClientResult<Vec<HealthMetric>> {
        let path = format!("/health-metrics/{}", patient_id);
        Self::send(self.request(Method::GET, &path)).await
    }

    pub async fn record_health_metric(&self, metric: &NewHealthMetric) -> ClientResult<HealthMetric> {
        Self::send(self.request(Method::POST, "/health-metrics").json(metric)).await
    }

    pub async fn medical_records(&self, patient_id: PatientId) -> ClientResult<Vec<MedicalRecord>> {
        let path = format!("/medical-records/{}", patient_id);
        Self::send(self.request(Method::GET, &path)).await
    }

    pub async fn conversation(&self, a: UserId, b: UserId) -> ClientResult<Vec<Message>> {
        let path = format!("/messages/{}/{}", a, b);
        Self::send(self.request(Method::GET, &path)).await
    }

    pub async fn send_message(&self, message: &NewMessage) -> ClientResult<Message> {
        Self::send(self.request(Method::POST, "/messages").json(message)).await
    }

    pub async fn mark_read(&self, id: MessageId) -> ClientResult<()> {
        let path = format!("/messages/{}/read", id);
        check(self.request(Method::PATCH, &path).send().await?).await?;
        Ok(())
    }
}

// Turns a non-2xx response into `ClientError::Api`, preferring the server's
// `error` message over the raw body.
async fn check(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|body| body.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(text);
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
