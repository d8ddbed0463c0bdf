//! Persistence gateway.
//!
//! `Storage` is the only way rows are read or written. Calls are blocking;
//! handlers run them on the actix blocking pool. Reads return `Ok(None)` for a
//! missing row, deletes succeed for ids that do not exist.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::PortalResult;
use crate::models::{
    Appointment, AppointmentChanges, AppointmentId, Doctor, DoctorChanges, DoctorId,
    HealthMetric, MedicalRecord, MedicalRecordId, Message, MessageId, NewAccount,
    NewAppointment, NewDoctor, NewHealthMetric, NewMedicalRecord, NewMessage, NewPatient,
    Patient, PatientChanges, PatientId, Profile, ProfileSeed, User, UserAccount, UserId,
};

mod memory;
mod postgres;

pub use memory::MemStorage;
pub use postgres::{DbPool, PgStorage};

pub trait Storage: Send + Sync {
    // users
    fn get_user(&self, id: UserId) -> PortalResult<Option<User>>;
    fn get_account_by_email(&self, email: &str) -> PortalResult<Option<UserAccount>>;
    fn create_user(&self, account: NewAccount) -> PortalResult<User>;
    /// Writes the user and its profile together; neither row survives if the
    /// other fails.
    fn create_user_with_profile(
        &self,
        account: NewAccount,
        profile: ProfileSeed,
    ) -> PortalResult<(User, Profile)>;

    // patients
    fn get_patient(&self, id: PatientId) -> PortalResult<Option<Patient>>;
    fn get_patient_by_user(&self, user_id: UserId) -> PortalResult<Option<Patient>>;
    fn create_patient(&self, patient: NewPatient) -> PortalResult<Patient>;
    fn update_patient(
        &self,
        id: PatientId,
        changes: PatientChanges,
    ) -> PortalResult<Option<Patient>>;

    // doctors
    fn get_doctor(&self, id: DoctorId) -> PortalResult<Option<Doctor>>;
    fn get_doctor_by_user(&self, user_id: UserId) -> PortalResult<Option<Doctor>>;
    fn list_doctors(&self) -> PortalResult<Vec<Doctor>>;
    fn create_doctor(&self, doctor: NewDoctor) -> PortalResult<Doctor>;
    fn update_doctor(
        &self,
        id: DoctorId,
        changes: DoctorChanges,
    ) -> PortalResult<Option<Doctor>>;

    // appointments, newest appointment date first
    fn get_appointment(&self, id: AppointmentId) -> PortalResult<Option<Appointment>>;
    fn list_appointments_for_patient(
        &self,
        patient_id: PatientId,
    ) -> PortalResult<Vec<Appointment>>;
    fn list_appointments_for_doctor(&self, doctor_id: DoctorId) -> PortalResult<Vec<Appointment>>;
    fn create_appointment(&self, appointment: NewAppointment) -> PortalResult<Appointment>;
    fn update_appointment(
        &self,
        id: AppointmentId,
        changes: AppointmentChanges,
    ) -> PortalResult<Option<Appointment>>;
    fn delete_appointment(&self, id: AppointmentId) -> PortalResult<()>;

    // health metrics, newest first, append-only
    fn list_health_metrics(&self, patient_id: PatientId) -> PortalResult<Vec<HealthMetric>>;
    fn create_health_metric(&self, metric: NewHealthMetric) -> PortalResult<HealthMetric>;

    // medical records, newest first
    fn get_medical_record(&self, id: MedicalRecordId) -> PortalResult<Option<MedicalRecord>>;
    fn list_medical_records(&self, patient_id: PatientId) -> PortalResult<Vec<MedicalRecord>>;
    fn create_medical_record(&self, record: NewMedicalRecord) -> PortalResult<MedicalRecord>;
    fn delete_medical_record(&self, id: MedicalRecordId) -> PortalResult<()>;

    // messages, oldest first, both directions of the pair
    fn list_conversation(&self, a: UserId, b: UserId) -> PortalResult<Vec<Message>>;
    fn create_message(&self, message: NewMessage) -> PortalResult<Message>;
    fn mark_message_read(&self, id: MessageId) -> PortalResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub backend: Backend,
    pub url: String,
    pub pool_size: u32,
}

/// Opens the configured backend.
pub fn connect(settings: &DatabaseSettings) -> PortalResult<Arc<dyn Storage>> {
    match settings.backend {
        Backend::Postgres => Ok(Arc::new(PgStorage::connect(
            &settings.url,
            settings.pool_size,
        )?)),
        Backend::Memory => {
            tracing::warn!("using in-memory storage; data is lost on exit");
            Ok(Arc::new(MemStorage::new()))
        }
    }
}
