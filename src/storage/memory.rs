use std::sync::{Mutex, MutexGuard};

use tracing::instrument;

use super::Storage;
use crate::error::{PortalError, PortalResult};
use crate::models::{
    Appointment, AppointmentChanges, AppointmentId, Doctor, DoctorChanges, DoctorId,
    HealthMetric, MedicalRecord, MedicalRecordId, Message, MessageId, NewAccount,
    NewAppointment, NewDoctor, NewHealthMetric, NewMedicalRecord, NewMessage, NewPatient,
    Patient, PatientChanges, PatientId, Profile, ProfileSeed, Role, User, UserAccount, UserId,
};

/// In-process backend with the same constraints as the SQL schema: foreign
/// keys, unique email, one profile per user. Rows are kept in insertion order.
#[derive(Default)]
pub struct MemStorage {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: Vec<UserAccount>,
    patients: Vec<Patient>,
    doctors: Vec<Doctor>,
    appointments: Vec<Appointment>,
    health_metrics: Vec<HealthMetric>,
    medical_records: Vec<MedicalRecord>,
    messages: Vec<Message>,
}

fn violation(msg: String) -> PortalError {
    PortalError::ConstraintViolation(msg)
}

impl Tables {
    fn check_account(&self, account: &UserAccount) -> PortalResult<()> {
        if self.users.iter().any(|u| u.email == account.email) {
            return Err(PortalError::DuplicateEmail);
        }
        Ok(())
    }

    fn require_user(&self, id: UserId) -> PortalResult<&UserAccount> {
        self.users
            .iter()
            .find(|u| u.id == id)
            .ok_or_else(|| violation(format!("user {} does not exist", id)))
    }

    fn require_role(&self, id: UserId, expected: Role) -> PortalResult<()> {
        let user = self.require_user(id)?;
        if user.role != expected {
            return Err(violation(format!(
                "user {} has role {}, expected {}",
                id, user.role, expected
            )));
        }
        Ok(())
    }

    fn require_patient(&self, id: PatientId) -> PortalResult<()> {
        if self.patients.iter().any(|p| p.id == id) {
            Ok(())
        } else {
            Err(violation(format!("patient {} does not exist", id)))
        }
    }

    fn require_doctor(&self, id: DoctorId) -> PortalResult<()> {
        if self.doctors.iter().any(|d| d.id == id) {
            Ok(())
        } else {
            Err(violation(format!("doctor {} does not exist", id)))
        }
    }

    fn check_patient(&self, patient: &Patient) -> PortalResult<()> {
        self.require_role(patient.user_id, Role::Patient)?;
        if self.patients.iter().any(|p| p.user_id == patient.user_id) {
            return Err(violation(format!(
                "user {} already has a patient profile",
                patient.user_id
            )));
        }
        Ok(())
    }

    fn check_doctor(&self, doctor: &Doctor) -> PortalResult<()> {
        self.require_role(doctor.user_id, Role::Doctor)?;
        if self.doctors.iter().any(|d| d.user_id == doctor.user_id) {
            return Err(violation(format!(
                "user {} already has a doctor profile",
                doctor.user_id
            )));
        }
        Ok(())
    }
}

// Stable sort over the reversed insertion order so equal keys come out
// most-recently-inserted first.
fn newest_first<T: Clone, K: Ord>(rows: &[T], key: impl Fn(&T) -> K) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().rev().cloned().collect();
    out.sort_by(|a, b| key(b).cmp(&key(a)));
    out
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PortalResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| PortalError::Storage("in-memory store lock poisoned".into()))
    }
}

impl Storage for MemStorage {
    fn get_user(&self, id: UserId) -> PortalResult<Option<User>> {
        let tables = self.lock()?;
        Ok(tables.users.iter().find(|u| u.id == id).map(UserAccount::public))
    }

    fn get_account_by_email(&self, email: &str) -> PortalResult<Option<UserAccount>> {
        let tables = self.lock()?;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    #[instrument(level = "debug", skip(self, account), fields(email = %account.email))]
    fn create_user(&self, account: NewAccount) -> PortalResult<User> {
        let account = account.into_record();
        let mut tables = self.lock()?;
        tables.check_account(&account)?;
        let user = account.public();
        tables.users.push(account);
        Ok(user)
    }

    #[instrument(level = "debug", skip(self, account), fields(email = %account.email))]
    fn create_user_with_profile(
        &self,
        account: NewAccount,
        profile: ProfileSeed,
    ) -> PortalResult<(User, Profile)> {
        if profile.role() != account.role {
            return Err(violation(format!(
                "{} profile cannot belong to a {} account",
                profile.role(),
                account.role
            )));
        }
        let account = account.into_record();
        let profile = profile.into_record(account.id);

        // The user id is fresh, so once the email is free the profile row
        // cannot collide with anything.
        let mut tables = self.lock()?;
        tables.check_account(&account)?;
        let user = account.public();
        tables.users.push(account);
        match &profile {
            Profile::Patient(patient) => tables.patients.push(patient.clone()),
            Profile::Doctor(doctor) => tables.doctors.push(doctor.clone()),
        }
        Ok((user, profile))
    }

    fn get_patient(&self, id: PatientId) -> PortalResult<Option<Patient>> {
        let tables = self.lock()?;
        Ok(tables.patients.iter().find(|p| p.id == id).cloned())
    }

    fn get_patient_by_user(&self, user_id: UserId) -> PortalResult<Option<Patient>> {
        let tables = self.lock()?;
        Ok(tables.patients.iter().find(|p| p.user_id == user_id).cloned())
    }

    #[instrument(level = "debug", skip(self))]
    fn create_patient(&self, patient: NewPatient) -> PortalResult<Patient> {
        let patient = patient.into_record();
        let mut tables = self.lock()?;
        tables.check_patient(&patient)?;
        tables.patients.push(patient.clone());
        Ok(patient)
    }

    #[instrument(level = "debug", skip(self))]
    fn update_patient(
        &self,
        id: PatientId,
        changes: PatientChanges,
    ) -> PortalResult<Option<Patient>> {
        let mut tables = self.lock()?;
        Ok(tables.patients.iter_mut().find(|p| p.id == id).map(|patient| {
            changes.apply_to(patient);
            patient.clone()
        }))
    }

    fn get_doctor(&self, id: DoctorId) -> PortalResult<Option<Doctor>> {
        let tables = self.lock()?;
        Ok(tables.doctors.iter().find(|d| d.id == id).cloned())
    }

    fn get_doctor_by_user(&self, user_id: UserId) -> PortalResult<Option<Doctor>> {
        let tables = self.lock()?;
        Ok(tables.doctors.iter().find(|d| d.user_id == user_id).cloned())
    }

    fn list_doctors(&self) -> PortalResult<Vec<Doctor>> {
        let tables = self.lock()?;
        let mut doctors = tables.doctors.clone();
        doctors.sort_by_key(|d| d.created_at);
        Ok(doctors)
    }

    #[instrument(level = "debug", skip(self))]
    fn create_doctor(&self, doctor: NewDoctor) -> PortalResult<Doctor> {
        let doctor = doctor.into_record();
        let mut tables = self.lock()?;
        tables.check_doctor(&doctor)?;
        tables.doctors.push(doctor.clone());
        Ok(doctor)
    }

    #[instrument(level = "debug", skip(self))]
    fn update_doctor(
        &self,
        id: DoctorId,
        changes: DoctorChanges,
    ) -> PortalResult<Option<Doctor>> {
        let mut tables = self.lock()?;
        Ok(tables.doctors.iter_mut().find(|d| d.id == id).map(|doctor| {
            changes.apply_to(doctor);
            doctor.clone()
        }))
    }

    fn get_appointment(&self, id: AppointmentId) -> PortalResult<Option<Appointment>> {
        let tables = self.lock()?;
        Ok(tables.appointments.iter().find(|a| a.id == id).cloned())
    }

    fn list_appointments_for_patient(
        &self,
        patient_id: PatientId,
    ) -> PortalResult<Vec<Appointment>> {
        let tables = self.lock()?;
        let rows: Vec<_> = tables
            .appointments
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect();
        Ok(newest_first(&rows, |a| a.appointment_date))
    }

    fn list_appointments_for_doctor(&self, doctor_id: DoctorId) -> PortalResult<Vec<Appointment>> {
        let tables = self.lock()?;
        let rows: Vec<_> = tables
            .appointments
            .iter()
            .filter(|a| a.doctor_id == doctor_id)
            .cloned()
            .collect();
        Ok(newest_first(&rows, |a| a.appointment_date))
    }

    #[instrument(level = "debug", skip(self))]
    fn create_appointment(&self, appointment: NewAppointment) -> PortalResult<Appointment> {
        let appointment = appointment.into_record();
        let mut tables = self.lock()?;
        tables.require_patient(appointment.patient_id)?;
        tables.require_doctor(appointment.doctor_id)?;
        tables.appointments.push(appointment.clone());
        Ok(appointment)
    }

    #[instrument(level = "debug", skip(self))]
    fn update_appointment(
        &self,
        id: AppointmentId,
        changes: AppointmentChanges,
    ) -> PortalResult<Option<Appointment>> {
        let mut tables = self.lock()?;
        let Some(appointment) = tables.appointments.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        if let Some(next) = changes.status {
            if !appointment.status.can_become(next) {
                return Err(PortalError::InvalidTransition {
                    from: appointment.status,
                    to: next,
                });
            }
        }
        changes.apply_to(appointment);
        Ok(Some(appointment.clone()))
    }

    #[instrument(level = "debug", skip(self))]
    fn delete_appointment(&self, id: AppointmentId) -> PortalResult<()> {
        self.lock()?.appointments.retain(|a| a.id != id);
        Ok(())
    }

    fn list_health_metrics(&self, patient_id: PatientId) -> PortalResult<Vec<HealthMetric>> {
        let tables = self.lock()?;
        let rows: Vec<_> = tables
            .health_metrics
            .iter()
            .filter(|m| m.patient_id == patient_id)
            .cloned()
            .collect();
        Ok(newest_first(&rows, |m| m.recorded_at))
    }

    #[instrument(level = "debug", skip(self))]
    fn create_health_metric(&self, metric: NewHealthMetric) -> PortalResult<HealthMetric> {
        let metric = metric.into_record();
        let mut tables = self.lock()?;
        tables.require_patient(metric.patient_id)?;
        tables.health_metrics.push(metric.clone());
        Ok(metric)
    }

    fn get_medical_record(&self, id: MedicalRecordId) -> PortalResult<Option<MedicalRecord>> {
        let tables = self.lock()?;
        Ok(tables.medical_records.iter().find(|r| r.id == id).cloned())
    }

    fn list_medical_records(&self, patient_id: PatientId) -> PortalResult<Vec<MedicalRecord>> {
        let tables = self.lock()?;
        let rows: Vec<_> = tables
            .medical_records
            .iter()
            .filter(|r| r.patient_id == patient_id)
            .cloned()
            .collect();
        Ok(newest_first(&rows, |r| r.created_at))
    }

    #[instrument(level = "debug", skip(self))]
    fn create_medical_record(&self, record: NewMedicalRecord) -> PortalResult<MedicalRecord> {
        let record = record.into_record();
        let mut tables = self.lock()?;
        tables.require_patient(record.patient_id)?;
        if let Some(doctor_id) = record.doctor_id {
            tables.require_doctor(doctor_id)?;
        }
        tables.medical_records.push(record.clone());
        Ok(record)
    }

    #[instrument(level = "debug", skip(self))]
    fn delete_medical_record(&self, id: MedicalRecordId) -> PortalResult<()> {
        self.lock()?.medical_records.retain(|r| r.id != id);
        Ok(())
    }

    fn list_conversation(&self, a: UserId, b: UserId) -> PortalResult<Vec<Message>> {
        let tables = self.lock()?;
        let mut rows: Vec<_> = tables
            .messages
            .iter()
            .filter(|m| m.between(a, b))
            .cloned()
            .collect();
        // Stable, so equal timestamps stay in insertion order like `messages.seq`.
        rows.sort_by_key(|m| m.created_at);
        Ok(rows)
    }

    #[instrument(level = "debug", skip(self, message), fields(sender = %message.sender_id))]
    fn create_message(&self, message: NewMessage) -> PortalResult<Message> {
        let message = message.into_record();
        let mut tables = self.lock()?;
        tables.require_user(message.sender_id)?;
        tables.require_user(message.receiver_id)?;
        tables.messages.push(message.clone());
        Ok(message)
    }

    #[instrument(level = "debug", skip(self))]
    fn mark_message_read(&self, id: MessageId) -> PortalResult<()> {
        let mut tables = self.lock()?;
        if let Some(message) = tables.messages.iter_mut().find(|m| m.id == id) {
            message.read = true;
        }
        Ok(())
    }
}
