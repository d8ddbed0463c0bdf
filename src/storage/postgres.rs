use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel::PgConnection;
use tracing::instrument;

use super::Storage;
use crate::error::{PortalError, PortalResult};
use crate::models::{
    Appointment, AppointmentChanges, AppointmentId, Doctor, DoctorChanges, DoctorId,
    HealthMetric, MedicalRecord, MedicalRecordId, Message, MessageId, NewAccount,
    NewAppointment, NewDoctor, NewHealthMetric, NewMedicalRecord, NewMessage, NewPatient,
    Patient, PatientChanges, PatientId, Profile, ProfileSeed, Role, User, UserAccount, UserId,
};
use crate::schema::{
    appointments, doctors, health_metrics, medical_records, messages, patients, users,
};

// Database connection pool type
pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub struct PgStorage {
    pool: DbPool,
}

impl PgStorage {
    pub fn connect(database_url: &str, max_size: u32) -> PortalResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = r2d2::Pool::builder()
            .max_size(max_size)
            .build(manager)
            .map_err(|e| PortalError::Storage(format!("Failed to create pool: {}", e)))?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: DbPool) -> Self {
        Self { pool }
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut PgConnection) -> PortalResult<T>,
    ) -> PortalResult<T> {
        let mut conn = self.pool.get().map_err(|e| {
            PortalError::Storage(format!("couldn't get db connection from pool: {}", e))
        })?;
        f(&mut conn)
    }
}

// Profiles may only hang off a user of the matching role; the schema cannot
// express that, so it is checked inside the inserting transaction.
fn ensure_role(conn: &mut PgConnection, user_id: UserId, expected: Role) -> PortalResult<()> {
    let role = users::table
        .find(user_id)
        .select(users::role)
        .first::<Role>(conn)
        .optional()?;
    match role {
        Some(role) if role == expected => Ok(()),
        Some(role) => Err(PortalError::ConstraintViolation(format!(
            "user {} has role {}, expected {}",
            user_id, role, expected
        ))),
        None => Err(PortalError::ConstraintViolation(format!(
            "user {} does not exist",
            user_id
        ))),
    }
}

fn insert_patient(conn: &mut PgConnection, patient: &Patient) -> PortalResult<Patient> {
    Ok(diesel::insert_into(patients::table)
        .values(patient)
        .returning(Patient::as_returning())
        .get_result(conn)?)
}

fn insert_doctor(conn: &mut PgConnection, doctor: &Doctor) -> PortalResult<Doctor> {
    Ok(diesel::insert_into(doctors::table)
        .values(doctor)
        .returning(Doctor::as_returning())
        .get_result(conn)?)
}

impl Storage for PgStorage {
    #[instrument(level = "debug", skip(self))]
    fn get_user(&self, id: UserId) -> PortalResult<Option<User>> {
        self.with_conn(|conn| {
            Ok(users::table
                .find(id)
                .select(User::as_select())
                .first(conn)
                .optional()?)
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn get_account_by_email(&self, email: &str) -> PortalResult<Option<UserAccount>> {
        self.with_conn(|conn| {
            Ok(users::table
                .filter(users::email.eq(email))
                .select(UserAccount::as_select())
                .first(conn)
                .optional()?)
        })
    }

    #[instrument(level = "debug", skip(self, account), fields(email = %account.email))]
    fn create_user(&self, account: NewAccount) -> PortalResult<User> {
        let account = account.into_record();
        self.with_conn(|conn| {
            Ok(diesel::insert_into(users::table)
                .values(&account)
                .returning(User::as_returning())
                .get_result(conn)?)
        })
    }

    #[instrument(level = "debug", skip(self, account), fields(email = %account.email))]
    fn create_user_with_profile(
        &self,
        account: NewAccount,
        profile: ProfileSeed,
    ) -> PortalResult<(User, Profile)> {
        if profile.role() != account.role {
            return Err(PortalError::ConstraintViolation(format!(
                "{} profile cannot belong to a {} account",
                profile.role(),
                account.role
            )));
        }
        let account = account.into_record();
        self.with_conn(|conn| {
            conn.transaction::<_, PortalError, _>(|conn| {
                let user = diesel::insert_into(users::table)
                    .values(&account)
                    .returning(User::as_returning())
                    .get_result::<User>(conn)?;
                let profile = match profile.into_record(user.id) {
                    Profile::Patient(patient) => Profile::Patient(insert_patient(conn, &patient)?),
                    Profile::Doctor(doctor) => Profile::Doctor(insert_doctor(conn, &doctor)?),
                };
                Ok((user, profile))
            })
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn get_patient(&self, id: PatientId) -> PortalResult<Option<Patient>> {
        self.with_conn(|conn| {
            Ok(patients::table
                .find(id)
                .select(Patient::as_select())
                .first(conn)
                .optional()?)
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn get_patient_by_user(&self, user_id: UserId) -> PortalResult<Option<Patient>> {
        self.with_conn(|conn| {
            Ok(patients::table
                .filter(patients::user_id.eq(user_id))
                .select(Patient::as_select())
                .first(conn)
                .optional()?)
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn create_patient(&self, patient: NewPatient) -> PortalResult<Patient> {
        let patient = patient.into_record();
        self.with_conn(|conn| {
            conn.transaction::<_, PortalError, _>(|conn| {
                ensure_role(conn, patient.user_id, Role::Patient)?;
                insert_patient(conn, &patient)
            })
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn update_patient(
        &self,
        id: PatientId,
        changes: PatientChanges,
    ) -> PortalResult<Option<Patient>> {
        if changes.is_empty() {
            return self.get_patient(id);
        }
        self.with_conn(|conn| {
            Ok(diesel::update(patients::table.find(id))
                .set(&changes)
                .returning(Patient::as_returning())
                .get_result(conn)
                .optional()?)
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn get_doctor(&self, id: DoctorId) -> PortalResult<Option<Doctor>> {
        self.with_conn(|conn| {
            Ok(doctors::table
                .find(id)
                .select(Doctor::as_select())
                .first(conn)
                .optional()?)
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn get_doctor_by_user(&self, user_id: UserId) -> PortalResult<Option<Doctor>> {
        self.with_conn(|conn| {
            Ok(doctors::table
                .filter(doctors::user_id.eq(user_id))
                .select(Doctor::as_select())
                .first(conn)
                .optional()?)
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn list_doctors(&self) -> PortalResult<Vec<Doctor>> {
        self.with_conn(|conn| {
            Ok(doctors::table
                .order(doctors::created_at.asc())
                .select(Doctor::as_select())
                .load(conn)?)
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn create_doctor(&self, doctor: NewDoctor) -> PortalResult<Doctor> {
        let doctor = doctor.into_record();
        self.with_conn(|conn| {
            conn.transaction::<_, PortalError, _>(|conn| {
                ensure_role(conn, doctor.user_id, Role::Doctor)?;
                insert_doctor(conn, &doctor)
            })
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn update_doctor(
        &self,
        id: DoctorId,
        changes: DoctorChanges,
    ) -> PortalResult<Option<Doctor>> {
        if changes.is_empty() {
            return self.get_doctor(id);
        }
        self.with_conn(|conn| {
            Ok(diesel::update(doctors::table.find(id))
                .set(&changes)
                .returning(Doctor::as_returning())
                .get_result(conn)
                .optional()?)
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn get_appointment(&self, id: AppointmentId) -> PortalResult<Option<Appointment>> {
        self.with_conn(|conn| {
            Ok(appointments::table
                .find(id)
                .select(Appointment::as_select())
                .first(conn)
                .optional()?)
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn list_appointments_for_patient(
        &self,
        patient_id: PatientId,
    ) -> PortalResult<Vec<Appointment>> {
        self.with_conn(|conn| {
            Ok(appointments::table
                .filter(appointments::patient_id.eq(patient_id))
                .order((
                    appointments::appointment_date.desc(),
                    appointments::created_at.desc(),
                ))
                .select(Appointment::as_select())
                .load(conn)?)
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn list_appointments_for_doctor(&self, doctor_id: DoctorId) -> PortalResult<Vec<Appointment>> {
        self.with_conn(|conn| {
            Ok(appointments::table
                .filter(appointments::doctor_id.eq(doctor_id))
                .order((
                    appointments::appointment_date.desc(),
                    appointments::created_at.desc(),
                ))
                .select(Appointment::as_select())
                .load(conn)?)
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn create_appointment(&self, appointment: NewAppointment) -> PortalResult<Appointment> {
        let appointment = appointment.into_record();
        self.with_conn(|conn| {
            Ok(diesel::insert_into(appointments::table)
                .values(&appointment)
                .returning(Appointment::as_returning())
                .get_result(conn)?)
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn update_appointment(
        &self,
        id: AppointmentId,
        changes: AppointmentChanges,
    ) -> PortalResult<Option<Appointment>> {
        self.with_conn(|conn| {
            conn.transaction::<_, PortalError, _>(|conn| {
                let current = appointments::table
                    .find(id)
                    .select(Appointment::as_select())
                    .for_update()
                    .first::<Appointment>(conn)
                    .optional()?;
                let Some(current) = current else {
                    return Ok(None);
                };
                if let Some(next) = changes.status {
                    if !current.status.can_become(next) {
                        return Err(PortalError::InvalidTransition {
                            from: current.status,
                            to: next,
                        });
                    }
                }
                if changes.is_empty() {
                    return Ok(Some(current));
                }
                let updated = diesel::update(appointments::table.find(id))
                    .set(&changes)
                    .returning(Appointment::as_returning())
                    .get_result(conn)?;
                Ok(Some(updated))
            })
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn delete_appointment(&self, id: AppointmentId) -> PortalResult<()> {
        self.with_conn(|conn| {
            diesel::delete(appointments::table.find(id)).execute(conn)?;
            Ok(())
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn list_health_metrics(&self, patient_id: PatientId) -> PortalResult<Vec<HealthMetric>> {
        self.with_conn(|conn| {
            Ok(health_metrics::table
                .filter(health_metrics::patient_id.eq(patient_id))
                .order(health_metrics::recorded_at.desc())
                .select(HealthMetric::as_select())
                .load(conn)?)
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn create_health_metric(&self, metric: NewHealthMetric) -> PortalResult<HealthMetric> {
        let metric = metric.into_record();
        self.with_conn(|conn| {
            Ok(diesel::insert_into(health_metrics::table)
                .values(&metric)
                .returning(HealthMetric::as_returning())
                .get_result(conn)?)
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn get_medical_record(&self, id: MedicalRecordId) -> PortalResult<Option<MedicalRecord>> {
        self.with_conn(|conn| {
            Ok(medical_records::table
                .find(id)
                .select(MedicalRecord::as_select())
                .first(conn)
                .optional()?)
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn list_medical_records(&self, patient_id: PatientId) -> PortalResult<Vec<MedicalRecord>> {
        self.with_conn(|conn| {
            Ok(medical_records::table
                .filter(medical_records::patient_id.eq(patient_id))
                .order(medical_records::created_at.desc())
                .select(MedicalRecord::as_select())
                .load(conn)?)
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn create_medical_record(&self, record: NewMedicalRecord) -> PortalResult<MedicalRecord> {
        let record = record.into_record();
        self.with_conn(|conn| {
            Ok(diesel::insert_into(medical_records::table)
                .values(&record)
                .returning(MedicalRecord::as_returning())
                .get_result(conn)?)
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn delete_medical_record(&self, id: MedicalRecordId) -> PortalResult<()> {
        self.with_conn(|conn| {
            diesel::delete(medical_records::table.find(id)).execute(conn)?;
            Ok(())
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn list_conversation(&self, a: UserId, b: UserId) -> PortalResult<Vec<Message>> {
        self.with_conn(|conn| {
            Ok(messages::table
                .filter(
                    messages::sender_id
                        .eq(a)
                        .and(messages::receiver_id.eq(b))
                        .or(messages::sender_id.eq(b).and(messages::receiver_id.eq(a))),
                )
                .order((messages::created_at.asc(), messages::seq.asc()))
                .select(Message::as_select())
                .load(conn)?)
        })
    }

    #[instrument(level = "debug", skip(self, message), fields(sender = %message.sender_id))]
    fn create_message(&self, message: NewMessage) -> PortalResult<Message> {
        let message = message.into_record();
        self.with_conn(|conn| {
            Ok(diesel::insert_into(messages::table)
                .values(&message)
                .returning(Message::as_returning())
                .get_result(conn)?)
        })
    }

    #[instrument(level = "debug", skip(self))]
    fn mark_message_read(&self, id: MessageId) -> PortalResult<()> {
        self.with_conn(|conn| {
            diesel::update(messages::table.find(id))
                .set(messages::read.eq(true))
                .execute(conn)?;
            Ok(())
        })
    }
}
