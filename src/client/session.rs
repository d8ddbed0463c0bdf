use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::{ClientError, ClientResult};
use crate::models::{DoctorId, PatientId, Profile, Role, User};

/// The logged-in user and its role profile, kept side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub profile: Option<Profile>,
}

impl Session {
    pub fn new(user: User, profile: Option<Profile>) -> Self {
        Self { user, profile }
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    /// Patient profile id, if this session belongs to a patient with a
    /// profile. Never the user id.
    pub fn patient_id(&self) -> Option<PatientId> {
        match &self.profile {
            Some(Profile::Patient(patient)) => Some(patient.id),
            _ => None,
        }
    }

    pub fn doctor_id(&self) -> Option<DoctorId> {
        match &self.profile {
            Some(Profile::Doctor(doctor)) => Some(doctor.id),
            _ => None,
        }
    }
}

/// Where a client keeps its session between runs.
pub trait SessionStore {
    fn load(&self) -> ClientResult<Option<Session>>;
    fn save(&self, session: &Session) -> ClientResult<()>;
    fn clear(&self) -> ClientResult<()>;
}

/// Session persisted as a JSON file.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn store_error(err: impl std::fmt::Display) -> ClientError {
    ClientError::Session(err.to_string())
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> ClientResult<Option<Session>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(store_error(e)),
        };
        serde_json::from_str(&raw).map(Some).map_err(store_error)
    }

    fn save(&self, session: &Session) -> ClientResult<()> {
        let raw = serde_json::to_string_pretty(session).map_err(store_error)?;
        fs::write(&self.path, raw).map_err(store_error)
    }

    fn clear(&self) -> ClientResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(store_error(e)),
        }
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> ClientResult<Option<Session>> {
        let slot = self.slot.lock().map_err(store_error)?;
        Ok(slot.clone())
    }

    fn save(&self, session: &Session) -> ClientResult<()> {
        *self.slot.lock().map_err(store_error)? = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self.slot.lock().map_err(store_error)? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{NewPatient, UserId};

    fn patient_session() -> Session {
        let user = User {
            id: UserId::generate(),
            email: "alex@example.com".into(),
            role: Role::Patient,
            full_name: "Alex Doe".into(),
            created_at: Utc::now(),
        };
        let patient = NewPatient::for_user(user.id).into_record();
        Session::new(user, Some(Profile::Patient(patient)))
    }

    #[test]
    fn patient_id_is_the_profile_id() {
        let session = patient_session();
        let patient_id = session.patient_id().unwrap();
        assert_ne!(patient_id.as_uuid(), session.user.id.as_uuid());
        assert_eq!(session.doctor_id(), None);
    }

    #[test]
    fn no_profile_means_no_patient_id() {
        let mut session = patient_session();
        session.profile = None;
        assert_eq!(session.patient_id(), None);
    }

    #[test]
    fn file_store_round_trip_and_clear() {
        let path = std::env::temp_dir().join(format!("medportal-session-{}.json", uuid::Uuid::new_v4()));
        let store = FileSessionStore::new(&path);
        assert_eq!(store.load().unwrap(), None);

        let session = patient_session();
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session));

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn memory_store_clear_forgets() {
        let store = MemorySessionStore::new();
        store.save(&patient_session()).unwrap();
        assert!(store.load().unwrap().is_some());
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
