use serde::{Deserialize, Serialize};

use super::{Doctor, NewDoctor, NewPatient, Patient, Role, UserId};

pub const DEFAULT_SPECIALTY: &str = "General Practice";

/// The role-specific row attached 1:1 to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Profile {
    Patient(Patient),
    Doctor(Doctor),
}

impl Profile {
    pub fn role(&self) -> Role {
        match self {
            Profile::Patient(_) => Role::Patient,
            Profile::Doctor(_) => Role::Doctor,
        }
    }

    pub fn user_id(&self) -> UserId {
        match self {
            Profile::Patient(patient) => patient.user_id,
            Profile::Doctor(doctor) => doctor.user_id,
        }
    }
}

/// Profile attributes collected at registration, before the user id exists.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileSeed {
    Patient { phone: Option<String> },
    Doctor { specialty: String, phone: Option<String> },
}

impl ProfileSeed {
    pub fn role(&self) -> Role {
        match self {
            ProfileSeed::Patient { .. } => Role::Patient,
            ProfileSeed::Doctor { .. } => Role::Doctor,
        }
    }

    pub fn into_record(self, user_id: UserId) -> Profile {
        match self {
            ProfileSeed::Patient { phone } => Profile::Patient(
                NewPatient {
                    phone,
                    ..NewPatient::for_user(user_id)
                }
                .into_record(),
            ),
            ProfileSeed::Doctor { specialty, phone } => Profile::Doctor(
                NewDoctor {
                    user_id,
                    specialty,
                    license_number: None,
                    phone,
                }
                .into_record(),
            ),
        }
    }
}
