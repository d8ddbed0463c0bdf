use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::{PatientId, UserId};
use crate::schema::patients;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = patients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: PatientId,
    pub user_id: UserId,
    pub date_of_birth: Option<NaiveDate>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub user_id: UserId,
    pub date_of_birth: Option<NaiveDate>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

impl NewPatient {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            date_of_birth: None,
            phone: None,
            address: None,
            blood_type: None,
            allergies: Vec::new(),
        }
    }

    pub fn into_record(self) -> Patient {
        Patient {
            id: PatientId::generate(),
            user_id: self.user_id,
            date_of_birth: self.date_of_birth,
            phone: self.phone,
            address: self.address,
            blood_type: self.blood_type,
            allergies: self.allergies,
            created_at: Utc::now(),
        }
    }
}

/// Sparse update for a patient profile. `None` leaves a column alone,
/// `Some(None)` clears a nullable one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, AsChangeset)]
#[diesel(table_name = patients)]
#[serde(rename_all = "camelCase")]
pub struct PatientChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allergies: Option<Vec<String>>,
}

impl PatientChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(self, patient: &mut Patient) {
        if let Some(date_of_birth) = self.date_of_birth {
            patient.date_of_birth = date_of_birth;
        }
        if let Some(phone) = self.phone {
            patient.phone = phone;
        }
        if let Some(address) = self.address {
            patient.address = address;
        }
        if let Some(blood_type) = self.blood_type {
            patient.blood_type = blood_type;
        }
        if let Some(allergies) = self.allergies {
            patient.allergies = allergies;
        }
    }
}
