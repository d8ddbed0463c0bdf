use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::{DoctorId, UserId};
use crate::schema::doctors;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = doctors)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: DoctorId,
    pub user_id: UserId,
    pub specialty: String,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDoctor {
    pub user_id: UserId,
    pub specialty: String,
    pub license_number: Option<String>,
    pub phone: Option<String>,
}

impl NewDoctor {
    pub fn into_record(self) -> Doctor {
        Doctor {
            id: DoctorId::generate(),
            user_id: self.user_id,
            specialty: self.specialty,
            license_number: self.license_number,
            phone: self.phone,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, AsChangeset)]
#[diesel(table_name = doctors)]
#[serde(rename_all = "camelCase")]
pub struct DoctorChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_number: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
}

impl DoctorChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(self, doctor: &mut Doctor) {
        if let Some(specialty) = self.specialty {
            doctor.specialty = specialty;
        }
        if let Some(license_number) = self.license_number {
            doctor.license_number = license_number;
        }
        if let Some(phone) = self.phone {
            doctor.phone = phone;
        }
    }
}
