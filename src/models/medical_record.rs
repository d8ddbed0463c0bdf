use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::{DoctorId, MedicalRecordId, PatientId};
use crate::schema::medical_records;

text_enum! {
    RecordType {
        Report => "Report",
        LabResult => "Lab Result",
        Imaging => "Imaging",
        Prescription => "Prescription",
    }
}

/// A document in a patient's chart. `doctor_id` is empty for records the
/// system files on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = medical_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    pub id: MedicalRecordId,
    pub patient_id: PatientId,
    pub doctor_id: Option<DoctorId>,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: RecordType,
    pub description: Option<String>,
    pub file_url: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMedicalRecord {
    pub patient_id: PatientId,
    pub doctor_id: Option<DoctorId>,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: RecordType,
    pub description: Option<String>,
    pub file_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewMedicalRecord {
    pub fn into_record(self) -> MedicalRecord {
        MedicalRecord {
            id: MedicalRecordId::generate(),
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            title: self.title,
            kind: self.kind,
            description: self.description,
            file_url: self.file_url,
            tags: self.tags,
            created_at: Utc::now(),
        }
    }
}
