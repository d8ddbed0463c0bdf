use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::{AppointmentId, DoctorId, PatientId};
use crate::schema::appointments;

text_enum! {
    AppointmentType {
        CheckUp => "Check-up",
        Consultation => "Consultation",
        FollowUp => "Follow-up",
        Emergency => "Emergency",
    }
}

text_enum! {
    AppointmentStatus {
        Upcoming => "upcoming",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl Default for AppointmentStatus {
    fn default() -> Self {
        Self::Upcoming
    }
}

impl AppointmentStatus {
    /// Only an upcoming appointment can be completed or cancelled; restating
    /// the current status is always allowed.
    pub fn can_become(self, next: Self) -> bool {
        self == next
            || matches!(
                (self, next),
                (Self::Upcoming, Self::Completed) | (Self::Upcoming, Self::Cancelled)
            )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = appointments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub appointment_date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: AppointmentType,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub appointment_date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: AppointmentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

impl NewAppointment {
    pub fn into_record(self) -> Appointment {
        Appointment {
            id: AppointmentId::generate(),
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            appointment_date: self.appointment_date,
            kind: self.kind,
            status: self.status.unwrap_or_default(),
            notes: self.notes,
            created_at: Utc::now(),
        }
    }
}

// Patient and doctor are fixed once booked; everything else may move.
#[derive(Debug, Clone, Default, PartialEq, Serialize, AsChangeset)]
#[diesel(table_name = appointments)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_date: Option<DateTime<Utc>>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<AppointmentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl AppointmentChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(self, appointment: &mut Appointment) {
        if let Some(date) = self.appointment_date {
            appointment.appointment_date = date;
        }
        if let Some(kind) = self.kind {
            appointment.kind = kind;
        }
        if let Some(status) = self.status {
            appointment.status = status;
        }
        if let Some(notes) = self.notes {
            appointment.notes = notes;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(AppointmentStatus::Upcoming, AppointmentStatus::Completed, true)]
    #[test_case(AppointmentStatus::Upcoming, AppointmentStatus::Cancelled, true)]
    #[test_case(AppointmentStatus::Upcoming, AppointmentStatus::Upcoming, true)]
    #[test_case(AppointmentStatus::Completed, AppointmentStatus::Upcoming, false)]
    #[test_case(AppointmentStatus::Cancelled, AppointmentStatus::Completed, false)]
    #[test_case(AppointmentStatus::Completed, AppointmentStatus::Cancelled, false)]
    fn status_transitions(from: AppointmentStatus, to: AppointmentStatus, allowed: bool) {
        assert_eq!(from.can_become(to), allowed);
    }

    #[test]
    fn wire_spelling_round_trips_through_from_str() {
        assert_eq!("Check-up".parse::<AppointmentType>(), Ok(AppointmentType::CheckUp));
        assert_eq!(AppointmentType::FollowUp.to_string(), "Follow-up");
        assert!("Surgery".parse::<AppointmentType>().is_err());
    }
}
