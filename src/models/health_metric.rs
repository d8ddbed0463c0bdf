use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::{HealthMetricId, PatientId};
use crate::schema::health_metrics;

// Append-only: there is no changeset and no delete for metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable)]
#[diesel(table_name = health_metrics)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct HealthMetric {
    pub id: HealthMetricId,
    pub patient_id: PatientId,
    pub metric_type: String,
    pub value: String,
    pub unit: String,
    pub recorded_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHealthMetric {
    pub patient_id: PatientId,
    pub metric_type: String,
    pub value: String,
    pub unit: String,
    pub notes: Option<String>,
}

impl NewHealthMetric {
    pub fn into_record(self) -> HealthMetric {
        HealthMetric {
            id: HealthMetricId::generate(),
            patient_id: self.patient_id,
            metric_type: self.metric_type,
            value: self.value,
            unit: self.unit,
            recorded_at: Utc::now(),
            notes: self.notes,
        }
    }
}
