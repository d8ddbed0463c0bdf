use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::models::AppointmentStatus;

pub type PortalResult<T> = Result<T, PortalError>;

// Postgres names the implicit UNIQUE constraint on users.email like this.
const USERS_EMAIL_CONSTRAINT: &str = "users_email_key";

/// A closed-set field that received a value outside its set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumMismatch {
    pub field: String,
    pub value: String,
    pub expected: &'static [&'static str],
}

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("validation failed for: {}", .fields.join(", "))]
    Validation { fields: Vec<String> },

    #[error("{}", describe_mismatches(.0))]
    InvalidEnumValue(Vec<EnumMismatch>),

    #[error("appointment cannot move from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("email already registered")]
    DuplicateEmail,

    // Same message for unknown email and wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PortalError {
    pub fn invalid_field(field: impl Into<String>) -> Self {
        PortalError::Validation {
            fields: vec![field.into()],
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PortalError::Validation { .. } => "ValidationError",
            PortalError::InvalidEnumValue(_) => "InvalidEnumValue",
            PortalError::InvalidTransition { .. } => "InvalidTransition",
            PortalError::ConstraintViolation(_) => "ConstraintViolation",
            PortalError::DuplicateEmail => "DuplicateEmail",
            PortalError::InvalidCredentials => "InvalidCredentials",
            PortalError::NotFound(_) => "NotFound",
            PortalError::Storage(_) | PortalError::Internal(_) => "InternalError",
        }
    }
}

fn describe_mismatches(mismatches: &[EnumMismatch]) -> String {
    mismatches
        .iter()
        .map(|m| {
            format!(
                "invalid value '{}' for {}; expected one of {}",
                m.value,
                m.field,
                m.expected.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<DieselError> for PortalError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)
                if info.constraint_name() == Some(USERS_EMAIL_CONSTRAINT) =>
            {
                PortalError::DuplicateEmail
            }
            DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::ForeignKeyViolation
                | DatabaseErrorKind::CheckViolation
                | DatabaseErrorKind::NotNullViolation,
                info,
            ) => PortalError::ConstraintViolation(info.message().to_string()),
            other => PortalError::Storage(other.to_string()),
        }
    }
}

impl ResponseError for PortalError {
    fn status_code(&self) -> StatusCode {
        match self {
            PortalError::Validation { .. }
            | PortalError::InvalidEnumValue(_)
            | PortalError::InvalidTransition { .. }
            | PortalError::ConstraintViolation(_)
            | PortalError::DuplicateEmail => StatusCode::BAD_REQUEST,
            PortalError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            PortalError::NotFound(_) => StatusCode::NOT_FOUND,
            PortalError::Storage(_) | PortalError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = match self {
            PortalError::Validation { fields } => json!({
                "error": self.to_string(),
                "kind": self.kind(),
                "fields": fields,
            }),
            PortalError::InvalidEnumValue(mismatches) => json!({
                "error": self.to_string(),
                "kind": self.kind(),
                "fields": mismatches,
            }),
            PortalError::Storage(_) | PortalError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                json!({ "error": "internal server error", "kind": self.kind() })
            }
            _ => json!({ "error": self.to_string(), "kind": self.kind() }),
        };
        HttpResponse::build(status).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_field() {
        let err = PortalError::Validation {
            fields: vec!["email".into(), "fullName".into()],
        };
        assert_eq!(err.to_string(), "validation failed for: email, fullName");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn credentials_failures_are_unauthorized() {
        assert_eq!(
            PortalError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn enum_mismatch_names_the_allowed_values() {
        let err = PortalError::InvalidEnumValue(vec![EnumMismatch {
            field: "type".into(),
            value: "Surgery".into(),
            expected: &["Check-up", "Consultation"],
        }]);
        assert_eq!(
            err.to_string(),
            "invalid value 'Surgery' for type; expected one of Check-up, Consultation"
        );
    }

    #[test]
    fn unexpected_diesel_errors_become_storage_failures() {
        let err = PortalError::from(DieselError::RollbackTransaction);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
