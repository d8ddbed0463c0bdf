//! Entity schema for the portal.
//!
//! Every entity comes in up to three shapes: the stored record, the
//! insertable shape a caller may supply (no server-generated fields), and for
//! mutable entities a sparse changeset. The insertable shapes are what the
//! validation layer produces and what the client posts.

use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown variant '{0}'")]
pub struct UnknownVariant(pub String);

/// A text column restricted to a fixed list of spellings.
pub trait ClosedSet: FromStr + Copy {
    const VARIANTS: &'static [&'static str];
}

// Declares an enum stored as TEXT and serialized with its wire spelling.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize,
            ::diesel::expression::AsExpression,
            ::diesel::deserialize::FromSqlRow,
        )]
        #[diesel(sql_type = ::diesel::sql_types::Text)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl $crate::models::ClosedSet for $name {
            const VARIANTS: &'static [&'static str] = &[$($text),+];
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err($crate::models::UnknownVariant(other.to_string())),
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::diesel::serialize::ToSql<::diesel::sql_types::Text, ::diesel::pg::Pg> for $name {
            fn to_sql<'b>(
                &'b self,
                out: &mut ::diesel::serialize::Output<'b, '_, ::diesel::pg::Pg>,
            ) -> ::diesel::serialize::Result {
                <str as ::diesel::serialize::ToSql<::diesel::sql_types::Text, ::diesel::pg::Pg>>::to_sql(
                    self.as_str(),
                    out,
                )
            }
        }

        impl ::diesel::deserialize::FromSql<::diesel::sql_types::Text, ::diesel::pg::Pg> for $name {
            fn from_sql(bytes: ::diesel::pg::PgValue<'_>) -> ::diesel::deserialize::Result<Self> {
                let raw = <String as ::diesel::deserialize::FromSql<
                    ::diesel::sql_types::Text,
                    ::diesel::pg::Pg,
                >>::from_sql(bytes)?;
                Ok(raw.parse::<Self>()?)
            }
        }
    };
}

mod appointment;
mod doctor;
mod health_metric;
mod ids;
mod medical_record;
mod message;
mod patient;
mod profile;
mod user;

pub use appointment::{
    Appointment, AppointmentChanges, AppointmentStatus, AppointmentType, NewAppointment,
};
pub use doctor::{Doctor, DoctorChanges, NewDoctor};
pub use health_metric::{HealthMetric, NewHealthMetric};
pub use ids::{
    AppointmentId, DoctorId, HealthMetricId, MedicalRecordId, MessageId, PatientId, UserId,
};
pub use medical_record::{MedicalRecord, NewMedicalRecord, RecordType};
pub use message::{Message, NewMessage};
pub use patient::{NewPatient, Patient, PatientChanges};
pub use profile::{Profile, ProfileSeed, DEFAULT_SPECIALTY};
pub use user::{NewAccount, NewUser, Role, User, UserAccount};
