use std::fmt;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::UserId;
use crate::schema::users;

text_enum! {
    /// Fixed at registration; decides which profile table a user owns a row in.
    Role {
        Patient => "patient",
        Doctor => "doctor",
    }
}

/// A user as it is allowed to leave the server. The password column is never
/// selected into this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

/// Full `users` row, password hash included. Deliberately not `Serialize`.
#[derive(Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserAccount {
    pub id: UserId,
    pub email: String,
    #[diesel(column_name = password)]
    pub password_hash: String,
    pub role: Role,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn public(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
            full_name: self.full_name.clone(),
            created_at: self.created_at,
        }
    }
}

impl fmt::Debug for UserAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAccount")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .field("full_name", &self.full_name)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Insertable shape of a user: what a registration form supplies.
#[derive(Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub full_name: String,
}

impl NewUser {
    pub fn with_hash(self, password_hash: String) -> NewAccount {
        NewAccount {
            email: self.email,
            password_hash,
            role: self.role,
            full_name: self.full_name,
        }
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .field("full_name", &self.full_name)
            .finish()
    }
}

// A NewUser whose secret has already been hashed; what storage accepts.
#[derive(Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub full_name: String,
}

impl NewAccount {
    pub fn into_record(self) -> UserAccount {
        UserAccount {
            id: UserId::generate(),
            email: self.email,
            password_hash: self.password_hash,
            role: self.role,
            full_name: self.full_name,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_debug_output_hides_the_hash() {
        let account = NewAccount {
            email: "alex@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::Patient,
            full_name: "Alex Doe".into(),
        }
        .into_record();

        let printed = format!("{account:?}");
        assert!(!printed.contains("argon2id"));
        assert!(printed.contains("alex@example.com"));
    }

    #[test]
    fn public_view_serializes_without_password() {
        let account = NewAccount {
            email: "alex@example.com".into(),
            password_hash: "hash".into(),
            role: Role::Doctor,
            full_name: "Alex Doe".into(),
        }
        .into_record();

        let json = serde_json::to_value(account.public()).unwrap();
        assert_eq!(json["role"], "doctor");
        assert_eq!(json["fullName"], "Alex Doe");
        assert!(json.get("password").is_none());
    }
}
