use std::fmt;

use tracing::instrument;

use crate::crypto::CredentialHasher;
use crate::error::{PortalError, PortalResult};
use crate::models::{NewUser, Profile, ProfileSeed, Role, User};
use crate::storage::Storage;

/// A validated registration form: the user row plus the profile to create
/// alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub user: NewUser,
    pub profile: ProfileSeed,
}

#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Creates the account and its role profile. The email is checked first so
/// the common case never pays for a hash; the unique constraint still guards
/// the race.
#[instrument(skip(storage, hasher, registration), fields(email = %registration.user.email, role = %registration.user.role))]
pub fn register_user(
    storage: &dyn Storage,
    hasher: &CredentialHasher,
    registration: Registration,
) -> PortalResult<User> {
    let Registration { user, profile } = registration;
    if storage.get_account_by_email(&user.email)?.is_some() {
        return Err(PortalError::DuplicateEmail);
    }
    let hash = hasher.hash(&user.password)?;
    let (user, _) = storage.create_user_with_profile(user.with_hash(hash), profile)?;
    tracing::info!(user_id = %user.id, "registered user");
    Ok(user)
}

/// Checks the credentials and returns the user with its profile. Unknown
/// emails and wrong passwords are indistinguishable to the caller.
#[instrument(skip(storage, hasher, credentials), fields(email = %credentials.email))]
pub fn authenticate_user(
    storage: &dyn Storage,
    hasher: &CredentialHasher,
    credentials: Credentials,
) -> PortalResult<(User, Option<Profile>)> {
    let Some(account) = storage.get_account_by_email(&credentials.email)? else {
        hasher.verify_absent(&credentials.password);
        return Err(PortalError::InvalidCredentials);
    };
    if !hasher.verify(&credentials.password, &account.password_hash) {
        return Err(PortalError::InvalidCredentials);
    }

    let user = account.public();
    let profile = match user.role {
        Role::Patient => storage.get_patient_by_user(user.id)?.map(Profile::Patient),
        Role::Doctor => storage.get_doctor_by_user(user.id)?.map(Profile::Doctor),
    };
    if profile.is_none() {
        tracing::warn!(user_id = %user.id, "user has no profile row");
    }
    Ok((user, profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::HashSettings;
    use crate::models::DEFAULT_SPECIALTY;
    use crate::storage::MemStorage;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(&HashSettings {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    fn alex() -> Registration {
        Registration {
            user: NewUser {
                email: "alex@example.com".into(),
                password: "secret123".into(),
                role: Role::Patient,
                full_name: "Alex Doe".into(),
            },
            profile: ProfileSeed::Patient { phone: None },
        }
    }

    fn login(password: &str) -> Credentials {
        Credentials {
            email: "alex@example.com".into(),
            password: password.into(),
        }
    }

    #[test]
    fn stored_password_is_a_hash() {
        let store = MemStorage::new();
        register_user(&store, &hasher(), alex()).unwrap();
        let account = store.get_account_by_email("alex@example.com").unwrap().unwrap();
        assert_ne!(account.password_hash, "secret123");
        assert!(account.password_hash.starts_with("$argon2id$"));
    }

    #[test]
    fn second_registration_is_a_duplicate() {
        let store = MemStorage::new();
        let hasher = hasher();
        register_user(&store, &hasher, alex()).unwrap();
        let err = register_user(&store, &hasher, alex()).unwrap_err();
        assert!(matches!(err, PortalError::DuplicateEmail));
    }

    #[test]
    fn login_returns_user_and_patient_profile() {
        let store = MemStorage::new();
        let hasher = hasher();
        let registered = register_user(&store, &hasher, alex()).unwrap();

        let (user, profile) = authenticate_user(&store, &hasher, login("secret123")).unwrap();
        assert_eq!(user, registered);
        match profile {
            Some(Profile::Patient(patient)) => assert_eq!(patient.user_id, user.id),
            other => panic!("expected patient profile, got {other:?}"),
        }
    }

    #[test]
    fn doctor_registration_gets_default_specialty_profile() {
        let store = MemStorage::new();
        let hasher = hasher();
        let mut reg = alex();
        reg.user.role = Role::Doctor;
        reg.profile = ProfileSeed::Doctor {
            specialty: DEFAULT_SPECIALTY.into(),
            phone: None,
        };
        register_user(&store, &hasher, reg).unwrap();

        let (_, profile) = authenticate_user(&store, &hasher, login("secret123")).unwrap();
        match profile {
            Some(Profile::Doctor(doctor)) => assert_eq!(doctor.specialty, DEFAULT_SPECIALTY),
            other => panic!("expected doctor profile, got {other:?}"),
        }
    }

    #[test]
    fn wrong_password_and_unknown_email_look_the_same() {
        let store = MemStorage::new();
        let hasher = hasher();
        register_user(&store, &hasher, alex()).unwrap();

        let wrong = authenticate_user(&store, &hasher, login("secret124")).unwrap_err();
        let unknown = authenticate_user(&store, &hasher, Credentials {
            email: "nobody@example.com".into(),
            password: "secret123".into(),
        })
        .unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert!(matches!(wrong, PortalError::InvalidCredentials));
        assert!(matches!(unknown, PortalError::InvalidCredentials));
    }

    #[test]
    fn credentials_debug_hides_password() {
        let shown = format!("{:?}", login("secret123"));
        assert!(!shown.contains("secret123"));
    }
}
