use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::Deserialize;

use crate::error::{PortalError, PortalResult};

// Never a real password; only verified against so unknown-email logins cost
// the same as wrong-password ones.
const DUMMY_SECRET: &str = "medportal-unknown-account";

/// Argon2id cost parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct HashSettings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashSettings {
    fn default() -> Self {
        // argon2 crate defaults (OWASP minimum for Argon2id)
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

pub struct CredentialHasher {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl CredentialHasher {
    pub fn new(settings: &HashSettings) -> PortalResult<Self> {
        let params = Params::new(
            settings.memory_kib,
            settings.iterations,
            settings.parallelism,
            None,
        )
        .map_err(|e| PortalError::Internal(format!("Invalid Argon2 parameters: {}", e)))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let dummy_hash = hash_with(&argon2, DUMMY_SECRET)?;
        Ok(Self { argon2, dummy_hash })
    }

    // Salted PHC string, e.g. "$argon2id$v=19$m=...,t=...,p=...$salt$hash"
    pub fn hash(&self, password: &str) -> PortalResult<String> {
        hash_with(&self.argon2, password)
    }

    /// Constant-time check of `password` against a stored PHC string. A
    /// malformed stored hash never matches.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash is malformed");
                false
            }
        }
    }

    /// Runs a full verification against a throwaway hash and always fails.
    pub fn verify_absent(&self, password: &str) -> bool {
        let _ = self.verify(password, &self.dummy_hash);
        false
    }
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> PortalResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PortalError::Internal(format!("Failed to hash password: {}", e)))
}
