use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use tracing::{error, warn};

use crate::error::{ModelError, ModelResult};
use crate::users::repo_types::User;

const UNUSABLE_PASSWORD_PREFIX: char = '!';
const UNUSABLE_PASSWORD_SUFFIX_LENGTH: usize = 40;

pub fn hash_password(plain: &str) -> ModelResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            ModelError::PasswordHash(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> ModelResult<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        ModelError::PasswordHash(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Marker stored for accounts created without a password. Never verifies.
pub fn make_unusable_password() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(UNUSABLE_PASSWORD_SUFFIX_LENGTH)
        .map(char::from)
        .collect();
    format!("{}{}", UNUSABLE_PASSWORD_PREFIX, suffix)
}

pub fn is_password_usable(hash: &str) -> bool {
    !hash.is_empty() && !hash.starts_with(UNUSABLE_PASSWORD_PREFIX)
}

impl User {
    /// Replaces the stored hash. `None` marks the password unusable.
    pub fn set_password(&mut self, plain: Option<&str>) -> ModelResult<()> {
        self.password_hash = match plain {
            Some(p) => hash_password(p)?,
            None => make_unusable_password(),
        };
        Ok(())
    }

    pub fn check_password(&self, plain: &str) -> bool {
        if !self.has_usable_password() {
            return false;
        }
        match verify_password(plain, &self.password_hash) {
            Ok(ok) => ok,
            Err(e) => {
                warn!(user_id = self.id, error = %e, "stored password hash is unreadable");
                false
            }
        }
    }

    pub fn has_usable_password(&self) -> bool {
        is_password_usable(&self.password_hash)
    }
}
