use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use rand::{Rng, distributions::Alphanumeric};

use crate::AuthnError;

/// Stored credentials starting with this marker can never be verified.
const UNUSABLE_PREFIX: char = '!';
const UNUSABLE_SUFFIX_LEN: usize = 40;

pub fn hash_password(password: &str) -> Result<String, AuthnError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthnError::Hash(err.to_string()))
}

/// A locked credential: random, and rejected before any hash comparison.
pub fn unusable_password() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(UNUSABLE_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{UNUSABLE_PREFIX}{suffix}")
}

pub fn is_usable(stored: &str) -> bool {
    !stored.starts_with(UNUSABLE_PREFIX)
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    if !is_usable(stored) {
        return false;
    }
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_password_verifies() {
        let stored = hash_password("admin123").unwrap();
        assert!(stored.starts_with("$argon2"));
        assert!(verify_password("admin123", &stored));
        assert!(!verify_password("admin124", &stored));
    }

    #[test]
    fn unusable_password_never_verifies() {
        let stored = unusable_password();
        assert!(!is_usable(&stored));
        assert!(!verify_password("", &stored));
        assert!(!verify_password(&stored, &stored));
        assert_ne!(stored, unusable_password());
    }
}
