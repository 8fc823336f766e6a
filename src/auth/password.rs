use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::errors::ServiceError;
use crate::i18n::AuthErrorCode;

const MIN_PASSWORD_LEN: usize = 8;

/// Hashes a password with Argon2id and a random salt, returning the PHC string.
pub fn hash_password(plain: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::InternalError(format!("password hashing failed: {e}")))
}

/// Returns `Ok(false)` on a wrong password and an error only when the stored
/// hash itself is unreadable.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ServiceError::InternalError(format!("invalid password hash: {e}")))?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ServiceError::InternalError(format!(
            "password verification failed: {e}"
        ))),
    }
}

/// At least eight characters with at least one letter and one digit.
pub fn validate_password_strength(plain: &str) -> Result<(), ServiceError> {
    let long_enough = plain.chars().count() >= MIN_PASSWORD_LEN;
    let has_letter = plain.chars().any(char::is_alphabetic);
    let has_digit = plain.chars().any(|c| c.is_ascii_digit());
    if long_enough && has_letter && has_digit {
        Ok(())
    } else {
        Err(ServiceError::Auth(AuthErrorCode::WeakPassword))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("printing2024").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("printing2024", &hash).unwrap());
        assert!(!verify_password("printing2025", &hash).unwrap());
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert_matches!(
            verify_password("whatever1", "not-a-hash"),
            Err(ServiceError::InternalError(_))
        );
    }

    #[rstest]
    #[case("abc12345", true)]
    #[case("كلمةسر123", true)]
    #[case("short1", false)]
    #[case("onlyletters", false)]
    #[case("1234567890", false)]
    fn strength_rules(#[case] password: &str, #[case] ok: bool) {
        assert_eq!(validate_password_strength(password).is_ok(), ok);
    }
}
