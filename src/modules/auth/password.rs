use pbkdf2::password_hash::rand_core::OsRng;
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::{Params, Pbkdf2};

use super::error::AuthError;

/// PBKDF2 iteration count used when hashing new passwords.
const PBKDF2_ROUNDS: u32 = 100_000;

/// Errors from password strength validation
#[derive(Debug, PartialEq)]
pub enum PasswordError {
    TooShort,
    NoUppercase,
    NoLowercase,
    NoNumber,
    NoSpecialChar,
}

/// Function to hash a password with PBKDF2-HMAC-SHA256
///
/// Every call generates a fresh random salt, so hashing the same plaintext
/// twice produces different PHC digest strings.
pub fn hash(plaintext: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let params = Params {
        rounds: PBKDF2_ROUNDS,
        output_length: 32,
    };
    let digest = Pbkdf2
        .hash_password_customized(plaintext.as_bytes(), None, None, params, &salt)
        .map_err(|e| AuthError::Encoding(e.to_string()))?;
    Ok(digest.to_string())
}

/// Function to verify a password against a stored PHC digest
///
/// A mismatch or a malformed digest both come back as `false`; verification
/// never errors. The underlying comparison is constant-time.
pub fn verify(plaintext: &str, digest: &str) -> bool {
    let parsed = match PasswordHash::new(digest) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Pbkdf2.verify_password(plaintext.as_bytes(), &parsed).is_ok()
}

/// Function to validate password strength
///
/// Policy lives with the caller, not the engine: the engine only requires a
/// non-empty password, UIs apply this before submitting.
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    if password.len() < 8 {
        return Err(PasswordError::TooShort);
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(PasswordError::NoUppercase);
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(PasswordError::NoLowercase);
    }
    if !password.chars().any(|c| c.is_numeric()) {
        return Err(PasswordError::NoNumber);
    }
    if !password
        .chars()
        .any(|c| "!@#$%^&*()_+-=[]{}|;:,.<>?".contains(c))
    {
        return Err(PasswordError::NoSpecialChar);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify_round_trip() {
        let digest = hash("Password123!").unwrap();
        assert!(verify("Password123!", &digest));
    }

    #[test]
    fn test_same_plaintext_hashes_differently() {
        let first = hash("Password123!").unwrap();
        let second = hash("Password123!").unwrap();
        assert_ne!(first, second);

        // Both still verify despite differing salts
        assert!(verify("Password123!", &first));
        assert!(verify("Password123!", &second));
    }

    #[test]
    fn test_wrong_password_fails_verification() {
        let digest = hash("Password123!").unwrap();
        assert!(!verify("Password124!", &digest));
        assert!(!verify("", &digest));
    }

    #[test]
    fn test_malformed_digest_fails_closed() {
        assert!(!verify("Password123!", "not-a-phc-string"));
        assert!(!verify("Password123!", ""));
    }

    #[test]
    fn test_digest_never_contains_plaintext() {
        let digest = hash("Password123!").unwrap();
        assert!(!digest.contains("Password123!"));
        assert!(digest.starts_with("$pbkdf2-sha256$"));
    }

    #[test]
    fn test_password_validation() {
        // Test valid password
        assert!(validate_password("Password123!").is_ok());

        // Test too short
        assert!(matches!(
            validate_password("Pass1!"),
            Err(PasswordError::TooShort)
        ));

        // Test missing uppercase
        assert!(matches!(
            validate_password("password123!"),
            Err(PasswordError::NoUppercase)
        ));

        // Test missing lowercase
        assert!(matches!(
            validate_password("PASSWORD123!"),
            Err(PasswordError::NoLowercase)
        ));

        // Test missing number
        assert!(matches!(
            validate_password("Password!"),
            Err(PasswordError::NoNumber)
        ));

        // Test missing special character
        assert!(matches!(
            validate_password("Password123"),
            Err(PasswordError::NoSpecialChar)
        ));
    }
}
