use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of digits in a one-time code.
pub const OTP_DIGITS: usize = 6;

/// How long an issued code stays valid.
pub const OTP_TTL_MINUTES: i64 = 10;

/// What an outstanding challenge was issued for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengePurpose {
    Registration,
    Login,
    PasswordReset,
}

impl ChallengePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengePurpose::Registration => "registration",
            ChallengePurpose::Login => "login",
            ChallengePurpose::PasswordReset => "password-reset",
        }
    }
}

/// A single outstanding one-time code for a user record
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Challenge {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub purpose: ChallengePurpose,
}

impl Challenge {
    /// A challenge is live up to, but not including, its expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Function to issue a fresh challenge for the given purpose
///
/// The code is drawn uniformly from the full zero-padded 000000-999999
/// space using the operating system's CSPRNG.
pub fn issue(purpose: ChallengePurpose, now: DateTime<Utc>) -> Challenge {
    Challenge {
        code: generate_code(),
        expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
        purpose,
    }
}

/// Function to generate a fixed-width numeric code
fn generate_code() -> String {
    let n: u32 = OsRng.gen_range(0..1_000_000);
    format!("{:0width$}", n, width = OTP_DIGITS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_fixed_width_numeric() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), OTP_DIGITS);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_leading_zero_codes_are_possible() {
        // The full 000000-999999 space is used; a long enough sample
        // should produce at least one code below 100000.
        let mut saw_leading_zero = false;
        for _ in 0..2000 {
            if generate_code().starts_with('0') {
                saw_leading_zero = true;
                break;
            }
        }
        assert!(saw_leading_zero);
    }

    #[test]
    fn test_expiry_window() {
        let now = Utc::now();
        let challenge = issue(ChallengePurpose::Login, now);

        // Valid throughout [now, now + 10min)
        assert!(!challenge.is_expired(now));
        assert!(!challenge.is_expired(now + Duration::minutes(OTP_TTL_MINUTES) - Duration::seconds(1)));

        // Rejected at and after the boundary
        assert!(challenge.is_expired(now + Duration::minutes(OTP_TTL_MINUTES)));
        assert!(challenge.is_expired(now + Duration::minutes(OTP_TTL_MINUTES + 1)));
    }

    #[test]
    fn test_issue_carries_purpose() {
        let now = Utc::now();
        let challenge = issue(ChallengePurpose::PasswordReset, now);
        assert_eq!(challenge.purpose, ChallengePurpose::PasswordReset);
        assert_eq!(challenge.expires_at, now + Duration::minutes(OTP_TTL_MINUTES));
    }
}
