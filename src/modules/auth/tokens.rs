use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::otp::ChallengePurpose;

/// How long a minted proof stays usable.
pub const PROOF_TTL_MINUTES: i64 = 15;

/// Server-issued proof that a challenge was verified.
///
/// Minted only by a successful `verify_otp` and stored on the user record;
/// privileged operations (password change) must present it back instead of
/// being trusted on a bare user id. Single-use.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProofToken {
    pub token: String,
    pub purpose: ChallengePurpose,
    pub expires_at: DateTime<Utc>,
}

impl ProofToken {
    /// Function to mint a fresh opaque proof for a verified purpose
    pub fn mint(purpose: ChallengePurpose, now: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self {
            token: hex::encode(bytes),
            purpose,
            expires_at: now + Duration::minutes(PROOF_TTL_MINUTES),
        }
    }

    /// Function to check a presented token against this proof
    pub fn authorizes(&self, presented: &str, purpose: ChallengePurpose, now: DateTime<Utc>) -> bool {
        self.purpose == purpose && self.token == presented && now < self.expires_at
    }
}
