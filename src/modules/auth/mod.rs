pub mod engine;
pub mod error;
pub mod file_store;
pub mod otp;
pub mod password;
pub mod store;
pub mod tokens;

// Re-export the main types and functions
pub use engine::{ChallengeReceipt, CredentialEngine, DeliveryStatus, Verification};
pub use error::{AuthError, StoreError};
pub use file_store::JsonFileStore;
pub use otp::{Challenge, ChallengePurpose};
pub use password::{validate_password, PasswordError};
pub use store::{MemoryStore, RecordStore, UserRecord};
pub use tokens::ProofToken;
