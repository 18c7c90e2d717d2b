// First, declare the modules folder itself
mod modules;

// Re-export everything from modules for easier access
pub use modules::{auth, email, utils};

// Re-export commonly used types
pub use modules::auth::engine::CredentialEngine;
pub use modules::auth::store::{MemoryStore, RecordStore, UserRecord};
pub use modules::email::notifier::Notifier;

// Constants
pub const USERS_FILE: &str = "users.json";
pub const LOG_FILE: &str = "two-to-enter.log";
