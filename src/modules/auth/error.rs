use thiserror::Error;

/// Failures of the credential engine's operations.
///
/// Business outcomes are returned, never panicked. Display strings double as
/// the user-facing message, so the three challenge failures share one message
/// and `InvalidCredentials` does not say whether the username or the password
/// was wrong (account/code enumeration).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0} is required")]
    Validation(&'static str),

    #[error("email or username already registered")]
    DuplicateIdentity,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("user not found")]
    NotFound,

    #[error("invalid or expired code")]
    NoChallenge,

    #[error("invalid or expired code")]
    IncorrectCode,

    #[error("invalid or expired code")]
    ChallengeExpired,

    #[error("a verified password-reset code is required")]
    ProofRequired,

    #[error("failed to encode password hash: {0}")]
    Encoding(String),

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Whether the caller may retry the exact same call and hope for a
    /// different outcome (infrastructure faults only).
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::Store(_))
    }
}

/// Infrastructure failures of a record store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize store: {0}")]
    Serialize(String),

    #[error("record conflicts with an existing identity")]
    Conflict,

    #[error("store lock poisoned")]
    Poisoned,
}
