use thiserror::Error;

pub type PqclipResult<T> = Result<T, PqclipError>;

/// Text shown to end users for any credential or integrity failure.
///
/// Wrong passwords and failed AEAD tags deliberately share one message.
pub const AUTH_FAILURE_MESSAGE: &str = "invalid credentials or corrupted data";

#[derive(Debug, Error)]
pub enum PqclipError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid nonce length: expected {expected} bytes, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },

    #[error("invalid credentials or corrupted data")]
    AuthenticationFailure,

    #[error("corrupt key store: {0}")]
    CorruptStore(String),

    #[error("malformed container: {0}")]
    MalformedContainer(String),

    #[error("entry not found: {0}")]
    EntryNotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid KEM public key: {0}")]
    InvalidPublicKey(String),

    #[error("KEM decapsulation failed: {0}")]
    DecapsulationFailure(String),

    #[error("key generation failed: {0}")]
    KeyGenFailure(String),

    #[error("crypto failure: {0}")]
    CryptoFailure(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PqclipError {
    /// Message suitable for the presentation layer.
    pub fn user_message(&self) -> String {
        match self {
            PqclipError::AuthenticationFailure => AUTH_FAILURE_MESSAGE.to_string(),
            PqclipError::EntryNotFound(what) => format!("no keys found for {what}"),
            PqclipError::MalformedContainer(_) => {
                "the selected file is not a valid encrypted container".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Only transient I/O is worth a caller-level retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PqclipError::Io(_))
    }

    /// Failures that point at tampering or a broken primitive rather than a caller bug.
    pub fn is_security_relevant(&self) -> bool {
        matches!(
            self,
            PqclipError::AuthenticationFailure
                | PqclipError::CorruptStore(_)
                | PqclipError::MalformedContainer(_)
                | PqclipError::KeyGenFailure(_)
                | PqclipError::CryptoFailure(_)
        )
    }
}
