use serde::{Deserialize, Serialize};

use crate::error::{PqclipError, PqclipResult};

/// A validated user identity, safe to embed in a file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: &str) -> PqclipResult<Self> {
        if raw.is_empty() {
            return Err(PqclipError::InvalidInput("user id must not be empty".into()));
        }
        if raw == "." || raw == ".." || raw.contains(['/', '\\', '\0']) {
            return Err(PqclipError::InvalidInput(format!(
                "user id {raw:?} contains path characters"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = PqclipError;

    fn try_from(value: String) -> PqclipResult<Self> {
        UserId::new(&value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a whole-file encrypt or decrypt, for display by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// Name recorded inside the container
    pub original_name: String,
    /// Plaintext size in bytes
    pub plaintext_bytes: u64,
    /// Serialized container size in bytes
    pub container_bytes: u64,
}
