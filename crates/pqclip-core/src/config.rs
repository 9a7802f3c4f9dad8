use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PqclipError, PqclipResult};

/// Top-level configuration (loaded from pqclip.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PqclipConfig {
    pub paths: PathsConfig,
    pub crypto: CryptoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding `<user>.keystore` and `<user>.pub` (default: keys)
    pub keystore_dir: PathBuf,
    /// Default output directory for encrypted containers
    pub encrypted_dir: PathBuf,
    /// Default output directory for decrypted files
    pub decrypted_dir: PathBuf,
    /// User directory file (default: data/users.json)
    pub users_file: PathBuf,
}

/// Argon2id cost parameters used when sealing a key store under a password
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB)
    pub argon2_mem_cost_kib: u32,
    /// Argon2id time cost (iterations, default: 3)
    pub argon2_time_cost: u32,
    /// Argon2id parallelism (default: 4)
    pub argon2_parallelism: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            keystore_dir: PathBuf::from("keys"),
            encrypted_dir: PathBuf::from("encryptedVideos"),
            decrypted_dir: PathBuf::from("decryptedVideos"),
            users_file: PathBuf::from("data/users.json"),
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            argon2_mem_cost_kib: 65536,
            argon2_time_cost: 3,
            argon2_parallelism: 4,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl PqclipConfig {
    /// Load from a TOML file, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> PqclipResult<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| PqclipError::Config(format!("parsing {}: {e}", path.display())))
    }

    pub fn to_toml(&self) -> PqclipResult<String> {
        toml::to_string_pretty(self).map_err(|e| PqclipError::Config(e.to_string()))
    }
}
