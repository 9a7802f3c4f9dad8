//! User directory: login names, Argon2id password hashes, contact profile.
//!
//! Backed by one JSON file. Every mutation reloads the file under the
//! path lock and rewrites it atomically, so concurrent registrations in one
//! process cannot drop each other's records.

use std::path::{Path, PathBuf};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use pqclip_core::{PqclipError, PqclipResult, UserId};
use pqclip_crypto::CryptoContext;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::atomic::write_atomic;
use crate::lock::with_lock;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    /// Argon2id PHC string
    pub password_hash: String,
    #[serde(default)]
    pub profile: UserProfile,
    /// Unix timestamp of registration
    #[serde(default)]
    pub created_at: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Ledger {
    users: Vec<UserRecord>,
}

impl Ledger {
    fn load(path: &Path) -> PqclipResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content)
            .map_err(|e| PqclipError::InvalidInput(format!("parsing user directory {}: {e}", path.display())))
    }

    fn save(&self, path: &Path) -> PqclipResult<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| PqclipError::InvalidInput(format!("serializing user directory: {e}")))?;
        write_atomic(path, &json)
    }

    fn find(&self, name: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.username == name)
    }
}

#[derive(Debug, Clone)]
pub struct UserDirectory {
    path: PathBuf,
    ctx: CryptoContext,
}

impl UserDirectory {
    pub fn new(path: impl Into<PathBuf>, ctx: CryptoContext) -> Self {
        Self {
            path: path.into(),
            ctx,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn user_exists(&self, name: &str) -> PqclipResult<bool> {
        Ok(Ledger::load(&self.path)?.find(name).is_some())
    }

    pub fn find(&self, name: &str) -> PqclipResult<Option<UserRecord>> {
        Ok(Ledger::load(&self.path)?.find(name).cloned())
    }

    /// Register a user. Fails with `AlreadyExists` if the name is taken.
    pub fn create_user(&self, name: &UserId, password: &SecretString, profile: UserProfile) -> PqclipResult<()> {
        if password.expose_secret().is_empty() {
            return Err(PqclipError::InvalidInput("password must not be empty".into()));
        }
        let password_hash = self.hash_password(password)?;

        with_lock(&self.path, || {
            let mut ledger = Ledger::load(&self.path)?;
            if ledger.find(name.as_str()).is_some() {
                return Err(PqclipError::AlreadyExists(format!("user {name}")));
            }
            ledger.users.push(UserRecord {
                username: name.as_str().to_string(),
                password_hash,
                profile,
                created_at: now_epoch(),
            });
            ledger.save(&self.path)
        })?;

        tracing::info!(user = %name, "registered user");
        Ok(())
    }

    /// Check a login. Unknown users and wrong passwords both return `false`.
    pub fn authenticate(&self, name: &str, password: &SecretString) -> PqclipResult<bool> {
        let Some(record) = Ledger::load(&self.path)?.find(name).cloned() else {
            tracing::debug!(user = name, "login for unknown user");
            return Ok(false);
        };
        let parsed = match PasswordHash::new(&record.password_hash) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(user = name, error = %e, "stored password hash is unreadable");
                return Ok(false);
            }
        };
        Ok(Argon2::default()
            .verify_password(password.expose_secret().as_bytes(), &parsed)
            .is_ok())
    }

    fn hash_password(&self, password: &SecretString) -> PqclipResult<String> {
        let p = self.ctx.kdf_params();
        let params = Params::new(p.mem_cost_kib, p.time_cost, p.parallelism, None)
            .map_err(|e| PqclipError::InvalidInput(format!("invalid Argon2id params: {e}")))?;
        let salt_bytes: [u8; 16] = self.ctx.random_array()?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| PqclipError::CryptoFailure(format!("encoding salt: {e}")))?;

        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(password.expose_secret().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PqclipError::CryptoFailure(format!("hashing password: {e}")))
    }
}

fn now_epoch() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
