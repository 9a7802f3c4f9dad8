//! Password hardening: Argon2id password → key-store sealing key

use argon2::{Algorithm, Argon2, Params, Version};
use pqclip_core::config::CryptoConfig;
use pqclip_core::{PqclipError, PqclipResult};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::KEY_SIZE;

/// Size of the random Argon2id salt stored in a key-store header
pub const SALT_SIZE: usize = 16;

/// Sealing key for one key store, derived from its password and header.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct StoreKey {
    bytes: [u8; KEY_SIZE],
}

impl StoreKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StoreKey(..)")
    }
}

/// Argon2id parameters, persisted alongside the salt in each key store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// 1 GiB
    pub const MAX_MEM_COST_KIB: u32 = 1 << 20;
    pub const MAX_TIME_COST: u32 = 16;
    pub const MAX_PARALLELISM: u32 = 64;

    /// Reject costs above the ceilings. Headers are read from disk before
    /// anything is authenticated, so these bound what a damaged store can ask for.
    pub fn check_limits(&self) -> PqclipResult<()> {
        let limits = [
            ("mem_cost_kib", self.mem_cost_kib, Self::MAX_MEM_COST_KIB),
            ("time_cost", self.time_cost, Self::MAX_TIME_COST),
            ("parallelism", self.parallelism, Self::MAX_PARALLELISM),
        ];
        for (name, value, max) in limits {
            if value > max {
                return Err(PqclipError::InvalidInput(format!(
                    "Argon2id {name} {value} exceeds the limit of {max}"
                )));
            }
        }
        Ok(())
    }
}

impl From<&CryptoConfig> for KdfParams {
    fn from(config: &CryptoConfig) -> Self {
        Self {
            mem_cost_kib: config.argon2_mem_cost_kib,
            time_cost: config.argon2_time_cost,
            parallelism: config.argon2_parallelism,
        }
    }
}

/// Derive a 256-bit store key from a password and salt using Argon2id.
///
/// The salt is random per store and kept in the store header (it does not
/// need to be secret). Parameters outside [`KdfParams::check_limits`] are
/// `InvalidInput`.
pub fn derive_store_key(
    password: &SecretString,
    salt: &[u8],
    params: &KdfParams,
) -> PqclipResult<StoreKey> {
    params.check_limits()?;
    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| PqclipError::InvalidInput(format!("invalid Argon2id params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; KEY_SIZE];
    let result = argon2.hash_password_into(password.expose_secret().as_bytes(), salt, &mut key);
    if let Err(e) = result {
        key.zeroize();
        return Err(PqclipError::CryptoFailure(format!("Argon2id KDF failed: {e}")));
    }

    Ok(StoreKey::from_bytes(key))
}
