//! Password-protected per-user key store
//!
//! File format (`<user>.keystore`, JSON):
//! ```text
//! {
//!   "version": 1,
//!   "user_id": "alice",
//!   "kdf": { "salt": b64(16), "mem_cost_kib": .., "time_cost": .., "parallelism": .. },
//!   "nonce": b64(24),
//!   "sealed": b64(XChaCha20-Poly1305(store_key, entries_json, aad = header))
//! }
//! ```
//! `store_key = Argon2id(password, salt)`. The sealed entries are a JSON map
//! from alias to base64 bytes; one password unlocks every entry.
//!
//! The companion `<user>.pub` holds the raw ML-KEM-1024 public key in
//! cleartext and can be read without the password.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use pqclip_core::{PqclipError, PqclipResult, UserId};
use pqclip_crypto::envelope::{self, Envelope, ENVELOPE_NONCE_SIZE};
use pqclip_crypto::password::SALT_SIZE;
use pqclip_crypto::{
    create_key, derive_store_key, generate_key, generate_keypair, CryptoContext, KdfParams,
    KemKeyPair, KemPrivateKey, KemPublicKey, StoreKey, SymmetricKey,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::atomic::write_atomic;
use crate::lock::with_lock;

/// Alias of the AES-256 key entry
pub const AES_KEY_ALIAS: &str = "aes-key";
/// Alias of the ML-KEM-1024 private key entry
pub const KEM_KEY_ALIAS: &str = "kyber-keypair";

pub const STORE_EXTENSION: &str = "keystore";
pub const PUBLIC_KEY_EXTENSION: &str = "pub";

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    user_id: String,
    kdf: KdfHeader,
    nonce: String,
    sealed: String,
}

#[derive(Serialize, Deserialize)]
struct KdfHeader {
    salt: String,
    mem_cost_kib: u32,
    time_cost: u32,
    parallelism: u32,
}

/// Decrypted entries: alias -> base64 secret bytes. Wiped on drop.
#[derive(Default, Serialize, Deserialize)]
#[serde(transparent)]
struct Entries(BTreeMap<String, String>);

impl Entries {
    fn get(&self, alias: &str) -> PqclipResult<Option<Zeroizing<Vec<u8>>>> {
        match self.0.get(alias) {
            None => Ok(None),
            Some(b64) => B64
                .decode(b64)
                .map(|bytes| Some(Zeroizing::new(bytes)))
                .map_err(|e| PqclipError::CorruptStore(format!("entry {alias}: {e}"))),
        }
    }

    fn insert(&mut self, alias: &str, secret: &[u8]) {
        if let Some(mut old) = self.0.insert(alias.to_string(), B64.encode(secret)) {
            old.zeroize();
        }
    }
}

impl Drop for Entries {
    fn drop(&mut self) {
        for value in self.0.values_mut() {
            value.zeroize();
        }
    }
}

/// A store opened with its password: the derived key is kept so the store
/// can be re-sealed without another Argon2id pass.
struct UnlockedStore {
    user_id: String,
    salt: [u8; SALT_SIZE],
    params: KdfParams,
    store_key: StoreKey,
    entries: Entries,
}

fn header_aad(version: u32, user_id: &str) -> Vec<u8> {
    format!("pqclip-keystore/v{version}/{user_id}").into_bytes()
}

fn decode_field(name: &str, value: &str) -> PqclipResult<Vec<u8>> {
    B64.decode(value)
        .map_err(|e| PqclipError::CorruptStore(format!("{name}: {e}")))
}

/// Handle for creating and opening key stores. Cheap to clone.
#[derive(Debug, Clone)]
pub struct KeyStore {
    ctx: CryptoContext,
}

impl KeyStore {
    pub fn new(ctx: CryptoContext) -> Self {
        Self { ctx }
    }

    /// `<dir>/<user>.keystore`
    pub fn path_for(dir: &Path, user: &UserId) -> PathBuf {
        dir.join(format!("{}.{STORE_EXTENSION}", user.as_str()))
    }

    /// Companion public-key path: the store path with a `.pub` extension.
    pub fn public_key_path(store_path: &Path) -> PathBuf {
        store_path.with_extension(PUBLIC_KEY_EXTENSION)
    }

    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    /// Create a new store holding a fresh AES-256 key.
    ///
    /// Fails with `AlreadyExists` if a store is already present at `path`.
    pub fn create(&self, path: &Path, password: &SecretString, user: &UserId) -> PqclipResult<()> {
        with_lock(path, || {
            if Self::exists(path) {
                return Err(PqclipError::AlreadyExists(format!("key store {}", path.display())));
            }
            self.create_unlocked(path, password, user)
        })
    }

    /// Create the store unless one already exists. Returns whether it was created.
    pub fn ensure(&self, path: &Path, password: &SecretString, user: &UserId) -> PqclipResult<bool> {
        with_lock(path, || {
            if Self::exists(path) {
                return Ok(false);
            }
            self.create_unlocked(path, password, user)?;
            Ok(true)
        })
    }

    fn create_unlocked(&self, path: &Path, password: &SecretString, user: &UserId) -> PqclipResult<()> {
        let salt: [u8; SALT_SIZE] = self.ctx.random_array()?;
        let params = self.ctx.kdf_params().clone();
        let store_key = derive_store_key(password, &salt, &params)?;

        let mut entries = Entries::default();
        let key = generate_key(&self.ctx)?;
        entries.insert(AES_KEY_ALIAS, key.as_bytes());
        drop(key);

        let store = UnlockedStore {
            user_id: user.as_str().to_string(),
            salt,
            params,
            store_key,
            entries,
        };
        self.save(path, &store)?;
        tracing::info!(user = %user, path = %path.display(), "created key store");
        Ok(())
    }

    /// Read the AES-256 key.
    pub fn load_symmetric_key(&self, path: &Path, password: &SecretString) -> PqclipResult<SymmetricKey> {
        let store = with_lock(path, || Self::open(path, password))?;
        let bytes = store
            .entries
            .get(AES_KEY_ALIAS)?
            .ok_or_else(|| PqclipError::EntryNotFound(format!("{AES_KEY_ALIAS} in {}", path.display())))?;
        create_key(&bytes).map_err(|e| PqclipError::CorruptStore(format!("{AES_KEY_ALIAS}: {e}")))
    }

    /// Return the user's KEM keypair, generating and persisting one on first use.
    ///
    /// The private key goes into the sealed store; the public key is written
    /// in cleartext to the companion `.pub` file.
    pub fn load_or_generate_keypair(&self, path: &Path, password: &SecretString) -> PqclipResult<KemKeyPair> {
        with_lock(path, || {
            let mut store = Self::open(path, password)?;
            let pub_path = Self::public_key_path(path);

            if let Some(bytes) = store.entries.get(KEM_KEY_ALIAS)? {
                let private = KemPrivateKey::from_bytes(&bytes)?;
                let public = Self::read_public_key(&pub_path).map_err(|e| match e {
                    PqclipError::EntryNotFound(what) | PqclipError::InvalidPublicKey(what) => {
                        PqclipError::CorruptStore(format!("companion public key: {what}"))
                    }
                    other => other,
                })?;
                return Ok(KemKeyPair { public, private });
            }

            let pair = generate_keypair(&self.ctx)?;
            // Public file first: a crash before the store write just means
            // the next call generates again and overwrites it.
            write_atomic(&pub_path, pair.public.as_bytes())?;
            store.entries.insert(KEM_KEY_ALIAS, pair.private.as_bytes());
            self.save(path, &store)?;

            tracing::info!(
                user = %store.user_id,
                fingerprint = %pair.public.fingerprint(),
                "generated KEM keypair"
            );
            Ok(pair)
        })
    }

    /// Read a user's public key from the companion file. No password needed.
    pub fn load_public_key(store_path: &Path) -> PqclipResult<KemPublicKey> {
        Self::read_public_key(&Self::public_key_path(store_path))
    }

    fn read_public_key(pub_path: &Path) -> PqclipResult<KemPublicKey> {
        let bytes = match std::fs::read(pub_path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PqclipError::EntryNotFound(format!("public key {}", pub_path.display())));
            }
            Err(e) => return Err(e.into()),
        };
        KemPublicKey::from_bytes(&bytes)
    }

    /// Re-seal every entry under a new password and a fresh salt.
    pub fn change_password(&self, path: &Path, old: &SecretString, new: &SecretString) -> PqclipResult<()> {
        with_lock(path, || {
            let mut store = Self::open(path, old)?;
            store.salt = self.ctx.random_array()?;
            store.params = self.ctx.kdf_params().clone();
            store.store_key = derive_store_key(new, &store.salt, &store.params)?;
            self.save(path, &store)?;
            tracing::info!(user = %store.user_id, "key store password changed");
            Ok(())
        })
    }

    fn open(path: &Path, password: &SecretString) -> PqclipResult<UnlockedStore> {
        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PqclipError::EntryNotFound(format!("key store {}", path.display())));
            }
            Err(e) => return Err(e.into()),
        };

        let file: StoreFile = serde_json::from_slice(&raw)
            .map_err(|e| PqclipError::CorruptStore(format!("{}: {e}", path.display())))?;
        if file.version != FORMAT_VERSION {
            return Err(PqclipError::CorruptStore(format!(
                "unsupported key store version {}",
                file.version
            )));
        }

        let salt: [u8; SALT_SIZE] = decode_field("salt", &file.kdf.salt)?
            .try_into()
            .map_err(|_| PqclipError::CorruptStore("salt has wrong length".into()))?;
        let nonce: [u8; ENVELOPE_NONCE_SIZE] = decode_field("nonce", &file.nonce)?
            .try_into()
            .map_err(|_| PqclipError::CorruptStore("nonce has wrong length".into()))?;
        let sealed = decode_field("sealed", &file.sealed)?;

        let params = KdfParams {
            mem_cost_kib: file.kdf.mem_cost_kib,
            time_cost: file.kdf.time_cost,
            parallelism: file.kdf.parallelism,
        };
        // Out-of-range costs surface as InvalidInput before any hashing
        let store_key = derive_store_key(password, &salt, &params).map_err(|e| match e {
            PqclipError::InvalidInput(msg) => PqclipError::CorruptStore(msg),
            other => other,
        })?;

        let aad = header_aad(file.version, &file.user_id);
        let plaintext = envelope::open(&store_key, &Envelope { nonce, sealed }, &aad).map_err(|e| {
            tracing::warn!(path = %path.display(), "key store failed to unlock");
            e
        })?;
        let entries: Entries = serde_json::from_slice(&plaintext)
            .map_err(|e| PqclipError::CorruptStore(format!("entries: {e}")))?;

        Ok(UnlockedStore {
            user_id: file.user_id,
            salt,
            params,
            store_key,
            entries,
        })
    }

    fn save(&self, path: &Path, store: &UnlockedStore) -> PqclipResult<()> {
        let plaintext = Zeroizing::new(
            serde_json::to_vec(&store.entries)
                .map_err(|e| PqclipError::CryptoFailure(format!("encoding entries: {e}")))?,
        );
        let aad = header_aad(FORMAT_VERSION, &store.user_id);
        let env = envelope::seal(&self.ctx, &store.store_key, &plaintext, &aad)?;

        let file = StoreFile {
            version: FORMAT_VERSION,
            user_id: store.user_id.clone(),
            kdf: KdfHeader {
                salt: B64.encode(store.salt),
                mem_cost_kib: store.params.mem_cost_kib,
                time_cost: store.params.time_cost,
                parallelism: store.params.parallelism,
            },
            nonce: B64.encode(env.nonce),
            sealed: B64.encode(&env.sealed),
        };
        let json = serde_json::to_vec_pretty(&file)
            .map_err(|e| PqclipError::CryptoFailure(format!("encoding key store: {e}")))?;
        write_atomic(path, &json)
    }
}
