//! pqclip-secrets: per-user key material at rest
//!
//! On-disk layout under the configured key-store directory:
//!   <user>.keystore   password-sealed JSON (aes-key, kyber-keypair entries)
//!   <user>.pub        raw ML-KEM-1024 public key, cleartext
//!
//! The user directory (`users.json`) is a separate collaborator holding
//! Argon2id password hashes for login; it never sees key material.

pub mod atomic;
pub mod keystore;
pub mod lock;
pub mod users;

pub use atomic::write_atomic;
pub use keystore::{KeyStore, AES_KEY_ALIAS, KEM_KEY_ALIAS};
pub use users::{UserDirectory, UserProfile, UserRecord};
