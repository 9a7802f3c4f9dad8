//! pqclip-crypto: primitives behind per-user clip encryption
//!
//! Key material flow:
//! ```text
//! password ──Argon2id──► store key ──XChaCha20-Poly1305──► sealed key store entries
//!                                                           ├── aes-key (random 256-bit)
//!                                                           └── kyber-keypair (ML-KEM-1024 private key)
//!
//! aes-key ──AES-256-GCM (random 96-bit nonce, AAD=original name)──► EncryptedContainer
//!
//! ML-KEM-1024 shared secret ──HKDF-SHA256(info="pqclip/kem-session/v1")──► session key
//! ```
//!
//! Every source of randomness goes through a [`CryptoContext`].

pub mod aead;
pub mod container;
pub mod context;
pub mod envelope;
pub mod kdf;
pub mod kem;
pub mod keys;
pub mod password;

pub use aead::{decrypt, decrypt_with_aad, encrypt, encrypt_with_aad, AeadCiphertext};
pub use container::EncryptedContainer;
pub use context::{CryptoContext, EntropySource, OsEntropy};
pub use kdf::{derive, derive_key32};
pub use kem::{
    decapsulate, encapsulate, generate_keypair, EncapsulationResult, KemCiphertext, KemKeyPair,
    KemPrivateKey, KemPublicKey, SharedSecret,
};
pub use keys::{create_key, generate_key, wipe, SymmetricKey};
pub use password::{derive_store_key, KdfParams, StoreKey};

/// Size of a symmetric key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag (128-bit)
pub const TAG_SIZE: usize = 16;

/// Output size of the HMAC hash (SHA-256)
pub const HASH_SIZE: usize = 32;
