//! pqclip-engine: end-to-end operations over the crypto and key-store crates
//!
//! ```text
//! encrypt_file: ensure store -> load aes-key -> read file -> AES-256-GCM(AAD=name)
//!               -> EncryptedContainer -> atomic write
//! decrypt_file: load aes-key -> read container -> parse -> verify+decrypt -> atomic write
//! ```
//!
//! [`KemSession`] is independent of the file workflow: it turns an ML-KEM
//! exchange into a labelled AES-256 session key.

pub mod session;
pub mod workflow;

pub use session::{key_fingerprint, KemSession, SealedSession, KEM_SESSION_LABEL};
pub use workflow::EncryptionWorkflow;
