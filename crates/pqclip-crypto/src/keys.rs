//! Symmetric key material and explicit wiping

use pqclip_core::{PqclipError, PqclipResult};
use zeroize::Zeroize;

use crate::context::CryptoContext;
use crate::KEY_SIZE;

/// A 256-bit AES key. Zeroized on drop.
///
/// Deliberately not `Clone`: each call path owns exactly one copy.
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    pub const ALGORITHM: &'static str = "AES-256";

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("algorithm", &Self::ALGORITHM)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Build a key from caller-supplied material; must be exactly 32 bytes.
pub fn create_key(material: &[u8]) -> PqclipResult<SymmetricKey> {
    if material.len() != KEY_SIZE {
        return Err(PqclipError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: material.len(),
        });
    }
    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(material);
    Ok(SymmetricKey::from_bytes(bytes))
}

/// Generate a random 256-bit key from the context's entropy source.
pub fn generate_key(ctx: &CryptoContext) -> PqclipResult<SymmetricKey> {
    let mut bytes = [0u8; KEY_SIZE];
    if let Err(e) = ctx.fill_random(&mut bytes) {
        bytes.zeroize();
        return Err(PqclipError::KeyGenFailure(e.to_string()));
    }
    Ok(SymmetricKey::from_bytes(bytes))
}

/// Overwrite a buffer with zeros.
pub fn wipe(buf: &mut [u8]) {
    buf.zeroize();
}
