//! XChaCha20-Poly1305 sealing under a password-derived [`StoreKey`]
//!
//! Used for the key-store payload. The 24-byte nonce is large enough to be
//! drawn at random on every save without tracking state.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use pqclip_core::{PqclipError, PqclipResult};
use zeroize::Zeroizing;

use crate::context::CryptoContext;
use crate::password::StoreKey;

/// XChaCha20 nonce size
pub const ENVELOPE_NONCE_SIZE: usize = 24;

/// A sealed blob and its nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub nonce: [u8; ENVELOPE_NONCE_SIZE],
    pub sealed: Vec<u8>,
}

pub fn seal(ctx: &CryptoContext, key: &StoreKey, plaintext: &[u8], aad: &[u8]) -> PqclipResult<Envelope> {
    let nonce: [u8; ENVELOPE_NONCE_SIZE] = ctx.random_array()?;
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    let sealed = cipher
        .encrypt(XNonce::from_slice(&nonce), Payload { msg: plaintext, aad })
        .map_err(|e| PqclipError::CryptoFailure(format!("envelope seal failed: {e}")))?;

    Ok(Envelope { nonce, sealed })
}

/// Open a sealed blob. A wrong key or tampered bytes is `AuthenticationFailure`.
pub fn open(key: &StoreKey, envelope: &Envelope, aad: &[u8]) -> PqclipResult<Zeroizing<Vec<u8>>> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    cipher
        .decrypt(
            XNonce::from_slice(&envelope.nonce),
            Payload {
                msg: &envelope.sealed,
                aad,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| PqclipError::AuthenticationFailure)
}
