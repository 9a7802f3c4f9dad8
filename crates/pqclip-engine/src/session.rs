//! KEM-derived session keys
//!
//! The sender encapsulates against a recipient's public key; both sides run
//! the shared secret through HKDF-SHA256 under [`KEM_SESSION_LABEL`]. The
//! raw shared secret never leaves this module.

use pqclip_core::PqclipResult;
use pqclip_crypto::{
    decapsulate, encapsulate, CryptoContext, KemCiphertext, KemPrivateKey, KemPublicKey,
    SymmetricKey,
};

/// HKDF context label separating session keys from any other KEM use
pub const KEM_SESSION_LABEL: &[u8] = b"pqclip/kem-session/v1";

/// Sender's half: the ciphertext to ship and the key it derived.
#[derive(Debug)]
pub struct SealedSession {
    pub ciphertext: KemCiphertext,
    pub key: SymmetricKey,
}

#[derive(Debug, Clone)]
pub struct KemSession {
    ctx: CryptoContext,
}

impl KemSession {
    pub fn new(ctx: CryptoContext) -> Self {
        Self { ctx }
    }

    pub fn seal_session_key(&self, recipient: &KemPublicKey) -> PqclipResult<SealedSession> {
        let enc = encapsulate(&self.ctx, recipient)?;
        let key = enc.shared_secret.derive_key(KEM_SESSION_LABEL)?;
        tracing::debug!(recipient = %recipient.fingerprint(), "sealed KEM session key");
        Ok(SealedSession {
            ciphertext: enc.ciphertext,
            key,
        })
    }

    pub fn open_session_key(&self, private: &KemPrivateKey, ciphertext: &KemCiphertext) -> PqclipResult<SymmetricKey> {
        decapsulate(private, ciphertext)?.derive_key(KEM_SESSION_LABEL)
    }
}

/// Short BLAKE3 fingerprint of a key, for comparing two sides without
/// printing the key itself.
pub fn key_fingerprint(key: &SymmetricKey) -> String {
    blake3::derive_key("pqclip key fingerprint v1", key.as_bytes())
        .iter()
        .take(8)
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pqclip_crypto::{generate_keypair, KdfParams};

    fn session() -> (CryptoContext, KemSession) {
        let ctx = CryptoContext::new(KdfParams::default());
        (ctx.clone(), KemSession::new(ctx))
    }

    #[test]
    fn test_both_sides_derive_same_key() {
        let (ctx, s) = session();
        let pair = generate_keypair(&ctx).unwrap();

        let sealed = s.seal_session_key(&pair.public).unwrap();
        let opened = s.open_session_key(&pair.private, &sealed.ciphertext).unwrap();

        assert_eq!(sealed.key.as_bytes(), opened.as_bytes());
        assert_eq!(key_fingerprint(&sealed.key), key_fingerprint(&opened));
    }

    #[test]
    fn test_session_key_is_not_raw_secret() {
        let (ctx, s) = session();
        let pair = generate_keypair(&ctx).unwrap();
        let sealed = s.seal_session_key(&pair.public).unwrap();

        let other_label = decapsulate(&pair.private, &sealed.ciphertext)
            .unwrap()
            .derive_key(b"pqclip/other/v1")
            .unwrap();
        assert_ne!(other_label.as_bytes(), sealed.key.as_bytes());
    }

    #[test]
    fn test_wrong_recipient_gets_different_key() {
        let (ctx, s) = session();
        let alice = generate_keypair(&ctx).unwrap();
        let bob = generate_keypair(&ctx).unwrap();

        let sealed = s.seal_session_key(&alice.public).unwrap();
        let opened = s.open_session_key(&bob.private, &sealed.ciphertext).unwrap();
        assert_ne!(sealed.key.as_bytes(), opened.as_bytes());
    }

    #[test]
    fn test_fingerprint_shape() {
        let fp = key_fingerprint(&SymmetricKey::from_bytes([7u8; 32]));
        assert_eq!(fp.len(), 16);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(fp, key_fingerprint(&SymmetricKey::from_bytes([8u8; 32])));
    }
}
