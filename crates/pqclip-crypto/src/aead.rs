//! AES-256-GCM encryption/decryption
//!
//! Output layout produced by the cipher:
//! ```text
//! ciphertext = [N bytes: encrypted payload][16 bytes: GCM tag]
//! nonce      = 12 random bytes, drawn fresh from the CryptoContext per call
//! ```
//!
//! Optional AAD is authenticated but not encrypted. The workflow binds the
//! original file name this way, so a container with a swapped name fails to
//! open.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use pqclip_core::{PqclipError, PqclipResult};
use zeroize::Zeroizing;

use crate::context::CryptoContext;
use crate::keys::SymmetricKey;
use crate::NONCE_SIZE;

/// Ciphertext with its embedded tag, plus the nonce it was sealed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AeadCiphertext {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_SIZE],
}

pub fn encrypt(ctx: &CryptoContext, key: &SymmetricKey, plaintext: &[u8]) -> PqclipResult<AeadCiphertext> {
    encrypt_with_aad(ctx, key, plaintext, &[])
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
pub fn encrypt_with_aad(
    ctx: &CryptoContext,
    key: &SymmetricKey,
    plaintext: &[u8],
    aad: &[u8],
) -> PqclipResult<AeadCiphertext> {
    let nonce: [u8; NONCE_SIZE] = ctx.random_array()?;
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| {
            tracing::warn!(error = %e, "AES-GCM encryption failed");
            PqclipError::CryptoFailure(format!("AES-GCM encryption failed: {e}"))
        })?;

    Ok(AeadCiphertext { ciphertext, nonce })
}

pub fn decrypt(key: &SymmetricKey, ciphertext: &[u8], nonce: &[u8]) -> PqclipResult<Zeroizing<Vec<u8>>> {
    decrypt_with_aad(key, ciphertext, nonce, &[])
}

/// Decrypt and verify. The returned plaintext is wiped when dropped.
///
/// A nonce of the wrong size is `InvalidNonceLength`; any tag mismatch
/// (wrong key, tampered bytes, different AAD) is `AuthenticationFailure`.
pub fn decrypt_with_aad(
    key: &SymmetricKey,
    ciphertext: &[u8],
    nonce: &[u8],
    aad: &[u8],
) -> PqclipResult<Zeroizing<Vec<u8>>> {
    if nonce.len() != NONCE_SIZE {
        return Err(PqclipError::InvalidNonceLength {
            expected: NONCE_SIZE,
            actual: nonce.len(),
        });
    }

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| {
            tracing::warn!(bytes = ciphertext.len(), "AES-GCM tag verification failed");
            PqclipError::AuthenticationFailure
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{fast_params, test_context, BrokenEntropy};
    use crate::keys::generate_key;
    use crate::TAG_SIZE;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let ctx = test_context();
        let key = generate_key(&ctx).unwrap();
        let plaintext = b"hello, encrypted world!";

        let sealed = encrypt(&ctx, &key, plaintext).unwrap();
        let opened = decrypt(&key, &sealed.ciphertext, &sealed.nonce).unwrap();

        assert_eq!(&opened[..], plaintext);
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let ctx = test_context();
        let key = generate_key(&ctx).unwrap();

        let sealed = encrypt(&ctx, &key, b"").unwrap();
        assert_eq!(sealed.ciphertext.len(), TAG_SIZE);
        let opened = decrypt(&key, &sealed.ciphertext, &sealed.nonce).unwrap();
        assert!(opened.is_empty());
    }

    #[test]
    fn test_ciphertext_size() {
        let ctx = test_context();
        let key = generate_key(&ctx).unwrap();
        let sealed = encrypt(&ctx, &key, &[0u8; 1000]).unwrap();

        // payload (1000) + tag (16)
        assert_eq!(sealed.ciphertext.len(), 1000 + TAG_SIZE);
    }

    #[test]
    fn test_nonces_never_repeat() {
        let ctx = test_context();
        let key = generate_key(&ctx).unwrap();

        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let sealed = encrypt(&ctx, &key, b"same plaintext").unwrap();
            assert!(seen.insert(sealed.nonce), "nonce reused");
        }
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let ctx = test_context();
        let key1 = generate_key(&ctx).unwrap();
        let key2 = generate_key(&ctx).unwrap();

        let sealed = encrypt(&ctx, &key1, b"secret data").unwrap();
        let result = decrypt(&key2, &sealed.ciphertext, &sealed.nonce);

        assert!(matches!(result, Err(PqclipError::AuthenticationFailure)));
    }

    #[test]
    fn test_every_ciphertext_bit_flip_detected() {
        let ctx = test_context();
        let key = generate_key(&ctx).unwrap();
        let sealed = encrypt(&ctx, &key, b"clip").unwrap();

        for byte in 0..sealed.ciphertext.len() {
            for bit in 0..8 {
                let mut tampered = sealed.ciphertext.clone();
                tampered[byte] ^= 1 << bit;
                assert!(
                    matches!(
                        decrypt(&key, &tampered, &sealed.nonce),
                        Err(PqclipError::AuthenticationFailure)
                    ),
                    "flip of bit {bit} in byte {byte} went unnoticed"
                );
            }
        }
    }

    #[test]
    fn test_every_nonce_bit_flip_detected() {
        let ctx = test_context();
        let key = generate_key(&ctx).unwrap();
        let sealed = encrypt(&ctx, &key, b"clip").unwrap();

        for byte in 0..NONCE_SIZE {
            for bit in 0..8 {
                let mut nonce = sealed.nonce;
                nonce[byte] ^= 1 << bit;
                assert!(matches!(
                    decrypt(&key, &sealed.ciphertext, &nonce),
                    Err(PqclipError::AuthenticationFailure)
                ));
            }
        }
    }

    #[test]
    fn test_aad_mismatch_fails() {
        let ctx = test_context();
        let key = generate_key(&ctx).unwrap();
        let sealed = encrypt_with_aad(&ctx, &key, b"frames", b"holiday.mp4").unwrap();

        let ok = decrypt_with_aad(&key, &sealed.ciphertext, &sealed.nonce, b"holiday.mp4").unwrap();
        assert_eq!(&ok[..], b"frames");

        assert!(matches!(
            decrypt_with_aad(&key, &sealed.ciphertext, &sealed.nonce, b"renamed.mp4"),
            Err(PqclipError::AuthenticationFailure)
        ));
        assert!(matches!(
            decrypt(&key, &sealed.ciphertext, &sealed.nonce),
            Err(PqclipError::AuthenticationFailure)
        ));
    }

    #[test]
    fn test_wrong_nonce_length() {
        let ctx = test_context();
        let key = generate_key(&ctx).unwrap();
        let sealed = encrypt(&ctx, &key, b"data").unwrap();

        for len in [0, 8, 11, 13, 24] {
            match decrypt(&key, &sealed.ciphertext, &vec![0u8; len]) {
                Err(PqclipError::InvalidNonceLength { expected, actual }) => {
                    assert_eq!(expected, NONCE_SIZE);
                    assert_eq!(actual, len);
                }
                other => panic!("expected InvalidNonceLength, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_entropy_failure_is_crypto_failure() {
        let good = test_context();
        let key = generate_key(&good).unwrap();
        let broken = CryptoContext::with_entropy(Arc::new(BrokenEntropy), fast_params());

        assert!(matches!(
            encrypt(&broken, &key, b"data"),
            Err(PqclipError::CryptoFailure(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn roundtrip_any_plaintext(
            key_bytes in any::<[u8; 32]>(),
            plaintext in proptest::collection::vec(any::<u8>(), 0..=4096),
        ) {
            let ctx = test_context();
            let key = SymmetricKey::from_bytes(key_bytes);
            let sealed = encrypt(&ctx, &key, &plaintext).unwrap();
            let opened = decrypt(&key, &sealed.ciphertext, &sealed.nonce).unwrap();
            prop_assert_eq!(&opened[..], &plaintext[..]);
        }
    }
}
