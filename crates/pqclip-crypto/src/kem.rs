//! ML-KEM-1024 (FIPS 203) key encapsulation
//!
//! Encodings are the raw FIPS 203 byte strings: 1568-byte encapsulation
//! (public) key, 3168-byte decapsulation (private) key, 1568-byte ciphertext.
//!
//! Decapsulation uses implicit rejection. A well-formed ciphertext that was
//! not produced for this key decapsulates to a pseudorandom secret instead of
//! an error, so every well-formed input takes the same path. Only a
//! ciphertext of the wrong length is rejected outright.

use fips203::ml_kem_1024;
use fips203::traits::{Decaps, Encaps, KeyGen, SerDes};
use pqclip_core::{PqclipError, PqclipResult};
use zeroize::{Zeroize, Zeroizing};

use crate::context::CryptoContext;
use crate::kdf;
use crate::keys::SymmetricKey;

pub const PUBLIC_KEY_SIZE: usize = 1568;
pub const PRIVATE_KEY_SIZE: usize = 3168;
pub const CIPHERTEXT_SIZE: usize = 1568;
pub const SHARED_SECRET_SIZE: usize = 32;

/// Parameter set name, for logs and key-file metadata
pub const ALGORITHM: &str = "ML-KEM-1024";

/// Encapsulation key. Safe to publish.
#[derive(Clone, PartialEq, Eq)]
pub struct KemPublicKey {
    bytes: [u8; PUBLIC_KEY_SIZE],
}

impl KemPublicKey {
    /// Decode and validate a raw encapsulation key.
    pub fn from_bytes(bytes: &[u8]) -> PqclipResult<Self> {
        let raw: [u8; PUBLIC_KEY_SIZE] = bytes.try_into().map_err(|_| {
            PqclipError::InvalidPublicKey(format!(
                "expected {PUBLIC_KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        ml_kem_1024::EncapsKey::try_from_bytes(raw)
            .map_err(|e| PqclipError::InvalidPublicKey(e.to_string()))?;
        Ok(Self { bytes: raw })
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.bytes
    }

    /// Short BLAKE3 fingerprint for display and logs.
    pub fn fingerprint(&self) -> String {
        blake3::hash(&self.bytes).to_hex().as_str()[..16].to_string()
    }

    fn to_encaps_key(&self) -> PqclipResult<ml_kem_1024::EncapsKey> {
        ml_kem_1024::EncapsKey::try_from_bytes(self.bytes)
            .map_err(|e| PqclipError::InvalidPublicKey(e.to_string()))
    }
}

impl std::fmt::Debug for KemPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KemPublicKey")
            .field("algorithm", &ALGORITHM)
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Decapsulation key. Lives only inside the password-protected store.
pub struct KemPrivateKey {
    bytes: Zeroizing<Vec<u8>>,
}

impl KemPrivateKey {
    /// Decode and validate a raw decapsulation key.
    ///
    /// Private keys are only ever read back from a key store, so a bad
    /// encoding means the store is damaged: `CorruptStore`.
    pub fn from_bytes(bytes: &[u8]) -> PqclipResult<Self> {
        let mut raw: [u8; PRIVATE_KEY_SIZE] = bytes.try_into().map_err(|_| {
            PqclipError::CorruptStore(format!(
                "KEM private key: expected {PRIVATE_KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        let checked = ml_kem_1024::DecapsKey::try_from_bytes(raw);
        raw.zeroize();
        checked.map_err(|e| PqclipError::CorruptStore(format!("KEM private key: {e}")))?;
        Ok(Self {
            bytes: Zeroizing::new(bytes.to_vec()),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn to_decaps_key(&self) -> PqclipResult<ml_kem_1024::DecapsKey> {
        let mut raw = Zeroizing::new([0u8; PRIVATE_KEY_SIZE]);
        raw.copy_from_slice(&self.bytes);
        ml_kem_1024::DecapsKey::try_from_bytes(*raw)
            .map_err(|e| PqclipError::CorruptStore(format!("KEM private key: {e}")))
    }
}

impl std::fmt::Debug for KemPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KemPrivateKey")
            .field("algorithm", &ALGORITHM)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug)]
pub struct KemKeyPair {
    pub public: KemPublicKey,
    pub private: KemPrivateKey,
}

/// Opaque KEM ciphertext. Length is checked at decapsulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KemCiphertext {
    bytes: Vec<u8>,
}

impl KemCiphertext {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Raw KEM output. Not a cipher key: the only way to use it is
/// [`SharedSecret::derive_key`].
pub struct SharedSecret {
    bytes: [u8; SHARED_SECRET_SIZE],
}

impl SharedSecret {
    /// Run the secret through HKDF-SHA256 with a context label.
    pub fn derive_key(&self, info: &[u8]) -> PqclipResult<SymmetricKey> {
        kdf::derive_key32(&self.bytes, &[], info)
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        self.bytes
            .iter()
            .zip(other.bytes.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Eq for SharedSecret {}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

#[derive(Debug)]
pub struct EncapsulationResult {
    pub shared_secret: SharedSecret,
    pub ciphertext: KemCiphertext,
}

/// Generate a fresh ML-KEM-1024 keypair seeded from the context.
pub fn generate_keypair(ctx: &CryptoContext) -> PqclipResult<KemKeyPair> {
    let mut d = Zeroizing::new([0u8; 32]);
    let mut z = Zeroizing::new([0u8; 32]);
    ctx.fill_random(&mut d[..])
        .and_then(|_| ctx.fill_random(&mut z[..]))
        .map_err(|e| PqclipError::KeyGenFailure(e.to_string()))?;

    let (ek, dk) = ml_kem_1024::KG::keygen_from_seed(*d, *z);
    let public = KemPublicKey {
        bytes: ek.into_bytes(),
    };
    let private = KemPrivateKey {
        bytes: Zeroizing::new(dk.into_bytes().to_vec()),
    };

    tracing::debug!(algorithm = ALGORITHM, fingerprint = %public.fingerprint(), "generated KEM keypair");
    Ok(KemKeyPair { public, private })
}

/// Produce a fresh shared secret and the ciphertext that carries it to the
/// holder of `recipient`'s private key.
pub fn encapsulate(ctx: &CryptoContext, recipient: &KemPublicKey) -> PqclipResult<EncapsulationResult> {
    let ek = recipient.to_encaps_key()?;
    let mut rng = ctx.seeded_rng()?;
    let (ssk, ct) = ek
        .try_encaps_with_rng(&mut rng)
        .map_err(|e| PqclipError::CryptoFailure(format!("ML-KEM encapsulation failed: {e}")))?;

    Ok(EncapsulationResult {
        shared_secret: SharedSecret {
            bytes: ssk.into_bytes(),
        },
        ciphertext: KemCiphertext {
            bytes: ct.into_bytes().to_vec(),
        },
    })
}

/// Recover the shared secret for `ciphertext`.
pub fn decapsulate(private: &KemPrivateKey, ciphertext: &KemCiphertext) -> PqclipResult<SharedSecret> {
    let raw: [u8; CIPHERTEXT_SIZE] = ciphertext.as_bytes().try_into().map_err(|_| {
        PqclipError::DecapsulationFailure(format!(
            "expected {CIPHERTEXT_SIZE}-byte ciphertext, got {}",
            ciphertext.as_bytes().len()
        ))
    })?;
    let ct = ml_kem_1024::CipherText::try_from_bytes(raw)
        .map_err(|e| PqclipError::DecapsulationFailure(e.to_string()))?;

    let dk = private.to_decaps_key()?;
    let ssk = dk.try_decaps(&ct).map_err(|e| {
        tracing::warn!(error = e, "ML-KEM decapsulation rejected input");
        PqclipError::DecapsulationFailure(e.to_string())
    })?;

    Ok(SharedSecret {
        bytes: ssk.into_bytes(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{fast_params, test_context, BrokenEntropy};
    use std::sync::Arc;

    #[test]
    fn test_encapsulate_decapsulate() {
        let ctx = test_context();
        let pair = generate_keypair(&ctx).unwrap();

        let enc = encapsulate(&ctx, &pair.public).unwrap();
        let recovered = decapsulate(&pair.private, &enc.ciphertext).unwrap();

        assert_eq!(recovered, enc.shared_secret);
        assert_eq!(enc.ciphertext.as_bytes().len(), CIPHERTEXT_SIZE);
    }

    #[test]
    fn test_each_encapsulation_is_fresh() {
        let ctx = test_context();
        let pair = generate_keypair(&ctx).unwrap();

        let a = encapsulate(&ctx, &pair.public).unwrap();
        let b = encapsulate(&ctx, &pair.public).unwrap();
        assert_ne!(a.ciphertext, b.ciphertext);
        assert_ne!(a.shared_secret, b.shared_secret);

        assert_eq!(decapsulate(&pair.private, &a.ciphertext).unwrap(), a.shared_secret);
        assert_eq!(decapsulate(&pair.private, &b.ciphertext).unwrap(), b.shared_secret);
    }

    #[test]
    fn test_wrong_private_key_implicitly_rejects() {
        let ctx = test_context();
        let alice = generate_keypair(&ctx).unwrap();
        let bob = generate_keypair(&ctx).unwrap();

        let enc = encapsulate(&ctx, &alice.public).unwrap();
        let wrong = decapsulate(&bob.private, &enc.ciphertext).unwrap();
        assert_ne!(wrong, enc.shared_secret);
    }

    #[test]
    fn test_tampered_ciphertext_implicitly_rejects() {
        let ctx = test_context();
        let pair = generate_keypair(&ctx).unwrap();
        let enc = encapsulate(&ctx, &pair.public).unwrap();

        let mut bytes = enc.ciphertext.as_bytes().to_vec();
        bytes[0] ^= 0x01;
        let tampered = KemCiphertext::from_bytes(bytes);

        let recovered = decapsulate(&pair.private, &tampered).unwrap();
        assert_ne!(recovered, enc.shared_secret);
    }

    #[test]
    fn test_wrong_length_ciphertext() {
        let ctx = test_context();
        let pair = generate_keypair(&ctx).unwrap();

        for len in [0, 32, CIPHERTEXT_SIZE - 1, CIPHERTEXT_SIZE + 1] {
            let ct = KemCiphertext::from_bytes(vec![0u8; len]);
            assert!(matches!(
                decapsulate(&pair.private, &ct),
                Err(PqclipError::DecapsulationFailure(_))
            ));
        }
    }

    #[test]
    fn test_public_key_encoding_roundtrip() {
        let ctx = test_context();
        let pair = generate_keypair(&ctx).unwrap();

        let decoded = KemPublicKey::from_bytes(pair.public.as_bytes()).unwrap();
        assert_eq!(decoded, pair.public);
        assert_eq!(decoded.fingerprint(), pair.public.fingerprint());
        assert_eq!(decoded.fingerprint().len(), 16);
    }

    #[test]
    fn test_public_key_bad_length() {
        for len in [0, 1184, PUBLIC_KEY_SIZE - 1, PUBLIC_KEY_SIZE + 1] {
            assert!(matches!(
                KemPublicKey::from_bytes(&vec![0u8; len]),
                Err(PqclipError::InvalidPublicKey(_))
            ));
        }
    }

    #[test]
    fn test_private_key_roundtrip_and_bad_length() {
        let ctx = test_context();
        let pair = generate_keypair(&ctx).unwrap();

        let reloaded = KemPrivateKey::from_bytes(pair.private.as_bytes()).unwrap();
        let enc = encapsulate(&ctx, &pair.public).unwrap();
        assert_eq!(decapsulate(&reloaded, &enc.ciphertext).unwrap(), enc.shared_secret);

        assert!(matches!(
            KemPrivateKey::from_bytes(&[0u8; 100]),
            Err(PqclipError::CorruptStore(_))
        ));
    }

    #[test]
    fn test_derived_keys_agree_and_are_label_separated() {
        let ctx = test_context();
        let pair = generate_keypair(&ctx).unwrap();
        let enc = encapsulate(&ctx, &pair.public).unwrap();
        let recovered = decapsulate(&pair.private, &enc.ciphertext).unwrap();

        let k1 = enc.shared_secret.derive_key(b"pqclip/test/a").unwrap();
        let k2 = recovered.derive_key(b"pqclip/test/a").unwrap();
        let k3 = recovered.derive_key(b"pqclip/test/b").unwrap();
        assert_eq!(k1.as_bytes(), k2.as_bytes());
        assert_ne!(k2.as_bytes(), k3.as_bytes());
    }

    #[test]
    fn test_keygen_entropy_failure() {
        let ctx = CryptoContext::with_entropy(Arc::new(BrokenEntropy), fast_params());
        assert!(matches!(generate_keypair(&ctx), Err(PqclipError::KeyGenFailure(_))));
    }

    #[test]
    fn test_debug_redacts_private_material() {
        let ctx = test_context();
        let pair = generate_keypair(&ctx).unwrap();
        let enc = encapsulate(&ctx, &pair.public).unwrap();

        assert!(format!("{:?}", pair.private).contains("REDACTED"));
        assert!(format!("{:?}", enc.shared_secret).contains("REDACTED"));
    }
}
