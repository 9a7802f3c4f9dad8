//! Explicit crypto context: the single owner of randomness and password-hardening policy.
//!
//! Built once at process start and passed by reference to every component
//! that needs a nonce, a fresh key, or a KEM seed. Tests swap in their own
//! [`EntropySource`].

use std::sync::Arc;

use pqclip_core::{PqclipError, PqclipResult};
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use zeroize::Zeroizing;

use crate::password::KdfParams;

/// A cryptographically secure byte source.
pub trait EntropySource: Send + Sync {
    fn fill(&self, dest: &mut [u8]) -> PqclipResult<()>;
}

/// Operating-system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, dest: &mut [u8]) -> PqclipResult<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| PqclipError::CryptoFailure(format!("OS entropy unavailable: {e}")))
    }
}

#[derive(Clone)]
pub struct CryptoContext {
    entropy: Arc<dyn EntropySource>,
    kdf_params: KdfParams,
}

impl CryptoContext {
    /// Production context backed by the OS CSPRNG.
    pub fn new(kdf_params: KdfParams) -> Self {
        Self::with_entropy(Arc::new(OsEntropy), kdf_params)
    }

    pub fn with_entropy(entropy: Arc<dyn EntropySource>, kdf_params: KdfParams) -> Self {
        Self {
            entropy,
            kdf_params,
        }
    }

    /// Argon2id parameters applied when sealing a new key store.
    pub fn kdf_params(&self) -> &KdfParams {
        &self.kdf_params
    }

    pub fn fill_random(&self, dest: &mut [u8]) -> PqclipResult<()> {
        self.entropy.fill(dest)
    }

    pub fn random_array<const N: usize>(&self) -> PqclipResult<[u8; N]> {
        let mut out = [0u8; N];
        self.fill_random(&mut out)?;
        Ok(out)
    }

    /// A CSPRNG seeded from this context, for APIs that take an `RngCore`.
    pub(crate) fn seeded_rng(&self) -> PqclipResult<StdRng> {
        let mut seed = Zeroizing::new([0u8; 32]);
        self.fill_random(&mut seed[..])?;
        Ok(StdRng::from_seed(*seed))
    }
}

impl std::fmt::Debug for CryptoContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoContext")
            .field("entropy", &"<dyn EntropySource>")
            .field("kdf_params", &self.kdf_params)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_random_arrays_differ() {
        let ctx = test_context();
        let a: [u8; 32] = ctx.random_array().unwrap();
        let b: [u8; 32] = ctx.random_array().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_broken_entropy_surfaces_error() {
        let ctx = CryptoContext::with_entropy(Arc::new(BrokenEntropy), fast_params());
        let err = ctx.random_array::<12>().unwrap_err();
        assert!(matches!(err, PqclipError::CryptoFailure(_)));
    }

    #[test]
    fn test_injected_source_is_used() {
        let counter = Arc::new(CountingEntropy::default());
        let ctx = CryptoContext::with_entropy(counter.clone(), fast_params());
        ctx.random_array::<16>().unwrap();
        ctx.seeded_rng().unwrap();
        assert_eq!(counter.calls.load(Ordering::SeqCst), 2);
    }
}
