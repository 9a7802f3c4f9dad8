//! Whole-file encryption and decryption for one user.
//!
//! Plaintext, serialized container and key all live in wiping wrappers for
//! the duration of a call, so every return path (including `?`) clears them.

use std::path::{Path, PathBuf};

use pqclip_core::config::PqclipConfig;
use pqclip_core::{FileReport, PqclipError, PqclipResult, UserId};
use pqclip_crypto::{decrypt_with_aad, encrypt_with_aad, CryptoContext, EncryptedContainer, KdfParams};
use pqclip_secrets::{write_atomic, KeyStore};
use secrecy::SecretString;
use zeroize::Zeroizing;

#[derive(Debug, Clone)]
pub struct EncryptionWorkflow {
    ctx: CryptoContext,
    keystore: KeyStore,
    keystore_dir: PathBuf,
}

impl EncryptionWorkflow {
    pub fn new(ctx: CryptoContext, keystore_dir: impl Into<PathBuf>) -> Self {
        Self {
            keystore: KeyStore::new(ctx.clone()),
            ctx,
            keystore_dir: keystore_dir.into(),
        }
    }

    /// Production workflow: OS entropy, Argon2id cost and key directory from config.
    pub fn from_config(config: &PqclipConfig) -> Self {
        let ctx = CryptoContext::new(KdfParams::from(&config.crypto));
        Self::new(ctx, config.paths.keystore_dir.clone())
    }

    pub fn keystore(&self) -> &KeyStore {
        &self.keystore
    }

    pub fn context(&self) -> &CryptoContext {
        &self.ctx
    }

    /// `<keystore_dir>/<user>.keystore`
    pub fn store_path(&self, user: &UserId) -> PathBuf {
        KeyStore::path_for(&self.keystore_dir, user)
    }

    /// Encrypt `input` into a container at `output`.
    ///
    /// Creates the user's key store with a fresh key on first use. The input's
    /// file name is recorded in the container and bound as AAD.
    pub fn encrypt_file(
        &self,
        input: &Path,
        output: &Path,
        user: &UserId,
        password: &SecretString,
    ) -> PqclipResult<FileReport> {
        let store = self.store_path(user);
        if self.keystore.ensure(&store, password, user)? {
            tracing::info!(user = %user, "first encryption for user, key store created");
        }
        let key = self.keystore.load_symmetric_key(&store, password)?;

        let original_name = file_name(input)?;
        let plaintext = Zeroizing::new(std::fs::read(input)?);

        let sealed = encrypt_with_aad(&self.ctx, &key, &plaintext, original_name.as_bytes())?;
        let container = EncryptedContainer::new(original_name, sealed.nonce.to_vec(), sealed.ciphertext);
        let encoded = Zeroizing::new(container.serialize()?);

        write_atomic(output, &encoded)?;

        tracing::info!(
            user = %user,
            input = %input.display(),
            output = %output.display(),
            bytes = plaintext.len(),
            "file encrypted"
        );
        Ok(FileReport {
            original_name: container.original_name.clone(),
            plaintext_bytes: plaintext.len() as u64,
            container_bytes: encoded.len() as u64,
        })
    }

    /// Decrypt the container at `input` and write the plaintext to `output`.
    ///
    /// A user with no key store gets `EntryNotFound`; a wrong password, a
    /// tampered container or a renamed original name gets `AuthenticationFailure`.
    pub fn decrypt_file(
        &self,
        input: &Path,
        output: &Path,
        user: &UserId,
        password: &SecretString,
    ) -> PqclipResult<FileReport> {
        let key = self.keystore.load_symmetric_key(&self.store_path(user), password)?;

        let encoded = std::fs::read(input)?;
        let container = EncryptedContainer::deserialize(&encoded)?;
        let plaintext = decrypt_with_aad(
            &key,
            &container.ciphertext,
            &container.nonce,
            container.original_name.as_bytes(),
        )?;

        write_atomic(output, &plaintext)?;

        tracing::info!(
            user = %user,
            input = %input.display(),
            output = %output.display(),
            bytes = plaintext.len(),
            "file decrypted"
        );
        Ok(FileReport {
            original_name: container.original_name.clone(),
            plaintext_bytes: plaintext.len() as u64,
            container_bytes: encoded.len() as u64,
        })
    }
}

// The name is stored and authenticated verbatim, so it must be valid UTF-8.
fn file_name(path: &Path) -> PqclipResult<String> {
    let name = path
        .file_name()
        .ok_or_else(|| PqclipError::InvalidInput(format!("{} has no file name", path.display())))?;
    name.to_str().map(str::to_owned).ok_or_else(|| {
        PqclipError::InvalidInput(format!("{} has a non-UTF-8 file name", path.display()))
    })
}
