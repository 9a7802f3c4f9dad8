//! HKDF-SHA256 (RFC 5869) extract-and-expand
//!
//! An empty salt is replaced by a hash-sized block of zero bytes, so the
//! extract step is always keyed.

use hmac::{Hmac, Mac};
use pqclip_core::{PqclipError, PqclipResult};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::keys::SymmetricKey;
use crate::{HASH_SIZE, KEY_SIZE};

type HmacSha256 = Hmac<Sha256>;

/// Largest output HKDF can produce with a 256-bit hash
pub const MAX_OUTPUT_LEN: usize = 255 * HASH_SIZE;

/// Derive `output_len` bytes of key material from `secret`.
///
/// Fails with `InvalidInput` if `secret` is empty or `output_len` is outside
/// `1..=MAX_OUTPUT_LEN`. The intermediate PRK is wiped before returning.
pub fn derive(
    secret: &[u8],
    salt: &[u8],
    info: &[u8],
    output_len: usize,
) -> PqclipResult<Zeroizing<Vec<u8>>> {
    if secret.is_empty() {
        return Err(PqclipError::InvalidInput("HKDF secret must not be empty".into()));
    }
    if output_len == 0 || output_len > MAX_OUTPUT_LEN {
        return Err(PqclipError::InvalidInput(format!(
            "HKDF output length {output_len} outside 1..={MAX_OUTPUT_LEN}"
        )));
    }

    let prk = extract(salt, secret)?;
    let okm = expand(&prk, info, output_len)?;
    tracing::trace!(bytes = output_len, "derived key material with HKDF-SHA256");
    Ok(okm)
}

/// Derive a 256-bit symmetric key.
pub fn derive_key32(secret: &[u8], salt: &[u8], info: &[u8]) -> PqclipResult<SymmetricKey> {
    let okm = derive(secret, salt, info, KEY_SIZE)?;
    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&okm);
    Ok(SymmetricKey::from_bytes(bytes))
}

fn extract(salt: &[u8], ikm: &[u8]) -> PqclipResult<Zeroizing<[u8; HASH_SIZE]>> {
    let zero_salt = [0u8; HASH_SIZE];
    let key = if salt.is_empty() { &zero_salt[..] } else { salt };

    let mut mac = new_mac(key)?;
    mac.update(ikm);
    Ok(Zeroizing::new(mac.finalize().into_bytes().into()))
}

fn expand(prk: &[u8; HASH_SIZE], info: &[u8], output_len: usize) -> PqclipResult<Zeroizing<Vec<u8>>> {
    let rounds = output_len.div_ceil(HASH_SIZE);
    let mut okm = Zeroizing::new(Vec::with_capacity(rounds * HASH_SIZE));
    let mut previous: Zeroizing<[u8; HASH_SIZE]> = Zeroizing::new([0u8; HASH_SIZE]);

    for round in 1..=rounds {
        let mut mac = new_mac(prk)?;
        // t_0 is empty
        if round > 1 {
            mac.update(&previous[..]);
        }
        mac.update(info);
        mac.update(&[round as u8]);
        *previous = mac.finalize().into_bytes().into();
        okm.extend_from_slice(&previous[..]);
    }

    okm.truncate(output_len);
    Ok(okm)
}

fn new_mac(key: &[u8]) -> PqclipResult<HmacSha256> {
    <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| PqclipError::CryptoFailure(format!("HMAC init failed: {e}")))
}
