//! Encrypted container file format
//!
//! ```text
//! [u32 BE: name len][name bytes, UTF-8]
//! [u32 BE: nonce len][nonce bytes]
//! [u32 BE: ciphertext len][ciphertext bytes (payload || 16-byte tag)]
//! ```
//!
//! No magic, no padding. The parser consumes the buffer exactly: a prefix
//! that runs past the end, or bytes left over after the third field, make
//! the whole container malformed.

use pqclip_core::{PqclipError, PqclipResult};
use zeroize::{Zeroize, ZeroizeOnDrop};

const LEN_PREFIX: usize = 4;

#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct EncryptedContainer {
    pub original_name: String,
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

impl EncryptedContainer {
    pub fn new(original_name: impl Into<String>, nonce: Vec<u8>, ciphertext: Vec<u8>) -> Self {
        Self {
            original_name: original_name.into(),
            nonce,
            ciphertext,
        }
    }

    /// Total size of the serialized form.
    pub fn encoded_len(&self) -> usize {
        3 * LEN_PREFIX + self.original_name.len() + self.nonce.len() + self.ciphertext.len()
    }

    /// Encode the container. Deterministic for identical contents.
    pub fn serialize(&self) -> PqclipResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_len());
        for field in [self.original_name.as_bytes(), &self.nonce[..], &self.ciphertext[..]] {
            let len = u32::try_from(field.len()).map_err(|_| {
                PqclipError::InvalidInput(format!(
                    "container field of {} bytes exceeds the 32-bit length prefix",
                    field.len()
                ))
            })?;
            out.extend_from_slice(&len.to_be_bytes());
            out.extend_from_slice(field);
        }
        Ok(out)
    }

    pub fn deserialize(data: &[u8]) -> PqclipResult<Self> {
        let mut reader = Reader { data, pos: 0 };

        let name = reader.field("name")?;
        let nonce = reader.field("nonce")?;
        let ciphertext = reader.field("ciphertext")?;

        if reader.pos != data.len() {
            return Err(PqclipError::MalformedContainer(format!(
                "{} trailing bytes after ciphertext",
                data.len() - reader.pos
            )));
        }

        let original_name = std::str::from_utf8(name)
            .map_err(|e| PqclipError::MalformedContainer(format!("name is not UTF-8: {e}")))?
            .to_string();

        Ok(Self {
            original_name,
            nonce: nonce.to_vec(),
            ciphertext: ciphertext.to_vec(),
        })
    }
}

impl std::fmt::Debug for EncryptedContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedContainer")
            .field("original_name", &self.original_name)
            .field("nonce_len", &self.nonce.len())
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &str) -> PqclipResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                PqclipError::MalformedContainer(format!(
                    "{what}: need {n} bytes at offset {}, only {} remain",
                    self.pos,
                    self.data.len() - self.pos
                ))
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn field(&mut self, what: &str) -> PqclipResult<&'a [u8]> {
        let prefix = self.take(LEN_PREFIX, what)?;
        let len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        self.take(len, what)
    }
}
