//! Blake3 digests used as revision hashes.

use std::fmt;

/// Number of digest bytes kept in a revision hash.
pub const REV_HASH_LEN: usize = 16;

/// Truncated Blake3 digest naming one revision of a document.
///
/// Rendered as 32 lowercase hex characters, the same width revision ids
/// have always had in this layout.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RevHash(pub [u8; REV_HASH_LEN]);

impl RevHash {
    /// Convert to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != REV_HASH_LEN {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; REV_HASH_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for RevHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RevHash({})", &self.to_hex()[..8])
    }
}

impl fmt::Display for RevHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Digest a candidate revision from its parent, deletion flag and encoded body.
///
/// The body is expected to be canonical JSON (`serde_json::Map` keeps keys
/// sorted), so equal edits on the same parent produce equal hashes.
pub fn revision_digest(parent: Option<&str>, deleted: bool, body: &[u8]) -> RevHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(parent.unwrap_or_default().as_bytes());
    hasher.update(&[0x00, u8::from(deleted)]);
    hasher.update(body);

    let digest: [u8; 32] = hasher.finalize().into();
    let mut truncated = [0u8; REV_HASH_LEN];
    truncated.copy_from_slice(&digest[..REV_HASH_LEN]);
    RevHash(truncated)
}
