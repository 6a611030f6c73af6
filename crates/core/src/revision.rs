//! Revision identifiers (`<pos>-<hash>`).

use crate::error::{Result, RevisionError};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A revision identifier: generation number plus revision hash.
///
/// Ordering is by generation first, then by hash, which is also the
/// tie-break order used when picking a winning revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Revision {
    /// Generation, starting at 1 for a document's first revision.
    pub pos: u64,
    /// Revision hash.
    pub hash: String,
}

impl Revision {
    pub fn new(pos: u64, hash: impl Into<String>) -> Self {
        Self {
            pos,
            hash: hash.into(),
        }
    }

    /// The revision that follows this one with the given hash.
    pub fn child(&self, hash: impl Into<String>) -> Self {
        Self::new(self.pos + 1, hash)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.pos, self.hash)
    }
}

impl FromStr for Revision {
    type Err = RevisionError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || RevisionError::InvalidRev(s.to_string());
        let (pos, hash) = s.split_once('-').ok_or_else(invalid)?;
        let pos: u64 = pos.parse().map_err(|_| invalid())?;
        if pos == 0 || hash.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(pos, hash))
    }
}

impl Serialize for Revision {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Revision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
