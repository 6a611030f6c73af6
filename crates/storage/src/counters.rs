//! Global bookkeeping counters.

use crate::backend::ByteStore;
use crate::error::{Result, StoreError};
use crate::keys::COUNTERS_KEY;
use serde::Serialize;

/// Document count and update sequence of one store.
///
/// Persisted as 8 bytes: `doc_count` then `update_seq`, both little-endian.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// Documents whose winning revision is not deleted.
    pub doc_count: u32,
    /// Highest sequence number handed out.
    pub update_seq: u32,
}

impl Counters {
    pub const ENCODED_LEN: usize = 8;

    /// Read the persisted counters; a fresh store starts at zero.
    pub fn load<S: ByteStore + ?Sized>(store: &S) -> Result<Self> {
        match store.get(COUNTERS_KEY)? {
            Some(bytes) => Self::decode(&bytes),
            None => Ok(Self::default()),
        }
    }

    /// Write this snapshot to the store.
    pub fn persist<S: ByteStore + ?Sized>(&self, store: &S) -> Result<()> {
        store.put(COUNTERS_KEY, &self.encode())
    }

    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut bytes = [0u8; Self::ENCODED_LEN];
        bytes[..4].copy_from_slice(&self.doc_count.to_le_bytes());
        bytes[4..].copy_from_slice(&self.update_seq.to_le_bytes());
        bytes
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; Self::ENCODED_LEN] = bytes.try_into().map_err(|_| {
            StoreError::Corruption(format!(
                "counters must be {} bytes, found {}",
                Self::ENCODED_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self {
            doc_count: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            update_seq: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }

    /// Counters after one more write that changes the live document count by
    /// `doc_delta`.
    pub fn advance(&self, doc_delta: i32) -> Result<Self> {
        let update_seq = self
            .update_seq
            .checked_add(1)
            .ok_or(StoreError::CounterOverflow("update_seq"))?;
        let doc_count = self
            .doc_count
            .checked_add_signed(doc_delta)
            .ok_or(StoreError::CounterOverflow("doc_count"))?;
        Ok(Self {
            doc_count,
            update_seq,
        })
    }
}
