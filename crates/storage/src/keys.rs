//! Physical key layout.
//!
//! | Key | Value |
//! |---|---|
//! | `document-store/<id>` | JSON `DocumentMetadata` |
//! | `by-sequence/<seq, 16 digits>` | JSON revision body |
//! | `meta-store/doc_count+update_seq` | two little-endian u32 |
//!
//! The three prefixes are disjoint and none is a prefix of another, so the
//! metadata namespace can be scanned on its own.

/// Prefix of document metadata keys.
pub const METADATA_PREFIX: &[u8] = b"document-store/";

/// Prefix of revision body keys.
pub const SEQUENCE_PREFIX: &[u8] = b"by-sequence/";

/// Key holding the persisted counters.
pub const COUNTERS_KEY: &[u8] = b"meta-store/doc_count+update_seq";

/// Decimal width of sequence numbers in body keys.
///
/// Zero padding keeps byte order equal to numeric order.
pub const SEQUENCE_WIDTH: usize = 16;

/// Metadata key for a document id. The empty id is the namespace's lower bound.
pub fn metadata_key(id: &str) -> Vec<u8> {
    let mut key = METADATA_PREFIX.to_vec();
    key.extend_from_slice(id.as_bytes());
    key
}

/// Body key for a sequence number.
pub fn data_key(seq: u32) -> Vec<u8> {
    format!("by-sequence/{seq:0width$}", width = SEQUENCE_WIDTH).into_bytes()
}

pub fn is_metadata_key(key: &[u8]) -> bool {
    key.starts_with(METADATA_PREFIX)
}

/// Document id of a metadata key; `None` outside the namespace or for
/// non-UTF-8 ids.
pub fn metadata_id(key: &[u8]) -> Option<&str> {
    key.strip_prefix(METADATA_PREFIX)
        .and_then(|id| std::str::from_utf8(id).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_construction() {
        assert_eq!(metadata_key("doc-id-1"), b"document-store/doc-id-1");
        assert_eq!(metadata_key(""), METADATA_PREFIX);
        assert_eq!(data_key(1), b"by-sequence/0000000000000001");
        assert_eq!(data_key(u32::MAX), b"by-sequence/0000004294967295");
    }

    #[test]
    fn test_sequence_keys_sort_numerically() {
        let seqs = [0u32, 1, 9, 10, 99, 100, 65_536, u32::MAX];
        for pair in seqs.windows(2) {
            assert!(data_key(pair[0]) < data_key(pair[1]));
        }
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        for prefix in [SEQUENCE_PREFIX, COUNTERS_KEY] {
            assert!(!is_metadata_key(prefix));
            assert!(!prefix.starts_with(METADATA_PREFIX));
            assert!(!METADATA_PREFIX.starts_with(prefix));
        }
        assert!(!COUNTERS_KEY.starts_with(SEQUENCE_PREFIX));
        assert!(!is_metadata_key(&data_key(5)));
    }

    #[test]
    fn test_metadata_id() {
        assert_eq!(metadata_id(&metadata_key("a/b")), Some("a/b"));
        assert_eq!(metadata_id(&metadata_key("")), Some(""));
        assert_eq!(metadata_id(&data_key(1)), None);
        assert_eq!(metadata_id(b"document-store/\xff"), None);
    }
}
