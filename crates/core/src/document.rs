//! Document edits as submitted by callers.

use crate::error::{Result, RevisionError};
use crate::revision::Revision;
use serde_json::{Map, Value};

/// Reserved field carrying the document id.
pub const ID_FIELD: &str = "_id";
/// Reserved field carrying the parent revision of an edit.
pub const REV_FIELD: &str = "_rev";
/// Reserved field marking an edit as a deletion.
pub const DELETED_FIELD: &str = "_deleted";

/// A single edit: target id, the revision it builds on, and the new body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    /// Revision this edit replaces; `None` when creating a document.
    pub rev: Option<Revision>,
    pub deleted: bool,
    /// Body without the reserved fields.
    pub body: Map<String, Value>,
}

impl Document {
    /// An empty, live edit for `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rev: None,
            deleted: false,
            body: Map::new(),
        }
    }

    /// Set the parent revision.
    pub fn with_rev(mut self, rev: Revision) -> Self {
        self.rev = Some(rev);
        self
    }

    /// Set a body field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }

    /// Turn this edit into a deletion.
    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    /// Split a JSON object into reserved fields and body.
    ///
    /// A missing `_id` yields an empty id; rejecting it is left to the writer.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(mut body) = value else {
            return Err(RevisionError::InvalidDocument(
                "document must be a JSON object".to_string(),
            ));
        };

        let id = match body.remove(ID_FIELD) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(id)) => id,
            Some(other) => {
                return Err(RevisionError::InvalidDocument(format!(
                    "_id must be a string, got {other}"
                )))
            }
        };

        let rev = match body.remove(REV_FIELD) {
            None | Some(Value::Null) => None,
            Some(Value::String(rev)) => Some(rev.parse()?),
            Some(other) => return Err(RevisionError::InvalidRev(other.to_string())),
        };

        let deleted = match body.remove(DELETED_FIELD) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(deleted)) => deleted,
            Some(other) => {
                return Err(RevisionError::InvalidDocument(format!(
                    "_deleted must be a boolean, got {other}"
                )))
            }
        };

        Ok(Self {
            id,
            rev,
            deleted,
            body,
        })
    }
}

/// Attach `_id` and `_rev` to a stored body.
pub fn with_identity(mut body: Map<String, Value>, id: &str, rev: &Revision) -> Value {
    body.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    body.insert(REV_FIELD.to_string(), Value::String(rev.to_string()));
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_splits_reserved_fields() {
        let doc = Document::from_json(json!({
            "_id": "doc-id-1",
            "_rev": "1-aa",
            "_deleted": true,
            "key": "value"
        }))
        .unwrap();

        assert_eq!(doc.id, "doc-id-1");
        assert_eq!(doc.rev, Some(Revision::new(1, "aa")));
        assert!(doc.deleted);
        assert_eq!(Value::Object(doc.body), json!({"key": "value"}));
    }

    #[test]
    fn test_from_json_defaults() {
        let doc = Document::from_json(json!({"key": 1})).unwrap();
        assert_eq!(doc, Document::new("").with_field("key", 1));
    }

    #[test]
    fn test_from_json_rejects_bad_shapes() {
        assert!(matches!(
            Document::from_json(json!([1, 2])),
            Err(RevisionError::InvalidDocument(_))
        ));
        assert!(matches!(
            Document::from_json(json!({"_id": 7})),
            Err(RevisionError::InvalidDocument(_))
        ));
        assert!(matches!(
            Document::from_json(json!({"_id": "a", "_rev": "bogus"})),
            Err(RevisionError::InvalidRev(_))
        ));
        assert!(matches!(
            Document::from_json(json!({"_id": "a", "_deleted": "yes"})),
            Err(RevisionError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_with_identity() {
        let body = Document::new("a").with_field("k", "v").body;
        let doc = with_identity(body, "a", &Revision::new(2, "bb"));
        assert_eq!(doc, json!({"_id": "a", "_rev": "2-bb", "k": "v"}));
    }
}
