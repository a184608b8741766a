use crate::errors::CmsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type CollectionName = String;

/// Name of the primary key field on every stored document.
pub const ID_FIELD: &str = "_id";
/// Creation timestamp maintained by the store.
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Last-modification timestamp maintained by the store.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

const MAX_ID_LEN: usize = 128;

/// Document identifier. Generated ids are UUID v4 strings; imported documents may
/// carry any printable id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Validates a caller-supplied id.
    ///
    /// # Errors
    /// Returns `InvalidDocumentId` for empty, oversized or non-printable ids.
    pub fn parse(raw: &str) -> Result<Self, CmsError> {
        let s = raw.trim();
        if s.is_empty() || s.len() > MAX_ID_LEN || s.chars().any(char::is_control) {
            return Err(CmsError::InvalidDocumentId(raw.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_uuids() {
        let id = DocumentId::new();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn parse_rejects_blank_and_control_chars() {
        assert!(DocumentId::parse("  ").is_err());
        assert!(DocumentId::parse("a\u{0}b").is_err());
        assert_eq!(DocumentId::parse(" abc ").unwrap().as_str(), "abc");
    }
}
