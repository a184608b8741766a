use crate::document::Document;
use crate::errors::CmsError;
use crate::query::FindQuery;
use crate::types::DocumentId;
use bson::{Bson, Document as BsonDocument};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Declared shape of a collection: which fields must be present on create and
/// which string fields feed the text index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub text_index: Vec<String>,
}

impl CollectionSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    #[must_use]
    pub fn with_required(mut self, fields: &[&str]) -> Self {
        self.required = fields.iter().map(|s| (*s).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_text_index(mut self, fields: &[&str]) -> Self {
        self.text_index = fields.iter().map(|s| (*s).to_string()).collect();
        self
    }
}

pub struct Collection {
    name: String,
    schema: RwLock<CollectionSchema>,
    // insertion order is preserved; sorts are stable over it
    docs: RwLock<Vec<Document>>,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl Collection {
    pub fn new(schema: CollectionSchema) -> Self {
        Collection {
            name: schema.name.clone(),
            schema: RwLock::new(schema),
            docs: RwLock::new(Vec::new()),
        }
    }

    /// Starts a read query over this collection. Nothing runs until
    /// [`FindQuery::exec`] or [`FindQuery::count_documents`].
    pub fn find(self: &Arc<Self>) -> FindQuery {
        FindQuery::new(Arc::clone(self))
    }

    /// # Errors
    /// Returns `Validation` when a required field is missing/null or the `_id` is taken.
    pub fn insert_document(&self, document: Document) -> Result<DocumentId, CmsError> {
        self.check_required(&document.data)?;
        let mut docs = self.docs.write();
        if docs.iter().any(|d| d.id == document.id) {
            return Err(CmsError::Validation(format!("duplicate key: _id {}", document.id)));
        }
        let id = document.id.clone();
        docs.push(document);
        log::debug!("inserted {} into {}", id, self.name);
        Ok(id)
    }

    /// Reinstates a previously stored document without schema checks; an existing
    /// document with the same `_id` is replaced.
    pub fn restore_document(&self, document: Document) {
        let mut docs = self.docs.write();
        match docs.iter_mut().find(|d| d.id == document.id) {
            Some(slot) => *slot = document,
            None => docs.push(document),
        }
    }

    pub fn find_document(&self, id: &DocumentId) -> Option<Document> {
        self.docs.read().iter().find(|d| &d.id == id).cloned()
    }

    /// Merges `changes` into the stored document and returns the new version.
    pub fn update_document(&self, id: &DocumentId, changes: BsonDocument) -> Option<Document> {
        let mut docs = self.docs.write();
        let doc = docs.iter_mut().find(|d| &d.id == id)?;
        doc.apply_changes(changes);
        Some(doc.clone())
    }

    pub fn delete_document(&self, id: &DocumentId) -> bool {
        let mut docs = self.docs.write();
        let before = docs.len();
        docs.retain(|d| &d.id != id);
        docs.len() != before
    }

    /// Snapshot of every stored document in insertion order.
    pub fn documents(&self) -> Vec<Document> {
        self.docs.read().clone()
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    pub fn schema(&self) -> CollectionSchema {
        self.schema.read().clone()
    }

    pub fn set_schema(&self, schema: CollectionSchema) {
        *self.schema.write() = schema;
    }

    pub fn text_index_fields(&self) -> Vec<String> {
        self.schema.read().text_index.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn check_required(&self, data: &BsonDocument) -> Result<(), CmsError> {
        let schema = self.schema.read();
        let missing: Vec<&str> = schema
            .required
            .iter()
            .filter(|f| matches!(data.get(f.as_str()), None | Some(Bson::Null)))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CmsError::Validation(format!("missing required field(s): {}", missing.join(", "))))
        }
    }
}
