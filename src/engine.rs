use crate::collection::{Collection, CollectionSchema};
use crate::errors::CmsError;
use crate::types::CollectionName;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// The in-memory document store: a registry of named collections.
#[derive(Default)]
pub struct Engine {
    pub(crate) collections: RwLock<HashMap<CollectionName, Arc<Collection>>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("collections", &self.list_collection_names()).finish()
    }
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an engine with one empty collection per schema.
    pub fn with_schemas<I>(schemas: I) -> Self
    where
        I: IntoIterator<Item = CollectionSchema>,
    {
        let engine = Self::new();
        for schema in schemas {
            engine.register(schema);
        }
        engine
    }

    /// Returns the named collection, creating it without schema constraints if missing.
    pub fn create_collection(&self, name: impl Into<String>) -> Arc<Collection> {
        let name = name.into();
        let mut cols = self.collections.write();
        Arc::clone(cols.entry(name.clone()).or_insert_with(|| {
            log::info!("created collection {name}");
            Arc::new(Collection::new(CollectionSchema::new(name.clone())))
        }))
    }

    /// Creates the collection for `schema`, or replaces the schema of an existing one.
    pub fn register(&self, schema: CollectionSchema) -> Arc<Collection> {
        let mut cols = self.collections.write();
        if let Some(existing) = cols.get(&schema.name) {
            existing.set_schema(schema);
            return Arc::clone(existing);
        }
        log::info!("registered collection {}", schema.name);
        let name = schema.name.clone();
        let col = Arc::new(Collection::new(schema));
        cols.insert(name, Arc::clone(&col));
        col
    }

    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    /// # Errors
    /// Returns `NoSuchCollection` when the name is not registered.
    pub fn collection(&self, name: &str) -> Result<Arc<Collection>, CmsError> {
        self.get_collection(name).ok_or_else(|| CmsError::NoSuchCollection(name.to_string()))
    }

    pub fn list_collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_replaces_schema_but_keeps_documents() {
        let engine = Engine::new();
        let col = engine.create_collection("faqs");
        col.insert_document(crate::document::Document::new(bson::doc! {"q": "why solar?"})).unwrap();
        let again = engine.register(CollectionSchema::new("faqs").with_text_index(&["q"]));
        assert_eq!(again.len(), 1);
        assert_eq!(again.text_index_fields(), vec!["q".to_string()]);
    }
}
