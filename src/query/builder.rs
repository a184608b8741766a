use crate::collection::Collection;
use crate::errors::CmsError;
use bson::Document as BsonDocument;
use std::sync::Arc;

use super::exec::{count_docs, find_docs, find_page};
use super::types::{FindOptions, Projection, SortSpec};

/// A chainable, unexecuted read query against one collection.
///
/// Each directive consumes the builder and returns it, so a value is threaded
/// through a chain of calls and executed by the caller at the end.
pub trait QueryBuilder: Sized {
    /// Merges equality/range conditions into the filter, field by field.
    /// Re-applying the same conditions leaves the filter unchanged.
    fn find(self, conditions: BsonDocument) -> Self;

    /// Narrows the query to a full-text match.
    fn text_search(self, term: &str) -> Self;

    fn sort(self, spec: Vec<SortSpec>) -> Self;

    fn select(self, projection: Projection) -> Self;

    fn skip(self, n: u64) -> Self;

    fn limit(self, n: u64) -> Self;

    /// The accumulated filter document.
    fn filter_document(&self) -> &BsonDocument;
}

/// Query handle over an in-memory [`Collection`].
#[derive(Debug, Clone)]
pub struct FindQuery {
    collection: Arc<Collection>,
    conditions: BsonDocument,
    text: Option<String>,
    options: FindOptions,
}

impl FindQuery {
    pub fn new(collection: Arc<Collection>) -> Self {
        Self { collection, conditions: BsonDocument::new(), text: None, options: FindOptions::default() }
    }

    pub fn collection(&self) -> &Arc<Collection> {
        &self.collection
    }

    pub fn options(&self) -> &FindOptions {
        &self.options
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Runs the query: filter, text match, sort, skip/limit, projection.
    ///
    /// # Errors
    /// Any malformed filter, projection or text search surfaces here as `CmsError::Query`.
    pub fn exec(&self) -> Result<Vec<BsonDocument>, CmsError> {
        find_docs(&self.collection, &self.conditions, self.text.as_deref(), &self.options)
    }

    /// Runs the query and counts every match of the same filter, both over one
    /// snapshot of the collection.
    ///
    /// # Errors
    /// Same as [`FindQuery::exec`].
    pub fn exec_with_total(&self) -> Result<(Vec<BsonDocument>, u64), CmsError> {
        find_page(&self.collection, &self.conditions, self.text.as_deref(), &self.options)
    }

    /// Counts matches of the stored filter and text search. Sort, skip, limit and
    /// projection do not apply.
    ///
    /// # Errors
    /// Same failure modes as [`FindQuery::exec`] for the filter part.
    pub fn count_documents(&self) -> Result<u64, CmsError> {
        count_docs(&self.collection, &self.conditions, self.text.as_deref())
    }
}

impl QueryBuilder for FindQuery {
    fn find(mut self, conditions: BsonDocument) -> Self {
        for (k, v) in conditions {
            self.conditions.insert(k, v);
        }
        self
    }

    fn text_search(mut self, term: &str) -> Self {
        self.text = Some(term.to_string());
        self
    }

    fn sort(mut self, spec: Vec<SortSpec>) -> Self {
        self.options.sort = Some(spec);
        self
    }

    fn select(mut self, projection: Projection) -> Self {
        self.options.projection = Some(projection);
        self
    }

    fn skip(mut self, n: u64) -> Self {
        self.options.skip = Some(n);
        self
    }

    fn limit(mut self, n: u64) -> Self {
        self.options.limit = Some(n);
        self
    }

    fn filter_document(&self) -> &BsonDocument {
        &self.conditions
    }
}
