//! Shapes a decoded query string into a read query.
//!
//! ```ignore
//! let shaped = config
//!     .shaper(collection.find(), &qs)
//!     .filter()
//!     .search()
//!     .sort()
//!     .limit_fields()
//!     .paginate();
//! let (query, pagination) = shaped.into_parts();
//! ```
//!
//! The shaper never executes anything. `paginate` should run last so skip/limit
//! apply to the narrowed, ordered result.

use bson::{Bson, Document as BsonDocument};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::builder::QueryBuilder;
use super::query_string::{ParamValue, QueryString};
use super::types::{MAX_PATH_DEPTH, MAX_SORT_FIELDS, Projection, SortSpec};
use crate::errors::CmsError;
use crate::utils::num::i64_to_u64_saturating_nonnegative;

/// Sub-keys rewritten to store operators (`price[gt]=10` -> `{price: {$gt: "10"}}`).
pub const OPERATOR_TOKENS: [&str; 5] = ["gt", "gte", "lt", "lte", "in"];

const OPERATOR_SIGIL: char = '$';

/// Keys the shaper reads itself. They must stay in `reserved_keys`, otherwise
/// `page=2` would also become an equality filter.
pub const CONTROL_KEYS: [&str; 6] = ["page", "sort", "limit", "fields", "search", "q"];

/// Limits and defaults applied by [`QueryShaper`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaperConfig {
    pub default_page_size: u64,
    pub max_page_size: u64,
    /// Control keys that never become equality filters.
    pub reserved_keys: Vec<String>,
    /// Internal revision field hidden by the default projection.
    pub revision_field: String,
    /// Sort applied when the query string has none.
    pub default_sort: String,
}

impl Default for ShaperConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
            reserved_keys: CONTROL_KEYS.map(String::from).to_vec(),
            revision_field: crate::document::REVISION_FIELD.to_string(),
            default_sort: format!("-{}", crate::types::CREATED_AT_FIELD),
        }
    }
}

impl ShaperConfig {
    /// Builds a shaper bound to this configuration.
    pub fn shaper<'a, Q: QueryBuilder>(&'a self, query: Q, query_string: &'a QueryString) -> QueryShaper<'a, Q> {
        QueryShaper::new(query, query_string, self)
    }

    /// # Errors
    /// `CmsError::Config` when the page sizes are zero, the default exceeds the
    /// maximum, or a control key is missing from `reserved_keys`.
    pub fn validate(&self) -> Result<(), CmsError> {
        if self.max_page_size == 0 {
            return Err(CmsError::Config("max_page_size must be at least 1".into()));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(CmsError::Config(format!(
                "default_page_size must be in 1..={} (got {})",
                self.max_page_size, self.default_page_size
            )));
        }
        if self.revision_field.trim().is_empty() {
            return Err(CmsError::Config("revision_field cannot be empty".into()));
        }
        if let Some(missing) = CONTROL_KEYS.iter().find(|k| !self.is_reserved(k)) {
            return Err(CmsError::Config(format!("reserved_keys must include `{missing}`")));
        }
        Ok(())
    }

    fn is_reserved(&self, key: &str) -> bool {
        self.reserved_keys.iter().any(|k| k == key)
    }
}

/// Page window chosen by [`QueryShaper::paginate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub skip: u64,
}

pub struct QueryShaper<'a, Q: QueryBuilder> {
    query: Q,
    query_string: &'a QueryString,
    config: &'a ShaperConfig,
    pagination: Option<Pagination>,
}

impl<'a, Q: QueryBuilder> QueryShaper<'a, Q> {
    pub fn new(query: Q, query_string: &'a QueryString, config: &'a ShaperConfig) -> Self {
        Self { query, query_string, config, pagination: None }
    }

    /// Applies every non-reserved key as an equality or range condition.
    #[must_use]
    pub fn filter(mut self) -> Self {
        let conditions = self.filter_document();
        log::debug!(target: "solarcms::query", "shaper filter: {conditions}");
        self.query = self.query.find(conditions);
        self
    }

    /// Narrows to a text match on `search`, falling back to `q`.
    #[must_use]
    pub fn search(mut self) -> Self {
        let term = ["search", "q"]
            .into_iter()
            .filter_map(|k| self.query_string.first(k))
            .map(str::trim)
            .find(|s| !s.is_empty());
        if let Some(term) = term {
            self.query = self.query.text_search(term);
        }
        self
    }

    #[must_use]
    pub fn sort(mut self) -> Self {
        let mut spec = self.query_string.first("sort").map(SortSpec::parse_list).unwrap_or_default();
        if spec.is_empty() {
            spec = SortSpec::parse_list(&self.config.default_sort);
        }
        spec.truncate(MAX_SORT_FIELDS);
        if !spec.is_empty() {
            self.query = self.query.sort(spec);
        }
        self
    }

    /// Projects `fields`, or hides only the revision field when absent.
    #[must_use]
    pub fn limit_fields(mut self) -> Self {
        let projection = self
            .query_string
            .first("fields")
            .map(Projection::parse_list)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| Projection::exclude([self.config.revision_field.as_str()]));
        self.query = self.query.select(projection);
        self
    }

    #[must_use]
    pub fn paginate(mut self) -> Self {
        let p = self.compute_pagination();
        self.query = self.query.skip(p.skip).limit(p.limit);
        self.pagination = Some(p);
        self
    }

    pub fn query(&self) -> &Q {
        &self.query
    }

    pub fn query_string(&self) -> &QueryString {
        self.query_string
    }

    /// Set once [`QueryShaper::paginate`] has run.
    pub fn pagination(&self) -> Option<Pagination> {
        self.pagination
    }

    pub fn into_query(self) -> Q {
        self.query
    }

    pub fn into_parts(self) -> (Q, Option<Pagination>) {
        (self.query, self.pagination)
    }

    fn compute_pagination(&self) -> Pagination {
        let max = self.config.max_page_size.max(1);
        let page = parse_int(self.query_string.first("page")).unwrap_or(1).max(1);
        let limit = parse_int(self.query_string.first("limit"))
            .map_or(self.config.default_page_size, i64_to_u64_saturating_nonnegative)
            .clamp(1, max);
        let page = i64_to_u64_saturating_nonnegative(page);
        Pagination { page, limit, skip: (page - 1).saturating_mul(limit) }
    }

    fn filter_document(&self) -> BsonDocument {
        let mut out = BsonDocument::new();
        for (key, value) in self.query_string {
            if self.config.is_reserved(key) {
                continue;
            }
            out.insert(key.clone(), param_to_bson(value, 0));
        }
        out
    }
}

impl<Q: QueryBuilder + std::fmt::Debug> std::fmt::Debug for QueryShaper<'_, Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryShaper")
            .field("query", &self.query)
            .field("pagination", &self.pagination)
            .finish_non_exhaustive()
    }
}

fn parse_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
}

fn param_to_bson(value: &ParamValue, depth: usize) -> Bson {
    match value {
        ParamValue::Single(s) => Bson::String(s.clone()),
        ParamValue::Many(v) => Bson::Array(v.iter().cloned().map(Bson::String).collect()),
        ParamValue::Nested(map) => nested_to_bson(map, depth + 1),
    }
}

/// Only keys of nested mappings are operator candidates; field names never are.
fn nested_to_bson(map: &BTreeMap<String, ParamValue>, depth: usize) -> Bson {
    if depth > MAX_PATH_DEPTH {
        return Bson::Null;
    }
    if !map.is_empty() && map.keys().all(|k| !k.is_empty() && k.bytes().all(|b| b.is_ascii_digit())) {
        // `tags[0]=a&tags[1]=b` is a list
        let mut items: Vec<(u64, &ParamValue)> =
            map.iter().filter_map(|(k, v)| k.parse::<u64>().ok().map(|i| (i, v))).collect();
        items.sort_by_key(|(i, _)| *i);
        return Bson::Array(items.into_iter().map(|(_, v)| param_to_bson(v, depth)).collect());
    }
    let mut doc = BsonDocument::new();
    for (k, v) in map {
        let key = if OPERATOR_TOKENS.contains(&k.as_str()) { format!("{OPERATOR_SIGIL}{k}") } else { k.clone() };
        doc.insert(key, param_to_bson(v, depth));
    }
    Bson::Document(doc)
}
