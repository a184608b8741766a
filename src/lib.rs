//! Content store for a solar company's site: collections of BSON documents,
//! query-string shaped listing (filter, text search, sort, projection, paging)
//! and a small resource API over them.

pub mod api;
pub mod cli;
pub mod collection;
pub mod config;
pub mod document;
pub mod engine;
pub mod errors;
pub mod import;
pub mod logger;
pub mod query;
pub mod snapshot;
pub mod types;
pub mod utils;

pub use collection::{Collection, CollectionSchema};
pub use config::AppConfig;
pub use document::Document;
pub use engine::Engine;
pub use errors::CmsError;
pub use query::{FindQuery, Pagination, QueryBuilder, QueryShaper, QueryString, ShaperConfig};
pub use types::DocumentId;
