//! Resource handlers: the controller layer between decoded requests and the store.
//!
//! Every collection gets the same five operations. Handlers return serializable
//! envelopes; failures are `CmsError`s that callers turn into an
//! [`ErrorResponse`] plus [`CmsError::status_code`](crate::errors::CmsError::status_code).

mod resources;
mod response;

pub use resources::{create, delete, get, list, update};
pub use response::{DeleteResponse, ErrorResponse, ItemResponse, ListResponse, PageInfo};
