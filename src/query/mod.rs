//! Query layer: query-string decoding, shaping, filter parsing and in-memory execution.

mod builder;
mod eval;
mod exec;
mod parse;
mod query_string;
mod shaper;
mod text;
mod types;

pub use builder::{FindQuery, QueryBuilder};
pub use eval::{compare_docs, eval_filter, project_fields};
pub use exec::{count_docs, find_docs, find_page};
pub use parse::parse_filter;
pub use query_string::{ParamValue, QueryString};
pub use shaper::{CONTROL_KEYS, OPERATOR_TOKENS, Pagination, QueryShaper, ShaperConfig};
pub use text::TextSearch;
pub use types::{CmpOp, Filter, FindOptions, Order, Projection, SortSpec};
