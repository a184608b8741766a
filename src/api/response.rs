use crate::errors::CmsError;
use crate::query::Pagination;
use crate::utils::num::page_count;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u64,
    pub limit: u64,
    pub skip: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PageInfo {
    #[must_use]
    pub fn new(p: Pagination, total: u64) -> Self {
        let total_pages = page_count(total, p.limit);
        Self {
            page: p.page,
            limit: p.limit,
            skip: p.skip,
            total_pages,
            has_next_page: p.page < total_pages,
            has_prev_page: p.page > 1,
        }
    }
}

/// Envelope for a shaped list query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse {
    pub success: bool,
    /// Documents on this page.
    pub count: u64,
    /// Documents matching the filter across all pages.
    pub total: u64,
    pub pagination: PageInfo,
    pub data: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResponse {
    pub success: bool,
    pub data: Value,
}

impl ItemResponse {
    #[must_use]
    pub fn new(data: Value) -> Self {
        Self { success: true, data }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

impl From<&CmsError> for ErrorResponse {
    fn from(e: &CmsError) -> Self {
        Self { success: false, message: e.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_info_flags() {
        let info = PageInfo::new(Pagination { page: 2, limit: 10, skip: 10 }, 25);
        assert_eq!(info.total_pages, 3);
        assert!(info.has_next_page);
        assert!(info.has_prev_page);
        let last = PageInfo::new(Pagination { page: 3, limit: 10, skip: 20 }, 25);
        assert!(!last.has_next_page);
        let empty = PageInfo::new(Pagination { page: 1, limit: 10, skip: 0 }, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page && !empty.has_prev_page);
    }

    #[test]
    fn page_info_serializes_camel_case() {
        let v = serde_json::to_value(PageInfo::new(Pagination { page: 1, limit: 5, skip: 0 }, 6)).unwrap();
        assert_eq!(v["totalPages"], 2);
        assert_eq!(v["hasNextPage"], true);
        assert_eq!(v["hasPrevPage"], false);
    }

    #[test]
    fn error_envelope() {
        let e = CmsError::NoSuchDocument("abc".into());
        let body = ErrorResponse::from(&e);
        assert!(!body.success);
        assert_eq!(body.message, "Document not found: abc");
    }
}
