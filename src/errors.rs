use thiserror::Error;

#[derive(Debug, Error)]
pub enum CmsError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("BSON: {0}")]
    Bson(#[from] bson::error::Error),

    #[error("Collection not found: {0}")]
    NoSuchCollection(String),

    #[error("Document not found: {0}")]
    NoSuchDocument(String),

    #[error("Invalid document ID: {0}")]
    InvalidDocumentId(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl CmsError {
    /// HTTP-style status for the failure. Client-shaped problems are 400-class,
    /// lookups that miss are 404, everything on the store side is 500.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Query(_) | Self::Validation(_) | Self::InvalidDocumentId(_) => 400,
            Self::NoSuchCollection(_) | Self::NoSuchDocument(_) => 404,
            Self::Io(_) | Self::Json(_) | Self::Bson(_) | Self::Config(_) => 500,
        }
    }
}

impl From<std::io::Error> for CmsError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
