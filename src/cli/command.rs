use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Registered collections with document counts.
    Collections,
    /// Shaped list query; `query` is a raw query string such as `page=2&sort=-createdAt`.
    List {
        collection: String,
        query: Option<String>,
    },
    /// Count of documents matching the query string's filter and search.
    Count {
        collection: String,
        query: Option<String>,
    },
    Get {
        collection: String,
        id: String,
    },
    Create {
        collection: String,
        json: String,
    },
    Update {
        collection: String,
        id: String,
        json: String,
    },
    Delete {
        collection: String,
        id: String,
    },
    Import {
        collection: String,
        file: PathBuf,
        format: Option<String>,
        skip_errors: bool,
    },
    /// Effective configuration as TOML.
    Config,
}

impl Command {
    /// Whether the command changes stored data, so the snapshot must be rewritten.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Create { .. } | Self::Update { .. } | Self::Delete { .. } | Self::Import { .. })
    }
}
