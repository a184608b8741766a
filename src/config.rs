//! Application configuration.
//!
//! Precedence: CLI > env > config file > defaults. The first config file found
//! among `--config`, `SOLARCMS_CONFIG`, `<config dir>/solarcms.toml` and
//! `./solarcms.toml` is used.

use crate::collection::CollectionSchema;
use crate::errors::CmsError;
use crate::query::ShaperConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "solarcms.toml";
pub const DEFAULT_DATA_FILE: &str = "solarcms.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
    pub level: String,
    pub retention: u32,
    pub dev6: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { dir: None, level: "info".into(), retention: 7, dev6: false }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Snapshot file holding every collection.
    pub data_path: Option<PathBuf>,
    pub query: ShaperConfig,
    pub logging: LoggingConfig,
    /// Extra or replacement schemas on top of [`default_collections`].
    pub collections: Vec<CollectionSchema>,
}

impl AppConfig {
    /// Loads configuration from the process environment and the usual file locations.
    ///
    /// # Errors
    /// `CmsError::Config` for unreadable or invalid files and out-of-range values.
    pub fn load(cli_config: Option<&Path>, cli_data: Option<&Path>) -> Result<Self, CmsError> {
        Self::load_with(cli_config, cli_data, |k| std::env::var(k).ok())
    }

    /// [`AppConfig::load`] with an explicit variable source.
    ///
    /// # Errors
    /// See [`AppConfig::load`].
    pub fn load_with(
        cli_config: Option<&Path>,
        cli_data: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CmsError> {
        let mut cfg = match cli_config {
            Some(p) if !p.exists() => {
                return Err(CmsError::Config(format!("config file not found: {}", p.display())));
            }
            Some(p) => Self::from_file(p)?,
            None => match candidate_paths(&lookup).into_iter().find(|p| p.exists()) {
                Some(p) => Self::from_file(&p)?,
                None => Self::default(),
            },
        };
        cfg.apply_env(&lookup)?;
        if let Some(p) = cli_data {
            cfg.data_path = Some(p.to_path_buf());
        }
        cfg.query.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// `CmsError::Config` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, CmsError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CmsError::Config(format!("reading {}: {e}", path.display())))?;
        let cfg: Self =
            toml::from_str(&raw).map_err(|e| CmsError::Config(format!("parsing {}: {e}", path.display())))?;
        log::debug!("loaded config from {}", path.display());
        Ok(cfg)
    }

    fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<(), CmsError> {
        if let Some(p) = lookup("SOLARCMS_DATA") {
            self.data_path = Some(PathBuf::from(p));
        }
        if let Some(v) = lookup("SOLARCMS_DEFAULT_PAGE_SIZE") {
            self.query.default_page_size = parse_size("SOLARCMS_DEFAULT_PAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("SOLARCMS_MAX_PAGE_SIZE") {
            self.query.max_page_size = parse_size("SOLARCMS_MAX_PAGE_SIZE", &v)?;
        }
        if let Some(v) = lookup("SOLARCMS_LOG_LEVEL") {
            self.logging.level = v;
        }
        Ok(())
    }

    /// Snapshot path, defaulting to `./solarcms.json`.
    #[must_use]
    pub fn data_path(&self) -> PathBuf {
        self.data_path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE))
    }

    /// Built-in schemas with configured ones added or replaced by name.
    #[must_use]
    pub fn schemas(&self) -> Vec<CollectionSchema> {
        let mut out = default_collections();
        for schema in &self.collections {
            match out.iter_mut().find(|s| s.name == schema.name) {
                Some(slot) => *slot = schema.clone(),
                None => out.push(schema.clone()),
            }
        }
        out
    }

    /// # Errors
    /// `CmsError::Config` if serialization fails.
    pub fn to_toml(&self) -> Result<String, CmsError> {
        toml::to_string_pretty(self).map_err(|e| CmsError::Config(e.to_string()))
    }
}

/// Collections of the company site.
#[must_use]
pub fn default_collections() -> Vec<CollectionSchema> {
    vec![
        CollectionSchema::new("projects")
            .with_required(&["title", "description"])
            .with_text_index(&["title", "description", "location"]),
        CollectionSchema::new("services")
            .with_required(&["title", "description"])
            .with_text_index(&["title", "description"]),
        CollectionSchema::new("testimonials")
            .with_required(&["name", "message"])
            .with_text_index(&["name", "message"]),
        CollectionSchema::new("blogs")
            .with_required(&["title", "content"])
            .with_text_index(&["title", "content", "tags"]),
        CollectionSchema::new("faqs").with_required(&["question", "answer"]).with_text_index(&["question", "answer"]),
        CollectionSchema::new("team").with_required(&["name", "role"]).with_text_index(&["name", "role"]),
    ]
}

fn candidate_paths(lookup: &impl Fn(&str) -> Option<String>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(p) = lookup("SOLARCMS_CONFIG") {
        paths.push(PathBuf::from(p));
    }
    if let Some(dir) = dirs_next::config_dir() {
        paths.push(dir.join(CONFIG_FILE_NAME));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join(CONFIG_FILE_NAME));
    }
    paths
}

fn parse_size(var: &str, raw: &str) -> Result<u64, CmsError> {
    raw.trim().parse::<u64>().map_err(|_| CmsError::Config(format!("{var} must be a positive integer, got `{raw}`")))
}
