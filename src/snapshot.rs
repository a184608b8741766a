//! On-disk snapshot of every collection.
//!
//! Layout: `{ "<collection>": [ <relaxed extended JSON document>, ... ] }`. Saving
//! writes a temp file beside the destination and persists it over the old one.

use crate::document::Document;
use crate::engine::Engine;
use crate::errors::CmsError;
use bson::{Bson, Document as BsonDocument};
use serde_json::{Map, Value};
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes every collection to `path`. Returns the number of documents written.
///
/// # Errors
/// I/O failures creating, writing or persisting the temp file.
pub fn save(engine: &Engine, path: &Path) -> Result<usize, CmsError> {
    let mut root = Map::new();
    let mut written = 0usize;
    for name in engine.list_collection_names() {
        let Some(col) = engine.get_collection(&name) else { continue };
        let docs: Vec<Value> =
            col.documents().into_iter().map(|d| Bson::Document(d.data).into_relaxed_extjson()).collect();
        written += docs.len();
        root.insert(name, Value::Array(docs));
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    {
        let mut w = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut w, &Value::Object(root))?;
        w.write_all(b"\n")?;
        w.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| CmsError::Io(format!("persisting {}: {}", path.display(), e.error)))?;
    log::info!("snapshot saved: {} documents -> {}", written, path.display());
    Ok(written)
}

/// Loads `path` into `engine`, creating collections as needed. A missing file is
/// an empty store. Returns the number of documents loaded.
///
/// # Errors
/// `Json` for unparsable files, `Validation` for entries that are not documents.
pub fn load(engine: &Engine, path: &Path) -> Result<usize, CmsError> {
    if !path.exists() {
        log::debug!("no snapshot at {}", path.display());
        return Ok(0);
    }
    let raw = std::fs::read_to_string(path)?;
    let root: Map<String, Value> = serde_json::from_str(&raw)?;
    let mut loaded = 0usize;
    for (name, docs) in root {
        let Value::Array(items) = docs else {
            return Err(CmsError::Validation(format!("snapshot entry `{name}` is not an array")));
        };
        let col = engine.create_collection(name.clone());
        for item in items {
            let Value::Object(obj) = item else {
                return Err(CmsError::Validation(format!("non-object document in `{name}`")));
            };
            let data = BsonDocument::try_from(obj).map_err(|e| CmsError::Validation(format!("{name}: {e}")))?;
            col.restore_document(Document::new(data));
            loaded += 1;
        }
    }
    log::info!("snapshot loaded: {} documents from {}", loaded, path.display());
    Ok(loaded)
}
