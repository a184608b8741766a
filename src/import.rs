//! Bulk import of seed content: a JSON array or NDJSON (one object per line).

use crate::document::{Document, json_to_bson_document, parse_timestamp};
use crate::engine::Engine;
use crate::errors::CmsError;
use crate::types::{CREATED_AT_FIELD, UPDATED_AT_FIELD};
use bson::{Bson, Document as BsonDocument};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Auto,
    JsonArray,
    Ndjson,
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub format: ImportFormat,
    pub collection: String,
    /// Skip documents that fail validation instead of aborting.
    pub skip_errors: bool,
}

impl ImportOptions {
    pub fn new(collection: impl Into<String>) -> Self {
        Self { format: ImportFormat::Auto, collection: collection.into(), skip_errors: false }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: u64,
    pub skipped: u64,
}

/// # Errors
/// I/O errors, malformed JSON, or (without `skip_errors`) the first rejected document.
pub fn import_file(engine: &Engine, path: &Path, opts: &ImportOptions) -> Result<ImportReport, CmsError> {
    log::info!("import: path={}, collection={}", path.display(), opts.collection);
    let file = std::fs::File::open(path)?;
    import_from_reader(engine, file, opts)
}

/// # Errors
/// Same as [`import_file`].
pub fn import_from_reader<R: Read>(engine: &Engine, reader: R, opts: &ImportOptions) -> Result<ImportReport, CmsError> {
    let col = engine.collection(&opts.collection)?;
    let mut reader = BufReader::new(reader);
    let format = match opts.format {
        ImportFormat::Auto => detect_format(&mut reader)?,
        other => other,
    };
    let mut report = ImportReport::default();
    let accept = |value: serde_json::Value, report: &mut ImportReport| -> Result<(), CmsError> {
        let outcome = json_to_bson_document(&value).and_then(|mut data| {
            normalize_timestamps(&mut data);
            col.insert_document(Document::new(data))
        });
        match outcome {
            Ok(_) => report.inserted += 1,
            Err(e) if opts.skip_errors => {
                log::warn!("import into {}: skipped document: {e}", opts.collection);
                report.skipped += 1;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    };

    match format {
        ImportFormat::JsonArray => {
            let val: serde_json::Value = serde_json::from_reader(reader)?;
            let serde_json::Value::Array(items) = val else {
                return Err(CmsError::Validation("expected a JSON array".into()));
            };
            for item in items {
                accept(item, &mut report)?;
            }
        }
        ImportFormat::Ndjson | ImportFormat::Auto => {
            for line in reader.lines() {
                let line = line?;
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                accept(serde_json::from_str(line)?, &mut report)?;
            }
        }
    }
    log::info!("import into {}: inserted={}, skipped={}", opts.collection, report.inserted, report.skipped);
    Ok(report)
}

fn detect_format<R: BufRead>(reader: &mut R) -> Result<ImportFormat, CmsError> {
    // peek without consuming
    let buf = reader.fill_buf()?;
    let head = String::from_utf8_lossy(&buf[..buf.len().min(256)]);
    Ok(if head.trim_start().starts_with('[') { ImportFormat::JsonArray } else { ImportFormat::Ndjson })
}

/// Seed files carry timestamps as strings; store them as datetimes so they sort.
fn normalize_timestamps(data: &mut BsonDocument) {
    for field in [CREATED_AT_FIELD, UPDATED_AT_FIELD] {
        let parsed = match data.get(field) {
            Some(Bson::String(s)) => parse_timestamp(s),
            _ => None,
        };
        if let Some(dt) = parsed {
            data.insert(field, Bson::DateTime(dt));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::CollectionSchema;

    fn engine() -> Engine {
        Engine::with_schemas([CollectionSchema::new("testimonials").with_required(&["name", "message"])])
    }

    #[test]
    fn json_array_is_detected() {
        let e = engine();
        let input = r#"  [{"name": "R. Iyer", "message": "Bills dropped 80%"}, {"name": "K", "message": "Great"}]"#;
        let rep = import_from_reader(&e, input.as_bytes(), &ImportOptions::new("testimonials")).unwrap();
        assert_eq!(rep, ImportReport { inserted: 2, skipped: 0 });
    }

    #[test]
    fn ndjson_with_skip_errors() {
        let e = engine();
        let input = "{\"name\":\"A\",\"message\":\"ok\"}\n\n{\"name\":\"B\"}\n{\"name\":\"C\",\"message\":\"ok\",\"createdAt\":\"2024-03-01T10:00:00Z\"}\n";
        let opts = ImportOptions { skip_errors: true, ..ImportOptions::new("testimonials") };
        let rep = import_from_reader(&e, input.as_bytes(), &opts).unwrap();
        assert_eq!(rep, ImportReport { inserted: 2, skipped: 1 });
        let col = e.collection("testimonials").unwrap();
        let c = col.documents().into_iter().find(|d| d.data.get_str("name").ok() == Some("C")).unwrap();
        assert!(matches!(c.data.get("createdAt"), Some(Bson::DateTime(_))));
    }

    #[test]
    fn strict_import_stops_on_first_error() {
        let e = engine();
        let input = "{\"name\":\"B\"}\n{\"name\":\"C\",\"message\":\"ok\"}\n";
        let err = import_from_reader(&e, input.as_bytes(), &ImportOptions::new("testimonials")).unwrap_err();
        assert!(matches!(err, CmsError::Validation(_)));
    }

    #[test]
    fn unknown_collection_fails() {
        let err = import_from_reader(&engine(), "[]".as_bytes(), &ImportOptions::new("nope")).unwrap_err();
        assert!(matches!(err, CmsError::NoSuchCollection(_)));
    }
}
