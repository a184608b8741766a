use crate::errors::CmsError;
use crate::import::ImportFormat;

pub fn parse_import_format(s: Option<&str>) -> ImportFormat {
    match s.map(str::to_ascii_lowercase).as_deref() {
        Some("json" | "array") => ImportFormat::JsonArray,
        Some("ndjson" | "jsonl") => ImportFormat::Ndjson,
        _ => ImportFormat::Auto,
    }
}

/// Parses a JSON object argument.
pub fn parse_json_arg(raw: &str) -> Result<serde_json::Value, CmsError> {
    let val: serde_json::Value = serde_json::from_str(raw)?;
    if !val.is_object() {
        return Err(CmsError::Validation("expected a JSON object argument".into()));
    }
    Ok(val)
}
