use crate::errors::CmsError;
use crate::types::{CREATED_AT_FIELD, DocumentId, ID_FIELD, UPDATED_AT_FIELD};
use bson::{Bson, Document as BsonDocument};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

/// Internal revision counter stamped on every stored document.
pub const REVISION_FIELD: &str = "__v";

/// A stored document. `data` holds every field including the store-managed
/// `_id`, `createdAt`, `updatedAt` and `__v`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub data: BsonDocument,
}

impl Document {
    /// Wraps user data, stamping the store-managed fields that are missing.
    /// An existing string `_id` is kept; any other `_id` is replaced.
    pub fn new(mut data: BsonDocument) -> Self {
        let id = match data.get(ID_FIELD) {
            Some(Bson::String(s)) if DocumentId::parse(s).is_ok() => DocumentId(s.trim().to_string()),
            _ => DocumentId::new(),
        };
        let now = bson::DateTime::now();
        data.insert(ID_FIELD, Bson::String(id.0.clone()));
        if !data.contains_key(CREATED_AT_FIELD) {
            data.insert(CREATED_AT_FIELD, Bson::DateTime(now));
        }
        if !data.contains_key(UPDATED_AT_FIELD) {
            data.insert(UPDATED_AT_FIELD, Bson::DateTime(now));
        }
        if !data.contains_key(REVISION_FIELD) {
            data.insert(REVISION_FIELD, Bson::Int32(0));
        }
        Self { id, data }
    }

    /// Builds a new document from a create request. The revision counter and
    /// `updatedAt` always come from the store; a supplied `createdAt` must be an
    /// RFC 3339 string or a date and is stored as a date.
    ///
    /// # Errors
    /// `Validation` when `createdAt` is present but not a valid timestamp.
    pub fn from_body(mut data: BsonDocument) -> Result<Self, CmsError> {
        data.remove(REVISION_FIELD);
        data.remove(UPDATED_AT_FIELD);
        let created = match data.get(CREATED_AT_FIELD) {
            None | Some(Bson::Null) => None,
            Some(Bson::DateTime(dt)) => Some(*dt),
            Some(Bson::String(s)) => match parse_timestamp(s) {
                Some(dt) => Some(dt),
                None => return Err(CmsError::Validation(format!("{CREATED_AT_FIELD} is not an RFC 3339 timestamp: `{s}`"))),
            },
            Some(other) => {
                return Err(CmsError::Validation(format!(
                    "{CREATED_AT_FIELD} must be a timestamp, got {:?}",
                    other.element_type()
                )));
            }
        };
        match created {
            Some(dt) => {
                data.insert(CREATED_AT_FIELD, Bson::DateTime(dt));
            }
            None => {
                data.remove(CREATED_AT_FIELD);
            }
        }
        Ok(Self::new(data))
    }

    /// Merges `changes` into the document. Store-managed fields in `changes` are ignored.
    pub fn apply_changes(&mut self, changes: BsonDocument) {
        for (k, v) in changes {
            if is_managed_field(&k) {
                continue;
            }
            self.data.insert(k, v);
        }
        self.touch();
    }

    /// Refreshes `updatedAt` and bumps the revision counter.
    pub fn touch(&mut self) {
        self.data.insert(UPDATED_AT_FIELD, Bson::DateTime(bson::DateTime::now()));
        let rev = match self.data.get(REVISION_FIELD) {
            Some(Bson::Int32(n)) => i64::from(*n),
            Some(Bson::Int64(n)) => *n,
            _ => 0,
        };
        self.data.insert(REVISION_FIELD, Bson::Int64(rev.saturating_add(1)));
    }

    /// Caller-facing JSON view: dates render as RFC 3339 strings.
    #[must_use]
    pub fn to_json(&self) -> Value {
        bson_doc_to_json(&self.data)
    }
}

#[must_use]
pub fn is_managed_field(key: &str) -> bool {
    matches!(key, ID_FIELD | CREATED_AT_FIELD | UPDATED_AT_FIELD | REVISION_FIELD)
}

/// Parses an RFC 3339 timestamp into a BSON date.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<bson::DateTime> {
    chrono::DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| bson::DateTime::from_millis(dt.timestamp_millis()))
}

/// Converts a JSON request body into a BSON document.
///
/// # Errors
/// Returns `Validation` if the body is not a JSON object.
pub fn json_to_bson_document(val: &Value) -> Result<BsonDocument, CmsError> {
    let obj = val
        .as_object()
        .ok_or_else(|| CmsError::Validation("expected a JSON object".into()))?;
    BsonDocument::try_from(obj.clone()).map_err(|e| CmsError::Validation(e.to_string()))
}

#[must_use]
pub fn bson_doc_to_json(doc: &BsonDocument) -> Value {
    let mut out = serde_json::Map::with_capacity(doc.len());
    for (k, v) in doc {
        out.insert(k.clone(), bson_to_json(v));
    }
    Value::Object(out)
}

#[must_use]
pub fn bson_to_json(v: &Bson) -> Value {
    match v {
        Bson::DateTime(dt) => chrono::DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis())
            .map_or(Value::Null, |d| Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true))),
        Bson::Document(d) => bson_doc_to_json(d),
        Bson::Array(items) => Value::Array(items.iter().map(bson_to_json).collect()),
        other => other.clone().into_relaxed_extjson(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn new_stamps_managed_fields() {
        let d = Document::new(doc! {"title": "Rooftop array"});
        assert!(d.data.get_str("_id").is_ok());
        assert!(d.data.get_datetime("createdAt").is_ok());
        assert_eq!(d.data.get_i32("__v").unwrap(), 0);
    }

    #[test]
    fn new_keeps_string_id() {
        let d = Document::new(doc! {"_id": "plant-7", "title": "x"});
        assert_eq!(d.id.as_str(), "plant-7");
    }

    #[test]
    fn apply_changes_ignores_managed_fields_and_bumps_revision() {
        let mut d = Document::new(doc! {"title": "old"});
        let id = d.id.clone();
        d.apply_changes(doc! {"title": "new", "_id": "hijack", "__v": 99});
        assert_eq!(d.data.get_str("title").unwrap(), "new");
        assert_eq!(d.data.get_str("_id").unwrap(), id.as_str());
        assert_eq!(d.data.get_i64("__v").unwrap(), 1);
    }

    #[test]
    fn from_body_resets_revision_and_normalizes_created_at() {
        let d = Document::from_body(doc! {"title": "t", "__v": 99, "createdAt": "2024-03-01T10:00:00Z", "updatedAt": "x"})
            .unwrap();
        assert_eq!(d.data.get_i32("__v").unwrap(), 0);
        let created = d.data.get_datetime("createdAt").unwrap();
        assert_eq!(created.timestamp_millis(), 1_709_287_200_000);
        assert!(d.data.get_datetime("updatedAt").unwrap() > created);
    }

    #[test]
    fn from_body_rejects_bad_created_at() {
        assert!(matches!(Document::from_body(doc! {"createdAt": "yesterday"}), Err(CmsError::Validation(_))));
        assert!(matches!(Document::from_body(doc! {"createdAt": 5}), Err(CmsError::Validation(_))));
    }

    #[test]
    fn json_view_renders_dates_as_strings() {
        let d = Document::new(doc! {"n": 1});
        let v = d.to_json();
        assert!(v["createdAt"].as_str().unwrap().ends_with('Z'));
        assert_eq!(v["n"], serde_json::json!(1));
    }

    #[test]
    fn json_body_must_be_object() {
        assert!(json_to_bson_document(&serde_json::json!([1, 2])).is_err());
        let d = json_to_bson_document(&serde_json::json!({"a": "b"})).unwrap();
        assert_eq!(d.get_str("a").unwrap(), "b");
    }
}
