use crate::document::{Document, json_to_bson_document};
use crate::engine::Engine;
use crate::errors::CmsError;
use crate::query::{QueryBuilder, QueryString, ShaperConfig};
use crate::types::DocumentId;
use crate::utils::num::usize_to_u64;
use serde_json::Value;

use super::response::{DeleteResponse, ItemResponse, ListResponse, PageInfo};

/// Shapes and runs a list query. The page and the total come from the same
/// builder and the same collection snapshot.
///
/// # Errors
/// `NoSuchCollection`, or `Query` when the shaped query is rejected at execution.
pub fn list(engine: &Engine, collection: &str, qs: &QueryString, cfg: &ShaperConfig) -> Result<ListResponse, CmsError> {
    let col = engine.collection(collection)?;
    let (query, pagination) = cfg.shaper(col.find(), qs).filter().search().sort().limit_fields().paginate().into_parts();
    let pagination = pagination.ok_or_else(|| CmsError::Query("pagination was not applied".into()))?;
    let (docs, total) = query.exec_with_total()?;
    log::info!(
        target: "solarcms::query",
        "list {collection} filter={} page={} -> {}/{total}",
        query.filter_document(),
        pagination.page,
        docs.len()
    );
    let data: Vec<Value> = docs.iter().map(crate::document::bson_doc_to_json).collect();
    Ok(ListResponse {
        success: true,
        count: usize_to_u64(data.len()),
        total,
        pagination: PageInfo::new(pagination, total),
        data,
    })
}

/// # Errors
/// `InvalidDocumentId`, `NoSuchCollection` or `NoSuchDocument`.
pub fn get(engine: &Engine, collection: &str, id: &str) -> Result<ItemResponse, CmsError> {
    let col = engine.collection(collection)?;
    let id = DocumentId::parse(id)?;
    let doc = col.find_document(&id).ok_or_else(|| CmsError::NoSuchDocument(id.to_string()))?;
    Ok(ItemResponse::new(doc.to_json()))
}

/// Inserts `body`; required schema fields must be present. `__v` and `updatedAt`
/// in the body are ignored, and `createdAt` is stored as a date.
///
/// # Errors
/// `Validation` for a non-object body, missing required fields, a malformed
/// `createdAt` or a duplicate `_id`.
pub fn create(engine: &Engine, collection: &str, body: &Value) -> Result<ItemResponse, CmsError> {
    let col = engine.collection(collection)?;
    let data = json_to_bson_document(body)?;
    let doc = Document::from_body(data)?;
    let json = doc.to_json();
    let id = col.insert_document(doc)?;
    log::info!("created {collection}/{id}");
    Ok(ItemResponse::new(json))
}

/// Merges `body` into the stored document.
///
/// # Errors
/// `InvalidDocumentId`, `NoSuchCollection`, `NoSuchDocument`, or `Validation` for a non-object body.
pub fn update(engine: &Engine, collection: &str, id: &str, body: &Value) -> Result<ItemResponse, CmsError> {
    let col = engine.collection(collection)?;
    let id = DocumentId::parse(id)?;
    let changes = json_to_bson_document(body)?;
    let doc = col.update_document(&id, changes).ok_or_else(|| CmsError::NoSuchDocument(id.to_string()))?;
    log::info!("updated {collection}/{id}");
    Ok(ItemResponse::new(doc.to_json()))
}

/// # Errors
/// `InvalidDocumentId`, `NoSuchCollection` or `NoSuchDocument`.
pub fn delete(engine: &Engine, collection: &str, id: &str) -> Result<DeleteResponse, CmsError> {
    let col = engine.collection(collection)?;
    let id = DocumentId::parse(id)?;
    if !col.delete_document(&id) {
        return Err(CmsError::NoSuchDocument(id.to_string()));
    }
    log::info!("deleted {collection}/{id}");
    Ok(DeleteResponse { success: true, message: format!("{collection} {id} deleted") })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::CollectionSchema;
    use serde_json::json;

    fn engine() -> Engine {
        Engine::with_schemas([CollectionSchema::new("faqs")
            .with_required(&["question", "answer"])
            .with_text_index(&["question", "answer"])])
    }

    #[test]
    fn create_get_update_delete() {
        let e = engine();
        let created = create(&e, "faqs", &json!({"question": "Do panels work in winter?", "answer": "Yes"})).unwrap();
        let id = created.data["_id"].as_str().unwrap().to_string();
        assert_eq!(created.data["__v"], 0);

        let fetched = get(&e, "faqs", &id).unwrap();
        assert_eq!(fetched.data["question"], "Do panels work in winter?");

        let updated = update(&e, "faqs", &id, &json!({"answer": "Yes, at lower output", "__v": 99})).unwrap();
        assert_eq!(updated.data["answer"], "Yes, at lower output");
        assert_eq!(updated.data["__v"], 1);

        delete(&e, "faqs", &id).unwrap();
        assert!(matches!(get(&e, "faqs", &id), Err(CmsError::NoSuchDocument(_))));
        assert!(matches!(delete(&e, "faqs", &id), Err(CmsError::NoSuchDocument(_))));
    }

    #[test]
    fn create_requires_schema_fields() {
        let e = engine();
        let err = create(&e, "faqs", &json!({"question": "Cost?"})).unwrap_err();
        assert!(matches!(err, CmsError::Validation(ref m) if m.contains("answer")));
        assert_eq!(err.status_code(), 400);
        assert!(matches!(create(&e, "faqs", &json!([1, 2])), Err(CmsError::Validation(_))));
    }

    #[test]
    fn unknown_collection_is_404() {
        let err = list(&engine(), "widgets", &QueryString::new(), &ShaperConfig::default()).unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn list_envelope_counts_and_pages() {
        let e = engine();
        for n in 0..7 {
            create(&e, "faqs", &json!({"question": format!("q{n}"), "answer": "a", "n": n})).unwrap();
        }
        let qs = QueryString::parse("limit=3&page=3&sort=n");
        let res = list(&e, "faqs", &qs, &ShaperConfig::default()).unwrap();
        assert!(res.success);
        assert_eq!(res.total, 7);
        assert_eq!(res.count, 1);
        assert_eq!(res.data[0]["n"], 6);
        assert!(res.data[0].get("__v").is_none());
        assert_eq!(res.pagination.total_pages, 3);
        assert!(!res.pagination.has_next_page);
    }

    #[test]
    fn list_text_search_uses_index() {
        let e = engine();
        create(&e, "faqs", &json!({"question": "How do inverters work?", "answer": "They convert DC"})).unwrap();
        create(&e, "faqs", &json!({"question": "Warranty length?", "answer": "25 years"})).unwrap();
        let res = list(&e, "faqs", &QueryString::parse("q=inverters"), &ShaperConfig::default()).unwrap();
        assert_eq!(res.total, 1);
    }

    #[test]
    fn bad_operator_is_400_at_execution() {
        let e = engine();
        let err = list(&e, "faqs", &QueryString::parse("n[$near]=1"), &ShaperConfig::default()).unwrap_err();
        assert!(matches!(err, CmsError::Query(_)));
        assert_eq!(err.status_code(), 400);
    }
}
