use crate::collection::Collection;
use crate::document::Document;
use crate::errors::CmsError;
use crate::utils::num::{u64_to_usize_saturating, usize_to_u64};
use bson::Document as BsonDocument;
use std::sync::Arc;
use std::time::Instant;

use super::eval::{compare_docs, eval_filter, project_fields};
use super::parse::parse_filter;
use super::text::TextSearch;
use super::types::{Filter, FindOptions, Projection};

/// Executes a find against `col`.
///
/// # Errors
/// `CmsError::Query` for malformed filters, mixed projections, or a text search on
/// a collection without a text index.
pub fn find_docs(
    col: &Arc<Collection>,
    conditions: &BsonDocument,
    text: Option<&str>,
    opts: &FindOptions,
) -> Result<Vec<BsonDocument>, CmsError> {
    find_page(col, conditions, text, opts).map(|(docs, _)| docs)
}

/// Executes a find and also returns how many documents matched before skip and
/// limit. Both come from one snapshot of the collection, so a concurrent write
/// cannot make the total disagree with the page.
///
/// # Errors
/// Same as [`find_docs`].
pub fn find_page(
    col: &Arc<Collection>,
    conditions: &BsonDocument,
    text: Option<&str>,
    opts: &FindOptions,
) -> Result<(Vec<BsonDocument>, u64), CmsError> {
    let bench_start = Instant::now();
    let matcher = Matcher::build(col, conditions, text)?;
    if let Some(p) = &opts.projection {
        check_projection(p)?;
    }

    let mut docs: Vec<Document> = col.documents().into_iter().filter(|d| matcher.matches(&d.data)).collect();
    let total = usize_to_u64(docs.len());

    if let Some(sort) = &opts.sort {
        // stable: ties keep insertion order
        docs.sort_by(|a, b| compare_docs(&a.data, &b.data, sort));
    }

    let skip = opts.skip.map_or(0, u64_to_usize_saturating);
    let limit = opts.limit.map_or(usize::MAX, u64_to_usize_saturating);
    let out: Vec<BsonDocument> = docs
        .into_iter()
        .skip(skip)
        .take(limit)
        .map(|d| match &opts.projection {
            Some(p) => project_fields(&d.data, p),
            None => d.data,
        })
        .collect();

    let dur_ms = bench_start.elapsed().as_millis();
    crate::dev6!(
        "{{\"bench\":\"query\",\"op\":\"find\",\"collection\":\"{}\",\"duration_ms\":{},\"result_count\":{},\"limit\":{},\"skip\":{}}}",
        col.name(),
        dur_ms,
        usize_to_u64(out.len()),
        opts.limit.unwrap_or(0),
        opts.skip.unwrap_or(0)
    );
    log::debug!(target: "solarcms::query", "find {} -> {}/{total} docs in {dur_ms}ms", col.name(), out.len());
    Ok((out, total))
}

/// Counts documents matching the filter and optional text search.
///
/// # Errors
/// Same as [`find_docs`] for the filter and text parts.
pub fn count_docs(col: &Arc<Collection>, conditions: &BsonDocument, text: Option<&str>) -> Result<u64, CmsError> {
    let start = Instant::now();
    let matcher = Matcher::build(col, conditions, text)?;
    let n = col.documents().iter().filter(|d| matcher.matches(&d.data)).count();
    crate::dev6!(
        "{{\"bench\":\"query\",\"op\":\"count\",\"collection\":\"{}\",\"duration_ms\":{},\"result_count\":{}}}",
        col.name(),
        start.elapsed().as_millis(),
        usize_to_u64(n)
    );
    Ok(usize_to_u64(n))
}

struct Matcher {
    filter: Filter,
    text: Option<(TextSearch, Vec<String>)>,
}

impl Matcher {
    fn build(col: &Collection, conditions: &BsonDocument, text: Option<&str>) -> Result<Self, CmsError> {
        let filter = parse_filter(conditions)?;
        let text = match text {
            None => None,
            Some(raw) => {
                let fields = col.text_index_fields();
                if fields.is_empty() {
                    return Err(CmsError::Query(format!(
                        "text index required for $text query on `{}`",
                        col.name()
                    )));
                }
                Some((TextSearch::parse(raw), fields))
            }
        };
        Ok(Self { filter, text })
    }

    fn matches(&self, doc: &BsonDocument) -> bool {
        eval_filter(doc, &self.filter)
            && self.text.as_ref().is_none_or(|(search, fields)| search.matches(doc, fields))
    }
}

fn check_projection(p: &Projection) -> Result<(), CmsError> {
    // `_id` may be dropped from an inclusion list; anything else cannot be mixed
    if !p.include.is_empty() && p.exclude.iter().any(|f| f != crate::types::ID_FIELD) {
        return Err(CmsError::Query("projection cannot have a mix of inclusion and exclusion".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::CollectionSchema;
    use crate::query::{Order, SortSpec};
    use bson::doc;

    fn seeded() -> Arc<Collection> {
        let col = Arc::new(Collection::new(
            CollectionSchema::new("blogs").with_text_index(&["title"]),
        ));
        for (k, title) in [(2, "Net metering"), (1, "Solar basics"), (3, "Battery care")] {
            col.insert_document(Document::new(doc! {"k": k, "title": title})).unwrap();
        }
        col
    }

    #[test]
    fn find_docs_projection_sort_and_pagination() {
        let col = seeded();
        let opts = FindOptions {
            projection: Some(Projection::include(["k"])),
            sort: Some(vec![SortSpec { field: "k".into(), order: Order::Asc }]),
            limit: Some(2),
            skip: Some(1),
        };
        let docs = find_docs(&col, &doc! {}, None, &opts).unwrap();
        assert_eq!(docs, vec![doc! {"k": 2}, doc! {"k": 3}]);
    }

    #[test]
    fn skip_beyond_length_is_empty() {
        let col = seeded();
        let opts = FindOptions { skip: Some(10), ..FindOptions::default() };
        assert!(find_docs(&col, &doc! {}, None, &opts).unwrap().is_empty());
    }

    #[test]
    fn text_search_requires_index() {
        let col = Arc::new(Collection::new(CollectionSchema::new("faqs")));
        let err = count_docs(&col, &doc! {}, Some("solar")).unwrap_err();
        assert!(matches!(err, CmsError::Query(ref m) if m.contains("text index")));
        assert_eq!(count_docs(&seeded(), &doc! {}, Some("solar battery")).unwrap(), 2);
    }

    #[test]
    fn mixed_projection_fails_at_execution() {
        let col = seeded();
        let opts = FindOptions {
            projection: Some(Projection { include: vec!["k".into()], exclude: vec!["title".into()] }),
            ..FindOptions::default()
        };
        assert!(matches!(find_docs(&col, &doc! {}, None, &opts), Err(CmsError::Query(_))));
        let only_id = FindOptions {
            projection: Some(Projection { include: vec!["k".into()], exclude: vec!["_id".into()] }),
            ..FindOptions::default()
        };
        assert_eq!(find_docs(&col, &doc! {"k": 1}, None, &only_id).unwrap(), vec![doc! {"k": 1}]);
    }

    #[test]
    fn page_and_total_share_one_snapshot() {
        let col = seeded();
        let opts = FindOptions { skip: Some(1), limit: Some(1), ..FindOptions::default() };
        let (page, total) = find_page(&col, &doc! {"k": {"$gte": 2}}, None, &opts).unwrap();
        assert_eq!(total, 2);
        assert_eq!(page.len(), 1);
        let (page, total) = find_page(&col, &doc! {"k": 99}, None, &opts).unwrap();
        assert!(page.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn bench_lines_reach_thread_sink() {
        let cap = crate::utils::devlog::BenchCapture::start();
        let col = seeded();
        let _ = count_docs(&col, &doc! {"k": {"$gte": 2}}, None).unwrap();
        let lines = cap.take();
        assert!(lines.iter().any(|l| l.contains("\"op\":\"count\"") && l.contains("\"result_count\":2")));
    }
}
