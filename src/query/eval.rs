use bson::{Bson, Document as BsonDocument};
use chrono::{NaiveDate, Utc};
use std::borrow::Cow;
use std::cmp::Ordering;

use super::types::{CmpOp, Filter, MAX_PATH_DEPTH, MAX_PROJECTION_FIELDS, MAX_SORT_FIELDS, Order, Projection, SortSpec};

pub fn eval_filter(doc: &BsonDocument, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Not(f) => !eval_filter(doc, f),
        Filter::Exists { path, exists } => get_path(doc, path).is_some() == *exists,
        Filter::In { path, values } => get_path(doc, path).is_some_and(|v| matches_any(v, values)),
        Filter::Nin { path, values } => !get_path(doc, path).is_some_and(|v| matches_any(v, values)),
        Filter::Cmp { path, op: CmpOp::Ne, value } => {
            !get_path(doc, path).is_some_and(|v| matches_eq(v, value))
        }
        Filter::Cmp { path, op, value } => get_path(doc, path).is_some_and(|v| match op {
            CmpOp::Eq => matches_eq(v, value),
            _ => matches_range(v, *op, value),
        }),
        #[cfg(feature = "regex")]
        Filter::Regex { path, pattern } => {
            matches!(get_path(doc, path), Some(Bson::String(s)) if pattern.is_match(s))
        }
    }
}

/// Equality; array fields match when the whole array or any element equals.
fn matches_eq(stored: &Bson, query: &Bson) -> bool {
    if let Bson::Array(items) = stored {
        if let Bson::Array(_) = query {
            return stored == query;
        }
        return items.iter().any(|item| matches_eq(item, query));
    }
    let q = cast_like(stored, query);
    if is_num(stored) && is_num(&q) {
        return as_f64_num(stored) == as_f64_num(&q);
    }
    stored == q.as_ref()
}

fn matches_range(stored: &Bson, op: CmpOp, query: &Bson) -> bool {
    if let Bson::Array(items) = stored {
        return items.iter().any(|item| matches_range(item, op, query));
    }
    let q = cast_like(stored, query);
    if !comparable(stored, &q) {
        return false;
    }
    let ord = compare_bson(stored, &q);
    match op {
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::Gte => ord != Ordering::Less,
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::Lte => ord != Ordering::Greater,
        CmpOp::Eq | CmpOp::Ne => false,
    }
}

fn matches_any(stored: &Bson, set: &[Bson]) -> bool {
    set.iter().any(|x| matches_eq(stored, x))
}

/// Casts a string query value to the stored value's type, the way a schema would:
/// numbers, booleans and dates. Anything that does not parse is left untouched.
pub fn cast_like<'a>(stored: &Bson, query: &'a Bson) -> Cow<'a, Bson> {
    let Bson::String(s) = query else {
        return Cow::Borrowed(query);
    };
    let s = s.trim();
    let cast = match stored {
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => {
            s.parse::<f64>().ok().filter(|f| f.is_finite()).map(Bson::Double)
        }
        Bson::Boolean(_) => match s {
            "true" | "1" => Some(Bson::Boolean(true)),
            "false" | "0" => Some(Bson::Boolean(false)),
            _ => None,
        },
        Bson::DateTime(_) => parse_date(s).map(Bson::DateTime),
        _ => None,
    };
    cast.map_or(Cow::Borrowed(query), Cow::Owned)
}

fn parse_date(s: &str) -> Option<bson::DateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(bson::DateTime::from_millis(dt.with_timezone(&Utc).timestamp_millis()));
    }
    let day = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    let ms = day.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis();
    Some(bson::DateTime::from_millis(ms))
}

fn comparable(a: &Bson, b: &Bson) -> bool {
    (is_num(a) && is_num(b))
        || matches!(
            (a, b),
            (Bson::String(_), Bson::String(_))
                | (Bson::Boolean(_), Bson::Boolean(_))
                | (Bson::DateTime(_), Bson::DateTime(_))
        )
}

pub fn compare_docs(a: &BsonDocument, b: &BsonDocument, sort: &[SortSpec]) -> Ordering {
    for s in sort.iter().take(MAX_SORT_FIELDS) {
        let va = get_path(a, &s.field);
        let vb = get_path(b, &s.field);
        let ord = match (va, vb) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if s.order == Order::Asc { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

pub(crate) fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let mut cur = doc;
    let mut parts = path.split('.').peekable();
    let mut segs = 0usize;
    while let Some(part) = parts.next() {
        segs += 1;
        if segs > MAX_PATH_DEPTH {
            return None;
        }
        let v = cur.get(part)?;
        if parts.peek().is_none() {
            return Some(v);
        }
        match v {
            Bson::Document(d) => cur = d,
            _ => return None,
        }
    }
    None
}

fn is_num(x: &Bson) -> bool {
    matches!(x, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_))
}

#[allow(clippy::cast_precision_loss)]
fn as_f64_num(x: &Bson) -> f64 {
    match x {
        Bson::Int32(i) => f64::from(*i),
        Bson::Int64(i) => *i as f64,
        Bson::Double(f) => *f,
        Bson::Decimal128(d) => d.to_string().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    if is_num(a) && is_num(b) {
        return as_f64_num(a).total_cmp(&as_f64_num(b));
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.timestamp_millis().cmp(&y.timestamp_millis()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

// mongo-style cross type order: null < numbers < strings < objects < arrays < bool < dates
fn type_rank(v: &Bson) -> u8 {
    match v {
        Bson::Null | Bson::Undefined => 0,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 1,
        Bson::String(_) | Bson::Symbol(_) => 2,
        Bson::Document(_) => 3,
        Bson::Array(_) => 4,
        Bson::Binary(_) => 5,
        Bson::ObjectId(_) => 6,
        Bson::Boolean(_) => 7,
        Bson::DateTime(_) => 8,
        Bson::Timestamp(_) => 9,
        _ => 10,
    }
}

/// Applies a projection. An inclusion list keeps exactly the named fields (dotted
/// paths keep the nested value under the full path's top-level key); exclusions are
/// removed afterwards.
pub fn project_fields(doc: &BsonDocument, projection: &Projection) -> BsonDocument {
    let mut out = if projection.include.is_empty() {
        doc.clone()
    } else {
        let mut picked = BsonDocument::new();
        for f in projection.include.iter().take(MAX_PROJECTION_FIELDS) {
            if let Some(v) = get_path(doc, f) {
                insert_path(&mut picked, f, v.clone());
            }
        }
        picked
    };
    for f in projection.exclude.iter().take(MAX_PROJECTION_FIELDS) {
        remove_path(&mut out, f);
    }
    out
}

fn insert_path(out: &mut BsonDocument, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            out.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(out.get(head), Some(Bson::Document(_))) {
                out.insert(head, Bson::Document(BsonDocument::new()));
            }
            if let Some(Bson::Document(sub)) = out.get_mut(head) {
                insert_path(sub, rest, value);
            }
        }
    }
}

fn remove_path(doc: &mut BsonDocument, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(sub)) = doc.get_mut(head) {
                remove_path(sub, rest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn cmp(path: &str, op: CmpOp, value: impl Into<Bson>) -> Filter {
        Filter::Cmp { path: path.into(), op, value: value.into() }
    }

    #[test]
    fn string_query_values_cast_to_numbers() {
        let d = doc! {"price": 150};
        assert!(eval_filter(&d, &cmp("price", CmpOp::Gt, "100")));
        assert!(!eval_filter(&d, &cmp("price", CmpOp::Lt, "100")));
        assert!(eval_filter(&d, &cmp("price", CmpOp::Eq, "150")));
        assert!(!eval_filter(&d, &cmp("price", CmpOp::Gt, "abc")));
    }

    #[test]
    fn string_query_values_cast_to_bool_and_date() {
        let d = doc! {"featured": true, "publishedAt": bson::DateTime::from_millis(1_700_000_000_000)};
        assert!(eval_filter(&d, &cmp("featured", CmpOp::Eq, "true")));
        assert!(eval_filter(&d, &cmp("publishedAt", CmpOp::Gte, "2023-01-01")));
        assert!(eval_filter(&d, &cmp("publishedAt", CmpOp::Lt, "2024-01-01T00:00:00Z")));
    }

    #[test]
    fn string_fields_compare_as_strings() {
        let d = doc! {"code": "007"};
        assert!(eval_filter(&d, &cmp("code", CmpOp::Eq, "007")));
        assert!(!eval_filter(&d, &cmp("code", CmpOp::Eq, "7")));
    }

    #[test]
    fn array_fields_match_any_element() {
        let d = doc! {"tags": ["pv", "battery"]};
        assert!(eval_filter(&d, &cmp("tags", CmpOp::Eq, "pv")));
        assert!(eval_filter(&d, &Filter::In { path: "tags".into(), values: vec!["x".into(), "battery".into()] }));
        assert!(!eval_filter(&d, &Filter::Nin { path: "tags".into(), values: vec!["pv".into()] }));
    }

    #[test]
    fn ne_matches_missing_fields() {
        let d = doc! {"a": 1};
        assert!(eval_filter(&d, &cmp("b", CmpOp::Ne, 1)));
        assert!(!eval_filter(&d, &cmp("a", CmpOp::Ne, "1")));
    }

    #[test]
    fn dotted_paths() {
        let d = doc! {"site": {"city": "Pune", "kw": 40}};
        assert!(eval_filter(&d, &cmp("site.city", CmpOp::Eq, "Pune")));
        assert!(eval_filter(&d, &cmp("site.kw", CmpOp::Gte, "40")));
        assert!(!eval_filter(&d, &cmp("site.city.x", CmpOp::Eq, "Pune")));
    }

    #[test]
    fn compare_docs_multi_key() {
        let a = doc! {"k": 1, "n": "b"};
        let b = doc! {"k": 1, "n": "a"};
        let sort = vec![SortSpec::asc("k"), SortSpec::desc("n")];
        assert_eq!(compare_docs(&a, &b, &sort), Ordering::Less);
    }

    #[test]
    fn projection_include_and_exclude() {
        let d = doc! {"_id": "1", "title": "t", "body": "b", "meta": {"a": 1, "b": 2}, "__v": 0};
        let inc = project_fields(&d, &Projection::include(["title", "meta.a"]));
        assert_eq!(inc, doc! {"title": "t", "meta": {"a": 1}});
        let exc = project_fields(&d, &Projection::exclude(["__v", "meta.b"]));
        assert_eq!(exc, doc! {"_id": "1", "title": "t", "body": "b", "meta": {"a": 1}});
    }
}
