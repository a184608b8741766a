use crate::errors::CmsError;
use bson::{Bson, Document as BsonDocument};

#[cfg(feature = "regex")]
use super::types::Pattern;
use super::types::{CmpOp, Filter, MAX_FILTER_DEPTH, MAX_IN_SET};

/// Parses a store filter document (`{ price: { $gt: "10" }, status: "live" }`) into a
/// [`Filter`]. Called when a query executes, so malformed shapes surface there.
///
/// # Errors
/// Returns `CmsError::Query` for unknown operators, mixed operator/plain keys and
/// malformed logical combinators.
pub fn parse_filter(doc: &BsonDocument) -> Result<Filter, CmsError> {
    parse_level(doc, 0)
}

fn parse_level(doc: &BsonDocument, depth: usize) -> Result<Filter, CmsError> {
    if depth > MAX_FILTER_DEPTH {
        return Err(CmsError::Query("filter nested too deeply".into()));
    }
    let mut clauses = Vec::with_capacity(doc.len());
    for (key, value) in doc {
        if let Some(op) = key.strip_prefix('$') {
            clauses.push(parse_logical(op, value, depth)?);
        } else {
            clauses.push(parse_field(key, value)?);
        }
    }
    Ok(match clauses.len() {
        0 => Filter::True,
        1 => clauses.pop().unwrap_or(Filter::True),
        _ => Filter::And(clauses),
    })
}

fn parse_logical(op: &str, value: &Bson, depth: usize) -> Result<Filter, CmsError> {
    let Bson::Array(items) = value else {
        return Err(CmsError::Query(format!("${op} requires an array")));
    };
    let mut subs = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Bson::Document(d) => subs.push(parse_level(d, depth + 1)?),
            _ => return Err(CmsError::Query(format!("${op} entries must be objects"))),
        }
    }
    match op {
        "and" => Ok(Filter::And(subs)),
        "or" => Ok(Filter::Or(subs)),
        "nor" => Ok(Filter::Not(Box::new(Filter::Or(subs)))),
        _ => Err(CmsError::Query(format!("unknown top level operator: ${op}"))),
    }
}

fn parse_field(path: &str, value: &Bson) -> Result<Filter, CmsError> {
    match value {
        Bson::Document(ops) if ops.keys().any(|k| k.starts_with('$')) => parse_operators(path, ops),
        // array equality on a scalar path is cast to $in
        Bson::Array(values) => Ok(Filter::In { path: path.to_string(), values: cap_set(values.clone()) }),
        other => Ok(Filter::Cmp { path: path.to_string(), op: CmpOp::Eq, value: other.clone() }),
    }
}

fn parse_operators(path: &str, ops: &BsonDocument) -> Result<Filter, CmsError> {
    if let Some(plain) = ops.keys().find(|k| !k.starts_with('$')) {
        return Err(CmsError::Query(format!(
            "cannot mix operators and plain keys under `{path}` (found `{plain}`)"
        )));
    }
    #[cfg(feature = "regex")]
    let case_insensitive = matches!(ops.get("$options"), Some(Bson::String(o)) if o.contains('i'));
    let mut clauses = Vec::with_capacity(ops.len());
    for (op, v) in ops {
        let p = path.to_string();
        let clause = match op.as_str() {
            "$eq" => Filter::Cmp { path: p, op: CmpOp::Eq, value: v.clone() },
            "$ne" => Filter::Cmp { path: p, op: CmpOp::Ne, value: v.clone() },
            "$gt" => Filter::Cmp { path: p, op: CmpOp::Gt, value: v.clone() },
            "$gte" => Filter::Cmp { path: p, op: CmpOp::Gte, value: v.clone() },
            "$lt" => Filter::Cmp { path: p, op: CmpOp::Lt, value: v.clone() },
            "$lte" => Filter::Cmp { path: p, op: CmpOp::Lte, value: v.clone() },
            "$in" => Filter::In { path: p, values: set_operand(op, v)? },
            "$nin" => Filter::Nin { path: p, values: set_operand(op, v)? },
            "$exists" => Filter::Exists { path: p, exists: truthy(op, v)? },
            "$not" => match v {
                Bson::Document(inner) => Filter::Not(Box::new(parse_operators(path, inner)?)),
                _ => return Err(CmsError::Query("$not requires an operator object".into())),
            },
            #[cfg(feature = "regex")]
            "$regex" => match v {
                Bson::String(source) => Filter::Regex { path: p, pattern: Pattern::compile(source, case_insensitive)? },
                _ => return Err(CmsError::Query("$regex requires a string".into())),
            },
            #[cfg(feature = "regex")]
            "$options" => continue,
            other => return Err(CmsError::Query(format!("unknown operator: {other}"))),
        };
        clauses.push(clause);
    }
    Ok(if clauses.len() == 1 { clauses.pop().unwrap_or(Filter::True) } else { Filter::And(clauses) })
}

/// `$in` / `$nin` accept an array or, as sent from query strings, a comma separated string.
fn set_operand(op: &str, v: &Bson) -> Result<Vec<Bson>, CmsError> {
    match v {
        Bson::Array(items) => Ok(cap_set(items.clone())),
        Bson::String(s) => Ok(cap_set(
            s.split(',').map(str::trim).filter(|x| !x.is_empty()).map(|x| Bson::String(x.to_string())).collect(),
        )),
        _ => Err(CmsError::Query(format!("{op} needs an array"))),
    }
}

fn truthy(op: &str, v: &Bson) -> Result<bool, CmsError> {
    match v {
        Bson::Boolean(b) => Ok(*b),
        Bson::Int32(n) => Ok(*n != 0),
        Bson::Int64(n) => Ok(*n != 0),
        Bson::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(CmsError::Query(format!("{op} requires a boolean, got `{s}`"))),
        },
        _ => Err(CmsError::Query(format!("{op} requires a boolean"))),
    }
}

fn cap_set(mut values: Vec<Bson>) -> Vec<Bson> {
    values.truncate(MAX_IN_SET);
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn empty_filter_is_true() {
        assert_eq!(parse_filter(&doc! {}).unwrap(), Filter::True);
    }

    #[test]
    fn operator_object_becomes_cmp() {
        let f = parse_filter(&doc! {"price": {"$gt": "10"}}).unwrap();
        assert_eq!(f, Filter::Cmp { path: "price".into(), op: CmpOp::Gt, value: Bson::String("10".into()) });
    }

    #[test]
    fn range_pairs_are_anded() {
        let f = parse_filter(&doc! {"price": {"$gte": 1, "$lt": 5}}).unwrap();
        assert!(matches!(f, Filter::And(ref v) if v.len() == 2));
    }

    #[test]
    fn plain_object_is_embedded_equality() {
        let f = parse_filter(&doc! {"location": {"city": "Pune"}}).unwrap();
        assert!(matches!(f, Filter::Cmp { op: CmpOp::Eq, value: Bson::Document(_), .. }));
    }

    #[test]
    fn arrays_cast_to_in_and_strings_split_for_in() {
        let f = parse_filter(&doc! {"status": ["draft", "live"]}).unwrap();
        assert!(matches!(f, Filter::In { ref values, .. } if values.len() == 2));
        let f = parse_filter(&doc! {"status": {"$in": "draft, live"}}).unwrap();
        assert!(matches!(f, Filter::In { ref values, .. } if values.len() == 2));
    }

    #[test]
    fn unknown_and_mixed_operators_fail() {
        assert!(matches!(parse_filter(&doc! {"a": {"$near": 1}}), Err(CmsError::Query(_))));
        assert!(matches!(parse_filter(&doc! {"a": {"$gt": 1, "b": 2}}), Err(CmsError::Query(_))));
        assert!(matches!(parse_filter(&doc! {"$where": "1"}), Err(CmsError::Query(_))));
        assert!(matches!(parse_filter(&doc! {"$or": {"a": 1}}), Err(CmsError::Query(_))));
    }

    #[test]
    fn logical_operators_parse() {
        let f = parse_filter(&doc! {"$or": [{"a": 1}, {"b": {"$exists": "true"}}]}).unwrap();
        assert!(matches!(f, Filter::Or(ref v) if v.len() == 2));
        let f = parse_filter(&doc! {"$nor": [{"a": 1}]}).unwrap();
        assert!(matches!(f, Filter::Not(_)));
    }

    #[cfg(feature = "regex")]
    #[test]
    fn regex_compiles_at_parse_time() {
        let f = parse_filter(&doc! {"answer": {"$regex": "ab+", "$options": "i"}}).unwrap();
        let Filter::Regex { ref pattern, .. } = f else { panic!("expected regex, got {f:?}") };
        assert!(pattern.is_match("xABBy"));
        let err = parse_filter(&doc! {"answer": {"$regex": "["}}).unwrap_err();
        assert!(matches!(err, CmsError::Query(ref m) if m.contains("$regex")));
        assert!(matches!(parse_filter(&doc! {"answer": {"$regex": 3}}), Err(CmsError::Query(_))));
    }

    #[test]
    fn exists_rejects_garbage() {
        assert!(parse_filter(&doc! {"a": {"$exists": "maybe"}}).is_err());
    }
}
