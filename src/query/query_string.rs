//! Decoded HTTP query strings.
//!
//! `QueryString::parse("price[gt]=10&tags[]=pv&tags[]=battery&page=2")` yields
//! `{ page: "2", price: { gt: "10" }, tags: ["pv", "battery"] }`. Bracketed keys nest,
//! repeated keys accumulate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Nesting deeper than this is kept as a literal key suffix.
const MAX_KEY_DEPTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Single(String),
    Many(Vec<String>),
    Nested(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// The scalar value, or the first of a repeated value.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Single(s) => Some(s),
            Self::Many(v) => v.first().map(String::as_str),
            Self::Nested(_) => None,
        }
    }

    fn push(&mut self, value: String) {
        match self {
            Self::Single(old) => *self = Self::Many(vec![std::mem::take(old), value]),
            Self::Many(v) => v.push(value),
            Self::Nested(_) => log::warn!("query string: scalar value dropped for nested key"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Single(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::Single(s)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        Self::Many(v)
    }
}

/// Mapping from parameter name to raw value, as decoded from a request's query component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryString(BTreeMap<String, ParamValue>);

impl QueryString {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes an `application/x-www-form-urlencoded` query component. A leading
    /// `?` is ignored and pairs with an empty key are skipped.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        let mut qs = Self::new();
        for (k, v) in form_urlencoded::parse(raw.as_bytes()) {
            qs.push_pair(&k, v.into_owned());
        }
        qs
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// First scalar value for `key`; nested values have none.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(ParamValue::first)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Adds one decoded `key=value` pair, expanding bracket syntax in `key`.
    pub fn push_pair(&mut self, key: &str, value: String) {
        let (base, segments) = split_key(key);
        if base.is_empty() {
            return;
        }
        insert_path(&mut self.0, base, &segments, value);
    }
}

impl<K, V> FromIterator<(K, V)> for QueryString
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut qs = Self::new();
        for (k, v) in iter {
            qs.push_pair(k.as_ref(), v.into());
        }
        qs
    }
}

impl<'a> IntoIterator for &'a QueryString {
    type Item = (&'a String, &'a ParamValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Splits `a[b][c]` into `("a", ["b", "c"])`. Keys with unbalanced brackets stay literal.
fn split_key(key: &str) -> (&str, Vec<String>) {
    let Some(open) = key.find('[') else {
        return (key, Vec::new());
    };
    if open == 0 || !key.ends_with(']') {
        return (key, Vec::new());
    }
    let base = &key[..open];
    let mut segments = Vec::new();
    let mut rest = &key[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            return (key, Vec::new());
        };
        if segments.len() == MAX_KEY_DEPTH {
            // qs-style: overflow is kept as one literal segment
            segments.push(rest.to_string());
            break;
        }
        segments.push(inner[..close].to_string());
        rest = &inner[close + 1..];
    }
    if !rest.is_empty() && segments.len() <= MAX_KEY_DEPTH {
        return (key, Vec::new());
    }
    (base, segments)
}

fn insert_path(map: &mut BTreeMap<String, ParamValue>, key: &str, segments: &[String], value: String) {
    match segments.split_first() {
        // `key=v` and `key[]=v` both append
        None => push_value(map, key, value),
        Some((seg, rest)) if seg.is_empty() && rest.is_empty() => push_value(map, key, value),
        Some((seg, rest)) => {
            let slot = map.entry(key.to_string()).or_insert_with(|| ParamValue::Nested(BTreeMap::new()));
            if !matches!(slot, ParamValue::Nested(_)) {
                log::warn!("query string: `{key}` redefined as nested; earlier scalar dropped");
                *slot = ParamValue::Nested(BTreeMap::new());
            }
            if let ParamValue::Nested(inner) = slot {
                insert_path(inner, seg, rest, value);
            }
        }
    }
}

fn push_value(map: &mut BTreeMap<String, ParamValue>, key: &str, value: String) {
    match map.get_mut(key) {
        Some(existing) => existing.push(value),
        None => {
            map.insert(key.to_string(), ParamValue::Single(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested(pairs: &[(&str, ParamValue)]) -> ParamValue {
        ParamValue::Nested(pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect())
    }

    #[test]
    fn flat_pairs_and_percent_decoding() {
        let qs = QueryString::parse("?title=Solar%20Farm&city=New+Delhi&page=2");
        assert_eq!(qs.first("title"), Some("Solar Farm"));
        assert_eq!(qs.first("city"), Some("New Delhi"));
        assert_eq!(qs.first("page"), Some("2"));
        assert_eq!(qs.len(), 3);
    }

    #[test]
    fn brackets_nest() {
        let qs = QueryString::parse("price[gt]=10&price[lte]=99");
        assert_eq!(
            qs.get("price"),
            Some(&nested(&[("gt", "10".into()), ("lte", "99".into())]))
        );
    }

    #[test]
    fn repeated_keys_accumulate() {
        let qs = QueryString::parse("tag=pv&tag=battery&kind[]=a&kind[]=b");
        assert_eq!(qs.get("tag"), Some(&ParamValue::Many(vec!["pv".into(), "battery".into()])));
        assert_eq!(qs.get("kind"), Some(&ParamValue::Many(vec!["a".into(), "b".into()])));
        assert_eq!(qs.first("tag"), Some("pv"));
    }

    #[test]
    fn nested_repeated_values() {
        let qs = QueryString::parse("status[in]=draft&status[in]=live");
        assert_eq!(
            qs.get("status"),
            Some(&nested(&[("in", ParamValue::Many(vec!["draft".into(), "live".into()]))]))
        );
    }

    #[test]
    fn malformed_brackets_stay_literal() {
        let qs = QueryString::parse("a[b=1&[x]=2&c]d=3");
        assert_eq!(qs.first("a[b"), Some("1"));
        assert!(!qs.contains_key("x"));
        assert_eq!(qs.first("c]d"), Some("3"));
    }

    #[test]
    fn empty_keys_are_skipped() {
        let qs = QueryString::parse("=1&&a=");
        assert_eq!(qs.len(), 1);
        assert_eq!(qs.first("a"), Some(""));
    }

    #[test]
    fn deep_keys_keep_overflow_literal() {
        let qs = QueryString::parse("a[1][2][3][4][5][6][7]=x");
        let mut cur = qs.get("a").unwrap();
        for seg in ["1", "2", "3", "4", "5"] {
            match cur {
                ParamValue::Nested(m) => cur = m.get(seg).unwrap(),
                other => panic!("expected nesting at {seg}, got {other:?}"),
            }
        }
        match cur {
            ParamValue::Nested(m) => assert_eq!(m.get("[6][7]"), Some(&ParamValue::Single("x".into()))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn from_iterator_understands_brackets() {
        let qs: QueryString = [("price[gt]", "10"), ("limit", "5")].into_iter().collect();
        assert_eq!(qs.get("price"), Some(&nested(&[("gt", "10".into())])));
        assert_eq!(qs.first("limit"), Some("5"));
    }
}
