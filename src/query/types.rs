use bson::Bson;
use serde::{Deserialize, Serialize};

// Safety limits to prevent resource abuse
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_IN_SET: usize = 1000;
pub(crate) const MAX_SORT_FIELDS: usize = 8;
pub(crate) const MAX_PROJECTION_FIELDS: usize = 64;
pub(crate) const MAX_FILTER_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Desc }
    }

    /// Parses a comma separated list such as `-createdAt,title`; a leading `-`
    /// means descending, a leading `+` is tolerated. Blank entries are skipped.
    #[must_use]
    pub fn parse_list(raw: &str) -> Vec<SortSpec> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| match s.strip_prefix('-') {
                Some(f) if !f.is_empty() => Some(Self::desc(f)),
                Some(_) => None,
                None => {
                    let f = s.strip_prefix('+').unwrap_or(s);
                    (!f.is_empty()).then(|| Self::asc(f))
                }
            })
            .collect()
    }
}

/// Result projection. Inclusion and exclusion cannot be mixed; that is reported
/// when the query executes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Projection {
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { include: fields.into_iter().map(Into::into).collect(), exclude: Vec::new() }
    }

    pub fn exclude<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { include: Vec::new(), exclude: fields.into_iter().map(Into::into).collect() }
    }

    /// Parses `title,summary` (inclusion) or `-body` (exclusion) lists.
    #[must_use]
    pub fn parse_list(raw: &str) -> Self {
        let mut out = Self::default();
        for f in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match f.strip_prefix('-') {
                Some(name) if !name.is_empty() => out.exclude.push(name.to_string()),
                Some(_) => {}
                None => out.include.push(f.strip_prefix('+').unwrap_or(f).to_string()),
            }
        }
        out
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

/// Options for `find_docs`.
///
/// Semantics:
/// - Sorting is applied before skip/limit, projection last.
/// - `limit: None` returns every remaining document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindOptions {
    pub projection: Option<Projection>,
    pub sort: Option<Vec<SortSpec>>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Exists { path: String, exists: bool },
    In { path: String, values: Vec<Bson> },
    Nin { path: String, values: Vec<Bson> },
    Cmp { path: String, op: CmpOp, value: Bson },
    #[cfg(feature = "regex")]
    Regex { path: String, pattern: Pattern },
}

/// A `$regex` compiled once at parse time. Equal when the source patterns
/// (flags included) are equal.
#[cfg(feature = "regex")]
#[derive(Debug, Clone)]
pub struct Pattern(pub regex::Regex);

#[cfg(feature = "regex")]
impl Pattern {
    /// # Errors
    /// `CmsError::Query` when the pattern does not compile.
    pub fn compile(source: &str, case_insensitive: bool) -> Result<Self, crate::errors::CmsError> {
        let full = if case_insensitive { format!("(?i){source}") } else { source.to_string() };
        regex::Regex::new(&full)
            .map(Pattern)
            .map_err(|e| crate::errors::CmsError::Query(format!("invalid $regex `{source}`: {e}")))
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.0.is_match(s)
    }
}

#[cfg(feature = "regex")]
impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}
