//! Text search over a collection's text-index fields.
//!
//! Search strings follow the usual text-index conventions: bare words match if
//! any of them occurs as a word, `"quoted phrases"` must all occur, and `-word`
//! excludes documents containing that word. Matching is case-insensitive.

use bson::{Bson, Document as BsonDocument};

use super::eval::get_path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextSearch {
    pub terms: Vec<String>,
    pub phrases: Vec<String>,
    pub negated: Vec<String>,
}

impl TextSearch {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut out = Self::default();
        let mut rest = raw;
        while let Some(start) = rest.find('"') {
            let (before, after) = rest.split_at(start);
            out.push_words(before);
            let after = &after[1..];
            match after.find('"') {
                Some(end) => {
                    let phrase = after[..end].trim().to_lowercase();
                    if !phrase.is_empty() {
                        out.phrases.push(phrase);
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    // unterminated quote: the remainder is plain words
                    rest = after;
                    break;
                }
            }
        }
        out.push_words(rest);
        out
    }

    fn push_words(&mut self, chunk: &str) {
        for raw in chunk.split_whitespace() {
            if let Some(neg) = raw.strip_prefix('-') {
                self.negated.extend(tokenize(neg));
            } else {
                self.terms.extend(tokenize(raw));
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.phrases.is_empty()
    }

    /// Whether `doc` matches, looking only at `fields` (string or string-array values).
    #[must_use]
    pub fn matches(&self, doc: &BsonDocument, fields: &[String]) -> bool {
        if self.is_empty() {
            return false;
        }
        let text = collect_text(doc, fields);
        let words = tokenize(&text);
        if self.negated.iter().any(|n| words.contains(n)) {
            return false;
        }
        if !self.phrases.iter().all(|p| text.contains(p.as_str())) {
            return false;
        }
        self.terms.is_empty() || self.terms.iter().any(|t| words.contains(t))
    }
}

fn collect_text(doc: &BsonDocument, fields: &[String]) -> String {
    let mut text = String::new();
    for f in fields {
        match get_path(doc, f) {
            Some(Bson::String(s)) => push_lower(&mut text, s),
            Some(Bson::Array(items)) => {
                for item in items {
                    if let Bson::String(s) = item {
                        push_lower(&mut text, s);
                    }
                }
            }
            _ => {}
        }
    }
    text
}

fn push_lower(buf: &mut String, s: &str) {
    if !buf.is_empty() {
        buf.push(' ');
    }
    buf.push_str(&s.to_lowercase());
}

fn tokenize(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}
