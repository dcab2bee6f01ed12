//! Dot-and-index element paths and schema lookup by path.
//!
//! A path segment is either a sibling-unique `idShort` or a synthesized
//! list label (`Item3` or a bare numeric index). Paths are the addressing
//! scheme shared by the value store, validation and the outline builder.

use std::fmt;

use crate::schema::UiSchema;

/// Simple element path: a `Vec<String>` of segments with helpers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ElementPath(pub Vec<String>);

impl ElementPath {
    pub fn root() -> Self {
        ElementPath(Vec::new())
    }

    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self::root();
        }
        ElementPath(path.split('.').map(str::to_string).collect())
    }

    pub fn from_slice(parts: &[&str]) -> Self {
        ElementPath(parts.iter().map(|s| s.to_string()).collect())
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        self.0.push(segment.into());
    }

    /// Child path: `self` plus one segment.
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.push(segment);
        next
    }

    /// Parent path, or the root for a top-level segment.
    pub fn parent(&self) -> Self {
        let mut p = self.clone();
        p.0.pop();
        p
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn leaf(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl From<&str> for ElementPath {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

/// Zero-based index for a list segment: `Item3` → 2, `7` → 7.
pub fn index_segment(segment: &str) -> Option<usize> {
    if let Ok(n) = segment.parse::<usize>() {
        return Some(n);
    }
    segment
        .strip_prefix("Item")
        .and_then(|rest| rest.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
}

/// Resolve the schema fragment applicable at `path`, walking nested
/// `properties` by segment; index segments step into the list `items`
/// prototype. Returns `None` when the schema has no information for the
/// path (callers treat that as "no hints", not an error).
pub fn resolve_at_path<'a>(schema: &'a UiSchema, path: &ElementPath) -> Option<&'a UiSchema> {
    let mut current = schema;
    for segment in path.as_slice() {
        if let Some(next) = current.properties.get(segment) {
            current = next;
            continue;
        }
        if index_segment(segment).is_some() {
            if let Some(items) = current.items.as_deref() {
                current = items;
                continue;
            }
        }
        return None;
    }
    Some(current)
}
