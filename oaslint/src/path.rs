//! Document paths.
//!
//! A [`DocPath`] is an immutable, persistent list of [`PathSegment`]s from the
//! document root. Appending a segment shares the parent list, so sibling
//! recursive calls can never corrupt each other's paths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// One step from a container to a child: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl PathSegment {
    #[must_use]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            PathSegment::Key(k) => Some(k),
            PathSegment::Index(_) => None,
        }
    }

    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathSegment::Index(i) => Some(*i),
            PathSegment::Key(_) => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => f.write_str(k),
            PathSegment::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        PathSegment::Key(value.to_owned())
    }
}

impl From<String> for PathSegment {
    fn from(value: String) -> Self {
        PathSegment::Key(value)
    }
}

impl From<&String> for PathSegment {
    fn from(value: &String) -> Self {
        PathSegment::Key(value.clone())
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        PathSegment::Index(value)
    }
}

#[derive(Debug)]
struct Link {
    parent: Option<Arc<Link>>,
    segment: PathSegment,
}

/// Persistent path from the document root to a node.
#[derive(Clone, Default)]
pub struct DocPath {
    tail: Option<Arc<Link>>,
    len: usize,
}

impl DocPath {
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PathSegment>,
    {
        segments
            .into_iter()
            .fold(Self::root(), |path, seg| path.child(seg))
    }

    /// Returns a new path with `segment` appended. `self` is left untouched.
    #[must_use]
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        DocPath {
            tail: Some(Arc::new(Link {
                parent: self.tail.clone(),
                segment: segment.into(),
            })),
            len: self.len + 1,
        }
    }

    /// Appends several segments at once.
    #[must_use]
    pub fn join<I, S>(&self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PathSegment>,
    {
        segments
            .into_iter()
            .fold(self.clone(), |path, seg| path.child(seg))
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.tail.as_ref().map(|link| DocPath {
            tail: link.parent.clone(),
            len: self.len - 1,
        })
    }

    #[must_use]
    pub fn last(&self) -> Option<&PathSegment> {
        self.tail.as_ref().map(|link| &link.segment)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Materializes the segments in root-to-leaf order.
    #[must_use]
    pub fn segments(&self) -> Vec<PathSegment> {
        let mut out = Vec::with_capacity(self.len);
        let mut cur = self.tail.as_deref();
        while let Some(link) = cur {
            out.push(link.segment.clone());
            cur = link.parent.as_deref();
        }
        out.reverse();
        out
    }

    /// Whether `prefix` is a leading part of this path (or equal to it).
    #[must_use]
    pub fn starts_with(&self, prefix: &DocPath) -> bool {
        if prefix.len > self.len {
            return false;
        }
        let mine = self.segments();
        prefix
            .segments()
            .iter()
            .zip(mine.iter())
            .all(|(a, b)| a == b)
    }

    /// Renders the path as a local JSON pointer (`#/a/b~1c/0`).
    #[must_use]
    pub fn to_pointer(&self) -> String {
        let mut out = String::from("#");
        for seg in self.segments() {
            out.push('/');
            match seg {
                PathSegment::Key(k) => out.push_str(&k.replace('~', "~0").replace('/', "~1")),
                PathSegment::Index(i) => out.push_str(&i.to_string()),
            }
        }
        out
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments().iter().map(ToString::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

impl fmt::Debug for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocPath({self})")
    }
}

impl PartialEq for DocPath {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.segments() == other.segments()
    }
}

impl Eq for DocPath {}

impl Hash for DocPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.segments().hash(state);
    }
}

impl Serialize for DocPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.segments().serialize(serializer)
    }
}

/// Splits a dotted path such as `paths./pets.get.responses[200]` or
/// `components['schemas'].Pet` into raw segments.
///
/// Bracketed parts become their own segment; numeric bracket contents become
/// indices and quoted contents keys. Dots inside brackets are preserved.
#[must_use]
pub fn parse_dotted(path: &str) -> Vec<PathSegment> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let chars: Vec<char> = path.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '.' => {
                if !buf.is_empty() {
                    out.push(PathSegment::Key(std::mem::take(&mut buf)));
                }
                i += 1;
            }
            '[' => {
                if !buf.is_empty() {
                    out.push(PathSegment::Key(std::mem::take(&mut buf)));
                }
                let Some(offset) = chars[i + 1..].iter().position(|c| *c == ']') else {
                    buf.extend(&chars[i..]);
                    break;
                };
                let inner: String = chars[i + 1..i + 1 + offset].iter().collect();
                out.push(bracket_segment(&inner));
                i += offset + 2;
            }
            _ => {
                buf.push(ch);
                i += 1;
            }
        }
    }

    if !buf.is_empty() {
        out.push(PathSegment::Key(buf));
    }

    out
}

fn bracket_segment(inner: &str) -> PathSegment {
    let trimmed = inner.trim();
    for quote in ['\'', '"'] {
        if let Some(unquoted) = trimmed
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return PathSegment::Key(unquoted.to_owned());
        }
    }
    match trimmed.parse::<usize>() {
        Ok(idx) => PathSegment::Index(idx),
        Err(_) => PathSegment::Key(trimmed.to_owned()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_child_does_not_mutate_parent() {
        let base = DocPath::from_segments(["components", "schemas"]);
        let a = base.child("A");
        let b = base.child("B");

        assert_eq!(base.to_string(), "components.schemas");
        assert_eq!(a.to_string(), "components.schemas.A");
        assert_eq!(b.to_string(), "components.schemas.B");
        assert_eq!(a.parent().unwrap(), base);
    }

    #[test]
    fn test_segments_and_indices() {
        let path = DocPath::root().child("allOf").child(1_usize).child("properties");
        assert_eq!(
            path.segments(),
            vec![
                PathSegment::Key("allOf".to_owned()),
                PathSegment::Index(1),
                PathSegment::Key("properties".to_owned()),
            ]
        );
        assert_eq!(path.len(), 3);
        assert_eq!(path.last(), Some(&PathSegment::Key("properties".to_owned())));
    }

    #[test]
    fn test_to_pointer_escapes() {
        let path = DocPath::from_segments(["paths", "/pets/{id}", "get"]);
        assert_eq!(path.to_pointer(), "#/paths/~1pets~1{id}/get");
        assert_eq!(DocPath::root().to_pointer(), "#");
    }

    #[test]
    fn test_starts_with() {
        let path = DocPath::from_segments(["a", "b", "c"]);
        assert!(path.starts_with(&DocPath::from_segments(["a", "b"])));
        assert!(path.starts_with(&DocPath::root()));
        assert!(!path.starts_with(&DocPath::from_segments(["a", "c"])));
    }

    #[test]
    fn test_serialize_as_array() {
        let path = DocPath::root().child("items").child(0_usize);
        let json = serde_json::to_value(&path).unwrap();
        assert_eq!(json, serde_json::json!(["items", 0]));
    }

    #[test]
    fn test_parse_dotted_simple() {
        assert_eq!(
            parse_dotted("components.schemas.Pet"),
            vec![
                PathSegment::from("components"),
                PathSegment::from("schemas"),
                PathSegment::from("Pet"),
            ]
        );
    }

    #[test]
    fn test_parse_dotted_brackets() {
        assert_eq!(
            parse_dotted("paths['/pets'].get.parameters[0]"),
            vec![
                PathSegment::from("paths"),
                PathSegment::from("/pets"),
                PathSegment::from("get"),
                PathSegment::from("parameters"),
                PathSegment::Index(0),
            ]
        );
    }

    #[test]
    fn test_parse_dotted_unterminated_bracket() {
        assert_eq!(
            parse_dotted("a[0"),
            vec![PathSegment::from("a"), PathSegment::from("[0")]
        );
    }
}
