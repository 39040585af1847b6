//! Issue paths locating a failure inside a nested value.
//!
//! Validators report where an issue occurred as an [`IssuePath`], an ordered
//! sequence of object keys and array indices.

use std::fmt::{self, Display};

/// A single step into a nested value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// An object key (e.g. `type`, `value`)
    Key(String),
    /// An array or tuple position (e.g. `[0]`)
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(idx: usize) -> Self {
        PathSegment::Index(idx)
    }
}

/// Location of an issue relative to the validated value.
///
/// The root path is empty. Paths are built with [`IssuePath::key`] and
/// [`IssuePath::index`], which return new paths and leave the receiver
/// untouched.
///
/// # Example
///
/// ```rust
/// use schematch::IssuePath;
///
/// let path = IssuePath::root().key("items").index(2).key("id");
/// assert_eq!(path.to_string(), "items[2].id");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct IssuePath {
    segments: Vec<PathSegment>,
}

impl IssuePath {
    /// The empty path, pointing at the value itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a new path with an object key appended.
    pub fn key(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Key(name.into()));
        Self { segments }
    }

    /// Returns a new path with a position appended.
    pub fn index(&self, idx: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(idx));
        Self { segments }
    }

    /// Returns this path nested below `prefix`.
    pub fn prefixed(&self, prefix: &IssuePath) -> Self {
        let mut segments = prefix.segments.clone();
        segments.extend(self.segments.iter().cloned());
        Self { segments }
    }

    pub(crate) fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub(crate) fn pop(&mut self) {
        self.segments.pop();
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.segments.iter()
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for IssuePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl Display for IssuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_empty() {
        let path = IssuePath::root();
        assert!(path.is_root());
        assert_eq!(path.len(), 0);
        assert_eq!(path.to_string(), "");
    }

    #[test]
    fn test_mixed_segments_display() {
        let path = IssuePath::root().key("body").index(3).key("kind");
        assert_eq!(path.to_string(), "body[3].kind");
    }

    #[test]
    fn test_leading_index() {
        let path = IssuePath::root().index(0).key("id");
        assert_eq!(path.to_string(), "[0].id");
    }

    #[test]
    fn test_builders_do_not_mutate() {
        let base = IssuePath::root().key("items");
        let a = base.index(0);
        let b = base.index(1);
        assert_eq!(base.to_string(), "items");
        assert_eq!(a.to_string(), "items[0]");
        assert_eq!(b.to_string(), "items[1]");
    }

    #[test]
    fn test_prefixed() {
        let inner = IssuePath::root().key("value");
        let outer = IssuePath::root().key("payload");
        assert_eq!(inner.prefixed(&outer).to_string(), "payload.value");
    }

    #[test]
    fn test_from_iter() {
        let path: IssuePath = vec![PathSegment::from("a"), PathSegment::from(2usize)]
            .into_iter()
            .collect();
        assert_eq!(path.to_string(), "a[2]");
    }

    #[test]
    fn test_push_pop() {
        let mut path = IssuePath::root();
        path.push(PathSegment::from("x"));
        path.push(PathSegment::from(1usize));
        assert_eq!(path.to_string(), "x[1]");
        path.pop();
        assert_eq!(path.to_string(), "x");
    }
}
