//! Virtual path rules.
//!
//! Virtual paths are `/` separated display paths such as `Env/Trees/oak`.
//! The empty string is the root folder. All comparisons are case-insensitive,
//! while the stored casing is preserved.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::PathError;

pub const SEPARATOR: char = '/';

/// A validated virtual path. The root is the empty path.
///
/// The derived equality compares the stored text exactly, use
/// [`VirtualPath::eq_ignore_case`] for namespace comparisons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VirtualPath(String);

/// A single validated path component (a folder or resource name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment(String);

impl Segment {
    /// Creates a new segment from a user supplied name.
    ///
    /// Surrounding whitespace is trimmed. The name must not be empty, must not
    /// contain a separator or a backslash and must not be `.` or `..`.
    pub fn new(name: &str) -> Result<Self, PathError> {
        let trimmed = name.trim();
        if !is_valid_segment(trimmed) {
            return Err(PathError::InvalidName(name.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.trim().is_empty()
        && !segment.contains(SEPARATOR)
        && !segment.contains('\\')
        && segment != "."
        && segment != ".."
}

impl VirtualPath {
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Validates a full virtual path.
    ///
    /// Rejects backslashes, a leading or trailing separator, consecutive
    /// separators and dot segments. The empty string is the root and is always
    /// valid.
    pub fn normalize(path: &str) -> Result<Self, PathError> {
        if path.is_empty() {
            return Ok(Self::root());
        }
        if path.contains('\\')
            || path.starts_with(SEPARATOR)
            || path.ends_with(SEPARATOR)
            || path.contains("//")
        {
            return Err(PathError::InvalidName(path.to_string()));
        }
        if !path.split(SEPARATOR).all(is_valid_segment) {
            return Err(PathError::InvalidName(path.to_string()));
        }
        Ok(Self(path.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends a segment to this path.
    pub fn join(&self, segment: &Segment) -> VirtualPath {
        VirtualPath(join_str(&self.0, segment.as_str()))
    }

    /// Returns the containing folder, the root for single segment paths.
    pub fn parent(&self) -> VirtualPath {
        VirtualPath(parent_of(&self.0).to_string())
    }

    /// Returns the final segment, or `None` for the root.
    pub fn last_segment(&self) -> Option<&str> {
        last_segment(&self.0)
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        segments(&self.0)
    }

    /// See [`is_prefix_of`].
    pub fn is_prefix_of(&self, other: &str) -> bool {
        is_prefix_of(&self.0, other)
    }

    pub fn eq_ignore_case(&self, other: &str) -> bool {
        eq_ignore_case(&self.0, other)
    }
}

impl FromStr for VirtualPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VirtualPath::normalize(s)
    }
}

impl Display for VirtualPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VirtualPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Case-insensitive string equality.
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    if a.len() == b.len() && a.eq_ignore_ascii_case(b) {
        return true;
    }
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Case-insensitive ordering, falling back to the exact text to keep the
/// ordering total.
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| a.cmp(b))
}

/// Case-insensitive substring test.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Strips `prefix` from `path` when `path` equals it or is nested under it.
///
/// Returns the remainder after the separator, which is empty for an exact
/// match. The root prefix matches every path.
pub fn strip_prefix<'a>(prefix: &str, path: &'a str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path);
    }
    let mut index = 0;
    for expected in prefix.chars() {
        let actual = path[index..].chars().next()?;
        if !chars_eq_ignore_case(expected, actual) {
            return None;
        }
        index += actual.len_utf8();
    }
    let rest = &path[index..];
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix(SEPARATOR)
    }
}

/// True if `path == prefix` or `path` starts with `prefix + "/"`,
/// case-insensitively.
pub fn is_prefix_of(prefix: &str, path: &str) -> bool {
    strip_prefix(prefix, path).is_some()
}

/// True if `path` is nested strictly below `prefix`.
pub fn is_strictly_nested(prefix: &str, path: &str) -> bool {
    matches!(strip_prefix(prefix, path), Some(rest) if !rest.is_empty())
}

/// Replaces the `old` prefix of `path` with `new`, or returns `None` when
/// `path` is not equal to or nested under `old`.
pub fn rebase(path: &str, old: &str, new: &str) -> Option<String> {
    strip_prefix(old, path).map(|rest| join_str(new, rest))
}

/// Joins two path fragments, treating empty fragments as the root.
pub fn join_str(parent: &str, child: &str) -> String {
    match (parent.is_empty(), child.is_empty()) {
        (true, _) => child.to_string(),
        (_, true) => parent.to_string(),
        _ => format!("{parent}{SEPARATOR}{child}"),
    }
}

pub fn parent_of(path: &str) -> &str {
    path.rfind(SEPARATOR).map_or("", |index| &path[..index])
}

pub fn last_segment(path: &str) -> Option<&str> {
    path.rsplit(SEPARATOR).find(|segment| !segment.is_empty())
}

/// Non-empty segments of a stored path. Malformed paths with doubled
/// separators still yield their usable segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_accepts_root_and_nested_paths() {
        assert!(VirtualPath::normalize("").unwrap().is_root());
        assert_eq!(
            VirtualPath::normalize("Env/Trees").unwrap().as_str(),
            "Env/Trees"
        );
    }

    #[test]
    fn normalize_rejects_malformed_paths() {
        for bad in ["/Env", "Env/", "Env//Trees", "Env\\Trees", "Env/../x", " "] {
            assert!(
                matches!(VirtualPath::normalize(bad), Err(PathError::InvalidName(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn segment_is_trimmed_and_validated() {
        assert_eq!(Segment::new("  Trees ").unwrap().as_str(), "Trees");
        assert!(Segment::new("").is_err());
        assert!(Segment::new("a/b").is_err());
        assert!(Segment::new("..").is_err());
    }

    #[test]
    fn prefix_checks_respect_segment_boundaries() {
        assert!(is_prefix_of("Env", "Env"));
        assert!(is_prefix_of("env", "ENV/Trees/oak"));
        assert!(!is_prefix_of("Env", "Environment/x"));
        assert!(is_prefix_of("", "anything"));
        assert!(!is_strictly_nested("Env", "Env"));
        assert!(is_strictly_nested("Env", "env/a"));
    }

    #[test]
    fn rebase_keeps_the_nested_remainder() {
        assert_eq!(
            rebase("env/Trees/oak", "Env", "World"),
            Some("World/Trees/oak".to_string())
        );
        assert_eq!(rebase("Env", "Env", "World"), Some("World".to_string()));
        assert_eq!(rebase("Other", "Env", "World"), None);
        assert_eq!(rebase("Env/a", "Env", ""), Some("a".to_string()));
    }

    #[test]
    fn parent_and_last_segment() {
        let path = VirtualPath::normalize("Env/Trees/oak").unwrap();
        assert_eq!(path.parent().as_str(), "Env/Trees");
        assert_eq!(path.last_segment(), Some("oak"));
        assert!(VirtualPath::root().last_segment().is_none());
        assert!(VirtualPath::normalize("Env").unwrap().parent().is_root());
    }

    #[test]
    fn case_insensitive_ordering_is_total() {
        assert_eq!(cmp_ignore_case("apple", "Banana"), Ordering::Less);
        assert_ne!(cmp_ignore_case("a", "A"), Ordering::Equal);
        assert!(eq_ignore_case("Ärger", "ärger"));
    }
}
