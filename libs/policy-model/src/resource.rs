//! Resource addressing: types, hierarchical paths and full keys.
//!
//! A [`ResourceKey`] such as `thing:/features/lamp/properties/on` names one
//! node in the tree of one [`ResourceType`]. Paths use a JSON-pointer-like
//! text form: `/` separates segments, `~1` escapes a literal `/` and `~0` a
//! literal `~` inside a segment.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

const PATH_SEPARATOR: char = '/';
const KEY_SEPARATOR: char = ':';

/// Well-known resource type names.
pub mod resource_types {
    pub const THING: &str = "thing";
    pub const POLICY: &str = "policy";
    pub const MESSAGE: &str = "message";
}

/// Discriminator of an independent permission tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceType(String);

impl ResourceType {
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidResourceType`] for an empty name or one
    /// containing the `:` key separator.
    pub fn new(name: impl Into<String>) -> Result<Self, ModelError> {
        let name = name.into();
        if name.is_empty() || name.contains(KEY_SEPARATOR) {
            return Err(ModelError::InvalidResourceType);
        }
        Ok(Self(name))
    }

    #[must_use]
    pub fn thing() -> Self {
        Self(resource_types::THING.to_owned())
    }

    #[must_use]
    pub fn policy() -> Self {
        Self(resource_types::POLICY.to_owned())
    }

    #[must_use]
    pub fn message() -> Self {
        Self(resource_types::MESSAGE.to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ResourceType {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourceType> for String {
    fn from(value: ResourceType) -> Self {
        value.0
    }
}

/// Hierarchical pointer inside one resource tree. The empty path is the root.
///
/// Ordering is lexicographic by segment, so every descendant of a path sorts
/// directly after it. The trie relies on that for range scans.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from raw (unescaped) segments.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidResourcePath`] if a segment is empty.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.iter().any(String::is_empty) {
            let rendered = Self {
                segments: segments.clone(),
            }
            .to_string();
            return Err(ModelError::resource_path(rendered, "empty segment"));
        }
        Ok(Self { segments })
    }

    /// Parse the textual form, e.g. `/features/lamp` or `features/lamp`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidResourcePath`] for interior empty
    /// segments (`/a//b`) or unknown `~` escapes.
    pub fn parse(value: &str) -> Result<Self, ModelError> {
        let trimmed = value.strip_prefix(PATH_SEPARATOR).unwrap_or(value);
        let trimmed = trimmed.strip_suffix(PATH_SEPARATOR).unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for raw in trimmed.split(PATH_SEPARATOR) {
            if raw.is_empty() {
                return Err(ModelError::resource_path(value, "empty segment"));
            }
            segments.push(unescape(raw).ok_or_else(|| {
                ModelError::resource_path(value, format!("invalid escape in segment '{raw}'"))
            })?);
        }
        Ok(Self { segments })
    }

    /// This path extended by one raw segment.
    ///
    /// The segment is taken verbatim; JSON object keys and array indices can
    /// be appended without escaping.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// The enclosing path, `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        Some(Self {
            segments: init.to_vec(),
        })
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether `prefix` is a non-strict prefix of this path.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Every prefix of this path from the root to the path itself.
    pub fn prefixes(&self) -> impl Iterator<Item = Self> + '_ {
        (0..=self.segments.len()).map(|len| Self {
            segments: self.segments[..len].to_vec(),
        })
    }
}

fn unescape(raw: &str) -> Option<String> {
    if !raw.contains('~') {
        return Some(raw.to_owned());
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push(PATH_SEPARATOR),
                _ => return None,
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace(PATH_SEPARATOR, "~1")
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "{PATH_SEPARATOR}{}", escape(segment))?;
        }
        Ok(())
    }
}

impl FromStr for ResourcePath {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourcePath {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourcePath> for String {
    fn from(value: ResourcePath) -> Self {
        value.to_string()
    }
}

/// Full address of a tree node: `(ResourceType, ResourcePath)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceKey {
    resource_type: ResourceType,
    path: ResourcePath,
}

impl ResourceKey {
    #[must_use]
    pub fn new(resource_type: ResourceType, path: ResourcePath) -> Self {
        Self {
            resource_type,
            path,
        }
    }

    /// Parse `type:/path`, e.g. `thing:/features/lamp`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidResourceKey`] if the separator or the type
    /// is missing, or the path part is malformed.
    pub fn parse(value: &str) -> Result<Self, ModelError> {
        let (resource_type, path) = value
            .split_once(KEY_SEPARATOR)
            .ok_or_else(|| ModelError::resource_key(value, "missing ':' after resource type"))?;
        let resource_type = ResourceType::new(resource_type)
            .map_err(|e| ModelError::resource_key(value, e.to_string()))?;
        let path =
            ResourcePath::parse(path).map_err(|e| ModelError::resource_key(value, e.to_string()))?;
        Ok(Self::new(resource_type, path))
    }

    #[must_use]
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    #[must_use]
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// Same resource type, path extended by one raw segment.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        Self {
            resource_type: self.resource_type.clone(),
            path: self.path.child(segment),
        }
    }

    /// Same resource type, different path.
    #[must_use]
    pub fn with_path(&self, path: ResourcePath) -> Self {
        Self {
            resource_type: self.resource_type.clone(),
            path,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{KEY_SEPARATOR}{}", self.resource_type, self.path)
    }
}

impl FromStr for ResourceKey {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourceKey {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceKey> for String {
    fn from(value: ResourceKey) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn path(s: &str) -> ResourcePath {
        ResourcePath::parse(s).unwrap()
    }

    #[test]
    fn root_forms() {
        assert!(path("").is_root());
        assert!(path("/").is_root());
        assert_eq!(ResourcePath::root().to_string(), "/");
    }

    #[test]
    fn parses_segments_with_optional_slashes() {
        let expected = ResourcePath::from_segments(["features", "lamp"]).unwrap();
        assert_eq!(path("/features/lamp"), expected);
        assert_eq!(path("features/lamp"), expected);
        assert_eq!(path("/features/lamp/"), expected);
        assert_eq!(expected.to_string(), "/features/lamp");
    }

    #[test]
    fn rejects_interior_empty_segments_and_bad_escapes() {
        assert!(matches!(
            ResourcePath::parse("/a//b"),
            Err(ModelError::InvalidResourcePath { .. })
        ));
        assert!(ResourcePath::parse("/a/~2").is_err());
        assert!(ResourcePath::parse("/a/~").is_err());
        assert!(ResourcePath::from_segments(["a", ""]).is_err());
    }

    #[test]
    fn escapes_round_trip_through_text() {
        let p = ResourcePath::root().child("a/b").child("c~d");
        assert_eq!(p.to_string(), "/a~1b/c~0d");
        assert_eq!(path("/a~1b/c~0d"), p);
    }

    #[test]
    fn prefix_relations() {
        let p = path("/a/b/c");
        assert!(p.starts_with(&path("/a/b")));
        assert!(p.starts_with(&p));
        assert!(p.starts_with(&ResourcePath::root()));
        assert!(!p.starts_with(&path("/a/bc")));
        assert_eq!(p.parent(), Some(path("/a/b")));
        assert_eq!(ResourcePath::root().parent(), None);
        assert_eq!(p.depth(), 3);

        let prefixes: Vec<String> = p.prefixes().map(|prefix| prefix.to_string()).collect();
        assert_eq!(prefixes, vec!["/", "/a", "/a/b", "/a/b/c"]);
    }

    #[test]
    fn descendants_sort_right_after_their_ancestor() {
        let mut paths = vec![path("/b"), path("/a/z"), path("/a"), path("/ab"), path("/a/b")];
        paths.sort();
        let rendered: Vec<String> = paths.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["/a", "/a/b", "/a/z", "/ab", "/b"]);
    }

    #[test]
    fn resource_key_parse_and_display() {
        let key = ResourceKey::parse("thing:/features/secret").unwrap();
        assert_eq!(key.resource_type(), &ResourceType::thing());
        assert_eq!(key.path(), &path("/features/secret"));
        assert_eq!(key.to_string(), "thing:/features/secret");

        let root = ResourceKey::parse("policy:/").unwrap();
        assert!(root.path().is_root());
        assert_eq!(root.child("entries").to_string(), "policy:/entries");
    }

    #[test]
    fn resource_key_rejects_malformed_input() {
        assert!(matches!(
            ResourceKey::parse("/features"),
            Err(ModelError::InvalidResourceKey { .. })
        ));
        assert!(ResourceKey::parse(":/features").is_err());
        assert!(ResourceKey::parse("thing:/a//b").is_err());
        assert!(ResourceType::new("").is_err());
    }

    #[test]
    fn resource_key_is_a_json_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(ResourceKey::parse("thing:/a").unwrap(), 1);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"thing:/a":1}"#);

        let back: std::collections::BTreeMap<ResourceKey, i32> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
