//! Permission tokens and immutable permission sets.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Well-known permission tokens.
///
/// The alphabet is open: any non-empty string is a valid [`Permission`].
pub mod permissions {
    pub const READ: &str = "READ";
    pub const WRITE: &str = "WRITE";
    pub const ADMINISTRATE: &str = "ADMINISTRATE";
}

/// An opaque access-right token such as `READ` or `WRITE`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission(String);

impl Permission {
    /// Create a permission token.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidPermission`] for an empty token.
    pub fn new(token: impl Into<String>) -> Result<Self, ModelError> {
        let token = token.into();
        if token.is_empty() {
            return Err(ModelError::InvalidPermission);
        }
        Ok(Self(token))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Permission {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Permission {
    type Error = ModelError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable set of [`Permission`] tokens.
///
/// Order is irrelevant and duplicates collapse. All set operations return a
/// new value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(BTreeSet<Permission>);

impl Permissions {
    /// The empty set.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a set from string tokens.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidPermission`] if any token is empty.
    pub fn of<I, S>(tokens: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        tokens
            .into_iter()
            .map(Permission::new)
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).cloned().collect())
    }

    /// Tokens of `self` that are not in `other`.
    #[must_use]
    pub fn subtract(&self, other: &Self) -> Self {
        Self(self.0.difference(&other.0).cloned().collect())
    }

    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        Self(self.0.intersection(&other.0).cloned().collect())
    }

    #[must_use]
    pub fn contains(&self, permission: &Permission) -> bool {
        self.0.contains(permission)
    }

    #[must_use]
    pub fn contains_all(&self, required: &Self) -> bool {
        self.0.is_superset(&required.0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }
}

impl FromIterator<Permission> for Permissions {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Permission> for Permissions {
    fn from(value: Permission) -> Self {
        Self(BTreeSet::from([value]))
    }
}

impl<'a> IntoIterator for &'a Permissions {
    type Item = &'a Permission;
    type IntoIter = std::collections::btree_set::Iter<'a, Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for permission in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            f.write_str(permission.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn perms(tokens: &[&str]) -> Permissions {
        Permissions::of(tokens.iter().copied()).expect("valid tokens")
    }

    #[test]
    fn duplicates_collapse_and_order_is_irrelevant() {
        assert_eq!(perms(&["READ", "WRITE", "READ"]), perms(&["WRITE", "READ"]));
        assert_eq!(perms(&["READ", "READ"]).len(), 1);
    }

    #[test]
    fn empty_token_is_rejected() {
        assert_eq!(
            Permissions::of(["READ", ""]),
            Err(ModelError::InvalidPermission)
        );
        assert!(Permission::new("").is_err());
    }

    #[test]
    fn union_and_subtract() {
        let rw = perms(&["READ", "WRITE"]);
        let w = perms(&["WRITE"]);

        assert_eq!(rw.subtract(&w), perms(&["READ"]));
        assert_eq!(w.union(&perms(&["ADMINISTRATE"])), perms(&["ADMINISTRATE", "WRITE"]));
        assert_eq!(w.subtract(&rw), Permissions::none());
        assert_eq!(rw.intersection(&w), w);
    }

    #[test]
    fn contains_all_requires_every_token() {
        let rw = perms(&["READ", "WRITE"]);

        assert!(rw.contains_all(&perms(&["READ"])));
        assert!(rw.contains_all(&perms(&["READ", "WRITE"])));
        assert!(!rw.contains_all(&perms(&["READ", "ADMINISTRATE"])));
        assert!(rw.contains_all(&Permissions::none()));
    }

    #[test]
    fn display_is_sorted_and_comma_separated() {
        assert_eq!(perms(&["WRITE", "READ"]).to_string(), "READ,WRITE");
        assert_eq!(Permissions::none().to_string(), "");
    }

    #[test]
    fn serde_uses_plain_string_array() {
        let json = serde_json::to_string(&perms(&["WRITE", "READ"])).unwrap();
        assert_eq!(json, r#"["READ","WRITE"]"#);

        let err = serde_json::from_str::<Permissions>(r#"["READ",""]"#);
        assert!(err.is_err());
    }
}
