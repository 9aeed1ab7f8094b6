//! Policy documents: labels of subjects and their grant/revoke declarations.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::permission::Permissions;
use crate::resource::ResourceKey;
use crate::subject::SubjectId;

/// The raw declaration found at one node for one subject.
///
/// A permission may appear in both sets; revoked always wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EffectedPermissions {
    #[serde(rename = "grant")]
    granted: Permissions,
    #[serde(rename = "revoke")]
    revoked: Permissions,
}

impl EffectedPermissions {
    #[must_use]
    pub fn new(granted: Permissions, revoked: Permissions) -> Self {
        Self { granted, revoked }
    }

    #[must_use]
    pub fn granted_only(granted: Permissions) -> Self {
        Self::new(granted, Permissions::none())
    }

    #[must_use]
    pub fn revoked_only(revoked: Permissions) -> Self {
        Self::new(Permissions::none(), revoked)
    }

    #[must_use]
    pub fn granted(&self) -> &Permissions {
        &self.granted
    }

    #[must_use]
    pub fn revoked(&self) -> &Permissions {
        &self.revoked
    }

    /// Grants that survive the revokes of this same declaration.
    #[must_use]
    pub fn effective_grants(&self) -> Permissions {
        self.granted.subtract(&self.revoked)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.granted.is_empty() && self.revoked.is_empty()
    }
}

/// Policy identifier, e.g. `org.eclipse.ditto:lamp`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(String);

impl PolicyId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named group of subjects sharing a set of resource declarations.
///
/// Labels are the author's management unit. Enforcement only sees the
/// flattened result, never the label boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Label {
    subjects: BTreeSet<SubjectId>,
    resources: BTreeMap<ResourceKey, EffectedPermissions>,
}

impl Label {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn subject(mut self, subject: SubjectId) -> Self {
        self.subjects.insert(subject);
        self
    }

    /// Set the declaration for `key`, replacing any earlier one.
    #[must_use]
    pub fn set_resource(mut self, key: ResourceKey, permissions: EffectedPermissions) -> Self {
        self.resources.insert(key, permissions);
        self
    }

    /// Add grants to the declaration for `key`, keeping its revokes.
    #[must_use]
    pub fn grant(mut self, key: ResourceKey, granted: &Permissions) -> Self {
        let declaration = self.resources.entry(key).or_default();
        declaration.granted = declaration.granted.union(granted);
        self
    }

    /// Add revokes to the declaration for `key`, keeping its grants.
    #[must_use]
    pub fn revoke(mut self, key: ResourceKey, revoked: &Permissions) -> Self {
        let declaration = self.resources.entry(key).or_default();
        declaration.revoked = declaration.revoked.union(revoked);
        self
    }

    #[must_use]
    pub fn subjects(&self) -> &BTreeSet<SubjectId> {
        &self.subjects
    }

    #[must_use]
    pub fn resources(&self) -> &BTreeMap<ResourceKey, EffectedPermissions> {
        &self.resources
    }
}

/// A policy snapshot: identifier, revision and its labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Policy {
    id: PolicyId,
    #[serde(default)]
    revision: u64,
    #[serde(default)]
    labels: BTreeMap<String, Label>,
}

impl Policy {
    #[must_use]
    pub fn new(id: PolicyId) -> Self {
        Self {
            id,
            revision: 0,
            labels: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    /// Add or replace a label.
    #[must_use]
    pub fn label(mut self, name: impl Into<String>, label: Label) -> Self {
        self.labels.insert(name.into(), label);
        self
    }

    #[must_use]
    pub fn id(&self) -> &PolicyId {
        &self.id
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn labels(&self) -> &BTreeMap<String, Label> {
        &self.labels
    }

    #[must_use]
    pub fn get_label(&self, name: &str) -> Option<&Label> {
        self.labels.get(name)
    }
}
