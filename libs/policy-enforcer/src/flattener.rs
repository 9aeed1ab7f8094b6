//! Policy flattening.
//!
//! Turns the label-oriented policy document into per-resource-type maps of
//! `path → subject → declaration`, merged so that enforcement never has to
//! look at labels again.
//!
//! ## Merge rule
//!
//! For a fixed `(subject, resource key)` declared by several labels:
//!
//! | set | result |
//! |-----|--------|
//! | granted | union of all grants minus union of all revokes |
//! | revoked | union of all revokes |
//!
//! A revoke is global: it wins no matter which label carries it.

use std::collections::{BTreeMap, HashMap};

use policy_model::{EffectedPermissions, Permissions, Policy, ResourcePath, ResourceType, SubjectId};

/// Merged declarations of every subject at one path.
pub type SubjectDeclarations = HashMap<SubjectId, EffectedPermissions>;

/// Declarations of one resource type, keyed by path.
pub type PathDeclarations = BTreeMap<ResourcePath, SubjectDeclarations>;

type MergeState = BTreeMap<ResourceType, BTreeMap<ResourcePath, HashMap<SubjectId, Accumulated>>>;

#[derive(Default)]
struct Accumulated {
    grants: Permissions,
    revokes: Permissions,
}

impl Accumulated {
    fn add(&mut self, declared: &EffectedPermissions) {
        self.grants = self.grants.union(declared.granted());
        self.revokes = self.revokes.union(declared.revoked());
    }

    fn finish(self) -> EffectedPermissions {
        let granted = self.grants.subtract(&self.revokes);
        EffectedPermissions::new(granted, self.revokes)
    }
}

/// Output of [`flatten`]: merged declarations per resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenedPolicy {
    types: BTreeMap<ResourceType, PathDeclarations>,
}

impl FlattenedPolicy {
    pub fn resource_types(&self) -> impl Iterator<Item = &ResourceType> {
        self.types.keys()
    }

    /// Declarations of one resource type, `None` if the policy never mentions it.
    #[must_use]
    pub fn declarations(&self, resource_type: &ResourceType) -> Option<&PathDeclarations> {
        self.types.get(resource_type)
    }

    /// The merged declaration for one subject at one path.
    #[must_use]
    pub fn declaration(
        &self,
        resource_type: &ResourceType,
        path: &ResourcePath,
        subject: &SubjectId,
    ) -> Option<&EffectedPermissions> {
        self.types.get(resource_type)?.get(path)?.get(subject)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub(crate) fn into_types(self) -> BTreeMap<ResourceType, PathDeclarations> {
        self.types
    }
}

/// Flatten a policy into merged per-type declarations.
///
/// Pure and total: any well-formed policy flattens. Labels without subjects
/// contribute nothing.
#[must_use]
pub fn flatten(policy: &Policy) -> FlattenedPolicy {
    let mut merged: MergeState = BTreeMap::new();

    for label in policy.labels().values() {
        if label.subjects().is_empty() {
            continue;
        }
        for (key, declared) in label.resources() {
            let at_path = merged
                .entry(key.resource_type().clone())
                .or_default()
                .entry(key.path().clone())
                .or_default();
            for subject in label.subjects() {
                at_path.entry(subject.clone()).or_default().add(declared);
            }
        }
    }

    let types = merged
        .into_iter()
        .map(|(resource_type, paths)| {
            let paths = paths
                .into_iter()
                .map(|(path, subjects)| {
                    let subjects = subjects
                        .into_iter()
                        .map(|(subject, acc)| (subject, acc.finish()))
                        .collect();
                    (path, subjects)
                })
                .collect();
            (resource_type, paths)
        })
        .collect();

    FlattenedPolicy { types }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use policy_model::{Label, PolicyId, ResourceKey};

    use super::*;

    fn perms(tokens: &[&str]) -> Permissions {
        Permissions::of(tokens.iter().copied()).unwrap()
    }

    fn key(s: &str) -> ResourceKey {
        ResourceKey::parse(s).unwrap()
    }

    fn subject(s: &str) -> SubjectId {
        SubjectId::parse(s).unwrap()
    }

    #[test]
    fn revoke_from_another_label_wins() {
        let policy = Policy::new(PolicyId::new("p"))
            .label(
                "owner",
                Label::new()
                    .subject(subject("user:a"))
                    .grant(key("thing:/features"), &perms(&["READ", "WRITE"])),
            )
            .label(
                "restricted",
                Label::new()
                    .subject(subject("user:a"))
                    .revoke(key("thing:/features"), &perms(&["WRITE"])),
            );

        let flat = flatten(&policy);
        let declaration = flat
            .declaration(
                &ResourceType::thing(),
                &ResourcePath::parse("/features").unwrap(),
                &subject("user:a"),
            )
            .unwrap();

        assert_eq!(declaration.granted(), &perms(&["READ"]));
        assert_eq!(declaration.revoked(), &perms(&["WRITE"]));
    }

    #[test]
    fn ambiguous_declaration_in_one_label_resolves_to_revoke() {
        let policy = Policy::new(PolicyId::new("p")).label(
            "l",
            Label::new().subject(subject("user:a")).set_resource(
                key("thing:/"),
                EffectedPermissions::new(perms(&["READ"]), perms(&["READ"])),
            ),
        );

        let flat = flatten(&policy);
        let declaration = flat
            .declaration(&ResourceType::thing(), &ResourcePath::root(), &subject("user:a"))
            .unwrap();

        assert!(declaration.granted().is_empty());
        assert_eq!(declaration.revoked(), &perms(&["READ"]));
    }

    #[test]
    fn grants_accumulate_across_labels() {
        let policy = Policy::new(PolicyId::new("p"))
            .label(
                "readers",
                Label::new()
                    .subject(subject("user:a"))
                    .subject(subject("user:b"))
                    .grant(key("thing:/"), &perms(&["READ"])),
            )
            .label(
                "writers",
                Label::new()
                    .subject(subject("user:a"))
                    .grant(key("thing:/"), &perms(&["WRITE"])),
            );

        let flat = flatten(&policy);
        let thing = ResourceType::thing();
        let root = ResourcePath::root();

        assert_eq!(
            flat.declaration(&thing, &root, &subject("user:a")).unwrap().granted(),
            &perms(&["READ", "WRITE"])
        );
        assert_eq!(
            flat.declaration(&thing, &root, &subject("user:b")).unwrap().granted(),
            &perms(&["READ"])
        );
    }

    #[test]
    fn resource_types_stay_separate() {
        let policy = Policy::new(PolicyId::new("p")).label(
            "admin",
            Label::new()
                .subject(subject("user:a"))
                .grant(key("policy:/"), &perms(&["ADMINISTRATE"]))
                .grant(key("thing:/attributes"), &perms(&["READ"])),
        );

        let flat = flatten(&policy);
        let types: Vec<&str> = flat.resource_types().map(ResourceType::as_str).collect();

        assert_eq!(types, vec!["policy", "thing"]);
        assert!(
            flat.declaration(&ResourceType::thing(), &ResourcePath::root(), &subject("user:a"))
                .is_none()
        );
        assert!(flat.declarations(&ResourceType::message()).is_none());
    }

    #[test]
    fn labels_without_subjects_contribute_nothing() {
        let policy = Policy::new(PolicyId::new("p")).label(
            "orphan",
            Label::new().grant(key("thing:/"), &perms(&["READ"])),
        );

        assert!(flatten(&policy).is_empty());
    }
}
