//! Tree-based policy enforcer.
//!
//! [`PolicyEnforcer`] is built once per policy snapshot and answers every
//! query with a pure in-memory walk:
//!
//! - [`PolicyEnforcer::decide`] - per-subject point decision
//! - [`PolicyEnforcer::has_permission`] - request-level decision
//! - [`PolicyEnforcer::has_partial_permission`], [`PolicyEnforcer::has_unrestricted_permission`] - subtree checks
//! - [`PolicyEnforcer::subjects_with_permission`] and friends - effected subjects
//! - [`PolicyEnforcer::build_json_view`] - permission-filtered JSON documents
//!
//! ## Decision rule
//!
//! The ancestor chain of the queried path is walked root first. A node that
//! declares the subject sets the state to `Deny` when the permission is
//! revoked there, to `Allow` when it is granted there, and leaves it alone
//! otherwise. The most specific node mentioning this exact subject and
//! permission wins, so a shallow revoke can be re-granted deeper and vice
//! versa.
//!
//! Across an [`AuthorizationContext`] decisions are OR-combined per
//! permission; every required permission must be satisfied.

mod json_view;

use std::collections::{BTreeMap, BTreeSet};

use policy_model::{
    AuthorizationContext, Permission, Permissions, Policy, PolicyId, ResourceKey, ResourcePath,
    ResourceType, SubjectId,
};
use serde::Serialize;
use tracing::debug;

use crate::error::EnforcerError;
use crate::flattener::flatten;
use crate::trie::{ResourceTrie, TrieNode};

/// Outcome of a per-subject point decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Allow,
    Deny,
    /// No node on the path says anything about this subject and permission.
    Unspecified,
}

impl Decision {
    #[must_use]
    pub fn is_allow(self) -> bool {
        self == Self::Allow
    }
}

/// Subjects affected by a permission at one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EffectedSubjects {
    granted: BTreeSet<SubjectId>,
    revoked: BTreeSet<SubjectId>,
}

impl EffectedSubjects {
    /// Subjects holding every required permission.
    #[must_use]
    pub fn granted(&self) -> &BTreeSet<SubjectId> {
        &self.granted
    }

    /// Subjects with at least one required permission revoked.
    #[must_use]
    pub fn revoked(&self) -> &BTreeSet<SubjectId> {
        &self.revoked
    }
}

/// Immutable query engine for one policy snapshot.
///
/// Holds one [`ResourceTrie`] per resource type mentioned by the policy. A
/// resource type the policy never mentions behaves like an empty trie: every
/// decision is [`Decision::Unspecified`] and every check is `false`.
///
/// # Example
///
/// ```
/// use policy_enforcer::PolicyEnforcer;
/// use policy_model::{AuthorizationContext, Label, Permissions, Policy, PolicyId, ResourceKey, SubjectId};
///
/// let owner = SubjectId::parse("google:owner").unwrap();
/// let policy = Policy::new(PolicyId::new("org.example:lamp")).label(
///     "owner",
///     Label::new()
///         .subject(owner.clone())
///         .grant(ResourceKey::parse("thing:/").unwrap(), &Permissions::of(["READ", "WRITE"]).unwrap())
///         .revoke(ResourceKey::parse("thing:/features/secret").unwrap(), &Permissions::of(["WRITE"]).unwrap()),
/// );
///
/// let enforcer = PolicyEnforcer::new(&policy);
/// let ctx = AuthorizationContext::single(owner);
/// let secret = ResourceKey::parse("thing:/features/secret").unwrap();
///
/// assert!(!enforcer.has_permission(&ctx, &secret, &Permissions::of(["WRITE"]).unwrap()).unwrap());
/// assert!(enforcer.has_permission(&ctx, &secret, &Permissions::of(["READ"]).unwrap()).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct PolicyEnforcer {
    policy_id: PolicyId,
    revision: u64,
    trees: BTreeMap<ResourceType, ResourceTrie>,
}

impl PolicyEnforcer {
    /// Flatten `policy` and index it per resource type.
    #[must_use]
    pub fn new(policy: &Policy) -> Self {
        let trees: BTreeMap<ResourceType, ResourceTrie> = flatten(policy)
            .into_types()
            .into_iter()
            .map(|(resource_type, declarations)| {
                (resource_type, ResourceTrie::from_declarations(declarations))
            })
            .collect();

        debug!(
            policy_id = %policy.id(),
            revision = policy.revision(),
            resource_types = trees.len(),
            nodes = trees.values().map(ResourceTrie::len).sum::<usize>(),
            "Built policy enforcer"
        );

        Self {
            policy_id: policy.id().clone(),
            revision: policy.revision(),
            trees,
        }
    }

    #[must_use]
    pub fn policy_id(&self) -> &PolicyId {
        &self.policy_id
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &ResourceType> {
        self.trees.keys()
    }

    /// The trie of one resource type, `None` if the policy never mentions it.
    #[must_use]
    pub fn trie(&self, resource_type: &ResourceType) -> Option<&ResourceTrie> {
        self.trees.get(resource_type)
    }

    // ── Point decisions ──────────────────────────────────────────────

    /// Per-subject decision for a single permission at `key`.
    #[must_use]
    pub fn decide(&self, subject: &SubjectId, key: &ResourceKey, permission: &Permission) -> Decision {
        self.trie(key.resource_type())
            .map_or(Decision::Unspecified, |trie| {
                decide_on_chain(&trie.ancestor_chain(key.path()), subject, permission)
            })
    }

    /// Whether every required permission is allowed for at least one subject
    /// of `ctx` at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcerError::InvalidArgument`] if `required` is empty.
    pub fn has_permission(
        &self,
        ctx: &AuthorizationContext,
        key: &ResourceKey,
        required: &Permissions,
    ) -> Result<bool, EnforcerError> {
        ensure_required(required)?;
        Ok(self
            .trie(key.resource_type())
            .is_some_and(|trie| context_holds(trie, ctx, key.path(), required)))
    }

    // ── Subtree checks ───────────────────────────────────────────────

    /// Whether `ctx` holds `required` at `key` or at some declared path
    /// below it.
    ///
    /// Used to decide whether a container must appear in a view because some
    /// nested value is readable even though the container itself is not.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcerError::InvalidArgument`] if `required` is empty.
    pub fn has_partial_permission(
        &self,
        ctx: &AuthorizationContext,
        key: &ResourceKey,
        required: &Permissions,
    ) -> Result<bool, EnforcerError> {
        ensure_required(required)?;
        Ok(self
            .trie(key.resource_type())
            .is_some_and(|trie| partially_holds(trie, ctx, key.path(), required)))
    }

    /// Whether `ctx` holds `required` at `key` and at every declared path
    /// below it, i.e. the whole subtree is accessible.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcerError::InvalidArgument`] if `required` is empty.
    pub fn has_unrestricted_permission(
        &self,
        ctx: &AuthorizationContext,
        key: &ResourceKey,
        required: &Permissions,
    ) -> Result<bool, EnforcerError> {
        ensure_required(required)?;
        Ok(self
            .trie(key.resource_type())
            .is_some_and(|trie| unrestrictedly_holds(trie, ctx, key.path(), required)))
    }

    // ── Effected subjects ────────────────────────────────────────────

    /// Subjects granted all of `required` at `key`, and subjects with at
    /// least one of them revoked there.
    ///
    /// Candidates are all subjects declared on the ancestor chain of `key`
    /// or anywhere in its subtree.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcerError::InvalidArgument`] if `required` is empty.
    pub fn subjects_with_permission(
        &self,
        key: &ResourceKey,
        required: &Permissions,
    ) -> Result<EffectedSubjects, EnforcerError> {
        ensure_required(required)?;
        let Some(trie) = self.trie(key.resource_type()) else {
            return Ok(EffectedSubjects::default());
        };

        let chain = trie.ancestor_chain(key.path());
        let mut effected = EffectedSubjects::default();
        for subject in candidate_subjects(trie, &chain, key.path()) {
            let decisions: Vec<Decision> = required
                .iter()
                .map(|permission| decide_on_chain(&chain, subject, permission))
                .collect();
            if decisions.iter().all(|d| d.is_allow()) {
                effected.granted.insert(subject.clone());
            }
            if decisions.contains(&Decision::Deny) {
                effected.revoked.insert(subject.clone());
            }
        }
        Ok(effected)
    }

    /// Subjects holding all of `required` at `key` or at some declared path
    /// below it.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcerError::InvalidArgument`] if `required` is empty.
    pub fn subjects_with_partial_permission(
        &self,
        key: &ResourceKey,
        required: &Permissions,
    ) -> Result<BTreeSet<SubjectId>, EnforcerError> {
        ensure_required(required)?;
        let Some(trie) = self.trie(key.resource_type()) else {
            return Ok(BTreeSet::new());
        };

        let chain = trie.ancestor_chain(key.path());
        Ok(candidate_subjects(trie, &chain, key.path())
            .into_iter()
            .filter(|subject| {
                subject_holds(&chain, subject, required)
                    || trie
                        .strict_descendants(key.path())
                        .any(|node| subject_holds_at(trie, node, subject, required))
            })
            .cloned()
            .collect())
    }

    /// Subjects holding all of `required` at `key` and at every declared
    /// path below it.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcerError::InvalidArgument`] if `required` is empty.
    pub fn subjects_with_unrestricted_permission(
        &self,
        key: &ResourceKey,
        required: &Permissions,
    ) -> Result<BTreeSet<SubjectId>, EnforcerError> {
        ensure_required(required)?;
        let Some(trie) = self.trie(key.resource_type()) else {
            return Ok(BTreeSet::new());
        };

        let chain = trie.ancestor_chain(key.path());
        Ok(candidate_subjects(trie, &chain, key.path())
            .into_iter()
            .filter(|subject| {
                subject_holds(&chain, subject, required)
                    && trie
                        .strict_descendants(key.path())
                        .all(|node| subject_holds_at(trie, node, subject, required))
            })
            .cloned()
            .collect())
    }
}

fn ensure_required(required: &Permissions) -> Result<(), EnforcerError> {
    if required.is_empty() {
        return Err(EnforcerError::invalid_argument(
            "at least one required permission must be given",
        ));
    }
    Ok(())
}

fn decide_on_chain(chain: &[&TrieNode], subject: &SubjectId, permission: &Permission) -> Decision {
    chain
        .iter()
        .filter_map(|node| node.declaration_for(subject))
        .fold(Decision::Unspecified, |state, declaration| {
            if declaration.revoked().contains(permission) {
                Decision::Deny
            } else if declaration.granted().contains(permission) {
                Decision::Allow
            } else {
                state
            }
        })
}

fn subject_holds(chain: &[&TrieNode], subject: &SubjectId, required: &Permissions) -> bool {
    required
        .iter()
        .all(|permission| decide_on_chain(chain, subject, permission).is_allow())
}

fn subject_holds_at(
    trie: &ResourceTrie,
    node: &TrieNode,
    subject: &SubjectId,
    required: &Permissions,
) -> bool {
    subject_holds(&trie.ancestor_chain(node.path()), subject, required)
}

/// Conjunction over permissions, disjunction over the subjects of `ctx`.
fn context_holds(
    trie: &ResourceTrie,
    ctx: &AuthorizationContext,
    path: &ResourcePath,
    required: &Permissions,
) -> bool {
    let chain = trie.ancestor_chain(path);
    required.iter().all(|permission| {
        ctx.subjects()
            .iter()
            .any(|subject| decide_on_chain(&chain, subject, permission).is_allow())
    })
}

fn partially_holds(
    trie: &ResourceTrie,
    ctx: &AuthorizationContext,
    path: &ResourcePath,
    required: &Permissions,
) -> bool {
    context_holds(trie, ctx, path, required)
        || trie
            .strict_descendants(path)
            .any(|node| context_holds(trie, ctx, node.path(), required))
}

fn unrestrictedly_holds(
    trie: &ResourceTrie,
    ctx: &AuthorizationContext,
    path: &ResourcePath,
    required: &Permissions,
) -> bool {
    context_holds(trie, ctx, path, required)
        && trie
            .strict_descendants(path)
            .all(|node| context_holds(trie, ctx, node.path(), required))
}

fn candidate_subjects<'a>(
    trie: &'a ResourceTrie,
    chain: &[&'a TrieNode],
    path: &'a ResourcePath,
) -> BTreeSet<&'a SubjectId> {
    chain
        .iter()
        .copied()
        .chain(trie.descendants(path))
        .flat_map(TrieNode::subjects)
        .collect()
}
