//! Shared, atomically swappable enforcer snapshot.
//!
//! Request handlers call [`EnforcerHandle::load`] once and keep the returned
//! `Arc` for the whole request; a concurrent [`EnforcerHandle::update`] never
//! changes the snapshot an in-flight query is looking at.

use std::sync::Arc;

use arc_swap::ArcSwap;
use policy_model::Policy;
use tracing::{info, warn};

use crate::enforcer::PolicyEnforcer;

/// Lock-free holder of the current [`PolicyEnforcer`].
#[derive(Debug)]
pub struct EnforcerHandle {
    current: ArcSwap<PolicyEnforcer>,
}

impl EnforcerHandle {
    #[must_use]
    pub fn new(policy: &Policy) -> Self {
        Self::from_enforcer(PolicyEnforcer::new(policy))
    }

    #[must_use]
    pub fn from_enforcer(enforcer: PolicyEnforcer) -> Self {
        Self {
            current: ArcSwap::from_pointee(enforcer),
        }
    }

    /// Snapshot of the current enforcer.
    #[must_use]
    pub fn load(&self) -> Arc<PolicyEnforcer> {
        self.current.load_full()
    }

    /// Rebuild from `policy` and swap it in.
    ///
    /// The new enforcer is built before the swap, so readers never wait on
    /// it. A policy with another id, or with a revision older than the
    /// current snapshot, is ignored and `false` is returned.
    #[must_use = "a rejected update leaves the previous snapshot in place"]
    pub fn update(&self, policy: &Policy) -> bool {
        if let Some(reason) = rejection(&self.current.load(), policy) {
            warn!(
                policy_id = %policy.id(),
                revision = policy.revision(),
                reason,
                "Ignoring policy update"
            );
            return false;
        }

        let next = Arc::new(PolicyEnforcer::new(policy));
        let mut accepted = false;
        let previous = self.current.rcu(|current| {
            if rejection(current, policy).is_some() {
                accepted = false;
                Arc::clone(current)
            } else {
                accepted = true;
                Arc::clone(&next)
            }
        });

        if accepted {
            info!(
                policy_id = %policy.id(),
                from_revision = previous.revision(),
                to_revision = policy.revision(),
                "Swapped policy enforcer"
            );
        } else {
            warn!(
                policy_id = %policy.id(),
                revision = policy.revision(),
                "Ignoring policy update overtaken by a newer revision"
            );
        }
        accepted
    }

    /// Swap in `enforcer` unconditionally.
    pub fn replace(&self, enforcer: PolicyEnforcer) {
        info!(
            policy_id = %enforcer.policy_id(),
            revision = enforcer.revision(),
            "Replaced policy enforcer"
        );
        self.current.store(Arc::new(enforcer));
    }
}

fn rejection(current: &PolicyEnforcer, policy: &Policy) -> Option<&'static str> {
    if current.policy_id() != policy.id() {
        Some("policy id differs from the current snapshot")
    } else if policy.revision() < current.revision() {
        Some("revision is older than the current snapshot")
    } else {
        None
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use policy_model::{AuthorizationContext, Label, Permissions, PolicyId, ResourceKey, SubjectId};
    use tracing_test::traced_test;

    use super::*;

    fn policy(revision: u64, token: &str) -> Policy {
        Policy::new(PolicyId::new("org.example:lamp"))
            .with_revision(revision)
            .label(
                "l",
                Label::new()
                    .subject(SubjectId::parse("user:a").unwrap())
                    .grant(ResourceKey::parse("thing:/").unwrap(), &Permissions::of([token]).unwrap()),
            )
    }

    fn allows(handle: &EnforcerHandle, token: &str) -> bool {
        handle
            .load()
            .has_permission(
                &AuthorizationContext::parse(["user:a"]).unwrap(),
                &ResourceKey::parse("thing:/").unwrap(),
                &Permissions::of([token]).unwrap(),
            )
            .unwrap()
    }

    #[test]
    #[traced_test]
    fn newer_revision_is_swapped_in() {
        let handle = EnforcerHandle::new(&policy(1, "READ"));
        let before = handle.load();

        assert!(handle.update(&policy(2, "WRITE")));
        assert_eq!(handle.load().revision(), 2);
        assert!(allows(&handle, "WRITE"));
        assert!(!allows(&handle, "READ"));
        // snapshots taken earlier are untouched
        assert_eq!(before.revision(), 1);
        assert!(logs_contain("Swapped policy enforcer"));
    }

    #[test]
    fn same_revision_is_accepted() {
        let handle = EnforcerHandle::new(&policy(3, "READ"));
        assert!(handle.update(&policy(3, "WRITE")));
        assert!(allows(&handle, "WRITE"));
    }

    #[test]
    #[traced_test]
    fn stale_revision_is_ignored() {
        let handle = EnforcerHandle::new(&policy(5, "READ"));

        assert!(!handle.update(&policy(4, "WRITE")));
        assert_eq!(handle.load().revision(), 5);
        assert!(allows(&handle, "READ"));
        assert!(logs_contain("Ignoring policy update"));
    }

    #[test]
    fn foreign_policy_is_ignored() {
        let handle = EnforcerHandle::new(&policy(1, "READ"));
        let foreign = Policy::new(PolicyId::new("org.example:other")).with_revision(9);

        assert!(!handle.update(&foreign));
        assert_eq!(handle.load().policy_id().as_str(), "org.example:lamp");
    }

    #[test]
    fn replace_ignores_revisions() {
        let handle = EnforcerHandle::new(&policy(5, "READ"));
        handle.replace(PolicyEnforcer::new(&policy(1, "WRITE")));

        assert_eq!(handle.load().revision(), 1);
        assert!(allows(&handle, "WRITE"));
    }
}
