#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Twin Policy Enforcer
//!
//! Answers "may these subjects do this to that resource?" against one
//! immutable policy snapshot:
//!
//! - [`flatten`] / [`FlattenedPolicy`] - labels merged into per-type, per-path declarations
//! - [`ResourceTrie`] / [`TrieNode`] - sparse path index of one resource type
//! - [`PolicyEnforcer`] - point decisions, subtree checks, effected subjects, JSON views
//! - [`EnforcerHandle`] - atomic swap of enforcer snapshots on policy change
//! - [`EnforcerError`] - rejected query arguments
//!
//! ## Usage
//!
//! ```
//! use policy_enforcer::EnforcerHandle;
//! use policy_model::{AuthorizationContext, Label, Permissions, Policy, PolicyId, ResourceKey, SubjectId};
//! use serde_json::json;
//!
//! let owner = SubjectId::parse("google:owner").unwrap();
//! let policy = Policy::new(PolicyId::new("org.example:lamp")).label(
//!     "owner",
//!     Label::new()
//!         .subject(owner.clone())
//!         .grant(ResourceKey::parse("thing:/").unwrap(), &Permissions::of(["READ"]).unwrap())
//!         .revoke(ResourceKey::parse("thing:/secret").unwrap(), &Permissions::of(["READ"]).unwrap()),
//! );
//!
//! let handle = EnforcerHandle::new(&policy);
//! let enforcer = handle.load();
//! let view = enforcer
//!     .build_json_view(
//!         &json!({"a": 1, "secret": {"x": 2}}),
//!         &ResourceKey::parse("thing:/").unwrap(),
//!         &AuthorizationContext::single(owner),
//!         &Permissions::of(["READ"]).unwrap(),
//!     )
//!     .unwrap();
//!
//! assert_eq!(view, Some(json!({"a": 1})));
//! ```

pub mod enforcer;
pub mod error;
pub mod flattener;
pub mod handle;
pub mod trie;

pub use enforcer::{Decision, EffectedSubjects, PolicyEnforcer};
pub use error::EnforcerError;
pub use flattener::{FlattenedPolicy, PathDeclarations, SubjectDeclarations, flatten};
pub use handle::EnforcerHandle;
pub use trie::{ResourceTrie, TrieNode};
