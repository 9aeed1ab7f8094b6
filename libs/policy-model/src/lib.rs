#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Twin Policy Model
//!
//! Value types shared by the policy enforcer and its collaborators:
//!
//! - [`Permission`], [`Permissions`] - access-right tokens and immutable sets of them
//! - [`SubjectId`], [`AuthorizationContext`] - identities of one requester
//! - [`ResourceType`], [`ResourcePath`], [`ResourceKey`] - addresses inside resource trees
//! - [`EffectedPermissions`], [`Label`], [`Policy`] - the declarative policy document
//! - [`ModelError`] - malformed input rejected by the validated constructors

pub mod error;
pub mod permission;
pub mod policy;
pub mod resource;
pub mod subject;

pub use error::ModelError;
pub use permission::{Permission, Permissions, permissions};
pub use policy::{EffectedPermissions, Label, Policy, PolicyId};
pub use resource::{ResourceKey, ResourcePath, ResourceType, resource_types};
pub use subject::{AuthorizationContext, SubjectId};
