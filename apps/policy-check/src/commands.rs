//! Command implementations. Each returns its result instead of printing so
//! `main` owns stdout and exit codes.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use policy_enforcer::PolicyEnforcer;
use policy_model::{AuthorizationContext, Permissions, Policy, ResourceKey, ResourcePath, ResourceType};
use serde_json::Value;
use tracing::debug;

/// Which subjects `subjects` lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubjectScope {
    /// Granted and revoked subjects at the resource itself.
    #[default]
    Exact,
    /// Subjects holding the permissions somewhere in the subtree.
    Partial,
    /// Subjects holding the permissions everywhere in the subtree.
    Unrestricted,
}

/// Parse a policy document from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or is not a valid policy.
pub fn load_policy(path: &Path) -> Result<Policy> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read policy file {}", path.display()))?;
    let policy: Policy = serde_json::from_str(&text)
        .with_context(|| format!("invalid policy document in {}", path.display()))?;
    debug!(
        policy_id = %policy.id(),
        revision = policy.revision(),
        labels = policy.labels().len(),
        "Loaded policy"
    );
    Ok(policy)
}

/// Build the enforcer for a policy file.
///
/// # Errors
/// See [`load_policy`].
pub fn load_enforcer(path: &Path) -> Result<PolicyEnforcer> {
    load_policy(path).map(|policy| PolicyEnforcer::new(&policy))
}

/// Accept `type:/path`, or a bare `/path` resolved against `default_type`.
///
/// # Errors
/// Returns an error for malformed keys, paths or resource types.
pub fn resource_key(raw: &str, default_type: &str) -> Result<ResourceKey> {
    if raw.starts_with('/') {
        let resource_type = ResourceType::new(default_type)
            .with_context(|| format!("invalid default resource type '{default_type}'"))?;
        let path = ResourcePath::parse(raw)?;
        return Ok(ResourceKey::new(resource_type, path));
    }
    Ok(ResourceKey::parse(raw)?)
}

fn context_of(subjects: &[String]) -> Result<AuthorizationContext> {
    AuthorizationContext::parse(subjects).context("invalid --subject")
}

fn permissions_of(tokens: &[String]) -> Result<Permissions> {
    Permissions::of(tokens.iter().map(String::as_str)).context("invalid --permission")
}

/// Whether the subjects together hold every permission at the resource.
///
/// # Errors
/// Returns an error for malformed subjects or permissions.
pub fn check(
    enforcer: &PolicyEnforcer,
    key: &ResourceKey,
    subjects: &[String],
    permissions: &[String],
) -> Result<bool> {
    let ctx = context_of(subjects)?;
    let required = permissions_of(permissions)?;
    Ok(enforcer.has_permission(&ctx, key, &required)?)
}

/// Effected subjects as JSON.
///
/// [`SubjectScope::Exact`] yields `{"granted": [..], "revoked": [..]}`, the
/// subtree scopes a plain array of subject ids.
///
/// # Errors
/// Returns an error for malformed permissions.
pub fn subjects(
    enforcer: &PolicyEnforcer,
    key: &ResourceKey,
    permissions: &[String],
    scope: SubjectScope,
) -> Result<Value> {
    let required = permissions_of(permissions)?;
    let value = match scope {
        SubjectScope::Exact => serde_json::to_value(enforcer.subjects_with_permission(key, &required)?)?,
        SubjectScope::Partial => {
            serde_json::to_value(enforcer.subjects_with_partial_permission(key, &required)?)?
        }
        SubjectScope::Unrestricted => {
            serde_json::to_value(enforcer.subjects_with_unrestricted_permission(key, &required)?)?
        }
    };
    Ok(value)
}

/// The part of the JSON document at `document` the subjects may see,
/// `null` when nothing is visible.
///
/// # Errors
/// Returns an error if the document cannot be read or parsed, or for
/// malformed subjects or permissions.
pub fn view(
    enforcer: &PolicyEnforcer,
    document: &Path,
    key: &ResourceKey,
    subjects: &[String],
    permissions: &[String],
) -> Result<Value> {
    let text = fs::read_to_string(document)
        .with_context(|| format!("failed to read document {}", document.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("invalid JSON in {}", document.display()))?;
    let ctx = context_of(subjects)?;
    let required = permissions_of(permissions)?;

    Ok(enforcer
        .build_json_view(&value, key, &ctx, &required)?
        .unwrap_or(Value::Null))
}
