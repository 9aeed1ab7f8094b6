//! Permission-filtered JSON views.
//!
//! The document is walked alongside the resource trie: every object field
//! maps to a child path segment. Array indexes do not. Fields the requester cannot see are left
//! out entirely, never replaced by placeholders.

use policy_model::{AuthorizationContext, Permissions, ResourceKey, ResourcePath};
use serde_json::{Map, Value};

use super::{PolicyEnforcer, context_holds, ensure_required, partially_holds, unrestrictedly_holds};
use crate::error::EnforcerError;
use crate::trie::ResourceTrie;

impl PolicyEnforcer {
    /// Project `value`, rooted at `base`, onto what `ctx` may see with
    /// `required`.
    ///
    /// Returns `Ok(None)` when nothing of the value is visible. Objects keep
    /// their key order. Arrays and scalars are atomic: kept whole or dropped,
    /// decided at their own path only. Declarations on array elements, such
    /// as a grant on `/tags/0`, are never consulted, so an element is not
    /// visible unless the whole array is. Filtering an already filtered view
    /// yields the same view.
    ///
    /// # Errors
    ///
    /// Returns [`EnforcerError::InvalidArgument`] if `required` is empty.
    pub fn build_json_view(
        &self,
        value: &Value,
        base: &ResourceKey,
        ctx: &AuthorizationContext,
        required: &Permissions,
    ) -> Result<Option<Value>, EnforcerError> {
        ensure_required(required)?;
        let Some(trie) = self.trie(base.resource_type()) else {
            return Ok(None);
        };

        let builder = JsonViewBuilder {
            trie,
            ctx,
            required,
        };
        Ok(builder.view(value, base.path()))
    }
}

struct JsonViewBuilder<'a> {
    trie: &'a ResourceTrie,
    ctx: &'a AuthorizationContext,
    required: &'a Permissions,
}

impl JsonViewBuilder<'_> {
    fn view(&self, value: &Value, path: &ResourcePath) -> Option<Value> {
        match value {
            Value::Object(fields) => self.view_object(value, fields, path),
            leaf => self.readable(path).then(|| leaf.clone()),
        }
    }

    fn view_object(
        &self,
        value: &Value,
        fields: &Map<String, Value>,
        path: &ResourcePath,
    ) -> Option<Value> {
        if unrestrictedly_holds(self.trie, self.ctx, path, self.required) {
            return Some(value.clone());
        }
        if !partially_holds(self.trie, self.ctx, path, self.required) {
            return None;
        }

        let filtered: Map<String, Value> = fields
            .iter()
            .filter_map(|(name, child)| {
                self.view(child, &path.child(name.as_str()))
                    .map(|visible| (name.clone(), visible))
            })
            .collect();

        (self.readable(path) || !filtered.is_empty()).then_some(Value::Object(filtered))
    }

    fn readable(&self, path: &ResourcePath) -> bool {
        context_holds(self.trie, self.ctx, path, self.required)
    }
}
