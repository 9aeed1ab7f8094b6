//! Sparse resource path index of one resource type.
//!
//! Only paths that carry declarations get a node; unmodelled intermediate
//! segments have none. Nodes are kept in segment order, which places every
//! descendant of a path directly after it, so subtree lookups are range
//! scans and ancestor lookups are one map lookup per path level.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use policy_model::{EffectedPermissions, ResourcePath, SubjectId};

use crate::flattener::{PathDeclarations, SubjectDeclarations};

/// A declared path with the merged declarations of every subject there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrieNode {
    path: ResourcePath,
    declarations: SubjectDeclarations,
}

impl TrieNode {
    #[must_use]
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    #[must_use]
    pub fn declarations(&self) -> &HashMap<SubjectId, EffectedPermissions> {
        &self.declarations
    }

    /// What this node says about `subject`, `None` if it says nothing.
    #[must_use]
    pub fn declaration_for(&self, subject: &SubjectId) -> Option<&EffectedPermissions> {
        self.declarations.get(subject)
    }

    pub fn subjects(&self) -> impl Iterator<Item = &SubjectId> {
        self.declarations.keys()
    }
}

/// Immutable path index for one resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceTrie {
    nodes: BTreeMap<Vec<String>, TrieNode>,
}

impl ResourceTrie {
    /// A trie without any node; every lookup on it is absent.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_declarations(declarations: PathDeclarations) -> Self {
        let nodes = declarations
            .into_iter()
            .map(|(path, declarations)| {
                (
                    path.segments().to_vec(),
                    TrieNode { path, declarations },
                )
            })
            .collect();
        Self { nodes }
    }

    /// The node at exactly `path`, `None` if the path is not declared.
    #[must_use]
    pub fn node_at(&self, path: &ResourcePath) -> Option<&TrieNode> {
        self.nodes.get(path.segments())
    }

    /// Existing nodes whose paths are prefixes of `path` (including `path`
    /// itself), root first. Undeclared levels are skipped.
    #[must_use]
    pub fn ancestor_chain(&self, path: &ResourcePath) -> Vec<&TrieNode> {
        let segments = path.segments();
        (0..=segments.len())
            .filter_map(|len| self.nodes.get(&segments[..len]))
            .collect()
    }

    /// Existing nodes at or below `path`, in path order.
    pub fn descendants<'a>(&'a self, path: &'a ResourcePath) -> impl Iterator<Item = &'a TrieNode> + 'a {
        let prefix = path.segments();
        self.nodes
            .range::<[String], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(segments, _)| segments.starts_with(prefix))
            .map(|(_, node)| node)
    }

    /// Existing nodes strictly below `path`.
    pub fn strict_descendants<'a>(
        &'a self,
        path: &'a ResourcePath,
    ) -> impl Iterator<Item = &'a TrieNode> + 'a {
        let prefix = path.segments();
        self.nodes
            .range::<[String], _>((Bound::Excluded(prefix), Bound::Unbounded))
            .take_while(move |(segments, _)| segments.starts_with(prefix))
            .map(|(_, node)| node)
    }

    /// All nodes in path order.
    pub fn nodes(&self) -> impl Iterator<Item = &TrieNode> {
        self.nodes.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
