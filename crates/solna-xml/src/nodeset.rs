#![forbid(unsafe_code)]

//! NodeSet type for XML canonicalization and transforms.
//!
//! A `NodeSet` represents a set of nodes from a parsed `roxmltree`
//! document, identified by their `NodeId`. It supports the operations
//! needed by same-document references and the enveloped-signature
//! transform.

use roxmltree::{Document, Node, NodeId};
use std::collections::HashSet;

/// A set of XML document nodes identified by `NodeId`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    nodes: HashSet<NodeId>,
}

impl NodeSet {
    /// Create an empty node set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node set containing the whole document.
    ///
    /// A `URI=""` reference selects the document without comments, so
    /// comment nodes are only included when `with_comments` is set.
    pub fn document(doc: &Document<'_>, with_comments: bool) -> Self {
        Self::tree(doc.root(), with_comments)
    }

    /// Create a node set for the subtree rooted at `root`.
    pub fn tree(root: Node<'_, '_>, with_comments: bool) -> Self {
        let nodes = root
            .descendants()
            .filter(|n| with_comments || !n.is_comment())
            .map(|n| n.id())
            .collect();
        Self { nodes }
    }

    /// Remove the subtree rooted at `root` from this set.
    pub fn subtract_tree(&mut self, root: Node<'_, '_>) {
        for n in root.descendants() {
            self.nodes.remove(&n.id());
        }
    }

    /// Check whether a node is in the set.
    pub fn contains(&self, node: &Node<'_, '_>) -> bool {
        self.nodes.contains(&node.id())
    }

    pub fn insert(&mut self, node: &Node<'_, '_>) {
        self.nodes.insert(node.id());
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}
