//! FILENAME: core/drilldown-engine/src/expansion.rs
//! Expansion State - which nodes currently show their children.
//!
//! Entries are keyed by path-qualified node identity, not by row position.
//! Collapsing a node removes only that node's entry, so descendants keep
//! their own flags and reappear as they were when the node is re-expanded.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::definition::Level;
use crate::tree::{Node, NodeKey};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionState {
    expanded: FxHashSet<NodeKey>,
}

impl ExpansionState {
    /// Everything collapsed.
    pub fn new() -> Self {
        ExpansionState::default()
    }

    pub fn is_expanded(&self, key: &NodeKey) -> bool {
        self.expanded.contains(key)
    }

    pub fn expand(&mut self, key: impl Into<NodeKey>) {
        self.expanded.insert(key.into());
    }

    /// Removes only `key`; descendant entries are left untouched.
    pub fn collapse(&mut self, key: &NodeKey) {
        self.expanded.remove(key);
    }

    /// Flips `key` and returns whether it is now expanded.
    pub fn toggle(&mut self, key: impl Into<NodeKey>) -> bool {
        let key = key.into();
        if self.expanded.remove(&key) {
            false
        } else {
            self.expanded.insert(key);
            true
        }
    }

    /// Expands every node that has children.
    pub fn expand_all<L: Level>(&mut self, forest: &[Node<L>]) {
        self.expand_subtree(forest, None);
    }

    fn expand_subtree<L: Level>(&mut self, nodes: &[Node<L>], parent: Option<&NodeKey>) {
        for node in nodes {
            if node.children.is_empty() {
                continue;
            }
            let key = NodeKey::under(parent, &node.id);
            self.expand_subtree(&node.children, Some(&key));
            self.expanded.insert(key);
        }
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &NodeKey> {
        self.expanded.iter()
    }
}
