//! Text rendering of forests

use std::collections::HashMap;
use std::hash::Hash;

use generational_arena::Index;
use serde_json::Value;
use termtree::Tree;

use crate::application::convert::Record;
use crate::domain::{Forest, ForestNode, NodeKey};

/// Summary figures for a forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestStats {
    pub nodes: usize,
    pub roots: usize,
    pub depth: usize,
    pub leaves: usize,
}

impl ForestStats {
    pub fn of<T, K: Eq + Hash + Clone>(forest: &Forest<T, K>) -> Self {
        Self {
            nodes: forest.len(),
            roots: forest.roots().len(),
            depth: forest.depth(),
            leaves: forest.leaf_keys().len(),
        }
    }
}

/// Render each root of a forest as a `termtree` tree, labelling nodes with `label`.
///
/// Built bottom-up without recursion. `termtree` itself formats and drops
/// recursively, so callers cap the depth of what they print.
pub fn render_with<T, K, F>(forest: &Forest<T, K>, label: F) -> Vec<Tree<String>>
where
    K: Eq + Hash + Clone,
    F: Fn(&ForestNode<T, K>) -> String,
{
    let mut built: HashMap<Index, Tree<String>> = HashMap::with_capacity(forest.len());
    for (idx, node) in forest.iter_postorder() {
        let leaves: Vec<_> = node
            .children
            .iter()
            .filter_map(|child| built.remove(child))
            .collect();
        built.insert(idx, Tree::new(label(node)).with_leaves(leaves));
    }

    forest
        .roots()
        .iter()
        .filter_map(|root| built.remove(root))
        .collect()
}

pub trait TreeNodeConvert {
    /// Render as text trees; `label_field` picks the record field shown for
    /// each node, falling back to the node key.
    fn to_tree_strings(&self, label_field: Option<&str>) -> Vec<Tree<String>>;
}

impl TreeNodeConvert for Forest<Record, NodeKey> {
    fn to_tree_strings(&self, label_field: Option<&str>) -> Vec<Tree<String>> {
        render_with(self, |node| {
            match label_field.and_then(|field| node.data.get(field)) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => node.key.to_string(),
            }
        })
    }
}
