use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use generational_arena::{Arena, Index};
use tracing::instrument;

/// Node stored in a [`Forest`].
#[derive(Debug)]
pub struct ForestNode<T, K> {
    /// Payload taken from the flat record
    pub data: T,
    /// Identity of this node
    pub key: K,
    /// Index of parent node in the arena, None for root nodes
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena, in input order
    pub children: Vec<Index>,
}

/// Arena-based forest produced from flat, parent-referencing records.
///
/// Nodes are addressed by stable generational indices; parent and children
/// links are indices as well, so no node is aliased or mutated through a
/// shared reference. Every key in the forest is unique and every node is
/// reachable from exactly one root.
pub struct Forest<T, K> {
    arena: Arena<ForestNode<T, K>>,
    roots: Vec<Index>,
    index: HashMap<K, Index>,
}

impl<T, K> fmt::Debug for Forest<T, K>
where
    T: fmt::Debug,
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Forest")
            .field("roots", &self.roots)
            .field("len", &self.arena.len())
            .finish()
    }
}

impl<T, K> Default for Forest<T, K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, K> Forest<T, K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            roots: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            arena: Arena::with_capacity(n),
            roots: Vec::with_capacity(n),
            index: HashMap::with_capacity(n),
        }
    }

    /// Store a node without linking it. Linking happens in a later pass so
    /// children may precede their parent in the input.
    pub(crate) fn insert_detached(&mut self, key: K, data: T) -> Index {
        let idx = self.arena.insert(ForestNode {
            data,
            key: key.clone(),
            parent: None,
            children: Vec::new(),
        });
        self.index.insert(key, idx);
        idx
    }

    pub(crate) fn link(&mut self, child: Index, parent: Option<Index>) {
        match parent {
            Some(parent_idx) => {
                if let Some(node) = self.arena.get_mut(parent_idx) {
                    node.children.push(child);
                }
                if let Some(node) = self.arena.get_mut(child) {
                    node.parent = Some(parent_idx);
                }
            }
            None => self.roots.push(child),
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Top-level nodes in input order.
    pub fn roots(&self) -> &[Index] {
        &self.roots
    }

    pub fn get(&self, idx: Index) -> Option<&ForestNode<T, K>> {
        self.arena.get(idx)
    }

    /// Look up a node index by key.
    pub fn find(&self, key: &K) -> Option<Index> {
        self.index.get(key).copied()
    }

    pub fn parent(&self, idx: Index) -> Option<Index> {
        self.get(idx).and_then(|node| node.parent)
    }

    pub fn children(&self, idx: Index) -> &[Index] {
        self.get(idx).map(|node| node.children.as_slice()).unwrap_or(&[])
    }

    /// Pre-order traversal over all roots, siblings in input order.
    pub fn iter(&self) -> ForestIterator<'_, T, K> {
        ForestIterator::new(self)
    }

    /// Post-order traversal: every child is yielded before its parent.
    pub fn iter_postorder(&self) -> PostOrderIterator<'_, T, K> {
        PostOrderIterator::new(self)
    }

    /// Number of levels in the deepest tree; 0 for an empty forest.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        // iterative so deep chains cannot overflow the stack
        let mut max_depth = 0;
        let mut stack: Vec<(Index, usize)> = self.roots.iter().map(|&r| (r, 1)).collect();
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            for &child in self.children(idx) {
                stack.push((child, depth + 1));
            }
        }
        max_depth
    }

    /// Keys of all leaf nodes (nodes with no children), in pre-order.
    #[instrument(level = "debug", skip(self))]
    pub fn leaf_keys(&self) -> Vec<&K> {
        self.iter()
            .filter(|(_, node)| node.children.is_empty())
            .map(|(_, node)| &node.key)
            .collect()
    }

    /// Path from a root down to the node with `key` (inclusive).
    ///
    /// Empty when the key is not part of the forest.
    pub fn path_to(&self, key: &K) -> Vec<&ForestNode<T, K>> {
        let mut path = Vec::new();
        let mut current = self.find(key);
        while let Some(idx) = current {
            match self.get(idx) {
                Some(node) => {
                    path.push(node);
                    current = node.parent;
                }
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// Consume the forest bottom-up, building one value per node from its
    /// payload and the already built values of its children.
    ///
    /// Returns the values built for the roots, in root order.
    pub fn fold<V, F>(mut self, mut build: F) -> Vec<V>
    where
        F: FnMut(K, T, Vec<V>) -> V,
    {
        let order: Vec<Index> = self.iter_postorder().map(|(idx, _)| idx).collect();
        let mut built: HashMap<Index, V> = HashMap::with_capacity(order.len());

        for idx in order {
            if let Some(node) = self.arena.remove(idx) {
                let children = node
                    .children
                    .iter()
                    .filter_map(|child| built.remove(child))
                    .collect();
                built.insert(idx, build(node.key, node.data, children));
            }
        }

        self.roots
            .iter()
            .filter_map(|root| built.remove(root))
            .collect()
    }
}

pub struct ForestIterator<'a, T, K> {
    forest: &'a Forest<T, K>,
    stack: Vec<Index>,
}

impl<'a, T, K> ForestIterator<'a, T, K>
where
    K: Eq + Hash + Clone,
{
    fn new(forest: &'a Forest<T, K>) -> Self {
        // Push roots in reverse order for left-to-right traversal
        let stack = forest.roots().iter().rev().copied().collect();
        Self { forest, stack }
    }
}

impl<'a, T, K> Iterator for ForestIterator<'a, T, K>
where
    K: Eq + Hash + Clone,
{
    type Item = (Index, &'a ForestNode<T, K>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.forest.get(current_idx) {
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a, T, K> {
    forest: &'a Forest<T, K>,
    stack: Vec<(Index, bool)>,
}

impl<'a, T, K> PostOrderIterator<'a, T, K>
where
    K: Eq + Hash + Clone,
{
    fn new(forest: &'a Forest<T, K>) -> Self {
        let stack = forest
            .roots()
            .iter()
            .rev()
            .map(|&root| (root, false))
            .collect();
        Self { forest, stack }
    }
}

impl<'a, T, K> Iterator for PostOrderIterator<'a, T, K>
where
    K: Eq + Hash + Clone,
{
    type Item = (Index, &'a ForestNode<T, K>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.forest.get(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    //      a        d
    //     / \
    //    b   c
    //        |
    //        e
    fn sample() -> Forest<&'static str, u32> {
        let mut forest = Forest::new();
        let a = forest.insert_detached(1, "a");
        let b = forest.insert_detached(2, "b");
        let c = forest.insert_detached(3, "c");
        let d = forest.insert_detached(4, "d");
        let e = forest.insert_detached(5, "e");
        forest.link(a, None);
        forest.link(b, Some(a));
        forest.link(c, Some(a));
        forest.link(d, None);
        forest.link(e, Some(c));
        forest
    }

    #[test]
    fn given_forest_when_iterating_preorder_then_parents_first() {
        let forest = sample();
        let order: Vec<_> = forest.iter().map(|(_, n)| n.data).collect();
        assert_eq!(order, vec!["a", "b", "c", "e", "d"]);
    }

    #[test]
    fn given_forest_when_iterating_postorder_then_children_first() {
        let forest = sample();
        let order: Vec<_> = forest.iter_postorder().map(|(_, n)| n.data).collect();
        assert_eq!(order, vec!["b", "e", "c", "a", "d"]);
    }

    #[test]
    fn given_forest_when_measuring_then_depth_and_leaves_match() {
        let forest = sample();
        assert_eq!(forest.len(), 5);
        assert_eq!(forest.depth(), 3);
        assert_eq!(forest.leaf_keys(), vec![&2, &5, &4]);
    }

    #[test]
    fn given_empty_forest_when_measuring_then_zero() {
        let forest: Forest<(), u32> = Forest::new();
        assert!(forest.is_empty());
        assert_eq!(forest.depth(), 0);
        assert!(forest.leaf_keys().is_empty());
        assert!(forest.path_to(&1).is_empty());
    }

    #[test]
    fn given_key_when_finding_path_then_root_to_node() {
        let forest = sample();
        let path: Vec<_> = forest.path_to(&5).iter().map(|n| n.data).collect();
        assert_eq!(path, vec!["a", "c", "e"]);
        assert!(forest.path_to(&99).is_empty());
    }

    #[test]
    fn given_forest_when_folding_then_nests_in_order() {
        let forest = sample();
        let nested = forest.fold(|_, data, children: Vec<String>| {
            if children.is_empty() {
                data.to_string()
            } else {
                format!("{}({})", data, children.join(","))
            }
        });
        assert_eq!(nested, vec!["a(b,c(e))".to_string(), "d".to_string()]);
    }
}
