//! Forest builder: turns flat, parent-referencing records into a forest.
//!
//! The build runs in three passes over the input:
//! 1. index every record by key (duplicates resolved here),
//! 2. resolve each record's parent chain to a root, an orphan or a cycle,
//! 3. insert the rooted records into the arena and link them in input order.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::domain::arena::Forest;
use crate::domain::error::{TreeError, TreeResult};

/// A record that knows its own key and the key of its parent.
pub trait FlatNode {
    type Key: Clone + Eq + Hash + Display;

    /// Identity of the record; `None` if the record has no usable key.
    fn key(&self) -> Option<Self::Key>;

    /// Parent reference; `None` never matches any node or the root sentinel.
    fn parent_key(&self) -> Option<Self::Key>;
}

/// What to do with records whose parent key matches no record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanPolicy {
    /// Leave orphans, their descendants and keyless records out of the forest
    #[default]
    Drop,
    /// Promote orphans to roots
    Root,
    /// Fail on the first orphan, cycle or record without a key
    Error,
}

/// What to do when two records share a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// The later record replaces the earlier one, including its position
    #[default]
    Replace,
    /// Fail on the first duplicate
    Error,
}

impl FromStr for OrphanPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drop" => Ok(OrphanPolicy::Drop),
            "root" => Ok(OrphanPolicy::Root),
            "error" => Ok(OrphanPolicy::Error),
            other => Err(format!("unknown orphan policy `{other}` (drop, root, error)")),
        }
    }
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "replace" => Ok(DuplicatePolicy::Replace),
            "error" => Ok(DuplicatePolicy::Error),
            other => Err(format!("unknown duplicate policy `{other}` (replace, error)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Unknown,
    Visiting,
    Rooted,
    Orphan,
    Cyclic,
}

struct Slot<T, K> {
    key: K,
    parent: Option<K>,
    data: T,
}

/// Builds a [`Forest`] from flat records.
#[derive(Debug, Clone)]
pub struct ForestBuilder<K> {
    root: K,
    orphans: OrphanPolicy,
    duplicates: DuplicatePolicy,
}

impl<K> ForestBuilder<K>
where
    K: Clone + Eq + Hash + Display,
{
    /// `root` is the parent key marking a record as top-level.
    pub fn new(root: K) -> Self {
        Self {
            root,
            orphans: OrphanPolicy::default(),
            duplicates: DuplicatePolicy::default(),
        }
    }

    pub fn orphans(mut self, policy: OrphanPolicy) -> Self {
        self.orphans = policy;
        self
    }

    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn root(&self) -> &K {
        &self.root
    }

    /// Build from records implementing [`FlatNode`].
    pub fn build<N, I>(&self, nodes: I) -> TreeResult<Forest<N, K>>
    where
        N: FlatNode<Key = K>,
        I: IntoIterator<Item = N>,
    {
        self.build_with(nodes, "key", N::key, N::parent_key)
    }

    /// Build from arbitrary records using accessor functions.
    ///
    /// `key_name` only labels [`TreeError::MissingKey`].
    #[instrument(level = "debug", skip_all, fields(root = %self.root, orphans = ?self.orphans))]
    pub fn build_with<T, I, FK, FP>(
        &self,
        nodes: I,
        key_name: &str,
        key_of: FK,
        parent_of: FP,
    ) -> TreeResult<Forest<T, K>>
    where
        I: IntoIterator<Item = T>,
        FK: Fn(&T) -> Option<K>,
        FP: Fn(&T) -> Option<K>,
    {
        let slots = self.index(nodes, key_name, key_of, parent_of)?;
        let resolution = self.resolve(&slots)?;
        Ok(self.link(slots, &resolution))
    }

    /// Pass 1: record every node by key, in input order.
    fn index<T, I, FK, FP>(
        &self,
        nodes: I,
        key_name: &str,
        key_of: FK,
        parent_of: FP,
    ) -> TreeResult<Vec<Option<Slot<T, K>>>>
    where
        I: IntoIterator<Item = T>,
        FK: Fn(&T) -> Option<K>,
        FP: Fn(&T) -> Option<K>,
    {
        let mut slots: Vec<Option<Slot<T, K>>> = Vec::new();
        let mut seen: HashMap<K, usize> = HashMap::new();

        for (position, data) in nodes.into_iter().enumerate() {
            let Some(key) = key_of(&data) else {
                if self.orphans == OrphanPolicy::Error {
                    return Err(TreeError::MissingKey {
                        position,
                        field: key_name.to_string(),
                    });
                }
                warn!(position, field = key_name, "record without key dropped");
                continue;
            };
            let parent = parent_of(&data);

            if let Some(previous) = seen.insert(key.clone(), slots.len()) {
                match self.duplicates {
                    DuplicatePolicy::Error => {
                        return Err(TreeError::DuplicateKey(key.to_string()));
                    }
                    DuplicatePolicy::Replace => {
                        warn!(%key, position, "duplicate key, later record wins");
                        slots[previous] = None;
                    }
                }
            }
            slots.push(Some(Slot { key, parent, data }));
        }
        debug!(records = slots.len(), unique = seen.len(), "indexed records");
        Ok(slots)
    }

    /// Pass 2: classify every slot by where its parent chain ends.
    fn resolve<T>(&self, slots: &[Option<Slot<T, K>>]) -> TreeResult<Vec<Resolution>> {
        let position: HashMap<&K, usize> = slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|s| (&s.key, i)))
            .collect();

        let mut state = vec![Resolution::Unknown; slots.len()];
        let mut chain: Vec<usize> = Vec::new();

        for start in 0..slots.len() {
            if slots[start].is_none() || state[start] != Resolution::Unknown {
                continue;
            }

            // follow parents until the outcome is known
            let mut current = start;
            let outcome = loop {
                match state[current] {
                    Resolution::Visiting => break Resolution::Cyclic,
                    Resolution::Unknown => {}
                    known => break known,
                }
                state[current] = Resolution::Visiting;
                chain.push(current);

                let Some(slot) = slots[current].as_ref() else {
                    break Resolution::Orphan;
                };
                match &slot.parent {
                    Some(parent) if *parent == self.root => break Resolution::Rooted,
                    Some(parent) => match position.get(parent) {
                        Some(&next) => current = next,
                        None => break self.orphan(&slot.key, &parent.to_string())?,
                    },
                    None => break self.orphan(&slot.key, "<missing>")?,
                }
            };

            if outcome == Resolution::Cyclic && self.orphans == OrphanPolicy::Error {
                return Err(TreeError::CycleDetected(
                    slots[current]
                        .as_ref()
                        .map(|s| s.key.to_string())
                        .unwrap_or_default(),
                ));
            }
            for i in chain.drain(..) {
                state[i] = outcome;
            }
        }

        let dropped = state
            .iter()
            .filter(|s| matches!(s, Resolution::Orphan | Resolution::Cyclic))
            .count();
        if dropped > 0 {
            warn!(dropped, "records unreachable from any root were dropped");
        }
        Ok(state)
    }

    fn orphan(&self, key: &K, parent: &str) -> TreeResult<Resolution> {
        match self.orphans {
            OrphanPolicy::Drop => {
                debug!(%key, parent, "orphan dropped");
                Ok(Resolution::Orphan)
            }
            OrphanPolicy::Root => {
                debug!(%key, parent, "orphan promoted to root");
                Ok(Resolution::Rooted)
            }
            OrphanPolicy::Error => Err(TreeError::UnresolvedParent {
                key: key.to_string(),
                parent: parent.to_string(),
            }),
        }
    }

    /// Pass 3: insert rooted slots, then link them in input order.
    fn link<T>(&self, slots: Vec<Option<Slot<T, K>>>, resolution: &[Resolution]) -> Forest<T, K> {
        let mut forest = Forest::with_capacity(slots.len());
        let mut pending = Vec::with_capacity(slots.len());

        for (slot, state) in slots.into_iter().zip(resolution) {
            if let (Some(slot), Resolution::Rooted) = (slot, state) {
                let idx = forest.insert_detached(slot.key, slot.data);
                pending.push((idx, slot.parent));
            }
        }

        for (idx, parent) in pending {
            let parent_idx = match parent {
                Some(p) if p == self.root => None,
                Some(p) => forest.find(&p),
                None => None,
            };
            forest.link(idx, parent_idx);
        }

        debug!(nodes = forest.len(), roots = forest.roots().len(), "forest linked");
        forest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Dept {
        id: u32,
        parent: Option<u32>,
        name: &'static str,
    }

    impl FlatNode for Dept {
        type Key = NodeId;

        fn key(&self) -> Option<NodeId> {
            Some(NodeId(self.id))
        }

        fn parent_key(&self) -> Option<NodeId> {
            Some(NodeId(self.parent.unwrap_or(0)))
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct NodeId(u32);

    impl Display for NodeId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "#{}", self.0)
        }
    }

    fn dept(id: u32, parent: Option<u32>, name: &'static str) -> Dept {
        Dept { id, parent, name }
    }

    fn names<T, K>(forest: &Forest<T, K>, f: impl Fn(&T) -> &'static str) -> Vec<&'static str>
    where
        K: Clone + Eq + Hash,
    {
        forest.iter().map(|(_, n)| f(&n.data)).collect()
    }

    #[test]
    fn given_child_before_parent_when_building_then_links_anyway() {
        let forest = ForestBuilder::new(NodeId(0))
            .build(vec![
                dept(2, Some(1), "eng"),
                dept(1, None, "company"),
                dept(3, Some(1), "ops"),
            ])
            .unwrap();

        assert_eq!(forest.roots().len(), 1);
        assert_eq!(names(&forest, |d: &Dept| d.name), vec!["company", "eng", "ops"]);
    }

    #[test]
    fn given_self_parent_when_building_then_dropped_without_hanging() {
        let forest = ForestBuilder::new(NodeId(0))
            .build(vec![dept(1, None, "root"), dept(2, Some(2), "loop")])
            .unwrap();

        assert_eq!(forest.len(), 1);
        assert!(forest.find(&NodeId(2)).is_none());
    }

    #[test]
    fn given_cycle_and_error_policy_when_building_then_cycle_reported() {
        let result = ForestBuilder::new(NodeId(0))
            .orphans(OrphanPolicy::Error)
            .build(vec![dept(1, Some(2), "a"), dept(2, Some(1), "b")]);

        assert!(matches!(result, Err(TreeError::CycleDetected(_))));
    }

    #[test]
    fn given_descendant_of_cycle_when_building_then_dropped() {
        let forest = ForestBuilder::new(NodeId(0))
            .orphans(OrphanPolicy::Root)
            .build(vec![
                dept(1, Some(2), "a"),
                dept(2, Some(1), "b"),
                dept(3, Some(1), "c"),
                dept(4, None, "d"),
            ])
            .unwrap();

        assert_eq!(names(&forest, |d: &Dept| d.name), vec!["d"]);
    }

    #[test]
    fn given_accessors_when_building_then_uses_them() {
        let rows = vec![("a", ""), ("b", "a"), ("c", "b")];
        let forest = ForestBuilder::new(String::new())
            .build_with(
                rows,
                "name",
                |row| Some(row.0.to_string()),
                |row| Some(row.1.to_string()),
            )
            .unwrap();

        assert_eq!(forest.depth(), 3);
        assert_eq!(forest.leaf_keys(), vec![&"c".to_string()]);
    }

    #[test]
    fn given_policy_names_when_parsing_then_case_insensitive() {
        assert_eq!("ROOT".parse::<OrphanPolicy>().unwrap(), OrphanPolicy::Root);
        assert_eq!("error".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::Error);
        assert!("keep".parse::<OrphanPolicy>().is_err());
    }

    #[test]
    fn given_missing_key_when_building_then_record_dropped() {
        let rows: Vec<(Option<u32>, u32)> = vec![(Some(1), 0), (None, 1), (Some(2), 1)];
        let forest = ForestBuilder::new(0u32)
            .build_with(rows, "id", |r| r.0, |r| Some(r.1))
            .unwrap();

        assert_eq!(forest.len(), 2);
        assert_eq!(forest.leaf_keys(), vec![&2]);
    }

    #[test]
    fn given_missing_key_and_error_policy_when_building_then_reports_position() {
        let rows: Vec<(Option<u32>, u32)> = vec![(Some(1), 0), (None, 1)];
        let result = ForestBuilder::new(0u32)
            .orphans(OrphanPolicy::Error)
            .build_with(rows, "id", |r| r.0, |r| Some(r.1));

        assert_eq!(
            result.unwrap_err(),
            TreeError::MissingKey {
                position: 1,
                field: "id".to_string()
            }
        );
    }
}
