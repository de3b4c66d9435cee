//! JSON record layer: flat records to nested trees and back, path lookup.
//!
//! Records are JSON objects. Which fields hold the key, the parent key and
//! the children is configured through [`KeyNames`]; all other fields are
//! carried through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::domain::{
    find_path, DuplicatePolicy, Forest, ForestBuilder, NodeKey, OrphanPolicy, TreeError,
    TreeResult,
};

/// A flat JSON record.
pub type Record = Map<String, Value>;

/// Field names used to read keys and write children.
///
/// Each field falls back to its default independently when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyNames {
    /// Field holding the node's own key (default `id`)
    pub primary_key: String,
    /// Field holding the parent's key (default `pId`)
    pub parent_key: String,
    /// Field receiving nested children (default `children`)
    pub children_key: String,
}

impl Default for KeyNames {
    fn default() -> Self {
        Self {
            primary_key: "id".into(),
            parent_key: "pId".into(),
            children_key: "children".into(),
        }
    }
}

impl KeyNames {
    pub fn key_of(&self, record: &Record) -> Option<NodeKey> {
        record.get(&self.primary_key).and_then(NodeKey::from_value)
    }

    pub fn parent_of(&self, record: &Record) -> Option<NodeKey> {
        record.get(&self.parent_key).and_then(NodeKey::from_value)
    }

    fn value_key(&self, value: &Value) -> Option<NodeKey> {
        value
            .get(&self.primary_key)
            .and_then(NodeKey::from_value)
    }

    fn children<'a>(&self, value: &'a Value) -> &'a [Value] {
        value
            .get(&self.children_key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Everything a flat-to-tree conversion needs besides the data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertOptions {
    pub keys: KeyNames,
    /// Parent key marking top-level records (default `null`)
    pub root: NodeKey,
    pub orphans: OrphanPolicy,
    pub duplicates: DuplicatePolicy,
    /// Deepest nesting [`parse_tree_data`] may produce; `None` is unlimited
    pub max_depth: Option<usize>,
}

impl ConvertOptions {
    pub fn builder(&self) -> ForestBuilder<NodeKey> {
        ForestBuilder::new(self.root.clone())
            .orphans(self.orphans)
            .duplicates(self.duplicates)
    }
}

/// Normalize a value into a list: `null`, `false`, `0` and `""` become empty,
/// arrays are unpacked, anything else becomes a one-element list.
pub fn to_array(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null | Value::Bool(false) => Vec::new(),
        Value::String(ref s) if s.is_empty() => Vec::new(),
        Value::Number(ref n) if n.as_f64() == Some(0.0) => Vec::new(),
        other => vec![other],
    }
}

/// Split input into records; every element must be an object.
pub fn records_from(data: Value) -> TreeResult<Vec<Record>> {
    to_array(data)
        .into_iter()
        .enumerate()
        .map(|(position, item)| match item {
            Value::Object(record) => Ok(record),
            _ => Err(TreeError::InvalidRecord { position }),
        })
        .collect()
}

/// Build a forest of records.
#[instrument(level = "debug", skip(records, options), fields(records = records.len()))]
pub fn build_forest(
    records: Vec<Record>,
    options: &ConvertOptions,
) -> TreeResult<Forest<Record, NodeKey>> {
    let keys = &options.keys;
    options.builder().build_with(
        records,
        &keys.primary_key,
        |r| keys.key_of(r),
        |r| keys.parent_of(r),
    )
}

/// Fail with [`TreeError::TooDeep`] if the forest is deeper than `max_depth`.
pub fn ensure_depth<T>(forest: &Forest<T, NodeKey>, max_depth: Option<usize>) -> TreeResult<()> {
    match max_depth {
        Some(limit) => {
            let depth = forest.depth();
            if depth > limit {
                return Err(TreeError::TooDeep { depth, limit });
            }
            Ok(())
        }
        None => Ok(()),
    }
}

/// Turn a forest back into nested JSON objects.
///
/// Linked children go under `children_key`, appended to an array already
/// stored there. Nodes without linked children get no children field added.
pub fn nest(forest: Forest<Record, NodeKey>, children_key: &str) -> Vec<Value> {
    forest.fold(|_, mut record, children| {
        if !children.is_empty() {
            match record.get_mut(children_key) {
                Some(Value::Array(existing)) => existing.extend(children),
                _ => {
                    record.insert(children_key.to_string(), Value::Array(children));
                }
            }
        }
        Value::Object(record)
    })
}

/// Convert flat, parent-referencing records into nested trees.
///
/// `data` may be an array of records, a single record, or `null`.
/// Roots and siblings keep input order.
///
/// The result nests one `serde_json::Value` level per tree level. Dropping,
/// cloning, comparing or serializing a `Value` recurses per level, so very
/// deep results must be capped with [`ConvertOptions::max_depth`] or released
/// through [`dispose`].
#[instrument(level = "debug", skip(data, options))]
pub fn parse_tree_data(data: Value, options: &ConvertOptions) -> TreeResult<Vec<Value>> {
    let records = records_from(data)?;
    let forest = build_forest(records, options)?;
    debug!(nodes = forest.len(), roots = forest.roots().len(), "built forest");
    ensure_depth(&forest, options.max_depth)?;
    Ok(nest(forest, &options.keys.children_key))
}

/// Drop nested values one level at a time.
pub fn dispose(values: Vec<Value>) {
    let mut pending = values;
    while let Some(value) = pending.pop() {
        match value {
            Value::Array(items) => pending.extend(items),
            Value::Object(fields) => pending.extend(fields.into_iter().map(|(_, v)| v)),
            _ => {}
        }
    }
}

/// Path from a root to the first node (pre-order) whose primary key equals
/// `target`, both inclusive. Empty if no node matches.
pub fn find_tree_node_paths<'a>(
    tree: &'a [Value],
    target: &NodeKey,
    keys: &KeyNames,
) -> Vec<&'a Value> {
    find_path(tree, target, |v| keys.value_key(v), |v| keys.children(v))
}

/// Flatten nested trees into parent-referencing records, in pre-order.
///
/// The children array is removed and the parent field is set to the
/// parent's key, or to `root` for top-level nodes. A children field that is
/// not an array is kept as plain data.
#[instrument(level = "debug", skip(tree, keys))]
pub fn flatten_tree_data(tree: &[Value], root: &NodeKey, keys: &KeyNames) -> TreeResult<Vec<Value>> {
    let mut flat = Vec::new();
    let mut stack: Vec<(&Value, Value)> = tree.iter().rev().map(|n| (n, root.to_value())).collect();

    while let Some((node, parent)) = stack.pop() {
        let position = flat.len();
        let Value::Object(fields) = node else {
            return Err(TreeError::InvalidRecord { position });
        };
        let key = fields
            .get(&keys.primary_key)
            .filter(|v| NodeKey::from_value(v).is_some())
            .cloned()
            .ok_or_else(|| TreeError::MissingKey {
                position,
                field: keys.primary_key.clone(),
            })?;

        let mut record = Record::new();
        for (name, value) in fields {
            if *name == keys.children_key {
                if value.is_array() {
                    continue;
                }
                warn!(position, field = %name, "children field is not an array, kept as data");
            }
            record.insert(name.clone(), value.clone());
        }
        record.insert(keys.parent_key.clone(), parent);
        flat.push(Value::Object(record));

        stack.extend(
            keys.children(node)
                .iter()
                .rev()
                .map(|child| (child, key.clone())),
        );
    }
    Ok(flat)
}
