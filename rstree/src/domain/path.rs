//! Depth-first node path lookup over nested sequences

/// Find the path from a root to the first node (in pre-order) whose key is
/// `target`. The path includes both ends; it is empty if nothing matches.
///
/// `key_of` returns `None` for nodes without a key; those are traversed but
/// never match. `children_of` returns the ordered children of a node.
pub fn find_path<'a, T, K, FK, FC>(
    nodes: &'a [T],
    target: &K,
    key_of: FK,
    children_of: FC,
) -> Vec<&'a T>
where
    K: PartialEq,
    FK: Fn(&T) -> Option<K>,
    FC: Fn(&'a T) -> &'a [T],
{
    // one sibling iterator per level; `path` holds the node each level descended from
    let mut levels = vec![nodes.iter()];
    let mut path: Vec<&'a T> = Vec::new();

    loop {
        let next = match levels.last_mut() {
            Some(level) => level.next(),
            None => return Vec::new(),
        };
        match next {
            Some(node) => {
                path.push(node);
                if key_of(node).as_ref() == Some(target) {
                    return path;
                }
                levels.push(children_of(node).iter());
            }
            None => {
                levels.pop();
                path.pop();
            }
        }
    }
}
