//! Tree rewrites. None of these mutate their input; they build a new tree.
use crate::node::{TreeNode, TreeRebuild};
use crate::select::{MatchError, Query};
use std::collections::HashSet;
use std::ptr;

/// Removes every node for which `predicate` returns true, along with its subtree.
///
/// With `cascade`, a parent whose children were all removed is removed too; this propagates upward. Leaves are never
/// removed for being empty, and neither is a parent whose child list was empty to begin with. Returns `None` if the
/// root itself is removed.
///
/// ```
/// use treeq::node::Node;
/// use treeq::transform::reject;
///
/// let tree = Node::parent("root", vec![Node::parent("p", vec![Node::text("text", "hi")])]);
/// assert_eq!(reject(&tree, |n| n.node_type == "text", true), None);
/// assert_eq!(reject(&tree, |n| n.node_type == "text", false).unwrap().children.unwrap().len(), 1);
/// ```
pub fn reject<N, F>(root: &N, mut predicate: F, cascade: bool) -> Option<N>
where
    N: TreeRebuild,
    F: FnMut(&N) -> bool,
{
    let result = rebuild(root, &mut |node: &N| !predicate(node), cascade);
    log::debug!("reject (cascade={cascade}) removed the root: {}", result.is_none());
    result
}

/// Keeps only the nodes for which `predicate` returns true. A node that fails is removed with its whole subtree, even
/// if some of its descendants would pass. `cascade` works as in [`reject`].
pub fn filter<N, F>(root: &N, mut predicate: F, cascade: bool) -> Option<N>
where
    N: TreeRebuild,
    F: FnMut(&N) -> bool,
{
    let result = rebuild(root, &mut predicate, cascade);
    log::debug!("filter (cascade={cascade}) removed the root: {}", result.is_none());
    result
}

/// [`reject`]s every node that `query` finds under `root`.
///
/// Matches are computed against the original tree before anything is removed, so chained selectors like `list > item`
/// work as expected.
pub fn reject_selected<N: TreeRebuild>(root: &N, query: &Query<N>, cascade: bool) -> Result<Option<N>, MatchError> {
    let matched: HashSet<*const N> = query.find_all(root)?.into_iter().map(ptr::from_ref).collect();
    log::debug!("rejecting {} node(s) matching `{query}`", matched.len());
    Ok(reject(root, |node| matched.contains(&ptr::from_ref(node)), cascade))
}

/// [`filter`]s `root` down to the nodes that `query` finds. Matches are computed as in [`reject_selected`].
pub fn filter_selected<N: TreeRebuild>(root: &N, query: &Query<N>, cascade: bool) -> Result<Option<N>, MatchError> {
    let matched: HashSet<*const N> = query.find_all(root)?.into_iter().map(ptr::from_ref).collect();
    log::debug!("keeping {} node(s) matching `{query}`", matched.len());
    Ok(filter(root, |node| matched.contains(&ptr::from_ref(node)), cascade))
}

/// Replaces every descendant of type `node_type` with its children. The root itself is never replaced.
pub fn lift_children<N: TreeRebuild>(root: &N, node_type: &str) -> N {
    let Some(children) = root.children() else {
        return root.clone();
    };
    let mut lifted = Vec::with_capacity(children.len());
    for child in children {
        let child = lift_children(child, node_type);
        if child.node_type() == node_type {
            if let Some(grandchildren) = child.children() {
                lifted.extend(grandchildren.iter().cloned());
                continue;
            }
        }
        lifted.push(child);
    }
    root.with_children(lifted)
}

/// The text of a subtree: a node's [value](TreeNode::value) if it has one, otherwise its children's text, concatenated.
pub fn to_text<N: TreeNode>(node: &N) -> String {
    let mut text = String::new();
    push_text(node, &mut text);
    text
}

fn push_text<N: TreeNode>(node: &N, out: &mut String) {
    if let Some(value) = node.value() {
        out.push_str(value);
    } else if let Some(children) = node.children() {
        for child in children {
            push_text(child, out);
        }
    }
}

fn rebuild<N, F>(node: &N, keep: &mut F, cascade: bool) -> Option<N>
where
    N: TreeRebuild,
    F: FnMut(&N) -> bool,
{
    if !keep(node) {
        return None;
    }
    let Some(children) = node.children() else {
        return Some(node.clone());
    };
    let kept: Vec<N> = children
        .iter()
        .filter_map(|child| rebuild(child, keep, cascade))
        .collect();
    if cascade && !children.is_empty() && kept.is_empty() {
        return None;
    }
    Some(node.with_children(kept))
}
