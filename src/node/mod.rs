//! The tree contract that queries run against.
//!
//! Anything that implements [`TreeNode`] can be queried with [`crate::select::Query`]. This crate ships one
//! implementation, [`Node`], which is a unist-style JSON tree; [`read_markdown`] builds one from Markdown text.
use serde_json::Value;
use std::borrow::Cow;

mod mdast;
mod tree;

pub use mdast::*;
pub use tree::*;

/// A node in a tree that selectors can match against.
///
/// Nodes are compared by identity (their address), not by value: two equal subtrees at different places in the tree are
/// different nodes.
pub trait TreeNode: Sized {
    /// The node's type tag. This is what a tag selector like `paragraph` compares against.
    fn node_type(&self) -> &str;

    /// The node's ordered children, or `None` for a leaf.
    ///
    /// `Some(&[])` and `None` are different: `:empty` treats a node with an empty child list as empty regardless of
    /// its [value](Self::value), but a leaf is only empty if it has no value.
    fn children(&self) -> Option<&[Self]>;

    /// Looks up an attribute by name, for `[name]`-style selectors.
    fn attribute(&self, name: &str) -> Option<Cow<'_, Value>>;

    /// The node's stable identifier, for `#id` selectors.
    fn identifier(&self) -> Option<&str> {
        None
    }

    /// The node's bare text payload, if any.
    fn value(&self) -> Option<&str> {
        None
    }

    /// Whether the node has the given class, for `.class` selectors.
    ///
    /// The default implementation reads the `class` attribute, which can be either an array of strings or a single
    /// whitespace-separated string.
    fn has_class(&self, name: &str) -> bool {
        match self.attribute("class").as_deref() {
            Some(Value::String(classes)) => classes.split_whitespace().any(|class| class == name),
            Some(Value::Array(classes)) => classes.iter().any(|class| class.as_str() == Some(name)),
            _ => false,
        }
    }
}

/// A [`TreeNode`] that can be copied with a different set of children. The [transforms](crate::transform) need this.
pub trait TreeRebuild: TreeNode + Clone {
    /// Returns a copy of this node (without its children), with `children` as its children.
    fn with_children(&self, children: Vec<Self>) -> Self;
}
