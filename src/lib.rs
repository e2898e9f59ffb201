//! CSS-like selectors for generic document trees.
//!
//! - [`query`] parses selector text into an AST and renders it back.
//! - [`select`] compiles a selector into a [`Query`](select::Query) and runs it against any [`TreeNode`](node::TreeNode).
//! - [`transform`] rewrites trees: rejecting or filtering nodes, lifting children, extracting text.
//! - [`node`] has the tree contract, plus a concrete unist-style [`Node`](node::Node) and a Markdown reader.
//! - [`run`] ties it all together, the way the `treeq` CLI does.
//!
//! ```
//! use treeq::node::read_markdown;
//! use treeq::query::Registry;
//! use treeq::transform::to_text;
//!
//! let doc = read_markdown("# Intro\n\nSome text.\n\n## Usage\n\nMore text.").unwrap();
//! let headings = treeq::select_all("heading[depth=2]", &doc, &Registry::default()).unwrap();
//! assert_eq!(headings.iter().map(|h| to_text(*h)).collect::<Vec<_>>(), ["Usage"]);
//! ```
use crate::node::TreeNode;
use crate::query::{ParseError, Registry};
use crate::select::{MatchError, Query};

pub mod node;
pub mod query;
pub mod run;
pub mod select;
pub mod transform;

/// Anything that can go wrong going from selector text to results.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Match(#[from] MatchError),
}

/// Parses `selector` and returns every matching node under (and including) `root`, in document order.
pub fn select_all<'t, N: TreeNode>(selector: &str, root: &'t N, registry: &Registry) -> Result<Vec<&'t N>, Error> {
    let query = Query::parse(selector, registry)?;
    Ok(query.find_all(root)?)
}

/// Parses `selector` and returns the first matching node under (and including) `root`.
pub fn select<'t, N: TreeNode>(selector: &str, root: &'t N, registry: &Registry) -> Result<Option<&'t N>, Error> {
    let query = Query::parse(selector, registry)?;
    Ok(query.find_first(root)?)
}

/// Parses `selector` and tests whether `node` itself matches. See [`Query::matches_at`].
pub fn matches<N: TreeNode>(selector: &str, node: &N, parent: Option<&N>, registry: &Registry) -> Result<bool, Error> {
    let query = Query::parse(selector, registry)?;
    Ok(query.matches_at(node, parent)?)
}
