//! Running selectors against trees.
//!
//! A [`Query`] is a [`Selector`](crate::query::Selector) compiled against [`QueryOptions`]: substitutions are
//! resolved, `nth-*` formulas parsed and pseudo-classes looked up once, up front. Running it walks the tree in a
//! single depth-first pass.
//!
//! ```
//! use treeq::node::Node;
//! use treeq::query::Registry;
//! use treeq::select::{Query, QueryOptions};
//!
//! let tree = Node::parent(
//!     "root",
//!     vec![
//!         Node::parent("paragraph", vec![Node::text("text", "hello")]),
//!         Node::parent("paragraph", vec![Node::text("text", "world")]),
//!     ],
//! );
//! let selector = Registry::default().parse("paragraph:last-child > text").unwrap();
//! let query = Query::new(&selector, &QueryOptions::default()).unwrap();
//! let found = query.find_first(&tree).unwrap().unwrap();
//! assert_eq!(found.value.as_deref(), Some("world"));
//! ```
mod api;
mod attr;
mod compiled;
mod nth;
mod pseudo;
mod traversal;

pub use api::{MatchError, PseudoHandler, Query, QueryOptions, DEFAULT_MAX_DEPTH};
pub use nth::{compile_nth, FormulaError, Nth};
pub use traversal::Position;
