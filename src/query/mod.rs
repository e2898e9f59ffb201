//! Selector syntax: parsing, the AST, and rendering back to text.
//!
//! ```
//! use treeq::query::{Registry, Selector};
//!
//! let registry = Registry::default();
//! let selector = Selector::parse("ul:has(li.active) >  p", &registry).unwrap();
//! assert_eq!(selector.render(), "ul:has(li.active) > p");
//! ```
mod ast;
mod error;
mod parser;
mod registry;
mod render;
mod strings;

pub use ast::*;
pub use error::*;
pub use registry::*;
