use crate::node::TreeNode;
use crate::query::{Registry, Selector};
use crate::select::compiled::CompiledSelector;
use crate::select::nth::FormulaError;
use crate::select::traversal::{scope_nodes, Position, Traversal};
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::ptr;
use std::sync::Arc;

/// The default limit on how deep a traversal will go before failing with [`MatchError::DepthExceeded`].
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// A caller-supplied pseudo-class. It gets the node being tested and the pseudo-class's argument, if it has one.
pub type PseudoHandler<N> = Arc<dyn Fn(&N, Option<&str>) -> bool + Send + Sync>;

/// Errors from compiling or running a [`Query`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum MatchError {
    /// An id or class selector was used inside `:not`, `:matches` or `:any`, which only test a node's own type,
    /// attributes and position.
    #[error("{0} selectors can only be nested inside `:has`")]
    InvalidSelector(&'static str),

    /// A structural pseudo-class was used on a node with no sibling context.
    #[error("cannot use `:{pseudo}` without parent")]
    Scope { pseudo: String },

    /// A chained selector was used where only a single node is being tested.
    #[error("expected selector without nesting")]
    UnexpectedNesting,

    #[error("unknown pseudo-selector `{0}`")]
    UnknownPseudo(String),

    #[error("`:{name}` expects {expected}")]
    PseudoArgument { name: String, expected: &'static str },

    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error("no value bound for substitution `${0}`")]
    UnboundSubstitution(String),

    /// [`Query::matches_at`] was given a parent that doesn't contain the node.
    #[error("node is not a child of the given parent")]
    NotAChild,

    #[error("tree is deeper than the limit of {limit} levels")]
    DepthExceeded { limit: usize },
}

/// Options for compiling a [`Query`].
pub struct QueryOptions<N> {
    max_depth: usize,
    substitutions: HashMap<String, String>,
    pseudos: HashMap<String, PseudoHandler<N>>,
}

impl<N> QueryOptions<N> {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Binds a `$name` substitution (the name is given without the `$`).
    pub fn with_substitution(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.substitutions.insert(name.into(), value.into());
        self
    }

    /// Adds a pseudo-class. Built-in pseudo-classes can't be overridden.
    pub fn with_pseudo<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&N, Option<&str>) -> bool + Send + Sync + 'static,
    {
        self.pseudos.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub(crate) fn substitution(&self, name: &str) -> Result<&str, MatchError> {
        self.substitutions
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| MatchError::UnboundSubstitution(name.to_string()))
    }

    pub(crate) fn pseudo_handler(&self, name: &str) -> Option<&PseudoHandler<N>> {
        self.pseudos.get(name)
    }
}

impl<N> Default for QueryOptions<N> {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            substitutions: HashMap::new(),
            pseudos: HashMap::new(),
        }
    }
}

impl<N> Clone for QueryOptions<N> {
    fn clone(&self) -> Self {
        Self {
            max_depth: self.max_depth,
            substitutions: self.substitutions.clone(),
            pseudos: self.pseudos.clone(),
        }
    }
}

impl<N> Debug for QueryOptions<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut pseudo_names: Vec<_> = self.pseudos.keys().collect();
        pseudo_names.sort();
        f.debug_struct("QueryOptions")
            .field("max_depth", &self.max_depth)
            .field("substitutions", &self.substitutions)
            .field("pseudos", &pseudo_names)
            .finish()
    }
}

/// A selector compiled for running against trees of `N`.
///
/// ```
/// use treeq::node::Node;
/// use treeq::query::Registry;
/// use treeq::select::Query;
///
/// let tree = Node::parent("list", vec![Node::text("item", "a"), Node::text("item", "b")]);
/// let query: Query<Node> = Query::parse("item:last-child", &Registry::default()).unwrap();
/// let found = query.find_all(&tree).unwrap();
/// assert_eq!(found, [&tree.children.as_ref().unwrap()[1]]);
/// ```
pub struct Query<N> {
    source: Selector,
    compiled: CompiledSelector<N>,
    max_depth: usize,
}

impl<N: TreeNode> Query<N> {
    /// Compiles a selector. This resolves substitutions, parses `nth-*` formulas and looks up pseudo-classes, so that
    /// none of that happens per node.
    pub fn new(selector: &Selector, options: &QueryOptions<N>) -> Result<Self, MatchError> {
        let compiled = CompiledSelector::compile(selector, options)?;
        log::debug!("compiled query `{selector}` with max depth {}", options.max_depth);
        Ok(Self {
            source: selector.clone(),
            compiled,
            max_depth: options.max_depth,
        })
    }

    /// Parses and compiles a selector with default [`QueryOptions`].
    pub fn parse(text: &str, registry: &Registry) -> Result<Self, crate::Error> {
        let selector = Selector::parse(text, registry)?;
        Ok(Self::new(&selector, &QueryOptions::default())?)
    }

    pub fn selector(&self) -> &Selector {
        &self.source
    }

    /// Every node under (and including) `root` that matches, in document order, each at most once.
    pub fn find_all<'t>(&self, root: &'t N) -> Result<Vec<&'t N>, MatchError> {
        self.collect(root, false).map(|(found, _)| found)
    }

    /// The first node in document order that matches. The traversal stops as soon as it's found.
    pub fn find_first<'t>(&self, root: &'t N) -> Result<Option<&'t N>, MatchError> {
        self.collect(root, true).map(|(found, _)| found.into_iter().next())
    }

    /// Whether `node` itself matches, without looking at its descendants.
    ///
    /// Structural pseudo-classes like `:first-child` need `parent` to compute the node's position; without it, they
    /// fail with [`MatchError::Scope`]. Chained selectors (`a > b`) fail with [`MatchError::UnexpectedNesting`].
    pub fn matches_at(&self, node: &N, parent: Option<&N>) -> Result<bool, MatchError> {
        let position = match parent {
            None => None,
            Some(parent) => {
                let siblings = parent.children().unwrap_or_default();
                let index = siblings
                    .iter()
                    .position(|sibling| ptr::eq(sibling, node))
                    .ok_or(MatchError::NotAChild)?;
                Position::among(siblings, index)
            }
        };
        let mut traversal = Traversal::new(&self.compiled, scope_nodes(node), self.max_depth)
            .stop_at_first()
            .shallow();
        if parent.is_none() {
            traversal = traversal.detached();
        }
        traversal.run(node, position)?;
        Ok(traversal.found())
    }

    fn collect<'t>(&self, root: &'t N, first_only: bool) -> Result<(Vec<&'t N>, usize), MatchError> {
        let mut traversal = Traversal::new(&self.compiled, scope_nodes(root), self.max_depth);
        if first_only {
            traversal = traversal.stop_at_first();
        }
        traversal.run(root, None)?;
        let visited = traversal.visited();
        log::trace!("query `{}` visited {visited} node(s)", self.source);
        Ok((traversal.into_results(), visited))
    }
}

impl<N> Debug for Query<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("selector", &self.source.render())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl<N> Display for Query<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source.render())
    }
}
