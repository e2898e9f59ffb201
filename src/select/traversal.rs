use crate::node::TreeNode;
use crate::query::NestingOperator;
use crate::select::api::MatchError;
use crate::select::compiled::{CompiledRule, CompiledSelector};
use crate::select::pseudo::Pseudo;
use std::collections::{HashMap, HashSet};
use std::ptr;

/// Where a node sits among its siblings. Indexes are 0-based; "type" counts group siblings by their type,
/// case-insensitively.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub node_index: usize,
    pub node_count: usize,
    pub type_index: usize,
    pub type_count: usize,
}

impl Position {
    /// The position of `siblings[index]`, or `None` if `index` is out of range.
    pub fn among<N: TreeNode>(siblings: &[N], index: usize) -> Option<Self> {
        let key = type_key(siblings.get(index)?);
        let same_type = |sibling: &&N| type_key(*sibling) == key;
        Some(Self {
            node_index: index,
            node_count: siblings.len(),
            type_index: siblings[..index].iter().filter(same_type).count(),
            type_count: siblings.iter().filter(same_type).count(),
        })
    }
}

/// The nodes `:scope` refers to when querying from `root`: a `root`-typed node stands for its children.
pub(crate) fn scope_nodes<N: TreeNode>(root: &N) -> Vec<&N> {
    match root.children() {
        Some(children) if root.node_type() == "root" => children.iter().collect(),
        _ => vec![root],
    }
}

fn type_key<N: TreeNode>(node: &N) -> String {
    node.node_type().to_lowercase()
}

/// Rules that are partway matched and waiting to be tried against other nodes, bucketed by where those nodes are.
struct Pending<'q, N> {
    descendant: Vec<&'q CompiledRule<N>>,
    direct_child: Vec<&'q CompiledRule<N>>,
    adjacent_sibling: Vec<&'q CompiledRule<N>>,
    general_sibling: Vec<&'q CompiledRule<N>>,
}

impl<'q, N> Pending<'q, N> {
    fn new() -> Self {
        Self {
            descendant: Vec::new(),
            direct_child: Vec::new(),
            adjacent_sibling: Vec::new(),
            general_sibling: Vec::new(),
        }
    }

    /// Adds a rule to the bucket its nesting operator reaches.
    fn push(&mut self, rule: &'q CompiledRule<N>) {
        let bucket = match rule.nesting {
            None | Some(NestingOperator::Descendant) => &mut self.descendant,
            Some(NestingOperator::Child) => &mut self.direct_child,
            Some(NestingOperator::Adjacent) => &mut self.adjacent_sibling,
            Some(NestingOperator::General) => &mut self.general_sibling,
        };
        if !bucket.iter().any(|existing| ptr::eq(*existing, rule)) {
            bucket.push(rule);
        }
    }
}

/// State for one run of a selector over a tree.
///
/// A single depth-first pass tests every alternative's head rule at every node, alongside whatever rules earlier
/// nodes left pending for this one.
pub(crate) struct Traversal<'q, 't, N> {
    selector: &'q CompiledSelector<N>,
    scope: Vec<&'t N>,
    results: Vec<&'t N>,
    seen: HashSet<*const N>,
    /// Stop at the first result.
    one: bool,
    found: bool,
    /// Test only the starting node, without descending.
    shallow: bool,
    /// The starting node has no known parent, so positional pseudo-classes can't be evaluated.
    detached: bool,
    /// Inside `:not`/`:matches`, where ids and classes aren't allowed.
    positional_only: bool,
    depth: usize,
    max_depth: usize,
    visited: usize,
}

impl<'q, 't, N: TreeNode> Traversal<'q, 't, N> {
    pub(crate) fn new(selector: &'q CompiledSelector<N>, scope: Vec<&'t N>, max_depth: usize) -> Self {
        Self {
            selector,
            scope,
            results: Vec::new(),
            seen: HashSet::new(),
            one: false,
            found: false,
            shallow: false,
            detached: false,
            positional_only: false,
            depth: 0,
            max_depth,
            visited: 0,
        }
    }

    pub(crate) fn stop_at_first(mut self) -> Self {
        self.one = true;
        self
    }

    pub(crate) fn shallow(mut self) -> Self {
        self.shallow = true;
        self
    }

    pub(crate) fn detached(mut self) -> Self {
        self.detached = true;
        self
    }

    pub(crate) fn found(&self) -> bool {
        self.found
    }

    pub(crate) fn visited(&self) -> usize {
        self.visited
    }

    pub(crate) fn into_results(self) -> Vec<&'t N> {
        self.results
    }

    /// Runs from `start`, which sits at `position` (or is a root, if that's `None`).
    pub(crate) fn run(&mut self, start: &'t N, position: Option<Position>) -> Result<(), MatchError> {
        self.visit(start, &[], position).map(|_| ())
    }

    fn visit(
        &mut self,
        node: &'t N,
        candidates: &[&'q CompiledRule<N>],
        position: Option<Position>,
    ) -> Result<Pending<'q, N>, MatchError> {
        self.visited += 1;
        let selector = self.selector;
        let mut pending = Pending::new();
        for rule in candidates.iter().copied().chain(&selector.alternatives) {
            if self.one && self.found {
                break;
            }
            if self.shallow && rule.next.is_some() {
                return Err(MatchError::UnexpectedNesting);
            }
            if self.test_rule(rule, node, position)? {
                match rule.next.as_deref() {
                    Some(next) => pending.push(next),
                    None => self.record(node),
                }
            }
            // These keep reaching further: a descendant rule to deeper nodes, a general-sibling rule to later siblings.
            match rule.nesting {
                Some(NestingOperator::Descendant) | Some(NestingOperator::General) => pending.push(rule),
                _ => {}
            }
        }
        if !self.shallow && !(self.one && self.found) {
            if let Some(children) = node.children() {
                self.descend(children, &pending)?;
            }
        }
        Ok(pending)
    }

    fn descend(&mut self, children: &'t [N], pending: &Pending<'q, N>) -> Result<(), MatchError> {
        if children.is_empty() {
            return Ok(());
        }
        if self.depth >= self.max_depth {
            return Err(MatchError::DepthExceeded { limit: self.max_depth });
        }
        self.depth += 1;

        let keys: Vec<String> = children.iter().map(type_key).collect();
        let mut type_counts: HashMap<&str, usize> = HashMap::new();
        for key in &keys {
            *type_counts.entry(key).or_default() += 1;
        }
        let mut types_seen: HashMap<&str, usize> = HashMap::with_capacity(type_counts.len());

        let inherited: Vec<_> = pending.descendant.iter().chain(&pending.direct_child).copied().collect();
        let mut from_siblings: Vec<&'q CompiledRule<N>> = Vec::new();
        for (index, (child, key)) in children.iter().zip(&keys).enumerate() {
            let type_index = types_seen.entry(key).or_default();
            let position = Position {
                node_index: index,
                node_count: children.len(),
                type_index: *type_index,
                type_count: type_counts.get(key.as_str()).copied().unwrap_or_default(),
            };
            *type_index += 1;

            let mut candidates = inherited.clone();
            candidates.append(&mut from_siblings);
            let child_pending = self.visit(child, &candidates, Some(position))?;
            from_siblings = child_pending.general_sibling;
            from_siblings.extend(child_pending.adjacent_sibling);

            if self.one && self.found {
                break;
            }
        }

        self.depth -= 1;
        Ok(())
    }

    fn test_rule(
        &mut self,
        rule: &'q CompiledRule<N>,
        node: &'t N,
        position: Option<Position>,
    ) -> Result<bool, MatchError> {
        if self.positional_only {
            if rule.id.is_some() {
                return Err(MatchError::InvalidSelector("id"));
            }
            if !rule.class_names.is_empty() {
                return Err(MatchError::InvalidSelector("class"));
            }
        }
        if rule.tag.as_deref().is_some_and(|tag| tag != node.node_type())
            || rule.id.as_deref().is_some_and(|id| node.identifier() != Some(id))
            || !rule.class_names.iter().all(|class| node.has_class(class))
            || !rule.attrs.iter().all(|attr| attr.matches(node))
        {
            return Ok(false);
        }
        for pseudo in &rule.pseudos {
            if !self.test_pseudo(pseudo, node, position)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn test_pseudo(&mut self, pseudo: &'q Pseudo<N>, node: &'t N, position: Option<Position>) -> Result<bool, MatchError> {
        match pseudo {
            Pseudo::Empty | Pseudo::Blank => Ok(match node.children() {
                Some(children) => children.is_empty(),
                None => node.value().is_none(),
            }),
            Pseudo::Root => Ok(position.is_none()),
            Pseudo::Scope => Ok(self.scope.iter().any(|scoped| ptr::eq(*scoped, node))),
            Pseudo::Matches(inner) => self.matches_nested(inner, node, position),
            Pseudo::Not(inner) => self.matches_nested(inner, node, position).map(|matched| !matched),
            Pseudo::Has(inner) => self.has_nested(inner, node),
            Pseudo::Custom { handler, argument, .. } => Ok(handler(node, argument.as_deref())),
            structural => match (position, structural.test_position(position.unwrap_or_default())) {
                (Some(_), Some(result)) => Ok(result),
                (None, Some(_)) if self.detached => Err(MatchError::Scope {
                    pseudo: structural.name().to_string(),
                }),
                _ => Ok(false),
            },
        }
    }

    /// Whether `node` itself matches one of `inner`'s alternatives, at the same position. Chained alternatives can
    /// only ever match nodes below or beside `node`, so they never match here.
    fn matches_nested(
        &mut self,
        inner: &'q CompiledSelector<N>,
        node: &'t N,
        position: Option<Position>,
    ) -> Result<bool, MatchError> {
        let mut nested = Traversal::new(inner, vec![node], self.max_depth).stop_at_first();
        nested.positional_only = true;
        nested.detached = self.detached;
        nested.depth = self.depth;
        for alternative in &inner.alternatives {
            if alternative.next.is_none() && nested.test_rule(alternative, node, position)? {
                self.visited += nested.visited;
                return Ok(true);
            }
        }
        self.visited += nested.visited;
        Ok(false)
    }

    /// Whether anything below `node` matches `inner`.
    fn has_nested(&mut self, inner: &'q CompiledSelector<N>, node: &'t N) -> Result<bool, MatchError> {
        let Some(children) = node.children() else {
            return Ok(false);
        };
        let mut nested = Traversal::new(inner, vec![node], self.max_depth).stop_at_first();
        nested.depth = self.depth;
        nested.descend(children, &Pending::new())?;
        self.visited += nested.visited;
        Ok(nested.found)
    }

    fn record(&mut self, node: &'t N) {
        self.found = true;
        if self.seen.insert(ptr::from_ref(node)) {
            self.results.push(node);
        }
    }
}
