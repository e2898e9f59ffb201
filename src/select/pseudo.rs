use crate::query::{PseudoMatcher, PseudoValue};
use crate::select::api::{MatchError, PseudoHandler, QueryOptions};
use crate::select::compiled::CompiledSelector;
use crate::select::nth::Nth;
use crate::select::traversal::Position;

/// A pseudo-class, resolved at compile time.
pub(crate) enum Pseudo<N> {
    FirstChild,
    LastChild,
    FirstOfType,
    LastOfType,
    OnlyChild,
    OnlyOfType,
    NthChild(Nth),
    NthLastChild(Nth),
    NthOfType(Nth),
    NthLastOfType(Nth),
    Empty,
    Blank,
    Root,
    Scope,
    /// `:matches` and its alias `:any`
    Matches(CompiledSelector<N>),
    Not(CompiledSelector<N>),
    Has(CompiledSelector<N>),
    Custom {
        name: String,
        argument: Option<String>,
        handler: PseudoHandler<N>,
    },
}

impl<N> Pseudo<N> {
    pub(crate) fn compile(matcher: &PseudoMatcher, options: &QueryOptions<N>) -> Result<Self, MatchError> {
        let name = matcher.name.as_str();
        let bare = |pseudo: Self| match matcher.value {
            PseudoValue::None => Ok(pseudo),
            _ => Err(argument_error(name, "no argument")),
        };
        match name {
            "first-child" => bare(Pseudo::FirstChild),
            "last-child" => bare(Pseudo::LastChild),
            "first-of-type" => bare(Pseudo::FirstOfType),
            "last-of-type" => bare(Pseudo::LastOfType),
            "only-child" => bare(Pseudo::OnlyChild),
            "only-of-type" => bare(Pseudo::OnlyOfType),
            "empty" => bare(Pseudo::Empty),
            "blank" => bare(Pseudo::Blank),
            "root" => bare(Pseudo::Root),
            "scope" => bare(Pseudo::Scope),
            "nth-child" => Ok(Pseudo::NthChild(formula(matcher, options)?)),
            "nth-last-child" => Ok(Pseudo::NthLastChild(formula(matcher, options)?)),
            "nth-of-type" => Ok(Pseudo::NthOfType(formula(matcher, options)?)),
            "nth-last-of-type" => Ok(Pseudo::NthLastOfType(formula(matcher, options)?)),
            "any" | "matches" => Ok(Pseudo::Matches(nested(matcher, options)?)),
            "not" => Ok(Pseudo::Not(nested(matcher, options)?)),
            "has" => Ok(Pseudo::Has(nested(matcher, options)?)),
            _ => {
                let Some(handler) = options.pseudo_handler(name) else {
                    return Err(MatchError::UnknownPseudo(name.to_string()));
                };
                let argument = match &matcher.value {
                    PseudoValue::None => None,
                    PseudoValue::String(text) | PseudoValue::Numeric(text) => Some(text.clone()),
                    PseudoValue::Substitute(var) => Some(options.substitution(var)?.to_string()),
                    PseudoValue::Selector(selector) => Some(selector.render()),
                };
                Ok(Pseudo::Custom {
                    name: name.to_string(),
                    argument,
                    handler: handler.clone(),
                })
            }
        }
    }

    pub(crate) fn name(&self) -> &str {
        match self {
            Pseudo::FirstChild => "first-child",
            Pseudo::LastChild => "last-child",
            Pseudo::FirstOfType => "first-of-type",
            Pseudo::LastOfType => "last-of-type",
            Pseudo::OnlyChild => "only-child",
            Pseudo::OnlyOfType => "only-of-type",
            Pseudo::NthChild(_) => "nth-child",
            Pseudo::NthLastChild(_) => "nth-last-child",
            Pseudo::NthOfType(_) => "nth-of-type",
            Pseudo::NthLastOfType(_) => "nth-last-of-type",
            Pseudo::Empty => "empty",
            Pseudo::Blank => "blank",
            Pseudo::Root => "root",
            Pseudo::Scope => "scope",
            Pseudo::Matches(_) => "matches",
            Pseudo::Not(_) => "not",
            Pseudo::Has(_) => "has",
            Pseudo::Custom { name, .. } => name,
        }
    }

    /// For pseudo-classes that depend only on a node's position among its siblings, whether that position matches.
    /// `None` for every other pseudo-class.
    pub(crate) fn test_position(&self, position: Position) -> Option<bool> {
        let Position {
            node_index,
            node_count,
            type_index,
            type_count,
        } = position;
        let from_end = |index: usize, count: usize| count.saturating_sub(index + 1);
        let result = match self {
            Pseudo::FirstChild => node_index == 0,
            Pseudo::LastChild => from_end(node_index, node_count) == 0,
            Pseudo::FirstOfType => type_index == 0,
            Pseudo::LastOfType => from_end(type_index, type_count) == 0,
            Pseudo::OnlyChild => node_count == 1,
            Pseudo::OnlyOfType => type_count == 1,
            Pseudo::NthChild(nth) => nth.matches(node_index),
            Pseudo::NthLastChild(nth) => nth.matches(from_end(node_index, node_count)),
            Pseudo::NthOfType(nth) => nth.matches(type_index),
            Pseudo::NthLastOfType(nth) => nth.matches(from_end(type_index, type_count)),
            _ => return None,
        };
        Some(result)
    }
}

fn formula<N>(matcher: &PseudoMatcher, options: &QueryOptions<N>) -> Result<Nth, MatchError> {
    let text = match &matcher.value {
        PseudoValue::String(text) | PseudoValue::Numeric(text) => text.as_str(),
        PseudoValue::Substitute(var) => options.substitution(var)?,
        PseudoValue::None | PseudoValue::Selector(_) => return Err(argument_error(&matcher.name, "a formula")),
    };
    Ok(Nth::parse(text)?)
}

fn nested<N>(matcher: &PseudoMatcher, options: &QueryOptions<N>) -> Result<CompiledSelector<N>, MatchError> {
    match &matcher.value {
        PseudoValue::Selector(selector) => CompiledSelector::compile(selector, options),
        _ => Err(argument_error(&matcher.name, "a selector")),
    }
}

fn argument_error(name: &str, expected: &'static str) -> MatchError {
    MatchError::PseudoArgument {
        name: name.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::query::{Registry, Selector};

    #[test]
    fn positions() {
        let second_of_three = Position {
            node_index: 1,
            node_count: 3,
            type_index: 0,
            type_count: 1,
        };
        for (text, expect) in [
            (":first-child", false),
            (":last-child", false),
            (":first-of-type", true),
            (":last-of-type", true),
            (":only-child", false),
            (":only-of-type", true),
            (":nth-child(2)", true),
            (":nth-last-child(2)", true),
            (":nth-of-type(2)", false),
            (":nth-last-of-type(1)", true),
        ] {
            assert_eq!(compile(text).test_position(second_of_three), Some(expect), "{text}");
        }
    }

    #[test]
    fn non_positional() {
        for text in [":empty", ":root", ":scope", ":not(a)", ":has(a)"] {
            assert_eq!(compile(text).test_position(Position::default()), None, "{text}");
        }
    }

    #[test]
    fn any_is_matches() {
        assert_eq!(compile(":any(a)").name(), "matches");
    }

    #[test]
    fn unexpected_argument() {
        let err = try_compile(":first-child(2)").err().unwrap();
        assert_eq!(err, argument_error("first-child", "no argument"));
    }

    #[test]
    fn custom_argument_forms() {
        let options = QueryOptions::<Node>::default()
            .with_pseudo("lang", |_, _| true)
            .with_pseudo("within", |_, _| true)
            .with_substitution("x", "rust");
        let mut registry = Registry::default();
        registry.enable_substitutes().register_selector_pseudos(["within"]);

        for (text, expect) in [(":lang", None), (":lang($x)", Some("rust")), (":within(a   >b)", Some("a > b"))] {
            let selector = Selector::parse(text, &registry).unwrap();
            let matcher = &selector.alternatives()[0].rule.pseudos[0];
            let compiled = Pseudo::compile(matcher, &options).unwrap();
            let Pseudo::Custom { argument, .. } = compiled else {
                panic!("expected custom pseudo for {text}");
            };
            assert_eq!(argument.as_deref(), expect, "{text}");
        }
    }

    fn try_compile(text: &str) -> Result<Pseudo<Node>, MatchError> {
        let selector = Selector::parse(text, &Registry::default()).unwrap();
        Pseudo::compile(&selector.alternatives()[0].rule.pseudos[0], &QueryOptions::default())
    }

    fn compile(text: &str) -> Pseudo<Node> {
        match try_compile(text) {
            Ok(pseudo) => pseudo,
            Err(err) => panic!("couldn't compile {text}: {err}"),
        }
    }
}
