/// The in-memory form of a selector string.
///
/// A single rule chain (`div > p`) parses to [`Selector::Chain`]; a comma-separated list of them
/// (`h1, h2 > em`) parses to [`Selector::List`]. The distinction is kept so that rendering a parsed
/// selector gives back the same shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Selector {
    /// `div > p`
    Chain(RuleSet),
    /// `h1, h2 > em`, or the empty selector.
    List(Vec<RuleSet>),
}

impl Selector {
    /// The selector that matches nothing. This is what an empty (or all-whitespace) string parses to.
    pub fn empty() -> Self {
        Self::List(Vec::new())
    }

    /// All alternatives of this selector, regardless of whether it was written as a list.
    pub fn alternatives(&self) -> &[RuleSet] {
        match self {
            Selector::Chain(rule_set) => std::slice::from_ref(rule_set),
            Selector::List(rule_sets) => rule_sets,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives().is_empty()
    }
}

/// The head of one rule chain.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RuleSet {
    pub rule: Rule,
}

impl RuleSet {
    /// Iterates over the chain's rules, starting with the head.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        std::iter::successors(Some(&self.rule), |rule| rule.next.as_deref())
    }
}

/// One compound selector within a chain, like `p.intro[lang]:first-child`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rule {
    pub tag: Option<TagName>,
    pub id: Option<String>,
    pub class_names: Vec<String>,
    pub attrs: Vec<AttrMatcher>,
    pub pseudos: Vec<PseudoMatcher>,
    /// How this rule relates to the previous one in its chain. Always `None` for the head of a chain, and always
    /// `Some` for every rule reached through [`Rule::next`].
    pub nesting: Option<NestingOperator>,
    pub next: Option<Box<Rule>>,
}

impl Rule {
    /// Whether this rule has no components. The parser never produces such a rule.
    pub fn is_blank(&self) -> bool {
        self.tag.is_none()
            && self.id.is_none()
            && self.class_names.is_empty()
            && self.attrs.is_empty()
            && self.pseudos.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TagName {
    /// `*`
    Any,
    Named(String),
}

/// The relation between two adjacent rules of a chain.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NestingOperator {
    /// `a b`: `b` anywhere under `a`
    Descendant,
    /// `a > b`
    Child,
    /// `a + b`: `b` immediately after `a`
    Adjacent,
    /// `a ~ b`: `b` anywhere after `a`
    General,
}

impl NestingOperator {
    /// The operator's character, or `None` for [`NestingOperator::Descendant`], which is written as whitespace.
    pub fn as_char(self) -> Option<char> {
        match self {
            NestingOperator::Descendant => None,
            NestingOperator::Child => Some('>'),
            NestingOperator::Adjacent => Some('+'),
            NestingOperator::General => Some('~'),
        }
    }

    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '>' => Some(NestingOperator::Child),
            '+' => Some(NestingOperator::Adjacent),
            '~' => Some(NestingOperator::General),
            _ => None,
        }
    }
}

/// `[name]` or `[name<op>value]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttrMatcher {
    pub name: String,
    /// `None` for a plain existence check (`[name]`).
    pub comparison: Option<AttrComparison>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttrComparison {
    pub operator: AttrOperator,
    pub value: AttrValue,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttrOperator {
    /// `=`
    Equals,
    /// `~=`
    Includes,
    /// `^=`
    Prefix,
    /// `$=`
    Suffix,
    /// `*=`
    Substring,
}

impl AttrOperator {
    /// The modifier character that precedes the `=`, if any.
    pub fn modifier(self) -> Option<AttrModifier> {
        match self {
            AttrOperator::Equals => None,
            AttrOperator::Includes => Some(AttrModifier::Tilde),
            AttrOperator::Prefix => Some(AttrModifier::Caret),
            AttrOperator::Suffix => Some(AttrModifier::Dollar),
            AttrOperator::Substring => Some(AttrModifier::Asterisk),
        }
    }

    pub fn from_modifier(modifier: Option<AttrModifier>) -> Self {
        match modifier {
            None => AttrOperator::Equals,
            Some(AttrModifier::Tilde) => AttrOperator::Includes,
            Some(AttrModifier::Caret) => AttrOperator::Prefix,
            Some(AttrModifier::Dollar) => AttrOperator::Suffix,
            Some(AttrModifier::Asterisk) => AttrOperator::Substring,
        }
    }
}

/// A character that can precede the `=` of an attribute comparison.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttrModifier {
    Tilde,
    Caret,
    Dollar,
    Asterisk,
}

impl AttrModifier {
    pub fn as_char(self) -> char {
        match self {
            AttrModifier::Tilde => '~',
            AttrModifier::Caret => '^',
            AttrModifier::Dollar => '$',
            AttrModifier::Asterisk => '*',
        }
    }

    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '~' => Some(AttrModifier::Tilde),
            '^' => Some(AttrModifier::Caret),
            '$' => Some(AttrModifier::Dollar),
            '*' => Some(AttrModifier::Asterisk),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AttrValue {
    String(String),
    /// `$name`, resolved when the selector is compiled into a query.
    Substitute(String),
}

/// `:name` or `:name(argument)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PseudoMatcher {
    pub name: String,
    pub value: PseudoValue,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PseudoValue {
    /// No parenthesized argument.
    None,
    String(String),
    Numeric(String),
    Substitute(String),
    /// The argument of a pseudo-class registered as selector-valued, like `:has(...)`.
    Selector(Box<Selector>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_iterates_whole_chain() {
        let rule_set = RuleSet {
            rule: Rule {
                tag: Some(TagName::Named("a".to_string())),
                next: Some(Box::new(Rule {
                    tag: Some(TagName::Named("b".to_string())),
                    nesting: Some(NestingOperator::Child),
                    ..Rule::default()
                })),
                ..Rule::default()
            },
        };
        let tags: Vec<_> = rule_set.rules().map(|r| r.tag.clone()).collect();
        assert_eq!(
            tags,
            vec![
                Some(TagName::Named("a".to_string())),
                Some(TagName::Named("b".to_string()))
            ]
        );
    }

    #[test]
    fn operator_modifier_round_trip() {
        for op in [
            AttrOperator::Equals,
            AttrOperator::Includes,
            AttrOperator::Prefix,
            AttrOperator::Suffix,
            AttrOperator::Substring,
        ] {
            assert_eq!(AttrOperator::from_modifier(op.modifier()), op);
        }
    }

    #[test]
    fn empty_selector() {
        assert!(Selector::empty().is_empty());
    }
}
