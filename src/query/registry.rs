use crate::query::ast::{AttrModifier, NestingOperator, Selector};
use crate::query::{parser, ParseError};
use paste::paste;
use std::collections::{BTreeMap, BTreeSet};

/// What kind of argument a pseudo-class takes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PseudoKind {
    /// A nested selector list, like `:has(li.active)`.
    Selector,
    /// A formula like `2n+1`.
    Numeric,
    /// Anything else. This is the default for pseudo-class names that aren't registered.
    String,
}

/// Configures which syntax the selector parser accepts.
///
/// There is no process-wide instance: build one (usually via [`Registry::default`]) and pass it to
/// [`Selector::parse`] or [`crate::select::Query::parse`]. A `Registry` can be shared across threads once it's set up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registry {
    pseudos: BTreeMap<String, PseudoKind>,
    nesting_operators: BTreeSet<NestingOperator>,
    attr_modifiers: BTreeSet<AttrModifier>,
    substitutes_enabled: bool,
}

macro_rules! pseudo_registrations {
    { $($kind:ident),+ } => {
        paste! {
            impl Registry {
                $(
                #[doc = "Registers pseudo-class names whose argument is parsed as [`PseudoKind::" $kind "`]."]
                pub fn [<register_ $kind:lower _pseudos>]<S: Into<String>>(
                    &mut self,
                    names: impl IntoIterator<Item = S>,
                ) -> &mut Self {
                    for name in names {
                        self.pseudos.insert(name.into(), PseudoKind::$kind);
                    }
                    self
                }

                #[doc = "Unregisters [`PseudoKind::" $kind "`] pseudo-class names; they go back to being string-valued."]
                pub fn [<unregister_ $kind:lower _pseudos>]<S: AsRef<str>>(
                    &mut self,
                    names: impl IntoIterator<Item = S>,
                ) -> &mut Self {
                    for name in names {
                        if self.pseudos.get(name.as_ref()) == Some(&PseudoKind::$kind) {
                            self.pseudos.remove(name.as_ref());
                        }
                    }
                    self
                }
                )+
            }
        }
    };
}

macro_rules! set_registrations {
    { $($field:ident : $item:ty),+ } => {
        paste! {
            impl Registry {
                $(
                pub fn [<register_ $field>](&mut self, items: impl IntoIterator<Item = $item>) -> &mut Self {
                    self.$field.extend(items);
                    self
                }

                pub fn [<unregister_ $field>](&mut self, items: impl IntoIterator<Item = $item>) -> &mut Self {
                    for item in items {
                        self.$field.remove(&item);
                    }
                    self
                }

                pub fn $field(&self) -> &BTreeSet<$item> {
                    &self.$field
                }
                )+
            }
        }
    };
}

pseudo_registrations! { Selector, Numeric }

set_registrations! {
    nesting_operators: NestingOperator,
    attr_modifiers: AttrModifier
}

impl Registry {
    /// A registry with nothing registered: no nesting operators besides whitespace, only `=` attribute comparisons,
    /// every pseudo-class argument parsed as a string, and no substitutions.
    pub fn empty() -> Self {
        Self {
            pseudos: BTreeMap::new(),
            nesting_operators: BTreeSet::new(),
            attr_modifiers: BTreeSet::new(),
            substitutes_enabled: false,
        }
    }

    pub fn enable_substitutes(&mut self) -> &mut Self {
        self.substitutes_enabled = true;
        self
    }

    pub fn disable_substitutes(&mut self) -> &mut Self {
        self.substitutes_enabled = false;
        self
    }

    pub fn substitutes_enabled(&self) -> bool {
        self.substitutes_enabled
    }

    pub fn pseudo_kind(&self, name: &str) -> PseudoKind {
        self.pseudos.get(name).copied().unwrap_or(PseudoKind::String)
    }

    pub fn allows_nesting_operator(&self, op: NestingOperator) -> bool {
        op == NestingOperator::Descendant || self.nesting_operators.contains(&op)
    }

    pub fn allows_attr_modifier(&self, modifier: AttrModifier) -> bool {
        self.attr_modifiers.contains(&modifier)
    }

    /// Parses `text` using this registry's configuration.
    pub fn parse(&self, text: &str) -> Result<Selector, ParseError> {
        parser::parse(text, self)
    }

    /// Renders `selector` as canonical selector text. Equivalent to [`Selector::render`].
    pub fn render(&self, selector: &Selector) -> String {
        selector.render()
    }
}

impl Default for Registry {
    /// The configuration for querying document trees: `~ ^ $ *` attribute modifiers, `> + ~` nesting operators,
    /// `:any`, `:matches`, `:not` and `:has` as selector-valued pseudo-classes, and the `nth-*` family as numeric.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register_attr_modifiers([
                AttrModifier::Tilde,
                AttrModifier::Caret,
                AttrModifier::Dollar,
                AttrModifier::Asterisk,
            ])
            .register_selector_pseudos(["any", "matches", "not", "has"])
            .register_numeric_pseudos(["nth-child", "nth-last-child", "nth-of-type", "nth-last-of-type"])
            .register_nesting_operators([NestingOperator::Child, NestingOperator::Adjacent, NestingOperator::General]);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registrations() {
        let registry = Registry::default();
        assert_eq!(registry.pseudo_kind("has"), PseudoKind::Selector);
        assert_eq!(registry.pseudo_kind("nth-child"), PseudoKind::Numeric);
        assert_eq!(registry.pseudo_kind("first-child"), PseudoKind::String);
        assert!(registry.allows_nesting_operator(NestingOperator::Child));
        assert!(registry.allows_attr_modifier(AttrModifier::Caret));
        assert!(!registry.substitutes_enabled());
    }

    #[test]
    fn empty_allows_only_descendant() {
        let registry = Registry::empty();
        assert!(registry.allows_nesting_operator(NestingOperator::Descendant));
        assert!(!registry.allows_nesting_operator(NestingOperator::Child));
        assert!(registry.attr_modifiers().is_empty());
    }

    #[test]
    fn unregister_pseudos_only_of_matching_kind() {
        let mut registry = Registry::default();
        registry.unregister_numeric_pseudos(["has", "nth-child"]);
        assert_eq!(registry.pseudo_kind("has"), PseudoKind::Selector);
        assert_eq!(registry.pseudo_kind("nth-child"), PseudoKind::String);
    }

    #[test]
    fn register_and_unregister_operators() {
        let mut registry = Registry::empty();
        registry
            .register_nesting_operators([NestingOperator::Child])
            .enable_substitutes();
        assert!(registry.allows_nesting_operator(NestingOperator::Child));
        assert!(registry.substitutes_enabled());

        registry
            .unregister_nesting_operators([NestingOperator::Child])
            .disable_substitutes();
        assert!(!registry.allows_nesting_operator(NestingOperator::Child));
        assert!(!registry.substitutes_enabled());
    }
}
