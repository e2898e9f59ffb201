use crate::query::{NestingOperator, Rule, Selector, TagName};
use crate::select::api::{MatchError, QueryOptions};
use crate::select::attr::CompiledAttr;
use crate::select::pseudo::Pseudo;

/// A selector's alternatives, ready to be matched.
pub(crate) struct CompiledSelector<N> {
    pub(crate) alternatives: Vec<CompiledRule<N>>,
}

/// One rule of a chain. Mirrors [`Rule`], with substitutions resolved and pseudo-classes looked up.
pub(crate) struct CompiledRule<N> {
    /// `None` matches any type.
    pub(crate) tag: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) class_names: Vec<String>,
    pub(crate) attrs: Vec<CompiledAttr>,
    pub(crate) pseudos: Vec<Pseudo<N>>,
    pub(crate) nesting: Option<NestingOperator>,
    pub(crate) next: Option<Box<CompiledRule<N>>>,
}

impl<N> CompiledSelector<N> {
    pub(crate) fn compile(selector: &Selector, options: &QueryOptions<N>) -> Result<Self, MatchError> {
        let alternatives = selector
            .alternatives()
            .iter()
            .map(|rule_set| CompiledRule::compile(&rule_set.rule, options))
            .collect::<Result<_, _>>()?;
        Ok(Self { alternatives })
    }
}

impl<N> CompiledRule<N> {
    fn compile(rule: &Rule, options: &QueryOptions<N>) -> Result<Self, MatchError> {
        let tag = match &rule.tag {
            Some(TagName::Named(name)) => Some(name.clone()),
            Some(TagName::Any) | None => None,
        };
        let attrs = rule
            .attrs
            .iter()
            .map(|attr| CompiledAttr::compile(attr, options))
            .collect::<Result<_, _>>()?;
        let pseudos = rule
            .pseudos
            .iter()
            .map(|pseudo| Pseudo::compile(pseudo, options))
            .collect::<Result<_, _>>()?;
        let next = match &rule.next {
            Some(next) => Some(Box::new(Self::compile(next, options)?)),
            None => None,
        };
        Ok(Self {
            tag,
            id: rule.id.clone(),
            class_names: rule.class_names.clone(),
            attrs,
            pseudos,
            nesting: rule.nesting,
            next,
        })
    }
}
