use crate::query::ast::*;
use crate::query::strings::{escape_identifier, escape_str, is_whitespace};
use crate::query::{parser, ParseError, Registry};
use std::fmt::{Display, Formatter};

impl Selector {
    /// Parses selector text, using `registry` to decide which operators and pseudo-classes are allowed.
    pub fn parse(text: &str, registry: &Registry) -> Result<Self, ParseError> {
        parser::parse(text, registry)
    }

    /// Renders this selector as canonical selector text.
    ///
    /// Parsing the rendered text with the same registry gives back an equal selector.
    pub fn render(&self) -> String {
        self.to_string().trim().to_string()
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Chain(rule_set) => write!(f, "{rule_set}"),
            Selector::List(rule_sets) => {
                for (idx, rule_set) in rule_sets.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{rule_set}")?;
                }
                Ok(())
            }
        }
    }
}

impl Display for RuleSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for rule in self.rules() {
            match rule.nesting.and_then(NestingOperator::as_char) {
                Some(op) => write!(f, " {op} ")?,
                None if rule.nesting.is_some() => f.write_str(" ")?,
                None => {}
            }
            write!(f, "{rule}")?;
        }
        Ok(())
    }
}

/// Renders only this rule's own components, not the rest of its chain.
impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.tag {
            None => {}
            Some(TagName::Any) => f.write_str("*")?,
            Some(TagName::Named(name)) => f.write_str(&escape_identifier(name))?,
        }
        if let Some(id) = &self.id {
            write!(f, "#{}", escape_identifier(id))?;
        }
        for class_name in &self.class_names {
            write!(f, ".{}", escape_identifier(class_name))?;
        }
        for attr in &self.attrs {
            write!(f, "{attr}")?;
        }
        for pseudo in &self.pseudos {
            write!(f, "{pseudo}")?;
        }
        Ok(())
    }
}

impl Display for AttrMatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}", escape_identifier(&self.name))?;
        if let Some(AttrComparison { operator, value }) = &self.comparison {
            if let Some(modifier) = operator.modifier() {
                write!(f, "{}", modifier.as_char())?;
            }
            match value {
                AttrValue::String(text) => write!(f, "={}", escape_str(text))?,
                AttrValue::Substitute(name) => write!(f, "=${}", escape_identifier(name))?,
            }
        }
        f.write_str("]")
    }
}

impl Display for PseudoMatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, ":{}", escape_identifier(&self.name))?;
        match &self.value {
            PseudoValue::None => Ok(()),
            PseudoValue::Selector(selector) => write!(f, "({selector})"),
            PseudoValue::Substitute(name) => write!(f, "(${})", escape_identifier(name)),
            PseudoValue::Numeric(text) if is_raw_safe(text) => write!(f, "({text})"),
            PseudoValue::Numeric(text) | PseudoValue::String(text) => write!(f, "({})", escape_identifier(text)),
        }
    }
}

/// Whether a numeric argument reads back unchanged when written without quoting or escapes.
fn is_raw_safe(text: &str) -> bool {
    !text.starts_with(is_whitespace)
        && !text.ends_with(is_whitespace)
        && !text.starts_with(['$', '"', '\''])
        && !text.contains([')', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazy_static::lazy_static;
    use pretty_assertions::assert_eq;

    lazy_static! {
        static ref REGISTRY: Registry = {
            let mut registry = Registry::default();
            registry.enable_substitutes();
            registry
        };
    }

    #[test]
    fn canonical_spacing() {
        check_render("  a>b  +c~d   e ", "a > b + c ~ d e");
    }

    #[test]
    fn component_order() {
        check_render(
            "p:first-child[lang].a#main",
            "p#main.a[lang]:first-child",
        );
    }

    #[test]
    fn list_separator() {
        check_render("a,b ,  c", "a, b, c");
    }

    #[test]
    fn attribute_values_are_quoted() {
        check_render("[a=b][c^='d\"e']", r#"[a="b"][c^="d\"e"]"#);
    }

    #[test]
    fn substitutions_are_not_quoted() {
        check_render("[a=$x]:nth-child($n)", "[a=$x]:nth-child($n)");
    }

    #[test]
    fn numeric_is_raw() {
        check_render(":nth-child( 2n + 1 )", ":nth-child(2n + 1)");
    }

    #[test]
    fn string_pseudo_is_escaped_as_identifier() {
        check_render(":contains('a b')", r":contains(a\20 b)");
    }

    #[test]
    fn nested_selectors() {
        check_render("ul:has(li.active,li>em):not(  p  )", "ul:has(li.active, li > em):not(p)");
    }

    #[test]
    fn escaped_identifiers() {
        check_render(r"a\.b#\31 x", r"a\.b#\31 x");
    }

    #[test]
    fn empty() {
        assert_eq!(Selector::empty().render(), "");
    }

    #[test]
    fn lone_rule_renders_only_itself() {
        let parsed = Selector::parse("a.b > c", &REGISTRY).unwrap();
        let Selector::Chain(rule_set) = parsed else {
            panic!("expected a single chain");
        };
        assert_eq!(rule_set.rule.to_string(), "a.b");
    }

    mod round_trip {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn assorted() {
            for text in [
                "a",
                "*",
                "a b > c + d ~ e",
                "h1, h2 > em",
                "div#main.foo.bar[lang][depth=2]:first-child",
                r#"[title^="intro \"quoted\""][x~=y][y$=z][z*=w]"#,
                "[a=$x]:nth-child($n)",
                ":nth-child(2n+1):nth-last-of-type(-n + 3)",
                "ul:has(li.active, li > em):not(:matches(p, a))",
                ":not()",
                r"a\.b\#c",
                r":contains(a\)b)",
                r":contains(' padded ')",
                "[a='line\nbreak']",
                r":nth-child('\)')",
                ":root:empty:blank:scope",
                "[a=\"a\u{0F}b\u{1}1\"]",
            ] {
                check_round_trip(text);
            }
        }

        fn check_round_trip(text: &str) {
            let parsed = Selector::parse(text, &REGISTRY).unwrap();
            let rendered = parsed.render();
            let reparsed = Selector::parse(&rendered, &REGISTRY)
                .unwrap_or_else(|err| panic!("couldn't reparse {rendered:?}: {}", err.describe(&rendered)));
            assert_eq!(reparsed, parsed, "{text:?} rendered as {rendered:?}");
        }
    }

    fn check_render(text: &str, expect: &str) {
        let parsed = Selector::parse(text, &REGISTRY).unwrap();
        assert_eq!(parsed.render(), expect);
        assert_eq!(REGISTRY.render(&parsed), expect);
    }
}
