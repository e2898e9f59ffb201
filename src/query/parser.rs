use crate::query::ast::*;
use crate::query::error::{ParseError, ParseErrorKind};
use crate::query::registry::{PseudoKind, Registry};
use crate::query::strings::{is_ident_start, Cursor};

/// Parses a full selector string. The whole input must be consumed.
pub(crate) fn parse(text: &str, registry: &Registry) -> Result<Selector, ParseError> {
    let mut parser = Parser {
        cursor: Cursor::new(text),
        registry,
    };
    let selector = parser.selector_list()?;
    if let Some(ch) = parser.cursor.peek() {
        return Err(parser.cursor.error_here(ParseErrorKind::TrailingInput(ch)));
    }
    let selector = selector.unwrap_or_else(Selector::empty);
    log::debug!("parsed selector {text:?} into {} alternative(s)", selector.alternatives().len());
    Ok(selector)
}

struct Parser<'a> {
    cursor: Cursor<'a>,
    registry: &'a Registry,
}

impl Parser<'_> {
    /// `chain ( "," chain )*`, or `None` if there isn't even one chain.
    fn selector_list(&mut self) -> Result<Option<Selector>, ParseError> {
        let Some(first) = self.rule_set()? else {
            return Ok(None);
        };
        let mut result = Selector::Chain(first);
        while self.cursor.peek_is(',') {
            self.cursor.advance();
            self.cursor.skip_whitespace();
            let Some(next) = self.rule_set()? else {
                return Err(self.cursor.error_here(ParseErrorKind::RuleExpected(',')));
            };
            result = match result {
                Selector::Chain(only) => Selector::List(vec![only, next]),
                Selector::List(mut all) => {
                    all.push(next);
                    Selector::List(all)
                }
            };
        }
        Ok(Some(result))
    }

    fn rule_set(&mut self) -> Result<Option<RuleSet>, ParseError> {
        self.cursor.skip_whitespace();
        let Some(head) = self.rule()? else {
            return Ok(None);
        };
        let mut links: Vec<Rule> = Vec::new();
        loop {
            let had_space = self.cursor.skip_whitespace();
            let Some(ch) = self.cursor.peek() else {
                break;
            };
            if ch == ',' || ch == ')' {
                break;
            }
            let nesting = match NestingOperator::from_char(ch) {
                Some(op) if self.registry.allows_nesting_operator(op) => {
                    self.cursor.advance();
                    self.cursor.skip_whitespace();
                    op
                }
                Some(_) => return Err(self.cursor.error_here(ParseErrorKind::UnknownOperator(ch))),
                None => NestingOperator::Descendant,
            };
            let rule_start = self.cursor.pos();
            let Some(mut rule) = self.rule()? else {
                if nesting == NestingOperator::Descendant {
                    // Not the start of a rule; let the caller decide whether that's an error.
                    break;
                }
                return Err(self.cursor.error_here(ParseErrorKind::RuleExpected(ch)));
            };
            if nesting == NestingOperator::Descendant && !had_space {
                return Err(self.cursor.error_at(
                    rule_start,
                    ParseErrorKind::UnexpectedChar {
                        expected: "whitespace or nesting operator",
                        found: ch,
                    },
                ));
            }
            rule.nesting = Some(nesting);
            links.push(rule);
        }

        let mut chain: Option<Box<Rule>> = None;
        for mut rule in links.into_iter().rev() {
            rule.next = chain;
            chain = Some(Box::new(rule));
        }
        let mut head = head;
        head.next = chain;
        Ok(Some(RuleSet { rule: head }))
    }

    /// One compound selector: an optional tag followed by any number of id, class, attribute and pseudo-class parts.
    fn rule(&mut self) -> Result<Option<Rule>, ParseError> {
        let mut rule = Rule::default();
        let mut any = false;
        while let Some(ch) = self.cursor.peek() {
            match ch {
                '*' if !any => {
                    self.cursor.advance();
                    rule.tag = Some(TagName::Any);
                }
                ch if !any && (is_ident_start(ch) || ch == '\\') => {
                    rule.tag = Some(TagName::Named(self.cursor.identifier()?));
                }
                '.' => {
                    self.cursor.advance();
                    let class_name = self.required_identifier('.')?;
                    rule.class_names.push(class_name);
                }
                '#' => {
                    self.cursor.advance();
                    rule.id = Some(self.required_identifier('#')?);
                }
                '[' => {
                    self.cursor.advance();
                    let attr = self.attribute()?;
                    rule.attrs.push(attr);
                }
                ':' => {
                    self.cursor.advance();
                    let pseudo = self.pseudo()?;
                    rule.pseudos.push(pseudo);
                }
                _ => break,
            }
            any = true;
        }
        Ok(any.then_some(rule))
    }

    /// `[` has already been consumed.
    fn attribute(&mut self) -> Result<AttrMatcher, ParseError> {
        self.cursor.skip_whitespace();
        let name = self.required_identifier('[')?;
        self.cursor.skip_whitespace();
        if self.cursor.peek_is(']') {
            self.cursor.advance();
            return Ok(AttrMatcher { name, comparison: None });
        }

        let modifier = match self.cursor.peek().and_then(AttrModifier::from_char) {
            Some(modifier) if self.registry.allows_attr_modifier(modifier) => {
                self.cursor.advance();
                Some(modifier)
            }
            Some(modifier) => {
                return Err(self
                    .cursor
                    .error_here(ParseErrorKind::UnknownOperator(modifier.as_char())))
            }
            None => None,
        };
        self.expect('=', "\"=\"")?;
        self.cursor.skip_whitespace();

        let value = match self.cursor.peek() {
            Some('"' | '\'') => AttrValue::String(self.cursor.quoted_string()?),
            Some('$') if self.registry.substitutes_enabled() => {
                self.cursor.advance();
                AttrValue::Substitute(self.required_identifier('$')?)
            }
            _ => AttrValue::String(self.raw_attr_value()),
        };
        self.cursor.skip_whitespace();
        self.expect(']', "\"]\"")?;
        Ok(AttrMatcher {
            name,
            comparison: Some(AttrComparison {
                operator: AttrOperator::from_modifier(modifier),
                value,
            }),
        })
    }

    /// An unquoted attribute value is everything up to the closing `]`, trimmed.
    fn raw_attr_value(&mut self) -> String {
        let rest = self.cursor.rest();
        let len = memchr::memchr(b']', rest.as_bytes()).unwrap_or(rest.len());
        self.cursor.advance_by(len);
        rest[..len].trim().to_string()
    }

    /// `:` has already been consumed.
    fn pseudo(&mut self) -> Result<PseudoMatcher, ParseError> {
        let name = self.required_identifier(':')?;
        if !self.cursor.peek_is('(') {
            return Ok(PseudoMatcher {
                name,
                value: PseudoValue::None,
            });
        }
        self.cursor.advance();
        self.cursor.skip_whitespace();

        let kind = self.registry.pseudo_kind(&name);
        let value = if kind == PseudoKind::Selector {
            let nested = self.selector_list()?.unwrap_or_else(Selector::empty);
            PseudoValue::Selector(Box::new(nested))
        } else {
            let value = match self.cursor.peek() {
                Some('"' | '\'') => Some(self.cursor.quoted_string()?),
                Some('$') if self.registry.substitutes_enabled() => {
                    self.cursor.advance();
                    None
                }
                _ => Some(self.cursor.unquoted_until(')')?),
            };
            let value = match value {
                Some(text) if kind == PseudoKind::Numeric => PseudoValue::Numeric(text),
                Some(text) => PseudoValue::String(text),
                None => PseudoValue::Substitute(self.required_identifier('$')?),
            };
            self.cursor.skip_whitespace();
            value
        };
        self.expect(')', "\")\"")?;
        Ok(PseudoMatcher { name, value })
    }

    fn required_identifier(&mut self, after: char) -> Result<String, ParseError> {
        let start = self.cursor.pos();
        let ident = self.cursor.identifier()?;
        if ident.is_empty() {
            return Err(match self.cursor.peek() {
                None => self.cursor.error_at(start, ParseErrorKind::UnexpectedEnd { expected: "identifier" }),
                Some(_) => self.cursor.error_here(ParseErrorKind::EmptyIdentifier(after)),
            });
        }
        Ok(ident)
    }

    fn expect(&mut self, expected_char: char, expected: &'static str) -> Result<(), ParseError> {
        match self.cursor.peek() {
            None => Err(self.cursor.error_here(ParseErrorKind::UnexpectedEnd { expected })),
            Some(ch) if ch == expected_char => {
                self.cursor.advance();
                Ok(())
            }
            Some(found) => Err(self.cursor.error_here(ParseErrorKind::UnexpectedChar { expected, found })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    mod rules {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn tag_only() {
            check_single("paragraph", tagged("paragraph"));
        }

        #[test]
        fn wildcard() {
            check_single("*", Rule {
                tag: Some(TagName::Any),
                ..Rule::default()
            });
        }

        #[test]
        fn everything() {
            check_single(
                "div#main.foo.bar[lang][depth=2]:first-child",
                Rule {
                    id: Some("main".to_string()),
                    class_names: vec!["foo".to_string(), "bar".to_string()],
                    attrs: vec![
                        AttrMatcher {
                            name: "lang".to_string(),
                            comparison: None,
                        },
                        attr("depth", AttrOperator::Equals, "2"),
                    ],
                    pseudos: vec![pseudo("first-child", PseudoValue::None)],
                    ..tagged("div")
                },
            );
        }

        #[test]
        fn escaped_tag() {
            check_single(r"a\.b", tagged("a.b"));
        }

        #[test]
        fn tag_after_other_parts_is_an_error() {
            assert!(parse(".foo p.bar", &Registry::default()).is_ok());
            let err = parse(".foo[x]p", &Registry::default()).unwrap_err();
            assert_eq!(
                err.kind(),
                &ParseErrorKind::UnexpectedChar {
                    expected: "whitespace or nesting operator",
                    found: 'p'
                }
            );
        }

        #[test]
        fn empty_class() {
            let err = parse("a.", &Registry::default()).unwrap_err();
            assert_eq!(err.kind(), &ParseErrorKind::UnexpectedEnd { expected: "identifier" });
            let err = parse("a. b", &Registry::default()).unwrap_err();
            assert_eq!(err.kind(), &ParseErrorKind::EmptyIdentifier('.'));
        }
    }

    mod attributes {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn operators() {
            for (text, op) in [
                ("[a=b]", AttrOperator::Equals),
                ("[a~=b]", AttrOperator::Includes),
                ("[a^=b]", AttrOperator::Prefix),
                ("[a$=b]", AttrOperator::Suffix),
                ("[a*=b]", AttrOperator::Substring),
            ] {
                check_single(text, Rule {
                    attrs: vec![attr("a", op, "b")],
                    ..Rule::default()
                });
            }
        }

        #[test]
        fn spaces_and_quotes() {
            check_single(r#"[ data-tag ^= "intro ]" ]"#, Rule {
                attrs: vec![attr("data-tag", AttrOperator::Prefix, "intro ]")],
                ..Rule::default()
            });
        }

        #[test]
        fn unquoted_value_is_trimmed() {
            check_single("[title= hello world ]", Rule {
                attrs: vec![attr("title", AttrOperator::Equals, "hello world")],
                ..Rule::default()
            });
        }

        #[test]
        fn unregistered_modifier() {
            let err = parse("[a^=b]", &Registry::empty()).unwrap_err();
            assert_eq!(err.kind(), &ParseErrorKind::UnknownOperator('^'));
        }

        #[test]
        fn missing_equals() {
            let err = parse("[a!b]", &Registry::default()).unwrap_err();
            assert_eq!(
                err.kind(),
                &ParseErrorKind::UnexpectedChar {
                    expected: "\"=\"",
                    found: '!'
                }
            );
        }

        #[test]
        fn missing_close_bracket() {
            let err = parse("[a='b'", &Registry::default()).unwrap_err();
            assert_eq!(err.kind(), &ParseErrorKind::UnexpectedEnd { expected: "\"]\"" });
        }

        #[test]
        fn unterminated_string() {
            let err = parse("[a='b]", &Registry::default()).unwrap_err();
            assert_eq!(err.kind(), &ParseErrorKind::UnterminatedString('\''));
            assert_eq!(err.span().start, 3);
        }

        #[test]
        fn substitution() {
            let mut registry = Registry::default();
            registry.enable_substitutes();
            let parsed = parse("[a=$name]", &registry).unwrap();
            assert_eq!(
                parsed,
                Selector::Chain(RuleSet {
                    rule: Rule {
                        attrs: vec![AttrMatcher {
                            name: "a".to_string(),
                            comparison: Some(AttrComparison {
                                operator: AttrOperator::Equals,
                                value: AttrValue::Substitute("name".to_string()),
                            }),
                        }],
                        ..Rule::default()
                    }
                })
            );
        }

        #[test]
        fn dollar_without_substitution_is_literal() {
            check_single("[a=$name]", Rule {
                attrs: vec![attr("a", AttrOperator::Equals, "$name")],
                ..Rule::default()
            });
        }
    }

    mod pseudos {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn numeric() {
            check_single(":nth-child( 2n + 1 )", Rule {
                pseudos: vec![pseudo("nth-child", PseudoValue::Numeric("2n + 1".to_string()))],
                ..Rule::default()
            });
        }

        #[test]
        fn string_quoted() {
            check_single(":contains('a)b')", Rule {
                pseudos: vec![pseudo("contains", PseudoValue::String("a)b".to_string()))],
                ..Rule::default()
            });
        }

        #[test]
        fn nested_selector() {
            let parsed = parse("ul:has(li.active, li > em)", &Registry::default()).unwrap();
            let Selector::Chain(RuleSet { rule }) = parsed else {
                panic!("expected a single chain");
            };
            let [PseudoMatcher { name, value }] = rule.pseudos.as_slice() else {
                panic!("expected one pseudo");
            };
            assert_eq!(name, "has");
            let PseudoValue::Selector(nested) = value else {
                panic!("expected selector value");
            };
            assert_eq!(nested.alternatives().len(), 2);
        }

        #[test]
        fn nested_empty() {
            check_single(":not()", Rule {
                pseudos: vec![pseudo("not", PseudoValue::Selector(Box::new(Selector::empty())))],
                ..Rule::default()
            });
        }

        #[test]
        fn unclosed() {
            let err = parse(":nth-child(2", &Registry::default()).unwrap_err();
            assert_eq!(err.kind(), &ParseErrorKind::UnexpectedEnd { expected: "\")\"" });
            let err = parse(":has(p", &Registry::default()).unwrap_err();
            assert_eq!(err.kind(), &ParseErrorKind::UnexpectedEnd { expected: "\")\"" });
        }
    }

    mod chains {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn descendant_and_operators() {
            let parsed = parse("a b > c + d ~ e", &Registry::default()).unwrap();
            let Selector::Chain(rule_set) = parsed else {
                panic!("expected a single chain");
            };
            let ops: Vec<_> = rule_set.rules().map(|r| r.nesting).collect();
            assert_eq!(
                ops,
                vec![
                    None,
                    Some(NestingOperator::Descendant),
                    Some(NestingOperator::Child),
                    Some(NestingOperator::Adjacent),
                    Some(NestingOperator::General),
                ]
            );
        }

        #[test]
        fn operators_without_spaces() {
            let spaced = parse("a > b", &Registry::default()).unwrap();
            let tight = parse("a>b", &Registry::default()).unwrap();
            assert_eq!(spaced, tight);
        }

        #[test]
        fn unregistered_nesting_operator() {
            let err = parse("a > b", &Registry::empty()).unwrap_err();
            assert_eq!(err.kind(), &ParseErrorKind::UnknownOperator('>'));
        }

        #[test]
        fn rule_expected_after_operator() {
            let err = parse("a >", &Registry::default()).unwrap_err();
            assert_eq!(err.kind(), &ParseErrorKind::RuleExpected('>'));
        }

        #[test]
        fn trailing_garbage() {
            let err = parse("a ]", &Registry::default()).unwrap_err();
            assert_eq!(err.kind(), &ParseErrorKind::TrailingInput(']'));
            assert_eq!(err.span().start, 2);
        }
    }

    mod lists {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn single_stays_chain() {
            assert!(matches!(parse("a", &Registry::default()).unwrap(), Selector::Chain(_)));
        }

        #[test]
        fn multiple_become_list() {
            let parsed = parse("a , b,c", &Registry::default()).unwrap();
            let Selector::List(items) = parsed else {
                panic!("expected a list");
            };
            assert_eq!(items.len(), 3);
        }

        #[test]
        fn empty_input() {
            assert_eq!(parse("", &Registry::default()).unwrap(), Selector::empty());
            assert_eq!(parse("   ", &Registry::default()).unwrap(), Selector::empty());
        }

        #[test]
        fn rule_expected_after_comma() {
            let err = parse("a,", &Registry::default()).unwrap_err();
            assert_eq!(err.kind(), &ParseErrorKind::RuleExpected(','));
        }
    }

    fn tagged(name: &str) -> Rule {
        Rule {
            tag: Some(TagName::Named(name.to_string())),
            ..Rule::default()
        }
    }

    fn attr(name: &str, operator: AttrOperator, value: &str) -> AttrMatcher {
        AttrMatcher {
            name: name.to_string(),
            comparison: Some(AttrComparison {
                operator,
                value: AttrValue::String(value.to_string()),
            }),
        }
    }

    fn pseudo(name: &str, value: PseudoValue) -> PseudoMatcher {
        PseudoMatcher {
            name: name.to_string(),
            value,
        }
    }

    fn check_single(text: &str, expect: Rule) {
        let parsed = parse(text, &Registry::default()).unwrap();
        assert_eq!(parsed, Selector::Chain(RuleSet { rule: expect }));
    }
}
