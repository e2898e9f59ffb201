use crate::node::TreeNode;
use crate::query::{AttrComparison, AttrMatcher, AttrOperator, AttrValue};
use crate::select::api::{MatchError, QueryOptions};
use serde_json::Value;
use std::borrow::Cow;

/// An attribute matcher with its substitution (if any) resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CompiledAttr {
    name: String,
    comparison: Option<(AttrOperator, String)>,
}

impl CompiledAttr {
    pub(crate) fn compile<N>(matcher: &AttrMatcher, options: &QueryOptions<N>) -> Result<Self, MatchError> {
        let comparison = match &matcher.comparison {
            None => None,
            Some(AttrComparison { operator, value }) => {
                let value = match value {
                    AttrValue::String(text) => text.clone(),
                    AttrValue::Substitute(name) => options.substitution(name)?.to_string(),
                };
                Some((*operator, value))
            }
        };
        Ok(Self {
            name: matcher.name.clone(),
            comparison,
        })
    }

    pub(crate) fn matches<N: TreeNode>(&self, node: &N) -> bool {
        let actual = node.attribute(&self.name);
        let Some(actual) = actual.as_deref() else {
            return false;
        };
        match &self.comparison {
            None => !actual.is_null(),
            Some((operator, expected)) => compare(actual, *operator, expected),
        }
    }
}

/// Compares an attribute value against a selector's expected text.
///
/// `null` never matches. Strings, numbers and booleans are compared by their text form. Arrays match `=` and `~=` if
/// any element does, and never match the substring operators. Objects never match a comparison.
fn compare(actual: &Value, operator: AttrOperator, expected: &str) -> bool {
    if let Value::Array(items) = actual {
        return match operator {
            AttrOperator::Equals | AttrOperator::Includes => {
                items.iter().filter_map(scalar_text).any(|item| item == expected)
            }
            AttrOperator::Prefix | AttrOperator::Suffix | AttrOperator::Substring => false,
        };
    }
    let Some(actual) = scalar_text(actual) else {
        return false;
    };
    match operator {
        AttrOperator::Equals => actual == expected,
        AttrOperator::Includes => actual.split_whitespace().any(|word| word == expected),
        _ if expected.is_empty() => false,
        AttrOperator::Prefix => actual.starts_with(expected),
        AttrOperator::Suffix => actual.ends_with(expected),
        AttrOperator::Substring => actual.contains(expected),
    }
}

fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(text) => Some(Cow::Borrowed(text)),
        Value::Number(number) => Some(Cow::Owned(number.to_string())),
        Value::Bool(flag) => Some(Cow::Owned(flag.to_string())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
