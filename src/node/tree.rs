use crate::node::{TreeNode, TreeRebuild};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// A unist-style tree node.
///
/// This serializes to (and deserializes from) the usual unist JSON shape:
///
/// ```json
/// {"type": "heading", "depth": 2, "children": [{"type": "text", "value": "Hello"}]}
/// ```
///
/// Any key other than `type`, `children`, `value` and `identifier` is kept in [`Node::attributes`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Node {
    /// A leaf node with no value and no attributes.
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            ..Self::default()
        }
    }

    /// A leaf node with a text value, like `{"type": "text", "value": "hello"}`.
    pub fn text(node_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(node_type).with_value(value)
    }

    /// A parent node.
    pub fn parent(node_type: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            children: Some(children),
            ..Self::new(node_type)
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

impl TryFrom<Value> for Node {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}

impl TreeNode for Node {
    fn node_type(&self) -> &str {
        &self.node_type
    }

    fn children(&self) -> Option<&[Self]> {
        self.children.as_deref()
    }

    /// Looks up an attribute. The `type`, `value` and `identifier` fields are also visible as attributes.
    fn attribute(&self, name: &str) -> Option<Cow<'_, Value>> {
        let owned_string = |s: &str| Cow::Owned(Value::String(s.to_string()));
        match name {
            "type" => Some(owned_string(&self.node_type)),
            "value" => self.value.as_deref().map(owned_string),
            "identifier" => self.identifier.as_deref().map(owned_string),
            _ => self.attributes.get(name).map(Cow::Borrowed),
        }
    }

    fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl TreeRebuild for Node {
    fn with_children(&self, children: Vec<Self>) -> Self {
        Self {
            node_type: self.node_type.clone(),
            children: Some(children),
            value: self.value.clone(),
            identifier: self.identifier.clone(),
            attributes: self.attributes.clone(),
        }
    }
}
