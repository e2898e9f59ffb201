use crate::node::Node;
use markdown::mdast;
use serde_json::Value;

/// Markdown text that couldn't be read.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InvalidMarkdown(String);

/// Parses GitHub-flavored Markdown (plus YAML/TOML front matter) into a [`Node`] tree.
///
/// The tree uses mdast's type names and field names: the root is a `root` node, headings are `heading` nodes with a
/// `depth` attribute, list items are `listItem`, and so on. Reference-style links, images and footnotes keep their
/// `identifier`.
///
/// ```
/// use treeq::node::{read_markdown, TreeNode};
///
/// let root = read_markdown("# Hello").unwrap();
/// assert_eq!(root.node_type(), "root");
/// assert_eq!(root.children().unwrap()[0].node_type(), "heading");
/// ```
pub fn read_markdown(text: &str) -> Result<Node, InvalidMarkdown> {
    let mut options = markdown::ParseOptions::gfm();
    options.constructs.frontmatter = true;
    let ast = markdown::to_mdast(text, &options).map_err(|e| InvalidMarkdown(format!("{e}")))?;
    Ok(Node::from(ast))
}

impl From<mdast::Node> for Node {
    fn from(node: mdast::Node) -> Self {
        match node {
            mdast::Node::Root(node) => parent("root", node.children),
            mdast::Node::Blockquote(node) => parent("blockquote", node.children),
            mdast::Node::FootnoteDefinition(node) => {
                reference(parent("footnoteDefinition", node.children), node.identifier, node.label)
            }
            mdast::Node::List(node) => parent("list", node.children)
                .with_attr("ordered", node.ordered)
                .with_attr("start", node.start)
                .with_attr("spread", node.spread),
            mdast::Node::ListItem(node) => parent("listItem", node.children)
                .with_attr("spread", node.spread)
                .with_attr("checked", node.checked),
            mdast::Node::Heading(node) => parent("heading", node.children).with_attr("depth", node.depth),
            mdast::Node::Paragraph(node) => parent("paragraph", node.children),
            mdast::Node::Table(node) => {
                let align: Vec<Value> = node.align.iter().map(alignment).collect();
                parent("table", node.children).with_attr("align", align)
            }
            mdast::Node::TableRow(node) => parent("tableRow", node.children),
            mdast::Node::TableCell(node) => parent("tableCell", node.children),
            mdast::Node::Emphasis(node) => parent("emphasis", node.children),
            mdast::Node::Strong(node) => parent("strong", node.children),
            mdast::Node::Delete(node) => parent("delete", node.children),
            mdast::Node::Link(node) => parent("link", node.children)
                .with_attr("url", node.url)
                .with_attr("title", node.title),
            mdast::Node::LinkReference(node) => reference(
                parent("linkReference", node.children).with_attr("referenceType", reference_kind(node.reference_kind)),
                node.identifier,
                node.label,
            ),
            mdast::Node::Image(node) => Node::new("image")
                .with_attr("url", node.url)
                .with_attr("alt", node.alt)
                .with_attr("title", node.title),
            mdast::Node::ImageReference(node) => reference(
                Node::new("imageReference")
                    .with_attr("alt", node.alt)
                    .with_attr("referenceType", reference_kind(node.reference_kind)),
                node.identifier,
                node.label,
            ),
            mdast::Node::Definition(node) => reference(
                Node::new("definition")
                    .with_attr("url", node.url)
                    .with_attr("title", node.title),
                node.identifier,
                node.label,
            ),
            mdast::Node::FootnoteReference(node) => {
                reference(Node::new("footnoteReference"), node.identifier, node.label)
            }
            mdast::Node::Code(node) => Node::text("code", node.value)
                .with_attr("lang", node.lang)
                .with_attr("meta", node.meta),
            mdast::Node::Math(node) => Node::text("math", node.value).with_attr("meta", node.meta),
            mdast::Node::InlineCode(node) => Node::text("inlineCode", node.value),
            mdast::Node::InlineMath(node) => Node::text("inlineMath", node.value),
            mdast::Node::Text(node) => Node::text("text", node.value),
            mdast::Node::Html(node) => Node::text("html", node.value),
            mdast::Node::Yaml(node) => Node::text("yaml", node.value),
            mdast::Node::Toml(node) => Node::text("toml", node.value),
            mdast::Node::Break(_) => Node::new("break"),
            mdast::Node::ThematicBreak(_) => Node::new("thematicBreak"),

            // MDX isn't enabled by read_markdown, but a caller could hand us an mdast tree built with it.
            mdast::Node::MdxJsxFlowElement(node) => {
                mdx("mdxJsxFlowElement", parent("mdxJsxFlowElement", node.children).with_attr("name", node.name))
            }
            mdast::Node::MdxJsxTextElement(node) => {
                mdx("mdxJsxTextElement", parent("mdxJsxTextElement", node.children).with_attr("name", node.name))
            }
            mdast::Node::MdxjsEsm(node) => mdx("mdxjsEsm", Node::text("mdxjsEsm", node.value)),
            mdast::Node::MdxTextExpression(node) => {
                mdx("mdxTextExpression", Node::text("mdxTextExpression", node.value))
            }
            mdast::Node::MdxFlowExpression(node) => {
                mdx("mdxFlowExpression", Node::text("mdxFlowExpression", node.value))
            }
        }
    }
}

fn parent(node_type: &str, children: Vec<mdast::Node>) -> Node {
    Node::parent(node_type, children.into_iter().map(Node::from).collect())
}

fn reference(node: Node, identifier: String, label: Option<String>) -> Node {
    node.with_identifier(identifier).with_attr("label", label)
}

fn mdx(node_type: &str, node: Node) -> Node {
    log::warn!("MDX node {node_type} is mapped without its JSX attributes");
    node
}

fn reference_kind(kind: mdast::ReferenceKind) -> &'static str {
    match kind {
        mdast::ReferenceKind::Shortcut => "shortcut",
        mdast::ReferenceKind::Collapsed => "collapsed",
        mdast::ReferenceKind::Full => "full",
    }
}

fn alignment(align: &mdast::AlignKind) -> Value {
    match align {
        mdast::AlignKind::Left => Value::from("left"),
        mdast::AlignKind::Right => Value::from("right"),
        mdast::AlignKind::Center => Value::from("center"),
        mdast::AlignKind::None => Value::Null,
    }
}
