//! Rendered output tree.
//!
//! Markup views render into a [`Fragment`] of [`Node`]s instead of a string so
//! tag and attribute handlers can inspect and mutate the element they are
//! attached to. The tree serializes to HTML with standard escaping.

use std::borrow::Cow;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use tessera_carton::{is_text_content_only_tag, is_void_tag, MATH_ML_NAMESPACE, SVG_NAMESPACE};

/// Namespace for elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum Namespace {
    #[default]
    Html = 0,
    Svg = 1,
    MathMl = 2,
}

impl Namespace {
    /// Map an XML namespace URI to a namespace. Unknown URIs are HTML.
    pub fn from_uri(uri: &str) -> Self {
        match uri {
            SVG_NAMESPACE => Self::Svg,
            MATH_ML_NAMESPACE => Self::MathMl,
            _ => Self::Html,
        }
    }

    /// The XML namespace URI, `None` for HTML.
    pub fn uri(&self) -> Option<&'static str> {
        match self {
            Self::Html => None,
            Self::Svg => Some(SVG_NAMESPACE),
            Self::MathMl => Some(MATH_ML_NAMESPACE),
        }
    }
}

/// One rendered node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    Element(Element),
    /// Text, escaped on serialization
    Text { content: String },
    /// Markup inserted verbatim (unescaped reads)
    Raw { content: String },
    Comment { content: String },
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    pub fn raw(content: impl Into<String>) -> Self {
        Self::Raw {
            content: content.into(),
        }
    }

    pub fn comment(content: impl Into<String>) -> Self {
        Self::Comment {
            content: content.into(),
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(el) => Some(el),
            _ => None,
        }
    }
}

/// Rendered element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: CompactString,
    #[serde(default)]
    pub namespace: Namespace,
    /// Attributes in insertion order
    #[serde(default)]
    pub attributes: Vec<(CompactString, String)>,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<CompactString>, namespace: Namespace) -> Self {
        Self {
            tag: tag.into(),
            namespace,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attribute(&mut self, name: impl Into<CompactString>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(n, _)| n == name)?;
        Some(self.attributes.remove(pos).1)
    }

    pub fn append(&mut self, nodes: impl IntoIterator<Item = Node>) {
        self.children.extend(nodes);
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_element(&mut out, self);
        out
    }
}

/// An ordered list of rendered nodes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fragment {
    pub nodes: Vec<Node>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn extend(&mut self, other: Fragment) {
        self.nodes.extend(other.nodes);
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.nodes, &mut out);
        out
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            write_node(&mut out, node, None);
        }
        out
    }
}

impl From<Vec<Node>> for Fragment {
    fn from(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }
}

impl IntoIterator for Fragment {
    type Item = Node;
    type IntoIter = std::vec::IntoIter<Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Element(el) => collect_text(&el.children, out),
            Node::Text { content } | Node::Raw { content } => out.push_str(content),
            Node::Comment { .. } => {}
        }
    }
}

/// Keep raw text from closing its container early.
///
/// Every case-insensitive `</tag` becomes `<\/tag`.
fn escape_raw_text<'a>(content: &'a str, tag: &str) -> Cow<'a, str> {
    let closes = |at: usize| {
        content[at + 2..]
            .get(..tag.len())
            .is_some_and(|name| name.eq_ignore_ascii_case(tag))
    };
    let mut ends = content
        .match_indices("</")
        .map(|(at, _)| at)
        .filter(|&at| closes(at))
        .peekable();
    if ends.peek().is_none() {
        return Cow::Borrowed(content);
    }

    let mut out = String::with_capacity(content.len() + 1);
    let mut last = 0;
    for at in ends {
        out.push_str(&content[last..=at]);
        out.push('\\');
        last = at + 1;
    }
    out.push_str(&content[last..]);
    Cow::Owned(out)
}

/// `raw_text` holds the tag of an enclosing opaque-text element.
fn write_node(out: &mut String, node: &Node, raw_text: Option<&str>) {
    match node {
        Node::Element(el) => write_element(out, el),
        Node::Text { content } => match raw_text {
            Some(tag) => out.push_str(&escape_raw_text(content, tag)),
            None => out.push_str(&htmlize::escape_text(content.as_str())),
        },
        Node::Raw { content } => out.push_str(content),
        Node::Comment { content } => {
            out.push_str("<!--");
            out.push_str(content);
            out.push_str("-->");
        }
    }
}

fn write_element(out: &mut String, el: &Element) {
    out.push('<');
    out.push_str(&el.tag);
    for (name, value) in &el.attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&htmlize::escape_attribute(value.as_str()));
        out.push('"');
    }
    out.push('>');

    if el.children.is_empty() && is_void_tag(&el.tag) {
        return;
    }

    let raw_text = is_text_content_only_tag(&el.tag).then_some(el.tag.as_str());
    for child in &el.children {
        write_node(out, child, raw_text);
    }
    out.push_str("</");
    out.push_str(&el.tag);
    out.push('>');
}
