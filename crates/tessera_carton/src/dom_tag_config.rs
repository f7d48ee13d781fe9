//! Static tag tables shared by the tokenizer and the compiler.

use phf::{phf_map, phf_set};

/// XML namespace for SVG content.
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// XML namespace for MathML content.
pub const MATH_ML_NAMESPACE: &str = "http://www.w3.org/1998/Math/MathML";

/// Tag that defines a named inline template instead of rendering in place.
pub const TEMPLATE_DEFINITION_TAG: &str = "view-template";

/// Attribute on [`TEMPLATE_DEFINITION_TAG`] holding the template name.
pub const TEMPLATE_NAME_ATTR: &str = "name";

/// Built-in tag that renders its content in the surrounding scope.
pub const CONTENT_TAG: &str = "content";

/// Elements that never have children and never get a closing tag.
static VOID_TAGS: phf::Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr",
};

/// Elements whose children are opaque text rather than markup.
static TEXT_CONTENT_ONLY_TAGS: phf::Set<&'static str> = phf_set! {
    "style", "script",
};

/// Tags that open an XML namespace for themselves and their descendants.
static NAMESPACED_TAGS: phf::Map<&'static str, &'static str> = phf_map! {
    "svg" => SVG_NAMESPACE,
    "g" => SVG_NAMESPACE,
    "math" => MATH_ML_NAMESPACE,
};

/// Check if a tag is a void element (`<br>`, `<input>`, ...).
#[inline]
pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(tag) || VOID_TAGS.contains(tag.to_ascii_lowercase().as_str())
}

/// Check if a tag's children are treated as raw text.
#[inline]
pub fn is_text_content_only_tag(tag: &str) -> bool {
    TEXT_CONTENT_ONLY_TAGS.contains(tag)
}

/// Namespace explicitly opened by `tag`, if any.
#[inline]
pub fn namespace_uri_for_tag(tag: &str) -> Option<&'static str> {
    NAMESPACED_TAGS.get(tag).copied()
}
