//! Compiled renderers.
//!
//! Two output strategies share one shape. A [`MarkupRenderer`] builds output
//! nodes so tag and attribute handlers can work on real elements; a
//! [`TextRenderer`] concatenates strings for attribute values, tag-position
//! text and the children of text-only elements. Both are cheap to clone and
//! immutable once compiled, so one renderer can serve concurrent renders.

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use compact_str::CompactString;
use rustc_hash::FxHashMap;
use tessera_armature::{tokenize, Handler};
use tessera_relief::{Element, Namespace, Node, RenderError, RenderResult};

use crate::callbacks::{AttrData, AttrHandler, TagData, TagHandler};
use crate::expression::{value_to_text, Branch, Expression};
use crate::registry::TemplateRegistry;
use crate::scope::Scope;
use crate::view::View;

/// Template type reported to custom tag handlers.
pub const TEMPLATE_TYPE: &str = "stache";

/// Parse context captured when an expression is compiled
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    /// Tag under construction, if the expression sits inside a tag
    pub tag: Option<CompactString>,
    /// Attribute under construction
    pub attr: Option<CompactString>,
    pub directly_nested: bool,
    /// Inside a text-only element such as `<style>`
    pub text_content_only: bool,
    pub line: u32,
    pub filename: Option<CompactString>,
}

// ========== Markup ==========

pub(crate) enum MarkupPart {
    /// Static text, already entity-decoded
    Text(String),
    Comment(String),
    Element(ElementTemplate),
    Value {
        expr: Arc<dyn Expression>,
        escape: bool,
    },
    Section(SectionRenderer<MarkupRenderer>),
    Partial(PartialRenderer),
    /// Compiled children of a text-only element
    TextBlock(TextRenderer),
}

/// A branch with its primary and optional inverse body
pub(crate) struct SectionRenderer<R> {
    pub(crate) expr: Arc<dyn Expression>,
    pub(crate) primary: R,
    pub(crate) inverse: Option<R>,
}

/// Node-producing renderer
#[derive(Clone)]
pub struct MarkupRenderer {
    parts: Arc<[MarkupPart]>,
}

impl MarkupRenderer {
    pub(crate) fn new(parts: Vec<MarkupPart>) -> Self {
        Self {
            parts: Arc::from(parts),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn render(&self, scope: &Scope, out: &mut Vec<Node>) -> RenderResult<()> {
        render_parts(&self.parts, scope, out)
    }
}

impl fmt::Debug for MarkupRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkupRenderer")
            .field("parts", &self.parts.len())
            .finish()
    }
}

fn render_parts(parts: &[MarkupPart], scope: &Scope, out: &mut Vec<Node>) -> RenderResult<()> {
    for part in parts {
        part.render(scope, out)?;
    }
    Ok(())
}

impl MarkupPart {
    fn render(&self, scope: &Scope, out: &mut Vec<Node>) -> RenderResult<()> {
        match self {
            Self::Text(text) => out.push(Node::text(text.as_str())),
            Self::Comment(text) => out.push(Node::comment(text.as_str())),
            Self::Element(template) => out.push(Node::Element(template.render(scope)?)),
            Self::Value { expr, escape } => {
                let text = value_to_text(&expr.value(scope)?);
                if !text.is_empty() {
                    out.push(if *escape { Node::text(text) } else { Node::raw(text) });
                }
            }
            Self::Section(section) => match section.expr.branch(scope)? {
                Branch::Primary(scopes) => {
                    for inner in &scopes {
                        section.primary.render(inner, out)?;
                    }
                }
                Branch::Inverse => {
                    if let Some(inverse) = &section.inverse {
                        inverse.render(scope, out)?;
                    }
                }
            },
            Self::Partial(partial) => partial.render_markup(scope, out)?,
            Self::TextBlock(text) => {
                let text = text.render(scope)?;
                if !text.is_empty() {
                    out.push(Node::text(text));
                }
            }
        }
        Ok(())
    }
}

/// Append `part`, merging adjacent static text.
pub(crate) fn push_markup_part(parts: &mut Vec<MarkupPart>, part: MarkupPart) {
    if let (Some(MarkupPart::Text(last)), MarkupPart::Text(text)) = (parts.last_mut(), &part) {
        last.push_str(text);
        return;
    }
    parts.push(part);
}

// ========== Elements ==========

pub(crate) enum AttrValue {
    Static(String),
    Dynamic(TextRenderer),
}

pub(crate) struct AttrTemplate {
    pub(crate) name: CompactString,
    pub(crate) value: AttrValue,
}

pub(crate) struct CustomTagCallback {
    pub(crate) handler: Arc<dyn TagHandler>,
    pub(crate) tag: CompactString,
    pub(crate) subtemplate: Option<View>,
    pub(crate) templates: Option<Arc<FxHashMap<CompactString, View>>>,
    pub(crate) directly_nested: bool,
    pub(crate) line: u32,
}

/// Work deferred to render time, run in order after attributes and children
pub(crate) enum ElementCallback {
    CustomTag(CustomTagCallback),
    Attribute {
        handler: Arc<dyn AttrHandler>,
        name: CompactString,
        line: u32,
    },
    /// Text produced inside the tag itself, applied as attributes
    AttributeText(TextRenderer),
}

/// An element as compiled
pub(crate) struct ElementTemplate {
    pub(crate) tag: CompactString,
    pub(crate) namespace: Namespace,
    pub(crate) attrs: Vec<AttrTemplate>,
    pub(crate) children: Vec<MarkupPart>,
    pub(crate) callbacks: Vec<ElementCallback>,
}

impl ElementTemplate {
    pub(crate) fn new(tag: &str, namespace: Namespace) -> Self {
        Self {
            tag: tag.into(),
            namespace,
            attrs: Vec::new(),
            children: Vec::new(),
            callbacks: Vec::new(),
        }
    }

    /// Literal value of an attribute.
    pub(crate) fn static_attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find_map(|attr| match &attr.value {
            AttrValue::Static(value) if attr.name == name => Some(value.as_str()),
            _ => None,
        })
    }

    fn render(&self, scope: &Scope) -> RenderResult<Element> {
        let mut element = Element::new(self.tag.clone(), self.namespace);
        for attr in &self.attrs {
            let value = match &attr.value {
                AttrValue::Static(value) => value.clone(),
                AttrValue::Dynamic(renderer) => renderer.render(scope)?,
            };
            element.set_attribute(attr.name.clone(), value);
        }
        render_parts(&self.children, scope, &mut element.children)?;
        for callback in &self.callbacks {
            callback.apply(&mut element, scope)?;
        }
        Ok(element)
    }
}

impl ElementCallback {
    fn apply(&self, element: &mut Element, scope: &Scope) -> RenderResult<()> {
        match self {
            Self::CustomTag(custom) => {
                scope.template_context().set_line_number(custom.line);
                let data = TagData {
                    tag: &custom.tag,
                    scope,
                    subtemplate: custom.subtemplate.as_ref(),
                    template_type: TEMPLATE_TYPE,
                    directly_nested: custom.directly_nested,
                    templates: custom.templates.as_deref(),
                };
                let inner = custom.handler.render(element, &data)?;
                if let (Some(inner), Some(subtemplate)) = (inner, &custom.subtemplate) {
                    element.append(subtemplate.render(&inner)?);
                }
            }
            Self::Attribute {
                handler,
                name,
                line,
            } => {
                scope.template_context().set_line_number(*line);
                handler.apply(
                    element,
                    &AttrData {
                        attribute_name: name,
                        scope,
                    },
                )?;
            }
            Self::AttributeText(renderer) => {
                let text = renderer.render(scope)?;
                for (name, value) in parse_attribute_text(&text) {
                    element.set_attribute(name, value);
                }
            }
        }
        Ok(())
    }
}

/// Read `name="value"` pairs out of text produced inside a tag.
pub(crate) fn parse_attribute_text(text: &str) -> Vec<(CompactString, String)> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let source = format!("<x {text}>");
    match tokenize(&source, AttributeCollector::default()) {
        Ok(collector) => collector.attrs,
        Err(never) => match never {},
    }
}

#[derive(Default)]
struct AttributeCollector {
    attrs: Vec<(CompactString, String)>,
    value: String,
    elements: u32,
}

impl Handler for AttributeCollector {
    type Error = Infallible;

    fn start(&mut self, _tag: &str, _unary: bool, _line: u32) -> Result<(), Infallible> {
        self.elements += 1;
        Ok(())
    }
    fn end(&mut self, _tag: &str, _unary: bool, _line: u32) -> Result<(), Infallible> {
        Ok(())
    }
    fn close(&mut self, _tag: &str, _line: u32) -> Result<(), Infallible> {
        Ok(())
    }
    fn attr_start(&mut self, _name: &str, _line: u32) -> Result<(), Infallible> {
        self.value.clear();
        Ok(())
    }
    fn attr_value(&mut self, value: &str, _line: u32) -> Result<(), Infallible> {
        self.value.push_str(value);
        Ok(())
    }
    fn attr_end(&mut self, name: &str, _line: u32) -> Result<(), Infallible> {
        // Only the synthetic wrapper element's attributes count
        if self.elements == 1 {
            let value = htmlize::unescape_attribute(self.value.as_str()).into_owned();
            self.attrs.push((name.into(), value));
        }
        Ok(())
    }
    fn chars(&mut self, _text: &str, _line: u32) -> Result<(), Infallible> {
        Ok(())
    }
    fn special(&mut self, _text: &str, _line: u32) -> Result<(), Infallible> {
        Ok(())
    }
    fn comment(&mut self, _text: &str, _line: u32) -> Result<(), Infallible> {
        Ok(())
    }
}

// ========== Text ==========

pub(crate) enum TextPart {
    Static(String),
    Value(Arc<dyn Expression>),
    /// Escaped read inside attribute text that is tokenized again
    QuotedValue(Arc<dyn Expression>),
    Section(SectionRenderer<TextRenderer>),
    Partial(PartialRenderer),
}

/// String-producing renderer
#[derive(Clone)]
pub struct TextRenderer {
    parts: Arc<[TextPart]>,
}

impl TextRenderer {
    pub(crate) fn new(parts: Vec<TextPart>) -> Self {
        Self {
            parts: Arc::from(parts),
        }
    }

    /// A renderer reading a single expression.
    pub(crate) fn value(expr: Arc<dyn Expression>) -> Self {
        Self::new(vec![TextPart::Value(expr)])
    }

    pub fn render(&self, scope: &Scope) -> RenderResult<String> {
        let mut out = String::new();
        self.render_into(scope, &mut out)?;
        Ok(out)
    }

    fn render_into(&self, scope: &Scope, out: &mut String) -> RenderResult<()> {
        for part in self.parts.iter() {
            match part {
                TextPart::Static(text) => out.push_str(text),
                TextPart::Value(expr) => out.push_str(&value_to_text(&expr.value(scope)?)),
                TextPart::QuotedValue(expr) => {
                    let text = value_to_text(&expr.value(scope)?);
                    out.push_str(&htmlize::escape_attribute(text.as_str()));
                }
                TextPart::Section(section) => match section.expr.branch(scope)? {
                    Branch::Primary(scopes) => {
                        for inner in &scopes {
                            section.primary.render_into(inner, out)?;
                        }
                    }
                    Branch::Inverse => {
                        if let Some(inverse) = &section.inverse {
                            inverse.render_into(scope, out)?;
                        }
                    }
                },
                TextPart::Partial(partial) => partial.render_text(scope, out)?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextRenderer")
            .field("parts", &self.parts.len())
            .finish()
    }
}

/// Append `part`, merging adjacent static text.
pub(crate) fn push_text_part(parts: &mut Vec<TextPart>, part: TextPart) {
    if let (Some(TextPart::Static(last)), TextPart::Static(text)) = (parts.last_mut(), &part) {
        last.push_str(text);
        return;
    }
    parts.push(part);
}

// ========== Partials ==========

/// `{{>name}}` or `{{>name context}}`
pub struct PartialRenderer {
    name: CompactString,
    context: Option<Arc<dyn Expression>>,
}

impl PartialRenderer {
    pub(crate) fn new(name: &str, context: Option<Arc<dyn Expression>>) -> Self {
        Self {
            name: name.into(),
            context,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Find the view to render.
    ///
    /// `scope.view` is the view currently rendering. Other names are looked
    /// up in the render's partials, then the process-wide registry, then as a
    /// scope key holding a partial name.
    fn resolve(&self, scope: &Scope) -> RenderResult<View> {
        let context = scope.template_context();
        if self.name == "scope.view" {
            return context.view().ok_or_else(|| self.missing());
        }
        if let Some(view) = self.lookup(scope, &self.name)? {
            return Ok(view);
        }
        if let Some(serde_json::Value::String(name)) = scope.get(&self.name) {
            if let Some(view) = self.lookup(scope, &name)? {
                return Ok(view);
            }
        }
        Err(self.missing())
    }

    fn lookup(&self, scope: &Scope, name: &str) -> RenderResult<Option<View>> {
        if let Some(view) = scope.template_context().partial(name) {
            return Ok(Some(view));
        }
        TemplateRegistry::global()
            .get(name)
            .map_err(|source| RenderError::PartialCompile {
                name: name.to_string(),
                source,
            })
    }

    fn missing(&self) -> RenderError {
        RenderError::MissingPartial {
            name: self.name.to_string(),
        }
    }

    fn inner_scope(&self, scope: &Scope) -> RenderResult<Scope> {
        match &self.context {
            Some(context) => Ok(scope.add(context.value(scope)?)),
            None => Ok(scope.clone()),
        }
    }

    fn render_markup(&self, scope: &Scope, out: &mut Vec<Node>) -> RenderResult<()> {
        let view = self.resolve(scope)?;
        let fragment = view.render(&self.inner_scope(scope)?)?;
        out.extend(fragment);
        Ok(())
    }

    fn render_text(&self, scope: &Scope, out: &mut String) -> RenderResult<()> {
        let view = self.resolve(scope)?;
        let fragment = view.render(&self.inner_scope(scope)?)?;
        out.push_str(&fragment.to_html());
        Ok(())
    }
}

impl fmt::Debug for PartialRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialRenderer")
            .field("name", &self.name)
            .field("context", &self.context.is_some())
            .finish()
    }
}
