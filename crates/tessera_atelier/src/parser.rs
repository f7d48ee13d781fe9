//! Parse state machine.
//!
//! [`Parser`] is the handler table the tokenizer drives. It owns every piece
//! of per-compile state: the element under construction, the attribute
//! cursor, the frame stack mirroring open elements and sections, the
//! namespace stack and the text builder of an opaque-text element.
//!
//! A `{{...}}` marker is routed by cursor position, checked in order:
//!
//! 1. a branch opened inside the tag itself (`<p {{#x}}...{{/x}}>`)
//! 2. an attribute value
//! 3. the tag, outside any attribute
//! 4. the surrounding content
//!
//! `{{else}}` skips the routing and flips the nearest open branch.

use std::sync::Arc;

use compact_str::CompactString;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use tessera_armature::Handler;
use tessera_carton::{
    is_text_content_only_tag, namespace_uri_for_tag, TEMPLATE_DEFINITION_TAG, TEMPLATE_NAME_ATTR,
};
use tessera_relief::{CompileError, CompileWarning, ErrorCode, Mode, Namespace, WarningCode};

use crate::callbacks::TagHandler;
use crate::dispatch::{make_renderer_and_update_section, DispatchContext};
use crate::options::CompileOptions;
use crate::renderer::{
    AttrTemplate, AttrValue, CustomTagCallback, ElementCallback, ElementTemplate, MarkupPart,
    MarkupRenderer, RenderState, TextRenderer,
};
use crate::section::{MarkupSectionBuilder, SectionBuilder, TextSectionBuilder};
use crate::view::View;

/// Attribute names wrapped in binding sigils, e.g. `(click)` or `{value}`
static WRAPPED_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[{(].*[)}]").expect("valid regex"));
/// Colon binding syntax, e.g. `on:click` or `value:bind`
static COLON_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^on:|(:to|:from|:bind)$|.*:to:on:.*").expect("valid regex"));

fn is_binding_syntax(name: &str) -> bool {
    WRAPPED_ATTR.is_match(name) || COLON_ATTR.is_match(name)
}

// ========== Frames ==========

pub(crate) enum FrameKind {
    /// A `{{#x}}`, `{{^x}}` or `{{<x}}` branch
    Section,
    /// An element claimed by a custom tag handler
    Custom(Arc<dyn TagHandler>),
    Element,
}

/// One entry of the stack mirroring open elements and sections
pub(crate) struct Frame {
    pub(crate) kind: FrameKind,
    /// Element tag, or the name a branch's closing marker should repeat
    pub(crate) tag: CompactString,
    /// Named templates defined directly inside a custom tag
    pub(crate) templates: FxHashMap<CompactString, View>,
    pub(crate) directly_nested: bool,
}

impl Frame {
    pub(crate) fn section(tag: CompactString) -> Self {
        Self {
            kind: FrameKind::Section,
            tag,
            templates: FxHashMap::default(),
            directly_nested: false,
        }
    }
}

// ========== Diagnostics ==========

/// Collects non-fatal warnings and forwards them to the log.
pub(crate) struct Diagnostics {
    filename: Option<CompactString>,
    warnings: Vec<CompileWarning>,
}

impl Diagnostics {
    fn new(filename: Option<CompactString>) -> Self {
        Self {
            filename,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn warn(&mut self, code: WarningCode, line: u32, message: String) {
        let warning = CompileWarning {
            code,
            line,
            filename: self.filename.clone(),
            message,
        };
        tracing::warn!(?code, "{warning}");
        self.warnings.push(warning);
    }
}

// ========== Parser ==========

/// The tag between `<name` and `>`
struct NodeState {
    element: ElementTemplate,
    /// Branch opened in the tag outside any attribute
    section: Option<TextSectionBuilder>,
}

struct AttrState {
    name: CompactString,
    /// Raw literal value, used until a marker shows up
    value: String,
    section: Option<TextSectionBuilder>,
}

/// Output of a finished parse
pub(crate) struct Parsed {
    pub(crate) renderer: MarkupRenderer,
    pub(crate) inline_partials: FxHashMap<CompactString, View>,
    pub(crate) warnings: Vec<CompileWarning>,
}

pub(crate) struct Parser<'o> {
    options: &'o CompileOptions,
    section: MarkupSectionBuilder,
    node: Option<NodeState>,
    attr: Option<AttrState>,
    frames: Vec<Frame>,
    namespaces: Vec<Namespace>,
    /// Builder for the children of `<style>` and friends
    text_content_only: Option<TextSectionBuilder>,
    inline_partials: FxHashMap<CompactString, View>,
    diagnostics: Diagnostics,
    last_line: u32,
}

impl<'o> Parser<'o> {
    pub(crate) fn new(options: &'o CompileOptions) -> Self {
        Self {
            options,
            section: MarkupSectionBuilder::new(),
            node: None,
            attr: None,
            frames: Vec::new(),
            namespaces: Vec::new(),
            text_content_only: None,
            inline_partials: FxHashMap::default(),
            diagnostics: Diagnostics::new(options.filename.clone()),
            last_line: 1,
        }
    }

    pub(crate) fn finish(self) -> Result<Parsed, CompileError> {
        let line = self.last_line;
        let filename = self.options.filename.clone();
        let renderer = self
            .section
            .compile()
            .map_err(|code| CompileError::new(code, line).with_filename(filename.as_deref()))?;
        Ok(Parsed {
            renderer,
            inline_partials: self.inline_partials,
            warnings: self.diagnostics.warnings,
        })
    }

    fn error(&self, code: ErrorCode, line: u32) -> CompileError {
        CompileError::new(code, line).with_filename(self.options.filename.as_deref())
    }

    /// Whether new content sits directly in a section or custom tag.
    fn is_directly_nested(&self) -> bool {
        self.frames
            .last()
            .map_or(true, |frame| !matches!(frame.kind, FrameKind::Element))
    }

    fn render_state(&self, line: u32) -> RenderState {
        RenderState {
            tag: self.node.as_ref().map(|node| node.element.tag.clone()),
            attr: self.attr.as_ref().map(|attr| attr.name.clone()),
            directly_nested: self.is_directly_nested(),
            text_content_only: self.text_content_only.is_some(),
            line,
            filename: self.options.filename.clone(),
        }
    }

    /// Register a closed `<view-template>` with its enclosing custom tag, or
    /// with the template's inline partials when it has none.
    fn define_template(&mut self, element: &ElementTemplate, body: Option<View>, line: u32) {
        let Some(name) = element.static_attr(TEMPLATE_NAME_ATTR) else {
            self.diagnostics.warn(
                WarningCode::MissingTemplateName,
                line,
                format!("<{TEMPLATE_DEFINITION_TAG}> without a {TEMPLATE_NAME_ATTR} attribute"),
            );
            return;
        };
        let Some(body) = body else {
            return;
        };
        match self.frames.last_mut() {
            Some(frame) if matches!(frame.kind, FrameKind::Custom(_)) => {
                frame.templates.insert(name.into(), body);
            }
            _ => {
                self.inline_partials.insert(name.into(), body);
            }
        }
    }

    fn special_else(&mut self, line: u32) -> Result<(), CompileError> {
        let result = if let Some(section) = self.attr.as_mut().and_then(|a| a.section.as_mut()) {
            section.inverse()
        } else if let Some(section) = self.node.as_mut().and_then(|n| n.section.as_mut()) {
            section.inverse()
        } else if let Some(section) = self.text_content_only.as_mut() {
            section.inverse()
        } else {
            self.section.inverse()
        };
        result.map_err(|code| self.error(code, line))
    }
}

impl Handler for Parser<'_> {
    type Error = CompileError;

    fn start(&mut self, tag: &str, unary: bool, line: u32) -> Result<(), CompileError> {
        self.last_line = line;
        let matched = namespace_uri_for_tag(tag).map(Namespace::from_uri);
        if let (Some(namespace), false) = (matched, unary) {
            self.namespaces.push(namespace);
        }
        let namespace = matched
            .or_else(|| self.namespaces.last().copied())
            .unwrap_or_default();
        self.node = Some(NodeState {
            element: ElementTemplate::new(tag, namespace),
            section: None,
        });
        Ok(())
    }

    fn end(&mut self, tag: &str, unary: bool, line: u32) -> Result<(), CompileError> {
        self.last_line = line;
        let Some(node) = self.node.take() else {
            return Ok(());
        };
        if node.section.is_some() {
            return Err(self.error(ErrorCode::UnbalancedSection, line).with_detail(format!("<{tag}>")));
        }

        let custom = self.options.callbacks.tag(tag);
        let directly_nested = self.is_directly_nested();
        let mut element = node.element;

        if unary {
            if let Some(handler) = custom {
                // A bodiless definition defines nothing
                if tag == TEMPLATE_DEFINITION_TAG {
                    return Ok(());
                }
                element.callbacks.insert(
                    0,
                    ElementCallback::CustomTag(CustomTagCallback {
                        handler,
                        tag: tag.into(),
                        subtemplate: None,
                        templates: None,
                        directly_nested,
                        line,
                    }),
                );
            }
            self.section.add(MarkupPart::Element(element));
            return Ok(());
        }

        self.section.push(element);
        let is_custom = custom.is_some();
        self.frames.push(Frame {
            kind: custom.map_or(FrameKind::Element, FrameKind::Custom),
            tag: tag.into(),
            templates: FxHashMap::default(),
            directly_nested,
        });
        if is_custom {
            self.section.start_sub_section();
        } else if is_text_content_only_tag(tag) {
            self.text_content_only = Some(TextSectionBuilder::new());
        }
        Ok(())
    }

    fn close(&mut self, tag: &str, line: u32) -> Result<(), CompileError> {
        self.last_line = line;
        if namespace_uri_for_tag(tag).is_some() {
            self.namespaces.pop();
        }

        let options = self.options;
        let unbalanced = || {
            CompileError::new(ErrorCode::UnbalancedSection, line)
                .with_detail(format!("</{tag}>"))
                .with_filename(options.filename.as_deref())
        };

        let frame = match self.frames.pop() {
            Some(frame) if !matches!(frame.kind, FrameKind::Section) => frame,
            _ => return Err(unbalanced()),
        };

        let body = if matches!(frame.kind, FrameKind::Custom(_)) {
            let content = self.section.end_sub_section().map_err(|_| unbalanced())?;
            (!content.is_empty()).then(|| View::section(content))
        } else {
            None
        };

        if is_text_content_only_tag(tag) {
            if let Some(text) = self.text_content_only.take() {
                let text = text.compile().map_err(|code| self.error(code, line))?;
                self.section.add(MarkupPart::TextBlock(text));
            }
        }

        let mut element = self.section.pop().ok_or_else(unbalanced)?;
        match frame.kind {
            FrameKind::Custom(_) if tag == TEMPLATE_DEFINITION_TAG => {
                self.define_template(&element, body, line);
            }
            FrameKind::Custom(handler) => {
                element.callbacks.insert(
                    0,
                    ElementCallback::CustomTag(CustomTagCallback {
                        handler,
                        tag: tag.into(),
                        subtemplate: body,
                        templates: Some(Arc::new(frame.templates)),
                        directly_nested: frame.directly_nested,
                        line,
                    }),
                );
                self.section.add(MarkupPart::Element(element));
            }
            FrameKind::Element | FrameKind::Section => {
                self.section.add(MarkupPart::Element(element));
            }
        }
        Ok(())
    }

    fn attr_start(&mut self, name: &str, line: u32) -> Result<(), CompileError> {
        self.last_line = line;
        let Some(node) = self.node.as_mut() else {
            return Ok(());
        };
        match node.section.as_mut() {
            Some(section) => {
                section.add_text(&format!("{name}=\""));
                section.set_quote_values(true);
            }
            None => {
                self.attr = Some(AttrState {
                    name: name.into(),
                    value: String::new(),
                    section: None,
                })
            }
        }
        Ok(())
    }

    fn attr_value(&mut self, value: &str, line: u32) -> Result<(), CompileError> {
        self.last_line = line;
        if let Some(section) = self.node.as_mut().and_then(|node| node.section.as_mut()) {
            // Re-read as attribute text at render time
            section.add_text(&value.replace('"', "&quot;"));
        } else if let Some(attr) = self.attr.as_mut() {
            match attr.section.as_mut() {
                Some(section) => section.add_text(&htmlize::unescape_attribute(value)),
                None => attr.value.push_str(value),
            }
        }
        Ok(())
    }

    fn attr_end(&mut self, name: &str, line: u32) -> Result<(), CompileError> {
        self.last_line = line;
        if let Some(section) = self.node.as_mut().and_then(|node| node.section.as_mut()) {
            section.set_quote_values(false);
            section.add_text("\" ");
            return Ok(());
        }
        let Some(attr) = self.attr.take() else {
            return Ok(());
        };

        let value = match attr.section {
            Some(section) => AttrValue::Dynamic(
                section
                    .compile()
                    .map_err(|code| self.error(code, line).with_detail(format!("{name}=")))?,
            ),
            None => AttrValue::Static(htmlize::unescape_attribute(attr.value.as_str()).into_owned()),
        };

        let handler = self.options.callbacks.attr(name);
        if handler.is_none() && is_binding_syntax(name) {
            self.diagnostics.warn(
                WarningCode::UnknownAttributeBinding,
                line,
                format!("unknown attribute binding {name}. Is a handler registered for it?"),
            );
        }

        let Some(node) = self.node.as_mut() else {
            return Ok(());
        };
        node.element.attrs.push(AttrTemplate {
            name: attr.name.clone(),
            value,
        });
        if let Some(handler) = handler {
            node.element.callbacks.push(ElementCallback::Attribute {
                handler,
                name: attr.name,
                line,
            });
        }
        Ok(())
    }

    fn chars(&mut self, text: &str, line: u32) -> Result<(), CompileError> {
        self.last_line = line;
        match self.text_content_only.as_mut() {
            Some(section) => section.add_text(text),
            None => self.section.add_text(&htmlize::unescape(text)),
        }
        Ok(())
    }

    fn special(&mut self, text: &str, line: u32) -> Result<(), CompileError> {
        self.last_line = line;
        let options = self.options;
        let expressions = options.expressions.as_ref();
        let (mode, expression) = expressions.split_mode(text);

        if expression == "else" {
            return self.special_else(line);
        }
        if mode == Mode::Comment {
            return Ok(());
        }

        let state = self.render_state(line);
        let unsupported = |mode: Mode| {
            CompileError::new(ErrorCode::UnsupportedInTag, line)
                .with_detail(mode.sigil())
                .with_filename(options.filename.as_deref())
        };

        // 1. Inside a branch opened in the tag
        if let Some(node) = self.node.as_mut() {
            if let Some(section) = node.section.as_mut() {
                if matches!(mode, Mode::Partial | Mode::InlineTemplate) {
                    return Err(unsupported(mode));
                }
                make_renderer_and_update_section(
                    section,
                    mode,
                    expression,
                    DispatchContext {
                        expressions,
                        state,
                        diagnostics: &mut self.diagnostics,
                        frames: None,
                        inline_partials: &mut self.inline_partials,
                    },
                )?;
                if section.sub_section_depth() == 0 {
                    if let Some(section) = node.section.take() {
                        let renderer = section.compile().map_err(|code| {
                            CompileError::new(code, line).with_filename(options.filename.as_deref())
                        })?;
                        node.element
                            .callbacks
                            .push(ElementCallback::AttributeText(renderer));
                    }
                }
                return Ok(());
            }
        }

        // 2. Inside an attribute value
        if let Some(attr) = self.attr.as_mut() {
            if attr.section.is_none() {
                let mut seeded = TextSectionBuilder::new();
                seeded.add_text(&htmlize::unescape_attribute(attr.value.as_str()));
                attr.section = Some(seeded);
            }
            if let Some(section) = attr.section.as_mut() {
                make_renderer_and_update_section(
                    section,
                    mode,
                    expression,
                    DispatchContext {
                        expressions,
                        state,
                        diagnostics: &mut self.diagnostics,
                        frames: None,
                        inline_partials: &mut self.inline_partials,
                    },
                )?;
            }
            return Ok(());
        }

        // 3. In the tag, outside any attribute
        if let Some(node) = self.node.as_mut() {
            match mode {
                Mode::Escaped => {
                    let expr = expressions.compile(mode, expression, &state)?;
                    node.element
                        .callbacks
                        .push(ElementCallback::AttributeText(TextRenderer::value(expr)));
                }
                Mode::Section | Mode::Inverse => {
                    let mut section = TextSectionBuilder::new();
                    make_renderer_and_update_section(
                        &mut section,
                        mode,
                        expression,
                        DispatchContext {
                            expressions,
                            state,
                            diagnostics: &mut self.diagnostics,
                            frames: None,
                            inline_partials: &mut self.inline_partials,
                        },
                    )?;
                    node.section = Some(section);
                }
                _ => return Err(unsupported(mode)),
            }
            return Ok(());
        }

        // 4. Content
        let cx = DispatchContext {
            expressions,
            state,
            diagnostics: &mut self.diagnostics,
            frames: None,
            inline_partials: &mut self.inline_partials,
        };
        match self.text_content_only.as_mut() {
            Some(section) => make_renderer_and_update_section(section, mode, expression, cx),
            None => make_renderer_and_update_section(
                &mut self.section,
                mode,
                expression,
                DispatchContext {
                    frames: Some(&mut self.frames),
                    ..cx
                },
            ),
        }
    }

    fn comment(&mut self, text: &str, line: u32) -> Result<(), CompileError> {
        self.last_line = line;
        self.section.add(MarkupPart::Comment(text.to_string()));
        Ok(())
    }

    fn done(&mut self, line: u32) -> Result<(), CompileError> {
        self.last_line = line;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_syntax() {
        for name in ["(click)", "{value}", "{(value)}", "on:click", "value:bind", "value:to", "a:to:on:b"] {
            assert!(is_binding_syntax(name), "{name} should look like a binding");
        }
        for name in ["class", "data-on", "aria-label", "xlink:href"] {
            assert!(!is_binding_syntax(name), "{name} should be literal");
        }
    }
}
