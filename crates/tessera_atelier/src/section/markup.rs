//! Node-producing section builder.
//!
//! Each open section keeps its own stack of open elements. Content goes to
//! the innermost open element of the innermost section, or to the section
//! body when no element is open there. An element therefore has to close in
//! the same section it opened in.

use std::sync::Arc;

use compact_str::CompactString;
use tessera_relief::{ErrorCode, Mode};

use super::{Opener, SectionBuilder};
use crate::expression::Expression;
use crate::renderer::{
    push_markup_part, ElementTemplate, MarkupPart, MarkupRenderer, PartialRenderer,
    SectionRenderer,
};

struct MarkupSection {
    /// `None` for the root
    opener: Option<Opener>,
    primary: Vec<MarkupPart>,
    inverse: Option<Vec<MarkupPart>>,
    open_elements: Vec<ElementTemplate>,
}

impl MarkupSection {
    fn new(opener: Option<Opener>) -> Self {
        Self {
            opener,
            primary: Vec::new(),
            inverse: None,
            open_elements: Vec::new(),
        }
    }

    fn target(&mut self) -> &mut Vec<MarkupPart> {
        if let Some(element) = self.open_elements.last_mut() {
            return &mut element.children;
        }
        match &mut self.inverse {
            Some(inverse) => inverse,
            None => &mut self.primary,
        }
    }
}

pub(crate) struct MarkupSectionBuilder {
    root: MarkupSection,
    stack: Vec<MarkupSection>,
}

impl MarkupSectionBuilder {
    pub(crate) fn new() -> Self {
        Self {
            root: MarkupSection::new(None),
            stack: Vec::new(),
        }
    }

    fn top(&mut self) -> &mut MarkupSection {
        self.stack.last_mut().unwrap_or(&mut self.root)
    }

    pub(crate) fn add(&mut self, part: MarkupPart) {
        push_markup_part(self.top().target(), part);
    }

    /// Open an element; content goes into it until [`Self::pop`].
    pub(crate) fn push(&mut self, element: ElementTemplate) {
        self.top().open_elements.push(element);
    }

    /// Detach the innermost element opened in the current section.
    pub(crate) fn pop(&mut self) -> Option<ElementTemplate> {
        self.top().open_elements.pop()
    }

    /// Start buffering a custom tag's content.
    pub(crate) fn start_sub_section(&mut self) {
        self.stack.push(MarkupSection::new(Some(Opener::Sub)));
    }

    /// Stop buffering and return the content compiled.
    pub(crate) fn end_sub_section(&mut self) -> Result<MarkupRenderer, ErrorCode> {
        if !matches!(self.stack.last(), Some(section) if matches!(section.opener, Some(Opener::Sub)))
        {
            return Err(ErrorCode::UnbalancedSection);
        }
        let section = self.pop_section()?;
        Ok(MarkupRenderer::new(section.primary))
    }

    fn pop_section(&mut self) -> Result<MarkupSection, ErrorCode> {
        let section = self.stack.pop().ok_or(ErrorCode::UnexpectedClose)?;
        if !section.open_elements.is_empty() {
            return Err(ErrorCode::UnbalancedSection);
        }
        Ok(section)
    }

    pub(crate) fn compile(self) -> Result<MarkupRenderer, ErrorCode> {
        if !self.stack.is_empty() || !self.root.open_elements.is_empty() {
            return Err(ErrorCode::UnclosedSection);
        }
        Ok(MarkupRenderer::new(self.root.primary))
    }
}

impl SectionBuilder for MarkupSectionBuilder {
    fn add_text(&mut self, text: &str) {
        if !text.is_empty() {
            self.add(MarkupPart::Text(text.to_string()));
        }
    }

    fn add_value(&mut self, expr: Arc<dyn Expression>, escape: bool) {
        self.add(MarkupPart::Value { expr, escape });
    }

    fn add_partial(&mut self, partial: PartialRenderer) {
        self.add(MarkupPart::Partial(partial));
    }

    fn start_section(&mut self, opener: Opener) -> Result<(), ErrorCode> {
        self.stack.push(MarkupSection::new(Some(opener)));
        Ok(())
    }

    fn end_section(&mut self) -> Result<(), ErrorCode> {
        match self.stack.last().map(|section| &section.opener) {
            None => return Err(ErrorCode::UnexpectedClose),
            Some(Some(Opener::Branch { .. })) => {}
            Some(_) => return Err(ErrorCode::UnbalancedSection),
        }
        let section = self.pop_section()?;
        let Some(Opener::Branch { expr, .. }) = section.opener else {
            return Err(ErrorCode::UnbalancedSection);
        };
        self.add(MarkupPart::Section(SectionRenderer {
            expr,
            primary: MarkupRenderer::new(section.primary),
            inverse: section.inverse.map(MarkupRenderer::new),
        }));
        Ok(())
    }

    fn end_inline_template(&mut self) -> Result<(CompactString, MarkupRenderer), ErrorCode> {
        if !matches!(
            self.stack.last(),
            Some(section) if matches!(section.opener, Some(Opener::InlineTemplate { .. }))
        ) {
            return Err(ErrorCode::UnbalancedSection);
        }
        let section = self.pop_section()?;
        let Some(Opener::InlineTemplate { name }) = section.opener else {
            return Err(ErrorCode::UnbalancedSection);
        };
        Ok((name, MarkupRenderer::new(section.primary)))
    }

    fn inverse(&mut self) -> Result<(), ErrorCode> {
        let Some(section) = self.stack.last_mut() else {
            return Err(ErrorCode::StrayElse);
        };
        if matches!(
            section.opener,
            Some(Opener::Sub | Opener::InlineTemplate { .. })
        ) {
            return Err(ErrorCode::StrayElse);
        }
        if !section.open_elements.is_empty() {
            return Err(ErrorCode::UnbalancedSection);
        }
        section.inverse.get_or_insert_with(Vec::new);
        Ok(())
    }

    fn last_started_with(&self) -> Option<Mode> {
        self.stack
            .last()
            .and_then(|section| section.opener.as_ref())
            .and_then(Opener::started_with)
    }

    fn sub_section_depth(&self) -> usize {
        self.stack.len()
    }

    fn is_markup(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;
    use tessera_relief::Namespace;

    fn render(renderer: &MarkupRenderer) -> String {
        let mut nodes = Vec::new();
        renderer
            .render(&Scope::new(serde_json::json!({})), &mut nodes)
            .unwrap();
        tessera_relief::Fragment::from(nodes).to_html()
    }

    #[test]
    fn test_elements_nest() {
        let mut builder = MarkupSectionBuilder::new();
        builder.push(ElementTemplate::new("ul", Namespace::Html));
        builder.push(ElementTemplate::new("li", Namespace::Html));
        builder.add_text("a");
        builder.add_text("b");
        let li = builder.pop().unwrap();
        builder.add(MarkupPart::Element(li));
        let ul = builder.pop().unwrap();
        builder.add(MarkupPart::Element(ul));
        assert_eq!(render(&builder.compile().unwrap()), "<ul><li>ab</li></ul>");
    }

    #[test]
    fn test_sub_section_is_detached() {
        let mut builder = MarkupSectionBuilder::new();
        builder.add_text("before");
        builder.start_sub_section();
        builder.add_text("inside");
        assert_eq!(builder.sub_section_depth(), 1);
        let content = builder.end_sub_section().unwrap();
        assert_eq!(render(&content), "inside");
        assert_eq!(render(&builder.compile().unwrap()), "before");
    }

    #[test]
    fn test_structural_errors() {
        let mut builder = MarkupSectionBuilder::new();
        assert_eq!(builder.end_section(), Err(ErrorCode::UnexpectedClose));
        assert_eq!(builder.inverse(), Err(ErrorCode::StrayElse));

        builder.start_sub_section();
        assert_eq!(builder.end_section(), Err(ErrorCode::UnbalancedSection));
        builder.push(ElementTemplate::new("div", Namespace::Html));
        assert_eq!(builder.end_sub_section().err(), Some(ErrorCode::UnbalancedSection));
    }

    #[test]
    fn test_inline_template_has_no_inverse() {
        let mut builder = MarkupSectionBuilder::new();
        builder
            .start_section(Opener::InlineTemplate { name: "t".into() })
            .unwrap();
        builder.add_text("A");
        assert_eq!(builder.inverse(), Err(ErrorCode::StrayElse));
        let (name, body) = builder.end_inline_template().unwrap();
        assert_eq!(name, "t");
        assert_eq!(render(&body), "A");
    }

    #[test]
    fn test_unclosed_section() {
        let mut builder = MarkupSectionBuilder::new();
        builder.start_sub_section();
        assert_eq!(builder.compile().err(), Some(ErrorCode::UnclosedSection));
    }

    #[test]
    fn test_elements_close_in_their_section() {
        let mut builder = MarkupSectionBuilder::new();
        builder.push(ElementTemplate::new("div", Namespace::Html));
        builder.start_sub_section();
        assert!(builder.pop().is_none());
    }
}
