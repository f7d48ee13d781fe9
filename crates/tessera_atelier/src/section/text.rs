//! String-producing section builder.

use std::sync::Arc;

use compact_str::CompactString;
use tessera_relief::{ErrorCode, Mode};

use super::{Opener, SectionBuilder};
use crate::expression::Expression;
use crate::renderer::{
    push_text_part, MarkupRenderer, PartialRenderer, SectionRenderer, TextPart, TextRenderer,
};

struct TextSection {
    /// Head of the branch, `None` for the root
    branch: Option<(Mode, Arc<dyn Expression>)>,
    primary: Vec<TextPart>,
    inverse: Option<Vec<TextPart>>,
}

impl TextSection {
    fn new(branch: Option<(Mode, Arc<dyn Expression>)>) -> Self {
        Self {
            branch,
            primary: Vec::new(),
            inverse: None,
        }
    }

    fn target(&mut self) -> &mut Vec<TextPart> {
        match &mut self.inverse {
            Some(inverse) => inverse,
            None => &mut self.primary,
        }
    }
}

pub(crate) struct TextSectionBuilder {
    root: TextSection,
    stack: Vec<TextSection>,
    /// Entity-encode escaped reads, for output parsed back into attributes
    quote_values: bool,
}

impl TextSectionBuilder {
    pub(crate) fn new() -> Self {
        Self {
            root: TextSection::new(None),
            stack: Vec::new(),
            quote_values: false,
        }
    }

    pub(crate) fn set_quote_values(&mut self, quote_values: bool) {
        self.quote_values = quote_values;
    }

    fn add(&mut self, part: TextPart) {
        let section = self.stack.last_mut().unwrap_or(&mut self.root);
        push_text_part(section.target(), part);
    }

    pub(crate) fn compile(self) -> Result<TextRenderer, ErrorCode> {
        if !self.stack.is_empty() {
            return Err(ErrorCode::UnclosedSection);
        }
        Ok(TextRenderer::new(self.root.primary))
    }
}

impl SectionBuilder for TextSectionBuilder {
    fn add_text(&mut self, text: &str) {
        if !text.is_empty() {
            self.add(TextPart::Static(text.to_string()));
        }
    }

    fn add_value(&mut self, expr: Arc<dyn Expression>, escape: bool) {
        if escape && self.quote_values {
            self.add(TextPart::QuotedValue(expr));
        } else {
            self.add(TextPart::Value(expr));
        }
    }

    fn add_partial(&mut self, partial: PartialRenderer) {
        self.add(TextPart::Partial(partial));
    }

    fn start_section(&mut self, opener: Opener) -> Result<(), ErrorCode> {
        match opener {
            Opener::Branch { mode, expr } => {
                self.stack.push(TextSection::new(Some((mode, expr))));
                Ok(())
            }
            Opener::InlineTemplate { .. } | Opener::Sub => Err(ErrorCode::InlinePartialInText),
        }
    }

    fn end_section(&mut self) -> Result<(), ErrorCode> {
        let section = self.stack.pop().ok_or(ErrorCode::UnexpectedClose)?;
        let Some((_, expr)) = section.branch else {
            return Err(ErrorCode::UnexpectedClose);
        };
        self.add(TextPart::Section(SectionRenderer {
            expr,
            primary: TextRenderer::new(section.primary),
            inverse: section.inverse.map(TextRenderer::new),
        }));
        Ok(())
    }

    fn end_inline_template(&mut self) -> Result<(CompactString, MarkupRenderer), ErrorCode> {
        Err(ErrorCode::InlinePartialInText)
    }

    fn inverse(&mut self) -> Result<(), ErrorCode> {
        let section = self.stack.last_mut().ok_or(ErrorCode::StrayElse)?;
        section.inverse.get_or_insert_with(Vec::new);
        Ok(())
    }

    fn last_started_with(&self) -> Option<Mode> {
        self.stack
            .last()
            .and_then(|section| section.branch.as_ref())
            .map(|(mode, _)| *mode)
    }

    fn sub_section_depth(&self) -> usize {
        self.stack.len()
    }

    fn is_markup(&self) -> bool {
        false
    }
}
