//! Section builders.
//!
//! A builder is a stack of open sections. Branch markers (`#`, `^`, `<`)
//! push a section and `{{/...}}` pops it into its parent. Both builders
//! accept the same operations so the mode dispatcher can drive either one.

mod markup;
mod text;

use std::sync::Arc;

use compact_str::CompactString;
use tessera_relief::{ErrorCode, Mode};

use crate::expression::Expression;
use crate::renderer::{MarkupRenderer, PartialRenderer};

pub(crate) use markup::MarkupSectionBuilder;
pub(crate) use text::TextSectionBuilder;

/// What opened a section
pub(crate) enum Opener {
    /// `{{#x}}` or `{{^x}}`
    Branch {
        mode: Mode,
        expr: Arc<dyn Expression>,
    },
    /// `{{<name}}`
    InlineTemplate { name: CompactString },
    /// Buffered content of a custom tag
    Sub,
}

impl Opener {
    pub(crate) fn started_with(&self) -> Option<Mode> {
        match self {
            Self::Branch { mode, .. } => Some(*mode),
            Self::InlineTemplate { .. } => Some(Mode::InlineTemplate),
            Self::Sub => None,
        }
    }
}

pub(crate) trait SectionBuilder {
    /// Append literal text.
    fn add_text(&mut self, text: &str);

    /// Append a value read; `escape` is ignored by text output.
    fn add_value(&mut self, expr: Arc<dyn Expression>, escape: bool);

    fn add_partial(&mut self, partial: PartialRenderer);

    fn start_section(&mut self, opener: Opener) -> Result<(), ErrorCode>;

    /// Close the innermost branch and attach it to its parent.
    fn end_section(&mut self) -> Result<(), ErrorCode>;

    /// Close the innermost inline template and hand it back detached.
    fn end_inline_template(&mut self) -> Result<(CompactString, MarkupRenderer), ErrorCode>;

    /// Switch the innermost branch to its inverse body.
    fn inverse(&mut self) -> Result<(), ErrorCode>;

    fn last_started_with(&self) -> Option<Mode>;

    /// Number of open sections above the root.
    fn sub_section_depth(&self) -> usize;

    fn is_markup(&self) -> bool;
}
