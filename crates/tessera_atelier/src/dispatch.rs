//! Renderer mode dispatch.
//!
//! Turns one `{{...}}` marker into a renderer and applies it to a section
//! builder. The same table drives markup and text builders; only markup
//! builders carry the frame stack used for closing-tag diagnostics.

use compact_str::CompactString;
use rustc_hash::FxHashMap;
use tessera_relief::{CompileError, ErrorCode, Mode, WarningCode};

use crate::expression::ExpressionFactory;
use crate::parser::{Diagnostics, Frame, FrameKind};
use crate::renderer::{PartialRenderer, RenderState};
use crate::section::{Opener, SectionBuilder};
use crate::view::View;

pub(crate) struct DispatchContext<'a> {
    pub(crate) expressions: &'a dyn ExpressionFactory,
    pub(crate) state: RenderState,
    pub(crate) diagnostics: &'a mut Diagnostics,
    /// Present only when dispatching into the markup tree
    pub(crate) frames: Option<&'a mut Vec<Frame>>,
    pub(crate) inline_partials: &'a mut FxHashMap<CompactString, View>,
}

impl DispatchContext<'_> {
    fn error(&self, code: ErrorCode) -> CompileError {
        CompileError::new(code, self.state.line).with_filename(self.state.filename.as_deref())
    }
}

pub(crate) fn make_renderer_and_update_section<B: SectionBuilder>(
    section: &mut B,
    mode: Mode,
    expression: &str,
    cx: DispatchContext<'_>,
) -> Result<(), CompileError> {
    match mode {
        Mode::Partial => {
            let (name, context) = match expression.split_once(char::is_whitespace) {
                Some((name, context)) => (name, context.trim()),
                None => (expression, ""),
            };
            if name.is_empty() {
                return Err(cx.error(ErrorCode::InvalidExpression).with_detail("`>`"));
            }
            let context = if context.is_empty() {
                None
            } else {
                Some(cx.expressions.compile(Mode::Escaped, context, &cx.state)?)
            };
            section.add_partial(PartialRenderer::new(name, context));
        }

        Mode::Close => close_section(section, expression, cx)?,

        Mode::Unescaped | Mode::Escaped => {
            let expr = cx.expressions.compile(mode, expression, &cx.state)?;
            section.add_value(expr, mode == Mode::Escaped);
        }

        Mode::Section | Mode::Inverse => {
            let expr = cx.expressions.compile(mode, expression, &cx.state)?;
            let tag = CompactString::from(expr.closing_tag());
            section
                .start_section(Opener::Branch { mode, expr })
                .map_err(|code| cx.error(code))?;
            if let Some(frames) = cx.frames {
                frames.push(Frame::section(tag));
            }
        }

        Mode::InlineTemplate => {
            let name = CompactString::from(expression);
            section
                .start_section(Opener::InlineTemplate { name: name.clone() })
                .map_err(|code| cx.error(code))?;
            if let Some(frames) = cx.frames {
                frames.push(Frame::section(name));
            }
        }

        // Comments are dropped before dispatch
        Mode::Comment => {}
    }
    Ok(())
}

fn close_section<B: SectionBuilder>(
    section: &mut B,
    expression: &str,
    cx: DispatchContext<'_>,
) -> Result<(), CompileError> {
    let detail = || format!("{{{{/{expression}}}}}");

    if section.last_started_with() == Some(Mode::InlineTemplate) {
        let (name, renderer) = section
            .end_inline_template()
            .map_err(|code| cx.error(code).with_detail(detail()))?;
        let key = if expression.is_empty() {
            name
        } else {
            CompactString::from(expression)
        };
        tracing::debug!(name = %key, "defined inline partial");
        cx.inline_partials.insert(key, View::section(renderer));
    } else {
        section
            .end_section()
            .map_err(|code| cx.error(code).with_detail(detail()))?;
    }

    let Some(frames) = cx.frames else {
        return Ok(());
    };
    if let Some(frame) = frames.last() {
        if matches!(frame.kind, FrameKind::Section) {
            if !frame.tag.is_empty() && !expression.is_empty() && expression != frame.tag {
                cx.diagnostics.warn(
                    WarningCode::UnexpectedClosingTag,
                    cx.state.line,
                    format!(
                        "unexpected closing tag {{{{/{expression}}}}} expected {{{{/{}}}}}",
                        frame.tag
                    ),
                );
            }
            frames.pop();
        }
    }
    Ok(())
}
