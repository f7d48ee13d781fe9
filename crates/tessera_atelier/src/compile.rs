//! Top-level compile entry.

use std::borrow::Cow;

use tessera_armature::{clean_line_endings, clean_whitespace_control, tokenize};
use tessera_relief::{CompileError, CompileWarning};

use crate::options::CompileOptions;
use crate::parser::Parser;
use crate::view::View;

/// A compiled template and the warnings raised while compiling it
#[derive(Debug, Clone)]
pub struct Compiled {
    pub view: View,
    pub warnings: Vec<CompileWarning>,
}

/// Compile a template with default options.
///
/// Warnings are logged but not returned; use [`compile_with_options`] to
/// inspect them.
pub fn compile(filename: Option<&str>, template: &str) -> Result<View, CompileError> {
    let mut options = CompileOptions::default();
    options.filename = filename.map(Into::into);
    Ok(compile_with_options(template, &options)?.view)
}

/// Compile a template.
pub fn compile_with_options(
    template: &str,
    options: &CompileOptions,
) -> Result<Compiled, CompileError> {
    let mut text = Cow::Borrowed(template);
    if options.whitespace_control {
        text = Cow::Owned(clean_whitespace_control(&text));
    }
    if options.standalone_lines {
        text = Cow::Owned(clean_line_endings(&text));
    }

    let filename = options.filename.as_deref();
    let parsed = tokenize(&text, Parser::new(options))
        .and_then(Parser::finish)
        .map_err(|err| err.with_filename(filename))?;

    tracing::debug!(
        filename = filename.unwrap_or("<inline>"),
        inline_partials = parsed.inline_partials.len(),
        warnings = parsed.warnings.len(),
        "compiled template"
    );

    Ok(Compiled {
        view: View::template(
            parsed.renderer,
            parsed.inline_partials,
            options.filename.clone(),
        ),
        warnings: parsed.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tessera_relief::ErrorCode;

    #[test]
    fn test_compile_renders() {
        let view = compile(None, "<p>Hello {{name}}</p>").unwrap();
        assert_eq!(
            view.render_to_string(json!({ "name": "world" })).unwrap(),
            "<p>Hello world</p>"
        );
    }

    #[test]
    fn test_error_carries_filename() {
        let err = compile(Some("list.stache"), "{{#a}}").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnclosedSection);
        assert_eq!(err.filename.as_deref(), Some("list.stache"));
    }

    #[test]
    fn test_standalone_lines() {
        let template = "{{#a}}\nx\n{{/a}}";
        let data = json!({ "a": true });

        let cleaned = compile(None, template).unwrap();
        assert_eq!(cleaned.render_to_string(data.clone()).unwrap(), "x\n");

        let options = CompileOptions::default().raw_text();
        let raw = compile_with_options(template, &options).unwrap();
        assert_eq!(raw.view.render_to_string(data).unwrap(), "\nx\n");
    }
}
