//! Compile errors, warnings and render errors.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fatal compile error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ErrorCode {
    /// A mode that cannot appear inside a tag outside any attribute
    UnsupportedInTag = 1,
    /// `{{/x}}` with no open section
    UnexpectedClose = 2,
    /// `{{else}}` with no open section
    StrayElse = 3,
    /// Sections and elements closed out of order
    UnbalancedSection = 4,
    /// End of template with sections still open
    UnclosedSection = 5,
    /// `{{<x}}` inside an attribute or text-only element
    InlinePartialInText = 6,
    /// The expression collaborator rejected the expression text
    InvalidExpression = 7,
}

impl ErrorCode {
    pub fn message(&self) -> &'static str {
        match self {
            Self::UnsupportedInTag => "is currently not supported within a tag.",
            Self::UnexpectedClose => "Closing tag without a matching open section.",
            Self::StrayElse => "{{else}} outside of a section.",
            Self::UnbalancedSection => "Section and element nesting do not match.",
            Self::UnclosedSection => "Template ended with an unclosed section.",
            Self::InlinePartialInText => "Inline templates can only be defined in markup.",
            Self::InvalidExpression => "Invalid expression.",
        }
    }
}

/// A fatal error raised while compiling a template
///
/// Displays as `filename:line: detail message`, dropping the filename and
/// detail when they are unset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{}: {}", filename_prefix(.filename), .line, describe(.code, .detail))]
pub struct CompileError {
    pub code: ErrorCode,
    /// 1-based line of the offending marker
    pub line: u32,
    pub filename: Option<CompactString>,
    /// Extra context, e.g. the offending expression
    pub detail: Option<String>,
}

impl CompileError {
    pub fn new(code: ErrorCode, line: u32) -> Self {
        Self {
            code,
            line,
            filename: None,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_filename(mut self, filename: Option<&str>) -> Self {
        if self.filename.is_none() {
            self.filename = filename.map(CompactString::from);
        }
        self
    }
}

fn filename_prefix(filename: &Option<CompactString>) -> String {
    filename
        .as_ref()
        .map(|filename| format!("{filename}:"))
        .unwrap_or_default()
}

fn describe(code: &ErrorCode, detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!("{detail} {}", code.message()),
        None => code.message().to_string(),
    }
}

/// Non-fatal diagnostic codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum WarningCode {
    /// `{{/y}}` closing a section opened as `{{#x}}`
    UnexpectedClosingTag = 1,
    /// Attribute looks like a binding but nothing handles it
    UnknownAttributeBinding = 2,
    /// Template definition without a name attribute
    MissingTemplateName = 3,
}

/// A non-fatal diagnostic. Never changes compiled output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileWarning {
    pub code: WarningCode,
    pub line: u32,
    pub filename: Option<CompactString>,
    pub message: String,
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.filename {
            Some(filename) => write!(f, "{}:{}: {}", filename, self.line, self.message),
            None => write!(f, "{}: {}", self.line, self.message),
        }
    }
}

/// Errors raised while invoking a compiled view
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("partial `{name}` was not found")]
    MissingPartial { name: String },

    #[error("partial `{name}` failed to compile: {source}")]
    PartialCompile {
        name: String,
        #[source]
        source: CompileError,
    },

    #[error("{line}: unknown helper `{name}`")]
    UnknownHelper { name: String, line: u32 },

    #[error("{line}: helper `{name}` failed: {message}")]
    HelperFailed {
        name: String,
        line: u32,
        message: String,
    },

    #[error("<{tag}> handler failed: {message}")]
    Handler { tag: String, message: String },
}

pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert!(!ErrorCode::UnsupportedInTag.message().is_empty());
        assert!(!ErrorCode::UnclosedSection.message().is_empty());
    }

    #[test]
    fn test_compile_error_display() {
        let err = CompileError::new(ErrorCode::UnsupportedInTag, 3)
            .with_detail(">")
            .with_filename(Some("list.stache"));
        assert_eq!(
            err.to_string(),
            "list.stache:3: > is currently not supported within a tag."
        );
        let err = CompileError::new(ErrorCode::StrayElse, 1);
        assert_eq!(err.to_string(), "1: {{else}} outside of a section.");
    }

    #[test]
    fn test_partial_compile_keeps_source() {
        use std::error::Error as _;

        let err = RenderError::PartialCompile {
            name: "row".into(),
            source: CompileError::new(ErrorCode::UnclosedSection, 2).with_filename(Some("#row")),
        };
        assert_eq!(
            err.to_string(),
            "partial `row` failed to compile: #row:2: Template ended with an unclosed section."
        );
        let source = err.source().and_then(|source| source.downcast_ref::<CompileError>());
        assert_eq!(source.map(|source| source.code), Some(ErrorCode::UnclosedSection));
    }

    #[test]
    fn test_with_filename_keeps_first() {
        let err = CompileError::new(ErrorCode::StrayElse, 1)
            .with_filename(Some("a"))
            .with_filename(Some("b"));
        assert_eq!(err.filename.as_deref(), Some("a"));
    }

    #[test]
    fn test_warning_display() {
        let warning = CompileWarning {
            code: WarningCode::UnexpectedClosingTag,
            line: 7,
            filename: None,
            message: "unexpected closing tag {{/b}} expected {{/a}}".into(),
        };
        assert_eq!(
            warning.to_string(),
            "7: unexpected closing tag {{/b}} expected {{/a}}"
        );
    }
}
