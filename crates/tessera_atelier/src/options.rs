//! Compiler options.

use std::fmt;
use std::sync::Arc;

use compact_str::CompactString;

use crate::callbacks::ViewCallbacks;
use crate::expression::{ExpressionFactory, MustacheExpressions};

/// Options for compiling one template
#[derive(Clone)]
pub struct CompileOptions {
    /// Name reported in errors, warnings and `scope.filename`
    pub filename: Option<CompactString>,

    /// Expression collaborator compiling `{{...}}` bodies
    pub expressions: Arc<dyn ExpressionFactory>,

    /// Custom tag and attribute handlers
    pub callbacks: Arc<ViewCallbacks>,

    /// Apply `{{- x -}}` whitespace control before tokenizing
    pub whitespace_control: bool,

    /// Drop lines holding only a standalone section marker
    pub standalone_lines: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            filename: None,
            expressions: MustacheExpressions::global(),
            callbacks: ViewCallbacks::global(),
            whitespace_control: true,
            standalone_lines: true,
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filename(mut self, filename: impl Into<CompactString>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_expressions(mut self, expressions: Arc<dyn ExpressionFactory>) -> Self {
        self.expressions = expressions;
        self
    }

    pub fn with_callbacks(mut self, callbacks: Arc<ViewCallbacks>) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Keep the template text exactly as written.
    pub fn raw_text(mut self) -> Self {
        self.whitespace_control = false;
        self.standalone_lines = false;
        self
    }
}

impl fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileOptions")
            .field("filename", &self.filename)
            .field("callbacks", &self.callbacks)
            .field("whitespace_control", &self.whitespace_control)
            .field("standalone_lines", &self.standalone_lines)
            .finish_non_exhaustive()
    }
}
