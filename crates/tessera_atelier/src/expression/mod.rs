//! The expression collaborator.
//!
//! The compiler never looks inside `{{...}}` bodies. It asks an
//! [`ExpressionFactory`] to split off the mode sigil and to compile the rest
//! into an [`Expression`], then wires that expression into a renderer.
//! [`MustacheExpressions`] is the default factory.

mod helpers;
mod mustache;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use smallvec::SmallVec;
use tessera_relief::{CompileError, Mode, RenderResult};

use crate::renderer::RenderState;
use crate::scope::Scope;

pub use helpers::{Helper, HelperArgs};
pub use mustache::MustacheExpressions;

/// Which body of a section to render
#[derive(Debug, Clone)]
pub enum Branch {
    /// Render the primary body once per scope
    Primary(SmallVec<[Scope; 1]>),
    /// Render the inverse body once in the current scope
    Inverse,
}

impl Branch {
    /// The primary body, rendered once in `scope`.
    pub fn once(scope: &Scope) -> Self {
        let mut scopes = SmallVec::new();
        scopes.push(scope.clone());
        Self::Primary(scopes)
    }
}

/// A compiled `{{...}}` body
pub trait Expression: Send + Sync + fmt::Debug {
    /// Evaluate as a value read or helper call.
    fn value(&self, scope: &Scope) -> RenderResult<Value>;

    /// Evaluate as the head of a section.
    fn branch(&self, scope: &Scope) -> RenderResult<Branch>;

    /// Name a matching `{{/...}}` is expected to repeat (`""` if any).
    fn closing_tag(&self) -> &str {
        ""
    }
}

/// Compiles `{{...}}` bodies into [`Expression`]s
pub trait ExpressionFactory: Send + Sync {
    /// Split the leading mode sigil from the expression body.
    ///
    /// `{{{x}}}` arrives as `{x}` and reads as an unescaped `x`.
    fn split_mode<'t>(&self, text: &'t str) -> (Mode, &'t str) {
        split_mode_from_expression(text)
    }

    fn compile(
        &self,
        mode: Mode,
        expression: &str,
        state: &RenderState,
    ) -> Result<Arc<dyn Expression>, CompileError>;
}

/// Default sigil split shared by factories.
pub fn split_mode_from_expression(text: &str) -> (Mode, &str) {
    let text = text.trim();
    let Some(first) = text.chars().next() else {
        return (Mode::Escaped, text);
    };
    let Some(mode) = Mode::from_sigil(first) else {
        return (Mode::Escaped, text);
    };
    let mut expression = &text[first.len_utf8()..];
    if first == '{' {
        expression = expression.strip_suffix('}').unwrap_or(expression);
    }
    (mode, expression.trim())
}

/// Mustache truthiness: `null`, `false`, `0`, `""` and `[]` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Text a value renders as.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}
