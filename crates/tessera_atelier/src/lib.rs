//! Atelier - The Tessera template compiler workshop.
//!
//! This crate turns template text into a callable [`View`]:
//!
//! - A single streaming pass over tokenizer events builds nested sections
//! - Markup sections render into an output node tree, text sections into strings
//! - `{{...}}` bodies are compiled by a pluggable [`ExpressionFactory`]
//! - Custom tags and attribute bindings dispatch to [`ViewCallbacks`] at render time
//!
//! ```
//! use tessera_atelier::compile;
//! use serde_json::json;
//!
//! let view = compile(None, "<ul>{{#items}}<li>{{.}}</li>{{/items}}</ul>").unwrap();
//! let html = view.render_to_string(json!({ "items": ["a", "b"] })).unwrap();
//! assert_eq!(html, "<ul><li>a</li><li>b</li></ul>");
//! ```
//!
//! ## Name Origin
//!
//! An **atelier** is the workshop where the artist actually makes the piece.
//! Here the loose tesserae of a template are set into a finished mosaic.

pub mod callbacks;
pub mod compile;
mod dispatch;
pub mod expression;
pub mod options;
mod parser;
pub mod registry;
pub mod renderer;
pub mod scope;
pub(crate) mod section;
pub mod view;

pub use callbacks::{AttrData, AttrHandler, TagData, TagHandler, ViewCallbacks};
pub use compile::{compile, compile_with_options, Compiled};
pub use expression::{Branch, Expression, ExpressionFactory, Helper, HelperArgs, MustacheExpressions};
pub use options::CompileOptions;
pub use registry::{PartialTemplate, TemplateRegistry, TemplateSource};
pub use renderer::{MarkupRenderer, PartialRenderer, RenderState, TextRenderer};
pub use scope::{Scope, TemplateContext};
pub use view::View;

pub use tessera_relief::{
    CompileError, CompileWarning, Element, ErrorCode, Fragment, Mode, Namespace, Node, RenderError,
    RenderResult, WarningCode,
};
