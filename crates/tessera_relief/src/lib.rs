//! Relief - The rendered surface of Tessera templates.
//!
//! This crate defines what the compiler produces and reports:
//!
//! - [`Mode`]: the closed set of template-expression sigils
//! - [`dom`]: the output tree rendered views build (`Node`, `Element`, `Fragment`)
//! - [`errors`]: fatal compile errors, non-fatal warnings and render-time errors
//!
//! ## Name Origin
//!
//! A **relief** is a sculpture raised from a flat surface. Here it is the
//! surface a compiled template raises from data.

pub mod dom;
pub mod errors;
pub mod mode;

pub use dom::{Element, Fragment, Namespace, Node};
pub use errors::{
    CompileError, CompileWarning, ErrorCode, RenderError, RenderResult, WarningCode,
};
pub use mode::Mode;
