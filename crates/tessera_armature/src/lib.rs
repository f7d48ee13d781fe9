//! Armature - The structural tokenizer for Tessera templates.
//!
//! The tokenizer segments raw template text into typed events (element
//! open/close, attribute start/value/end, text, comments and `{{...}}`
//! markers) and drives a [`Handler`] table with them. It knows nothing about
//! what the markers mean; that is the compiler's job.
//!
//! [`whitespace`] holds the text cleaning that runs before tokenizing.

pub mod tokenizer;
pub mod whitespace;

pub use tokenizer::{tokenize, Handler, Tokenizer};
pub use whitespace::{clean_line_endings, clean_whitespace_control};
