//! Carton - The artist's toolbox for Tessera.
//!
//! This crate holds the small pieces every other Tessera crate reaches for:
//! string and collection types, and the static tag tables the compiler
//! consults while it walks markup.
//!
//! # Example
//!
//! ```
//! use tessera_carton::{is_void_tag, namespace_uri_for_tag, CompactString};
//!
//! assert!(is_void_tag("br"));
//! assert_eq!(namespace_uri_for_tag("svg"), Some(tessera_carton::SVG_NAMESPACE));
//!
//! let tag = CompactString::from("div");
//! assert_eq!(tag.as_str(), "div");
//! ```

pub mod dom_tag_config;

// Re-export compact_str::CompactString for convenience
pub use compact_str::{format_compact, CompactString};

// Re-export smallvec for stack-optimized collections
pub use smallvec::{smallvec, SmallVec};

// Re-export rustc-hash for fast hash maps/sets
pub use rustc_hash::{FxHashMap, FxHashSet};

// Re-export phf for compile-time perfect hash functions
pub use phf::{phf_map, phf_set, Map as PhfMap, Set as PhfSet};

// Re-export shared utilities
pub use dom_tag_config::*;
