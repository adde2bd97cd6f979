#![deny(missing_docs)]
//! demarkup core: node tree, permissive HTML parsing, structural
//! selectors, grammar composition, and the dispatch/render pipeline.

/// Arena-backed document tree.
pub mod dom;
/// Parsing, grammar, and conversion error types.
pub mod error;
/// Grammar composition: rules, whitelist, pre/post pipelines.
pub mod grammar;
/// Permissive HTML parsing.
pub mod parse;
/// Traversal/dispatch engine and conversion pipeline.
pub mod render;
/// Structural selectors for pre-processing rules.
pub mod selector;

pub use dom::{Descendants, NodeId, Tree};
pub use error::{ConvertError, GrammarError, ParseError, SelectorError};
pub use grammar::{Grammar, GrammarBuilder, Mutator, Replacement, TagHandler};
pub use parse::parse;
pub use render::{Renderer, convert};
pub use selector::Selector;
