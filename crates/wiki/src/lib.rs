#![deny(missing_docs)]
//! Wiki-markup rendition of HTML documents.
//!
//! Builds on `demarkup-core`'s grammar engine: headings and paragraphs
//! get thin rules, anchors go through the [`links`] classifier, and a
//! post-processing pass keeps the output's vertical whitespace tidy.

/// Link and anchor classification.
pub mod links;
/// The wiki grammar definition and conversion entry points.
pub mod rules;

pub use links::{LinkRendering, LinkShape, classify};
pub use rules::{build_grammar, to_wiki, wiki_grammar};
