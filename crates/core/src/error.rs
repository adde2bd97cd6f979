//! Error types for parsing, grammar definition, and conversion.
//!
//! The split mirrors the failure policy: grammar-definition problems
//! ([`GrammarError`]) are programmer errors and fail fast before any
//! conversion runs; conversion-time anomalies (unknown tags, links the
//! dialect cannot express) are not errors at all and resolve silently in
//! the engine. Only a parser failure surfaces at conversion time, and it
//! is propagated unmodified.

use thiserror::Error;

/// Errors produced while parsing raw markup into a tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A tag was opened with `<` but the input ended before its `>`.
    #[error("unterminated tag starting at byte {offset}")]
    UnterminatedTag {
        /// Byte offset of the `<` that opened the tag.
        offset: usize,
    },
    /// An attribute value was opened with a quote that never closes.
    #[error("unterminated attribute value starting at byte {offset}")]
    UnterminatedAttribute {
        /// Byte offset of the opening quote.
        offset: usize,
    },
}

/// Errors produced while parsing a structural selector.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// The selector contained no compound at all.
    #[error("selector is empty")]
    Empty,
    /// A character that cannot appear in a selector.
    #[error("unexpected character `{found}` at byte {offset}")]
    UnexpectedChar {
        /// The offending character.
        found: char,
        /// Byte offset of the character.
        offset: usize,
    },
    /// A `.` or `#` marker without a following name.
    #[error("`{marker}` must be followed by a name at byte {offset}")]
    MissingName {
        /// The marker missing its name (`.` or `#`).
        marker: char,
        /// Byte offset where the name was expected.
        offset: usize,
    },
}

/// Fatal grammar-definition errors, raised by `GrammarBuilder::build`.
#[derive(Debug, Error)]
pub enum GrammarError {
    /// A pre-processing selector failed to parse.
    #[error("invalid pre-processing selector `{selector}`")]
    Selector {
        /// The selector text as registered.
        selector: String,
        /// The underlying syntax error.
        #[source]
        source: SelectorError,
    },
    /// A post-processing pattern failed to compile.
    #[error("invalid post-processing pattern `{pattern}`")]
    Pattern {
        /// The pattern text as registered.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },
}

/// Errors surfaced by a full conversion run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConvertError {
    /// The input could not be parsed into a tree.
    #[error(transparent)]
    Parse(#[from] ParseError),
}
