//! Error types for the feature extraction engine.
//!
//! Only two error classes exist: parse failures reported by the external
//! parser, and structural rejections from the gate. Everything past the gate
//! resolves through feature defaults rather than errors.

use thiserror::Error;

use crate::image::ParseError;

/// Top-level error for an extraction attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// The external parser could not produce a structured view at all.
    #[error("parse failure: {0}")]
    Parse(String),

    /// The parsed view is missing the structures extraction requires.
    #[error("unusable image: {0}")]
    Rejected(String),
}

impl From<ParseError> for ExtractError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err.0)
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, ExtractError>;
