//! Error types for cfpq-core.

use thiserror::Error;

/// Errors surfaced by the automaton, grammar and query layers.
///
/// None of these are transient: they signal malformed input or a broken
/// internal invariant and are returned to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CfpqError {
    /// A production still has an illegal shape after normalization.
    #[error("production is not in weak normal form: {production}")]
    GrammarForm { production: String },

    /// Matrix shapes do not fit the requested operation.
    #[error("dimension mismatch: {left:?} vs {right:?}")]
    DimensionMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    /// A query names a variable or box that does not exist.
    #[error("undefined symbol: {0}")]
    UndefinedSymbol(String),

    /// A regular expression could not be parsed.
    #[error("regex error at byte {position}: {message}")]
    RegexSyntax { position: usize, message: String },
}

impl CfpqError {
    pub fn grammar_form(production: impl Into<String>) -> Self {
        CfpqError::GrammarForm {
            production: production.into(),
        }
    }

    pub fn dimension_mismatch(left: (usize, usize), right: (usize, usize)) -> Self {
        CfpqError::DimensionMismatch { left, right }
    }

    pub fn undefined(symbol: impl Into<String>) -> Self {
        CfpqError::UndefinedSymbol(symbol.into())
    }

    pub fn regex(position: usize, message: impl Into<String>) -> Self {
        CfpqError::RegexSyntax {
            position,
            message: message.into(),
        }
    }
}

/// Result type alias for cfpq operations.
pub type Result<T> = std::result::Result<T, CfpqError>;
