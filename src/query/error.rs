// SPDX-License-Identifier: MIT

//! Compile errors for search expressions

use thiserror::Error;

/// What went wrong while compiling an expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// Nothing but whitespace
    #[error("empty expression")]
    EmptyExpression,

    /// A `(` that is never closed
    #[error("unclosed group")]
    UnclosedGroup,

    /// A `)` with no matching `(`
    #[error("unexpected ')'")]
    UnexpectedCloseParen,

    /// An operator with nothing to apply to on its right
    #[error("missing operand")]
    MissingOperand,

    /// A `'` with no closing `'`
    #[error("unterminated quoted literal")]
    UnterminatedLiteral,

    /// Any other malformed construct
    #[error("unexpected {found}")]
    UnexpectedToken { found: String },
}

/// A failed compilation, located by character offset into the source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at offset {offset}, expected {expected}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub offset: usize,
    pub expected: &'static str,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, offset: usize, expected: &'static str) -> Self {
        Self {
            kind,
            offset,
            expected,
        }
    }

    pub fn unexpected(found: impl Into<String>, offset: usize, expected: &'static str) -> Self {
        Self::new(
            ParseErrorKind::UnexpectedToken {
                found: found.into(),
            },
            offset,
            expected,
        )
    }
}
