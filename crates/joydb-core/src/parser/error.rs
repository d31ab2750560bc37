//! Parser error types.

use crate::lexer::{Span, TokenKind};

/// A parse error naming the offending token and its location.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("at {line}:{column}: expected {expected}, found {found:?}")]
    UnexpectedToken {
        expected: String,
        found: TokenKind,
        line: usize,
        column: usize,
    },

    #[error("at {line}:{column}: unexpected end of input, expected {expected}")]
    UnexpectedEof {
        expected: String,
        line: usize,
        column: usize,
    },

    #[error("at {line}:{column}: invalid {kind} literal {value:?}: {reason}")]
    InvalidTypedLiteral {
        kind: &'static str,
        value: String,
        reason: String,
        line: usize,
        column: usize,
    },

    #[error("at {line}:{column}: {message}")]
    Custom {
        message: String,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    #[must_use]
    pub fn unexpected(expected: impl Into<String>, found: TokenKind, span: Span) -> Self {
        Self::UnexpectedToken {
            expected: expected.into(),
            found,
            line: span.line,
            column: span.column,
        }
    }

    #[must_use]
    pub fn unexpected_eof(expected: impl Into<String>, span: Span) -> Self {
        Self::UnexpectedEof {
            expected: expected.into(),
            line: span.line,
            column: span.column,
        }
    }

    #[must_use]
    pub fn invalid_typed_literal(
        kind: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::InvalidTypedLiteral {
            kind,
            value: value.into(),
            reason: reason.into(),
            line: span.line,
            column: span.column,
        }
    }

    #[must_use]
    pub fn custom(message: impl Into<String>, span: Span) -> Self {
        Self::Custom {
            message: message.into(),
            line: span.line,
            column: span.column,
        }
    }
}

pub type Result<T> = core::result::Result<T, ParseError>;
