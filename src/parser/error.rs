//! Parser error types.

use crate::ast::Loc;
use thiserror::Error;

/// A parse error with location and description.
///
/// The parser stops at the first error; there is no recovery.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Expected a specific token but found something else.
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        loc: Loc,
    },

    /// Reached end of input unexpectedly.
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String, loc: Loc },

    /// General syntax error.
    #[error("{message}")]
    Syntax { message: String, loc: Loc },
}

impl ParseError {
    /// The position this error is reported against.
    pub fn loc(&self) -> Loc {
        match self {
            ParseError::UnexpectedToken { loc, .. } => *loc,
            ParseError::UnexpectedEof { loc, .. } => *loc,
            ParseError::Syntax { loc, .. } => *loc,
        }
    }

    /// Creates an "unexpected token" error.
    pub fn unexpected(expected: impl Into<String>, found: impl Into<String>, loc: Loc) -> Self {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: found.into(),
            loc,
        }
    }

    /// Creates a syntax error with a message.
    pub fn syntax(message: impl Into<String>, loc: Loc) -> Self {
        ParseError::Syntax {
            message: message.into(),
            loc,
        }
    }
}
