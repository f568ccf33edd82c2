//! Runtime error type.

use crate::ast::Loc;
use thiserror::Error;

/// A runtime failure, reported at the source position of the statement
/// that was executing.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct RuntimeError {
    /// The executing statement's source position.
    pub loc: Loc,
    /// What went wrong.
    pub message: String,
}

impl RuntimeError {
    /// Creates a runtime error at the given position.
    pub fn at(loc: Loc, message: impl Into<String>) -> Self {
        Self {
            loc,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_loc_and_message() {
        let err = RuntimeError::at(Loc::new(4, 1), "subscript out of range");
        assert_eq!(err.loc, Loc::new(4, 1));
        assert_eq!(err.to_string(), "subscript out of range");
    }
}
