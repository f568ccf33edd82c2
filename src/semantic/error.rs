//! Semantic analysis error types.

use crate::ast::Loc;
use thiserror::Error;

/// A semantic error with location and description. Analysis stops at the
/// first one; there is no recovery.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SemanticError {
    /// Expected one type but found another.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: String,
        loc: Loc,
    },

    /// Binary operator applied to incompatible operand types.
    #[error("operator `{op}` cannot be applied to {l} and {r}")]
    InvalidBinaryOp {
        op: String,
        l: String,
        r: String,
        loc: Loc,
    },

    /// Unary operator applied to an incompatible operand type.
    #[error("operator `{op}` cannot be applied to {operand}")]
    InvalidUnaryOp {
        op: String,
        operand: String,
        loc: Loc,
    },

    /// Call to a name that is neither a FUNCTION nor a built-in.
    #[error("unknown function `{name}`")]
    UnknownFunction { name: String, loc: Loc },

    /// Call with the wrong number of arguments.
    #[error("function `{name}` takes {expected} arguments, found {found}")]
    ArgCount {
        name: String,
        expected: usize,
        found: usize,
        loc: Loc,
    },

    /// Argument type doesn't match the parameter.
    #[error("argument {position} of `{name}`: expected {expected}, found {found}")]
    ArgType {
        position: usize,
        name: String,
        expected: String,
        found: String,
        loc: Loc,
    },

    /// Assignment to a CONST.
    #[error("cannot assign to constant `{name}`")]
    AssignToConst { name: String, loc: Loc },

    /// Name declared twice in the same table.
    #[error("`{name}` is already defined")]
    Duplicate { name: String, loc: Loc },

    /// Indexing a non-array.
    #[error("`{name}` is not an array")]
    NotAnArray { name: String, loc: Loc },

    /// Array indexed with the wrong number of subscripts.
    #[error("array `{name}` has {expected} dimensions, found {found}")]
    DimCount {
        name: String,
        expected: usize,
        found: usize,
        loc: Loc,
    },

    /// The left side of an assignment is not a variable or array element.
    #[error("invalid assignment target")]
    InvalidTarget { loc: Loc },
}

impl SemanticError {
    /// The position this error is reported against.
    pub fn loc(&self) -> Loc {
        match self {
            SemanticError::TypeMismatch { loc, .. } => *loc,
            SemanticError::InvalidBinaryOp { loc, .. } => *loc,
            SemanticError::InvalidUnaryOp { loc, .. } => *loc,
            SemanticError::UnknownFunction { loc, .. } => *loc,
            SemanticError::ArgCount { loc, .. } => *loc,
            SemanticError::ArgType { loc, .. } => *loc,
            SemanticError::AssignToConst { loc, .. } => *loc,
            SemanticError::Duplicate { loc, .. } => *loc,
            SemanticError::NotAnArray { loc, .. } => *loc,
            SemanticError::DimCount { loc, .. } => *loc,
            SemanticError::InvalidTarget { loc } => *loc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_names_the_types() {
        let err = SemanticError::InvalidBinaryOp {
            op: "+".into(),
            l: "SINGLE".into(),
            r: "STRING".into(),
            loc: Loc::new(1, 7),
        };
        let text = err.to_string();
        assert!(text.contains("SINGLE"));
        assert!(text.contains("STRING"));
        assert_eq!(err.loc(), Loc::new(1, 7));
    }
}
