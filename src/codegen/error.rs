//! Code generation error types.

use crate::ast::Loc;
use thiserror::Error;

/// A code generation failure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodegenError {
    /// NEXT with no open FOR to close.
    #[error("NEXT without FOR")]
    NextWithoutFor { loc: Loc },

    /// NEXT names a counter that doesn't match the innermost open FOR.
    #[error("NEXT counter `{found}` does not match FOR counter `{expected}`")]
    NextMismatch {
        expected: String,
        found: String,
        loc: Loc,
    },

    /// EXIT FOR with no open FOR.
    #[error("EXIT FOR outside of FOR")]
    ExitForOutsideFor { loc: Loc },

    /// EXIT DO with no open loop.
    #[error("EXIT DO outside of DO")]
    ExitDoOutsideLoop { loc: Loc },

    /// A FOR was never closed by a NEXT.
    #[error("FOR without NEXT")]
    UnclosedFor { loc: Loc },

    /// The same label was emitted twice in one scope.
    #[error("duplicate label `{name}`")]
    DuplicateLabel { name: String, loc: Loc },

    /// A jump references a label that was never emitted in its scope.
    #[error("undefined label `{name}`")]
    UndefinedLabel { name: String, loc: Loc },

    /// An AST node reached the generator without analysis results.
    #[error("internal: {message}")]
    Unresolved { message: String, loc: Loc },
}

impl CodegenError {
    /// The position this error is reported against.
    pub fn loc(&self) -> Loc {
        match self {
            CodegenError::NextWithoutFor { loc } => *loc,
            CodegenError::NextMismatch { loc, .. } => *loc,
            CodegenError::ExitForOutsideFor { loc } => *loc,
            CodegenError::ExitDoOutsideLoop { loc } => *loc,
            CodegenError::UnclosedFor { loc } => *loc,
            CodegenError::DuplicateLabel { loc, .. } => *loc,
            CodegenError::UndefinedLabel { loc, .. } => *loc,
            CodegenError::Unresolved { loc, .. } => *loc,
        }
    }
}
