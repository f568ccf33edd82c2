//! Expression AST nodes.
//!
//! Expression precedence, from lowest to highest as the parser binds them:
//!
//! 1. `OR`
//! 2. `AND`
//! 3. `NOT`
//! 4. Relational: `=`, `<>`, `<`, `<=`, `>`, `>=`
//! 5. Additive: `+`, `-`
//! 6. Multiplicative: `*`, `/`
//! 7. Integer division: `\`
//! 8. `MOD`
//! 9. Unary `-`
//! 10. Exponentiation: `^` (right-associative)
//! 11. Primary: literals, variables, calls, parenthesized expressions

use super::Loc;
use crate::semantic::symbols::Storage;
use crate::semantic::types::Ty;
use serde::{Deserialize, Serialize};

/// An expression with its source location and (after analysis) its type.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// The kind of expression.
    pub kind: ExprKind,
    /// Source location of this expression.
    pub loc: Loc,
    /// The expression's type; `None` until semantic analysis runs.
    pub ty: Option<Ty>,
}

impl Expr {
    /// Creates a new, untyped expression.
    pub fn new(kind: ExprKind, loc: Loc) -> Self {
        Self {
            kind,
            loc,
            ty: None,
        }
    }

    /// The analyzed type of this expression.
    ///
    /// Panics if analysis has not run; every expression in an analyzed
    /// tree has a type.
    pub fn ty(&self) -> &Ty {
        self.ty.as_ref().expect("expression not analyzed")
    }
}

/// The different kinds of expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Numeric literal: `42`, `3.14`, `1.5E3`
    NumberLit(f64),

    /// String literal with the quotes already stripped: `"HELLO"`
    StringLit(String),

    /// Variable reference: `x`, `name$`, `total&`
    ///
    /// `storage` is resolved by the analyzer. A reference that turns out to
    /// name a nullary FUNCTION is rewritten in place into an `FnCall`.
    VarRef {
        name: String,
        storage: Option<Storage>,
    },

    /// Function call or array element access: `f(a, b)`, `A(i, j)`.
    ///
    /// The two are syntactically identical; the analyzer decides. When the
    /// name resolves to an array symbol, `storage` is set and the call is
    /// an element access; otherwise the name must be a FUNCTION or a
    /// built-in and `storage` stays `None`.
    FnCall {
        name: String,
        args: Vec<Expr>,
        storage: Option<Storage>,
    },

    /// Binary operation: `l op r`
    Binary {
        op: BinOp,
        l: Box<Expr>,
        r: Box<Expr>,
    },

    /// Unary operation: negation, NOT, or grouping parentheses.
    ///
    /// Parentheses are kept as a node so lowering preserves the grouping.
    Unary { op: UnOp, r: Box<Expr> },
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    /// `+` addition, also string concatenation
    Add,
    /// `-` subtraction
    Sub,
    /// `*` multiplication
    Mul,
    /// `/` division
    Div,
    /// `\` integer division (floored)
    IntDiv,
    /// `MOD` remainder
    Mod,
    /// `^` exponentiation (right-associative)
    Pow,
    /// `=` equality
    Eq,
    /// `<>` inequality
    Ne,
    /// `<` less than
    Lt,
    /// `<=` less than or equal
    Lte,
    /// `>` greater than
    Gt,
    /// `>=` greater than or equal
    Gte,
    /// `AND` bitwise/logical and
    And,
    /// `OR` bitwise/logical or
    Or,
}

impl BinOp {
    /// Source spelling of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::IntDiv => "\\",
            BinOp::Mod => "MOD",
            BinOp::Pow => "^",
            BinOp::Eq => "=",
            BinOp::Ne => "<>",
            BinOp::Lt => "<",
            BinOp::Lte => "<=",
            BinOp::Gt => ">",
            BinOp::Gte => ">=",
            BinOp::And => "AND",
            BinOp::Or => "OR",
        }
    }

    /// True for the relational operators.
    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Lte | BinOp::Gt | BinOp::Gte
        )
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    /// `-` numeric negation
    Neg,
    /// `NOT` bitwise/logical not
    Not,
    /// `( ... )` grouping, preserved through lowering
    Parens,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binop_spelling() {
        assert_eq!(BinOp::IntDiv.as_str(), "\\");
        assert_eq!(BinOp::Mod.as_str(), "MOD");
        assert_eq!(BinOp::Ne.as_str(), "<>");
    }

    #[test]
    fn relational_ops() {
        assert!(BinOp::Eq.is_relational());
        assert!(BinOp::Gte.is_relational());
        assert!(!BinOp::Add.is_relational());
        assert!(!BinOp::And.is_relational());
    }

    #[test]
    fn new_expr_is_untyped() {
        let e = Expr::new(ExprKind::NumberLit(1.0), Loc::new(1, 1));
        assert!(e.ty.is_none());
    }
}
