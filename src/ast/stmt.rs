//! Statement AST nodes.
//!
//! Most statements are self-contained, but FOR and NEXT are deliberately
//! *flat siblings* in the statement list rather than a nested loop node:
//! matching a NEXT to its FOR (including multi-counter `NEXT i, j`) is the
//! code generator's job, which is where mismatches are reported.

use super::{Expr, Loc};
use crate::semantic::types::Ty;

/// A statement with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    /// The kind of statement.
    pub kind: StmtKind,
    /// Source location of this statement.
    pub loc: Loc,
}

impl Stmt {
    /// Creates a new statement.
    pub fn new(kind: StmtKind, loc: Loc) -> Self {
        Self { kind, loc }
    }
}

/// The different kinds of statements.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Label definition: `name:`
    Label(String),

    /// `[LET] target = value` - target is a variable or array element.
    Assign { target: Expr, value: Expr },

    /// `GOTO label`
    Goto { dest: String },

    /// `IF ... THEN ... [ELSEIF ... THEN ...]* [ELSE ...] [END IF]`
    ///
    /// Single-line and block forms parse to the same shape: one arm per
    /// IF/ELSEIF condition, plus the optional ELSE body.
    If {
        arms: Vec<IfArm>,
        else_stmts: Vec<Stmt>,
    },

    /// `DO [WHILE|UNTIL c] ... LOOP [WHILE|UNTIL c]`
    ///
    /// `negated` records how the condition maps to the loop's *exit* test:
    /// `WHILE c` exits when `NOT c` (negated = true), `UNTIL c` exits when
    /// `c` (negated = false). The generator consumes the bit directly
    /// instead of synthesizing NOT nodes.
    CondLoop {
        structure: LoopStructure,
        negated: bool,
        cond: Expr,
        stmts: Vec<Stmt>,
    },

    /// `DO ... LOOP` with no condition at either end.
    UncondLoop { stmts: Vec<Stmt> },

    /// `EXIT DO`
    ExitLoop,

    /// `FOR counter = start TO end [STEP step]` - flat; see module docs.
    For {
        counter: Expr,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
    },

    /// `NEXT [i [, j ...]]` - closes one FOR per listed counter, innermost
    /// first; a bare NEXT closes one.
    Next { counters: Vec<Expr> },

    /// `EXIT FOR`
    ExitFor,

    /// `GOSUB label`
    Gosub { dest: String },

    /// `RETURN [label]`
    Return { dest: Option<String> },

    /// `END`
    End,

    /// `PRINT item item ...` where an item is an expression, a `,` (advance
    /// to the next print zone) or a `;` (no spacing).
    Print { items: Vec<PrintItem> },

    /// `INPUT ["prompt" ;|,] target [, target ...]`
    Input {
        prompt: Option<String>,
        targets: Vec<Expr>,
    },

    /// `DIM name(d1 [TO u1], ...) [AS type]` or `DIM name AS type`
    Dim {
        name: String,
        dims: Vec<DimBound>,
        as_ty: Option<Ty>,
    },

    /// `CONST name = value`
    ConstDecl { name: String, value: Expr },
}

/// One `IF`/`ELSEIF` arm: a condition and its body.
#[derive(Debug, Clone, PartialEq)]
pub struct IfArm {
    pub cond: Expr,
    pub stmts: Vec<Stmt>,
}

/// Where a conditional loop tests its condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStructure {
    /// `DO WHILE|UNTIL c ... LOOP` - test before the body.
    CondBeforeStmts,
    /// `DO ... LOOP WHILE|UNTIL c` - test after the body.
    CondAfterStmts,
}

/// One item of a PRINT statement.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintItem {
    /// `,` - pad to the next 14-column print zone.
    Comma,
    /// `;` - no spacing between items.
    Semicolon,
    /// An expression to print.
    Value(Expr),
}

/// One dimension of a DIM: `upper` alone means `0 TO upper`.
#[derive(Debug, Clone, PartialEq)]
pub struct DimBound {
    pub lower: Option<Expr>,
    pub upper: Expr,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ExprKind;

    #[test]
    fn print_item_shapes() {
        let items = vec![
            PrintItem::Value(Expr::new(ExprKind::NumberLit(1.0), Loc::new(1, 7))),
            PrintItem::Semicolon,
            PrintItem::Comma,
        ];
        assert!(matches!(items[0], PrintItem::Value(_)));
        assert_eq!(items[1], PrintItem::Semicolon);
        assert_eq!(items[2], PrintItem::Comma);
    }
}
