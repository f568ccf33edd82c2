//! The compiled module data model.
//!
//! The code generator lowers structured control flow into a flat list of
//! labels and runnable statement records. Each record is an interpretable
//! instruction the executor dispatches on; running one may yield an
//! [`ExecutionDirective`] that steers the trampoline (jump, subroutine
//! call, return, terminate) - no directive means fall through.
//!
//! The whole structure serializes with serde, so a compiled module
//! round-trips through its textual form and back into the runtime.

use crate::ast::{BinOp, Loc, UnOp};
use crate::semantic::symbols::Storage;
use crate::semantic::types::Ty;
use serde::{Deserialize, Serialize};

/// A fully compiled module: module-level statements plus compiled
/// FUNCTION bodies, tagged with the source file name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledProgram {
    pub source_file_name: String,
    pub stmts: Vec<CompiledStmt>,
    pub procs: Vec<CompiledProc>,
}

/// A compiled FUNCTION: its parameter names (canonical, in order), return
/// type, and flat statement list. The return value is whatever the body
/// left in the local named after the function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledProc {
    pub name: String,
    pub canonical: String,
    pub params: Vec<String>,
    pub ret_ty: Ty,
    pub stmts: Vec<CompiledStmt>,
}

/// One slot of a flat statement list: a label or a runnable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompiledStmt {
    Label(String),
    Run(Runnable),
}

/// A runnable statement record with its source position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runnable {
    pub loc: Loc,
    pub op: RunOp,
}

/// What the executor does after running a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionDirective {
    /// Jump to a label.
    Goto(String),
    /// Push the return position and jump to a label.
    Gosub(String),
    /// Pop the gosub stack; jump to the popped position or to the
    /// explicit label when one is given.
    Return(Option<String>),
    /// Terminate the program.
    End,
}

/// The instruction set of compiled statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunOp {
    /// Evaluate `value` and store it into `target`.
    Assign { target: Target, value: CExpr },

    /// Allocate an array: evaluate the `(lower, upper)` bound pairs and
    /// bind a fresh array object to `slot`.
    DimArray {
        slot: VarSlot,
        elem: Ty,
        dims: Vec<(CExpr, CExpr)>,
    },

    /// Unconditional jump.
    Goto { dest: String },

    /// Jump to `dest` when the condition is false. IF arms lower to this.
    BranchUnless { cond: CExpr, dest: String },

    /// Conditional-loop exit test. Exits (jumps to `dest`) when the
    /// condition is true, or when it is false if `negated` is set -
    /// `WHILE c` exits on NOT c, `UNTIL c` exits on c.
    ExitLoopIf {
        cond: CExpr,
        negated: bool,
        dest: String,
    },

    /// FOR initialisation: set the counter and capture the step and end
    /// values in temps named off the loop's label stem.
    ForInit {
        counter: Target,
        start: CExpr,
        step_temp: String,
        step: CExpr,
        end_temp: String,
        end: CExpr,
    },

    /// FOR guard: exit to `dest` when the counter has passed the end in
    /// the step's direction.
    ForGuard {
        counter: CExpr,
        step_temp: String,
        end_temp: String,
        dest: String,
    },

    /// NEXT: add the step to the counter and jump back to the guard.
    ForNext {
        counter: Target,
        step_temp: String,
        dest: String,
    },

    /// Release FOR temps so the temp dictionary stays bounded.
    FreeTemps { names: Vec<String> },

    /// Subroutine call; interpreted by the executor's gosub stack.
    Gosub { dest: String },

    /// Return from a GOSUB, optionally to an explicit label.
    Return { dest: Option<String> },

    /// Terminate the program.
    End,

    /// PRINT with its ordered, tagged argument list.
    Print { args: Vec<PrintArg> },

    /// INPUT: prompt, then read and coerce one value per target.
    Input {
        prompt: Option<String>,
        targets: Vec<(Target, Ty)>,
    },
}

/// One PRINT argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PrintArg {
    /// Advance to the next 14-column print zone.
    Comma,
    /// No spacing.
    Semicolon,
    /// Print a value.
    Value(CExpr),
}

/// A storage location to assign into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Target {
    Var(VarSlot),
    Index { slot: VarSlot, indices: Vec<CExpr> },
}

/// A resolved variable: canonical name plus which dictionary holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarSlot {
    pub name: String,
    pub storage: Storage,
}

/// A lowered expression, evaluated by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CExpr {
    Num(f64),
    Str(String),
    Var(VarSlot),
    Temp(String),
    Index { slot: VarSlot, indices: Vec<CExpr> },
    CallFn { name: String, args: Vec<CExpr> },
    CallBuiltin { name: String, args: Vec<CExpr> },
    Binary {
        op: BinOp,
        l: Box<CExpr>,
        r: Box<CExpr>,
    },
    Unary { op: UnOp, r: Box<CExpr> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiled_program_round_trips_through_json() {
        let program = CompiledProgram {
            source_file_name: "t.bas".into(),
            stmts: vec![
                CompiledStmt::Label("$1_loopStart".into()),
                CompiledStmt::Run(Runnable {
                    loc: Loc::new(1, 1),
                    op: RunOp::Print {
                        args: vec![PrintArg::Value(CExpr::Num(1.0)), PrintArg::Semicolon],
                    },
                }),
                CompiledStmt::Run(Runnable {
                    loc: Loc::new(2, 1),
                    op: RunOp::Goto {
                        dest: "$1_loopStart".into(),
                    },
                }),
            ],
            procs: vec![],
        };
        let json = serde_json::to_string(&program).unwrap();
        let back: CompiledProgram = serde_json::from_str(&json).unwrap();
        assert_eq!(program, back);
    }
}
