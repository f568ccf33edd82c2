//! Abstract Syntax Tree (AST) definitions.
//!
//! The AST represents the hierarchical structure of a QBasic program after
//! parsing. Each node corresponds to a syntactic construct in the source.
//!
//! # Structure
//!
//! ```text
//! Module
//! ├── Vec<FnProc>      FUNCTION ... END FUNCTION bodies
//! └── Vec<Stmt>        module-level statements
//!     ├── Print { items }
//!     ├── Assign { target, value }
//!     ├── If { arms, else_stmts }
//!     └── ...
//! ```
//!
//! # Design Decisions
//!
//! - **Owned nodes**: AST nodes own their children (no lifetimes), so the
//!   tree can outlive the source text.
//! - **Loc on every node**: every node tracks its 1-based line/column for
//!   error messages and source mapping.
//! - **Analysis slots**: semantic results (expression types, resolved
//!   storage) live in `Option` fields that start `None` after parsing and
//!   are populated in place by the analyzer.

mod expr;
mod stmt;

pub use expr::*;
pub use stmt::*;

use crate::semantic::symbols::SymbolTable;
use crate::semantic::types::Ty;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 1-based source position.
///
/// Every AST node and every compiled statement carries one of these, and
/// every compiler error is reported against one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loc {
    /// Line number, starting at 1.
    pub line: u32,
    /// Column number, starting at 1.
    pub col: u32,
}

impl Loc {
    /// Creates a new location.
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, col {}", self.line, self.col)
    }
}

/// A parsed program: function procedures plus the module-level statements.
///
/// The symbol tables start empty and are filled in by semantic analysis.
#[derive(Debug, Clone, Default)]
pub struct Module {
    /// FUNCTION definitions, in source order.
    pub procs: Vec<FnProc>,
    /// Module-level statements, in source order.
    pub stmts: Vec<Stmt>,
    /// Implicitly declared module-level variables.
    pub local_symbols: SymbolTable,
    /// Module-level DIMs and CONSTs, visible from procedures.
    pub global_symbols: SymbolTable,
}

/// A `FUNCTION name(params) ... END FUNCTION` definition.
///
/// The return type comes from the function name's type sigil. A function
/// has an implicit local variable named after itself; assigning to that
/// name sets the return value.
#[derive(Debug, Clone)]
pub struct FnProc {
    /// Function name as written, sigil included.
    pub name: String,
    /// Parameter names as written, in order.
    pub params: Vec<String>,
    /// Return type, derived from the name's sigil at parse time.
    pub ret_ty: Ty,
    /// Body statements.
    pub stmts: Vec<Stmt>,
    /// Parameter symbols, filled by analysis.
    pub param_symbols: SymbolTable,
    /// Local symbols (including the implicit result variable), filled by
    /// analysis.
    pub local_symbols: SymbolTable,
    /// Definition site.
    pub loc: Loc,
}
