//! # qbc
//!
//! A QBasic compiler with a minimal trampoline-style runtime.
//!
//! ## Architecture
//!
//! The compiler is a staged pipeline; no stage reads an earlier stage's
//! representation:
//!
//! ```text
//! source → lexer → parser → AST → semantic analysis → codegen → compiled module
//! ```
//!
//! - [`lexer`] - tokenizes source with line/column positions
//! - [`parser`] - builds the AST
//! - [`ast`] - AST type definitions
//! - [`semantic`] - symbol resolution and type checking (annotates in place)
//! - [`codegen`] - lowers to a flat, label-keyed statement list
//! - [`runtime`] - the executor and built-ins compiled programs rely on
//!
//! ## Example
//!
//! ```
//! use qbc::runtime::{Executor, ScriptedHost};
//!
//! let program = qbc::compile_to_program("PRINT \"HELLO\"", "hello.bas").unwrap();
//! let mut host = ScriptedHost::new(&[]);
//! Executor::new(&program).run(&mut host).unwrap();
//! assert_eq!(host.output, "HELLO\n");
//! ```

pub mod ast;
pub mod codegen;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod semantic;

use crate::ast::Loc;
use crate::codegen::CompiledProgram;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Re-export of the commonly used types.
pub mod prelude {
    pub use crate::ast::{Expr, ExprKind, Loc, Module, Stmt, StmtKind};
    pub use crate::codegen::{CompiledProgram, CompiledStmt, RunOp};
    pub use crate::lexer::{lex, Token, TokenKind};
    pub use crate::parser::{parse, ParseError};
    pub use crate::runtime::{Executor, Host, RuntimeError, ScriptedHost, StdHost};
    pub use crate::semantic::{analyze, SemanticError};
    pub use crate::{compile, compile_to_program, CompileError, CompileOptions, CompileOutput};
}

/// Options for [`compile`].
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Recorded in the compiled module and the source map.
    pub source_file_name: Option<String>,
}

/// The result of [`compile`]: the module's textual form and a source map.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// JSON serialisation of the compiled module; feeds the runtime's
    /// deserializer.
    pub code: String,
    /// JSON source-map stream: one entry per runnable statement.
    pub map: String,
}

/// One source-map entry: a runnable statement's index and the source
/// position it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapEntry {
    /// `None` for module-level statements, the function's name otherwise.
    pub proc: Option<String>,
    /// Index into the scope's compiled statement list.
    pub stmt: usize,
    pub line: u32,
    pub col: u32,
}

/// Any compile-stage failure.
///
/// Renders as `<kind>: <message> at line L, col C`.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    Lex(lexer::LexError),
    Parse(parser::ParseError),
    Semantic(semantic::SemanticError),
    Codegen(codegen::CodegenError),
}

impl CompileError {
    /// The failing stage's name, as used in rendered error text.
    pub fn kind(&self) -> &'static str {
        match self {
            CompileError::Lex(_) => "LexError",
            CompileError::Parse(_) => "ParseError",
            CompileError::Semantic(_) => "SemanticError",
            CompileError::Codegen(_) => "CodegenError",
        }
    }

    /// The source position the error is reported against.
    pub fn loc(&self) -> Loc {
        match self {
            CompileError::Lex(e) => e.loc,
            CompileError::Parse(e) => e.loc(),
            CompileError::Semantic(e) => e.loc(),
            CompileError::Codegen(e) => e.loc(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message: String = match self {
            CompileError::Lex(e) => e.to_string(),
            CompileError::Parse(e) => e.to_string(),
            CompileError::Semantic(e) => e.to_string(),
            CompileError::Codegen(e) => e.to_string(),
        };
        write!(f, "{}: {} at {}", self.kind(), message, self.loc())
    }
}

impl std::error::Error for CompileError {}

impl From<lexer::LexError> for CompileError {
    fn from(e: lexer::LexError) -> Self {
        CompileError::Lex(e)
    }
}

impl From<parser::ParseError> for CompileError {
    fn from(e: parser::ParseError) -> Self {
        CompileError::Parse(e)
    }
}

impl From<semantic::SemanticError> for CompileError {
    fn from(e: semantic::SemanticError) -> Self {
        CompileError::Semantic(e)
    }
}

impl From<codegen::CodegenError> for CompileError {
    fn from(e: codegen::CodegenError) -> Self {
        CompileError::Codegen(e)
    }
}

/// Runs the full pipeline and returns the compiled module.
pub fn compile_to_program(
    source: &str,
    source_file_name: &str,
) -> Result<CompiledProgram, CompileError> {
    log::debug!("compiling {} ({} bytes)", source_file_name, source.len());
    let tokens = lexer::lex(source)?;
    log::trace!("{} tokens", tokens.len());
    let mut module = parser::parse(&tokens)?;
    semantic::analyze(&mut module)?;
    let program = codegen::generate(&module, source_file_name)?;
    log::debug!(
        "compiled {} module statements, {} procs",
        program.stmts.len(),
        program.procs.len()
    );
    Ok(program)
}

/// Compiles source to its serialized form plus a source map.
///
/// The `code` string round-trips: deserializing it yields the same
/// [`CompiledProgram`] the runtime executes.
pub fn compile(source: &str, opts: CompileOptions) -> Result<CompileOutput, CompileError> {
    let name = opts.source_file_name.as_deref().unwrap_or("input.bas");
    let program = compile_to_program(source, name)?;

    let mut map = Vec::new();
    collect_map(None, &program.stmts, &mut map);
    for proc in &program.procs {
        collect_map(Some(&proc.name), &proc.stmts, &mut map);
    }

    Ok(CompileOutput {
        code: serde_json::to_string_pretty(&program).expect("compiled module serializes"),
        map: serde_json::to_string(&map).expect("source map serializes"),
    })
}

fn collect_map(proc: Option<&str>, stmts: &[codegen::CompiledStmt], out: &mut Vec<MapEntry>) {
    for (i, stmt) in stmts.iter().enumerate() {
        if let codegen::CompiledStmt::Run(r) = stmt {
            out.push(MapEntry {
                proc: proc.map(|s| s.to_string()),
                stmt: i,
                line: r.loc.line,
                col: r.loc.col,
            });
        }
    }
}
