//! Code generation.
//!
//! Lowers the analyzed AST into a flat sequence of labels and runnable
//! instruction records in which control flow is expressed only by the
//! directive a statement returns at run time. This keeps the executor a
//! trivial trampoline and gives every source statement a one-to-one,
//! observable runtime step.
//!
//! A monotonic counter yields unique label stems `$N`; each construct
//! decorates its stem with a stable suffix (`$1_loopStart`, `$3_elif2`,
//! `$3_endif`). Two transient stacks track open DO loops and open FORs:
//!
//! - `EXIT DO` jumps to the innermost open loop's end label.
//! - `NEXT` closes the innermost open FOR, checking the counter name when
//!   one is written; `NEXT i, j` closes two, innermost first.
//!
//! FOR lowering materialises the step and end values in temps named off
//! the stem; the temps are released right after the loop's end label so
//! the executor's temp dictionary stays bounded.
//!
//! Mismatched or missing NEXT, EXIT outside its construct, and label
//! problems are [`CodegenError`]s.

mod error;
mod program;

pub use error::CodegenError;
pub use program::*;

use crate::ast::{Expr, ExprKind, Loc, LoopStructure, Module, PrintItem, Stmt, StmtKind};
use crate::semantic::symbols::Storage;
use crate::semantic::types::Ty;
use std::collections::HashSet;

/// Lowers an analyzed module into a [`CompiledProgram`].
pub fn generate(module: &Module, source_file_name: &str) -> Result<CompiledProgram, CodegenError> {
    let proc_names: HashSet<String> = module
        .procs
        .iter()
        .map(|p| p.name.to_ascii_lowercase())
        .collect();

    let mut procs = Vec::new();
    for p in &module.procs {
        let mut gen = Generator::new(&proc_names, true);
        gen.gen_stmts(&p.stmts)?;
        let stmts = gen.finish()?;
        procs.push(CompiledProc {
            name: p.name.clone(),
            canonical: p.name.to_ascii_lowercase(),
            params: p.params.iter().map(|s| s.to_ascii_lowercase()).collect(),
            ret_ty: p.ret_ty.clone(),
            stmts,
        });
    }

    let mut gen = Generator::new(&proc_names, false);
    gen.gen_stmts(&module.stmts)?;
    let stmts = gen.finish()?;

    Ok(CompiledProgram {
        source_file_name: source_file_name.into(),
        stmts,
        procs,
    })
}

/// Bookkeeping for one open FOR.
struct ForFrame {
    counter: Target,
    counter_name: String,
    start_label: String,
    end_label: String,
    step_temp: String,
    end_temp: String,
    loc: Loc,
}

struct Generator<'a> {
    /// Canonical names of user FUNCTIONs, to tell calls from built-ins.
    procs: &'a HashSet<String>,
    /// Whether we're lowering a FUNCTION body (affects DIM/CONST storage).
    in_proc: bool,
    out: Vec<CompiledStmt>,
    labels: HashSet<String>,
    next_stem: u32,
    for_stack: Vec<ForFrame>,
    loop_stack: Vec<String>,
}

impl<'a> Generator<'a> {
    fn new(procs: &'a HashSet<String>, in_proc: bool) -> Self {
        Self {
            procs,
            in_proc,
            out: Vec::new(),
            labels: HashSet::new(),
            next_stem: 0,
            for_stack: Vec::new(),
            loop_stack: Vec::new(),
        }
    }

    /// Allocates a fresh label stem. The counter never resets within a
    /// scope, which is what keeps generated labels unique.
    fn stem(&mut self) -> String {
        self.next_stem += 1;
        format!("${}", self.next_stem)
    }

    fn push_run(&mut self, loc: Loc, op: RunOp) {
        self.out.push(CompiledStmt::Run(Runnable { loc, op }));
    }

    fn emit_label(&mut self, name: String, loc: Loc) -> Result<(), CodegenError> {
        if !self.labels.insert(name.clone()) {
            return Err(CodegenError::DuplicateLabel { name, loc });
        }
        self.out.push(CompiledStmt::Label(name));
        Ok(())
    }

    fn gen_stmts(&mut self, stmts: &[Stmt]) -> Result<(), CodegenError> {
        for stmt in stmts {
            self.gen_stmt(stmt)?;
        }
        Ok(())
    }

    fn gen_stmt(&mut self, stmt: &Stmt) -> Result<(), CodegenError> {
        let loc = stmt.loc;
        match &stmt.kind {
            StmtKind::Label(name) => self.emit_label(name.to_ascii_lowercase(), loc),

            StmtKind::Assign { target, value } => {
                let target = self.lower_target(target)?;
                let value = self.lower_expr(value)?;
                self.push_run(loc, RunOp::Assign { target, value });
                Ok(())
            }

            StmtKind::Goto { dest } => {
                self.push_run(
                    loc,
                    RunOp::Goto {
                        dest: dest.to_ascii_lowercase(),
                    },
                );
                Ok(())
            }

            StmtKind::If { arms, else_stmts } => {
                let stem = self.stem();
                let endif = format!("{}_endif", stem);
                let has_else = !else_stmts.is_empty();
                let last = arms.len() - 1;

                for (i, arm) in arms.iter().enumerate() {
                    let boundary = if i < last {
                        format!("{}_elif{}", stem, i + 1)
                    } else if has_else {
                        format!("{}_else", stem)
                    } else {
                        endif.clone()
                    };
                    let cond = self.lower_expr(&arm.cond)?;
                    self.push_run(
                        arm.cond.loc,
                        RunOp::BranchUnless {
                            cond,
                            dest: boundary.clone(),
                        },
                    );
                    self.gen_stmts(&arm.stmts)?;
                    if i < last || has_else {
                        self.push_run(
                            loc,
                            RunOp::Goto {
                                dest: endif.clone(),
                            },
                        );
                    }
                    if boundary != endif {
                        self.emit_label(boundary, loc)?;
                    }
                }
                if has_else {
                    self.gen_stmts(else_stmts)?;
                }
                self.emit_label(endif, loc)
            }

            StmtKind::CondLoop {
                structure,
                negated,
                cond,
                stmts,
            } => {
                let stem = self.stem();
                let start = format!("{}_loopStart", stem);
                let end = format!("{}_loopEnd", stem);
                self.emit_label(start.clone(), loc)?;
                self.loop_stack.push(end.clone());

                match structure {
                    LoopStructure::CondBeforeStmts => {
                        let exit_cond = self.lower_expr(cond)?;
                        self.push_run(
                            cond.loc,
                            RunOp::ExitLoopIf {
                                cond: exit_cond,
                                negated: *negated,
                                dest: end.clone(),
                            },
                        );
                        self.gen_stmts(stmts)?;
                    }
                    LoopStructure::CondAfterStmts => {
                        self.gen_stmts(stmts)?;
                        let exit_cond = self.lower_expr(cond)?;
                        self.push_run(
                            cond.loc,
                            RunOp::ExitLoopIf {
                                cond: exit_cond,
                                negated: *negated,
                                dest: end.clone(),
                            },
                        );
                    }
                }

                self.push_run(loc, RunOp::Goto { dest: start });
                self.loop_stack.pop();
                self.emit_label(end, loc)
            }

            StmtKind::UncondLoop { stmts } => {
                let stem = self.stem();
                let start = format!("{}_loopStart", stem);
                let end = format!("{}_loopEnd", stem);
                self.emit_label(start.clone(), loc)?;
                self.loop_stack.push(end.clone());
                self.gen_stmts(stmts)?;
                self.push_run(loc, RunOp::Goto { dest: start });
                self.loop_stack.pop();
                self.emit_label(end, loc)
            }

            StmtKind::ExitLoop => {
                let dest = self
                    .loop_stack
                    .last()
                    .cloned()
                    .ok_or(CodegenError::ExitDoOutsideLoop { loc })?;
                self.push_run(loc, RunOp::Goto { dest });
                Ok(())
            }

            StmtKind::For {
                counter,
                start,
                end,
                step,
            } => {
                let stem = self.stem();
                let start_label = format!("{}_forStart", stem);
                let end_label = format!("{}_forEnd", stem);
                let step_temp = format!("{}_step", stem);
                let end_temp = format!("{}_end", stem);

                let counter_target = self.lower_target(counter)?;
                let counter_expr = self.lower_expr(counter)?;
                let counter_name = counter_canonical(counter)?;
                let start_expr = self.lower_expr(start)?;
                let end_expr = self.lower_expr(end)?;
                let step_expr = match step {
                    Some(s) => self.lower_expr(s)?,
                    None => CExpr::Num(1.0),
                };

                self.push_run(
                    loc,
                    RunOp::ForInit {
                        counter: counter_target.clone(),
                        start: start_expr,
                        step_temp: step_temp.clone(),
                        step: step_expr,
                        end_temp: end_temp.clone(),
                        end: end_expr,
                    },
                );
                self.emit_label(start_label.clone(), loc)?;
                self.push_run(
                    loc,
                    RunOp::ForGuard {
                        counter: counter_expr,
                        step_temp: step_temp.clone(),
                        end_temp: end_temp.clone(),
                        dest: end_label.clone(),
                    },
                );
                self.for_stack.push(ForFrame {
                    counter: counter_target,
                    counter_name,
                    start_label,
                    end_label,
                    step_temp,
                    end_temp,
                    loc,
                });
                Ok(())
            }

            StmtKind::Next { counters } => {
                if counters.is_empty() {
                    self.close_for(None, loc)
                } else {
                    for counter in counters {
                        self.close_for(Some(counter), loc)?;
                    }
                    Ok(())
                }
            }

            StmtKind::ExitFor => {
                let dest = self
                    .for_stack
                    .last()
                    .map(|f| f.end_label.clone())
                    .ok_or(CodegenError::ExitForOutsideFor { loc })?;
                self.push_run(loc, RunOp::Goto { dest });
                Ok(())
            }

            StmtKind::Gosub { dest } => {
                self.push_run(
                    loc,
                    RunOp::Gosub {
                        dest: dest.to_ascii_lowercase(),
                    },
                );
                Ok(())
            }

            StmtKind::Return { dest } => {
                self.push_run(
                    loc,
                    RunOp::Return {
                        dest: dest.as_ref().map(|d| d.to_ascii_lowercase()),
                    },
                );
                Ok(())
            }

            StmtKind::End => {
                self.push_run(loc, RunOp::End);
                Ok(())
            }

            StmtKind::Print { items } => {
                let mut args = Vec::new();
                for item in items {
                    match item {
                        PrintItem::Comma => args.push(PrintArg::Comma),
                        PrintItem::Semicolon => args.push(PrintArg::Semicolon),
                        PrintItem::Value(e) => args.push(PrintArg::Value(self.lower_expr(e)?)),
                    }
                }
                self.push_run(loc, RunOp::Print { args });
                Ok(())
            }

            StmtKind::Input { prompt, targets } => {
                let mut lowered = Vec::new();
                for t in targets {
                    let ty = expr_ty(t)?;
                    lowered.push((self.lower_target(t)?, ty));
                }
                self.push_run(
                    loc,
                    RunOp::Input {
                        prompt: prompt.clone(),
                        targets: lowered,
                    },
                );
                Ok(())
            }

            StmtKind::Dim { name, dims, as_ty } => {
                if dims.is_empty() {
                    // Scalar DIM only declares; nothing to run.
                    return Ok(());
                }
                let elem = as_ty.clone().unwrap_or_else(|| Ty::from_name(name));
                let mut bounds = Vec::new();
                for d in dims {
                    let lower = match &d.lower {
                        Some(e) => self.lower_expr(e)?,
                        None => CExpr::Num(0.0),
                    };
                    bounds.push((lower, self.lower_expr(&d.upper)?));
                }
                self.push_run(
                    loc,
                    RunOp::DimArray {
                        slot: self.decl_slot(name),
                        elem,
                        dims: bounds,
                    },
                );
                Ok(())
            }

            StmtKind::ConstDecl { name, value } => {
                let value = self.lower_expr(value)?;
                self.push_run(
                    loc,
                    RunOp::Assign {
                        target: Target::Var(self.decl_slot(name)),
                        value,
                    },
                );
                Ok(())
            }
        }
    }

    /// Closes the innermost open FOR for one NEXT counter (or a bare
    /// NEXT). Emits the increment-and-jump, the end label, and the temp
    /// release.
    fn close_for(&mut self, counter: Option<&Expr>, loc: Loc) -> Result<(), CodegenError> {
        let frame = self
            .for_stack
            .pop()
            .ok_or(CodegenError::NextWithoutFor { loc })?;

        if let Some(c) = counter {
            let found = counter_canonical(c)?;
            if found != frame.counter_name {
                return Err(CodegenError::NextMismatch {
                    expected: frame.counter_name,
                    found,
                    loc: c.loc,
                });
            }
        }

        self.push_run(
            loc,
            RunOp::ForNext {
                counter: frame.counter,
                step_temp: frame.step_temp.clone(),
                dest: frame.start_label,
            },
        );
        self.emit_label(frame.end_label, loc)?;
        self.push_run(
            loc,
            RunOp::FreeTemps {
                names: vec![frame.step_temp, frame.end_temp],
            },
        );
        Ok(())
    }

    /// Storage for DIM/CONST declarations: module level goes to the global
    /// dictionary, procedure level to the frame.
    fn decl_slot(&self, name: &str) -> VarSlot {
        VarSlot {
            name: name.to_ascii_lowercase(),
            storage: if self.in_proc {
                Storage::Local
            } else {
                Storage::Global
            },
        }
    }

    // ==================== Expression lowering ====================

    fn lower_expr(&self, e: &Expr) -> Result<CExpr, CodegenError> {
        Ok(match &e.kind {
            ExprKind::NumberLit(n) => CExpr::Num(*n),
            ExprKind::StringLit(s) => CExpr::Str(s.clone()),
            ExprKind::VarRef { name, storage } => CExpr::Var(VarSlot {
                name: name.to_ascii_lowercase(),
                storage: resolved(*storage, e.loc)?,
            }),
            ExprKind::FnCall {
                name,
                args,
                storage,
            } => {
                let args = args
                    .iter()
                    .map(|a| self.lower_expr(a))
                    .collect::<Result<Vec<_>, _>>()?;
                match storage {
                    Some(st) => CExpr::Index {
                        slot: VarSlot {
                            name: name.to_ascii_lowercase(),
                            storage: *st,
                        },
                        indices: args,
                    },
                    None => {
                        let canonical = name.to_ascii_lowercase();
                        if self.procs.contains(&canonical) {
                            CExpr::CallFn {
                                name: canonical,
                                args,
                            }
                        } else {
                            CExpr::CallBuiltin {
                                name: name.clone(),
                                args,
                            }
                        }
                    }
                }
            }
            ExprKind::Binary { op, l, r } => CExpr::Binary {
                op: *op,
                l: Box::new(self.lower_expr(l)?),
                r: Box::new(self.lower_expr(r)?),
            },
            ExprKind::Unary { op, r } => CExpr::Unary {
                op: *op,
                r: Box::new(self.lower_expr(r)?),
            },
        })
    }

    fn lower_target(&self, e: &Expr) -> Result<Target, CodegenError> {
        match &e.kind {
            ExprKind::VarRef { name, storage } => Ok(Target::Var(VarSlot {
                name: name.to_ascii_lowercase(),
                storage: resolved(*storage, e.loc)?,
            })),
            ExprKind::FnCall {
                name,
                args,
                storage: Some(st),
            } => {
                let indices = args
                    .iter()
                    .map(|a| self.lower_expr(a))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Target::Index {
                    slot: VarSlot {
                        name: name.to_ascii_lowercase(),
                        storage: *st,
                    },
                    indices,
                })
            }
            _ => Err(CodegenError::Unresolved {
                message: "invalid assignment target".into(),
                loc: e.loc,
            }),
        }
    }

    /// Verifies the stacks drained and every referenced label exists.
    fn finish(self) -> Result<Vec<CompiledStmt>, CodegenError> {
        if let Some(frame) = self.for_stack.last() {
            return Err(CodegenError::UnclosedFor { loc: frame.loc });
        }
        debug_assert!(self.loop_stack.is_empty());

        for stmt in &self.out {
            if let CompiledStmt::Run(r) = stmt {
                for dest in jump_dests(&r.op) {
                    if !self.labels.contains(dest) {
                        return Err(CodegenError::UndefinedLabel {
                            name: dest.clone(),
                            loc: r.loc,
                        });
                    }
                }
            }
        }
        Ok(self.out)
    }
}

/// The labels an instruction can jump to.
fn jump_dests(op: &RunOp) -> Vec<&String> {
    match op {
        RunOp::Goto { dest }
        | RunOp::Gosub { dest }
        | RunOp::BranchUnless { dest, .. }
        | RunOp::ExitLoopIf { dest, .. }
        | RunOp::ForGuard { dest, .. }
        | RunOp::ForNext { dest, .. } => vec![dest],
        RunOp::Return { dest: Some(d) } => vec![d],
        _ => Vec::new(),
    }
}

fn counter_canonical(e: &Expr) -> Result<String, CodegenError> {
    match &e.kind {
        ExprKind::VarRef { name, .. } => Ok(name.to_ascii_lowercase()),
        _ => Err(CodegenError::Unresolved {
            message: "loop counter must be a variable".into(),
            loc: e.loc,
        }),
    }
}

fn expr_ty(e: &Expr) -> Result<Ty, CodegenError> {
    e.ty.clone().ok_or(CodegenError::Unresolved {
        message: "expression not analyzed".into(),
        loc: e.loc,
    })
}

fn resolved(storage: Option<Storage>, loc: Loc) -> Result<Storage, CodegenError> {
    storage.ok_or(CodegenError::Unresolved {
        message: "unresolved variable".into(),
        loc,
    })
}
