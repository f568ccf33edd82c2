//! Semantic analysis.
//!
//! A single top-down walk over the parsed module that:
//!
//! - synthesises parameter symbols and the implicit result variable for
//!   each FUNCTION,
//! - types every literal (numbers are SINGLE, strings STRING),
//! - resolves every variable reference in the order parameters → procedure
//!   locals → module locals → module globals, declaring implicitly on a
//!   miss - unless the name is a FUNCTION, in which case the reference is
//!   rewritten in place into a nullary call,
//! - distinguishes array element access from function calls (the syntax is
//!   identical),
//! - checks calls against FUNCTION signatures or the built-in registry,
//! - types operators via the numeric coercion table,
//! - checks statement operands (conditions numeric, PRINT/INPUT operands
//!   elementary, assignment sides matching).
//!
//! The walk mutates the AST in place: `ty` and `storage` slots are filled,
//! and nullary-function references change node kind. Analysis stops at the
//! first error.

pub mod error;
pub mod symbols;
pub mod types;

pub use error::SemanticError;

use crate::ast::{Expr, ExprKind, Module, PrintItem, Stmt, StmtKind, UnOp};
use crate::ast::BinOp;
use crate::runtime::builtins::{self, ParamKind};
use crate::semantic::symbols::{Storage, Symbol, SymbolKind, SymbolTable};
use crate::semantic::types::{coerce_division, coerce_numeric, Ty};

/// Analyzes a module in place.
pub fn analyze(module: &mut Module) -> Result<(), SemanticError> {
    let mut sigs: Vec<ProcSig> = Vec::new();
    for p in &module.procs {
        let canonical = p.name.to_ascii_lowercase();
        if sigs.iter().any(|s| s.canonical == canonical) {
            return Err(SemanticError::Duplicate {
                name: p.name.clone(),
                loc: p.loc,
            });
        }
        sigs.push(ProcSig {
            name: p.name.clone(),
            canonical,
            params: p.params.iter().map(|n| Ty::from_name(n)).collect(),
            ret: p.ret_ty.clone(),
        });
    }

    let mut analyzer = Analyzer {
        sigs,
        module_locals: SymbolTable::new(),
        module_globals: SymbolTable::new(),
        cur: None,
    };

    for stmt in &mut module.stmts {
        analyzer.stmt(stmt)?;
    }

    for proc in &mut module.procs {
        let mut params = SymbolTable::new();
        for name in &proc.params {
            let symbol = Symbol::new(name.clone(), SymbolKind::Arg, Ty::from_name(name));
            if !params.insert(symbol) {
                return Err(SemanticError::Duplicate {
                    name: name.clone(),
                    loc: proc.loc,
                });
            }
        }
        let mut locals = SymbolTable::new();
        // The implicit result variable: assigning to the function's own
        // name sets the return value.
        locals.insert(Symbol::new(
            proc.name.clone(),
            SymbolKind::Var,
            proc.ret_ty.clone(),
        ));

        analyzer.cur = Some(ProcCtx { params, locals });
        for stmt in &mut proc.stmts {
            analyzer.stmt(stmt)?;
        }
        let ctx = analyzer.cur.take().expect("proc context");
        proc.param_symbols = ctx.params;
        proc.local_symbols = ctx.locals;
    }

    module.local_symbols = analyzer.module_locals;
    module.global_symbols = analyzer.module_globals;
    Ok(())
}

/// A FUNCTION's signature, collected up front so bodies and module code
/// can call procedures defined later in the file.
#[derive(Debug, Clone)]
struct ProcSig {
    name: String,
    canonical: String,
    params: Vec<Ty>,
    ret: Ty,
}

/// Symbol tables for the procedure currently being analyzed.
struct ProcCtx {
    params: SymbolTable,
    locals: SymbolTable,
}

struct Analyzer {
    sigs: Vec<ProcSig>,
    module_locals: SymbolTable,
    module_globals: SymbolTable,
    cur: Option<ProcCtx>,
}

impl Analyzer {
    // ==================== Statements ====================

    fn stmt(&mut self, stmt: &mut Stmt) -> Result<(), SemanticError> {
        match &mut stmt.kind {
            StmtKind::Label(_)
            | StmtKind::Goto { .. }
            | StmtKind::Gosub { .. }
            | StmtKind::Return { .. }
            | StmtKind::End
            | StmtKind::ExitLoop
            | StmtKind::ExitFor => Ok(()),

            StmtKind::Assign { target, value } => {
                self.expr(value)?;
                self.target(target)?;
                let t_ty = target.ty().clone();
                let v_ty = value.ty().clone();
                if !Ty::matching_elementary(&t_ty, &v_ty) {
                    return Err(SemanticError::TypeMismatch {
                        expected: t_ty.to_string(),
                        found: v_ty.to_string(),
                        loc: value.loc,
                    });
                }
                Ok(())
            }

            StmtKind::If { arms, else_stmts } => {
                for arm in arms.iter_mut() {
                    self.expr(&mut arm.cond)?;
                    require_numeric(&arm.cond)?;
                    for s in &mut arm.stmts {
                        self.stmt(s)?;
                    }
                }
                for s in else_stmts {
                    self.stmt(s)?;
                }
                Ok(())
            }

            StmtKind::CondLoop { cond, stmts, .. } => {
                self.expr(cond)?;
                require_numeric(cond)?;
                for s in stmts {
                    self.stmt(s)?;
                }
                Ok(())
            }

            StmtKind::UncondLoop { stmts } => {
                for s in stmts {
                    self.stmt(s)?;
                }
                Ok(())
            }

            StmtKind::For {
                counter,
                start,
                end,
                step,
            } => {
                self.target(counter)?;
                if !matches!(counter.kind, ExprKind::VarRef { .. }) {
                    return Err(SemanticError::InvalidTarget { loc: counter.loc });
                }
                require_numeric(counter)?;
                self.expr(start)?;
                require_numeric(start)?;
                self.expr(end)?;
                require_numeric(end)?;
                if let Some(step) = step {
                    self.expr(step)?;
                    require_numeric(step)?;
                }
                Ok(())
            }

            StmtKind::Next { counters } => {
                for c in counters {
                    self.target(c)?;
                    require_numeric(c)?;
                }
                Ok(())
            }

            StmtKind::Print { items } => {
                for item in items {
                    if let PrintItem::Value(e) = item {
                        self.expr(e)?;
                        require_elementary(e)?;
                    }
                }
                Ok(())
            }

            StmtKind::Input { targets, .. } => {
                for t in targets {
                    self.target(t)?;
                    require_elementary(t)?;
                }
                Ok(())
            }

            StmtKind::Dim { name, dims, as_ty } => {
                for d in dims.iter_mut() {
                    if let Some(lower) = &mut d.lower {
                        self.expr(lower)?;
                        require_numeric(lower)?;
                    }
                    self.expr(&mut d.upper)?;
                    require_numeric(&d.upper)?;
                }

                let elem = match as_ty {
                    Some(ty) => {
                        // A sigil and an AS clause must agree.
                        if let Some(sigil_ty) =
                            name.chars().last().and_then(Ty::from_sigil)
                        {
                            if sigil_ty != *ty {
                                return Err(SemanticError::TypeMismatch {
                                    expected: sigil_ty.to_string(),
                                    found: ty.to_string(),
                                    loc: stmt.loc,
                                });
                            }
                        }
                        ty.clone()
                    }
                    None => Ty::from_name(name),
                };

                let ty = if dims.is_empty() {
                    elem
                } else {
                    Ty::Array {
                        elem: Box::new(elem),
                        rank: dims.len(),
                    }
                };
                self.declare_explicit(name.clone(), SymbolKind::Var, ty, stmt.loc)
            }

            StmtKind::ConstDecl { name, value } => {
                self.expr(value)?;
                let v_ty = value.ty().clone();
                if let Some(sigil_ty) = name.chars().last().and_then(Ty::from_sigil) {
                    if !Ty::matching_elementary(&sigil_ty, &v_ty) {
                        return Err(SemanticError::TypeMismatch {
                            expected: sigil_ty.to_string(),
                            found: v_ty.to_string(),
                            loc: value.loc,
                        });
                    }
                }
                self.declare_explicit(name.clone(), SymbolKind::Const, v_ty, stmt.loc)
            }
        }
    }

    /// Declares a DIM or CONST name. Module-level declarations go to the
    /// global table so procedures can see them; inside a procedure they
    /// are locals.
    fn declare_explicit(
        &mut self,
        name: String,
        kind: SymbolKind,
        ty: Ty,
        loc: crate::ast::Loc,
    ) -> Result<(), SemanticError> {
        let symbol = Symbol::new(name.clone(), kind, ty);
        let inserted = match &mut self.cur {
            Some(ctx) => ctx.locals.insert(symbol),
            None => self.module_globals.insert(symbol),
        };
        if inserted {
            Ok(())
        } else {
            Err(SemanticError::Duplicate { name, loc })
        }
    }

    // ==================== Expressions ====================

    fn expr(&mut self, e: &mut Expr) -> Result<(), SemanticError> {
        match &mut e.kind {
            ExprKind::NumberLit(_) => {
                e.ty = Some(Ty::Single);
                Ok(())
            }
            ExprKind::StringLit(_) => {
                e.ty = Some(Ty::String);
                Ok(())
            }

            ExprKind::VarRef { name, storage } => {
                if let Some((ty, st)) = self.resolve(name) {
                    *storage = Some(st);
                    e.ty = Some(ty);
                    return Ok(());
                }
                // A bare reference to a FUNCTION is a nullary call.
                if self.find_sig(name).is_some() {
                    let name = name.clone();
                    e.kind = ExprKind::FnCall {
                        name,
                        args: Vec::new(),
                        storage: None,
                    };
                    return self.expr(e);
                }
                // First use declares the variable, typed by its sigil.
                let ty = Ty::from_name(name);
                let symbol = Symbol::new(name.clone(), SymbolKind::Var, ty.clone());
                let st = match &mut self.cur {
                    Some(ctx) => {
                        ctx.locals.insert(symbol);
                        Storage::Local
                    }
                    None => {
                        self.module_locals.insert(symbol);
                        Storage::Local
                    }
                };
                *storage = Some(st);
                e.ty = Some(ty);
                Ok(())
            }

            ExprKind::FnCall {
                name,
                args,
                storage,
            } => {
                // Array element access when the name resolves to an array.
                // A non-array symbol only shadows a call when no FUNCTION
                // has the name; the implicit result variable must not hide
                // a recursive call.
                if let Some((ty, st)) = self.resolve(name) {
                    if let Ty::Array { elem, rank } = ty {
                        if args.len() != rank {
                            return Err(SemanticError::DimCount {
                                name: name.clone(),
                                expected: rank,
                                found: args.len(),
                                loc: e.loc,
                            });
                        }
                        for a in args.iter_mut() {
                            self.expr(a)?;
                            require_numeric(a)?;
                        }
                        *storage = Some(st);
                        e.ty = Some(*elem);
                        return Ok(());
                    }
                    if self.find_sig(name).is_none() {
                        return Err(SemanticError::NotAnArray {
                            name: name.clone(),
                            loc: e.loc,
                        });
                    }
                }

                if let Some(sig) = self.find_sig(name).cloned() {
                    if args.len() != sig.params.len() {
                        return Err(SemanticError::ArgCount {
                            name: sig.name,
                            expected: sig.params.len(),
                            found: args.len(),
                            loc: e.loc,
                        });
                    }
                    for (i, (arg, p_ty)) in args.iter_mut().zip(&sig.params).enumerate() {
                        self.expr(arg)?;
                        if !Ty::matching_elementary(p_ty, arg.ty()) {
                            return Err(SemanticError::ArgType {
                                position: i + 1,
                                name: sig.name,
                                expected: p_ty.to_string(),
                                found: arg.ty().to_string(),
                                loc: arg.loc,
                            });
                        }
                    }
                    e.ty = Some(sig.ret);
                    return Ok(());
                }

                // Built-in. The relaxed lookup keeps a same-name entry
                // around so a kind mismatch gets a targeted error.
                for a in args.iter_mut() {
                    self.expr(a)?;
                }
                let kinds: Vec<ParamKind> =
                    args.iter().map(|a| ParamKind::of_ty(a.ty())).collect();
                match builtins::lookup(name, &kinds, true) {
                    Some(b) if b.matches(&kinds) => {
                        e.ty = Some(b.ret.clone());
                        Ok(())
                    }
                    Some(b) => {
                        if b.params.len() != kinds.len() {
                            return Err(SemanticError::ArgCount {
                                name: b.name.into(),
                                expected: b.params.len(),
                                found: kinds.len(),
                                loc: e.loc,
                            });
                        }
                        let (i, expected) = b
                            .params
                            .iter()
                            .zip(&kinds)
                            .enumerate()
                            .find(|(_, (p, k))| p != k)
                            .map(|(i, (p, _))| (i, *p))
                            .expect("some argument mismatches");
                        Err(SemanticError::ArgType {
                            position: i + 1,
                            name: b.name.into(),
                            expected: expected.to_string(),
                            found: kinds[i].to_string(),
                            loc: args[i].loc,
                        })
                    }
                    None => Err(SemanticError::UnknownFunction {
                        name: name.clone(),
                        loc: e.loc,
                    }),
                }
            }

            ExprKind::Binary { op, l, r } => {
                self.expr(l)?;
                self.expr(r)?;
                let l_ty = l.ty().clone();
                let r_ty = r.ty().clone();
                let op = *op;
                let mismatch = || SemanticError::InvalidBinaryOp {
                    op: op.as_str().into(),
                    l: l_ty.to_string(),
                    r: r_ty.to_string(),
                    loc: e.loc,
                };

                let ty = match op {
                    BinOp::Add => {
                        if l_ty.is_string() && r_ty.is_string() {
                            Ty::String
                        } else {
                            coerce_numeric(&l_ty, &r_ty).ok_or_else(mismatch)?
                        }
                    }
                    BinOp::Sub | BinOp::Mul | BinOp::Pow | BinOp::IntDiv | BinOp::Mod => {
                        coerce_numeric(&l_ty, &r_ty).ok_or_else(mismatch)?
                    }
                    BinOp::Div => coerce_division(&l_ty, &r_ty).ok_or_else(mismatch)?,
                    BinOp::And | BinOp::Or => {
                        if l_ty.is_numeric() && r_ty.is_numeric() {
                            Ty::Integer
                        } else {
                            return Err(mismatch());
                        }
                    }
                    BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Lte | BinOp::Gt | BinOp::Gte => {
                        if Ty::matching_elementary(&l_ty, &r_ty) {
                            Ty::Integer
                        } else {
                            return Err(mismatch());
                        }
                    }
                };
                e.ty = Some(ty);
                Ok(())
            }

            ExprKind::Unary { op, r } => {
                self.expr(r)?;
                let r_ty = r.ty().clone();
                let ty = match op {
                    UnOp::Neg => {
                        if !r_ty.is_numeric() {
                            return Err(SemanticError::InvalidUnaryOp {
                                op: "-".into(),
                                operand: r_ty.to_string(),
                                loc: e.loc,
                            });
                        }
                        r_ty
                    }
                    UnOp::Not => {
                        if !r_ty.is_numeric() {
                            return Err(SemanticError::InvalidUnaryOp {
                                op: "NOT".into(),
                                operand: r_ty.to_string(),
                                loc: e.loc,
                            });
                        }
                        Ty::Integer
                    }
                    UnOp::Parens => r_ty,
                };
                e.ty = Some(ty);
                Ok(())
            }
        }
    }

    /// Analyzes an assignment or INPUT target. The result must be a
    /// variable or an array element; constants are rejected.
    fn target(&mut self, e: &mut Expr) -> Result<(), SemanticError> {
        // Const check first: the name is still visible here.
        if let ExprKind::VarRef { name, .. } = &e.kind {
            let is_const = self
                .lookup_symbol(name)
                .map(|s| s.kind == SymbolKind::Const)
                .unwrap_or(false);
            if is_const {
                return Err(SemanticError::AssignToConst {
                    name: name.clone(),
                    loc: e.loc,
                });
            }
        }
        self.expr(e)?;
        match &e.kind {
            ExprKind::VarRef { .. } => Ok(()),
            ExprKind::FnCall {
                storage: Some(_), ..
            } => Ok(()),
            _ => Err(SemanticError::InvalidTarget { loc: e.loc }),
        }
    }

    // ==================== Resolution ====================

    /// Looks a name up through the scope chain and reports which runtime
    /// dictionary it lives in. Module-level symbols resolve as `Global`
    /// from inside a procedure; module code addresses its own variables as
    /// `Local` (the module frame is the global dictionary at run time, so
    /// the two agree).
    fn resolve(&self, name: &str) -> Option<(Ty, Storage)> {
        if let Some(ctx) = &self.cur {
            if let Some(s) = ctx.params.lookup(name) {
                return Some((s.ty.clone(), Storage::Param));
            }
            if let Some(s) = ctx.locals.lookup(name) {
                return Some((s.ty.clone(), Storage::Local));
            }
            if let Some(s) = self.module_locals.lookup(name) {
                return Some((s.ty.clone(), Storage::Global));
            }
            if let Some(s) = self.module_globals.lookup(name) {
                return Some((s.ty.clone(), Storage::Global));
            }
            None
        } else {
            if let Some(s) = self.module_locals.lookup(name) {
                return Some((s.ty.clone(), Storage::Local));
            }
            if let Some(s) = self.module_globals.lookup(name) {
                return Some((s.ty.clone(), Storage::Global));
            }
            None
        }
    }

    fn lookup_symbol(&self, name: &str) -> Option<&Symbol> {
        if let Some(ctx) = &self.cur {
            ctx.params
                .lookup(name)
                .or_else(|| ctx.locals.lookup(name))
                .or_else(|| self.module_locals.lookup(name))
                .or_else(|| self.module_globals.lookup(name))
        } else {
            self.module_locals
                .lookup(name)
                .or_else(|| self.module_globals.lookup(name))
        }
    }

    fn find_sig(&self, name: &str) -> Option<&ProcSig> {
        let canonical = name.to_ascii_lowercase();
        self.sigs.iter().find(|s| s.canonical == canonical)
    }
}

fn require_numeric(e: &Expr) -> Result<(), SemanticError> {
    if e.ty().is_numeric() {
        Ok(())
    } else {
        Err(SemanticError::TypeMismatch {
            expected: "a numeric expression".into(),
            found: e.ty().to_string(),
            loc: e.loc,
        })
    }
}

fn require_elementary(e: &Expr) -> Result<(), SemanticError> {
    if e.ty().is_elementary() {
        Ok(())
    } else {
        Err(SemanticError::TypeMismatch {
            expected: "an elementary value".into(),
            found: e.ty().to_string(),
            loc: e.loc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;

    fn analyzed(source: &str) -> Module {
        let mut m = parse(&lex(source).unwrap()).unwrap();
        analyze(&mut m).unwrap();
        m
    }

    fn analyze_err(source: &str) -> SemanticError {
        let mut m = parse(&lex(source).unwrap()).unwrap();
        analyze(&mut m).unwrap_err()
    }

    fn walk_exprs<'a>(stmts: &'a [Stmt], out: &mut Vec<&'a Expr>) {
        fn expr<'a>(e: &'a Expr, out: &mut Vec<&'a Expr>) {
            out.push(e);
            match &e.kind {
                ExprKind::Binary { l, r, .. } => {
                    expr(l, out);
                    expr(r, out);
                }
                ExprKind::Unary { r, .. } => expr(r, out),
                ExprKind::FnCall { args, .. } => {
                    for a in args {
                        expr(a, out);
                    }
                }
                _ => {}
            }
        }
        for s in stmts {
            match &s.kind {
                StmtKind::Assign { target, value } => {
                    expr(target, out);
                    expr(value, out);
                }
                StmtKind::Print { items } => {
                    for i in items {
                        if let PrintItem::Value(e) = i {
                            expr(e, out);
                        }
                    }
                }
                StmtKind::If { arms, else_stmts } => {
                    for a in arms {
                        expr(&a.cond, out);
                        walk_exprs(&a.stmts, out);
                    }
                    walk_exprs(else_stmts, out);
                }
                StmtKind::CondLoop { cond, stmts, .. } => {
                    expr(cond, out);
                    walk_exprs(stmts, out);
                }
                _ => {}
            }
        }
    }

    #[test]
    fn every_expression_gets_a_type() {
        let m = analyzed("x = 1 + 2 * 3\nIF x > 2 THEN PRINT \"Y\" ELSE PRINT x");
        let mut exprs = Vec::new();
        walk_exprs(&m.stmts, &mut exprs);
        assert!(!exprs.is_empty());
        for e in exprs {
            assert!(e.ty.is_some(), "untyped expression: {:?}", e);
        }
    }

    #[test]
    fn implicit_declaration_uses_the_sigil() {
        let m = analyzed("n% = 1\ns$ = \"hi\"\nd# = 1");
        assert_eq!(m.local_symbols.lookup("n%").unwrap().ty, Ty::Integer);
        assert_eq!(m.local_symbols.lookup("s$").unwrap().ty, Ty::String);
        assert_eq!(m.local_symbols.lookup("d#").unwrap().ty, Ty::Double);
    }

    #[test]
    fn unsigiled_names_default_to_single() {
        let m = analyzed("x = 1");
        assert_eq!(m.local_symbols.lookup("x").unwrap().ty, Ty::Single);
    }

    #[test]
    fn every_varref_gets_storage() {
        let m = analyzed("x = 1\ny = x");
        match &m.stmts[1].kind {
            StmtKind::Assign { value, .. } => match &value.kind {
                ExprKind::VarRef { storage, .. } => {
                    assert_eq!(*storage, Some(Storage::Local))
                }
                other => panic!("expected VarRef, got {:?}", other),
            },
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn numeric_plus_string_is_rejected() {
        let err = analyze_err("PRINT 1 + \"x\"");
        assert!(matches!(err, SemanticError::InvalidBinaryOp { .. }));
    }

    #[test]
    fn comparison_yields_integer() {
        let m = analyzed("r = 1 < 2");
        match &m.stmts[0].kind {
            StmtKind::Assign { value, .. } => assert_eq!(value.ty(), &Ty::Integer),
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn division_never_yields_an_integer_type() {
        // INTEGER \ INTEGER stays INTEGER, INTEGER / INTEGER is SINGLE.
        let m = analyzed("a% = 1\nb% = 2\nr = a% \\ b%\nq = a% / b%");
        match (&m.stmts[2].kind, &m.stmts[3].kind) {
            (StmtKind::Assign { value: a, .. }, StmtKind::Assign { value: b, .. }) => {
                assert_eq!(a.ty(), &Ty::Integer);
                assert_eq!(b.ty(), &Ty::Single);
            }
            other => panic!("expected two assigns, got {:?}", other),
        }
    }

    #[test]
    fn string_comparison_is_allowed() {
        let m = analyzed("r = \"a\" < \"b\"");
        match &m.stmts[0].kind {
            StmtKind::Assign { value, .. } => assert_eq!(value.ty(), &Ty::Integer),
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn nullary_function_reference_becomes_a_call() {
        let m = analyzed("FUNCTION f%\nf% = 7\nEND FUNCTION\nx = f%");
        match &m.stmts[0].kind {
            StmtKind::Assign { value, .. } => {
                assert!(matches!(value.kind, ExprKind::FnCall { .. }));
                assert_eq!(value.ty(), &Ty::Integer);
            }
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn function_result_variable_is_local() {
        let m = analyzed("FUNCTION f%\nf% = 7\nEND FUNCTION");
        assert!(m.procs[0].local_symbols.lookup("f%").is_some());
    }

    #[test]
    fn recursive_call_is_not_shadowed_by_the_result_variable() {
        let m = analyzed(
            "FUNCTION fact&(n%)\nIF n% <= 1 THEN fact& = 1 ELSE fact& = n% * fact&(n% - 1)\nEND FUNCTION\nPRINT fact&(3)",
        );
        assert_eq!(m.procs.len(), 1);
    }

    #[test]
    fn call_arity_is_checked() {
        let err = analyze_err("FUNCTION f%(a%)\nf% = a%\nEND FUNCTION\nx = f%(1, 2)");
        assert!(matches!(err, SemanticError::ArgCount { .. }));
    }

    #[test]
    fn call_argument_types_are_checked() {
        let err = analyze_err("FUNCTION f%(a%)\nf% = a%\nEND FUNCTION\nx = f%(\"s\")");
        assert!(matches!(err, SemanticError::ArgType { .. }));
    }

    #[test]
    fn builtin_mismatch_gets_a_targeted_error() {
        let err = analyze_err("x = LEN(1)");
        match err {
            SemanticError::ArgType {
                position, name, ..
            } => {
                assert_eq!(position, 1);
                assert_eq!(name, "LEN");
            }
            other => panic!("expected ArgType, got {:?}", other),
        }
    }

    #[test]
    fn unknown_function_is_reported() {
        let err = analyze_err("x = NOSUCH(1)");
        assert!(matches!(err, SemanticError::UnknownFunction { .. }));
    }

    #[test]
    fn dim_declares_an_array_global() {
        let m = analyzed("DIM a(4) AS INTEGER\na(0) = 1");
        let ty = &m.global_symbols.lookup("a").unwrap().ty;
        assert_eq!(
            *ty,
            Ty::Array {
                elem: Box::new(Ty::Integer),
                rank: 1
            }
        );
        // The element access resolved and typed as the element.
        match &m.stmts[1].kind {
            StmtKind::Assign { target, .. } => {
                assert_eq!(target.ty(), &Ty::Integer);
                assert!(matches!(
                    target.kind,
                    ExprKind::FnCall {
                        storage: Some(_),
                        ..
                    }
                ));
            }
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn array_subscript_count_is_checked() {
        let err = analyze_err("DIM a(2, 2)\nx = a(1)");
        assert!(matches!(err, SemanticError::DimCount { .. }));
    }

    #[test]
    fn module_dims_are_visible_inside_functions() {
        let m = analyzed("DIM a(4)\nFUNCTION f\nf = UBOUND(a)\nEND FUNCTION");
        assert!(m.global_symbols.lookup("a").is_some());
    }

    #[test]
    fn const_cannot_be_assigned() {
        let err = analyze_err("CONST n = 3\nn = 4");
        assert!(matches!(err, SemanticError::AssignToConst { .. }));
    }

    #[test]
    fn duplicate_dim_is_rejected() {
        let err = analyze_err("DIM a(2)\nDIM a(3)");
        assert!(matches!(err, SemanticError::Duplicate { .. }));
    }

    #[test]
    fn if_condition_must_be_numeric() {
        let err = analyze_err("IF \"x\" THEN PRINT 1");
        assert!(matches!(err, SemanticError::TypeMismatch { .. }));
    }

    #[test]
    fn not_yields_integer() {
        let m = analyzed("r = NOT 0");
        match &m.stmts[0].kind {
            StmtKind::Assign { value, .. } => assert_eq!(value.ty(), &Ty::Integer),
            other => panic!("expected Assign, got {:?}", other),
        }
    }

    #[test]
    fn parens_pass_the_type_through() {
        let m = analyzed("s$ = (\"a\" + \"b\")");
        match &m.stmts[0].kind {
            StmtKind::Assign { value, .. } => assert_eq!(value.ty(), &Ty::String),
            other => panic!("expected Assign, got {:?}", other),
        }
    }
}
