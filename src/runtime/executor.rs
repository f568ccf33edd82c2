//! The trampoline executor.
//!
//! Walks a compiled statement list, running each record and acting on the
//! directive it returns: nothing means fall through, otherwise jump
//! (goto), push-and-jump (gosub), pop-and-jump (return), or terminate
//! (end). Function calls re-enter the same loop on the callee's statement
//! list with a fresh frame; the return value is whatever the body left in
//! the local named after the function.
//!
//! All I/O goes through the [`Host`](super::Host) boundary. The host's
//! stop flag is checked between statements, so cancellation is
//! cooperative and never corrupts state.

use crate::ast::Loc;
use crate::codegen::{
    CExpr, CompiledProgram, CompiledStmt, ExecutionDirective, PrintArg, RunOp, Runnable, Target,
    VarSlot,
};
use crate::runtime::builtins::{self, ParamKind};
use crate::runtime::error::RuntimeError;
use crate::runtime::value::{default_value, format_num, ArrayObj, Value};
use crate::runtime::Host;
use crate::semantic::symbols::Storage;
use crate::semantic::types::Ty;
use crate::ast::{BinOp, UnOp};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Print zones are 14 columns wide.
const PRINT_ZONE: usize = 14;

/// A function invocation's variable dictionaries.
#[derive(Default)]
struct Frame {
    locals: HashMap<String, Value>,
    params: HashMap<String, Value>,
    temps: HashMap<String, Value>,
}

/// Executes a [`CompiledProgram`].
pub struct Executor<'p> {
    program: &'p CompiledProgram,
    /// Module-level variables. Module code's frame *is* this dictionary.
    globals: HashMap<String, Value>,
    frames: Vec<Frame>,
    root_temps: HashMap<String, Value>,
    /// Current output column, for comma print zones.
    col: usize,
    /// Set once END runs (or the host requests a stop); unwinds nested
    /// trampolines.
    ended: bool,
}

impl<'p> Executor<'p> {
    /// Creates an executor over a compiled program.
    pub fn new(program: &'p CompiledProgram) -> Self {
        Self {
            program,
            globals: HashMap::new(),
            frames: Vec::new(),
            root_temps: HashMap::new(),
            col: 0,
            ended: false,
        }
    }

    /// Runs the module statements to completion.
    pub fn run(&mut self, host: &mut dyn Host) -> Result<(), RuntimeError> {
        let program = self.program;
        self.run_stmts(host, &program.stmts)
    }

    /// The trampoline proper.
    fn run_stmts(
        &mut self,
        host: &mut dyn Host,
        stmts: &[CompiledStmt],
    ) -> Result<(), RuntimeError> {
        let labels = label_map(stmts);
        let mut gosub_stack: Vec<usize> = Vec::new();
        let mut pc = 0usize;

        while pc < stmts.len() {
            if self.ended {
                return Ok(());
            }
            if host.stop_requested() {
                self.ended = true;
                return Ok(());
            }
            match &stmts[pc] {
                CompiledStmt::Label(_) => pc += 1,
                CompiledStmt::Run(r) => match self.exec(host, r)? {
                    None => pc += 1,
                    Some(ExecutionDirective::Goto(dest)) => {
                        pc = jump(&labels, &dest, r.loc)?;
                    }
                    Some(ExecutionDirective::Gosub(dest)) => {
                        gosub_stack.push(pc + 1);
                        pc = jump(&labels, &dest, r.loc)?;
                    }
                    Some(ExecutionDirective::Return(dest)) => {
                        let back = gosub_stack
                            .pop()
                            .ok_or_else(|| RuntimeError::at(r.loc, "RETURN without GOSUB"))?;
                        pc = match dest {
                            Some(d) => jump(&labels, &d, r.loc)?,
                            None => back,
                        };
                    }
                    Some(ExecutionDirective::End) => {
                        self.ended = true;
                        return Ok(());
                    }
                },
            }
        }
        Ok(())
    }

    /// Runs one statement record.
    fn exec(
        &mut self,
        host: &mut dyn Host,
        r: &Runnable,
    ) -> Result<Option<ExecutionDirective>, RuntimeError> {
        let loc = r.loc;
        match &r.op {
            RunOp::Assign { target, value } => {
                let v = self.eval(host, value, loc)?;
                if self.ended {
                    return Ok(None);
                }
                self.store(host, target, v, loc)?;
                Ok(None)
            }

            RunOp::DimArray { slot, elem, dims } => {
                let mut bounds = Vec::new();
                for (lower, upper) in dims {
                    let lo = self.eval(host, lower, loc)?.as_num().map_err(wrap(loc))?;
                    let hi = self.eval(host, upper, loc)?.as_num().map_err(wrap(loc))?;
                    let (lo, hi) = (lo.round() as i64, hi.round() as i64);
                    if lo > hi {
                        return Err(RuntimeError::at(loc, "array bounds are reversed"));
                    }
                    bounds.push((lo, hi));
                }
                let array = ArrayObj::new(elem.clone(), bounds);
                self.dict(slot.storage)
                    .insert(slot.name.clone(), Value::Array(Rc::new(RefCell::new(array))));
                Ok(None)
            }

            RunOp::Goto { dest } => Ok(Some(ExecutionDirective::Goto(dest.clone()))),

            RunOp::BranchUnless { cond, dest } => {
                if self.eval(host, cond, loc)?.truthy() {
                    Ok(None)
                } else {
                    Ok(Some(ExecutionDirective::Goto(dest.clone())))
                }
            }

            RunOp::ExitLoopIf {
                cond,
                negated,
                dest,
            } => {
                let t = self.eval(host, cond, loc)?.truthy();
                let exit = if *negated { !t } else { t };
                if exit {
                    Ok(Some(ExecutionDirective::Goto(dest.clone())))
                } else {
                    Ok(None)
                }
            }

            RunOp::ForInit {
                counter,
                start,
                step_temp,
                step,
                end_temp,
                end,
            } => {
                let start = self.eval(host, start, loc)?;
                self.store(host, counter, start, loc)?;
                let step = self.eval(host, step, loc)?;
                let end = self.eval(host, end, loc)?;
                let temps = self.temps();
                temps.insert(step_temp.clone(), step);
                temps.insert(end_temp.clone(), end);
                Ok(None)
            }

            RunOp::ForGuard {
                counter,
                step_temp,
                end_temp,
                dest,
            } => {
                let c = self.eval(host, counter, loc)?.as_num().map_err(wrap(loc))?;
                let step = self.temp_num(step_temp, loc)?;
                let end = self.temp_num(end_temp, loc)?;
                let done = (step >= 0.0 && c > end) || (step < 0.0 && c < end);
                if done {
                    Ok(Some(ExecutionDirective::Goto(dest.clone())))
                } else {
                    Ok(None)
                }
            }

            RunOp::ForNext {
                counter,
                step_temp,
                dest,
            } => {
                let step = self.temp_num(step_temp, loc)?;
                let cur = self.load_target(counter, loc)?.as_num().map_err(wrap(loc))?;
                self.store(host, counter, Value::Num(cur + step), loc)?;
                Ok(Some(ExecutionDirective::Goto(dest.clone())))
            }

            RunOp::FreeTemps { names } => {
                let temps = self.temps();
                for name in names {
                    temps.remove(name);
                }
                Ok(None)
            }

            RunOp::Gosub { dest } => Ok(Some(ExecutionDirective::Gosub(dest.clone()))),
            RunOp::Return { dest } => Ok(Some(ExecutionDirective::Return(dest.clone()))),
            RunOp::End => Ok(Some(ExecutionDirective::End)),

            RunOp::Print { args } => {
                self.do_print(host, args, loc)?;
                Ok(None)
            }

            RunOp::Input { prompt, targets } => {
                self.do_input(host, prompt.as_deref(), targets, loc)?;
                Ok(None)
            }
        }
    }

    // ==================== PRINT / INPUT ====================

    fn do_print(
        &mut self,
        host: &mut dyn Host,
        args: &[PrintArg],
        loc: Loc,
    ) -> Result<(), RuntimeError> {
        for arg in args {
            match arg {
                PrintArg::Semicolon => {}
                PrintArg::Comma => {
                    let pad = PRINT_ZONE - (self.col % PRINT_ZONE);
                    self.emit(host, &" ".repeat(pad));
                }
                PrintArg::Value(e) => match self.eval(host, e, loc)? {
                    _ if self.ended => return Ok(()),
                    Value::Num(n) => {
                        let sign = if n < 0.0 { "" } else { " " };
                        self.emit(host, &format!("{}{} ", sign, format_num(n)));
                    }
                    Value::Str(s) => self.emit(host, &s),
                    Value::Array(_) => {
                        return Err(RuntimeError::at(loc, "cannot PRINT an array"))
                    }
                },
            }
        }
        let suppress_newline = matches!(args.last(), Some(PrintArg::Comma | PrintArg::Semicolon));
        if !suppress_newline {
            self.emit(host, "\n");
        }
        Ok(())
    }

    fn do_input(
        &mut self,
        host: &mut dyn Host,
        prompt: Option<&str>,
        targets: &[(Target, Ty)],
        loc: Loc,
    ) -> Result<(), RuntimeError> {
        'redo: loop {
            self.emit(host, prompt.unwrap_or("? "));
            let line = host.read_line();
            // The user's newline moved the cursor to a fresh line.
            self.col = 0;

            let fields = split_fields(&line);
            if fields.len() != targets.len() {
                self.emit(host, "Redo from start\n");
                continue 'redo;
            }

            let mut values = Vec::with_capacity(fields.len());
            for (field, (_, ty)) in fields.iter().zip(targets) {
                if ty.is_numeric() {
                    match field.trim().parse::<f64>() {
                        Ok(n) if n.is_finite() => values.push(Value::Num(n)),
                        _ => {
                            self.emit(host, "Redo from start\n");
                            continue 'redo;
                        }
                    }
                } else {
                    values.push(Value::Str(field.clone()));
                }
            }

            for ((target, _), value) in targets.iter().zip(values) {
                self.store(host, target, value, loc)?;
            }
            return Ok(());
        }
    }

    /// Writes through the host, tracking the output column.
    fn emit(&mut self, host: &mut dyn Host, text: &str) {
        host.write(text);
        match text.rfind('\n') {
            Some(i) => self.col = text[i + 1..].chars().count(),
            None => self.col += text.chars().count(),
        }
    }

    // ==================== Expression evaluation ====================

    fn eval(&mut self, host: &mut dyn Host, e: &CExpr, loc: Loc) -> Result<Value, RuntimeError> {
        match e {
            CExpr::Num(n) => Ok(Value::Num(*n)),
            CExpr::Str(s) => Ok(Value::Str(s.clone())),
            CExpr::Var(slot) => Ok(self.load_var(slot)),
            CExpr::Temp(name) => self
                .temps()
                .get(name)
                .cloned()
                .ok_or_else(|| RuntimeError::at(loc, format!("missing temp `{}`", name))),

            CExpr::Index { slot, indices } => {
                let idx = self.eval_indices(host, indices, loc)?;
                let array = self.array_of(slot, loc)?;
                let obj = array.borrow();
                let offset = obj.offset(&idx).map_err(wrap(loc))?;
                Ok(obj.data[offset].clone())
            }

            CExpr::CallFn { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for a in args {
                    values.push(self.eval(host, a, loc)?);
                }
                self.call_fn(host, name, values, loc)
            }

            CExpr::CallBuiltin { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for a in args {
                    values.push(self.eval(host, a, loc)?);
                }
                let kinds: Vec<ParamKind> = values.iter().map(ParamKind::of_value).collect();
                let builtin = builtins::lookup(name, &kinds, false)
                    .ok_or_else(|| RuntimeError::at(loc, format!("unknown function `{}`", name)))?;
                (builtin.run)(&values).map_err(wrap(loc))
            }

            CExpr::Binary { op, l, r } => {
                let lv = self.eval(host, l, loc)?;
                let rv = self.eval(host, r, loc)?;
                binary_op(*op, lv, rv, loc)
            }

            CExpr::Unary { op, r } => {
                let rv = self.eval(host, r, loc)?;
                match op {
                    UnOp::Parens => Ok(rv),
                    UnOp::Neg => Ok(Value::Num(-rv.as_num().map_err(wrap(loc))?)),
                    UnOp::Not => {
                        let n = rv.as_num().map_err(wrap(loc))?;
                        Ok(Value::Num(!(n.round() as i64) as f64))
                    }
                }
            }
        }
    }

    fn eval_indices(
        &mut self,
        host: &mut dyn Host,
        indices: &[CExpr],
        loc: Loc,
    ) -> Result<Vec<i64>, RuntimeError> {
        let mut out = Vec::with_capacity(indices.len());
        for e in indices {
            let n = self.eval(host, e, loc)?.as_num().map_err(wrap(loc))?;
            out.push(n.round() as i64);
        }
        Ok(out)
    }

    /// Runs a FUNCTION body in a fresh frame and reads the result out of
    /// the implicit local named after the function.
    fn call_fn(
        &mut self,
        host: &mut dyn Host,
        name: &str,
        args: Vec<Value>,
        loc: Loc,
    ) -> Result<Value, RuntimeError> {
        let program = self.program;
        let proc = program
            .procs
            .iter()
            .find(|p| p.canonical == name)
            .ok_or_else(|| RuntimeError::at(loc, format!("unknown function `{}`", name)))?;
        if args.len() != proc.params.len() {
            return Err(RuntimeError::at(
                loc,
                format!("function `{}` argument count mismatch", proc.name),
            ));
        }

        let mut frame = Frame::default();
        for (param, value) in proc.params.iter().zip(args) {
            frame.params.insert(param.clone(), value);
        }
        frame
            .locals
            .insert(proc.canonical.clone(), default_value(&proc.ret_ty));

        self.frames.push(frame);
        let result = self.run_stmts(host, &proc.stmts);
        let frame = self.frames.pop().expect("frame pushed above");
        result?;

        Ok(frame
            .locals
            .get(&proc.canonical)
            .cloned()
            .unwrap_or_else(|| default_value(&proc.ret_ty)))
    }

    // ==================== Storage ====================

    /// The dictionary a storage class addresses. For module-level code the
    /// local dictionary *is* the global one.
    fn dict(&mut self, storage: Storage) -> &mut HashMap<String, Value> {
        match storage {
            Storage::Global => &mut self.globals,
            Storage::Local => match self.frames.last_mut() {
                Some(frame) => &mut frame.locals,
                None => &mut self.globals,
            },
            Storage::Param => match self.frames.last_mut() {
                Some(frame) => &mut frame.params,
                None => &mut self.globals,
            },
        }
    }

    fn temps(&mut self) -> &mut HashMap<String, Value> {
        match self.frames.last_mut() {
            Some(frame) => &mut frame.temps,
            None => &mut self.root_temps,
        }
    }

    fn temp_num(&mut self, name: &str, loc: Loc) -> Result<f64, RuntimeError> {
        self.temps()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::at(loc, format!("missing temp `{}`", name)))?
            .as_num()
            .map_err(wrap(loc))
    }

    /// Reads a variable, defaulting an unset one by its name's sigil.
    fn load_var(&mut self, slot: &VarSlot) -> Value {
        let default = default_value(&Ty::from_name(&slot.name));
        let dict = self.dict(slot.storage);
        match dict.get(&slot.name) {
            Some(v) => v.clone(),
            None => {
                dict.insert(slot.name.clone(), default.clone());
                default
            }
        }
    }

    fn array_of(
        &mut self,
        slot: &VarSlot,
        loc: Loc,
    ) -> Result<Rc<RefCell<ArrayObj>>, RuntimeError> {
        match self.dict(slot.storage).get(&slot.name) {
            Some(Value::Array(a)) => Ok(a.clone()),
            _ => Err(RuntimeError::at(
                loc,
                format!("array `{}` used before DIM", slot.name),
            )),
        }
    }

    fn load_target(&mut self, target: &Target, loc: Loc) -> Result<Value, RuntimeError> {
        match target {
            Target::Var(slot) => Ok(self.load_var(slot)),
            Target::Index { slot, .. } => Err(RuntimeError::at(
                loc,
                format!("array element `{}` cannot be a loop counter", slot.name),
            )),
        }
    }

    fn store(
        &mut self,
        host: &mut dyn Host,
        target: &Target,
        value: Value,
        loc: Loc,
    ) -> Result<(), RuntimeError> {
        match target {
            Target::Var(slot) => {
                self.dict(slot.storage).insert(slot.name.clone(), value);
                Ok(())
            }
            Target::Index { slot, indices } => {
                // Evaluate the subscripts before borrowing the array.
                let idx = self.eval_indices(host, indices, loc)?;
                let array = self.array_of(slot, loc)?;
                let mut obj = array.borrow_mut();
                let offset = obj.offset(&idx).map_err(wrap(loc))?;
                obj.data[offset] = value;
                Ok(())
            }
        }
    }
}

fn label_map(stmts: &[CompiledStmt]) -> HashMap<&str, usize> {
    let mut map = HashMap::new();
    for (i, stmt) in stmts.iter().enumerate() {
        if let CompiledStmt::Label(name) = stmt {
            map.insert(name.as_str(), i);
        }
    }
    map
}

fn jump(labels: &HashMap<&str, usize>, dest: &str, loc: Loc) -> Result<usize, RuntimeError> {
    labels
        .get(dest)
        .copied()
        .ok_or_else(|| RuntimeError::at(loc, format!("undefined label `{}`", dest)))
}

fn wrap(loc: Loc) -> impl Fn(String) -> RuntimeError {
    move |message| RuntimeError::at(loc, message)
}

fn binary_op(op: BinOp, l: Value, r: Value, loc: Loc) -> Result<Value, RuntimeError> {
    use BinOp::*;
    match op {
        Add => match (&l, &r) {
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
            _ => num_op(l, r, loc, |a, b| Ok(a + b)),
        },
        Sub => num_op(l, r, loc, |a, b| Ok(a - b)),
        Mul => num_op(l, r, loc, |a, b| Ok(a * b)),
        Div => num_op(l, r, loc, |a, b| Ok(a / b)),
        Pow => num_op(l, r, loc, |a, b| Ok(a.powf(b))),
        IntDiv => num_op(l, r, loc, |a, b| {
            if b == 0.0 {
                Err("division by zero".to_string())
            } else {
                Ok((a / b).floor())
            }
        }),
        Mod => num_op(l, r, loc, |a, b| {
            let (a, b) = (a.round() as i64, b.round() as i64);
            if b == 0 {
                Err("division by zero".to_string())
            } else {
                Ok((a % b) as f64)
            }
        }),
        And => num_op(l, r, loc, |a, b| {
            Ok(((a.round() as i64) & (b.round() as i64)) as f64)
        }),
        Or => num_op(l, r, loc, |a, b| {
            Ok(((a.round() as i64) | (b.round() as i64)) as f64)
        }),
        Eq | Ne | Lt | Lte | Gt | Gte => compare(op, l, r, loc),
    }
}

fn num_op(
    l: Value,
    r: Value,
    loc: Loc,
    f: impl Fn(f64, f64) -> Result<f64, String>,
) -> Result<Value, RuntimeError> {
    let a = l.as_num().map_err(wrap(loc))?;
    let b = r.as_num().map_err(wrap(loc))?;
    f(a, b).map(Value::Num).map_err(wrap(loc))
}

/// Comparisons yield the QBasic truth values -1 and 0.
fn compare(op: BinOp, l: Value, r: Value, loc: Loc) -> Result<Value, RuntimeError> {
    use std::cmp::Ordering;
    let ordering = match (&l, &r) {
        (Value::Num(a), Value::Num(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => return Err(RuntimeError::at(loc, "cannot compare these values")),
    };
    let result = match op {
        BinOp::Eq => ordering == Ordering::Equal,
        BinOp::Ne => ordering != Ordering::Equal,
        BinOp::Lt => ordering == Ordering::Less,
        BinOp::Lte => ordering != Ordering::Greater,
        BinOp::Gt => ordering == Ordering::Greater,
        BinOp::Gte => ordering != Ordering::Less,
        _ => unreachable!("non-comparison operator"),
    };
    Ok(Value::Num(if result { -1.0 } else { 0.0 }))
}

/// Splits an INPUT line into comma-separated fields. Unquoted fields are
/// whitespace-trimmed; double-quoted fields keep their content verbatim.
fn split_fields(line: &str) -> Vec<String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut fields = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(' ' | '\t')) {
            chars.next();
        }
        if chars.peek() == Some(&'"') {
            chars.next();
            let mut field = String::new();
            for c in chars.by_ref() {
                if c == '"' {
                    break;
                }
                field.push(c);
            }
            // Anything up to the separating comma is discarded.
            while chars.peek().is_some_and(|&c| c != ',') {
                chars.next();
            }
            fields.push(field);
        } else {
            let mut field = String::new();
            while chars.peek().is_some_and(|&c| c != ',') {
                field.push(chars.next().expect("peeked"));
            }
            fields.push(field.trim().to_string());
        }
        match chars.peek() {
            Some(',') => {
                chars.next();
            }
            _ => break,
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ScriptedHost;

    fn compile(source: &str) -> CompiledProgram {
        let tokens = crate::lexer::lex(source).unwrap();
        let mut module = crate::parser::parse(&tokens).unwrap();
        crate::semantic::analyze(&mut module).unwrap();
        crate::codegen::generate(&module, "test.bas").unwrap()
    }

    fn run(source: &str) -> String {
        run_with_input(source, &[])
    }

    fn run_with_input(source: &str, input: &[&str]) -> String {
        let program = compile(source);
        let mut host = ScriptedHost::new(input);
        Executor::new(&program).run(&mut host).unwrap();
        host.output
    }

    fn run_err(source: &str) -> RuntimeError {
        let program = compile(source);
        let mut host = ScriptedHost::new(&[]);
        Executor::new(&program).run(&mut host).unwrap_err()
    }

    #[test]
    fn print_hello() {
        assert_eq!(run("PRINT \"HELLO\""), "HELLO\n");
    }

    #[test]
    fn numbers_print_with_sign_space_and_trailing_space() {
        assert_eq!(run("PRINT 1"), " 1 \n");
        assert_eq!(run("PRINT -2"), "-2 \n");
        assert_eq!(run("PRINT 1.5"), " 1.5 \n");
    }

    #[test]
    fn trailing_semicolon_suppresses_newline() {
        assert_eq!(run("PRINT \"A\";\nPRINT \"B\""), "AB\n");
    }

    #[test]
    fn comma_pads_to_print_zones() {
        assert_eq!(run("PRINT \"AB\", \"C\""), format!("AB{}C\n", " ".repeat(12)));
        assert_eq!(run("PRINT ,\"X\""), format!("{}X\n", " ".repeat(14)));
    }

    #[test]
    fn for_loop_counts() {
        assert_eq!(run("FOR i = 1 TO 3 : PRINT i : NEXT i"), " 1 \n 2 \n 3 \n");
    }

    #[test]
    fn for_loop_with_negative_step() {
        assert_eq!(
            run("FOR i = 3 TO 1 STEP -1 : PRINT i : NEXT i"),
            " 3 \n 2 \n 1 \n"
        );
    }

    #[test]
    fn for_loop_skipped_entirely_when_start_past_end() {
        assert_eq!(run("FOR i = 5 TO 1 : PRINT i : NEXT i\nPRINT \"done\""), "done\n");
    }

    #[test]
    fn nested_for_temps_are_released() {
        let source = "FOR i = 1 TO 2\nFOR j = 1 TO 2\nx = x + 1\nNEXT j\nNEXT i\nPRINT x";
        let program = compile(source);
        let mut host = ScriptedHost::new(&[]);
        let mut exec = Executor::new(&program);
        exec.run(&mut host).unwrap();
        assert!(exec.root_temps.is_empty());
        assert_eq!(host.output, " 4 \n");
    }

    #[test]
    fn do_until_loop() {
        assert_eq!(
            run("x = 0 : DO : x = x + 1 : LOOP UNTIL x >= 3 : PRINT x"),
            " 3 \n"
        );
    }

    #[test]
    fn do_while_skips_body_when_false() {
        assert_eq!(run("DO WHILE 0\nPRINT \"no\"\nLOOP\nPRINT \"yes\""), "yes\n");
    }

    #[test]
    fn exit_do_leaves_the_loop() {
        assert_eq!(run("DO\nPRINT \"once\"\nEXIT DO\nLOOP"), "once\n");
    }

    #[test]
    fn if_else_branches() {
        assert_eq!(run("IF 1+1 = 2 THEN PRINT \"Y\" ELSE PRINT \"N\""), "Y\n");
        assert_eq!(run("IF 1+1 = 3 THEN PRINT \"Y\" ELSE PRINT \"N\""), "N\n");
    }

    #[test]
    fn gosub_and_return() {
        assert_eq!(
            run("GOSUB greet\nPRINT \"after\"\nEND\ngreet:\nPRINT \"hi\"\nRETURN"),
            "hi\nafter\n"
        );
    }

    #[test]
    fn goto_jumps() {
        assert_eq!(run("GOTO skip\nPRINT \"no\"\nskip:\nPRINT \"yes\""), "yes\n");
    }

    #[test]
    fn end_terminates() {
        assert_eq!(run("PRINT \"a\"\nEND\nPRINT \"b\""), "a\n");
    }

    #[test]
    fn array_sum_via_bounds() {
        let source = "DIM A(4) AS INTEGER : A(1)=5 : A(2)=7 : A(3)=9 : A(4)=-2 : s=0 : \
                      FOR i=LBOUND(A) TO UBOUND(A) : s=s+A(i) : NEXT i : PRINT s";
        assert_eq!(run(source), " 19 \n");
    }

    #[test]
    fn array_subscript_out_of_range_is_a_runtime_error() {
        let err = run_err("DIM a(2)\nx = a(5)");
        assert!(err.message.contains("subscript"));
        assert_eq!(err.loc.line, 2);
    }

    #[test]
    fn lbound_bad_dimension_is_a_runtime_error() {
        let err = run_err("DIM a(2, 2)\nx = LBOUND(a, 3)");
        assert!(err.message.contains("dimension"));
    }

    #[test]
    fn integer_division_by_zero_is_a_runtime_error() {
        let err = run_err("x = 1 \\ 0");
        assert!(err.message.contains("division by zero"));
    }

    #[test]
    fn integer_division_floors() {
        assert_eq!(run("PRINT 7 \\ 2"), " 3 \n");
        assert_eq!(run("PRINT -7 \\ 2"), "-4 \n");
    }

    #[test]
    fn mod_rounds_operands() {
        assert_eq!(run("PRINT 7 MOD 3"), " 1 \n");
    }

    #[test]
    fn power_lowers_to_a_power_call() {
        assert_eq!(run("PRINT 2 ^ 10"), " 1024 \n");
    }

    #[test]
    fn logic_uses_qbasic_truth_values() {
        assert_eq!(run("PRINT 1 = 1"), "-1 \n");
        assert_eq!(run("PRINT 1 = 2"), " 0 \n");
        assert_eq!(run("PRINT NOT 0"), "-1 \n");
    }

    #[test]
    fn string_concat_and_compare() {
        assert_eq!(run("PRINT \"AB\" + \"CD\""), "ABCD\n");
        assert_eq!(run("PRINT \"a\" < \"b\""), "-1 \n");
    }

    #[test]
    fn function_call_returns_the_result_variable() {
        let source = "FUNCTION add%(a%, b%)\nadd% = a% + b%\nEND FUNCTION\nPRINT add%(2, 3)";
        assert_eq!(run(source), " 5 \n");
    }

    #[test]
    fn recursive_function() {
        let source = "FUNCTION fact&(n%)\nIF n% <= 1 THEN fact& = 1 ELSE fact& = n% * fact&(n% - 1)\nEND FUNCTION\nPRINT fact&(5)";
        assert_eq!(run(source), " 120 \n");
    }

    #[test]
    fn nullary_function_reference() {
        let source = "FUNCTION seven%\nseven% = 7\nEND FUNCTION\nPRINT seven%";
        assert_eq!(run(source), " 7 \n");
    }

    #[test]
    fn input_reads_and_coerces() {
        let out = run_with_input("INPUT a, b$ : PRINT a : PRINT b$", &["5, hello"]);
        assert_eq!(out, "?  5 \nhello\n");
    }

    #[test]
    fn input_redo_on_bad_number() {
        let out = run_with_input(
            "INPUT a, b$ : PRINT a : PRINT b$",
            &["not-a-number, hello", "5, hello"],
        );
        assert_eq!(out, "? Redo from start\n?  5 \nhello\n");
    }

    #[test]
    fn input_redo_on_arity_mismatch() {
        let out = run_with_input("INPUT a, b : PRINT a + b", &["1", "1, 2"]);
        assert_eq!(out, "? Redo from start\n?  3 \n");
    }

    #[test]
    fn input_quoted_fields_keep_commas() {
        let out = run_with_input("INPUT s$ : PRINT s$", &["\"a, b\""]);
        assert_eq!(out, "? a, b\n");
    }

    #[test]
    fn input_with_prompt() {
        let out = run_with_input("INPUT \"name\"; s$ : PRINT s$", &["ada"]);
        assert_eq!(out, "nameada\n");
    }

    #[test]
    fn const_is_usable() {
        assert_eq!(run("CONST n = 3\nPRINT n * 2"), " 6 \n");
    }

    #[test]
    fn stop_flag_halts_between_statements() {
        struct StopHost {
            writes: usize,
        }
        impl Host for StopHost {
            fn write(&mut self, _t: &str) {
                self.writes += 1;
            }
            fn read_line(&mut self) -> String {
                String::new()
            }
            fn stop_requested(&self) -> bool {
                self.writes > 0
            }
        }
        let program = compile("again:\nPRINT 1\nGOTO again");
        let mut host = StopHost { writes: 0 };
        Executor::new(&program).run(&mut host).unwrap();
        // One PRINT ran (two writes: value + newline), then the stop flag
        // took effect.
        assert!(host.writes <= 2);
    }

    #[test]
    fn return_without_gosub_is_a_runtime_error() {
        let err = run_err("RETURN");
        assert!(err.message.contains("RETURN without GOSUB"));
    }

    #[test]
    fn end_inside_a_function_terminates_the_program() {
        let source = "FUNCTION f%\nPRINT \"in\"\nEND\nf% = 1\nEND FUNCTION\nPRINT f%\nPRINT \"unreachable\"";
        assert_eq!(run(source), "in\n");
    }

    #[test]
    fn string_variables_default_to_empty() {
        assert_eq!(run("PRINT s$; \"|\""), "|\n");
    }

    #[test]
    fn split_fields_handles_quotes_and_spaces() {
        assert_eq!(split_fields("  5 , hello "), vec!["5", "hello"]);
        assert_eq!(split_fields("\"a, b\", c"), vec!["a, b", "c"]);
        assert_eq!(split_fields("one"), vec!["one"]);
    }
}
