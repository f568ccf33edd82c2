//! The built-in function registry.
//!
//! Each entry declares a name, parameter kinds, a return type and the
//! implementation. Resolution is case-insensitive on the name, then by
//! argument count, then by per-argument kind (numeric vs string vs array).
//!
//! `lookup` has a relaxed mode that falls back to the first same-name
//! entry when the kinds don't match; the analyzer uses it to report a
//! targeted per-argument error instead of "unknown function".

use crate::runtime::value::{format_num, Value};
use crate::semantic::types::Ty;
use std::fmt;

/// The shape a built-in parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Numeric,
    Str,
    Array,
}

impl ParamKind {
    /// The kind of an analyzed expression type.
    pub fn of_ty(ty: &Ty) -> ParamKind {
        if ty.is_array() {
            ParamKind::Array
        } else if ty.is_string() {
            ParamKind::Str
        } else {
            ParamKind::Numeric
        }
    }

    /// The kind of a runtime value.
    pub fn of_value(v: &Value) -> ParamKind {
        match v {
            Value::Num(_) => ParamKind::Numeric,
            Value::Str(_) => ParamKind::Str,
            Value::Array(_) => ParamKind::Array,
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Numeric => f.write_str("numeric"),
            ParamKind::Str => f.write_str("string"),
            ParamKind::Array => f.write_str("array"),
        }
    }
}

/// A built-in function entry.
pub struct Builtin {
    /// Canonical (uppercase) name, sigil included.
    pub name: &'static str,
    /// Accepted parameter kinds, in order.
    pub params: &'static [ParamKind],
    /// Return type.
    pub ret: Ty,
    /// Implementation. Precondition failures are error messages; the
    /// executor attaches the statement's source position.
    pub run: fn(&[Value]) -> Result<Value, String>,
}

impl Builtin {
    /// True when the argument kinds satisfy this entry exactly.
    pub fn matches(&self, kinds: &[ParamKind]) -> bool {
        self.params.len() == kinds.len()
            && self.params.iter().zip(kinds).all(|(p, k)| p == k)
    }
}

use ParamKind::{Array, Numeric, Str};

static REGISTRY: &[Builtin] = &[
    Builtin {
        name: "CHR$",
        params: &[Numeric],
        ret: Ty::String,
        run: chr,
    },
    Builtin {
        name: "INSTR",
        params: &[Str, Str],
        ret: Ty::Integer,
        run: instr2,
    },
    Builtin {
        name: "INSTR",
        params: &[Numeric, Str, Str],
        ret: Ty::Integer,
        run: instr3,
    },
    Builtin {
        name: "LCASE$",
        params: &[Str],
        ret: Ty::String,
        run: lcase,
    },
    Builtin {
        name: "UCASE$",
        params: &[Str],
        ret: Ty::String,
        run: ucase,
    },
    Builtin {
        name: "LEFT$",
        params: &[Str, Numeric],
        ret: Ty::String,
        run: left,
    },
    Builtin {
        name: "RIGHT$",
        params: &[Str, Numeric],
        ret: Ty::String,
        run: right,
    },
    Builtin {
        name: "MID$",
        params: &[Str, Numeric, Numeric],
        ret: Ty::String,
        run: mid,
    },
    Builtin {
        name: "LEN",
        params: &[Str],
        ret: Ty::Long,
        run: len,
    },
    Builtin {
        name: "STR$",
        params: &[Numeric],
        ret: Ty::String,
        run: str_fn,
    },
    Builtin {
        name: "VAL",
        params: &[Str],
        ret: Ty::Single,
        run: val,
    },
    Builtin {
        name: "LBOUND",
        params: &[Array],
        ret: Ty::Long,
        run: lbound1,
    },
    Builtin {
        name: "LBOUND",
        params: &[Array, Numeric],
        ret: Ty::Long,
        run: lbound2,
    },
    Builtin {
        name: "UBOUND",
        params: &[Array],
        ret: Ty::Long,
        run: ubound1,
    },
    Builtin {
        name: "UBOUND",
        params: &[Array, Numeric],
        ret: Ty::Long,
        run: ubound2,
    },
];

/// Resolves a built-in by name and argument kinds.
///
/// When `relaxed` is set and no entry matches the kinds, the first entry
/// with a matching name is returned instead, so the caller can surface a
/// targeted argument error. Callers must re-check with
/// [`Builtin::matches`] when they need an exact match.
pub fn lookup(name: &str, kinds: &[ParamKind], relaxed: bool) -> Option<&'static Builtin> {
    let exact = REGISTRY
        .iter()
        .find(|b| b.name.eq_ignore_ascii_case(name) && b.matches(kinds));
    if exact.is_some() {
        return exact;
    }
    if relaxed {
        return REGISTRY.iter().find(|b| b.name.eq_ignore_ascii_case(name));
    }
    None
}

// ==================== Implementations ====================

fn chr(args: &[Value]) -> Result<Value, String> {
    let code = args[0].as_num()?.floor();
    if !(0.0..=255.0).contains(&code) {
        return Err(format!("CHR$: code {} out of range", format_num(code)));
    }
    let c = char::from_u32(code as u32).ok_or("CHR$: invalid code")?;
    Ok(Value::Str(c.to_string()))
}

fn instr2(args: &[Value]) -> Result<Value, String> {
    let hay = args[0].as_str()?;
    let needle = args[1].as_str()?;
    Ok(Value::Num(instr_impl(1, hay, needle)))
}

fn instr3(args: &[Value]) -> Result<Value, String> {
    let start = args[0].as_num()?.floor() as i64;
    let hay = args[1].as_str()?;
    let needle = args[2].as_str()?;
    Ok(Value::Num(instr_impl(start, hay, needle)))
}

/// 1-based substring search starting at `start`, or 0 when absent.
fn instr_impl(start: i64, hay: &str, needle: &str) -> f64 {
    let chars: Vec<char> = hay.chars().collect();
    let start = start.max(1) as usize;
    if needle.is_empty() {
        return if start <= chars.len() + 1 { start as f64 } else { 0.0 };
    }
    if start > chars.len() {
        return 0.0;
    }
    let tail: String = chars[start - 1..].iter().collect();
    match tail.find(needle) {
        Some(byte_idx) => {
            let char_idx = tail[..byte_idx].chars().count();
            (start + char_idx) as f64
        }
        None => 0.0,
    }
}

fn lcase(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Str(args[0].as_str()?.to_lowercase()))
}

fn ucase(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Str(args[0].as_str()?.to_uppercase()))
}

fn left(args: &[Value]) -> Result<Value, String> {
    let s = args[0].as_str()?;
    let n = args[1].as_num()?.floor();
    if n < 0.0 {
        return Err("LEFT$: negative length".into());
    }
    Ok(Value::Str(s.chars().take(n as usize).collect()))
}

fn right(args: &[Value]) -> Result<Value, String> {
    let s = args[0].as_str()?;
    let n = args[1].as_num()?.floor();
    if n < 0.0 {
        return Err("RIGHT$: negative length".into());
    }
    let chars: Vec<char> = s.chars().collect();
    let skip = chars.len().saturating_sub(n as usize);
    Ok(Value::Str(chars[skip..].iter().collect()))
}

fn mid(args: &[Value]) -> Result<Value, String> {
    let s = args[0].as_str()?;
    let start = args[1].as_num()?.floor();
    let count = args[2].as_num()?.floor();
    if start < 1.0 {
        return Err("MID$: start must be at least 1".into());
    }
    if count < 0.0 {
        return Err("MID$: negative length".into());
    }
    Ok(Value::Str(
        s.chars()
            .skip(start as usize - 1)
            .take(count as usize)
            .collect(),
    ))
}

fn len(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Num(args[0].as_str()?.chars().count() as f64))
}

fn str_fn(args: &[Value]) -> Result<Value, String> {
    let n = args[0].as_num()?;
    let text = if n < 0.0 {
        format_num(n)
    } else {
        format!(" {}", format_num(n))
    };
    Ok(Value::Str(text))
}

fn val(args: &[Value]) -> Result<Value, String> {
    Ok(Value::Num(val_impl(args[0].as_str()?)))
}

/// Parses the longest leading decimal number, 0 on failure.
fn val_impl(s: &str) -> f64 {
    let chars: Vec<char> = s.trim_start().chars().collect();
    let mut i = 0;
    if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
        i += 1;
    }
    let mut seen_digit = false;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
        seen_digit = true;
    }
    if i < chars.len() && chars[i] == '.' {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
            seen_digit = true;
        }
    }
    if !seen_digit {
        return 0.0;
    }
    let mut end = i;
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        let mut exp_digits = false;
        while j < chars.len() && chars[j].is_ascii_digit() {
            j += 1;
            exp_digits = true;
        }
        if exp_digits {
            end = j;
        }
    }
    let prefix: String = chars[..end].iter().collect();
    prefix.parse().unwrap_or(0.0)
}

fn bound(args: &[Value], dim: i64, upper: bool, name: &str) -> Result<Value, String> {
    let handle = match &args[0] {
        Value::Array(a) => a,
        _ => return Err(format!("{}: expected an array", name)),
    };
    let obj = handle.borrow();
    if dim < 1 || dim as usize > obj.dims.len() {
        return Err(format!("{}: dimension {} out of range", name, dim));
    }
    let (lo, hi) = obj.dims[dim as usize - 1];
    Ok(Value::Num(if upper { hi } else { lo } as f64))
}

fn lbound1(args: &[Value]) -> Result<Value, String> {
    bound(args, 1, false, "LBOUND")
}

fn lbound2(args: &[Value]) -> Result<Value, String> {
    let dim = args[1].as_num()?.floor() as i64;
    bound(args, dim, false, "LBOUND")
}

fn ubound1(args: &[Value]) -> Result<Value, String> {
    bound(args, 1, true, "UBOUND")
}

fn ubound2(args: &[Value]) -> Result<Value, String> {
    let dim = args[1].as_num()?.floor() as i64;
    bound(args, dim, true, "UBOUND")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::ArrayObj;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn call(name: &str, args: &[Value]) -> Result<Value, String> {
        let kinds: Vec<ParamKind> = args.iter().map(ParamKind::of_value).collect();
        let b = lookup(name, &kinds, false).expect("builtin");
        (b.run)(args)
    }

    fn num(v: &Result<Value, String>) -> f64 {
        match v {
            Ok(Value::Num(n)) => *n,
            other => panic!("expected number, got {:?}", other),
        }
    }

    fn text(v: &Result<Value, String>) -> String {
        match v {
            Ok(Value::Str(s)) => s.clone(),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(lookup("chr$", &[ParamKind::Numeric], false).is_some());
        assert!(lookup("Len", &[ParamKind::Str], false).is_some());
    }

    #[test]
    fn relaxed_lookup_returns_a_name_match() {
        // Wrong kinds: strict misses, relaxed finds the entry so the
        // caller can report which argument is wrong.
        assert!(lookup("LEN", &[ParamKind::Numeric], false).is_none());
        let b = lookup("LEN", &[ParamKind::Numeric], true).unwrap();
        assert_eq!(b.name, "LEN");
        assert!(!b.matches(&[ParamKind::Numeric]));
    }

    #[test]
    fn chr_and_len() {
        assert_eq!(text(&call("CHR$", &[Value::Num(65.0)])), "A");
        assert_eq!(num(&call("LEN", &[Value::Str("hello".into())])), 5.0);
        assert!(call("CHR$", &[Value::Num(-1.0)]).is_err());
    }

    #[test]
    fn instr_both_arities() {
        let hay = Value::Str("BANANA".into());
        let needle = Value::Str("AN".into());
        assert_eq!(num(&call("INSTR", &[hay.clone(), needle.clone()])), 2.0);
        assert_eq!(
            num(&call("INSTR", &[Value::Num(3.0), hay.clone(), needle])),
            4.0
        );
        assert_eq!(
            num(&call("INSTR", &[hay, Value::Str("XYZ".into())])),
            0.0
        );
    }

    #[test]
    fn case_conversion() {
        assert_eq!(text(&call("UCASE$", &[Value::Str("MiXeD".into())])), "MIXED");
        assert_eq!(text(&call("LCASE$", &[Value::Str("MiXeD".into())])), "mixed");
    }

    #[test]
    fn substring_functions() {
        let s = Value::Str("QBASIC".into());
        assert_eq!(text(&call("LEFT$", &[s.clone(), Value::Num(2.0)])), "QB");
        assert_eq!(text(&call("RIGHT$", &[s.clone(), Value::Num(3.0)])), "SIC");
        assert_eq!(
            text(&call("MID$", &[s.clone(), Value::Num(2.0), Value::Num(3.0)])),
            "BAS"
        );
        assert_eq!(
            text(&call("LEFT$", &[s.clone(), Value::Num(99.0)])),
            "QBASIC"
        );
        assert!(call("MID$", &[s, Value::Num(0.0), Value::Num(1.0)]).is_err());
    }

    #[test]
    fn str_has_leading_space_for_non_negatives() {
        assert_eq!(text(&call("STR$", &[Value::Num(42.0)])), " 42");
        assert_eq!(text(&call("STR$", &[Value::Num(0.0)])), " 0");
        assert_eq!(text(&call("STR$", &[Value::Num(-7.5)])), "-7.5");
    }

    #[test]
    fn val_parses_a_leading_number() {
        assert_eq!(num(&call("VAL", &[Value::Str("  12.5abc".into())])), 12.5);
        assert_eq!(num(&call("VAL", &[Value::Str("-3".into())])), -3.0);
        assert_eq!(num(&call("VAL", &[Value::Str("2E3".into())])), 2000.0);
        assert_eq!(num(&call("VAL", &[Value::Str("xyz".into())])), 0.0);
    }

    #[test]
    fn bounds() {
        let arr = Value::Array(Rc::new(RefCell::new(ArrayObj::new(
            Ty::Integer,
            vec![(1, 5), (0, 2)],
        ))));
        assert_eq!(num(&call("LBOUND", &[arr.clone()])), 1.0);
        assert_eq!(num(&call("UBOUND", &[arr.clone()])), 5.0);
        assert_eq!(num(&call("UBOUND", &[arr.clone(), Value::Num(2.0)])), 2.0);
        assert!(call("LBOUND", &[arr, Value::Num(3.0)]).is_err());
    }
}
