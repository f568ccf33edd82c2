//! The QBasic type system.
//!
//! Five elementary types plus arrays over them:
//!
//! | Type    | Sigil | Notes                      |
//! |---------|-------|----------------------------|
//! | INTEGER | `%`   | 16-bit signed              |
//! | LONG    | `&`   | 32-bit signed              |
//! | SINGLE  | `!`   | 32-bit float, the default  |
//! | DOUBLE  | `#`   | 64-bit float               |
//! | STRING  | `$`   | variable-length            |
//!
//! Numeric results of binary operations are the "wider" of the two
//! operands, with the twist that mixing INTEGER or LONG with SINGLE yields
//! SINGLE (not DOUBLE). The pairwise rules are written out as a literal
//! table below rather than derived from a rank function, so they can be
//! read directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A type: one of the five elementary types, or an array of one of them.
///
/// Equality is structural. Array bounds live on the runtime array object,
/// not the type; the type tracks only the element type and rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ty {
    Integer,
    Long,
    Single,
    Double,
    String,
    /// Array with elementary element type and dimension count.
    Array { elem: Box<Ty>, rank: usize },
}

impl Ty {
    /// True for the four numeric types.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Ty::Integer | Ty::Long | Ty::Single | Ty::Double)
    }

    /// True for STRING.
    pub fn is_string(&self) -> bool {
        matches!(self, Ty::String)
    }

    /// True for any non-array type.
    pub fn is_elementary(&self) -> bool {
        !matches!(self, Ty::Array { .. })
    }

    /// True for arrays.
    pub fn is_array(&self) -> bool {
        matches!(self, Ty::Array { .. })
    }

    /// Two elementary types "match" when both are numeric or both are
    /// strings. Assignment, argument passing and comparisons use this.
    pub fn matching_elementary(a: &Ty, b: &Ty) -> bool {
        (a.is_numeric() && b.is_numeric()) || (a.is_string() && b.is_string())
    }

    /// The type a sigil character declares, if `c` is a sigil.
    pub fn from_sigil(c: char) -> Option<Ty> {
        match c {
            '%' => Some(Ty::Integer),
            '&' => Some(Ty::Long),
            '!' => Some(Ty::Single),
            '#' => Some(Ty::Double),
            '$' => Some(Ty::String),
            _ => None,
        }
    }

    /// The type an identifier's spelling declares: its trailing sigil, or
    /// SINGLE when there is none.
    pub fn from_name(name: &str) -> Ty {
        name.chars()
            .last()
            .and_then(Ty::from_sigil)
            .unwrap_or(Ty::Single)
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Integer => write!(f, "INTEGER"),
            Ty::Long => write!(f, "LONG"),
            Ty::Single => write!(f, "SINGLE"),
            Ty::Double => write!(f, "DOUBLE"),
            Ty::String => write!(f, "STRING"),
            Ty::Array { elem, rank } => {
                write!(f, "{}(", elem)?;
                for i in 0..*rank {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                }
                write!(f, ")")
            }
        }
    }
}

/// The pairwise numeric result table, applied left-to-right over operand
/// chains. INTEGER < LONG < SINGLE < DOUBLE, except that INTEGER or LONG
/// mixed with SINGLE stays SINGLE.
const NUMERIC_RESULT: [(Ty, Ty, Ty); 16] = [
    (Ty::Integer, Ty::Integer, Ty::Integer),
    (Ty::Integer, Ty::Long, Ty::Long),
    (Ty::Integer, Ty::Single, Ty::Single),
    (Ty::Integer, Ty::Double, Ty::Double),
    (Ty::Long, Ty::Integer, Ty::Long),
    (Ty::Long, Ty::Long, Ty::Long),
    (Ty::Long, Ty::Single, Ty::Single),
    (Ty::Long, Ty::Double, Ty::Double),
    (Ty::Single, Ty::Integer, Ty::Single),
    (Ty::Single, Ty::Long, Ty::Single),
    (Ty::Single, Ty::Single, Ty::Single),
    (Ty::Single, Ty::Double, Ty::Double),
    (Ty::Double, Ty::Integer, Ty::Double),
    (Ty::Double, Ty::Long, Ty::Double),
    (Ty::Double, Ty::Single, Ty::Double),
    (Ty::Double, Ty::Double, Ty::Double),
];

/// The numeric result type of a binary operation over `a` and `b`.
///
/// Returns `None` unless both operands are numeric.
pub fn coerce_numeric(a: &Ty, b: &Ty) -> Option<Ty> {
    NUMERIC_RESULT
        .iter()
        .find(|(l, r, _)| l == a && r == b)
        .map(|(_, _, out)| out.clone())
}

/// Like [`coerce_numeric`] but with SINGLE as a floor: `/` never produces
/// an integer type, so `INTEGER / INTEGER` is SINGLE.
pub fn coerce_division(a: &Ty, b: &Ty) -> Option<Ty> {
    coerce_numeric(a, b).map(|t| match t {
        Ty::Integer | Ty::Long => Ty::Single,
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigil_types() {
        assert_eq!(Ty::from_name("count%"), Ty::Integer);
        assert_eq!(Ty::from_name("total&"), Ty::Long);
        assert_eq!(Ty::from_name("ratio!"), Ty::Single);
        assert_eq!(Ty::from_name("pi#"), Ty::Double);
        assert_eq!(Ty::from_name("name$"), Ty::String);
        assert_eq!(Ty::from_name("x"), Ty::Single);
    }

    #[test]
    fn matching_elementary() {
        assert!(Ty::matching_elementary(&Ty::Integer, &Ty::Double));
        assert!(Ty::matching_elementary(&Ty::String, &Ty::String));
        assert!(!Ty::matching_elementary(&Ty::Integer, &Ty::String));
    }

    #[test]
    fn coercion_widens() {
        assert_eq!(coerce_numeric(&Ty::Integer, &Ty::Long), Some(Ty::Long));
        assert_eq!(coerce_numeric(&Ty::Long, &Ty::Double), Some(Ty::Double));
        assert_eq!(coerce_numeric(&Ty::Double, &Ty::Integer), Some(Ty::Double));
    }

    #[test]
    fn single_wins_over_integers() {
        assert_eq!(coerce_numeric(&Ty::Integer, &Ty::Single), Some(Ty::Single));
        assert_eq!(coerce_numeric(&Ty::Single, &Ty::Long), Some(Ty::Single));
    }

    #[test]
    fn coercion_rejects_strings() {
        assert_eq!(coerce_numeric(&Ty::String, &Ty::Integer), None);
        assert_eq!(coerce_numeric(&Ty::Single, &Ty::String), None);
    }

    #[test]
    fn division_floors_at_single() {
        assert_eq!(coerce_division(&Ty::Integer, &Ty::Integer), Some(Ty::Single));
        assert_eq!(coerce_division(&Ty::Long, &Ty::Integer), Some(Ty::Single));
        assert_eq!(coerce_division(&Ty::Double, &Ty::Integer), Some(Ty::Double));
    }

    #[test]
    fn coercion_left_fold_is_stable() {
        // (INTEGER ∘ LONG) ∘ SINGLE and INTEGER ∘ (LONG ∘ SINGLE) agree.
        let ab = coerce_numeric(&Ty::Integer, &Ty::Long).unwrap();
        let abc = coerce_numeric(&ab, &Ty::Single).unwrap();
        let bc = coerce_numeric(&Ty::Long, &Ty::Single).unwrap();
        let abc2 = coerce_numeric(&Ty::Integer, &bc).unwrap();
        assert_eq!(abc, abc2);
    }

    #[test]
    fn array_display() {
        let t = Ty::Array {
            elem: Box::new(Ty::Integer),
            rank: 2,
        };
        assert_eq!(t.to_string(), "INTEGER(,)");
        assert!(t.is_array());
        assert!(!t.is_elementary());
    }
}
