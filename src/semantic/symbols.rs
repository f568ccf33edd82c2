//! Symbol tables.
//!
//! A symbol table is an insertion-ordered list of named entries with
//! case-insensitive lookup. The original spelling is kept for diagnostics;
//! lookups go through the lowercased canonical name. Type sigils are part
//! of the name, so `a` and `a$` are distinct symbols.

use crate::semantic::types::Ty;
use serde::{Deserialize, Serialize};

/// What kind of entity a symbol names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// A variable.
    Var,
    /// A procedure parameter.
    Arg,
    /// A CONST.
    Const,
}

/// Which runtime dictionary a resolved name lives in.
///
/// Assignments and reads compiled from an analyzed reference go straight
/// to the recorded storage class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Storage {
    /// The current frame's locals (the module dictionary for module code).
    Local,
    /// The current frame's parameters.
    Param,
    /// The module-level dictionary.
    Global,
}

/// A named entry: variable, parameter, or constant.
#[derive(Debug, Clone)]
pub struct Symbol {
    /// Name as written, sigil included.
    pub name: String,
    /// Lowercased name used for lookup.
    pub canonical: String,
    /// Variable, parameter, or constant.
    pub kind: SymbolKind,
    /// The symbol's type.
    pub ty: Ty,
}

impl Symbol {
    /// Creates a symbol, deriving the canonical name from the spelling.
    pub fn new(name: impl Into<String>, kind: SymbolKind, ty: Ty) -> Self {
        let name = name.into();
        let canonical = name.to_ascii_lowercase();
        Self {
            name,
            canonical,
            kind,
            ty,
        }
    }
}

/// An insertion-ordered symbol table with case-insensitive lookup.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: Vec<Symbol>,
}

impl SymbolTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a symbol. Returns `false` without inserting when a symbol
    /// with the same canonical name is already present.
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        if self.lookup(&symbol.name).is_some() {
            return false;
        }
        self.entries.push(symbol);
        true
    }

    /// Case-insensitive lookup by name.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        let canonical = name.to_ascii_lowercase();
        self.entries.iter().find(|s| s.canonical == canonical)
    }

    /// Symbols in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.entries.iter()
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table has no symbols.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_lookup() {
        let mut t = SymbolTable::new();
        assert!(t.insert(Symbol::new("Counter%", SymbolKind::Var, Ty::Integer)));
        assert!(t.lookup("counter%").is_some());
        assert!(t.lookup("COUNTER%").is_some());
        assert_eq!(t.lookup("counter%").unwrap().name, "Counter%");
    }

    #[test]
    fn sigil_is_part_of_the_name() {
        let mut t = SymbolTable::new();
        assert!(t.insert(Symbol::new("a", SymbolKind::Var, Ty::Single)));
        assert!(t.insert(Symbol::new("a$", SymbolKind::Var, Ty::String)));
        assert_eq!(t.len(), 2);
        assert_eq!(t.lookup("A$").unwrap().ty, Ty::String);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut t = SymbolTable::new();
        assert!(t.insert(Symbol::new("x", SymbolKind::Var, Ty::Single)));
        assert!(!t.insert(Symbol::new("X", SymbolKind::Var, Ty::Single)));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut t = SymbolTable::new();
        t.insert(Symbol::new("b", SymbolKind::Var, Ty::Single));
        t.insert(Symbol::new("a", SymbolKind::Var, Ty::Single));
        t.insert(Symbol::new("c", SymbolKind::Const, Ty::Single));
        let names: Vec<_> = t.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }
}
