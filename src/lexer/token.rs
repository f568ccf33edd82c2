//! Token definitions for the lexer.
//!
//! Built on the `logos` crate, which generates a table-driven lexer from
//! these definitions. QBasic is case-insensitive, so keywords are declared
//! with `ignore(ascii_case)`; an identifier whose spelling matches a
//! keyword is folded to that keyword's token.
//!
//! Horizontal whitespace is skipped; newlines are significant because they
//! terminate statements. Comments (`'` to end of line) are skipped.
//! Maximal munch orders `<=`/`>=`/`<>` ahead of `<`/`>`.

use crate::ast::Loc;
use logos::Logos;
use std::fmt;

/// A token with its source text and 1-based position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The original text of the token.
    pub text: String,
    /// Where the token starts.
    pub loc: Loc,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, text: impl Into<String>, loc: Loc) -> Self {
        Self {
            kind,
            text: text.into(),
            loc,
        }
    }
}

/// All token kinds.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip r"'[^\n]*")]
pub enum TokenKind {
    // ==================== Keywords ====================
    #[token("AND", ignore(ascii_case))]
    And,
    #[token("OR", ignore(ascii_case))]
    Or,
    #[token("NOT", ignore(ascii_case))]
    Not,
    #[token("MOD", ignore(ascii_case))]
    Mod,
    #[token("LET", ignore(ascii_case))]
    Let,
    #[token("PRINT", ignore(ascii_case))]
    Print,
    #[token("INPUT", ignore(ascii_case))]
    Input,
    #[token("IF", ignore(ascii_case))]
    If,
    #[token("THEN", ignore(ascii_case))]
    Then,
    #[token("ELSE", ignore(ascii_case))]
    Else,
    #[token("ELSEIF", ignore(ascii_case))]
    ElseIf,
    #[token("END", ignore(ascii_case))]
    End,
    #[token("DO", ignore(ascii_case))]
    Do,
    #[token("LOOP", ignore(ascii_case))]
    Loop,
    #[token("WHILE", ignore(ascii_case))]
    While,
    #[token("UNTIL", ignore(ascii_case))]
    Until,
    #[token("FOR", ignore(ascii_case))]
    For,
    #[token("TO", ignore(ascii_case))]
    To,
    #[token("STEP", ignore(ascii_case))]
    Step,
    #[token("NEXT", ignore(ascii_case))]
    Next,
    #[token("EXIT", ignore(ascii_case))]
    Exit,
    #[token("GOTO", ignore(ascii_case))]
    Goto,
    #[token("GOSUB", ignore(ascii_case))]
    Gosub,
    #[token("RETURN", ignore(ascii_case))]
    Return,
    #[token("DIM", ignore(ascii_case))]
    Dim,
    #[token("AS", ignore(ascii_case))]
    As,
    #[token("CONST", ignore(ascii_case))]
    Const,
    #[token("FUNCTION", ignore(ascii_case))]
    Function,
    #[token("SUB", ignore(ascii_case))]
    Sub,
    #[token("INTEGER", ignore(ascii_case))]
    Integer,
    #[token("LONG", ignore(ascii_case))]
    Long,
    #[token("SINGLE", ignore(ascii_case))]
    Single,
    #[token("DOUBLE", ignore(ascii_case))]
    Double,
    #[token("STRING", ignore(ascii_case))]
    StringKw,
    #[token("LBOUND", ignore(ascii_case))]
    Lbound,
    #[token("UBOUND", ignore(ascii_case))]
    Ubound,

    // ==================== Punctuation ====================
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,

    // ==================== Operators ====================
    #[token("+")]
    Add,
    #[token("-")]
    Minus,
    #[token("*")]
    Mul,
    #[token("^")]
    Exp,
    #[token("/")]
    Div,
    #[token("\\")]
    IntDiv,

    // ==================== Comparison ====================
    #[token("=")]
    Eq,
    #[token("<>")]
    Ne,
    #[token(">=")]
    Gte,
    #[token("<=")]
    Lte,
    #[token(">")]
    Gt,
    #[token("<")]
    Lt,

    // ==================== Literals ====================
    /// Decimal numeric literal: `42`, `3.14`, `.5`, `1E3`, `1.5E-2`
    #[regex(r"([0-9]+(\.[0-9]*)?|\.[0-9]+)([Ee][+-]?[0-9]+)?")]
    Number,

    /// String literal, including the quotes.
    #[regex(r#""[^"\n]*""#)]
    StringLit,

    /// Identifier, optionally ending in a type sigil.
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*[$%#&!]?")]
    Ident,

    /// Statement terminator.
    #[token("\n")]
    Newline,
}

impl TokenKind {
    /// The type keyword's type, for `AS type` clauses.
    pub fn as_type_keyword(&self) -> Option<crate::semantic::types::Ty> {
        use crate::semantic::types::Ty;
        match self {
            TokenKind::Integer => Some(Ty::Integer),
            TokenKind::Long => Some(Ty::Long),
            TokenKind::Single => Some(Ty::Single),
            TokenKind::Double => Some(Ty::Double),
            TokenKind::StringKw => Some(Ty::String),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Not => "NOT",
            TokenKind::Mod => "MOD",
            TokenKind::Let => "LET",
            TokenKind::Print => "PRINT",
            TokenKind::Input => "INPUT",
            TokenKind::If => "IF",
            TokenKind::Then => "THEN",
            TokenKind::Else => "ELSE",
            TokenKind::ElseIf => "ELSEIF",
            TokenKind::End => "END",
            TokenKind::Do => "DO",
            TokenKind::Loop => "LOOP",
            TokenKind::While => "WHILE",
            TokenKind::Until => "UNTIL",
            TokenKind::For => "FOR",
            TokenKind::To => "TO",
            TokenKind::Step => "STEP",
            TokenKind::Next => "NEXT",
            TokenKind::Exit => "EXIT",
            TokenKind::Goto => "GOTO",
            TokenKind::Gosub => "GOSUB",
            TokenKind::Return => "RETURN",
            TokenKind::Dim => "DIM",
            TokenKind::As => "AS",
            TokenKind::Const => "CONST",
            TokenKind::Function => "FUNCTION",
            TokenKind::Sub => "SUB",
            TokenKind::Integer => "INTEGER",
            TokenKind::Long => "LONG",
            TokenKind::Single => "SINGLE",
            TokenKind::Double => "DOUBLE",
            TokenKind::StringKw => "STRING",
            TokenKind::Lbound => "LBOUND",
            TokenKind::Ubound => "UBOUND",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Add => "+",
            TokenKind::Minus => "-",
            TokenKind::Mul => "*",
            TokenKind::Exp => "^",
            TokenKind::Div => "/",
            TokenKind::IntDiv => "\\",
            TokenKind::Eq => "=",
            TokenKind::Ne => "<>",
            TokenKind::Gte => ">=",
            TokenKind::Lte => "<=",
            TokenKind::Gt => ">",
            TokenKind::Lt => "<",
            TokenKind::Number => "number",
            TokenKind::StringLit => "string",
            TokenKind::Ident => "identifier",
            TokenKind::Newline => "end of line",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logos::Logos;

    fn kinds(source: &str) -> Vec<TokenKind> {
        TokenKind::lexer(source).filter_map(|r| r.ok()).collect()
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(kinds("PRINT"), vec![TokenKind::Print]);
        assert_eq!(kinds("print"), vec![TokenKind::Print]);
        assert_eq!(kinds("Print"), vec![TokenKind::Print]);
        assert_eq!(kinds("eLsEiF"), vec![TokenKind::ElseIf]);
    }

    #[test]
    fn keyword_prefix_is_still_an_identifier() {
        assert_eq!(kinds("FORK"), vec![TokenKind::Ident]);
        assert_eq!(kinds("DOUG"), vec![TokenKind::Ident]);
        assert_eq!(kinds("printer"), vec![TokenKind::Ident]);
    }

    #[test]
    fn sigil_identifiers() {
        assert_eq!(
            kinds("a$ b% c& d! e#"),
            vec![TokenKind::Ident; 5],
        );
    }

    #[test]
    fn comparison_operators_munch_longest() {
        assert_eq!(
            kinds("< <= <> > >= ="),
            vec![
                TokenKind::Lt,
                TokenKind::Lte,
                TokenKind::Ne,
                TokenKind::Gt,
                TokenKind::Gte,
                TokenKind::Eq,
            ]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(kinds("42 3.14 .5 1E3 2.5e-2"), vec![TokenKind::Number; 5]);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("x = 1 ' a comment\ny"),
            vec![
                TokenKind::Ident,
                TokenKind::Eq,
                TokenKind::Number,
                TokenKind::Newline,
                TokenKind::Ident,
            ]
        );
    }
}
