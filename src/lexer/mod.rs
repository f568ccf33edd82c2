//! Lexical analysis.
//!
//! Converts QBasic source into a stream of [`Token`]s with 1-based
//! line/column positions. Keywords are folded case-insensitively,
//! horizontal whitespace and comments are discarded, and newlines come
//! through as tokens because they terminate statements.
//!
//! Unrecognised input stops the stage with a [`LexError`].
//!
//! ## Example
//!
//! ```
//! use qbc::lexer::{lex, TokenKind};
//!
//! let tokens = lex("PRINT 42").unwrap();
//! assert_eq!(tokens[0].kind, TokenKind::Print);
//! assert_eq!(tokens[1].text, "42");
//! ```

mod token;

pub use token::{Token, TokenKind};

use crate::ast::Loc;
use logos::Logos;
use thiserror::Error;

/// A lexing failure: unrecognised input at a known position.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct LexError {
    /// Where lexing failed.
    pub loc: Loc,
    /// What went wrong.
    pub message: String,
}

/// Maps byte offsets to 1-based line/column positions.
struct LineMap {
    /// Byte offset of the start of each line.
    starts: Vec<usize>,
}

impl LineMap {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        Self { starts }
    }

    fn loc(&self, offset: usize) -> Loc {
        let line = match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        Loc::new(line as u32 + 1, (offset - self.starts[line]) as u32 + 1)
    }
}

/// Tokenises `source`, failing on the first unrecognised character.
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    let map = LineMap::new(source);
    let mut lexer = TokenKind::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let loc = map.loc(lexer.span().start);
        match result {
            Ok(kind) => tokens.push(Token::new(kind, lexer.slice(), loc)),
            Err(()) => {
                return Err(LexError {
                    loc,
                    message: format!("unrecognised character {:?}", lexer.slice()),
                });
            }
        }
    }

    Ok(tokens)
}

/// Renders a token stream back to canonical text: tokens separated by one
/// space, newline tokens as line breaks. Lexing the canonical form again
/// yields the same stream.
pub fn canonical(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token.kind {
            TokenKind::Newline => out.push('\n'),
            _ => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push(' ');
                }
                out.push_str(&token.text);
            }
        }
    }
    out
}
