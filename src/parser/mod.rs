//! Parser.
//!
//! Recursive descent over the token stream, producing the AST. Statements
//! are separated by newlines or colons; expressions are parsed with one
//! method per precedence level, lowest first:
//!
//! ```text
//! OR → AND → NOT → relational → + - → * / → \ → MOD → unary - → ^ → primary
//! ```
//!
//! `^` is right-associative, everything else associates left.
//! Parenthesised expressions become explicit grouping nodes so lowering
//! preserves them.
//!
//! Single-line `IF c THEN a ELSE b` and the block `IF ... END IF` form parse
//! to the same node. `FOR` and `NEXT` stay flat sibling statements; the
//! code generator pairs them up.
//!
//! The parser fails on the first error; there is no recovery.

mod error;

pub use error::ParseError;

use crate::ast::{
    DimBound, Expr, ExprKind, FnProc, IfArm, Loc, LoopStructure, Module, PrintItem, Stmt,
    StmtKind, UnOp,
};
use crate::ast::BinOp;
use crate::lexer::{Token, TokenKind};
use crate::semantic::types::Ty;

/// Parses a token stream into a [`Module`].
pub fn parse(tokens: &[Token]) -> Result<Module, ParseError> {
    Parser::new(tokens).parse()
}

/// The parser state: a token slice and a cursor.
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Creates a parser over the given tokens.
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parses a complete module: FUNCTION definitions and module-level
    /// statements in source order.
    pub fn parse(&mut self) -> Result<Module, ParseError> {
        let mut module = Module::default();

        loop {
            self.skip_separators();
            if self.at_end() {
                break;
            }
            if self.check(TokenKind::Function) {
                module.procs.push(self.parse_function()?);
            } else {
                module.stmts.push(self.parse_statement()?);
            }
        }

        Ok(module)
    }

    // ==================== Token navigation ====================

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, ParseError> {
        match self.peek() {
            Some(t) if t.kind == kind => {}
            Some(t) => {
                return Err(ParseError::unexpected(expected, t.kind.to_string(), t.loc))
            }
            None => {
                return Err(ParseError::UnexpectedEof {
                    expected: expected.into(),
                    loc: self.eof_loc(),
                })
            }
        }
        Ok(self.advance().cloned().expect("checked token"))
    }

    fn eof_loc(&self) -> Loc {
        self.tokens.last().map(|t| t.loc).unwrap_or(Loc::new(1, 1))
    }

    /// Consumes any run of newlines and colons.
    fn skip_separators(&mut self) {
        while self.check(TokenKind::Newline) || self.check(TokenKind::Colon) {
            self.pos += 1;
        }
    }

    /// True at a statement boundary: end of input, newline, or colon.
    fn at_stmt_end(&self) -> bool {
        self.at_end() || self.check(TokenKind::Newline) || self.check(TokenKind::Colon)
    }

    // ==================== Statements ====================

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let token = match self.peek() {
            Some(t) => t,
            None => {
                return Err(ParseError::UnexpectedEof {
                    expected: "statement".into(),
                    loc: self.eof_loc(),
                })
            }
        };
        let loc = token.loc;

        match token.kind {
            TokenKind::Ident => {
                if self.peek_ahead(1).map(|t| t.kind) == Some(TokenKind::Colon) {
                    let name = self.advance().expect("label name").text.clone();
                    self.advance(); // the colon
                    Ok(Stmt::new(StmtKind::Label(name), loc))
                } else {
                    self.parse_assignment(loc)
                }
            }
            TokenKind::Let => {
                self.advance();
                self.parse_assignment(loc)
            }
            TokenKind::Print => self.parse_print(loc),
            TokenKind::Input => self.parse_input(loc),
            TokenKind::If => self.parse_if(loc),
            TokenKind::Do => self.parse_do(loc),
            TokenKind::For => self.parse_for(loc),
            TokenKind::Next => self.parse_next(loc),
            TokenKind::Exit => self.parse_exit(loc),
            TokenKind::Goto => {
                self.advance();
                let dest = self.expect(TokenKind::Ident, "label")?.text;
                Ok(Stmt::new(StmtKind::Goto { dest }, loc))
            }
            TokenKind::Gosub => {
                self.advance();
                let dest = self.expect(TokenKind::Ident, "label")?.text;
                Ok(Stmt::new(StmtKind::Gosub { dest }, loc))
            }
            TokenKind::Return => {
                self.advance();
                let dest = if self.check(TokenKind::Ident) {
                    Some(self.advance().expect("label").text.clone())
                } else {
                    None
                };
                Ok(Stmt::new(StmtKind::Return { dest }, loc))
            }
            TokenKind::End => self.parse_end(loc),
            TokenKind::Dim => self.parse_dim(loc),
            TokenKind::Const => self.parse_const(loc),
            TokenKind::Sub => Err(ParseError::syntax("SUB procedures are not supported", loc)),
            other => Err(ParseError::unexpected(
                "statement",
                other.to_string(),
                loc,
            )),
        }
    }

    /// `[LET] target = value` where target is a variable or array element.
    fn parse_assignment(&mut self, loc: Loc) -> Result<Stmt, ParseError> {
        let target = self.parse_lvalue()?;
        self.expect(TokenKind::Eq, "=")?;
        let value = self.parse_expr()?;
        Ok(Stmt::new(StmtKind::Assign { target, value }, loc))
    }

    /// A reference that can be assigned to: `name` or `name(index, ...)`.
    fn parse_lvalue(&mut self) -> Result<Expr, ParseError> {
        let token = self.expect(TokenKind::Ident, "variable name")?;
        let name = token.text;
        let loc = token.loc;

        if self.match_token(TokenKind::LParen) {
            let args = self.parse_args()?;
            self.expect(TokenKind::RParen, ")")?;
            Ok(Expr::new(
                ExprKind::FnCall {
                    name,
                    args,
                    storage: None,
                },
                loc,
            ))
        } else {
            Ok(Expr::new(ExprKind::VarRef { name, storage: None }, loc))
        }
    }

    fn parse_print(&mut self, loc: Loc) -> Result<Stmt, ParseError> {
        self.advance(); // PRINT
        let mut items = Vec::new();

        while !self.at_stmt_end() {
            if self.match_token(TokenKind::Semicolon) {
                items.push(PrintItem::Semicolon);
            } else if self.match_token(TokenKind::Comma) {
                items.push(PrintItem::Comma);
            } else {
                items.push(PrintItem::Value(self.parse_expr()?));
            }
        }

        Ok(Stmt::new(StmtKind::Print { items }, loc))
    }

    fn parse_input(&mut self, loc: Loc) -> Result<Stmt, ParseError> {
        self.advance(); // INPUT

        let prompt = if self.check(TokenKind::StringLit) {
            let token = self.advance().expect("prompt").clone();
            let text = strip_quotes(&token.text);
            if !self.match_token(TokenKind::Semicolon) && !self.match_token(TokenKind::Comma) {
                return Err(ParseError::syntax(
                    "expected `;` or `,` after INPUT prompt",
                    token.loc,
                ));
            }
            Some(text)
        } else {
            None
        };

        let mut targets = vec![self.parse_lvalue()?];
        while self.match_token(TokenKind::Comma) {
            targets.push(self.parse_lvalue()?);
        }

        Ok(Stmt::new(StmtKind::Input { prompt, targets }, loc))
    }

    fn parse_if(&mut self, loc: Loc) -> Result<Stmt, ParseError> {
        self.advance(); // IF
        let cond = self.parse_expr()?;
        self.expect(TokenKind::Then, "THEN")?;

        if self.check(TokenKind::Newline) {
            self.parse_block_if(cond, loc)
        } else {
            self.parse_line_if(cond, loc)
        }
    }

    /// `IF c THEN stmt [: stmt ...] [ELSE stmt [: stmt ...]]` on one line.
    fn parse_line_if(&mut self, cond: Expr, loc: Loc) -> Result<Stmt, ParseError> {
        let mut then_stmts = Vec::new();
        loop {
            then_stmts.push(self.parse_statement()?);
            while self.match_token(TokenKind::Colon) {}
            if self.at_end() || self.check(TokenKind::Newline) || self.check(TokenKind::Else) {
                break;
            }
        }

        let mut else_stmts = Vec::new();
        if self.match_token(TokenKind::Else) {
            loop {
                else_stmts.push(self.parse_statement()?);
                while self.match_token(TokenKind::Colon) {}
                if self.at_end() || self.check(TokenKind::Newline) {
                    break;
                }
            }
        }

        Ok(Stmt::new(
            StmtKind::If {
                arms: vec![IfArm {
                    cond,
                    stmts: then_stmts,
                }],
                else_stmts,
            },
            loc,
        ))
    }

    /// The block form, through `END IF`.
    fn parse_block_if(&mut self, cond: Expr, loc: Loc) -> Result<Stmt, ParseError> {
        let mut arms = vec![IfArm {
            cond,
            stmts: Vec::new(),
        }];
        let mut else_stmts = Vec::new();
        let mut in_else = false;

        loop {
            self.skip_separators();
            if self.at_end() {
                return Err(ParseError::UnexpectedEof {
                    expected: "END IF".into(),
                    loc: self.eof_loc(),
                });
            }
            if self.check_pair(TokenKind::End, TokenKind::If) {
                self.advance();
                self.advance();
                break;
            }
            if self.check(TokenKind::ElseIf) {
                let elseif_loc = self.advance().expect("ELSEIF").loc;
                if in_else {
                    return Err(ParseError::syntax("ELSEIF after ELSE", elseif_loc));
                }
                let arm_cond = self.parse_expr()?;
                self.expect(TokenKind::Then, "THEN")?;
                arms.push(IfArm {
                    cond: arm_cond,
                    stmts: Vec::new(),
                });
                continue;
            }
            if self.match_token(TokenKind::Else) {
                in_else = true;
                continue;
            }

            let stmt = self.parse_statement()?;
            if in_else {
                else_stmts.push(stmt);
            } else {
                arms.last_mut().expect("at least one arm").stmts.push(stmt);
            }
        }

        Ok(Stmt::new(StmtKind::If { arms, else_stmts }, loc))
    }

    fn parse_do(&mut self, loc: Loc) -> Result<Stmt, ParseError> {
        self.advance(); // DO

        // WHILE c exits when NOT c, UNTIL c exits when c.
        let pre = self.parse_loop_cond()?;

        let mut stmts = Vec::new();
        loop {
            self.skip_separators();
            if self.at_end() {
                return Err(ParseError::UnexpectedEof {
                    expected: "LOOP".into(),
                    loc: self.eof_loc(),
                });
            }
            if self.match_token(TokenKind::Loop) {
                break;
            }
            stmts.push(self.parse_statement()?);
        }

        let post = self.parse_loop_cond()?;

        match (pre, post) {
            (Some(_), Some((_, _, post_loc))) => Err(ParseError::syntax(
                "DO and LOOP cannot both have a condition",
                post_loc,
            )),
            (Some((cond, negated, _)), None) => Ok(Stmt::new(
                StmtKind::CondLoop {
                    structure: LoopStructure::CondBeforeStmts,
                    negated,
                    cond,
                    stmts,
                },
                loc,
            )),
            (None, Some((cond, negated, _))) => Ok(Stmt::new(
                StmtKind::CondLoop {
                    structure: LoopStructure::CondAfterStmts,
                    negated,
                    cond,
                    stmts,
                },
                loc,
            )),
            (None, None) => Ok(Stmt::new(StmtKind::UncondLoop { stmts }, loc)),
        }
    }

    /// An optional `WHILE c` / `UNTIL c` after DO or LOOP. Returns the
    /// condition, the negated bit for the exit test, and the keyword's loc.
    fn parse_loop_cond(&mut self) -> Result<Option<(Expr, bool, Loc)>, ParseError> {
        if self.check(TokenKind::While) {
            let loc = self.advance().expect("WHILE").loc;
            Ok(Some((self.parse_expr()?, true, loc)))
        } else if self.check(TokenKind::Until) {
            let loc = self.advance().expect("UNTIL").loc;
            Ok(Some((self.parse_expr()?, false, loc)))
        } else {
            Ok(None)
        }
    }

    fn parse_for(&mut self, loc: Loc) -> Result<Stmt, ParseError> {
        self.advance(); // FOR
        let counter_token = self.expect(TokenKind::Ident, "loop counter")?;
        let counter = Expr::new(
            ExprKind::VarRef {
                name: counter_token.text,
                storage: None,
            },
            counter_token.loc,
        );
        self.expect(TokenKind::Eq, "=")?;
        let start = self.parse_expr()?;
        self.expect(TokenKind::To, "TO")?;
        let end = self.parse_expr()?;
        let step = if self.match_token(TokenKind::Step) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        Ok(Stmt::new(
            StmtKind::For {
                counter,
                start,
                end,
                step,
            },
            loc,
        ))
    }

    fn parse_next(&mut self, loc: Loc) -> Result<Stmt, ParseError> {
        self.advance(); // NEXT
        let mut counters = Vec::new();
        if self.check(TokenKind::Ident) {
            loop {
                let token = self.expect(TokenKind::Ident, "loop counter")?;
                counters.push(Expr::new(
                    ExprKind::VarRef {
                        name: token.text,
                        storage: None,
                    },
                    token.loc,
                ));
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        Ok(Stmt::new(StmtKind::Next { counters }, loc))
    }

    fn parse_exit(&mut self, loc: Loc) -> Result<Stmt, ParseError> {
        self.advance(); // EXIT
        if self.match_token(TokenKind::For) {
            Ok(Stmt::new(StmtKind::ExitFor, loc))
        } else if self.match_token(TokenKind::Do) {
            Ok(Stmt::new(StmtKind::ExitLoop, loc))
        } else {
            let found = self
                .peek()
                .map(|t| t.kind.to_string())
                .unwrap_or_else(|| "end of input".into());
            Err(ParseError::unexpected("FOR or DO after EXIT", found, loc))
        }
    }

    fn parse_end(&mut self, loc: Loc) -> Result<Stmt, ParseError> {
        self.advance(); // END
        match self.peek_kind() {
            Some(TokenKind::If) => Err(ParseError::syntax("END IF without IF", loc)),
            Some(TokenKind::Function) => {
                Err(ParseError::syntax("END FUNCTION without FUNCTION", loc))
            }
            _ => Ok(Stmt::new(StmtKind::End, loc)),
        }
    }

    fn parse_dim(&mut self, loc: Loc) -> Result<Stmt, ParseError> {
        self.advance(); // DIM
        let name = self.expect(TokenKind::Ident, "variable name")?.text;

        let mut dims = Vec::new();
        if self.match_token(TokenKind::LParen) {
            loop {
                let first = self.parse_expr()?;
                if self.match_token(TokenKind::To) {
                    let upper = self.parse_expr()?;
                    dims.push(DimBound {
                        lower: Some(first),
                        upper,
                    });
                } else {
                    dims.push(DimBound {
                        lower: None,
                        upper: first,
                    });
                }
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, ")")?;
        }

        let as_ty = if self.match_token(TokenKind::As) {
            Some(self.parse_type_name()?)
        } else {
            None
        };

        Ok(Stmt::new(StmtKind::Dim { name, dims, as_ty }, loc))
    }

    fn parse_type_name(&mut self) -> Result<Ty, ParseError> {
        match self.peek() {
            Some(t) => match t.kind.as_type_keyword() {
                Some(ty) => {
                    self.advance();
                    Ok(ty)
                }
                None => Err(ParseError::unexpected(
                    "type name",
                    t.kind.to_string(),
                    t.loc,
                )),
            },
            None => Err(ParseError::UnexpectedEof {
                expected: "type name".into(),
                loc: self.eof_loc(),
            }),
        }
    }

    fn parse_const(&mut self, loc: Loc) -> Result<Stmt, ParseError> {
        self.advance(); // CONST
        let name = self.expect(TokenKind::Ident, "constant name")?.text;
        self.expect(TokenKind::Eq, "=")?;
        let value = self.parse_expr()?;
        Ok(Stmt::new(StmtKind::ConstDecl { name, value }, loc))
    }

    fn parse_function(&mut self) -> Result<FnProc, ParseError> {
        let loc = self.advance().expect("FUNCTION").loc;
        let name = self.expect(TokenKind::Ident, "function name")?.text;

        let mut params = Vec::new();
        if self.match_token(TokenKind::LParen) {
            if !self.check(TokenKind::RParen) {
                loop {
                    params.push(self.expect(TokenKind::Ident, "parameter name")?.text);
                    if !self.match_token(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen, ")")?;
        }

        let mut stmts = Vec::new();
        loop {
            self.skip_separators();
            if self.at_end() {
                return Err(ParseError::UnexpectedEof {
                    expected: "END FUNCTION".into(),
                    loc: self.eof_loc(),
                });
            }
            if self.check_pair(TokenKind::End, TokenKind::Function) {
                self.advance();
                self.advance();
                break;
            }
            stmts.push(self.parse_statement()?);
        }

        let ret_ty = Ty::from_name(&name);
        Ok(FnProc {
            name,
            params,
            ret_ty,
            stmts,
            param_symbols: Default::default(),
            local_symbols: Default::default(),
            loc,
        })
    }

    fn check_pair(&self, first: TokenKind, second: TokenKind) -> bool {
        self.check(first) && self.peek_ahead(1).map(|t| t.kind) == Some(second)
    }

    // ==================== Expressions ====================

    /// Parses an expression at the lowest precedence level.
    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut l = self.parse_and()?;
        while self.match_token(TokenKind::Or) {
            let r = self.parse_and()?;
            l = binary(BinOp::Or, l, r);
        }
        Ok(l)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut l = self.parse_not()?;
        while self.match_token(TokenKind::And) {
            let r = self.parse_not()?;
            l = binary(BinOp::And, l, r);
        }
        Ok(l)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.check(TokenKind::Not) {
            let loc = self.advance().expect("NOT").loc;
            let r = self.parse_not()?;
            Ok(Expr::new(
                ExprKind::Unary {
                    op: UnOp::Not,
                    r: Box::new(r),
                },
                loc,
            ))
        } else {
            self.parse_rel()
        }
    }

    fn parse_rel(&mut self) -> Result<Expr, ParseError> {
        let mut l = self.parse_add()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Eq) => BinOp::Eq,
                Some(TokenKind::Ne) => BinOp::Ne,
                Some(TokenKind::Lt) => BinOp::Lt,
                Some(TokenKind::Lte) => BinOp::Lte,
                Some(TokenKind::Gt) => BinOp::Gt,
                Some(TokenKind::Gte) => BinOp::Gte,
                _ => break,
            };
            self.advance();
            let r = self.parse_add()?;
            l = binary(op, l, r);
        }
        Ok(l)
    }

    fn parse_add(&mut self) -> Result<Expr, ParseError> {
        let mut l = self.parse_mul()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Add) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let r = self.parse_mul()?;
            l = binary(op, l, r);
        }
        Ok(l)
    }

    fn parse_mul(&mut self) -> Result<Expr, ParseError> {
        let mut l = self.parse_intdiv()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Mul) => BinOp::Mul,
                Some(TokenKind::Div) => BinOp::Div,
                _ => break,
            };
            self.advance();
            let r = self.parse_intdiv()?;
            l = binary(op, l, r);
        }
        Ok(l)
    }

    fn parse_intdiv(&mut self) -> Result<Expr, ParseError> {
        let mut l = self.parse_mod()?;
        while self.match_token(TokenKind::IntDiv) {
            let r = self.parse_mod()?;
            l = binary(BinOp::IntDiv, l, r);
        }
        Ok(l)
    }

    fn parse_mod(&mut self) -> Result<Expr, ParseError> {
        let mut l = self.parse_neg()?;
        while self.match_token(TokenKind::Mod) {
            let r = self.parse_neg()?;
            l = binary(BinOp::Mod, l, r);
        }
        Ok(l)
    }

    fn parse_neg(&mut self) -> Result<Expr, ParseError> {
        if self.check(TokenKind::Minus) {
            let loc = self.advance().expect("-").loc;
            let r = self.parse_neg()?;
            Ok(Expr::new(
                ExprKind::Unary {
                    op: UnOp::Neg,
                    r: Box::new(r),
                },
                loc,
            ))
        } else {
            self.parse_pow()
        }
    }

    fn parse_pow(&mut self) -> Result<Expr, ParseError> {
        let l = self.parse_primary()?;
        if self.match_token(TokenKind::Exp) {
            // Right-associative; the exponent may carry its own unary minus.
            let r = self.parse_neg()?;
            Ok(binary(BinOp::Pow, l, r))
        } else {
            Ok(l)
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = match self.peek() {
            Some(t) => t.clone(),
            None => {
                return Err(ParseError::UnexpectedEof {
                    expected: "expression".into(),
                    loc: self.eof_loc(),
                })
            }
        };

        match token.kind {
            TokenKind::Number => {
                self.advance();
                let value: f64 = token.text.parse().map_err(|_| {
                    ParseError::syntax(format!("invalid number `{}`", token.text), token.loc)
                })?;
                Ok(Expr::new(ExprKind::NumberLit(value), token.loc))
            }
            TokenKind::StringLit => {
                self.advance();
                Ok(Expr::new(
                    ExprKind::StringLit(strip_quotes(&token.text)),
                    token.loc,
                ))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, ")")?;
                Ok(Expr::new(
                    ExprKind::Unary {
                        op: UnOp::Parens,
                        r: Box::new(inner),
                    },
                    token.loc,
                ))
            }
            TokenKind::Ident => {
                self.advance();
                if self.match_token(TokenKind::LParen) {
                    let args = self.parse_args()?;
                    self.expect(TokenKind::RParen, ")")?;
                    Ok(Expr::new(
                        ExprKind::FnCall {
                            name: token.text,
                            args,
                            storage: None,
                        },
                        token.loc,
                    ))
                } else {
                    Ok(Expr::new(
                        ExprKind::VarRef {
                            name: token.text,
                            storage: None,
                        },
                        token.loc,
                    ))
                }
            }
            // LBOUND/UBOUND are keywords but behave as built-in functions.
            TokenKind::Lbound | TokenKind::Ubound => {
                self.advance();
                self.expect(TokenKind::LParen, "(")?;
                let args = self.parse_args()?;
                self.expect(TokenKind::RParen, ")")?;
                Ok(Expr::new(
                    ExprKind::FnCall {
                        name: token.text,
                        args,
                        storage: None,
                    },
                    token.loc,
                ))
            }
            other => Err(ParseError::unexpected(
                "expression",
                other.to_string(),
                token.loc,
            )),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            args.push(self.parse_expr()?);
            while self.match_token(TokenKind::Comma) {
                args.push(self.parse_expr()?);
            }
        }
        Ok(args)
    }
}

fn binary(op: BinOp, l: Expr, r: Expr) -> Expr {
    let loc = l.loc;
    Expr::new(
        ExprKind::Binary {
            op,
            l: Box::new(l),
            r: Box::new(r),
        },
        loc,
    )
}

fn strip_quotes(text: &str) -> String {
    text[1..text.len() - 1].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_source(source: &str) -> Module {
        parse(&lex(source).unwrap()).unwrap()
    }

    fn parse_one_expr(source: &str) -> Expr {
        let tokens = lex(source).unwrap();
        Parser::new(&tokens).parse_expr().unwrap()
    }

    #[test]
    fn assignment_with_and_without_let() {
        let m = parse_source("x = 1\nLET y = 2");
        assert_eq!(m.stmts.len(), 2);
        assert!(matches!(m.stmts[0].kind, StmtKind::Assign { .. }));
        assert!(matches!(m.stmts[1].kind, StmtKind::Assign { .. }));
    }

    #[test]
    fn colon_separates_statements() {
        let m = parse_source("x = 1 : PRINT x : y = 2");
        assert_eq!(m.stmts.len(), 3);
    }

    #[test]
    fn print_items() {
        let m = parse_source("PRINT \"A\"; 1, 2;");
        match &m.stmts[0].kind {
            StmtKind::Print { items } => {
                assert_eq!(items.len(), 6);
                assert!(matches!(items[0], PrintItem::Value(_)));
                assert_eq!(items[1], PrintItem::Semicolon);
                assert!(matches!(items[2], PrintItem::Value(_)));
                assert_eq!(items[3], PrintItem::Comma);
                assert!(matches!(items[4], PrintItem::Value(_)));
                assert_eq!(items[5], PrintItem::Semicolon);
            }
            other => panic!("expected PRINT, got {:?}", other),
        }
    }

    #[test]
    fn single_line_if_else() {
        let m = parse_source("IF x > 1 THEN PRINT 1 ELSE PRINT 2");
        match &m.stmts[0].kind {
            StmtKind::If { arms, else_stmts } => {
                assert_eq!(arms.len(), 1);
                assert_eq!(arms[0].stmts.len(), 1);
                assert_eq!(else_stmts.len(), 1);
            }
            other => panic!("expected IF, got {:?}", other),
        }
    }

    #[test]
    fn single_line_if_with_colons() {
        let m = parse_source("IF x THEN PRINT 1 : PRINT 2 ELSE PRINT 3");
        match &m.stmts[0].kind {
            StmtKind::If { arms, else_stmts } => {
                assert_eq!(arms[0].stmts.len(), 2);
                assert_eq!(else_stmts.len(), 1);
            }
            other => panic!("expected IF, got {:?}", other),
        }
    }

    #[test]
    fn block_if_elseif_else() {
        let source = "IF a THEN\nPRINT 1\nELSEIF b THEN\nPRINT 2\nELSE\nPRINT 3\nEND IF";
        let m = parse_source(source);
        match &m.stmts[0].kind {
            StmtKind::If { arms, else_stmts } => {
                assert_eq!(arms.len(), 2);
                assert_eq!(arms[0].stmts.len(), 1);
                assert_eq!(arms[1].stmts.len(), 1);
                assert_eq!(else_stmts.len(), 1);
            }
            other => panic!("expected IF, got {:?}", other),
        }
    }

    #[test]
    fn do_while_tests_before_body() {
        let m = parse_source("DO WHILE x < 3\nx = x + 1\nLOOP");
        match &m.stmts[0].kind {
            StmtKind::CondLoop {
                structure,
                negated,
                stmts,
                ..
            } => {
                assert_eq!(*structure, LoopStructure::CondBeforeStmts);
                assert!(*negated); // WHILE exits when the condition fails
                assert_eq!(stmts.len(), 1);
            }
            other => panic!("expected DO WHILE, got {:?}", other),
        }
    }

    #[test]
    fn loop_until_tests_after_body() {
        let m = parse_source("DO\nx = x + 1\nLOOP UNTIL x >= 3");
        match &m.stmts[0].kind {
            StmtKind::CondLoop {
                structure, negated, ..
            } => {
                assert_eq!(*structure, LoopStructure::CondAfterStmts);
                assert!(!*negated); // UNTIL exits when the condition holds
            }
            other => panic!("expected DO..LOOP UNTIL, got {:?}", other),
        }
    }

    #[test]
    fn bare_do_loop() {
        let m = parse_source("DO\nPRINT 1\nLOOP");
        assert!(matches!(m.stmts[0].kind, StmtKind::UncondLoop { .. }));
    }

    #[test]
    fn double_loop_condition_is_an_error() {
        let tokens = lex("DO WHILE a\nLOOP UNTIL b").unwrap();
        assert!(Parser::new(&tokens).parse().is_err());
    }

    #[test]
    fn for_and_next_are_flat() {
        let m = parse_source("FOR i = 1 TO 3\nPRINT i\nNEXT i");
        assert_eq!(m.stmts.len(), 3);
        assert!(matches!(m.stmts[0].kind, StmtKind::For { .. }));
        assert!(matches!(m.stmts[1].kind, StmtKind::Print { .. }));
        match &m.stmts[2].kind {
            StmtKind::Next { counters } => assert_eq!(counters.len(), 1),
            other => panic!("expected NEXT, got {:?}", other),
        }
    }

    #[test]
    fn next_with_multiple_counters() {
        let m = parse_source("NEXT j, i");
        match &m.stmts[0].kind {
            StmtKind::Next { counters } => assert_eq!(counters.len(), 2),
            other => panic!("expected NEXT, got {:?}", other),
        }
    }

    #[test]
    fn dim_bounds() {
        let m = parse_source("DIM a(4) AS INTEGER\nDIM b(1 TO 3, 0 TO 2)");
        match &m.stmts[0].kind {
            StmtKind::Dim { dims, as_ty, .. } => {
                assert_eq!(dims.len(), 1);
                assert!(dims[0].lower.is_none());
                assert_eq!(*as_ty, Some(Ty::Integer));
            }
            other => panic!("expected DIM, got {:?}", other),
        }
        match &m.stmts[1].kind {
            StmtKind::Dim { dims, as_ty, .. } => {
                assert_eq!(dims.len(), 2);
                assert!(dims[0].lower.is_some());
                assert!(as_ty.is_none());
            }
            other => panic!("expected DIM, got {:?}", other),
        }
    }

    #[test]
    fn function_definition() {
        let m = parse_source("FUNCTION add%(a%, b%)\nadd% = a% + b%\nEND FUNCTION\nPRINT 1");
        assert_eq!(m.procs.len(), 1);
        assert_eq!(m.procs[0].name, "add%");
        assert_eq!(m.procs[0].params, vec!["a%", "b%"]);
        assert_eq!(m.procs[0].ret_ty, Ty::Integer);
        assert_eq!(m.stmts.len(), 1);
    }

    #[test]
    fn sub_is_rejected() {
        let tokens = lex("SUB s\nEND SUB").unwrap();
        assert!(Parser::new(&tokens).parse().is_err());
    }

    #[test]
    fn precedence_mul_over_add() {
        // 2 + 3 * 4 parses as 2 + (3 * 4)
        let e = parse_one_expr("2 + 3 * 4");
        match e.kind {
            ExprKind::Binary { op: BinOp::Add, r, .. } => {
                assert!(matches!(r.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("expected +, got {:?}", other),
        }
    }

    #[test]
    fn pow_is_right_associative() {
        // 2 ^ 3 ^ 2 parses as 2 ^ (3 ^ 2)
        let e = parse_one_expr("2 ^ 3 ^ 2");
        match e.kind {
            ExprKind::Binary { op: BinOp::Pow, r, .. } => {
                assert!(matches!(r.kind, ExprKind::Binary { op: BinOp::Pow, .. }));
            }
            other => panic!("expected ^, got {:?}", other),
        }
    }

    #[test]
    fn pow_binds_tighter_than_unary_minus() {
        // -2 ^ 2 parses as -(2 ^ 2)
        let e = parse_one_expr("-2 ^ 2");
        match e.kind {
            ExprKind::Unary { op: UnOp::Neg, r } => {
                assert!(matches!(r.kind, ExprKind::Binary { op: BinOp::Pow, .. }));
            }
            other => panic!("expected unary -, got {:?}", other),
        }
    }

    #[test]
    fn not_binds_below_relational() {
        // NOT a > b parses as NOT (a > b)
        let e = parse_one_expr("NOT a > b");
        match e.kind {
            ExprKind::Unary { op: UnOp::Not, r } => {
                assert!(matches!(r.kind, ExprKind::Binary { op: BinOp::Gt, .. }));
            }
            other => panic!("expected NOT, got {:?}", other),
        }
    }

    #[test]
    fn parens_are_preserved() {
        let e = parse_one_expr("(1 + 2) * 3");
        match e.kind {
            ExprKind::Binary { op: BinOp::Mul, l, .. } => {
                assert!(matches!(l.kind, ExprKind::Unary { op: UnOp::Parens, .. }));
            }
            other => panic!("expected *, got {:?}", other),
        }
    }

    #[test]
    fn every_node_has_a_loc() {
        let m = parse_source("x = 1 + 2\nPRINT x");
        // Statement locs line up with the source.
        assert_eq!(m.stmts[0].loc, Loc::new(1, 1));
        assert_eq!(m.stmts[1].loc, Loc::new(2, 1));
    }

    #[test]
    fn lbound_parses_as_function_call() {
        let e = parse_one_expr("LBOUND(a, 1)");
        match e.kind {
            ExprKind::FnCall { name, args, .. } => {
                assert_eq!(name, "LBOUND");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected call, got {:?}", other),
        }
    }
}
