//! Restricted spec-expression language: parsing and evaluation.
//!
//! Purpose
//! -------
//! Provide the deterministic, side-effect-free expression language that
//! coefficient specs use to describe utility terms. Expressions are parsed
//! once at spec construction into an [`Expr`] tree and then evaluated per
//! interaction row against named attributes supplied by a [`Scope`].
//!
//! Key behaviors
//! -------------
//! - Parse numeric literals, identifiers, unary minus, `+ - * /`,
//!   comparisons (`< <= > >= == !=`), logical `&` / `|`, and parentheses.
//! - Evaluate comparisons and logical operators over the 0.0/1.0 encoding
//!   (any non-zero value is truthy), matching the spec-file convention of
//!   expressions like `(duration > 4) & (start > 8)`.
//! - Collect the identifiers an expression references so specs can be
//!   checked against table schemas before any chunk is processed.
//!
//! Invariants & assumptions
//! ------------------------
//! - Evaluation is total over resolvable identifiers: the only run-time
//!   failures are an unresolved identifier, a zero divisor, or a non-finite
//!   result, each surfaced as a typed [`EvalError`].
//! - Operator precedence, tightest first: unary minus; `* /`; `+ -`;
//!   comparisons; `&`; `|`. Comparisons do not chain (`a < b < c` is a
//!   parse error).
//! - A [`Scope`] lookup is expected to be deterministic; the same name must
//!   resolve to the same value for the duration of one evaluation.
//!
//! Conventions
//! -----------
//! - Identifiers are `[A-Za-z_][A-Za-z0-9_]*` and resolve through the
//!   [`Scope`] trait; resolution *order* (alternative attribute, then
//!   chooser attribute, then constant) is a property of the scope
//!   implementation, not of this module.
//! - Parse errors carry the byte offset of the offending token so a broken
//!   spec row can be pinpointed.
//!
//! Downstream usage
//! ----------------
//! - `scheduling::core::spec` parses each spec row's expression at
//!   construction time.
//! - `scheduling::core::validation` uses [`Expr::identifiers`] for
//!   bind-time schema checks.
//! - `scheduling::engine::interaction` evaluates expressions per
//!   interaction row through its chooser/alternative/constants scope.
//!
//! Testing notes
//! -------------
//! - Unit tests cover precedence, the 0/1 comparison encoding, parse
//!   failures (dangling operators, unbalanced parentheses, malformed
//!   numbers, chained comparisons), unresolved identifiers, division by
//!   zero, and non-finite results.
use std::collections::BTreeSet;

use crate::scheduling::errors::{EvalError, EvalResult};

/// Attribute resolver for expression evaluation.
///
/// Implementations map identifier names to `f64` values; returning `None`
/// makes evaluation fail with [`EvalError::UndefinedIdentifier`]. The
/// engine's interaction scope resolves alternative attributes first, then
/// chooser attributes, then constants.
pub trait Scope {
    /// Resolve `identifier` to a value, or `None` if unknown.
    fn lookup(&self, identifier: &str) -> Option<f64>;
}

/// Binary operators of the expression language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

/// A parsed spec expression.
///
/// Built once via [`Expr::parse`] at spec construction time and evaluated
/// many times (once per interaction row) via [`Expr::eval`]. The tree owns
/// its identifier strings; no references into the source text survive
/// parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal.
    Number(f64),
    /// Attribute or constant reference, resolved through a [`Scope`].
    Ident(String),
    /// Unary negation.
    Neg(Box<Expr>),
    /// Binary operation.
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

impl Expr {
    /// Parse an expression string into an [`Expr`] tree.
    ///
    /// Parameters
    /// ----------
    /// - `text`: the expression source, e.g. `"(duration > 4) & (start > 8)"`.
    ///
    /// Returns
    /// -------
    /// `EvalResult<Expr>`
    ///   - `Ok(Expr)` for a well-formed expression.
    ///   - `Err(EvalError::Parse { .. })` carrying the source text, the byte
    ///     offset of the offending token, and a short reason otherwise.
    ///
    /// Errors
    /// ------
    /// - `EvalError::Parse` for malformed numeric literals, unexpected or
    ///   unknown characters, dangling operators, unbalanced parentheses,
    ///   chained comparisons, and trailing tokens.
    pub fn parse(text: &str) -> EvalResult<Expr> {
        let tokens = tokenize(text)?;
        let mut parser = Parser { text, tokens: &tokens, cursor: 0 };
        let expr = parser.parse_or()?;
        if parser.cursor != parser.tokens.len() {
            return Err(parser.error_at_cursor("unexpected trailing tokens"));
        }
        Ok(expr)
    }

    /// Evaluate the expression against a [`Scope`].
    ///
    /// Parameters
    /// ----------
    /// - `text`: the original expression source, used only to build error
    ///   payloads.
    /// - `scope`: attribute resolver for identifier lookup.
    ///
    /// Returns
    /// -------
    /// `EvalResult<f64>`
    ///   The expression value; comparisons and logical operators produce
    ///   0.0 or 1.0.
    ///
    /// Errors
    /// ------
    /// - `EvalError::UndefinedIdentifier` if an identifier does not resolve.
    /// - `EvalError::DivisionByZero` if a divisor evaluates to exactly 0.0.
    /// - `EvalError::NonFiniteResult` if the final value is NaN or ±inf
    ///   (e.g. from floating-point overflow).
    pub fn eval(&self, text: &str, scope: &dyn Scope) -> EvalResult<f64> {
        let value = self.eval_node(text, scope)?;
        if !value.is_finite() {
            return Err(EvalError::NonFiniteResult { expression: text.to_string(), value });
        }
        Ok(value)
    }

    /// Collect every identifier the expression references into `out`.
    ///
    /// Used for bind-time schema checks: a spec is rejected before any
    /// chunk is processed if one of its identifiers resolves nowhere.
    pub fn identifiers(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Number(_) => {}
            Expr::Ident(name) => {
                out.insert(name.clone());
            }
            Expr::Neg(inner) => inner.identifiers(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.identifiers(out);
                rhs.identifiers(out);
            }
        }
    }

    fn eval_node(&self, text: &str, scope: &dyn Scope) -> EvalResult<f64> {
        match self {
            Expr::Number(value) => Ok(*value),
            Expr::Ident(name) => scope.lookup(name).ok_or_else(|| {
                EvalError::UndefinedIdentifier {
                    identifier: name.clone(),
                    expression: text.to_string(),
                }
            }),
            Expr::Neg(inner) => Ok(-inner.eval_node(text, scope)?),
            Expr::Binary { op, lhs, rhs } => {
                let left = lhs.eval_node(text, scope)?;
                let right = rhs.eval_node(text, scope)?;
                match op {
                    BinOp::Add => Ok(left + right),
                    BinOp::Sub => Ok(left - right),
                    BinOp::Mul => Ok(left * right),
                    BinOp::Div => {
                        if right == 0.0 {
                            return Err(EvalError::DivisionByZero {
                                expression: text.to_string(),
                            });
                        }
                        Ok(left / right)
                    }
                    BinOp::Lt => Ok(bool_value(left < right)),
                    BinOp::Le => Ok(bool_value(left <= right)),
                    BinOp::Gt => Ok(bool_value(left > right)),
                    BinOp::Ge => Ok(bool_value(left >= right)),
                    BinOp::Eq => Ok(bool_value(left == right)),
                    BinOp::Ne => Ok(bool_value(left != right)),
                    BinOp::And => Ok(bool_value(left != 0.0 && right != 0.0)),
                    BinOp::Or => Ok(bool_value(left != 0.0 || right != 0.0)),
                }
            }
        }
    }
}

//
// ---------- Private helpers (compact docs) ----------
//

#[inline]
fn bool_value(condition: bool) -> f64 {
    if condition { 1.0 } else { 0.0 }
}

/// One lexical token plus its byte offset in the source.
#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    Ne,
    Amp,
    Pipe,
    LParen,
    RParen,
}

/// Split the source into tokens, tracking byte offsets for error payloads.
fn tokenize(text: &str) -> EvalResult<Vec<Token>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    let parse_err = |position: usize, reason: &'static str| EvalError::Parse {
        expression: text.to_string(),
        position,
        reason,
    };

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' => i += 1,
            '+' => {
                tokens.push(Token { kind: TokenKind::Plus, offset: i });
                i += 1;
            }
            '-' => {
                tokens.push(Token { kind: TokenKind::Minus, offset: i });
                i += 1;
            }
            '*' => {
                tokens.push(Token { kind: TokenKind::Star, offset: i });
                i += 1;
            }
            '/' => {
                tokens.push(Token { kind: TokenKind::Slash, offset: i });
                i += 1;
            }
            '&' => {
                tokens.push(Token { kind: TokenKind::Amp, offset: i });
                i += 1;
            }
            '|' => {
                tokens.push(Token { kind: TokenKind::Pipe, offset: i });
                i += 1;
            }
            '(' => {
                tokens.push(Token { kind: TokenKind::LParen, offset: i });
                i += 1;
            }
            ')' => {
                tokens.push(Token { kind: TokenKind::RParen, offset: i });
                i += 1;
            }
            '<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token { kind: TokenKind::Le, offset: i });
                    i += 2;
                } else {
                    tokens.push(Token { kind: TokenKind::Lt, offset: i });
                    i += 1;
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token { kind: TokenKind::Ge, offset: i });
                    i += 2;
                } else {
                    tokens.push(Token { kind: TokenKind::Gt, offset: i });
                    i += 1;
                }
            }
            '=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token { kind: TokenKind::EqEq, offset: i });
                    i += 2;
                } else {
                    return Err(parse_err(i, "single '=' is not an operator; use '=='"));
                }
            }
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token { kind: TokenKind::Ne, offset: i });
                    i += 2;
                } else {
                    return Err(parse_err(i, "single '!' is not an operator; use '!='"));
                }
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < bytes.len() && matches!(bytes[i] as char, '0'..='9' | '.') {
                    i += 1;
                }
                let literal = &text[start..i];
                let value: f64 = literal
                    .parse()
                    .map_err(|_| parse_err(start, "malformed numeric literal"))?;
                tokens.push(Token { kind: TokenKind::Number(value), offset: start });
            }
            'A'..='Z' | 'a'..='z' | '_' => {
                let start = i;
                while i < bytes.len()
                    && matches!(bytes[i] as char, 'A'..='Z' | 'a'..='z' | '0'..='9' | '_')
                {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(text[start..i].to_string()),
                    offset: start,
                });
            }
            _ => return Err(parse_err(i, "unexpected character")),
        }
    }

    Ok(tokens)
}

/// Recursive-descent parser over the token stream.
///
/// Grammar, loosest binding first:
///   or    := and ( '|' and )*
///   and   := cmp ( '&' cmp )*
///   cmp   := add ( ('<'|'<='|'>'|'>='|'=='|'!=') add )?
///   add   := mul ( ('+'|'-') mul )*
///   mul   := unary ( ('*'|'/') unary )*
///   unary := '-' unary | primary
///   primary := number | ident | '(' or ')'
struct Parser<'a> {
    text: &'a str,
    tokens: &'a [Token],
    cursor: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.cursor).map(|t| &t.kind)
    }

    fn advance(&mut self) {
        self.cursor += 1;
    }

    fn error_at_cursor(&self, reason: &'static str) -> EvalError {
        let position =
            self.tokens.get(self.cursor).map(|t| t.offset).unwrap_or(self.text.len());
        EvalError::Parse { expression: self.text.to_string(), position, reason }
    }

    fn parse_or(&mut self) -> EvalResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&TokenKind::Pipe) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary { op: BinOp::Or, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> EvalResult<Expr> {
        let mut lhs = self.parse_cmp()?;
        while self.peek() == Some(&TokenKind::Amp) {
            self.advance();
            let rhs = self.parse_cmp()?;
            lhs = Expr::Binary { op: BinOp::And, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> EvalResult<Expr> {
        let lhs = self.parse_add()?;
        let op = match self.peek() {
            Some(TokenKind::Lt) => BinOp::Lt,
            Some(TokenKind::Le) => BinOp::Le,
            Some(TokenKind::Gt) => BinOp::Gt,
            Some(TokenKind::Ge) => BinOp::Ge,
            Some(TokenKind::EqEq) => BinOp::Eq,
            Some(TokenKind::Ne) => BinOp::Ne,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_add()?;
        // Comparisons do not chain: a second comparison operator at this
        // level is left for the caller, which treats it as trailing junk.
        Ok(Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
    }

    fn parse_add(&mut self) -> EvalResult<Expr> {
        let mut lhs = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_mul()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
    }

    fn parse_mul(&mut self) -> EvalResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => BinOp::Mul,
                Some(TokenKind::Slash) => BinOp::Div,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
    }

    fn parse_unary(&mut self) -> EvalResult<Expr> {
        if self.peek() == Some(&TokenKind::Minus) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> EvalResult<Expr> {
        match self.peek() {
            Some(TokenKind::Number(value)) => {
                let value = *value;
                self.advance();
                Ok(Expr::Number(value))
            }
            Some(TokenKind::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(Expr::Ident(name))
            }
            Some(TokenKind::LParen) => {
                self.advance();
                let inner = self.parse_or()?;
                if self.peek() == Some(&TokenKind::RParen) {
                    self.advance();
                    Ok(inner)
                } else {
                    Err(self.error_at_cursor("expected ')'"))
                }
            }
            _ => Err(self.error_at_cursor("expected a value")),
        }
    }
}
