//! Tokenizer and recursive-descent parser for expressions.
//!
//! Precedence, loosest first:
//! - Logical: `||`, `&&`, `!`
//! - Comparison: `<`, `<=`, `>`, `>=`, `==`, `!=`
//! - Additive: `+`, `-`
//! - Multiplicative: `*`, `/`, `%`
//! - Unary: `-`
//! - Primary: numbers, (qualified) identifiers, `true`, `false`, `( expr )`

use super::ast::{BinaryOp, Expr, RelOp, UnaryOp};
use crate::result::{MutationTestingError, TamutResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Ident(String),
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Not,
    AndAnd,
    OrOr,
    Rel(RelOp),
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub(crate) fn tokenize(text: &str) -> TamutResult<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|e| MutationTestingError::expression(text, e.to_string()))?;
                tokens.push(Token::Number(value));
            }
            c if is_ident_start(c) => {
                let start = i;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                    // Qualified names: `Process.name`
                    if i + 1 < chars.len() && chars[i] == '.' && is_ident_char(chars[i + 1]) {
                        i += 1;
                    }
                }
                let ident: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(ident));
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '&' if next == Some('&') => {
                tokens.push(Token::AndAnd);
                i += 2;
            }
            '|' if next == Some('|') => {
                tokens.push(Token::OrOr);
                i += 2;
            }
            '<' | '>' | '=' | '!' => {
                let two: String = [c, next.unwrap_or(' ')].iter().collect();
                if let Some(op) = RelOp::from_symbol(&two) {
                    tokens.push(Token::Rel(op));
                    i += 2;
                } else if c == '!' {
                    tokens.push(Token::Not);
                    i += 1;
                } else if let Some(op) = RelOp::from_symbol(&c.to_string()) {
                    tokens.push(Token::Rel(op));
                    i += 1;
                } else {
                    return Err(MutationTestingError::expression(
                        text,
                        format!("unexpected '{c}' at offset {i}"),
                    ));
                }
            }
            other => {
                return Err(MutationTestingError::expression(
                    text,
                    format!("unexpected '{other}' at offset {i}"),
                ))
            }
        }
    }

    Ok(tokens)
}

pub(crate) struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(text: &'a str) -> TamutResult<Self> {
        Ok(Self {
            text,
            tokens: tokenize(text)?,
            pos: 0,
        })
    }

    /// Parse one expression that must consume the whole input.
    pub(crate) fn parse_complete(mut self) -> TamutResult<Expr> {
        if self.tokens.is_empty() {
            return Err(self.error("empty expression"));
        }
        let expr = self.parse_or()?;
        if let Some(token) = self.peek() {
            return Err(self.error(&format!("unexpected trailing {token:?}")));
        }
        Ok(expr)
    }

    fn error(&self, message: &str) -> MutationTestingError {
        MutationTestingError::expression(self.text, message)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> TamutResult<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::OrOr) {
            let right = self.parse_and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> TamutResult<Expr> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::AndAnd) {
            let right = self.parse_not()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> TamutResult<Expr> {
        if self.eat(&Token::Not) {
            let inner = self.parse_not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> TamutResult<Expr> {
        let mut left = self.parse_additive()?;
        while let Some(Token::Rel(op)) = self.peek().cloned() {
            self.pos += 1;
            let right = self.parse_additive()?;
            left = Expr::Binary(BinaryOp::Rel(op), Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> TamutResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> TamutResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> TamutResult<Expr> {
        if self.eat(&Token::Minus) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner)));
        }
        if self.eat(&Token::Not) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> TamutResult<Expr> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Ident(name)) => Ok(match name.as_str() {
                "true" => Expr::Bool(true),
                "false" => Expr::Bool(false),
                _ => Expr::Var(name),
            }),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                if self.eat(&Token::RParen) {
                    Ok(inner)
                } else {
                    Err(self.error("missing ')'"))
                }
            }
            Some(token) => Err(self.error(&format!("unexpected {token:?}"))),
            None => Err(self.error("unexpected end of input")),
        }
    }
}
