//! Expression AST and evaluation.

use super::parser::Parser;
use crate::result::{MutationTestingError, TamutResult};
use std::collections::BTreeMap;
use std::fmt;

/// Relational operator of a simple guard relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,
}

impl RelOp {
    /// All six operators in catalogue order.
    pub const ALL: [Self; 6] = [Self::Lt, Self::Le, Self::Eq, Self::Ne, Self::Ge, Self::Gt];

    /// Operators allowed on clock relations.
    pub const CLOCK: [Self; 2] = [Self::Le, Self::Gt];

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }

    /// Short alphanumeric name, usable inside identifiers
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Eq => "eq",
            Self::Ne => "ne",
        }
    }

    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    #[must_use]
    pub fn holds(self, left: f64, right: f64) -> bool {
        match self {
            Self::Lt => left < right,
            Self::Le => left <= right,
            Self::Gt => left > right,
            Self::Ge => left >= right,
            Self::Eq => left == right,
            Self::Ne => left != right,
        }
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Rel(RelOp),
    And,
    Or,
}

/// Parsed guard, invariant, update right-hand side or strategy condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Bool(bool),
    Var(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

/// Result of evaluating an expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
}

impl Value {
    /// Numbers are truthy when non-zero.
    #[must_use]
    pub fn as_bool(self) -> bool {
        match self {
            Self::Bool(b) => b,
            Self::Number(n) => n != 0.0,
        }
    }

    /// Booleans coerce to 1 / 0.
    #[must_use]
    pub fn as_number(self) -> f64 {
        match self {
            Self::Number(n) => n,
            Self::Bool(true) => 1.0,
            Self::Bool(false) => 0.0,
        }
    }
}

/// Name to value bindings used during evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Valuation {
    values: BTreeMap<String, f64>,
}

impl Valuation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable value
    pub fn set(&mut self, name: impl Into<String>, value: f64) -> &mut Self {
        self.values.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Copy every binding of `other` into this valuation
    pub fn extend(&mut self, other: &Self) {
        for (name, value) in &other.values {
            self.values.insert(name.clone(), *value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Valuation {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut valuation = Self::new();
        for (name, value) in iter {
            valuation.set(name, value);
        }
        valuation
    }
}

impl Expr {
    /// Parse an expression.
    ///
    /// # Errors
    /// Returns `MalformedExpression` if the text is not a valid expression.
    pub fn parse(text: &str) -> TamutResult<Self> {
        Parser::new(text)?.parse_complete()
    }

    /// Names referenced by the expression, in first-use order.
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Var(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Self::Unary(_, inner) => inner.collect_variables(names),
            Self::Binary(_, left, right) => {
                left.collect_variables(names);
                right.collect_variables(names);
            }
            Self::Number(_) | Self::Bool(_) => {}
        }
    }

    /// Evaluate against a valuation.
    pub fn eval(&self, valuation: &Valuation) -> TamutResult<Value> {
        match self {
            Self::Number(n) => Ok(Value::Number(*n)),
            Self::Bool(b) => Ok(Value::Bool(*b)),
            Self::Var(name) => valuation.get(name).map(Value::Number).ok_or_else(|| {
                MutationTestingError::UnknownVariable {
                    name: name.clone(),
                    expression: self.to_string(),
                }
            }),
            Self::Unary(UnaryOp::Neg, inner) => {
                Ok(Value::Number(-inner.eval(valuation)?.as_number()))
            }
            Self::Unary(UnaryOp::Not, inner) => Ok(Value::Bool(!inner.eval(valuation)?.as_bool())),
            Self::Binary(BinaryOp::And, left, right) => Ok(Value::Bool(
                left.eval(valuation)?.as_bool() && right.eval(valuation)?.as_bool(),
            )),
            Self::Binary(BinaryOp::Or, left, right) => Ok(Value::Bool(
                left.eval(valuation)?.as_bool() || right.eval(valuation)?.as_bool(),
            )),
            Self::Binary(op, left, right) => {
                let l = left.eval(valuation)?.as_number();
                let r = right.eval(valuation)?.as_number();
                self.arithmetic(*op, l, r)
            }
        }
    }

    fn arithmetic(&self, op: BinaryOp, l: f64, r: f64) -> TamutResult<Value> {
        let value = match op {
            BinaryOp::Add => Value::Number(l + r),
            BinaryOp::Sub => Value::Number(l - r),
            BinaryOp::Mul => Value::Number(l * r),
            BinaryOp::Div | BinaryOp::Rem if r == 0.0 => {
                return Err(MutationTestingError::TypeError {
                    expression: self.to_string(),
                    message: "division by zero".to_string(),
                })
            }
            BinaryOp::Div => Value::Number(l / r),
            BinaryOp::Rem => Value::Number(l % r),
            BinaryOp::Rel(rel) => Value::Bool(rel.holds(l, r)),
            BinaryOp::And => Value::Bool(l != 0.0 && r != 0.0),
            BinaryOp::Or => Value::Bool(l != 0.0 || r != 0.0),
        };
        Ok(value)
    }

    /// Evaluate and interpret the result as a boolean.
    pub fn eval_bool(&self, valuation: &Valuation) -> TamutResult<bool> {
        self.eval(valuation).map(Value::as_bool)
    }

    /// Evaluate and interpret the result as a number.
    pub fn eval_number(&self, valuation: &Valuation) -> TamutResult<f64> {
        self.eval(valuation).map(Value::as_number)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Var(name) => f.write_str(name),
            Self::Unary(UnaryOp::Neg, inner) => write!(f, "-{inner}"),
            Self::Unary(UnaryOp::Not, inner) => write!(f, "!{inner}"),
            Self::Binary(op, left, right) => {
                let symbol = match op {
                    BinaryOp::Add => "+",
                    BinaryOp::Sub => "-",
                    BinaryOp::Mul => "*",
                    BinaryOp::Div => "/",
                    BinaryOp::Rem => "%",
                    BinaryOp::Rel(rel) => rel.symbol(),
                    BinaryOp::And => "&&",
                    BinaryOp::Or => "||",
                };
                write!(f, "({left} {symbol} {right})")
            }
        }
    }
}

/// Parse and evaluate a guard or invariant; empty text is `true`.
pub fn eval_guard(text: &str, valuation: &Valuation) -> TamutResult<bool> {
    if text.trim().is_empty() {
        return Ok(true);
    }
    Expr::parse(text)?.eval_bool(valuation)
}
