//! Guard, invariant and update expressions.
//!
//! Two layers:
//! - [`Expr`]: a typed AST for evaluation over a [`Valuation`]
//! - [`Relation`], [`Conjunction`], [`Update`]: text-preserving views that
//!   mutation operators edit in place

mod ast;
mod parser;
mod text;

pub use ast::{eval_guard, BinaryOp, Expr, RelOp, UnaryOp, Valuation, Value};
pub use text::{integer_literals, mentions, Assignment, Conjunction, IntegerLiteral, Relation, Update};
