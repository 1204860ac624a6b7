//! Text-preserving views of guards, invariants and updates.
//!
//! Mutation operators edit one piece of a guard or update and must leave the
//! rest of the text untouched, so these types keep the original side and part
//! text instead of re-rendering from the AST.

use super::ast::{Expr, RelOp, Valuation};
use super::parser::{is_ident_char, is_ident_start};
use crate::result::{MutationTestingError, TamutResult};
use std::fmt;
use std::ops::Range;

const RELATION_CHARS: [char; 4] = ['<', '>', '=', '!'];

/// A simple relation `side1 OP side2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Left side, whitespace preserved
    pub left: String,
    /// Relational operator
    pub op: RelOp,
    /// Right side, whitespace preserved
    pub right: String,
}

impl Relation {
    /// Parse `side1 OP side2` where neither side contains `<>=!`.
    ///
    /// # Errors
    /// Returns `MalformedRelation` if the text has no operator, an unknown
    /// operator, an empty side, or more than one operator.
    pub fn parse(text: &str) -> TamutResult<Self> {
        let malformed = |message: &str| MutationTestingError::MalformedRelation {
            text: text.to_string(),
            message: message.to_string(),
        };

        let at = text
            .find(RELATION_CHARS)
            .ok_or_else(|| malformed("no relational operator"))?;
        let rest = &text[at..];
        let op = RelOp::ALL
            .into_iter()
            .filter(|op| rest.starts_with(op.symbol()))
            .max_by_key(|op| op.symbol().len())
            .ok_or_else(|| malformed("unknown relational operator"))?;

        let left = &text[..at];
        let right = &rest[op.symbol().len()..];
        if left.trim().is_empty() || right.trim().is_empty() {
            return Err(malformed("empty side"));
        }
        if right.contains(RELATION_CHARS) {
            return Err(malformed("more than one relational operator"));
        }

        Ok(Self {
            left: left.to_string(),
            op,
            right: right.to_string(),
        })
    }

    /// Same sides, different operator
    #[must_use]
    pub fn with_op(&self, op: RelOp) -> Self {
        Self {
            op,
            ..self.clone()
        }
    }

    /// Same left side and operator, different right side
    #[must_use]
    pub fn with_right(&self, right: impl Into<String>) -> Self {
        Self {
            right: right.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.left, self.op, self.right)
    }
}

/// Split `text` on `separator` at parenthesis depth zero.
fn split_top_level<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;
    while i < text.len() {
        let rest = &text[i..];
        if depth == 0 && rest.starts_with(separator) {
            parts.push(&text[start..i]);
            i += separator.len();
            start = i;
            continue;
        }
        match rest.chars().next() {
            Some('(') => depth += 1,
            Some(')') => depth -= 1,
            _ => {}
        }
        i += rest.chars().next().map_or(1, char::len_utf8);
    }
    parts.push(&text[start..]);
    parts
}

/// A guard or invariant split into its top-level `&&` parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conjunction {
    parts: Vec<String>,
}

impl Conjunction {
    /// Split on top-level `&&`; empty text yields no parts.
    ///
    /// # Errors
    /// Returns `MalformedExpression` if a part between `&&` is empty.
    pub fn parse(text: &str) -> TamutResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let parts = split_top_level(text, "&&")
            .into_iter()
            .map(str::trim)
            .map(str::to_string)
            .collect::<Vec<_>>();
        if parts.iter().any(String::is_empty) {
            return Err(MutationTestingError::expression(text, "empty conjunct"));
        }
        Ok(Self { parts })
    }

    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Copy with part `index` replaced
    #[must_use]
    pub fn with_part(&self, index: usize, part: impl Into<String>) -> Self {
        let mut parts = self.parts.clone();
        parts[index] = part.into();
        Self { parts }
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join(" && "))
    }
}

/// One assignment `var = expr` or `var := expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Assigned variable or clock
    pub target: String,
    /// Right-hand side text, trimmed
    pub value: String,
    expr: Expr,
}

impl Assignment {
    /// Parse `var (=|:=) expr`.
    pub fn parse(text: &str) -> TamutResult<Self> {
        let malformed = |message: &str| MutationTestingError::MalformedUpdate {
            text: text.to_string(),
            message: message.to_string(),
        };

        let eq = text.find('=').ok_or_else(|| malformed("missing '='"))?;
        let lhs = text[..eq].strip_suffix(':').unwrap_or(&text[..eq]).trim();
        let rhs = text[eq + 1..].trim();

        let mut chars = lhs.chars();
        let valid_target = chars.next().is_some_and(is_ident_start) && chars.all(is_ident_char);
        if !valid_target {
            return Err(malformed("assignment target must be an identifier"));
        }
        if rhs.is_empty() || rhs.starts_with('=') {
            return Err(malformed("missing right-hand side"));
        }
        let expr = Expr::parse(rhs)?;

        Ok(Self {
            target: lhs.to_string(),
            value: rhs.to_string(),
            expr,
        })
    }

    /// Evaluate the right-hand side
    pub fn evaluate(&self, valuation: &Valuation) -> TamutResult<f64> {
        self.expr.eval_number(valuation)
    }

    /// Whether this assigns the constant zero
    #[must_use]
    pub fn is_reset(&self) -> bool {
        matches!(self.expr, Expr::Number(n) if n == 0.0)
    }
}

/// A comma-separated list of assignments, part text preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    parts: Vec<String>,
    assignments: Vec<Assignment>,
}

impl Update {
    /// Parse an update; empty text or the literal `1` means no assignment.
    ///
    /// # Errors
    /// Returns `MalformedUpdate` if any part is not an assignment.
    pub fn parse(text: &str) -> TamutResult<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == "1" {
            return Ok(Self::default());
        }
        let mut update = Self::default();
        for part in split_top_level(trimmed, ",") {
            let part = part.trim();
            update.assignments.push(Assignment::parse(part)?);
            update.parts.push(part.to_string());
        }
        Ok(update)
    }

    #[must_use]
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Index of the assignment to `target`, if any
    #[must_use]
    pub fn position(&self, target: &str) -> Option<usize> {
        self.assignments.iter().position(|a| a.target == target)
    }

    /// Whether `target` is reset to zero
    #[must_use]
    pub fn resets(&self, target: &str) -> bool {
        self.assignments
            .iter()
            .any(|a| a.target == target && a.is_reset())
    }

    /// Copy without the assignment at `index`
    #[must_use]
    pub fn without(&self, index: usize) -> Self {
        let mut update = self.clone();
        update.parts.remove(index);
        update.assignments.remove(index);
        update
    }

    /// Copy with `target = value` replacing an existing assignment or appended.
    pub fn with_assignment(&self, target: &str, value: &str) -> TamutResult<Self> {
        let part = format!("{target} = {value}");
        let assignment = Assignment::parse(&part)?;
        let mut update = self.clone();
        match self.position(target) {
            Some(index) => {
                update.parts[index] = part;
                update.assignments[index] = assignment;
            }
            None => {
                update.parts.push(part);
                update.assignments.push(assignment);
            }
        }
        Ok(update)
    }

    /// Evaluate every right-hand side against the same pre-update snapshot.
    pub fn evaluate(&self, snapshot: &Valuation) -> TamutResult<Vec<(String, f64)>> {
        self.assignments
            .iter()
            .map(|a| Ok((a.target.clone(), a.evaluate(snapshot)?)))
            .collect()
    }

    /// Evaluate against the current values, then write every target at once.
    pub fn apply(&self, valuation: &mut Valuation) -> TamutResult<()> {
        for (target, value) in self.evaluate(valuation)? {
            valuation.set(target, value);
        }
        Ok(())
    }
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join(", "))
    }
}

/// Whether `text` mentions `name` as a whole identifier token.
#[must_use]
pub fn mentions(text: &str, name: &str) -> bool {
    text.split(|c: char| !is_ident_char(c))
        .any(|token| token == name)
}

/// An integer literal occurrence inside an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerLiteral {
    /// Byte range in the source text
    pub span: Range<usize>,
    /// Parsed value
    pub value: i64,
}

/// Integer literals in `text`, skipping digits inside identifiers and decimals.
#[must_use]
pub fn integer_literals(text: &str) -> Vec<IntegerLiteral> {
    let bytes = text.as_bytes();
    let mut literals = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let glued_before = start > 0
            && (bytes[start - 1].is_ascii_alphanumeric()
                || bytes[start - 1] == b'_'
                || bytes[start - 1] == b'.');
        let glued_after = i < bytes.len()
            && (bytes[i].is_ascii_alphabetic() || bytes[i] == b'_' || bytes[i] == b'.');
        if glued_before || glued_after {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.') {
                i += 1;
            }
            continue;
        }
        if let Ok(value) = text[start..i].parse::<i64>() {
            literals.push(IntegerLiteral {
                span: start..i,
                value,
            });
        }
    }
    literals
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod relation_tests {
        use super::*;

        #[test]
        fn test_parse_compact() {
            let relation = Relation::parse("20<=x").unwrap();
            assert_eq!(relation.left, "20");
            assert_eq!(relation.op, RelOp::Le);
            assert_eq!(relation.right, "x");
        }

        #[test]
        fn test_parse_spaced_preserves_text() {
            let relation = Relation::parse("x < 2").unwrap();
            assert_eq!(relation.left, "x ");
            assert_eq!(relation.right, " 2");
            assert_eq!(relation.to_string(), "x < 2");
        }

        #[test]
        fn test_with_op() {
            let relation = Relation::parse("20<x").unwrap();
            assert_eq!(relation.with_op(RelOp::Gt).to_string(), "20>x");
        }

        #[test]
        fn test_with_right() {
            let relation = Relation::parse("x < 2").unwrap();
            let right = format!("{} + 1", relation.right);
            assert_eq!(relation.with_right(right).to_string(), "x < 2 + 1");
        }

        #[test]
        fn test_rejects_malformed() {
            assert!(Relation::parse("x").is_err());
            assert!(Relation::parse("x = 1").is_err());
            assert!(Relation::parse("<= 2").is_err());
            assert!(Relation::parse("x <").is_err());
            assert!(Relation::parse("1 < x < 3").is_err());
        }
    }

    mod conjunction_tests {
        use super::*;

        #[test]
        fn test_split_and_join() {
            let conj = Conjunction::parse("x < 2 && y <= 3").unwrap();
            assert_eq!(conj.parts(), ["x < 2", "y <= 3"]);
            assert_eq!(conj.to_string(), "x < 2 && y <= 3");
        }

        #[test]
        fn test_empty() {
            assert!(Conjunction::parse("").unwrap().is_empty());
        }

        #[test]
        fn test_respects_parentheses() {
            let conj = Conjunction::parse("(a > 1 && b > 2) && c == 0").unwrap();
            assert_eq!(conj.len(), 2);
            assert_eq!(conj.parts()[0], "(a > 1 && b > 2)");
        }

        #[test]
        fn test_empty_conjunct_rejected() {
            assert!(Conjunction::parse("x < 1 && ").is_err());
        }

        #[test]
        fn test_with_part() {
            let conj = Conjunction::parse("x < 2 && y <= 3").unwrap();
            assert_eq!(conj.with_part(1, "y > 3").to_string(), "x < 2 && y > 3");
        }
    }

    mod update_tests {
        use super::*;

        #[test]
        fn test_parse_forms() {
            let update = Update::parse("x = 0, y := 0, v = v + 1").unwrap();
            assert_eq!(update.assignments().len(), 3);
            assert_eq!(update.assignments()[1].target, "y");
            assert_eq!(update.assignments()[2].value, "v + 1");
            assert!(update.resets("x"));
            assert!(update.resets("y"));
            assert!(!update.resets("v"));
        }

        #[test]
        fn test_literal_one_is_empty() {
            assert!(Update::parse("1").unwrap().is_empty());
            assert!(Update::parse("").unwrap().is_empty());
        }

        #[test]
        fn test_rejects_malformed() {
            assert!(Update::parse("x == 0").is_err());
            assert!(Update::parse("3 = x").is_err());
            assert!(Update::parse("x =").is_err());
            assert!(Update::parse("x = 0,").is_err());
        }

        #[test]
        fn test_without_preserves_other_parts() {
            let update = Update::parse("x:=0, y = 0").unwrap();
            assert_eq!(update.without(1).to_string(), "x:=0");
            assert_eq!(update.without(0).to_string(), "y = 0");
        }

        #[test]
        fn test_with_assignment() {
            let update = Update::parse("x = 0").unwrap();
            assert_eq!(
                update.with_assignment("v", "2").unwrap().to_string(),
                "x = 0, v = 2"
            );
            assert_eq!(update.with_assignment("x", "3").unwrap().to_string(), "x = 3");
        }

        #[test]
        fn test_simultaneous_evaluation() {
            let update = Update::parse("a = b, b = a").unwrap();
            let snapshot: Valuation = [("a", 1.0), ("b", 2.0)].into_iter().collect();
            let values = update.evaluate(&snapshot).unwrap();
            assert_eq!(values, vec![("a".to_string(), 2.0), ("b".to_string(), 1.0)]);
        }

        #[test]
        fn test_apply_reads_old_values() {
            let update = Update::parse("a = a + 1, b = a").unwrap();
            let mut valuation: Valuation = [("a", 1.0), ("b", 0.0)].into_iter().collect();
            update.apply(&mut valuation).unwrap();
            assert_eq!(valuation.get("a"), Some(2.0));
            assert_eq!(valuation.get("b"), Some(1.0));
        }
    }

    #[test]
    fn test_mentions_whole_token() {
        assert!(mentions("20<=x", "x"));
        assert!(mentions("x1 + x < 3", "x"));
        assert!(!mentions("x1 < 3", "x"));
        assert!(!mentions("max < 3", "x"));
    }

    #[test]
    fn test_integer_literals() {
        let literals = integer_literals("x1 < 20 && y >= 3 + 1.5");
        let values: Vec<_> = literals.iter().map(|l| l.value).collect();
        assert_eq!(values, vec![20, 3]);
        assert_eq!(&"x1 < 20 && y >= 3 + 1.5"[literals[0].span.clone()], "20");
    }
}
