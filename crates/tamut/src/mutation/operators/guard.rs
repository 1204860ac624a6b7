//! Guard operators: relational operator swaps and constant shifts.

use super::{is_clock_part, unlocked_edges, with_edge};
use crate::expr::{integer_literals, Conjunction, RelOp, Relation};
use crate::model::Component;
use crate::mutation::{MutationClass, MutationOperator, MutationTestCase};
use crate::result::{MutationTestingError, TamutResult};
use std::sync::Arc;

/// Replace the operator of every guard part of one kind with each candidate.
fn swap_operators(
    class: MutationClass,
    original: &Arc<Component>,
    clock_parts: bool,
    candidates: &[RelOp],
) -> TamutResult<Vec<MutationTestCase>> {
    let mut cases = Vec::new();
    for (index, edge) in unlocked_edges(original) {
        let guard = Conjunction::parse(&edge.guard)?;
        for (part_index, part) in guard.parts().iter().enumerate() {
            if is_clock_part(original, part) != clock_parts {
                continue;
            }
            let relation = Relation::parse(part)?;
            for op in candidates.iter().copied().filter(|op| *op != relation.op) {
                let mutated = guard
                    .with_part(part_index, relation.with_op(op).to_string())
                    .to_string();
                let description = format!(
                    "Change guard of edge {index} ({edge}) from '{}' to '{mutated}'",
                    edge.guard
                );
                let mutant = with_edge(original, index, |e| e.guard = mutated);
                cases.push(MutationTestCase::new(
                    class,
                    original,
                    format!("{index}_{part_index}_{}", op.name()),
                    description,
                    mutant,
                ));
            }
        }
    }
    Ok(cases)
}

fn guard_part_count(component: &Component, clock_parts: bool) -> usize {
    unlocked_edges(component)
        .filter_map(|(_, edge)| Conjunction::parse(&edge.guard).ok())
        .map(|guard| {
            guard
                .parts()
                .iter()
                .filter(|part| is_clock_part(component, part) == clock_parts)
                .count()
        })
        .sum()
}

/// Swaps the operator of clock guard parts within `{<=, >}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeGuardOpClocksOperator;

impl MutationOperator for ChangeGuardOpClocksOperator {
    fn class(&self) -> MutationClass {
        MutationClass::ChangeGuardOpClocks
    }

    fn generate(&self, original: &Arc<Component>) -> TamutResult<Vec<MutationTestCase>> {
        swap_operators(self.class(), original, true, &RelOp::CLOCK)
    }

    fn upper_bound(&self, component: &Component) -> usize {
        RelOp::CLOCK.len() * guard_part_count(component, true)
    }

    fn is_upper_bound_exact(&self) -> bool {
        false
    }
}

/// Swaps the operator of non-clock guard parts with each of the six relations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeGuardOpLocalsOperator;

impl MutationOperator for ChangeGuardOpLocalsOperator {
    fn class(&self) -> MutationClass {
        MutationClass::ChangeGuardOpLocals
    }

    fn generate(&self, original: &Arc<Component>) -> TamutResult<Vec<MutationTestCase>> {
        swap_operators(self.class(), original, false, &RelOp::ALL)
    }

    fn upper_bound(&self, component: &Component) -> usize {
        (RelOp::ALL.len() - 1) * guard_part_count(component, false)
    }

    fn is_upper_bound_exact(&self) -> bool {
        false
    }
}

/// Shifts each integer literal of a guard by +1 and -1.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeGuardConstantOperator;

impl MutationOperator for ChangeGuardConstantOperator {
    fn class(&self) -> MutationClass {
        MutationClass::ChangeGuardConstant
    }

    fn generate(&self, original: &Arc<Component>) -> TamutResult<Vec<MutationTestCase>> {
        let mut cases = Vec::new();
        for (index, edge) in unlocked_edges(original) {
            for (literal_index, literal) in integer_literals(&edge.guard).into_iter().enumerate() {
                for (delta, tag) in [(1, "inc"), (-1, "dec")] {
                    let shifted = literal.value.checked_add(delta).ok_or_else(|| {
                        MutationTestingError::invariant(format!(
                            "guard constant {} of edge {index} cannot be shifted by {delta}",
                            literal.value
                        ))
                    })?;
                    let mut mutated = edge.guard.clone();
                    mutated.replace_range(literal.span.clone(), &shifted.to_string());
                    let description = format!(
                        "Change guard of edge {index} ({edge}) from '{}' to '{mutated}'",
                        edge.guard
                    );
                    let mutant = with_edge(original, index, |e| e.guard = mutated);
                    cases.push(MutationTestCase::new(
                        self.class(),
                        original,
                        format!("{index}_{literal_index}_{tag}"),
                        description,
                        mutant,
                    ));
                }
            }
        }
        Ok(cases)
    }

    fn upper_bound(&self, component: &Component) -> usize {
        unlocked_edges(component)
            .map(|(_, edge)| 2 * integer_literals(&edge.guard).len())
            .sum()
    }

    fn is_upper_bound_exact(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::{Direction, Edge, Location, LocationType};
    use crate::mutation::operators::fixtures::{load, FOUR_BY_FIVE};

    fn single_guard(guard: &str) -> Arc<Component> {
        let mut component = Component::new("G");
        component.declarations.clocks.push("x".to_string());
        component.declarations.inputs.push("a".to_string());
        component.add_location(Location::new("A").with_kind(LocationType::Initial));
        component.add_location(Location::new("B"));
        component.add_edge(Edge::new("A", "B", Direction::Input, "a").with_guard(guard));
        Arc::new(component)
    }

    fn mutated_guards(operator: &dyn MutationOperator, guard: &str) -> Vec<String> {
        operator
            .generate(&single_guard(guard))
            .unwrap()
            .into_iter()
            .map(|case| case.mutant.edges[0].guard.clone())
            .collect()
    }

    mod clock_op_tests {
        use super::*;

        #[test]
        fn test_le_has_single_mutant() {
            assert_eq!(mutated_guards(&ChangeGuardOpClocksOperator, "20<=x"), vec!["20>x"]);
        }

        #[test]
        fn test_lt_has_two_mutants() {
            assert_eq!(
                mutated_guards(&ChangeGuardOpClocksOperator, "20<x"),
                vec!["20<=x", "20>x"]
            );
        }

        #[test]
        fn test_ne_has_two_mutants() {
            assert_eq!(
                mutated_guards(&ChangeGuardOpClocksOperator, "20!=x"),
                vec!["20<=x", "20>x"]
            );
        }

        #[test]
        fn test_original_never_produced() {
            for guard in ["20<=x", "20<x", "20>x", "x==3", "x>=1"] {
                assert!(!mutated_guards(&ChangeGuardOpClocksOperator, guard)
                    .iter()
                    .any(|g| g == guard));
            }
        }

        #[test]
        fn test_fixture_counts() {
            let original = load(FOUR_BY_FIVE);
            let cases = ChangeGuardOpClocksOperator.generate(&original).unwrap();
            assert_eq!(cases.len(), 4);
            assert!(cases.len() <= ChangeGuardOpClocksOperator.upper_bound(&original));
        }

        #[test]
        fn test_other_parts_preserved() {
            let original = load(FOUR_BY_FIVE);
            let cases = ChangeGuardOpClocksOperator.generate(&original).unwrap();
            let guards: Vec<_> = cases
                .iter()
                .filter(|c| c.id.starts_with("change_guard_op_clocks_1_"))
                .map(|c| c.mutant.edges[1].guard.as_str())
                .collect();
            assert_eq!(guards, vec!["x <= 2 && v == 1", "x > 2 && v == 1"]);
        }
    }

    mod local_op_tests {
        use super::*;

        #[test]
        fn test_five_alternatives() {
            let original = load(FOUR_BY_FIVE);
            let cases = ChangeGuardOpLocalsOperator.generate(&original).unwrap();
            assert_eq!(cases.len(), 10);
            assert_eq!(ChangeGuardOpLocalsOperator.upper_bound(&original), 10);
            let guards: Vec<_> = cases
                .iter()
                .filter(|c| c.id.starts_with("change_guard_op_locals_3_"))
                .map(|c| c.mutant.edges[3].guard.as_str())
                .collect();
            assert_eq!(guards, vec!["v < 0", "v <= 0", "v == 0", "v >= 0", "v > 0"]);
        }

        #[test]
        fn test_clock_parts_ignored() {
            assert!(mutated_guards(&ChangeGuardOpLocalsOperator, "x < 3").is_empty());
        }

        #[test]
        fn test_malformed_part_is_error() {
            let original = single_guard("a + 1");
            assert!(ChangeGuardOpLocalsOperator.generate(&original).is_err());
        }
    }

    mod constant_tests {
        use super::*;

        #[test]
        fn test_increment_and_decrement() {
            assert_eq!(
                mutated_guards(&ChangeGuardConstantOperator, "20<=x"),
                vec!["21<=x", "19<=x"]
            );
        }

        #[test]
        fn test_fixture_counts() {
            let original = load(FOUR_BY_FIVE);
            let cases = ChangeGuardConstantOperator.generate(&original).unwrap();
            assert_eq!(cases.len(), 10);
            assert_eq!(ChangeGuardConstantOperator.upper_bound(&original), 10);
        }

        #[test]
        fn test_max_constant_is_error() {
            let err = ChangeGuardConstantOperator
                .generate(&single_guard("x < 9223372036854775807"))
                .unwrap_err();
            assert!(matches!(err, MutationTestingError::InvariantViolated { .. }));
            assert!(err.to_string().contains("9223372036854775807"));
        }

        #[test]
        fn test_identifier_digits_untouched() {
            assert_eq!(
                mutated_guards(&ChangeGuardConstantOperator, "x1 < 4"),
                vec!["x1 < 5", "x1 < 3"]
            );
        }
    }
}
