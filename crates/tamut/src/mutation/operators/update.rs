//! Update operators: clock resets and local assignments.

use super::{unlocked_edges, with_edge};
use crate::expr::Update;
use crate::model::Component;
use crate::mutation::{MutationClass, MutationOperator, MutationTestCase};
use crate::result::TamutResult;
use std::sync::Arc;

/// Toggles the reset of each declared clock on each edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvertResetOperator;

impl MutationOperator for InvertResetOperator {
    fn class(&self) -> MutationClass {
        MutationClass::InvertReset
    }

    fn generate(&self, original: &Arc<Component>) -> TamutResult<Vec<MutationTestCase>> {
        let mut cases = Vec::new();
        for (index, edge) in unlocked_edges(original) {
            let update = Update::parse(&edge.update)?;
            for clock in &original.declarations.clocks {
                let reset = update
                    .assignments()
                    .iter()
                    .position(|a| a.target == *clock && a.is_reset());
                let (mutated, description) = match reset {
                    Some(position) => (
                        update.without(position).to_string(),
                        format!("Remove reset of clock '{clock}' from edge {index} ({edge})"),
                    ),
                    None => (
                        update.with_assignment(clock, "0")?.to_string(),
                        format!("Add reset of clock '{clock}' to edge {index} ({edge})"),
                    ),
                };
                let mutant = with_edge(original, index, |e| e.update = mutated);
                cases.push(MutationTestCase::new(
                    self.class(),
                    original,
                    format!("{index}_{clock}"),
                    description,
                    mutant,
                ));
            }
        }
        Ok(cases)
    }

    fn upper_bound(&self, component: &Component) -> usize {
        unlocked_edges(component).count() * component.declarations.clocks.len()
    }

    fn is_upper_bound_exact(&self) -> bool {
        false
    }
}

/// Assigns each bounded local every value in its range.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeVarUpdateOperator;

impl MutationOperator for ChangeVarUpdateOperator {
    fn class(&self) -> MutationClass {
        MutationClass::ChangeVarUpdate
    }

    fn generate(&self, original: &Arc<Component>) -> TamutResult<Vec<MutationTestCase>> {
        let mut cases = Vec::new();
        for (index, edge) in unlocked_edges(original) {
            let update = Update::parse(&edge.update)?;
            for local in &original.declarations.locals {
                let current = update
                    .assignments()
                    .iter()
                    .find(|a| a.target == local.name)
                    .map(|a| a.value.as_str());
                for value in local.lower..=local.upper {
                    let value = value.to_string();
                    if current == Some(value.as_str()) {
                        continue;
                    }
                    let mutated = update.with_assignment(&local.name, &value)?.to_string();
                    let description = format!(
                        "Change update of edge {index} ({edge}) from '{}' to '{mutated}'",
                        edge.update
                    );
                    let mutant = with_edge(original, index, |e| e.update = mutated);
                    cases.push(MutationTestCase::new(
                        self.class(),
                        original,
                        format!("{index}_{}_{value}", local.name),
                        description,
                        mutant,
                    ));
                }
            }
        }
        Ok(cases)
    }

    fn upper_bound(&self, component: &Component) -> usize {
        let values: usize = component
            .declarations
            .locals
            .iter()
            .map(|local| local.range_size())
            .fold(0, usize::saturating_add);
        unlocked_edges(component).count().saturating_mul(values)
    }

    fn is_upper_bound_exact(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mutation::operators::fixtures::{load, FOUR_BY_FIVE, WITH_COMPLETION};

    mod invert_reset_tests {
        use super::*;

        #[test]
        fn test_two_clocks_three_edges() {
            let original = load(WITH_COMPLETION);
            let cases = InvertResetOperator.generate(&original).unwrap();
            assert_eq!(cases.len(), 6);
            assert_eq!(InvertResetOperator.upper_bound(&original), 6);
        }

        #[test]
        fn test_adds_missing_reset() {
            let original = load(WITH_COMPLETION);
            let cases = InvertResetOperator.generate(&original).unwrap();
            let case = cases.iter().find(|c| c.id == "invert_reset_2_x").unwrap();
            assert_eq!(case.mutant.edges[2].update, "x = 0");
            let case = cases.iter().find(|c| c.id == "invert_reset_0_y").unwrap();
            assert_eq!(case.mutant.edges[0].update, "x = 0, y = 0");
        }

        #[test]
        fn test_removes_existing_reset_keeping_others() {
            let original = load(WITH_COMPLETION);
            let cases = InvertResetOperator.generate(&original).unwrap();
            let case = cases.iter().find(|c| c.id == "invert_reset_1_x").unwrap();
            assert_eq!(case.mutant.edges[1].update, "y := 0");
            let case = cases.iter().find(|c| c.id == "invert_reset_1_y").unwrap();
            assert_eq!(case.mutant.edges[1].update, "x = 0");
        }

        #[test]
        fn test_locked_edge_untouched() {
            let original = load(WITH_COMPLETION);
            let cases = InvertResetOperator.generate(&original).unwrap();
            assert!(cases.iter().all(|c| c.mutant.edges[3] == original.edges[3]));
        }
    }

    mod var_update_tests {
        use super::*;

        #[test]
        fn test_fixture_counts() {
            let original = load(FOUR_BY_FIVE);
            let cases = ChangeVarUpdateOperator.generate(&original).unwrap();
            assert_eq!(cases.len(), 13);
            assert_eq!(ChangeVarUpdateOperator.upper_bound(&original), 15);
        }

        #[test]
        fn test_replaces_existing_assignment() {
            let original = load(FOUR_BY_FIVE);
            let cases = ChangeVarUpdateOperator.generate(&original).unwrap();
            let updates: Vec<_> = cases
                .iter()
                .filter(|c| c.id.starts_with("change_var_update_1_"))
                .map(|c| c.mutant.edges[1].update.as_str())
                .collect();
            assert_eq!(updates, vec!["y = 0, v = 0", "y = 0, v = 1"]);
        }

        #[test]
        fn test_adds_missing_assignment() {
            let original = load(FOUR_BY_FIVE);
            let cases = ChangeVarUpdateOperator.generate(&original).unwrap();
            let case = cases.iter().find(|c| c.id == "change_var_update_2_v_1").unwrap();
            assert_eq!(case.mutant.edges[2].update, "v = 1");
        }

        #[test]
        fn test_malformed_update_is_error() {
            let mut component = Component::from_yaml(FOUR_BY_FIVE).unwrap();
            component.edges[2].update = "v == 1".to_string();
            assert!(ChangeVarUpdateOperator.generate(&Arc::new(component)).is_err());
        }
    }
}
