use crate::expr::{Conjunction, Relation};
use crate::model::Component;
use crate::mutation::{MutationClass, MutationOperator, MutationTestCase};
use crate::result::TamutResult;
use std::sync::Arc;

/// Appends `+ 1` to the right side of one invariant part.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeInvariantOperator;

impl MutationOperator for ChangeInvariantOperator {
    fn class(&self) -> MutationClass {
        MutationClass::ChangeInvariant
    }

    fn generate(&self, original: &Arc<Component>) -> TamutResult<Vec<MutationTestCase>> {
        let mut cases = Vec::new();
        for (index, location) in original.locations.iter().enumerate() {
            if location.kind.is_completion() {
                continue;
            }
            let invariant = Conjunction::parse(&location.invariant)?;
            for (part_index, part) in invariant.parts().iter().enumerate() {
                let relation = Relation::parse(part)?;
                let loosened = relation.with_right(format!("{} + 1", relation.right));
                let mutated = invariant
                    .with_part(part_index, loosened.to_string())
                    .to_string();

                let mut mutant = original.clone_for_verification();
                if let Some(target) = mutant.locations.get_mut(index) {
                    target.invariant.clone_from(&mutated);
                }
                cases.push(MutationTestCase::new(
                    self.class(),
                    original,
                    format!("{index}_{part_index}"),
                    format!(
                        "Change invariant of location '{}' from '{}' to '{mutated}'",
                        location.id, location.invariant
                    ),
                    mutant,
                ));
            }
        }
        Ok(cases)
    }

    fn upper_bound(&self, component: &Component) -> usize {
        component
            .locations
            .iter()
            .filter(|l| !l.kind.is_completion())
            .filter_map(|l| Conjunction::parse(&l.invariant).ok())
            .map(|invariant| invariant.len())
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
    use crate::model::{Location, LocationType};
    use crate::mutation::operators::fixtures::{load, FOUR_BY_FIVE};

    #[test]
    fn test_each_part_loosened() {
        let original = load(FOUR_BY_FIVE);
        let cases = ChangeInvariantOperator.generate(&original).unwrap();
        let invariants: Vec<_> = cases
            .iter()
            .filter(|c| c.id.starts_with("change_invariant_1_"))
            .map(|c| c.mutant.locations[1].invariant.as_str())
            .collect();
        assert_eq!(invariants, vec!["x < 2 + 1 && y <= 3", "x < 2 && y <= 3 + 1"]);
    }

    #[test]
    fn test_count_matches_bound() {
        let original = load(FOUR_BY_FIVE);
        let cases = ChangeInvariantOperator.generate(&original).unwrap();
        assert_eq!(cases.len(), 3);
        assert_eq!(ChangeInvariantOperator.upper_bound(&original), 3);
    }

    #[test]
    fn test_completion_locations_skipped() {
        let mut component = Component::from_yaml(FOUR_BY_FIVE).unwrap();
        component.add_location(
            Location::new("Univ")
                .with_kind(LocationType::Universal)
                .with_invariant("x <= 1"),
        );
        let cases = ChangeInvariantOperator.generate(&Arc::new(component)).unwrap();
        assert_eq!(cases.len(), 3);
    }

    #[test]
    fn test_malformed_invariant_is_error() {
        let mut component = Component::from_yaml(FOUR_BY_FIVE).unwrap();
        component.locations[2].invariant = "x".to_string();
        assert!(ChangeInvariantOperator.generate(&Arc::new(component)).is_err());
    }
}
