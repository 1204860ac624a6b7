use super::{unlocked_edges, with_edge};
use crate::model::{Component, Direction};
use crate::mutation::{MutationClass, MutationOperator, MutationTestCase};
use crate::result::TamutResult;
use std::sync::Arc;

/// Relabel every unlocked edge with each other label of `direction`.
fn relabel(
    class: MutationClass,
    original: &Arc<Component>,
    direction: Direction,
) -> Vec<MutationTestCase> {
    let mut cases = Vec::new();
    for (index, edge) in unlocked_edges(original) {
        for label in original.declarations.labels(direction) {
            if edge.direction == direction && edge.sync == *label {
                continue;
            }
            let mutant = with_edge(original, index, |e| {
                e.direction = direction;
                e.sync.clone_from(label);
            });
            cases.push(MutationTestCase::new(
                class,
                original,
                format!("{index}_{label}"),
                format!(
                    "Change action of edge {index} ({edge}) to '{label}{}'",
                    direction.symbol()
                ),
                mutant,
            ));
        }
    }
    cases
}

fn relabel_bound(component: &Component, direction: Direction) -> usize {
    unlocked_edges(component).count() * component.declarations.labels(direction).len()
}

/// Replaces an edge's action with every other declared input.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeActionInputsOperator;

impl MutationOperator for ChangeActionInputsOperator {
    fn class(&self) -> MutationClass {
        MutationClass::ChangeActionInputs
    }

    fn generate(&self, original: &Arc<Component>) -> TamutResult<Vec<MutationTestCase>> {
        Ok(relabel(self.class(), original, Direction::Input))
    }

    fn upper_bound(&self, component: &Component) -> usize {
        relabel_bound(component, Direction::Input)
    }

    fn is_upper_bound_exact(&self) -> bool {
        false
    }
}

/// Replaces an edge's action with every other declared output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeActionOutputsOperator;

impl MutationOperator for ChangeActionOutputsOperator {
    fn class(&self) -> MutationClass {
        MutationClass::ChangeActionOutputs
    }

    fn generate(&self, original: &Arc<Component>) -> TamutResult<Vec<MutationTestCase>> {
        Ok(relabel(self.class(), original, Direction::Output))
    }

    fn upper_bound(&self, component: &Component) -> usize {
        relabel_bound(component, Direction::Output)
    }

    fn is_upper_bound_exact(&self) -> bool {
        false
    }
}
