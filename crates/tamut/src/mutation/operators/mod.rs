//! Operator implementations, grouped by edit site.

mod action;
mod guard;
mod invariant;
mod structure;
mod update;

pub use action::{ChangeActionInputsOperator, ChangeActionOutputsOperator};
pub use guard::{ChangeGuardConstantOperator, ChangeGuardOpClocksOperator, ChangeGuardOpLocalsOperator};
pub use invariant::ChangeInvariantOperator;
pub use structure::{ChangeSourceOperator, ChangeTargetOperator, SinkLocationOperator};
pub use update::{ChangeVarUpdateOperator, InvertResetOperator};

use crate::expr::mentions;
use crate::model::{Component, Edge};

/// Edges that may be mutated, with their index.
fn unlocked_edges(component: &Component) -> impl Iterator<Item = (usize, &Edge)> {
    component
        .edges
        .iter()
        .enumerate()
        .filter(|(_, edge)| !edge.locked)
}

/// Clone `original` and edit the edge at `index`.
fn with_edge(original: &Component, index: usize, edit: impl FnOnce(&mut Edge)) -> Component {
    let mut mutant = original.clone_for_verification();
    if let Some(edge) = mutant.edges.get_mut(index) {
        edit(edge);
    }
    mutant.refresh_locks();
    mutant
}

/// A guard part is a clock part iff it mentions a declared clock.
fn is_clock_part(component: &Component, part: &str) -> bool {
    component
        .declarations
        .clocks
        .iter()
        .any(|clock| mentions(part, clock))
}
