//! Operators that rewire edges between locations.

use super::{unlocked_edges, with_edge};
use crate::model::{Component, Direction, Edge, Location};
use crate::mutation::{MutationClass, MutationOperator, MutationTestCase};
use crate::result::TamutResult;
use std::sync::Arc;

/// Moves an edge's source to each other non-completion location.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeSourceOperator;

impl MutationOperator for ChangeSourceOperator {
    fn class(&self) -> MutationClass {
        MutationClass::ChangeSource
    }

    fn generate(&self, original: &Arc<Component>) -> TamutResult<Vec<MutationTestCase>> {
        let mut cases = Vec::new();
        for (index, edge) in unlocked_edges(original) {
            for location in &original.locations {
                if location.kind.is_completion() || location.id == edge.source {
                    continue;
                }
                let mutant = with_edge(original, index, |e| e.source.clone_from(&location.id));
                cases.push(MutationTestCase::new(
                    self.class(),
                    original,
                    format!("{index}_{}", location.id),
                    format!(
                        "Change source of edge {index} ({edge}) from '{}' to '{}'",
                        edge.source, location.id
                    ),
                    mutant,
                ));
            }
        }
        Ok(cases)
    }

    fn upper_bound(&self, component: &Component) -> usize {
        let sources = component
            .locations
            .iter()
            .filter(|l| !l.kind.is_completion())
            .count();
        unlocked_edges(component).count() * sources.saturating_sub(1)
    }

    fn is_upper_bound_exact(&self) -> bool {
        true
    }
}

/// Moves an edge's target to each other location.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeTargetOperator;

impl MutationOperator for ChangeTargetOperator {
    fn class(&self) -> MutationClass {
        MutationClass::ChangeTarget
    }

    fn generate(&self, original: &Arc<Component>) -> TamutResult<Vec<MutationTestCase>> {
        let mut cases = Vec::new();
        for (index, edge) in unlocked_edges(original) {
            for location in &original.locations {
                if location.id == edge.target {
                    continue;
                }
                let mutant = with_edge(original, index, |e| e.target.clone_from(&location.id));
                cases.push(MutationTestCase::new(
                    self.class(),
                    original,
                    format!("{index}_{}", location.id),
                    format!(
                        "Change target of edge {index} ({edge}) from '{}' to '{}'",
                        edge.target, location.id
                    ),
                    mutant,
                ));
            }
        }
        Ok(cases)
    }

    fn upper_bound(&self, component: &Component) -> usize {
        unlocked_edges(component).count() * component.locations.len().saturating_sub(1)
    }

    fn is_upper_bound_exact(&self) -> bool {
        true
    }
}

/// Redirects an edge to a fresh location that self-loops on every input.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinkLocationOperator;

impl MutationOperator for SinkLocationOperator {
    fn class(&self) -> MutationClass {
        MutationClass::SinkLocation
    }

    fn generate(&self, original: &Arc<Component>) -> TamutResult<Vec<MutationTestCase>> {
        let mut cases = Vec::new();
        for (index, edge) in unlocked_edges(original) {
            let mut mutant = original.clone_for_verification();
            let sink = mutant.fresh_location_id("Sink");
            mutant.add_location(Location::new(sink.clone()));
            for label in &original.declarations.inputs {
                mutant.add_edge(Edge::new(
                    sink.clone(),
                    sink.clone(),
                    Direction::Input,
                    label.clone(),
                ));
            }
            if let Some(redirected) = mutant.edges.get_mut(index) {
                redirected.target.clone_from(&sink);
            }
            mutant.refresh_locks();

            cases.push(MutationTestCase::new(
                self.class(),
                original,
                format!("{index}_{sink}"),
                format!("Redirect edge {index} ({edge}) to sink location '{sink}'"),
                mutant,
            ));
        }
        Ok(cases)
    }

    fn upper_bound(&self, component: &Component) -> usize {
        unlocked_edges(component).count()
    }

    fn is_upper_bound_exact(&self) -> bool {
        true
    }
}
