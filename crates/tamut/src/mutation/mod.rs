//! Mutation operators for timed-automaton components.
//!
//! Every operator clones the original once per mutant and applies exactly one
//! edit. Locked edges (incident to inconsistent or universal locations) are
//! never touched.
//!
//! | Class | Edit |
//! |-------|------|
//! | `change_source` | move an edge's source |
//! | `change_target` | move an edge's target |
//! | `change_guard_op_clocks` | swap the operator of a clock guard part |
//! | `change_guard_op_locals` | swap the operator of a non-clock guard part |
//! | `change_guard_constant` | shift an integer literal in a guard by one |
//! | `invert_reset` | add or remove a clock reset |
//! | `change_invariant` | loosen one invariant part by one |
//! | `change_action_inputs` | relabel an edge with another input |
//! | `change_action_outputs` | relabel an edge with another output |
//! | `change_var_update` | assign a local each value of its range |
//! | `sink_location` | redirect an edge to a fresh input-ignoring sink |

mod operators;
mod score;

pub use operators::{
    ChangeActionInputsOperator, ChangeActionOutputsOperator, ChangeGuardConstantOperator,
    ChangeGuardOpClocksOperator, ChangeGuardOpLocalsOperator, ChangeInvariantOperator,
    ChangeSourceOperator, ChangeTargetOperator, ChangeVarUpdateOperator, InvertResetOperator,
    SinkLocationOperator,
};
pub use score::{calculate_mutation_score, ClassScore, MutantResult, MutationScore};

use crate::model::Component;
use crate::result::TamutResult;
use crate::strategy::NonRefinementStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The mutation operator catalogue.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MutationClass {
    ChangeSource,
    ChangeTarget,
    ChangeGuardOpClocks,
    ChangeGuardOpLocals,
    ChangeGuardConstant,
    InvertReset,
    ChangeInvariant,
    ChangeActionInputs,
    ChangeActionOutputs,
    ChangeVarUpdate,
    SinkLocation,
}

impl MutationClass {
    /// All classes in catalogue order.
    #[must_use]
    pub fn all() -> Vec<Self> {
        vec![
            Self::ChangeSource,
            Self::ChangeTarget,
            Self::ChangeGuardOpClocks,
            Self::ChangeGuardOpLocals,
            Self::ChangeGuardConstant,
            Self::InvertReset,
            Self::ChangeInvariant,
            Self::ChangeActionInputs,
            Self::ChangeActionOutputs,
            Self::ChangeVarUpdate,
            Self::SinkLocation,
        ]
    }

    /// Code used as test-case id prefix and on the command line.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ChangeSource => "change_source",
            Self::ChangeTarget => "change_target",
            Self::ChangeGuardOpClocks => "change_guard_op_clocks",
            Self::ChangeGuardOpLocals => "change_guard_op_locals",
            Self::ChangeGuardConstant => "change_guard_constant",
            Self::InvertReset => "invert_reset",
            Self::ChangeInvariant => "change_invariant",
            Self::ChangeActionInputs => "change_action_inputs",
            Self::ChangeActionOutputs => "change_action_outputs",
            Self::ChangeVarUpdate => "change_var_update",
            Self::SinkLocation => "sink_location",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ChangeSource => "Change the source location of an edge",
            Self::ChangeTarget => "Change the target location of an edge",
            Self::ChangeGuardOpClocks => "Change the operator of a clock guard",
            Self::ChangeGuardOpLocals => "Change the operator of a local-variable guard",
            Self::ChangeGuardConstant => "Increment or decrement a constant in a guard",
            Self::InvertReset => "Add or remove a clock reset",
            Self::ChangeInvariant => "Increment the bound of a location invariant",
            Self::ChangeActionInputs => "Change the action of an edge to another input",
            Self::ChangeActionOutputs => "Change the action of an edge to another output",
            Self::ChangeVarUpdate => "Change the value assigned to a local variable",
            Self::SinkLocation => "Redirect an edge to a sink location ignoring all inputs",
        }
    }

    /// Look up a class by its code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::all().into_iter().find(|class| class.code() == code)
    }

    /// The stateless operator implementing this class.
    #[must_use]
    pub fn operator(self) -> Box<dyn MutationOperator> {
        match self {
            Self::ChangeSource => Box::new(ChangeSourceOperator),
            Self::ChangeTarget => Box::new(ChangeTargetOperator),
            Self::ChangeGuardOpClocks => Box::new(ChangeGuardOpClocksOperator),
            Self::ChangeGuardOpLocals => Box::new(ChangeGuardOpLocalsOperator),
            Self::ChangeGuardConstant => Box::new(ChangeGuardConstantOperator),
            Self::InvertReset => Box::new(InvertResetOperator),
            Self::ChangeInvariant => Box::new(ChangeInvariantOperator),
            Self::ChangeActionInputs => Box::new(ChangeActionInputsOperator),
            Self::ChangeActionOutputs => Box::new(ChangeActionOutputsOperator),
            Self::ChangeVarUpdate => Box::new(ChangeVarUpdateOperator),
            Self::SinkLocation => Box::new(SinkLocationOperator),
        }
    }
}

impl fmt::Display for MutationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A stateless mutation operator.
pub trait MutationOperator: Send + Sync {
    /// Catalogue entry implemented by this operator
    fn class(&self) -> MutationClass;

    /// Produce one test case per single edit, in a deterministic order.
    ///
    /// `original` is never modified.
    ///
    /// # Errors
    /// Returns `MutationTestingError` if a guard, invariant or update of the
    /// component does not match its grammar.
    fn generate(&self, original: &Arc<Component>) -> TamutResult<Vec<MutationTestCase>>;

    /// Upper bound on the number of mutants for `component`
    fn upper_bound(&self, component: &Component) -> usize;

    /// Whether [`upper_bound`](Self::upper_bound) is the exact count
    fn is_upper_bound_exact(&self) -> bool;
}

/// An original component paired with one mutant.
#[derive(Debug, Clone)]
pub struct MutationTestCase {
    /// `{code}_{index}_{discriminator}`
    pub id: String,
    /// Operator that produced the mutant
    pub class: MutationClass,
    /// The single edit performed
    pub description: String,
    /// Unchanged test model, shared between all cases
    pub original: Arc<Component>,
    /// Independent mutated copy
    pub mutant: Component,
    /// Strategy distinguishing the mutant, once synthesized
    pub strategy: Option<NonRefinementStrategy>,
}

impl MutationTestCase {
    pub(crate) fn new(
        class: MutationClass,
        original: &Arc<Component>,
        discriminator: impl fmt::Display,
        description: String,
        mutant: Component,
    ) -> Self {
        Self {
            id: format!("{}_{discriminator}", class.code()),
            class,
            description,
            original: Arc::clone(original),
            mutant,
            strategy: None,
        }
    }

    /// Attach the strategy for this pair
    #[must_use]
    pub fn with_strategy(mut self, strategy: NonRefinementStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// Run the selected operators in catalogue order.
///
/// An operator that fails is logged and skipped; the others still run.
#[must_use]
pub fn generate_all(original: &Arc<Component>, classes: &[MutationClass]) -> Vec<MutationTestCase> {
    let mut cases = Vec::new();
    for class in MutationClass::all()
        .into_iter()
        .filter(|class| classes.contains(class))
    {
        match class.operator().generate(original) {
            Ok(generated) => {
                tracing::info!(
                    operator = class.code(),
                    mutants = generated.len(),
                    "generated mutants"
                );
                cases.extend(generated);
            }
            Err(error) => {
                tracing::warn!(operator = class.code(), %error, "operator skipped");
            }
        }
    }
    cases
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for class in MutationClass::all() {
            assert_eq!(MutationClass::from_code(class.code()), Some(class));
            assert_eq!(class.operator().class(), class);
            assert!(!class.description().is_empty());
        }
        assert_eq!(MutationClass::from_code("nope"), None);
    }

    #[test]
    fn test_all_has_eleven_classes() {
        assert_eq!(MutationClass::all().len(), 11);
    }

    #[test]
    fn test_generate_all_skips_failing_operator() {
        let mut component = Component::from_yaml(operators::fixtures::FOUR_BY_FIVE).unwrap();
        component.edges[0].guard = "x <".to_string();
        let original = Arc::new(component);

        let cases = generate_all(
            &original,
            &[MutationClass::ChangeGuardOpClocks, MutationClass::ChangeTarget],
        );
        assert_eq!(cases.len(), 15);
        assert!(cases.iter().all(|c| c.class == MutationClass::ChangeTarget));
    }

    #[test]
    fn test_generate_all_follows_catalogue_order() {
        let original = Arc::new(Component::from_yaml(operators::fixtures::FOUR_BY_FIVE).unwrap());
        let cases = generate_all(
            &original,
            &[MutationClass::SinkLocation, MutationClass::ChangeSource],
        );
        assert_eq!(cases.first().unwrap().class, MutationClass::ChangeSource);
        assert_eq!(cases.last().unwrap().class, MutationClass::SinkLocation);
    }

    #[test]
    fn test_ids_unique() {
        let original = Arc::new(Component::from_yaml(operators::fixtures::FOUR_BY_FIVE).unwrap());
        let cases = generate_all(&original, &MutationClass::all());
        let mut ids: Vec<_> = cases.iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), cases.len());
    }
}
