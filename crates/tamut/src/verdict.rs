//! Verdict engine: replays a strategy against the test model and a mutant.
//!
//! The mutant plays the system under test. At each step the strategy picks a
//! rule for the current pair of states:
//! - no rule: INCONCLUSIVE
//! - delay: both simulations advance by the configured step; a rejected
//!   delay is a FAIL
//! - action: the mutant must produce the rule's action, then the test model
//!   follows; a mismatch is a FAIL
//!
//! Reaching the step budget without deviation is a PASS.

use crate::mutation::MutationTestCase;
use crate::result::{MutationTestingError, TamutResult};
use crate::simulation::{ComponentSimulation, SimulationError, SimulationSnapshot, TieBreak};
use crate::strategy::{ActionRule, NonRefinementStrategy, StrategyRule};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason reported when the strategy has no rule for the observed state.
pub const REASON_UNCOVERED: &str = "strategy does not cover observed state";
/// Reason reported when a delay is rejected by either simulation.
pub const REASON_DELAY: &str = "unexpected deviation during delay";
/// Prefix of the reason reported when the mutant's action deviates.
pub const REASON_ACTION: &str = "observed action differs from expected action";
/// Reason reported when the step budget is exhausted.
pub const REASON_BUDGET: &str = "no deviation within step budget";

/// Outcome of replaying one test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Inconclusive,
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inconclusive => write!(f, "INCONCLUSIVE"),
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// Replay settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictConfig {
    /// Maximum number of strategy steps
    pub max_steps: usize,
    /// Time advanced for a delay rule
    pub delay_step: f64,
    /// Edge, state and rule selection policy
    pub tie_break: TieBreak,
    /// Process name of the test model in strategies
    pub test_process: String,
    /// Process name of the mutant in strategies
    pub mutant_process: String,
}

impl Default for VerdictConfig {
    fn default() -> Self {
        Self {
            max_steps: 100,
            delay_step: 1.0,
            tie_break: TieBreak::FirstDeclared,
            test_process: "S".to_string(),
            mutant_process: "M".to_string(),
        }
    }
}

impl VerdictConfig {
    #[must_use]
    pub const fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    #[must_use]
    pub const fn with_delay_step(mut self, delay_step: f64) -> Self {
        self.delay_step = delay_step;
        self
    }

    #[must_use]
    pub const fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }
}

/// Verdict, reason, final states and test-model trace of one replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub id: String,
    pub verdict: Verdict,
    pub reason: String,
    /// Strategy steps taken
    pub steps: usize,
    pub test_model: SimulationSnapshot,
    pub mutant: SimulationSnapshot,
    /// Test-model locations visited, initial first
    pub trace: Vec<String>,
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Id: {}", self.id)?;
        writeln!(f, "Reason: {}", self.reason)?;
        writeln!(
            f,
            "Test model is in location: {} with values: {}",
            self.test_model.location, self.test_model
        )?;
        writeln!(
            f,
            "Mutant is in location: {} with values: {}",
            self.mutant.location, self.mutant
        )?;
        write!(f, "Trace: {}", self.trace.join(" -> "))
    }
}

/// Non-fatal simulation errors are deviations; fatal ones abort the case.
fn deviation(error: SimulationError) -> TamutResult<SimulationError> {
    if error.is_fatal() {
        Err(error.into())
    } else {
        Ok(error)
    }
}

/// Drives the paired simulations for test cases.
#[derive(Debug, Clone, Default)]
pub struct VerdictEngine {
    config: VerdictConfig,
}

impl VerdictEngine {
    #[must_use]
    pub const fn new(config: VerdictConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &VerdictConfig {
        &self.config
    }

    /// Replay the strategy attached to `case`.
    ///
    /// # Errors
    /// Returns `InvariantViolated` if no strategy is attached, or any fatal
    /// simulation or expression error.
    pub fn run(&self, case: &MutationTestCase) -> TamutResult<TestResult> {
        let strategy = case.strategy.as_ref().ok_or_else(|| {
            MutationTestingError::invariant(format!("test case '{}' has no strategy", case.id))
        })?;
        self.run_with(case, strategy)
    }

    /// Replay `strategy` against the pair in `case`.
    pub fn run_with(
        &self,
        case: &MutationTestCase,
        strategy: &NonRefinementStrategy,
    ) -> TamutResult<TestResult> {
        let config = &self.config;
        let mut test = ComponentSimulation::new(&case.original, config.test_process.as_str())?
            .with_tie_break(config.tie_break);
        let mut mutant = ComponentSimulation::new(&case.mutant, config.mutant_process.as_str())?
            .with_tie_break(config.tie_break);

        let mut steps = 0;
        let (verdict, reason) = loop {
            if steps >= config.max_steps {
                break (Verdict::Pass, REASON_BUDGET.to_string());
            }
            let Some(rule) = strategy.get_rule(&test, &mutant, config.tie_break)? else {
                break (Verdict::Inconclusive, REASON_UNCOVERED.to_string());
            };
            steps += 1;

            match rule {
                StrategyRule::Delay { .. } => {
                    if let Err(error) = test.delay(config.delay_step) {
                        let error = deviation(error)?;
                        tracing::debug!(%error, "test model rejected delay");
                        break (Verdict::Fail, REASON_DELAY.to_string());
                    }
                    if let Err(error) = mutant.delay(config.delay_step) {
                        let error = deviation(error)?;
                        tracing::debug!(%error, "mutant rejected delay");
                        break (Verdict::Fail, REASON_DELAY.to_string());
                    }
                }
                StrategyRule::Action(rule) => {
                    if let Some(reason) = self.action_step(rule, &mut test, &mut mutant)? {
                        break reason;
                    }
                }
            }
        };

        let result = TestResult {
            id: case.id.clone(),
            verdict,
            reason,
            steps,
            test_model: test.snapshot(),
            mutant: mutant.snapshot(),
            trace: test
                .location_trace()
                .into_iter()
                .map(str::to_string)
                .collect(),
        };
        tracing::info!(id = %result.id, verdict = %result.verdict, steps, "verdict");
        Ok(result)
    }

    /// Returns a terminal verdict, or `None` to continue.
    fn action_step(
        &self,
        rule: &ActionRule,
        test: &mut ComponentSimulation<'_>,
        mutant: &mut ComponentSimulation<'_>,
    ) -> TamutResult<Option<(Verdict, String)>> {
        let mutant_acts = rule.process == self.config.mutant_process;
        let expected = match &rule.sync {
            Some(sync) => Some(sync.clone()),
            None => {
                let acting = if mutant_acts { &*mutant } else { &*test };
                acting
                    .peek_rule(rule)?
                    .map(|edge| (edge.sync.clone(), edge.direction))
            }
        };
        let Some((label, direction)) = expected else {
            if !mutant_acts {
                return Ok(Some((Verdict::Inconclusive, REASON_UNCOVERED.to_string())));
            }
            // The mutant cannot take the transition at all; name the action
            // the test model would have produced there.
            let action = test
                .peek_rule(rule)?
                .map_or_else(|| "transition".to_string(), |edge| {
                    format!("{}{}", edge.sync, edge.direction.symbol())
                });
            tracing::debug!(destination = %rule.destination, "mutant has no edge for rule");
            return Ok(Some(action_differs(&action, rule, test, mutant)));
        };
        let action = format!("{label}{}", direction.symbol());

        let observed = if mutant_acts {
            mutant.fire_rule(rule)
        } else {
            mutant.fire(direction, &label)
        };
        if let Err(error) = observed {
            let error = deviation(error)?;
            tracing::debug!(%error, "mutant could not act");
            return Ok(Some(action_differs(&action, rule, test, mutant)));
        }

        let followed = if mutant_acts {
            test.fire(direction, &label)
        } else {
            test.fire_rule(rule)
        };
        if let Err(error) = followed {
            let error = deviation(error)?;
            tracing::debug!(%error, "test model could not follow");
            return Ok(Some(action_differs(&action, rule, test, mutant)));
        }
        Ok(None)
    }
}

fn action_differs(
    action: &str,
    rule: &ActionRule,
    test: &ComponentSimulation<'_>,
    mutant: &ComponentSimulation<'_>,
) -> (Verdict, String) {
    (
        Verdict::Fail,
        format!(
            "{REASON_ACTION}: expected {action} towards '{}', test model in '{}', mutant in '{}'",
            rule.destination,
            test.location(),
            mutant.location()
        ),
    )
}
