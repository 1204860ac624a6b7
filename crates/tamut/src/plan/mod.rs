//! Test plans: run many mutation test cases against a pool of engines.
//!
//! Cases are independent and run on scoped worker threads, one per engine
//! connection. Each case is single-threaded and always reaches exactly one
//! outcome; a [`StopFlag`] is polled between cases only.

mod engine;
mod pool;
mod retry;

pub use engine::{EngineError, FileStrategyEngine, StrategyEngine};
pub use pool::{EngineLease, EnginePool};
pub use retry::RetryConfig;

use crate::config::{EngineConfig, TamutConfig};
use crate::mutation::{calculate_mutation_score, MutantResult, MutationClass, MutationScore, MutationTestCase};
use crate::result::{MutationTestingError, TamutResult};
use crate::strategy::NonRefinementStrategy;
use crate::verdict::{TestResult, VerdictEngine};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Plan-level cancellation, checked between test cases.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that no further case is started
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a test case ended.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaseStatus {
    Completed { result: TestResult },
    Errored { message: String },
}

/// The single outcome of one test case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseOutcome {
    pub case_id: String,
    pub class: MutationClass,
    #[serde(flatten)]
    pub status: CaseStatus,
}

impl CaseOutcome {
    #[must_use]
    pub const fn result(&self) -> Option<&TestResult> {
        match &self.status {
            CaseStatus::Completed { result } => Some(result),
            CaseStatus::Errored { .. } => None,
        }
    }
}

/// Aggregated plan results.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    /// Outcomes in test-case order
    pub outcomes: Vec<CaseOutcome>,
    /// Score over completed cases
    pub score: MutationScore,
    /// Cases that ended with an error
    pub errors: usize,
    /// Cases never started because the plan was stopped
    pub skipped: usize,
    pub stopped: bool,
    pub duration_ms: u64,
}

impl PlanReport {
    fn new(outcomes: Vec<CaseOutcome>, total: usize, stopped: bool, started: Instant) -> Self {
        let results: Vec<MutantResult> = outcomes
            .iter()
            .filter_map(|outcome| {
                outcome.result().map(|result| MutantResult {
                    mutant_id: outcome.case_id.clone(),
                    class: outcome.class,
                    verdict: result.verdict,
                })
            })
            .collect();
        Self {
            score: calculate_mutation_score(&results),
            errors: outcomes.len() - results.len(),
            skipped: total - outcomes.len(),
            stopped,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            outcomes,
        }
    }
}

/// A batch of test cases with shared verdict and engine settings.
#[derive(Debug)]
pub struct TestPlan {
    cases: Vec<MutationTestCase>,
    verdict: VerdictEngine,
    engine: EngineConfig,
    stop: StopFlag,
}

impl TestPlan {
    #[must_use]
    pub fn new(cases: Vec<MutationTestCase>, verdict: VerdictEngine, engine: EngineConfig) -> Self {
        Self {
            cases,
            verdict,
            engine,
            stop: StopFlag::new(),
        }
    }

    /// Plan using the verdict and engine sections of `config`
    #[must_use]
    pub fn from_config(cases: Vec<MutationTestCase>, config: &TamutConfig) -> Self {
        Self::new(
            cases,
            VerdictEngine::new(config.verdict.clone()),
            config.engine.clone(),
        )
    }

    /// Handle for stopping the plan from another thread
    #[must_use]
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    #[must_use]
    pub fn cases(&self) -> &[MutationTestCase] {
        &self.cases
    }

    /// Run every case.
    pub fn run(&self, pool: &EnginePool) -> PlanReport {
        self.run_with_progress(pool, |_| {})
    }

    /// Run every case, calling `on_outcome` as each one finishes.
    pub fn run_with_progress(
        &self,
        pool: &EnginePool,
        on_outcome: impl Fn(&CaseOutcome) + Sync,
    ) -> PlanReport {
        let started = Instant::now();
        let next = AtomicUsize::new(0);
        let finished = Mutex::new(Vec::with_capacity(self.cases.len()));
        let workers = pool.capacity().min(self.cases.len()).max(1);
        tracing::info!(cases = self.cases.len(), workers, "running test plan");

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    if self.stop.is_stopped() {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(case) = self.cases.get(index) else {
                        break;
                    };
                    let outcome = self.run_case(case, pool);
                    on_outcome(&outcome);
                    if let Ok(mut finished) = finished.lock() {
                        finished.push((index, outcome));
                    }
                });
            }
        });

        let mut finished = finished.into_inner().unwrap_or_default();
        finished.sort_by_key(|(index, _)| *index);
        let outcomes = finished.into_iter().map(|(_, outcome)| outcome).collect();
        let report = PlanReport::new(outcomes, self.cases.len(), self.stop.is_stopped(), started);
        tracing::info!(
            killed = report.score.killed,
            survived = report.score.survived,
            errors = report.errors,
            "test plan finished"
        );
        report
    }

    fn run_case(&self, case: &MutationTestCase, pool: &EnginePool) -> CaseOutcome {
        let status = match self.execute(case, pool) {
            Ok(result) => CaseStatus::Completed { result },
            Err(error) => {
                tracing::warn!(case = %case.id, %error, "test case aborted");
                CaseStatus::Errored {
                    message: error.to_string(),
                }
            }
        };
        CaseOutcome {
            case_id: case.id.clone(),
            class: case.class,
            status,
        }
    }

    fn execute(&self, case: &MutationTestCase, pool: &EnginePool) -> TamutResult<TestResult> {
        if let Some(strategy) = &case.strategy {
            return self.verdict.run_with(case, strategy);
        }
        let strategy = self.synthesize(case, pool)?;
        self.verdict.run_with(case, &strategy)
    }

    /// Obtain and parse the strategy for `case`, retrying engine failures.
    fn synthesize(
        &self,
        case: &MutationTestCase,
        pool: &EnginePool,
    ) -> TamutResult<NonRefinementStrategy> {
        let engine_error = |error: EngineError| MutationTestingError::Engine {
            case_id: case.id.clone(),
            message: error.to_string(),
        };

        let mut lease = pool
            .acquire(self.engine.acquire_timeout())
            .map_err(engine_error)?;
        let timeout = self.engine.call_timeout();
        let text = self
            .engine
            .retry
            .run(|_| {
                let called = Instant::now();
                let text = lease.synthesize(case)?;
                if called.elapsed() > timeout {
                    return Err(EngineError::Timeout {
                        case_id: case.id.clone(),
                        timeout_ms: self.engine.call_timeout_ms,
                    });
                }
                Ok(text)
            })
            .map_err(engine_error)?;
        drop(lease);

        text.parse()
    }
}
