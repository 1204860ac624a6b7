//! Tamut: mutation testing for timed-automaton components.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐    ┌────────────┐    ┌────────────┐    ┌────────────┐
//! │ Component  │───►│ Mutation   │───►│ Strategy   │───►│ Verdict    │
//! │ (YAML)     │    │ Operators  │    │ Engine     │    │ Engine     │
//! └────────────┘    └────────────┘    └────────────┘    └────────────┘
//!                     test cases       non-refinement    PASS / FAIL /
//!                                      strategies        INCONCLUSIVE
//! ```
//!
//! A [`Component`] is mutated by each selected [`MutationClass`] into
//! [`MutationTestCase`]s. A strategy engine synthesizes a
//! [`NonRefinementStrategy`] for every case, and the [`VerdictEngine`]
//! replays it against the test model and the mutant in lock-step.

// Allow large stack frames in tests (fixtures built inline)
#![cfg_attr(test, allow(clippy::large_stack_frames))]

/// Configuration file sections
pub mod config;

/// Guard, invariant and update expressions
pub mod expr;

pub mod model;

/// Mutation operators and scoring
pub mod mutation;

/// Parallel test plans over a pool of strategy engines
pub mod plan;

mod result;

/// Discrete simulation of a single component
pub mod simulation;

/// Non-refinement strategies
pub mod strategy;

pub mod verdict;

pub use config::{EngineConfig, TamutConfig};
pub use model::{Component, Direction, Edge, Location, LocationType, ModelError};
pub use mutation::{
    calculate_mutation_score, generate_all, MutationClass, MutationOperator, MutationScore,
    MutationTestCase,
};
pub use plan::{
    CaseOutcome, CaseStatus, EngineError, EnginePool, FileStrategyEngine, PlanReport,
    RetryConfig, StopFlag, StrategyEngine, TestPlan,
};
pub use result::{MutationTestingError, TamutResult};
pub use simulation::{ComponentSimulation, SimulationError, SimulationSnapshot, TieBreak};
pub use strategy::{ActionRule, NonRefinementStrategy, StrategyRule, StrategyState};
pub use verdict::{TestResult, Verdict, VerdictConfig, VerdictEngine};
