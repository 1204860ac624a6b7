//! Timed-automaton interpreter.
//!
//! A [`ComponentSimulation`] holds the current location, clock and local
//! valuations of one running component. Time advances uniformly for every
//! clock with [`ComponentSimulation::delay`]; edges fire with
//! [`ComponentSimulation::fire`] or [`ComponentSimulation::fire_rule`].
//!
//! # Example
//!
//! ```ignore
//! let mut sim = ComponentSimulation::new(&component, "S")?;
//! sim.delay(1.2)?;
//! sim.fire(Direction::Input, "coin")?;
//! assert_eq!(sim.clock("y"), Some(0.0));
//! ```

use crate::expr::{eval_guard, Update, Valuation};
use crate::model::{Component, Direction, Edge};
use crate::result::MutationTestingError;
use crate::strategy::ActionRule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which candidate wins when several edges or strategy entries qualify.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The first in declaration or parse order
    #[default]
    FirstDeclared,
    /// The last in declaration or parse order
    LastDeclared,
}

impl TieBreak {
    /// Pick one item according to this policy
    pub fn pick<I: Iterator>(self, mut candidates: I) -> Option<I::Item> {
        match self {
            Self::FirstDeclared => candidates.next(),
            Self::LastDeclared => candidates.last(),
        }
    }
}

/// Outcome of a rejected simulation step.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("{process}: invariant '{invariant}' of location '{location}' violated")]
    InvariantViolation {
        process: String,
        location: String,
        invariant: String,
    },

    #[error("{process}: no enabled edge for {action} in location '{location}'")]
    NoMatchingEdge {
        process: String,
        location: String,
        action: String,
    },

    #[error("{process}: value {value} out of bounds for '{variable}'")]
    BoundViolation {
        process: String,
        variable: String,
        value: i64,
    },

    #[error("{process}: malformed model: {message}")]
    MalformedModel { process: String, message: String },

    #[error(transparent)]
    Expression(#[from] MutationTestingError),
}

impl SimulationError {
    /// Fatal errors indicate a broken model rather than a behavioural deviation
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::MalformedModel { .. } | Self::Expression(_))
    }
}

impl From<SimulationError> for MutationTestingError {
    fn from(error: SimulationError) -> Self {
        match error {
            SimulationError::Expression(inner) => inner,
            SimulationError::InvariantViolation { ref process, .. }
            | SimulationError::NoMatchingEdge { ref process, .. }
            | SimulationError::BoundViolation { ref process, .. }
            | SimulationError::MalformedModel { ref process, .. } => Self::Simulation {
                process: process.clone(),
                message: error.to_string(),
            },
        }
    }
}

/// One committed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEntry {
    Delay {
        location: String,
        amount: f64,
    },
    Action {
        source: String,
        target: String,
        action: String,
    },
}

/// Location and valuations at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSnapshot {
    pub location: String,
    pub clocks: BTreeMap<String, f64>,
    pub locals: BTreeMap<String, i64>,
}

impl fmt::Display for SimulationSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self
            .clocks
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .chain(
                self.locals
                    .iter()
                    .map(|(name, value)| format!("{name}={value}")),
            )
            .collect();
        write!(f, "{{{}}}", values.join(", "))
    }
}

/// A running instance of one component.
#[derive(Debug, Clone)]
pub struct ComponentSimulation<'a> {
    component: &'a Component,
    process: String,
    location: String,
    clocks: BTreeMap<String, f64>,
    locals: BTreeMap<String, i64>,
    trace: Vec<TraceEntry>,
    initial: String,
    tie_break: TieBreak,
}

impl<'a> ComponentSimulation<'a> {
    /// Start at the initial location with every clock at zero.
    ///
    /// # Errors
    /// Returns `MalformedModel` if there is no initial location or its
    /// invariant does not hold at time zero.
    pub fn new(component: &'a Component, process: impl Into<String>) -> Result<Self, SimulationError> {
        let process = process.into();
        let initial = component
            .initial_location()
            .ok_or_else(|| SimulationError::MalformedModel {
                process: process.clone(),
                message: "no initial location".to_string(),
            })?;

        let simulation = Self {
            component,
            location: initial.id.clone(),
            initial: initial.id.clone(),
            clocks: component
                .declarations
                .clocks
                .iter()
                .map(|clock| (clock.clone(), 0.0))
                .collect(),
            locals: component
                .declarations
                .locals
                .iter()
                .map(|local| (local.name.clone(), local.initial))
                .collect(),
            trace: Vec::new(),
            tie_break: TieBreak::default(),
            process,
        };

        if !simulation.invariant_holds(&initial.invariant, &simulation.valuation())? {
            return Err(SimulationError::MalformedModel {
                process: simulation.process,
                message: format!(
                    "initial invariant '{}' of '{}' violated",
                    initial.invariant, initial.id
                ),
            });
        }
        Ok(simulation)
    }

    /// Set the edge selection policy
    #[must_use]
    pub const fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn component(&self) -> &'a Component {
        self.component
    }

    pub fn process(&self) -> &str {
        &self.process
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn clock(&self, name: &str) -> Option<f64> {
        self.clocks.get(name).copied()
    }

    pub fn local(&self, name: &str) -> Option<i64> {
        self.locals.get(name).copied()
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// The initial location followed by every action target.
    pub fn location_trace(&self) -> Vec<&str> {
        std::iter::once(self.initial.as_str())
            .chain(self.trace.iter().filter_map(|entry| match entry {
                TraceEntry::Action { target, .. } => Some(target.as_str()),
                TraceEntry::Delay { .. } => None,
            }))
            .collect()
    }

    /// `Process.Location`
    pub fn qualified_location(&self) -> String {
        format!("{}.{}", self.process, self.location)
    }

    /// `Process.var=value` for every local, in name order.
    pub fn local_equalities(&self) -> Vec<String> {
        self.locals
            .iter()
            .map(|(name, value)| format!("{}.{name}={value}", self.process))
            .collect()
    }

    /// Unqualified clocks and locals.
    pub fn valuation(&self) -> Valuation {
        Self::valuation_of(&self.clocks, &self.locals)
    }

    /// Clocks and locals qualified with the process name.
    pub fn qualified_valuation(&self) -> Valuation {
        self.valuation()
            .iter()
            .map(|(name, value)| (format!("{}.{name}", self.process), value))
            .collect()
    }

    #[allow(clippy::cast_precision_loss)]
    fn valuation_of(clocks: &BTreeMap<String, f64>, locals: &BTreeMap<String, i64>) -> Valuation {
        clocks
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .chain(locals.iter().map(|(name, value)| (name.clone(), *value as f64)))
            .collect()
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            location: self.location.clone(),
            clocks: self.clocks.clone(),
            locals: self.locals.clone(),
        }
    }

    fn invariant_holds(&self, invariant: &str, valuation: &Valuation) -> Result<bool, SimulationError> {
        Ok(eval_guard(invariant, valuation)?)
    }

    fn current_invariant(&self) -> &'a str {
        self.component
            .location(&self.location)
            .map_or("", |location| location.invariant.as_str())
    }

    /// Advance every clock by `amount`, atomically.
    ///
    /// # Errors
    /// Returns `InvariantViolation` and leaves the state untouched if the
    /// current location's invariant would not hold afterwards.
    pub fn delay(&mut self, amount: f64) -> Result<(), SimulationError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(SimulationError::MalformedModel {
                process: self.process.clone(),
                message: format!("invalid delay {amount}"),
            });
        }

        let clocks: BTreeMap<String, f64> = self
            .clocks
            .iter()
            .map(|(name, value)| (name.clone(), value + amount))
            .collect();
        let invariant = self.current_invariant();
        if !self.invariant_holds(invariant, &Self::valuation_of(&clocks, &self.locals))? {
            return Err(SimulationError::InvariantViolation {
                process: self.process.clone(),
                location: self.location.clone(),
                invariant: invariant.to_string(),
            });
        }

        tracing::debug!(process = %self.process, location = %self.location, amount, "delay");
        self.clocks = clocks;
        self.trace.push(TraceEntry::Delay {
            location: self.location.clone(),
            amount,
        });
        Ok(())
    }

    fn guard_holds(&self, edge: &Edge) -> Result<bool, SimulationError> {
        Ok(eval_guard(&edge.guard, &self.valuation())?)
    }

    /// Select among enabled outgoing edges that satisfy `matches`.
    fn select(
        &self,
        matches: impl Fn(&Edge) -> Result<bool, SimulationError>,
    ) -> Result<Option<&'a Edge>, SimulationError> {
        let component: &'a Component = self.component;
        let mut enabled = Vec::new();
        for edge in component.edges.iter().filter(|e| e.source == self.location) {
            if matches(edge)? && self.guard_holds(edge)? {
                enabled.push(edge);
            }
        }
        Ok(self.tie_break.pick(enabled.into_iter()))
    }

    /// The edge [`fire`](Self::fire) would take, without taking it.
    pub fn enabled_edge(&self, direction: Direction, label: &str) -> Result<Option<&'a Edge>, SimulationError> {
        self.select(|edge| Ok(edge.direction == direction && edge.sync == label))
    }

    /// Fire an enabled edge with the given action.
    ///
    /// # Errors
    /// Returns `NoMatchingEdge` if no outgoing edge with this action has a
    /// satisfied guard.
    pub fn fire(&mut self, direction: Direction, label: &str) -> Result<&'a Edge, SimulationError> {
        let edge = self
            .enabled_edge(direction, label)?
            .ok_or_else(|| SimulationError::NoMatchingEdge {
                process: self.process.clone(),
                location: self.location.clone(),
                action: format!("{label}{}", direction.symbol()),
            })?;
        self.take(edge)?;
        Ok(edge)
    }

    /// The edge [`fire_rule`](Self::fire_rule) would take, without taking it.
    pub fn peek_rule(&self, rule: &ActionRule) -> Result<Option<&'a Edge>, SimulationError> {
        let required = Update::parse(&rule.unqualified_update())?;
        self.select(|edge| {
            if edge.target != rule.destination {
                return Ok(false);
            }
            if let Some((label, direction)) = &rule.sync {
                if edge.sync != *label || edge.direction != *direction {
                    return Ok(false);
                }
            }
            let update = Update::parse(&edge.update)?;
            Ok(required.assignments().iter().all(|wanted| {
                update.assignments().iter().any(|a| {
                    a.target == wanted.target && normalize(&a.value) == normalize(&wanted.value)
                })
            }))
        })
    }

    /// Fire the edge selected by a strategy action rule.
    ///
    /// # Errors
    /// Returns `NoMatchingEdge` if no enabled edge matches the rule.
    pub fn fire_rule(&mut self, rule: &ActionRule) -> Result<&'a Edge, SimulationError> {
        let edge = self
            .peek_rule(rule)?
            .ok_or_else(|| SimulationError::NoMatchingEdge {
                process: self.process.clone(),
                location: self.location.clone(),
                action: format!("transition to '{}'", rule.destination),
            })?;
        self.take(edge)?;
        Ok(edge)
    }

    /// Apply the update of `edge` and move to its target.
    fn take(&mut self, edge: &Edge) -> Result<(), SimulationError> {
        let assignments = Update::parse(&edge.update)?.evaluate(&self.valuation())?;

        let mut clocks = self.clocks.clone();
        let mut locals = self.locals.clone();
        for (target, value) in assignments {
            if self.component.is_clock(&target) {
                clocks.insert(target, value);
            } else if let Some(declared) = self.component.local(&target) {
                #[allow(clippy::cast_possible_truncation)]
                let value = value.trunc() as i64;
                if !declared.contains(value) {
                    return Err(SimulationError::BoundViolation {
                        process: self.process.clone(),
                        variable: target,
                        value,
                    });
                }
                locals.insert(target, value);
            } else {
                return Err(SimulationError::MalformedModel {
                    process: self.process.clone(),
                    message: format!("assignment to undeclared variable '{target}'"),
                });
            }
        }

        let invariant = self
            .component
            .location(&edge.target)
            .map(|location| location.invariant.as_str())
            .ok_or_else(|| SimulationError::MalformedModel {
                process: self.process.clone(),
                message: format!("edge targets unknown location '{}'", edge.target),
            })?;
        if !self.invariant_holds(invariant, &Self::valuation_of(&clocks, &locals))? {
            return Err(SimulationError::InvariantViolation {
                process: self.process.clone(),
                location: edge.target.clone(),
                invariant: invariant.to_string(),
            });
        }

        tracing::debug!(process = %self.process, edge = %edge, "fire");
        self.clocks = clocks;
        self.locals = locals;
        self.location.clone_from(&edge.target);
        self.trace.push(TraceEntry::Action {
            source: edge.source.clone(),
            target: edge.target.clone(),
            action: edge.sync_text(),
        });
        Ok(())
    }
}

fn normalize(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    const MACHINE: &str = r#"
name: "Machine"
declarations:
  clocks: ["x", "y"]
  locals:
    - name: "cups"
      lower: 0
      upper: 2
  inputs: ["coin", "push"]
  outputs: ["cof"]
locations:
  - id: "Idle"
    kind: initial
  - id: "Paid"
    invariant: "x <= 4"
  - id: "Done"
edges:
  - source: "Idle"
    target: "Paid"
    direction: input
    sync: "coin"
    update: "x = 0"
  - source: "Paid"
    target: "Done"
    direction: output
    sync: "cof"
    guard: "x >= 2 && cups < 2"
    update: "cups = cups + 1"
  - source: "Paid"
    target: "Idle"
    direction: input
    sync: "push"
    guard: "x < 2"
  - source: "Paid"
    target: "Done"
    direction: input
    sync: "push"
  - source: "Done"
    target: "Idle"
    direction: output
    sync: "cof"
    update: "cups = cups + 5"
"#;

    fn machine() -> Component {
        Component::from_yaml(MACHINE).unwrap()
    }

    fn rule(destination: &str, sync: Option<(&str, Direction)>, update: &str) -> ActionRule {
        ActionRule {
            condition: "1".to_string(),
            process: "S".to_string(),
            destination: destination.to_string(),
            sync: sync.map(|(label, direction)| (label.to_string(), direction)),
            update: update.to_string(),
        }
    }

    #[test]
    fn test_initial_state() {
        let component = machine();
        let sim = ComponentSimulation::new(&component, "S").unwrap();
        assert_eq!(sim.location(), "Idle");
        assert_eq!(sim.clock("x"), Some(0.0));
        assert_eq!(sim.local("cups"), Some(0));
        assert_eq!(sim.qualified_location(), "S.Idle");
        assert_eq!(sim.local_equalities(), vec!["S.cups=0"]);
    }

    #[test]
    fn test_initial_invariant_violation_is_fatal() {
        let mut component = machine();
        component.locations[0].invariant = "x > 1".to_string();
        let err = ComponentSimulation::new(&component, "S").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_reset_after_delay_is_exact_zero() {
        let component = machine();
        let mut sim = ComponentSimulation::new(&component, "S").unwrap();
        sim.delay(1.2).unwrap();
        assert_eq!(sim.clock("x"), Some(1.2));
        sim.fire(Direction::Input, "coin").unwrap();
        assert_eq!(sim.clock("x"), Some(0.0));
        assert_eq!(sim.clock("y"), Some(1.2));
    }

    #[test]
    fn test_delay_rejected_atomically() {
        let component = machine();
        let mut sim = ComponentSimulation::new(&component, "S").unwrap();
        sim.fire(Direction::Input, "coin").unwrap();
        sim.delay(3.0).unwrap();
        let err = sim.delay(1.5).unwrap_err();
        assert!(matches!(err, SimulationError::InvariantViolation { .. }));
        assert!(!err.is_fatal());
        assert_eq!(sim.clock("x"), Some(3.0));
        assert_eq!(sim.trace().len(), 2);
    }

    #[test]
    fn test_guard_blocks_fire() {
        let component = machine();
        let mut sim = ComponentSimulation::new(&component, "S").unwrap();
        sim.fire(Direction::Input, "coin").unwrap();
        let err = sim.fire(Direction::Output, "cof").unwrap_err();
        assert!(matches!(err, SimulationError::NoMatchingEdge { .. }));
        assert_eq!(sim.location(), "Paid");
    }

    #[test]
    fn test_update_applies_to_locals() {
        let component = machine();
        let mut sim = ComponentSimulation::new(&component, "S").unwrap();
        sim.fire(Direction::Input, "coin").unwrap();
        sim.delay(2.5).unwrap();
        sim.fire(Direction::Output, "cof").unwrap();
        assert_eq!(sim.local("cups"), Some(1));
        assert_eq!(sim.location_trace(), vec!["Idle", "Paid", "Done"]);
    }

    #[test]
    fn test_bound_violation() {
        let component = machine();
        let mut sim = ComponentSimulation::new(&component, "S").unwrap();
        sim.fire(Direction::Input, "coin").unwrap();
        sim.delay(2.0).unwrap();
        sim.fire(Direction::Output, "cof").unwrap();
        let err = sim.fire(Direction::Output, "cof").unwrap_err();
        assert!(matches!(err, SimulationError::BoundViolation { value: 6, .. }));
        assert_eq!(sim.location(), "Done");
    }

    #[test]
    fn test_first_declared_wins() {
        let component = machine();
        let mut sim = ComponentSimulation::new(&component, "S").unwrap();
        sim.fire(Direction::Input, "coin").unwrap();
        sim.fire(Direction::Input, "push").unwrap();
        assert_eq!(sim.location(), "Idle");
    }

    #[test]
    fn test_last_declared_policy() {
        let component = machine();
        let mut sim = ComponentSimulation::new(&component, "S")
            .unwrap()
            .with_tie_break(TieBreak::LastDeclared);
        sim.fire(Direction::Input, "coin").unwrap();
        sim.fire(Direction::Input, "push").unwrap();
        assert_eq!(sim.location(), "Done");
    }

    #[test]
    fn test_fire_rule_by_destination_and_update() {
        let component = machine();
        let mut sim = ComponentSimulation::new(&component, "S").unwrap();
        sim.fire_rule(&rule("Paid", None, "S.x := 0")).unwrap();
        assert_eq!(sim.location(), "Paid");

        assert!(sim.peek_rule(&rule("Idle", None, "")).unwrap().is_some());
        assert!(sim
            .peek_rule(&rule("Done", Some(("cof", Direction::Output)), ""))
            .unwrap()
            .is_none());
        let edge = sim
            .fire_rule(&rule("Done", Some(("push", Direction::Input)), ""))
            .unwrap();
        assert_eq!(edge.sync_text(), "push?");
    }

    #[test]
    fn test_fire_rule_no_match() {
        let component = machine();
        let mut sim = ComponentSimulation::new(&component, "S").unwrap();
        let err = sim.fire_rule(&rule("Done", None, "")).unwrap_err();
        assert!(matches!(err, SimulationError::NoMatchingEdge { .. }));
    }

    #[test]
    fn test_snapshot_display() {
        let component = machine();
        let mut sim = ComponentSimulation::new(&component, "M").unwrap();
        sim.delay(1.2).unwrap();
        assert_eq!(sim.snapshot().to_string(), "{x=1.2, y=1.2, cups=0}");
    }

    #[test]
    fn test_qualified_valuation() {
        let component = machine();
        let sim = ComponentSimulation::new(&component, "M").unwrap();
        let valuation = sim.qualified_valuation();
        assert_eq!(valuation.get("M.x"), Some(0.0));
        assert_eq!(valuation.get("M.cups"), Some(0.0));
        assert!(!valuation.has("x"));
    }

    #[test]
    fn test_negative_delay_rejected() {
        let component = machine();
        let mut sim = ComponentSimulation::new(&component, "S").unwrap();
        assert!(sim.delay(-1.0).unwrap_err().is_fatal());
    }
}
