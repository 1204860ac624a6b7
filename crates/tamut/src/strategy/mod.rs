//! Non-refinement strategies.
//!
//! A strategy is an ordered mapping from pairs of process locations (plus
//! observed local values) to rules. The first entry whose locations and
//! equalities match the two running simulations is selected, then the first
//! rule whose condition holds over both simulations' clocks.

mod parser;

pub use parser::{classify_line, ParsedLine};

use crate::expr::{eval_guard, Valuation};
use crate::model::Direction;
use crate::result::{MutationTestingError, TamutResult};
use crate::simulation::{ComponentSimulation, TieBreak};
use std::str::FromStr;

/// Pair of qualified locations plus recorded local equalities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyState {
    locations: [String; 2],
    equalities: Vec<String>,
}

impl StrategyState {
    pub fn new(first: impl Into<String>, second: impl Into<String>, equalities: Vec<String>) -> Self {
        Self {
            locations: [first.into(), second.into()],
            equalities,
        }
    }

    #[must_use]
    pub fn locations(&self) -> &[String; 2] {
        &self.locations
    }

    #[must_use]
    pub fn equalities(&self) -> &[String] {
        &self.equalities
    }

    /// Order-independent location match, recorded equalities a subset of `observed`.
    #[must_use]
    pub fn matches(&self, first: &str, second: &str, observed: &[String]) -> bool {
        let [a, b] = &self.locations;
        let same_pair = (a == first && b == second) || (a == second && b == first);
        same_pair && self.equalities.iter().all(|e| observed.contains(e))
    }
}

/// Take one transition of `process` into `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRule {
    /// Condition over qualified clocks
    pub condition: String,
    /// Acting process
    pub process: String,
    /// Destination location id (unqualified)
    pub destination: String,
    /// Sync label and direction, when the descriptor names one
    pub sync: Option<(String, Direction)>,
    /// Update predicate, empty for no constraint
    pub update: String,
}

impl ActionRule {
    /// The update predicate with the acting process qualifier removed
    #[must_use]
    pub fn unqualified_update(&self) -> String {
        self.update.replace(&format!("{}.", self.process), "")
    }
}

/// A rule of a strategy state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyRule {
    /// Wait while the condition holds
    Delay { condition: String },
    /// Take a transition
    Action(ActionRule),
}

impl StrategyRule {
    #[must_use]
    pub fn condition(&self) -> &str {
        match self {
            Self::Delay { condition } => condition,
            Self::Action(rule) => &rule.condition,
        }
    }
}

/// Parsed strategy: states and their rules in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NonRefinementStrategy {
    entries: Vec<(StrategyState, Vec<StrategyRule>)>,
}

impl NonRefinementStrategy {
    /// Parse strategy lines.
    ///
    /// Lines outside a block are ignored; a block starts at a `State:` header
    /// and ends at the first blank line.
    ///
    /// # Errors
    /// Returns `MalformedStrategyLine` for a line inside a block (or a `State:`
    /// header) that matches no pattern, and `MalformedTransition` for a bad
    /// transition descriptor.
    pub fn parse<I, S>(lines: I) -> TamutResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut strategy = Self::default();
        let mut current: Option<usize> = None;

        for (index, line) in lines.into_iter().enumerate() {
            let line = line.as_ref();
            let malformed = || MutationTestingError::MalformedStrategyLine {
                line_number: index + 1,
                line: line.to_string(),
            };

            let in_block = current.is_some();
            if !in_block && !line.starts_with("State:") {
                continue;
            }

            match classify_line(line)? {
                ParsedLine::State(state) => current = Some(strategy.entry(state)),
                ParsedLine::Blank => current = None,
                ParsedLine::Delay { condition } => {
                    strategy.push_rule(current, StrategyRule::Delay { condition });
                }
                ParsedLine::Action(rule) => {
                    strategy.push_rule(current, StrategyRule::Action(rule));
                }
                ParsedLine::Malformed(reason) => {
                    tracing::debug!(line_number = index + 1, %reason, "malformed strategy line");
                    return Err(malformed());
                }
            }
        }

        tracing::debug!(states = strategy.len(), "parsed strategy");
        Ok(strategy)
    }

    /// Index of the entry for `state`, creating it if new.
    fn entry(&mut self, state: StrategyState) -> usize {
        if let Some(index) = self.entries.iter().position(|(s, _)| *s == state) {
            return index;
        }
        self.entries.push((state, Vec::new()));
        self.entries.len() - 1
    }

    fn push_rule(&mut self, entry: Option<usize>, rule: StrategyRule) {
        if let Some((_, rules)) = entry.and_then(|index| self.entries.get_mut(index)) {
            rules.push(rule);
        }
    }

    /// States in parse order.
    pub fn states(&self) -> impl Iterator<Item = &StrategyState> {
        self.entries.iter().map(|(state, _)| state)
    }

    /// Rules recorded for `state`.
    #[must_use]
    pub fn rules(&self, state: &StrategyState) -> Option<&[StrategyRule]> {
        self.entries
            .iter()
            .find(|(s, _)| s == state)
            .map(|(_, rules)| rules.as_slice())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The state matching both simulations, if any.
    #[must_use]
    pub fn find_state(
        &self,
        first: &ComponentSimulation<'_>,
        second: &ComponentSimulation<'_>,
        policy: TieBreak,
    ) -> Option<&(StrategyState, Vec<StrategyRule>)> {
        let first_location = first.qualified_location();
        let second_location = second.qualified_location();
        let mut observed = first.local_equalities();
        observed.extend(second.local_equalities());

        policy.pick(
            self.entries
                .iter()
                .filter(|(state, _)| state.matches(&first_location, &second_location, &observed)),
        )
    }

    /// The rule applying to the two simulations now.
    ///
    /// `Ok(None)` means the strategy does not cover the observed state: either
    /// no state matches or none of its rule conditions hold.
    ///
    /// # Errors
    /// Returns an expression error if a rule condition cannot be evaluated.
    pub fn get_rule(
        &self,
        first: &ComponentSimulation<'_>,
        second: &ComponentSimulation<'_>,
        policy: TieBreak,
    ) -> TamutResult<Option<&StrategyRule>> {
        let Some((state, rules)) = self.find_state(first, second, policy) else {
            tracing::debug!(
                first = %first.qualified_location(),
                second = %second.qualified_location(),
                "no strategy state"
            );
            return Ok(None);
        };

        let mut valuation = Valuation::new();
        valuation.extend(&first.qualified_valuation());
        valuation.extend(&second.qualified_valuation());

        let mut applicable = Vec::new();
        for rule in rules {
            if eval_guard(rule.condition(), &valuation)? {
                applicable.push(rule);
            }
        }
        let rule = policy.pick(applicable.into_iter());
        tracing::debug!(state = ?state.locations(), found = rule.is_some(), "strategy lookup");
        Ok(rule)
    }
}

impl FromStr for NonRefinementStrategy {
    type Err = MutationTestingError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text.lines())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::Component;

    const COMPONENT: &str = r#"
name: "Toggle"
declarations:
  clocks: ["x"]
  locals:
    - name: "v"
      lower: 0
      upper: 1
  inputs: ["press"]
  outputs: ["beep"]
locations:
  - id: "Off"
    kind: initial
  - id: "On"
edges:
  - source: "Off"
    target: "On"
    direction: input
    sync: "press"
    update: "v = 1"
  - source: "On"
    target: "Off"
    direction: output
    sync: "beep"
"#;

    const STRATEGY: &str = "\
Strategy to avoid losing:

State: ( S.Off M.Off ) S.v=0 M.v=0 [spoiler]
While you are in (S.x<=1), wait.
When you are in (S.x>1), take transition S.Off->S.On { 1, press?, v := 1 } [SKIP]

State: ( S.On M.On ) [spoiler]
When you are in true, take transition M.On->M.Off { 1, beep!, 1 } [SKIP]
";

    fn component() -> Component {
        Component::from_yaml(COMPONENT).unwrap()
    }

    #[test]
    fn test_parse_blocks() {
        let strategy: NonRefinementStrategy = STRATEGY.parse().unwrap();
        assert_eq!(strategy.len(), 2);
        let first = strategy.states().next().unwrap();
        assert_eq!(strategy.rules(first).unwrap().len(), 2);
    }

    #[test]
    fn test_lines_outside_blocks_ignored() {
        let strategy = NonRefinementStrategy::parse(["garbage", "", "more garbage"]).unwrap();
        assert!(strategy.is_empty());
    }

    #[test]
    fn test_malformed_line_in_block() {
        let text = "State: ( S.A M.A ) [spoiler]\nWhile you are in true, wait.\nbogus\n";
        let err = text.parse::<NonRefinementStrategy>().unwrap_err();
        assert!(matches!(
            err,
            MutationTestingError::MalformedStrategyLine { line_number: 3, .. }
        ));
    }

    #[test]
    fn test_repeated_state_merges_rules() {
        let text = "State: ( S.A M.A ) [spoiler]\nWhile you are in true, wait.\n\n\
                    State: ( S.A M.A ) [spoiler]\nWhile you are in false, wait.\n";
        let strategy: NonRefinementStrategy = text.parse().unwrap();
        assert_eq!(strategy.len(), 1);
        let state = strategy.states().next().unwrap();
        assert_eq!(strategy.rules(state).unwrap().len(), 2);
    }

    #[test]
    fn test_get_rule_delay_then_action() {
        let strategy: NonRefinementStrategy = STRATEGY.parse().unwrap();
        let component = component();
        let mut s = ComponentSimulation::new(&component, "S").unwrap();
        let mut m = ComponentSimulation::new(&component, "M").unwrap();

        let rule = strategy.get_rule(&s, &m, TieBreak::FirstDeclared).unwrap();
        assert!(matches!(rule, Some(StrategyRule::Delay { .. })));

        s.delay(1.5).unwrap();
        m.delay(1.5).unwrap();
        let rule = strategy.get_rule(&s, &m, TieBreak::FirstDeclared).unwrap();
        let Some(StrategyRule::Action(action)) = rule else {
            panic!("expected action rule");
        };
        assert_eq!(action.destination, "On");
    }

    #[test]
    fn test_get_rule_symmetric() {
        let strategy: NonRefinementStrategy = STRATEGY.parse().unwrap();
        let component = component();
        let s = ComponentSimulation::new(&component, "S").unwrap();
        let m = ComponentSimulation::new(&component, "M").unwrap();
        assert_eq!(
            strategy.get_rule(&s, &m, TieBreak::FirstDeclared).unwrap(),
            strategy.get_rule(&m, &s, TieBreak::FirstDeclared).unwrap()
        );
    }

    #[test]
    fn test_equalities_must_hold() {
        let strategy: NonRefinementStrategy = STRATEGY.parse().unwrap();
        let component = component();
        let mut s = ComponentSimulation::new(&component, "S").unwrap();
        let mut m = ComponentSimulation::new(&component, "M").unwrap();
        s.fire(Direction::Input, "press").unwrap();
        s.fire(Direction::Output, "beep").unwrap();
        m.fire(Direction::Input, "press").unwrap();
        m.fire(Direction::Output, "beep").unwrap();
        // both back in Off, but v=1 no longer matches S.v=0 M.v=0
        assert_eq!(strategy.get_rule(&s, &m, TieBreak::FirstDeclared).unwrap(), None);
    }

    #[test]
    fn test_no_rule_holds() {
        let text = "State: ( S.Off M.Off ) [spoiler]\nWhile you are in (S.x > 5), wait.\n";
        let strategy: NonRefinementStrategy = text.parse().unwrap();
        let component = component();
        let s = ComponentSimulation::new(&component, "S").unwrap();
        let m = ComponentSimulation::new(&component, "M").unwrap();
        assert_eq!(strategy.get_rule(&s, &m, TieBreak::FirstDeclared).unwrap(), None);
    }

    #[test]
    fn test_last_declared_policy() {
        let strategy: NonRefinementStrategy = STRATEGY.parse().unwrap();
        let component = component();
        let mut s = ComponentSimulation::new(&component, "S").unwrap();
        let mut m = ComponentSimulation::new(&component, "M").unwrap();
        s.delay(0.5).unwrap();
        m.delay(0.5).unwrap();
        let rule = strategy.get_rule(&s, &m, TieBreak::LastDeclared).unwrap();
        assert!(matches!(rule, Some(StrategyRule::Delay { .. })));
    }

    #[test]
    fn test_unqualified_update() {
        let rule = ActionRule {
            condition: "true".to_string(),
            process: "S".to_string(),
            destination: "On".to_string(),
            sync: None,
            update: "S.v := S.v + 1".to_string(),
        };
        assert_eq!(rule.unqualified_update(), "v := v + 1");
    }

    #[test]
    fn test_unknown_clock_in_condition_is_error() {
        let text = "State: ( S.Off M.Off ) [spoiler]\nWhile you are in (S.z > 5), wait.\n";
        let strategy: NonRefinementStrategy = text.parse().unwrap();
        let component = component();
        let s = ComponentSimulation::new(&component, "S").unwrap();
        let m = ComponentSimulation::new(&component, "M").unwrap();
        assert!(strategy.get_rule(&s, &m, TieBreak::FirstDeclared).is_err());
    }
}
