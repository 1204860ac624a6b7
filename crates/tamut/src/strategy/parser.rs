//! Line classifier for strategy text.
//!
//! ```text
//! State: ( S.L0 M.L0 ) S.v=0 M.v=0 [spoiler]
//! While you are in (S.x<=2), wait.
//! When you are in (S.x>2), take transition S.L0->S.L1 { 1, coin?, x := 0 } [SKIP]
//! ```

use super::{ActionRule, StrategyState};
use crate::model::Direction;
use crate::result::{MutationTestingError, TamutResult};

const STATE_PREFIX: &str = "State:";
const DELAY_PREFIX: &str = "While you are in";
const DELAY_SUFFIX: &str = ", wait.";
const ACTION_PREFIX: &str = "When you are in";
const ACTION_INFIX: &str = ", take transition ";
const SPOILER: &str = "[spoiler]";
const SKIP: &str = "[SKIP]";

/// One classified strategy line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    /// Block header
    State(StrategyState),
    /// `While you are in <condition>, wait.`
    Delay { condition: String },
    /// `When you are in <condition>, take transition <descriptor>`
    Action(ActionRule),
    /// Empty or whitespace-only
    Blank,
    /// Matches no pattern
    Malformed(String),
}

/// Classify a single line.
///
/// # Errors
/// Returns `MalformedTransition` when an action line carries a transition
/// descriptor that does not match `Proc.Src->Proc.Dst { select, sync, update }`.
pub fn classify_line(line: &str) -> TamutResult<ParsedLine> {
    let line = line.trim_end();
    if line.trim().is_empty() {
        return Ok(ParsedLine::Blank);
    }
    if let Some(rest) = line.strip_prefix(STATE_PREFIX) {
        return Ok(parse_state(rest).map_or_else(
            || ParsedLine::Malformed("malformed state header".to_string()),
            ParsedLine::State,
        ));
    }
    if let Some(rest) = line.strip_prefix(DELAY_PREFIX) {
        return Ok(match rest.strip_suffix(DELAY_SUFFIX) {
            Some(condition) if rest.starts_with(char::is_whitespace) => ParsedLine::Delay {
                condition: condition.trim().to_string(),
            },
            _ => ParsedLine::Malformed("malformed delay rule".to_string()),
        });
    }
    if let Some(rest) = line.strip_prefix(ACTION_PREFIX) {
        let Some((condition, descriptor)) = rest
            .split_once(ACTION_INFIX)
            .filter(|_| rest.starts_with(char::is_whitespace))
        else {
            return Ok(ParsedLine::Malformed("malformed action rule".to_string()));
        };
        let descriptor = descriptor
            .strip_suffix(SKIP)
            .unwrap_or(descriptor)
            .trim();
        return parse_transition(condition.trim(), descriptor).map(ParsedLine::Action);
    }
    Ok(ParsedLine::Malformed("unrecognised line".to_string()))
}

/// `( loc1 loc2 ) eq1 eq2 [spoiler]`
fn parse_state(rest: &str) -> Option<StrategyState> {
    let rest = rest.trim();
    let rest = rest.strip_suffix(SPOILER).unwrap_or(rest).trim_end();
    let inner_start = rest.strip_prefix('(')?;
    let (pair, equalities) = inner_start.split_once(')')?;

    let mut locations = pair.split_whitespace();
    let first = locations.next()?;
    let second = locations.next()?;
    if locations.next().is_some() {
        return None;
    }

    let equalities = equalities.trim();
    let equalities = equalities
        .strip_prefix('[')
        .and_then(|e| e.strip_suffix(']'))
        .unwrap_or(equalities);
    let equalities: Vec<String> = equalities
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect();
    if equalities.iter().any(|e| !e.contains('=')) {
        return None;
    }

    Some(StrategyState::new(first, second, equalities))
}

/// `Proc.Src->Proc.Dst { select, sync, update }`
fn parse_transition(condition: &str, descriptor: &str) -> TamutResult<ActionRule> {
    let malformed = || MutationTestingError::MalformedTransition {
        text: descriptor.to_string(),
    };
    let is_word = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_');

    let (edge, body) = descriptor.split_once('{').ok_or_else(malformed)?;
    let body = body.trim_end().strip_suffix('}').ok_or_else(malformed)?;
    let (source, target) = edge.trim().split_once("->").ok_or_else(malformed)?;
    let (source_process, source_location) = source.split_once('.').ok_or_else(malformed)?;
    let (process, destination) = target.split_once('.').ok_or_else(malformed)?;
    if ![source_process, source_location, process, destination]
        .into_iter()
        .all(is_word)
    {
        return Err(malformed());
    }

    let mut fields = body.splitn(3, ',');
    let _select = fields.next().ok_or_else(malformed)?;
    let sync = fields.next().ok_or_else(malformed)?.trim();
    let update = fields.next().ok_or_else(malformed)?.trim();

    let sync = match sync {
        "" | "1" | "tau" => None,
        label => {
            let (label, direction) = Direction::split_label(label).ok_or_else(malformed)?;
            Some((label.to_string(), direction))
        }
    };
    let update = if update == "1" { "" } else { update };

    Ok(ActionRule {
        condition: condition.to_string(),
        process: process.to_string(),
        destination: destination.to_string(),
        sync,
        update: update.to_string(),
    })
}
