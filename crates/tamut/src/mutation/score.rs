//! Mutation score over executed test cases.

use super::MutationClass;
use crate::verdict::Verdict;
use serde::Serialize;
use std::collections::BTreeMap;

/// Verdict reached for one mutant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutantResult {
    /// Test case identifier
    pub mutant_id: String,
    /// Mutation class
    pub class: MutationClass,
    /// Verdict of the replay
    pub verdict: Verdict,
}

impl MutantResult {
    /// A mutant is killed when the replay found a deviation
    #[must_use]
    pub fn killed(&self) -> bool {
        self.verdict == Verdict::Fail
    }
}

/// Mutation score summary.
#[derive(Debug, Clone, Serialize)]
pub struct MutationScore {
    /// Total mutants executed
    pub total_mutants: usize,
    /// Mutants with a FAIL verdict
    pub killed: usize,
    /// Mutants with a PASS verdict
    pub survived: usize,
    /// Mutants the strategy did not cover
    pub inconclusive: usize,
    /// killed / (killed + survived)
    pub score: f64,
    /// Results by mutation class
    pub by_class: BTreeMap<MutationClass, ClassScore>,
}

/// Score for a single mutation class.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassScore {
    pub total: usize,
    pub killed: usize,
    pub inconclusive: usize,
    pub score: f64,
}

#[allow(clippy::cast_precision_loss)]
fn ratio(killed: usize, decided: usize) -> f64 {
    if decided > 0 {
        killed as f64 / decided as f64
    } else {
        1.0
    }
}

/// Calculate mutation score from results.
#[must_use]
pub fn calculate_mutation_score(results: &[MutantResult]) -> MutationScore {
    let total_mutants = results.len();
    let killed = results.iter().filter(|r| r.killed()).count();
    let inconclusive = results
        .iter()
        .filter(|r| r.verdict == Verdict::Inconclusive)
        .count();
    let survived = total_mutants - killed - inconclusive;

    let mut by_class = BTreeMap::new();
    for class in MutationClass::all() {
        let class_results: Vec<_> = results.iter().filter(|r| r.class == class).collect();
        if class_results.is_empty() {
            continue;
        }
        let class_killed = class_results.iter().filter(|r| r.killed()).count();
        let class_inconclusive = class_results
            .iter()
            .filter(|r| r.verdict == Verdict::Inconclusive)
            .count();
        by_class.insert(
            class,
            ClassScore {
                total: class_results.len(),
                killed: class_killed,
                inconclusive: class_inconclusive,
                score: ratio(class_killed, class_results.len() - class_inconclusive),
            },
        );
    }

    MutationScore {
        total_mutants,
        killed,
        survived,
        inconclusive,
        score: ratio(killed, killed + survived),
        by_class,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, class: MutationClass, verdict: Verdict) -> MutantResult {
        MutantResult {
            mutant_id: id.to_string(),
            class,
            verdict,
        }
    }

    #[test]
    fn test_calculate_mutation_score() {
        let results = vec![
            result("a", MutationClass::ChangeTarget, Verdict::Fail),
            result("b", MutationClass::ChangeTarget, Verdict::Pass),
            result("c", MutationClass::SinkLocation, Verdict::Fail),
            result("d", MutationClass::SinkLocation, Verdict::Inconclusive),
        ];

        let score = calculate_mutation_score(&results);
        assert_eq!(score.total_mutants, 4);
        assert_eq!(score.killed, 2);
        assert_eq!(score.survived, 1);
        assert_eq!(score.inconclusive, 1);
        assert!((score.score - 2.0 / 3.0).abs() < f64::EPSILON);

        let sink = &score.by_class[&MutationClass::SinkLocation];
        assert_eq!(sink.total, 2);
        assert!((sink.score - 1.0).abs() < f64::EPSILON);
        let target = &score.by_class[&MutationClass::ChangeTarget];
        assert!((target.score - 0.5).abs() < f64::EPSILON);
        assert!(!score.by_class.contains_key(&MutationClass::InvertReset));
    }

    #[test]
    fn test_empty_results_score_one() {
        let score = calculate_mutation_score(&[]);
        assert_eq!(score.total_mutants, 0);
        assert!((score.score - 1.0).abs() < f64::EPSILON);
    }
}
