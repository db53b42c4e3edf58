//! Score distribution across a problem's test cases.
//!
//! Public cases are examples shown to students and never carry points.

use crate::db::types::{ScoringPolicy, Visibility};

/// Per-case scores aligned with `cases`, where each entry is the case's
/// visibility and its declared score.
///
/// Under [`ScoringPolicy::Equal`] the declared scores are ignored and
/// `total_score` is split between private cases; the remainder goes one
/// point at a time to the earliest private cases so the sum is exact.
pub(crate) fn case_scores(
    policy: ScoringPolicy,
    cases: &[(Visibility, i32)],
    total_score: i32,
) -> Vec<i32> {
    match policy {
        ScoringPolicy::Custom => cases
            .iter()
            .map(|(visibility, score)| match visibility {
                Visibility::Private => (*score).max(0),
                Visibility::Public => 0,
            })
            .collect(),
        ScoringPolicy::Equal => {
            let private_count =
                cases.iter().filter(|(visibility, _)| *visibility == Visibility::Private).count();
            if private_count == 0 {
                return vec![0; cases.len()];
            }

            let total = total_score.max(0);
            let count = i32::try_from(private_count).unwrap_or(i32::MAX);
            let share = total / count;
            let mut remainder = total % count;

            cases
                .iter()
                .map(|(visibility, _)| match visibility {
                    Visibility::Public => 0,
                    Visibility::Private => {
                        if remainder > 0 {
                            remainder -= 1;
                            share + 1
                        } else {
                            share
                        }
                    }
                })
                .collect()
        }
    }
}

/// Achievable total for a problem: the declared total for the equal policy,
/// the sum of private case scores for the custom one. `None` when that sum
/// does not fit in an `i32`.
pub(crate) fn effective_total(
    policy: ScoringPolicy,
    cases: &[(Visibility, i32)],
    declared_total: i32,
) -> Option<i32> {
    match policy {
        ScoringPolicy::Equal => Some(declared_total),
        ScoringPolicy::Custom => case_scores(policy, cases, declared_total)
            .into_iter()
            .try_fold(0i32, |total, score| total.checked_add(score)),
    }
}
