//! Per-strategy candidate scoring. All functions operate on the already
//! filtered eligible set and return an index into it.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::HybridWeights;
use crate::domain::AssigneeProfile;

/// Advance the shared pointer and select `(pointer + 1) mod N`. Deterministic
/// and load-blind; the universal fallback.
pub(crate) fn round_robin(candidates: &[AssigneeProfile], pointer: &AtomicUsize) -> Option<usize> {
    if candidates.is_empty() {
        return None;
    }
    let previous = pointer.fetch_add(1, Ordering::Relaxed);
    Some((previous + 1) % candidates.len())
}

/// Lowest utilization wins; ties within 0.1 go to the lower priority order.
pub(crate) fn workload_balanced(
    candidates: &[AssigneeProfile],
    default_max: u32,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let utilization = candidate.utilization(default_max);
        best = match best {
            None => Some((index, utilization)),
            Some((best_index, best_utilization)) => {
                let tied = (utilization - best_utilization).abs() <= 0.1;
                let wins = if tied {
                    candidates[index].priority_order < candidates[best_index].priority_order
                } else {
                    utilization < best_utilization
                };
                if wins {
                    Some((index, utilization))
                } else {
                    Some((best_index, best_utilization))
                }
            }
        };
    }
    best.map(|(index, _)| index)
}

pub(crate) fn utilization_of(candidate: &AssigneeProfile, default_max: u32) -> f64 {
    candidate.utilization(default_max)
}

/// Base 0.5, plus a seniority bonus linear in `(10 - order) / 10` up to 0.2,
/// plus 0.1 each for being active and having a linked contact record.
pub(crate) fn skill_score(candidate: &AssigneeProfile) -> f64 {
    let seniority = f64::from(10u8.saturating_sub(candidate.priority_order)) / 10.0;
    let mut score = 0.5 + seniority * 0.2;
    if candidate.active {
        score += 0.1;
    }
    if candidate.contact.is_some() {
        score += 0.1;
    }
    score.clamp(0.0, 1.0)
}

/// `0.7 * skillScore + 0.3 * (1 - utilization)`, pick the maximum.
pub(crate) fn skill_based(
    candidates: &[AssigneeProfile],
    default_max: u32,
) -> Option<(usize, f64)> {
    candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let combined =
                0.7 * skill_score(candidate) + 0.3 * (1.0 - candidate.utilization(default_max));
            (index, combined)
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

pub(crate) fn experience_score(candidate: &AssigneeProfile) -> f64 {
    (f64::from(10u8.saturating_sub(candidate.priority_order)) / 10.0).max(0.0)
}

/// Weighted blend of skill, workload headroom, experience, and availability,
/// normalized by the sum of the weights applied.
pub(crate) fn hybrid_score(
    candidate: &AssigneeProfile,
    weights: &HybridWeights,
    default_max: u32,
) -> f64 {
    let availability = if candidate.active { 1.0 } else { 0.3 };
    let weighted = weights.skill * skill_score(candidate)
        + weights.workload * (1.0 - candidate.utilization(default_max))
        + weights.experience * experience_score(candidate)
        + weights.availability * availability;
    let total = weights.skill + weights.workload + weights.experience + weights.availability;
    if total <= 0.0 {
        return 0.0;
    }
    weighted / total
}

pub(crate) fn hybrid(
    candidates: &[AssigneeProfile],
    weights: &HybridWeights,
    default_max: u32,
) -> Option<(usize, f64)> {
    candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| (index, hybrid_score(candidate, weights, default_max)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::testutil::profile;

    #[test]
    fn round_robin_visits_each_candidate_once_per_cycle() {
        let candidates = vec![profile("a", 1, 0, 10), profile("b", 2, 0, 10), profile("c", 3, 0, 10)];
        let pointer = AtomicUsize::new(0);

        let mut seen: Vec<usize> = (0..candidates.len())
            .map(|_| round_robin(&candidates, &pointer).expect("candidate selected"))
            .collect();
        seen.sort_unstable();

        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn workload_balanced_prefers_headroom_then_seniority() {
        let candidates = vec![
            profile("senior-busy", 1, 9, 10),
            profile("junior-free", 5, 1, 10),
        ];
        let picked = workload_balanced(&candidates, 15).expect("candidate selected");
        assert_eq!(picked, 1);

        // Utilizations within 0.1 of each other: seniority breaks the tie.
        let candidates = vec![profile("junior", 5, 5, 10), profile("senior", 1, 5, 10)];
        let picked = workload_balanced(&candidates, 15).expect("candidate selected");
        assert_eq!(picked, 1);
    }

    #[test]
    fn skill_score_components_accumulate_and_clamp() {
        let full = profile("ace", 0, 0, 10);
        assert!((skill_score(&full) - 0.9).abs() < 1e-9);

        let mut inactive = profile("bench", 10, 0, 10);
        inactive.active = false;
        inactive.contact = None;
        assert!((skill_score(&inactive) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn hybrid_workload_weight_dominates_seniority() {
        // A at 0.9 utilization / order 1 loses to B at 0.1 / order 5.
        let candidates = vec![profile("a", 1, 9, 10), profile("b", 5, 1, 10)];
        let (picked, _) =
            hybrid(&candidates, &HybridWeights::default(), 15).expect("candidate selected");
        assert_eq!(picked, 1);
    }
}
