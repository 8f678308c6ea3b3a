//! Territory-aware ("flexible") matching: weighted multi-criteria scoring of
//! each candidate's declared territories against the request, combined with
//! skill, workload, availability, and role-priority components.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{FlexibleWeights, TerritoryRuleWeights};
use crate::domain::{AssigneeProfile, Availability, Territory, TerritoryId, TerritoryRole};

use super::strategies::{skill_score, utilization_of};
use super::AssignmentContext;

/// Qualitative bucket derived from a territory match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    Exact,
    Overlap,
    Adjacent,
    Fallback,
}

impl MatchType {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            MatchType::Exact
        } else if score >= 0.6 {
            MatchType::Overlap
        } else if score >= 0.3 {
            MatchType::Adjacent
        } else {
            MatchType::Fallback
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Overlap => "overlap",
            MatchType::Adjacent => "adjacent",
            MatchType::Fallback => "fallback",
        }
    }
}

/// Best territory match found for a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryMatch {
    pub territory: TerritoryId,
    pub score: f64,
    pub match_type: MatchType,
}

/// Exact city match and zip match are full credit; a state-only match is
/// partial.
fn geographic_score(ctx: &AssignmentContext, territory: &Territory) -> f64 {
    let bounds = &territory.bounds;
    if let Some(city) = &ctx.city {
        if bounds.cities.iter().any(|b| b.eq_ignore_ascii_case(city)) {
            return 1.0;
        }
    }
    if let Some(zip) = &ctx.zip {
        if bounds.zips.iter().any(|b| b == zip) {
            return 1.0;
        }
    }
    if let Some(state) = &ctx.state {
        if bounds.states.iter().any(|b| b.eq_ignore_ascii_case(state)) {
            return 0.7;
        }
    }
    0.0
}

fn product_score(ctx: &AssignmentContext, territory: &Territory) -> f64 {
    let product = ctx.product.to_lowercase();
    if territory
        .bounds
        .products
        .iter()
        .any(|candidate| product.contains(&candidate.to_lowercase()))
    {
        1.0
    } else {
        0.0
    }
}

fn budget_score(ctx: &AssignmentContext, territory: &Territory) -> f64 {
    let amount = ctx.budget_amount;
    let min_ok = territory.bounds.budget_min.map(|min| amount >= min).unwrap_or(true);
    let max_ok = territory.bounds.budget_max.map(|max| amount <= max).unwrap_or(true);
    if amount > 0.0 && min_ok && max_ok {
        1.0
    } else {
        0.0
    }
}

fn client_type_score(ctx: &AssignmentContext, territory: &Territory) -> f64 {
    match &ctx.client_type {
        Some(client_type) => {
            if territory
                .bounds
                .client_types
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(client_type))
            {
                1.0
            } else {
                0.0
            }
        }
        None => 0.0,
    }
}

/// Score one territory against the request. Each rule weight applies only
/// when the territory declares that bound; the weighted sum is normalized by
/// the weights actually applied, then a performance bonus is added.
pub(crate) fn territory_match(
    ctx: &AssignmentContext,
    territory: &Territory,
    weights: &TerritoryRuleWeights,
) -> Option<TerritoryMatch> {
    if !territory.active {
        return None;
    }

    let mut weighted = 0.0;
    let mut applied = 0.0;

    if territory.bounds.has_geographic() {
        weighted += weights.geographic * geographic_score(ctx, territory);
        applied += weights.geographic;
    }
    if !territory.bounds.products.is_empty() {
        weighted += weights.product * product_score(ctx, territory);
        applied += weights.product;
    }
    if territory.bounds.has_budget_range() {
        weighted += weights.budget * budget_score(ctx, territory);
        applied += weights.budget;
    }
    if !territory.bounds.client_types.is_empty() {
        weighted += weights.client_type * client_type_score(ctx, territory);
        applied += weights.client_type;
    }

    if applied <= 0.0 {
        // Territory declares no usable bounds; nothing to match on.
        return None;
    }

    let base = weighted / applied;
    let bonus = territory.performance.completion_rate * 0.1
        + territory.performance.satisfaction / 5.0 * 0.1;
    let score = (base + bonus).min(1.0);

    Some(TerritoryMatch {
        territory: territory.id.clone(),
        score,
        match_type: MatchType::from_score(score),
    })
}

const fn role_score(role: TerritoryRole) -> f64 {
    match role {
        TerritoryRole::Primary => 1.0,
        TerritoryRole::Secondary => 0.7,
        TerritoryRole::Backup => 0.4,
    }
}

const fn availability_score(availability: Availability) -> f64 {
    match availability {
        Availability::Available => 1.0,
        Availability::Busy => 0.5,
        Availability::Offline => 0.0,
    }
}

/// Evaluation of one candidate under the flexible strategy.
#[derive(Debug, Clone)]
pub(crate) struct FlexibleEvaluation {
    pub index: usize,
    pub score: f64,
    pub territory: Option<TerritoryMatch>,
    pub reasons: Vec<String>,
}

fn evaluate_candidate(
    index: usize,
    candidate: &AssigneeProfile,
    ctx: &AssignmentContext,
    territories: &HashMap<&TerritoryId, &Territory>,
    weights: &FlexibleWeights,
    territory_weights: &TerritoryRuleWeights,
    default_max: u32,
) -> FlexibleEvaluation {
    let mut best_territory: Option<(TerritoryMatch, TerritoryRole)> = None;
    for membership in &candidate.territories {
        let Some(territory) = territories.get(&membership.territory) else {
            warn!(
                assignee = %candidate.id,
                territory = %membership.territory.0,
                "membership references unknown territory, skipping"
            );
            continue;
        };
        if let Some(matched) = territory_match(ctx, territory, territory_weights) {
            let better = best_territory
                .as_ref()
                .map(|(current, _)| matched.score > current.score)
                .unwrap_or(true);
            if better {
                best_territory = Some((matched, membership.role));
            }
        }
    }

    let mut weighted = weights.workload * (1.0 - utilization_of(candidate, default_max))
        + weights.skill * skill_score(candidate)
        + weights.availability * availability_score(candidate.availability);
    let mut applied = weights.workload + weights.skill + weights.availability;

    if let Some((matched, role)) = &best_territory {
        weighted += weights.territory * matched.score + weights.role * role_score(*role);
        applied += weights.territory + weights.role;
    }

    let score = if applied > 0.0 { weighted / applied } else { 0.0 };

    let mut reasons = Vec::new();
    if skill_score(candidate) >= 0.8 {
        reasons.push("excellent skill match".to_string());
    }
    if utilization_of(candidate, default_max) <= 0.3 {
        reasons.push("ample capacity".to_string());
    }
    match &best_territory {
        Some((matched, role)) => {
            if matched.match_type == MatchType::Exact {
                reasons.push("territory specialist".to_string());
            }
            if *role == TerritoryRole::Primary {
                reasons.push("primary territory owner".to_string());
            }
        }
        None => reasons.push("no territory coverage, general pool".to_string()),
    }

    FlexibleEvaluation {
        index,
        score,
        territory: best_territory.map(|(matched, _)| matched),
        reasons,
    }
}

/// Rank every candidate; the caller takes the head as the pick and up to
/// three runners-up as alternatives.
pub(crate) fn rank_candidates(
    candidates: &[AssigneeProfile],
    territories: &[Territory],
    ctx: &AssignmentContext,
    weights: &FlexibleWeights,
    territory_weights: &TerritoryRuleWeights,
    default_max: u32,
) -> Vec<FlexibleEvaluation> {
    let by_id: HashMap<&TerritoryId, &Territory> = territories
        .iter()
        .map(|territory| (&territory.id, territory))
        .collect();

    let mut evaluations: Vec<FlexibleEvaluation> = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            evaluate_candidate(
                index,
                candidate,
                ctx,
                &by_id,
                weights,
                territory_weights,
                default_max,
            )
        })
        .collect();

    evaluations.sort_by(|a, b| b.score.total_cmp(&a.score));
    evaluations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::testutil::{context_for, profile, territory_with};
    use crate::domain::{TerritoryBounds, TerritoryMembership};

    #[test]
    fn city_match_is_exact_state_match_is_partial() {
        let territory = territory_with(
            "t-geo",
            TerritoryBounds {
                cities: vec!["Stamford".to_string()],
                states: vec!["CT".to_string()],
                ..TerritoryBounds::default()
            },
        );
        let weights = TerritoryRuleWeights::default();

        let city_ctx = context_for("Kitchen", 40_000.0, Some("Stamford"), Some("CT"), None);
        let matched = territory_match(&city_ctx, &territory, &weights).expect("geo bounds present");
        assert_eq!(matched.match_type, MatchType::Exact);

        let state_ctx = context_for("Kitchen", 40_000.0, Some("Norwalk"), Some("CT"), None);
        let matched = territory_match(&state_ctx, &territory, &weights).expect("geo bounds present");
        assert_eq!(matched.match_type, MatchType::Overlap);
    }

    #[test]
    fn unbounded_territory_matches_nothing() {
        let territory = territory_with("t-empty", TerritoryBounds::default());
        let ctx = context_for("Kitchen", 40_000.0, None, None, None);
        assert!(territory_match(&ctx, &territory, &TerritoryRuleWeights::default()).is_none());
    }

    #[test]
    fn budget_territory_respects_range() {
        let territory = territory_with(
            "t-budget",
            TerritoryBounds {
                budget_min: Some(50_000.0),
                budget_max: Some(250_000.0),
                ..TerritoryBounds::default()
            },
        );
        let weights = TerritoryRuleWeights::default();

        let inside = context_for("Addition", 80_000.0, None, None, None);
        let matched = territory_match(&inside, &territory, &weights).expect("budget bounds present");
        assert!(matched.score >= 0.9, "score was {}", matched.score);

        let outside = context_for("Addition", 20_000.0, None, None, None);
        let matched = territory_match(&outside, &territory, &weights).expect("budget bounds present");
        assert_eq!(matched.match_type, MatchType::Fallback);
    }

    #[test]
    fn ranking_prefers_territory_specialist() {
        let territory = territory_with(
            "t-city",
            TerritoryBounds {
                cities: vec!["Greenwich".to_string()],
                ..TerritoryBounds::default()
            },
        );
        let mut specialist = profile("specialist", 3, 2, 10);
        specialist.territories.push(TerritoryMembership {
            territory: territory.id.clone(),
            role: TerritoryRole::Primary,
            capacity: 10,
            current_load: 2,
            avg_response_minutes: Some(45),
        });
        let generalist = profile("generalist", 3, 2, 10);

        let ctx = context_for("Kitchen", 60_000.0, Some("Greenwich"), Some("CT"), None);
        let ranked = rank_candidates(
            &[generalist, specialist],
            std::slice::from_ref(&territory),
            &ctx,
            &FlexibleWeights::default(),
            &TerritoryRuleWeights::default(),
            15,
        );

        assert_eq!(ranked[0].index, 1);
        assert!(ranked[0]
            .reasons
            .iter()
            .any(|reason| reason == "territory specialist"));
        assert!(ranked[0].territory.as_ref().expect("match present").score >= 0.9);
    }
}
