//! Multi-factor lead scoring: seven weighted sub-scores combined into an
//! overall 0-100 quality score, a letter grade, a follow-up priority, and a
//! conversion probability.

mod factors;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::config::{ConfigError, ScoringWeights};
use crate::directory::ReferenceDirectory;
use crate::domain::{
    FactorDetail, FactorKind, FactorScore, Grade, LeadScore, PartnershipTier, Priority, Request,
    RequestId,
};
use crate::store::{Clock, RecordStore};

pub(crate) use factors::parse_budget;

/// Scoring engine with a TTL-bound score cache keyed by request id.
pub struct LeadScoringEngine<S, C> {
    directory: Arc<ReferenceDirectory<S>>,
    clock: Arc<C>,
    weights: Mutex<ScoringWeights>,
    cache: Mutex<HashMap<RequestId, LeadScore>>,
    cache_ttl: Duration,
}

impl<S: RecordStore, C: Clock> LeadScoringEngine<S, C> {
    pub fn new(
        directory: Arc<ReferenceDirectory<S>>,
        clock: Arc<C>,
        weights: ScoringWeights,
        cache_ttl: Duration,
    ) -> Result<Self, ConfigError> {
        weights.validate()?;
        Ok(Self {
            directory,
            clock,
            weights: Mutex::new(weights),
            cache: Mutex::new(HashMap::new()),
            cache_ttl,
        })
    }

    /// Replace the factor weights. Invalid configurations are rejected before
    /// being applied; a successful update invalidates every cached score.
    pub fn update_weights(&self, weights: ScoringWeights) -> Result<(), ConfigError> {
        weights.validate()?;
        *self.weights.lock().expect("weights mutex poisoned") = weights;
        self.cache.lock().expect("score cache mutex poisoned").clear();
        Ok(())
    }

    /// Score a request looked up by id. Any lookup failure degrades to a
    /// manual-review score instead of raising.
    pub fn score_request(&self, id: &RequestId) -> LeadScore {
        match self.directory.store().request(id) {
            Ok(Some(request)) => self.score(&request),
            Ok(None) => {
                warn!(request = %id, "request missing during scoring, degrading");
                self.degraded(id.clone())
            }
            Err(error) => {
                warn!(request = %id, %error, "store failure during scoring, degrading");
                self.degraded(id.clone())
            }
        }
    }

    /// Score an already-loaded request, consulting and populating the score
    /// cache.
    pub fn score(&self, request: &Request) -> LeadScore {
        let now = self.clock.now();
        {
            let cache = self.cache.lock().expect("score cache mutex poisoned");
            if let Some(cached) = cache.get(&request.id) {
                if now - cached.computed_at < self.cache_ttl {
                    return cached.clone();
                }
            }
        }

        let score = self.compute(request, now);
        self.cache
            .lock()
            .expect("score cache mutex poisoned")
            .insert(request.id.clone(), score.clone());
        score
    }

    fn compute(&self, request: &Request, now: DateTime<Utc>) -> LeadScore {
        let weights = *self.weights.lock().expect("weights mutex poisoned");

        // A missing performance row is the documented unknown-source default,
        // not a failure; only a store error degrades this factor's input.
        let performance = match self.directory.source_performance(now, &request.source) {
            Ok(row) => row,
            Err(error) => {
                warn!(source = %request.source, %error, "source table unavailable, using defaults");
                None
            }
        };

        let (completeness, completeness_detail) = factors::data_completeness(request);
        let (source, source_detail) = factors::source_quality(request, performance.as_ref());
        let (engagement, engagement_detail) = factors::engagement(request, now);
        let (budget, budget_detail) = factors::budget_alignment(request);
        let (complexity, complexity_detail) = factors::project_complexity(request);
        let (geography, geography_detail) = factors::geographic_fit(request);
        let (urgency, urgency_detail) = factors::urgency(request, now);

        let factor_scores = vec![
            FactorScore {
                kind: FactorKind::DataCompleteness,
                score: completeness,
                weight: weights.completeness,
                detail: completeness_detail,
            },
            FactorScore {
                kind: FactorKind::SourceQuality,
                score: source,
                weight: weights.source,
                detail: source_detail,
            },
            FactorScore {
                kind: FactorKind::Engagement,
                score: engagement,
                weight: weights.engagement,
                detail: engagement_detail,
            },
            FactorScore {
                kind: FactorKind::BudgetAlignment,
                score: budget,
                weight: weights.budget,
                detail: budget_detail,
            },
            FactorScore {
                kind: FactorKind::ProjectComplexity,
                score: complexity,
                weight: weights.complexity,
                detail: complexity_detail,
            },
            FactorScore {
                kind: FactorKind::GeographicFit,
                score: geography,
                weight: weights.geography,
                detail: geography_detail,
            },
            FactorScore {
                kind: FactorKind::Urgency,
                score: urgency,
                weight: weights.urgency,
                detail: urgency_detail,
            },
        ];

        let overall: f64 = factor_scores
            .iter()
            .map(|factor| factor.score * factor.weight)
            .sum();
        let grade = Grade::from_overall(overall);
        let priority = derive_priority(overall, &factor_scores);
        let conversion_probability = conversion_probability(request, overall, &factor_scores);
        let recommendations = recommendations(overall, &factor_scores);

        LeadScore {
            request: request.id.clone(),
            overall,
            grade,
            conversion_probability,
            priority,
            factors: factor_scores,
            recommendations,
            computed_at: now,
        }
    }

    fn degraded(&self, id: RequestId) -> LeadScore {
        LeadScore {
            request: id,
            overall: 0.0,
            grade: Grade::F,
            conversion_probability: 0.0,
            priority: Priority::Low,
            factors: Vec::new(),
            recommendations: vec![
                "Lead could not be scored automatically; review manually".to_string(),
            ],
            computed_at: self.clock.now(),
        }
    }
}

fn urgent_timeframe(factors: &[FactorScore]) -> bool {
    factors.iter().any(|factor| {
        matches!(
            factor.detail,
            FactorDetail::Urgency {
                urgent_timeframe: true,
                ..
            }
        )
    })
}

fn derive_priority(overall: f64, factors: &[FactorScore]) -> Priority {
    if overall >= 70.0 {
        if urgent_timeframe(factors) {
            Priority::Urgent
        } else {
            Priority::High
        }
    } else if overall >= 50.0 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

fn conversion_probability(request: &Request, overall: f64, factors: &[FactorScore]) -> f64 {
    let source_conversion = factors
        .iter()
        .find_map(|factor| match &factor.detail {
            FactorDetail::Source { conversion_rate, .. } => Some(*conversion_rate),
            _ => None,
        })
        .unwrap_or(0.2);

    let budget_realistic = parse_budget(request.budget.as_deref().unwrap_or("")) >= 15_000.0;

    let mut probability = 0.6 * (overall / 100.0) + 0.3 * source_conversion;
    if request.attachment_count > 0 {
        probability += 0.05;
    }
    if request.visit_requested {
        probability += 0.10;
    }
    if budget_realistic {
        probability += 0.05;
    }
    probability.min(0.95)
}

fn recommendations(overall: f64, factors: &[FactorScore]) -> Vec<String> {
    let mut out = Vec::new();

    for factor in factors {
        match (&factor.kind, &factor.detail) {
            (FactorKind::BudgetAlignment, FactorDetail::Budget { specified: false, .. }) => {
                out.push("Ask for a budget range before scheduling the walk-thru".to_string());
            }
            (FactorKind::DataCompleteness, _) if factor.score < 60.0 => {
                out.push(
                    "Collect the missing intake details (contact, product, address)".to_string(),
                );
            }
            (FactorKind::Engagement, _) if factor.score < 50.0 => {
                out.push("Low engagement: follow up with a call instead of email".to_string());
            }
            (FactorKind::Urgency, _) if factor.score >= 75.0 => {
                out.push("High urgency signals: schedule the walk-thru within 48 hours".to_string());
            }
            (
                FactorKind::SourceQuality,
                FactorDetail::Source {
                    tier: PartnershipTier::Premium,
                    ..
                },
            ) => {
                out.push("Premium partner source: respond within the partner SLA".to_string());
            }
            _ => {}
        }
    }

    if overall >= 80.0 {
        out.push("Strong lead: fast-track toward quoting".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{RequestFilter, RequestPatch, StoreError};
    use crate::domain::{AssigneeProfile, Skill, SourcePerformance, Territory};
    use chrono::TimeZone;
    use std::sync::Mutex as StdMutex;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[derive(Default)]
    struct ScriptedStore {
        requests: StdMutex<HashMap<RequestId, Request>>,
        sources: Vec<SourcePerformance>,
        fail_sources: bool,
    }

    impl RecordStore for ScriptedStore {
        fn request(&self, id: &RequestId) -> Result<Option<Request>, StoreError> {
            Ok(self.requests.lock().expect("lock").get(id).cloned())
        }

        fn requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, StoreError> {
            Ok(self
                .requests
                .lock()
                .expect("lock")
                .values()
                .filter(|request| filter.matches(request))
                .cloned()
                .collect())
        }

        fn update_request(
            &self,
            id: &RequestId,
            expected_version: u64,
            patch: RequestPatch,
        ) -> Result<(), StoreError> {
            let mut guard = self.requests.lock().expect("lock");
            let request = guard.get_mut(id).ok_or(StoreError::NotFound)?;
            if request.version != expected_version {
                return Err(StoreError::VersionConflict {
                    expected: expected_version,
                    actual: request.version,
                });
            }
            patch.apply(request);
            Ok(())
        }

        fn assignees(&self) -> Result<Vec<AssigneeProfile>, StoreError> {
            Ok(Vec::new())
        }

        fn territories(&self) -> Result<Vec<Territory>, StoreError> {
            Ok(Vec::new())
        }

        fn skills(&self) -> Result<Vec<Skill>, StoreError> {
            Ok(Vec::new())
        }

        fn source_performance(&self) -> Result<Vec<SourcePerformance>, StoreError> {
            if self.fail_sources {
                return Err(StoreError::Unavailable("reference db offline".to_string()));
            }
            Ok(self.sources.clone())
        }
    }

    fn engine_with(
        store: ScriptedStore,
        now: DateTime<Utc>,
    ) -> LeadScoringEngine<ScriptedStore, FixedClock> {
        let store = Arc::new(store);
        let directory = Arc::new(ReferenceDirectory::new(store, Duration::minutes(5)));
        LeadScoringEngine::new(
            directory,
            Arc::new(FixedClock(now)),
            ScoringWeights::default(),
            Duration::minutes(5),
        )
        .expect("default weights valid")
    }

    fn referral_request(now: DateTime<Utc>) -> Request {
        let mut request = Request::new(RequestId("r-100".to_string()), "Referral", now);
        request.product = "Kitchen Renovation".to_string();
        request.budget = Some("$85,000".to_string());
        request.contact = Some(crate::domain::ContactId("c-1".to_string()));
        request.address = Some("45 Maple Ave".to_string());
        request.city = Some("Fairfield".to_string());
        request.message = "We are planning a full kitchen renovation this spring and would love a \
                           walk-thru to discuss layout, appliances, and timing."
            .to_string();
        request.visit_requested = true;
        request.attachment_count = 2;
        request
    }

    #[test]
    fn referral_kitchen_lead_scores_b_or_better() {
        let now = Utc.with_ymd_and_hms(2025, 5, 10, 9, 0, 0).single().expect("valid date");
        let store = ScriptedStore {
            sources: vec![SourcePerformance {
                source: "Referral".to_string(),
                reliability: 0.95,
                conversion_rate: 0.47,
            }],
            ..ScriptedStore::default()
        };
        let engine = engine_with(store, now);
        let request = referral_request(now);

        let score = engine.score(&request);

        let completeness = score
            .factor(FactorKind::DataCompleteness)
            .expect("completeness factor present");
        assert!(completeness.score >= 80.0);

        let source = score.factor(FactorKind::SourceQuality).expect("source factor present");
        assert!((source.score - 71.0).abs() < 0.5);

        assert!(matches!(score.grade, Grade::A | Grade::B), "grade was {:?}", score.grade);
        assert!(score.conversion_probability > 0.5);
        assert!(score.priority.is_elevated());
    }

    #[test]
    fn unknown_source_uses_documented_defaults() {
        let now = Utc::now();
        let engine = engine_with(ScriptedStore::default(), now);
        let mut request = Request::new(RequestId("r-2".to_string()), "Mystery Portal", now);
        request.message = "hi".to_string();

        let score = engine.score(&request);
        let source = score.factor(FactorKind::SourceQuality).expect("source factor present");
        // reliability 0.5 * 50 + conversion 0.2 * 50
        assert!((source.score - 35.0).abs() < 1e-9);
        match &source.detail {
            FactorDetail::Source { known, tier, .. } => {
                assert!(!known);
                assert_eq!(*tier, PartnershipTier::New);
            }
            other => panic!("expected source detail, got {other:?}"),
        }
    }

    #[test]
    fn missing_request_degrades_to_manual_review_score() {
        let now = Utc::now();
        let engine = engine_with(ScriptedStore::default(), now);

        let score = engine.score_request(&RequestId("ghost".to_string()));

        assert_eq!(score.overall, 0.0);
        assert_eq!(score.grade, Grade::F);
        assert_eq!(score.recommendations.len(), 1);
        assert!(score.recommendations[0].contains("manually"));
    }

    #[test]
    fn source_table_failure_still_produces_a_score() {
        let now = Utc::now();
        let store = ScriptedStore {
            fail_sources: true,
            ..ScriptedStore::default()
        };
        let engine = engine_with(store, now);
        let request = referral_request(now);

        let score = engine.score(&request);
        assert!(score.overall > 0.0, "scoring must not collapse on reference failures");
    }

    #[test]
    fn weight_update_invalidates_cached_scores() {
        let now = Utc::now();
        let engine = engine_with(ScriptedStore::default(), now);
        let request = referral_request(now);

        let first = engine.score(&request);
        let cached = engine.score(&request);
        assert_eq!(first.overall, cached.overall);

        let mut weights = ScoringWeights::default();
        weights.budget = 0.05;
        weights.urgency = 0.18;
        engine.update_weights(weights).expect("valid replacement weights");

        let rescored = engine.score(&request);
        assert!(
            (rescored.overall - first.overall).abs() > 1e-9,
            "new weights must produce a freshly computed score"
        );
    }

    #[test]
    fn invalid_weight_update_is_rejected_and_keeps_cache() {
        let now = Utc::now();
        let engine = engine_with(ScriptedStore::default(), now);
        let request = referral_request(now);
        let before = engine.score(&request);

        let mut weights = ScoringWeights::default();
        weights.budget = 0.99;
        assert!(engine.update_weights(weights).is_err());

        let after = engine.score(&request);
        assert_eq!(before.overall, after.overall);
    }
}
