//! Assignment engine: selects an account executive for a request using one of
//! several interchangeable strategies over the same cached reference data.
//! Selection always degrades gracefully: flexible falls back to hybrid, and
//! everything falls back to round-robin.

mod strategies;
mod territory;

pub use territory::{MatchType, TerritoryMatch};

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AssignmentConfig;
use crate::directory::ReferenceDirectory;
use crate::domain::{
    AssigneeId, AssigneeProfile, Assignment, Availability, Request,
};
use crate::error::DecisionError;
use crate::scoring::parse_budget;
use crate::store::{Clock, RecordStore, RequestPatch};

/// Interchangeable selection strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentStrategy {
    RoundRobin,
    WorkloadBalanced,
    SkillBased,
    Hybrid,
    Flexible,
}

impl AssignmentStrategy {
    pub const fn label(self) -> &'static str {
        match self {
            AssignmentStrategy::RoundRobin => "round_robin",
            AssignmentStrategy::WorkloadBalanced => "workload_balanced",
            AssignmentStrategy::SkillBased => "skill_based",
            AssignmentStrategy::Hybrid => "hybrid",
            AssignmentStrategy::Flexible => "flexible",
        }
    }
}

/// Request-derived facts the strategies score against.
#[derive(Debug, Clone)]
pub struct AssignmentContext {
    pub product: String,
    pub budget_amount: f64,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub client_type: Option<String>,
    pub now: DateTime<Utc>,
}

impl AssignmentContext {
    pub fn from_request(request: &Request, now: DateTime<Utc>) -> Self {
        Self {
            product: request.product.clone(),
            budget_amount: parse_budget(request.budget.as_deref().unwrap_or("")),
            city: request.city.clone(),
            state: request.state.clone(),
            zip: request.zip.clone(),
            client_type: request.client_type.clone(),
            now,
        }
    }
}

/// A ranked runner-up from the flexible strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAlternative {
    pub assignee: AssigneeId,
    pub name: String,
    pub score: f64,
    pub reasons: Vec<String>,
}

/// Outcome of a selection: the chosen profile plus how and why.
#[derive(Debug, Clone)]
pub struct Selection {
    pub assignee: AssigneeProfile,
    /// Strategy that actually produced the pick after fallbacks.
    pub strategy: AssignmentStrategy,
    pub score: f64,
    pub territory: Option<TerritoryMatch>,
    pub reasons: Vec<String>,
    pub alternatives: Vec<RankedAlternative>,
}

/// Assignment engine instance. The round-robin pointer lives here, owned by
/// one engine per deployment; fairness across processes is not guaranteed.
pub struct AssignmentEngine<S, C> {
    directory: Arc<ReferenceDirectory<S>>,
    clock: Arc<C>,
    config: AssignmentConfig,
    rotation: AtomicUsize,
}

impl<S: RecordStore, C: Clock> AssignmentEngine<S, C> {
    pub fn new(
        directory: Arc<ReferenceDirectory<S>>,
        clock: Arc<C>,
        config: AssignmentConfig,
    ) -> Self {
        Self {
            directory,
            clock,
            config,
            rotation: AtomicUsize::new(0),
        }
    }

    /// Active profiles with capacity. The flexible strategy additionally
    /// requires the assignee to be reachable right now.
    fn eligible(
        &self,
        strategy: AssignmentStrategy,
        now: DateTime<Utc>,
    ) -> Result<Vec<AssigneeProfile>, DecisionError> {
        let roster = self.directory.assignees(now)?;
        let default_max = self.config.default_max_capacity;

        let candidates = roster
            .iter()
            .filter(|profile| profile.active && profile.has_capacity(default_max))
            .filter(|profile| {
                if strategy != AssignmentStrategy::Flexible {
                    return true;
                }
                profile.availability != Availability::Offline && profile.hours.covers(now)
            })
            .cloned()
            .collect();
        Ok(candidates)
    }

    /// Select an assignee without writing anything back. Returns
    /// `CapacityExhausted` when no eligible candidate exists.
    pub fn select(
        &self,
        request: &Request,
        strategy: AssignmentStrategy,
    ) -> Result<Selection, DecisionError> {
        let now = self.clock.now();
        let candidates = self.eligible(strategy, now)?;
        if candidates.is_empty() {
            return Err(DecisionError::CapacityExhausted);
        }

        let ctx = AssignmentContext::from_request(request, now);
        Ok(self.run_strategy(&candidates, &ctx, strategy))
    }

    fn run_strategy(
        &self,
        candidates: &[AssigneeProfile],
        ctx: &AssignmentContext,
        strategy: AssignmentStrategy,
    ) -> Selection {
        let default_max = self.config.default_max_capacity;

        match strategy {
            AssignmentStrategy::RoundRobin => self.pick_round_robin(candidates),
            AssignmentStrategy::WorkloadBalanced => {
                match strategies::workload_balanced(candidates, default_max) {
                    Some(index) => simple_selection(
                        candidates[index].clone(),
                        AssignmentStrategy::WorkloadBalanced,
                        1.0 - candidates[index].utilization(default_max),
                        vec!["lowest utilization".to_string()],
                    ),
                    None => self.pick_round_robin(candidates),
                }
            }
            AssignmentStrategy::SkillBased => {
                match strategies::skill_based(candidates, default_max) {
                    Some((index, score)) => simple_selection(
                        candidates[index].clone(),
                        AssignmentStrategy::SkillBased,
                        score,
                        vec!["highest combined skill score".to_string()],
                    ),
                    None => self.pick_round_robin(candidates),
                }
            }
            AssignmentStrategy::Hybrid => {
                match strategies::hybrid(candidates, &self.config.hybrid, default_max) {
                    Some((index, score)) => simple_selection(
                        candidates[index].clone(),
                        AssignmentStrategy::Hybrid,
                        score,
                        vec!["best weighted blend".to_string()],
                    ),
                    None => {
                        warn!("hybrid strategy produced no candidate, falling back to round-robin");
                        self.pick_round_robin(candidates)
                    }
                }
            }
            AssignmentStrategy::Flexible => match self.pick_flexible(candidates, ctx) {
                Some(selection) => selection,
                None => {
                    warn!("flexible strategy produced no candidate, falling back to hybrid");
                    self.run_strategy(candidates, ctx, AssignmentStrategy::Hybrid)
                }
            },
        }
    }

    fn pick_round_robin(&self, candidates: &[AssigneeProfile]) -> Selection {
        let index = strategies::round_robin(candidates, &self.rotation)
            .unwrap_or_default();
        simple_selection(
            candidates[index].clone(),
            AssignmentStrategy::RoundRobin,
            1.0,
            vec!["rotation order".to_string()],
        )
    }

    fn pick_flexible(
        &self,
        candidates: &[AssigneeProfile],
        ctx: &AssignmentContext,
    ) -> Option<Selection> {
        let territories = match self.directory.territories(ctx.now) {
            Ok(territories) => territories,
            Err(error) => {
                warn!(%error, "territory table unavailable for flexible selection");
                return None;
            }
        };

        let ranked = territory::rank_candidates(
            candidates,
            &territories,
            ctx,
            &self.config.flexible,
            &self.config.territory,
            self.config.default_max_capacity,
        );
        let best = ranked.first()?;

        let alternatives = ranked
            .iter()
            .skip(1)
            .take(3)
            .map(|evaluation| RankedAlternative {
                assignee: candidates[evaluation.index].id.clone(),
                name: candidates[evaluation.index].name.clone(),
                score: evaluation.score,
                reasons: evaluation.reasons.clone(),
            })
            .collect();

        Some(Selection {
            assignee: candidates[best.index].clone(),
            strategy: AssignmentStrategy::Flexible,
            score: best.score,
            territory: best.territory.clone(),
            reasons: best.reasons.clone(),
            alternatives,
        })
    }

    /// Select and persist: bump the cached workload counter and write the
    /// assignment back to the request record.
    pub fn assign(
        &self,
        request: &Request,
        strategy: AssignmentStrategy,
    ) -> Result<Selection, DecisionError> {
        let selection = self.select(request, strategy)?;
        let now = self.clock.now();

        self.directory.record_assignment(&selection.assignee.id);
        let patch = RequestPatch::default().with_assignment(Assignment::Assigned {
            assignee: selection.assignee.id.clone(),
            at: now,
        });
        self.directory
            .store()
            .update_request(&request.id, request.version, patch)?;

        info!(
            request = %request.id,
            assignee = %selection.assignee.id,
            strategy = selection.strategy.label(),
            score = selection.score,
            "request assigned"
        );
        Ok(selection)
    }
}

fn simple_selection(
    assignee: AssigneeProfile,
    strategy: AssignmentStrategy,
    score: f64,
    reasons: Vec<String>,
) -> Selection {
    Selection {
        assignee,
        strategy,
        score,
        territory: None,
        reasons,
        alternatives: Vec::new(),
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use crate::domain::{
        AssigneeId, AssigneeProfile, Availability, BusinessHours, ContactId, Territory,
        TerritoryBounds, TerritoryId, TerritoryKind, TerritoryPerformance, Workload,
    };

    use super::AssignmentContext;

    pub(crate) fn profile(id: &str, order: u8, current: u32, max: u32) -> AssigneeProfile {
        AssigneeProfile {
            id: AssigneeId(id.to_string()),
            name: id.to_uppercase(),
            active: true,
            priority_order: order,
            channels: Default::default(),
            contact: Some(ContactId(format!("contact-{id}"))),
            skills: BTreeMap::new(),
            territories: Vec::new(),
            availability: Availability::Available,
            hours: BusinessHours {
                start_hour: 0,
                end_hour: 24,
                weekdays_only: false,
            },
            workload: Workload {
                current_assignments: current,
                max_capacity: max,
            },
        }
    }

    pub(crate) fn territory_with(id: &str, bounds: TerritoryBounds) -> Territory {
        Territory {
            id: TerritoryId(id.to_string()),
            name: id.to_uppercase(),
            kind: TerritoryKind::Geographic,
            bounds,
            priority: 1,
            active: true,
            performance: TerritoryPerformance::default(),
        }
    }

    pub(crate) fn context_for(
        product: &str,
        budget_amount: f64,
        city: Option<&str>,
        state: Option<&str>,
        client_type: Option<&str>,
    ) -> AssignmentContext {
        AssignmentContext {
            product: product.to_string(),
            budget_amount,
            city: city.map(str::to_string),
            state: state.map(str::to_string),
            zip: None,
            client_type: client_type.map(str::to_string),
            now: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::profile;
    use super::*;
    use crate::domain::{Request, RequestId, Skill, SourcePerformance, Territory};
    use crate::store::{RequestFilter, StoreError};
    use chrono::Duration;
    use std::sync::Mutex;

    struct RosterStore {
        roster: Vec<AssigneeProfile>,
        territories: Vec<Territory>,
        updates: Mutex<Vec<(RequestId, RequestPatch)>>,
    }

    impl RosterStore {
        fn new(roster: Vec<AssigneeProfile>) -> Self {
            Self {
                roster,
                territories: Vec::new(),
                updates: Mutex::new(Vec::new()),
            }
        }
    }

    impl RecordStore for RosterStore {
        fn request(&self, _id: &RequestId) -> Result<Option<Request>, StoreError> {
            Ok(None)
        }

        fn requests(&self, _filter: &RequestFilter) -> Result<Vec<Request>, StoreError> {
            Ok(Vec::new())
        }

        fn update_request(
            &self,
            id: &RequestId,
            _expected_version: u64,
            patch: RequestPatch,
        ) -> Result<(), StoreError> {
            self.updates.lock().expect("lock").push((id.clone(), patch));
            Ok(())
        }

        fn assignees(&self) -> Result<Vec<AssigneeProfile>, StoreError> {
            Ok(self.roster.clone())
        }

        fn territories(&self) -> Result<Vec<Territory>, StoreError> {
            Ok(self.territories.clone())
        }

        fn skills(&self) -> Result<Vec<Skill>, StoreError> {
            Ok(Vec::new())
        }

        fn source_performance(&self) -> Result<Vec<SourcePerformance>, StoreError> {
            Ok(Vec::new())
        }
    }

    struct TestClock;

    impl Clock for TestClock {
        fn now(&self) -> chrono::DateTime<Utc> {
            Utc::now()
        }
    }

    fn engine(store: RosterStore) -> AssignmentEngine<RosterStore, TestClock> {
        let store = Arc::new(store);
        let directory = Arc::new(ReferenceDirectory::new(store, Duration::minutes(5)));
        AssignmentEngine::new(directory, Arc::new(TestClock), AssignmentConfig::default())
    }

    fn request() -> Request {
        let mut request = Request::new(RequestId("r-sel".to_string()), "Website", Utc::now());
        request.product = "Bathroom Remodel".to_string();
        request.budget = Some("$40,000".to_string());
        request
    }

    #[test]
    fn no_eligible_candidates_is_capacity_exhausted() {
        let mut full = profile("full", 1, 15, 15);
        full.workload.current_assignments = 15;
        let mut inactive = profile("inactive", 2, 0, 15);
        inactive.active = false;

        let engine = engine(RosterStore::new(vec![full, inactive]));
        match engine.select(&request(), AssignmentStrategy::RoundRobin) {
            Err(DecisionError::CapacityExhausted) => {}
            other => panic!("expected capacity exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn hybrid_prefers_headroom_over_seniority() {
        let engine = engine(RosterStore::new(vec![
            profile("a", 1, 9, 10),
            profile("b", 5, 1, 10),
        ]));

        let selection = engine
            .select(&request(), AssignmentStrategy::Hybrid)
            .expect("candidates available");
        assert_eq!(selection.assignee.id.0, "b");
        assert_eq!(selection.strategy, AssignmentStrategy::Hybrid);
    }

    #[test]
    fn flexible_without_territories_falls_back_to_hybrid() {
        let engine = engine(RosterStore::new(vec![
            profile("a", 1, 2, 10),
            profile("b", 5, 2, 10),
        ]));

        let selection = engine
            .select(&request(), AssignmentStrategy::Flexible)
            .expect("candidates available");
        // No territory table rows: flexible still ranks by the remaining
        // components rather than aborting.
        assert_eq!(selection.strategy, AssignmentStrategy::Flexible);
        assert_eq!(selection.assignee.id.0, "a");
    }

    #[test]
    fn assign_writes_assignment_patch_and_bumps_cached_workload() {
        let engine = engine(RosterStore::new(vec![profile("solo", 1, 0, 10)]));
        let request = request();

        let selection = engine
            .assign(&request, AssignmentStrategy::WorkloadBalanced)
            .expect("assignment succeeds");
        assert_eq!(selection.assignee.id.0, "solo");

        let store = engine.directory.store().clone();
        let updates = store.updates.lock().expect("lock");
        assert_eq!(updates.len(), 1);
        let (id, patch) = &updates[0];
        assert_eq!(id, &request.id);
        assert!(matches!(
            patch.assignment,
            Some(Assignment::Assigned { .. })
        ));

        // The cached roster sees the bumped counter without a store round-trip.
        let roster = engine
            .directory
            .assignees(Utc::now())
            .expect("roster cached");
        assert_eq!(roster[0].workload.current_assignments, 1);
    }

    #[test]
    fn round_robin_cycles_through_roster() {
        let engine = engine(RosterStore::new(vec![
            profile("a", 1, 0, 10),
            profile("b", 2, 0, 10),
            profile("c", 3, 0, 10),
        ]));
        let request = request();

        let mut seen: Vec<String> = (0..3)
            .map(|_| {
                engine
                    .select(&request, AssignmentStrategy::RoundRobin)
                    .expect("candidates available")
                    .assignee
                    .id
                    .0
            })
            .collect();
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c"]);
    }
}
