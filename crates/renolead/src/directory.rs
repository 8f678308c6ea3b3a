//! TTL-cached views over the reference tables every decision consumes:
//! the assignee roster, territories, the skill catalog, and per-source
//! performance metrics.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::cache::TtlCache;
use crate::domain::{AssigneeId, AssigneeProfile, Skill, SourcePerformance, Territory};
use crate::store::{RecordStore, StoreError};

/// Cached reference data shared by the scoring and assignment engines.
pub struct ReferenceDirectory<S> {
    store: Arc<S>,
    assignees: TtlCache<Vec<AssigneeProfile>>,
    territories: TtlCache<Vec<Territory>>,
    skills: TtlCache<Vec<Skill>>,
    sources: TtlCache<HashMap<String, SourcePerformance>>,
}

impl<S: RecordStore> ReferenceDirectory<S> {
    pub fn new(store: Arc<S>, ttl: Duration) -> Self {
        Self {
            store,
            assignees: TtlCache::new(ttl),
            territories: TtlCache::new(ttl),
            skills: TtlCache::new(ttl),
            sources: TtlCache::new(ttl),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn assignees(&self, now: DateTime<Utc>) -> Result<Arc<Vec<AssigneeProfile>>, StoreError> {
        self.assignees.get_or_refresh(now, || self.store.assignees())
    }

    pub fn territories(&self, now: DateTime<Utc>) -> Result<Arc<Vec<Territory>>, StoreError> {
        self.territories.get_or_refresh(now, || self.store.territories())
    }

    pub fn skills(&self, now: DateTime<Utc>) -> Result<Arc<Vec<Skill>>, StoreError> {
        self.skills.get_or_refresh(now, || self.store.skills())
    }

    /// Look up performance for one source, case-insensitively. `None` means
    /// the source has no history yet; callers apply the unknown-source
    /// defaults.
    pub fn source_performance(
        &self,
        now: DateTime<Utc>,
        source: &str,
    ) -> Result<Option<SourcePerformance>, StoreError> {
        let table = self.sources.get_or_refresh(now, || {
            let rows = self.store.source_performance()?;
            Ok::<_, StoreError>(
                rows.into_iter()
                    .map(|row| (row.source.to_ascii_lowercase(), row))
                    .collect(),
            )
        })?;
        Ok(table.get(&source.to_ascii_lowercase()).cloned())
    }

    /// Bump the cached workload counter after a successful pick so later
    /// selections within the TTL window see the new load.
    pub fn record_assignment(&self, assignee: &AssigneeId) {
        self.assignees.mutate(|profiles| {
            if let Some(profile) = profiles.iter_mut().find(|profile| &profile.id == assignee) {
                profile.workload.current_assignments += 1;
            }
        });
    }

    pub fn invalidate(&self) {
        self.assignees.invalidate();
        self.territories.invalidate();
        self.skills.invalidate();
        self.sources.invalidate();
    }
}
