use metrics_exporter_prometheus::PrometheusHandle;
use renolead::domain::{
    AssigneeId, AssigneeProfile, Availability, BusinessHours, ContactId, Request, RequestId, Skill,
    SkillCategory, SkillId, SkillRating, SourcePerformance, Territory, TerritoryBounds,
    TerritoryId, TerritoryKind, TerritoryMembership, TerritoryPerformance, TerritoryRole, Workload,
};
use renolead::store::{
    Notification, NotificationDispatcher, DispatchError, RecordStore, RequestFilter, RequestPatch,
    StoreError,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-memory store backing the demo deployment. A production deployment
/// implements `RecordStore` against the CRM backend instead.
#[derive(Default)]
pub(crate) struct InMemoryRecordStore {
    requests: Mutex<HashMap<RequestId, Request>>,
    roster: Mutex<Vec<AssigneeProfile>>,
    territories: Mutex<Vec<Territory>>,
    skills: Mutex<Vec<Skill>>,
    sources: Mutex<Vec<SourcePerformance>>,
}

impl InMemoryRecordStore {
    pub(crate) fn seeded() -> Self {
        let store = Self::default();
        *store.roster.lock().expect("store mutex poisoned") = seed_roster();
        *store.territories.lock().expect("store mutex poisoned") = seed_territories();
        *store.skills.lock().expect("store mutex poisoned") = seed_skills();
        *store.sources.lock().expect("store mutex poisoned") = seed_sources();
        store
    }

    /// Intake entry point; the decision engine itself never creates records.
    pub(crate) fn insert_request(&self, request: Request) -> Result<(), StoreError> {
        let mut guard = self.requests.lock().expect("store mutex poisoned");
        if guard.contains_key(&request.id) {
            return Err(StoreError::Unavailable(format!(
                "request '{}' already exists",
                request.id
            )));
        }
        guard.insert(request.id.clone(), request);
        Ok(())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn request(&self, id: &RequestId) -> Result<Option<Request>, StoreError> {
        let guard = self.requests.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, StoreError> {
        let guard = self.requests.lock().expect("store mutex poisoned");
        let mut matched: Vec<Request> = guard
            .values()
            .filter(|request| filter.matches(request))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matched)
    }

    fn update_request(
        &self,
        id: &RequestId,
        expected_version: u64,
        patch: RequestPatch,
    ) -> Result<(), StoreError> {
        let mut guard = self.requests.lock().expect("store mutex poisoned");
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
        Ok(self.roster.lock().expect("store mutex poisoned").clone())
    }

    fn territories(&self) -> Result<Vec<Territory>, StoreError> {
        Ok(self.territories.lock().expect("store mutex poisoned").clone())
    }

    fn skills(&self) -> Result<Vec<Skill>, StoreError> {
        Ok(self.skills.lock().expect("store mutex poisoned").clone())
    }

    fn source_performance(&self) -> Result<Vec<SourcePerformance>, StoreError> {
        Ok(self.sources.lock().expect("store mutex poisoned").clone())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryDispatcher {
    events: Mutex<Vec<Notification>>,
}

impl NotificationDispatcher for InMemoryDispatcher {
    fn emit(&self, notification: Notification) -> Result<(), DispatchError> {
        let mut guard = self.events.lock().expect("dispatcher mutex poisoned");
        guard.push(notification);
        Ok(())
    }
}

impl InMemoryDispatcher {
    pub(crate) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("dispatcher mutex poisoned").clone()
    }
}

fn assignee(
    id: &str,
    name: &str,
    order: u8,
    current: u32,
    max: u32,
    territories: Vec<TerritoryMembership>,
    skills: Vec<(&str, u8, u8)>,
) -> AssigneeProfile {
    AssigneeProfile {
        id: AssigneeId(id.to_string()),
        name: name.to_string(),
        active: true,
        priority_order: order,
        channels: Default::default(),
        contact: Some(ContactId(format!("contact-{id}"))),
        skills: skills
            .into_iter()
            .map(|(skill, proficiency, years)| {
                (
                    SkillId(skill.to_string()),
                    SkillRating {
                        proficiency,
                        years_experience: Some(years),
                        certifications: Vec::new(),
                    },
                )
            })
            .collect::<BTreeMap<_, _>>(),
        territories,
        availability: Availability::Available,
        hours: BusinessHours {
            start_hour: 8,
            end_hour: 18,
            weekdays_only: true,
        },
        workload: Workload {
            current_assignments: current,
            max_capacity: max,
        },
    }
}

fn membership(territory: &str, role: TerritoryRole) -> TerritoryMembership {
    TerritoryMembership {
        territory: TerritoryId(territory.to_string()),
        role,
        capacity: 12,
        current_load: 3,
        avg_response_minutes: Some(45),
    }
}

fn seed_roster() -> Vec<AssigneeProfile> {
    vec![
        assignee(
            "ae-fairfield",
            "Dana Whitfield",
            1,
            4,
            12,
            vec![membership("coastal-ct", TerritoryRole::Primary)],
            vec![("kitchen", 5, 9), ("addition", 4, 6)],
        ),
        assignee(
            "ae-westchester",
            "Marcus Lee",
            2,
            2,
            12,
            vec![membership("westchester", TerritoryRole::Primary)],
            vec![("bathroom", 4, 5), ("basement", 4, 7)],
        ),
        assignee(
            "ae-float",
            "Priya Raman",
            3,
            1,
            10,
            vec![
                membership("coastal-ct", TerritoryRole::Secondary),
                membership("westchester", TerritoryRole::Backup),
            ],
            vec![("kitchen", 3, 3), ("roofing", 4, 8)],
        ),
    ]
}

fn seed_territories() -> Vec<Territory> {
    vec![
        Territory {
            id: TerritoryId("coastal-ct".to_string()),
            name: "Coastal Connecticut".to_string(),
            kind: TerritoryKind::Geographic,
            bounds: TerritoryBounds {
                cities: vec![
                    "Greenwich".to_string(),
                    "Stamford".to_string(),
                    "Darien".to_string(),
                    "Westport".to_string(),
                    "Fairfield".to_string(),
                ],
                states: vec!["CT".to_string()],
                ..TerritoryBounds::default()
            },
            priority: 1,
            active: true,
            performance: TerritoryPerformance {
                completion_rate: 0.82,
                satisfaction: 4.4,
                avg_response_minutes: 38,
            },
        },
        Territory {
            id: TerritoryId("westchester".to_string()),
            name: "Westchester County".to_string(),
            kind: TerritoryKind::Geographic,
            bounds: TerritoryBounds {
                cities: vec![
                    "Scarsdale".to_string(),
                    "Rye".to_string(),
                    "White Plains".to_string(),
                ],
                states: vec!["NY".to_string()],
                ..TerritoryBounds::default()
            },
            priority: 2,
            active: true,
            performance: TerritoryPerformance {
                completion_rate: 0.76,
                satisfaction: 4.1,
                avg_response_minutes: 52,
            },
        },
        Territory {
            id: TerritoryId("large-projects".to_string()),
            name: "Large Projects Desk".to_string(),
            kind: TerritoryKind::BudgetRange,
            bounds: TerritoryBounds {
                budget_min: Some(100_000.0),
                products: vec!["Addition".to_string(), "Custom Home".to_string()],
                ..TerritoryBounds::default()
            },
            priority: 1,
            active: true,
            performance: TerritoryPerformance {
                completion_rate: 0.9,
                satisfaction: 4.7,
                avg_response_minutes: 30,
            },
        },
    ]
}

fn seed_skills() -> Vec<Skill> {
    let entries = [
        ("kitchen", "Kitchen Renovation", SkillCategory::Product),
        ("bathroom", "Bathroom Remodel", SkillCategory::Product),
        ("addition", "Home Addition", SkillCategory::Product),
        ("basement", "Basement Finishing", SkillCategory::Product),
        ("roofing", "Roofing", SkillCategory::Product),
    ];
    entries
        .into_iter()
        .map(|(id, name, category)| Skill {
            id: SkillId(id.to_string()),
            name: name.to_string(),
            category,
        })
        .collect()
}

fn seed_sources() -> Vec<SourcePerformance> {
    vec![
        SourcePerformance {
            source: "Referral".to_string(),
            reliability: 0.95,
            conversion_rate: 0.47,
        },
        SourcePerformance {
            source: "Website".to_string(),
            reliability: 0.85,
            conversion_rate: 0.32,
        },
        SourcePerformance {
            source: "Google Ads".to_string(),
            reliability: 0.7,
            conversion_rate: 0.18,
        },
        SourcePerformance {
            source: "Home Show".to_string(),
            reliability: 0.8,
            conversion_rate: 0.26,
        },
    ]
}
