//! Integration specifications for time-based lifecycle enforcement: warning
//! scans, automatic expiration sweeps, per-source rule overrides, and the
//! reactivation ceiling, all driven by a fixed clock.

mod common {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use renolead::domain::{
        AssigneeProfile, Request, RequestId, Skill, SourcePerformance, Territory,
    };
    use renolead::store::{
        Clock, DispatchError, Notification, NotificationDispatcher, RecordStore, RequestFilter,
        RequestPatch, StoreError,
    };

    pub(super) struct FixedClock(pub DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    pub(super) fn sweep_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 6, 0, 0).single().expect("valid timestamp")
    }

    #[derive(Default)]
    pub(super) struct TestStore {
        pub(super) requests: Mutex<HashMap<RequestId, Request>>,
    }

    impl TestStore {
        pub(super) fn insert(&self, request: Request) {
            self.requests
                .lock()
                .expect("store mutex poisoned")
                .insert(request.id.clone(), request);
        }

        pub(super) fn get(&self, id: &str) -> Request {
            self.requests
                .lock()
                .expect("store mutex poisoned")
                .get(&RequestId(id.to_string()))
                .cloned()
                .expect("request present")
        }
    }

    impl RecordStore for TestStore {
        fn request(&self, id: &RequestId) -> Result<Option<Request>, StoreError> {
            Ok(self.requests.lock().expect("store mutex poisoned").get(id).cloned())
        }

        fn requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, StoreError> {
            let mut matched: Vec<Request> = self
                .requests
                .lock()
                .expect("store mutex poisoned")
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
            Ok(Vec::new())
        }

        fn territories(&self) -> Result<Vec<Territory>, StoreError> {
            Ok(Vec::new())
        }

        fn skills(&self) -> Result<Vec<Skill>, StoreError> {
            Ok(Vec::new())
        }

        fn source_performance(&self) -> Result<Vec<SourcePerformance>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    pub(super) struct TestDispatcher {
        pub(super) sent: Mutex<Vec<Notification>>,
    }

    impl TestDispatcher {
        pub(super) fn events(&self) -> Vec<Notification> {
            self.sent.lock().expect("dispatcher mutex poisoned").clone()
        }
    }

    impl NotificationDispatcher for TestDispatcher {
        fn emit(&self, notification: Notification) -> Result<(), DispatchError> {
            self.sent.lock().expect("dispatcher mutex poisoned").push(notification);
            Ok(())
        }
    }

    /// A request created `days_ago` days before the sweep time.
    pub(super) fn aged(id: &str, source: &str, days_ago: i64) -> Request {
        Request::new(
            RequestId(id.to_string()),
            source,
            sweep_time() - Duration::days(days_ago),
        )
    }
}

use std::sync::Arc;

use common::{aged, sweep_time, FixedClock, TestDispatcher, TestStore};
use renolead::config::{DecisionConfig, SourceRuleOverride};
use renolead::domain::{ActorRole, RequestId, RequestStatus, RiskLevel};
use renolead::error::DecisionError;
use renolead::lifecycle::EXPIRED_AUTOMATIC;
use renolead::service::DecisionService;
use renolead::store::NotificationEvent;

type Service = DecisionService<TestStore, TestDispatcher, FixedClock>;

fn service(config: DecisionConfig) -> (Arc<TestStore>, Arc<TestDispatcher>, Service) {
    let store = Arc::new(TestStore::default());
    let dispatcher = Arc::new(TestDispatcher::default());
    let service = DecisionService::new(
        Arc::clone(&store),
        Arc::clone(&dispatcher),
        Arc::new(FixedClock(sweep_time())),
        config,
    )
    .expect("config valid");
    (store, dispatcher, service)
}

#[test]
fn warning_scan_buckets_leads_by_remaining_time() {
    let (store, dispatcher, service) = service(DecisionConfig::default());
    store.insert(aged("fresh", "Website", 2));
    store.insert(aged("aging", "Website", 9));
    store.insert(aged("closing", "Website", 12));
    store.insert(aged("overdue", "Website", 20));

    let report = service.lifecycle().check_expirations().expect("scan succeeds");

    assert_eq!(report.scanned, 4);
    // "fresh" has 12 days left and stays out of the at-risk list.
    assert_eq!(report.at_risk.len(), 3);
    let risk_of = |id: &str| {
        report
            .at_risk
            .iter()
            .find(|assessment| assessment.request.0 == id)
            .map(|assessment| assessment.risk)
    };
    assert_eq!(risk_of("aging"), Some(RiskLevel::Medium));
    assert_eq!(risk_of("closing"), Some(RiskLevel::High));
    assert_eq!(risk_of("overdue"), Some(RiskLevel::Critical));

    // Only leads inside the 3-day warning window trigger a notification.
    assert_eq!(report.warnings_sent, 2);
    let warned: Vec<_> = dispatcher
        .events()
        .into_iter()
        .filter_map(|notification| match notification.event {
            NotificationEvent::ExpirationWarning { request, .. } => Some(request.0),
            _ => None,
        })
        .collect();
    assert_eq!(warned, vec!["closing".to_string(), "overdue".to_string()]);
}

#[test]
fn warning_is_sent_once_per_lead() {
    let (store, dispatcher, service) = service(DecisionConfig::default());
    store.insert(aged("closing", "Website", 12));

    let first = service.lifecycle().check_expirations().expect("scan succeeds");
    assert_eq!(first.warnings_sent, 1);
    assert!(store.get("closing").expires_at.is_some());

    let second = service.lifecycle().check_expirations().expect("scan succeeds");
    assert_eq!(second.warnings_sent, 0);
    assert_eq!(dispatcher.events().len(), 1);
}

#[test]
fn sweep_expires_and_auto_archives_overdue_leads() {
    let (store, _, service) = service(DecisionConfig::default());
    store.insert(aged("current", "Website", 5));
    store.insert(aged("overdue", "Website", 20));

    let outcome = service
        .lifecycle()
        .process_automatic_expirations()
        .expect("sweep succeeds");

    assert_eq!(outcome.scanned, 2);
    assert!(outcome.expired.is_empty());
    assert_eq!(outcome.archived, vec![RequestId("overdue".to_string())]);

    let archived = store.get("overdue");
    assert_eq!(archived.status, RequestStatus::Archived);
    assert!(archived.expired_at.is_some());
    assert!(archived.archived_at.is_some());
    // Two audit entries: the time-based expiration, then the automatic archive.
    assert_eq!(archived.status_history.len(), 2);
    assert!(archived.notes.contains(EXPIRED_AUTOMATIC));

    assert_eq!(store.get("current").status, RequestStatus::New);
}

#[test]
fn sweep_without_auto_archive_leaves_leads_expired() {
    let mut config = DecisionConfig::default();
    config.lifecycle.auto_archive_expired = false;
    let (store, _, service) = service(config);
    store.insert(aged("overdue", "Website", 20));

    let outcome = service
        .lifecycle()
        .process_automatic_expirations()
        .expect("sweep succeeds");

    assert_eq!(outcome.expired, vec![RequestId("overdue".to_string())]);
    assert!(outcome.archived.is_empty());
    assert_eq!(store.get("overdue").status, RequestStatus::Expired);
}

#[test]
fn source_overrides_extend_or_disable_the_window() {
    let mut config = DecisionConfig::default();
    config.lifecycle.source_overrides.insert(
        "Referral".to_string(),
        SourceRuleOverride {
            expiration_days: Some(30),
            ..SourceRuleOverride::default()
        },
    );
    config.lifecycle.source_overrides.insert(
        "Partner Feed".to_string(),
        SourceRuleOverride {
            expiration_disabled: Some(true),
            ..SourceRuleOverride::default()
        },
    );
    let (store, _, service) = service(config);
    store.insert(aged("referral", "referral", 20));
    store.insert(aged("partner", "PARTNER FEED", 90));
    store.insert(aged("website", "Website", 20));

    let outcome = service
        .lifecycle()
        .process_automatic_expirations()
        .expect("sweep succeeds");

    assert_eq!(outcome.skipped_disabled, 1);
    assert_eq!(outcome.archived, vec![RequestId("website".to_string())]);

    // Referral leads get the extended 30-day window and survive at day 20.
    assert_eq!(store.get("referral").status, RequestStatus::New);
    assert_eq!(store.get("partner").status, RequestStatus::New);
    assert_eq!(store.get("website").status, RequestStatus::Archived);
}

#[test]
fn reactivation_stops_at_the_configured_ceiling() {
    let (store, _, service) = service(DecisionConfig::default());
    let mut lead = aged("boomerang", "Website", 5);
    lead.reactivation_count = 3;
    lead.status = RequestStatus::Archived;
    store.insert(lead);

    let result = service.lifecycle().reactivate_lead(
        &RequestId("boomerang".to_string()),
        None,
        ActorRole::Manager,
        "mgr-1",
        None,
    );

    match result {
        Err(DecisionError::LimitExceeded { limit }) => assert_eq!(limit, 3),
        other => panic!("expected the reactivation ceiling, got {other:?}"),
    }
    assert_eq!(store.get("boomerang").status, RequestStatus::Archived);
}

#[test]
fn bulk_archive_dry_run_reports_without_writing() {
    let (store, _, service) = service(DecisionConfig::default());
    store.insert(aged("a", "Website", 5));
    store.insert(aged("b", "Website", 6));

    let ids = vec![
        RequestId("a".to_string()),
        RequestId("b".to_string()),
        RequestId("ghost".to_string()),
    ];
    let report = service
        .lifecycle()
        .bulk_archive(
            &ids,
            "cancelled_no_response",
            None,
            ActorRole::Manager,
            "mgr-1",
            true,
        )
        .expect("reason is in the taxonomy");

    assert!(report.dry_run);
    assert_eq!(report.archived_count(), 2);
    assert_eq!(store.get("a").status, RequestStatus::New);
    assert_eq!(store.get("b").status, RequestStatus::New);

    let wet = service
        .lifecycle()
        .bulk_archive(
            &ids,
            "cancelled_no_response",
            None,
            ActorRole::Manager,
            "mgr-1",
            false,
        )
        .expect("reason is in the taxonomy");
    assert_eq!(wet.archived_count(), 2);
    assert_eq!(store.get("a").status, RequestStatus::Archived);
    assert_eq!(store.get("b").status, RequestStatus::Archived);
}
