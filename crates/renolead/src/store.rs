//! Collaborator contracts: the external record store, the fire-and-forget
//! notification dispatcher, and the injectable clock. Implementations live
//! outside the engine; tests and the demo service ship in-memory shims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AssigneeId, AssigneeProfile, Assignment, Grade, Request, RequestId, RequestStatus, RiskLevel,
    Skill, SourcePerformance, StatusChange, Territory,
};

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Filter for listing requests. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestFilter {
    pub statuses: Vec<RequestStatus>,
    pub source: Option<String>,
    pub assigned_to: Option<AssigneeId>,
    pub created_before: Option<DateTime<Utc>>,
}

impl RequestFilter {
    pub fn active() -> Self {
        Self {
            statuses: vec![
                RequestStatus::New,
                RequestStatus::PendingWalkThru,
                RequestStatus::MoveToQuoting,
            ],
            ..Self::default()
        }
    }

    pub fn matches(&self, request: &Request) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&request.status) {
            return false;
        }
        if let Some(source) = &self.source {
            if !request.source.eq_ignore_ascii_case(source) {
                return false;
            }
        }
        if let Some(assignee) = &self.assigned_to {
            if self.assignment_target(request) != Some(assignee) {
                return false;
            }
        }
        if let Some(cutoff) = self.created_before {
            if request.created_at >= cutoff {
                return false;
            }
        }
        true
    }

    fn assignment_target<'a>(&self, request: &'a Request) -> Option<&'a AssigneeId> {
        request.assignment.assignee()
    }
}

/// Field-level patch applied to a request. All writes out of the engine go
/// through a patch so the store owns the full record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestPatch {
    pub status: Option<RequestStatus>,
    pub assignment: Option<Assignment>,
    pub visit_at: Option<DateTime<Utc>>,
    pub quoting_at: Option<DateTime<Utc>>,
    /// `Some(None)` clears the expiration clock, `Some(Some(_))` sets it.
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub append_history: Vec<StatusChange>,
    pub append_note: Option<String>,
    pub reactivation_count: Option<u8>,
}

impl RequestPatch {
    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_assignment(mut self, assignment: Assignment) -> Self {
        self.assignment = Some(assignment);
        self
    }

    pub fn with_history(mut self, change: StatusChange) -> Self {
        self.append_note = Some(change.note_line());
        self.append_history.push(change);
        self
    }

    pub fn with_reactivation_count(mut self, count: u8) -> Self {
        self.reactivation_count = Some(count);
        self
    }

    /// Apply the patch to an owned record, bumping its version. Store shims
    /// and tests use this; a real backend would translate the patch into a
    /// conditional field update.
    pub fn apply(&self, request: &mut Request) {
        if let Some(status) = self.status {
            request.status = status;
        }
        if let Some(assignment) = &self.assignment {
            request.assignment = assignment.clone();
        }
        if let Some(at) = self.visit_at {
            request.visit_at = Some(at);
        }
        if let Some(at) = self.quoting_at {
            request.quoting_at = Some(at);
        }
        if let Some(expires) = self.expires_at {
            request.expires_at = expires;
        }
        if let Some(at) = self.archived_at {
            request.archived_at = Some(at);
        }
        if let Some(at) = self.expired_at {
            request.expired_at = Some(at);
        }
        request.status_history.extend(self.append_history.iter().cloned());
        if let Some(note) = &self.append_note {
            if !request.notes.is_empty() {
                request.notes.push('\n');
            }
            request.notes.push_str(note);
        }
        if let Some(count) = self.reactivation_count {
            request.reactivation_count = count;
        }
        request.version += 1;
    }
}

/// Record-store abstraction. Reads are point lookups and filtered lists;
/// the only write is a version-conditional field patch.
pub trait RecordStore: Send + Sync {
    fn request(&self, id: &RequestId) -> Result<Option<Request>, StoreError>;
    fn requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, StoreError>;
    fn update_request(
        &self,
        id: &RequestId,
        expected_version: u64,
        patch: RequestPatch,
    ) -> Result<(), StoreError>;

    fn assignees(&self) -> Result<Vec<AssigneeProfile>, StoreError>;
    fn territories(&self) -> Result<Vec<Territory>, StoreError>;
    fn skills(&self) -> Result<Vec<Skill>, StoreError>;
    fn source_performance(&self) -> Result<Vec<SourcePerformance>, StoreError>;
}

/// Events emitted at decision points. Channel selection and template
/// rendering are entirely external.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NotificationEvent {
    ExpirationWarning {
        request: RequestId,
        days_remaining: i64,
        risk: RiskLevel,
    },
    Archived {
        request: RequestId,
        reason: String,
    },
    Reactivated {
        request: RequestId,
        urgent: bool,
    },
    ScoreAlert {
        request: RequestId,
        grade: Grade,
        overall: f64,
    },
}

/// A notification addressed to at most one recipient; `None` routes to the
/// team channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: Option<AssigneeId>,
    pub event: NotificationEvent,
}

/// Dispatch error; delivery is fire-and-forget, so callers mostly log these.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Trait describing the outbound notification hook.
pub trait NotificationDispatcher: Send + Sync {
    fn emit(&self, notification: Notification) -> Result<(), DispatchError>;
}

/// Injectable time source so day-based rules are deterministic in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
