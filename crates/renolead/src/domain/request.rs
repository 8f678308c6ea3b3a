use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AssigneeId, ContactId, RequestId};

/// Status alphabet for the primary sales flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    New,
    PendingWalkThru,
    MoveToQuoting,
    Archived,
    Expired,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RequestStatus::New => "New",
            RequestStatus::PendingWalkThru => "Pending walk-thru",
            RequestStatus::MoveToQuoting => "Move to Quoting",
            RequestStatus::Archived => "Archived",
            RequestStatus::Expired => "Expired",
        }
    }

    /// Statuses still moving through the pipeline and subject to expiration.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            RequestStatus::New | RequestStatus::PendingWalkThru | RequestStatus::MoveToQuoting
        )
    }

    /// Statuses a request can be reactivated out of.
    pub const fn is_dormant(self) -> bool {
        matches!(self, RequestStatus::Archived | RequestStatus::Expired)
    }
}

/// Richer status alphabet used by the case-management variant of the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseStatus {
    New,
    InReview,
    InformationGathering,
    ScopeDefinition,
    QuoteReady,
    Quoted,
    OnHold,
    Archived,
    Cancelled,
}

impl CaseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CaseStatus::New => "New",
            CaseStatus::InReview => "In Review",
            CaseStatus::InformationGathering => "Information Gathering",
            CaseStatus::ScopeDefinition => "Scope Definition",
            CaseStatus::QuoteReady => "Quote Ready",
            CaseStatus::Quoted => "Quoted",
            CaseStatus::OnHold => "On Hold",
            CaseStatus::Archived => "Archived",
            CaseStatus::Cancelled => "Cancelled",
        }
    }
}

/// What caused a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionTrigger {
    Automatic,
    Manual,
    TimeBased,
}

impl TransitionTrigger {
    pub const fn label(self) -> &'static str {
        match self {
            TransitionTrigger::Automatic => "automatic",
            TransitionTrigger::Manual => "manual",
            TransitionTrigger::TimeBased => "time_based",
        }
    }
}

/// Role of the actor issuing a transition, used for permission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorRole {
    AccountExecutive,
    Manager,
    Admin,
    System,
}

impl ActorRole {
    /// Roles allowed to force a transition past rule validation.
    pub const fn is_elevated(self) -> bool {
        matches!(self, ActorRole::Manager | ActorRole::Admin | ActorRole::System)
    }
}

/// Current assignment of a request. `Unassigned` is the synthetic sentinel
/// excluded from automatic selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assignment {
    Unassigned,
    Assigned {
        assignee: AssigneeId,
        at: DateTime<Utc>,
    },
}

impl Assignment {
    pub fn assignee(&self) -> Option<&AssigneeId> {
        match self {
            Assignment::Unassigned => None,
            Assignment::Assigned { assignee, .. } => Some(assignee),
        }
    }
}

/// One entry in a request's append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub trigger: TransitionTrigger,
    pub actor: String,
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

impl StatusChange {
    /// Render the one-line note appended to the request's free-text notes for
    /// operator display. Never parsed back.
    pub fn note_line(&self) -> String {
        let reason = self.reason.as_deref().unwrap_or("none");
        format!(
            "[{}] status '{}' -> '{}' by {} ({}), reason: {}",
            self.at.format("%Y-%m-%d %H:%M:%S"),
            self.from.label(),
            self.to.label(),
            self.actor,
            self.trigger.label(),
            reason
        )
    }
}

/// Expiration risk bucket for an active request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// A customer inquiry moving through the sales lifecycle. The record is owned
/// by the external store; the engine reads it and writes back field patches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub status: RequestStatus,
    /// Product/category label; "General" when the customer left it blank.
    pub product: String,
    /// Free-text budget as submitted, e.g. "$85,000" or "25k-40k".
    pub budget: Option<String>,
    pub source: String,
    pub assignment: Assignment,
    pub contact: Option<ContactId>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub client_type: Option<String>,
    pub message: String,
    pub attachment_count: u32,
    pub visit_requested: bool,
    pub created_at: DateTime<Utc>,
    pub visit_at: Option<DateTime<Utc>>,
    pub quoting_at: Option<DateTime<Utc>>,
    /// Set once the request enters the expiration warning window.
    pub expires_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub notes: String,
    pub status_history: Vec<StatusChange>,
    pub reactivation_count: u8,
    /// Optimistic-locking counter bumped by every store write.
    pub version: u64,
}

impl Request {
    /// Minimal constructor used by intake shims and tests; everything optional
    /// starts empty.
    pub fn new(id: RequestId, source: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            status: RequestStatus::New,
            product: "General".to_string(),
            budget: None,
            source: source.into(),
            assignment: Assignment::Unassigned,
            contact: None,
            address: None,
            city: None,
            state: None,
            zip: None,
            client_type: None,
            message: String::new(),
            attachment_count: 0,
            visit_requested: false,
            created_at,
            visit_at: None,
            quoting_at: None,
            expires_at: None,
            archived_at: None,
            expired_at: None,
            notes: String::new(),
            status_history: Vec::new(),
            reactivation_count: 0,
            version: 0,
        }
    }

    /// Whether the customer specified a product beyond the default bucket.
    pub fn has_specific_product(&self) -> bool {
        !self.product.trim().is_empty() && !self.product.trim().eq_ignore_ascii_case("general")
    }

    pub fn days_active(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn note_line_renders_transition_summary() {
        let at = Utc.with_ymd_and_hms(2025, 3, 10, 14, 30, 0).single().expect("valid timestamp");
        let change = StatusChange {
            from: RequestStatus::New,
            to: RequestStatus::PendingWalkThru,
            trigger: TransitionTrigger::Manual,
            actor: "ae-7".to_string(),
            reason: Some("walk-thru booked".to_string()),
            at,
        };

        let line = change.note_line();
        assert!(line.contains("'New' -> 'Pending walk-thru'"));
        assert!(line.contains("by ae-7 (manual)"));
        assert!(line.contains("reason: walk-thru booked"));
    }

    #[test]
    fn general_product_is_not_specific() {
        let now = Utc::now();
        let mut request = Request::new(RequestId("r-1".to_string()), "Website", now);
        assert!(!request.has_specific_product());
        request.product = "Kitchen Renovation".to_string();
        assert!(request.has_specific_product());
    }
}
