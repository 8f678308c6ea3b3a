//! Domain model for the lead decision engine: requests moving through the
//! sales lifecycle, the account-executive roster, territory definitions, and
//! computed lead scores.

pub mod assignee;
pub mod request;
pub mod score;
pub mod territory;

use serde::{Deserialize, Serialize};

pub use assignee::{
    AssigneeProfile, Availability, BusinessHours, NotificationChannels, SkillRating,
    TerritoryMembership, TerritoryRole, Workload,
};
pub use request::{
    ActorRole, Assignment, CaseStatus, Request, RequestStatus, RiskLevel, StatusChange,
    TransitionTrigger,
};
pub use score::{FactorDetail, FactorKind, FactorScore, Grade, LeadScore, Priority};
pub use territory::{
    PartnershipTier, Skill, SkillCategory, SourcePerformance, Territory, TerritoryBounds,
    TerritoryKind, TerritoryPerformance,
};

/// Identifier wrapper for customer requests (leads).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub String);

/// Identifier wrapper for account executives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssigneeId(pub String);

/// Identifier wrapper for territories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TerritoryId(pub String);

/// Identifier wrapper for skills.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SkillId(pub String);

/// Identifier linking an assignee or request to the contact directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactId(pub String);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for AssigneeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
