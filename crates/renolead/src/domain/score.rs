use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PartnershipTier, RequestId};

/// Letter grade bucket for an overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_overall(overall: f64) -> Self {
        if overall >= 90.0 {
            Grade::A
        } else if overall >= 80.0 {
            Grade::B
        } else if overall >= 70.0 {
            Grade::C
        } else if overall >= 60.0 {
            Grade::D
        } else {
            Grade::F
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

/// Follow-up priority derived from the overall score and urgency signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
}

impl Priority {
    pub const fn label(self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub const fn is_elevated(self) -> bool {
        matches!(self, Priority::Urgent | Priority::High)
    }
}

/// The seven scoring factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactorKind {
    DataCompleteness,
    SourceQuality,
    Engagement,
    BudgetAlignment,
    ProjectComplexity,
    GeographicFit,
    Urgency,
}

impl FactorKind {
    pub const fn label(self) -> &'static str {
        match self {
            FactorKind::DataCompleteness => "data_completeness",
            FactorKind::SourceQuality => "source_quality",
            FactorKind::Engagement => "engagement",
            FactorKind::BudgetAlignment => "budget_alignment",
            FactorKind::ProjectComplexity => "project_complexity",
            FactorKind::GeographicFit => "geographic_fit",
            FactorKind::Urgency => "urgency",
        }
    }
}

/// Qualitative complexity bucket from the per-product lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplexityTier {
    Low,
    Moderate,
    High,
    Custom,
}

/// Structured detail payload carried by each factor sub-score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FactorDetail {
    Completeness {
        has_contact: bool,
        has_budget: bool,
        has_product: bool,
        has_address: bool,
        has_timeframe: bool,
    },
    Source {
        known: bool,
        reliability: f64,
        conversion_rate: f64,
        tier: PartnershipTier,
    },
    Engagement {
        has_attachments: bool,
        long_message: bool,
        visit_requested: bool,
        fresh_submission: bool,
    },
    Budget {
        specified: bool,
        amount: f64,
    },
    Complexity {
        tier: ComplexityTier,
        skills: Vec<String>,
        estimated_weeks: u8,
    },
    Geography {
        address_resolved: bool,
        premium_market: bool,
        market_strength: String,
        territory: Option<String>,
    },
    Urgency {
        keyword_hit: bool,
        visit_requested: bool,
        in_season: bool,
        urgent_timeframe: bool,
    },
}

/// One weighted sub-score within a lead score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    pub kind: FactorKind,
    /// 0 through 100.
    pub score: f64,
    pub weight: f64,
    pub detail: FactorDetail,
}

/// Computed quality score for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadScore {
    pub request: RequestId,
    /// Weighted average of the factor sub-scores, 0 through 100.
    pub overall: f64,
    pub grade: Grade,
    /// 0.0 through 0.95.
    pub conversion_probability: f64,
    pub priority: Priority,
    pub factors: Vec<FactorScore>,
    pub recommendations: Vec<String>,
    pub computed_at: DateTime<Utc>,
}

impl LeadScore {
    pub fn factor(&self, kind: FactorKind) -> Option<&FactorScore> {
        self.factors.iter().find(|factor| factor.kind == kind)
    }
}
