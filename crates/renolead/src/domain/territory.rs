use serde::{Deserialize, Serialize};

use super::{SkillId, TerritoryId};

/// What dimension a territory scopes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerritoryKind {
    Geographic,
    Product,
    ClientType,
    BudgetRange,
}

/// Boundary definition. Only the fields relevant to the territory's kind are
/// typically populated, but matching consults whatever is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerritoryBounds {
    pub cities: Vec<String>,
    pub states: Vec<String>,
    pub zips: Vec<String>,
    pub radius_miles: Option<f64>,
    pub products: Vec<String>,
    pub client_types: Vec<String>,
    pub budget_min: Option<f64>,
    pub budget_max: Option<f64>,
}

impl TerritoryBounds {
    pub fn has_geographic(&self) -> bool {
        !self.cities.is_empty() || !self.states.is_empty() || !self.zips.is_empty()
    }

    pub fn has_budget_range(&self) -> bool {
        self.budget_min.is_some() || self.budget_max.is_some()
    }
}

/// Rolling performance statistics for a territory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerritoryPerformance {
    /// 0.0 through 1.0.
    pub completion_rate: f64,
    /// 1.0 through 5.0.
    pub satisfaction: f64,
    pub avg_response_minutes: u32,
}

impl Default for TerritoryPerformance {
    fn default() -> Self {
        Self {
            completion_rate: 0.0,
            satisfaction: 3.0,
            avg_response_minutes: 0,
        }
    }
}

/// Scoping rule used to match requests to specialized assignees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Territory {
    pub id: TerritoryId,
    pub name: String,
    pub kind: TerritoryKind,
    pub bounds: TerritoryBounds,
    pub priority: u8,
    pub active: bool,
    pub performance: TerritoryPerformance,
}

/// Category for an entry in the skill catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillCategory {
    Product,
    Expertise,
    Certification,
    Territory,
    ClientType,
}

/// Entry in the skill catalog; proficiency lives on the assignee's rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub category: SkillCategory,
    pub name: String,
}

/// Partnership tier derived from a source's historical performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartnershipTier {
    Premium,
    Standard,
    New,
}

impl PartnershipTier {
    pub const fn label(self) -> &'static str {
        match self {
            PartnershipTier::Premium => "premium",
            PartnershipTier::Standard => "standard",
            PartnershipTier::New => "new",
        }
    }
}

/// Historical reliability and conversion for one lead source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePerformance {
    pub source: String,
    /// 0.0 through 1.0.
    pub reliability: f64,
    /// Historical conversion rate, 0.0 through 1.0.
    pub conversion_rate: f64,
}

impl SourcePerformance {
    /// Defaults applied when a source has no performance row yet.
    pub fn unknown(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            reliability: 0.5,
            conversion_rate: 0.2,
        }
    }

    pub fn tier(&self) -> PartnershipTier {
        if self.conversion_rate > 0.35 && self.reliability > 0.9 {
            PartnershipTier::Premium
        } else if self.conversion_rate > 0.25 && self.reliability > 0.8 {
            PartnershipTier::Standard
        } else {
            PartnershipTier::New
        }
    }
}
