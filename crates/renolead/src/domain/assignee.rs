use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::{AssigneeId, ContactId, SkillId, TerritoryId};

/// Availability state reported by the assignee directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    Available,
    Busy,
    Offline,
}

/// Proficiency and supporting evidence for one skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRating {
    /// 1 (novice) through 5 (expert).
    pub proficiency: u8,
    pub years_experience: Option<u8>,
    pub certifications: Vec<String>,
}

/// Role an assignee plays inside a territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerritoryRole {
    Primary,
    Secondary,
    Backup,
}

/// Membership of an assignee in one territory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryMembership {
    pub territory: TerritoryId,
    pub role: TerritoryRole,
    pub capacity: u32,
    pub current_load: u32,
    pub avg_response_minutes: Option<u32>,
}

/// Channels the assignee has opted into for notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannels {
    pub email: bool,
    pub sms: bool,
}

/// Business-hours window evaluated against the injected clock. Hours are in
/// the deployment's canonical timezone (UTC in this engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    pub start_hour: u32,
    pub end_hour: u32,
    pub weekdays_only: bool,
}

impl BusinessHours {
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        if self.weekdays_only && at.weekday().number_from_monday() > 5 {
            return false;
        }
        let hour = at.hour();
        hour >= self.start_hour && hour < self.end_hour
    }
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            start_hour: 8,
            end_hour: 18,
            weekdays_only: true,
        }
    }
}

/// Snapshot of an assignee's current load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    pub current_assignments: u32,
    /// Zero means "use the configured default capacity".
    pub max_capacity: u32,
}

impl Workload {
    pub fn utilization(&self, default_max: u32) -> f64 {
        let max = if self.max_capacity == 0 {
            default_max
        } else {
            self.max_capacity
        };
        if max == 0 {
            return 1.0;
        }
        f64::from(self.current_assignments) / f64::from(max)
    }
}

/// Account-executive profile as cached from the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssigneeProfile {
    pub id: AssigneeId,
    pub name: String,
    pub active: bool,
    /// Lower is more senior and wins workload ties.
    pub priority_order: u8,
    pub channels: NotificationChannels,
    pub contact: Option<ContactId>,
    pub skills: BTreeMap<SkillId, SkillRating>,
    pub territories: Vec<TerritoryMembership>,
    pub availability: Availability,
    pub hours: BusinessHours,
    pub workload: Workload,
}

impl AssigneeProfile {
    pub fn utilization(&self, default_max: u32) -> f64 {
        self.workload.utilization(default_max)
    }

    pub fn has_capacity(&self, default_max: u32) -> bool {
        self.utilization(default_max) < 1.0
    }
}
