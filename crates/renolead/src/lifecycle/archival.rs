//! Closed taxonomy of archival reasons. Every archive write must carry one of
//! these identifiers; free-text reasons are rejected so reporting stays
//! queryable.

use serde::{Deserialize, Serialize};

/// Reason identifier used when the engine expires and archives a lead on its
/// own. Kept distinct from manual reasons so automated closures are auditable.
pub const EXPIRED_AUTOMATIC: &str = "expired_automatic";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCategory {
    Completed,
    Cancelled,
    Expired,
    Duplicate,
    Unqualified,
    Other,
}

impl ReasonCategory {
    pub const fn label(self) -> &'static str {
        match self {
            ReasonCategory::Completed => "completed",
            ReasonCategory::Cancelled => "cancelled",
            ReasonCategory::Expired => "expired",
            ReasonCategory::Duplicate => "duplicate",
            ReasonCategory::Unqualified => "unqualified",
            ReasonCategory::Other => "other",
        }
    }
}

/// One entry in the taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArchivalReason {
    pub id: &'static str,
    pub category: ReasonCategory,
    pub description: &'static str,
    /// Reasons that are meaningless without operator context demand notes.
    pub requires_notes: bool,
}

const TAXONOMY: &[ArchivalReason] = &[
    ArchivalReason {
        id: "completed_won",
        category: ReasonCategory::Completed,
        description: "Quote accepted, converted to a project",
        requires_notes: false,
    },
    ArchivalReason {
        id: "completed_quoted",
        category: ReasonCategory::Completed,
        description: "Quote delivered, customer went elsewhere",
        requires_notes: false,
    },
    ArchivalReason {
        id: "cancelled_customer",
        category: ReasonCategory::Cancelled,
        description: "Customer withdrew the inquiry",
        requires_notes: true,
    },
    ArchivalReason {
        id: "cancelled_no_response",
        category: ReasonCategory::Cancelled,
        description: "Customer stopped responding",
        requires_notes: false,
    },
    ArchivalReason {
        id: EXPIRED_AUTOMATIC,
        category: ReasonCategory::Expired,
        description: "Closed automatically after the inactivity window",
        requires_notes: false,
    },
    ArchivalReason {
        id: "expired_manual",
        category: ReasonCategory::Expired,
        description: "Closed by an operator as stale",
        requires_notes: false,
    },
    ArchivalReason {
        id: "duplicate",
        category: ReasonCategory::Duplicate,
        description: "Duplicate of another request",
        requires_notes: true,
    },
    ArchivalReason {
        id: "unqualified_budget",
        category: ReasonCategory::Unqualified,
        description: "Budget below the serviceable minimum",
        requires_notes: false,
    },
    ArchivalReason {
        id: "unqualified_scope",
        category: ReasonCategory::Unqualified,
        description: "Work outside the service offering",
        requires_notes: false,
    },
    ArchivalReason {
        id: "other",
        category: ReasonCategory::Other,
        description: "None of the above",
        requires_notes: true,
    },
];

/// The full taxonomy, in display order.
pub fn taxonomy() -> &'static [ArchivalReason] {
    TAXONOMY
}

/// Look up a reason by identifier. Matching is case-insensitive; identifiers
/// are stored lowercased.
pub fn reason(id: &str) -> Option<&'static ArchivalReason> {
    TAXONOMY
        .iter()
        .find(|entry| entry.id.eq_ignore_ascii_case(id.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_unique() {
        for (i, a) in TAXONOMY.iter().enumerate() {
            for b in &TAXONOMY[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let entry = reason(" Completed_Won ").expect("known reason");
        assert_eq!(entry.category, ReasonCategory::Completed);
        assert!(!entry.requires_notes);
    }

    #[test]
    fn automatic_expiration_reason_is_declared() {
        let entry = reason(EXPIRED_AUTOMATIC).expect("declared");
        assert_eq!(entry.category, ReasonCategory::Expired);
        assert!(!entry.requires_notes);
    }

    #[test]
    fn context_free_reasons_demand_notes() {
        assert!(reason("duplicate").expect("declared").requires_notes);
        assert!(reason("other").expect("declared").requires_notes);
    }
}
