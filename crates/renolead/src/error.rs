use crate::store::{DispatchError, StoreError};

/// Error taxonomy surfaced by lifecycle and assignment operations. Scoring
/// never raises; it degrades to a manual-review score instead.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("transition '{from}' -> '{to}' rejected: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("no eligible assignee available")]
    CapacityExhausted,

    #[error("reactivation limit of {limit} reached")]
    LimitExceeded { limit: u8 },

    #[error("upstream store failure: {0}")]
    Store(#[from] StoreError),

    #[error("upstream dispatch failure: {0}")]
    Dispatch(#[from] DispatchError),
}
