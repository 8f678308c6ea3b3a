//! Decision engine for home-renovation referral leads: multi-factor scoring,
//! strategy-based assignment, and lifecycle management over an external
//! record store.

pub mod assignment;
pub mod cache;
pub mod config;
pub mod directory;
pub mod domain;
pub mod error;
pub mod lifecycle;
pub mod scoring;
pub mod service;
pub mod store;
pub mod telemetry;

pub use assignment::{AssignmentEngine, AssignmentStrategy, Selection};
pub use config::DecisionConfig;
pub use directory::ReferenceDirectory;
pub use error::DecisionError;
pub use lifecycle::LifecycleManager;
pub use scoring::LeadScoringEngine;
pub use service::{Decision, DecisionService};
pub use store::{Clock, NotificationDispatcher, RecordStore, SystemClock};
