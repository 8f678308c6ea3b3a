//! Lifecycle management: validated status transitions, expiration sweeps,
//! archival with a closed reason taxonomy, and limited reactivation.

pub mod archival;
pub mod transitions;

pub use archival::{reason, taxonomy, ArchivalReason, ReasonCategory, EXPIRED_AUTOMATIC};
pub use transitions::{
    case_flow, primary_flow, RequiredField, StatusMachine, TransitionContext, TransitionRule,
    Validated,
};

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{ConfigError, LifecycleRules};
use crate::domain::{
    ActorRole, AssigneeId, Assignment, Request, RequestId, RequestStatus, RiskLevel, StatusChange,
    TransitionTrigger,
};
use crate::error::DecisionError;
use crate::scoring::LeadScoringEngine;
use crate::store::{
    Clock, Notification, NotificationDispatcher, NotificationEvent, RecordStore, RequestFilter,
    RequestPatch,
};

/// One requested status change, validated against the rule table before any
/// write happens.
#[derive(Debug, Clone, Copy)]
pub struct TransitionCommand<'a> {
    pub to: RequestStatus,
    pub trigger: TransitionTrigger,
    pub actor: ActorRole,
    /// Identifier recorded in the audit trail, e.g. "ae-7" or "system".
    pub actor_label: &'a str,
    pub reason: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub force: bool,
}

impl<'a> TransitionCommand<'a> {
    pub fn manual(to: RequestStatus, actor: ActorRole, actor_label: &'a str) -> Self {
        Self {
            to,
            trigger: TransitionTrigger::Manual,
            actor,
            actor_label,
            reason: None,
            notes: None,
            force: false,
        }
    }
}

/// Expiration outlook for one active request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpirationAssessment {
    pub request: RequestId,
    pub source: String,
    pub expires_on: DateTime<Utc>,
    pub days_remaining: i64,
    pub risk: RiskLevel,
    pub in_warning_window: bool,
}

/// Result of a warning scan over the active pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpirationReport {
    pub scanned: usize,
    pub at_risk: Vec<ExpirationAssessment>,
    pub warnings_sent: usize,
}

/// Result of an enforcement sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub scanned: usize,
    /// Flagged `Expired` and left for manual follow-up.
    pub expired: Vec<RequestId>,
    /// Expired and archived in the same sweep.
    pub archived: Vec<RequestId>,
    pub skipped_disabled: usize,
}

/// Per-item outcome of a bulk archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BulkItemOutcome {
    Archived,
    WouldArchive,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkArchiveReport {
    pub dry_run: bool,
    pub items: Vec<(RequestId, BulkItemOutcome)>,
}

impl BulkArchiveReport {
    pub fn archived_count(&self) -> usize {
        self.items
            .iter()
            .filter(|(_, outcome)| {
                matches!(outcome, BulkItemOutcome::Archived | BulkItemOutcome::WouldArchive)
            })
            .count()
    }
}

/// Lifecycle manager over the primary sales flow. Owns the rule table and the
/// effective per-source windows; all writes go through version-conditional
/// patches.
pub struct LifecycleManager<S, D, C> {
    store: Arc<S>,
    dispatcher: Arc<D>,
    clock: Arc<C>,
    scoring: Arc<LeadScoringEngine<S, C>>,
    rules: LifecycleRules,
    machine: StatusMachine<RequestStatus>,
}

impl<S: RecordStore, C: Clock, D: NotificationDispatcher> LifecycleManager<S, D, C> {
    pub fn new(
        store: Arc<S>,
        dispatcher: Arc<D>,
        clock: Arc<C>,
        scoring: Arc<LeadScoringEngine<S, C>>,
        rules: LifecycleRules,
    ) -> Result<Self, ConfigError> {
        rules.validate()?;
        let machine = primary_flow(rules.expiration_days);
        Ok(Self {
            store,
            dispatcher,
            clock,
            scoring,
            rules,
            machine,
        })
    }

    pub fn rules(&self) -> &LifecycleRules {
        &self.rules
    }

    /// Execute a validated status transition and return the updated record.
    /// A no-op transition returns the record unchanged.
    pub fn transition(
        &self,
        id: &RequestId,
        command: TransitionCommand<'_>,
    ) -> Result<Request, DecisionError> {
        let request = self.load(id)?;
        let ctx = TransitionContext {
            force: command.force,
            archive_reason: if command.to == RequestStatus::Archived {
                command.reason
            } else {
                None
            },
            notes: command.notes,
            has_assignee: request.assignment.assignee().is_some(),
        };

        let validated =
            self.machine
                .validate(request.status, command.to, command.trigger, command.actor, &ctx)?;
        if validated == Validated::NoOp {
            return Ok(request);
        }
        if validated == Validated::Forced {
            warn!(
                request = %id,
                from = request.status.label(),
                to = command.to.label(),
                actor = command.actor_label,
                "forced transition past rule validation"
            );
        }

        let now = self.clock.now();
        let patch = self.transition_patch(&request, &command, now);
        self.apply(request, patch)
    }

    /// Assess one request's expiration outlook. `None` for dormant requests
    /// and for sources with expiration disabled.
    pub fn classify(&self, request: &Request, now: DateTime<Utc>) -> Option<ExpirationAssessment> {
        if !request.status.is_active() {
            return None;
        }
        let effective = self.rules.for_source(&request.source);
        if effective.expiration_disabled {
            return None;
        }

        let expires_on = last_activity(request) + Duration::days(effective.expiration_days);
        let days_remaining = (expires_on - now).num_days();
        let risk = if days_remaining <= 0 {
            RiskLevel::Critical
        } else if days_remaining <= effective.warning_days {
            RiskLevel::High
        } else if days_remaining <= effective.warning_days * 2 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        Some(ExpirationAssessment {
            request: request.id.clone(),
            source: request.source.clone(),
            expires_on,
            days_remaining,
            risk,
            in_warning_window: days_remaining <= effective.warning_days,
        })
    }

    /// Scan the active pipeline and send a warning for every request that has
    /// newly entered its warning window. The `expires_at` marker records that
    /// the warning went out, so repeat scans stay quiet.
    pub fn check_expirations(&self) -> Result<ExpirationReport, DecisionError> {
        let now = self.clock.now();
        let active = self.store.requests(&RequestFilter::active())?;
        let mut report = ExpirationReport {
            scanned: active.len(),
            ..ExpirationReport::default()
        };

        for request in active {
            let Some(assessment) = self.classify(&request, now) else {
                continue;
            };
            if assessment.risk >= RiskLevel::Medium {
                report.at_risk.push(assessment.clone());
            }
            if !assessment.in_warning_window || request.expires_at.is_some() {
                continue;
            }

            let mut patch = RequestPatch::default();
            patch.expires_at = Some(Some(assessment.expires_on));
            if let Err(error) = self.store.update_request(&request.id, request.version, patch) {
                warn!(request = %request.id, %error, "failed to record expiration warning marker");
                continue;
            }

            self.notify(Notification {
                recipient: request.assignment.assignee().cloned(),
                event: NotificationEvent::ExpirationWarning {
                    request: request.id.clone(),
                    days_remaining: assessment.days_remaining,
                    risk: assessment.risk,
                },
            });
            report.warnings_sent += 1;
        }

        Ok(report)
    }

    /// Expire every overdue active request. Sources with auto-archive enabled
    /// go straight through `Expired` into `Archived` with the automatic
    /// reason; otherwise the request is flagged `Expired` for manual review.
    pub fn process_automatic_expirations(&self) -> Result<SweepOutcome, DecisionError> {
        let now = self.clock.now();
        let active = self.store.requests(&RequestFilter::active())?;
        let mut outcome = SweepOutcome {
            scanned: active.len(),
            ..SweepOutcome::default()
        };

        for request in active {
            let effective = self.rules.for_source(&request.source);
            if effective.expiration_disabled {
                outcome.skipped_disabled += 1;
                continue;
            }
            let Some(assessment) = self.classify(&request, now) else {
                continue;
            };
            if assessment.days_remaining > 0 {
                continue;
            }

            let id = request.id.clone();
            let expire = TransitionCommand {
                to: RequestStatus::Expired,
                trigger: TransitionTrigger::TimeBased,
                actor: ActorRole::System,
                actor_label: "system",
                reason: Some("inactivity window elapsed"),
                notes: None,
                force: false,
            };

            let expired = match self.execute(request, expire, now) {
                Ok(expired) => expired,
                Err(error) => {
                    warn!(request = %id, %error, "expiration transition failed, skipping");
                    continue;
                }
            };

            if !effective.auto_archive_expired {
                info!(request = %id, "request expired, awaiting manual archive");
                outcome.expired.push(id);
                continue;
            }

            let archive = TransitionCommand {
                to: RequestStatus::Archived,
                trigger: TransitionTrigger::Automatic,
                actor: ActorRole::System,
                actor_label: "system",
                reason: Some(EXPIRED_AUTOMATIC),
                notes: None,
                force: false,
            };
            match self.execute(expired, archive, now) {
                Ok(archived) => {
                    self.notify(Notification {
                        recipient: archived.assignment.assignee().cloned(),
                        event: NotificationEvent::Archived {
                            request: id.clone(),
                            reason: EXPIRED_AUTOMATIC.to_string(),
                        },
                    });
                    info!(request = %id, "request expired and auto-archived");
                    outcome.archived.push(id);
                }
                Err(error) => {
                    warn!(request = %id, %error, "auto-archive failed, left in expired state");
                    outcome.expired.push(id);
                }
            }
        }

        Ok(outcome)
    }

    /// Archive a request with a taxonomy reason. Unknown reasons and missing
    /// required notes are rejected before any write.
    pub fn archive_lead(
        &self,
        id: &RequestId,
        reason_id: &str,
        notes: Option<&str>,
        actor: ActorRole,
        actor_label: &str,
    ) -> Result<Request, DecisionError> {
        let entry = archival::reason(reason_id).ok_or_else(|| {
            DecisionError::Validation(format!("unknown archival reason '{reason_id}'"))
        })?;
        let has_notes = notes.map(|n| !n.trim().is_empty()).unwrap_or(false);
        if entry.requires_notes && !has_notes {
            return Err(DecisionError::Validation(format!(
                "archival reason '{}' requires notes",
                entry.id
            )));
        }

        let request = self.load(id)?;
        if request.status == RequestStatus::Archived {
            return Err(DecisionError::InvalidTransition {
                from: request.status.label().to_string(),
                to: RequestStatus::Archived.label().to_string(),
                reason: "request is already archived".to_string(),
            });
        }

        let command = TransitionCommand {
            to: RequestStatus::Archived,
            trigger: TransitionTrigger::Manual,
            actor,
            actor_label,
            reason: Some(entry.id),
            notes,
            force: false,
        };
        let archived = self.execute(request, command, self.clock.now())?;

        self.notify(Notification {
            recipient: archived.assignment.assignee().cloned(),
            event: NotificationEvent::Archived {
                request: id.clone(),
                reason: entry.id.to_string(),
            },
        });
        info!(request = %id, reason = entry.id, "request archived");
        Ok(archived)
    }

    /// Bring a dormant request back into the pipeline as `New`. Bounded by
    /// the configured reactivation limit. The assignment is rebuilt from
    /// `new_assignee`; `None` returns the request to the unassigned pool.
    pub fn reactivate_lead(
        &self,
        id: &RequestId,
        reason: Option<&str>,
        actor: ActorRole,
        actor_label: &str,
        new_assignee: Option<AssigneeId>,
    ) -> Result<Request, DecisionError> {
        let request = self.load(id)?;
        if !request.status.is_dormant() {
            return Err(DecisionError::InvalidTransition {
                from: request.status.label().to_string(),
                to: RequestStatus::New.label().to_string(),
                reason: "only archived or expired requests can be reactivated".to_string(),
            });
        }
        if request.reactivation_count >= self.rules.max_reactivations {
            return Err(DecisionError::LimitExceeded {
                limit: self.rules.max_reactivations,
            });
        }

        let now = self.clock.now();
        let command = TransitionCommand {
            to: RequestStatus::New,
            trigger: TransitionTrigger::Manual,
            actor,
            actor_label,
            reason: Some(reason.unwrap_or("reactivation")),
            notes: None,
            force: false,
        };
        let mut patch = self.transition_patch(&request, &command, now);
        patch = patch.with_reactivation_count(request.reactivation_count + 1);
        patch = patch.with_assignment(match new_assignee {
            Some(assignee) => Assignment::Assigned { assignee, at: now },
            None => Assignment::Unassigned,
        });
        let count = request.reactivation_count + 1;
        let reactivated = self.apply(request, patch)?;

        let score = self.scoring.score(&reactivated);
        self.notify(Notification {
            recipient: reactivated.assignment.assignee().cloned(),
            event: NotificationEvent::Reactivated {
                request: id.clone(),
                urgent: score.priority.is_elevated(),
            },
        });
        info!(request = %id, reactivation = count, "request reactivated");
        Ok(reactivated)
    }

    /// Archive many requests under one reason. With `dry_run` nothing is
    /// written; each item reports whether it would pass validation.
    pub fn bulk_archive(
        &self,
        ids: &[RequestId],
        reason_id: &str,
        notes: Option<&str>,
        actor: ActorRole,
        actor_label: &str,
        dry_run: bool,
    ) -> Result<BulkArchiveReport, DecisionError> {
        let entry = archival::reason(reason_id).ok_or_else(|| {
            DecisionError::Validation(format!("unknown archival reason '{reason_id}'"))
        })?;
        let has_notes = notes.map(|n| !n.trim().is_empty()).unwrap_or(false);
        if entry.requires_notes && !has_notes {
            return Err(DecisionError::Validation(format!(
                "archival reason '{}' requires notes",
                entry.id
            )));
        }

        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            let outcome = if dry_run {
                match self.validate_archive(id, entry.id, notes, actor) {
                    Ok(()) => BulkItemOutcome::WouldArchive,
                    Err(error) => BulkItemOutcome::Failed {
                        error: error.to_string(),
                    },
                }
            } else {
                match self.archive_lead(id, entry.id, notes, actor, actor_label) {
                    Ok(_) => BulkItemOutcome::Archived,
                    Err(error) => BulkItemOutcome::Failed {
                        error: error.to_string(),
                    },
                }
            };
            items.push((id.clone(), outcome));
        }

        Ok(BulkArchiveReport { dry_run, items })
    }

    fn validate_archive(
        &self,
        id: &RequestId,
        reason_id: &str,
        notes: Option<&str>,
        actor: ActorRole,
    ) -> Result<(), DecisionError> {
        let request = self.load(id)?;
        if request.status == RequestStatus::Archived {
            return Err(DecisionError::InvalidTransition {
                from: request.status.label().to_string(),
                to: RequestStatus::Archived.label().to_string(),
                reason: "request is already archived".to_string(),
            });
        }
        let ctx = TransitionContext {
            force: false,
            archive_reason: Some(reason_id),
            notes,
            has_assignee: request.assignment.assignee().is_some(),
        };
        self.machine
            .validate(
                request.status,
                RequestStatus::Archived,
                TransitionTrigger::Manual,
                actor,
                &ctx,
            )
            .map(|_| ())
    }

    fn load(&self, id: &RequestId) -> Result<Request, DecisionError> {
        self.store
            .request(id)?
            .ok_or_else(|| DecisionError::NotFound(id.0.clone()))
    }

    fn execute(
        &self,
        request: Request,
        command: TransitionCommand<'_>,
        now: DateTime<Utc>,
    ) -> Result<Request, DecisionError> {
        let ctx = TransitionContext {
            force: command.force,
            archive_reason: if command.to == RequestStatus::Archived {
                command.reason
            } else {
                None
            },
            notes: command.notes,
            has_assignee: request.assignment.assignee().is_some(),
        };
        self.machine
            .validate(request.status, command.to, command.trigger, command.actor, &ctx)?;
        let patch = self.transition_patch(&request, &command, now);
        self.apply(request, patch)
    }

    fn transition_patch(
        &self,
        request: &Request,
        command: &TransitionCommand<'_>,
        now: DateTime<Utc>,
    ) -> RequestPatch {
        let change = StatusChange {
            from: request.status,
            to: command.to,
            trigger: command.trigger,
            actor: command.actor_label.to_string(),
            reason: command.reason.map(str::to_string),
            at: now,
        };
        let mut patch = RequestPatch::default()
            .with_status(command.to)
            .with_history(change);

        match command.to {
            RequestStatus::MoveToQuoting => patch.quoting_at = Some(now),
            RequestStatus::Archived => patch.archived_at = Some(now),
            RequestStatus::Expired => patch.expired_at = Some(now),
            _ => {}
        }
        // Any transition into an active status is activity: the expiration
        // clock restarts from the history entry just appended.
        if command.to.is_active() {
            patch.expires_at = Some(None);
        }
        if let Some(notes) = command.notes {
            if !notes.trim().is_empty() {
                let line = patch.append_note.take().unwrap_or_default();
                patch.append_note = Some(format!("{line}\n{notes}"));
            }
        }
        patch
    }

    /// Write the patch under the loaded version, then mirror it onto the
    /// local copy so the returned record matches what the store now holds.
    fn apply(&self, mut request: Request, patch: RequestPatch) -> Result<Request, DecisionError> {
        self.store
            .update_request(&request.id, request.version, patch.clone())?;
        patch.apply(&mut request);
        Ok(request)
    }

    fn notify(&self, notification: Notification) {
        if let Err(error) = self.dispatcher.emit(notification) {
            warn!(%error, "notification dispatch failed");
        }
    }
}

/// Most recent activity timestamp: intake, walk-thru, quoting, or the last
/// recorded status change.
fn last_activity(request: &Request) -> DateTime<Utc> {
    let mut latest = request.created_at;
    for candidate in [request.visit_at, request.quoting_at] {
        if let Some(at) = candidate {
            latest = latest.max(at);
        }
    }
    if let Some(change) = request.status_history.last() {
        latest = latest.max(change.at);
    }
    latest
}
