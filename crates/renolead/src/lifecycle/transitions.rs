//! Rule-table status machine. One generic engine serves both the primary
//! request flow and the richer case-management flow; only the rule tables
//! differ.

use std::fmt::Debug;

use crate::domain::{ActorRole, CaseStatus, RequestStatus, TransitionTrigger};
use crate::error::DecisionError;

/// Status alphabets the machine can run over.
pub trait StatusLike: Copy + Eq + Debug {
    fn label(&self) -> &'static str;
}

impl StatusLike for RequestStatus {
    fn label(&self) -> &'static str {
        RequestStatus::label(*self)
    }
}

impl StatusLike for CaseStatus {
    fn label(&self) -> &'static str {
        CaseStatus::label(*self)
    }
}

/// Fields a rule can demand before the transition is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    ArchiveReason,
    Notes,
    Assignee,
}

/// One declared transition.
#[derive(Debug, Clone)]
pub struct TransitionRule<S> {
    pub from: S,
    pub to: S,
    pub trigger: TransitionTrigger,
    pub condition: Option<&'static str>,
    /// For time-based rules: days in `from` before the transition fires.
    pub delay_days: Option<i64>,
    pub required_fields: &'static [RequiredField],
    pub required_roles: &'static [ActorRole],
}

impl<S: StatusLike> TransitionRule<S> {
    const fn new(from: S, to: S, trigger: TransitionTrigger) -> Self {
        Self {
            from,
            to,
            trigger,
            condition: None,
            delay_days: None,
            required_fields: &[],
            required_roles: &[],
        }
    }

    const fn condition(mut self, tag: &'static str) -> Self {
        self.condition = Some(tag);
        self
    }

    const fn delay(mut self, days: i64) -> Self {
        self.delay_days = Some(days);
        self
    }

    const fn requires(mut self, fields: &'static [RequiredField]) -> Self {
        self.required_fields = fields;
        self
    }

    const fn roles(mut self, roles: &'static [ActorRole]) -> Self {
        self.required_roles = roles;
        self
    }
}

/// Per-call facts checked against a rule's requirements.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionContext<'a> {
    pub force: bool,
    pub archive_reason: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub has_assignee: bool,
}

/// How a transition passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validated {
    /// `from == to`; always allowed, nothing to write.
    NoOp,
    Rule,
    /// Allowed only by the force flag of an elevated actor.
    Forced,
}

/// Rule-table driven validator.
pub struct StatusMachine<S> {
    rules: Vec<TransitionRule<S>>,
}

impl<S: StatusLike> StatusMachine<S> {
    pub fn new(rules: Vec<TransitionRule<S>>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[TransitionRule<S>] {
        &self.rules
    }

    pub fn rule(&self, from: S, to: S, trigger: TransitionTrigger) -> Option<&TransitionRule<S>> {
        self.rules
            .iter()
            .find(|rule| rule.from == from && rule.to == to && rule.trigger == trigger)
    }

    /// Whether any rule connects `from` to `to`, regardless of trigger.
    pub fn allows(&self, from: S, to: S) -> bool {
        from == to || self.rules.iter().any(|rule| rule.from == from && rule.to == to)
    }

    /// Validate a proposed transition. A no-op always passes. Otherwise a
    /// matching rule must exist, its required fields must be supplied, and
    /// the actor must hold one of its required roles. A `force` flag lets an
    /// elevated actor override every check except the no-op shortcut.
    pub fn validate(
        &self,
        from: S,
        to: S,
        trigger: TransitionTrigger,
        actor: ActorRole,
        ctx: &TransitionContext<'_>,
    ) -> Result<Validated, DecisionError> {
        if from == to {
            return Ok(Validated::NoOp);
        }

        match self.check(from, to, trigger, actor, ctx) {
            Ok(()) => Ok(Validated::Rule),
            Err(_) if ctx.force && actor.is_elevated() => Ok(Validated::Forced),
            Err(error) if ctx.force => Err(DecisionError::InvalidTransition {
                from: from.label().to_string(),
                to: to.label().to_string(),
                reason: format!("force requires an elevated role ({error})"),
            }),
            Err(error) => Err(error),
        }
    }

    fn check(
        &self,
        from: S,
        to: S,
        trigger: TransitionTrigger,
        actor: ActorRole,
        ctx: &TransitionContext<'_>,
    ) -> Result<(), DecisionError> {
        let rule = self.rule(from, to, trigger).ok_or_else(|| {
            DecisionError::InvalidTransition {
                from: from.label().to_string(),
                to: to.label().to_string(),
                reason: format!("no rule for trigger '{}'", trigger.label()),
            }
        })?;

        for field in rule.required_fields {
            let present = match field {
                RequiredField::ArchiveReason => ctx.archive_reason.is_some(),
                RequiredField::Notes => ctx.notes.map(|notes| !notes.trim().is_empty()).unwrap_or(false),
                RequiredField::Assignee => ctx.has_assignee,
            };
            if !present {
                return Err(DecisionError::Validation(format!(
                    "transition '{}' -> '{}' requires {:?}",
                    from.label(),
                    to.label(),
                    field
                )));
            }
        }

        if !rule.required_roles.is_empty() && !rule.required_roles.contains(&actor) {
            return Err(DecisionError::InvalidTransition {
                from: from.label().to_string(),
                to: to.label().to_string(),
                reason: format!("role {actor:?} is not permitted"),
            });
        }

        Ok(())
    }
}

/// Rule table for the primary sales flow.
pub fn primary_flow(expiration_days: i64) -> StatusMachine<RequestStatus> {
    use RequestStatus::*;
    use TransitionTrigger::*;

    let mut rules = vec![
        TransitionRule::new(New, PendingWalkThru, Manual),
        TransitionRule::new(New, MoveToQuoting, Manual),
        TransitionRule::new(PendingWalkThru, MoveToQuoting, Manual),
        TransitionRule::new(PendingWalkThru, New, Manual).condition("walk-thru cancelled"),
    ];

    for from in [New, PendingWalkThru, MoveToQuoting] {
        rules.push(
            TransitionRule::new(from, Archived, Manual).requires(&[RequiredField::ArchiveReason]),
        );
        rules.push(
            TransitionRule::new(from, Expired, TimeBased)
                .condition("inactivity")
                .delay(expiration_days),
        );
    }

    rules.push(
        TransitionRule::new(Expired, Archived, Automatic)
            .condition("auto-archive")
            .requires(&[RequiredField::ArchiveReason]),
    );
    rules.push(TransitionRule::new(Expired, New, Manual).condition("reactivation"));
    rules.push(TransitionRule::new(Archived, New, Manual).condition("reactivation"));

    StatusMachine::new(rules)
}

/// Rule table for the case-management variant.
pub fn case_flow() -> StatusMachine<CaseStatus> {
    use CaseStatus::*;
    use TransitionTrigger::*;

    const CANCEL_ROLES: &[ActorRole] = &[ActorRole::Manager, ActorRole::Admin];

    let mut rules = vec![
        TransitionRule::new(New, InReview, Manual),
        TransitionRule::new(InReview, InformationGathering, Manual),
        TransitionRule::new(InformationGathering, ScopeDefinition, Manual),
        TransitionRule::new(ScopeDefinition, QuoteReady, Manual),
        TransitionRule::new(QuoteReady, Quoted, Manual),
        TransitionRule::new(OnHold, InReview, Manual).condition("resumed"),
        TransitionRule::new(Quoted, Archived, Manual).requires(&[RequiredField::ArchiveReason]),
        TransitionRule::new(Archived, New, Manual).condition("reactivation"),
    ];

    for from in [InReview, InformationGathering, ScopeDefinition, QuoteReady] {
        rules.push(TransitionRule::new(from, OnHold, Manual).requires(&[RequiredField::Notes]));
    }
    for from in [New, InReview, InformationGathering, ScopeDefinition, QuoteReady, Quoted, OnHold] {
        rules.push(
            TransitionRule::new(from, Cancelled, Manual)
                .requires(&[RequiredField::Notes])
                .roles(CANCEL_ROLES),
        );
    }

    StatusMachine::new(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TransitionContext<'static> {
        TransitionContext::default()
    }

    #[test]
    fn no_op_transition_is_always_valid() {
        let machine = primary_flow(14);
        let outcome = machine
            .validate(
                RequestStatus::Archived,
                RequestStatus::Archived,
                TransitionTrigger::Manual,
                ActorRole::AccountExecutive,
                &ctx(),
            )
            .expect("no-op allowed");
        assert_eq!(outcome, Validated::NoOp);
    }

    #[test]
    fn undeclared_transition_is_rejected() {
        let machine = primary_flow(14);
        let result = machine.validate(
            RequestStatus::Archived,
            RequestStatus::MoveToQuoting,
            TransitionTrigger::Manual,
            ActorRole::Manager,
            &ctx(),
        );
        assert!(matches!(result, Err(DecisionError::InvalidTransition { .. })));
    }

    #[test]
    fn archive_requires_a_reason() {
        let machine = primary_flow(14);
        let result = machine.validate(
            RequestStatus::New,
            RequestStatus::Archived,
            TransitionTrigger::Manual,
            ActorRole::AccountExecutive,
            &ctx(),
        );
        assert!(matches!(result, Err(DecisionError::Validation(_))));

        let with_reason = TransitionContext {
            archive_reason: Some("completed_won"),
            ..ctx()
        };
        let outcome = machine
            .validate(
                RequestStatus::New,
                RequestStatus::Archived,
                TransitionTrigger::Manual,
                ActorRole::AccountExecutive,
                &with_reason,
            )
            .expect("reason supplied");
        assert_eq!(outcome, Validated::Rule);
    }

    #[test]
    fn force_requires_an_elevated_role() {
        let machine = primary_flow(14);
        let forced = TransitionContext { force: true, ..ctx() };

        let denied = machine.validate(
            RequestStatus::Archived,
            RequestStatus::MoveToQuoting,
            TransitionTrigger::Manual,
            ActorRole::AccountExecutive,
            &forced,
        );
        assert!(matches!(denied, Err(DecisionError::InvalidTransition { .. })));

        let allowed = machine
            .validate(
                RequestStatus::Archived,
                RequestStatus::MoveToQuoting,
                TransitionTrigger::Manual,
                ActorRole::Manager,
                &forced,
            )
            .expect("elevated force allowed");
        assert_eq!(allowed, Validated::Forced);
    }

    #[test]
    fn every_primary_status_stays_in_the_declared_alphabet() {
        let machine = primary_flow(14);
        for rule in machine.rules() {
            assert!(matches!(
                rule.from,
                RequestStatus::New
                    | RequestStatus::PendingWalkThru
                    | RequestStatus::MoveToQuoting
                    | RequestStatus::Archived
                    | RequestStatus::Expired
            ));
        }
    }

    #[test]
    fn expiration_rules_are_time_based_with_delay() {
        let machine = primary_flow(21);
        let rule = machine
            .rule(
                RequestStatus::New,
                RequestStatus::Expired,
                TransitionTrigger::TimeBased,
            )
            .expect("expiration rule declared");
        assert_eq!(rule.delay_days, Some(21));
        assert_eq!(rule.condition, Some("inactivity"));
    }

    #[test]
    fn case_flow_cancellation_is_manager_only() {
        let machine = case_flow();
        let with_notes = TransitionContext {
            notes: Some("customer unreachable for 30 days"),
            ..ctx()
        };

        let denied = machine.validate(
            CaseStatus::InReview,
            CaseStatus::Cancelled,
            TransitionTrigger::Manual,
            ActorRole::AccountExecutive,
            &with_notes,
        );
        assert!(matches!(denied, Err(DecisionError::InvalidTransition { .. })));

        machine
            .validate(
                CaseStatus::InReview,
                CaseStatus::Cancelled,
                TransitionTrigger::Manual,
                ActorRole::Manager,
                &with_notes,
            )
            .expect("manager may cancel with notes");
    }
}
