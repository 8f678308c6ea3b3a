//! High-level facade composing the scoring, assignment, and lifecycle
//! engines over one store. The HTTP service and the demo runner talk to this
//! instead of wiring the engines themselves.

use std::sync::Arc;

use chrono::Duration;
use tracing::warn;

use crate::assignment::{AssignmentEngine, AssignmentStrategy, Selection};
use crate::config::{ConfigError, DecisionConfig};
use crate::directory::ReferenceDirectory;
use crate::domain::{Grade, LeadScore, Request, RequestId};
use crate::error::DecisionError;
use crate::lifecycle::LifecycleManager;
use crate::scoring::LeadScoringEngine;
use crate::store::{
    Clock, Notification, NotificationDispatcher, NotificationEvent, RecordStore,
};

/// Combined outcome of intake processing: the quality score plus the routing
/// decision.
#[derive(Debug, Clone)]
pub struct Decision {
    pub request: RequestId,
    pub score: LeadScore,
    pub selection: Selection,
}

/// Owns one instance of each engine plus the shared reference directory.
pub struct DecisionService<S, D, C> {
    directory: Arc<ReferenceDirectory<S>>,
    dispatcher: Arc<D>,
    scoring: Arc<LeadScoringEngine<S, C>>,
    assignment: AssignmentEngine<S, C>,
    lifecycle: LifecycleManager<S, D, C>,
}

impl<S: RecordStore, C: Clock, D: NotificationDispatcher> DecisionService<S, D, C> {
    pub fn new(
        store: Arc<S>,
        dispatcher: Arc<D>,
        clock: Arc<C>,
        config: DecisionConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let ttl = Duration::minutes(config.cache_ttl_minutes);

        let directory = Arc::new(ReferenceDirectory::new(Arc::clone(&store), ttl));
        let scoring = Arc::new(LeadScoringEngine::new(
            Arc::clone(&directory),
            Arc::clone(&clock),
            config.scoring,
            ttl,
        )?);
        let assignment = AssignmentEngine::new(
            Arc::clone(&directory),
            Arc::clone(&clock),
            config.assignment.clone(),
        );
        let lifecycle = LifecycleManager::new(
            store,
            Arc::clone(&dispatcher),
            clock,
            Arc::clone(&scoring),
            config.lifecycle.clone(),
        )?;

        Ok(Self {
            directory,
            dispatcher,
            scoring,
            assignment,
            lifecycle,
        })
    }

    pub fn directory(&self) -> &ReferenceDirectory<S> {
        &self.directory
    }

    pub fn scoring(&self) -> &LeadScoringEngine<S, C> {
        &self.scoring
    }

    pub fn assignment(&self) -> &AssignmentEngine<S, C> {
        &self.assignment
    }

    pub fn lifecycle(&self) -> &LifecycleManager<S, D, C> {
        &self.lifecycle
    }

    /// Intake path: score the request, route it, and persist the assignment.
    /// Scores at either extreme raise an alert: A-grade to the assignee,
    /// F-grade to the team channel for manual review.
    pub fn process_intake(
        &self,
        request: &Request,
        strategy: AssignmentStrategy,
    ) -> Result<Decision, DecisionError> {
        let score = self.scoring.score(request);
        let selection = self.assignment.assign(request, strategy)?;

        if matches!(score.grade, Grade::A | Grade::F) {
            let alert = Notification {
                recipient: if score.grade == Grade::A {
                    Some(selection.assignee.id.clone())
                } else {
                    None
                },
                event: NotificationEvent::ScoreAlert {
                    request: request.id.clone(),
                    grade: score.grade,
                    overall: score.overall,
                },
            };
            if let Err(error) = self.dispatcher.emit(alert) {
                warn!(request = %request.id, %error, "score alert dispatch failed");
            }
        }

        Ok(Decision {
            request: request.id.clone(),
            score,
            selection,
        })
    }
}
