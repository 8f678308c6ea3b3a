use crate::error::AppError;
use crate::infra::{AppState, InMemoryDispatcher, InMemoryRecordStore};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use renolead::assignment::{AssignmentStrategy, RankedAlternative, Selection, TerritoryMatch};
use renolead::domain::{
    ActorRole, AssigneeId, LeadScore, Request, RequestId, RequestStatus,
};
use renolead::lifecycle::{
    self, BulkArchiveReport, ExpirationReport, SweepOutcome, TransitionCommand,
};
use renolead::service::DecisionService;
use renolead::store::{RecordStore, SystemClock};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub(crate) type Engine = DecisionService<InMemoryRecordStore, InMemoryDispatcher, SystemClock>;

pub(crate) struct ApiContext {
    pub(crate) service: Engine,
    pub(crate) store: Arc<InMemoryRecordStore>,
}

pub(crate) fn decision_router(ctx: Arc<ApiContext>) -> Router {
    Router::new()
        .route("/api/v1/requests", post(intake_endpoint))
        .route("/api/v1/requests/:id", get(fetch_endpoint))
        .route("/api/v1/requests/:id/score", post(score_endpoint))
        .route("/api/v1/requests/:id/transition", post(transition_endpoint))
        .route("/api/v1/requests/:id/archive", post(archive_endpoint))
        .route("/api/v1/requests/:id/reactivate", post(reactivate_endpoint))
        .route("/api/v1/lifecycle/warnings", post(warnings_endpoint))
        .route("/api/v1/lifecycle/sweep", post(sweep_endpoint))
        .route("/api/v1/lifecycle/bulk-archive", post(bulk_archive_endpoint))
        .route("/api/v1/archival-reasons", get(reasons_endpoint))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(ctx)
}

#[derive(Debug, Deserialize)]
pub(crate) struct IntakeRequest {
    pub(crate) id: String,
    pub(crate) source: String,
    #[serde(default)]
    pub(crate) product: Option<String>,
    #[serde(default)]
    pub(crate) budget: Option<String>,
    #[serde(default)]
    pub(crate) address: Option<String>,
    #[serde(default)]
    pub(crate) city: Option<String>,
    #[serde(default)]
    pub(crate) state: Option<String>,
    #[serde(default)]
    pub(crate) zip: Option<String>,
    #[serde(default)]
    pub(crate) client_type: Option<String>,
    #[serde(default)]
    pub(crate) message: String,
    #[serde(default)]
    pub(crate) attachment_count: u32,
    #[serde(default)]
    pub(crate) visit_requested: bool,
    /// Selection strategy; the weighted blend is the default.
    #[serde(default)]
    pub(crate) strategy: Option<AssignmentStrategy>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentView {
    pub(crate) assignee: AssigneeId,
    pub(crate) assignee_name: String,
    pub(crate) strategy: &'static str,
    pub(crate) score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) territory: Option<TerritoryMatch>,
    pub(crate) reasons: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) alternatives: Vec<RankedAlternative>,
}

impl From<Selection> for AssignmentView {
    fn from(selection: Selection) -> Self {
        Self {
            assignee: selection.assignee.id,
            assignee_name: selection.assignee.name,
            strategy: selection.strategy.label(),
            score: selection.score,
            territory: selection.territory,
            reasons: selection.reasons,
            alternatives: selection.alternatives,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct IntakeResponse {
    pub(crate) request: RequestId,
    pub(crate) status: RequestStatus,
    pub(crate) score: LeadScore,
    pub(crate) assignment: AssignmentView,
}

pub(crate) async fn intake_endpoint(
    State(ctx): State<Arc<ApiContext>>,
    Json(payload): Json<IntakeRequest>,
) -> Result<Json<IntakeResponse>, AppError> {
    let strategy = payload.strategy.unwrap_or(AssignmentStrategy::Hybrid);

    let mut request = Request::new(RequestId(payload.id), payload.source, Utc::now());
    if let Some(product) = payload.product {
        request.product = product;
    }
    request.budget = payload.budget;
    request.address = payload.address;
    request.city = payload.city;
    request.state = payload.state;
    request.zip = payload.zip;
    request.client_type = payload.client_type;
    request.message = payload.message;
    request.attachment_count = payload.attachment_count;
    request.visit_requested = payload.visit_requested;

    ctx.store.insert_request(request.clone())?;
    let decision = ctx.service.process_intake(&request, strategy)?;

    Ok(Json(IntakeResponse {
        request: decision.request,
        status: request.status,
        score: decision.score,
        assignment: decision.selection.into(),
    }))
}

pub(crate) async fn fetch_endpoint(
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<String>,
) -> Result<Json<Request>, AppError> {
    let request = ctx
        .store
        .request(&RequestId(id.clone()))?
        .ok_or(AppError::Decision(renolead::error::DecisionError::NotFound(
            id,
        )))?;
    Ok(Json(request))
}

pub(crate) async fn score_endpoint(
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<String>,
) -> Json<LeadScore> {
    Json(ctx.service.scoring().score_request(&RequestId(id)))
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionRequest {
    pub(crate) to: RequestStatus,
    pub(crate) actor_role: ActorRole,
    pub(crate) actor: String,
    #[serde(default)]
    pub(crate) reason: Option<String>,
    #[serde(default)]
    pub(crate) notes: Option<String>,
    #[serde(default)]
    pub(crate) force: bool,
}

pub(crate) async fn transition_endpoint(
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<String>,
    Json(payload): Json<TransitionRequest>,
) -> Result<Json<Request>, AppError> {
    let command = TransitionCommand {
        to: payload.to,
        trigger: renolead::domain::TransitionTrigger::Manual,
        actor: payload.actor_role,
        actor_label: &payload.actor,
        reason: payload.reason.as_deref(),
        notes: payload.notes.as_deref(),
        force: payload.force,
    };
    let updated = ctx.service.lifecycle().transition(&RequestId(id), command)?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArchiveRequest {
    pub(crate) reason: String,
    #[serde(default)]
    pub(crate) notes: Option<String>,
    pub(crate) actor_role: ActorRole,
    pub(crate) actor: String,
}

pub(crate) async fn archive_endpoint(
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<String>,
    Json(payload): Json<ArchiveRequest>,
) -> Result<Json<Request>, AppError> {
    let archived = ctx.service.lifecycle().archive_lead(
        &RequestId(id),
        &payload.reason,
        payload.notes.as_deref(),
        payload.actor_role,
        &payload.actor,
    )?;
    Ok(Json(archived))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReactivateRequest {
    pub(crate) actor_role: ActorRole,
    pub(crate) actor: String,
    #[serde(default)]
    pub(crate) reason: Option<String>,
    #[serde(default)]
    pub(crate) new_assignee: Option<AssigneeId>,
}

pub(crate) async fn reactivate_endpoint(
    State(ctx): State<Arc<ApiContext>>,
    Path(id): Path<String>,
    Json(payload): Json<ReactivateRequest>,
) -> Result<Json<Request>, AppError> {
    let revived = ctx.service.lifecycle().reactivate_lead(
        &RequestId(id),
        payload.reason.as_deref(),
        payload.actor_role,
        &payload.actor,
        payload.new_assignee,
    )?;
    Ok(Json(revived))
}

pub(crate) async fn warnings_endpoint(
    State(ctx): State<Arc<ApiContext>>,
) -> Result<Json<ExpirationReport>, AppError> {
    Ok(Json(ctx.service.lifecycle().check_expirations()?))
}

pub(crate) async fn sweep_endpoint(
    State(ctx): State<Arc<ApiContext>>,
) -> Result<Json<SweepOutcome>, AppError> {
    Ok(Json(ctx.service.lifecycle().process_automatic_expirations()?))
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkArchiveRequest {
    pub(crate) ids: Vec<String>,
    pub(crate) reason: String,
    #[serde(default)]
    pub(crate) notes: Option<String>,
    pub(crate) actor_role: ActorRole,
    pub(crate) actor: String,
    #[serde(default)]
    pub(crate) dry_run: bool,
}

pub(crate) async fn bulk_archive_endpoint(
    State(ctx): State<Arc<ApiContext>>,
    Json(payload): Json<BulkArchiveRequest>,
) -> Result<Json<BulkArchiveReport>, AppError> {
    let ids: Vec<RequestId> = payload.ids.into_iter().map(RequestId).collect();
    let report = ctx.service.lifecycle().bulk_archive(
        &ids,
        &payload.reason,
        payload.notes.as_deref(),
        payload.actor_role,
        &payload.actor,
        payload.dry_run,
    )?;
    Ok(Json(report))
}

pub(crate) async fn reasons_endpoint() -> Json<&'static [lifecycle::ArchivalReason]> {
    Json(lifecycle::taxonomy())
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
