//! REST endpoints over the lifecycle engine.
//!
//! Thin handlers: parse the actor from headers, build the engine call,
//! map the error taxonomy onto HTTP status codes. Authentication proper
//! (JWT verification, session handling) lives in the gateway in front of
//! this service; the `x-actor-id` / `x-actor-role` headers are its output.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Error;
use crate::store::ListFilter;

use super::engine::{CreateOnboarding, LifecycleEngine};
use super::model::{
    FeedbackEntry, FeedbackKind, RecordStatus, Step, StepAssignee, StepCategory,
    StepFeedback, StepPriority, StepStatus,
};
use super::policy::{Actor, Role};

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct OnboardingRouteState {
    pub engine: Arc<LifecycleEngine>,
}

/// Map a domain error onto an HTTP status.
fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Unauthorized { .. } => StatusCode::FORBIDDEN,
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::Duplicate { .. }
        | Error::DependencyNotSatisfied { .. }
        | Error::IllegalTransition { .. }
        | Error::Conflict { .. } => StatusCode::CONFLICT,
        Error::Store(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: Error) -> Response {
    let status = status_for(&err);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "Internal error");
        // Do not leak store internals to clients.
        return (
            status,
            Json(serde_json::json!({"success": false, "message": "Server error"})),
        )
            .into_response();
    }
    (
        status,
        Json(serde_json::json!({"success": false, "message": err.to_string()})),
    )
        .into_response()
}

fn ok_response(data: impl serde::Serialize) -> Response {
    Json(serde_json::json!({"success": true, "data": data})).into_response()
}

/// Pull the acting identity out of the gateway headers.
fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, Response> {
    let id = headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());
    let role = headers
        .get("x-actor-role")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Role>().ok());
    match (id, role) {
        (Some(id), Some(role)) => Ok(Actor::new(id, role)),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "success": false,
                "message": "Missing or invalid x-actor-id / x-actor-role headers"
            })),
        )
            .into_response()),
    }
}

/// Incoming step definition. `step_id` is generated when omitted, matching
/// the behavior of the original creation endpoint.
#[derive(Debug, Deserialize)]
pub struct StepInput {
    #[serde(default)]
    pub step_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: StepCategory,
    #[serde(default)]
    pub priority: StepPriority,
    pub estimated_duration_hours: f64,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub assignee: StepAssignee,
}

impl StepInput {
    fn into_step(self) -> Step {
        let step_id = self
            .step_id
            .unwrap_or_else(|| format!("step_{}", Uuid::new_v4().simple()));
        Step::new(
            step_id,
            self.title,
            self.category,
            self.estimated_duration_hours,
            self.assignee,
        )
        .with_description(self.description)
        .with_priority(self.priority)
        .with_dependencies(self.dependencies)
    }
}

#[derive(Debug, Deserialize)]
struct CreateRequest {
    employee: String,
    expected_completion_date: DateTime<Utc>,
    #[serde(default)]
    assigned_buddy: Option<String>,
    #[serde(default)]
    steps: Option<Vec<StepInput>>,
}

/// POST /api/onboarding
async fn create_onboarding(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
    Json(req): Json<CreateRequest>,
) -> Response {
    let actor = match actor_from_headers(&headers) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let req = CreateOnboarding {
        employee: req.employee,
        expected_completion_date: req.expected_completion_date,
        assigned_buddy: req.assigned_buddy,
        steps: req
            .steps
            .map(|steps| steps.into_iter().map(StepInput::into_step).collect()),
    };
    match state.engine.create(req, &actor).await {
        Ok(record) => (StatusCode::CREATED, ok_response(record)).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    status: Option<RecordStatus>,
    #[serde(default)]
    assigned_hr: Option<String>,
    #[serde(default)]
    assigned_buddy: Option<String>,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

/// GET /api/onboarding
async fn list_onboardings(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response {
    let actor = match actor_from_headers(&headers) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let filter = ListFilter {
        status: query.status,
        assigned_hr: query.assigned_hr,
        assigned_buddy: query.assigned_buddy,
    };
    match state
        .engine
        .list(&actor, &filter, query.page, query.limit)
        .await
    {
        Ok(page) => ok_response(serde_json::json!({
            "onboardings": page.records,
            "pagination": {
                "current": page.page,
                "pages": page.total.div_ceil(page.limit as u64),
                "total": page.total,
                "limit": page.limit,
            }
        })),
        Err(e) => error_response(e),
    }
}

/// GET /api/onboarding/stats/overview
async fn stats_overview(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
) -> Response {
    let actor = match actor_from_headers(&headers) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match state.engine.stats(&actor).await {
        Ok(stats) => ok_response(stats),
        Err(e) => error_response(e),
    }
}

/// GET /api/onboarding/template/default
async fn default_template(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
) -> Response {
    let actor = match actor_from_headers(&headers) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    if !super::policy::is_admin_or_hr(&actor) {
        return error_response(Error::Unauthorized { actor: actor.id });
    }
    ok_response(serde_json::json!({ "steps": state.engine.default_template() }))
}

/// GET /api/onboarding/{id}
async fn get_onboarding(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response {
    let actor = match actor_from_headers(&headers) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match state.engine.get(id, &actor).await {
        Ok(record) => ok_response(record),
        Err(e) => error_response(e),
    }
}

/// GET /api/onboarding/employee/{employee_id}
async fn get_by_employee(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
    Path(employee_id): Path<String>,
) -> Response {
    let actor = match actor_from_headers(&headers) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match state.engine.get_by_employee(&employee_id, &actor).await {
        Ok(record) => ok_response(record),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct TransitionRequest {
    status: StepStatus,
    #[serde(default)]
    note: Option<String>,
}

/// POST /api/onboarding/{id}/steps/{step_id}/transition
async fn transition_step(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
    Path((id, step_id)): Path<(Uuid, String)>,
    Json(req): Json<TransitionRequest>,
) -> Response {
    let actor = match actor_from_headers(&headers) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match state
        .engine
        .transition_step(id, &step_id, &actor, req.status, req.note.as_deref())
        .await
    {
        Ok(record) => ok_response(record),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct NotesRequest {
    notes: String,
}

/// PUT /api/onboarding/{id}/steps/{step_id}/notes
async fn update_step_notes(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
    Path((id, step_id)): Path<(Uuid, String)>,
    Json(req): Json<NotesRequest>,
) -> Response {
    let actor = match actor_from_headers(&headers) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match state
        .engine
        .update_step_notes(id, &step_id, &actor, &req.notes)
        .await
    {
        Ok(record) => ok_response(record),
        Err(e) => error_response(e),
    }
}

/// PUT /api/onboarding/{id}/steps/{step_id}/feedback
async fn set_step_feedback(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
    Path((id, step_id)): Path<(Uuid, String)>,
    Json(feedback): Json<StepFeedback>,
) -> Response {
    let actor = match actor_from_headers(&headers) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match state
        .engine
        .set_step_feedback(id, &step_id, &actor, feedback)
        .await
    {
        Ok(record) => ok_response(record),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct FeedbackRequest {
    kind: FeedbackKind,
    rating: u8,
    comment: String,
}

/// POST /api/onboarding/{id}/feedback
async fn add_feedback(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<FeedbackRequest>,
) -> Response {
    let actor = match actor_from_headers(&headers) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let entry = match FeedbackEntry::new(actor.id.clone(), req.kind, req.rating, req.comment) {
        Ok(entry) => entry,
        Err(e) => return error_response(e),
    };
    match state.engine.add_feedback(id, &actor, entry).await {
        Ok(record) => ok_response(record),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct HoldRequest {
    on_hold: bool,
}

/// PUT /api/onboarding/{id}/hold
async fn set_hold(
    State(state): State<OnboardingRouteState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<HoldRequest>,
) -> Response {
    let actor = match actor_from_headers(&headers) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match state.engine.set_hold(id, &actor, req.on_hold).await {
        Ok(record) => ok_response(record),
        Err(e) => error_response(e),
    }
}

/// Build the onboarding REST routes.
pub fn onboarding_routes(state: OnboardingRouteState) -> Router {
    Router::new()
        .route(
            "/api/onboarding",
            post(create_onboarding).get(list_onboardings),
        )
        .route("/api/onboarding/stats/overview", get(stats_overview))
        .route("/api/onboarding/template/default", get(default_template))
        .route("/api/onboarding/employee/{employee_id}", get(get_by_employee))
        .route("/api/onboarding/{id}", get(get_onboarding))
        .route(
            "/api/onboarding/{id}/steps/{step_id}/transition",
            post(transition_step),
        )
        .route(
            "/api/onboarding/{id}/steps/{step_id}/notes",
            put(update_step_notes),
        )
        .route(
            "/api/onboarding/{id}/steps/{step_id}/feedback",
            put(set_step_feedback),
        )
        .route("/api/onboarding/{id}/feedback", post(add_feedback))
        .route("/api/onboarding/{id}/hold", put(set_hold))
        .with_state(state)
}
