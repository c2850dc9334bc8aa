// src/handlers/session.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    engine::{SessionController, integrity::IntegritySignal},
    error::AppError,
    models::{answer::Answer, session::SessionRequest},
    registry::{SessionEntry, SessionRegistry},
    state::AppState,
};

async fn find(registry: &SessionRegistry, id: Uuid) -> Result<Arc<SessionEntry>, AppError> {
    registry
        .get(&id)
        .await
        .ok_or(AppError::NotFound(format!("Session {} not found", id)))
}

/// Opens a session: loads the test and runs the admission gate.
///
/// * Rejected sessions are still returned (201) so the client can show the reason.
/// * Free tests without an instructions screen start immediately.
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = req.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let mut controller = SessionController::new(
        req,
        state.collaborators.clone(),
        state.clock.clone(),
        state.config.fullscreen_policy,
    );
    controller.open().await.map_err(|e| {
        tracing::error!("Failed to open session: {}", e);
        AppError::from(e)
    })?;

    let view = controller.view();
    let entry = state.sessions.insert(controller).await;
    {
        let controller = entry.controller.lock().await;
        entry.ensure_ticker(&controller, state.config.tick_interval);
    }

    Ok((StatusCode::CREATED, Json(view)))
}

/// Current view of a session.
pub async fn get_session(
    State(registry): State<SessionRegistry>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let entry = find(&registry, id).await?;
    let controller = entry.controller.lock().await;
    Ok(Json(controller.view()))
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub new_balance: i64,
    #[serde(flatten)]
    pub session: crate::models::session::SessionView,
}

/// Pays the test fee and moves on to the instructions or the questions.
pub async fn pay(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let entry = find(&state.sessions, id).await?;
    let mut controller = entry.controller.lock().await;
    let new_balance = controller.pay().await?;
    entry.ensure_ticker(&controller, state.config.tick_interval);

    Ok(Json(PaymentResponse {
        new_balance,
        session: controller.view(),
    }))
}

/// Acknowledges the rules disclosure and starts the attempt.
pub async fn acknowledge(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let entry = find(&state.sessions, id).await?;
    let mut controller = entry.controller.lock().await;
    let started = controller.acknowledge_instructions()?;
    entry.ensure_ticker(&controller, state.config.tick_interval);

    Ok(Json(serde_json::json!({
        "request_fullscreen": started.request_fullscreen,
        "remaining_seconds": started.remaining_seconds,
        "session": controller.view(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub answer: Answer,
}

/// Records the answer for question `index`.
pub async fn record_answer(
    State(registry): State<SessionRegistry>,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(req): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let entry = find(&registry, id).await?;
    let mut controller = entry.controller.lock().await;
    controller.record_answer(index, req.answer)?;
    Ok(Json(controller.view()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigateRequest {
    Next,
    Previous,
    To(usize),
}

/// Moves the question cursor.
pub async fn navigate(
    State(registry): State<SessionRegistry>,
    Path(id): Path<Uuid>,
    Json(req): Json<NavigateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let entry = find(&registry, id).await?;
    let mut controller = entry.controller.lock().await;
    match req {
        NavigateRequest::Next => controller.next()?,
        NavigateRequest::Previous => controller.previous()?,
        NavigateRequest::To(index) => controller.go_to(index)?,
    };
    Ok(Json(controller.view()))
}

/// Forwards an integrity signal; the verdict tells the client whether to let it through.
pub async fn signal(
    State(registry): State<SessionRegistry>,
    Path(id): Path<Uuid>,
    Json(signal): Json<IntegritySignal>,
) -> Result<impl IntoResponse, AppError> {
    let entry = find(&registry, id).await?;
    let mut controller = entry.controller.lock().await;
    let verdict = controller.observe_signal(&signal);
    Ok(Json(serde_json::json!({ "verdict": verdict })))
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub confirmed: bool,
}

/// Submits the attempt. Repeated calls after completion are no-ops.
pub async fn submit(
    State(registry): State<SessionRegistry>,
    Path(id): Path<Uuid>,
    Json(req): Json<ConfirmRequest>,
) -> Result<impl IntoResponse, AppError> {
    let entry = find(&registry, id).await?;
    let mut controller = entry.controller.lock().await;
    let outcome = controller.submit(req.confirmed).await;
    if !controller.timer_running() {
        entry.stop_ticker();
    }
    Ok(Json(outcome?))
}

/// Leaves the test page, submitting what has been answered so far.
pub async fn exit(
    State(registry): State<SessionRegistry>,
    Path(id): Path<Uuid>,
    Json(req): Json<ConfirmRequest>,
) -> Result<impl IntoResponse, AppError> {
    let entry = find(&registry, id).await?;
    let mut controller = entry.controller.lock().await;
    let outcome = controller.exit(req.confirmed).await;
    if !controller.timer_running() {
        entry.stop_ticker();
    }
    Ok(Json(outcome?))
}
