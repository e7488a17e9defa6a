use crate::day::DayKey;
use crate::errors::AppError;
use crate::feedback;
use crate::history::{DayCount, HistoryResponse, TIMELINE_DAYS};
use crate::leaderboard::DEFAULT_LIMIT;
use crate::models::{
    CharacterRequest, CompletionOutcome, Dashboard, Feedback, FeedbackRequest,
    GuestSessionResponse, LeaderboardEntry, MirrorConfig, OnboardingRequest, Stat, StatDraft,
    StatPatch,
};
use crate::session::Session;
use crate::state::AppState;
use crate::tracker::Tracker;
use crate::ui::render_index;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: String,
    pub end: String,
}

pub async fn index() -> Html<String> {
    Html(render_index())
}

async fn tracker(state: &AppState, session: &Session) -> Result<Arc<Tracker>, AppError> {
    Ok(state.tracker(&session.key).await?)
}

pub async fn start_guest(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<GuestSessionResponse>), AppError> {
    let id = state.start_guest().await?;
    Ok((
        StatusCode::CREATED,
        Json(GuestSessionResponse {
            guest_id: id.to_string(),
        }),
    ))
}

pub async fn end_session(
    State(state): State<AppState>,
    session: Session,
) -> Result<StatusCode, AppError> {
    state.end_session(&session.key).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Dashboard>, AppError> {
    let tracker = tracker(&state, &session).await?;
    Ok(Json(tracker.dashboard_on(session.today()).await))
}

pub async fn onboard(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<OnboardingRequest>,
) -> Result<Json<Dashboard>, AppError> {
    let tracker = tracker(&state, &session).await?;
    tracker
        .onboard(payload.character_name, payload.avatar, payload.stats)
        .await?;
    Ok(Json(tracker.dashboard_on(session.today()).await))
}

pub async fn update_character(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CharacterRequest>,
) -> Result<Json<Dashboard>, AppError> {
    let tracker = tracker(&state, &session).await?;
    tracker
        .update_character(&payload.character_name, &payload.avatar)
        .await?;
    Ok(Json(tracker.dashboard_on(session.today()).await))
}

pub async fn add_stat(
    State(state): State<AppState>,
    session: Session,
    Json(draft): Json<StatDraft>,
) -> Result<(StatusCode, Json<Stat>), AppError> {
    let tracker = tracker(&state, &session).await?;
    let stat = tracker.add_stat(draft).await?;
    Ok((StatusCode::CREATED, Json(stat)))
}

pub async fn update_stat(
    State(state): State<AppState>,
    session: Session,
    Path(stat_id): Path<String>,
    Json(patch): Json<StatPatch>,
) -> Result<Json<Stat>, AppError> {
    let tracker = tracker(&state, &session).await?;
    Ok(Json(tracker.update_stat(&stat_id, patch).await?))
}

pub async fn remove_stat(
    State(state): State<AppState>,
    session: Session,
    Path(stat_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let tracker = tracker(&state, &session).await?;
    tracker.remove_stat(&stat_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn complete_stat(
    State(state): State<AppState>,
    session: Session,
    Path(stat_id): Path<String>,
) -> Result<Json<CompletionOutcome>, AppError> {
    let tracker = tracker(&state, &session).await?;
    Ok(Json(tracker.complete_on(&stat_id, session.today()).await?))
}

pub async fn get_history(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LimitQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let tracker = tracker(&state, &session).await?;
    let limit = query.limit.unwrap_or(TIMELINE_DAYS);
    Ok(Json(tracker.history_on(session.today(), limit).await))
}

pub async fn get_heatmap(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<DayCount>>, AppError> {
    let start: DayKey = query
        .start
        .parse()
        .map_err(|_| AppError::bad_request("start must be YYYY-MM-DD"))?;
    let end: DayKey = query
        .end
        .parse()
        .map_err(|_| AppError::bad_request("end must be YYYY-MM-DD"))?;
    let tracker = tracker(&state, &session).await?;
    Ok(Json(tracker.heatmap(start, end).await?))
}

pub async fn get_leaderboard(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let tracker = tracker(&state, &session).await?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(tracker.leaderboard(limit).await?))
}

pub async fn reset_progress(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Dashboard>, AppError> {
    let tracker = tracker(&state, &session).await?;
    tracker.reset_progress().await?;
    Ok(Json(tracker.dashboard_on(session.today()).await))
}

pub async fn set_mirror(
    State(state): State<AppState>,
    session: Session,
    Json(config): Json<MirrorConfig>,
) -> Result<StatusCode, AppError> {
    let tracker = tracker(&state, &session).await?;
    tracker.set_mirror(config).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear_mirror(
    State(state): State<AppState>,
    session: Session,
) -> Result<StatusCode, AppError> {
    let tracker = tracker(&state, &session).await?;
    tracker.clear_mirror().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<FeedbackRequest>,
) -> Result<(StatusCode, Json<Feedback>), AppError> {
    let entry = feedback::prepare(payload, &session.key)?;
    state.records.submit_feedback(entry.clone()).await?;
    info!(category = ?entry.category, "feedback received");
    Ok((StatusCode::CREATED, Json(entry)))
}
