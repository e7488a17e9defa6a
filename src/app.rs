use crate::handlers;
use crate::state::AppState;
use axum::{routing::{delete, get, post, put}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/session/guest", post(handlers::start_guest))
        .route("/api/session", delete(handlers::end_session))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/onboarding", post(handlers::onboard))
        .route("/api/profile", put(handlers::update_character))
        .route("/api/stats", post(handlers::add_stat))
        .route(
            "/api/stats/:id",
            axum::routing::patch(handlers::update_stat).delete(handlers::remove_stat),
        )
        .route("/api/stats/:id/complete", post(handlers::complete_stat))
        .route("/api/history", get(handlers::get_history))
        .route("/api/heatmap", get(handlers::get_heatmap))
        .route("/api/leaderboard", get(handlers::get_leaderboard))
        .route("/api/reset", post(handlers::reset_progress))
        .route(
            "/api/mirror",
            put(handlers::set_mirror).delete(handlers::clear_mirror),
        )
        .route("/api/feedback", post(handlers::submit_feedback))
        .with_state(state)
}
