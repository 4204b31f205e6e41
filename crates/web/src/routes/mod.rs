use axum::{
    Router,
    routing::{get, post, put},
};

use crate::app_state::AppState;
use crate::handlers::history;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/rates/snapshots", post(history::create_snapshot))
        .route("/api/rates/history", get(history::list_history))
        .route("/api/rates/history/:uid", get(history::get_history_record))
        .route(
            "/api/rates/history/:uid/activate",
            put(history::set_active_version),
        )
        .route(
            "/api/rates/history/:uid/restore",
            post(history::restore_snapshot),
        )
        .route("/api/rates/changes", get(history::get_changes))
        .with_state(state)
}
