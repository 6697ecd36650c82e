use axum::routing::{get, post};
use axum::Router;

use crate::state::ApiState;

pub mod auth;
pub mod tasks;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/tasks/extract", post(tasks::extract))
        .route("/api/tasks/parse", post(tasks::parse))
        .route("/api/tasks", post(tasks::create).get(tasks::list))
        .route("/api/tasks/stats", get(tasks::stats))
        .route("/api/tasks/{id}", get(tasks::find).put(tasks::update).delete(tasks::remove))
        .with_state(state)
}
