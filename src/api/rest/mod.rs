pub mod orders;
pub mod riders;
pub mod ws;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::engine::transition::TransitionPolicy;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(orders::router())
        .merge(riders::router())
        .route("/riders/:id/feed/:kind", get(ws::feed_handler))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    transition_policy: &'static str,
    live_subscriptions: i64,
    notification_queue_depth: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let transition_policy = match state.lifecycle.authority().policy() {
        TransitionPolicy::Strict => "strict",
        TransitionPolicy::Permissive => "permissive",
    };

    Json(HealthResponse {
        status: "ok",
        transition_policy,
        live_subscriptions: state.metrics.live_subscriptions.get(),
        notification_queue_depth: state.metrics.notification_queue_depth.get(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
