//! HTTP surface of callcart: the post-call webhook gateway, the
//! recommendation endpoint and the health check.

pub mod bootstrap;
pub mod cors;
pub mod health;
pub mod pipeline;
pub mod recommend;
pub mod response;
pub mod state;
pub mod webhook;

use axum::{middleware, routing::post, Router};

pub use state::AppState;

pub const WEBHOOK_PATH: &str = "/webhooks/post-call";
pub const RECOMMENDATIONS_PATH: &str = "/api/v1/recommendations";

/// Public API routes with CORS applied. Preflight requests answer 204.
pub fn router(state: AppState, cors_allowed_origins: &[String]) -> Router {
    let cors = cors::layer(
        cors_allowed_origins,
        &[state.webhook.signature_header.as_str(), state.webhook.timestamp_header.as_str()],
    );

    Router::new()
        .route(WEBHOOK_PATH, post(webhook::post_call).fallback(webhook::method_not_allowed))
        .route(RECOMMENDATIONS_PATH, post(recommend::recommend))
        .with_state(state)
        .layer(cors)
        .layer(middleware::from_fn(cors::preflight_no_content))
}
