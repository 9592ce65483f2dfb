//! Cross-origin handling for the public endpoints.
//!
//! `tower_http`'s `CorsLayer` answers preflight requests itself with an empty
//! 200; callers of this service expect 204, so `preflight_no_content` wraps
//! the layer and rewrites the status.

use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub const API_KEY_HEADER: &str = "x-api-key";

/// `*` anywhere in the list allows every origin; otherwise only the listed
/// origins receive `Access-Control-Allow-Origin`.
pub fn layer(allowed_origins: &[String], extra_headers: &[&str]) -> CorsLayer {
    let allow_origin = if allowed_origins.iter().any(|origin| origin.trim() == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin.trim()).ok())
                .collect::<Vec<_>>(),
        )
    };

    let mut allow_headers = vec![header::CONTENT_TYPE, HeaderName::from_static(API_KEY_HEADER)];
    allow_headers.extend(
        extra_headers.iter().filter_map(|name| HeaderName::from_bytes(name.as_bytes()).ok()),
    );

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(allow_headers)
}

pub async fn preflight_no_content(request: Request, next: Next) -> Response {
    let preflight = request.method() == Method::OPTIONS;
    let mut response = next.run(request).await;
    if preflight && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}
