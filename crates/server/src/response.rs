use std::fmt::Display;

use axum::{http::StatusCode, Json};
use serde::Serialize;

use callcart_core::config::Environment;
use callcart_core::errors::InterfaceError;

pub const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

pub fn api_error(status: StatusCode, error: &str, message: Option<String>) -> ApiError {
    (status, Json(ErrorBody { error: error.to_string(), message }))
}

/// Full error text outside production, a fixed message otherwise.
pub fn error_detail(environment: Environment, error: &dyn Display) -> String {
    if environment.exposes_error_detail() {
        error.to_string()
    } else {
        GENERIC_INTERNAL_MESSAGE.to_string()
    }
}

/// Client-facing message. Only internal failures are gated.
pub fn client_message(error: &InterfaceError, environment: Environment) -> String {
    match error {
        InterfaceError::Internal { message, .. } => error_detail(environment, message),
        InterfaceError::Unauthorized { message, .. } | InterfaceError::BadRequest { message, .. } => {
            message.clone()
        }
    }
}

pub fn interface_error(error: &InterfaceError, environment: Environment) -> ApiError {
    let (status, label) = match error {
        InterfaceError::Unauthorized { .. } => (StatusCode::UNAUTHORIZED, "Unauthorized"),
        InterfaceError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "Invalid request"),
        InterfaceError::Internal { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_INTERNAL_MESSAGE)
        }
    };
    api_error(status, label, Some(client_message(error, environment)))
}
