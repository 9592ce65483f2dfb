//! Post-call webhook gateway.
//!
//! Authentication and payload shape failures use 4xx codes. Anything that
//! goes wrong after validation is reported in a 200 body so the sender does
//! not redeliver and duplicate side effects.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use callcart_core::domain::merchant::MerchantId;
use callcart_core::domain::session::TranscriptTurn;
use callcart_core::errors::ApplicationError;

use crate::pipeline::{CallTranscript, IngestionPipeline};
use crate::response::client_message;
use crate::state::{AppState, WebhookSettings};

pub const TRANSCRIPTION_EVENT: &str = "post_call_transcription";

/// `data` of a transcription event. Other event kinds are never decoded.
#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub conversation_id: Option<String>,
    pub agent_id: Option<String>,
    pub transcript: Option<Value>,
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessedResponse {
    message: &'static str,
    conversation_id: String,
    session_id: String,
    intents_processed: usize,
    intent_ids: Vec<String>,
}

pub async fn post_call(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(reason) = verify_signature(&state.webhook, &headers, &body) {
        let rejection = ApplicationError::from(reason).into_interface(Uuid::new_v4().to_string());
        warn!(
            event_name = "webhook.signature.rejected",
            correlation_id = %rejection.correlation_id(),
            error_class = rejection.class(),
            reason = %rejection.message(),
            "webhook signature verification failed"
        );
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid webhook signature" })))
            .into_response();
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(_) => return invalid_payload("Payload must be a JSON object"),
    };
    let Some(payload) = payload.as_object() else {
        return invalid_payload("Payload must be a JSON object");
    };

    let kind = match payload
        .get("type")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|kind| !kind.is_empty())
    {
        Some(kind) => kind.to_string(),
        None => return invalid_payload("Payload must include a 'type' field"),
    };

    if kind != TRANSCRIPTION_EVENT {
        info!(event_name = "webhook.event.ignored", event_type = %kind, "webhook type not processed");
        return (
            StatusCode::OK,
            Json(json!({ "message": "Webhook received, not processed", "type": kind })),
        )
            .into_response();
    }

    let Some(data) = payload.get("data").filter(|data| !data.is_null()) else {
        return empty_transcript();
    };
    let data = match WebhookData::deserialize(data) {
        Ok(data) => data,
        Err(_) => return invalid_payload("Payload data must be an object with well-formed fields"),
    };
    let Some(entries) = data.transcript.as_ref().and_then(Value::as_array).filter(|e| !e.is_empty())
    else {
        return empty_transcript();
    };
    let Some(conversation_id) =
        data.conversation_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    else {
        return invalid_payload("Payload must include data.conversation_id");
    };

    let turns = transcript_turns(entries);
    if !turns.iter().any(TranscriptTurn::is_user) {
        info!(
            event_name = "webhook.transcript.no_user_turns",
            correlation_id = %conversation_id,
            "transcript has no user utterances"
        );
        return (
            StatusCode::OK,
            Json(json!({
                "message": "No user utterances to process",
                "conversationId": conversation_id,
                "intentsProcessed": 0,
            })),
        )
            .into_response();
    }

    let call = CallTranscript {
        conversation_id: conversation_id.to_string(),
        agent_id: data.agent_id.unwrap_or_default(),
        merchant_id: merchant_id(data.metadata.as_ref(), &state.webhook.default_merchant_id),
        turns,
    };

    match IngestionPipeline::new(&state.repositories, &state.agent).ingest(call).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ProcessedResponse {
                message: "Transcript processed successfully",
                conversation_id: conversation_id.to_string(),
                session_id: outcome.session_id.0,
                intents_processed: outcome.intent_ids.len(),
                intent_ids: outcome.intent_ids.into_iter().map(|id| id.0).collect(),
            }),
        )
            .into_response(),
        Err(failure) => {
            let failure = failure.into_interface(conversation_id);
            error!(
                event_name = "webhook.ingest.failed",
                correlation_id = %failure.correlation_id(),
                error_class = failure.class(),
                error = %failure.message(),
                "transcript processing failed"
            );
            (
                StatusCode::OK,
                Json(json!({
                    "error": "Processing failed",
                    "message": client_message(&failure, state.environment),
                })),
            )
                .into_response()
        }
    }
}

pub async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "POST, OPTIONS")], "Method Not Allowed")
        .into_response()
}

fn verify_signature(
    settings: &WebhookSettings,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), callcart_core::SignatureError> {
    let Some(verifier) = &settings.verifier else {
        return Ok(());
    };
    let header_value =
        |name: &str| headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_string);

    verifier.verify(
        header_value(&settings.signature_header).as_deref(),
        header_value(&settings.timestamp_header).as_deref(),
        body,
        Utc::now(),
    )
}

/// Keeps `user`/`agent` entries with non-empty text, in order.
pub fn transcript_turns(entries: &[Value]) -> Vec<TranscriptTurn> {
    entries
        .iter()
        .filter_map(|entry| {
            let role = entry.get("role").and_then(Value::as_str)?;
            let text = entry.get("message").and_then(Value::as_str)?.trim();
            if text.is_empty() {
                return None;
            }
            match role.trim().to_ascii_lowercase().as_str() {
                "user" => Some(TranscriptTurn::User(text.to_string())),
                "agent" => Some(TranscriptTurn::Agent(text.to_string())),
                _ => None,
            }
        })
        .collect()
}

pub fn merchant_id(metadata: Option<&Map<String, Value>>, default: &MerchantId) -> MerchantId {
    metadata
        .and_then(|metadata| {
            ["merchantId", "merchant_id"].iter().find_map(|key| {
                metadata
                    .get(*key)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
            })
        })
        .map(|id| MerchantId(id.to_string()))
        .unwrap_or_else(|| default.clone())
}

fn invalid_payload(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": "Invalid payload", "message": message })))
        .into_response()
}

fn empty_transcript() -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": "Empty or invalid transcript" })))
        .into_response()
}
