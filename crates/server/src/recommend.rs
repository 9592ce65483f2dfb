use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use callcart_core::domain::intent::ExtractedProductIntent;
use callcart_core::domain::merchant::MerchantId;
use callcart_core::errors::{ApplicationError, DomainError};
use callcart_core::matching;
use callcart_core::ranking::{self, RankedProduct};
use callcart_db::ProductQuery;

use crate::cors::API_KEY_HEADER;
use crate::response::{interface_error, ApiError};
use crate::state::AppState;

pub const MAX_MERCHANT_ID_CHARS: usize = 100;
pub const MAX_RAW_INTENT_CHARS: usize = 10_000;

const NO_IN_STOCK_PRODUCTS: &str = "No in-stock products found for this merchant in the requested price range";
const NO_MATCHING_PRODUCTS: &str = "No products match the requested category, size or color";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationRequest {
    merchant_id: Option<Value>,
    raw_intent: Option<Value>,
    limit: Option<Value>,
}

/// Request after validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecommendationQuery {
    pub merchant_id: MerchantId,
    pub raw_intent: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub products: Vec<RankedProduct>,
    pub extracted_intent: ExtractedProductIntent,
    pub unmet_demand: bool,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RecommendationResponse {
    fn unmet(extracted_intent: ExtractedProductIntent, message: &str) -> Self {
        Self {
            products: Vec::new(),
            confidence: extracted_intent.confidence,
            extracted_intent,
            unmet_demand: true,
            message: Some(message.to_string()),
        }
    }
}

pub async fn recommend(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let reject = |failure: ApplicationError| {
        let interface = failure.into_interface(correlation_id.as_str());
        interface_error(&interface, state.environment)
    };

    authorize(&state, &headers).map_err(&reject)?;
    let query = parse_request(&body).map_err(|error| reject(error.into()))?;

    let response = run(&state, &query).await.map_err(|failure| {
        error!(
            event_name = "recommend.request.failed",
            correlation_id = %correlation_id,
            merchant_id = %query.merchant_id.as_str(),
            error = %failure,
            "recommendation failed"
        );
        reject(failure)
    })?;

    Ok(Json(response))
}

async fn run(
    state: &AppState,
    query: &RecommendationQuery,
) -> Result<RecommendationResponse, ApplicationError> {
    let extracted = state.agent.extractor.extract(&query.raw_intent).await;

    let store_query = ProductQuery {
        min_price: extracted.price_min,
        max_price: extracted.price_max,
        ..ProductQuery::in_stock()
    };
    let stocked = state
        .repositories
        .products
        .query(&query.merchant_id, &store_query)
        .await
        .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
    if stocked.is_empty() {
        return Ok(unmet(query, extracted, NO_IN_STOCK_PRODUCTS));
    }

    let candidates = matching::filter(&stocked, &extracted);
    if candidates.is_empty() {
        return Ok(unmet(query, extracted, NO_MATCHING_PRODUCTS));
    }

    let limit = ranking::effective_limit(query.limit, state.recommendation.max_results);
    let products = ranking::rank(&candidates, &extracted, limit);
    info!(
        event_name = "recommend.request.served",
        merchant_id = %query.merchant_id.as_str(),
        candidates = candidates.len(),
        returned = products.len(),
        "recommendations ranked"
    );

    Ok(RecommendationResponse {
        products,
        confidence: extracted.confidence,
        extracted_intent: extracted,
        unmet_demand: false,
        message: None,
    })
}

fn unmet(
    query: &RecommendationQuery,
    extracted: ExtractedProductIntent,
    message: &str,
) -> RecommendationResponse {
    info!(
        event_name = "recommend.demand.unmet",
        merchant_id = %query.merchant_id.as_str(),
        category = extracted.category.as_deref().unwrap_or("none"),
        "no candidates for recommendation query"
    );
    RecommendationResponse::unmet(extracted, message)
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApplicationError> {
    let Some(expected) = &state.recommendation.api_key else {
        return Ok(());
    };
    let provided = headers.get(API_KEY_HEADER).and_then(|value| value.to_str().ok());
    if provided == Some(expected.expose_secret()) {
        return Ok(());
    }

    warn!(event_name = "recommend.auth.rejected", "missing or invalid API key");
    Err(ApplicationError::Unauthorized("Invalid or missing API key".to_string()))
}

pub fn parse_request(body: &[u8]) -> Result<RecommendationQuery, DomainError> {
    let request: RecommendationRequest = serde_json::from_slice(body)
        .map_err(|error| DomainError::InvalidPayload(format!("malformed JSON body: {error}")))?;

    let merchant_id = required_string(request.merchant_id, "merchantId", MAX_MERCHANT_ID_CHARS)?;
    let raw_intent = required_string(request.raw_intent, "rawIntent", MAX_RAW_INTENT_CHARS)?;

    Ok(RecommendationQuery {
        merchant_id: MerchantId(merchant_id),
        raw_intent,
        limit: requested_limit(request.limit)?,
    })
}

/// Any JSON number is accepted; `ranking::effective_limit` clamps it later.
/// Fractions are floored and values below one become zero.
fn requested_limit(value: Option<Value>) -> Result<Option<usize>, DomainError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => Ok(Some(limit_from_number(&number))),
        Some(_) => Err(DomainError::InvalidPayload("limit must be a number".to_string())),
    }
}

fn limit_from_number(number: &Number) -> usize {
    if let Some(whole) = number.as_u64() {
        return usize::try_from(whole).unwrap_or(usize::MAX);
    }
    match number.as_f64() {
        Some(value) if value >= 1.0 => value.floor() as usize,
        _ => 0,
    }
}

fn required_string(
    value: Option<Value>,
    field: &'static str,
    max: usize,
) -> Result<String, DomainError> {
    let text = match value {
        Some(Value::String(text)) if !text.trim().is_empty() => text,
        Some(Value::String(_)) | None | Some(Value::Null) => {
            return Err(DomainError::InvalidPayload(format!("{field} is required")));
        }
        Some(_) => return Err(DomainError::InvalidPayload(format!("{field} must be a string"))),
    };
    if text.chars().count() > max {
        return Err(DomainError::FieldTooLong { field, max });
    }
    Ok(text)
}
