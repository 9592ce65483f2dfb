use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use callcart_core::domain::catalog::CatalogIndex;
use callcart_core::domain::intent::{
    CallAnalysis, IntentDraft, IntentStage, IntentType, Outcome, RejectionReason, Sentiment,
};
use callcart_core::domain::merchant::{MerchantId, MerchantMetadata};
use callcart_core::domain::product::ProductId;
use callcart_core::domain::session::TranscriptTurn;

use crate::llm::LlmClient;
use crate::prompt;
use crate::repair::{self, RepairError};

/// Characters of raw model output kept for debug logging.
const RAW_RESPONSE_LOG_LIMIT: usize = 2000;

/// Top-level keys that mark a response as the single-intent shape.
const SINGLE_INTENT_KEYS: &[&str] =
    &["intentType", "normalizedIntent", "productName", "category", "accepted", "outcome"];

pub struct NormalizeRequest<'a> {
    pub transcript: &'a [TranscriptTurn],
    pub merchant_id: &'a MerchantId,
    pub merchant: Option<&'a MerchantMetadata>,
    pub catalog: &'a CatalogIndex,
}

/// Turns a call transcript into validated intents. Never fails: any
/// capability or repair error degrades to `CallAnalysis::empty()`.
pub struct IntentNormalizer {
    llm: Arc<dyn LlmClient>,
}

impl IntentNormalizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn normalize(&self, request: NormalizeRequest<'_>) -> CallAnalysis {
        let conversation = prompt::conversation_text(request.transcript);
        if conversation.is_empty() {
            return CallAnalysis::empty();
        }

        let prompt = prompt::call_analysis_prompt(
            &prompt::merchant_context(request.merchant_id, request.merchant),
            request.catalog.product_names(),
            &conversation,
        );

        let text = match self.llm.complete(&prompt).await {
            Ok(text) => text,
            Err(error) => {
                warn!(
                    event_name = "agent.normalizer.capability_failed",
                    merchant_id = %request.merchant_id.as_str(),
                    error = %error,
                    "call analysis failed; no intents captured"
                );
                return CallAnalysis::empty();
            }
        };

        debug!(
            event_name = "agent.normalizer.raw_response",
            raw = %truncate(&text, RAW_RESPONSE_LOG_LIMIT),
        );

        match parse_call_analysis(&text, request.catalog) {
            Ok(analysis) => analysis,
            Err(error) => {
                warn!(
                    event_name = "agent.normalizer.repair_failed",
                    merchant_id = %request.merchant_id.as_str(),
                    error = %error,
                    "call analysis response unusable; no intents captured"
                );
                CallAnalysis::empty()
            }
        }
    }
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

pub fn parse_call_analysis(
    text: &str,
    catalog: &CatalogIndex,
) -> Result<CallAnalysis, RepairError> {
    let object = repair::parse_json_object(text)?;

    let raw_intents: Vec<&Map<String, Value>> = match object.get("intents") {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        Some(_) => Vec::new(),
        None if SINGLE_INTENT_KEYS.iter().any(|key| object.contains_key(*key)) => vec![&object],
        None => Vec::new(),
    };

    let mut recommendation_shown: Vec<ProductId> = Vec::new();
    for name in repair::string_list(object.get("recommendationShown")) {
        if let Some(id) = catalog.resolve(&name) {
            if !recommendation_shown.contains(id) {
                recommendation_shown.push(id.clone());
            }
        }
    }

    Ok(CallAnalysis {
        intents: raw_intents.into_iter().map(|raw| intent_draft(raw, catalog)).collect(),
        sentiment: object
            .get("sentiment")
            .and_then(Value::as_str)
            .and_then(Sentiment::parse)
            .unwrap_or_default(),
        product_mentions: repair::string_list(object.get("productMentions")),
        recommendation_shown,
    })
}

fn enum_field<T>(raw: &Map<String, Value>, keys: &[&str], parse: fn(&str) -> Option<T>) -> Option<T> {
    repair::text(repair::field(raw, keys)).and_then(|value| parse(&value))
}

fn intent_draft(raw: &Map<String, Value>, catalog: &CatalogIndex) -> IntentDraft {
    let intent_type =
        enum_field(raw, &["intentType", "intent_type"], IntentType::parse).unwrap_or(IntentType::Inquire);

    let outcome = enum_field(raw, &["outcome"], Outcome::parse).or_else(|| {
        match raw.get("accepted") {
            Some(Value::Bool(true)) => Some(Outcome::Accepted),
            Some(Value::Bool(false)) => Some(Outcome::Rejected),
            _ => None,
        }
    });

    let rejection_reason = if outcome == Some(Outcome::Rejected) {
        repair::text(repair::field(raw, &["rejectionReason", "rejection_reason"]))
            .map(|reason| RejectionReason::parse(&reason).unwrap_or(RejectionReason::Other))
    } else {
        None
    };

    let (price_min, price_max) = repair::price_bounds(
        repair::price(repair::field(raw, &["price_min", "priceMin"])),
        repair::price(repair::field(raw, &["price_max", "priceMax"])),
    );

    let product_name = repair::text(repair::field(raw, &["productName", "product_name"]));
    let category = repair::text(raw.get("category"));
    let product_id = repair::text(repair::field(raw, &["productId", "product_id"]))
        .map(ProductId)
        .filter(|id| catalog.contains(id))
        .or_else(|| product_name.as_deref().and_then(|name| catalog.resolve(name)).cloned());

    let normalized_intent = repair::text(raw.get("normalizedIntent")).unwrap_or_else(|| {
        describe_intent(intent_type, product_name.as_deref().or(category.as_deref()))
    });

    IntentDraft {
        product_id,
        product_name,
        category,
        intent_type,
        outcome,
        intent_stage: enum_field(raw, &["intentStage", "intent_stage"], IntentStage::parse),
        rejection_reason,
        confidence: repair::confidence(raw.get("confidence")),
        price_min,
        price_max,
        variant_attributes: repair::string_map(
            repair::field(raw, &["variantAttributes", "variant_attributes"]),
        ),
        normalized_intent,
    }
}

fn describe_intent(intent_type: IntentType, subject: Option<&str>) -> String {
    let verb = match intent_type {
        IntentType::Buy => "buy",
        IntentType::Compare => "compare",
        IntentType::Inquire => "learn about",
    };
    format!("Customer wants to {verb} {}", subject.unwrap_or("products"))
}
