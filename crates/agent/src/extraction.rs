use std::sync::Arc;

use tracing::warn;

use callcart_core::domain::intent::ExtractedProductIntent;

use crate::llm::LlmClient;
use crate::prompt;
use crate::repair::{self, RepairError};

/// Structured requirements for one recommendation query. Any failure yields
/// an unconstrained intent, which widens the search instead of failing it.
pub struct ProductIntentExtractor {
    llm: Arc<dyn LlmClient>,
}

impl ProductIntentExtractor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn extract(&self, raw_intent: &str) -> ExtractedProductIntent {
        let text = match self.llm.complete(&prompt::product_intent_prompt(raw_intent)).await {
            Ok(text) => text,
            Err(error) => {
                warn!(
                    event_name = "agent.extractor.capability_failed",
                    error = %error,
                    "product intent extraction failed; searching unconstrained"
                );
                return ExtractedProductIntent::unconstrained(raw_intent);
            }
        };

        parse_product_intent(&text, raw_intent).unwrap_or_else(|error| {
            warn!(
                event_name = "agent.extractor.repair_failed",
                error = %error,
                "product intent response unusable; searching unconstrained"
            );
            ExtractedProductIntent::unconstrained(raw_intent)
        })
    }
}

pub fn parse_product_intent(
    text: &str,
    raw_intent: &str,
) -> Result<ExtractedProductIntent, RepairError> {
    let object = repair::parse_json_object(text)?;
    let (price_min, price_max) = repair::price_bounds(
        repair::price(repair::field(&object, &["price_min", "priceMin"])),
        repair::price(repair::field(&object, &["price_max", "priceMax"])),
    );

    Ok(ExtractedProductIntent {
        category: repair::text(object.get("category")),
        price_min,
        price_max,
        size: repair::text(object.get("size")),
        color: repair::text(object.get("color")),
        confidence: repair::confidence(object.get("confidence")),
        raw_intent: raw_intent.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use super::{parse_product_intent, ProductIntentExtractor};
    use crate::llm::ScriptedLlmClient;

    #[test]
    fn blank_fields_become_none() {
        let intent = parse_product_intent(
            r#"{"category": "Basketball Shoes", "price_min": null, "price_max": 150,
                "size": " 42 ", "color": "", "confidence": 0.9}"#,
            "size 42 basketball shoes under 150",
        )
        .expect("intent");

        assert_eq!(intent.category.as_deref(), Some("Basketball Shoes"));
        assert_eq!(intent.price_min, None);
        assert_eq!(intent.price_max, Some(Decimal::new(150, 0)));
        assert_eq!(intent.size.as_deref(), Some("42"));
        assert_eq!(intent.color, None);
        assert_eq!(intent.raw_intent, "size 42 basketball shoes under 150");
    }

    #[tokio::test]
    async fn failures_keep_the_raw_intent_and_zero_confidence() {
        let llm = Arc::new(ScriptedLlmClient::with_responses(["not json"]));
        llm.push_failure("quota exceeded").await;
        let extractor = ProductIntentExtractor::new(llm.clone());

        let unparsable = extractor.extract("blue trainers").await;
        let failed = extractor.extract("red boots").await;

        assert_eq!(unparsable.raw_intent, "blue trainers");
        assert_eq!(unparsable.confidence, 0.0);
        assert!(unparsable.category.is_none());
        assert_eq!(failed.raw_intent, "red boots");
        assert!(!failed.has_variant_criteria());
        assert!(llm.prompts().await[0].contains("\"blue trainers\""));
    }
}
