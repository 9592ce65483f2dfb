use callcart_core::domain::merchant::{MerchantId, MerchantMetadata};
use callcart_core::domain::session::TranscriptTurn;

/// One `agent: …` / `user: …` line per non-empty turn.
pub fn conversation_text(transcript: &[TranscriptTurn]) -> String {
    transcript
        .iter()
        .filter(|turn| !turn.text().trim().is_empty())
        .map(|turn| format!("{}: {}", turn.speaker(), turn.text().trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn merchant_context(merchant_id: &MerchantId, merchant: Option<&MerchantMetadata>) -> String {
    match merchant {
        Some(merchant) => format!(
            "Merchant: {}, Industry: {}, Currency: {}, Locale: {}",
            merchant.name, merchant.industry, merchant.currency, merchant.locale
        ),
        None => format!("Merchant ID: {}", merchant_id.as_str()),
    }
}

pub fn call_analysis_prompt(
    merchant_context: &str,
    product_names: &[String],
    conversation: &str,
) -> String {
    let catalog =
        if product_names.is_empty() { "None".to_string() } else { product_names.join(", ") };

    format!(
        r#"You are an expert e-commerce conversation analyst. {merchant_context}

Analyze this conversation and return STRICT JSON with exactly these top-level fields:

- intents: array with one entry per distinct product or category the customer was interested in. Each entry has:
  - intentType: "buy" (customer decides or takes a recommendation), "compare" (customer weighs options or asks about attributes, availability or price), or "inquire" (discovery, no specific requirements)
  - productName: name of the specific catalog product discussed, or null
  - category: exact product category the customer mentioned, properly capitalised (e.g. "Basketball Shoes", not "Shoes"), or null
  - outcome: "accepted", "rejected", "abandoned", or null if the conversation is still open
  - intentStage: "expressed" or "confirmed", or null
  - rejectionReason: "variant_missing", "out_of_stock", "price_too_high", "product_not_found", "feature_missing", "other", or null. Only set when outcome is "rejected".
  - price_min: minimum price mentioned (number) or null
  - price_max: maximum price mentioned (number) or null
  - variantAttributes: object of any product attributes the customer asked for, lowercase keys (e.g. {{"size": "42", "color": "red"}}), or null
  - confidence: number between 0 and 1
  - normalizedIntent: complete sentence describing what the customer wanted and how it ended. Never empty.
- sentiment: "positive", "neutral", or "negative"
- productMentions: array of product names the customer mentioned
- recommendationShown: array of product names the agent recommended

RULES:
1. Extract what the customer WANTS, not what is available. If the agent says a requested attribute is unavailable, keep the customer's requested attribute.
2. Extract any price the customer mentions when discussing budget or cost.
3. If the customer declines after hearing a requirement is unavailable, outcome is "rejected" with rejectionReason "variant_missing".
4. Any explicit refusal ("no", "not interested", "no thanks") means outcome "rejected".
5. Use product names exactly as they appear in the available product list.

Available products: {catalog}

Conversation transcript:
{conversation}

Return ONLY valid JSON."#
    )
}

pub fn product_intent_prompt(raw_intent: &str) -> String {
    format!(
        r#"You are a product intent extraction engine for e-commerce recommendations.

Analyze the full conversation or query below and return STRICT JSON with these fields:
- category: product category exactly as the customer phrased it, properly capitalised (e.g. "Basketball Shoes", "Running Shoes", "Shoes"), or null
- price_min: minimum price the customer explicitly mentioned, or null
- price_max: maximum price the customer explicitly mentioned, or null
- size: size the customer is interested in, exactly as said (e.g. "42", "M", "10"), or null
- color: color the customer is interested in (e.g. "red", "electric blue"), or null
- confidence: number between 0 and 1

RULES:
- Information may be spread across several messages; read all of it.
- Keep specific categories specific: "running shoes" is "Running Shoes", never "Shoes".
- Only use a generic category when the customer used a generic term.
- Never infer a price. If a single price is given without "under" or "over", set price_min and price_max to the same value.
- A size or color the customer asks about is a requirement.
- Use null, never an empty string, for anything not mentioned.

Customer input:
"{raw_intent}"

Return ONLY valid JSON."#
    )
}

#[cfg(test)]
mod tests {
    use callcart_core::domain::merchant::{MerchantId, MerchantMetadata};
    use callcart_core::domain::session::TranscriptTurn;

    use super::{call_analysis_prompt, conversation_text, merchant_context, product_intent_prompt};

    #[test]
    fn conversation_lines_follow_turn_order_and_skip_blank_turns() {
        let text = conversation_text(&[
            TranscriptTurn::Agent("Welcome!".to_string()),
            TranscriptTurn::User("  ".to_string()),
            TranscriptTurn::User("Size 42 please".to_string()),
        ]);

        assert_eq!(text, "agent: Welcome!\nuser: Size 42 please");
        assert_eq!(conversation_text(&[]), "");
    }

    #[test]
    fn merchant_context_falls_back_to_the_bare_id() {
        let id = MerchantId("merchant_007".to_string());
        assert_eq!(merchant_context(&id, None), "Merchant ID: merchant_007");

        let mut merchant = MerchantMetadata::new(id.clone());
        merchant.name = "Sole Supply".to_string();
        merchant.industry = "footwear".to_string();
        assert_eq!(
            merchant_context(&id, Some(&merchant)),
            "Merchant: Sole Supply, Industry: footwear, Currency: USD, Locale: en"
        );
    }

    #[test]
    fn analysis_prompt_embeds_catalog_and_transcript() {
        let prompt = call_analysis_prompt(
            "Merchant ID: m1",
            &["Court King".to_string(), "Air Glide 2".to_string()],
            "user: hi",
        );

        assert!(prompt.contains("Available products: Court King, Air Glide 2"));
        assert!(prompt.contains("user: hi"));
        assert!(prompt.contains(r#"{"size": "42", "color": "red"}"#));
        assert!(call_analysis_prompt("", &[], "").contains("Available products: None"));
    }

    #[test]
    fn extraction_prompt_quotes_the_raw_intent() {
        let prompt = product_intent_prompt("red shoes under 50");
        assert!(prompt.contains("\"red shoes under 50\""));
    }
}
