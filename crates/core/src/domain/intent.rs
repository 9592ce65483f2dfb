use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::merchant::MerchantId;
use crate::domain::product::ProductId;
use crate::domain::session::SessionId;
use crate::revenue::{self, Attribution};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntentId(pub String);

impl IntentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Buy,
    Compare,
    Inquire,
}

impl IntentType {
    /// `browse` is accepted as an alias of `inquire`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "buy" => Some(Self::Buy),
            "compare" => Some(Self::Compare),
            "inquire" | "browse" => Some(Self::Inquire),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Compare => "compare",
            Self::Inquire => "inquire",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Accepted,
    Rejected,
    Abandoned,
}

impl Outcome {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "abandoned" => Some(Self::Abandoned),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStage {
    Expressed,
    Confirmed,
}

impl IntentStage {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "expressed" => Some(Self::Expressed),
            "confirmed" => Some(Self::Confirmed),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    VariantMissing,
    OutOfStock,
    PriceTooHigh,
    ProductNotFound,
    FeatureMissing,
    Other,
}

impl RejectionReason {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "variant_missing" => Some(Self::VariantMissing),
            "out_of_stock" => Some(Self::OutOfStock),
            "price_too_high" => Some(Self::PriceTooHigh),
            "product_not_found" => Some(Self::ProductNotFound),
            "feature_missing" => Some(Self::FeatureMissing),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "neutral" => Some(Self::Neutral),
            "negative" => Some(Self::Negative),
            _ => None,
        }
    }
}

/// A validated intent as produced by the normalizer, before it is bound to a
/// session and priced.
#[derive(Clone, Debug, PartialEq)]
pub struct IntentDraft {
    pub product_id: Option<ProductId>,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub intent_type: IntentType,
    pub outcome: Option<Outcome>,
    pub intent_stage: Option<IntentStage>,
    pub rejection_reason: Option<RejectionReason>,
    pub confidence: f64,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub variant_attributes: Option<BTreeMap<String, String>>,
    pub normalized_intent: String,
}

impl IntentDraft {
    pub fn customer_price_expectation(&self) -> Option<Decimal> {
        revenue::price_expectation(self.price_min, self.price_max)
    }

    pub fn is_rejected(&self) -> bool {
        self.outcome == Some(Outcome::Rejected)
    }

    pub fn into_intent(self, stamp: IntentStamp, attribution: Attribution) -> Intent {
        let customer_price_expectation = self.customer_price_expectation();
        Intent {
            intent_id: stamp.intent_id,
            session_id: stamp.session_id,
            merchant_id: stamp.merchant_id,
            product_id: self.product_id,
            product_name: self.product_name,
            category: self.category,
            intent_type: self.intent_type,
            outcome: self.outcome,
            intent_stage: self.intent_stage,
            rejection_reason: self.rejection_reason,
            confidence: self.confidence,
            price_min: self.price_min,
            price_max: self.price_max,
            customer_price_expectation,
            estimated_revenue: attribution.estimated_revenue,
            opportunity_cost: attribution.opportunity_cost.amount,
            opportunity_cost_is_estimated: attribution.opportunity_cost.is_estimated,
            variant_attributes: self.variant_attributes,
            normalized_intent: self.normalized_intent,
            timestamp: stamp.timestamp,
        }
    }
}

/// Identity and provenance assigned to an intent at persistence time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentStamp {
    pub intent_id: IntentId,
    pub session_id: SessionId,
    pub merchant_id: MerchantId,
    pub timestamp: DateTime<Utc>,
}

/// Immutable history record of one intent captured from a call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub intent_id: IntentId,
    pub session_id: SessionId,
    pub merchant_id: MerchantId,
    pub product_id: Option<ProductId>,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub intent_type: IntentType,
    pub outcome: Option<Outcome>,
    pub intent_stage: Option<IntentStage>,
    pub rejection_reason: Option<RejectionReason>,
    pub confidence: f64,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub customer_price_expectation: Option<Decimal>,
    pub estimated_revenue: Option<Decimal>,
    pub opportunity_cost: Option<Decimal>,
    #[serde(default)]
    pub opportunity_cost_is_estimated: bool,
    pub variant_attributes: Option<BTreeMap<String, String>>,
    pub normalized_intent: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything the normalizer captured from one conversation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallAnalysis {
    pub intents: Vec<IntentDraft>,
    pub sentiment: Sentiment,
    pub product_mentions: Vec<String>,
    pub recommendation_shown: Vec<ProductId>,
}

impl CallAnalysis {
    /// The "nothing captured" result returned on any capability failure.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Structured requirements extracted from a single recommendation query.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedProductIntent {
    pub category: Option<String>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub confidence: f64,
    pub raw_intent: String,
}

impl ExtractedProductIntent {
    pub fn unconstrained(raw_intent: &str) -> Self {
        Self { raw_intent: raw_intent.to_string(), ..Self::default() }
    }

    pub fn has_variant_criteria(&self) -> bool {
        self.size.is_some() || self.color.is_some()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{
        IntentDraft, IntentId, IntentStamp, IntentType, Outcome, RejectionReason, Sentiment,
    };
    use crate::domain::merchant::MerchantId;
    use crate::domain::session::SessionId;
    use crate::revenue::{Attribution, OpportunityCost};

    #[test]
    fn browse_is_an_alias_of_inquire() {
        assert_eq!(IntentType::parse("browse"), Some(IntentType::Inquire));
        assert_eq!(IntentType::parse(" BUY "), Some(IntentType::Buy));
        assert_eq!(IntentType::parse("purchase"), None);
    }

    #[test]
    fn closed_sets_reject_unknown_values() {
        assert_eq!(Outcome::parse("maybe"), None);
        assert_eq!(RejectionReason::parse("price_too_high"), Some(RejectionReason::PriceTooHigh));
        assert_eq!(RejectionReason::parse("too_pricey"), None);
        assert_eq!(Sentiment::parse("angry"), None);
    }

    #[test]
    fn into_intent_binds_session_and_attribution() {
        let draft = IntentDraft {
            product_id: None,
            product_name: Some("Court King".to_string()),
            category: Some("Basketball Shoes".to_string()),
            intent_type: IntentType::Buy,
            outcome: Some(Outcome::Rejected),
            intent_stage: None,
            rejection_reason: Some(RejectionReason::PriceTooHigh),
            confidence: 0.9,
            price_min: Some(Decimal::new(80, 0)),
            price_max: Some(Decimal::new(100, 0)),
            variant_attributes: None,
            normalized_intent: "Customer wanted cheaper basketball shoes".to_string(),
        };

        let intent = draft.into_intent(
            IntentStamp {
                intent_id: IntentId("INT-1".to_string()),
                session_id: SessionId("conv-1".to_string()),
                merchant_id: MerchantId("merchant_001".to_string()),
                timestamp: Utc::now(),
            },
            Attribution {
                estimated_revenue: None,
                opportunity_cost: OpportunityCost::exact(Some(Decimal::new(90, 0))),
            },
        );

        assert_eq!(intent.session_id.as_str(), "conv-1");
        assert_eq!(intent.customer_price_expectation, Some(Decimal::new(90, 0)));
        assert_eq!(intent.opportunity_cost, Some(Decimal::new(90, 0)));
        assert!(!intent.opportunity_cost_is_estimated);

        let json = serde_json::to_value(&intent).expect("serialize intent");
        assert_eq!(json["intentType"], "buy");
        assert_eq!(json["rejectionReason"], "price_too_high");
        assert!(json["estimatedRevenue"].is_null());
    }
}
