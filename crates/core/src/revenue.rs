//! Revenue and opportunity-cost attribution for captured intents.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::intent::{IntentDraft, IntentType, Outcome, RejectionReason};
use crate::domain::product::Product;

/// Number of same-category products averaged when the requested product was
/// not found.
pub const SIMILAR_PRODUCT_SAMPLE: usize = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityCost {
    pub amount: Option<Decimal>,
    pub is_estimated: bool,
}

impl OpportunityCost {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn exact(amount: Option<Decimal>) -> Self {
        Self { amount, is_estimated: false }
    }

    /// A missing amount is never flagged as an estimate.
    pub fn estimate(amount: Option<Decimal>) -> Self {
        Self { amount, is_estimated: amount.is_some() }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Attribution {
    pub estimated_revenue: Option<Decimal>,
    pub opportunity_cost: OpportunityCost,
}

/// Prices known for one intent at attribution time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PriceContext {
    pub product_price: Option<Decimal>,
    pub similar_product_price: Option<Decimal>,
}

pub fn price_expectation(price_min: Option<Decimal>, price_max: Option<Decimal>) -> Option<Decimal> {
    match (price_min, price_max) {
        (Some(min), Some(max)) if min == max => Some(min),
        (Some(min), Some(max)) => Some((min + max) / Decimal::TWO),
        (Some(min), None) => Some(min),
        (None, max) => max,
    }
}

pub fn intent_weight(intent_type: IntentType) -> Decimal {
    match intent_type {
        IntentType::Buy => Decimal::new(8, 1),
        IntentType::Compare => Decimal::new(5, 1),
        IntentType::Inquire => Decimal::new(2, 1),
    }
}

pub fn estimated_revenue(
    price: Option<Decimal>,
    intent_type: IntentType,
    confidence: f64,
) -> Option<Decimal> {
    let price = price?;
    let confidence = Decimal::try_from(clamp_confidence(confidence)).unwrap_or(Decimal::ZERO);
    Some((price * intent_weight(intent_type) * confidence).round_dp(2))
}

pub fn opportunity_cost(
    reason: Option<RejectionReason>,
    price: Option<Decimal>,
    customer_price_expectation: Option<Decimal>,
    similar_product_price: Option<Decimal>,
) -> OpportunityCost {
    match reason {
        Some(RejectionReason::VariantMissing | RejectionReason::OutOfStock) => {
            OpportunityCost::exact(price)
        }
        Some(RejectionReason::PriceTooHigh) => match customer_price_expectation {
            Some(expected) => OpportunityCost::exact(Some(expected)),
            None => OpportunityCost::estimate(
                price.map(|price| (price * Decimal::new(8, 1)).round_dp(2)),
            ),
        },
        Some(RejectionReason::ProductNotFound) => OpportunityCost::estimate(similar_product_price),
        Some(RejectionReason::FeatureMissing | RejectionReason::Other) | None => {
            OpportunityCost::none()
        }
    }
}

/// Mean price of at most [`SIMILAR_PRODUCT_SAMPLE`] products.
pub fn average_price(products: &[Product]) -> Option<Decimal> {
    let sample = &products[..products.len().min(SIMILAR_PRODUCT_SAMPLE)];
    if sample.is_empty() {
        return None;
    }
    let total: Decimal = sample.iter().map(|product| product.price).sum();
    Some((total / Decimal::from(sample.len())).round_dp(2))
}

/// Revenue while the intent is open or accepted, opportunity cost once rejected.
pub fn attribute(draft: &IntentDraft, prices: PriceContext) -> Attribution {
    let estimated_revenue = match draft.outcome {
        None | Some(Outcome::Accepted) => {
            estimated_revenue(prices.product_price, draft.intent_type, draft.confidence)
        }
        Some(Outcome::Rejected | Outcome::Abandoned) => None,
    };

    let opportunity_cost = if draft.is_rejected() {
        opportunity_cost(
            draft.rejection_reason,
            prices.product_price,
            draft.customer_price_expectation(),
            prices.similar_product_price,
        )
    } else {
        OpportunityCost::none()
    };

    Attribution { estimated_revenue, opportunity_cost }
}

/// Whether attributing this draft needs the similar-category price average.
pub fn needs_similar_price(draft: &IntentDraft) -> bool {
    draft.is_rejected()
        && draft.rejection_reason == Some(RejectionReason::ProductNotFound)
        && draft.category.as_deref().is_some_and(|category| !category.trim().is_empty())
}

pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}
