//! Candidate scoring and ordering.
//!
//! Scores are additive and may go negative. Ordering is by descending score
//! with catalog order preserved among ties.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::intent::ExtractedProductIntent;
use crate::domain::product::{Product, ProductVariant};
use crate::matching::{self, CategoryMatch};

/// Hard ceiling on surfaced results, whatever the caller asks for.
pub const MAX_RESULTS: usize = 5;

const IN_STOCK_SCORE: i32 = 10;
const PRICE_FIT_SCORE: i32 = 40;
const PRICE_BELOW_RANGE_SCORE: i32 = 20;
const PRICE_ABOVE_RANGE_SCORE: i32 = 5;
const VARIANT_MATCH_SCORE: i32 = 30;
const VARIANT_MISSING_PENALTY: i32 = -20;
const VARIANT_AVAILABLE_SCORE: i32 = 10;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedProduct {
    #[serde(flatten)]
    pub product: Product,
    #[serde(rename = "inStock")]
    pub in_stock: bool,
    pub match_score: i32,
    pub match_reasons: Vec<String>,
    pub matched_variant: Option<ProductVariant>,
    #[serde(rename = "agentSummary", skip_serializing_if = "Option::is_none")]
    pub agent_summary: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Score {
    pub total: i32,
    pub reasons: Vec<String>,
    pub matched_variant: Option<ProductVariant>,
}

impl Score {
    fn add(&mut self, points: i32, reason: String) {
        self.total += points;
        self.reasons.push(reason);
    }
}

/// Clamps a caller-supplied limit into `1..=ceiling`, defaulting to the ceiling.
pub fn effective_limit(requested: Option<usize>, ceiling: usize) -> usize {
    let ceiling = ceiling.clamp(1, MAX_RESULTS);
    requested.unwrap_or(ceiling).clamp(1, ceiling)
}

pub fn score(product: &Product, intent: &ExtractedProductIntent) -> Score {
    let mut score = Score { total: 0, reasons: Vec::new(), matched_variant: None };

    if product.in_stock() {
        score.add(IN_STOCK_SCORE, "in_stock".to_string());
    }

    if let Some(requested) = intent.category.as_deref() {
        let kind = matching::classify(requested, &product.category);
        let reason = match kind {
            CategoryMatch::Exact => "category_exact_match".to_string(),
            CategoryMatch::ProductMoreSpecific => "category_hierarchical_match".to_string(),
            CategoryMatch::IntentMoreSpecific => {
                format!("category_too_generic:{}", product.category)
            }
            CategoryMatch::NoMatch => format!("category_mismatch:{}", product.category),
        };
        score.add(kind.score(), reason);
    }

    score_price(&mut score, product.price, intent);
    score_variant(&mut score, product, intent);
    score
}

fn score_price(score: &mut Score, price: Decimal, intent: &ExtractedProductIntent) {
    let shown = price.normalize();
    match (intent.price_min, intent.price_max) {
        (Some(min), Some(max)) => {
            if price < min {
                score.add(PRICE_BELOW_RANGE_SCORE, format!("price_below_min:{shown}"));
            } else if price > max {
                score.add(PRICE_ABOVE_RANGE_SCORE, format!("price_above_max:{shown}"));
            } else {
                score.add(PRICE_FIT_SCORE, format!("price_in_range:{shown}"));
            }
        }
        (None, Some(max)) => {
            if price <= max {
                score.add(PRICE_FIT_SCORE, format!("price_within_max:{shown}"));
            } else {
                score.add(0, format!("price_above_max:{shown}"));
            }
        }
        (Some(min), None) => {
            if price >= min {
                score.add(PRICE_FIT_SCORE, format!("price_above_min:{shown}"));
            } else {
                score.add(0, format!("price_below_min:{shown}"));
            }
        }
        (None, None) => {}
    }
}

fn score_variant(score: &mut Score, product: &Product, intent: &ExtractedProductIntent) {
    let matched = matching::first_matching_variant(product, intent);

    if intent.has_variant_criteria() {
        match matched {
            Some(variant) => {
                score.total += VARIANT_MATCH_SCORE;
                if let Some(size) = intent.size.as_deref() {
                    score.reasons.push(format!("size_match:{}", size.trim()));
                }
                if let Some(color) = intent.color.as_deref() {
                    score.reasons.push(format!("color_match:{}", color.trim()));
                }
                score.matched_variant = Some(variant.clone());
            }
            None => score.add(VARIANT_MISSING_PENALTY, "no_matching_variant".to_string()),
        }
    } else if let Some(variant) = matched {
        score.add(VARIANT_AVAILABLE_SCORE, format!("variant_available:{}", variant.variant_id));
        score.matched_variant = Some(variant.clone());
    }
}

/// Scores, orders and truncates candidates. `limit` is clamped to
/// [`MAX_RESULTS`].
pub fn rank(
    candidates: &[Product],
    intent: &ExtractedProductIntent,
    limit: usize,
) -> Vec<RankedProduct> {
    let mut scored: Vec<(&Product, Score)> =
        candidates.iter().map(|product| (product, score(product, intent))).collect();
    // sort_by is stable, ties keep catalog order
    scored.sort_by(|left, right| right.1.total.cmp(&left.1.total));

    scored
        .into_iter()
        .take(limit.clamp(1, MAX_RESULTS))
        .map(|(product, score)| RankedProduct {
            in_stock: product.in_stock(),
            match_score: score.total,
            match_reasons: score.reasons,
            matched_variant: score.matched_variant,
            agent_summary: Some(agent_summary(product)),
            product: product.clone(),
        })
        .collect()
}

/// One-paragraph description a voice agent can read aloud.
pub fn agent_summary(product: &Product) -> String {
    let mut parts = vec![product.name.trim().to_string()];

    let description = product.description.trim();
    if !description.is_empty() {
        parts.push(description.trim_end_matches('.').to_string());
    }

    let sizes = product.available_sizes();
    if !sizes.is_empty() {
        parts.push(format!("Available sizes: {}", sizes.join(", ")));
    }

    let colors = product.available_colors();
    if !colors.is_empty() {
        parts.push(format!("Available colors: {}", colors.join(", ")));
    }

    if !product.tags.is_empty() {
        let tags: Vec<&str> = product.tags.iter().map(String::as_str).collect();
        parts.push(format!("Tags: {}", tags.join(", ")));
    }

    parts.push(format!("Price: {} {}", product.price.normalize(), product.currency));
    format!("{}.", parts.join(". "))
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use rust_decimal::Decimal;

    use super::{agent_summary, effective_limit, rank, score};
    use crate::domain::intent::ExtractedProductIntent;
    use crate::domain::product::{Product, ProductId, ProductVariant};

    fn variant(id: &str, size: &str, color: &str, stock: u32) -> ProductVariant {
        ProductVariant {
            variant_id: id.to_string(),
            attributes: BTreeMap::from([
                ("size".to_string(), size.to_string()),
                ("color".to_string(), color.to_string()),
            ]),
            stock,
            sku: String::new(),
        }
    }

    fn product(id: &str, category: &str, price: i64, variants: Vec<ProductVariant>) -> Product {
        Product {
            product_id: ProductId(id.to_string()),
            name: id.to_string(),
            category: category.to_string(),
            price: Decimal::new(price, 0),
            currency: "USD".to_string(),
            description: String::new(),
            tags: BTreeSet::new(),
            images: Vec::new(),
            variants,
        }
    }

    #[test]
    fn exact_category_with_size_and_budget_scores_highest() {
        let court = product("court", "Basketball Shoes", 120, vec![variant("c42", "42", "Red", 2)]);
        let intent = ExtractedProductIntent {
            category: Some("Basketball Shoes".to_string()),
            price_max: Some(Decimal::new(150, 0)),
            size: Some("42".to_string()),
            ..ExtractedProductIntent::default()
        };

        let scored = score(&court, &intent);

        assert_eq!(scored.total, 10 + 200 + 40 + 30);
        assert_eq!(
            scored.reasons,
            vec!["in_stock", "category_exact_match", "price_within_max:120", "size_match:42"]
        );
        assert_eq!(scored.matched_variant.map(|v| v.variant_id), Some("c42".to_string()));
    }

    #[test]
    fn price_bands_with_both_bounds() {
        let intent = ExtractedProductIntent {
            price_min: Some(Decimal::new(50, 0)),
            price_max: Some(Decimal::new(100, 0)),
            ..ExtractedProductIntent::default()
        };
        let variants = || vec![variant("v", "42", "Red", 1)];

        let below = score(&product("a", "Shoes", 40, variants()), &intent);
        let inside = score(&product("b", "Shoes", 75, variants()), &intent);
        let above = score(&product("c", "Shoes", 130, variants()), &intent);

        assert!(below.reasons.contains(&"price_below_min:40".to_string()));
        assert!(inside.reasons.contains(&"price_in_range:75".to_string()));
        assert!(above.reasons.contains(&"price_above_max:130".to_string()));
        assert_eq!(inside.total - below.total, 20);
        assert_eq!(below.total - above.total, 15);
    }

    #[test]
    fn missing_variant_is_penalised() {
        let plain = product("plain", "Shoes", 60, vec![variant("v", "40", "Blue", 1)]);
        let intent = ExtractedProductIntent {
            size: Some("42".to_string()),
            ..ExtractedProductIntent::default()
        };

        let scored = score(&plain, &intent);

        assert_eq!(scored.total, 10 - 20);
        assert!(scored.reasons.contains(&"no_matching_variant".to_string()));
        assert!(scored.matched_variant.is_none());
    }

    #[test]
    fn generic_product_for_specific_request_explains_itself() {
        let plain = product("plain", "Shoes", 60, vec![variant("v", "40", "Blue", 1)]);
        let intent = ExtractedProductIntent {
            category: Some("Running Shoes".to_string()),
            ..ExtractedProductIntent::default()
        };

        let scored = score(&plain, &intent);

        assert!(scored.reasons.contains(&"category_too_generic:Shoes".to_string()));
        assert!(scored.reasons.contains(&"variant_available:v".to_string()));
    }

    #[test]
    fn ranking_is_stable_and_capped() {
        let catalog: Vec<Product> = (0..8)
            .map(|i| product(&format!("p{i}"), "Shoes", 50, vec![variant("v", "42", "Red", 1)]))
            .collect();
        let intent = ExtractedProductIntent::default();

        let ranked = rank(&catalog, &intent, effective_limit(Some(20), 5));
        let again = rank(&catalog, &intent, effective_limit(Some(20), 5));

        assert_eq!(ranked.len(), 5);
        let ids: Vec<&str> = ranked.iter().map(|r| r.product.product_id.as_str()).collect();
        assert_eq!(ids, vec!["p0", "p1", "p2", "p3", "p4"]);
        assert_eq!(ranked, again);
    }

    #[test]
    fn higher_scores_sort_first() {
        let catalog = vec![
            product("generic", "Shoes", 60, vec![variant("g", "42", "Red", 1)]),
            product("court", "Basketball Shoes", 120, vec![variant("c", "42", "Red", 1)]),
        ];
        let intent = ExtractedProductIntent {
            category: Some("Basketball Shoes".to_string()),
            ..ExtractedProductIntent::default()
        };

        let ranked = rank(&catalog, &intent, 5);

        assert_eq!(ranked[0].product.product_id.as_str(), "court");
        assert_eq!(ranked[1].product.product_id.as_str(), "generic");
    }

    #[test]
    fn limit_defaults_to_ceiling_and_never_drops_to_zero() {
        assert_eq!(effective_limit(None, 5), 5);
        assert_eq!(effective_limit(Some(0), 5), 1);
        assert_eq!(effective_limit(Some(3), 5), 3);
        assert_eq!(effective_limit(Some(9), 3), 3);
    }

    #[test]
    fn summary_lists_sizes_colors_tags_and_price() {
        let mut court = product(
            "Court King",
            "Basketball Shoes",
            120,
            vec![variant("a", "42", "Red", 2), variant("b", "43", "Black", 1), variant("c", "44", "White", 0)],
        );
        court.description = "High-top with ankle support.".to_string();
        court.tags = BTreeSet::from(["basketball".to_string(), "high-top".to_string()]);

        assert_eq!(
            agent_summary(&court),
            "Court King. High-top with ankle support. Available sizes: 42, 43. \
             Available colors: Red, Black. Tags: basketball, high-top. Price: 120 USD."
        );
    }

    #[test]
    fn ranked_product_serializes_flat() {
        let court = product("court", "Basketball Shoes", 120, vec![variant("c", "42", "Red", 1)]);
        let ranked = rank(&[court], &ExtractedProductIntent::default(), 5);

        let json = serde_json::to_value(&ranked[0]).expect("serialize ranked product");

        assert_eq!(json["productId"], "court");
        assert_eq!(json["inStock"], true);
        assert_eq!(json["match_score"], 20);
        assert_eq!(json["matched_variant"]["variantId"], "c");
        assert!(json["agentSummary"].is_string());
    }
}
