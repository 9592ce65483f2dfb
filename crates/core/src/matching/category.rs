use serde::{Deserialize, Serialize};

/// Relationship between a requested category and a product's category.
///
/// Matching is directional: a generic request may be satisfied by a more
/// specific product category, never the other way round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryMatch {
    Exact,
    ProductMoreSpecific,
    IntentMoreSpecific,
    NoMatch,
}

impl CategoryMatch {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Exact | Self::ProductMoreSpecific)
    }

    pub fn score(&self) -> i32 {
        match self {
            Self::Exact => 200,
            Self::ProductMoreSpecific => 50,
            Self::IntentMoreSpecific | Self::NoMatch => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::ProductMoreSpecific => "product_more_specific",
            Self::IntentMoreSpecific => "intent_more_specific",
            Self::NoMatch => "no_match",
        }
    }
}

pub fn classify(intent_category: &str, product_category: &str) -> CategoryMatch {
    let requested = words(intent_category);
    let offered = words(product_category);

    if requested.is_empty() || offered.is_empty() {
        return CategoryMatch::NoMatch;
    }
    if requested == offered {
        return CategoryMatch::Exact;
    }

    match (requested.len(), offered.len()) {
        (1, n) if n > 1 => {
            if offered.contains(&requested[0]) {
                CategoryMatch::ProductMoreSpecific
            } else {
                CategoryMatch::NoMatch
            }
        }
        (n, 1) if n > 1 => {
            if requested.contains(&offered[0]) {
                CategoryMatch::IntentMoreSpecific
            } else {
                CategoryMatch::NoMatch
            }
        }
        (r, o) if o > r && requested.iter().all(|word| offered.contains(word)) => {
            CategoryMatch::ProductMoreSpecific
        }
        _ => CategoryMatch::NoMatch,
    }
}

fn words(category: &str) -> Vec<String> {
    category.split_whitespace().map(str::to_lowercase).collect()
}
