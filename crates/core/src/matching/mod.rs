//! Candidate filtering: a product survives when it is in stock, within the
//! requested price bounds, in an accepted category and carries a matching
//! variant.

pub mod category;
pub mod variant;

use crate::domain::intent::ExtractedProductIntent;
use crate::domain::product::Product;

pub use category::{classify, CategoryMatch};
pub use variant::{first_matching_variant, variant_matches};

pub fn filter(products: &[Product], intent: &ExtractedProductIntent) -> Vec<Product> {
    products.iter().filter(|product| accepts(product, intent)).cloned().collect()
}

pub fn accepts(product: &Product, intent: &ExtractedProductIntent) -> bool {
    if !product.in_stock() {
        return false;
    }
    if intent.price_min.is_some_and(|min| product.price < min) {
        return false;
    }
    if intent.price_max.is_some_and(|max| product.price > max) {
        return false;
    }
    if let Some(category) = intent.category.as_deref() {
        if !classify(category, &product.category).is_accepted() {
            return false;
        }
    }
    first_matching_variant(product, intent).is_some()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use super::filter;
    use crate::domain::intent::ExtractedProductIntent;
    use crate::domain::product::{Product, ProductId, ProductVariant};

    fn product(id: &str, category: &str, price: i64, size: &str, stock: u32) -> Product {
        Product {
            product_id: ProductId(id.to_string()),
            name: id.to_string(),
            category: category.to_string(),
            price: Decimal::new(price, 0),
            currency: "USD".to_string(),
            description: String::new(),
            tags: Default::default(),
            images: Vec::new(),
            variants: vec![ProductVariant {
                variant_id: format!("{id}-v1"),
                attributes: BTreeMap::from([
                    ("size".to_string(), size.to_string()),
                    ("color".to_string(), "Black".to_string()),
                ]),
                stock,
                sku: String::new(),
            }],
        }
    }

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|product| product.product_id.as_str()).collect()
    }

    #[test]
    fn generic_category_keeps_specific_products() {
        let catalog = vec![
            product("court", "Basketball Shoes", 120, "42", 3),
            product("tee", "Clothing", 30, "M", 3),
        ];
        let intent = ExtractedProductIntent {
            category: Some("shoes".to_string()),
            ..ExtractedProductIntent::default()
        };

        assert_eq!(ids(&filter(&catalog, &intent)), vec!["court"]);
    }

    #[test]
    fn specific_request_excludes_generic_products() {
        let catalog = vec![product("plain", "Shoes", 60, "42", 3)];
        let intent = ExtractedProductIntent {
            category: Some("Basketball Shoes".to_string()),
            ..ExtractedProductIntent::default()
        };

        assert!(filter(&catalog, &intent).is_empty());
    }

    #[test]
    fn price_bounds_and_stock_are_enforced() {
        let catalog = vec![
            product("cheap", "Shoes", 40, "42", 3),
            product("fits", "Shoes", 90, "42", 3),
            product("pricey", "Shoes", 200, "42", 3),
            product("gone", "Shoes", 90, "42", 0),
        ];
        let intent = ExtractedProductIntent {
            price_min: Some(Decimal::new(50, 0)),
            price_max: Some(Decimal::new(150, 0)),
            ..ExtractedProductIntent::default()
        };

        assert_eq!(ids(&filter(&catalog, &intent)), vec!["fits"]);
    }

    #[test]
    fn requested_size_must_exist_in_stock() {
        let catalog = vec![product("a", "Shoes", 90, "41", 3), product("b", "Shoes", 90, "42", 1)];
        let intent = ExtractedProductIntent {
            size: Some("42".to_string()),
            ..ExtractedProductIntent::default()
        };

        assert_eq!(ids(&filter(&catalog, &intent)), vec!["b"]);
    }
}
