use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A purchasable variation of a product. Variants without stock never match an intent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub variant_id: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub sku: String,
}

impl ProductVariant {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|value| value.trim()).filter(|value| !value.is_empty())
    }

    pub fn size(&self) -> Option<&str> {
        self.attribute("size")
    }

    pub fn color(&self) -> Option<&str> {
        self.attribute("color")
    }

    pub fn is_available(&self) -> bool {
        self.stock > 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_id: ProductId,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Derived from variant stock; never stored independently.
    pub fn in_stock(&self) -> bool {
        self.variants.iter().any(ProductVariant::is_available)
    }

    pub fn available_variants(&self) -> impl Iterator<Item = &ProductVariant> {
        self.variants.iter().filter(|variant| variant.is_available())
    }

    /// Distinct sizes across in-stock variants, in first-seen order.
    pub fn available_sizes(&self) -> Vec<&str> {
        distinct(self.available_variants().filter_map(ProductVariant::size))
    }

    /// Distinct colors across in-stock variants, in first-seen order.
    pub fn available_colors(&self) -> Vec<&str> {
        distinct(self.available_variants().filter_map(ProductVariant::color))
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = BTreeSet::new();
    values.filter(|value| seen.insert(value.to_ascii_lowercase())).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use super::{Product, ProductId, ProductVariant};

    fn variant(id: &str, size: &str, color: &str, stock: u32) -> ProductVariant {
        ProductVariant {
            variant_id: id.to_string(),
            attributes: BTreeMap::from([
                ("size".to_string(), size.to_string()),
                ("color".to_string(), color.to_string()),
            ]),
            stock,
            sku: format!("SKU-{id}"),
        }
    }

    fn product(variants: Vec<ProductVariant>) -> Product {
        Product {
            product_id: ProductId("court-king".to_string()),
            name: "Court King".to_string(),
            category: "Basketball Shoes".to_string(),
            price: Decimal::new(120, 0),
            currency: "USD".to_string(),
            description: String::new(),
            tags: Default::default(),
            images: Vec::new(),
            variants,
        }
    }

    #[test]
    fn in_stock_requires_a_variant_with_stock() {
        assert!(!product(vec![variant("v1", "42", "Red", 0)]).in_stock());
        assert!(product(vec![variant("v1", "42", "Red", 0), variant("v2", "43", "Red", 1)])
            .in_stock());
        assert!(!product(Vec::new()).in_stock());
    }

    #[test]
    fn available_sizes_skip_empty_stock_and_duplicates() {
        let product = product(vec![
            variant("v1", "42", "Red", 3),
            variant("v2", "42", "Black", 1),
            variant("v3", "44", "White", 0),
            variant("v4", "43", "red", 2),
        ]);

        assert_eq!(product.available_sizes(), vec!["42", "43"]);
        assert_eq!(product.available_colors(), vec!["Red", "Black"]);
    }

    #[test]
    fn product_document_uses_camel_case_keys() {
        let json = serde_json::to_value(product(vec![variant("v1", "42", "Red", 3)]))
            .expect("serialize product");

        assert_eq!(json["productId"], "court-king");
        assert_eq!(json["variants"][0]["variantId"], "v1");
        assert_eq!(json["price"], serde_json::json!(120.0));
    }
}
