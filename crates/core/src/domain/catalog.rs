use std::collections::{HashMap, HashSet};

use crate::domain::product::{Product, ProductId};

/// Case-insensitive product-name index used to ground names produced by the
/// language model. Lookups are exact; unmatched names resolve to `None`.
#[derive(Clone, Debug, Default)]
pub struct CatalogIndex {
    names: Vec<String>,
    by_name: HashMap<String, ProductId>,
    ids: HashSet<ProductId>,
}

impl CatalogIndex {
    pub fn new(products: &[Product]) -> Self {
        let mut index = Self::default();
        for product in products {
            index.ids.insert(product.product_id.clone());

            let key = name_key(&product.name);
            if key.is_empty() || index.by_name.contains_key(&key) {
                continue;
            }
            index.by_name.insert(key, product.product_id.clone());
            index.names.push(product.name.trim().to_string());
        }
        index
    }

    pub fn resolve(&self, name: &str) -> Option<&ProductId> {
        self.by_name.get(&name_key(name))
    }

    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.ids.contains(product_id)
    }

    /// Display names in catalog order, one per distinct name.
    pub fn product_names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::CatalogIndex;
    use crate::domain::product::{Product, ProductId};

    fn product(id: &str, name: &str) -> Product {
        Product {
            product_id: ProductId(id.to_string()),
            name: name.to_string(),
            category: "Shoes".to_string(),
            price: Decimal::new(50, 0),
            currency: "USD".to_string(),
            description: String::new(),
            tags: Default::default(),
            images: Vec::new(),
            variants: Vec::new(),
        }
    }

    #[test]
    fn resolves_names_case_insensitively() {
        let index = CatalogIndex::new(&[product("p1", "Air Glide 2"), product("p2", "Court King")]);

        assert_eq!(index.resolve("air glide 2"), Some(&ProductId("p1".to_string())));
        assert_eq!(index.resolve("  COURT KING "), Some(&ProductId("p2".to_string())));
        assert_eq!(index.product_names(), ["Air Glide 2", "Court King"]);
    }

    #[test]
    fn never_guesses_partial_names() {
        let index = CatalogIndex::new(&[product("p1", "Air Glide 2")]);

        assert_eq!(index.resolve("Air Glide"), None);
        assert_eq!(index.resolve(""), None);
    }

    #[test]
    fn first_product_wins_on_duplicate_names() {
        let index = CatalogIndex::new(&[product("p1", "Runner"), product("p2", "runner")]);

        assert_eq!(index.resolve("Runner"), Some(&ProductId("p1".to_string())));
        assert!(index.contains(&ProductId("p2".to_string())));
        assert_eq!(index.product_names().len(), 1);
    }
}
