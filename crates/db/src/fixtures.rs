use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use callcart_core::domain::merchant::{MerchantId, MerchantMetadata};
use callcart_core::domain::product::{Product, ProductId, ProductVariant, DEFAULT_CURRENCY};

use crate::repositories::{ProductQuery, Repositories, RepositoryError};

const DEMO_MERCHANT_ID: &str = "merchant_001";

/// `(variant_id, size, color, stock)`
type VariantSeed = (&'static str, &'static str, &'static str, u32);

struct ProductSeed {
    id: &'static str,
    name: &'static str,
    category: &'static str,
    price: i64,
    description: &'static str,
    tags: &'static [&'static str],
    variants: &'static [VariantSeed],
}

const DEMO_PRODUCTS: &[ProductSeed] = &[
    ProductSeed {
        id: "court-king",
        name: "Court King",
        category: "Basketball Shoes",
        price: 120,
        description: "High-top basketball shoe with ankle support",
        tags: &["basketball", "high-top"],
        variants: &[
            ("court-king-42-red", "42", "Red", 5),
            ("court-king-43-black", "43", "Black", 3),
            ("court-king-44-red", "44", "Red", 0),
        ],
    },
    ProductSeed {
        id: "sky-dunk-pro",
        name: "Sky Dunk Pro",
        category: "Basketball Shoes",
        price: 165,
        description: "Lightweight performance shoe for explosive players",
        tags: &["basketball", "performance"],
        variants: &[
            ("sky-dunk-41-white", "41", "White", 2),
            ("sky-dunk-42-white", "42", "White", 4),
            ("sky-dunk-45-black", "45", "Black", 1),
        ],
    },
    ProductSeed {
        id: "air-glide-2",
        name: "Air Glide 2",
        category: "Running Shoes",
        price: 95,
        description: "Cushioned daily trainer",
        tags: &["running", "road"],
        variants: &[
            ("air-glide-40-blue", "40", "Blue", 6),
            ("air-glide-42-blue", "42", "Blue", 2),
            ("air-glide-42-grey", "42", "Grey", 3),
        ],
    },
    ProductSeed {
        id: "trail-blazer",
        name: "Trail Blazer",
        category: "Trail Running Shoes",
        price: 135,
        description: "Grippy outsole for rough terrain",
        tags: &["running", "trail"],
        variants: &[
            ("trail-blazer-42-green", "42", "Green", 2),
            ("trail-blazer-43-orange", "43", "Orange", 1),
        ],
    },
    ProductSeed {
        id: "street-loafer",
        name: "Street Loafer",
        category: "Casual Shoes",
        price: 70,
        description: "Slip-on leather loafer",
        tags: &["casual", "leather"],
        variants: &[
            ("street-loafer-41-brown", "41", "Brown", 4),
            ("street-loafer-42-black", "42", "Black", 2),
        ],
    },
    ProductSeed {
        id: "marathon-elite",
        name: "Marathon Elite",
        category: "Running Shoes",
        price: 180,
        description: "Carbon-plated racing shoe",
        tags: &["running", "racing"],
        variants: &[
            ("marathon-elite-42-yellow", "42", "Yellow", 0),
            ("marathon-elite-43-yellow", "43", "Yellow", 0),
        ],
    },
    ProductSeed {
        id: "canvas-classic",
        name: "Canvas Classic",
        category: "Shoes",
        price: 55,
        description: "Everyday canvas sneaker",
        tags: &["casual", "canvas"],
        variants: &[("canvas-classic-42-white", "42", "White", 8)],
    },
];

impl ProductSeed {
    fn build(&self) -> Product {
        Product {
            product_id: ProductId(self.id.to_string()),
            name: self.name.to_string(),
            category: self.category.to_string(),
            price: Decimal::new(self.price, 0),
            currency: DEFAULT_CURRENCY.to_string(),
            description: self.description.to_string(),
            tags: self.tags.iter().map(|tag| tag.to_string()).collect::<BTreeSet<_>>(),
            images: vec![format!("https://cdn.example.com/products/{}.jpg", self.id)],
            variants: self
                .variants
                .iter()
                .map(|(variant_id, size, color, stock)| ProductVariant {
                    variant_id: variant_id.to_string(),
                    attributes: BTreeMap::from([
                        ("size".to_string(), size.to_string()),
                        ("color".to_string(), color.to_string()),
                    ]),
                    stock: *stock,
                    sku: variant_id.to_ascii_uppercase(),
                })
                .collect(),
        }
    }
}

/// Deterministic single-merchant sneaker catalog used by `callcart seed` and tests.
pub struct DemoCatalog;

impl DemoCatalog {
    pub fn merchant_id() -> MerchantId {
        MerchantId(DEMO_MERCHANT_ID.to_string())
    }

    pub fn merchant() -> MerchantMetadata {
        MerchantMetadata {
            name: "Demo Sneaker Store".to_string(),
            industry: "footwear".to_string(),
            ..MerchantMetadata::new(Self::merchant_id())
        }
    }

    pub fn products() -> Vec<Product> {
        DEMO_PRODUCTS.iter().map(ProductSeed::build).collect()
    }

    /// Idempotent: products are upserted by id.
    pub async fn load(repositories: &Repositories) -> Result<SeedResult, RepositoryError> {
        let merchant = Self::merchant();
        let products = Self::products();
        let products_seeded = products.len();

        repositories.merchants.save(merchant.clone()).await?;
        repositories.products.save_batch(&merchant.merchant_id, products).await?;

        tracing::info!(
            event_name = "db.fixtures.loaded",
            merchant_id = %merchant.merchant_id.as_str(),
            products_seeded,
            "demo catalog loaded"
        );

        Ok(SeedResult { merchant_id: merchant.merchant_id, products_seeded })
    }

    pub async fn verify(repositories: &Repositories) -> Result<VerificationResult, RepositoryError> {
        let merchant_id = Self::merchant_id();
        let mut checks = Vec::new();

        let merchant = repositories.merchants.find_by_id(&merchant_id).await?;
        checks.push(("merchant".to_string(), merchant.is_some()));

        for expected in Self::products() {
            let stored =
                repositories.products.find_by_id(&merchant_id, &expected.product_id).await?;
            checks.push((
                format!("product:{}", expected.product_id.as_str()),
                stored.as_ref() == Some(&expected),
            ));
        }

        let in_stock = repositories.products.query(&merchant_id, &ProductQuery::in_stock()).await?;
        let expected_in_stock =
            Self::products().iter().filter(|product| product.in_stock()).count();
        checks.push(("in-stock-count".to_string(), in_stock.len() == expected_in_stock));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub merchant_id: MerchantId,
    pub products_seeded: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}

impl VerificationResult {
    pub fn failed_checks(&self) -> Vec<&str> {
        self.checks.iter().filter(|(_, ok)| !*ok).map(|(name, _)| name.as_str()).collect()
    }
}
