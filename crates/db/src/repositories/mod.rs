use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use callcart_core::domain::intent::Intent;
use callcart_core::domain::merchant::{MerchantId, MerchantMetadata};
use callcart_core::domain::product::{Product, ProductId};
use callcart_core::domain::session::{Session, SessionId};

use crate::DbPool;

pub mod intent;
pub mod memory;
pub mod merchant;
pub mod product;
pub mod session;

pub use intent::SqlIntentRepository;
pub use memory::{
    InMemoryIntentRepository, InMemoryMerchantRepository, InMemoryProductRepository,
    InMemorySessionRepository,
};
pub use merchant::SqlMerchantRepository;
pub use product::SqlProductRepository;
pub use session::SqlSessionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Coarse catalog pre-filter. Results keep catalog insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub in_stock_only: bool,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Case-insensitive equality on the product category.
    pub category: Option<String>,
    pub limit: Option<usize>,
}

impl ProductQuery {
    pub fn in_stock() -> Self {
        Self { in_stock_only: true, ..Self::default() }
    }

    pub fn same_category(category: &str, limit: usize) -> Self {
        Self { category: Some(category.to_string()), limit: Some(limit), ..Self::default() }
    }

    pub fn matches(&self, product: &Product) -> bool {
        if self.in_stock_only && !product.in_stock() {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        match self.category.as_deref() {
            Some(category) => category_key(category) == category_key(&product.category),
            None => true,
        }
    }
}

pub(crate) fn category_key(category: &str) -> String {
    category.trim().to_lowercase()
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(
        &self,
        merchant_id: &MerchantId,
        id: &ProductId,
    ) -> Result<Option<Product>, RepositoryError>;
    async fn query(
        &self,
        merchant_id: &MerchantId,
        query: &ProductQuery,
    ) -> Result<Vec<Product>, RepositoryError>;
    async fn save(
        &self,
        merchant_id: &MerchantId,
        product: Product,
    ) -> Result<(), RepositoryError>;
    async fn save_batch(
        &self,
        merchant_id: &MerchantId,
        products: Vec<Product>,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn find_by_id(
        &self,
        merchant_id: &MerchantId,
        id: &SessionId,
    ) -> Result<Option<Session>, RepositoryError>;
    /// Plain overwrite; there is no compare-and-swap on creation.
    async fn save(&self, session: Session) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait IntentRepository: Send + Sync {
    /// Intents are immutable: saving an existing id is a conflict.
    async fn save(&self, intent: Intent) -> Result<(), RepositoryError>;
    async fn list_for_session(
        &self,
        merchant_id: &MerchantId,
        session_id: &SessionId,
    ) -> Result<Vec<Intent>, RepositoryError>;
}

#[async_trait]
pub trait MerchantRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &MerchantId,
    ) -> Result<Option<MerchantMetadata>, RepositoryError>;
    async fn save(&self, merchant: MerchantMetadata) -> Result<(), RepositoryError>;
}

/// Shared handles to every store the pipeline touches.
#[derive(Clone)]
pub struct Repositories {
    pub products: Arc<dyn ProductRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub intents: Arc<dyn IntentRepository>,
    pub merchants: Arc<dyn MerchantRepository>,
}

impl Repositories {
    pub fn sql(pool: DbPool) -> Self {
        Self {
            products: Arc::new(SqlProductRepository::new(pool.clone())),
            sessions: Arc::new(SqlSessionRepository::new(pool.clone())),
            intents: Arc::new(SqlIntentRepository::new(pool.clone())),
            merchants: Arc::new(SqlMerchantRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            products: Arc::new(InMemoryProductRepository::default()),
            sessions: Arc::new(InMemorySessionRepository::default()),
            intents: Arc::new(InMemoryIntentRepository::default()),
            merchants: Arc::new(InMemoryMerchantRepository::default()),
        }
    }
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Encode(e.to_string()))
}

pub(crate) fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(raw).map_err(|e| RepositoryError::Decode(e.to_string()))
}
