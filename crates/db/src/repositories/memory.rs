use std::collections::HashMap;

use tokio::sync::RwLock;

use callcart_core::domain::intent::Intent;
use callcart_core::domain::merchant::{MerchantId, MerchantMetadata};
use callcart_core::domain::product::{Product, ProductId};
use callcart_core::domain::session::{Session, SessionId};

use super::{
    IntentRepository, MerchantRepository, ProductQuery, ProductRepository, RepositoryError,
    SessionRepository,
};

/// Catalog per merchant, kept in insertion order.
#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<String, Vec<Product>>>,
}

fn upsert_product(catalog: &mut Vec<Product>, product: Product) {
    match catalog.iter_mut().find(|existing| existing.product_id == product.product_id) {
        Some(existing) => *existing = product,
        None => catalog.push(product),
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(
        &self,
        merchant_id: &MerchantId,
        id: &ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products
            .get(&merchant_id.0)
            .and_then(|catalog| catalog.iter().find(|product| &product.product_id == id))
            .cloned())
    }

    async fn query(
        &self,
        merchant_id: &MerchantId,
        query: &ProductQuery,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let Some(catalog) = products.get(&merchant_id.0) else {
            return Ok(Vec::new());
        };
        Ok(catalog
            .iter()
            .filter(|product| query.matches(product))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn save(
        &self,
        merchant_id: &MerchantId,
        product: Product,
    ) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        upsert_product(products.entry(merchant_id.0.clone()).or_default(), product);
        Ok(())
    }

    async fn save_batch(
        &self,
        merchant_id: &MerchantId,
        batch: Vec<Product>,
    ) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        let catalog = products.entry(merchant_id.0.clone()).or_default();
        for product in batch {
            upsert_product(catalog, product);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<(String, String), Session>>,
}

#[async_trait::async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn find_by_id(
        &self,
        merchant_id: &MerchantId,
        id: &SessionId,
    ) -> Result<Option<Session>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&(merchant_id.0.clone(), id.0.clone())).cloned())
    }

    async fn save(&self, session: Session) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert((session.merchant_id.0.clone(), session.session_id.0.clone()), session);
        Ok(())
    }
}

/// Intents per merchant, in write order.
#[derive(Default)]
pub struct InMemoryIntentRepository {
    intents: RwLock<HashMap<String, Vec<Intent>>>,
}

#[async_trait::async_trait]
impl IntentRepository for InMemoryIntentRepository {
    async fn save(&self, intent: Intent) -> Result<(), RepositoryError> {
        let mut intents = self.intents.write().await;
        if intents.values().flatten().any(|existing| existing.intent_id == intent.intent_id) {
            return Err(RepositoryError::Conflict(format!(
                "intent `{}` already exists",
                intent.intent_id.0
            )));
        }
        intents.entry(intent.merchant_id.0.clone()).or_default().push(intent);
        Ok(())
    }

    async fn list_for_session(
        &self,
        merchant_id: &MerchantId,
        session_id: &SessionId,
    ) -> Result<Vec<Intent>, RepositoryError> {
        let intents = self.intents.read().await;
        Ok(intents
            .get(&merchant_id.0)
            .map(|list| {
                list.iter().filter(|intent| &intent.session_id == session_id).cloned().collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryMerchantRepository {
    merchants: RwLock<HashMap<String, MerchantMetadata>>,
}

#[async_trait::async_trait]
impl MerchantRepository for InMemoryMerchantRepository {
    async fn find_by_id(
        &self,
        id: &MerchantId,
    ) -> Result<Option<MerchantMetadata>, RepositoryError> {
        let merchants = self.merchants.read().await;
        Ok(merchants.get(&id.0).cloned())
    }

    async fn save(&self, merchant: MerchantMetadata) -> Result<(), RepositoryError> {
        let mut merchants = self.merchants.write().await;
        merchants.insert(merchant.merchant_id.0.clone(), merchant);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use callcart_core::domain::intent::{Intent, IntentId, IntentType};
    use callcart_core::domain::merchant::MerchantId;
    use callcart_core::domain::product::ProductId;
    use callcart_core::domain::session::{Session, SessionId, TranscriptTurn};

    use super::{InMemoryIntentRepository, InMemoryProductRepository, InMemorySessionRepository};
    use crate::fixtures::DemoCatalog;
    use crate::repositories::{
        IntentRepository, ProductQuery, ProductRepository, RepositoryError, SessionRepository,
    };

    fn intent(id: &str, session: &str) -> Intent {
        Intent {
            intent_id: IntentId(id.to_string()),
            session_id: SessionId(session.to_string()),
            merchant_id: MerchantId("merchant_001".to_string()),
            product_id: Some(ProductId("court-king".to_string())),
            product_name: Some("Court King".to_string()),
            category: Some("Basketball Shoes".to_string()),
            intent_type: IntentType::Buy,
            outcome: None,
            intent_stage: None,
            rejection_reason: None,
            confidence: 0.9,
            price_min: None,
            price_max: None,
            customer_price_expectation: None,
            estimated_revenue: Some(Decimal::new(8640, 2)),
            opportunity_cost: None,
            opportunity_cost_is_estimated: false,
            variant_attributes: None,
            normalized_intent: "Customer wants to buy Court King".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn in_memory_products_mirror_sql_query_semantics() {
        let repo = InMemoryProductRepository::default();
        let merchant = DemoCatalog::merchant_id();
        repo.save_batch(&merchant, DemoCatalog::products()).await.expect("seed");

        let in_stock = repo.query(&merchant, &ProductQuery::in_stock()).await.expect("query");
        let expected: Vec<_> = DemoCatalog::products()
            .into_iter()
            .filter(|product| product.in_stock())
            .collect();
        assert_eq!(in_stock, expected);

        let limited = ProductQuery { limit: Some(1), ..ProductQuery::default() };
        let first = repo.query(&merchant, &limited).await.expect("query limited");
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].product_id.as_str(), "court-king");

        let other = repo
            .query(&MerchantId("merchant_999".to_string()), &ProductQuery::default())
            .await
            .expect("query other merchant");
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn in_memory_product_save_replaces_in_place() {
        let repo = InMemoryProductRepository::default();
        let merchant = DemoCatalog::merchant_id();
        repo.save_batch(&merchant, DemoCatalog::products()).await.expect("seed");
        let mut court = DemoCatalog::products().remove(0);
        court.name = "Court King II".to_string();

        repo.save(&merchant, court).await.expect("update");

        let all = repo.query(&merchant, &ProductQuery::default()).await.expect("query all");
        assert_eq!(all.len(), DemoCatalog::products().len());
        assert_eq!(all[0].name, "Court King II");
    }

    #[tokio::test]
    async fn in_memory_sessions_are_keyed_by_merchant() {
        let repo = InMemorySessionRepository::default();
        let session = Session::from_transcript(
            "conv-1",
            MerchantId("merchant_001".to_string()),
            "agent-1",
            vec![TranscriptTurn::User("hello".to_string())],
            Utc::now(),
        );
        repo.save(session.clone()).await.expect("save");

        let found = repo
            .find_by_id(&session.merchant_id, &session.session_id)
            .await
            .expect("find");
        let missing = repo
            .find_by_id(&MerchantId("merchant_002".to_string()), &session.session_id)
            .await
            .expect("find other merchant");

        assert_eq!(found, Some(session));
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn in_memory_intents_reject_duplicates_and_filter_by_session() {
        let repo = InMemoryIntentRepository::default();
        repo.save(intent("INT-1", "conv-1")).await.expect("save first");
        repo.save(intent("INT-2", "conv-2")).await.expect("save second");

        let duplicate = repo.save(intent("INT-1", "conv-1")).await;
        let listed = repo
            .list_for_session(&MerchantId("merchant_001".to_string()), &SessionId("conv-1".to_string()))
            .await
            .expect("list");

        assert!(matches!(duplicate, Err(RepositoryError::Conflict(_))));
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].intent_id.as_str(), "INT-1");
    }
}
