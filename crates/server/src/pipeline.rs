//! Post-call ingestion: session bookkeeping, intent normalization, pricing
//! and attribution, then one write per intent.
//!
//! The "session exists" check is a plain read followed by a write. Two
//! concurrent deliveries of the same conversation can both miss and both
//! write; the second write overwrites the first. Writes are not
//! transactional, so a failure after the session write leaves a session with
//! fewer intents than were captured.

use chrono::Utc;
use futures::future::join_all;
use tracing::{info, warn};
use uuid::Uuid;

use callcart_agent::{AgentRuntime, NormalizeRequest};
use callcart_core::domain::catalog::CatalogIndex;
use callcart_core::domain::intent::{IntentDraft, IntentId, IntentStamp};
use callcart_core::domain::merchant::{MerchantId, MerchantMetadata};
use callcart_core::domain::session::{Session, SessionId, TranscriptTurn};
use callcart_core::errors::ApplicationError;
use callcart_core::revenue::{self, PriceContext, SIMILAR_PRODUCT_SAMPLE};
use callcart_db::{ProductQuery, Repositories, RepositoryError};

/// A validated transcript ready for ingestion. `turns` holds at least one user turn.
#[derive(Clone, Debug)]
pub struct CallTranscript {
    pub conversation_id: String,
    pub agent_id: String,
    pub merchant_id: MerchantId,
    pub turns: Vec<TranscriptTurn>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestionOutcome {
    pub session_id: SessionId,
    pub session_created: bool,
    pub intent_ids: Vec<IntentId>,
}

pub struct IngestionPipeline<'a> {
    repositories: &'a Repositories,
    agent: &'a AgentRuntime,
}

impl<'a> IngestionPipeline<'a> {
    pub fn new(repositories: &'a Repositories, agent: &'a AgentRuntime) -> Self {
        Self { repositories, agent }
    }

    pub async fn ingest(&self, call: CallTranscript) -> Result<IngestionOutcome, ApplicationError> {
        let merchant_id = call.merchant_id.clone();
        let session_id = SessionId(call.conversation_id.clone());

        let existing =
            self.repositories.sessions.find_by_id(&merchant_id, &session_id).await.map_err(persistence)?;
        let session_created = existing.is_none();
        if session_created {
            let session = Session::from_transcript(
                &call.conversation_id,
                merchant_id.clone(),
                &call.agent_id,
                call.turns.clone(),
                Utc::now(),
            );
            self.repositories.sessions.save(session).await.map_err(persistence)?;
            info!(
                event_name = "ingest.session.created",
                correlation_id = %call.conversation_id,
                merchant_id = %merchant_id.as_str(),
                "session recorded"
            );
        }

        let merchant = self.merchant_metadata(&merchant_id).await;
        let catalog = self
            .repositories
            .products
            .query(&merchant_id, &ProductQuery::default())
            .await
            .map_err(persistence)?;
        let index = CatalogIndex::new(&catalog);

        let analysis = self
            .agent
            .normalizer
            .normalize(NormalizeRequest {
                transcript: &call.turns,
                merchant_id: &merchant_id,
                merchant: merchant.as_ref(),
                catalog: &index,
            })
            .await;

        let prices = join_all(
            analysis.intents.iter().map(|draft| self.price_context(&merchant_id, draft)),
        )
        .await;

        let mut intent_ids = Vec::with_capacity(analysis.intents.len());
        for (draft, prices) in analysis.intents.into_iter().zip(prices) {
            let attribution = revenue::attribute(&draft, prices);
            let intent = draft.into_intent(
                IntentStamp {
                    intent_id: new_intent_id(),
                    session_id: session_id.clone(),
                    merchant_id: merchant_id.clone(),
                    timestamp: Utc::now(),
                },
                attribution,
            );
            let intent_id = intent.intent_id.clone();
            self.repositories.intents.save(intent).await.map_err(persistence)?;
            intent_ids.push(intent_id);
        }

        info!(
            event_name = "ingest.intents.persisted",
            correlation_id = %call.conversation_id,
            merchant_id = %merchant_id.as_str(),
            session_created,
            intents = intent_ids.len(),
            "transcript ingested"
        );

        Ok(IngestionOutcome { session_id, session_created, intent_ids })
    }

    async fn merchant_metadata(&self, merchant_id: &MerchantId) -> Option<MerchantMetadata> {
        match self.repositories.merchants.find_by_id(merchant_id).await {
            Ok(merchant) => merchant,
            Err(error) => {
                warn!(
                    event_name = "ingest.merchant.lookup_failed",
                    merchant_id = %merchant_id.as_str(),
                    error = %error,
                    "merchant metadata unavailable; using bare merchant id"
                );
                None
            }
        }
    }

    /// Lookup failures degrade to an unknown price for that intent only.
    async fn price_context(&self, merchant_id: &MerchantId, draft: &IntentDraft) -> PriceContext {
        let product_price = match &draft.product_id {
            Some(product_id) => {
                match self.repositories.products.find_by_id(merchant_id, product_id).await {
                    Ok(product) => product.map(|product| product.price),
                    Err(error) => {
                        warn!(
                            event_name = "ingest.price.lookup_failed",
                            merchant_id = %merchant_id.as_str(),
                            product_id = %product_id.as_str(),
                            error = %error,
                            "product price lookup failed"
                        );
                        None
                    }
                }
            }
            None => None,
        };

        let similar_product_price = match draft.category.as_deref() {
            Some(category) if revenue::needs_similar_price(draft) => {
                let query = ProductQuery::same_category(category, SIMILAR_PRODUCT_SAMPLE);
                match self.repositories.products.query(merchant_id, &query).await {
                    Ok(similar) => revenue::average_price(&similar),
                    Err(error) => {
                        warn!(
                            event_name = "ingest.price.similar_lookup_failed",
                            merchant_id = %merchant_id.as_str(),
                            category,
                            error = %error,
                            "similar product lookup failed"
                        );
                        None
                    }
                }
            }
            _ => None,
        };

        PriceContext { product_price, similar_product_price }
    }
}

fn new_intent_id() -> IntentId {
    IntentId(format!("INT-{}", Uuid::new_v4().simple()))
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}
