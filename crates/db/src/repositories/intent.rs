use sqlx::Row;

use callcart_core::domain::intent::Intent;
use callcart_core::domain::merchant::MerchantId;
use callcart_core::domain::session::SessionId;

use super::{from_json, to_json, IntentRepository, RepositoryError};
use crate::DbPool;

pub struct SqlIntentRepository {
    pool: DbPool,
}

impl SqlIntentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_intent(row: &sqlx::sqlite::SqliteRow) -> Result<Intent, RepositoryError> {
    let document: String =
        row.try_get("document").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    from_json(&document)
}

#[async_trait::async_trait]
impl IntentRepository for SqlIntentRepository {
    async fn save(&self, intent: Intent) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO intent (intent_id, merchant_id, session_id, document, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(intent.intent_id.as_str())
        .bind(intent.merchant_id.as_str())
        .bind(intent.session_id.as_str())
        .bind(to_json(&intent)?)
        .bind(intent.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(error)) if error.is_unique_violation() => Err(
                RepositoryError::Conflict(format!("intent `{}` already exists", intent.intent_id.0)),
            ),
            Err(error) => Err(error.into()),
        }
    }

    async fn list_for_session(
        &self,
        merchant_id: &MerchantId,
        session_id: &SessionId,
    ) -> Result<Vec<Intent>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT document FROM intent
             WHERE merchant_id = ? AND session_id = ?
             ORDER BY rowid ASC",
        )
        .bind(merchant_id.as_str())
        .bind(session_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_intent).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use callcart_core::domain::intent::{Intent, IntentId, IntentType, Outcome, RejectionReason};
    use callcart_core::domain::merchant::MerchantId;
    use callcart_core::domain::session::{Session, SessionId, TranscriptTurn};

    use super::SqlIntentRepository;
    use crate::repositories::{
        IntentRepository, RepositoryError, SessionRepository, SqlSessionRepository,
    };
    use crate::{connect_with_settings, migrations};

    fn intent(id: &str) -> Intent {
        Intent {
            intent_id: IntentId(id.to_string()),
            session_id: SessionId("conv-7".to_string()),
            merchant_id: MerchantId("merchant_001".to_string()),
            product_id: None,
            product_name: None,
            category: Some("Running Shoes".to_string()),
            intent_type: IntentType::Buy,
            outcome: Some(Outcome::Rejected),
            intent_stage: None,
            rejection_reason: Some(RejectionReason::PriceTooHigh),
            confidence: 0.8,
            price_min: None,
            price_max: Some(Decimal::new(90, 0)),
            customer_price_expectation: Some(Decimal::new(90, 0)),
            estimated_revenue: None,
            opportunity_cost: Some(Decimal::new(90, 0)),
            opportunity_cost_is_estimated: false,
            variant_attributes: None,
            normalized_intent: "Customer wants running shoes under 90".to_string(),
            timestamp: Utc::now(),
        }
    }

    async fn repos() -> (SqlSessionRepository, SqlIntentRepository) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let sessions = SqlSessionRepository::new(pool.clone());
        sessions
            .save(Session::from_transcript(
                "conv-7",
                MerchantId("merchant_001".to_string()),
                "agent-1",
                vec![TranscriptTurn::User("running shoes under 90".to_string())],
                Utc::now(),
            ))
            .await
            .expect("save session");
        (sessions, SqlIntentRepository::new(pool))
    }

    #[tokio::test]
    async fn intents_are_listed_per_session_in_write_order() {
        let (_sessions, repo) = repos().await;

        repo.save(intent("INT-b")).await.expect("save first");
        repo.save(intent("INT-a")).await.expect("save second");

        let listed = repo
            .list_for_session(&MerchantId("merchant_001".to_string()), &SessionId("conv-7".to_string()))
            .await
            .expect("list intents");

        let ids: Vec<&str> = listed.iter().map(|intent| intent.intent_id.as_str()).collect();
        assert_eq!(ids, vec!["INT-b", "INT-a"]);
        assert_eq!(listed[0].opportunity_cost, Some(Decimal::new(90, 0)));
    }

    #[tokio::test]
    async fn intents_are_immutable() {
        let (_sessions, repo) = repos().await;

        repo.save(intent("INT-1")).await.expect("save intent");
        let duplicate = repo.save(intent("INT-1")).await;

        assert!(matches!(duplicate, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn intents_require_a_session() {
        let (_sessions, repo) = repos().await;
        let mut orphan = intent("INT-orphan");
        orphan.session_id = SessionId("missing".to_string());

        assert!(repo.save(orphan).await.is_err());
    }
}
