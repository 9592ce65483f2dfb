use sqlx::Row;

use callcart_core::domain::merchant::MerchantId;
use callcart_core::domain::session::{Session, SessionId};

use super::{from_json, to_json, RepositoryError, SessionRepository};
use crate::DbPool;

pub struct SqlSessionRepository {
    pool: DbPool,
}

impl SqlSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<Session, RepositoryError> {
    let document: String =
        row.try_get("document").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    from_json(&document)
}

#[async_trait::async_trait]
impl SessionRepository for SqlSessionRepository {
    async fn find_by_id(
        &self,
        merchant_id: &MerchantId,
        id: &SessionId,
    ) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query(
            "SELECT document FROM call_session WHERE merchant_id = ? AND session_id = ?",
        )
        .bind(merchant_id.as_str())
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_session(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, session: Session) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO call_session (merchant_id, session_id, document, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(merchant_id, session_id) DO UPDATE SET
                 document = excluded.document,
                 created_at = excluded.created_at",
        )
        .bind(session.merchant_id.as_str())
        .bind(session.session_id.as_str())
        .bind(to_json(&session)?)
        .bind(session.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use callcart_core::domain::merchant::MerchantId;
    use callcart_core::domain::session::{Session, SessionId, TranscriptTurn};

    use super::SqlSessionRepository;
    use crate::repositories::SessionRepository;
    use crate::{connect_with_settings, migrations};

    fn session(agent_id: &str) -> Session {
        Session::from_transcript(
            "conv-100",
            MerchantId("merchant_001".to_string()),
            agent_id,
            vec![
                TranscriptTurn::Agent("Hi, how can I help?".to_string()),
                TranscriptTurn::User("Looking for running shoes".to_string()),
            ],
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn sql_session_repo_round_trip() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlSessionRepository::new(pool);
        let session = session("agent-1");

        repo.save(session.clone()).await.expect("save session");
        let found = repo
            .find_by_id(&session.merchant_id, &session.session_id)
            .await
            .expect("find session")
            .expect("session exists");

        assert_eq!(found.transcript, session.transcript);
        assert_eq!(found.raw_text, "Looking for running shoes");
        assert_eq!(found.source, "voice");
    }

    #[tokio::test]
    async fn save_overwrites_existing_session() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlSessionRepository::new(pool.clone());

        repo.save(session("agent-1")).await.expect("first save");
        repo.save(session("agent-2")).await.expect("second save");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM call_session")
            .fetch_one(&pool)
            .await
            .expect("count sessions");
        let found = repo
            .find_by_id(&MerchantId("merchant_001".to_string()), &SessionId("conv-100".to_string()))
            .await
            .expect("find session")
            .expect("session exists");

        assert_eq!(count, 1);
        assert_eq!(found.agent_id, "agent-2");
    }
}
