use chrono::Utc;
use sqlx::Row;

use callcart_core::domain::merchant::{MerchantId, MerchantMetadata};

use super::{from_json, to_json, MerchantRepository, RepositoryError};
use crate::DbPool;

pub struct SqlMerchantRepository {
    pool: DbPool,
}

impl SqlMerchantRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MerchantRepository for SqlMerchantRepository {
    async fn find_by_id(
        &self,
        id: &MerchantId,
    ) -> Result<Option<MerchantMetadata>, RepositoryError> {
        let row = sqlx::query("SELECT document FROM merchant WHERE merchant_id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let document: String =
                    row.try_get("document").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                Ok(Some(from_json(&document)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, merchant: MerchantMetadata) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO merchant (merchant_id, document, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT(merchant_id) DO UPDATE SET
                 document = excluded.document,
                 updated_at = excluded.updated_at",
        )
        .bind(merchant.merchant_id.as_str())
        .bind(to_json(&merchant)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
