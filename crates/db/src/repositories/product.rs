use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Row, Sqlite};

use callcart_core::domain::merchant::MerchantId;
use callcart_core::domain::product::{Product, ProductId};

use super::{category_key, from_json, to_json, ProductQuery, ProductRepository, RepositoryError};
use crate::DbPool;

/// Products are stored as JSON documents beside the scalar columns used for
/// pre-filtering. The document is authoritative.
pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn price_column(price: Decimal) -> Result<f64, RepositoryError> {
    price
        .to_f64()
        .ok_or_else(|| RepositoryError::Encode(format!("price {price} is not representable")))
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let document: String =
        row.try_get("document").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    from_json(&document)
}

async fn upsert<'e, E>(
    executor: E,
    merchant_id: &MerchantId,
    product: &Product,
) -> Result<(), RepositoryError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO product (merchant_id, product_id, name_key, category_key, price, in_stock,
                              document, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(merchant_id, product_id) DO UPDATE SET
             name_key = excluded.name_key,
             category_key = excluded.category_key,
             price = excluded.price,
             in_stock = excluded.in_stock,
             document = excluded.document,
             updated_at = excluded.updated_at",
    )
    .bind(merchant_id.as_str())
    .bind(product.product_id.as_str())
    .bind(product.name.trim().to_lowercase())
    .bind(category_key(&product.category))
    .bind(price_column(product.price)?)
    .bind(product.in_stock())
    .bind(to_json(product)?)
    .bind(Utc::now().to_rfc3339())
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(
        &self,
        merchant_id: &MerchantId,
        id: &ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        let row =
            sqlx::query("SELECT document FROM product WHERE merchant_id = ? AND product_id = ?")
                .bind(merchant_id.as_str())
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_product(r)?)),
            None => Ok(None),
        }
    }

    async fn query(
        &self,
        merchant_id: &MerchantId,
        query: &ProductQuery,
    ) -> Result<Vec<Product>, RepositoryError> {
        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT document FROM product WHERE merchant_id = ");
        builder.push_bind(merchant_id.0.clone());

        if query.in_stock_only {
            builder.push(" AND in_stock = 1");
        }
        if let Some(min) = query.min_price {
            builder.push(" AND price >= ").push_bind(price_column(min)?);
        }
        if let Some(max) = query.max_price {
            builder.push(" AND price <= ").push_bind(price_column(max)?);
        }
        if let Some(category) = query.category.as_deref() {
            builder.push(" AND category_key = ").push_bind(category_key(category));
        }
        builder.push(" ORDER BY rowid ASC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_product).collect::<Result<Vec<_>, _>>()
    }

    async fn save(
        &self,
        merchant_id: &MerchantId,
        product: Product,
    ) -> Result<(), RepositoryError> {
        upsert(&self.pool, merchant_id, &product).await
    }

    async fn save_batch(
        &self,
        merchant_id: &MerchantId,
        products: Vec<Product>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for product in &products {
            upsert(&mut *tx, merchant_id, product).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
