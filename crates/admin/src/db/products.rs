//! Product repository for the Bling catalog mirror.

use async_trait::async_trait;
use loja_core::Product;
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::RepositoryError;
use crate::bling::ProductSink;

/// Repository for the `products` table.
#[derive(Debug, Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a product or update the row with the same `external_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for negative price or stock, or
    /// `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, product: &Product) -> Result<(), RepositoryError> {
        if product.price < Decimal::ZERO || product.current_stock < 0 {
            return Err(RepositoryError::Conflict(format!(
                "product {} has negative price or stock",
                product.external_id
            )));
        }

        sqlx::query(
            r"
            INSERT INTO products (external_id, name, price, current_stock, sku, description, category)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (external_id) DO UPDATE SET
                name = EXCLUDED.name,
                price = EXCLUDED.price,
                current_stock = EXCLUDED.current_stock,
                sku = EXCLUDED.sku,
                description = EXCLUDED.description,
                category = EXCLUDED.category,
                synced_at = NOW()
            ",
        )
        .bind(&product.external_id)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.current_stock)
        .bind(&product.sku)
        .bind(&product.description)
        .bind(&product.category)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ProductSink for PgProductRepository {
    async fn upsert(&self, product: &Product) -> Result<(), RepositoryError> {
        Self::upsert(self, product).await
    }
}
