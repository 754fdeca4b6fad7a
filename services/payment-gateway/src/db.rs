// Database layer for the Payment Gateway
// Postgres implementation of the core transaction store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gateway_core::codec::DataFormat;
use gateway_core::{
    Error, GatewayPriority, ProviderId, RegionId, Result, Transaction, TransactionId,
    TransactionStatus, TransactionStore, User, UserId,
};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{error, info};

fn db_error(context: &str, err: sqlx::Error) -> Error {
    error!("{}: {}", context, err);
    Error::Persistence(format!("{}: {}", context, err))
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        info!("Database pool ready ({} max connections)", max_connections);
        Ok(Self::new(pool))
    }

    /// Apply the schema and sample fixture
    pub async fn migrate(&self) -> anyhow::Result<()> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    fn transaction_from_row(row: &PgRow) -> std::result::Result<Transaction, sqlx::Error> {
        let kind: String = row.try_get("type")?;
        let status: String = row.try_get("status")?;
        let decode = |e: Error| sqlx::Error::Decode(Box::new(e));

        Ok(Transaction {
            id: row.try_get("id")?,
            amount: row.try_get::<Decimal, _>("amount")?,
            currency: row.try_get("currency")?,
            kind: kind.parse().map_err(decode)?,
            status: status.parse().map_err(decode)?,
            user_id: row.try_get("user_id")?,
            gateway_id: ProviderId::new(row.try_get::<String, _>("gateway_id")?),
            region_id: row.try_get("country_id")?,
            reference_id: row.try_get("reference_id")?,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl TransactionStore for PgStore {
    async fn get_user(&self, user_id: UserId) -> Result<User> {
        let row = sqlx::query("SELECT id, username, country_id FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("failed to fetch user", e))?
            .ok_or_else(|| Error::Persistence(format!("user {} not found", user_id)))?;

        Ok(User {
            id: row.try_get("id").map_err(|e| db_error("bad user row", e))?,
            username: row.try_get("username").map_err(|e| db_error("bad user row", e))?,
            region_id: row
                .try_get("country_id")
                .map_err(|e| db_error("bad user row", e))?,
        })
    }

    async fn gateways_by_priority(&self, region_id: RegionId) -> Result<Vec<GatewayPriority>> {
        let rows = sqlx::query(
            r#"
            SELECT g.id, g.name, g.data_format_supported, gc.priority
            FROM gateways g
            JOIN gateway_countries gc ON g.id = gc.gateway_id
            WHERE gc.country_id = $1
            ORDER BY gc.priority
            "#,
        )
        .bind(region_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("failed to fetch gateway priorities", e))?;

        rows.iter()
            .map(|row| {
                let format: String = row
                    .try_get("data_format_supported")
                    .map_err(|e| db_error("bad gateway row", e))?;
                Ok(GatewayPriority {
                    gateway_id: ProviderId::new(
                        row.try_get::<String, _>("id")
                            .map_err(|e| db_error("bad gateway row", e))?,
                    ),
                    name: row.try_get("name").map_err(|e| db_error("bad gateway row", e))?,
                    priority: row
                        .try_get("priority")
                        .map_err(|e| db_error("bad gateway row", e))?,
                    format: DataFormat::from_content_type(Some(format.as_str()))?,
                })
            })
            .collect()
    }

    async fn create_transaction(&self, transaction: &Transaction) -> Result<TransactionId> {
        let row = sqlx::query(
            r#"
            INSERT INTO transactions (
                amount, currency, type, status, user_id, gateway_id, country_id, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(transaction.amount)
        .bind(&transaction.currency)
        .bind(transaction.kind.as_str())
        .bind(transaction.status.as_str())
        .bind(transaction.user_id)
        .bind(transaction.gateway_id.as_str())
        .bind(transaction.region_id)
        .bind(transaction.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("failed to create transaction", e))?;

        row.try_get("id")
            .map_err(|e| db_error("failed to read transaction id", e))
    }

    async fn get_transaction(&self, transaction_id: TransactionId) -> Result<Option<Transaction>> {
        let row = sqlx::query(
            r#"
            SELECT id, amount, currency, type, status, user_id, gateway_id, country_id,
                   reference_id, error_message, created_at, updated_at
            FROM transactions
            WHERE id = $1
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("failed to fetch transaction", e))?;

        row.as_ref()
            .map(Self::transaction_from_row)
            .transpose()
            .map_err(|e| db_error("bad transaction row", e))
    }

    async fn update_transaction_status(
        &self,
        transaction_id: TransactionId,
        status: TransactionStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE transactions SET status = $1, error_message = $2, updated_at = NOW() WHERE id = $3",
        )
        .bind(status.as_str())
        .bind(error_message)
        .bind(transaction_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("failed to update transaction status", e))?;

        if result.rows_affected() == 0 {
            return Err(Error::TransactionNotFound(transaction_id));
        }
        Ok(())
    }

    async fn update_transaction_reference(
        &self,
        transaction_id: TransactionId,
        reference_id: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE transactions SET reference_id = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(reference_id)
        .bind(transaction_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("failed to update transaction reference", e))?;

        if result.rows_affected() == 0 {
            return Err(Error::TransactionNotFound(transaction_id));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("database ping failed", e))?;
        Ok(())
    }
}
