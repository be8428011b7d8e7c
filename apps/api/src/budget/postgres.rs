use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;

use crate::budget::ledger::QuotaLedger;
use crate::errors::StoreError;
use crate::models::quota::month_key;

/// Ledger backed by the `provider_quota` table. Safe across processes.
#[derive(Clone)]
pub struct PgQuotaLedger {
    pool: PgPool,
}

impl PgQuotaLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuotaLedger for PgQuotaLedger {
    async fn try_reserve(
        &self,
        provider: &str,
        quota: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<u32>, StoreError> {
        let month = month_key(now);
        let quota = i32::try_from(quota).unwrap_or(i32::MAX);
        let mut tx = self.pool.begin().await?;

        let rolled = sqlx::query(
            "UPDATE provider_quota SET month = $1, calls_used = 0, updated_at = NOW() WHERE month <> $1",
        )
        .bind(&month)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if rolled > 0 {
            info!("Quota ledger rolled over to {month} ({rolled} providers reset)");
        }

        // The conflict branch re-checks the locked row, so the comparison and
        // the increment cannot interleave with another reservation.
        let used: Option<i32> = sqlx::query_scalar(
            r#"
            INSERT INTO provider_quota (provider, month, calls_used)
            SELECT $1, $2, 1 WHERE $3 > 0
            ON CONFLICT (provider) DO UPDATE
                SET calls_used = provider_quota.calls_used + 1,
                    updated_at = NOW()
                WHERE provider_quota.calls_used < $3
            RETURNING calls_used
            "#,
        )
        .bind(provider)
        .bind(&month)
        .bind(quota)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(used.map(|u| u.max(0) as u32))
    }

    async fn release(&self, provider: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE provider_quota
            SET calls_used = GREATEST(calls_used - 1, 0), updated_at = NOW()
            WHERE provider = $1 AND month = $2
            "#,
        )
        .bind(provider)
        .bind(month_key(now))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn calls_used(&self, provider: &str, now: DateTime<Utc>) -> Result<u32, StoreError> {
        let used: Option<i32> = sqlx::query_scalar(
            "SELECT calls_used FROM provider_quota WHERE provider = $1 AND month = $2",
        )
        .bind(provider)
        .bind(month_key(now))
        .fetch_optional(&self.pool)
        .await?;

        Ok(used.unwrap_or(0).max(0) as u32)
    }

    async fn mark_exhausted(
        &self,
        provider: &str,
        quota: u32,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let month = month_key(now);
        let quota = i32::try_from(quota).unwrap_or(i32::MAX);
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE provider_quota SET month = $1, calls_used = 0, updated_at = NOW() WHERE month <> $1",
        )
        .bind(&month)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO provider_quota (provider, month, calls_used)
            VALUES ($1, $2, $3)
            ON CONFLICT (provider) DO UPDATE
                SET calls_used = GREATEST(provider_quota.calls_used, $3),
                    updated_at = NOW()
            "#,
        )
        .bind(provider)
        .bind(&month)
        .bind(quota)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
