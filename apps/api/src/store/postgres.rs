use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::errors::StoreError;
use crate::models::job::{CanonicalJob, JobRow};
use crate::store::{retention_cutoff, JobStore, UpsertOutcome};

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_job(row: JobRow) -> Result<CanonicalJob, StoreError> {
    let key = row.job_id.clone();
    CanonicalJob::try_from(row).map_err(|reason| StoreError::Corrupt { key, reason })
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn upsert(&self, job: &CanonicalJob) -> Result<UpsertOutcome, StoreError> {
        let (salary_min, salary_max, salary_currency) = match &job.salary {
            Some(s) => (s.min, s.max, s.currency.clone()),
            None => (None, None, None),
        };

        // xmax = 0 only for a freshly inserted tuple
        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO jobs
                (job_id, title, company, location, region, job_type, experience_level,
                 description, required_skills, salary_min, salary_max, salary_currency,
                 is_remote, url, source, posted_at, fetched_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (job_id) DO UPDATE SET
                description = EXCLUDED.description,
                required_skills = EXCLUDED.required_skills,
                salary_min = EXCLUDED.salary_min,
                salary_max = EXCLUDED.salary_max,
                salary_currency = EXCLUDED.salary_currency,
                posted_at = EXCLUDED.posted_at,
                fetched_at = EXCLUDED.fetched_at,
                url = EXCLUDED.url,
                updated_at = NOW()
            RETURNING (xmax = 0)
            "#,
        )
        .bind(&job.job_id)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(job.region.as_str())
        .bind(&job.job_type)
        .bind(job.experience_level.as_str())
        .bind(&job.description)
        .bind(&job.required_skills)
        .bind(salary_min)
        .bind(salary_max)
        .bind(salary_currency)
        .bind(job.is_remote)
        .bind(&job.url)
        .bind(&job.source)
        .bind(job.posted_date)
        .bind(job.fetched_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn get(&self, job_id: &str) -> Result<Option<CanonicalJob>, StoreError> {
        sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE job_id = $1")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?
            .map(into_job)
            .transpose()
    }

    async fn recent(&self, limit: usize) -> Result<Vec<CanonicalJob>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        sqlx::query_as::<_, JobRow>(
            r#"
            SELECT * FROM jobs
            ORDER BY COALESCE(posted_at, fetched_at) DESC, job_id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(into_job)
        .collect()
    }

    async fn prune_older_than(&self, days: i64, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM jobs WHERE COALESCE(posted_at, fetched_at) < $1")
            .bind(retention_cutoff(days, now))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}
