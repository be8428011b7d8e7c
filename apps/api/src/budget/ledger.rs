//! Quota Ledger: per-provider call counts for the current calendar month.
//!
//! Counters are stamped with the month they count. The first reservation in a
//! new month zeroes every provider's counter before incrementing, so a stale
//! month is never carried forward.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::errors::StoreError;
use crate::models::quota::month_key;

/// Storage backend for monthly call counters.
///
/// `try_reserve` must be a single compare-and-increment: when one unit of
/// quota remains, exactly one of any number of concurrent callers gets it.
#[async_trait]
pub trait QuotaLedger: Send + Sync {
    /// Takes one call from the provider's quota for the month containing `now`,
    /// rolling every counter over first if the stored month is older.
    /// Returns the post-increment count, or `None` when `quota` is already spent.
    async fn try_reserve(
        &self,
        provider: &str,
        quota: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<u32>, StoreError>;

    /// Gives back a reserved call that never reached the provider.
    async fn release(&self, provider: &str, now: DateTime<Utc>) -> Result<(), StoreError>;

    /// Calls used by the provider in the month containing `now`.
    async fn calls_used(&self, provider: &str, now: DateTime<Utc>) -> Result<u32, StoreError>;

    /// Raises the provider's counter to at least `quota` for the current month.
    /// Used when a provider reports its quota exhausted before the ledger does.
    async fn mark_exhausted(
        &self,
        provider: &str,
        quota: u32,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct LedgerState {
    month: Option<String>,
    counts: HashMap<String, u32>,
}

impl LedgerState {
    fn roll_over(&mut self, month: &str) {
        if self.month.as_deref() != Some(month) {
            self.counts.clear();
            self.month = Some(month.to_string());
        }
    }
}

/// Single-process ledger. State is lost on restart.
#[derive(Default)]
pub struct InMemoryQuotaLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryQuotaLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuotaLedger for InMemoryQuotaLedger {
    async fn try_reserve(
        &self,
        provider: &str,
        quota: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<u32>, StoreError> {
        let mut state = self.state.lock().await;
        state.roll_over(&month_key(now));
        let count = state.counts.entry(provider.to_string()).or_insert(0);
        if *count >= quota {
            return Ok(None);
        }
        *count += 1;
        Ok(Some(*count))
    }

    async fn release(&self, provider: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.month.as_deref() != Some(month_key(now).as_str()) {
            return Ok(());
        }
        if let Some(count) = state.counts.get_mut(provider) {
            *count = count.saturating_sub(1);
        }
        Ok(())
    }

    async fn calls_used(&self, provider: &str, now: DateTime<Utc>) -> Result<u32, StoreError> {
        let state = self.state.lock().await;
        if state.month.as_deref() != Some(month_key(now).as_str()) {
            return Ok(0);
        }
        Ok(state.counts.get(provider).copied().unwrap_or(0))
    }

    async fn mark_exhausted(
        &self,
        provider: &str,
        quota: u32,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.roll_over(&month_key(now));
        let count = state.counts.entry(provider.to_string()).or_insert(0);
        *count = (*count).max(quota);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_try_reserve_increments_up_to_quota() {
        let ledger = InMemoryQuotaLedger::new();
        let now = at(2025, 10, 5);
        assert_eq!(ledger.try_reserve("jsearch", 2, now).await.unwrap(), Some(1));
        assert_eq!(ledger.try_reserve("jsearch", 2, now).await.unwrap(), Some(2));
        assert_eq!(ledger.try_reserve("jsearch", 2, now).await.unwrap(), None);
        assert_eq!(ledger.calls_used("jsearch", now).await.unwrap(), 2);
        assert_eq!(ledger.calls_used("linkedin", now).await.unwrap(), 0);
        assert_eq!(ledger.try_reserve("linkedin", 0, now).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_release_returns_a_reserved_call() {
        let ledger = InMemoryQuotaLedger::new();
        let now = at(2025, 10, 5);
        ledger.try_reserve("jsearch", 1, now).await.unwrap();
        ledger.release("jsearch", now).await.unwrap();
        assert_eq!(ledger.calls_used("jsearch", now).await.unwrap(), 0);

        // never below zero
        ledger.release("jsearch", now).await.unwrap();
        assert_eq!(ledger.calls_used("jsearch", now).await.unwrap(), 0);
        assert_eq!(ledger.try_reserve("jsearch", 1, now).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_month_rollover_resets_all_providers() {
        let ledger = InMemoryQuotaLedger::new();
        let october = at(2025, 10, 30);
        ledger.try_reserve("jsearch", 10, october).await.unwrap();
        ledger.try_reserve("linkedin", 10, october).await.unwrap();
        ledger.try_reserve("linkedin", 10, october).await.unwrap();

        let november = at(2025, 11, 1);
        // Reading a new month never reports last month's usage.
        assert_eq!(ledger.calls_used("linkedin", november).await.unwrap(), 0);

        assert_eq!(ledger.try_reserve("jsearch", 10, november).await.unwrap(), Some(1));
        assert_eq!(ledger.calls_used("linkedin", november).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_exhausted_never_lowers_count() {
        let ledger = InMemoryQuotaLedger::new();
        let now = at(2025, 10, 5);
        for _ in 0..7 {
            ledger.try_reserve("google_jobs", 100, now).await.unwrap();
        }
        ledger.mark_exhausted("google_jobs", 5, now).await.unwrap();
        assert_eq!(ledger.calls_used("google_jobs", now).await.unwrap(), 7);

        ledger.mark_exhausted("google_jobs", 100, now).await.unwrap();
        assert_eq!(ledger.calls_used("google_jobs", now).await.unwrap(), 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reservations_never_exceed_quota() {
        let ledger = Arc::new(InMemoryQuotaLedger::new());
        let now = at(2025, 10, 5);
        let mut handles = Vec::new();
        for _ in 0..50 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger.try_reserve("jsearch", 10, now).await.unwrap()
            }));
        }
        let mut granted = Vec::new();
        for handle in handles {
            if let Some(count) = handle.await.unwrap() {
                granted.push(count);
            }
        }
        granted.sort_unstable();
        assert_eq!(granted, (1..=10).collect::<Vec<u32>>());
        assert_eq!(ledger.calls_used("jsearch", now).await.unwrap(), 10);
    }
}
