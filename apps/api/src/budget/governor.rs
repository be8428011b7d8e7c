//! Budget Governor: turns remaining monthly quota into a safe daily allowance.
//!
//! The allowance is re-derived on every call from *remaining* quota and
//! *remaining* days, so uneven usage early in the month is absorbed by
//! smaller allowances later instead of running the quota dry.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::budget::ledger::QuotaLedger;
use crate::clock::Clock;
use crate::config::ProviderConfig;
use crate::errors::StoreError;
use crate::models::quota::month_key;

/// Share of the remaining quota that is held back (percent).
pub const RESERVE_PERCENT: u64 = 10;

/// Per-provider snapshot for `budget_status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetStatus {
    pub used: u32,
    pub quota: u32,
    pub daily_budget: u32,
    pub month: String,
}

/// Safe number of calls for `today`.
///
/// 0 once the quota is spent; otherwise at least 1, even when the reserve
/// would round the allowance down to nothing.
pub fn compute_daily_budget(monthly_quota: u32, calls_used: u32, today: NaiveDate) -> u32 {
    if calls_used >= monthly_quota {
        return 0;
    }
    let remaining = u64::from(monthly_quota - calls_used);
    let safe_remaining = remaining * (100 - RESERVE_PERCENT) / 100;
    let days_remaining = u64::from(days_in_month(today) - today.day() + 1).max(1);
    (safe_remaining / days_remaining).max(1) as u32
}

/// Number of days in the month containing `date`.
pub fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = (date.year(), date.month());
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

pub struct BudgetGovernor {
    ledger: Arc<dyn QuotaLedger>,
    clock: Arc<dyn Clock>,
}

impl BudgetGovernor {
    pub fn new(ledger: Arc<dyn QuotaLedger>, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, clock }
    }

    pub async fn daily_budget(&self, provider: &ProviderConfig) -> Result<u32, StoreError> {
        let now = self.clock.now();
        let used = self.ledger.calls_used(&provider.name, now).await?;
        Ok(compute_daily_budget(provider.monthly_quota, used, now.date_naive()))
    }

    /// Claims one call of the provider's monthly quota before it is made.
    /// `false` means another caller took the last unit.
    pub async fn try_reserve(&self, provider: &ProviderConfig) -> Result<bool, StoreError> {
        let reserved = self
            .ledger
            .try_reserve(&provider.name, provider.monthly_quota, self.clock.now())
            .await?;
        Ok(reserved.is_some())
    }

    /// Returns a reserved call that never reached the provider.
    pub async fn release(&self, provider: &ProviderConfig) -> Result<(), StoreError> {
        self.ledger.release(&provider.name, self.clock.now()).await
    }

    /// The provider told us its quota is gone; stop budgeting it this month.
    pub async fn note_quota_exceeded(&self, provider: &ProviderConfig) -> Result<(), StoreError> {
        self.ledger
            .mark_exhausted(&provider.name, provider.monthly_quota, self.clock.now())
            .await
    }

    pub async fn status(
        &self,
        providers: &[ProviderConfig],
    ) -> Result<BTreeMap<String, BudgetStatus>, StoreError> {
        let now = self.clock.now();
        let mut statuses = BTreeMap::new();
        for provider in providers {
            let used = self.ledger.calls_used(&provider.name, now).await?;
            statuses.insert(
                provider.name.clone(),
                BudgetStatus {
                    used,
                    quota: provider.monthly_quota,
                    daily_budget: compute_daily_budget(provider.monthly_quota, used, now.date_naive()),
                    month: month_key(now),
                },
            );
        }
        Ok(statuses)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::budget::ledger::InMemoryQuotaLedger;
    use crate::clock::FixedClock;
    use crate::config::ProviderKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn provider(name: &str, quota: u32) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            kind: ProviderKind::JSearch,
            priority: 1,
            endpoint: "https://example.test".to_string(),
            monthly_quota: quota,
            api_key: "key".to_string(),
        }
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(date(2025, 10, 15)), 31);
        assert_eq!(days_in_month(date(2025, 11, 1)), 30);
        assert_eq!(days_in_month(date(2024, 2, 10)), 29);
        assert_eq!(days_in_month(date(2025, 2, 10)), 28);
        assert_eq!(days_in_month(date(2025, 12, 31)), 31);
    }

    #[test]
    fn test_first_day_of_month() {
        // 100 quota → 90 spendable over 31 days → 2 per day
        assert_eq!(compute_daily_budget(100, 0, date(2025, 10, 1)), 2);
    }

    #[test]
    fn test_last_day_gets_everything_but_reserve() {
        assert_eq!(compute_daily_budget(100, 0, date(2025, 10, 31)), 90);
        assert_eq!(compute_daily_budget(100, 50, date(2025, 10, 31)), 45);
    }

    #[test]
    fn test_exhausted_quota_returns_zero() {
        assert_eq!(compute_daily_budget(100, 100, date(2025, 10, 10)), 0);
        assert_eq!(compute_daily_budget(100, 130, date(2025, 10, 10)), 0);
        assert_eq!(compute_daily_budget(0, 0, date(2025, 10, 10)), 0);
    }

    #[test]
    fn test_floor_of_one_while_quota_remains() {
        // 1 remaining → reserve rounds to 0 → still allowed one call
        assert_eq!(compute_daily_budget(100, 99, date(2025, 10, 1)), 1);
    }

    #[test]
    fn test_budget_never_over_promises_remaining_days() {
        for quota in [31_u32, 100, 250, 1000, 10_000] {
            for used in (0..quota).step_by((quota as usize / 7).max(1)) {
                for day in 1..=31 {
                    let today = date(2025, 10, day);
                    let remaining = u64::from(quota - used);
                    let days_left = u64::from(31 - day + 1);
                    let safe = remaining * 9 / 10;
                    if safe < days_left {
                        continue; // the floor of one applies instead
                    }
                    let budget = u64::from(compute_daily_budget(quota, used, today));
                    assert!(
                        budget * days_left <= remaining,
                        "quota={quota} used={used} day={day} budget={budget}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_spending_the_allowance_every_day_stays_within_quota() {
        for quota in [1_u32, 10, 45, 100, 500] {
            for month in [2_u32, 4, 10] {
                let mut used = 0_u32;
                let days = days_in_month(date(2025, month, 1));
                for day in 1..=days {
                    used += compute_daily_budget(quota, used, date(2025, month, day));
                    assert!(used <= quota, "quota={quota} month={month} day={day} used={used}");
                }
            }
        }
    }

    #[tokio::test]
    async fn test_governor_reads_ledger_through_clock() {
        let clock = Arc::new(FixedClock::at(2025, 10, 1, 8));
        let ledger = Arc::new(InMemoryQuotaLedger::new());
        let governor = BudgetGovernor::new(ledger, clock.clone());
        let jsearch = provider("jsearch", 100);

        assert_eq!(governor.daily_budget(&jsearch).await.unwrap(), 2);
        for _ in 0..10 {
            assert!(governor.try_reserve(&jsearch).await.unwrap());
        }
        // 90 remaining → 81 safe over 31 days → 2
        assert_eq!(governor.daily_budget(&jsearch).await.unwrap(), 2);

        clock.set(Utc.with_ymd_and_hms(2025, 10, 31, 8, 0, 0).unwrap());
        assert_eq!(governor.daily_budget(&jsearch).await.unwrap(), 81);
    }

    #[tokio::test]
    async fn test_quota_exceeded_zeroes_budget_until_month_end() {
        let clock = Arc::new(FixedClock::at(2025, 10, 12, 8));
        let governor = BudgetGovernor::new(Arc::new(InMemoryQuotaLedger::new()), clock.clone());
        let google = provider("google_jobs", 100);

        governor.note_quota_exceeded(&google).await.unwrap();
        assert_eq!(governor.daily_budget(&google).await.unwrap(), 0);

        clock.set(Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap());
        assert_eq!(governor.daily_budget(&google).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_reserve_stops_at_quota_and_release_refunds() {
        let clock = Arc::new(FixedClock::at(2025, 10, 31, 8));
        let governor = BudgetGovernor::new(Arc::new(InMemoryQuotaLedger::new()), clock);
        let linkedin = provider("linkedin", 2);

        assert!(governor.try_reserve(&linkedin).await.unwrap());
        assert!(governor.try_reserve(&linkedin).await.unwrap());
        assert!(!governor.try_reserve(&linkedin).await.unwrap());
        assert_eq!(governor.daily_budget(&linkedin).await.unwrap(), 0);

        governor.release(&linkedin).await.unwrap();
        assert_eq!(governor.daily_budget(&linkedin).await.unwrap(), 1);
        assert!(governor.try_reserve(&linkedin).await.unwrap());
    }

    #[tokio::test]
    async fn test_status_reports_every_provider() {
        let clock = Arc::new(FixedClock::at(2025, 10, 1, 8));
        let governor = BudgetGovernor::new(Arc::new(InMemoryQuotaLedger::new()), clock);
        let providers = vec![provider("jsearch", 200), provider("linkedin", 250)];
        assert!(governor.try_reserve(&providers[0]).await.unwrap());

        let status = governor.status(&providers).await.unwrap();
        assert_eq!(status.len(), 2);
        assert_eq!(status["jsearch"].used, 1);
        assert_eq!(status["jsearch"].quota, 200);
        assert_eq!(status["linkedin"].used, 0);
        assert_eq!(status["linkedin"].month, "2025-10");
    }
}
