//! Quota Ledger + Budget Governor.

pub mod governor;
pub mod ledger;
pub mod postgres;

pub use governor::{BudgetGovernor, BudgetStatus};
pub use ledger::{InMemoryQuotaLedger, QuotaLedger};
pub use postgres::PgQuotaLedger;
