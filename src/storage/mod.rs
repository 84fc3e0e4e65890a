//! Persistence abstraction. Any backend (embedded KV, SQL, in-memory) can
//! drive the engine by implementing [`LedgerStore`]; each method behaves as a
//! single logical transaction.

pub mod json_backend;
pub mod memory;

use chrono::NaiveDate;

use crate::dates::Month;
use crate::errors::EngineError;
use crate::ledger::{
    Account, Category, Subscription, SubscriptionUpdate, Transaction, TransactionDraft,
    TransactionId, TransactionUpdate,
};

pub use json_backend::JsonStore;
pub use memory::MemoryStore;

/// Settings key holding the forecast horizon in months.
pub const FORECAST_HORIZON_KEY: &str = "forecast_horizon_months";

/// Horizon used when the setting is absent or unparsable.
pub const DEFAULT_FORECAST_HORIZON_MONTHS: u32 = 6;

/// Durable CRUD plus the specialized queries the budget recalculator and the
/// forecast scheduler depend on.
pub trait LedgerStore {
    // -- accounts --
    fn add_account(&mut self, account: Account) -> Result<(), EngineError>;
    fn account(&self, account_id: &str) -> Result<Option<Account>, EngineError>;
    fn accounts(&self) -> Result<Vec<Account>, EngineError>;

    // -- subscriptions --
    fn add_subscription(&mut self, subscription: Subscription) -> Result<(), EngineError>;
    fn subscription(&self, id: &str) -> Result<Option<Subscription>, EngineError>;
    fn update_subscription(
        &mut self,
        id: &str,
        update: &SubscriptionUpdate,
    ) -> Result<(), EngineError>;
    fn delete_subscription(&mut self, id: &str) -> Result<(), EngineError>;
    /// Subscriptions whose lifetime overlaps `[window_start, window_end]`.
    fn active_subscriptions(
        &self,
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> Result<Vec<Subscription>, EngineError>;

    // -- transactions --
    /// Persists the drafts, assigning ids, and returns the stored rows.
    fn insert_transactions(
        &mut self,
        drafts: Vec<TransactionDraft>,
    ) -> Result<Vec<Transaction>, EngineError>;
    fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>, EngineError>;
    fn transactions_by_origin(&self, origin_id: &str) -> Result<Vec<Transaction>, EngineError>;
    /// Every transaction, ordered by `(date_payed, id)`.
    fn all_transactions(&self) -> Result<Vec<Transaction>, EngineError>;
    fn update_transaction(
        &mut self,
        id: TransactionId,
        update: &TransactionUpdate,
    ) -> Result<(), EngineError>;
    fn delete_transaction(&mut self, id: TransactionId) -> Result<(), EngineError>;

    /// The unique allocation row for `(budget_id, month)`, if any. Two rows
    /// for the same pair are an invariant violation.
    fn budget_allocation(
        &self,
        budget_id: &str,
        month: Month,
    ) -> Result<Option<Transaction>, EngineError>;
    /// Sum of `|amount|` over rows linked to the budget whose cash impact
    /// (`date_payed`) falls in `month`, excluding `Pending` rows and the
    /// allocation itself.
    fn spent_against_budget(&self, budget_id: &str, month: Month) -> Result<f64, EngineError>;
    /// Sum of `|amount|` over `Committed` rows linked to the budget with
    /// `date_payed` in `month`, excluding the allocation itself.
    fn committed_against_budget(&self, budget_id: &str, month: Month)
        -> Result<f64, EngineError>;
    /// Removes every allocation row for the budget dated in or after
    /// `from_month`, regardless of status. Returns the number removed.
    fn delete_allocations_from(
        &mut self,
        budget_id: &str,
        from_month: Month,
    ) -> Result<usize, EngineError>;
    /// Drops `Forecast` rows of the origin dated strictly after `after`.
    fn delete_forecasts_after(
        &mut self,
        origin_id: &str,
        after: NaiveDate,
    ) -> Result<usize, EngineError>;
    /// Retargets future `Forecast` rows of the origin onto a new account.
    fn update_forecast_account_from(
        &mut self,
        origin_id: &str,
        from_date: NaiveDate,
        account_id: &str,
    ) -> Result<usize, EngineError>;
    /// Flips `Forecast` rows with `date_payed <= date` to `Committed`.
    fn commit_forecasts_on_or_before(&mut self, date: NaiveDate) -> Result<usize, EngineError>;

    // -- categories --
    fn categories(&self) -> Result<Vec<Category>, EngineError>;
    fn category_exists(&self, name: &str) -> Result<bool, EngineError>;
    fn add_category(&mut self, category: Category) -> Result<(), EngineError>;
    fn update_category(&mut self, name: &str, description: &str) -> Result<(), EngineError>;
    fn delete_category(&mut self, name: &str) -> Result<(), EngineError>;

    // -- settings --
    fn setting(&self, key: &str) -> Result<Option<String>, EngineError>;
    fn set_setting(&mut self, key: &str, value: &str) -> Result<(), EngineError>;
}
