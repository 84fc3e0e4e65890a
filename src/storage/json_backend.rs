//! File-backed store persisting the whole ledger as one JSON document.
//!
//! Writes go through a temporary file followed by a rename so a crash cannot
//! leave a half-written ledger behind.

use std::{
    env, fs,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;

use crate::dates::Month;
use crate::errors::EngineError;
use crate::ledger::{
    Account, Category, Subscription, SubscriptionUpdate, Transaction, TransactionDraft,
    TransactionId, TransactionUpdate,
};
use crate::storage::{LedgerStore, MemoryStore};

const DEFAULT_DIR_NAME: &str = ".cashflow_core";
const DEFAULT_FILE_NAME: &str = "ledger.json";
const TMP_SUFFIX: &str = "tmp";
const HOME_ENV_VAR: &str = "CASHFLOW_CORE_HOME";

/// Application data directory: `$CASHFLOW_CORE_HOME` or `~/.cashflow_core`.
pub fn data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV_VAR) {
        return PathBuf::from(custom);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

pub struct JsonStore {
    path: PathBuf,
    state: MemoryStore,
}

impl JsonStore {
    /// Opens (or initializes) the ledger file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<JsonStore, EngineError> {
        let path = path.into();
        let state = if path.exists() {
            let data = fs::read_to_string(&path)?;
            serde_json::from_str(&data)?
        } else {
            MemoryStore::new()
        };
        Ok(JsonStore { path, state })
    }

    /// Opens the ledger at the default data directory.
    pub fn open_default() -> Result<JsonStore, EngineError> {
        Self::open(data_dir().join(DEFAULT_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.state)?;
        let tmp = self.path.with_extension(TMP_SUFFIX);
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn mutate<T>(
        &mut self,
        op: impl FnOnce(&mut MemoryStore) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let value = op(&mut self.state)?;
        self.persist()?;
        Ok(value)
    }
}

impl LedgerStore for JsonStore {
    fn add_account(&mut self, account: Account) -> Result<(), EngineError> {
        self.mutate(|state| state.add_account(account))
    }

    fn account(&self, account_id: &str) -> Result<Option<Account>, EngineError> {
        self.state.account(account_id)
    }

    fn accounts(&self) -> Result<Vec<Account>, EngineError> {
        self.state.accounts()
    }

    fn add_subscription(&mut self, subscription: Subscription) -> Result<(), EngineError> {
        self.mutate(|state| state.add_subscription(subscription))
    }

    fn subscription(&self, id: &str) -> Result<Option<Subscription>, EngineError> {
        self.state.subscription(id)
    }

    fn update_subscription(
        &mut self,
        id: &str,
        update: &SubscriptionUpdate,
    ) -> Result<(), EngineError> {
        self.mutate(|state| state.update_subscription(id, update))
    }

    fn delete_subscription(&mut self, id: &str) -> Result<(), EngineError> {
        self.mutate(|state| state.delete_subscription(id))
    }

    fn active_subscriptions(
        &self,
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> Result<Vec<Subscription>, EngineError> {
        self.state.active_subscriptions(window_start, window_end)
    }

    fn insert_transactions(
        &mut self,
        drafts: Vec<TransactionDraft>,
    ) -> Result<Vec<Transaction>, EngineError> {
        self.mutate(|state| state.insert_transactions(drafts))
    }

    fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>, EngineError> {
        self.state.transaction(id)
    }

    fn transactions_by_origin(&self, origin_id: &str) -> Result<Vec<Transaction>, EngineError> {
        self.state.transactions_by_origin(origin_id)
    }

    fn all_transactions(&self) -> Result<Vec<Transaction>, EngineError> {
        self.state.all_transactions()
    }

    fn update_transaction(
        &mut self,
        id: TransactionId,
        update: &TransactionUpdate,
    ) -> Result<(), EngineError> {
        self.mutate(|state| state.update_transaction(id, update))
    }

    fn delete_transaction(&mut self, id: TransactionId) -> Result<(), EngineError> {
        self.mutate(|state| state.delete_transaction(id))
    }

    fn budget_allocation(
        &self,
        budget_id: &str,
        month: Month,
    ) -> Result<Option<Transaction>, EngineError> {
        self.state.budget_allocation(budget_id, month)
    }

    fn spent_against_budget(&self, budget_id: &str, month: Month) -> Result<f64, EngineError> {
        self.state.spent_against_budget(budget_id, month)
    }

    fn committed_against_budget(
        &self,
        budget_id: &str,
        month: Month,
    ) -> Result<f64, EngineError> {
        self.state.committed_against_budget(budget_id, month)
    }

    fn delete_allocations_from(
        &mut self,
        budget_id: &str,
        from_month: Month,
    ) -> Result<usize, EngineError> {
        self.mutate(|state| state.delete_allocations_from(budget_id, from_month))
    }

    fn delete_forecasts_after(
        &mut self,
        origin_id: &str,
        after: NaiveDate,
    ) -> Result<usize, EngineError> {
        self.mutate(|state| state.delete_forecasts_after(origin_id, after))
    }

    fn update_forecast_account_from(
        &mut self,
        origin_id: &str,
        from_date: NaiveDate,
        account_id: &str,
    ) -> Result<usize, EngineError> {
        self.mutate(|state| state.update_forecast_account_from(origin_id, from_date, account_id))
    }

    fn commit_forecasts_on_or_before(&mut self, date: NaiveDate) -> Result<usize, EngineError> {
        self.mutate(|state| state.commit_forecasts_on_or_before(date))
    }

    fn categories(&self) -> Result<Vec<Category>, EngineError> {
        self.state.categories()
    }

    fn category_exists(&self, name: &str) -> Result<bool, EngineError> {
        self.state.category_exists(name)
    }

    fn add_category(&mut self, category: Category) -> Result<(), EngineError> {
        self.mutate(|state| state.add_category(category))
    }

    fn update_category(&mut self, name: &str, description: &str) -> Result<(), EngineError> {
        self.mutate(|state| state.update_category(name, description))
    }

    fn delete_category(&mut self, name: &str) -> Result<(), EngineError> {
        self.mutate(|state| state.delete_category(name))
    }

    fn setting(&self, key: &str) -> Result<Option<String>, EngineError> {
        self.state.setting(key)
    }

    fn set_setting(&mut self, key: &str, value: &str) -> Result<(), EngineError> {
        self.mutate(|state| state.set_setting(key, value))
    }
}
