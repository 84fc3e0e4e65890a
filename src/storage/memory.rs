//! In-memory reference store. Also serves as the serializable snapshot the
//! JSON backend persists.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dates::Month;
use crate::errors::EngineError;
use crate::ledger::{
    Account, Category, Subscription, SubscriptionUpdate, Transaction, TransactionDraft,
    TransactionId, TransactionStatus, TransactionUpdate,
};
use crate::storage::LedgerStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStore {
    accounts: Vec<Account>,
    subscriptions: Vec<Subscription>,
    transactions: Vec<Transaction>,
    categories: Vec<Category>,
    settings: BTreeMap<String, String>,
    next_transaction_id: TransactionId,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore {
            accounts: Vec::new(),
            subscriptions: Vec::new(),
            transactions: Vec::new(),
            categories: Vec::new(),
            settings: BTreeMap::new(),
            next_transaction_id: 1,
        }
    }
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    fn transaction_index(&self, id: TransactionId) -> Result<usize, EngineError> {
        self.transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| EngineError::NotFound(format!("transaction {}", id)))
    }

    fn linked_to_budget<'a>(
        &'a self,
        budget_id: &'a str,
    ) -> impl Iterator<Item = &'a Transaction> {
        self.transactions.iter().filter(move |t| {
            t.budget.as_deref() == Some(budget_id) && t.origin_id.as_deref() != Some(budget_id)
        })
    }
}

impl LedgerStore for MemoryStore {
    fn add_account(&mut self, account: Account) -> Result<(), EngineError> {
        if self
            .accounts
            .iter()
            .any(|a| a.account_id == account.account_id)
        {
            return Err(EngineError::InvalidRequest(format!(
                "account '{}' already exists",
                account.account_id
            )));
        }
        self.accounts.push(account);
        Ok(())
    }

    fn account(&self, account_id: &str) -> Result<Option<Account>, EngineError> {
        Ok(self
            .accounts
            .iter()
            .find(|a| a.account_id == account_id)
            .cloned())
    }

    fn accounts(&self) -> Result<Vec<Account>, EngineError> {
        let mut accounts = self.accounts.clone();
        accounts.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        Ok(accounts)
    }

    fn add_subscription(&mut self, subscription: Subscription) -> Result<(), EngineError> {
        if self.subscriptions.iter().any(|s| s.id == subscription.id) {
            return Err(EngineError::InvalidRequest(format!(
                "subscription '{}' already exists",
                subscription.id
            )));
        }
        self.subscriptions.push(subscription);
        Ok(())
    }

    fn subscription(&self, id: &str) -> Result<Option<Subscription>, EngineError> {
        Ok(self.subscriptions.iter().find(|s| s.id == id).cloned())
    }

    fn update_subscription(
        &mut self,
        id: &str,
        update: &SubscriptionUpdate,
    ) -> Result<(), EngineError> {
        let subscription = self
            .subscriptions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| EngineError::NotFound(format!("subscription '{}'", id)))?;
        update.apply(subscription);
        Ok(())
    }

    fn delete_subscription(&mut self, id: &str) -> Result<(), EngineError> {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        if self.subscriptions.len() == before {
            return Err(EngineError::NotFound(format!("subscription '{}'", id)));
        }
        Ok(())
    }

    fn active_subscriptions(
        &self,
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> Result<Vec<Subscription>, EngineError> {
        Ok(self
            .subscriptions
            .iter()
            .filter(|s| s.is_active_in(window_start, window_end))
            .cloned()
            .collect())
    }

    fn insert_transactions(
        &mut self,
        drafts: Vec<TransactionDraft>,
    ) -> Result<Vec<Transaction>, EngineError> {
        let mut inserted = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let id = self.next_transaction_id;
            self.next_transaction_id += 1;
            let transaction = draft.into_transaction(id);
            self.transactions.push(transaction.clone());
            inserted.push(transaction);
        }
        Ok(inserted)
    }

    fn transaction(&self, id: TransactionId) -> Result<Option<Transaction>, EngineError> {
        Ok(self.transactions.iter().find(|t| t.id == id).cloned())
    }

    fn transactions_by_origin(&self, origin_id: &str) -> Result<Vec<Transaction>, EngineError> {
        let mut rows: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|t| t.origin_id.as_deref() == Some(origin_id))
            .cloned()
            .collect();
        rows.sort_by_key(|t| (t.date_payed, t.id));
        Ok(rows)
    }

    fn all_transactions(&self) -> Result<Vec<Transaction>, EngineError> {
        let mut rows = self.transactions.clone();
        rows.sort_by_key(|t| (t.date_payed, t.id));
        Ok(rows)
    }

    fn update_transaction(
        &mut self,
        id: TransactionId,
        update: &TransactionUpdate,
    ) -> Result<(), EngineError> {
        let index = self.transaction_index(id)?;
        update.apply(&mut self.transactions[index]);
        Ok(())
    }

    fn delete_transaction(&mut self, id: TransactionId) -> Result<(), EngineError> {
        let index = self.transaction_index(id)?;
        self.transactions.remove(index);
        Ok(())
    }

    fn budget_allocation(
        &self,
        budget_id: &str,
        month: Month,
    ) -> Result<Option<Transaction>, EngineError> {
        let mut rows = self.transactions.iter().filter(|t| {
            t.origin_id.as_deref() == Some(budget_id) && month.contains(t.date_created)
        });
        let first = rows.next().cloned();
        if rows.next().is_some() {
            return Err(EngineError::InvariantViolation(format!(
                "multiple allocations for budget '{}' in {}",
                budget_id, month
            )));
        }
        Ok(first)
    }

    fn spent_against_budget(&self, budget_id: &str, month: Month) -> Result<f64, EngineError> {
        Ok(self
            .linked_to_budget(budget_id)
            .filter(|t| month.contains(t.date_payed))
            .filter(|t| t.status != TransactionStatus::Pending)
            .map(|t| t.amount.abs())
            .sum())
    }

    fn committed_against_budget(
        &self,
        budget_id: &str,
        month: Month,
    ) -> Result<f64, EngineError> {
        Ok(self
            .linked_to_budget(budget_id)
            .filter(|t| month.contains(t.date_payed))
            .filter(|t| t.status == TransactionStatus::Committed)
            .map(|t| t.amount.abs())
            .sum())
    }

    fn delete_allocations_from(
        &mut self,
        budget_id: &str,
        from_month: Month,
    ) -> Result<usize, EngineError> {
        let cutoff = from_month.first_day();
        let before = self.transactions.len();
        self.transactions.retain(|t| {
            !(t.origin_id.as_deref() == Some(budget_id) && t.date_created >= cutoff)
        });
        Ok(before - self.transactions.len())
    }

    fn delete_forecasts_after(
        &mut self,
        origin_id: &str,
        after: NaiveDate,
    ) -> Result<usize, EngineError> {
        let before = self.transactions.len();
        self.transactions.retain(|t| {
            !(t.origin_id.as_deref() == Some(origin_id)
                && t.status == TransactionStatus::Forecast
                && t.date_created > after)
        });
        Ok(before - self.transactions.len())
    }

    fn update_forecast_account_from(
        &mut self,
        origin_id: &str,
        from_date: NaiveDate,
        account_id: &str,
    ) -> Result<usize, EngineError> {
        let mut updated = 0;
        for transaction in self.transactions.iter_mut().filter(|t| {
            t.origin_id.as_deref() == Some(origin_id)
                && t.status == TransactionStatus::Forecast
                && t.date_created >= from_date
        }) {
            transaction.account = account_id.to_string();
            updated += 1;
        }
        Ok(updated)
    }

    fn commit_forecasts_on_or_before(&mut self, date: NaiveDate) -> Result<usize, EngineError> {
        let mut committed = 0;
        for transaction in self
            .transactions
            .iter_mut()
            .filter(|t| t.status == TransactionStatus::Forecast && t.date_payed <= date)
        {
            transaction.status = TransactionStatus::Committed;
            committed += 1;
        }
        Ok(committed)
    }

    fn categories(&self) -> Result<Vec<Category>, EngineError> {
        let mut categories = self.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    fn category_exists(&self, name: &str) -> Result<bool, EngineError> {
        Ok(self.categories.iter().any(|c| c.name == name))
    }

    fn add_category(&mut self, category: Category) -> Result<(), EngineError> {
        if self.category_exists(&category.name)? {
            return Err(EngineError::InvalidRequest(format!(
                "category '{}' already exists",
                category.name
            )));
        }
        self.categories.push(category);
        Ok(())
    }

    fn update_category(&mut self, name: &str, description: &str) -> Result<(), EngineError> {
        let category = self
            .categories
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| EngineError::NotFound(format!("category '{}'", name)))?;
        category.description = description.to_string();
        Ok(())
    }

    fn delete_category(&mut self, name: &str) -> Result<(), EngineError> {
        let before = self.categories.len();
        self.categories.retain(|c| c.name != name);
        if self.categories.len() == before {
            return Err(EngineError::NotFound(format!("category '{}'", name)));
        }
        Ok(())
    }

    fn setting(&self, key: &str) -> Result<Option<String>, EngineError> {
        Ok(self.settings.get(key).cloned())
    }

    fn set_setting(&mut self, key: &str, value: &str) -> Result<(), EngineError> {
        self.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn draft(
        created: NaiveDate,
        payed: NaiveDate,
        amount: f64,
        budget: Option<&str>,
        status: TransactionStatus,
        origin: Option<&str>,
    ) -> TransactionDraft {
        TransactionDraft {
            date_created: created,
            date_payed: payed,
            description: "row".to_string(),
            account: "Cash".to_string(),
            amount,
            category: None,
            budget: budget.map(str::to_string),
            status,
            origin_id: origin.map(str::to_string),
        }
    }

    #[test]
    fn all_transactions_sort_by_payment_date_then_id() {
        let mut store = MemoryStore::new();
        store
            .insert_transactions(vec![
                draft(
                    date(2025, 10, 1),
                    date(2025, 10, 20),
                    -1.0,
                    None,
                    TransactionStatus::Committed,
                    None,
                ),
                draft(
                    date(2025, 10, 1),
                    date(2025, 10, 5),
                    -2.0,
                    None,
                    TransactionStatus::Committed,
                    None,
                ),
                draft(
                    date(2025, 10, 1),
                    date(2025, 10, 5),
                    -3.0,
                    None,
                    TransactionStatus::Committed,
                    None,
                ),
            ])
            .unwrap();
        let ids: Vec<i64> = store
            .all_transactions()
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn duplicate_allocations_are_an_invariant_violation() {
        let mut store = MemoryStore::new();
        let month = Month::new(2025, 10);
        let allocation = |day| {
            draft(
                date(2025, 10, day),
                date(2025, 10, day),
                -100.0,
                Some("budget_x"),
                TransactionStatus::Forecast,
                Some("budget_x"),
            )
        };
        store.insert_transactions(vec![allocation(1)]).unwrap();
        assert!(store.budget_allocation("budget_x", month).unwrap().is_some());

        store.insert_transactions(vec![allocation(2)]).unwrap();
        assert!(matches!(
            store.budget_allocation("budget_x", month),
            Err(EngineError::InvariantViolation(_))
        ));
    }

    #[test]
    fn spend_sums_exclude_pending_rows_and_the_allocation() {
        let mut store = MemoryStore::new();
        let month = Month::new(2025, 10);
        store
            .insert_transactions(vec![
                // The allocation itself.
                draft(
                    date(2025, 10, 1),
                    date(2025, 10, 1),
                    -400.0,
                    Some("budget_food"),
                    TransactionStatus::Committed,
                    Some("budget_food"),
                ),
                draft(
                    date(2025, 10, 5),
                    date(2025, 10, 5),
                    -50.0,
                    Some("budget_food"),
                    TransactionStatus::Committed,
                    None,
                ),
                draft(
                    date(2025, 10, 6),
                    date(2025, 10, 6),
                    -30.0,
                    Some("budget_food"),
                    TransactionStatus::Pending,
                    None,
                ),
                draft(
                    date(2025, 10, 7),
                    date(2025, 10, 7),
                    -20.0,
                    Some("budget_food"),
                    TransactionStatus::Planning,
                    None,
                ),
                // Billed into November: outside this month's spend.
                draft(
                    date(2025, 10, 15),
                    date(2025, 11, 25),
                    -60.0,
                    Some("budget_food"),
                    TransactionStatus::Committed,
                    None,
                ),
            ])
            .unwrap();
        assert_eq!(store.spent_against_budget("budget_food", month).unwrap(), 70.0);
        assert_eq!(
            store
                .committed_against_budget("budget_food", Month::new(2025, 11))
                .unwrap(),
            60.0
        );
    }
}
