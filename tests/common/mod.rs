#![allow(dead_code)]

use cashflow_core::{
    Account, LedgerStore, MemoryStore, Month, SubscriptionRequest, Transaction,
    TransactionController, UnderspendBehavior,
};
use chrono::NaiveDate;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A store with the fixture accounts: plain cash, a Visa cutting on the 14th
/// and paying on the 25th, and an Amex cutting on the 2nd and paying on the
/// 15th.
pub fn seeded_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.add_account(Account::cash("Cash")).unwrap();
    store
        .add_account(Account::credit_card("Visa", 14, 25).unwrap())
        .unwrap();
    store
        .add_account(Account::credit_card("Amex", 2, 15).unwrap())
        .unwrap();
    store
}

pub fn budget_request(
    id: &str,
    name: &str,
    monthly_amount: f64,
    account: &str,
    start: NaiveDate,
) -> SubscriptionRequest {
    SubscriptionRequest {
        id: id.to_string(),
        name: name.to_string(),
        category: "General".to_string(),
        monthly_amount,
        payment_account_id: account.to_string(),
        start_date: start,
        end_date: None,
        is_budget: true,
        is_income: false,
        underspend_behavior: UnderspendBehavior::Keep,
    }
}

/// Creates a budget subscription and its initial forecast allocations.
pub fn add_budget(
    store: &mut dyn LedgerStore,
    id: &str,
    name: &str,
    monthly_amount: f64,
    account: &str,
    start: NaiveDate,
) {
    TransactionController::add_subscription(
        store,
        &budget_request(id, name, monthly_amount, account, start),
    )
    .unwrap();
}

pub fn allocation_amount(store: &dyn LedgerStore, budget_id: &str, month: Month) -> f64 {
    store
        .budget_allocation(budget_id, month)
        .unwrap()
        .unwrap_or_else(|| panic!("no allocation for {} in {}", budget_id, month))
        .amount
}

pub fn find_by_description(store: &dyn LedgerStore, needle: &str) -> Transaction {
    store
        .all_transactions()
        .unwrap()
        .into_iter()
        .find(|t| t.description.contains(needle))
        .unwrap_or_else(|| panic!("no transaction matching '{}'", needle))
}

pub fn assert_amount(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {:.2}, got {:.2}",
        expected,
        actual
    );
}
