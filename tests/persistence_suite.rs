//! JSON store round-trips: the full ledger state survives a close/reopen,
//! and id assignment stays monotonic across sessions.

mod common;

use cashflow_core::{
    Account, JsonStore, LedgerStore, Month, TransactionController, TransactionRequest,
};
use common::{allocation_amount, assert_amount, budget_request, date};

fn populate(store: &mut JsonStore) {
    store.add_account(Account::cash("Cash")).unwrap();
    store
        .add_account(Account::credit_card("Visa", 14, 25).unwrap())
        .unwrap();
    TransactionController::add_subscription(
        store,
        &budget_request("budget_food", "Food Budget", 400.0, "Cash", date(2025, 10, 1)),
    )
    .unwrap();
    TransactionController::add(
        store,
        &TransactionRequest::simple("Groceries", 80.0, "Cash").with_budget("budget_food"),
        date(2025, 10, 12),
    )
    .unwrap();
    store.set_setting("forecast_horizon_months", "4").unwrap();
}

#[test]
fn ledger_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");

    {
        let mut store = JsonStore::open(&path).unwrap();
        populate(&mut store);
    }

    let store = JsonStore::open(&path).unwrap();
    assert_eq!(store.accounts().unwrap().len(), 2);
    assert!(store.subscription("budget_food").unwrap().is_some());
    assert_amount(
        allocation_amount(&store, "budget_food", Month::new(2025, 10)),
        -320.0,
    );
    assert_eq!(
        store.setting("forecast_horizon_months").unwrap().as_deref(),
        Some("4")
    );
    let groceries = store
        .all_transactions()
        .unwrap()
        .into_iter()
        .find(|t| t.description == "Groceries")
        .unwrap();
    assert_amount(groceries.amount, -80.0);
}

#[test]
fn transaction_ids_stay_monotonic_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");

    let max_before = {
        let mut store = JsonStore::open(&path).unwrap();
        populate(&mut store);
        store
            .all_transactions()
            .unwrap()
            .iter()
            .map(|t| t.id)
            .max()
            .unwrap()
    };

    let mut store = JsonStore::open(&path).unwrap();
    let inserted = TransactionController::add(
        &mut store,
        &TransactionRequest::simple("Coffee", 3.5, "Cash"),
        date(2025, 10, 13),
    )
    .unwrap();
    assert!(inserted[0].id > max_before);
}

#[test]
fn opening_a_missing_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonStore::open(dir.path().join("fresh.json")).unwrap();
    assert!(store.accounts().unwrap().is_empty());
    assert!(store.all_transactions().unwrap().is_empty());
}
