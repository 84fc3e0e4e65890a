//! Date changes are structural: the whole group is deleted and re-created so
//! every payment date is re-simulated, and both the vacated and the newly
//! occupied budget-months end at their correct steady state.

mod common;

use cashflow_core::{LedgerStore, Month, TransactionController, TransactionRequest};
use common::{add_budget, allocation_amount, assert_amount, date, find_by_description, seeded_store};

const TRANSPORT: &str = "budget_transport";
const SHOPPING: &str = "budget_shopping";

#[test]
fn moving_a_purchase_forward_uncaps_the_old_month() {
    let mut store = seeded_store();
    add_budget(
        &mut store,
        TRANSPORT,
        "Transport Budget",
        100.0,
        "Visa",
        date(2025, 10, 1),
    );

    // Both purchases bill into October (before the cut-off).
    TransactionController::add(
        &mut store,
        &TransactionRequest::simple("Gasoline", 80.0, "Visa").with_budget(TRANSPORT),
        date(2025, 10, 10),
    )
    .unwrap();
    TransactionController::add(
        &mut store,
        &TransactionRequest::simple("Uber Ride", 40.0, "Visa").with_budget(TRANSPORT),
        date(2025, 10, 12),
    )
    .unwrap();
    assert_amount(allocation_amount(&store, TRANSPORT, Month::new(2025, 10)), 0.0);
    assert_amount(allocation_amount(&store, TRANSPORT, Month::new(2025, 11)), -100.0);

    // Moving the ride past the cut-off pushes its bill into November.
    let ride = find_by_description(&store, "Uber Ride");
    TransactionController::change_date(&mut store, ride.id, date(2025, 10, 15)).unwrap();

    assert_amount(allocation_amount(&store, TRANSPORT, Month::new(2025, 10)), -20.0);
    assert_amount(allocation_amount(&store, TRANSPORT, Month::new(2025, 11)), -60.0);
}

#[test]
fn moving_a_purchase_backward_caps_the_new_month() {
    let mut store = seeded_store();
    add_budget(
        &mut store,
        TRANSPORT,
        "Transport Budget",
        100.0,
        "Visa",
        date(2025, 10, 1),
    );

    TransactionController::add(
        &mut store,
        &TransactionRequest::simple("Gasoline", 80.0, "Visa").with_budget(TRANSPORT),
        date(2025, 10, 10),
    )
    .unwrap();
    TransactionController::add(
        &mut store,
        &TransactionRequest::simple("Uber Ride", 40.0, "Visa").with_budget(TRANSPORT),
        date(2025, 10, 15),
    )
    .unwrap();
    assert_amount(allocation_amount(&store, TRANSPORT, Month::new(2025, 10)), -20.0);
    assert_amount(allocation_amount(&store, TRANSPORT, Month::new(2025, 11)), -60.0);

    let ride = find_by_description(&store, "Uber Ride");
    TransactionController::change_date(&mut store, ride.id, date(2025, 10, 12)).unwrap();

    assert_amount(allocation_amount(&store, TRANSPORT, Month::new(2025, 10)), 0.0);
    assert_amount(allocation_amount(&store, TRANSPORT, Month::new(2025, 11)), -100.0);
}

#[test]
fn moving_an_installment_purchase_shifts_every_sibling() {
    let mut store = seeded_store();
    add_budget(
        &mut store,
        SHOPPING,
        "Shopping Budget",
        300.0,
        "Visa",
        date(2025, 10, 1),
    );

    TransactionController::add(
        &mut store,
        &TransactionRequest::installment("Big Purchase", 300.0, 3, "Visa").with_budget(SHOPPING),
        date(2025, 10, 13),
    )
    .unwrap();
    assert_amount(allocation_amount(&store, SHOPPING, Month::new(2025, 10)), -200.0);
    assert_amount(allocation_amount(&store, SHOPPING, Month::new(2025, 11)), -200.0);
    assert_amount(allocation_amount(&store, SHOPPING, Month::new(2025, 12)), -200.0);

    let first = find_by_description(&store, "Big Purchase (1/3)");
    TransactionController::change_date(&mut store, first.id, date(2025, 10, 15)).unwrap();

    // All three bills slid one cycle forward.
    let moved: Vec<_> = store
        .all_transactions()
        .unwrap()
        .into_iter()
        .filter(|t| t.description.starts_with("Big Purchase"))
        .map(|t| t.date_payed)
        .collect();
    assert_eq!(
        moved,
        vec![date(2025, 11, 25), date(2025, 12, 25), date(2026, 1, 25)]
    );
    assert_amount(allocation_amount(&store, SHOPPING, Month::new(2025, 10)), -300.0);
    assert_amount(allocation_amount(&store, SHOPPING, Month::new(2025, 11)), -200.0);
    assert_amount(allocation_amount(&store, SHOPPING, Month::new(2025, 12)), -200.0);
    assert_amount(allocation_amount(&store, SHOPPING, Month::new(2026, 1)), -200.0);
}

#[test]
fn moving_an_installment_purchase_backward_restores_the_tail_month() {
    let mut store = seeded_store();
    add_budget(
        &mut store,
        SHOPPING,
        "Shopping Budget",
        300.0,
        "Visa",
        date(2025, 10, 1),
    );

    TransactionController::add(
        &mut store,
        &TransactionRequest::installment("Big Purchase", 300.0, 3, "Visa").with_budget(SHOPPING),
        date(2025, 10, 15),
    )
    .unwrap();
    assert_amount(allocation_amount(&store, SHOPPING, Month::new(2025, 11)), -200.0);
    assert_amount(allocation_amount(&store, SHOPPING, Month::new(2025, 12)), -200.0);
    assert_amount(allocation_amount(&store, SHOPPING, Month::new(2026, 1)), -200.0);

    let first = find_by_description(&store, "Big Purchase (1/3)");
    TransactionController::change_date(&mut store, first.id, date(2025, 10, 13)).unwrap();

    assert_amount(allocation_amount(&store, SHOPPING, Month::new(2025, 10)), -200.0);
    assert_amount(allocation_amount(&store, SHOPPING, Month::new(2025, 11)), -200.0);
    assert_amount(allocation_amount(&store, SHOPPING, Month::new(2025, 12)), -200.0);
    assert_amount(allocation_amount(&store, SHOPPING, Month::new(2026, 1)), -300.0);
}

#[test]
fn subscription_recurrences_refuse_date_changes() {
    let mut store = seeded_store();
    add_budget(
        &mut store,
        SHOPPING,
        "Shopping Budget",
        300.0,
        "Visa",
        date(2025, 10, 1),
    );
    let allocation = store
        .budget_allocation(SHOPPING, Month::new(2025, 10))
        .unwrap()
        .unwrap();
    assert!(TransactionController::change_date(&mut store, allocation.id, date(2025, 10, 20))
        .is_err());
}
