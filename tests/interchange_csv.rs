//! CSV interchange: bank-statement ingest parsing (both shapes) and full
//! ledger export.

mod common;

use cashflow_core::interchange::{
    export_transactions, read_import_rows, read_installment_import_rows,
};
use cashflow_core::{TransactionController, TransactionRequest};
use common::{date, seeded_store};

#[test]
fn simple_import_rows_parse_statement_dates() {
    let csv = "\
date,description,account_id,amount
10/05/25,Lunch at cafe,Cash,15.75
10/13/25,Headphones,Visa,-89.90
";
    let rows = read_import_rows(csv.as_bytes()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].date, date(2025, 10, 5));
    assert_eq!(rows[0].account_id, "Cash");
    assert_eq!(rows[0].amount, 15.75);
    assert!(rows[0].installment.is_none());

    match rows[1].clone().into_request() {
        TransactionRequest::Simple {
            description,
            account,
            ..
        } => {
            assert_eq!(description, "Headphones");
            assert_eq!(account, "Visa");
        }
        other => panic!("expected a simple request, got {:?}", other),
    }
}

#[test]
fn installment_import_rows_resume_the_plan() {
    let csv = "\
date,description,account_id,amount,current_installment,total_installments
10/05/25,New Laptop,Visa,-100.00,7,12
10/06/25,Lunch,Cash,12.00,,
";
    let rows = read_installment_import_rows(csv.as_bytes()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].installment, Some((7, 12)));
    assert!(rows[1].installment.is_none());

    match rows[0].clone().into_request() {
        TransactionRequest::Installment {
            total_amount,
            installments,
            start_from_installment,
            total_installments,
            ..
        } => {
            // 12 x 100 was the original plan; 6 installments remain.
            assert_eq!(total_amount, 1200.0);
            assert_eq!(installments, 6);
            assert_eq!(start_from_installment, 7);
            assert_eq!(total_installments, Some(12));
        }
        other => panic!("expected an installment request, got {:?}", other),
    }
}

#[test]
fn malformed_rows_are_rejected_with_line_numbers() {
    let csv = "\
date,description,account_id,amount
not-a-date,Lunch,Cash,10.0
";
    let error = read_import_rows(csv.as_bytes()).unwrap_err();
    assert!(error.to_string().contains("line 2"));
}

#[test]
fn export_round_trips_the_ledger_shape() {
    let mut store = seeded_store();
    TransactionController::add(
        &mut store,
        &TransactionRequest::simple("Lunch at cafe", 15.75, "Cash"),
        date(2025, 10, 5),
    )
    .unwrap();
    TransactionController::add(
        &mut store,
        &TransactionRequest::installment("Laptop", 600.0, 3, "Visa"),
        date(2025, 10, 13),
    )
    .unwrap();

    let mut plain = Vec::new();
    let written = export_transactions(&store, &mut plain, false).unwrap();
    assert_eq!(written, 4);
    let text = String::from_utf8(plain).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "id,date_created,date_payed,description,account,amount,category,budget,status,origin_id"
    );
    assert!(text.contains("Lunch at cafe"));
    assert!(text.contains("Laptop (1/3)"));
    assert!(text.contains("committed"));

    let mut with_balance = Vec::new();
    export_transactions(&store, &mut with_balance, true).unwrap();
    let text = String::from_utf8(with_balance).unwrap();
    assert!(text.lines().next().unwrap().ends_with(",running_balance"));
    // Last row carries the cumulative total: -15.75 - 3 x 200.
    assert!(text.trim_end().lines().last().unwrap().ends_with("-615.75"));
}
