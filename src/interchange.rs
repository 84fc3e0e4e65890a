//! CSV interchange: batch-ingest row parsing and full ledger export.
//!
//! Import rows use the bank-statement date format `MM/DD/YY`. Parsing only
//! produces typed requests; the driver feeds them through the controller so
//! budgets heal normally.

use std::io;

use chrono::NaiveDate;

use crate::engine::projection::QueryProjector;
use crate::errors::EngineError;
use crate::ledger::{round_cents, TransactionRequest};
use crate::storage::LedgerStore;

const IMPORT_DATE_FORMAT: &str = "%m/%d/%y";

/// One batch-ingest row: `date, description, account_id, amount`, optionally
/// followed by `current_installment, total_installments` for resuming an
/// installment plan already underway.
#[derive(Debug, Clone)]
pub struct ImportRow {
    pub date: NaiveDate,
    pub description: String,
    pub account_id: String,
    pub amount: f64,
    pub installment: Option<(u32, u32)>,
}

impl ImportRow {
    /// The typed request this row describes. Installment rows reconstruct
    /// the original plan total and the remaining installments to create.
    pub fn into_request(self) -> TransactionRequest {
        match self.installment {
            None => TransactionRequest::simple(self.description, self.amount, self.account_id),
            Some((current, total)) => {
                let original_total = round_cents(self.amount.abs() * total as f64);
                let remaining = total.saturating_sub(current) + 1;
                TransactionRequest::installment(
                    self.description,
                    original_total,
                    remaining,
                    self.account_id,
                )
                .resuming(current, total)
            }
        }
    }
}

fn parse_date(field: &str, line: u64) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(field.trim(), IMPORT_DATE_FORMAT).map_err(|err| {
        EngineError::InvalidRequest(format!("line {}: bad date '{}': {}", line, field, err))
    })
}

fn parse_amount(field: &str, line: u64) -> Result<f64, EngineError> {
    field.trim().parse().map_err(|_| {
        EngineError::InvalidRequest(format!("line {}: bad amount '{}'", line, field))
    })
}

/// Reads `date, description, account_id, amount` rows (header expected).
pub fn read_import_rows<R: io::Read>(reader: R) -> Result<Vec<ImportRow>, EngineError> {
    read_rows(reader, false)
}

/// Reads the six-column installment-import shape (header expected). Rows
/// with empty installment columns are treated as simple transactions.
pub fn read_installment_import_rows<R: io::Read>(
    reader: R,
) -> Result<Vec<ImportRow>, EngineError> {
    read_rows(reader, true)
}

fn read_rows<R: io::Read>(
    reader: R,
    with_installments: bool,
) -> Result<Vec<ImportRow>, EngineError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let expected = if with_installments { 6 } else { 4 };
    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|err| EngineError::Storage(err.to_string()))?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() < expected {
            return Err(EngineError::InvalidRequest(format!(
                "line {}: expected {} columns, got {}",
                line,
                expected,
                record.len()
            )));
        }
        let installment = if with_installments {
            let current = record.get(4).unwrap_or_default();
            let total = record.get(5).unwrap_or_default();
            match (current.is_empty(), total.is_empty()) {
                (true, true) => None,
                _ => {
                    let parse = |field: &str| {
                        field.parse::<u32>().map_err(|_| {
                            EngineError::InvalidRequest(format!(
                                "line {}: bad installment count '{}'",
                                line, field
                            ))
                        })
                    };
                    Some((parse(current)?, parse(total)?))
                }
            }
        } else {
            None
        };
        rows.push(ImportRow {
            date: parse_date(record.get(0).unwrap_or_default(), line)?,
            description: record.get(1).unwrap_or_default().to_string(),
            account_id: record.get(2).unwrap_or_default().to_string(),
            amount: parse_amount(record.get(3).unwrap_or_default(), line)?,
            installment,
        });
    }
    Ok(rows)
}

/// Exports every transaction, ordered by payment date, optionally suffixed
/// with the running balance. Returns the number of rows written.
pub fn export_transactions<W: io::Write>(
    store: &dyn LedgerStore,
    writer: W,
    with_balance: bool,
) -> Result<usize, EngineError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut headers = vec![
        "id",
        "date_created",
        "date_payed",
        "description",
        "account",
        "amount",
        "category",
        "budget",
        "status",
        "origin_id",
    ];
    if with_balance {
        headers.push("running_balance");
    }
    csv_writer
        .write_record(&headers)
        .map_err(|err| EngineError::Storage(err.to_string()))?;

    let rows = QueryProjector::running_balance(store)?;
    let count = rows.len();
    for row in rows {
        let t = &row.transaction;
        let mut record = vec![
            t.id.to_string(),
            t.date_created.to_string(),
            t.date_payed.to_string(),
            t.description.clone(),
            t.account.clone(),
            format!("{:.2}", t.amount),
            t.category.clone().unwrap_or_default(),
            t.budget.clone().unwrap_or_default(),
            t.status.to_string(),
            t.origin_id.clone().unwrap_or_default(),
        ];
        if with_balance {
            record.push(format!("{:.2}", row.running_balance));
        }
        csv_writer
            .write_record(&record)
            .map_err(|err| EngineError::Storage(err.to_string()))?;
    }
    csv_writer
        .flush()
        .map_err(EngineError::Io)?;
    Ok(count)
}
