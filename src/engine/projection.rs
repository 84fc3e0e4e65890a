//! Read-side projections: the running-balance series, per-month minima with
//! month-over-month deltas, and the credit-card summary view that folds each
//! card's payment day into one synthetic row.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;

use crate::dates::Month;
use crate::errors::EngineError;
use crate::ledger::{round_cents, Transaction, TransactionId, TransactionStatus};
use crate::storage::LedgerStore;

/// A transaction annotated with the running balance after it.
#[derive(Debug, Clone)]
pub struct BalanceRow {
    pub transaction: Transaction,
    pub running_balance: f64,
}

/// Month aggregate over the running-balance series.
#[derive(Debug, Clone, Copy)]
pub struct MonthlyFigure {
    pub month: Month,
    /// Lowest running balance among the month's rows.
    pub minimum: f64,
    /// `minimum - previous month's minimum`; `None` for the first month or
    /// after a gap.
    pub delta: Option<f64>,
}

/// One line of the summarized ledger view. Synthetic fold rows carry no
/// transaction id.
#[derive(Debug, Clone)]
pub struct LedgerLine {
    pub transaction_id: Option<TransactionId>,
    pub date_payed: NaiveDate,
    pub description: String,
    pub account: String,
    pub amount: f64,
    pub status: TransactionStatus,
    pub running_balance: f64,
}

pub struct QueryProjector;

impl QueryProjector {
    /// All transactions ordered by `(date_payed, id)`, each annotated with
    /// the running balance after it. Pending rows appear but do not move the
    /// balance.
    pub fn running_balance(store: &dyn LedgerStore) -> Result<Vec<BalanceRow>, EngineError> {
        let mut running = 0.0;
        Ok(store
            .all_transactions()?
            .into_iter()
            .map(|transaction| {
                if transaction.status.contributes_to_balance() {
                    running += transaction.amount;
                }
                BalanceRow {
                    running_balance: round_cents(running),
                    transaction,
                }
            })
            .collect())
    }

    /// Per-month minima of the running balance, with month-over-month deltas.
    pub fn monthly_overview(rows: &[BalanceRow]) -> Vec<MonthlyFigure> {
        let mut minima: BTreeMap<Month, f64> = BTreeMap::new();
        for row in rows {
            let month = Month::containing(row.transaction.date_payed);
            minima
                .entry(month)
                .and_modify(|minimum| *minimum = minimum.min(row.running_balance))
                .or_insert(row.running_balance);
        }
        minima
            .iter()
            .map(|(&month, &minimum)| {
                let delta = minima
                    .get(&month.shift(-1))
                    .map(|previous| round_cents(minimum - previous));
                MonthlyFigure {
                    month,
                    minimum,
                    delta,
                }
            })
            .collect()
    }

    /// The ledger with every credit-card account's rows folded into one
    /// `"<account> Payment"` line per `(account, date_payed)`. The synthetic
    /// line carries the group sum, the strongest status present, and the
    /// running balance of the group's last original row; it sits at that
    /// row's position. Cash rows pass through unchanged. `include_planning`
    /// folds `Planning` card rows into the summary instead of passing them
    /// through individually.
    pub fn credit_card_summary(
        store: &dyn LedgerStore,
        include_planning: bool,
    ) -> Result<Vec<LedgerLine>, EngineError> {
        let rows = Self::running_balance(store)?;
        let card_accounts: HashSet<String> = store
            .accounts()?
            .into_iter()
            .filter(|account| account.is_credit_card())
            .map(|account| account.account_id)
            .collect();

        struct Fold {
            amount: f64,
            status: TransactionStatus,
            last_index: usize,
            running_balance: f64,
        }
        let mut folds: HashMap<(String, NaiveDate), Fold> = HashMap::new();
        let mut pass_through: Vec<usize> = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            let transaction = &row.transaction;
            let foldable = card_accounts.contains(&transaction.account)
                && (include_planning || transaction.status != TransactionStatus::Planning);
            if !foldable {
                pass_through.push(index);
                continue;
            }
            let key = (transaction.account.clone(), transaction.date_payed);
            folds
                .entry(key)
                .and_modify(|fold| {
                    fold.amount += transaction.amount;
                    if transaction.status.strength() > fold.status.strength() {
                        fold.status = transaction.status;
                    }
                    fold.last_index = index;
                    fold.running_balance = row.running_balance;
                })
                .or_insert(Fold {
                    amount: transaction.amount,
                    status: transaction.status,
                    last_index: index,
                    running_balance: row.running_balance,
                });
        }

        let fold_positions: HashMap<usize, (String, NaiveDate)> = folds
            .iter()
            .map(|(key, fold)| (fold.last_index, key.clone()))
            .collect();
        let pass_set: HashSet<usize> = pass_through.into_iter().collect();

        let mut lines = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            if pass_set.contains(&index) {
                let transaction = &row.transaction;
                lines.push(LedgerLine {
                    transaction_id: Some(transaction.id),
                    date_payed: transaction.date_payed,
                    description: transaction.description.clone(),
                    account: transaction.account.clone(),
                    amount: transaction.amount,
                    status: transaction.status,
                    running_balance: row.running_balance,
                });
            } else if let Some((account, date)) = fold_positions.get(&index) {
                let fold = &folds[&(account.clone(), *date)];
                lines.push(LedgerLine {
                    transaction_id: None,
                    date_payed: *date,
                    description: format!("{} Payment", account),
                    account: account.clone(),
                    amount: round_cents(fold.amount),
                    status: fold.status,
                    running_balance: fold.running_balance,
                });
            }
        }
        Ok(lines)
    }
}
