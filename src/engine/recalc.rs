//! The budget invariant: for a budget with monthly amount `A` and linked
//! spending `S` in a month, the month's allocation row always carries
//! `-A + min(S, A)` — a value in `[-A, 0]`, capped at zero on overspend.

use tracing::warn;

use crate::dates::Month;
use crate::errors::EngineError;
use crate::ledger::{round_cents, TransactionUpdate, CENT_EPSILON};
use crate::storage::LedgerStore;

pub struct BudgetRecalculator;

impl BudgetRecalculator {
    /// Rederives the allocation amount for `(budget_id, month)` from the
    /// store. Unknown or non-budget ids are logged no-ops; a missing
    /// allocation row is left alone (creation is the caller's decision).
    pub fn recalculate(
        store: &mut dyn LedgerStore,
        budget_id: &str,
        month: Month,
    ) -> Result<(), EngineError> {
        let Some(subscription) = store.subscription(budget_id)? else {
            warn!(budget_id, %month, "recalculation skipped: budget does not resolve");
            return Ok(());
        };
        if !subscription.is_budget {
            warn!(budget_id, %month, "recalculation skipped: subscription is not a budget");
            return Ok(());
        }

        let Some(allocation) = store.budget_allocation(budget_id, month)? else {
            return Ok(());
        };

        let envelope = subscription.monthly_amount;
        let spent = store.spent_against_budget(budget_id, month)?;
        let target = round_cents(-envelope + spent.min(envelope));
        if (allocation.amount - target).abs() > CENT_EPSILON {
            store.update_transaction(allocation.id, &TransactionUpdate::amount(target))?;
        }
        Ok(())
    }
}
