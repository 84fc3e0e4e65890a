//! Forecast maintenance: extending the horizon of recurring obligations,
//! committing forecasts that have come due, and month-end handling of
//! underspent envelopes.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::dates::{end_of_month, shift_months, Month};
use crate::engine::factory::TransactionFactory;
use crate::errors::EngineError;
use crate::ledger::{round_cents, TransactionStatus, TransactionUpdate, CENT_EPSILON};
use crate::storage::{LedgerStore, DEFAULT_FORECAST_HORIZON_MONTHS, FORECAST_HORIZON_KEY};

/// What a rollover run did.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolloverOutcome {
    pub committed: usize,
    pub generated: usize,
}

pub struct ForecastScheduler;

impl ForecastScheduler {
    /// The configured horizon, falling back to the default when the setting
    /// is absent or unparsable.
    pub fn horizon_months(store: &dyn LedgerStore) -> Result<u32, EngineError> {
        Ok(store
            .setting(FORECAST_HORIZON_KEY)?
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_FORECAST_HORIZON_MONTHS))
    }

    /// Tops up forecast rows for every active subscription through
    /// `from_date + horizon_months`. Generation only fills months beyond the
    /// last existing forecast of each subscription, so repeated calls with an
    /// unchanged store insert nothing.
    ///
    /// For budgets, months that already hold committed expenses (by payment
    /// date) are seeded with the reduced envelope so the regenerated
    /// allocation starts at `min(0, -A + committed)`.
    pub fn generate_forecasts(
        store: &mut dyn LedgerStore,
        from_date: NaiveDate,
        horizon_months: u32,
    ) -> Result<usize, EngineError> {
        let horizon_end = shift_months(from_date, horizon_months as i32);
        let mut generated = 0;

        for subscription in store.active_subscriptions(from_date, horizon_end)? {
            let Some(account) = store.account(&subscription.payment_account_id)? else {
                warn!(
                    subscription = %subscription.id,
                    account = %subscription.payment_account_id,
                    "skipping forecast generation: payment account not found"
                );
                continue;
            };

            let last_forecast = store
                .transactions_by_origin(&subscription.id)?
                .iter()
                .filter(|t| t.status == TransactionStatus::Forecast)
                .map(|t| t.date_created)
                .max();
            let start = last_forecast
                .map(|date| shift_months(date, 1))
                .unwrap_or(from_date)
                .max(from_date)
                .max(subscription.start_date);
            let end = subscription
                .end_date
                .map(|end| end.min(horizon_end))
                .unwrap_or(horizon_end);
            if start > end {
                continue;
            }

            let mut seeds = BTreeMap::new();
            if subscription.is_budget {
                for month in Month::containing(start).through(Month::containing(end)) {
                    let committed = store.committed_against_budget(&subscription.id, month)?;
                    if committed > CENT_EPSILON {
                        let magnitude =
                            round_cents((subscription.monthly_amount - committed).max(0.0));
                        seeds.insert(month, magnitude);
                    }
                }
            }

            let drafts =
                TransactionFactory::build_recurrent(&subscription, &account, start, end, &seeds);
            if drafts.is_empty() {
                continue;
            }
            let inserted = store.insert_transactions(drafts)?;
            debug!(
                subscription = %subscription.id,
                count = inserted.len(),
                "generated forecasts"
            );
            generated += inserted.len();
        }
        Ok(generated)
    }

    /// Commits every forecast payable by the end of `today`'s month, then
    /// tops the horizon back up. Idempotent for a fixed `today`.
    pub fn run_rollover(
        store: &mut dyn LedgerStore,
        today: NaiveDate,
    ) -> Result<RolloverOutcome, EngineError> {
        let committed = store.commit_forecasts_on_or_before(end_of_month(today))?;
        let horizon = Self::horizon_months(store)?;
        let generated = Self::generate_forecasts(store, today, horizon)?;
        Ok(RolloverOutcome {
            committed,
            generated,
        })
    }

    /// Applies the `Return` underspend policy for a completed month: each
    /// still-negative allocation of a returning budget is zeroed and the
    /// leftover comes back as a "Budget Release" inflow. Returns how many
    /// envelopes were released.
    pub fn run_month_end_budget_reconciliation(
        store: &mut dyn LedgerStore,
        month: Month,
    ) -> Result<usize, EngineError> {
        let mut released = 0;
        for subscription in
            store.active_subscriptions(month.first_day(), month.last_day())?
        {
            if !subscription.is_budget
                || subscription.underspend_behavior
                    != crate::ledger::UnderspendBehavior::Return
            {
                continue;
            }
            let Some(allocation) = store.budget_allocation(&subscription.id, month)? else {
                continue;
            };
            if allocation.amount >= -CENT_EPSILON {
                continue;
            }
            let release =
                TransactionFactory::build_release(&subscription, month, allocation.amount.abs());
            store.insert_transactions(vec![release])?;
            store.update_transaction(allocation.id, &TransactionUpdate::amount(0.0))?;
            released += 1;
        }
        Ok(released)
    }
}
