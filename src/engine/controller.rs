//! Routing and healing for every external mutation. Each operation follows
//! the same pattern: collect the `(budget, month)` pairs the change can
//! perturb, perform the structural mutation, then recalculate every collected
//! pair so the budget invariant holds when the call returns.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::dates::{shift_months, Month};
use crate::engine::factory::TransactionFactory;
use crate::engine::recalc::BudgetRecalculator;
use crate::engine::scheduler::ForecastScheduler;
use crate::errors::EngineError;
use crate::ledger::{
    classify_group, round_cents, GroupKind, SplitItem, Subscription, SubscriptionRequest,
    SubscriptionUpdate, Transaction, TransactionId, TransactionRequest, TransactionStatus,
    TransactionUpdate, CENT_EPSILON,
};
use crate::storage::LedgerStore;

/// Deltas smaller than one cent are not worth an adjustment row.
const ADJUSTMENT_EPSILON: f64 = 0.01;

type BudgetMonth = (String, Month);

/// A transaction together with its siblings and inferred group shape.
#[derive(Debug, Clone)]
pub struct TransactionGroup {
    pub kind: GroupKind,
    pub origin_id: Option<String>,
    /// Ordered by `(date_payed, id)`.
    pub siblings: Vec<Transaction>,
}

pub struct TransactionController;

impl TransactionController {
    /// Adds the transactions described by a typed request, dated `date`,
    /// auto-creating missing budget allocations and healing every touched
    /// budget-month.
    pub fn add(
        store: &mut dyn LedgerStore,
        request: &TransactionRequest,
        date: NaiveDate,
    ) -> Result<Vec<Transaction>, EngineError> {
        let account = store
            .account(request.account_id())?
            .ok_or_else(|| EngineError::NotFound(format!("account '{}'", request.account_id())))?;
        request.validate()?;
        Self::validate_budget_refs(store, request)?;

        let drafts = TransactionFactory::build(&account, request, date)?;
        let inserted = store.insert_transactions(drafts)?;
        Self::ensure_allocations(store, &inserted)?;
        let pairs = Self::collect_pairs(&inserted);
        Self::heal(store, &pairs)?;
        debug!(count = inserted.len(), "added transactions");
        Ok(inserted)
    }

    /// Applies a partial field update, and optionally moves the purchase
    /// date. A date move is structural: the whole group is deleted and
    /// re-created so payment dates are re-simulated consistently.
    pub fn edit(
        store: &mut dyn LedgerStore,
        id: TransactionId,
        update: &TransactionUpdate,
        new_date: Option<NaiveDate>,
    ) -> Result<(), EngineError> {
        let transaction = store
            .transaction(id)?
            .ok_or_else(|| EngineError::NotFound(format!("transaction {}", id)))?;
        if update.is_empty() && new_date.is_none() {
            return Err(EngineError::InvalidRequest("no changes specified".into()));
        }

        if !update.is_empty() {
            if let Some(Some(budget_id)) = &update.budget {
                Self::require_budget(store, budget_id)?;
            }
            let mut pairs = BTreeSet::new();
            pairs.extend(Self::budget_month(&transaction));
            store.update_transaction(id, update)?;
            let updated = store
                .transaction(id)?
                .ok_or_else(|| EngineError::NotFound(format!("transaction {}", id)))?;
            Self::ensure_allocations(store, std::slice::from_ref(&updated))?;
            pairs.extend(Self::budget_month(&updated));
            Self::heal(store, &pairs)?;
        }

        if let Some(date) = new_date {
            Self::change_date(store, id, date)?;
        }
        Ok(())
    }

    /// Moves a transaction (and every sibling of its group) to a new
    /// purchase date, re-simulating all payment dates.
    pub fn change_date(
        store: &mut dyn LedgerStore,
        id: TransactionId,
        new_date: NaiveDate,
    ) -> Result<Vec<Transaction>, EngineError> {
        let group = Self::group_info(store, id)?;
        if group.kind == GroupKind::Subscription {
            return Err(EngineError::InvalidRequest(
                "subscription recurrences cannot be moved; edit the subscription instead".into(),
            ));
        }
        let request = Self::rebuild_request(&group)?;
        Self::replace_group(store, &group, &request, new_date)
    }

    /// Converts a group (or simple transaction) into a different shape given
    /// by `request`. The purchase date defaults to the group's original one.
    pub fn convert(
        store: &mut dyn LedgerStore,
        id: TransactionId,
        request: &TransactionRequest,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Transaction>, EngineError> {
        let group = Self::group_info(store, id)?;
        if group.kind == GroupKind::Subscription {
            return Err(EngineError::InvalidRequest(
                "subscription recurrences cannot be converted".into(),
            ));
        }
        let date = date.unwrap_or(group.siblings[0].date_created);
        Self::replace_group(store, &group, request, date)
    }

    /// Deletes a transaction, or its whole group with `delete_group`.
    /// Allocation rows are owned by their budget and refuse deletion here.
    pub fn delete(
        store: &mut dyn LedgerStore,
        id: TransactionId,
        delete_group: bool,
    ) -> Result<usize, EngineError> {
        let group = Self::group_info(store, id)?;
        let targets: Vec<Transaction> = if delete_group {
            group.siblings
        } else {
            group
                .siblings
                .into_iter()
                .filter(|t| t.id == id)
                .collect()
        };
        for target in &targets {
            if let Some(origin) = &target.origin_id {
                if let Some(subscription) = store.subscription(origin)? {
                    if subscription.is_budget {
                        return Err(EngineError::InvalidRequest(format!(
                            "transaction {} is the '{}' allocation; delete the budget instead",
                            target.id, subscription.id
                        )));
                    }
                }
            }
        }
        let pairs = Self::collect_pairs(&targets);
        for target in &targets {
            store.delete_transaction(target.id)?;
        }
        Self::heal(store, &pairs)?;
        Ok(targets.len())
    }

    /// Commits a pending or planning transaction (optionally its group).
    pub fn clear(
        store: &mut dyn LedgerStore,
        id: TransactionId,
        clear_group: bool,
    ) -> Result<usize, EngineError> {
        let group = Self::group_info(store, id)?;
        let targets: Vec<Transaction> = if clear_group {
            group.siblings
        } else {
            group
                .siblings
                .into_iter()
                .filter(|t| t.id == id)
                .collect()
        };
        let clearable: Vec<&Transaction> = targets
            .iter()
            .filter(|t| {
                matches!(
                    t.status,
                    TransactionStatus::Pending | TransactionStatus::Planning
                )
            })
            .collect();
        if clearable.is_empty() {
            return Err(EngineError::InvalidRequest(format!(
                "transaction {} is not pending or planning",
                id
            )));
        }
        let mut pairs = BTreeSet::new();
        for target in clearable.iter() {
            pairs.extend(Self::budget_month(target));
        }
        let cleared = clearable.len();
        for target in clearable {
            store.update_transaction(
                target.id,
                &TransactionUpdate::status(TransactionStatus::Committed),
            )?;
        }
        Self::heal(store, &pairs)?;
        Ok(cleared)
    }

    /// Resolves a transaction's group: all rows sharing its `origin_id`, and
    /// the inferred group kind.
    pub fn group_info(
        store: &dyn LedgerStore,
        id: TransactionId,
    ) -> Result<TransactionGroup, EngineError> {
        let transaction = store
            .transaction(id)?
            .ok_or_else(|| EngineError::NotFound(format!("transaction {}", id)))?;
        let (siblings, origin_id, origin_is_subscription) = match &transaction.origin_id {
            None => (vec![transaction.clone()], None, false),
            Some(origin) => {
                let siblings = store.transactions_by_origin(origin)?;
                let is_subscription = store.subscription(origin)?.is_some();
                (siblings, Some(origin.clone()), is_subscription)
            }
        };
        let kind = classify_group(&siblings, origin_is_subscription);
        Ok(TransactionGroup {
            kind,
            origin_id,
            siblings,
        })
    }

    /// Creates a subscription (or budget) and immediately extends its
    /// forecasts from the start date.
    pub fn add_subscription(
        store: &mut dyn LedgerStore,
        request: &SubscriptionRequest,
    ) -> Result<Subscription, EngineError> {
        request.validate()?;
        store
            .account(&request.payment_account_id)?
            .ok_or_else(|| {
                EngineError::NotFound(format!("account '{}'", request.payment_account_id))
            })?;
        if store.subscription(&request.id)?.is_some() {
            return Err(EngineError::InvalidRequest(format!(
                "subscription '{}' already exists",
                request.id
            )));
        }
        let subscription = request.clone().into_subscription();
        store.add_subscription(subscription.clone())?;
        let horizon = ForecastScheduler::horizon_months(store)?;
        ForecastScheduler::generate_forecasts(store, subscription.start_date, horizon)?;
        info!(id = %subscription.id, "added subscription");
        Ok(subscription)
    }

    /// Updates a subscription. An amount change regenerates the affected
    /// allocation horizon: the live (committed) month is recomputed in
    /// place, everything from the wipe point on is deleted and re-forecast
    /// with pre-seeding against committed future expenses. `retroactive`
    /// extends the wipe back to the subscription start.
    pub fn update_subscription(
        store: &mut dyn LedgerStore,
        id: &str,
        update: &SubscriptionUpdate,
        effective_date: NaiveDate,
        retroactive: bool,
    ) -> Result<(), EngineError> {
        let before = store
            .subscription(id)?
            .ok_or_else(|| EngineError::NotFound(format!("subscription '{}'", id)))?;
        if update.is_empty() {
            return Err(EngineError::InvalidRequest("no changes specified".into()));
        }
        if let Some(amount) = update.monthly_amount {
            if amount <= 0.0 {
                return Err(EngineError::InvalidRequest(
                    "monthly_amount must be positive".into(),
                ));
            }
        }
        if let Some(account_id) = &update.payment_account_id {
            store.account(account_id)?.ok_or_else(|| {
                EngineError::NotFound(format!("account '{}'", account_id))
            })?;
        }
        if let Some(Some(end)) = update.end_date {
            if end < before.start_date {
                return Err(EngineError::InvalidRequest(format!(
                    "end_date {} precedes start_date {}",
                    end, before.start_date
                )));
            }
        }

        store.update_subscription(id, update)?;

        let amount_changed = update
            .monthly_amount
            .map(|amount| (amount - before.monthly_amount).abs() > CENT_EPSILON)
            .unwrap_or(false);
        let horizon = ForecastScheduler::horizon_months(store)?;

        if amount_changed {
            if before.is_budget {
                let effective_month = Month::containing(effective_date);
                let mut wipe_from = effective_month;
                if let Some(live) = store.budget_allocation(id, effective_month)? {
                    if live.status == TransactionStatus::Committed {
                        BudgetRecalculator::recalculate(store, id, effective_month)?;
                        wipe_from = effective_month.next();
                    }
                }
                if retroactive {
                    wipe_from = Month::containing(before.start_date);
                }
                let wiped = store.delete_allocations_from(id, wipe_from)?;
                let horizon_end =
                    Month::containing(shift_months(effective_date, horizon as i32));
                let regen_horizon = horizon_end.months_since(wipe_from).max(0) as u32;
                ForecastScheduler::generate_forecasts(
                    store,
                    wipe_from.first_day(),
                    regen_horizon,
                )?;
                debug!(id, wiped, "regenerated budget allocations");
            } else {
                // Plain subscription price change: replace future forecasts.
                let effective_month = Month::containing(effective_date);
                let boundary = effective_month.first_day().pred_opt().unwrap();
                store.delete_forecasts_after(id, boundary)?;
                ForecastScheduler::generate_forecasts(store, effective_date, horizon)?;
            }
        }

        if let Some(account_id) = &update.payment_account_id {
            store.update_forecast_account_from(id, effective_date, account_id)?;
        }
        if let Some(Some(end)) = update.end_date {
            store.delete_forecasts_after(id, end)?;
        }
        Ok(())
    }

    /// Deletes a subscription together with every row it generated, clearing
    /// the dangling budget link on surviving expense rows.
    pub fn delete_subscription(
        store: &mut dyn LedgerStore,
        id: &str,
    ) -> Result<(), EngineError> {
        let subscription = store
            .subscription(id)?
            .ok_or_else(|| EngineError::NotFound(format!("subscription '{}'", id)))?;
        let owned = store.transactions_by_origin(id)?;
        for transaction in &owned {
            store.delete_transaction(transaction.id)?;
        }
        if subscription.is_budget {
            let unlink = TransactionUpdate {
                budget: Some(None),
                ..TransactionUpdate::default()
            };
            for transaction in store.all_transactions()? {
                if transaction.budget.as_deref() == Some(id) {
                    store.update_transaction(transaction.id, &unlink)?;
                }
            }
        }
        store.delete_subscription(id)?;
        info!(id, owned = owned.len(), "deleted subscription");
        Ok(())
    }

    /// Inserts an adjustment so the committed + pending total of `account`
    /// equals `target_total`. Returns the adjustment, or `None` when the
    /// books already match.
    pub fn fix_balance(
        store: &mut dyn LedgerStore,
        target_total: f64,
        account_id: &str,
        date: NaiveDate,
    ) -> Result<Option<Transaction>, EngineError> {
        let account = store
            .account(account_id)?
            .ok_or_else(|| EngineError::NotFound(format!("account '{}'", account_id)))?;
        let current: f64 = store
            .all_transactions()?
            .iter()
            .filter(|t| t.account == account.account_id)
            .filter(|t| {
                matches!(
                    t.status,
                    TransactionStatus::Committed | TransactionStatus::Pending
                )
            })
            .map(|t| t.amount)
            .sum();
        let delta = round_cents(target_total - current);
        if delta.abs() < ADJUSTMENT_EPSILON {
            return Ok(None);
        }
        let draft = TransactionFactory::build_adjustment(
            &account.account_id,
            "Balance Adjustment",
            date,
            delta,
        );
        let inserted = store.insert_transactions(vec![draft])?;
        info!(account = %account.account_id, delta, "inserted balance adjustment");
        Ok(inserted.into_iter().next())
    }

    /// Reconciles one month's statement for an account: sums the committed
    /// and forecast rows on the account's payment date and inserts the
    /// difference to `statement_total`. Deltas under a cent are a no-op.
    pub fn fix_statement(
        store: &mut dyn LedgerStore,
        account_id: &str,
        month: Month,
        statement_total: f64,
    ) -> Result<Option<Transaction>, EngineError> {
        let account = store
            .account(account_id)?
            .ok_or_else(|| EngineError::NotFound(format!("account '{}'", account_id)))?;
        let payment_date = match account.kind {
            crate::ledger::AccountKind::CreditCard { payment_day, .. } => {
                month.day_clamped(payment_day)
            }
            crate::ledger::AccountKind::Cash => month.last_day(),
        };
        let current: f64 = store
            .all_transactions()?
            .iter()
            .filter(|t| t.account == account.account_id && t.date_payed == payment_date)
            .filter(|t| {
                matches!(
                    t.status,
                    TransactionStatus::Committed | TransactionStatus::Forecast
                )
            })
            .map(|t| t.amount)
            .sum();
        let delta = round_cents(statement_total - current);
        if delta.abs() < ADJUSTMENT_EPSILON {
            return Ok(None);
        }
        let draft = TransactionFactory::build_adjustment(
            &account.account_id,
            "Statement Adjustment",
            payment_date,
            delta,
        );
        let inserted = store.insert_transactions(vec![draft])?;
        info!(
            account = %account.account_id,
            %payment_date,
            delta,
            "inserted statement adjustment"
        );
        Ok(inserted.into_iter().next())
    }

    // -- internals --

    /// The budget-month an expense perturbs: keyed by the cash-impact date,
    /// so a late-cycle card purchase debits the envelope of the month the
    /// bill actually hits. Allocation rows key by their own creation month.
    fn budget_month(transaction: &Transaction) -> Option<BudgetMonth> {
        let budget = transaction.budget.as_ref()?;
        let month = if transaction.origin_id.as_deref() == Some(budget.as_str()) {
            Month::containing(transaction.date_created)
        } else {
            Month::containing(transaction.date_payed)
        };
        Some((budget.clone(), month))
    }

    fn collect_pairs(transactions: &[Transaction]) -> BTreeSet<BudgetMonth> {
        transactions
            .iter()
            .filter_map(Self::budget_month)
            .collect()
    }

    fn heal(
        store: &mut dyn LedgerStore,
        pairs: &BTreeSet<BudgetMonth>,
    ) -> Result<(), EngineError> {
        for (budget_id, month) in pairs {
            BudgetRecalculator::recalculate(store, budget_id, *month)?;
        }
        Ok(())
    }

    fn require_budget(
        store: &dyn LedgerStore,
        budget_id: &str,
    ) -> Result<Subscription, EngineError> {
        let subscription = store
            .subscription(budget_id)?
            .ok_or_else(|| EngineError::NotFound(format!("budget '{}'", budget_id)))?;
        if !subscription.is_budget {
            return Err(EngineError::InvalidRequest(format!(
                "subscription '{}' is not a budget",
                budget_id
            )));
        }
        Ok(subscription)
    }

    fn validate_budget_refs(
        store: &dyn LedgerStore,
        request: &TransactionRequest,
    ) -> Result<(), EngineError> {
        for budget_id in request.budget_ids() {
            Self::require_budget(store, budget_id)?;
        }
        Ok(())
    }

    /// Creates the forecast allocation for any budget-month an inserted row
    /// touches that has no envelope yet.
    fn ensure_allocations(
        store: &mut dyn LedgerStore,
        rows: &[Transaction],
    ) -> Result<(), EngineError> {
        for (budget_id, month) in Self::collect_pairs(rows) {
            if store.budget_allocation(&budget_id, month)?.is_some() {
                continue;
            }
            let Some(subscription) = store.subscription(&budget_id)? else {
                continue;
            };
            if !subscription.is_budget {
                continue;
            }
            let Some(account) = store.account(&subscription.payment_account_id)? else {
                warn!(
                    budget = %budget_id,
                    account = %subscription.payment_account_id,
                    "cannot auto-create allocation: payment account missing"
                );
                continue;
            };
            let draft = TransactionFactory::build_allocation(&subscription, &account, month);
            store.insert_transactions(vec![draft])?;
            debug!(budget = %budget_id, %month, "auto-created allocation");
        }
        Ok(())
    }

    /// Rebuilds the typed request that would produce `group`, so the group
    /// can be deleted and re-added on a new date.
    fn rebuild_request(group: &TransactionGroup) -> Result<TransactionRequest, EngineError> {
        let first = group
            .siblings
            .first()
            .ok_or_else(|| EngineError::InvariantViolation("empty transaction group".into()))?;
        let is_pending = first.status == TransactionStatus::Pending;
        let is_planning = first.status == TransactionStatus::Planning;
        match group.kind {
            GroupKind::Simple => Ok(TransactionRequest::Simple {
                description: first.description.clone(),
                amount: first.amount.abs(),
                account: first.account.clone(),
                category: first.category.clone(),
                budget: first.budget.clone(),
                is_income: first.amount > 0.0,
                is_pending,
                is_planning,
                grace_period_months: 0,
            }),
            GroupKind::Installment => {
                let per_installment = first.amount.abs();
                let (base, start_from, plan_size) =
                    match TransactionFactory::parse_installment_label(&first.description) {
                        Some((base, number, plan)) => (base.to_string(), number, plan),
                        None => (
                            first.description.clone(),
                            1,
                            group.siblings.len() as u32,
                        ),
                    };
                Ok(TransactionRequest::Installment {
                    description: base,
                    total_amount: round_cents(per_installment * plan_size as f64),
                    installments: group.siblings.len() as u32,
                    account: first.account.clone(),
                    category: first.category.clone(),
                    budget: first.budget.clone(),
                    start_from_installment: start_from,
                    total_installments: Some(plan_size),
                    grace_period_months: 0,
                    is_pending,
                    is_planning,
                })
            }
            GroupKind::Split => Ok(TransactionRequest::Split {
                description: first.description.clone(),
                account: first.account.clone(),
                splits: group
                    .siblings
                    .iter()
                    .map(|t| SplitItem {
                        amount: t.amount.abs(),
                        category: t.category.clone(),
                        budget: t.budget.clone(),
                    })
                    .collect(),
                is_pending,
                is_planning,
            }),
            GroupKind::Subscription => Err(EngineError::InvalidRequest(
                "subscription groups cannot be rebuilt".into(),
            )),
        }
    }

    /// Delete-and-recreate: snapshot pairs, drop every sibling, heal the old
    /// months back to their pre-group state, then route the replacement
    /// through `add` (which heals the new months itself).
    fn replace_group(
        store: &mut dyn LedgerStore,
        group: &TransactionGroup,
        request: &TransactionRequest,
        date: NaiveDate,
    ) -> Result<Vec<Transaction>, EngineError> {
        let pairs = Self::collect_pairs(&group.siblings);
        for sibling in &group.siblings {
            store.delete_transaction(sibling.id)?;
        }
        Self::heal(store, &pairs)?;
        Self::add(store, request, date)
    }
}
