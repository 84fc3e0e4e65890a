//! Builders for every transaction shape the engine produces: user purchases
//! (single, installment, split), subscription recurrences, budget releases,
//! and reconciliation adjustments. All builders are pure; persistence and
//! budget healing happen in the controller.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::dates::{shift_months, Month};
use crate::engine::payment::simulate_payment_date;
use crate::errors::EngineError;
use crate::ledger::{
    round_cents, Account, Subscription, TransactionDraft, TransactionRequest, TransactionStatus,
};

pub struct TransactionFactory;

impl TransactionFactory {
    /// Mints the shared id linking siblings of a group.
    pub fn mint_origin_id(date: NaiveDate) -> String {
        let tag = Uuid::new_v4().simple().to_string();
        format!("{}-{}", date.format("%Y%m%d"), tag[..4].to_uppercase())
    }

    fn status_for(is_pending: bool, is_planning: bool) -> TransactionStatus {
        if is_pending {
            TransactionStatus::Pending
        } else if is_planning {
            TransactionStatus::Planning
        } else {
            TransactionStatus::Committed
        }
    }

    /// Builds the rows for a typed request dated `date`. The account must be
    /// the one the request names.
    pub fn build(
        account: &Account,
        request: &TransactionRequest,
        date: NaiveDate,
    ) -> Result<Vec<TransactionDraft>, EngineError> {
        request.validate()?;
        match request {
            TransactionRequest::Simple {
                description,
                amount,
                category,
                budget,
                is_income,
                is_pending,
                is_planning,
                grace_period_months,
                ..
            } => {
                let signed = if *is_income {
                    amount.abs()
                } else {
                    -amount.abs()
                };
                Ok(vec![TransactionDraft {
                    date_created: date,
                    date_payed: simulate_payment_date(account, date, *grace_period_months),
                    description: description.clone(),
                    account: account.account_id.clone(),
                    amount: signed,
                    category: category.clone(),
                    budget: budget.clone(),
                    status: Self::status_for(*is_pending, *is_planning),
                    origin_id: None,
                }])
            }
            TransactionRequest::Installment {
                description,
                total_amount,
                installments,
                category,
                budget,
                start_from_installment,
                total_installments,
                grace_period_months,
                is_pending,
                is_planning,
                ..
            } => {
                let origin_id = Self::mint_origin_id(date);
                let plan_size = (*total_installments).unwrap_or(*installments);
                // Per-installment amount follows the whole plan, not just the
                // rows this request creates.
                let per_installment = -round_cents(total_amount.abs() / plan_size as f64);
                let status = Self::status_for(*is_pending, *is_planning);
                let mut drafts = Vec::with_capacity(*installments as usize);
                for i in 0..*installments {
                    let number = start_from_installment + i;
                    if number > plan_size {
                        break;
                    }
                    let billing_date =
                        shift_months(date, (i + grace_period_months) as i32);
                    drafts.push(TransactionDraft {
                        date_created: date,
                        date_payed: simulate_payment_date(account, billing_date, 0),
                        description: Self::installment_label(description, number, plan_size),
                        account: account.account_id.clone(),
                        amount: per_installment,
                        category: category.clone(),
                        budget: budget.clone(),
                        status,
                        origin_id: Some(origin_id.clone()),
                    });
                }
                Ok(drafts)
            }
            TransactionRequest::Split {
                description,
                splits,
                is_pending,
                is_planning,
                ..
            } => {
                let origin_id = Self::mint_origin_id(date);
                let date_payed = simulate_payment_date(account, date, 0);
                let status = Self::status_for(*is_pending, *is_planning);
                Ok(splits
                    .iter()
                    .map(|split| TransactionDraft {
                        date_created: date,
                        date_payed,
                        description: description.clone(),
                        account: account.account_id.clone(),
                        amount: -split.amount.abs(),
                        category: split.category.clone(),
                        budget: split.budget.clone(),
                        status,
                        origin_id: Some(origin_id.clone()),
                    })
                    .collect())
            }
        }
    }

    /// Forecast rows for a subscription, one per month whose anchor date
    /// falls inside `[start, end]`. `seed_amounts` overrides the monthly
    /// amount (as a positive magnitude) for months that already carry
    /// committed expenses.
    pub fn build_recurrent(
        subscription: &Subscription,
        account: &Account,
        start: NaiveDate,
        end: NaiveDate,
        seed_amounts: &BTreeMap<Month, f64>,
    ) -> Vec<TransactionDraft> {
        let mut drafts = Vec::new();
        for month in Month::containing(start).through(Month::containing(end)) {
            let anchor = subscription.anchor_date_in(month);
            if anchor < start || anchor > end {
                continue;
            }
            let magnitude = seed_amounts
                .get(&month)
                .copied()
                .unwrap_or(subscription.monthly_amount);
            let amount = if subscription.is_income {
                magnitude.abs()
            } else {
                -magnitude.abs()
            };
            drafts.push(TransactionDraft {
                date_created: anchor,
                date_payed: simulate_payment_date(account, anchor, 0),
                description: subscription.name.clone(),
                account: account.account_id.clone(),
                amount,
                category: Some(subscription.category.clone()),
                budget: subscription
                    .is_budget
                    .then(|| subscription.id.clone()),
                status: TransactionStatus::Forecast,
                origin_id: Some(subscription.id.clone()),
            });
        }
        drafts
    }

    /// A single forecast allocation for `(budget, month)`, at the full
    /// monthly amount. Used when an expense lands in a month whose envelope
    /// does not exist yet; the recalculator corrects the amount right after.
    pub fn build_allocation(
        subscription: &Subscription,
        account: &Account,
        month: Month,
    ) -> TransactionDraft {
        let mut drafts = Self::build_recurrent(
            subscription,
            account,
            month.first_day(),
            month.last_day(),
            &BTreeMap::new(),
        );
        debug_assert_eq!(drafts.len(), 1);
        drafts.remove(0)
    }

    /// Inflow row returning an underspent envelope at month end.
    pub fn build_release(
        subscription: &Subscription,
        month: Month,
        amount: f64,
    ) -> TransactionDraft {
        let date = month.last_day();
        TransactionDraft {
            date_created: date,
            date_payed: date,
            description: format!("{} Budget Release {}", subscription.name, month),
            account: subscription.payment_account_id.clone(),
            amount: amount.abs(),
            category: Some("Budget Release".to_string()),
            budget: None,
            status: TransactionStatus::Committed,
            origin_id: None,
        }
    }

    /// Committed correction row used by balance and statement fixes.
    pub fn build_adjustment(
        account_id: &str,
        description: &str,
        date: NaiveDate,
        amount: f64,
    ) -> TransactionDraft {
        TransactionDraft {
            date_created: date,
            date_payed: date,
            description: description.to_string(),
            account: account_id.to_string(),
            amount,
            category: None,
            budget: None,
            status: TransactionStatus::Committed,
            origin_id: None,
        }
    }

    pub fn installment_label(description: &str, number: u32, plan_size: u32) -> String {
        format!("{} ({}/{})", description, number, plan_size)
    }

    /// Splits an installment label back into `(base, number, plan_size)`.
    pub fn parse_installment_label(description: &str) -> Option<(&str, u32, u32)> {
        let trimmed = description.strip_suffix(')')?;
        let (base, counter) = trimmed.rsplit_once(" (")?;
        let (number, plan_size) = counter.split_once('/')?;
        Some((base, number.parse().ok()?, plan_size.parse().ok()?))
    }
}
