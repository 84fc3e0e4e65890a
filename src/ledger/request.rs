//! Typed request surface accepted by the controller. Natural-language or CSV
//! parsing happens outside the core; drivers hand the engine these values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::ledger::subscription::{Subscription, UnderspendBehavior};

fn default_start_from() -> u32 {
    1
}

/// One element of a split purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitItem {
    pub amount: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub budget: Option<String>,
}

/// A mutation request for the ledger. The transaction date is carried
/// separately by the caller (defaulting to "today" at the driver level).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionRequest {
    Simple {
        description: String,
        amount: f64,
        account: String,
        #[serde(default)]
        category: Option<String>,
        #[serde(default)]
        budget: Option<String>,
        #[serde(default)]
        is_income: bool,
        #[serde(default)]
        is_pending: bool,
        #[serde(default)]
        is_planning: bool,
        #[serde(default)]
        grace_period_months: u32,
    },
    Installment {
        description: String,
        total_amount: f64,
        installments: u32,
        account: String,
        #[serde(default)]
        category: Option<String>,
        #[serde(default)]
        budget: Option<String>,
        /// First installment number carried by this request, for resuming a
        /// plan that already ran partway (default 1).
        #[serde(default = "default_start_from")]
        start_from_installment: u32,
        /// Size of the whole plan; defaults to `installments`.
        #[serde(default)]
        total_installments: Option<u32>,
        #[serde(default)]
        grace_period_months: u32,
        #[serde(default)]
        is_pending: bool,
        #[serde(default)]
        is_planning: bool,
    },
    Split {
        description: String,
        account: String,
        splits: Vec<SplitItem>,
        #[serde(default)]
        is_pending: bool,
        #[serde(default)]
        is_planning: bool,
    },
}

impl TransactionRequest {
    pub fn simple(
        description: impl Into<String>,
        amount: f64,
        account: impl Into<String>,
    ) -> TransactionRequest {
        TransactionRequest::Simple {
            description: description.into(),
            amount,
            account: account.into(),
            category: None,
            budget: None,
            is_income: false,
            is_pending: false,
            is_planning: false,
            grace_period_months: 0,
        }
    }

    pub fn installment(
        description: impl Into<String>,
        total_amount: f64,
        installments: u32,
        account: impl Into<String>,
    ) -> TransactionRequest {
        TransactionRequest::Installment {
            description: description.into(),
            total_amount,
            installments,
            account: account.into(),
            category: None,
            budget: None,
            start_from_installment: 1,
            total_installments: None,
            grace_period_months: 0,
            is_pending: false,
            is_planning: false,
        }
    }

    pub fn split(
        description: impl Into<String>,
        account: impl Into<String>,
        splits: Vec<SplitItem>,
    ) -> TransactionRequest {
        TransactionRequest::Split {
            description: description.into(),
            account: account.into(),
            splits,
            is_pending: false,
            is_planning: false,
        }
    }

    pub fn with_category(mut self, name: impl Into<String>) -> TransactionRequest {
        match &mut self {
            TransactionRequest::Simple { category, .. }
            | TransactionRequest::Installment { category, .. } => *category = Some(name.into()),
            TransactionRequest::Split { .. } => {}
        }
        self
    }

    pub fn with_budget(mut self, budget_id: impl Into<String>) -> TransactionRequest {
        match &mut self {
            TransactionRequest::Simple { budget, .. }
            | TransactionRequest::Installment { budget, .. } => *budget = Some(budget_id.into()),
            TransactionRequest::Split { .. } => {}
        }
        self
    }

    pub fn with_grace(mut self, months: u32) -> TransactionRequest {
        match &mut self {
            TransactionRequest::Simple {
                grace_period_months,
                ..
            }
            | TransactionRequest::Installment {
                grace_period_months,
                ..
            } => *grace_period_months = months,
            TransactionRequest::Split { .. } => {}
        }
        self
    }

    pub fn income(mut self) -> TransactionRequest {
        if let TransactionRequest::Simple { is_income, .. } = &mut self {
            *is_income = true;
        }
        self
    }

    pub fn pending(mut self) -> TransactionRequest {
        match &mut self {
            TransactionRequest::Simple { is_pending, .. }
            | TransactionRequest::Installment { is_pending, .. }
            | TransactionRequest::Split { is_pending, .. } => *is_pending = true,
        }
        self
    }

    pub fn planning(mut self) -> TransactionRequest {
        match &mut self {
            TransactionRequest::Simple { is_planning, .. }
            | TransactionRequest::Installment { is_planning, .. }
            | TransactionRequest::Split { is_planning, .. } => *is_planning = true,
        }
        self
    }

    /// Resuming installment plans: continue from installment `start_from` of
    /// a `total` plan.
    pub fn resuming(mut self, start_from: u32, total: u32) -> TransactionRequest {
        if let TransactionRequest::Installment {
            start_from_installment,
            total_installments,
            ..
        } = &mut self
        {
            *start_from_installment = start_from;
            *total_installments = Some(total);
        }
        self
    }

    pub fn account_id(&self) -> &str {
        match self {
            TransactionRequest::Simple { account, .. }
            | TransactionRequest::Installment { account, .. }
            | TransactionRequest::Split { account, .. } => account,
        }
    }

    /// Budget ids the request links expenses to.
    pub fn budget_ids(&self) -> Vec<&str> {
        match self {
            TransactionRequest::Simple { budget, .. }
            | TransactionRequest::Installment { budget, .. } => {
                budget.iter().map(String::as_str).collect()
            }
            TransactionRequest::Split { splits, .. } => splits
                .iter()
                .filter_map(|split| split.budget.as_deref())
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        match self {
            TransactionRequest::Simple { amount, .. } => {
                if *amount == 0.0 {
                    return Err(EngineError::InvalidRequest(
                        "transaction amount must be non-zero".into(),
                    ));
                }
            }
            TransactionRequest::Installment {
                total_amount,
                installments,
                start_from_installment,
                total_installments,
                ..
            } => {
                if *installments < 1 {
                    return Err(EngineError::InvalidRequest(
                        "installments must be at least 1".into(),
                    ));
                }
                if *total_amount == 0.0 {
                    return Err(EngineError::InvalidRequest(
                        "total_amount must be non-zero".into(),
                    ));
                }
                if *start_from_installment < 1 {
                    return Err(EngineError::InvalidRequest(
                        "start_from_installment must be at least 1".into(),
                    ));
                }
                if let Some(total) = total_installments {
                    if *total < 1 {
                        return Err(EngineError::InvalidRequest(
                            "total_installments must be at least 1".into(),
                        ));
                    }
                }
            }
            TransactionRequest::Split { splits, .. } => {
                if splits.is_empty() {
                    return Err(EngineError::InvalidRequest(
                        "split request needs at least one element".into(),
                    ));
                }
                if splits.iter().any(|split| split.amount == 0.0) {
                    return Err(EngineError::InvalidRequest(
                        "split amounts must be non-zero".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Request for creating a subscription or budget envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub id: String,
    pub name: String,
    pub category: String,
    pub monthly_amount: f64,
    pub payment_account_id: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_budget: bool,
    #[serde(default)]
    pub is_income: bool,
    #[serde(default)]
    pub underspend_behavior: UnderspendBehavior,
}

impl SubscriptionRequest {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.id.trim().is_empty() {
            return Err(EngineError::InvalidRequest(
                "subscription id must not be empty".into(),
            ));
        }
        if self.monthly_amount <= 0.0 {
            return Err(EngineError::InvalidRequest(
                "monthly_amount must be positive".into(),
            ));
        }
        if self.is_budget && self.is_income {
            return Err(EngineError::InvalidRequest(
                "a subscription cannot be both a budget and an income".into(),
            ));
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(EngineError::InvalidRequest(format!(
                    "end_date {} precedes start_date {}",
                    end, self.start_date
                )));
            }
        }
        Ok(())
    }

    pub fn into_subscription(self) -> Subscription {
        Subscription {
            id: self.id,
            name: self.name,
            category: self.category,
            monthly_amount: self.monthly_amount,
            payment_account_id: self.payment_account_id,
            start_date: self.start_date,
            end_date: self.end_date,
            is_budget: self.is_budget,
            is_income: self.is_income,
            underspend_behavior: self.underspend_behavior,
        }
    }
}
