//! The ledger's central row type and its lifecycle states.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type TransactionId = i64;

/// Half a cent; amounts closer than this are treated as equal.
pub const CENT_EPSILON: f64 = 0.005;

/// Rounds a monetary amount to two decimals.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Committed,
    Pending,
    Forecast,
    Planning,
}

impl TransactionStatus {
    /// Only `Pending` rows stay out of the running balance.
    pub fn contributes_to_balance(self) -> bool {
        self != TransactionStatus::Pending
    }

    /// Rank used when folding a group into one row: the strongest status wins.
    pub fn strength(self) -> u8 {
        match self {
            TransactionStatus::Committed => 3,
            TransactionStatus::Pending => 2,
            TransactionStatus::Planning => 1,
            TransactionStatus::Forecast => 0,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionStatus::Committed => "committed",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Forecast => "forecast",
            TransactionStatus::Planning => "planning",
        };
        f.write_str(label)
    }
}

/// A dated monetary movement. Negative amounts are outflows, positive are
/// inflows. `date_created` is the purchase date; `date_payed` the derived
/// cash-impact date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub date_created: NaiveDate,
    pub date_payed: NaiveDate,
    pub description: String,
    pub account: String,
    pub amount: f64,
    #[serde(default)]
    pub category: Option<String>,
    /// Links the row to a budget subscription id.
    #[serde(default)]
    pub budget: Option<String>,
    pub status: TransactionStatus,
    /// Shared by siblings of a group, or names the source subscription.
    #[serde(default)]
    pub origin_id: Option<String>,
}

/// A transaction that has not been persisted yet; the store assigns the id.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    pub date_created: NaiveDate,
    pub date_payed: NaiveDate,
    pub description: String,
    pub account: String,
    pub amount: f64,
    pub category: Option<String>,
    pub budget: Option<String>,
    pub status: TransactionStatus,
    pub origin_id: Option<String>,
}

impl TransactionDraft {
    pub fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            date_created: self.date_created,
            date_payed: self.date_payed,
            description: self.description,
            account: self.account,
            amount: self.amount,
            category: self.category,
            budget: self.budget,
            status: self.status,
            origin_id: self.origin_id,
        }
    }
}

/// Field-level partial update. `category` and `budget` nest an `Option` so a
/// patch can clear them.
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<Option<String>>,
    pub budget: Option<Option<String>>,
    pub status: Option<TransactionStatus>,
}

impl TransactionUpdate {
    pub fn amount(amount: f64) -> TransactionUpdate {
        TransactionUpdate {
            amount: Some(amount),
            ..TransactionUpdate::default()
        }
    }

    pub fn status(status: TransactionStatus) -> TransactionUpdate {
        TransactionUpdate {
            status: Some(status),
            ..TransactionUpdate::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.amount.is_none()
            && self.category.is_none()
            && self.budget.is_none()
            && self.status.is_none()
    }

    pub fn apply(&self, transaction: &mut Transaction) {
        if let Some(description) = &self.description {
            transaction.description = description.clone();
        }
        if let Some(amount) = self.amount {
            transaction.amount = amount;
        }
        if let Some(category) = &self.category {
            transaction.category = category.clone();
        }
        if let Some(budget) = &self.budget {
            transaction.budget = budget.clone();
        }
        if let Some(status) = self.status {
            transaction.status = status;
        }
    }
}

/// The inferred shape of a transaction group (rows sharing an `origin_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Simple,
    /// Recurrences generated from a subscription; immutable by conversion.
    Subscription,
    Split,
    Installment,
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GroupKind::Simple => "simple",
            GroupKind::Subscription => "subscription",
            GroupKind::Split => "split",
            GroupKind::Installment => "installment",
        };
        f.write_str(label)
    }
}

/// Classifies a sibling set. `origin_is_subscription` is whether the shared
/// `origin_id` resolves to a subscription row.
pub fn classify_group(siblings: &[Transaction], origin_is_subscription: bool) -> GroupKind {
    if origin_is_subscription {
        return GroupKind::Subscription;
    }
    if siblings.iter().all(|t| t.origin_id.is_none()) {
        return GroupKind::Simple;
    }
    let mut dates: Vec<NaiveDate> = siblings.iter().map(|t| t.date_payed).collect();
    dates.sort();
    dates.dedup();
    if dates.len() >= 2 {
        GroupKind::Installment
    } else {
        GroupKind::Split
    }
}
