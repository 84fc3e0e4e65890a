use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::dates::Month;

/// What happens to the unspent part of a budget envelope at month end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnderspendBehavior {
    /// Leave the allocation as-is; leftover stays absorbed in the ledger.
    #[default]
    Keep,
    /// Issue an inflow transaction for the leftover and zero the allocation.
    Return,
}

impl fmt::Display for UnderspendBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UnderspendBehavior::Keep => "keep",
            UnderspendBehavior::Return => "return",
        };
        f.write_str(label)
    }
}

/// A recurring monthly obligation. With `is_budget` it acts as a monthly
/// spending envelope whose allocation row the engine continuously rederives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub name: String,
    pub category: String,
    pub monthly_amount: f64,
    pub payment_account_id: String,
    /// Inclusive; its day-of-month anchors every generated recurrence.
    pub start_date: NaiveDate,
    /// Inclusive end of the subscription, `None` for ongoing.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_budget: bool,
    #[serde(default)]
    pub is_income: bool,
    #[serde(default)]
    pub underspend_behavior: UnderspendBehavior,
}

impl Subscription {
    /// Whether the subscription overlaps the `[window_start, window_end]` range.
    pub fn is_active_in(&self, window_start: NaiveDate, window_end: NaiveDate) -> bool {
        self.start_date <= window_end
            && self.end_date.map(|end| end >= window_start).unwrap_or(true)
    }

    /// The recurrence date inside `month`: the start date's day, clamped to
    /// the month end when the day overflows.
    pub fn anchor_date_in(&self, month: Month) -> NaiveDate {
        month.day_clamped(self.start_date.day())
    }
}

/// Partial update applied to a stored subscription. `end_date` uses a nested
/// `Option` so the field can be cleared back to ongoing.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpdate {
    pub name: Option<String>,
    pub monthly_amount: Option<f64>,
    pub payment_account_id: Option<String>,
    pub end_date: Option<Option<NaiveDate>>,
    pub underspend_behavior: Option<UnderspendBehavior>,
}

impl SubscriptionUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.monthly_amount.is_none()
            && self.payment_account_id.is_none()
            && self.end_date.is_none()
            && self.underspend_behavior.is_none()
    }

    pub fn apply(&self, subscription: &mut Subscription) {
        if let Some(name) = &self.name {
            subscription.name = name.clone();
        }
        if let Some(amount) = self.monthly_amount {
            subscription.monthly_amount = amount;
        }
        if let Some(account) = &self.payment_account_id {
            subscription.payment_account_id = account.clone();
        }
        if let Some(end_date) = self.end_date {
            subscription.end_date = end_date;
        }
        if let Some(behavior) = self.underspend_behavior {
            subscription.underspend_behavior = behavior;
        }
    }
}
