use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// Distinguishes plain cash accounts from credit cards with a billing cycle.
///
/// Carrying the cycle days inside the variant makes the invariant structural:
/// a cash account cannot have cycle days, and a credit card cannot lack them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "account_type", rename_all = "snake_case")]
pub enum AccountKind {
    Cash,
    CreditCard { cut_off_day: u32, payment_day: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    #[serde(flatten)]
    pub kind: AccountKind,
}

impl Account {
    pub fn cash(account_id: impl Into<String>) -> Account {
        Account {
            account_id: account_id.into(),
            kind: AccountKind::Cash,
        }
    }

    /// Builds a credit-card account, validating both cycle days.
    pub fn credit_card(
        account_id: impl Into<String>,
        cut_off_day: u32,
        payment_day: u32,
    ) -> Result<Account, EngineError> {
        for (label, day) in [("cut_off_day", cut_off_day), ("payment_day", payment_day)] {
            if !(1..=31).contains(&day) {
                return Err(EngineError::InvalidRequest(format!(
                    "{} must be in 1..=31, got {}",
                    label, day
                )));
            }
        }
        Ok(Account {
            account_id: account_id.into(),
            kind: AccountKind::CreditCard {
                cut_off_day,
                payment_day,
            },
        })
    }

    pub fn is_credit_card(&self) -> bool {
        matches!(self.kind, AccountKind::CreditCard { .. })
    }
}
