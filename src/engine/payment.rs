//! Payment-date simulation: maps a purchase date to the day the money
//! actually leaves the account.

use chrono::{Datelike, NaiveDate};

use crate::dates::{shift_months, Month};
use crate::ledger::{Account, AccountKind};

/// Derives the cash-impact date for a purchase on `purchase_date`.
///
/// Cash settles on the (grace-shifted) purchase date. Credit cards settle on
/// the account's payment day of the billing cycle the purchase falls into:
///
/// * `payment_day > cut_off_day` (same-month cycle, e.g. cut 14 / pay 25):
///   purchases before the cut-off bill this month, on or after it next month.
/// * `payment_day <= cut_off_day` (next-month cycle, e.g. cut 30 / pay 15):
///   purchases through the cut-off pay next month, later ones the month
///   after.
///
/// Day overflow (a payment day of 31 billed into February) clamps to the last
/// valid day of the target month.
pub fn simulate_payment_date(
    account: &Account,
    purchase_date: NaiveDate,
    grace_months: u32,
) -> NaiveDate {
    let effective = shift_months(purchase_date, grace_months as i32);
    match account.kind {
        AccountKind::Cash => effective,
        AccountKind::CreditCard {
            cut_off_day,
            payment_day,
        } => {
            let billing_shift = if payment_day > cut_off_day {
                if effective.day() >= cut_off_day {
                    1
                } else {
                    0
                }
            } else if effective.day() > cut_off_day {
                2
            } else {
                1
            };
            Month::containing(shift_months(effective, billing_shift)).day_clamped(payment_day)
        }
    }
}
