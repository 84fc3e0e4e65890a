//! The cash-flow engine proper: payment-date simulation, transaction
//! construction, budget healing, forecast scheduling, and read-side
//! projections. Everything operates through the [`crate::storage::LedgerStore`]
//! trait; no module here touches I/O directly.

pub mod controller;
pub mod factory;
pub mod payment;
pub mod projection;
pub mod recalc;
pub mod scheduler;

pub use controller::{TransactionController, TransactionGroup};
pub use factory::TransactionFactory;
pub use payment::simulate_payment_date;
pub use projection::{BalanceRow, LedgerLine, MonthlyFigure, QueryProjector};
pub use recalc::BudgetRecalculator;
pub use scheduler::{ForecastScheduler, RolloverOutcome};
