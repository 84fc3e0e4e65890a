//! cashflow_core
//!
//! A personal cash-flow engine: a ledger of dated monetary movements across
//! cash and credit-card accounts, projected forward through subscriptions,
//! budget envelopes, and installment plans. Drivers (CLIs, bots, test
//! harnesses) talk to the engine through typed requests and a storage trait;
//! presentation and natural-language parsing live outside this crate.

pub mod dates;
pub mod engine;
pub mod errors;
pub mod interchange;
pub mod ledger;
pub mod storage;

pub use dates::Month;
pub use engine::{
    BalanceRow, BudgetRecalculator, ForecastScheduler, LedgerLine, MonthlyFigure, QueryProjector,
    RolloverOutcome, TransactionController, TransactionFactory, TransactionGroup,
};
pub use errors::EngineError;
pub use ledger::{
    Account, AccountKind, Category, GroupKind, SplitItem, Subscription, SubscriptionRequest,
    SubscriptionUpdate, Transaction, TransactionDraft, TransactionId, TransactionRequest,
    TransactionStatus, TransactionUpdate, UnderspendBehavior,
};
pub use storage::{JsonStore, LedgerStore, MemoryStore};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes the global tracing subscriber with sensible defaults.
/// Safe to call more than once.
pub fn init() {
    INIT_TRACING.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::from_default_env().add_directive("cashflow_core=info".parse().unwrap());
        fmt().with_env_filter(filter).init();
    });
}
