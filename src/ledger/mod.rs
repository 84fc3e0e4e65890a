//! Pure domain types: accounts, categories, subscriptions, transactions, and
//! the typed request surface. No I/O and no storage concerns.

pub mod account;
pub mod category;
pub mod request;
pub mod subscription;
pub mod transaction;

pub use account::{Account, AccountKind};
pub use category::Category;
pub use request::{SplitItem, SubscriptionRequest, TransactionRequest};
pub use subscription::{Subscription, SubscriptionUpdate, UnderspendBehavior};
pub use transaction::{
    classify_group, round_cents, GroupKind, Transaction, TransactionDraft, TransactionId,
    TransactionStatus, TransactionUpdate, CENT_EPSILON,
};
