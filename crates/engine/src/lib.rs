//! Gruzzolo reconciliation engine.
//!
//! The engine owns the ledger semantics: computing balances from completed
//! transactions, admitting new transactions as `pending`/`completed`,
//! propagating completed expenses into matching budgets and completed
//! income into linked goals, and the periodic batch jobs (regeneration,
//! retry, activation, rollover, deadline reminders) the scheduler drives.
//!
//! Persistence is sea-orm over sqlite; outbound collaborators (currency
//! rates, notifications) are trait objects supplied at build time.

pub use budgets::{Budget, BudgetPeriod};
pub use currency::Currency;
pub use error::EngineError;
pub use goals::Goal;
pub use money::MoneyCents;
pub use outbound::{DeliveryError, LogNotifier, NoRates, Notifier, RateError, RateSource};
pub use transactions::{RecurringFrequency, Transaction, TransactionKind, TransactionStatus};
pub use users::UserRole;

pub use ops::{
    BalanceSummary, Engine, EngineBuilder, NewBudgetCmd, NewGoalCmd, NewTransactionCmd,
    RecurringCmd, TransactionListFilter, TransactionPatch, UpdateBudgetCmd, UpdateGoalCmd,
    admission::{Admission, admit},
    budgets::budget_matches,
};

pub mod budgets;
pub mod categories;
mod currency;
mod error;
pub mod goal_contributions;
pub mod goals;
mod money;
mod ops;
mod outbound;
pub mod transactions;
pub mod users;

pub type ResultEngine<T> = Result<T, EngineError>;
