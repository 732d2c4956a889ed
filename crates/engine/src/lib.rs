//! Ledger consistency core for a personal finance tracker.
//!
//! Wallets hold a stored balance that is a projection of the ledger: the
//! initial balance plus the signed legs of every transaction touching the
//! wallet. All writes go through [`Engine`], which applies, reverses and
//! re-applies those legs atomically.

pub use budgets::{Budget, BudgetStatus, Percent};
pub use categories::{Category, CategoryKind};
pub use commands::{
    CreateBudgetCmd, CreateCategoryCmd, CreateWalletCmd, TransactionFields, UpdateBudgetCmd,
    UpdateCategoryCmd, UpdateWalletCmd,
};
pub use currency::Currency;
pub use error::EngineError;
pub use legs::{Leg, legs_for};
pub use money::Money;
pub use ops::{
    BalanceAudit, BalanceEdit, CurrencyTotal, Engine, EngineBuilder, FlowTotals, ListScope,
    MonthTotals, Summary, TransactionListFilter, TransactionOutcome, TransactionPage,
};
pub use period::{BudgetPeriod, PeriodWindow};
pub use transactions::{Transaction, TransactionKind};
pub use users::{Role, User};
pub use util::parse_date;
pub use wallets::{Wallet, WalletKind};

mod budgets;
mod categories;
mod commands;
mod currency;
mod error;
mod legs;
mod money;
mod ops;
mod period;
mod transactions;
mod users;
mod util;
mod wallets;

pub type ResultEngine<T> = Result<T, EngineError>;
