//! Transaction Service: create, update and delete transactions, keeping every
//! affected wallet balance equal to its initial balance plus its legs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Transaction, TransactionKind, Wallet};

mod list;
mod validate;
mod write;

pub use list::TransactionPage;

/// A committed write and the post-operation state of every wallet it touched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutcome {
    pub transaction: Transaction,
    /// Ordered by wallet id. For updates: old and new wallets together.
    pub wallets: Vec<Wallet>,
}

/// Whose transactions a listing covers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ListScope {
    /// The requesting user's own transactions.
    #[default]
    Own,
    /// Another user's transactions (admin only).
    User(String),
    /// Every user's transactions (admin only).
    All,
}

/// Filters for listing transactions.
///
/// `from` and `to` are both inclusive. `wallet_id` matches the source or the
/// target wallet.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub scope: ListScope,
    pub wallet_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Page size, defaults to 50 and is capped at 500.
    pub limit: Option<u64>,
    /// Opaque position returned as `next_cursor` by the previous page.
    pub cursor: Option<String>,
}
