//! Command structs for engine operations.
//!
//! These types group parameters for write operations (wallets, categories,
//! transactions, budgets), keeping call sites readable and avoiding long
//! argument lists.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{BudgetPeriod, CategoryKind, Currency, Money, TransactionKind, WalletKind};

/// Create a wallet owned by `user_id`.
#[derive(Clone, Debug)]
pub struct CreateWalletCmd {
    pub user_id: String,
    pub name: String,
    pub kind: WalletKind,
    pub currency: Currency,
    pub initial_balance: Money,
}

impl CreateWalletCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            kind: WalletKind::default(),
            currency: Currency::default(),
            initial_balance: Money::ZERO,
        }
    }

    #[must_use]
    pub fn kind(mut self, kind: WalletKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    #[must_use]
    pub fn initial_balance(mut self, initial_balance: Money) -> Self {
        self.initial_balance = initial_balance;
        self
    }
}

/// Rename and/or retype a wallet. The balance is edited through
/// `Engine::edit_wallet_balance` only.
#[derive(Clone, Debug, Default)]
pub struct UpdateWalletCmd {
    pub name: Option<String>,
    pub kind: Option<WalletKind>,
}

/// The user-editable fields of a transaction, used for both create and
/// update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionFields {
    pub kind: TransactionKind,
    pub wallet_id: Uuid,
    pub amount: Money,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub target_wallet_id: Option<Uuid>,
}

impl TransactionFields {
    #[must_use]
    pub fn new(kind: TransactionKind, wallet_id: Uuid, amount: Money, date: NaiveDate) -> Self {
        Self {
            kind,
            wallet_id,
            amount,
            date,
            description: None,
            category_id: None,
            target_wallet_id: None,
        }
    }

    #[must_use]
    pub fn income(wallet_id: Uuid, amount: Money, date: NaiveDate, category_id: Uuid) -> Self {
        Self::new(TransactionKind::Income, wallet_id, amount, date).category(category_id)
    }

    #[must_use]
    pub fn expense(wallet_id: Uuid, amount: Money, date: NaiveDate, category_id: Uuid) -> Self {
        Self::new(TransactionKind::Expense, wallet_id, amount, date).category(category_id)
    }

    #[must_use]
    pub fn transfer(from: Uuid, to: Uuid, amount: Money, date: NaiveDate) -> Self {
        Self::new(TransactionKind::Transfer, from, amount, date).target_wallet(to)
    }

    #[must_use]
    pub fn category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn target_wallet(mut self, wallet_id: Uuid) -> Self {
        self.target_wallet_id = Some(wallet_id);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Create a category. `global` categories have no owner and require an
/// admin.
#[derive(Clone, Debug)]
pub struct CreateCategoryCmd {
    pub user_id: String,
    pub name: String,
    pub kind: CategoryKind,
    pub icon: Option<String>,
    pub global: bool,
}

impl CreateCategoryCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, kind: CategoryKind) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            kind,
            icon: None,
            global: false,
        }
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }
}

/// Patch a category. `icon: Some(None)` clears the icon.
#[derive(Clone, Debug, Default)]
pub struct UpdateCategoryCmd {
    pub name: Option<String>,
    pub icon: Option<Option<String>>,
    pub kind: Option<CategoryKind>,
}

#[derive(Clone, Debug)]
pub struct CreateBudgetCmd {
    pub user_id: String,
    pub category_id: Uuid,
    pub limit: Money,
    pub period: BudgetPeriod,
}

impl CreateBudgetCmd {
    #[must_use]
    pub fn monthly(user_id: impl Into<String>, category_id: Uuid, limit: Money) -> Self {
        Self {
            user_id: user_id.into(),
            category_id,
            limit,
            period: BudgetPeriod::Monthly,
        }
    }

    #[must_use]
    pub fn period(mut self, period: BudgetPeriod) -> Self {
        self.period = period;
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct UpdateBudgetCmd {
    pub limit: Option<Money>,
    pub period: Option<BudgetPeriod>,
}
