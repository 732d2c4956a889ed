//! The module contains `Wallet` struct and its persistence model.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, Money};

/// What kind of container a wallet represents. Purely descriptive: every kind
/// follows the same balance rules and may go negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    #[default]
    Cash,
    Bank,
    Credit,
    Ewallet,
}

impl WalletKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Bank => "bank",
            Self::Credit => "credit",
            Self::Ewallet => "ewallet",
        }
    }
}

impl TryFrom<&str> for WalletKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "bank" => Ok(Self::Bank),
            "credit" => Ok(Self::Credit),
            "ewallet" | "e-wallet" => Ok(Self::Ewallet),
            other => Err(EngineError::Validation(format!(
                "invalid wallet type: {other}"
            ))),
        }
    }
}

/// A wallet.
///
/// A wallet is anything where money is kept: cash, a bank account, a credit
/// line or an e-wallet. `balance` is a stored projection of the ledger:
/// it always equals `initial_balance` plus the signed legs of every
/// transaction touching the wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: Uuid,
    pub owner: String,
    pub name: String,
    pub kind: WalletKind,
    pub currency: Currency,
    pub initial_balance: Money,
    pub balance: Money,
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(
        owner: String,
        name: String,
        kind: WalletKind,
        currency: Currency,
        initial_balance: Money,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            name,
            kind,
            currency,
            initial_balance,
            balance: initial_balance,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub kind: String,
    pub currency: String,
    pub initial_balance: i64,
    pub balance: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::legs::Entity")]
    Legs,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Username",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
}

impl Related<super::legs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Legs.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Wallet> for ActiveModel {
    fn from(value: &Wallet) -> Self {
        Self {
            id: ActiveValue::Set(value.id),
            user_id: ActiveValue::Set(value.owner.clone()),
            name: ActiveValue::Set(value.name.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            initial_balance: ActiveValue::Set(value.initial_balance.minor()),
            balance: ActiveValue::Set(value.balance.minor()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Wallet {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let currency = Currency::try_from(model.currency.as_str()).map_err(|_| {
            EngineError::Integrity(format!("invalid stored currency: {}", model.currency))
        })?;
        Ok(Self {
            id: model.id,
            kind: WalletKind::try_from(model.kind.as_str())?,
            owner: model.user_id,
            name: model.name,
            currency,
            initial_balance: Money::new(model.initial_balance),
            balance: Money::new(model.balance),
            created_at: model.created_at,
        })
    }
}
