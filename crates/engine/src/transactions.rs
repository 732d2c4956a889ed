//! Transaction primitives.
//!
//! A `Transaction` is an atomic ledger event. Its direction is encoded by
//! `kind`, never by the sign of `amount`, which is always positive. The
//! signed effect on wallets lives in its [`Leg`](crate::Leg)s.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CategoryKind, EngineError, Money, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }

    /// The category type an income/expense transaction must reference.
    /// Transfers carry no category.
    pub fn category_kind(self) -> Option<CategoryKind> {
        match self {
            Self::Income => Some(CategoryKind::Income),
            Self::Expense => Some(CategoryKind::Expense),
            Self::Transfer => None,
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            other => Err(EngineError::Validation(format!(
                "invalid transaction type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    pub wallet_id: Uuid,
    /// Destination wallet, set only for transfers.
    pub target_wallet_id: Option<Uuid>,
    /// Set only for income/expense.
    pub category_id: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount: Money,
    pub transaction_date: NaiveDate,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: String,
        wallet_id: Uuid,
        target_wallet_id: Option<Uuid>,
        category_id: Option<Uuid>,
        kind: TransactionKind,
        amount: Money,
        transaction_date: NaiveDate,
        description: Option<String>,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::Validation(
                "amount must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            wallet_id,
            target_wallet_id,
            category_id,
            kind,
            amount,
            transaction_date,
            description,
            created_at: Utc::now(),
        })
    }

    /// Wallets whose balance this transaction changes, source first.
    pub fn wallet_ids(&self) -> Vec<Uuid> {
        let mut ids = vec![self.wallet_id];
        ids.extend(self.target_wallet_id);
        ids
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub wallet_id: Uuid,
    pub target_wallet_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub kind: String,
    pub amount_minor: i64,
    pub transaction_date: Date,
    pub description: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::legs::Entity")]
    Legs,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Categories,
}

impl Related<super::legs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Legs.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id),
            user_id: ActiveValue::Set(tx.user_id.clone()),
            wallet_id: ActiveValue::Set(tx.wallet_id),
            target_wallet_id: ActiveValue::Set(tx.target_wallet_id),
            category_id: ActiveValue::Set(tx.category_id),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount.minor()),
            transaction_date: ActiveValue::Set(tx.transaction_date),
            description: ActiveValue::Set(tx.description.clone()),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            user_id: model.user_id,
            wallet_id: model.wallet_id,
            target_wallet_id: model.target_wallet_id,
            category_id: model.category_id,
            amount: Money::new(model.amount_minor),
            transaction_date: model.transaction_date,
            description: model.description,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 1).unwrap()
    }

    #[test]
    fn rejects_non_positive_amounts() {
        for amount in [Money::ZERO, Money::new(-1)] {
            let result = Transaction::new(
                "alice".to_string(),
                Uuid::new_v4(),
                None,
                Some(Uuid::new_v4()),
                TransactionKind::Expense,
                amount,
                date(),
                None,
            );
            assert!(matches!(result, Err(EngineError::Validation(_))));
        }
    }

    #[test]
    fn transfer_touches_both_wallets() {
        let from = Uuid::new_v4();
        let to = Uuid::new_v4();
        let tx = Transaction::new(
            "alice".to_string(),
            from,
            Some(to),
            None,
            TransactionKind::Transfer,
            Money::major(10),
            date(),
            None,
        )
        .unwrap();
        assert_eq!(tx.wallet_ids(), vec![from, to]);
    }

    #[test]
    fn kinds_map_to_category_kinds() {
        assert_eq!(
            TransactionKind::Expense.category_kind(),
            Some(CategoryKind::Expense)
        );
        assert_eq!(TransactionKind::Transfer.category_kind(), None);
        assert_eq!(
            TransactionKind::try_from("TRANSFER").unwrap(),
            TransactionKind::Transfer
        );
    }
}
