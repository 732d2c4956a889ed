//! Transaction legs.
//!
//! A [`Leg`] is a single signed balance change applied to one wallet as part
//! of a [`Transaction`]:
//! - positive values increase the wallet balance
//! - negative values decrease the wallet balance
//!
//! In the engine, *every* transaction-driven change to a balance happens via
//! legs, and a wallet's balance always equals its initial balance plus the
//! sum of its legs.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Money, Transaction, TransactionKind};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub wallet_id: Uuid,
    pub amount: Money,
}

impl Leg {
    pub fn new(transaction_id: Uuid, wallet_id: Uuid, amount: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_id,
            wallet_id,
            amount,
        }
    }
}

/// Translates a transaction into its signed wallet deltas.
///
/// - income: `+amount` on the wallet
/// - expense: `-amount` on the wallet
/// - transfer: `-amount` on the source, `+amount` on the target
///
/// A transfer without target yields only the source leg; callers validate
/// the transaction shape before getting here.
pub fn legs_for(tx: &Transaction) -> Vec<Leg> {
    match tx.kind {
        TransactionKind::Income => vec![Leg::new(tx.id, tx.wallet_id, tx.amount)],
        TransactionKind::Expense => vec![Leg::new(tx.id, tx.wallet_id, -tx.amount)],
        TransactionKind::Transfer => {
            let mut legs = vec![Leg::new(tx.id, tx.wallet_id, -tx.amount)];
            if let Some(target) = tx.target_wallet_id {
                legs.push(Leg::new(tx.id, target, tx.amount));
            }
            legs
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "legs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub wallet_id: Uuid,
    pub amount_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Transactions,
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::WalletId",
        to = "super::wallets::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Wallets,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Leg> for ActiveModel {
    fn from(leg: &Leg) -> Self {
        Self {
            id: ActiveValue::Set(leg.id),
            transaction_id: ActiveValue::Set(leg.transaction_id),
            wallet_id: ActiveValue::Set(leg.wallet_id),
            amount_minor: ActiveValue::Set(leg.amount.minor()),
        }
    }
}

impl From<Model> for Leg {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            transaction_id: model.transaction_id,
            wallet_id: model.wallet_id,
            amount: Money::new(model.amount_minor),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn tx(kind: TransactionKind, target: Option<Uuid>) -> Transaction {
        Transaction::new(
            "alice".to_string(),
            Uuid::new_v4(),
            target,
            None,
            kind,
            Money::major(20_000),
            NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn income_credits_the_wallet() {
        let tx = tx(TransactionKind::Income, None);
        let legs = legs_for(&tx);
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].wallet_id, tx.wallet_id);
        assert_eq!(legs[0].amount, Money::major(20_000));
    }

    #[test]
    fn expense_debits_the_wallet() {
        let tx = tx(TransactionKind::Expense, None);
        let legs = legs_for(&tx);
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].amount, Money::major(-20_000));
    }

    #[test]
    fn transfer_moves_money_between_wallets() {
        let target = Uuid::new_v4();
        let tx = tx(TransactionKind::Transfer, Some(target));
        let legs = legs_for(&tx);
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].wallet_id, tx.wallet_id);
        assert_eq!(legs[0].amount, Money::major(-20_000));
        assert_eq!(legs[1].wallet_id, target);
        assert_eq!(legs[1].amount, Money::major(20_000));
        assert_eq!(legs.iter().map(|leg| leg.amount).sum::<Money>(), Money::ZERO);
        assert!(legs.iter().all(|leg| leg.transaction_id == tx.id));
    }
}
