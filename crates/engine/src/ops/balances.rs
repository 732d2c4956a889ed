//! Balance Engine: the only code that moves a stored wallet balance in
//! response to a transaction.
//!
//! Deltas are applied in SQL as `balance = balance + delta`, so two writers
//! never overwrite each other with a stale read. Within one DB transaction
//! legs are applied in ascending wallet id order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::{EngineError, Leg, Money, ResultEngine, Wallet, legs, wallets};

use super::{Engine, with_tx};

/// Stored vs. recomputed balance of one wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAudit {
    pub wallet_id: Uuid,
    pub wallet_name: String,
    pub stored: Money,
    /// `initial_balance + Σ legs`.
    pub expected: Money,
    /// `stored - expected`.
    pub drift: Money,
}

impl BalanceAudit {
    pub fn is_consistent(&self) -> bool {
        self.drift.is_zero()
    }
}

impl Engine {
    /// Adds `delta` to the stored balance of `wallet_id` and returns the new
    /// balance.
    pub(super) async fn apply_delta(
        &self,
        db: &DatabaseTransaction,
        wallet_id: Uuid,
        delta: Money,
    ) -> ResultEngine<Money> {
        let current = wallets::Entity::find_by_id(wallet_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("wallet not exists".to_string()))?;
        Money::new(current.balance)
            .checked_add(delta)
            .ok_or_else(|| EngineError::Integrity("wallet balance overflow".to_string()))?;

        let result = wallets::Entity::update_many()
            .col_expr(
                wallets::Column::Balance,
                Expr::col(wallets::Column::Balance).add(delta.minor()),
            )
            .filter(wallets::Column::Id.eq(wallet_id))
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::NotFound("wallet not exists".to_string()));
        }

        let updated = wallets::Entity::find_by_id(wallet_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("wallet not exists".to_string()))?;
        Ok(Money::new(updated.balance))
    }

    /// Applies the opposite of `delta`.
    pub(super) async fn reverse(
        &self,
        db: &DatabaseTransaction,
        wallet_id: Uuid,
        delta: Money,
    ) -> ResultEngine<Money> {
        let opposite = delta
            .checked_neg()
            .ok_or_else(|| EngineError::Integrity("wallet balance overflow".to_string()))?;
        self.apply_delta(db, wallet_id, opposite).await
    }

    /// Applies every leg to its wallet and records it.
    pub(super) async fn apply_legs(
        &self,
        db: &DatabaseTransaction,
        legs: &[Leg],
    ) -> ResultEngine<()> {
        let mut ordered: Vec<&Leg> = legs.iter().collect();
        ordered.sort_by_key(|leg| leg.wallet_id);
        for leg in ordered {
            self.apply_delta(db, leg.wallet_id, leg.amount).await?;
            legs::ActiveModel::from(leg).insert(db).await?;
        }
        Ok(())
    }

    /// Records legs whose effect is already part of the stored balance.
    pub(super) async fn insert_leg_rows(
        &self,
        db: &DatabaseTransaction,
        legs: &[Leg],
    ) -> ResultEngine<()> {
        for leg in legs {
            legs::ActiveModel::from(leg).insert(db).await?;
        }
        Ok(())
    }

    /// Reverses and removes every leg of a transaction. Returns the wallets
    /// that were touched.
    pub(super) async fn reverse_legs(
        &self,
        db: &DatabaseTransaction,
        transaction_id: Uuid,
    ) -> ResultEngine<Vec<Uuid>> {
        let leg_models = legs::Entity::find()
            .filter(legs::Column::TransactionId.eq(transaction_id))
            .order_by_asc(legs::Column::WalletId)
            .all(db)
            .await?;

        let mut wallet_ids = Vec::with_capacity(leg_models.len());
        for model in leg_models {
            let leg = Leg::from(model);
            self.reverse(db, leg.wallet_id, leg.amount).await?;
            wallet_ids.push(leg.wallet_id);
        }

        legs::Entity::delete_many()
            .filter(legs::Column::TransactionId.eq(transaction_id))
            .exec(db)
            .await?;
        Ok(wallet_ids)
    }

    /// Current state of the given wallets, ordered by id.
    pub(super) async fn wallet_snapshots(
        &self,
        db: &DatabaseTransaction,
        wallet_ids: &[Uuid],
    ) -> ResultEngine<Vec<Wallet>> {
        let mut ids = wallet_ids.to_vec();
        ids.sort();
        ids.dedup();
        let models = wallets::Entity::find()
            .filter(wallets::Column::Id.is_in(ids))
            .order_by_asc(wallets::Column::Id)
            .all(db)
            .await?;
        models.into_iter().map(Wallet::try_from).collect()
    }

    async fn compute_audit(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<Vec<BalanceAudit>> {
        let wallet_models = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .order_by_asc(wallets::Column::Name)
            .all(db)
            .await?;
        let wallet_ids: Vec<Uuid> = wallet_models.iter().map(|w| w.id).collect();

        let leg_models = legs::Entity::find()
            .filter(legs::Column::WalletId.is_in(wallet_ids))
            .all(db)
            .await?;
        let mut sums: HashMap<Uuid, Money> = HashMap::new();
        for leg in leg_models {
            let total = sums.entry(leg.wallet_id).or_insert(Money::ZERO);
            *total = total
                .checked_add(Money::new(leg.amount_minor))
                .ok_or_else(|| EngineError::Integrity("ledger sum overflow".to_string()))?;
        }

        wallet_models
            .into_iter()
            .map(|model| {
                let stored = Money::new(model.balance);
                let expected = Money::new(model.initial_balance)
                    .checked_add(sums.get(&model.id).copied().unwrap_or(Money::ZERO))
                    .ok_or_else(|| EngineError::Integrity("ledger sum overflow".to_string()))?;
                Ok(BalanceAudit {
                    wallet_id: model.id,
                    wallet_name: model.name,
                    stored,
                    expected,
                    drift: stored - expected,
                })
            })
            .collect()
    }

    /// Compares every stored wallet balance of `user_id` with the balance
    /// recomputed from the ledger.
    pub async fn audit_balances(&self, user_id: &str) -> ResultEngine<Vec<BalanceAudit>> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let audits = self.compute_audit(&db_tx, user_id).await?;
            for audit in audits.iter().filter(|a| !a.is_consistent()) {
                tracing::warn!(
                    wallet_id = %audit.wallet_id,
                    stored = %audit.stored,
                    expected = %audit.expected,
                    "wallet balance drift detected"
                );
            }
            Ok(audits)
        })
    }

    /// Rewrites drifted balances from the ledger. Returns the wallets that
    /// were corrected, with the drift they had.
    pub async fn repair_balances(&self, user_id: &str) -> ResultEngine<Vec<BalanceAudit>> {
        self.with_retry("repair_balances", || self.try_repair_balances(user_id))
            .await
    }

    async fn try_repair_balances(&self, user_id: &str) -> ResultEngine<Vec<BalanceAudit>> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let drifted: Vec<BalanceAudit> = self
                .compute_audit(&db_tx, user_id)
                .await?
                .into_iter()
                .filter(|a| !a.is_consistent())
                .collect();

            for audit in &drifted {
                let wallet = wallets::ActiveModel {
                    id: ActiveValue::Set(audit.wallet_id),
                    balance: ActiveValue::Set(audit.expected.minor()),
                    ..Default::default()
                };
                wallet.update(&db_tx).await?;
                tracing::info!(
                    wallet_id = %audit.wallet_id,
                    from = %audit.stored,
                    to = %audit.expected,
                    "wallet balance repaired"
                );
            }
            Ok(drifted)
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use migration::MigratorTrait;
    use sea_orm::{Database, TransactionTrait};

    use super::*;
    use crate::{
        CreateWalletCmd, Transaction, TransactionKind, legs_for, transactions as tx_entity,
    };

    async fn engine() -> Engine {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder().database(db).build().await.unwrap();
        engine.new_user("alice", crate::Role::User).await.unwrap();
        engine
    }

    #[tokio::test]
    async fn failed_second_leg_rolls_back_the_first() {
        let engine = engine().await;
        let wallet = engine
            .create_wallet(CreateWalletCmd::new("alice", "Cash").initial_balance(Money::major(500)))
            .await
            .unwrap();
        let target = engine
            .create_wallet(CreateWalletCmd::new("alice", "Bank"))
            .await
            .unwrap();

        let tx = Transaction::new(
            "alice".to_string(),
            wallet.id,
            Some(target.id),
            None,
            TransactionKind::Transfer,
            Money::major(200),
            NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
            None,
        )
        .unwrap();
        let mut legs = legs_for(&tx);
        // The credit leg points at a wallet that does not exist and sorts last.
        legs[1].wallet_id = Uuid::from_u128(u128::MAX);

        let result: ResultEngine<()> = async {
            with_tx!(engine, |db_tx| {
                tx_entity::ActiveModel::from(&tx).insert(&db_tx).await?;
                engine.apply_legs(&db_tx, &legs).await?;
                Ok(())
            })
        }
        .await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));

        let wallet = engine.wallet(wallet.id, "alice").await.unwrap();
        assert_eq!(wallet.balance, Money::major(500));
        let target = engine.wallet(target.id, "alice").await.unwrap();
        assert_eq!(target.balance, Money::ZERO);
        let db_tx = engine.database.begin().await.unwrap();
        assert!(
            tx_entity::Entity::find_by_id(tx.id)
                .one(&db_tx)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            legs::Entity::find()
                .all(&db_tx)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn repair_restores_drifted_balances() {
        let engine = engine().await;
        let wallet = engine
            .create_wallet(CreateWalletCmd::new("alice", "Bank").initial_balance(Money::major(100)))
            .await
            .unwrap();

        let db_tx = engine.database.begin().await.unwrap();
        wallets::ActiveModel {
            id: ActiveValue::Set(wallet.id),
            balance: ActiveValue::Set(Money::major(90).minor()),
            ..Default::default()
        }
        .update(&db_tx)
        .await
        .unwrap();
        db_tx.commit().await.unwrap();

        let audit = engine.audit_balances("alice").await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].drift, Money::major(-10));

        let repaired = engine.repair_balances("alice").await.unwrap();
        assert_eq!(repaired.len(), 1);
        assert_eq!(repaired[0].expected, Money::major(100));

        let audit = engine.audit_balances("alice").await.unwrap();
        assert!(audit.iter().all(BalanceAudit::is_consistent));
    }
}
