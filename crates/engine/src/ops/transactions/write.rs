use sea_orm::{TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{ResultEngine, Transaction, TransactionFields, legs_for, transactions};

use super::super::{Engine, with_tx};
use super::{TransactionOutcome, validate::build_transaction};

impl Engine {
    /// Records a transaction and applies its legs.
    ///
    /// Validation, the insert and every balance change commit together or
    /// not at all.
    pub async fn create_transaction(
        &self,
        user_id: &str,
        fields: TransactionFields,
    ) -> ResultEngine<TransactionOutcome> {
        self.with_retry("create_transaction", || {
            self.try_create_transaction(user_id, &fields)
        })
        .await
    }

    async fn try_create_transaction(
        &self,
        user_id: &str,
        fields: &TransactionFields,
    ) -> ResultEngine<TransactionOutcome> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            self.validate_fields(&db_tx, user_id, fields).await?;

            let tx = build_transaction(user_id, fields)?;
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            self.apply_legs(&db_tx, &legs_for(&tx)).await?;

            let wallets = self.wallet_snapshots(&db_tx, &tx.wallet_ids()).await?;
            tracing::debug!(
                transaction_id = %tx.id,
                kind = tx.kind.as_str(),
                amount = %tx.amount,
                "transaction created"
            );
            Ok(TransactionOutcome {
                transaction: tx,
                wallets,
            })
        })
    }

    /// Replaces a transaction's fields.
    ///
    /// The old legs are reversed, the new fields validated against the
    /// reversed state, and the new legs applied, in one DB transaction. The
    /// result is the same as deleting the old transaction and creating the
    /// new one, except the id and creation time are kept.
    pub async fn update_transaction(
        &self,
        transaction_id: Uuid,
        user_id: &str,
        fields: TransactionFields,
    ) -> ResultEngine<TransactionOutcome> {
        self.with_retry("update_transaction", || {
            self.try_update_transaction(transaction_id, user_id, &fields)
        })
        .await
    }

    async fn try_update_transaction(
        &self,
        transaction_id: Uuid,
        user_id: &str,
        fields: &TransactionFields,
    ) -> ResultEngine<TransactionOutcome> {
        with_tx!(self, |db_tx| {
            let existing = self
                .require_transaction_owned(&db_tx, transaction_id, user_id)
                .await?;
            let mut touched = self.reverse_legs(&db_tx, existing.id).await?;
            self.validate_fields(&db_tx, user_id, fields).await?;

            let mut tx = build_transaction(user_id, fields)?;
            tx.id = existing.id;
            tx.created_at = existing.created_at;
            transactions::ActiveModel::from(&tx).update(&db_tx).await?;
            self.apply_legs(&db_tx, &legs_for(&tx)).await?;

            touched.extend(tx.wallet_ids());
            let wallets = self.wallet_snapshots(&db_tx, &touched).await?;
            tracing::debug!(
                transaction_id = %tx.id,
                kind = tx.kind.as_str(),
                amount = %tx.amount,
                "transaction updated"
            );
            Ok(TransactionOutcome {
                transaction: tx,
                wallets,
            })
        })
    }

    /// Removes a transaction after reversing its legs.
    pub async fn delete_transaction(
        &self,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<TransactionOutcome> {
        self.with_retry("delete_transaction", || {
            self.try_delete_transaction(transaction_id, user_id)
        })
        .await
    }

    async fn try_delete_transaction(
        &self,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<TransactionOutcome> {
        with_tx!(self, |db_tx| {
            let existing = self
                .require_transaction_owned(&db_tx, transaction_id, user_id)
                .await?;
            let touched = self.reverse_legs(&db_tx, existing.id).await?;
            transactions::Entity::delete_by_id(existing.id)
                .exec(&db_tx)
                .await?;

            let transaction = Transaction::try_from(existing)?;
            let wallets = self.wallet_snapshots(&db_tx, &touched).await?;
            tracing::debug!(transaction_id = %transaction.id, "transaction deleted");
            Ok(TransactionOutcome {
                transaction,
                wallets,
            })
        })
    }
}
