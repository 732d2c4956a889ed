use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    CreateWalletCmd, EngineError, ResultEngine, UpdateWalletCmd, Wallet, transactions,
    util::normalize_required_name, wallets,
};

use super::{Engine, with_tx};

impl Engine {
    async fn ensure_wallet_name_free(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        name: &str,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        let lowered = name.to_lowercase();
        let taken = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .all(db)
            .await?
            .into_iter()
            .any(|w| Some(w.id) != except && w.name.to_lowercase() == lowered);
        if taken {
            return Err(EngineError::Conflict(format!(
                "wallet '{name}' already exists"
            )));
        }
        Ok(())
    }

    /// Creates a wallet whose balance starts at its initial balance.
    pub async fn create_wallet(&self, cmd: CreateWalletCmd) -> ResultEngine<Wallet> {
        let name = normalize_required_name(&cmd.name, "wallet")?;
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, &cmd.user_id).await?;
            self.ensure_wallet_name_free(&db_tx, &cmd.user_id, &name, None)
                .await?;

            let wallet = Wallet::new(
                cmd.user_id.clone(),
                name.clone(),
                cmd.kind,
                cmd.currency,
                cmd.initial_balance,
            );
            wallets::ActiveModel::from(&wallet).insert(&db_tx).await?;
            tracing::debug!(
                wallet_id = %wallet.id,
                user_id = %wallet.owner,
                balance = %wallet.balance,
                "wallet created"
            );
            Ok(wallet)
        })
    }

    pub async fn wallet(&self, wallet_id: Uuid, user_id: &str) -> ResultEngine<Wallet> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_wallet_owned(&db_tx, wallet_id, user_id)
                .await?;
            Wallet::try_from(model)
        })
    }

    /// Wallets of `user_id`, ordered by name.
    pub async fn list_wallets(&self, user_id: &str) -> ResultEngine<Vec<Wallet>> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let models = wallets::Entity::find()
                .filter(wallets::Column::UserId.eq(user_id))
                .order_by_asc(wallets::Column::Name)
                .all(&db_tx)
                .await?;
            models
                .into_iter()
                .map(Wallet::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Renames or retypes a wallet. The balance is left untouched.
    pub async fn update_wallet(
        &self,
        wallet_id: Uuid,
        user_id: &str,
        cmd: UpdateWalletCmd,
    ) -> ResultEngine<Wallet> {
        let name = cmd
            .name
            .as_deref()
            .map(|n| normalize_required_name(n, "wallet"))
            .transpose()?;
        with_tx!(self, |db_tx| {
            let model = self
                .require_wallet_owned(&db_tx, wallet_id, user_id)
                .await?;
            if let Some(name) = &name {
                self.ensure_wallet_name_free(&db_tx, user_id, name, Some(wallet_id))
                    .await?;
            }

            let mut active: wallets::ActiveModel = model.into();
            if let Some(name) = name {
                active.name = ActiveValue::Set(name);
            }
            if let Some(kind) = cmd.kind {
                active.kind = ActiveValue::Set(kind.as_str().to_string());
            }
            let model = active.update(&db_tx).await?;
            tracing::debug!(wallet_id = %wallet_id, "wallet updated");
            Wallet::try_from(model)
        })
    }

    /// Deletes a wallet that no transaction references.
    pub async fn delete_wallet(&self, wallet_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_wallet_owned(&db_tx, wallet_id, user_id)
                .await?;
            let referenced = transactions::Entity::find()
                .filter(
                    Condition::any()
                        .add(transactions::Column::WalletId.eq(wallet_id))
                        .add(transactions::Column::TargetWalletId.eq(wallet_id)),
                )
                .one(&db_tx)
                .await?
                .is_some();
            if referenced {
                return Err(EngineError::Conflict(
                    "wallet is referenced by transactions".to_string(),
                ));
            }
            wallets::Entity::delete_by_id(wallet_id)
                .exec(&db_tx)
                .await?;
            tracing::debug!(wallet_id = %wallet_id, "wallet deleted");
            Ok(())
        })
    }
}
