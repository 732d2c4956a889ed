//! Reconciliation Helper: set a wallet balance to an observed value and record
//! the difference as a synthetic income/expense transaction.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{
    EngineError, Money, ResultEngine, Transaction, TransactionKind, Wallet, legs_for,
    transactions, wallets,
};

use super::{Engine, with_tx};

/// The wallet after a manual balance edit and the adjustment recorded for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEdit {
    pub wallet: Wallet,
    /// `None` when the requested balance equals the current one.
    pub adjustment: Option<Transaction>,
}

fn adjustment_description(delta: Money) -> String {
    format!("Balance adjustment: {}", delta.to_signed_string())
}

fn out_of_range() -> EngineError {
    EngineError::Validation("balance out of range".to_string())
}

impl Engine {
    /// Sets the wallet balance to `new_balance`.
    ///
    /// A non-zero difference is recorded as an income (balance went up) or
    /// expense (balance went down) dated today, in the reserved "Balance
    /// adjustment" category, so the ledger keeps explaining the balance. The
    /// write only succeeds if the balance still holds the value read at the
    /// start; a concurrent change surfaces as `Conflict` and is retried.
    pub async fn edit_wallet_balance(
        &self,
        wallet_id: Uuid,
        user_id: &str,
        new_balance: Money,
    ) -> ResultEngine<BalanceEdit> {
        self.with_retry("edit_wallet_balance", || {
            self.try_edit_wallet_balance(wallet_id, user_id, new_balance)
        })
        .await
    }

    async fn try_edit_wallet_balance(
        &self,
        wallet_id: Uuid,
        user_id: &str,
        new_balance: Money,
    ) -> ResultEngine<BalanceEdit> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_wallet_owned(&db_tx, wallet_id, user_id)
                .await?;
            let old_balance = Money::new(model.balance);
            let delta = new_balance.checked_sub(old_balance).ok_or_else(out_of_range)?;

            let adjustment = if delta.is_zero() {
                None
            } else {
                let amount = delta.checked_abs().ok_or_else(out_of_range)?;
                let kind = if delta.is_positive() {
                    TransactionKind::Income
                } else {
                    TransactionKind::Expense
                };
                let category_kind = kind.category_kind().ok_or_else(|| {
                    EngineError::Integrity("adjustment kind without category".to_string())
                })?;
                let category = self.adjustment_category(&db_tx, category_kind).await?;
                let tx = Transaction::new(
                    user_id.to_string(),
                    wallet_id,
                    None,
                    Some(category.id),
                    kind,
                    amount,
                    Utc::now().date_naive(),
                    Some(adjustment_description(delta)),
                )?;
                transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
                self.insert_leg_rows(&db_tx, &legs_for(&tx)).await?;
                Some(tx)
            };

            let result = wallets::Entity::update_many()
                .col_expr(wallets::Column::Balance, Expr::value(new_balance.minor()))
                .filter(wallets::Column::Id.eq(wallet_id))
                .filter(wallets::Column::Balance.eq(old_balance.minor()))
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(EngineError::Conflict(
                    "wallet balance changed concurrently".to_string(),
                ));
            }

            let model = self
                .require_wallet_owned(&db_tx, wallet_id, user_id)
                .await?;
            let wallet = Wallet::try_from(model)?;
            if let Some(tx) = &adjustment {
                tracing::info!(
                    wallet_id = %wallet_id,
                    from = %old_balance,
                    to = %new_balance,
                    transaction_id = %tx.id,
                    "wallet balance adjusted"
                );
            }
            Ok(BalanceEdit { wallet, adjustment })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_records_the_signed_difference() {
        assert_eq!(
            adjustment_description(Money::major(150)),
            "Balance adjustment: +150.00"
        );
        assert_eq!(
            adjustment_description(Money::new(-2_050)),
            "Balance adjustment: -20.50"
        );
    }
}
