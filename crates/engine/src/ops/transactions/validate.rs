use sea_orm::{DatabaseTransaction, prelude::*};

use crate::{
    Category, EngineError, ResultEngine, Transaction, TransactionFields, TransactionKind,
    categories, util::normalize_optional_text, wallets,
};

use super::super::Engine;

impl Engine {
    /// Checks a transaction's fields for `user_id`, in order: source wallet,
    /// amount, kind-specific references.
    ///
    /// A source wallet that is missing or owned by someone else is
    /// `NotFound`; every other problem is a `Validation` error.
    pub(super) async fn validate_fields(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        fields: &TransactionFields,
    ) -> ResultEngine<()> {
        let source = wallets::Entity::find_by_id(fields.wallet_id).one(db).await?;
        if !source.is_some_and(|w| w.user_id == user_id) {
            return Err(EngineError::NotFound("wallet not exists".to_string()));
        }

        if !fields.amount.is_positive() {
            return Err(EngineError::Validation("amount must be > 0".to_string()));
        }

        match fields.kind {
            TransactionKind::Transfer => {
                let target_id = fields.target_wallet_id.ok_or_else(|| {
                    EngineError::Validation("transfer requires a target wallet".to_string())
                })?;
                if target_id == fields.wallet_id {
                    return Err(EngineError::Validation(
                        "source and target wallet must differ".to_string(),
                    ));
                }
                let target = wallets::Entity::find_by_id(target_id).one(db).await?;
                if !target.is_some_and(|w| w.user_id == user_id) {
                    return Err(EngineError::Validation(
                        "target wallet not exists".to_string(),
                    ));
                }
            }
            TransactionKind::Income | TransactionKind::Expense => {
                if fields.target_wallet_id.is_some() {
                    return Err(EngineError::Validation(
                        "only transfers have a target wallet".to_string(),
                    ));
                }
                let category_id = fields.category_id.ok_or_else(|| {
                    EngineError::Validation("category is required".to_string())
                })?;
                let category = categories::Entity::find_by_id(category_id)
                    .one(db)
                    .await?
                    .ok_or_else(|| EngineError::Validation("category not exists".to_string()))?;
                let category = Category::try_from(category)?;
                if !category.is_visible_to(user_id) {
                    return Err(EngineError::Validation(
                        "category not accessible".to_string(),
                    ));
                }
                if category.is_system {
                    return Err(EngineError::Validation(
                        "category is reserved".to_string(),
                    ));
                }
                if Some(category.kind) != fields.kind.category_kind() {
                    return Err(EngineError::Validation(format!(
                        "category type {} does not match transaction type {}",
                        category.kind.as_str(),
                        fields.kind.as_str()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Builds the stored transaction from validated fields. Transfers never keep
/// a category, income and expenses never keep a target wallet.
pub(super) fn build_transaction(
    user_id: &str,
    fields: &TransactionFields,
) -> ResultEngine<Transaction> {
    let (target_wallet_id, category_id) = match fields.kind {
        TransactionKind::Transfer => (fields.target_wallet_id, None),
        TransactionKind::Income | TransactionKind::Expense => (None, fields.category_id),
    };
    Transaction::new(
        user_id.to_string(),
        fields.wallet_id,
        target_wallet_id,
        category_id,
        fields.kind,
        fields.amount,
        fields.date,
        normalize_optional_text(fields.description.as_deref()),
    )
}
