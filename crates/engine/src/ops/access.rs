use sea_orm::{DatabaseTransaction, prelude::*};
use uuid::Uuid;

use crate::{
    Category, EngineError, ResultEngine, User, budgets, categories, transactions, users, wallets,
};

use super::Engine;

/// Generates a `require_*_owned` lookup for a user-owned entity: missing rows
/// are `NotFound`, rows owned by somebody else are `Forbidden`.
macro_rules! impl_require_owned {
    ($fn_name:ident, $entity:path, $model:path, $label:literal) => {
        pub(super) async fn $fn_name(
            &self,
            db: &DatabaseTransaction,
            id: Uuid,
            user_id: &str,
        ) -> ResultEngine<$model> {
            let model = <$entity>::find_by_id(id)
                .one(db)
                .await?
                .ok_or_else(|| EngineError::NotFound(concat!($label, " not exists").to_string()))?;
            if model.user_id != user_id {
                return Err(EngineError::Forbidden(
                    concat!($label, " belongs to another user").to_string(),
                ));
            }
            Ok(model)
        }
    };
}

impl Engine {
    impl_require_owned!(
        require_wallet_owned,
        wallets::Entity,
        wallets::Model,
        "wallet"
    );

    impl_require_owned!(
        require_transaction_owned,
        transactions::Entity,
        transactions::Model,
        "transaction"
    );

    impl_require_owned!(
        require_budget_owned,
        budgets::Entity,
        budgets::Model,
        "budget"
    );

    pub(super) async fn require_user(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<User> {
        let model = users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("user not exists".to_string()))?;
        User::try_from(model)
    }

    /// A category the user can see: their own or a global one.
    pub(super) async fn require_category_readable(
        &self,
        db: &DatabaseTransaction,
        category_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Category> {
        let model = categories::Entity::find_by_id(category_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("category not exists".to_string()))?;
        let category = Category::try_from(model)?;
        if !category.is_visible_to(user_id) {
            return Err(EngineError::Forbidden(
                "category belongs to another user".to_string(),
            ));
        }
        Ok(category)
    }

    /// A category the user can modify. System categories are read-only and
    /// global ones are reserved to admins.
    pub(super) async fn require_category_writable(
        &self,
        db: &DatabaseTransaction,
        category_id: Uuid,
        user: &User,
    ) -> ResultEngine<Category> {
        let category = self
            .require_category_readable(db, category_id, &user.username)
            .await?;
        if category.is_system {
            return Err(EngineError::Forbidden(
                "system categories cannot be modified".to_string(),
            ));
        }
        if category.is_global() && !user.is_admin() {
            return Err(EngineError::Forbidden(
                "only admins can modify global categories".to_string(),
            ));
        }
        Ok(category)
    }
}
