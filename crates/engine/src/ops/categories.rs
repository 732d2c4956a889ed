use chrono::Utc;
use sea_orm::{
    Condition, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::OnConflict,
};
use uuid::Uuid;

use crate::{
    Category, CategoryKind, CreateCategoryCmd, EngineError, ResultEngine, UpdateCategoryCmd,
    budgets, categories, transactions,
    util::{normalize_optional_text, normalize_required_name},
};

use super::{Engine, with_tx};

const ADJUSTMENT_CATEGORY_NAME: &str = "Balance adjustment";

/// Fixed ids of the reserved adjustment categories, one per kind.
fn adjustment_category_id(kind: CategoryKind) -> Uuid {
    match kind {
        CategoryKind::Income => Uuid::from_u128(0x7a11_0000_0000_4000_8000_0000_0000_0001),
        CategoryKind::Expense => Uuid::from_u128(0x7a11_0000_0000_4000_8000_0000_0000_0002),
    }
}

fn owner_condition(owner: Option<&str>) -> Condition {
    match owner {
        Some(user_id) => Condition::all().add(categories::Column::UserId.eq(user_id)),
        None => Condition::all().add(categories::Column::UserId.is_null()),
    }
}

impl Engine {
    async fn ensure_category_name_free(
        &self,
        db: &DatabaseTransaction,
        owner: Option<&str>,
        kind: CategoryKind,
        name: &str,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query = categories::Entity::find()
            .filter(owner_condition(owner))
            .filter(categories::Column::Kind.eq(kind.as_str()))
            .filter(categories::Column::NameNorm.eq(name.to_lowercase()));
        if let Some(id) = except {
            query = query.filter(categories::Column::Id.ne(id));
        }
        if query.one(db).await?.is_some() {
            return Err(EngineError::Conflict(format!(
                "category '{name}' already exists"
            )));
        }
        Ok(())
    }

    async fn category_in_use(
        &self,
        db: &DatabaseTransaction,
        category_id: Uuid,
    ) -> ResultEngine<bool> {
        let by_transaction = transactions::Entity::find()
            .filter(transactions::Column::CategoryId.eq(category_id))
            .one(db)
            .await?
            .is_some();
        if by_transaction {
            return Ok(true);
        }
        Ok(budgets::Entity::find()
            .filter(budgets::Column::CategoryId.eq(category_id))
            .one(db)
            .await?
            .is_some())
    }

    /// The reserved category used by balance adjustments, created on first use.
    pub(super) async fn adjustment_category(
        &self,
        db: &DatabaseTransaction,
        kind: CategoryKind,
    ) -> ResultEngine<Category> {
        let id = adjustment_category_id(kind);
        let category = Category {
            id,
            owner: None,
            name: ADJUSTMENT_CATEGORY_NAME.to_string(),
            kind,
            icon: None,
            is_system: true,
            created_at: Utc::now(),
        };
        categories::Entity::insert(categories::ActiveModel::from(&category))
            .on_conflict(
                OnConflict::column(categories::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        let model = categories::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| {
                EngineError::Integrity("balance adjustment category missing".to_string())
            })?;
        Category::try_from(model)
    }

    /// Creates a category for the user, or a global one when requested by an
    /// admin.
    pub async fn create_category(&self, cmd: CreateCategoryCmd) -> ResultEngine<Category> {
        let name = normalize_required_name(&cmd.name, "category")?;
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, &cmd.user_id).await?;
            if cmd.global && !user.is_admin() {
                return Err(EngineError::Forbidden(
                    "only admins can create global categories".to_string(),
                ));
            }
            let owner = (!cmd.global).then(|| user.username.clone());
            self.ensure_category_name_free(&db_tx, owner.as_deref(), cmd.kind, &name, None)
                .await?;

            let category = Category {
                id: Uuid::new_v4(),
                owner,
                name: name.clone(),
                kind: cmd.kind,
                icon: normalize_optional_text(cmd.icon.as_deref()),
                is_system: false,
                created_at: Utc::now(),
            };
            categories::ActiveModel::from(&category)
                .insert(&db_tx)
                .await?;
            tracing::debug!(
                category_id = %category.id,
                kind = cmd.kind.as_str(),
                "category created"
            );
            Ok(category)
        })
    }

    pub async fn category(&self, category_id: Uuid, user_id: &str) -> ResultEngine<Category> {
        with_tx!(self, |db_tx| {
            self.require_category_readable(&db_tx, category_id, user_id)
                .await
        })
    }

    /// The user's own categories plus the global ones, ordered by kind then
    /// name. Reserved categories are not listed.
    pub async fn list_categories(
        &self,
        user_id: &str,
        kind: Option<CategoryKind>,
    ) -> ResultEngine<Vec<Category>> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let mut query = categories::Entity::find()
                .filter(
                    Condition::any()
                        .add(categories::Column::UserId.eq(user_id))
                        .add(categories::Column::UserId.is_null()),
                )
                .filter(categories::Column::IsSystem.eq(false))
                .order_by_asc(categories::Column::Kind)
                .order_by_asc(categories::Column::NameNorm);
            if let Some(kind) = kind {
                query = query.filter(categories::Column::Kind.eq(kind.as_str()));
            }
            query
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Category::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    pub async fn update_category(
        &self,
        category_id: Uuid,
        user_id: &str,
        cmd: UpdateCategoryCmd,
    ) -> ResultEngine<Category> {
        let name = cmd
            .name
            .as_deref()
            .map(|n| normalize_required_name(n, "category"))
            .transpose()?;
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let mut category = self
                .require_category_writable(&db_tx, category_id, &user)
                .await?;

            if let Some(kind) = cmd.kind
                && kind != category.kind
            {
                if self.category_in_use(&db_tx, category_id).await? {
                    return Err(EngineError::Conflict(
                        "category type cannot change while it is in use".to_string(),
                    ));
                }
                category.kind = kind;
            }
            if let Some(name) = name {
                category.name = name;
            }
            if let Some(icon) = &cmd.icon {
                category.icon = normalize_optional_text(icon.as_deref());
            }
            self.ensure_category_name_free(
                &db_tx,
                category.owner.as_deref(),
                category.kind,
                &category.name,
                Some(category_id),
            )
            .await?;

            categories::ActiveModel::from(&category)
                .update(&db_tx)
                .await?;
            tracing::debug!(category_id = %category_id, "category updated");
            Ok(category)
        })
    }

    /// Deletes a category no transaction or budget references.
    pub async fn delete_category(&self, category_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            self.require_category_writable(&db_tx, category_id, &user)
                .await?;
            if self.category_in_use(&db_tx, category_id).await? {
                return Err(EngineError::Conflict(
                    "category is referenced by transactions or budgets".to_string(),
                ));
            }
            categories::Entity::delete_by_id(category_id)
                .exec(&db_tx)
                .await?;
            tracing::debug!(category_id = %category_id, "category deleted");
            Ok(())
        })
    }
}
