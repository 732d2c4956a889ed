//! Budget Aggregator. Spending is summed from transactions on every read.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    Budget, BudgetPeriod, BudgetStatus, CategoryKind, CreateBudgetCmd, EngineError, Money,
    PeriodWindow, ResultEngine, TransactionKind, UpdateBudgetCmd, budgets, transactions,
};

use super::{Engine, with_tx};

fn ensure_positive_limit(limit: Money) -> ResultEngine<()> {
    if !limit.is_positive() {
        return Err(EngineError::Validation(
            "budget limit must be > 0".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    async fn ensure_budget_slot_free(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        category_id: Uuid,
        period: BudgetPeriod,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .filter(budgets::Column::CategoryId.eq(category_id))
            .filter(budgets::Column::Period.eq(period.as_str()));
        if let Some(id) = except {
            query = query.filter(budgets::Column::Id.ne(id));
        }
        if query.one(db).await?.is_some() {
            return Err(EngineError::Conflict(format!(
                "a {} budget already exists for this category",
                period.as_str()
            )));
        }
        Ok(())
    }

    /// Sum of the user's expenses in `category_id` dated inside `window`.
    async fn spent_in(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        category_id: Uuid,
        window: PeriodWindow,
    ) -> ResultEngine<Money> {
        let amounts: Vec<i64> = transactions::Entity::find()
            .select_only()
            .column(transactions::Column::AmountMinor)
            .filter(transactions::Column::UserId.eq(user_id))
            .filter(transactions::Column::CategoryId.eq(category_id))
            .filter(transactions::Column::Kind.eq(TransactionKind::Expense.as_str()))
            .filter(transactions::Column::TransactionDate.gte(window.start))
            .filter(transactions::Column::TransactionDate.lt(window.end))
            .into_tuple()
            .all(db)
            .await?;
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, minor| acc.checked_add(Money::new(minor)))
            .ok_or_else(|| EngineError::Integrity("spent total overflow".to_string()))
    }

    async fn status_of(
        &self,
        db: &DatabaseTransaction,
        budget: &Budget,
        today: NaiveDate,
    ) -> ResultEngine<BudgetStatus> {
        let window = budget.period.window_containing(today)?;
        let spent = self
            .spent_in(db, &budget.user_id, budget.category_id, window)
            .await?;
        Ok(BudgetStatus::new(budget, window, spent))
    }

    /// Creates a budget on one of the user's expense categories.
    pub async fn create_budget(&self, cmd: CreateBudgetCmd) -> ResultEngine<Budget> {
        ensure_positive_limit(cmd.limit)?;
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, &cmd.user_id).await?;
            let category = match self
                .require_category_readable(&db_tx, cmd.category_id, &cmd.user_id)
                .await
            {
                Ok(category) => category,
                Err(EngineError::NotFound(_) | EngineError::Forbidden(_)) => {
                    return Err(EngineError::Validation(
                        "category not accessible".to_string(),
                    ));
                }
                Err(err) => return Err(err),
            };
            if category.kind != CategoryKind::Expense || category.is_system {
                return Err(EngineError::Validation(
                    "budgets can only track expense categories".to_string(),
                ));
            }
            self.ensure_budget_slot_free(&db_tx, &cmd.user_id, cmd.category_id, cmd.period, None)
                .await?;

            let budget = Budget {
                id: Uuid::new_v4(),
                user_id: cmd.user_id.clone(),
                category_id: cmd.category_id,
                limit: cmd.limit,
                period: cmd.period,
                created_at: Utc::now(),
            };
            budgets::ActiveModel::from(&budget).insert(&db_tx).await?;
            tracing::debug!(budget_id = %budget.id, limit = %budget.limit, "budget created");
            Ok(budget)
        })
    }

    pub async fn budget(&self, budget_id: Uuid, user_id: &str) -> ResultEngine<Budget> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_budget_owned(&db_tx, budget_id, user_id)
                .await?;
            Budget::try_from(model)
        })
    }

    pub async fn list_budgets(&self, user_id: &str) -> ResultEngine<Vec<Budget>> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            budgets::Entity::find()
                .filter(budgets::Column::UserId.eq(user_id))
                .order_by_asc(budgets::Column::CreatedAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Budget::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Changes a budget's limit and/or period.
    pub async fn update_budget(
        &self,
        budget_id: Uuid,
        user_id: &str,
        cmd: UpdateBudgetCmd,
    ) -> ResultEngine<Budget> {
        if let Some(limit) = cmd.limit {
            ensure_positive_limit(limit)?;
        }
        with_tx!(self, |db_tx| {
            let model = self
                .require_budget_owned(&db_tx, budget_id, user_id)
                .await?;
            let mut budget = Budget::try_from(model)?;
            if let Some(period) = cmd.period
                && period != budget.period
            {
                self.ensure_budget_slot_free(
                    &db_tx,
                    user_id,
                    budget.category_id,
                    period,
                    Some(budget_id),
                )
                .await?;
                budget.period = period;
            }
            if let Some(limit) = cmd.limit {
                budget.limit = limit;
            }

            let active = budgets::ActiveModel {
                id: ActiveValue::Unchanged(budget.id),
                amount_minor: ActiveValue::Set(budget.limit.minor()),
                period: ActiveValue::Set(budget.period.as_str().to_string()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            tracing::debug!(budget_id = %budget_id, "budget updated");
            Ok(budget)
        })
    }

    pub async fn delete_budget(&self, budget_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_budget_owned(&db_tx, budget_id, user_id)
                .await?;
            budgets::Entity::delete_by_id(budget_id)
                .exec(&db_tx)
                .await?;
            tracing::debug!(budget_id = %budget_id, "budget deleted");
            Ok(())
        })
    }

    /// Total expenses of `user_id` in `category_id` within `window`.
    pub async fn spent(
        &self,
        user_id: &str,
        category_id: Uuid,
        window: PeriodWindow,
    ) -> ResultEngine<Money> {
        with_tx!(self, |db_tx| {
            self.require_category_readable(&db_tx, category_id, user_id)
                .await?;
            self.spent_in(&db_tx, user_id, category_id, window).await
        })
    }

    /// Status of a budget for the period window containing `today`.
    pub async fn budget_status(
        &self,
        budget_id: Uuid,
        user_id: &str,
        today: NaiveDate,
    ) -> ResultEngine<BudgetStatus> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_budget_owned(&db_tx, budget_id, user_id)
                .await?;
            let budget = Budget::try_from(model)?;
            self.status_of(&db_tx, &budget, today).await
        })
    }

    /// Status of every budget of the user for the windows containing `today`.
    pub async fn list_budget_statuses(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> ResultEngine<Vec<BudgetStatus>> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let models = budgets::Entity::find()
                .filter(budgets::Column::UserId.eq(user_id))
                .order_by_asc(budgets::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            let mut statuses = Vec::with_capacity(models.len());
            for model in models {
                let budget = Budget::try_from(model)?;
                statuses.push(self.status_of(&db_tx, &budget, today).await?);
            }
            Ok(statuses)
        })
    }
}
