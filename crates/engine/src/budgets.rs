//! Budgets: a spending limit on an expense category over a recurring period.
//!
//! `spent` is never stored. [`BudgetStatus`] is computed on every read from
//! the transactions that fall in the active window.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{BudgetPeriod, EngineError, Money, PeriodWindow};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: String,
    pub category_id: Uuid,
    pub limit: Money,
    pub period: BudgetPeriod,
    pub created_at: DateTime<Utc>,
}

/// Share of a limit, in basis points (`10_000` is 100%).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(u32);

impl Percent {
    pub const FULL: Percent = Percent(10_000);

    /// `spent / limit`, floored to a basis point and capped at 100%.
    /// A non-positive limit counts as fully used.
    pub fn of_limit(spent: Money, limit: Money) -> Self {
        if !limit.is_positive() {
            return Self::FULL;
        }
        if !spent.is_positive() {
            return Percent(0);
        }
        let bps = i128::from(spent.minor()) * 10_000 / i128::from(limit.minor());
        Percent(bps.min(10_000) as u32)
    }

    pub fn basis_points(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Percent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub budget_id: Uuid,
    pub category_id: Uuid,
    pub period: BudgetPeriod,
    pub window: PeriodWindow,
    pub limit: Money,
    pub spent: Money,
    /// `limit - spent`, negative when over budget.
    pub remaining: Money,
    pub percent_used: Percent,
    pub is_over_budget: bool,
}

impl BudgetStatus {
    pub fn new(budget: &Budget, window: PeriodWindow, spent: Money) -> Self {
        Self {
            budget_id: budget.id,
            category_id: budget.category_id,
            period: budget.period,
            window,
            limit: budget.limit,
            spent,
            remaining: budget.limit - spent,
            percent_used: Percent::of_limit(spent, budget.limit),
            is_over_budget: spent > budget.limit,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub category_id: Uuid,
    pub amount_minor: i64,
    pub period: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Categories,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Budget> for ActiveModel {
    fn from(budget: &Budget) -> Self {
        Self {
            id: ActiveValue::Set(budget.id),
            user_id: ActiveValue::Set(budget.user_id.clone()),
            category_id: ActiveValue::Set(budget.category_id),
            amount_minor: ActiveValue::Set(budget.limit.minor()),
            period: ActiveValue::Set(budget.period.as_str().to_string()),
            created_at: ActiveValue::Set(budget.created_at),
        }
    }
}

impl TryFrom<Model> for Budget {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            period: BudgetPeriod::try_from(model.period.as_str())?,
            user_id: model.user_id,
            category_id: model.category_id,
            limit: Money::new(model.amount_minor),
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn budget(limit: Money) -> Budget {
        Budget {
            id: Uuid::new_v4(),
            user_id: "alice".to_string(),
            category_id: Uuid::new_v4(),
            limit,
            period: BudgetPeriod::Monthly,
            created_at: Utc::now(),
        }
    }

    fn october() -> PeriodWindow {
        PeriodWindow::month_of(NaiveDate::from_ymd_opt(2026, 10, 1).unwrap()).unwrap()
    }

    #[test]
    fn percent_is_capped_at_full() {
        assert_eq!(
            Percent::of_limit(Money::major(6_000_000), Money::major(5_000_000)),
            Percent::FULL
        );
        assert_eq!(
            Percent::of_limit(Money::major(1), Money::major(3)).basis_points(),
            3_333
        );
        assert_eq!(Percent::of_limit(Money::ZERO, Money::major(3)).to_string(), "0.00%");
        assert_eq!(Percent::FULL.to_string(), "100.00%");
    }

    #[test]
    fn overspending_is_flagged() {
        let budget = budget(Money::major(5_000_000));
        let status = BudgetStatus::new(&budget, october(), Money::major(6_000_000));
        assert!(status.is_over_budget);
        assert_eq!(status.percent_used, Percent::FULL);
        assert_eq!(status.remaining, Money::major(-1_000_000));
    }

    #[test]
    fn spending_exactly_the_limit_is_not_over() {
        let budget = budget(Money::major(100));
        let status = BudgetStatus::new(&budget, october(), Money::major(100));
        assert!(!status.is_over_budget);
        assert_eq!(status.percent_used, Percent::FULL);
        assert_eq!(status.remaining, Money::ZERO);
    }
}
