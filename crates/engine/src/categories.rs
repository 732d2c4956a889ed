//! Categories for income and expense transactions.
//!
//! A category without owner is global: every user can reference it, only
//! admins can change it. System categories (the reserved balance adjustment
//! markers) are global, hidden from listings and never user-selectable.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryKind {
    Income,
    Expense,
}

impl CategoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for CategoryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::Validation(format!(
                "invalid category type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    /// `None` for global categories.
    pub owner: Option<String>,
    pub name: String,
    pub kind: CategoryKind,
    pub icon: Option<String>,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn is_global(&self) -> bool {
        self.owner.is_none()
    }

    /// Whether `user_id` may reference this category from a transaction or
    /// budget.
    pub fn is_visible_to(&self, user_id: &str) -> bool {
        match &self.owner {
            None => true,
            Some(owner) => owner == user_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Option<String>,
    pub name: String,
    pub name_norm: String,
    pub kind: String,
    pub icon: Option<String>,
    pub is_system: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
    #[sea_orm(has_many = "super::budgets::Entity")]
    Budgets,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budgets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Category> for ActiveModel {
    fn from(category: &Category) -> Self {
        Self {
            id: ActiveValue::Set(category.id),
            user_id: ActiveValue::Set(category.owner.clone()),
            name: ActiveValue::Set(category.name.clone()),
            name_norm: ActiveValue::Set(category.name.to_lowercase()),
            kind: ActiveValue::Set(category.kind.as_str().to_string()),
            icon: ActiveValue::Set(category.icon.clone()),
            is_system: ActiveValue::Set(category.is_system),
            created_at: ActiveValue::Set(category.created_at),
        }
    }
}

impl TryFrom<Model> for Category {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            kind: CategoryKind::try_from(model.kind.as_str())?,
            owner: model.user_id,
            name: model.name,
            icon: model.icon,
            is_system: model.is_system,
            created_at: model.created_at,
        })
    }
}
