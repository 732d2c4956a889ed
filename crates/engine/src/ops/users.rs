use chrono::Utc;
use sea_orm::{ActiveValue, TransactionTrait, prelude::*};

use crate::{EngineError, ResultEngine, Role, User, users, util::normalize_required_name};

use super::{Engine, with_tx};

impl Engine {
    /// Registers a user. Usernames are unique.
    pub async fn new_user(&self, username: &str, role: Role) -> ResultEngine<User> {
        let username = normalize_required_name(username, "user")?;
        with_tx!(self, |db_tx| {
            if users::Entity::find_by_id(username.clone())
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::Conflict(format!(
                    "user '{username}' already exists"
                )));
            }
            let model = users::ActiveModel {
                username: ActiveValue::Set(username.clone()),
                role: ActiveValue::Set(role.as_str().to_string()),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;
            tracing::debug!(username = %username, role = role.as_str(), "user created");
            User::try_from(model)
        })
    }

    pub async fn user(&self, username: &str) -> ResultEngine<User> {
        with_tx!(self, |db_tx| self.require_user(&db_tx, username).await)
    }
}
