use base64::Engine as _;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{Condition, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};

use crate::{EngineError, ResultEngine, Transaction, User, transactions};

use super::super::{Engine, with_tx};
use super::{ListScope, TransactionListFilter};

const DEFAULT_PAGE_SIZE: u64 = 50;
const MAX_PAGE_SIZE: u64 = 500;

/// One page of a transaction listing, newest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPage {
    pub items: Vec<Transaction>,
    /// Pass back as `TransactionListFilter::cursor` to fetch the next page.
    pub next_cursor: Option<String>,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<u64> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from > to
    {
        return Err(EngineError::Validation(
            "invalid range: from must be <= to".to_string(),
        ));
    }
    match filter.limit {
        None => Ok(DEFAULT_PAGE_SIZE),
        Some(0) => Err(EngineError::Validation(
            "limit must be greater than 0".to_string(),
        )),
        Some(limit) => Ok(limit.min(MAX_PAGE_SIZE)),
    }
}

/// The `user_id` restriction a listing runs with; `None` lists every user.
fn scope_owner(user: &User, scope: &ListScope) -> ResultEngine<Option<String>> {
    match scope {
        ListScope::Own => Ok(Some(user.username.clone())),
        ListScope::User(other) if other == &user.username => Ok(Some(other.clone())),
        ListScope::User(_) | ListScope::All if !user.is_admin() => Err(EngineError::Forbidden(
            "only admins can list other users' transactions".to_string(),
        )),
        ListScope::User(other) => Ok(Some(other.clone())),
        ListScope::All => Ok(None),
    }
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, owner: Option<&str>, filter: &TransactionListFilter) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, owner: Option<&str>, filter: &TransactionListFilter) -> Self {
        if let Some(owner) = owner {
            self = self.filter(transactions::Column::UserId.eq(owner));
        }
        if let Some(wallet_id) = filter.wallet_id {
            self = self.filter(
                Condition::any()
                    .add(transactions::Column::WalletId.eq(wallet_id))
                    .add(transactions::Column::TargetWalletId.eq(wallet_id)),
            );
        }
        if let Some(category_id) = filter.category_id {
            self = self.filter(transactions::Column::CategoryId.eq(category_id));
        }
        if let Some(kind) = filter.kind {
            self = self.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::TransactionDate.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::TransactionDate.lte(to));
        }
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TransactionsCursor {
    transaction_date: NaiveDate,
    transaction_id: Uuid,
}

impl TransactionsCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::Validation("invalid transactions cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::Validation("invalid transactions cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::Validation("invalid transactions cursor".to_string()))
    }
}

impl Engine {
    /// Reads one transaction. Admins may read anybody's.
    pub async fn transaction(
        &self,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let model = transactions::Entity::find_by_id(transaction_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("transaction not exists".to_string()))?;
            if model.user_id != user.username && !user.is_admin() {
                return Err(EngineError::Forbidden(
                    "transaction belongs to another user".to_string(),
                ));
            }
            Transaction::try_from(model)
        })
    }

    /// Lists transactions matching `filter` with cursor-based pagination.
    ///
    /// Pagination is newest → older by `(transaction_date DESC, id DESC)`.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        filter: &TransactionListFilter,
    ) -> ResultEngine<TransactionPage> {
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let owner = scope_owner(&user, &filter.scope)?;
            let limit = validate_list_filter(filter)?;

            let mut query = transactions::Entity::find()
                .order_by_desc(transactions::Column::TransactionDate)
                .order_by_desc(transactions::Column::Id)
                .limit(limit.saturating_add(1));

            if let Some(cursor) = &filter.cursor {
                let cursor = TransactionsCursor::decode(cursor)?;
                query = query.filter(
                    Condition::any()
                        .add(transactions::Column::TransactionDate.lt(cursor.transaction_date))
                        .add(
                            Condition::all()
                                .add(
                                    transactions::Column::TransactionDate
                                        .eq(cursor.transaction_date),
                                )
                                .add(transactions::Column::Id.lt(cursor.transaction_id)),
                        ),
                );
            }
            query = query.apply_tx_filters(owner.as_deref(), filter);

            let rows: Vec<transactions::Model> = query.all(&db_tx).await?;
            let has_more = rows.len() as u64 > limit;

            let items = rows
                .into_iter()
                .take(limit as usize)
                .map(Transaction::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            let next_cursor = if has_more {
                items
                    .last()
                    .map(|tx| {
                        TransactionsCursor {
                            transaction_date: tx.transaction_date,
                            transaction_id: tx.id,
                        }
                        .encode()
                    })
                    .transpose()?
            } else {
                None
            };

            Ok(TransactionPage { items, next_cursor })
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::Role;

    fn user(role: Role) -> User {
        User {
            username: "alice".to_string(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn cursor_survives_a_round_trip() {
        let cursor = TransactionsCursor {
            transaction_date: NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
            transaction_id: Uuid::new_v4(),
        };
        let decoded = TransactionsCursor::decode(&cursor.encode().unwrap()).unwrap();
        assert_eq!(decoded.transaction_date, cursor.transaction_date);
        assert_eq!(decoded.transaction_id, cursor.transaction_id);
        assert!(TransactionsCursor::decode("not a cursor").is_err());
    }

    #[test]
    fn only_admins_widen_the_scope() {
        let alice = user(Role::User);
        assert_eq!(
            scope_owner(&alice, &ListScope::Own).unwrap(),
            Some("alice".to_string())
        );
        assert_eq!(
            scope_owner(&alice, &ListScope::User("alice".to_string())).unwrap(),
            Some("alice".to_string())
        );
        assert!(matches!(
            scope_owner(&alice, &ListScope::User("bob".to_string())),
            Err(EngineError::Forbidden(_))
        ));
        assert!(matches!(
            scope_owner(&alice, &ListScope::All),
            Err(EngineError::Forbidden(_))
        ));

        let admin = user(Role::Admin);
        assert_eq!(
            scope_owner(&admin, &ListScope::User("bob".to_string())).unwrap(),
            Some("bob".to_string())
        );
        assert_eq!(scope_owner(&admin, &ListScope::All).unwrap(), None);
    }

    #[test]
    fn page_size_is_bounded() {
        let mut filter = TransactionListFilter::default();
        assert_eq!(validate_list_filter(&filter).unwrap(), 50);
        filter.limit = Some(10_000);
        assert_eq!(validate_list_filter(&filter).unwrap(), 500);
        filter.limit = Some(0);
        assert!(validate_list_filter(&filter).is_err());
    }
}
