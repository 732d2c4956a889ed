//! Read-only aggregates over wallets and transactions. Amounts are never
//! converted, every total is grouped by currency.

use std::collections::{BTreeMap, HashMap};

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{DatabaseTransaction, QueryFilter, QuerySelect, TransactionTrait, prelude::*};

use crate::{
    Currency, EngineError, Money, PeriodWindow, ResultEngine, TransactionKind, transactions,
    wallets,
};

use super::{Engine, with_tx};

const MAX_TREND_MONTHS: u32 = 120;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyTotal {
    pub currency: Currency,
    pub total: Money,
}

/// Income and expense in one currency. Transfers are not counted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowTotals {
    pub currency: Currency,
    pub income: Money,
    pub expense: Money,
    pub net: Money,
}

impl FlowTotals {
    fn new(currency: Currency) -> Self {
        Self {
            currency,
            income: Money::ZERO,
            expense: Money::ZERO,
            net: Money::ZERO,
        }
    }

    fn add(&mut self, kind: TransactionKind, amount: Money) -> ResultEngine<()> {
        let overflow = || EngineError::Integrity("report total overflow".to_string());
        match kind {
            TransactionKind::Income => {
                self.income = self.income.checked_add(amount).ok_or_else(overflow)?;
                self.net = self.net.checked_add(amount).ok_or_else(overflow)?;
            }
            TransactionKind::Expense => {
                self.expense = self.expense.checked_add(amount).ok_or_else(overflow)?;
                self.net = self.net.checked_sub(amount).ok_or_else(overflow)?;
            }
            TransactionKind::Transfer => {}
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Sum of wallet balances per currency.
    pub balances: Vec<CurrencyTotal>,
    /// `None` covers every transaction.
    pub window: Option<PeriodWindow>,
    pub flows: Vec<FlowTotals>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthTotals {
    pub window: PeriodWindow,
    pub flows: Vec<FlowTotals>,
}

type FlowRow = (Uuid, String, i64, NaiveDate);

impl Engine {
    async fn wallet_currencies(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<Vec<(Uuid, Currency, Money)>> {
        let models = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .all(db)
            .await?;
        models
            .into_iter()
            .map(|model| {
                let currency = Currency::try_from(model.currency.as_str()).map_err(|_| {
                    EngineError::Integrity(format!("invalid stored currency: {}", model.currency))
                })?;
                Ok((model.id, currency, Money::new(model.balance)))
            })
            .collect()
    }

    /// Income and expense rows of the user, optionally inside `[start, end)`.
    async fn flow_rows(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> ResultEngine<Vec<FlowRow>> {
        let mut query = transactions::Entity::find()
            .select_only()
            .column(transactions::Column::WalletId)
            .column(transactions::Column::Kind)
            .column(transactions::Column::AmountMinor)
            .column(transactions::Column::TransactionDate)
            .filter(transactions::Column::UserId.eq(user_id))
            .filter(transactions::Column::Kind.is_in([
                TransactionKind::Income.as_str(),
                TransactionKind::Expense.as_str(),
            ]));
        if let Some((start, end)) = range {
            query = query
                .filter(transactions::Column::TransactionDate.gte(start))
                .filter(transactions::Column::TransactionDate.lt(end));
        }
        Ok(query.into_tuple().all(db).await?)
    }

    /// Balances per currency plus income/expense over `window` (all time when
    /// `None`).
    pub async fn summary(
        &self,
        user_id: &str,
        window: Option<PeriodWindow>,
    ) -> ResultEngine<Summary> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let wallets = self.wallet_currencies(&db_tx, user_id).await?;

            let mut balances: BTreeMap<Currency, Money> = BTreeMap::new();
            for (_, currency, balance) in &wallets {
                let total = balances.entry(*currency).or_insert(Money::ZERO);
                *total = total.checked_add(*balance).ok_or_else(|| {
                    EngineError::Integrity("report total overflow".to_string())
                })?;
            }

            let currency_of: HashMap<Uuid, Currency> =
                wallets.iter().map(|(id, currency, _)| (*id, *currency)).collect();
            let rows = self
                .flow_rows(&db_tx, user_id, window.map(|w| (w.start, w.end)))
                .await?;
            let mut flows: BTreeMap<Currency, FlowTotals> = BTreeMap::new();
            for (wallet_id, kind, amount, _) in rows {
                let currency = currency_of.get(&wallet_id).copied().ok_or_else(|| {
                    EngineError::Integrity("transaction wallet missing".to_string())
                })?;
                flows
                    .entry(currency)
                    .or_insert_with(|| FlowTotals::new(currency))
                    .add(TransactionKind::try_from(kind.as_str())?, Money::new(amount))?;
            }

            Ok(Summary {
                balances: balances
                    .into_iter()
                    .map(|(currency, total)| CurrencyTotal { currency, total })
                    .collect(),
                window,
                flows: flows.into_values().collect(),
            })
        })
    }

    /// Income and expense for the last `months` calendar months, oldest
    /// first, the month containing `today` last.
    pub async fn monthly_trend(
        &self,
        user_id: &str,
        months: u32,
        today: NaiveDate,
    ) -> ResultEngine<Vec<MonthTotals>> {
        if months == 0 || months > MAX_TREND_MONTHS {
            return Err(EngineError::Validation(format!(
                "months must be between 1 and {MAX_TREND_MONTHS}"
            )));
        }
        let current = PeriodWindow::month_of(today)?;
        let mut windows = Vec::with_capacity(months as usize);
        for back in (0..months).rev() {
            let start = current
                .start
                .checked_sub_months(Months::new(back))
                .ok_or_else(|| {
                    EngineError::Validation("date out of supported range".to_string())
                })?;
            windows.push(PeriodWindow::month_of(start)?);
        }

        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let currency_of: HashMap<Uuid, Currency> = self
                .wallet_currencies(&db_tx, user_id)
                .await?
                .into_iter()
                .map(|(id, currency, _)| (id, currency))
                .collect();
            let rows = self
                .flow_rows(&db_tx, user_id, Some((windows[0].start, current.end)))
                .await?;

            let mut buckets: Vec<BTreeMap<Currency, FlowTotals>> =
                vec![BTreeMap::new(); windows.len()];
            for (wallet_id, kind, amount, date) in rows {
                let Some(index) = windows.iter().position(|w| w.contains(date)) else {
                    continue;
                };
                let currency = currency_of.get(&wallet_id).copied().ok_or_else(|| {
                    EngineError::Integrity("transaction wallet missing".to_string())
                })?;
                buckets[index]
                    .entry(currency)
                    .or_insert_with(|| FlowTotals::new(currency))
                    .add(TransactionKind::try_from(kind.as_str())?, Money::new(amount))?;
            }

            Ok(windows
                .into_iter()
                .zip(buckets)
                .map(|(window, flows)| MonthTotals {
                    window,
                    flows: flows.into_values().collect(),
                })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfers_do_not_count_as_flow() {
        let mut totals = FlowTotals::new(Currency::EUR);
        totals.add(TransactionKind::Income, Money::major(100)).unwrap();
        totals.add(TransactionKind::Expense, Money::major(30)).unwrap();
        totals.add(TransactionKind::Transfer, Money::major(50)).unwrap();
        assert_eq!(totals.income, Money::major(100));
        assert_eq!(totals.expense, Money::major(30));
        assert_eq!(totals.net, Money::major(70));
    }
}
