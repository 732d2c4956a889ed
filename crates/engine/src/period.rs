//! Budget periods and the date windows they cover.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetPeriod {
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl BudgetPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// The window of this period that contains `date`: ISO week (Monday
    /// start), calendar month or calendar year.
    pub fn window_containing(self, date: NaiveDate) -> ResultEngine<PeriodWindow> {
        match self {
            Self::Weekly => {
                let offset = u64::from(date.weekday().num_days_from_monday());
                let start = date
                    .checked_sub_days(Days::new(offset))
                    .ok_or_else(|| out_of_range(date))?;
                let end = start
                    .checked_add_days(Days::new(7))
                    .ok_or_else(|| out_of_range(date))?;
                PeriodWindow::new(start, end)
            }
            Self::Monthly => PeriodWindow::month_of(date),
            Self::Yearly => {
                let start = NaiveDate::from_ymd_opt(date.year(), 1, 1)
                    .ok_or_else(|| out_of_range(date))?;
                let end = NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
                    .ok_or_else(|| out_of_range(date))?;
                PeriodWindow::new(start, end)
            }
        }
    }
}

impl TryFrom<&str> for BudgetPeriod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EngineError::Validation(format!(
                "invalid budget period: {other}"
            ))),
        }
    }
}

/// Half-open date range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ResultEngine<Self> {
        if end <= start {
            return Err(EngineError::Validation(format!(
                "invalid range: {start} must be before {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> ResultEngine<Self> {
        let start = date.with_day(1).ok_or_else(|| out_of_range(date))?;
        let end = start
            .checked_add_months(chrono::Months::new(1))
            .ok_or_else(|| out_of_range(date))?;
        Self::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// Last day included in the window.
    pub fn last_day(&self) -> NaiveDate {
        self.end.pred_opt().unwrap_or(self.start)
    }
}

fn out_of_range(date: NaiveDate) -> EngineError {
    EngineError::Validation(format!("date out of supported range: {date}"))
}
