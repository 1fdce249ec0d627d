//! Calendar period returns sampled from an equity curve.
//!
//! Each period's return is measured from the equity at the previous period's
//! last bar (or the starting equity for the first period) to the equity at
//! its own last bar. Weekly sampling lines up FX and crypto calendars, which
//! trade on different days.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};

use super::backtest::EquityPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnPeriod {
    #[default]
    Weekly,
    Monthly,
}

impl ReturnPeriod {
    /// Last calendar day of the period containing `date`. Weeks end on Sunday.
    pub fn period_end(self, date: NaiveDate) -> NaiveDate {
        match self {
            ReturnPeriod::Weekly => {
                let remaining = 6 - date.weekday().num_days_from_monday();
                date.checked_add_days(Days::new(u64::from(remaining)))
                    .unwrap_or(date)
            }
            ReturnPeriod::Monthly => {
                let (year, month) = if date.month() == 12 {
                    (date.year() + 1, 1)
                } else {
                    (date.year(), date.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1)
                    .and_then(|first| first.pred_opt())
                    .unwrap_or(date)
            }
        }
    }
}

impl FromStr for ReturnPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" => Ok(ReturnPeriod::Weekly),
            "monthly" | "month" => Ok(ReturnPeriod::Monthly),
            other => Err(format!("unknown return period '{other}', expected weekly or monthly")),
        }
    }
}

impl fmt::Display for ReturnPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnPeriod::Weekly => write!(f, "weekly"),
            ReturnPeriod::Monthly => write!(f, "monthly"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodReturn {
    pub period_end: NaiveDate,
    pub value: f64,
}

/// One return per calendar period touched by the curve, in time order.
pub fn period_returns(curve: &[EquityPoint], period: ReturnPeriod) -> Vec<PeriodReturn> {
    let mut returns = Vec::new();
    let mut base = 1.0;
    let mut current: Option<(NaiveDate, f64)> = None;

    for point in curve {
        let end = period.period_end(point.timestamp.date());
        let equity = 1.0 + point.cumulative_return;
        match current {
            Some((open_end, last_equity)) if open_end != end => {
                returns.push(PeriodReturn {
                    period_end: open_end,
                    value: last_equity / base - 1.0,
                });
                base = last_equity;
            }
            _ => {}
        }
        current = Some((end, equity));
    }

    if let Some((open_end, last_equity)) = current {
        returns.push(PeriodReturn {
            period_end: open_end,
            value: last_equity / base - 1.0,
        });
    }

    returns
}
