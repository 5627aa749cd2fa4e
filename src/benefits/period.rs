//! Accounting-window arithmetic for capped benefits.

use chrono::{Datelike, NaiveDate};

use super::domain::BenefitPeriod;

/// Date window over which usage is summed: inclusive start, exclusive end.
/// `None` on either side means unbounded (all-time accounting).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl UsageWindow {
    pub const fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// Whether a usage date falls inside this window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        if let Some(start) = self.start {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if date >= end {
                return false;
            }
        }
        true
    }
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).expect("day one of a real month")
}

/// Compute the window usage must be summed over, as of `today`. Monthly and
/// yearly caps reset on calendar boundaries; per-occurrence and unlimited
/// benefits account across all time. Callers recompute this per request so
/// the window tracks the current date.
pub fn usage_window(period: BenefitPeriod, today: NaiveDate) -> UsageWindow {
    match period {
        BenefitPeriod::PerMonth => {
            let start = first_of_month(today.year(), today.month());
            let end = if today.month() == 12 {
                first_of_month(today.year() + 1, 1)
            } else {
                first_of_month(today.year(), today.month() + 1)
            };
            UsageWindow {
                start: Some(start),
                end: Some(end),
            }
        }
        BenefitPeriod::PerYear => UsageWindow {
            start: Some(first_of_month(today.year(), 1)),
            end: Some(first_of_month(today.year() + 1, 1)),
        },
        BenefitPeriod::PerOccurrence | BenefitPeriod::Unlimited => UsageWindow::unbounded(),
    }
}
