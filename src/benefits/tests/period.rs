use super::common::*;
use crate::benefits::domain::BenefitPeriod;
use crate::benefits::period::{usage_window, UsageWindow};

#[test]
fn monthly_window_spans_the_calendar_month() {
    let window = usage_window(BenefitPeriod::PerMonth, date(2024, 6, 15));

    assert_eq!(window.start, Some(date(2024, 6, 1)));
    assert_eq!(window.end, Some(date(2024, 7, 1)));
}

#[test]
fn december_window_rolls_into_the_next_year() {
    let window = usage_window(BenefitPeriod::PerMonth, date(2024, 12, 15));

    assert_eq!(window.start, Some(date(2024, 12, 1)));
    assert_eq!(window.end, Some(date(2025, 1, 1)));
}

#[test]
fn yearly_window_spans_the_calendar_year() {
    let window = usage_window(BenefitPeriod::PerYear, date(2024, 3, 1));

    assert_eq!(window.start, Some(date(2024, 1, 1)));
    assert_eq!(window.end, Some(date(2025, 1, 1)));
}

#[test]
fn occurrence_and_unlimited_periods_account_across_all_time() {
    assert_eq!(
        usage_window(BenefitPeriod::PerOccurrence, date(2024, 6, 15)),
        UsageWindow::unbounded()
    );
    assert_eq!(
        usage_window(BenefitPeriod::Unlimited, date(2024, 6, 15)),
        UsageWindow::unbounded()
    );
}

#[test]
fn window_start_is_inclusive_and_end_is_exclusive() {
    let window = usage_window(BenefitPeriod::PerMonth, date(2024, 6, 15));

    assert!(window.contains(date(2024, 6, 1)));
    assert!(window.contains(date(2024, 6, 30)));
    assert!(!window.contains(date(2024, 7, 1)));
    assert!(!window.contains(date(2024, 5, 31)));
}

#[test]
fn unbounded_window_contains_any_date() {
    let window = UsageWindow::unbounded();

    assert!(window.contains(date(1999, 1, 1)));
    assert!(window.contains(date(2124, 12, 31)));
}
