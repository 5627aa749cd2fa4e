use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use super::super::domain::{Eligibility, EligibilityRule, RuleOperator, RuleSubject, START_DATE_KEY};

/// Whole months elapsed from `start` to `today`, counting a month only once
/// its anniversary day has passed. A start date in the future yields `None`.
pub(crate) fn tenure_months(start: NaiveDate, today: NaiveDate) -> Option<u32> {
    let mut months = (today.year() - start.year()) * 12 + today.month() as i32 - start.month() as i32;
    if today.day() < start.day() {
        months -= 1;
    }
    u32::try_from(months).ok()
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

fn evaluate_tenure(
    rule: &EligibilityRule,
    attrs: &BTreeMap<String, String>,
    today: NaiveDate,
) -> Eligibility {
    let raw_start = match attrs.get(START_DATE_KEY) {
        Some(value) if !value.is_empty() => value,
        _ => return Eligibility::Unknown,
    };
    let start = match NaiveDate::parse_from_str(raw_start.trim(), "%Y-%m-%d") {
        Ok(date) => date,
        Err(_) => return Eligibility::Unknown,
    };
    let actual = match tenure_months(start, today) {
        Some(months) => f64::from(months),
        None => return Eligibility::Unknown,
    };
    let required = match parse_number(&rule.value) {
        Some(number) => number,
        None => return Eligibility::Unknown,
    };

    // Only threshold comparisons make sense for a derived month count.
    match rule.operator {
        RuleOperator::Gte => Eligibility::from(actual >= required),
        RuleOperator::Lte => Eligibility::from(actual <= required),
        _ => Eligibility::Unknown,
    }
}

fn evaluate_attribute(
    rule: &EligibilityRule,
    key: &str,
    attrs: &BTreeMap<String, String>,
) -> Eligibility {
    let stored = match attrs.get(key) {
        Some(value) if !value.is_empty() => value,
        _ => return Eligibility::Unknown,
    };

    let member_value = stored.to_lowercase();
    let rule_value = rule.value.to_lowercase();

    match rule.operator {
        RuleOperator::Eq => Eligibility::from(member_value == rule_value),
        RuleOperator::Neq => Eligibility::from(member_value != rule_value),
        RuleOperator::Contains => Eligibility::from(member_value.contains(&rule_value)),
        RuleOperator::Gte | RuleOperator::Lte => {
            let (actual, required) = match (parse_number(&member_value), parse_number(&rule_value)) {
                (Some(actual), Some(required)) => (actual, required),
                _ => return Eligibility::Unknown,
            };
            if rule.operator == RuleOperator::Gte {
                Eligibility::from(actual >= required)
            } else {
                Eligibility::from(actual <= required)
            }
        }
    }
}

/// Evaluate one rule against a member's attribute snapshot. Pure: the result
/// depends only on the rule, the snapshot, and the supplied date. Missing or
/// unparseable data resolves to `Unknown`, never an error.
pub fn evaluate_rule(
    rule: &EligibilityRule,
    attrs: &BTreeMap<String, String>,
    today: NaiveDate,
) -> Eligibility {
    match rule.subject() {
        RuleSubject::Tenure => evaluate_tenure(rule, attrs, today),
        RuleSubject::Attribute(key) => evaluate_attribute(rule, key, attrs),
    }
}
