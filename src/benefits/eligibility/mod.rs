//! Rule evaluation and the aggregated eligibility verdict.

mod evaluate;

pub use evaluate::evaluate_rule;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{Eligibility, EligibilityRule};

/// Aggregated verdict for one benefit plus the labels of every rule the
/// member does not definitely satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub eligible: Eligibility,
    pub unmet_rules: Vec<String>,
}

impl EligibilityResult {
    fn eligible() -> Self {
        Self {
            eligible: Eligibility::Eligible,
            unmet_rules: Vec::new(),
        }
    }
}

/// Evaluate every rule attached to a benefit and combine the outcomes.
///
/// An empty rule set means universal eligibility. Any hard failure dominates
/// the verdict; absent failures, any indeterminate rule leaves the verdict
/// indeterminate. `unmet_rules` keeps the labels of failing and indeterminate
/// rules in input order so the member sees everything still blocking them.
pub fn evaluate_eligibility(
    rules: &[EligibilityRule],
    attrs: &BTreeMap<String, String>,
    today: NaiveDate,
) -> EligibilityResult {
    if rules.is_empty() {
        return EligibilityResult::eligible();
    }

    let mut any_failed = false;
    let mut any_unknown = false;
    let mut unmet_rules = Vec::new();

    for rule in rules {
        match evaluate_rule(rule, attrs, today) {
            Eligibility::Eligible => {}
            Eligibility::Ineligible => {
                any_failed = true;
                unmet_rules.push(rule.label.clone());
            }
            Eligibility::Unknown => {
                any_unknown = true;
                unmet_rules.push(rule.label.clone());
            }
        }
    }

    let eligible = if any_failed {
        Eligibility::Ineligible
    } else if any_unknown {
        Eligibility::Unknown
    } else {
        Eligibility::Eligible
    };

    EligibilityResult {
        eligible,
        unmet_rules,
    }
}
