use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    BenefitId, EligibilityRule, RuleId, RuleOperator, UsageLog, UsageLogId, UsageSummary, UserId,
};
use super::eligibility::evaluate_eligibility;
use super::period::usage_window;
use super::repository::{AttributeStore, BenefitCatalog, StoreError, UsageFilter, UsageLedger};

const MAX_RULE_KEY_CHARS: usize = 100;
const MAX_RULE_VALUE_CHARS: usize = 200;
const MAX_RULE_LABEL_CHARS: usize = 300;
const MAX_NOTE_CHARS: usize = 1000;
const MAX_USAGE_AMOUNT: f64 = 999_999.0;

/// Service composing the attribute store, benefit catalog, and usage ledger.
pub struct BenefitUsageService<A, C, U> {
    attributes: Arc<A>,
    catalog: Arc<C>,
    ledger: Arc<U>,
}

static RULE_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static USAGE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_rule_id() -> RuleId {
    let id = RULE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RuleId(format!("rule-{id:06}"))
}

fn next_usage_id() -> UsageLogId {
    let id = USAGE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    UsageLogId(format!("usage-{id:06}"))
}

/// Administrator-supplied rule fields. The operator is already a member of
/// the closed enum by the time a draft exists; only length bounds remain to
/// check here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDraft {
    pub key: String,
    pub operator: RuleOperator,
    pub value: String,
    pub label: String,
}

impl RuleDraft {
    fn validate(&self) -> Result<(), RuleValidationError> {
        if self.key.trim().is_empty() {
            return Err(RuleValidationError::EmptyKey);
        }
        if self.key.chars().count() > MAX_RULE_KEY_CHARS {
            return Err(RuleValidationError::KeyTooLong);
        }
        if self.value.trim().is_empty() {
            return Err(RuleValidationError::EmptyValue);
        }
        if self.value.chars().count() > MAX_RULE_VALUE_CHARS {
            return Err(RuleValidationError::ValueTooLong);
        }
        if self.label.trim().is_empty() {
            return Err(RuleValidationError::EmptyLabel);
        }
        if self.label.chars().count() > MAX_RULE_LABEL_CHARS {
            return Err(RuleValidationError::LabelTooLong);
        }
        Ok(())
    }
}

/// Member-supplied usage entry before validation and access checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageDraft {
    pub benefit_id: BenefitId,
    pub amount: f64,
    pub used_on: NaiveDate,
    #[serde(default)]
    pub note: Option<String>,
}

impl UsageDraft {
    fn validate(&self) -> Result<(), UsageValidationError> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(UsageValidationError::NonPositiveAmount);
        }
        if self.amount > MAX_USAGE_AMOUNT {
            return Err(UsageValidationError::AmountTooLarge);
        }
        if let Some(note) = &self.note {
            if note.chars().count() > MAX_NOTE_CHARS {
                return Err(UsageValidationError::NoteTooLong);
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuleValidationError {
    #[error("rule key must not be empty")]
    EmptyKey,
    #[error("rule key exceeds {} characters", MAX_RULE_KEY_CHARS)]
    KeyTooLong,
    #[error("rule value must not be empty")]
    EmptyValue,
    #[error("rule value exceeds {} characters", MAX_RULE_VALUE_CHARS)]
    ValueTooLong,
    #[error("rule label must not be empty")]
    EmptyLabel,
    #[error("rule label exceeds {} characters", MAX_RULE_LABEL_CHARS)]
    LabelTooLong,
}

#[derive(Debug, thiserror::Error)]
pub enum UsageValidationError {
    #[error("usage amount must be positive")]
    NonPositiveAmount,
    #[error("usage amount exceeds {}", MAX_USAGE_AMOUNT)]
    AmountTooLarge,
    #[error("usage note exceeds {} characters", MAX_NOTE_CHARS)]
    NoteTooLong,
}

/// Error raised by the benefit usage service.
#[derive(Debug, thiserror::Error)]
pub enum BenefitServiceError {
    #[error(transparent)]
    InvalidRule(#[from] RuleValidationError),
    #[error(transparent)]
    InvalidUsage(#[from] UsageValidationError),
    #[error("benefit is not reachable through the member's agreements")]
    BenefitNotAccessible,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<A, C, U> BenefitUsageService<A, C, U>
where
    A: AttributeStore + 'static,
    C: BenefitCatalog + 'static,
    U: UsageLedger + 'static,
{
    pub fn new(attributes: Arc<A>, catalog: Arc<C>, ledger: Arc<U>) -> Self {
        Self {
            attributes,
            catalog,
            ledger,
        }
    }

    /// Build the member-facing summary: one row per accessible benefit, with
    /// period-bounded usage totals and the current eligibility verdict.
    ///
    /// The attribute snapshot and the rule sets are fetched once per call and
    /// reused across every benefit so a single response is internally
    /// consistent. Store failures propagate unchanged.
    pub fn usage_summaries(
        &self,
        user: &UserId,
        today: NaiveDate,
    ) -> Result<Vec<UsageSummary>, BenefitServiceError> {
        let benefits = self.catalog.accessible_benefits(user)?;
        let benefit_ids: Vec<BenefitId> = benefits.iter().map(|row| row.benefit.id.clone()).collect();
        let rules_by_benefit = self.catalog.rules_for_benefits(&benefit_ids)?;
        let attrs = self.attributes.attributes_for(user)?;

        let mut summaries = Vec::with_capacity(benefits.len());
        for row in benefits {
            let window = usage_window(row.benefit.period, today);
            let total_used = self.ledger.sum_in_window(user, &row.benefit.id, &window)?;
            let remaining = row
                .benefit
                .limit_amount
                .map(|limit| (limit - total_used).max(0.0));

            let rules = rules_by_benefit
                .get(&row.benefit.id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let verdict = evaluate_eligibility(rules, &attrs, today);

            summaries.push(UsageSummary {
                benefit_id: row.benefit.id,
                benefit_name: row.benefit.name,
                benefit_description: row.benefit.description,
                category: row.benefit.category,
                unit_type: row.benefit.unit_type,
                limit_amount: row.benefit.limit_amount,
                period: row.benefit.period,
                agreement_id: row.benefit.agreement_id,
                agreement_title: row.agreement_title,
                total_used,
                remaining,
                eligible: verdict.eligible,
                unmet_rules: verdict.unmet_rules,
            });
        }

        Ok(summaries)
    }

    pub fn rules_for_benefit(
        &self,
        benefit: &BenefitId,
    ) -> Result<Vec<EligibilityRule>, BenefitServiceError> {
        Ok(self.catalog.rules_for_benefit(benefit)?)
    }

    /// Validate and persist a new rule for a benefit.
    pub fn add_rule(
        &self,
        benefit: &BenefitId,
        draft: RuleDraft,
    ) -> Result<EligibilityRule, BenefitServiceError> {
        draft.validate()?;

        let rule = EligibilityRule {
            id: next_rule_id(),
            benefit_id: benefit.clone(),
            key: draft.key,
            operator: draft.operator,
            value: draft.value,
            label: draft.label,
            updated_at: Utc::now(),
        };
        Ok(self.catalog.insert_rule(rule)?)
    }

    /// Delete a rule. Requires the owning benefit id alongside the rule id.
    pub fn delete_rule(
        &self,
        rule: &RuleId,
        benefit: &BenefitId,
    ) -> Result<(), BenefitServiceError> {
        Ok(self.catalog.delete_rule(rule, benefit)?)
    }

    /// Record usage against a benefit the member can reach. Amounts above the
    /// benefit's cap are accepted; caps are advisory and only affect the
    /// remaining figure shown in summaries.
    pub fn log_usage(
        &self,
        user: &UserId,
        draft: UsageDraft,
    ) -> Result<UsageLog, BenefitServiceError> {
        draft.validate()?;

        if !self.catalog.has_benefit_access(user, &draft.benefit_id)? {
            return Err(BenefitServiceError::BenefitNotAccessible);
        }

        let log = UsageLog {
            id: next_usage_id(),
            user_id: user.clone(),
            benefit_id: draft.benefit_id,
            amount: draft.amount,
            used_on: draft.used_on,
            note: draft.note,
        };
        Ok(self.ledger.record(log)?)
    }

    pub fn usage_history(
        &self,
        user: &UserId,
        filter: &UsageFilter,
    ) -> Result<Vec<UsageLog>, BenefitServiceError> {
        Ok(self.ledger.logs_for_user(user, filter)?)
    }

    pub fn delete_usage(
        &self,
        user: &UserId,
        id: &UsageLogId,
    ) -> Result<UsageLog, BenefitServiceError> {
        Ok(self.ledger.delete(id, user)?)
    }

    pub fn update_attributes(
        &self,
        user: &UserId,
        attrs: BTreeMap<String, String>,
    ) -> Result<(), BenefitServiceError> {
        Ok(self.attributes.upsert_attributes(user, attrs)?)
    }
}
