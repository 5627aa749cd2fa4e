use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::domain::{
    AccessibleBenefit, BenefitId, EligibilityRule, RuleId, UsageLog, UsageLogId, UserId,
};
use super::period::UsageWindow;

/// Error enumeration for collaborator failures. Lookup misses are modeled as
/// empty results by the stores themselves; `NotFound` is reserved for
/// operations that target a specific record.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value profile attributes per member. Upserts overwrite by key.
pub trait AttributeStore: Send + Sync {
    fn attributes_for(&self, user: &UserId) -> Result<BTreeMap<String, String>, StoreError>;
    fn upsert_attributes(
        &self,
        user: &UserId,
        attrs: BTreeMap<String, String>,
    ) -> Result<(), StoreError>;
}

/// Benefits reachable through a member's joined agreements, plus the
/// eligibility rules attached to each benefit.
pub trait BenefitCatalog: Send + Sync {
    /// Benefits the member can access, ordered by agreement title then the
    /// benefit's sort order so summaries group deterministically.
    fn accessible_benefits(&self, user: &UserId) -> Result<Vec<AccessibleBenefit>, StoreError>;

    fn has_benefit_access(&self, user: &UserId, benefit: &BenefitId) -> Result<bool, StoreError>;

    /// Rules for one benefit, oldest first (`updated_at` ascending).
    fn rules_for_benefit(&self, benefit: &BenefitId) -> Result<Vec<EligibilityRule>, StoreError>;

    /// Batched form of [`Self::rules_for_benefit`] so a summary request does
    /// not fan out one lookup per benefit.
    fn rules_for_benefits(
        &self,
        benefits: &[BenefitId],
    ) -> Result<BTreeMap<BenefitId, Vec<EligibilityRule>>, StoreError>;

    fn insert_rule(&self, rule: EligibilityRule) -> Result<EligibilityRule, StoreError>;

    /// Deletion is scoped to the owning benefit; a rule id alone is not
    /// assumed globally unique.
    fn delete_rule(&self, rule: &RuleId, benefit: &BenefitId) -> Result<(), StoreError>;
}

/// Filters for a member's usage history listing. Bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageFilter {
    pub benefit_id: Option<BenefitId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Recorded benefit usage per member.
pub trait UsageLedger: Send + Sync {
    fn record(&self, log: UsageLog) -> Result<UsageLog, StoreError>;

    /// Sum of usage amounts for one member and benefit inside the window,
    /// zero when no logs exist.
    fn sum_in_window(
        &self,
        user: &UserId,
        benefit: &BenefitId,
        window: &UsageWindow,
    ) -> Result<f64, StoreError>;

    /// Member's logs matching the filter, newest usage date first.
    fn logs_for_user(&self, user: &UserId, filter: &UsageFilter)
        -> Result<Vec<UsageLog>, StoreError>;

    /// Remove one of the member's own logs, returning it. A log belonging to
    /// another member is indistinguishable from a missing one.
    fn delete(&self, id: &UsageLogId, user: &UserId) -> Result<UsageLog, StoreError>;
}
