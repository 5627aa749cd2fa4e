//! Benefit eligibility and usage accounting engine.
//!
//! Rule evaluation is tri-state: incomplete profile data resolves to an
//! indeterminate verdict rather than a denial, and the member is told which
//! rules are still unmet. Usage totals are recomputed against the current
//! calendar window on every request so monthly and yearly caps reset on
//! their boundaries.

pub mod domain;
pub mod eligibility;
pub mod memory;
pub mod period;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AccessibleBenefit, AgreementId, Benefit, BenefitCategory, BenefitId, BenefitPeriod,
    Eligibility, EligibilityRule, RuleId, RuleOperator, RuleSubject, UnitType, UsageLog,
    UsageLogId, UsageSummary, UserId, START_DATE_KEY, TENURE_KEY,
};
pub use eligibility::{evaluate_eligibility, evaluate_rule, EligibilityResult};
pub use memory::MemoryStore;
pub use period::{usage_window, UsageWindow};
pub use repository::{AttributeStore, BenefitCatalog, StoreError, UsageFilter, UsageLedger};
pub use router::benefits_router;
pub use service::{
    BenefitServiceError, BenefitUsageService, RuleDraft, RuleValidationError, UsageDraft,
    UsageValidationError,
};
