use chrono::{DateTime, NaiveDate, Utc};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Reserved rule key whose value is derived from the `start_date` attribute
/// rather than stored on the member's profile.
pub const TENURE_KEY: &str = "tenure_months";

/// Profile attribute holding the member's employment start date (YYYY-MM-DD).
pub const START_DATE_KEY: &str = "start_date";

/// Identifier wrapper for union members.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for benefits extracted from an agreement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BenefitId(pub String);

/// Identifier wrapper for eligibility rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub String);

/// Identifier wrapper for collective agreements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgreementId(pub String);

/// Identifier wrapper for recorded usage entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageLogId(pub String);

/// Comparison operators permitted in eligibility rules. Closed enumeration:
/// anything outside this set is rejected at the boundary, and the evaluator
/// still degrades to an indeterminate result if an unsupported combination
/// reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleOperator {
    Gte,
    Lte,
    Eq,
    Neq,
    Contains,
}

impl RuleOperator {
    pub const fn as_str(self) -> &'static str {
        match self {
            RuleOperator::Gte => "gte",
            RuleOperator::Lte => "lte",
            RuleOperator::Eq => "eq",
            RuleOperator::Neq => "neq",
            RuleOperator::Contains => "contains",
        }
    }
}

/// A single condition gating access to a benefit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityRule {
    pub id: RuleId,
    pub benefit_id: BenefitId,
    pub key: String,
    pub operator: RuleOperator,
    pub value: String,
    pub label: String,
    pub updated_at: DateTime<Utc>,
}

impl EligibilityRule {
    /// Discriminates the derived tenure rule from plain attribute rules so
    /// the evaluator can match exhaustively instead of string-comparing keys
    /// at every call site.
    pub fn subject(&self) -> RuleSubject<'_> {
        if self.key == TENURE_KEY {
            RuleSubject::Tenure
        } else {
            RuleSubject::Attribute(&self.key)
        }
    }
}

/// What an eligibility rule tests against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSubject<'a> {
    /// Whole months elapsed since the member's recorded start date.
    Tenure,
    /// A stored profile attribute, compared as text or number.
    Attribute(&'a str),
}

/// Recurring window over which a capped benefit's usage is accounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenefitPeriod {
    PerMonth,
    PerYear,
    PerOccurrence,
    Unlimited,
}

impl BenefitPeriod {
    pub const fn label(self) -> &'static str {
        match self {
            BenefitPeriod::PerMonth => "per_month",
            BenefitPeriod::PerYear => "per_year",
            BenefitPeriod::PerOccurrence => "per_occurrence",
            BenefitPeriod::Unlimited => "unlimited",
        }
    }
}

/// Unit a benefit's allowance is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    Hours,
    Days,
    Weeks,
    Dollars,
    Count,
}

/// Benefit categories recognized during agreement extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenefitCategory {
    Leave,
    Health,
    Financial,
    ProfessionalDevelopment,
    Workplace,
    Pay,
    Protection,
    Process,
    Other,
}

/// A contractual entitlement a member may draw against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benefit {
    pub id: BenefitId,
    pub agreement_id: AgreementId,
    pub name: String,
    pub description: Option<String>,
    pub category: BenefitCategory,
    pub unit_type: UnitType,
    /// `None` means the benefit is uncapped.
    pub limit_amount: Option<f64>,
    pub period: BenefitPeriod,
    pub sort_order: i64,
}

/// A benefit a member can reach through one of their joined agreements,
/// carrying the parent agreement title for display grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessibleBenefit {
    pub benefit: Benefit,
    pub agreement_title: String,
}

/// One recorded instance of a member consuming part of an allowance.
/// Amounts are always positive; there are no adjustment entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLog {
    pub id: UsageLogId,
    pub user_id: UserId,
    pub benefit_id: BenefitId,
    pub amount: f64,
    pub used_on: NaiveDate,
    pub note: Option<String>,
}

/// Tri-state eligibility verdict. Modeled as an explicit enum rather than a
/// nullable bool so callers must handle the indeterminate case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Ineligible,
    Unknown,
}

impl Eligibility {
    pub const fn is_met(self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

// Definite comparison outcomes map onto the two definite verdicts;
// indeterminacy never arises from a completed comparison.
impl From<bool> for Eligibility {
    fn from(met: bool) -> Self {
        if met {
            Eligibility::Eligible
        } else {
            Eligibility::Ineligible
        }
    }
}

// Wire format inherited from the member dashboard: `true`, `false`, or the
// string "unknown".
impl Serialize for Eligibility {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Eligibility::Eligible => serializer.serialize_bool(true),
            Eligibility::Ineligible => serializer.serialize_bool(false),
            Eligibility::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for Eligibility {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Ok(Eligibility::Eligible),
            Raw::Flag(false) => Ok(Eligibility::Ineligible),
            Raw::Text(text) if text == "unknown" => Ok(Eligibility::Unknown),
            Raw::Text(other) => Err(D::Error::custom(format!(
                "expected true, false, or \"unknown\", got \"{other}\""
            ))),
        }
    }
}

/// Member-facing summary row: one per accessible benefit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub benefit_id: BenefitId,
    pub benefit_name: String,
    pub benefit_description: Option<String>,
    pub category: BenefitCategory,
    pub unit_type: UnitType,
    pub limit_amount: Option<f64>,
    pub period: BenefitPeriod,
    pub agreement_id: AgreementId,
    pub agreement_title: String,
    pub total_used: f64,
    /// `max(0, limit - used)` when capped, `None` when uncapped.
    pub remaining: Option<f64>,
    pub eligible: Eligibility,
    pub unmet_rules: Vec<String>,
}
