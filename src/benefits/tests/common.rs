use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::response::Response;
use chrono::{NaiveDate, Utc};
use serde_json::Value;

use crate::benefits::domain::{
    AgreementId, Benefit, BenefitCategory, BenefitId, BenefitPeriod, EligibilityRule, RuleId,
    RuleOperator, UnitType, UsageLog, UsageLogId, UserId,
};
use crate::benefits::memory::MemoryStore;
use crate::benefits::period::UsageWindow;
use crate::benefits::repository::{
    AttributeStore, BenefitCatalog, StoreError, UsageFilter, UsageLedger,
};
use crate::benefits::router::benefits_router;
use crate::benefits::service::BenefitUsageService;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

pub(super) fn rule(key: &str, operator: RuleOperator, value: &str, label: &str) -> EligibilityRule {
    EligibilityRule {
        id: RuleId(format!("rule-{key}-{}", operator.as_str())),
        benefit_id: BenefitId("ben-1".to_string()),
        key: key.to_string(),
        operator,
        value: value.to_string(),
        label: label.to_string(),
        updated_at: Utc::now(),
    }
}

pub(super) fn benefit(
    id: &str,
    name: &str,
    limit_amount: Option<f64>,
    period: BenefitPeriod,
    sort_order: i64,
) -> Benefit {
    Benefit {
        id: BenefitId(id.to_string()),
        agreement_id: AgreementId("agr-1".to_string()),
        name: name.to_string(),
        description: None,
        category: BenefitCategory::Leave,
        unit_type: UnitType::Days,
        limit_amount,
        period,
        sort_order,
    }
}

pub(super) fn member() -> UserId {
    UserId("member-42".to_string())
}

/// Store with one agreement the test member has joined; benefits are added
/// per test.
pub(super) fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.upsert_agreement(AgreementId("agr-1".to_string()), "Test Agreement");
    store.join_agreement(member(), AgreementId("agr-1".to_string()));
    store
}

pub(super) type MemoryService = BenefitUsageService<MemoryStore, MemoryStore, MemoryStore>;

pub(super) fn build_service(store: &MemoryStore) -> MemoryService {
    BenefitUsageService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    )
}

pub(super) fn benefits_router_with_service(service: MemoryService) -> axum::Router {
    benefits_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Store double whose every operation fails, for propagation tests.
pub(super) struct UnavailableStore;

impl UnavailableStore {
    fn unavailable<T>() -> Result<T, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

impl AttributeStore for UnavailableStore {
    fn attributes_for(&self, _user: &UserId) -> Result<BTreeMap<String, String>, StoreError> {
        Self::unavailable()
    }

    fn upsert_attributes(
        &self,
        _user: &UserId,
        _attrs: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        Self::unavailable()
    }
}

impl BenefitCatalog for UnavailableStore {
    fn accessible_benefits(
        &self,
        _user: &UserId,
    ) -> Result<Vec<crate::benefits::domain::AccessibleBenefit>, StoreError> {
        Self::unavailable()
    }

    fn has_benefit_access(&self, _user: &UserId, _benefit: &BenefitId) -> Result<bool, StoreError> {
        Self::unavailable()
    }

    fn rules_for_benefit(&self, _benefit: &BenefitId) -> Result<Vec<EligibilityRule>, StoreError> {
        Self::unavailable()
    }

    fn rules_for_benefits(
        &self,
        _benefits: &[BenefitId],
    ) -> Result<BTreeMap<BenefitId, Vec<EligibilityRule>>, StoreError> {
        Self::unavailable()
    }

    fn insert_rule(&self, _rule: EligibilityRule) -> Result<EligibilityRule, StoreError> {
        Self::unavailable()
    }

    fn delete_rule(&self, _rule: &RuleId, _benefit: &BenefitId) -> Result<(), StoreError> {
        Self::unavailable()
    }
}

impl UsageLedger for UnavailableStore {
    fn record(&self, _log: UsageLog) -> Result<UsageLog, StoreError> {
        Self::unavailable()
    }

    fn sum_in_window(
        &self,
        _user: &UserId,
        _benefit: &BenefitId,
        _window: &UsageWindow,
    ) -> Result<f64, StoreError> {
        Self::unavailable()
    }

    fn logs_for_user(
        &self,
        _user: &UserId,
        _filter: &UsageFilter,
    ) -> Result<Vec<UsageLog>, StoreError> {
        Self::unavailable()
    }

    fn delete(&self, _id: &UsageLogId, _user: &UserId) -> Result<UsageLog, StoreError> {
        Self::unavailable()
    }
}

/// Attribute store wrapper counting lookups, to assert the summary builder
/// fetches the snapshot once per request.
#[derive(Clone)]
pub(super) struct CountingAttributes {
    pub(super) inner: MemoryStore,
    pub(super) lookups: Arc<AtomicUsize>,
}

impl CountingAttributes {
    pub(super) fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            lookups: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl AttributeStore for CountingAttributes {
    fn attributes_for(&self, user: &UserId) -> Result<BTreeMap<String, String>, StoreError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        self.inner.attributes_for(user)
    }

    fn upsert_attributes(
        &self,
        user: &UserId,
        attrs: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        self.inner.upsert_attributes(user, attrs)
    }
}
