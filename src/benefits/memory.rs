//! Mutex-guarded in-memory store backing the binary and the test suites.
//! Production deployments substitute a database-backed implementation of the
//! same traits.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use super::domain::{
    AccessibleBenefit, AgreementId, Benefit, BenefitId, EligibilityRule, RuleId, UsageLog,
    UsageLogId, UserId,
};
use super::period::UsageWindow;
use super::repository::{
    AttributeStore, BenefitCatalog, StoreError, UsageFilter, UsageLedger,
};

#[derive(Default)]
struct MemoryState {
    attributes: BTreeMap<UserId, BTreeMap<String, String>>,
    agreement_titles: BTreeMap<AgreementId, String>,
    memberships: BTreeMap<UserId, BTreeSet<AgreementId>>,
    benefits: Vec<Benefit>,
    rules: Vec<EligibilityRule>,
    logs: Vec<UsageLog>,
}

/// Single-process store implementing every collaborator trait.
#[derive(Default, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_agreement(&self, id: AgreementId, title: impl Into<String>) {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.agreement_titles.insert(id, title.into());
    }

    pub fn join_agreement(&self, user: UserId, agreement: AgreementId) {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.memberships.entry(user).or_default().insert(agreement);
    }

    pub fn add_benefit(&self, benefit: Benefit) {
        let mut state = self.state.lock().expect("store mutex poisoned");
        state.benefits.push(benefit);
    }
}

impl AttributeStore for MemoryStore {
    fn attributes_for(&self, user: &UserId) -> Result<BTreeMap<String, String>, StoreError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state.attributes.get(user).cloned().unwrap_or_default())
    }

    fn upsert_attributes(
        &self,
        user: &UserId,
        attrs: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let profile = state.attributes.entry(user.clone()).or_default();
        for (key, value) in attrs {
            profile.insert(key, value);
        }
        Ok(())
    }
}

impl BenefitCatalog for MemoryStore {
    fn accessible_benefits(&self, user: &UserId) -> Result<Vec<AccessibleBenefit>, StoreError> {
        let state = self.state.lock().expect("store mutex poisoned");
        let joined = match state.memberships.get(user) {
            Some(agreements) => agreements,
            None => return Ok(Vec::new()),
        };

        let mut rows: Vec<AccessibleBenefit> = state
            .benefits
            .iter()
            .filter(|benefit| joined.contains(&benefit.agreement_id))
            .map(|benefit| AccessibleBenefit {
                agreement_title: state
                    .agreement_titles
                    .get(&benefit.agreement_id)
                    .cloned()
                    .unwrap_or_default(),
                benefit: benefit.clone(),
            })
            .collect();

        rows.sort_by(|a, b| {
            a.agreement_title
                .cmp(&b.agreement_title)
                .then(a.benefit.sort_order.cmp(&b.benefit.sort_order))
        });
        Ok(rows)
    }

    fn has_benefit_access(&self, user: &UserId, benefit: &BenefitId) -> Result<bool, StoreError> {
        let state = self.state.lock().expect("store mutex poisoned");
        let joined = match state.memberships.get(user) {
            Some(agreements) => agreements,
            None => return Ok(false),
        };
        Ok(state
            .benefits
            .iter()
            .any(|candidate| candidate.id == *benefit && joined.contains(&candidate.agreement_id)))
    }

    fn rules_for_benefit(&self, benefit: &BenefitId) -> Result<Vec<EligibilityRule>, StoreError> {
        let state = self.state.lock().expect("store mutex poisoned");
        let mut rules: Vec<EligibilityRule> = state
            .rules
            .iter()
            .filter(|rule| rule.benefit_id == *benefit)
            .cloned()
            .collect();
        rules.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        Ok(rules)
    }

    fn rules_for_benefits(
        &self,
        benefits: &[BenefitId],
    ) -> Result<BTreeMap<BenefitId, Vec<EligibilityRule>>, StoreError> {
        let mut map = BTreeMap::new();
        for benefit in benefits {
            let rules = self.rules_for_benefit(benefit)?;
            if !rules.is_empty() {
                map.insert(benefit.clone(), rules);
            }
        }
        Ok(map)
    }

    fn insert_rule(&self, rule: EligibilityRule) -> Result<EligibilityRule, StoreError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        if state.rules.iter().any(|existing| existing.id == rule.id) {
            return Err(StoreError::Conflict);
        }
        state.rules.push(rule.clone());
        Ok(rule)
    }

    fn delete_rule(&self, rule: &RuleId, benefit: &BenefitId) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let position = state
            .rules
            .iter()
            .position(|candidate| candidate.id == *rule && candidate.benefit_id == *benefit)
            .ok_or(StoreError::NotFound)?;
        state.rules.remove(position);
        Ok(())
    }
}

impl UsageLedger for MemoryStore {
    fn record(&self, log: UsageLog) -> Result<UsageLog, StoreError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        if state.logs.iter().any(|existing| existing.id == log.id) {
            return Err(StoreError::Conflict);
        }
        state.logs.push(log.clone());
        Ok(log)
    }

    fn sum_in_window(
        &self,
        user: &UserId,
        benefit: &BenefitId,
        window: &UsageWindow,
    ) -> Result<f64, StoreError> {
        let state = self.state.lock().expect("store mutex poisoned");
        Ok(state
            .logs
            .iter()
            .filter(|log| {
                log.user_id == *user && log.benefit_id == *benefit && window.contains(log.used_on)
            })
            .map(|log| log.amount)
            .sum())
    }

    fn logs_for_user(
        &self,
        user: &UserId,
        filter: &UsageFilter,
    ) -> Result<Vec<UsageLog>, StoreError> {
        let state = self.state.lock().expect("store mutex poisoned");
        let mut logs: Vec<UsageLog> = state
            .logs
            .iter()
            .filter(|log| log.user_id == *user)
            .filter(|log| {
                filter
                    .benefit_id
                    .as_ref()
                    .map_or(true, |benefit| log.benefit_id == *benefit)
            })
            .filter(|log| filter.from.map_or(true, |from| log.used_on >= from))
            .filter(|log| filter.to.map_or(true, |to| log.used_on <= to))
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.used_on.cmp(&a.used_on));
        Ok(logs)
    }

    fn delete(&self, id: &UsageLogId, user: &UserId) -> Result<UsageLog, StoreError> {
        let mut state = self.state.lock().expect("store mutex poisoned");
        let position = state
            .logs
            .iter()
            .position(|log| log.id == *id && log.user_id == *user)
            .ok_or(StoreError::NotFound)?;
        Ok(state.logs.remove(position))
    }
}
