use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use super::domain::{BenefitId, RuleId, UsageLogId, UserId};
use super::repository::{AttributeStore, BenefitCatalog, StoreError, UsageFilter, UsageLedger};
use super::service::{BenefitServiceError, BenefitUsageService, RuleDraft, UsageDraft};

/// Router builder exposing the member usage and rule administration
/// endpoints. Authentication and authorization live in front of this
/// service; the member id travels in the path.
pub fn benefits_router<A, C, U>(service: Arc<BenefitUsageService<A, C, U>>) -> Router
where
    A: AttributeStore + 'static,
    C: BenefitCatalog + 'static,
    U: UsageLedger + 'static,
{
    Router::new()
        .route(
            "/api/v1/members/:user_id/usage-summary",
            get(summary_handler::<A, C, U>),
        )
        .route(
            "/api/v1/members/:user_id/usage",
            post(log_usage_handler::<A, C, U>).get(usage_history_handler::<A, C, U>),
        )
        .route(
            "/api/v1/members/:user_id/usage/:usage_id",
            axum::routing::delete(delete_usage_handler::<A, C, U>),
        )
        .route(
            "/api/v1/members/:user_id/attributes",
            put(update_attributes_handler::<A, C, U>),
        )
        .route(
            "/api/v1/benefits/:benefit_id/eligibility-rules",
            get(list_rules_handler::<A, C, U>).post(add_rule_handler::<A, C, U>),
        )
        .route(
            "/api/v1/benefits/:benefit_id/eligibility-rules/:rule_id",
            axum::routing::delete(delete_rule_handler::<A, C, U>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryQuery {
    /// Override the evaluation date (defaults to today). Tenure and period
    /// windows are computed against this date.
    as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryQuery {
    benefit_id: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

fn service_error_response(error: BenefitServiceError) -> Response {
    let payload = json!({ "error": error.to_string() });
    let status = match &error {
        BenefitServiceError::InvalidRule(_) | BenefitServiceError::InvalidUsage(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        BenefitServiceError::BenefitNotAccessible => StatusCode::NOT_FOUND,
        BenefitServiceError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        BenefitServiceError::Store(StoreError::Conflict) => StatusCode::CONFLICT,
        BenefitServiceError::Store(StoreError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn summary_handler<A, C, U>(
    State(service): State<Arc<BenefitUsageService<A, C, U>>>,
    Path(user_id): Path<String>,
    Query(query): Query<SummaryQuery>,
) -> Response
where
    A: AttributeStore + 'static,
    C: BenefitCatalog + 'static,
    U: UsageLedger + 'static,
{
    let user = UserId(user_id);
    let today = query.as_of.unwrap_or_else(|| Local::now().date_naive());
    match service.usage_summaries(&user, today) {
        Ok(summaries) => (StatusCode::OK, axum::Json(json!({ "data": summaries }))).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn log_usage_handler<A, C, U>(
    State(service): State<Arc<BenefitUsageService<A, C, U>>>,
    Path(user_id): Path<String>,
    axum::Json(draft): axum::Json<UsageDraft>,
) -> Response
where
    A: AttributeStore + 'static,
    C: BenefitCatalog + 'static,
    U: UsageLedger + 'static,
{
    let user = UserId(user_id);
    match service.log_usage(&user, draft) {
        Ok(log) => (StatusCode::CREATED, axum::Json(json!({ "data": log }))).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn usage_history_handler<A, C, U>(
    State(service): State<Arc<BenefitUsageService<A, C, U>>>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response
where
    A: AttributeStore + 'static,
    C: BenefitCatalog + 'static,
    U: UsageLedger + 'static,
{
    let user = UserId(user_id);
    let filter = UsageFilter {
        benefit_id: query.benefit_id.map(BenefitId),
        from: query.from,
        to: query.to,
    };
    match service.usage_history(&user, &filter) {
        Ok(logs) => (StatusCode::OK, axum::Json(json!({ "data": logs }))).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn delete_usage_handler<A, C, U>(
    State(service): State<Arc<BenefitUsageService<A, C, U>>>,
    Path((user_id, usage_id)): Path<(String, String)>,
) -> Response
where
    A: AttributeStore + 'static,
    C: BenefitCatalog + 'static,
    U: UsageLedger + 'static,
{
    let user = UserId(user_id);
    match service.delete_usage(&user, &UsageLogId(usage_id)) {
        Ok(log) => (StatusCode::OK, axum::Json(json!({ "data": log }))).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn update_attributes_handler<A, C, U>(
    State(service): State<Arc<BenefitUsageService<A, C, U>>>,
    Path(user_id): Path<String>,
    axum::Json(attrs): axum::Json<BTreeMap<String, String>>,
) -> Response
where
    A: AttributeStore + 'static,
    C: BenefitCatalog + 'static,
    U: UsageLedger + 'static,
{
    let user = UserId(user_id);
    match service.update_attributes(&user, attrs) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn list_rules_handler<A, C, U>(
    State(service): State<Arc<BenefitUsageService<A, C, U>>>,
    Path(benefit_id): Path<String>,
) -> Response
where
    A: AttributeStore + 'static,
    C: BenefitCatalog + 'static,
    U: UsageLedger + 'static,
{
    match service.rules_for_benefit(&BenefitId(benefit_id)) {
        Ok(rules) => (StatusCode::OK, axum::Json(json!({ "data": rules }))).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn add_rule_handler<A, C, U>(
    State(service): State<Arc<BenefitUsageService<A, C, U>>>,
    Path(benefit_id): Path<String>,
    axum::Json(draft): axum::Json<RuleDraft>,
) -> Response
where
    A: AttributeStore + 'static,
    C: BenefitCatalog + 'static,
    U: UsageLedger + 'static,
{
    match service.add_rule(&BenefitId(benefit_id), draft) {
        Ok(rule) => (StatusCode::CREATED, axum::Json(json!({ "data": rule }))).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn delete_rule_handler<A, C, U>(
    State(service): State<Arc<BenefitUsageService<A, C, U>>>,
    Path((benefit_id, rule_id)): Path<(String, String)>,
) -> Response
where
    A: AttributeStore + 'static,
    C: BenefitCatalog + 'static,
    U: UsageLedger + 'static,
{
    match service.delete_rule(&RuleId(rule_id), &BenefitId(benefit_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => service_error_response(error),
    }
}
