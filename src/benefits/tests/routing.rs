use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::benefits::domain::{BenefitId, BenefitPeriod, RuleOperator, TENURE_KEY};
use crate::benefits::memory::MemoryStore;
use crate::benefits::router;
use crate::benefits::service::{BenefitUsageService, RuleDraft, UsageDraft};

fn summary_fixture() -> (MemoryStore, MemoryService) {
    let store = seeded_store();
    store.add_benefit(benefit("ben-sick", "Sick Leave", Some(15.0), BenefitPeriod::PerYear, 1));
    let service = build_service(&store);

    service
        .add_rule(
            &BenefitId("ben-sick".to_string()),
            RuleDraft {
                key: TENURE_KEY.to_string(),
                operator: RuleOperator::Gte,
                value: "6".to_string(),
                label: "6+ months tenure required".to_string(),
            },
        )
        .expect("rule persists");

    (store, service)
}

fn json_request(method: &str, uri: &str, payload: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).expect("payload encodes")))
        .expect("request builds")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn summary_endpoint_reports_totals_and_boolean_verdicts() {
    let (_store, service) = summary_fixture();
    service
        .update_attributes(
            &member(),
            [("start_date".to_string(), "2023-02-15".to_string())]
                .into_iter()
                .collect(),
        )
        .expect("attributes persist");
    service
        .log_usage(
            &member(),
            UsageDraft {
                benefit_id: BenefitId("ben-sick".to_string()),
                amount: 5.0,
                used_on: date(2024, 2, 1),
                note: None,
            },
        )
        .expect("current-year usage records");
    service
        .log_usage(
            &member(),
            UsageDraft {
                benefit_id: BenefitId("ben-sick".to_string()),
                amount: 4.0,
                used_on: date(2023, 12, 20),
                note: None,
            },
        )
        .expect("prior-year usage records");

    let router = benefits_router_with_service(service);
    let response = router
        .oneshot(get_request(
            "/api/v1/members/member-42/usage-summary?as_of=2024-06-01",
        ))
        .await
        .expect("request routes");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let row = &body["data"][0];
    assert_eq!(row["benefit_id"], json!("ben-sick"));
    assert_eq!(row["total_used"], json!(5.0));
    assert_eq!(row["remaining"], json!(10.0));
    assert_eq!(row["eligible"], json!(true));
    assert_eq!(row["unmet_rules"], json!([]));
}

#[tokio::test]
async fn summary_endpoint_reports_indeterminate_verdicts_as_a_string() {
    let (_store, service) = summary_fixture();

    let router = benefits_router_with_service(service);
    let response = router
        .oneshot(get_request(
            "/api/v1/members/member-42/usage-summary?as_of=2024-06-01",
        ))
        .await
        .expect("request routes");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let row = &body["data"][0];
    assert_eq!(row["eligible"], json!("unknown"));
    assert_eq!(row["unmet_rules"], json!(["6+ months tenure required"]));
}

#[tokio::test]
async fn completing_the_profile_flips_the_summary_verdict() {
    let (_store, service) = summary_fixture();
    let router = benefits_router_with_service(service);

    let put = router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/v1/members/member-42/attributes",
            &json!({ "start_date": "2023-02-15" }),
        ))
        .await
        .expect("request routes");
    assert_eq!(put.status(), StatusCode::NO_CONTENT);

    let response = router
        .oneshot(get_request(
            "/api/v1/members/member-42/usage-summary?as_of=2024-06-01",
        ))
        .await
        .expect("request routes");
    let body = read_json_body(response).await;
    assert_eq!(body["data"][0]["eligible"], json!(true));
}

#[tokio::test]
async fn logging_usage_returns_the_stored_entry() {
    let store = seeded_store();
    store.add_benefit(benefit("ben-sick", "Sick Leave", Some(15.0), BenefitPeriod::PerYear, 1));
    let service = Arc::new(build_service(&store));

    let draft = UsageDraft {
        benefit_id: BenefitId("ben-sick".to_string()),
        amount: 2.5,
        used_on: date(2024, 3, 1),
        note: Some("Dental".to_string()),
    };
    let response = router::log_usage_handler::<MemoryStore, MemoryStore, MemoryStore>(
        State(service),
        Path("member-42".to_string()),
        axum::Json(draft),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["data"]["amount"], json!(2.5));
    assert_eq!(body["data"]["note"], json!("Dental"));
}

#[tokio::test]
async fn invalid_usage_amounts_are_unprocessable() {
    let store = seeded_store();
    store.add_benefit(benefit("ben-sick", "Sick Leave", Some(15.0), BenefitPeriod::PerYear, 1));
    let service = Arc::new(build_service(&store));

    let draft = UsageDraft {
        benefit_id: BenefitId("ben-sick".to_string()),
        amount: -1.0,
        used_on: date(2024, 3, 1),
        note: None,
    };
    let response = router::log_usage_handler::<MemoryStore, MemoryStore, MemoryStore>(
        State(service),
        Path("member-42".to_string()),
        axum::Json(draft),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn usage_against_an_unreachable_benefit_is_not_found() {
    let store = seeded_store();
    let service = Arc::new(build_service(&store));

    let draft = UsageDraft {
        benefit_id: BenefitId("ben-missing".to_string()),
        amount: 1.0,
        used_on: date(2024, 3, 1),
        note: None,
    };
    let response = router::log_usage_handler::<MemoryStore, MemoryStore, MemoryStore>(
        State(service),
        Path("member-42".to_string()),
        axum::Json(draft),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rule_creation_validates_the_draft() {
    let store = seeded_store();
    let service = Arc::new(build_service(&store));

    let valid = RuleDraft {
        key: "employment_type".to_string(),
        operator: RuleOperator::Eq,
        value: "permanent".to_string(),
        label: "Permanent employees only".to_string(),
    };
    let created = router::add_rule_handler::<MemoryStore, MemoryStore, MemoryStore>(
        State(service.clone()),
        Path("ben-sick".to_string()),
        axum::Json(valid),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = read_json_body(created).await;
    assert_eq!(body["data"]["label"], json!("Permanent employees only"));

    let blank_label = RuleDraft {
        key: "employment_type".to_string(),
        operator: RuleOperator::Eq,
        value: "permanent".to_string(),
        label: "   ".to_string(),
    };
    let rejected = router::add_rule_handler::<MemoryStore, MemoryStore, MemoryStore>(
        State(service),
        Path("ben-sick".to_string()),
        axum::Json(blank_label),
    )
    .await;
    assert_eq!(rejected.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn deleting_a_missing_rule_is_not_found() {
    let store = seeded_store();
    let service = Arc::new(build_service(&store));

    let response = router::delete_rule_handler::<MemoryStore, MemoryStore, MemoryStore>(
        State(service),
        Path(("ben-sick".to_string(), "rule-999999".to_string())),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rule_listing_round_trips_through_the_router() {
    let store = seeded_store();
    let service = build_service(&store);
    service
        .add_rule(
            &BenefitId("ben-sick".to_string()),
            RuleDraft {
                key: "employment_type".to_string(),
                operator: RuleOperator::Eq,
                value: "permanent".to_string(),
                label: "Permanent employees only".to_string(),
            },
        )
        .expect("rule persists");

    let router = benefits_router_with_service(service);
    let response = router
        .oneshot(get_request("/api/v1/benefits/ben-sick/eligibility-rules"))
        .await
        .expect("request routes");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["data"][0]["operator"], json!("eq"));
    assert_eq!(body["data"][0]["key"], json!("employment_type"));
}

#[tokio::test]
async fn usage_history_endpoint_applies_query_filters() {
    let store = seeded_store();
    store.add_benefit(benefit("ben-sick", "Sick Leave", Some(15.0), BenefitPeriod::PerYear, 1));
    store.add_benefit(benefit("ben-other", "Annual Leave", None, BenefitPeriod::Unlimited, 2));
    let service = build_service(&store);

    for (benefit_id, amount, day) in [("ben-sick", 1.0, 10), ("ben-sick", 2.0, 20), ("ben-other", 3.0, 15)] {
        service
            .log_usage(
                &member(),
                UsageDraft {
                    benefit_id: BenefitId(benefit_id.to_string()),
                    amount,
                    used_on: date(2024, 3, day),
                    note: None,
                },
            )
            .expect("usage records");
    }

    let router = benefits_router_with_service(service);
    let response = router
        .oneshot(get_request(
            "/api/v1/members/member-42/usage?benefit_id=ben-sick&from=2024-03-01&to=2024-03-31",
        ))
        .await
        .expect("request routes");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let entries = body["data"].as_array().expect("data array");
    assert_eq!(entries.len(), 2);
    // Newest usage first.
    assert_eq!(entries[0]["used_on"], json!("2024-03-20"));
    assert_eq!(entries[1]["used_on"], json!("2024-03-10"));
}

#[tokio::test]
async fn usage_deletion_returns_the_removed_entry_once() {
    let store = seeded_store();
    store.add_benefit(benefit("ben-sick", "Sick Leave", Some(15.0), BenefitPeriod::PerYear, 1));
    let service = build_service(&store);
    let log = service
        .log_usage(
            &member(),
            UsageDraft {
                benefit_id: BenefitId("ben-sick".to_string()),
                amount: 2.0,
                used_on: date(2024, 3, 1),
                note: None,
            },
        )
        .expect("usage records");

    let router = benefits_router_with_service(service);
    let uri = format!("/api/v1/members/member-42/usage/{}", log.id.0);
    let delete = |uri: String| {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .expect("request builds")
    };

    let first = router
        .clone()
        .oneshot(delete(uri.clone()))
        .await
        .expect("request routes");
    assert_eq!(first.status(), StatusCode::OK);
    let body = read_json_body(first).await;
    assert_eq!(body["data"]["amount"], json!(2.0));

    let second = router.oneshot(delete(uri)).await.expect("request routes");
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn store_outages_surface_as_internal_errors() {
    let service = Arc::new(BenefitUsageService::new(
        Arc::new(UnavailableStore),
        Arc::new(UnavailableStore),
        Arc::new(UnavailableStore),
    ));

    let response = router::list_rules_handler::<UnavailableStore, UnavailableStore, UnavailableStore>(
        State(service),
        Path("ben-sick".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
