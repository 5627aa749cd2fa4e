use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use union_benefits::benefits::{
    benefits_router, AgreementId, Benefit, BenefitCategory, BenefitId, BenefitPeriod,
    BenefitUsageService, Eligibility, MemoryStore, RuleDraft, RuleOperator, UnitType, UsageDraft,
    UserId, TENURE_KEY,
};
use union_benefits::config::Settings;
use union_benefits::error::AppError;
use union_benefits::telemetry;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Union Benefits Tracker",
    about = "Track contractual benefit usage and member eligibility from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Render a member's benefit usage summary from seeded demo data
    Summary(SummaryArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured listen address, e.g. 0.0.0.0:8080
    #[arg(long)]
    listen: Option<SocketAddr>,
}

#[derive(Args, Debug)]
struct SummaryArgs {
    /// Member to summarize (defaults to the seeded demo member)
    #[arg(long, default_value = "member-001")]
    user: String,
    /// Evaluation date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    as_of: Option<NaiveDate>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Summary(args) => run_summary(args),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

async fn run_server(args: ServeArgs) -> Result<(), AppError> {
    let mut settings = Settings::from_env()?;
    if let Some(listen) = args.listen {
        settings.listen = listen;
    }

    telemetry::init(&settings)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let store = if settings.seed_demo {
        Arc::new(seed_demo_store()?)
    } else {
        Arc::new(MemoryStore::new())
    };
    let service = Arc::new(BenefitUsageService::new(
        store.clone(),
        store.clone(),
        store,
    ));

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(benefits_router(service))
        .layer(prometheus_layer);

    let listener = tokio::net::TcpListener::bind(settings.listen).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?settings.mode,
        listen = %settings.listen,
        seed_demo = settings.seed_demo,
        "benefit tracker ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_summary(args: SummaryArgs) -> Result<(), AppError> {
    let SummaryArgs { user, as_of } = args;
    let today = as_of.unwrap_or_else(|| Local::now().date_naive());

    let store = Arc::new(seed_demo_store()?);
    let service = BenefitUsageService::new(store.clone(), store.clone(), store);

    let user = UserId(user);
    let summaries = service.usage_summaries(&user, today)?;

    println!("Benefit usage summary for {} as of {}", user.0, today);
    if summaries.is_empty() {
        println!("No accessible benefits (member has not joined any agreement)");
        return Ok(());
    }

    let mut current_agreement = None;
    for row in &summaries {
        if current_agreement != Some(&row.agreement_title) {
            println!("\n{}", row.agreement_title);
            current_agreement = Some(&row.agreement_title);
        }

        let cap = match (row.limit_amount, row.remaining) {
            (Some(limit), Some(remaining)) => {
                format!("{}/{} remaining ({})", remaining, limit, row.period.label())
            }
            _ => format!("uncapped ({})", row.period.label()),
        };
        let verdict = match row.eligible {
            Eligibility::Eligible => "eligible".to_string(),
            Eligibility::Ineligible => format!("not eligible: {}", row.unmet_rules.join("; ")),
            Eligibility::Unknown => {
                format!("complete your profile: {}", row.unmet_rules.join("; "))
            }
        };
        println!(
            "- {} | used {} {:?} | {} | {}",
            row.benefit_name, row.total_used, row.unit_type, cap, verdict
        );
    }

    Ok(())
}

/// Seed a store with one agreement and a joined demo member so the service
/// and the summary command have data to work against out of the box.
fn seed_demo_store() -> Result<MemoryStore, AppError> {
    let store = MemoryStore::new();

    let agreement = AgreementId("agr-metro-2024".to_string());
    store.upsert_agreement(agreement.clone(), "Metro Transit Collective Agreement 2024");

    let member = UserId("member-001".to_string());
    store.join_agreement(member.clone(), agreement.clone());

    store.add_benefit(Benefit {
        id: BenefitId("ben-sick-leave".to_string()),
        agreement_id: agreement.clone(),
        name: "Sick Leave".to_string(),
        description: Some("Paid personal leave for illness or injury".to_string()),
        category: BenefitCategory::Leave,
        unit_type: UnitType::Days,
        limit_amount: Some(15.0),
        period: BenefitPeriod::PerYear,
        sort_order: 1,
    });
    store.add_benefit(Benefit {
        id: BenefitId("ben-prof-dev".to_string()),
        agreement_id: agreement.clone(),
        name: "Professional Development Fund".to_string(),
        description: Some("Annual allowance for accredited training".to_string()),
        category: BenefitCategory::ProfessionalDevelopment,
        unit_type: UnitType::Dollars,
        limit_amount: Some(1200.0),
        period: BenefitPeriod::PerYear,
        sort_order: 2,
    });
    store.add_benefit(Benefit {
        id: BenefitId("ben-meal-allowance".to_string()),
        agreement_id: agreement,
        name: "Overtime Meal Allowance".to_string(),
        description: None,
        category: BenefitCategory::Pay,
        unit_type: UnitType::Dollars,
        limit_amount: Some(120.0),
        period: BenefitPeriod::PerMonth,
        sort_order: 3,
    });

    let service = BenefitUsageService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    );

    service.update_attributes(
        &member,
        [
            ("start_date".to_string(), "2023-02-15".to_string()),
            ("employment_type".to_string(), "permanent".to_string()),
        ]
        .into_iter()
        .collect(),
    )?;

    service.add_rule(
        &BenefitId("ben-sick-leave".to_string()),
        RuleDraft {
            key: TENURE_KEY.to_string(),
            operator: RuleOperator::Gte,
            value: "6".to_string(),
            label: "6+ months tenure required".to_string(),
        },
    )?;
    service.add_rule(
        &BenefitId("ben-prof-dev".to_string()),
        RuleDraft {
            key: "employment_type".to_string(),
            operator: RuleOperator::Eq,
            value: "permanent".to_string(),
            label: "Permanent employees only".to_string(),
        },
    )?;

    service.log_usage(
        &member,
        UsageDraft {
            benefit_id: BenefitId("ben-sick-leave".to_string()),
            amount: 2.0,
            used_on: Local::now().date_naive(),
            note: Some("Flu".to_string()),
        },
    )?;

    Ok(store)
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
