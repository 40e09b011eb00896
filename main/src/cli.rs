//! Operational CLI (§6.1): `schedule`, `status`, `configure-source`,
//! `process-content`. The teacher's stack carries no CLI-parsing crate, so
//! this stays a thin hand-matched dispatcher over `std::env::args()` rather
//! than pulling one in ad hoc.
//!
//! Each subcommand builds its own short-lived set of pipeline services
//! against the configured database and dispatches exactly one command. The
//! in-memory `Scheduler` lives only as long as this process does (§4.2), so
//! a `schedule` call for a future `fire_at` registers the job but relies on
//! the long-running `worker` binary — which owns its own scheduler instance
//! against the same database — to actually fire it; see DESIGN.md.

mod nlp_heuristics;

use std::sync::Arc;

use bus::EventBus;
use common::error::AppError;
use common::ports::hash::Sha256Hasher;
use common::ports::source_adapter::AdapterRegistry;
use common::storage::db::SurrealDbClient;
use common::utils::config::get_config;
use ingestion_pipeline::commands::ConfigureSource;
use ingestion_pipeline::domain::{IngestionJob, SourceConfiguration};
use ingestion_pipeline::{commands::ScheduleJob, PipelineServices};
use refinement_pipeline::commands::RerefineContent;
use scheduler::Scheduler;

fn exit_code(err: &AppError) -> i32 {
    match err {
        AppError::Validation(_) => 2,
        AppError::Transient { .. } => 3,
        AppError::Concurrency { .. } => 3,
        _ => 1,
    }
}

fn fail(message: &str, code: i32) -> ! {
    eprintln!("{message}");
    std::process::exit(code);
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let Some(subcommand) = args.get(1) else {
        fail("usage: cli <schedule|status|configure-source|process-content> [options]", 1);
    };

    let config = match get_config() {
        Ok(config) => config,
        Err(err) => fail(&format!("config error: {err}"), 1),
    };

    let db = match SurrealDbClient::new(
        &config.surrealdb_address,
        &config.surrealdb_username,
        &config.surrealdb_password,
        &config.surrealdb_namespace,
        &config.surrealdb_database,
    )
    .await
    {
        Ok(db) => Arc::new(db),
        Err(err) => fail(&format!("database connection error: {err}"), 1),
    };
    if let Err(err) = db.ensure_initialized().await {
        fail(&format!("schema initialization error: {err}"), exit_code(&err));
    }

    let opts = parse_opts(&args[2..]);

    let result = match subcommand.as_str() {
        "schedule" => run_schedule(db, config, &opts).await,
        "status" => run_status(db, &opts).await,
        "configure-source" => run_configure_source(db, config, &opts).await,
        "process-content" => run_process_content(db, config, &opts).await,
        other => fail(&format!("unknown subcommand: {other}"), 1),
    };

    match result {
        Ok(message) => {
            println!("{message}");
            std::process::exit(0);
        }
        Err(err) => fail(&err.to_string(), exit_code(&err)),
    }
}

/// Parses `--key value` pairs; unrecognized flags are ignored rather than
/// rejected, keeping this a thin dispatcher rather than a validating parser.
fn parse_opts(args: &[String]) -> std::collections::HashMap<String, String> {
    let mut opts = std::collections::HashMap::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(key) = arg.strip_prefix("--") {
            if let Some(value) = iter.next() {
                opts.insert(key.to_string(), value.clone());
            }
        }
    }
    opts
}

fn require<'a>(opts: &'a std::collections::HashMap<String, String>, key: &str) -> Result<&'a str, AppError> {
    opts.get(key)
        .map(String::as_str)
        .ok_or_else(|| AppError::Validation(format!("missing required --{key}")))
}

fn ingestion_services(
    db: Arc<SurrealDbClient>,
    config: common::utils::config::AppConfig,
) -> PipelineServices {
    PipelineServices::new(
        db,
        Arc::new(EventBus::new()),
        Arc::new(AdapterRegistry::new()),
        Arc::new(Sha256Hasher),
        Scheduler::new(),
        config.retry,
        config.circuit_breaker,
        config.health,
        config.concurrency_retry,
    )
}

async fn run_schedule(
    db: Arc<SurrealDbClient>,
    config: common::utils::config::AppConfig,
    opts: &std::collections::HashMap<String, String>,
) -> Result<String, AppError> {
    let source_id = require(opts, "source-id")?.to_string();
    let fire_at = match opts.get("fire-at") {
        Some(raw) => chrono::DateTime::parse_from_rfc3339(raw)
            .map_err(|e| AppError::Validation(format!("invalid --fire-at: {e}")))?
            .with_timezone(&chrono::Utc),
        None => chrono::Utc::now(),
    };

    let services = ingestion_services(db, config);
    let command_bus = Arc::new(ingestion_pipeline::build_command_bus(&services));
    ingestion_pipeline::wire_saga(&services, command_bus.clone());

    let job_id = command_bus.execute(ScheduleJob { source_id, fire_at }).await?;

    if fire_at <= chrono::Utc::now() {
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
    }
    services.scheduler.cancel_all();

    Ok(format!("scheduled job {job_id} (fire_at={fire_at})"))
}

async fn run_status(
    db: Arc<SurrealDbClient>,
    opts: &std::collections::HashMap<String, String>,
) -> Result<String, AppError> {
    if let Some(job_id) = opts.get("job-id") {
        let job: IngestionJob = db
            .load_aggregate(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound { kind: "ingestion_job", id: job_id.clone() })?;
        return serde_json::to_string_pretty(&job).map_err(|e| AppError::Unknown(e.into()));
    }
    if let Some(source_id) = opts.get("source-id") {
        let source: SourceConfiguration = db
            .load_aggregate(source_id)
            .await?
            .ok_or_else(|| AppError::NotFound { kind: "source_configuration", id: source_id.clone() })?;
        return serde_json::to_string_pretty(&source).map_err(|e| AppError::Unknown(e.into()));
    }
    Err(AppError::Validation("status requires --job-id or --source-id".to_string()))
}

async fn run_configure_source(
    db: Arc<SurrealDbClient>,
    config: common::utils::config::AppConfig,
    opts: &std::collections::HashMap<String, String>,
) -> Result<String, AppError> {
    let source_id = require(opts, "source-id")?.to_string();
    let source_type = require(opts, "source-type")?.to_string();
    let name = require(opts, "name")?.to_string();
    let raw_config = opts.get("config").map(String::as_str).unwrap_or("{}");
    let parsed_config: serde_json::Value = serde_json::from_str(raw_config)
        .map_err(|e| AppError::Validation(format!("invalid --config JSON: {e}")))?;
    let credentials = opts
        .get("credentials")
        .map(|s| s.as_bytes().to_vec())
        .unwrap_or_default();

    let services = ingestion_services(db, config);
    let command_bus = ingestion_pipeline::build_command_bus(&services);
    command_bus
        .execute(ConfigureSource {
            source_id: source_id.clone(),
            source_type,
            name,
            config: parsed_config,
            credentials,
        })
        .await?;

    Ok(format!("configured source {source_id}"))
}

async fn run_process_content(
    db: Arc<SurrealDbClient>,
    config: common::utils::config::AppConfig,
    opts: &std::collections::HashMap<String, String>,
) -> Result<String, AppError> {
    let content_item_id = require(opts, "content-item-id")?.to_string();
    let reason = opts
        .get("reason")
        .cloned()
        .unwrap_or_else(|| "manual re-refinement via CLI".to_string());

    let item: ingestion_pipeline::domain::ContentItem = db
        .load_aggregate(&content_item_id)
        .await?
        .ok_or_else(|| AppError::NotFound { kind: "content_item", id: content_item_id.clone() })?;

    let refinement_events = Arc::new(EventBus::new());
    let refinement_services = refinement_pipeline::RefinementServices::new(
        db,
        refinement_events,
        Arc::new(crate::nlp_heuristics::HeuristicEntityExtractor),
        Arc::new(crate::nlp_heuristics::HeuristicTemporalExtractor),
        Arc::new(crate::nlp_heuristics::HeuristicQualityAnalyzer),
        Arc::new(Sha256Hasher),
        config.refinement,
        config.concurrency_retry,
        config.retry,
        config.circuit_breaker,
    );
    let command_bus = Arc::new(refinement_pipeline::build_command_bus(&refinement_services));
    refinement_pipeline::wire_saga(&refinement_services, command_bus.clone());

    let refinement_id = command_bus
        .execute(RerefineContent {
            content_item_id,
            normalized_content: item.normalized_content,
            reason,
        })
        .await?;

    Ok(format!("started refinement {refinement_id}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_opts_reads_key_value_pairs_and_ignores_danglers() {
        let args = vec![
            "--source-id".to_string(),
            "abc".to_string(),
            "--fire-at".to_string(),
            "2026-01-01T00:00:00Z".to_string(),
            "--dangling".to_string(),
        ];
        let opts = parse_opts(&args);
        assert_eq!(opts.get("source-id").map(String::as_str), Some("abc"));
        assert_eq!(
            opts.get("fire-at").map(String::as_str),
            Some("2026-01-01T00:00:00Z")
        );
        assert!(!opts.contains_key("dangling"));
    }

    #[test]
    fn require_reports_validation_error_for_missing_flag() {
        let opts = std::collections::HashMap::new();
        let err = require(&opts, "source-id").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn exit_code_maps_validation_to_two() {
        assert_eq!(exit_code(&AppError::Validation("bad".to_string())), 2);
    }

    #[test]
    fn exit_code_maps_transient_and_concurrency_to_three() {
        assert_eq!(
            exit_code(&AppError::Transient {
                kind: common::error::TransientKind::Network,
                message: "timeout".to_string(),
            }),
            3
        );
        assert_eq!(
            exit_code(&AppError::Concurrency {
                table: "ingestion_jobs",
                id: "job-1".to_string(),
            }),
            3
        );
    }

    #[test]
    fn exit_code_maps_everything_else_to_one() {
        assert_eq!(
            exit_code(&AppError::NotFound {
                kind: "ingestion_job",
                id: "job-1".to_string(),
            }),
            1
        );
    }
}
