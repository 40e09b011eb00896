//! Worker binary (§2.1, §6): wires both pipelines' command/event buses onto
//! one `SurrealDbClient` and one pair of buses each, bridges
//! `ContentIngested` into the refinement pipeline, then idles until asked
//! to stop. Scheduling itself runs on `scheduler::Scheduler`'s spawned
//! tasks, so there is no poll loop here to drive — unlike the teacher's
//! `run_worker_loop`, which polled a DB-backed lease queue directly.

mod bridge;
mod nlp_heuristics;

use std::sync::Arc;

use bus::EventBus;
use common::ports::hash::Sha256Hasher;
use common::ports::source_adapter::AdapterRegistry;
use common::storage::db::SurrealDbClient;
use common::utils::config::get_config;
use scheduler::Scheduler;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nlp_heuristics::{HeuristicEntityExtractor, HeuristicQualityAnalyzer, HeuristicTemporalExtractor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config = get_config()?;

    let db = Arc::new(
        SurrealDbClient::new(
            &config.surrealdb_address,
            &config.surrealdb_username,
            &config.surrealdb_password,
            &config.surrealdb_namespace,
            &config.surrealdb_database,
        )
        .await?,
    );
    db.ensure_initialized().await?;

    let ingestion_events = Arc::new(EventBus::new());
    let ingestion_services = ingestion_pipeline::PipelineServices::new(
        db.clone(),
        ingestion_events.clone(),
        Arc::new(AdapterRegistry::new()),
        Arc::new(Sha256Hasher),
        Scheduler::new(),
        config.retry.clone(),
        config.circuit_breaker.clone(),
        config.health.clone(),
        config.concurrency_retry.clone(),
    );
    let ingestion_commands = Arc::new(ingestion_pipeline::build_command_bus(&ingestion_services));
    ingestion_pipeline::wire_saga(&ingestion_services, ingestion_commands.clone());

    let refinement_events = Arc::new(EventBus::new());
    let refinement_services = refinement_pipeline::RefinementServices::new(
        db,
        refinement_events,
        Arc::new(HeuristicEntityExtractor),
        Arc::new(HeuristicTemporalExtractor),
        Arc::new(HeuristicQualityAnalyzer),
        Arc::new(Sha256Hasher),
        config.refinement.clone(),
        config.concurrency_retry,
        config.retry,
        config.circuit_breaker,
    );
    let refinement_commands = Arc::new(refinement_pipeline::build_command_bus(&refinement_services));
    refinement_pipeline::wire_saga(&refinement_services, refinement_commands.clone());

    bridge::wire_ingestion_to_refinement(&ingestion_events, refinement_commands);

    tracing::info!("worker wired, awaiting shutdown signal");
    tokio::signal::ctrl_c().await?;
    Ok(())
}
