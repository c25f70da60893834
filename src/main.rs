//! One-Shield Security Pipeline CLI
//!
//! Reads a JSON array of security events from a file (or stdin), runs the
//! full pipeline over it and prints the security report as JSON.
//!
//! ```text
//! shield-pipeline events.json
//! cat events.json | shield-pipeline
//! ```

use std::io::Read;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shield_pipeline::db;
use shield_pipeline::logic::audit::{AuditBackend, HttpSiemForwarder, SiemForwarder};
use shield_pipeline::{Config, MemoryAuditBackend, PgAuditBackend, RawSecurityEvent};
use shield_pipeline::{AuditStore, SecurityPipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging (stderr, stdout carries the report)
    let json_logs = std::env::var("ENVIRONMENT").map_or(false, |e| e == "production");
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "shield_pipeline=debug".into()),
    );
    if json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = Config::from_env();
    tracing::info!("Security pipeline starting ({})", config.environment);

    // Audit backend
    let backend: Arc<dyn AuditBackend> = match &config.database_url {
        Some(url) => {
            tracing::info!("Audit database: {}", url.split('@').last().unwrap_or("***"));
            let pool = db::create_pool(url)
                .await
                .context("Failed to create database pool")?;
            db::run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;
            Arc::new(PgAuditBackend::new(pool))
        }
        None => {
            if config.is_production() {
                tracing::warn!("DATABASE_URL not set, audit trail is in-memory only");
            }
            Arc::new(MemoryAuditBackend::new())
        }
    };

    let forwarder: Option<Arc<dyn SiemForwarder>> = match &config.siem_url {
        Some(url) => Some(Arc::new(
            HttpSiemForwarder::new(url, config.siem_timeout_secs).context("Failed to build SIEM client")?,
        )),
        None => None,
    };

    let (audit, writer) = AuditStore::spawn(backend, forwarder, config.audit());
    let pipeline = SecurityPipeline::new(config.pipeline(), audit);

    // Input
    let input = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    let raw: Vec<RawSecurityEvent> = serde_json::from_str(&input).context("Input is not a JSON array of events")?;

    let events = match pipeline.ingest(raw) {
        Ok(events) => events,
        Err(e) => {
            // Persist the rejection record before exiting
            pipeline.shutdown(writer).await;
            return Err(e.into());
        }
    };
    tracing::info!("Ingested {} events", events.len());

    let outcome = pipeline.analyze(&events);
    println!("{}", serde_json::to_string_pretty(&outcome.report)?);

    let metrics = pipeline.snapshot_metrics();
    tracing::debug!(
        "Metrics #{}: {} events, {} anomalies, avg threat {:.1}",
        metrics.id,
        metrics.events_processed,
        metrics.anomalies_detected,
        metrics.avg_threat_score
    );

    pipeline.audit().flush().await;
    match pipeline.audit().purge_expired().await {
        Ok(0) => {}
        Ok(purged) => tracing::info!("Purged {} expired audit entries", purged),
        Err(e) => tracing::warn!("Audit retention purge failed: {}", e),
    }

    let stats = pipeline.shutdown(writer).await;
    tracing::info!(
        "Audit: {} written, {} dropped, {} write failures, {} forwarded",
        stats.written,
        stats.dropped,
        stats.write_failures,
        stats.forwarded
    );

    Ok(())
}
