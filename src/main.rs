use std::path::Path;
use std::sync::Arc;

use interview_intake::audit::{AuditSink, HttpAuditSink};
use interview_intake::config::IntakeConfig;
use interview_intake::extract::{ExtractorConfig, create_extractor};
use interview_intake::pipeline::processor::IntakeProcessor;
use interview_intake::routes::{IntakeState, intake_routes};
use interview_intake::store::{LibSqlStore, RecordStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match IntakeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!(
                "  required: INTAKE_DB_PATH, OPENAI_API_KEY, AUDIT_LOG_URL, AUDIT_LOG_SOURCE, AUDIT_LOG_API_KEY"
            );
            std::process::exit(1);
        }
    };

    eprintln!("📬 Interview Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.extraction_model);
    eprintln!("   Database: {}", config.db_path);
    eprintln!("   Endpoint: http://0.0.0.0:{}/process", config.bind_port);

    // ── Collaborators ────────────────────────────────────────────────
    let store: Arc<dyn RecordStore> =
        Arc::new(LibSqlStore::new_local(Path::new(&config.db_path)).await?);

    let extractor = create_extractor(&ExtractorConfig {
        api_key: config.openai_api_key.clone(),
        model: config.extraction_model.clone(),
    });

    let audit: Arc<dyn AuditSink> = Arc::new(HttpAuditSink::new(
        config.audit_url.clone(),
        config.audit_source.clone(),
        config.audit_api_key.clone(),
    ));

    let processor = Arc::new(IntakeProcessor::new(store, extractor, Arc::clone(&audit)));

    // ── Server ───────────────────────────────────────────────────────
    let app = intake_routes(IntakeState { processor, audit });
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.bind_port)).await?;
    tracing::info!(port = config.bind_port, "Intake server started");
    axum::serve(listener, app).await?;

    Ok(())
}
