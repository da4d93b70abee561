use anyhow::Context;
use dotenvy::dotenv;
use tracing::{error, info, warn};

use autoloan::logging::init_tracing;
use autoloan::metrics::{init_metrics, metrics_app};
use autoloan::router::init_router;
use autoloan::state::AppState;
use autoloan_config::{CorsConfig, JwtConfig, ServerConfig, SignupConfig, UploadConfig};
use autoloan_db::{init_db_pool, reconcile_staging, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let server_config = ServerConfig::from_env()?;
    init_tracing(&server_config.log_dir)?;

    let jwt_config = JwtConfig::from_env()?;
    let upload_config = UploadConfig::from_env()?;
    let signup_config = SignupConfig::from_env()?;
    let cors_config = CorsConfig::from_env();

    if let Some(handle) = init_metrics()? {
        let metrics_address = server_config.metrics_address();
        let listener = tokio::net::TcpListener::bind(&metrics_address)
            .await
            .with_context(|| format!("Failed to bind metrics listener on {}", metrics_address))?;
        info!(address = %metrics_address, "Metrics available at /metrics");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, metrics_app(handle)).await {
                error!(error = %e, "Metrics server stopped");
            }
        });
    }

    let db = init_db_pool().await?;
    run_migrations(&db).await?;

    let state = AppState::new(db, jwt_config, cors_config, upload_config, signup_config);

    state
        .storage
        .prepare()
        .await
        .context("Failed to prepare upload directory")?;

    // Nothing is being served yet, so every staged file is left over from a crash.
    match reconcile_staging(&state.db, state.storage.as_ref()).await {
        Ok(report) if !report.discarded.is_empty() || !report.promoted.is_empty() => {
            warn!(
                promoted = report.promoted.len(),
                discarded = report.discarded.len(),
                "Recovered attachments left in staging"
            );
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e.message(), "Staging reconciliation failed"),
    }

    let address = server_config.address();
    let app = init_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!(address = %address, "Server running");
    info!("Swagger UI available at /swagger-ui, Scalar at /scalar");

    axum::serve(listener, app).await?;
    Ok(())
}
