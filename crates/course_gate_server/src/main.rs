use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing::info;

use course_gate_server::{AppState, ServerConfig, router};

const DEFAULT_FILTER: &str = "info";

fn log_filter() -> String {
    // `COURSE_GATE_LOG_LEVEL` wins over `RUST_LOG`; both unset means `info`.
    std::env::var("COURSE_GATE_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| DEFAULT_FILTER.to_string())
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let log_env = log_filter();
    let env_filter = tracing_subscriber::EnvFilter::try_new(log_env.clone())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .compact()
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    info!(%log_env, "course_gate_server: log filter");

    let handle = PrometheusBuilder::new().install_recorder()?;

    let cfg = match ServerConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration; aborting startup");
            std::process::exit(1);
        }
    };
    info!(
        api = %cfg.client.api_base_url,
        local = cfg.client.local_base_url.as_deref().unwrap_or("-"),
        ttl_secs = cfg.client.health_ttl.as_secs(),
        "course gate configured"
    );

    let state = Arc::new(AppState::from_config(&cfg.client, handle)?);
    let app = router(state);

    let addr = cfg.address;
    info!(%addr, "starting HTTP server");
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };

    let server = axum::serve(listener, app.into_make_service());
    if let Err(e) = server
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("failed to listen for ctrl+c: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
