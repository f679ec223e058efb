use std::sync::Arc;

use anyhow::Context as _;
use tera::Tera;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crewdesk::backend::BackendClient;
use crewdesk::router::build_app_router;
use crewdesk::state::{AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crewdesk=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let tera = Tera::new(&config.templates_glob)
        .with_context(|| format!("Parsing templates from {}", config.templates_glob))?;
    let backend = BackendClient::new(&config.backend_url, config.backend_timeout)?;
    tracing::info!(backend = backend.base_url(), "Using indemnity backend");

    let state = Arc::new(AppState::new(tera, backend));
    let app = build_app_router(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Binding {}", config.bind_address))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
