use anyhow::{Context, Result};
use imagere_web::{build_router, config::Config, state::AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imagere_web=info,imagere_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr = config.addr();

    tracing::info!(
        "Upload ceiling: {} bytes (body limit {} bytes)",
        config.max_upload_bytes,
        config.body_limit()
    );

    let app = build_router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("Imagere web server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
