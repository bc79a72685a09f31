use coachline_api::{app, worker, AppState};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coachline_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = coachline_store::app_config::Config::load()?;
    tracing::info!(
        "Starting Coachline API on port {} with {:?} storage",
        config.server.port,
        config.storage.backend
    );

    let app_state = AppState::from_config(&config).await?;

    if config.scheduler.enabled {
        worker::start_scheduler(&app_state, &config.scheduler);
    } else {
        tracing::info!("Scheduler disabled; jobs run only through the admin API");
    }

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
