use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use dotenv::dotenv;
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use visit_relay::{env_utils, get_main_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::debug!("initializing app state ...");

    let config = env_utils::AppConfig::from_env().context("invalid startup configuration")?;
    let state = AppState::new(config).context("failed to build app state")?;

    let port = env_utils::get_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!("Server listening on port {}", port);

    axum::Server::bind(&addr)
        .serve(get_main_router(Arc::new(state)).into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("error while starting API server")?;

    Ok(())
}
