use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::Request,
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod env_utils;
pub mod geolocation;
pub mod route_handlers;
pub mod telegram;
pub mod utils;

use env_utils::AppConfig;
use geolocation::GeoResolver;
use telegram::TelegramClient;

/// Read-only per-process state handed to every request.
pub struct AppState {
    pub config: AppConfig,
    pub geo: GeoResolver,
    pub telegram: TelegramClient,
}
pub type SharedAppState = Arc<AppState>;

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().build()?;

        let geo = GeoResolver::new(client.clone(), config.geo_api_url.clone());
        let telegram = TelegramClient::new(
            client,
            config.telegram_api_url.clone(),
            config.telegram_bot_token.clone(),
            config.telegram_chat_id.clone(),
        );

        Ok(AppState {
            config,
            geo,
            telegram,
        })
    }
}

/**
 * main router for the app: the visit beacon route with request tracing,
 * an untraced healthcheck, and permissive CORS over both
 **/
pub fn get_main_router(state: SharedAppState) -> Router {
    tracing::debug!("initializing router(s) ...");

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::debug_span!("request", method = %request.method(), path = %request.uri().path())
        })
        .on_response(|response: &Response, latency: Duration, _span: &tracing::Span| {
            tracing::debug!(
                "{} {}",
                response.status(),
                utils::duration_to_ms_string(latency)
            );
        });

    Router::new()
        .route("/log-visit", post(route_handlers::log_visit::handler))
        .layer(trace_layer)
        .route("/healthcheck", get(|| async { "Ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
}
