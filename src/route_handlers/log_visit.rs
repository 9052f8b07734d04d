use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{telegram::VisitNotification, SharedAppState};

const FORWARDED_FOR: &str = "x-forwarded-for";

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VisitBeacon {
    user_agent: Option<String>,
    referrer: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VisitResponse {
    status: &'static str,
}

pub async fn handler(
    State(state): State<SharedAppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<VisitBeacon>,
) -> (StatusCode, Json<VisitResponse>) {
    tracing::debug!("Visit beacon: {:?}", payload);

    let ip = extract_client_ip(&headers, peer);
    let location = state.geo.resolve(&ip).await;

    let notification = VisitNotification {
        timestamp: Utc::now().with_timezone(&state.config.utc_offset),
        location,
        ip,
        user_agent: payload.user_agent,
        referrer: payload.referrer,
    };

    match state.telegram.send_visit(&notification).await {
        Ok(()) => {
            tracing::info!("Relayed visit from {}", notification.ip);
            (StatusCode::OK, Json(VisitResponse { status: "ok" }))
        }
        Err(e) => {
            tracing::error!("Failed to relay visit from {}: {:#}", notification.ip, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(VisitResponse { status: "error" }),
            )
        }
    }
}

/// First hop of `X-Forwarded-For` when present, otherwise the socket peer.
pub fn extract_client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    match forwarded {
        Some(ip) => ip.to_string(),
        None => peer.ip().to_string(),
    }
}
