// Path and File Name : /home/sensor/home-sensor-core/core/deception/src/http_emulator.rs
// Author: nXxBku0CKFAJCBN3X1g3bQk7OxYQylg8CMw1iGsq7gU
// Details of functionality of this file: Axum-backed HTTP decoy server serving a frozen route table and reporting connections

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};

use crate::archetypes::DecoyBlueprint;
use crate::credentials::{find_credential_in_basic_auth, find_credential_in_text};
use crate::error::DeceptionError;

/// A single observed hit against a running HTTP decoy, reported upstream for
/// persistence and alerting. The emulator itself never touches storage or
/// the event bus directly; the route table is frozen at construction so a
/// request can never mutate what the decoy serves.
#[derive(Debug, Clone)]
pub struct DecoyConnectionEvent {
    pub decoy_id: i64,
    pub source_ip: String,
    pub port: u16,
    pub protocol: &'static str,
    pub request_path: String,
    pub credential_used: Option<String>,
}

struct HandlerState {
    decoy_id: i64,
    port: u16,
    blueprint: DecoyBlueprint,
    tx: mpsc::UnboundedSender<DecoyConnectionEvent>,
}

fn planted_values(blueprint: &DecoyBlueprint) -> Vec<&str> {
    blueprint.planted_credentials.iter().map(|c| c.credential_value.as_str()).collect()
}

fn detect_credential(blueprint: &DecoyBlueprint, headers: &HeaderMap, body: &str, path: &str) -> Option<String> {
    let planted = planted_values(blueprint);

    if let Some(auth) = headers.get(axum::http::header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(found) = find_credential_in_basic_auth(auth, planted.iter().copied()) {
            return Some(found.to_string());
        }
        if let Some(found) = find_credential_in_text(auth, planted.iter().copied()) {
            return Some(found.to_string());
        }
    }

    if let Some(found) = find_credential_in_text(body, planted.iter().copied()) {
        return Some(found.to_string());
    }

    find_credential_in_text(path, planted.iter().copied()).map(|s| s.to_string())
}

async fn handle(
    State(state): State<Arc<HandlerState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let body_text = String::from_utf8_lossy(&body).into_owned();
    let credential_used = detect_credential(&state.blueprint, &headers, &body_text, &path);

    let matched = state
        .blueprint
        .routes
        .iter()
        .find(|r| r.path == path && r.method.eq_ignore_ascii_case(method.as_str()));

    let event = DecoyConnectionEvent {
        decoy_id: state.decoy_id,
        source_ip: addr.ip().to_string(),
        port: state.port,
        protocol: "http",
        request_path: path.clone(),
        credential_used,
    };
    if state.tx.send(event).is_err() {
        debug!(decoy_id = state.decoy_id, "connection event receiver dropped");
    }

    match matched {
        Some(route) => {
            let mut response = (StatusCode::from_u16(route.response.status).unwrap_or(StatusCode::OK), route.response.body.clone())
                .into_response();
            let header_map = response.headers_mut();
            for (name, value) in &route.response.headers {
                if let (Ok(name), Ok(value)) = (
                    axum::http::HeaderName::from_bytes(name.as_bytes()),
                    axum::http::HeaderValue::from_str(value),
                ) {
                    header_map.insert(name, value);
                }
            }
            response
        }
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

fn build_router(state: Arc<HandlerState>) -> Router {
    Router::new().fallback(handle).with_state(state)
}

/// Binds an HTTP decoy to `bind_address:port` (port 0 lets the OS assign one)
/// and starts serving `blueprint`'s frozen route table. Returns the bound
/// address, a shutdown handle, and the channel connection events arrive on.
pub async fn start_http_decoy(
    decoy_id: i64,
    bind_address: &str,
    port: u16,
    blueprint: DecoyBlueprint,
) -> Result<(SocketAddr, Arc<Notify>, mpsc::UnboundedReceiver<DecoyConnectionEvent>), DeceptionError> {
    let listener = TcpListener::bind((bind_address, port))
        .await
        .map_err(|e| DeceptionError::Transient(format!("bind {bind_address}:{port} failed: {e}")))?;
    let bound_addr = listener
        .local_addr()
        .map_err(|e| DeceptionError::Transient(format!("local_addr failed: {e}")))?;

    let (tx, rx) = mpsc::unbounded_channel();
    let state = Arc::new(HandlerState {
        decoy_id,
        port: bound_addr.port(),
        blueprint,
        tx,
    });
    let router = build_router(state).into_make_service_with_connect_info::<SocketAddr>();

    let shutdown = Arc::new(Notify::new());
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        let server = axum::serve(listener, router).with_graceful_shutdown(async move {
            shutdown_signal.notified().await;
        });
        if let Err(err) = server.await {
            warn!(decoy_id, %err, "http decoy server exited with error");
        }
    });

    Ok((bound_addr, shutdown, rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetypes::{build_blueprint, DecoyArchetype};

    #[test]
    fn detect_credential_finds_planted_value_in_body() {
        let blueprint = build_blueprint(DecoyArchetype::FileShare);
        let value = blueprint.planted_credentials[0].credential_value.clone();
        let headers = HeaderMap::new();
        let found = detect_credential(&blueprint, &headers, &format!("payload={value}"), "/upload");
        assert_eq!(found, Some(value));
    }

    #[test]
    fn detect_credential_returns_none_for_unrelated_request() {
        let blueprint = build_blueprint(DecoyArchetype::FileShare);
        let headers = HeaderMap::new();
        let found = detect_credential(&blueprint, &headers, "nothing interesting here", "/");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn decoy_binds_to_os_assigned_port_and_serves_route() {
        let blueprint = build_blueprint(DecoyArchetype::DevServer);
        let (addr, shutdown, mut rx) = start_http_decoy(1, "127.0.0.1", 0, blueprint).await.unwrap();
        assert_ne!(addr.port(), 0);

        let url = format!("http://{addr}/api/health");
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), 200);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.request_path, "/api/health");

        shutdown.notify_one();
    }
}
