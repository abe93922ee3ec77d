//! Asset scheme bridge.
//!
//! The window loads static assets and model description files over a
//! custom URI scheme, and every request on that scheme is resolved by
//! the cache agent. That puts the live app traffic — not just the
//! startup precache — under the cache-first policy and the weights
//! bypass.

use tauri::http::{header, Response, StatusCode};
use tracing::warn;

use super::OfflineCacheAgent;

/// Scheme the window requests app assets on (`ryba://`).
pub const SCHEME: &str = "ryba";

/// Resolve one intercepted request through the agent. Agent failures
/// (unreachable origin on a cache miss) surface as a bad-gateway
/// response rather than an error, keeping the window's fetch semantics.
pub fn respond(agent: &OfflineCacheAgent, path: &str) -> Response<Vec<u8>> {
    match agent.handle(path) {
        Ok(served) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            build(served.status, mime.essence_str(), served.body)
        }
        Err(e) => {
            warn!(path, error = %e, "asset request failed");
            build(
                StatusCode::BAD_GATEWAY.as_u16(),
                "text/plain",
                e.to_string().into_bytes(),
            )
        }
    }
}

fn build(status: u16, mime: &str, body: Vec<u8>) -> Response<Vec<u8>> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, mime)
        .body(body)
        .unwrap_or_else(|e| {
            warn!(error = %e, "malformed asset response");
            let mut fallback = Response::new(Vec::new());
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}
