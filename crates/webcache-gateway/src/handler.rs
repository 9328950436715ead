//! The inbound request handler
//!
//! A single fallback route captures every path: the whole path space is
//! forwarded cache namespace, so no routes are reserved. Only GET and HEAD
//! are accepted; the intermediary never forwards request bodies.

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use webcache_engine::{CacheEngine, ClientResponse};
use webcache_types::Error;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CacheEngine>,
}

/// Build the gateway router
pub fn router(state: AppState) -> Router {
    Router::new().fallback(handle).with_state(state)
}

async fn handle(State(state): State<AppState>, request: Request<Body>) -> Response {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return empty_response(StatusCode::METHOD_NOT_ALLOWED);
    }
    let head = request.method() == Method::HEAD;

    let url = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let headers: HashMap<String, String> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.to_string(), v.to_string()))
        })
        .collect();

    info!(%url, "received request");

    match state.engine.handle(&url, headers).await {
        Ok(response) => {
            info!(%url, status = %response.status, "issuing response");
            into_http_response(response, head)
        }
        Err(err) if err.is_consistency() => {
            warn!(%url, error = %err, "could not update cache due to contention, bailing early");
            empty_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
        Err(Error::Origin(message)) => {
            error!(%url, %message, "origin fetch failed");
            empty_response(StatusCode::BAD_GATEWAY)
        }
        Err(err) => {
            error!(%url, error = %err, "request failed");
            empty_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Map an engine response onto the wire
///
/// A HEAD request gets the same status and headers with an empty body.
/// The status line's reason phrase cannot be carried by the http crate;
/// only the numeric code survives. An unparseable status line degrades to
/// a 500.
fn into_http_response(response: ClientResponse, head: bool) -> Response {
    let status = response
        .status_code()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut builder = Response::builder().status(status);
    for (name, value) in &response.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            builder = builder.header(name, value);
        }
    }

    let body = if head {
        Body::empty()
    } else {
        Body::from(response.body)
    };
    builder
        .body(body)
        .unwrap_or_else(|_| empty_response(StatusCode::INTERNAL_SERVER_ERROR))
}

fn empty_response(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}
