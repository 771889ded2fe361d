//! HTTP transport surface (§6 "HTTP mode"): the streamable-MCP endpoint
//! and its toolset/read-only path variants, the RFC 9728
//! `/.well-known/oauth-protected-resource` route family, `/_ping`
//! liveness, `X-API-Key` gating, and `X-Forwarded-*`-aware metadata URL
//! construction.
//!
//! Grounded in the teacher's `admin.rs` axum pattern (`Router`,
//! `with_state`, `TcpListener::bind`, graceful shutdown via `Notify`),
//! generalized from a health/discovery API to the MCP surface named in
//! spec §6, and in `ConaryLabs-Mira`'s `web/mcp_http.rs` /
//! `web/mod.rs::create_router` for mounting `rmcp`'s
//! `StreamableHttpService` into an `axum::Router` via `nest_service`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path as AxumPath, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::ClassifyError;
use crate::registry::filter::FeatureFlagChecker;
use crate::registry::ToolCatalog;
use crate::server::context::{self, ConnectionContext, ConnectionRequest};
use crate::server::middleware::credential_from_header;
use crate::server::OctoproxyServer;

/// Everything the HTTP handlers need to build a fresh [`ConnectionContext`]
/// per request (§4.7 "the handler constructs a fresh logical server per
/// request") and to render `/.well-known` metadata.
#[derive(Clone)]
pub struct HttpState {
    pub http_client: reqwest::Client,
    pub catalog: Arc<ToolCatalog>,
    pub flags: Arc<dyn FeatureFlagChecker>,
    pub config: Arc<Config>,
}

tokio::task_local! {
    /// The context built for the in-flight request by the auth-gate
    /// middleware, read back by the `StreamableHttpService` factory it
    /// wraps. Scoped around `next.run(req)` for the duration of one
    /// request, which is the same task the factory runs on.
    static REQUEST_CONTEXT: Arc<ConnectionContext>;
}

/// Build the full router: MCP endpoint (and its path variants), well-known
/// metadata variants, liveness, `X-API-Key` gate, CORS-open per spec §6.
pub fn router(state: HttpState, cancel: CancellationToken) -> Router {
    let metadata_routes = Router::new()
        .route("/.well-known/oauth-protected-resource", get(well_known))
        .route("/.well-known/oauth-protected-resource/mcp", get(well_known))
        .route("/.well-known/oauth-protected-resource/readonly", get(well_known))
        .route(
            "/.well-known/oauth-protected-resource/x/{toolset}",
            get(well_known_toolset),
        )
        .route(
            "/.well-known/oauth-protected-resource/x/{toolset}/readonly",
            get(well_known_toolset),
        )
        .with_state(state.clone());

    let mcp_routes = Router::new()
        .nest_service("/", fixed_mcp_endpoint(state.clone(), cancel.clone(), None, false))
        .nest_service("/mcp", fixed_mcp_endpoint(state.clone(), cancel.clone(), None, false))
        .nest_service(
            "/readonly",
            fixed_mcp_endpoint(state.clone(), cancel.clone(), None, true),
        )
        .nest_service(
            "/x/{toolset}",
            toolset_mcp_endpoint(state.clone(), cancel.clone(), false),
        )
        .nest_service(
            "/x/{toolset}/readonly",
            toolset_mcp_endpoint(state.clone(), cancel.clone(), true),
        );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/_ping", get(ping))
        .merge(metadata_routes)
        .merge(mcp_routes)
        .layer(middleware::from_fn_with_state(state, api_key_gate))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// One of the fixed-selector MCP endpoints (base path, `/mcp`,
/// `/readonly`): the toolset/read-only baseline is known ahead of time, so
/// the auth-gate middleware needs no path extraction.
fn fixed_mcp_endpoint(
    state: HttpState,
    cancel: CancellationToken,
    toolset: Option<String>,
    read_only: bool,
) -> Router {
    let inner = mcp_service(cancel);
    Router::new().fallback_service(inner).layer(middleware::from_fn_with_state(
        (state, toolset, read_only),
        connection_context_gate,
    ))
}

/// `/x/<toolset>[/readonly]`: the toolset name is a path parameter, so the
/// auth-gate middleware here extracts it per request.
fn toolset_mcp_endpoint(state: HttpState, cancel: CancellationToken, read_only: bool) -> Router {
    let inner = mcp_service(cancel);
    Router::new().fallback_service(inner).layer(middleware::from_fn_with_state(
        (state, read_only),
        connection_context_gate_with_toolset,
    ))
}

/// A bare `rmcp` streamable-HTTP service. Stateless (§6): the factory
/// reads the [`ConnectionContext`] the enclosing auth-gate middleware
/// scoped into [`REQUEST_CONTEXT`] rather than holding any server state of
/// its own, so every request gets its own logical `OctoproxyServer`.
fn mcp_service(cancel: CancellationToken) -> StreamableHttpService<OctoproxyServer, LocalSessionManager> {
    let factory = || {
        let ctx = REQUEST_CONTEXT.with(|ctx| ctx.clone());
        Ok(OctoproxyServer::new(ctx))
    };
    let session_manager = Arc::new(LocalSessionManager::default());
    let config = StreamableHttpServerConfig {
        sse_keep_alive: Some(Duration::from_secs(15)),
        stateful_mode: false,
        cancellation_token: cancel,
    };
    StreamableHttpService::new(factory, session_manager, config)
}

async fn connection_context_gate(
    State((state, toolset, read_only)): State<(HttpState, Option<String>, bool)>,
    headers: HeaderMap,
    req: Request<Body>,
    next: Next,
) -> Response {
    connection_context_gate_impl(state, toolset, read_only, headers, req, next).await
}

async fn connection_context_gate_with_toolset(
    State((state, read_only)): State<(HttpState, bool)>,
    AxumPath(toolset): AxumPath<String>,
    headers: HeaderMap,
    req: Request<Body>,
    next: Next,
) -> Response {
    connection_context_gate_impl(state, Some(toolset), read_only, headers, req, next).await
}

/// Reads the `Authorization` header, builds a fresh [`ConnectionContext`]
/// for this request (§4.5 "per HTTP request"), and scopes it into
/// [`REQUEST_CONTEXT`] for the nested `StreamableHttpService` to pick up.
/// Returns the auth failures named in §4.5/§6 directly, short-circuiting
/// before the MCP layer ever sees the request.
async fn connection_context_gate_impl(
    state: HttpState,
    toolset: Option<String>,
    read_only: bool,
    headers: HeaderMap,
    req: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = headers.get("authorization").and_then(|v| v.to_str().ok());
    let credential = match credential_from_header(auth_header) {
        Ok(credential) => Some(credential),
        Err(ClassifyError::MissingCredential) => {
            let resource = resource_metadata_url(&state, &headers, req.uri().path());
            return unauthorized(&resource);
        }
        Err(ClassifyError::UnsupportedScheme(_)) => {
            return (StatusCode::BAD_REQUEST, "unsupported authorization scheme").into_response();
        }
    };

    let resource_metadata = resource_metadata_url(&state, &headers, req.uri().path());
    let requested_toolsets = toolset.as_ref().map(std::slice::from_ref);
    let ctx = context::build(
        state.http_client.clone(),
        state.catalog.clone(),
        state.flags.clone(),
        ConnectionRequest {
            credential,
            host: &state.config.github_host,
            requested_toolsets,
            explicit_tools: &[],
            read_only,
            lockdown_enabled: state.config.lockdown.enabled,
            lockdown_ttl: state.config.lockdown.ttl,
            resource_metadata,
        },
    )
    .await;

    REQUEST_CONTEXT.scope(Arc::new(ctx), next.run(req)).await
}

fn unauthorized(resource_metadata: &str) -> Response {
    let mut resp = (StatusCode::UNAUTHORIZED, "missing Authorization header").into_response();
    if let Ok(value) = format!("Bearer resource_metadata=\"{resource_metadata}\"").parse() {
        resp.headers_mut().insert("WWW-Authenticate", value);
    }
    resp
}

/// `GET /_ping`: liveness; bypasses auth entirely (§6).
async fn ping() -> &'static str {
    "ok"
}

/// `GET /.well-known/oauth-protected-resource` and its `/mcp`/`/readonly`
/// variants: RFC 9728 metadata, built from `X-Forwarded-Host`/
/// `X-Forwarded-Proto` when present (§6).
async fn well_known(State(state): State<HttpState>, headers: HeaderMap, req: Request<Body>) -> Response {
    let metadata = protected_resource_metadata(&state, &headers, req.uri().path());
    Json(metadata).into_response()
}

/// `GET /.well-known/oauth-protected-resource/x/<toolset>[/readonly]`.
async fn well_known_toolset(
    State(state): State<HttpState>,
    AxumPath(_toolset): AxumPath<String>,
    headers: HeaderMap,
    req: Request<Body>,
) -> Response {
    let metadata = protected_resource_metadata(&state, &headers, req.uri().path());
    Json(metadata).into_response()
}

fn protected_resource_metadata(state: &HttpState, headers: &HeaderMap, path: &str) -> serde_json::Value {
    let resource = resource_metadata_url(state, headers, path);
    json!({
        "resource": resource,
        "authorization_servers": ["https://github.com/login/oauth"],
        "bearer_methods_supported": ["header"],
    })
}

/// Build the resource-metadata URL this process is reachable at, honoring
/// `X-Forwarded-Host`/`X-Forwarded-Proto` so a reverse-proxied deployment
/// reports its public address rather than its bind address (§6).
pub fn resource_metadata_url(state: &HttpState, headers: &HeaderMap, path: &str) -> String {
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get("x-forwarded-host")
        .and_then(|v| v.to_str().ok())
        .or_else(|| headers.get("host").and_then(|v| v.to_str().ok()))
        .unwrap_or(&state.config.http.bind);
    format!("{proto}://{host}{path}")
}

/// `X-API-Key` gating (§6): if configured, every request must carry the
/// matching header, compared in constant time. Missing -> 401, wrong ->
/// 403. `/_ping` bypasses this middleware entirely.
async fn api_key_gate(State(state): State<HttpState>, req: Request<Body>, next: Next) -> Response {
    if req.uri().path() == "/_ping" {
        return next.run(req).await;
    }
    let Some(expected) = state.config.http.api_key.as_deref() else {
        return next.run(req).await;
    };
    match req.headers().get("x-api-key").and_then(|v| v.to_str().ok()) {
        None => (StatusCode::UNAUTHORIZED, "missing X-API-Key").into_response(),
        Some(actual) if constant_time_eq(actual.as_bytes(), expected.as_bytes()) => next.run(req).await,
        Some(_) => (StatusCode::FORBIDDEN, "invalid X-API-Key").into_response(),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Hard bound on the shutdown drain (§4.7 "wait up to 5 seconds for
/// in-flight calls to drain, then close the transport").
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(5);

/// Bind and serve, draining in-flight requests on shutdown (§4.7/§5),
/// matching the teacher's `Notify`-driven graceful shutdown in
/// `admin.rs::start`. `axum`'s own graceful shutdown has no deadline of its
/// own, so the serve future runs on a background task and the drain is
/// bounded explicitly here: once `shutdown` fires, we wait at most
/// `SHUTDOWN_DRAIN` for that task to finish before returning regardless.
pub async fn serve(router: Router, bind: &str, shutdown: Arc<Notify>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!(bind, "octoproxy HTTP server listening");

    let graceful_signal = Arc::clone(&shutdown);
    let serve_task = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                graceful_signal.notified().await;
                info!("shutdown requested, draining in-flight requests");
            })
            .await
    });

    shutdown.notified().await;
    match tokio::time::timeout(SHUTDOWN_DRAIN, serve_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(err))) => return Err(err.into()),
        Ok(Err(join_err)) => return Err(join_err.into()),
        Err(_) => info!("shutdown drain window elapsed; closing transport regardless"),
    }
    info!("octoproxy HTTP server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_matches_equal_strings() {
        assert!(constant_time_eq(b"abc123", b"abc123"));
    }

    #[test]
    fn constant_time_eq_rejects_mismatched_length() {
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    #[test]
    fn constant_time_eq_rejects_different_content() {
        assert!(!constant_time_eq(b"abc123", b"abc124"));
    }
}
