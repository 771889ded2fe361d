//! Per-connection state (C7, spec §4.7 "Connection context").

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::auth::{self, AuthContext, Credential, CredentialKind};
use crate::github::host::{self, Endpoints};
use crate::github::GitHubClient;
use crate::lockdown::LockdownCache;
use crate::registry::catalog::CallContext;
use crate::registry::filter::FeatureFlagChecker;
use crate::registry::{SessionRegistry, ToolCatalog};

/// Everything one MCP connection (stdio process or HTTP session) carries
/// for its lifetime. Built once at connection bring-up (§4.7).
pub struct ConnectionContext {
    pub credential: Option<Credential>,
    pub auth: AuthContext,
    pub session: SessionRegistry,
    pub github: GitHubClient,
    pub viewer_login: Option<String>,
    pub lockdown: Option<Arc<LockdownCache>>,
    pub lockdown_enabled: bool,
    /// True only for the classic web-application OAuth flow (§4.6);
    /// PATs and app-installation tokens never trigger a scope challenge.
    pub is_oauth_authenticated: bool,
    pub resource_metadata: String,
}

/// Inputs that vary per connection: the credential presented and the
/// session's requested view (toolsets, explicit tools, read-only).
pub struct ConnectionRequest<'a> {
    pub credential: Option<Credential>,
    pub host: &'a str,
    pub requested_toolsets: Option<&'a [String]>,
    pub explicit_tools: &'a [String],
    pub read_only: bool,
    pub lockdown_enabled: bool,
    pub lockdown_ttl: Duration,
    pub resource_metadata: String,
}

/// Build a connection's context: resolve the GitHub host, fetch scopes if
/// the credential kind carries them, fetch the viewer login for lockdown
/// and `get_context`, and build the session's tool view (§4.5, §4.7).
pub async fn build(
    http: reqwest::Client,
    catalog: Arc<ToolCatalog>,
    flags: Arc<dyn FeatureFlagChecker>,
    req: ConnectionRequest<'_>,
) -> ConnectionContext {
    let endpoints: Endpoints = host::resolve(req.host, &http).await;
    let token = req.credential.as_ref().map(|c| c.token().to_string());
    let github = GitHubClient::new(http, endpoints, token);

    let auth = match &req.credential {
        Some(credential) => auth::build_auth_context(credential, &github).await,
        None => AuthContext::unauthenticated(),
    };

    let viewer_login = if req.credential.is_some() {
        match github.get("/user", &Default::default()).await {
            Ok(value) => value.get("login").and_then(|v| v.as_str()).map(str::to_string),
            Err(err) => {
                warn!(error = %err, "failed to resolve viewer login; lockdown/get_context degraded");
                None
            }
        }
    } else {
        None
    };

    let (session, unknown) = SessionRegistry::new(
        catalog,
        req.requested_toolsets,
        req.explicit_tools,
        req.read_only,
        flags,
    );
    if !unknown.is_empty() {
        warn!(?unknown, "requested toolsets not recognized; ignored");
    }

    let is_oauth_authenticated = matches!(auth.credential_kind, CredentialKind::OAuthUser);

    info!(
        credential_kind = ?auth.credential_kind,
        viewer = ?viewer_login,
        read_only = req.read_only,
        "connection established"
    );

    ConnectionContext {
        credential: req.credential,
        auth,
        session,
        github,
        viewer_login,
        lockdown: req.lockdown_enabled.then(|| Arc::new(LockdownCache::new(req.lockdown_ttl))),
        lockdown_enabled: req.lockdown_enabled,
        is_oauth_authenticated,
        resource_metadata: req.resource_metadata,
    }
}

impl ConnectionContext {
    /// Build the per-call context, carrying the transport's per-request
    /// cancellation token through to the outbound GitHub clients (§4.7
    /// "Cancellation"). `cancel` should be the token the MCP transport
    /// cancels on client cancel/shutdown/deadline; tests that don't care
    /// about cancellation can pass a fresh, never-cancelled token.
    pub fn call_context(&self, cancel: tokio_util::sync::CancellationToken) -> CallContext {
        CallContext {
            github: self.github.clone(),
            viewer_login: self.viewer_login.clone(),
            cancel,
        }
    }
}
