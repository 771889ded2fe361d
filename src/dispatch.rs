//! Tool Dispatch (C8, spec §4.8).

use serde_json::Value;

use crate::auth::AuthContext;
use crate::challenge::{self, ScopeChallenge};
use crate::error::GitHubError;
use crate::github::GraphQlClient;
use crate::lockdown::{self, LockdownCache};
use crate::registry::catalog::CallContext;
use crate::registry::SessionRegistry;
use crate::shaper;

/// The outcome of one `callTool` invocation, ready for the transport layer
/// to render as an MCP result or error (§4.8).
pub enum DispatchOutcome {
    Success(Value),
    UnknownTool,
    ScopeChallenge(ScopeChallenge),
    InvalidParams(String),
    HandlerError(GitHubError),
}

/// Everything dispatch needs beyond the tool name/args (§4.8 steps 1-8).
pub struct DispatchRequest<'a> {
    pub tool_name: &'a str,
    pub args: Value,
    pub session: &'a SessionRegistry,
    pub auth: &'a AuthContext,
    pub is_oauth_authenticated: bool,
    pub resource_metadata: &'a str,
    pub lockdown: Option<&'a LockdownCache>,
    pub lockdown_enabled: bool,
    pub viewer_login: Option<&'a str>,
    pub graphql: &'a dyn GraphQlClient,
    pub call_context: CallContext,
}

pub async fn dispatch(req: DispatchRequest<'_>) -> DispatchOutcome {
    // Step 1: canonical name lookup (deprecated aliases resolved).
    let Some(tool) = req.session.lookup_visible(req.tool_name, req.auth).await else {
        return DispatchOutcome::UnknownTool;
    };

    // Step 2: scope check (§4.6). Happens-before handler invocation (§5).
    if let Some(chal) = challenge::check(tool, req.auth, req.is_oauth_authenticated, req.resource_metadata) {
        return DispatchOutcome::ScopeChallenge(chal);
    }

    // Step 3: schema validation. A minimal structural check — required
    // top-level properties must be present — real JSON-schema validation
    // would live in the handler's own Deserialize impl in a full build.
    if let Some(missing) = missing_required_property(&tool.input_schema, &req.args) {
        return DispatchOutcome::InvalidParams(format!("missing required property: {missing}"));
    }

    // Step 4: invoke handler.
    let result = tool.handler.call(&req.call_context, req.args.clone()).await;
    let response = match result {
        Ok(value) => value,
        Err(err) => return DispatchOutcome::HandlerError(err),
    };

    // Step 6: lockdown scrub happens-before response shaping (§5).
    let response = if req.lockdown_enabled {
        match (tool.repo_ref, req.viewer_login, req.lockdown) {
            (Some(extractor), Some(viewer), Some(cache)) => {
                if let Some((owner, repo)) = extractor(&req.args, &response) {
                    match cache.should_scrub(req.graphql, viewer, &owner, &repo).await {
                        Ok(true) => lockdown::scrub_payload(),
                        Ok(false) => response,
                        // Probe errors don't block the response; they just
                        // mean lockdown couldn't be evaluated this time.
                        Err(_) => response,
                    }
                } else {
                    response
                }
            }
            _ => response,
        }
    } else {
        response
    };

    // Step 7: shape list responses.
    let shaped = if tool.is_list {
        let items = response.as_array().cloned().unwrap_or_default();
        shaper::shape_list(items, &tool.shape_config)
    } else {
        response
    };

    DispatchOutcome::Success(shaped)
}

fn missing_required_property(schema: &Value, args: &Value) -> Option<String> {
    let required = schema.get("required")?.as_array()?;
    for field in required {
        let field = field.as_str()?;
        if args.get(field).is_none() {
            return Some(field.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialKind;
    use crate::github::RepoAccessProbe;
    use crate::registry::filter::NoFlagsEnabled;
    use crate::registry::{catalog::ToolRecord, ToolCatalog};
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    struct FakeGraphQl {
        scrub: bool,
    }

    #[async_trait]
    impl GraphQlClient for FakeGraphQl {
        async fn probe_repo_access(
            &self,
            _owner: &str,
            _repo: &str,
            _viewer: &str,
        ) -> Result<RepoAccessProbe, GitHubError> {
            Ok(RepoAccessProbe {
                is_private: false,
                has_push_access: !self.scrub,
            })
        }
        async fn query(&self, _q: &str, _v: Value) -> Result<Value, GitHubError> {
            Ok(Value::Null)
        }
    }

    async fn call_ctx() -> CallContext {
        let http = reqwest::Client::new();
        let endpoints = crate::github::host::resolve("", &http).await;
        CallContext {
            github: crate::github::GitHubClient::new(http, endpoints, None),
            viewer_login: Some("alice".to_string()),
            cancel: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn unknown_tool_name() {
        let catalog = Arc::new(ToolCatalog::new(vec![]));
        let (session, _) = SessionRegistry::new(catalog, None, &[], false, Arc::new(NoFlagsEnabled));
        let auth = AuthContext::unauthenticated();
        let outcome = dispatch(DispatchRequest {
            tool_name: "nonexistent",
            args: Value::Null,
            session: &session,
            auth: &auth,
            is_oauth_authenticated: false,
            resource_metadata: "https://example/metadata",
            lockdown: None,
            lockdown_enabled: false,
            viewer_login: None,
            graphql: &FakeGraphQl { scrub: false },
            call_context: call_ctx().await,
        })
        .await;
        assert!(matches!(outcome, DispatchOutcome::UnknownTool));
    }

    #[tokio::test]
    async fn scope_challenge_blocks_handler_invocation() {
        let mut tool = ToolRecord::test_stub("create_issue", "issues", &["repo"]);
        tool.read_only = false;
        let catalog = Arc::new(ToolCatalog::new(vec![tool]));
        let (session, _) =
            SessionRegistry::new(catalog, Some(&["issues".to_string()]), &[], false, Arc::new(NoFlagsEnabled));
        let auth = AuthContext {
            credential_kind: CredentialKind::OAuthUser,
            scopes: ["public_repo".to_string()].into(),
            scopes_fetched: true,
        };
        let outcome = dispatch(DispatchRequest {
            tool_name: "create_issue",
            args: serde_json::json!({}),
            session: &session,
            auth: &auth,
            is_oauth_authenticated: true,
            resource_metadata: "https://example/metadata",
            lockdown: None,
            lockdown_enabled: false,
            viewer_login: None,
            graphql: &FakeGraphQl { scrub: false },
            call_context: call_ctx().await,
        })
        .await;
        assert!(matches!(outcome, DispatchOutcome::ScopeChallenge(_)));
    }
}
