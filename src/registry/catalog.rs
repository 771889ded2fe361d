//! The process-lifetime tool catalog (C4, spec §3/§4.4).
//!
//! "Model each tool as a record `{name, schema, handler, toolset,
//! readOnly, requiredScopes, featureFlag}`... new tools are data, not
//! subclasses" (design note §9).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::GitHubError;
use crate::github::GitHubClient;
use crate::scopes::Scope;
use crate::shaper::ShapeConfig;

/// Everything a tool handler needs to do its job (§4.8 step 4).
pub struct CallContext {
    pub github: GitHubClient,
    pub viewer_login: Option<String>,
    pub cancel: tokio_util::sync::CancellationToken,
}

/// A tool handler body. The ~100 real GitHub endpoint handlers are
/// out-of-scope plumbing (§1); this crate implements a representative
/// slice behind this trait (§4.10 of SPEC_FULL.md).
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, ctx: &CallContext, args: Value) -> Result<Value, GitHubError>;
}

/// A reference to a specific (owner, repo) a tool's response concerns, so
/// dispatch can ask the lockdown cache whether to scrub (§4.8 step 6).
/// Handlers that don't touch a single repo return `None`.
pub type RepoRefExtractor = fn(&Value, &Value) -> Option<(String, String)>;

/// One entry in the process-wide catalog.
pub struct ToolRecord {
    pub name: &'static str,
    pub toolset: &'static str,
    pub read_only: bool,
    pub required_scopes: Vec<Scope>,
    pub feature_flag: Option<&'static str>,
    pub deprecated_aliases: &'static [&'static str],
    pub input_schema: Value,
    pub description: &'static str,
    /// Whether dispatch must shape the response as a list (§4.8 step 7).
    pub is_list: bool,
    pub shape_config: ShapeConfig,
    /// Extracts (owner, repo) from (input args, raw response) for the
    /// lockdown check. `None` if this tool never references a single repo.
    pub repo_ref: Option<RepoRefExtractor>,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolRecord {
    /// Accepted scopes = required ∪ their transitive parents (§3 "Tool").
    pub fn accepted_scopes(&self) -> std::collections::HashSet<Scope> {
        let mut out = std::collections::HashSet::new();
        for need in &self.required_scopes {
            out.extend(crate::scopes::accepted_for(need).iter().cloned());
        }
        out
    }

    /// True for tools that need a human user context (e.g. "who am I"),
    /// which app-installation tokens cannot satisfy (§4.4 item 5).
    pub fn requires_user_context(&self) -> bool {
        self.toolset == "users" || self.name == "get_me"
    }

    #[cfg(test)]
    pub fn test_stub(name: &'static str, toolset: &'static str, required: &[&str]) -> Self {
        struct NoopHandler;
        #[async_trait]
        impl ToolHandler for NoopHandler {
            async fn call(&self, _ctx: &CallContext, _args: Value) -> Result<Value, GitHubError> {
                Ok(Value::Null)
            }
        }
        Self {
            name,
            toolset,
            read_only: true,
            required_scopes: required.iter().map(|s| s.to_string()).collect(),
            feature_flag: None,
            deprecated_aliases: &[],
            input_schema: serde_json::json!({"type": "object"}),
            description: "test stub",
            is_list: false,
            shape_config: ShapeConfig::default(),
            repo_ref: None,
            handler: Arc::new(NoopHandler),
        }
    }
}
