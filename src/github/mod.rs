//! GitHub REST/GraphQL/raw client collaborators (§4.9 of SPEC_FULL.md).
//!
//! Plumbing, not core — grounded in the teacher's `backend/http.rs`
//! reqwest usage and `backend/health.rs` probing pattern, adapted from
//! "talk to another MCP server" to "talk to GitHub".

pub mod host;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::GitHubError;
use host::Endpoints;

/// Result of the lockdown GraphQL probe (§4.3).
#[derive(Debug, Clone, Copy)]
pub struct RepoAccessProbe {
    pub is_private: bool,
    pub has_push_access: bool,
}

/// The subset of GraphQL behavior the lockdown cache needs, abstracted so
/// tests can supply a fake (design note §9 applies the same "inject for
/// testing" principle used for the clock).
#[async_trait]
pub trait GraphQlClient: Send + Sync {
    async fn probe_repo_access(
        &self,
        owner: &str,
        repo: &str,
        viewer: &str,
    ) -> Result<RepoAccessProbe, GitHubError>;

    async fn query(&self, query: &str, variables: Value) -> Result<Value, GitHubError>;
}

/// Shared REST/GraphQL/upload/raw client for one connection's lifetime.
/// Cheap to clone (reqwest::Client is itself an `Arc` internally).
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(http: reqwest::Client, endpoints: Endpoints, token: Option<String>) -> Self {
        Self {
            http,
            endpoints,
            token,
        }
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("User-Agent", "octoproxy-mcp-bridge");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// `HEAD /user`, used by the credential classifier to read
    /// `X-OAuth-Scopes` (§4.5).
    pub async fn head_user_scopes(&self) -> Result<Option<String>, GitHubError> {
        let url = format!("{}/user", self.endpoints.rest);
        let resp = self.authed(self.http.head(&url)).send().await?;
        Ok(resp
            .headers()
            .get("X-OAuth-Scopes")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }

    pub async fn get(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Value, GitHubError> {
        let url = format!("{}{path}", self.endpoints.rest);
        self.send(self.authed(self.http.get(&url)), cancel).await
    }

    pub async fn post(
        &self,
        path: &str,
        body: Value,
        cancel: &CancellationToken,
    ) -> Result<Value, GitHubError> {
        let url = format!("{}{path}", self.endpoints.rest);
        self.send(self.authed(self.http.post(&url).json(&body)), cancel)
            .await
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<Value, GitHubError> {
        let fut = builder.send();
        let resp = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GitHubError::Cancelled),
            result = fut => result?,
        };

        let status = resp.status();
        if !status.is_success() {
            let body_summary = resp.text().await.ok().map(|b| truncate(&b, 500));
            return Err(GitHubError::Api {
                message: format!("unexpected status {status}"),
                status: Some(status),
                body_summary,
                source: None,
            });
        }
        debug!(%status, "GitHub REST call succeeded");
        Ok(resp.json().await.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl GraphQlClient for GitHubClient {
    async fn probe_repo_access(
        &self,
        owner: &str,
        repo: &str,
        viewer: &str,
    ) -> Result<RepoAccessProbe, GitHubError> {
        const QUERY: &str = r#"
            query($owner: String!, $repo: String!, $viewer: String!) {
              repository(owner: $owner, name: $repo) {
                isPrivate
                collaborators(query: $viewer, first: 1) {
                  edges { permission }
                }
              }
            }
        "#;
        let vars = serde_json::json!({"owner": owner, "repo": repo, "viewer": viewer});
        let data = self.query(QUERY, vars).await?;

        let is_private = data["repository"]["isPrivate"].as_bool().unwrap_or(true);
        let has_push_access = data["repository"]["collaborators"]["edges"]
            .as_array()
            .map(|edges| {
                edges.iter().any(|e| {
                    matches!(
                        e["permission"].as_str(),
                        Some("WRITE") | Some("ADMIN") | Some("MAINTAIN")
                    )
                })
            })
            .unwrap_or(false);

        Ok(RepoAccessProbe {
            is_private,
            has_push_access,
        })
    }

    async fn query(&self, query: &str, variables: Value) -> Result<Value, GitHubError> {
        let body = serde_json::json!({"query": query, "variables": variables});
        let resp = self
            .authed(self.http.post(&self.endpoints.graphql).json(&body))
            .send()
            .await?;

        let status = resp.status();
        let payload: Value = resp.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            return Err(GitHubError::Api {
                message: format!("unexpected status {status}"),
                status: Some(status),
                body_summary: Some(truncate(&payload.to_string(), 500)),
                source: None,
            });
        }

        if let Some(errors) = payload.get("errors").and_then(|e| e.as_array()) {
            if !errors.is_empty() {
                let messages: Vec<String> = errors
                    .iter()
                    .filter_map(|e| e["message"].as_str().map(str::to_string))
                    .collect();
                return Err(GitHubError::GraphQl {
                    message: messages.join("; "),
                    errors: messages,
                });
            }
        }

        Ok(payload["data"].clone())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}
