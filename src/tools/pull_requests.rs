//! Representative `pull_requests` toolset handlers.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::registry::catalog::{CallContext, ToolHandler, ToolRecord};
use crate::shaper::{Extractor, ShapeConfig};

struct GetPullRequest;

#[async_trait]
impl ToolHandler for GetPullRequest {
    async fn call(&self, ctx: &CallContext, args: Value) -> Result<Value, crate::error::GitHubError> {
        let owner = args["owner"].as_str().unwrap_or_default();
        let repo = args["repo"].as_str().unwrap_or_default();
        let number = args["pull_number"].as_u64().unwrap_or_default();
        ctx.github
            .get(&format!("/repos/{owner}/{repo}/pulls/{number}"), &ctx.cancel)
            .await
    }
}

struct ListPullRequests;

#[async_trait]
impl ToolHandler for ListPullRequests {
    async fn call(&self, ctx: &CallContext, args: Value) -> Result<Value, crate::error::GitHubError> {
        let owner = args["owner"].as_str().unwrap_or_default();
        let repo = args["repo"].as_str().unwrap_or_default();
        let state = args["state"].as_str().unwrap_or("open");
        ctx.github
            .get(&format!("/repos/{owner}/{repo}/pulls?state={state}"), &ctx.cancel)
            .await
    }
}

fn pr_shape_config() -> ShapeConfig {
    ShapeConfig {
        preserved_fields: ["html_url".to_string()].into(),
        collection_extractors: HashMap::from([(
            "requested_reviewers".to_string(),
            Extractor::Single("login".to_string()),
        )]),
        ..Default::default()
    }
}

fn repo_ref_extractor(args: &Value, _resp: &Value) -> Option<(String, String)> {
    Some((
        args["owner"].as_str()?.to_string(),
        args["repo"].as_str()?.to_string(),
    ))
}

pub fn tools() -> Vec<ToolRecord> {
    vec![
        ToolRecord {
            name: "get_pull_request",
            toolset: "pull_requests",
            read_only: true,
            required_scopes: vec![],
            feature_flag: None,
            deprecated_aliases: &[],
            input_schema: json!({
                "type": "object",
                "properties": {
                    "owner": {"type": "string"},
                    "repo": {"type": "string"},
                    "pull_number": {"type": "integer"},
                },
                "required": ["owner", "repo", "pull_number"],
            }),
            description: "Get the details of a single pull request in a GitHub repository.",
            is_list: false,
            shape_config: pr_shape_config(),
            repo_ref: Some(repo_ref_extractor),
            handler: Arc::new(GetPullRequest),
        },
        ToolRecord {
            name: "list_pull_requests",
            toolset: "pull_requests",
            read_only: true,
            required_scopes: vec![],
            feature_flag: None,
            deprecated_aliases: &[],
            input_schema: json!({
                "type": "object",
                "properties": {
                    "owner": {"type": "string"},
                    "repo": {"type": "string"},
                    "state": {"type": "string", "enum": ["open", "closed", "all"]},
                },
                "required": ["owner", "repo"],
            }),
            description: "List pull requests in a GitHub repository.",
            is_list: true,
            shape_config: pr_shape_config(),
            repo_ref: Some(repo_ref_extractor),
            handler: Arc::new(ListPullRequests),
        },
    ]
}
