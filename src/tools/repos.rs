//! Representative `repos` toolset handlers.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::registry::catalog::{CallContext, ToolHandler, ToolRecord};
use crate::shaper::ShapeConfig;

struct GetRepository;

#[async_trait]
impl ToolHandler for GetRepository {
    async fn call(&self, ctx: &CallContext, args: Value) -> Result<Value, crate::error::GitHubError> {
        let owner = args["owner"].as_str().unwrap_or_default();
        let repo = args["repo"].as_str().unwrap_or_default();
        ctx.github
            .get(&format!("/repos/{owner}/{repo}"), &ctx.cancel)
            .await
    }
}

struct ListCommits;

#[async_trait]
impl ToolHandler for ListCommits {
    async fn call(&self, ctx: &CallContext, args: Value) -> Result<Value, crate::error::GitHubError> {
        let owner = args["owner"].as_str().unwrap_or_default();
        let repo = args["repo"].as_str().unwrap_or_default();
        ctx.github
            .get(&format!("/repos/{owner}/{repo}/commits"), &ctx.cancel)
            .await
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
            name: "get_repository",
            toolset: "repos",
            read_only: true,
            required_scopes: vec![],
            feature_flag: None,
            deprecated_aliases: &["get_repo"],
            input_schema: json!({
                "type": "object",
                "properties": {
                    "owner": {"type": "string"},
                    "repo": {"type": "string"},
                },
                "required": ["owner", "repo"],
            }),
            description: "Get the details of a GitHub repository.",
            is_list: false,
            shape_config: ShapeConfig {
                preserved_fields: ["html_url".to_string()].into(),
                ..Default::default()
            },
            repo_ref: Some(repo_ref_extractor),
            handler: Arc::new(GetRepository),
        },
        ToolRecord {
            name: "list_commits",
            toolset: "repos",
            read_only: true,
            required_scopes: vec![],
            feature_flag: None,
            deprecated_aliases: &[],
            input_schema: json!({
                "type": "object",
                "properties": {
                    "owner": {"type": "string"},
                    "repo": {"type": "string"},
                },
                "required": ["owner", "repo"],
            }),
            description: "List commits on a GitHub repository's default branch.",
            is_list: true,
            shape_config: ShapeConfig {
                preserved_fields: ["html_url".to_string()].into(),
                ..Default::default()
            },
            repo_ref: Some(repo_ref_extractor),
            handler: Arc::new(ListCommits),
        },
    ]
}
