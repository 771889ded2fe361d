//! Representative `actions` toolset handlers.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::registry::catalog::{CallContext, ToolHandler, ToolRecord};
use crate::shaper::ShapeConfig;

struct ListWorkflowRuns;

#[async_trait]
impl ToolHandler for ListWorkflowRuns {
    async fn call(&self, ctx: &CallContext, args: Value) -> Result<Value, crate::error::GitHubError> {
        let owner = args["owner"].as_str().unwrap_or_default();
        let repo = args["repo"].as_str().unwrap_or_default();
        ctx.github
            .get(&format!("/repos/{owner}/{repo}/actions/runs"), &ctx.cancel)
            .await
    }
}

pub fn tools() -> Vec<ToolRecord> {
    vec![ToolRecord {
        name: "list_workflow_runs",
        toolset: "actions",
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
        description: "List GitHub Actions workflow runs for a repository.",
        is_list: true,
        shape_config: ShapeConfig {
            preserved_fields: ["html_url".to_string()].into(),
            ..Default::default()
        },
        repo_ref: Some(|args, _resp| {
            Some((
                args["owner"].as_str()?.to_string(),
                args["repo"].as_str()?.to_string(),
            ))
        }),
        handler: Arc::new(ListWorkflowRuns),
    }]
}
