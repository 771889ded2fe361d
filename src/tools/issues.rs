//! Representative `issues` toolset handlers (§4.10 of SPEC_FULL.md).

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::registry::catalog::{CallContext, ToolHandler, ToolRecord};
use crate::shaper::{Extractor, ShapeConfig};

struct GetIssue;

#[async_trait]
impl ToolHandler for GetIssue {
    async fn call(&self, ctx: &CallContext, args: Value) -> Result<Value, crate::error::GitHubError> {
        let owner = args["owner"].as_str().unwrap_or_default();
        let repo = args["repo"].as_str().unwrap_or_default();
        let number = args["issue_number"].as_u64().unwrap_or_default();
        ctx.github
            .get(&format!("/repos/{owner}/{repo}/issues/{number}"), &ctx.cancel)
            .await
    }
}

struct ListIssues;

#[async_trait]
impl ToolHandler for ListIssues {
    async fn call(&self, ctx: &CallContext, args: Value) -> Result<Value, crate::error::GitHubError> {
        let owner = args["owner"].as_str().unwrap_or_default();
        let repo = args["repo"].as_str().unwrap_or_default();
        let state = args["state"].as_str().unwrap_or("open");
        ctx.github
            .get(&format!("/repos/{owner}/{repo}/issues?state={state}"), &ctx.cancel)
            .await
    }
}

struct CreateIssue;

#[async_trait]
impl ToolHandler for CreateIssue {
    async fn call(&self, ctx: &CallContext, args: Value) -> Result<Value, crate::error::GitHubError> {
        let owner = args["owner"].as_str().unwrap_or_default();
        let repo = args["repo"].as_str().unwrap_or_default();
        let body = json!({
            "title": args["title"],
            "body": args.get("body").cloned().unwrap_or(Value::Null),
            "labels": args.get("labels").cloned().unwrap_or(Value::Null),
        });
        ctx.github
            .post(&format!("/repos/{owner}/{repo}/issues"), body, &ctx.cancel)
            .await
    }
}

fn issue_shape_config() -> ShapeConfig {
    ShapeConfig {
        preserved_fields: ["html_url".to_string()].into(),
        collection_extractors: HashMap::from([(
            "labels".to_string(),
            Extractor::Single("name".to_string()),
        )]),
        ..Default::default()
    }
}

pub fn tools() -> Vec<ToolRecord> {
    vec![
        ToolRecord {
            name: "get_issue",
            toolset: "issues",
            read_only: true,
            required_scopes: vec![],
            feature_flag: None,
            deprecated_aliases: &[],
            input_schema: json!({
                "type": "object",
                "properties": {
                    "owner": {"type": "string"},
                    "repo": {"type": "string"},
                    "issue_number": {"type": "integer"},
                },
                "required": ["owner", "repo", "issue_number"],
            }),
            description: "Get the details of a single issue in a GitHub repository.",
            is_list: false,
            shape_config: issue_shape_config(),
            repo_ref: Some(|args, _resp| {
                Some((
                    args["owner"].as_str()?.to_string(),
                    args["repo"].as_str()?.to_string(),
                ))
            }),
            handler: Arc::new(GetIssue),
        },
        ToolRecord {
            name: "list_issues",
            toolset: "issues",
            read_only: true,
            required_scopes: vec![],
            feature_flag: None,
            deprecated_aliases: &["search_issues_legacy"],
            input_schema: json!({
                "type": "object",
                "properties": {
                    "owner": {"type": "string"},
                    "repo": {"type": "string"},
                    "state": {"type": "string", "enum": ["open", "closed", "all"]},
                },
                "required": ["owner", "repo"],
            }),
            description: "List issues in a GitHub repository.",
            is_list: true,
            shape_config: issue_shape_config(),
            repo_ref: Some(|args, _resp| {
                Some((
                    args["owner"].as_str()?.to_string(),
                    args["repo"].as_str()?.to_string(),
                ))
            }),
            handler: Arc::new(ListIssues),
        },
        ToolRecord {
            name: "create_issue",
            toolset: "issues",
            read_only: false,
            required_scopes: vec!["repo".to_string()],
            feature_flag: None,
            deprecated_aliases: &[],
            input_schema: json!({
                "type": "object",
                "properties": {
                    "owner": {"type": "string"},
                    "repo": {"type": "string"},
                    "title": {"type": "string"},
                    "body": {"type": "string"},
                    "labels": {"type": "array", "items": {"type": "string"}},
                },
                "required": ["owner", "repo", "title"],
            }),
            description: "Create a new issue in a GitHub repository.",
            is_list: false,
            shape_config: ShapeConfig::default(),
            repo_ref: Some(|args, _resp| {
                Some((
                    args["owner"].as_str()?.to_string(),
                    args["repo"].as_str()?.to_string(),
                ))
            }),
            handler: Arc::new(CreateIssue),
        },
    ]
}
