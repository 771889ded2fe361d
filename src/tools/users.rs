//! Representative `users` toolset handlers.
//!
//! `get_me` requires human user context; dropped for app-installation
//! tokens by the registry's capability filter (§4.4 item 5).

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::registry::catalog::{CallContext, ToolHandler, ToolRecord};
use crate::shaper::ShapeConfig;

struct GetMe;

#[async_trait]
impl ToolHandler for GetMe {
    async fn call(&self, ctx: &CallContext, _args: Value) -> Result<Value, crate::error::GitHubError> {
        ctx.github.get("/user", &ctx.cancel).await
    }
}

pub fn tools() -> Vec<ToolRecord> {
    vec![ToolRecord {
        name: "get_me",
        toolset: "users",
        read_only: true,
        required_scopes: vec![],
        feature_flag: None,
        deprecated_aliases: &["get_authenticated_user"],
        input_schema: json!({"type": "object", "properties": {}}),
        description: "Get details of the authenticated GitHub user.",
        is_list: false,
        shape_config: ShapeConfig {
            preserved_fields: ["html_url".to_string()].into(),
            ..Default::default()
        },
        repo_ref: None,
        handler: Arc::new(GetMe),
    }]
}
