//! The always-on `context` toolset: tells the calling agent who it is and
//! which host it is talking to, without any GitHub round-trip.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::registry::catalog::{CallContext, ToolHandler, ToolRecord};
use crate::shaper::ShapeConfig;

struct GetContext;

#[async_trait]
impl ToolHandler for GetContext {
    async fn call(&self, ctx: &CallContext, _args: Value) -> Result<Value, crate::error::GitHubError> {
        Ok(json!({
            "viewer": ctx.viewer_login,
        }))
    }
}

pub fn tools() -> Vec<ToolRecord> {
    vec![ToolRecord {
        name: "get_context",
        toolset: "context",
        read_only: true,
        required_scopes: vec![],
        feature_flag: None,
        deprecated_aliases: &[],
        input_schema: json!({"type": "object", "properties": {}}),
        description: "Get the current connection's viewer identity and host context.",
        is_list: false,
        shape_config: ShapeConfig::default(),
        repo_ref: None,
        handler: Arc::new(GetContext),
    }]
}
