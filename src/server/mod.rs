//! MCP Lifecycle (C7, spec §4.7): the stdio and HTTP server entry points
//! and the `ServerHandler` that ties dispatch into the rmcp transport.
//!
//! Grounded in the teacher's `server.rs` (tool catalog Arc, `ServerHandler`
//! impl shape, `ServerInfo`/`instructions` block) and, for the manual
//! per-session `list_tools`/`call_tool` (the teacher's own tool set is
//! static via `#[tool_router]`, which cannot express a per-connection,
//! runtime-filtered catalog), the gateway-relay pattern of converting a
//! data-driven tool record into `rmcp::model::Tool` at list time.

pub mod context;
pub mod middleware;

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData as McpError, ServerHandler};
use serde_json::Value;

use crate::dispatch::{self, DispatchOutcome, DispatchRequest};
use crate::github::GraphQlClient;
use context::ConnectionContext;

const META_TOOLS: &[&str] = &["list_toolsets", "enable_toolset", "disable_toolset"];

/// One MCP connection. Holds the state built by [`context::build`] for its
/// entire lifetime; cheap to clone (everything inside is `Arc`'d or copy).
#[derive(Clone)]
pub struct OctoproxyServer {
    ctx: Arc<ConnectionContext>,
}

impl OctoproxyServer {
    pub fn new(ctx: Arc<ConnectionContext>) -> Self {
        Self { ctx }
    }

    fn meta_tool_defs(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: Cow::Borrowed("list_toolsets"),
                title: None,
                description: Some(Cow::Borrowed(
                    "List known GitHub tool groups and which are enabled for this connection.",
                )),
                input_schema: Arc::new(serde_json::json!({"type": "object", "properties": {}}).as_object().unwrap().clone()),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
            },
            Tool {
                name: Cow::Borrowed("enable_toolset"),
                title: None,
                description: Some(Cow::Borrowed("Enable a tool group for this connection.")),
                input_schema: Arc::new(
                    serde_json::json!({
                        "type": "object",
                        "properties": {"toolset": {"type": "string"}},
                        "required": ["toolset"],
                    })
                    .as_object()
                    .unwrap()
                    .clone(),
                ),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
            },
            Tool {
                name: Cow::Borrowed("disable_toolset"),
                title: None,
                description: Some(Cow::Borrowed("Disable a tool group for this connection.")),
                input_schema: Arc::new(
                    serde_json::json!({
                        "type": "object",
                        "properties": {"toolset": {"type": "string"}},
                        "required": ["toolset"],
                    })
                    .as_object()
                    .unwrap()
                    .clone(),
                ),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
            },
        ]
    }

    async fn call_meta_tool(&self, name: &str, args: Value) -> Result<CallToolResult, McpError> {
        match name {
            "list_toolsets" => {
                let enabled = self.ctx.session.enabled_toolset_names().await;
                let body = serde_json::json!({
                    "enabled": enabled,
                    "all": crate::registry::toolsets::all_toolsets(),
                    "default": crate::registry::toolsets::default_toolsets(),
                });
                Ok(CallToolResult::success(vec![Content::text(body.to_string())]))
            }
            "enable_toolset" | "disable_toolset" => {
                let Some(toolset) = args.get("toolset").and_then(|v| v.as_str()) else {
                    return Ok(CallToolResult::error(vec![Content::text(
                        "missing required property: toolset",
                    )]));
                };
                let ok = if name == "enable_toolset" {
                    self.ctx.session.enable_toolset(toolset).await
                } else {
                    self.ctx.session.disable_toolset(toolset).await
                };
                if ok {
                    Ok(CallToolResult::success(vec![Content::text(format!(
                        "toolset '{toolset}' {}",
                        if name == "enable_toolset" { "enabled" } else { "disabled" }
                    ))]))
                } else {
                    Ok(CallToolResult::error(vec![Content::text(format!(
                        "unknown toolset '{toolset}'"
                    ))]))
                }
            }
            _ => unreachable!("call_meta_tool invoked for non-meta tool"),
        }
    }
}

impl ServerHandler for OctoproxyServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "octoproxy".into(),
                title: Some("GitHub MCP bridge".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "octoproxy bridges MCP tool calls to the GitHub REST and GraphQL APIs.\n\n\
                 Tools are grouped into toolsets (repos, issues, pull_requests, actions, \
                 users, context); the set visible on this connection depends on how it was \
                 started and, for OAuth connections, the scopes granted to the token. Use \
                 list_toolsets to see what's enabled, and enable_toolset/disable_toolset to \
                 change it at runtime.\n\n\
                 A write-scoped call can return a scope challenge instead of a result: that \
                 means the credential needs additional OAuth scopes, listed in the error.\n\n\
                 List-returning tools come back shaped (URLs stripped, zero/empty fields \
                 dropped, large collections summarized) to keep responses small; pass \
                 through raw GitHub API responses are not preserved verbatim."
                    .into(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move {
            let mut tools = self.meta_tool_defs();
            let visible = self.ctx.session.visible(&self.ctx.auth).await;
            tools.extend(visible.into_iter().map(|t| Tool {
                name: Cow::Borrowed(t.name),
                title: None,
                description: Some(Cow::Borrowed(t.description)),
                input_schema: Arc::new(t.input_schema.as_object().cloned().unwrap_or_default()),
                output_schema: None,
                annotations: None,
                icons: None,
                meta: None,
            }));
            Ok(ListToolsResult {
                tools,
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            let name = request.name.to_string();
            let args = Value::Object(request.arguments.clone().unwrap_or_default());

            if META_TOOLS.contains(&name.as_str()) {
                return self.call_meta_tool(&name, args).await;
            }

            // The transport cancels `context.ct` on `notifications/cancelled`;
            // threading it into the call context lets it reach the outbound
            // GitHub HTTP/GraphQL calls (§4.7 "Cancellation").
            let graphql: &dyn GraphQlClient = &self.ctx.github;
            let outcome = dispatch::dispatch(DispatchRequest {
                tool_name: &name,
                args,
                session: &self.ctx.session,
                auth: &self.ctx.auth,
                is_oauth_authenticated: self.ctx.is_oauth_authenticated,
                resource_metadata: &self.ctx.resource_metadata,
                lockdown: self.ctx.lockdown.as_deref(),
                lockdown_enabled: self.ctx.lockdown_enabled,
                viewer_login: self.ctx.viewer_login.as_deref(),
                graphql,
                call_context: self.ctx.call_context(context.ct.clone()),
            })
            .await;

            Ok(render(outcome))
        }
    }
}

fn render(outcome: DispatchOutcome) -> CallToolResult {
    match outcome {
        DispatchOutcome::Success(value) => CallToolResult::success(vec![Content::text(value.to_string())]),
        DispatchOutcome::UnknownTool => {
            CallToolResult::error(vec![Content::text("unknown tool".to_string())])
        }
        DispatchOutcome::InvalidParams(message) => CallToolResult::error(vec![Content::text(message)]),
        DispatchOutcome::HandlerError(err) => CallToolResult::error(vec![Content::text(err.user_message())]),
        DispatchOutcome::ScopeChallenge(challenge) => CallToolResult::error(vec![Content::text(format!(
            "insufficient OAuth scope. missing: {}. {}",
            challenge.missing.join(", "),
            challenge.www_authenticate(),
        ))]),
    }
}
