//! MCP protocol lifecycle tests (C7, spec §4.7).
//!
//! Connects to `OctoproxyServer` as an in-process `rmcp` client over a
//! `tokio::io::duplex` pair, the same harness shape the teacher uses in
//! its own compliance test suite: spawn the server side, handshake the
//! client side, then drive `tools/list`/`tools/call` through the real
//! wire protocol instead of calling Rust methods directly.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::auth::AuthContext;
    use crate::github::host::Endpoints;
    use crate::github::GitHubClient;
    use crate::registry::filter::NoFlagsEnabled;
    use crate::registry::{SessionRegistry, ToolCatalog};
    use crate::server::context::ConnectionContext;
    use crate::server::OctoproxyServer;
    use crate::tools;

    use rmcp::model::CallToolRequestParams;
    use rmcp::ServiceExt;

    /// Build a connection context with no credential (unauthenticated, no
    /// lockdown, no outbound network — `host: ""` resolves to github.com's
    /// fixed endpoints without probing).
    async fn test_context(requested_toolsets: Option<&[String]>, read_only: bool) -> Arc<ConnectionContext> {
        let catalog = Arc::new(ToolCatalog::new(tools::build_catalog()));
        let (session, _unknown) = SessionRegistry::new(
            catalog,
            requested_toolsets,
            &[],
            read_only,
            Arc::new(NoFlagsEnabled) as Arc<dyn crate::registry::filter::FeatureFlagChecker>,
        );

        let http = reqwest::Client::new();
        let github = GitHubClient::new(http, Endpoints::dot_com_for_test(), None);

        Arc::new(ConnectionContext {
            credential: None,
            auth: AuthContext::unauthenticated(),
            session,
            github,
            viewer_login: None,
            lockdown: None,
            lockdown_enabled: false,
            is_oauth_authenticated: false,
            resource_metadata: "https://github.com/.well-known/oauth-protected-resource".to_string(),
        })
    }

    async fn connect(ctx: Arc<ConnectionContext>) -> rmcp::service::Peer<rmcp::RoleClient> {
        let server = OctoproxyServer::new(ctx);

        let (client_io, server_io) = tokio::io::duplex(65536);
        let (server_read, server_write) = tokio::io::split(server_io);
        let (client_read, client_write) = tokio::io::split(client_io);

        tokio::spawn(async move {
            match server.serve((server_read, server_write)).await {
                Ok(service) => {
                    let _ = service.waiting().await;
                }
                Err(err) => eprintln!("test server exited: {err}"),
            }
        });

        let client_service = ()
            .serve((client_read, client_write))
            .await
            .expect("client handshake failed");

        let peer = client_service.peer().clone();
        tokio::spawn(async move {
            let _ = client_service.waiting().await;
        });
        peer
    }

    #[tokio::test]
    async fn initialize_handshake_reports_tools_capability() {
        let ctx = test_context(Some(&["repos".to_string()]), false).await;
        let server = OctoproxyServer::new(ctx);

        let (client_io, server_io) = tokio::io::duplex(65536);
        let (server_read, server_write) = tokio::io::split(server_io);
        let (client_read, client_write) = tokio::io::split(client_io);

        tokio::spawn(async move {
            match server.serve((server_read, server_write)).await {
                Ok(service) => {
                    let _ = service.waiting().await;
                }
                Err(err) => eprintln!("test server exited: {err}"),
            }
        });

        let client_service = ()
            .serve((client_read, client_write))
            .await
            .expect("client handshake failed");

        let peer_info = client_service.peer_info().expect("no peer info");
        assert!(peer_info.capabilities.tools.is_some(), "tools capability missing");
    }

    #[tokio::test]
    async fn tools_list_includes_meta_tools_and_enabled_toolset() {
        let ctx = test_context(Some(&["repos".to_string()]), false).await;
        let peer = connect(ctx).await;

        let tools = peer.list_all_tools().await.unwrap();
        let names: Vec<String> = tools.iter().map(|t| t.name.to_string()).collect();

        assert!(names.contains(&"list_toolsets".to_string()));
        assert!(names.contains(&"enable_toolset".to_string()));
        assert!(names.contains(&"disable_toolset".to_string()));
        assert!(
            names.iter().any(|n| n == "get_repository" || n == "list_repos"),
            "expected at least one repos-toolset tool visible, got {names:?}"
        );
    }

    #[tokio::test]
    async fn tools_list_hides_disabled_toolsets() {
        let ctx = test_context(Some(&[]), false).await;
        let peer = connect(ctx).await;

        let tools = peer.list_all_tools().await.unwrap();
        let names: Vec<String> = tools.iter().map(|t| t.name.to_string()).collect();

        assert!(names.contains(&"list_toolsets".to_string()));
        assert!(
            !names.iter().any(|n| n == "get_repository"),
            "no toolsets were requested; repos tools should be hidden, got {names:?}"
        );
    }

    #[tokio::test]
    async fn enable_toolset_meta_tool_makes_its_tools_visible() {
        let ctx = test_context(Some(&[]), false).await;
        let peer = connect(ctx).await;

        let before: Vec<String> = peer
            .list_all_tools()
            .await
            .unwrap()
            .iter()
            .map(|t| t.name.to_string())
            .collect();
        assert!(!before.iter().any(|n| n == "get_repository"));

        let result = peer
            .call_tool(CallToolRequestParams {
                meta: None,
                name: "enable_toolset".to_string().into(),
                arguments: Some(serde_json::json!({"toolset": "repos"}).as_object().unwrap().clone()),
                task: None,
            })
            .await
            .unwrap();
        assert!(!result.is_error.unwrap_or(false));

        let after: Vec<String> = peer
            .list_all_tools()
            .await
            .unwrap()
            .iter()
            .map(|t| t.name.to_string())
            .collect();
        assert!(after.iter().any(|n| n == "get_repository"));
    }

    #[tokio::test]
    async fn calling_unknown_tool_returns_an_error_result_not_a_protocol_error() {
        let ctx = test_context(Some(&["repos".to_string()]), false).await;
        let peer = connect(ctx).await;

        let result = peer
            .call_tool(CallToolRequestParams {
                meta: None,
                name: "this_tool_does_not_exist".to_string().into(),
                arguments: None,
                task: None,
            })
            .await
            .unwrap();

        assert!(result.is_error.unwrap_or(false));
    }

    #[tokio::test]
    async fn read_only_session_hides_write_tools() {
        let ctx = test_context(Some(&["issues".to_string()]), true).await;
        let peer = connect(ctx).await;

        let names: Vec<String> = peer
            .list_all_tools()
            .await
            .unwrap()
            .iter()
            .map(|t| t.name.to_string())
            .collect();

        assert!(
            !names.iter().any(|n| n == "create_issue"),
            "read-only session should hide non-readOnly tools, got {names:?}"
        );
    }
}
