mod admin;
mod auth;
mod challenge;
mod cli;
mod config;
mod dispatch;
mod error;
mod github;
mod lockdown;
mod mcp_lifecycle_tests;
mod registry;
mod scopes;
mod server;
mod shaper;
mod tools;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use rmcp::{transport::stdio, ServiceExt};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::{Config, ConfigFlagChecker};
use registry::ToolCatalog;
use server::context::{self, ConnectionRequest};
use server::middleware::credential_from_config;
use server::OctoproxyServer;

/// Everything shared bring-up produces: the process-wide catalog, feature
/// flags, an `Arc<Config>`, and an `http::Client` reused by every
/// connection's GitHub client (§5 "Tool catalog: built once").
struct Initialized {
    http: reqwest::Client,
    catalog: Arc<ToolCatalog>,
    flags: Arc<ConfigFlagChecker>,
    config: Arc<Config>,
}

/// Shared initialization: `.env`, config load, tracing, catalog (§4.7,
/// mirroring the teacher's `initialize()` shape).
async fn initialize(cli: &cli::Cli) -> Result<Initialized> {
    config::load_dotenv();

    let octoproxy_home = cli::octoproxy_home();
    if !octoproxy_home.exists() {
        std::fs::create_dir_all(&octoproxy_home)?;
        eprintln!("created octoproxy home directory: {}", octoproxy_home.display());
    }

    let mut config = Config::load(&cli.config)?;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(host) = &cli.host {
        config.github_host = host.clone();
    }

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!(
        config_path = %cli.config.display(),
        github_host = %config.github_host,
        "octoproxy starting"
    );

    let catalog = Arc::new(ToolCatalog::new(tools::build_catalog()));
    let flags = Arc::new(ConfigFlagChecker::new(config.feature_flags.clone()));
    let http = reqwest::Client::new();

    Ok(Initialized {
        http,
        catalog,
        flags,
        config: Arc::new(config),
    })
}

/// stdio mode: one MCP session over stdin/stdout, credential fixed for
/// the process lifetime (§4.5 "once per process", §6 "Stdio mode").
async fn run_stdio(init: Initialized, cli: &cli::Cli) -> Result<()> {
    let credential = credential_from_config(init.config.github_pat.as_deref());

    // Dynamic-toolset mode starts with nothing enabled regardless of any
    // `--toolsets` list; the agent enables toolsets at runtime via the
    // meta-tools (§4.4 "Dynamic toolsets").
    let no_toolsets: Vec<String> = Vec::new();
    let requested_toolsets: Option<&[String]> = if cli.dynamic_toolsets {
        Some(&no_toolsets)
    } else {
        cli.toolsets.as_deref()
    };

    let ctx = context::build(
        init.http,
        init.catalog,
        init.flags,
        ConnectionRequest {
            credential,
            host: &init.config.github_host,
            requested_toolsets,
            explicit_tools: &cli.tools,
            read_only: cli.read_only,
            lockdown_enabled: init.config.lockdown.enabled,
            lockdown_ttl: init.config.lockdown.ttl,
            resource_metadata: format!(
                "https://{}/.well-known/oauth-protected-resource",
                if init.config.github_host.is_empty() {
                    "github.com"
                } else {
                    &init.config.github_host
                }
            ),
        },
    )
    .await;

    let server = OctoproxyServer::new(Arc::new(ctx));

    eprintln!("octoproxy stdio server starting");
    info!("starting MCP stdio server");
    let service = server.serve(stdio()).await?;

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

        tokio::select! {
            result = service.waiting() => {
                if let Err(err) = result {
                    warn!(error = %err, "MCP service exited with error");
                }
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        service.waiting().await?;
    }

    info!("shutting down");
    Ok(())
}

/// HTTP mode: streamable MCP over `axum`, a fresh logical server built per
/// request from its own `Authorization` header (§4.7, §6 "HTTP mode").
async fn run_http(init: Initialized, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| init.config.http.bind.clone());

    let state = admin::HttpState {
        http_client: init.http,
        catalog: init.catalog,
        flags: init.flags,
        config: init.config,
    };

    let cancel = tokio_util::sync::CancellationToken::new();
    let router = admin::router(state, cancel.clone());

    let shutdown = Arc::new(tokio::sync::Notify::new());
    {
        let shutdown = Arc::clone(&shutdown);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            #[cfg(unix)]
            {
                let mut sigterm =
                    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                        .expect("failed to install SIGTERM handler");
                let mut sigint =
                    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
                        .expect("failed to install SIGINT handler");
                tokio::select! {
                    _ = sigterm.recv() => info!("received SIGTERM"),
                    _ = sigint.recv() => info!("received SIGINT"),
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
            cancel.cancel();
            shutdown.notify_waiters();
        });
    }

    admin::serve(router, &bind, shutdown).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let init = initialize(&cli).await?;

    match cli.command.clone() {
        Some(cli::Command::Serve { bind }) => run_http(init, bind).await,
        None => run_stdio(init, &cli).await,
    }
}
