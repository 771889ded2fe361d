//! `clap`-derived CLI (ambient, §3 of SPEC_FULL.md).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "octoproxy",
    version,
    about = "MCP bridge exposing the GitHub REST and GraphQL APIs to MCP clients"
)]
pub struct Cli {
    /// Path to an optional YAML config file layered under env vars.
    #[arg(short, long, default_value = "config/octoproxy.yaml")]
    pub config: PathBuf,

    /// Comma-separated toolset list, or the keywords `all`/`default`.
    /// Omit for the default toolset (spec §3/§4.4 item 2).
    #[arg(long, value_delimiter = ',')]
    pub toolsets: Option<Vec<String>>,

    /// Explicit tool names that bypass toolset filtering (§4.4 item 3).
    #[arg(long = "tools", value_delimiter = ',')]
    pub tools: Vec<String>,

    /// Drop every tool not marked read-only (§4.4 item 1).
    #[arg(long)]
    pub read_only: bool,

    /// Start with no toolsets enabled; the agent enables them at runtime
    /// via the `enable_toolset` meta-tool (§4.4 "Dynamic toolsets").
    #[arg(long)]
    pub dynamic_toolsets: bool,

    /// GitHub Enterprise Server host. Omit for github.com (§6).
    #[arg(long)]
    pub host: Option<String>,

    /// Override the configured log level (e.g. `debug`, `trace`).
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Clone, Subcommand)]
pub enum Command {
    /// Serve streamable MCP over HTTP instead of stdio (§6 "HTTP mode").
    Serve {
        /// Bind address. Defaults to the configured value (0.0.0.0:8082).
        #[arg(long)]
        bind: Option<String>,
    },
}

/// `~/.octoproxy` — mirrors the teacher's per-user home directory
/// convention (`cli::prismgate_home` in the teacher's `cli.rs`), repointed
/// at this crate's own namespace.
pub fn octoproxy_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".octoproxy")
}
