//! Process-wide configuration: env vars layered under an optional YAML
//! file, `clap` overrides applied last (ambient, §3 of SPEC_FULL.md).
//!
//! Grounded in the teacher's `config.rs`: the `load_dotenv` `Once` guard,
//! the `Config::load` (read file -> env-var expand -> parse) shape, and
//! `serde(default = "...")` per-field fallbacks are all carried over,
//! repointed at this crate's own settings.

use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

static DOTENV_ONCE: Once = Once::new();

/// Load `~/.env` into the process environment exactly once. Must run
/// before any concurrent tasks are spawned (teacher's rationale, carried
/// unchanged: `set_var` is unsound if another thread is concurrently
/// reading the environment).
pub fn load_dotenv() {
    DOTENV_ONCE.call_once(|| {
        let env_path = dirs::home_dir()
            .map(|h| h.join(".env"))
            .filter(|p| p.is_file());
        if let Some(env_file) = env_path
            && let Ok(contents) = std::fs::read_to_string(&env_file)
        {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    // SAFETY: single-call-once, before any task spawns.
                    unsafe { std::env::set_var(key.trim(), value.trim()) };
                }
            }
        }
    });
}

/// Top-level octoproxy configuration (spec §6 "Environment variables").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `GITHUB_PERSONAL_ACCESS_TOKEN` — stdio mode's only credential
    /// source; HTTP mode reads a fresh `Authorization` header per request
    /// instead (§4.5 step 1).
    #[serde(default)]
    pub github_pat: Option<String>,

    /// GitHub Enterprise Server host. Empty means github.com (§6).
    #[serde(default)]
    pub github_host: String,

    #[serde(default)]
    pub lockdown: LockdownConfig,

    #[serde(default)]
    pub feature_flags: Vec<String>,

    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockdownConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Repo-access cache entry TTL override (§3 "Refreshed on read after a
    /// configurable TTL (default 10 minutes)").
    #[serde(default = "default_lockdown_ttl", with = "humantime_secs")]
    pub ttl: Duration,
}

impl Default for LockdownConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: default_lockdown_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Optional `X-API-Key` gate (§6 "Optional X-API-Key gating").
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            api_key: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_lockdown_ttl() -> Duration {
    Duration::from_secs(600)
}

fn default_bind() -> String {
    "0.0.0.0:8082".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            github_pat: None,
            github_host: String::new(),
            lockdown: LockdownConfig::default(),
            feature_flags: Vec::new(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Load: start from the env-derived default, layer a YAML file over it
    /// if present, then let env vars win for the handful of settings that
    /// have a direct 1:1 env var (teacher's layering order in `config.rs`,
    /// adapted: env < file in the teacher, file < env here since the spec's
    /// own §6 names env vars as the primary surface for a CLI/stdio tool).
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_yaml_ng::from_str(&raw)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        } else {
            Config::default()
        };

        if let Ok(pat) = std::env::var("GITHUB_PERSONAL_ACCESS_TOKEN") {
            config.github_pat = Some(pat);
        }
        if let Ok(host) = std::env::var("GITHUB_HOST") {
            config.github_host = host;
        }
        if let Ok(level) = std::env::var("OCTOPROXY_LOG_LEVEL") {
            config.log_level = level;
        }
        if let Ok(flags) = std::env::var("OCTOPROXY_FEATURE_FLAGS") {
            config.feature_flags = flags.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }
        if let Ok(ttl) = std::env::var("OCTOPROXY_LOCKDOWN_TTL_SECS")
            && let Ok(secs) = ttl.parse::<u64>()
        {
            config.lockdown.ttl = Duration::from_secs(secs);
        }
        if let Ok(key) = std::env::var("OCTOPROXY_API_KEY") {
            config.http.api_key = Some(key);
        }
        if let Ok(bind) = std::env::var("OCTOPROXY_BIND") {
            config.http.bind = bind;
        }

        Ok(config)
    }
}

/// A feature-flag snapshot shared across sessions without locking readers
/// (design note in SPEC_FULL.md §3: `arc-swap` for this, matching the
/// teacher's hot-reloadable `Arc<ArcSwap<Config>>` pattern for its own
/// config).
pub type FeatureFlagSnapshot = arc_swap::ArcSwap<Vec<String>>;

pub struct ConfigFlagChecker {
    flags: std::sync::Arc<FeatureFlagSnapshot>,
}

impl ConfigFlagChecker {
    pub fn new(flags: Vec<String>) -> Self {
        Self {
            flags: std::sync::Arc::new(arc_swap::ArcSwap::from_pointee(flags)),
        }
    }
}

impl crate::registry::filter::FeatureFlagChecker for ConfigFlagChecker {
    fn is_enabled(&self, flag: &str) -> bool {
        self.flags.load().iter().any(|f| f == flag)
    }
}

/// `humantime`-free seconds<->Duration serde helper, since the teacher
/// pulls in `humantime-serde` only for its health-check intervals and this
/// crate has a single duration field — not worth a new dependency for one
/// field (design note §9 spirit: no fabricated/needless deps).
mod humantime_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
