//! GitHub.com vs. GitHub Enterprise Server host resolution (spec §6).

use tracing::{debug, warn};

/// Base URLs for every GitHub surface this crate talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub rest: String,
    pub graphql: String,
    pub upload: String,
    pub raw: String,
}

impl Endpoints {
    /// GitHub.com's fixed endpoint set, with no network probe required.
    /// Public so integration tests can build a [`GitHubClient`](crate::github::GitHubClient)
    /// without making outbound requests during bring-up.
    pub fn dot_com_for_test() -> Self {
        Self::dot_com()
    }

    fn dot_com() -> Self {
        Self {
            rest: "https://api.github.com".to_string(),
            graphql: "https://api.github.com/graphql".to_string(),
            upload: "https://uploads.github.com".to_string(),
            raw: "https://raw.githubusercontent.com".to_string(),
        }
    }

    fn subdomain_isolated(host: &str) -> Self {
        Self {
            rest: format!("https://api.{host}"),
            graphql: format!("https://api.{host}/graphql"),
            upload: format!("https://uploads.{host}"),
            raw: format!("https://raw.{host}"),
        }
    }

    fn path_prefixed(host: &str) -> Self {
        Self {
            rest: format!("https://{host}/api/v3"),
            graphql: format!("https://{host}/api/graphql"),
            upload: format!("https://{host}/api/uploads"),
            raw: format!("https://{host}/raw"),
        }
    }
}

/// Resolve the endpoint set for `host`. `host == "github.com"` (or empty)
/// always means GitHub.com. Otherwise probes `https://raw.<host>/_ping`:
/// success means subdomain-isolation layout, failure means path-prefix
/// layout (`/api/v3`, …) — per spec §6.
pub async fn resolve(host: &str, client: &reqwest::Client) -> Endpoints {
    if host.is_empty() || host.eq_ignore_ascii_case("github.com") {
        return Endpoints::dot_com();
    }

    let probe_url = format!("https://raw.{host}/_ping");
    match client.get(&probe_url).send().await {
        Ok(resp) if resp.status().is_success() => {
            debug!(host, "enterprise server: subdomain-isolation layout detected");
            Endpoints::subdomain_isolated(host)
        }
        _ => {
            warn!(host, "enterprise server: falling back to path-prefix layout");
            Endpoints::path_prefixed(host)
        }
    }
}
