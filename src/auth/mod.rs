//! Credential Classifier (C5, spec §4.5) and per-connection auth state.

pub mod credential;

use std::collections::HashSet;

use tracing::warn;

pub use credential::{classify_credential, parse_authorization_header, Credential, CredentialKind};

use crate::github::GitHubClient;
use crate::scopes::Scope;

/// The caller's classified credential plus whatever the scope fetch
/// discovered (spec §3 "Connection context").
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub credential_kind: CredentialKind,
    pub scopes: HashSet<Scope>,
    /// True iff scopes were authoritatively fetched (vs. simply absent
    /// for a kind that never carries them). The registry's capability
    /// filter (§4.4 item 5) only applies when this is true.
    pub scopes_fetched: bool,
}

impl AuthContext {
    pub fn unauthenticated() -> Self {
        Self {
            credential_kind: CredentialKind::Unknown,
            scopes: HashSet::new(),
            scopes_fetched: false,
        }
    }
}

/// Build the auth context for one classified credential: fetch scopes if
/// the kind warrants it, degrading gracefully on failure (§4.5 step 3,
/// §8 "Scope fetch timeout does not block startup").
pub async fn build_auth_context(credential: &Credential, client: &GitHubClient) -> AuthContext {
    if !credential.kind.fetches_scopes() {
        return AuthContext {
            credential_kind: credential.kind,
            scopes: HashSet::new(),
            scopes_fetched: false,
        };
    }

    match client.head_user_scopes().await {
        Ok(Some(header)) => AuthContext {
            credential_kind: credential.kind,
            scopes: parse_scope_header(&header),
            scopes_fetched: true,
        },
        Ok(None) => {
            warn!("HEAD /user returned no X-OAuth-Scopes header; scope filtering disabled");
            AuthContext {
                credential_kind: credential.kind,
                scopes: HashSet::new(),
                scopes_fetched: false,
            }
        }
        Err(err) => {
            warn!(error = %err, "scope fetch failed; serving with scope filtering disabled");
            AuthContext {
                credential_kind: credential.kind,
                scopes: HashSet::new(),
                scopes_fetched: false,
            }
        }
    }
}

fn parse_scope_header(header: &str) -> HashSet<Scope> {
    header
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_scope_header() {
        let scopes = parse_scope_header("repo, read:org,  user:email");
        assert!(scopes.contains("repo"));
        assert!(scopes.contains("read:org"));
        assert!(scopes.contains("user:email"));
        assert_eq!(scopes.len(), 3);
    }

    #[test]
    fn empty_header_yields_empty_set() {
        assert!(parse_scope_header("").is_empty());
    }
}
