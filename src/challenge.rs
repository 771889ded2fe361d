//! Scope Challenger (C6, spec §4.6).

use std::collections::HashSet;

use crate::auth::AuthContext;
use crate::registry::catalog::ToolRecord;
use crate::scopes::{self, Scope};

/// A 403 scope-challenge ready to be rendered by either transport (stdio
/// MCP error or HTTP `WWW-Authenticate` header).
#[derive(Debug, Clone)]
pub struct ScopeChallenge {
    pub recommended_scopes: Vec<String>,
    pub missing: Vec<String>,
    pub resource_metadata: String,
}

impl ScopeChallenge {
    /// Render the `WWW-Authenticate` header value per §4.6.
    pub fn www_authenticate(&self) -> String {
        format!(
            "Bearer error=\"insufficient_scope\", scope=\"{}\", resource_metadata=\"{}\", error_description=\"Additional scopes required: {}\"",
            self.recommended_scopes.join(" "),
            self.resource_metadata,
            self.missing.join(", "),
        )
    }
}

/// Non-OAuth credentials skip this middleware entirely (§4.6: GitHub's own
/// permission enforcement takes over at call time). Returns `None` when
/// the call may proceed.
pub fn check(
    tool: &ToolRecord,
    auth: &AuthContext,
    is_oauth_authenticated: bool,
    resource_metadata: &str,
) -> Option<ScopeChallenge> {
    if !is_oauth_authenticated || tool.required_scopes.is_empty() {
        return None;
    }

    let haves: HashSet<Scope> = auth.scopes.clone();
    let missing: Vec<String> = scopes::missing(&haves, &tool.required_scopes)
        .into_iter()
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        return None;
    }

    // "Recommended scopes" = granted set ∪ missing-required set (§4.6).
    let mut recommended: Vec<String> = haves.into_iter().collect();
    recommended.sort();
    for m in &missing {
        if !recommended.contains(m) {
            recommended.push(m.clone());
        }
    }

    Some(ScopeChallenge {
        recommended_scopes: recommended,
        missing,
        resource_metadata: resource_metadata.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialKind;

    fn tool(required: &[&str]) -> ToolRecord {
        ToolRecord::test_stub("create_issue", "issues", required)
    }

    #[test]
    fn scenario_1_scope_challenge() {
        // spec §8 scenario 1.
        let auth = AuthContext {
            credential_kind: CredentialKind::OAuthUser,
            scopes: ["public_repo".to_string(), "read:user".to_string()].into(),
            scopes_fetched: true,
        };
        let challenge = check(&tool(&["repo"]), &auth, true, "https://example/metadata").unwrap();
        assert_eq!(challenge.missing, vec!["repo"]);
        let header = challenge.www_authenticate();
        assert!(header.contains("scope=\"public_repo read:user repo\""));
        assert!(header.contains("Additional scopes required: repo"));
    }

    #[test]
    fn parent_scope_satisfies_child_scenario_2() {
        let auth = AuthContext {
            credential_kind: CredentialKind::OAuthUser,
            scopes: ["admin:org".to_string()].into(),
            scopes_fetched: true,
        };
        let challenge = check(&tool(&["read:org"]), &auth, true, "https://example/metadata");
        assert!(challenge.is_none());
    }

    #[test]
    fn non_oauth_credential_skips_check() {
        let auth = AuthContext {
            credential_kind: CredentialKind::FineGrainedPAT,
            scopes: HashSet::new(),
            scopes_fetched: false,
        };
        let challenge = check(&tool(&["repo"]), &auth, false, "https://example/metadata");
        assert!(challenge.is_none());
    }

    #[test]
    fn tool_with_no_required_scopes_never_challenges() {
        let auth = AuthContext {
            credential_kind: CredentialKind::OAuthUser,
            scopes: HashSet::new(),
            scopes_fetched: true,
        };
        let challenge = check(&tool(&[]), &auth, true, "https://example/metadata");
        assert!(challenge.is_none());
    }
}
