//! Credential parsing and classification (C5, spec §3/§4.5).

use crate::error::ClassifyError;

/// The classified shape of a caller's bearer token (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    ClassicPAT,
    FineGrainedPAT,
    OAuthUser,
    AppInstallation,
    LegacyPAT,
    AgentSession,
    Unknown,
}

impl CredentialKind {
    /// True for ClassicPAT/LegacyPAT, the only kinds whose scopes are
    /// fetched via `HEAD /user` (§4.5).
    pub fn fetches_scopes(self) -> bool {
        matches!(self, CredentialKind::ClassicPAT | CredentialKind::LegacyPAT)
    }
}

/// A caller's credential. The raw token never appears in `Debug` or logs
/// (§7: "secrets never appear in error text").
#[derive(Clone)]
pub struct Credential {
    raw: String,
    pub kind: CredentialKind,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("raw", &"<redacted>")
            .finish()
    }
}

impl Credential {
    pub fn token(&self) -> &str {
        &self.raw
    }
}

/// Extract the bearer token from an `Authorization` header value.
/// Case-insensitive `Bearer `; `GitHub-Bearer …` is explicitly rejected
/// (§6), everything else unsupported.
pub fn parse_authorization_header(header: &str) -> Result<String, ClassifyError> {
    let trimmed = header.trim();
    let lower = trimmed.to_lowercase();
    if lower.starts_with("github-bearer") {
        return Err(ClassifyError::UnsupportedScheme("GitHub-Bearer".into()));
    }
    if let Some(rest) = trimmed.get(0..7) {
        if rest.eq_ignore_ascii_case("bearer ") {
            return Ok(trimmed[7..].trim().to_string());
        }
    }
    Err(ClassifyError::UnsupportedScheme(
        trimmed.split_whitespace().next().unwrap_or(trimmed).to_string(),
    ))
}

/// Classify a raw token by prefix or shape (spec §3).
pub fn classify(token: &str) -> CredentialKind {
    if token.starts_with("ghp_") {
        CredentialKind::ClassicPAT
    } else if token.starts_with("github_pat_") {
        CredentialKind::FineGrainedPAT
    } else if token.starts_with("gho_") || token.starts_with("ghu_") {
        CredentialKind::OAuthUser
    } else if token.starts_with("ghs_") {
        CredentialKind::AppInstallation
    } else if token.contains(':') {
        CredentialKind::AgentSession
    } else if token.len() == 40 && token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()) {
        CredentialKind::LegacyPAT
    } else {
        CredentialKind::Unknown
    }
}

pub fn classify_credential(token: String) -> Credential {
    let kind = classify(&token);
    Credential { raw: token, kind }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bearer_case_insensitive() {
        assert_eq!(parse_authorization_header("bearer abc123").unwrap(), "abc123");
        assert_eq!(parse_authorization_header("Bearer abc123").unwrap(), "abc123");
        assert_eq!(parse_authorization_header("BEARER abc123").unwrap(), "abc123");
    }

    #[test]
    fn rejects_github_bearer() {
        let err = parse_authorization_header("GitHub-Bearer abc123").unwrap_err();
        assert!(matches!(err, ClassifyError::UnsupportedScheme(_)));
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(parse_authorization_header("Basic abc123").is_err());
    }

    #[test]
    fn round_trips_token_verbatim() {
        // §8: "Parsing an authorization header and re-emitting it yields
        // the original token verbatim for all accepted forms."
        for token in ["ghp_abc", "github_pat_abc", "gho_abc", "ghs_abc", "a".repeat(40).as_str()] {
            let header = format!("Bearer {token}");
            assert_eq!(parse_authorization_header(&header).unwrap(), token);
        }
    }

    #[test]
    fn classifies_classic_pat() {
        assert_eq!(classify("ghp_abcdef"), CredentialKind::ClassicPAT);
    }

    #[test]
    fn classifies_fine_grained_pat() {
        assert_eq!(classify("github_pat_abcdef"), CredentialKind::FineGrainedPAT);
    }

    #[test]
    fn classifies_oauth_user() {
        assert_eq!(classify("gho_abcdef"), CredentialKind::OAuthUser);
        assert_eq!(classify("ghu_abcdef"), CredentialKind::OAuthUser);
    }

    #[test]
    fn classifies_app_installation() {
        assert_eq!(classify("ghs_abcdef"), CredentialKind::AppInstallation);
    }

    #[test]
    fn classifies_legacy_pat() {
        let token = "a".repeat(40);
        assert_eq!(classify(&token), CredentialKind::LegacyPAT);
    }

    #[test]
    fn classifies_agent_session() {
        assert_eq!(
            classify("tid=1;exp=2;chat=3:deadbeef"),
            CredentialKind::AgentSession
        );
    }

    #[test]
    fn classifies_unknown() {
        assert_eq!(classify("not-a-real-token"), CredentialKind::Unknown);
    }

    #[test]
    fn debug_redacts_token() {
        let cred = classify_credential("ghp_supersecret".to_string());
        let rendered = format!("{cred:?}");
        assert!(!rendered.contains("supersecret"));
    }
}
