//! Crate-wide error taxonomy (§7 of the spec).

use http::StatusCode;
use thiserror::Error;

/// A GitHub REST/GraphQL/raw API error, carrying enough of the original
/// response that callers can unwrap either the HTTP shape or the error
/// chain (§7(e)/(f), §4.8 step 5).
#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("GitHub API request failed: {message}")]
    Api {
        message: String,
        status: Option<StatusCode>,
        body_summary: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("GitHub GraphQL request returned errors: {message}")]
    GraphQl {
        message: String,
        errors: Vec<String>,
    },

    #[error("request was cancelled")]
    Cancelled,

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl GitHubError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GitHubError::Api { status, .. } => *status,
            GitHubError::Transport(e) => e
                .status()
                .and_then(|s| StatusCode::from_u16(s.as_u16()).ok()),
            _ => None,
        }
    }

    /// A short, human-readable message safe to show a model or a terminal.
    /// Never includes the raw Authorization header or token body (§7).
    pub fn user_message(&self) -> String {
        match self {
            GitHubError::Api { message, status, .. } => match status {
                Some(s) => format!("GitHub API error ({s}): {message}"),
                None => format!("GitHub API error: {message}"),
            },
            GitHubError::GraphQl { message, errors } => {
                format!("GitHub GraphQL error: {message} ({} error(s))", errors.len())
            }
            GitHubError::Cancelled => "request cancelled".to_string(),
            GitHubError::Transport(e) => format!("transport error: {e}"),
        }
    }
}

/// Errors raised while classifying a caller's credential (C5).
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("missing Authorization header")]
    MissingCredential,

    #[error("unsupported authorization scheme: {0}")]
    UnsupportedScheme(String),
}
