//! Credential extraction for each transport (§4.5 step 1, §6 HTTP notes).

use crate::auth::credential::{self, Credential};
use crate::error::ClassifyError;

/// stdio mode: the only credential source is the configured personal
/// access token (there is no per-request header to read).
pub fn credential_from_config(pat: Option<&str>) -> Option<Credential> {
    pat.map(|t| credential::classify_credential(t.to_string()))
}

/// HTTP mode: every request must carry its own `Authorization` header
/// (§6 "every request must carry its own, valid Authorization header").
pub fn credential_from_header(header: Option<&str>) -> Result<Credential, ClassifyError> {
    let header = header.ok_or(ClassifyError::MissingCredential)?;
    let token = credential::parse_authorization_header(header)?;
    Ok(credential::classify_credential(token))
}
