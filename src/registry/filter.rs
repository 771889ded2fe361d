//! The five-filter composition that decides a session's visible tool set
//! (C4, spec §4.4). The registry's visible-tool set is the intersection
//! of these predicates (§8).

use std::collections::HashSet;

use crate::auth::{AuthContext, CredentialKind};
use crate::registry::catalog::ToolRecord;

/// Checks a tool's feature flag. Errors are treated as false (§4.4 item 4).
pub trait FeatureFlagChecker: Send + Sync {
    fn is_enabled(&self, flag: &str) -> bool;
}

/// A checker that enables nothing — the safe default when no flag source
/// is configured.
pub struct NoFlagsEnabled;

impl FeatureFlagChecker for NoFlagsEnabled {
    fn is_enabled(&self, _flag: &str) -> bool {
        false
    }
}

/// Everything the filter pipeline needs to know about one session.
pub struct FilterInput<'a> {
    pub read_only: bool,
    pub enabled_toolsets: &'a HashSet<String>,
    pub allow_list: &'a HashSet<String>,
    pub flags: &'a dyn FeatureFlagChecker,
    pub auth: &'a AuthContext,
}

/// Apply all five filters in order (§4.4); `true` means the tool stays
/// visible.
pub fn is_visible(tool: &ToolRecord, input: &FilterInput) -> bool {
    // 1. Read-only.
    if input.read_only && !tool.read_only {
        return false;
    }

    // 2/3. Toolset enablement, with explicit allow-list bypassing it.
    let toolset_enabled = input.enabled_toolsets.contains(tool.toolset);
    let explicitly_allowed = input.allow_list.contains(tool.name);
    if !toolset_enabled && !explicitly_allowed {
        return false;
    }

    // 4. Feature flag.
    if let Some(flag) = tool.feature_flag {
        if !input.flags.is_enabled(flag) {
            return false;
        }
    }

    // 5. Capability filter. LegacyPAT is treated like ClassicPAT (spec §3):
    // both fetch authoritative scopes via HEAD /user.
    if input.auth.scopes_fetched
        && matches!(
            input.auth.credential_kind,
            CredentialKind::ClassicPAT | CredentialKind::LegacyPAT
        )
        && !tool.required_scopes.is_empty()
    {
        let accepted = tool.accepted_scopes();
        if input.auth.scopes.is_disjoint(&accepted) {
            return false;
        }
    }
    if input.auth.credential_kind == CredentialKind::AppInstallation && tool.requires_user_context() {
        return false;
    }

    true
}

/// Compute the full visible set for a session.
pub fn visible_tools<'a>(
    catalog: &'a [ToolRecord],
    input: &FilterInput,
) -> Vec<&'a ToolRecord> {
    catalog.iter().filter(|t| is_visible(t, input)).collect()
}
