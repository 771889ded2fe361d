//! Toolset catalog and the `all`/`default` keyword resolution (spec §3/§4.4 item 2).

use std::collections::HashSet;

/// `(name, default?)` pairs, spec §3's named bundle list.
pub const TOOLSETS: &[(&str, bool)] = &[
    ("repos", true),
    ("issues", true),
    ("pull_requests", true),
    ("actions", false),
    ("context", true),
    ("users", true),
    ("notifications", false),
    ("gists", false),
    ("orgs", false),
    ("projects", false),
    ("discussions", false),
    ("security", false),
    ("code_security", false),
    ("secret_protection", false),
    ("dependabot", false),
    ("experiments", false),
];

pub fn is_known_toolset(name: &str) -> bool {
    TOOLSETS.iter().any(|(t, _)| *t == name)
}

pub fn default_toolsets() -> HashSet<String> {
    TOOLSETS
        .iter()
        .filter(|(_, is_default)| *is_default)
        .map(|(name, _)| name.to_string())
        .collect()
}

pub fn all_toolsets() -> HashSet<String> {
    TOOLSETS.iter().map(|(name, _)| name.to_string()).collect()
}

/// Resolve the caller's requested toolset list (§4.4 item 2).
///
/// - `None` (nil list) -> defaults.
/// - `Some(&[])` (empty list) -> no toolsets (used by dynamic-discovery mode).
/// - Presence of `all` overrides everything else in the list.
/// - `default` expands to the default-marked set; duplicates collapse.
/// - Unknown names are reported separately for a caller-side warning, but
///   never fail resolution.
pub struct Resolution {
    pub enabled: HashSet<String>,
    pub unknown: Vec<String>,
}

pub fn resolve(requested: Option<&[String]>) -> Resolution {
    let Some(requested) = requested else {
        return Resolution {
            enabled: default_toolsets(),
            unknown: Vec::new(),
        };
    };

    if requested.is_empty() {
        return Resolution {
            enabled: HashSet::new(),
            unknown: Vec::new(),
        };
    }

    let trimmed: Vec<String> = requested.iter().map(|s| s.trim().to_string()).collect();

    if trimmed.iter().any(|s| s == "all") {
        return Resolution {
            enabled: all_toolsets(),
            unknown: Vec::new(),
        };
    }

    let mut enabled = HashSet::new();
    let mut unknown = Vec::new();
    for name in trimmed {
        if name == "default" {
            enabled.extend(default_toolsets());
        } else if is_known_toolset(&name) {
            enabled.insert(name);
        } else {
            unknown.push(name);
        }
    }

    Resolution { enabled, unknown }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_list_uses_defaults() {
        let res = resolve(None);
        assert_eq!(res.enabled, default_toolsets());
    }

    #[test]
    fn empty_list_enables_nothing() {
        let res = resolve(Some(&[]));
        assert!(res.enabled.is_empty());
    }

    #[test]
    fn all_overrides_everything_else() {
        let res = resolve(Some(&["repos".to_string(), "all".to_string()]));
        assert_eq!(res.enabled, all_toolsets());
    }

    #[test]
    fn default_keyword_expands() {
        let res = resolve(Some(&["default".to_string(), "actions".to_string()]));
        assert!(res.enabled.contains("repos"));
        assert!(res.enabled.contains("actions"));
    }

    #[test]
    fn duplicates_collapse() {
        let res = resolve(Some(&["repos".to_string(), "repos".to_string()]));
        assert_eq!(res.enabled.len(), 1);
    }

    #[test]
    fn unknown_names_collected_not_fatal() {
        let res = resolve(Some(&["repos".to_string(), "bogus".to_string()]));
        assert!(res.enabled.contains("repos"));
        assert_eq!(res.unknown, vec!["bogus".to_string()]);
    }

    #[test]
    fn trims_whitespace() {
        let res = resolve(Some(&[" repos ".to_string()]));
        assert!(res.enabled.contains("repos"));
    }
}
