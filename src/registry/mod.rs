//! Tool Registry (C4, spec §4.4).

pub mod catalog;
pub mod filter;
pub mod toolsets;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::auth::AuthContext;
use catalog::ToolRecord;
use filter::{FeatureFlagChecker, FilterInput};

/// Process-lifetime catalog, built once in `main::initialize` and never
/// mutated thereafter (§5 "Tool catalog: built once, read-only thereafter.
/// No lock needed.").
pub struct ToolCatalog {
    tools: Vec<ToolRecord>,
    /// old name -> canonical name (§4.4 "Deprecated aliases").
    aliases: HashMap<&'static str, &'static str>,
}

impl ToolCatalog {
    pub fn new(tools: Vec<ToolRecord>) -> Self {
        let mut aliases = HashMap::new();
        for tool in &tools {
            for &old in tool.deprecated_aliases {
                aliases.insert(old, tool.name);
            }
        }
        info!(tools = tools.len(), aliases = aliases.len(), "tool catalog built");
        Self { tools, aliases }
    }

    /// Resolve a possibly-deprecated name to its canonical form.
    /// Idempotent: resolving twice yields the same canonical name (§8).
    pub fn resolve_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).copied().unwrap_or(name)
    }

    pub fn get(&self, name: &str) -> Option<&ToolRecord> {
        let canonical = self.resolve_name(name);
        self.tools.iter().find(|t| t.name == canonical)
    }

    pub fn all(&self) -> &[ToolRecord] {
        &self.tools
    }
}

/// Per-connection mutable view over the process-wide catalog (§4.4,
/// §5 "Per-session registry view... mutated only by dynamic enable/disable").
pub struct SessionRegistry {
    catalog: Arc<ToolCatalog>,
    read_only: bool,
    allow_list: HashSet<String>,
    flags: Arc<dyn FeatureFlagChecker>,
    /// Single guard around the enabled-toolset map, per §5.
    enabled_toolsets: RwLock<HashSet<String>>,
}

impl SessionRegistry {
    pub fn new(
        catalog: Arc<ToolCatalog>,
        requested_toolsets: Option<&[String]>,
        explicit_tools: &[String],
        read_only: bool,
        flags: Arc<dyn FeatureFlagChecker>,
    ) -> (Self, Vec<String>) {
        let resolution = toolsets::resolve(requested_toolsets);
        let allow_list: HashSet<String> = explicit_tools
            .iter()
            .map(|name| catalog.resolve_name(name).to_string())
            .collect();

        let session = Self {
            catalog,
            read_only,
            allow_list,
            flags,
            enabled_toolsets: RwLock::new(resolution.enabled),
        };
        (session, resolution.unknown)
    }

    /// Compute the currently visible tool set (§4.4, intersection of filters).
    pub async fn visible(&self, auth: &AuthContext) -> Vec<&ToolRecord> {
        let enabled = self.enabled_toolsets.read().await;
        let input = FilterInput {
            read_only: self.read_only,
            enabled_toolsets: &enabled,
            allow_list: &self.allow_list,
            flags: self.flags.as_ref(),
            auth,
        };
        filter::visible_tools(self.catalog.all(), &input)
    }

    /// Look up a tool by (possibly deprecated) name, but only if it is
    /// currently visible — a disabled toolset's tools fail as unknown
    /// (§8 "toggling a toolset off... causes subsequent calls to fail as
    /// unknown").
    pub async fn lookup_visible(&self, name: &str, auth: &AuthContext) -> Option<&ToolRecord> {
        let canonical = self.catalog.resolve_name(name);
        let tool = self.catalog.get(canonical)?;
        let visible = self.visible(auth).await;
        visible.iter().any(|t| t.name == tool.name).then_some(tool)
    }

    /// Enable a toolset at runtime (dynamic-toolset meta-tool, §4.4
    /// "Dynamic toolsets").
    pub async fn enable_toolset(&self, name: &str) -> bool {
        if !toolsets::is_known_toolset(name) {
            return false;
        }
        let mut enabled = self.enabled_toolsets.write().await;
        enabled.insert(name.to_string());
        true
    }

    pub async fn disable_toolset(&self, name: &str) -> bool {
        let mut enabled = self.enabled_toolsets.write().await;
        enabled.remove(name)
    }

    pub async fn enabled_toolset_names(&self) -> Vec<String> {
        self.enabled_toolsets.read().await.iter().cloned().collect()
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthContext;
    use catalog::ToolRecord;
    use filter::NoFlagsEnabled;

    fn catalog() -> Arc<ToolCatalog> {
        let tools = vec![
            ToolRecord::test_stub("list_issues", "issues", &[]),
            ToolRecord::test_stub("create_issue", "issues", &["repo"]),
        ];
        Arc::new(ToolCatalog::new(tools))
    }

    #[tokio::test]
    async fn toggling_toolset_off_hides_tools_and_fails_unknown_scenario_5() {
        let (session, _) = SessionRegistry::new(
            catalog(),
            Some(&["issues".to_string()]),
            &[],
            false,
            Arc::new(NoFlagsEnabled),
        );
        let auth = AuthContext::unauthenticated();
        assert!(session.lookup_visible("list_issues", &auth).await.is_some());

        session.disable_toolset("issues").await;
        assert!(session.lookup_visible("list_issues", &auth).await.is_none());
    }

    #[tokio::test]
    async fn enabling_unknown_toolset_fails() {
        let (session, _) = SessionRegistry::new(catalog(), Some(&[]), &[], false, Arc::new(NoFlagsEnabled));
        assert!(!session.enable_toolset("not_a_real_toolset").await);
    }

    #[tokio::test]
    async fn deprecated_alias_resolves_to_canonical_and_is_idempotent() {
        let mut tools = vec![ToolRecord::test_stub("list_issues", "issues", &[])];
        tools[0].deprecated_aliases = &["get_issues"];
        let catalog = Arc::new(ToolCatalog::new(tools));

        let once = catalog.resolve_name("get_issues");
        let twice = catalog.resolve_name(once);
        assert_eq!(once, "list_issues");
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn unknown_requested_toolsets_are_reported() {
        let (_session, unknown) = SessionRegistry::new(
            catalog(),
            Some(&["issues".to_string(), "bogus".to_string()]),
            &[],
            false,
            Arc::new(NoFlagsEnabled),
        );
        assert_eq!(unknown, vec!["bogus".to_string()]);
    }
}
