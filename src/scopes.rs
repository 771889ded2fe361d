//! OAuth scope hierarchy and satisfaction (C1, spec §3/§4.1).

use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// An OAuth scope identifier, e.g. `repo` or `read:org`.
pub type Scope = String;

/// parent -> direct children, built once and never mutated.
static HIERARCHY: LazyLock<HashMap<&'static str, &'static [&'static str]>> = LazyLock::new(|| {
    HashMap::from([
        (
            "repo",
            [
                "public_repo",
                "repo:status",
                "repo_deployment",
                "repo:invite",
                "security_events",
            ]
            .as_slice(),
        ),
        ("admin:org", ["write:org"].as_slice()),
        ("write:org", ["read:org"].as_slice()),
        ("admin:repo_hook", ["write:repo_hook"].as_slice()),
        ("write:repo_hook", ["read:repo_hook"].as_slice()),
        ("admin:public_key", ["write:public_key"].as_slice()),
        ("write:public_key", ["read:public_key"].as_slice()),
        ("admin:gpg_key", ["write:gpg_key"].as_slice()),
        ("write:gpg_key", ["read:gpg_key"].as_slice()),
        ("project", ["read:project"].as_slice()),
        ("user", ["read:user", "user:email", "user:follow"].as_slice()),
        ("write:packages", ["read:packages"].as_slice()),
    ])
});

/// Per-scope memoized "accepted for" sets (§4.1 `AcceptedFor`).
static ACCEPTED_CACHE: LazyLock<DashMap<Scope, std::sync::Arc<HashSet<Scope>>>> =
    LazyLock::new(DashMap::new);

/// True iff `have` is `need`, or a transitive parent of `need`.
///
/// Walks the hierarchy depth-first with a seen-set, so a data error that
/// introduces a cycle degrades to "no match found" instead of looping
/// forever (design note §9).
pub fn includes(have: &str, need: &str) -> bool {
    if have == need {
        return true;
    }
    let mut seen: HashSet<&str> = HashSet::new();
    includes_from(have, need, &mut seen)
}

fn includes_from<'a>(node: &'a str, need: &str, seen: &mut HashSet<&'a str>) -> bool {
    if !seen.insert(node) {
        return false;
    }
    let Some(children) = HIERARCHY.get(node) else {
        return false;
    };
    for &child in children.iter() {
        if child == need {
            return true;
        }
        if includes_from(child, need, seen) {
            return true;
        }
    }
    false
}

/// True iff every scope in `needs` is satisfied by some scope in `haves`.
pub fn satisfies<'a, H, N>(haves: H, needs: N) -> bool
where
    H: IntoIterator<Item = &'a str> + Clone,
    N: IntoIterator<Item = &'a str>,
{
    needs
        .into_iter()
        .all(|need| haves.clone().into_iter().any(|have| includes(have, need)))
}

/// The set of scopes that would satisfy `need`: `need` itself plus every
/// transitive parent. Memoized on first call per scope.
pub fn accepted_for(need: &str) -> std::sync::Arc<HashSet<Scope>> {
    if let Some(cached) = ACCEPTED_CACHE.get(need) {
        return cached.clone();
    }
    let mut set = HashSet::new();
    set.insert(need.to_string());
    for &parent in HIERARCHY.keys() {
        if includes(parent, need) {
            set.insert(parent.to_string());
        }
    }
    let set = std::sync::Arc::new(set);
    ACCEPTED_CACHE.insert(need.to_string(), set.clone());
    set
}

/// The missing scopes from `needs` that `haves` does not satisfy, in the
/// order given by `needs`.
pub fn missing<'a>(haves: &HashSet<Scope>, needs: &'a [Scope]) -> Vec<&'a str> {
    needs
        .iter()
        .filter(|need| !satisfies(haves.iter().map(String::as_str), [need.as_str()]))
        .map(String::as_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_child_included() {
        assert!(includes("repo", "public_repo"));
        assert!(includes("admin:org", "read:org"));
    }

    #[test]
    fn self_included() {
        assert!(includes("repo", "repo"));
    }

    #[test]
    fn unrelated_not_included() {
        assert!(!includes("public_repo", "repo"));
        assert!(!includes("read:org", "admin:org"));
    }

    #[test]
    fn satisfies_parent_covers_child() {
        // Scenario 2 from spec §8: {admin:org} satisfies read:org.
        let haves = ["admin:org"];
        assert!(satisfies(haves, ["read:org"]));
    }

    #[test]
    fn satisfies_requires_every_need() {
        let haves = ["public_repo", "read:user"];
        assert!(!satisfies(haves, ["repo"]));
    }

    #[test]
    fn accepted_for_contains_self_and_parents() {
        let set = accepted_for("read:org");
        assert!(set.contains("read:org"));
        assert!(set.contains("write:org"));
        assert!(set.contains("admin:org"));
        assert!(!set.contains("repo"));
    }

    #[test]
    fn missing_reports_unsatisfied_needs_in_order() {
        let haves: HashSet<Scope> = ["public_repo".to_string(), "read:user".to_string()].into();
        let needs = vec!["repo".to_string(), "public_repo".to_string()];
        assert_eq!(missing(&haves, &needs), vec!["repo"]);
    }

    #[test]
    fn cycle_safe_dfs_terminates() {
        // No real cycles exist in HIERARCHY, but includes_from must not
        // infinite-loop if it ever walked a cyclic structure. A deep but
        // acyclic walk should simply terminate with a false/true answer.
        assert!(!includes("repo", "does_not_exist"));
    }
}
