//! Lockdown access filter (C3, spec §4.3).
//!
//! A process-wide cache (design note §9: "gate it behind a type that owns
//! the map and the TTL and lets callers inject a clock for testing"),
//! grounded in the teacher's `DashMap`-backed registry and its TTL-driven
//! refresh pattern in `backend/health.rs`.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::GitHubError;
use crate::github::GraphQlClient;

/// Injectable clock so tests can control TTL expiry without sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    is_private: bool,
    has_push_access: bool,
    loaded_at: DateTime<Utc>,
}

/// Key is always lowercased before lookup/insert (spec §3 repo-access
/// entry key).
type Key = (String, String, String);

pub struct LockdownCache {
    entries: DashMap<Key, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl LockdownCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    /// True iff the repository is public and the viewer lacks push access.
    /// Private repositories are never scrubbed (§4.3).
    ///
    /// A miss or stale entry triggers exactly one GraphQL probe (absent a
    /// concurrent racer, which is acceptable per §5: probes are idempotent
    /// and cheap, last write wins). Errors are never cached — the next
    /// call retries.
    pub async fn should_scrub(
        &self,
        client: &dyn GraphQlClient,
        viewer: &str,
        owner: &str,
        repo: &str,
    ) -> Result<bool, GitHubError> {
        let key: Key = (
            viewer.to_lowercase(),
            owner.to_lowercase(),
            repo.to_lowercase(),
        );

        if let Some(entry) = self.entries.get(&key) {
            let age = self.clock.now().signed_duration_since(entry.loaded_at);
            if age.to_std().unwrap_or(Duration::MAX) < self.ttl {
                return Ok(entry.is_private.not_scrub_if_private(entry.has_push_access));
            }
        }

        let probe = client.probe_repo_access(owner, repo, viewer).await?;
        let entry = CacheEntry {
            is_private: probe.is_private,
            has_push_access: probe.has_push_access,
            loaded_at: self.clock.now(),
        };
        let scrub = entry.is_private.not_scrub_if_private(entry.has_push_access);
        self.entries.insert(key, entry);
        Ok(scrub)
    }
}

/// Small extension so the "scrub iff public AND no push access" rule
/// reads the same way at both call sites above.
trait ScrubRule {
    fn not_scrub_if_private(self, has_push_access: bool) -> bool;
}

impl ScrubRule for bool {
    fn not_scrub_if_private(self, has_push_access: bool) -> bool {
        let is_private = self;
        !is_private && !has_push_access
    }
}

/// The fixed payload substituted for a scrubbed response body (§4.8 step
/// 6, glossary "Scrub").
pub fn scrub_payload() -> serde_json::Value {
    serde_json::json!({
        "error": "content unavailable for outside reader"
    })
}
