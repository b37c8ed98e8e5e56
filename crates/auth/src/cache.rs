//! Optional short-TTL cache of effective permission sets.
//!
//! Off by default. When enabled, write-side services must call
//! [`PermissionCache::invalidate_user`] or [`PermissionCache::invalidate_all`]
//! after any role, permission or assignment mutation; the TTL only bounds how
//! long a missed invalidation can linger.
//!
//! Every invalidation bumps a generation counter. A set computed before an
//! invalidation is refused by [`PermissionCache::insert`], so a concurrent
//! recompute can never reinstate a revoked grant.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};

use gatehouse_core::UserId;

use crate::effective::EffectivePermissions;

#[derive(Debug, Clone)]
struct CachedPermissions {
    permissions: EffectivePermissions,
    cached_at: DateTime<Utc>,
}

/// Per-user cache of effective permissions.
///
/// A poisoned lock degrades to a cache miss; it never yields a stale or empty
/// set.
#[derive(Debug)]
pub struct PermissionCache {
    ttl: Duration,
    generation: AtomicU64,
    entries: RwLock<HashMap<UserId, CachedPermissions>>,
}

impl PermissionCache {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or(Duration::MAX),
            generation: AtomicU64::new(0),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Read before computing a set; pass the value back to [`Self::insert`].
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn is_fresh(&self, entry: &CachedPermissions, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.cached_at) < self.ttl
    }

    /// A fresh entry for `user_id`, if any. An expired entry is dropped.
    pub fn get(&self, user_id: UserId, now: DateTime<Utc>) -> Option<EffectivePermissions> {
        {
            let entries = self.entries.read().ok()?;
            let entry = entries.get(&user_id)?;
            if self.is_fresh(entry, now) {
                return Some(entry.permissions.clone());
            }
        }
        if let Ok(mut entries) = self.entries.write() {
            if entries.get(&user_id).is_some_and(|e| !self.is_fresh(e, now)) {
                entries.remove(&user_id);
            }
        }
        None
    }

    /// Store a set computed while the cache was at `generation`.
    ///
    /// Returns `false` (and stores nothing) if an invalidation happened since.
    /// Expired entries of other users are pruned on the way.
    pub fn insert(
        &self,
        user_id: UserId,
        permissions: EffectivePermissions,
        now: DateTime<Utc>,
        generation: u64,
    ) -> bool {
        let Ok(mut entries) = self.entries.write() else {
            return false;
        };
        if self.generation.load(Ordering::Acquire) != generation {
            tracing::debug!(%user_id, "cache invalidated during computation; not storing");
            return false;
        }
        entries.retain(|_, entry| self.is_fresh(entry, now));
        entries.insert(
            user_id,
            CachedPermissions {
                permissions,
                cached_at: now,
            },
        );
        true
    }

    pub fn invalidate_user(&self, user_id: UserId) {
        let entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Ok(mut entries) = entries {
            entries.remove(&user_id);
        }
    }

    pub fn invalidate_all(&self) {
        let entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Ok(mut entries) = entries {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{Permission, PermissionKind};

    fn sample() -> EffectivePermissions {
        std::iter::once(Permission::new("reports.view", PermissionKind::Page)).collect()
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = PermissionCache::new(std::time::Duration::from_secs(30));
        let user = UserId::new();
        let t0 = Utc::now();
        cache.insert(user, sample(), t0, cache.generation());

        assert!(cache.get(user, t0 + Duration::seconds(29)).is_some());
        assert!(cache.get(user, t0 + Duration::seconds(30)).is_none());
    }

    #[test]
    fn invalidation_removes_entries() {
        let cache = PermissionCache::new(std::time::Duration::from_secs(60));
        let (a, b) = (UserId::new(), UserId::new());
        let now = Utc::now();
        cache.insert(a, sample(), now, cache.generation());
        cache.insert(b, sample(), now, cache.generation());

        cache.invalidate_user(a);
        assert!(cache.get(a, now).is_none());
        assert!(cache.get(b, now).is_some());

        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn sets_computed_before_an_invalidation_are_refused() {
        let cache = PermissionCache::new(std::time::Duration::from_secs(60));
        let user = UserId::new();
        let now = Utc::now();

        let generation = cache.generation();
        cache.invalidate_user(UserId::new());
        assert!(!cache.insert(user, sample(), now, generation));
        assert!(cache.get(user, now).is_none());

        let generation = cache.generation();
        cache.invalidate_all();
        assert!(!cache.insert(user, sample(), now, generation));

        assert!(cache.insert(user, sample(), now, cache.generation()));
        assert!(cache.get(user, now).is_some());
    }

    #[test]
    fn expired_entries_do_not_accumulate() {
        let cache = PermissionCache::new(std::time::Duration::from_secs(30));
        let (a, b) = (UserId::new(), UserId::new());
        let t0 = Utc::now();
        cache.insert(a, sample(), t0, cache.generation());
        cache.insert(b, sample(), t0, cache.generation());

        assert!(cache.get(a, t0 + Duration::seconds(31)).is_none());
        assert_eq!(cache.len(), 1);

        cache.insert(UserId::new(), sample(), t0 + Duration::seconds(31), cache.generation());
        assert_eq!(cache.len(), 1);
    }
}
