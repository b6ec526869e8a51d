//! Session cache with TTL expiry and per-key exclusive construction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, trace, warn};

use crate::config::CacheConfig;
use crate::error::Result;
use crate::factory::{SessionFactory, SessionVariant};
use crate::key::SessionKey;

/// Entry stored in the cache.
#[derive(Debug, Clone)]
pub struct SessionEntry<H> {
    /// The session handle, as built by the factory.
    pub handle: H,

    /// When the session was built. Drives expiry.
    pub created_at: Instant,

    /// Wall-clock creation time, for diagnostics.
    pub created_at_utc: DateTime<Utc>,

    /// TTL captured at creation time.
    pub ttl: Duration,
}

impl<H> SessionEntry<H> {
    /// Create a new entry stamped with the current time.
    pub fn new(handle: H, ttl: Duration) -> Self {
        Self {
            handle,
            created_at: Instant::now(),
            created_at_utc: Utc::now(),
            ttl,
        }
    }

    /// Time since the session was built.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Whether the entry has reached its TTL.
    pub fn is_expired(&self) -> bool {
        self.age() >= self.ttl
    }
}

/// One key's slot. The async mutex is held across construction so that
/// concurrent callers for the same key wait for a single build.
type Slot<H> = Arc<AsyncMutex<Option<SessionEntry<H>>>>;

/// Process-wide cache of integration sessions.
///
/// This cache provides:
/// - Lazy construction on first use of a key
/// - TTL-based replacement on access (there is no background sweeper)
/// - At most one in-flight construction per key
/// - Independent progress for distinct keys
///
/// The key map is guarded by a short synchronous lock that is never held
/// across an await; construction happens under the key's own slot lock.
pub struct SessionCache<H> {
    slots: Arc<Mutex<HashMap<SessionKey, Slot<H>>>>,
    config: CacheConfig,
}

impl<H> SessionCache<H>
where
    H: Clone + Send + Sync + 'static,
{
    /// Create an empty session cache.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// TTL applied to newly created entries.
    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Get the session for `(integration, kind)`, building it with `factory`
    /// if it is missing or expired.
    ///
    /// Concurrent calls for the same key share one construction. If the
    /// factory fails, the error is returned and the key is left empty so the
    /// next call tries again; a stale entry is never handed out after expiry.
    pub async fn get_or_create<F>(
        &self,
        integration: &str,
        kind: &str,
        factory: &F,
        variant: &SessionVariant,
    ) -> Result<H>
    where
        F: SessionFactory<Handle = H> + ?Sized,
    {
        let key = SessionKey::new(integration, kind);
        let slot = self.slot(&key);
        let mut entry = slot.lock().await;

        if let Some(existing) = entry.as_ref() {
            if !existing.is_expired() {
                trace!(key = %key, "Session found in cache");
                return Ok(existing.handle.clone());
            }
            debug!(
                key = %key,
                age_secs = existing.age().as_secs(),
                "Session expired, rebuilding"
            );
        } else {
            debug!(key = %key, "Session cache miss, creating session");
        }

        match factory.create(&key, variant).await {
            Ok(handle) => {
                *entry = Some(SessionEntry::new(handle.clone(), self.config.ttl));
                debug!(
                    key = %key,
                    transport = ?variant.transport,
                    check = ?variant.check,
                    "Session created"
                );
                Ok(handle)
            }
            Err(e) => {
                // An expired entry must not survive a failed rebuild.
                *entry = None;
                warn!(key = %key, error = %e, "Session construction failed");
                drop(entry);
                drop(slot);
                self.prune(&key);
                Err(e)
            }
        }
    }

    /// Check if a fresh session exists for the key (without building one).
    pub async fn contains(&self, integration: &str, kind: &str) -> bool {
        let Some(slot) = self.find(&SessionKey::new(integration, kind)) else {
            return false;
        };
        let entry = slot.lock().await;
        entry.as_ref().is_some_and(|e| !e.is_expired())
    }

    /// Drop the session for a key so the next lookup rebuilds it.
    ///
    /// Waits for any in-flight construction for the key to finish first.
    pub async fn invalidate(&self, integration: &str, kind: &str) {
        let key = SessionKey::new(integration, kind);
        if let Some(slot) = self.find(&key) {
            if slot.lock().await.take().is_some() {
                debug!(key = %key, "Session invalidated");
            }
        }
        self.prune(&key);
    }

    /// Number of keys currently holding a session (fresh or stale).
    ///
    /// Never waits: keys with a construction in flight are not counted.
    pub fn len(&self) -> usize {
        self.stats().size
    }

    /// Check if the cache holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics. Like [`len`](Self::len), skips busy keys.
    pub fn stats(&self) -> CacheStats {
        let mut size = 0;
        let mut oldest: Option<DateTime<Utc>> = None;
        for slot in self.all_slots() {
            let Ok(entry) = slot.try_lock() else {
                continue;
            };
            if let Some(entry) = entry.as_ref() {
                size += 1;
                oldest = Some(match oldest {
                    Some(t) => t.min(entry.created_at_utc),
                    None => entry.created_at_utc,
                });
            }
        }
        CacheStats {
            size,
            ttl: self.config.ttl,
            oldest,
        }
    }

    fn slot(&self, key: &SessionKey) -> Slot<H> {
        let mut slots = self.slots.lock();
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    fn find(&self, key: &SessionKey) -> Option<Slot<H>> {
        self.slots.lock().get(key).cloned()
    }

    /// Remove the key's slot if it is empty and no caller holds it.
    ///
    /// Clones of a slot are only handed out under the map lock, so a count
    /// of one means nobody can be about to fill it.
    fn prune(&self, key: &SessionKey) {
        let mut slots = self.slots.lock();
        let removable = slots.get(key).is_some_and(|slot| {
            Arc::strong_count(slot) == 1 && slot.try_lock().is_ok_and(|entry| entry.is_none())
        });
        if removable {
            slots.remove(key);
            trace!(key = %key, "Empty session slot removed");
        }
    }

    fn all_slots(&self) -> Vec<Slot<H>> {
        self.slots.lock().values().cloned().collect()
    }
}

impl<H> Clone for SessionCache<H> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
            config: self.config.clone(),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of keys holding a session.
    pub size: usize,

    /// TTL applied to new sessions.
    pub ttl: Duration,

    /// Wall-clock creation time of the oldest session held.
    pub oldest: Option<DateTime<Utc>>,
}
