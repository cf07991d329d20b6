//! Level Store: in-memory cache of identity levels and the slot-quota resolver.
//!
//! Every read and write goes through one async mutex. Misses are resolved
//! synchronously through the [`RegistryClient`] while the lock is held, so an
//! entry only ever has a single writer at a time. Refresh sweeps snapshot the
//! address set first and take the lock again only to write changed levels.
//!
//! Once the shutdown token is cancelled the store is frozen: misses fall back
//! to `Unknown` without a registry call and sweeps do nothing.

use crate::identity_level::{AccountSlotsTable, IdentityLevel, ACCOUNT_SLOTS_DEFAULTS};
use crate::metrics;
use crate::registry_client::{RegistryClient, RegistryTransport};
use ethers::prelude::Address;
use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

const CACHE_NAME: &str = "identity_levels";

/// Outcome of one refresh sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    /// Addresses re-queried
    pub checked: usize,
    /// Entries overwritten with a new level
    pub updated: usize,
    /// Lookups that failed and left the cached level untouched
    pub failed: usize,
}

impl fmt::Display for SweepStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checked={} updated={} failed={}",
            self.checked, self.updated, self.failed
        )
    }
}

pub struct LevelStore<T: RegistryTransport> {
    levels: Mutex<HashMap<Address, IdentityLevel>>,
    client: RegistryClient<T>,
    slots: &'static AccountSlotsTable,
    shutdown: CancellationToken,
}

impl<T: RegistryTransport> LevelStore<T> {
    /// Create a store whose `seeds` start out at `IdentityLevel::Unknown`.
    ///
    /// Cancelling `shutdown` freezes the store at its current contents.
    pub fn new(
        client: RegistryClient<T>,
        seeds: impl IntoIterator<Item = Address>,
        shutdown: CancellationToken,
    ) -> Self {
        let levels: HashMap<Address, IdentityLevel> = seeds
            .into_iter()
            .map(|address| (address, IdentityLevel::Unknown))
            .collect();
        metrics::set_cache_size(CACHE_NAME, levels.len() as f64);

        Self {
            levels: Mutex::new(levels),
            client,
            slots: &ACCOUNT_SLOTS_DEFAULTS,
            shutdown,
        }
    }

    pub fn client(&self) -> &RegistryClient<T> {
        &self.client
    }

    /// True once the owning extension has been stopped.
    pub fn is_frozen(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Number of pending transactions `address` may keep in the pool.
    ///
    /// Never fails: an address the registry cannot resolve is cached as
    /// `Unknown` and gets the minimum quota.
    pub async fn account_slots(&self, address: Address) -> u64 {
        let level = self.resolve(address).await;
        self.slots.slots_for(level)
    }

    /// Cached level for `address`, fetching it from the registry on a miss.
    ///
    /// A foreground lookup already in flight when the store freezes is not
    /// cancelled; its result is still cached.
    pub async fn resolve(&self, address: Address) -> IdentityLevel {
        let mut levels = self.levels.lock().await;

        if let Some(level) = levels.get(&address) {
            metrics::increment_cache_hit(CACHE_NAME);
            return *level;
        }

        metrics::increment_cache_miss(CACHE_NAME);
        if self.is_frozen() {
            debug!("LevelStore: frozen, serving {:?} as unknown", address);
            return IdentityLevel::Unknown;
        }

        let level = self
            .client
            .lookup(address)
            .await
            .unwrap_or(IdentityLevel::Unknown);
        levels.insert(address, level);
        metrics::set_cache_size(CACHE_NAME, levels.len() as f64);
        debug!("LevelStore: cached {:?} at level {}", address, level);

        level
    }

    /// Cached level without touching the registry.
    pub async fn level_of(&self, address: &Address) -> Option<IdentityLevel> {
        self.levels.lock().await.get(address).copied()
    }

    pub async fn snapshot(&self) -> Vec<(Address, IdentityLevel)> {
        self.levels
            .lock()
            .await
            .iter()
            .map(|(address, level)| (*address, *level))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.levels.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.levels.lock().await.is_empty()
    }

    /// Re-query every known address and overwrite entries whose level changed.
    ///
    /// A failed lookup leaves its entry as it was and does not stop the sweep.
    /// The lock is not held across registry calls. A frozen store returns
    /// empty stats without calling the registry.
    pub async fn refresh_sweep(&self) -> SweepStats {
        if self.is_frozen() {
            return SweepStats::default();
        }

        let start = Instant::now();
        let known = self.snapshot().await;
        let mut stats = SweepStats {
            checked: known.len(),
            ..SweepStats::default()
        };

        for (address, cached) in known {
            if self.is_frozen() {
                break;
            }

            let level = match self.client.lookup(address).await {
                Ok(level) => level,
                Err(_) => {
                    stats.failed += 1;
                    continue;
                }
            };

            if level == cached {
                continue;
            }

            let mut levels = self.levels.lock().await;
            let previous = levels.insert(address, level);
            if previous != Some(level) {
                stats.updated += 1;
                info!(
                    "LevelStore: {:?} moved from {} to {}",
                    address,
                    previous.unwrap_or_default(),
                    level
                );
            }
        }

        metrics::record_refresh_sweep(&stats, start.elapsed());
        stats
    }
}
