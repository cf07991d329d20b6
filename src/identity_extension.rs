//! Identity Extension: the transaction-pool facing component.
//!
//! Owns the [`LevelStore`] and the background refresh loop that keeps it in
//! line with the profile registry.
//!
//! ## Lifecycle
//!
//! - [`IdentityExtension::new`] validates the configuration, parses the
//!   registry ABI and spawns the refresh loop (`Running`).
//! - [`IdentityExtension::stop`] cancels the loop, including any registry call
//!   it has in flight, and waits for the task to exit (`Stopped`). From then
//!   on no registry call is made: the store stays readable but frozen, and
//!   unseen addresses get the `Unknown` quota.

use crate::error::IdentityError;
use crate::identity_level::IdentityLevel;
use crate::level_store::{LevelStore, SweepStats};
use crate::registry_client::{RegistryClient, RegistryTransport};
use crate::settings::IdentitySettings;
use async_trait::async_trait;
use ethers::prelude::{Address, Transaction};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Hooks the transaction pool calls into.
#[async_trait]
pub trait AccountSlotsExtension: Send + Sync {
    /// Pending-transaction quota for `address`. Never fails.
    async fn account_slots(&self, address: Address) -> u64;

    /// Extra admission checks for `tx`. Currently accepts everything.
    fn validate_transaction(&self, tx: &Transaction, local: bool) -> Result<(), IdentityError>;

    /// Stop background work and wait for it to finish.
    async fn stop(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionState {
    Running,
    Stopped,
}

pub struct IdentityExtension<T: RegistryTransport> {
    store: Arc<LevelStore<T>>,
    cancel: CancellationToken,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
    update_interval: Duration,
}

impl<T: RegistryTransport> IdentityExtension<T> {
    /// Build the extension and start its refresh loop.
    ///
    /// Must be called from within a tokio runtime. Returns
    /// [`IdentityError::Configuration`] if the settings or the registry ABI
    /// are unusable; no task is spawned in that case.
    pub fn new(settings: &IdentitySettings, transport: Arc<T>) -> Result<Self, IdentityError> {
        settings.validate()?;

        let registry = settings.registry_address()?;
        let client = RegistryClient::new(transport, registry, settings.request_timeout())?;
        let cancel = CancellationToken::new();
        let store = Arc::new(LevelStore::new(client, settings.seed_addresses()?, cancel.clone()));

        let update_interval = settings.update_interval();
        let handle = spawn_refresh_loop(store.clone(), cancel.clone(), update_interval);

        info!(
            "🚀 Identity extension started (registry: {:?}, interval: {:?}, timeout: {:?})",
            registry,
            update_interval,
            settings.request_timeout()
        );

        Ok(Self {
            store,
            cancel,
            refresh_task: Mutex::new(Some(handle)),
            stopped: AtomicBool::new(false),
            update_interval,
        })
    }

    pub fn state(&self) -> ExtensionState {
        if self.stopped.load(Ordering::Acquire) {
            ExtensionState::Stopped
        } else {
            ExtensionState::Running
        }
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    pub fn store(&self) -> &LevelStore<T> {
        &self.store
    }

    pub async fn account_slots(&self, address: Address) -> u64 {
        self.store.account_slots(address).await
    }

    pub async fn level_of(&self, address: &Address) -> Option<IdentityLevel> {
        self.store.level_of(address).await
    }

    /// Run one refresh sweep immediately, outside the periodic schedule.
    /// Does nothing once the extension is stopped.
    pub async fn refresh_now(&self) -> SweepStats {
        self.store.refresh_sweep().await
    }

    /// Cancel the refresh loop and wait for it to exit. Safe to call repeatedly.
    pub async fn stop(&self) {
        self.cancel.cancel();

        // Holding the slot while joining makes concurrent callers wait for the exit too.
        let mut slot = self.refresh_task.lock().await;
        if let Some(handle) = slot.take() {
            if let Err(e) = handle.await {
                warn!("Identity extension: refresh loop ended abnormally: {}", e);
            }
            self.stopped.store(true, Ordering::Release);
            info!("Identity extension stopped");
        }
    }
}

impl<T: RegistryTransport> Drop for IdentityExtension<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl<T: RegistryTransport> AccountSlotsExtension for IdentityExtension<T> {
    async fn account_slots(&self, address: Address) -> u64 {
        IdentityExtension::account_slots(self, address).await
    }

    fn validate_transaction(&self, _tx: &Transaction, _local: bool) -> Result<(), IdentityError> {
        Ok(())
    }

    async fn stop(&self) {
        IdentityExtension::stop(self).await
    }
}

/// Spawn the periodic refresh task. The first sweep runs one `period` after start.
fn spawn_refresh_loop<T: RegistryTransport>(
    store: Arc<LevelStore<T>>,
    cancel: CancellationToken,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // Skip first immediate tick

        let mut iteration = 0u64;
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            iteration += 1;

            // Dropping the sweep on cancellation abandons its in-flight registry call.
            tokio::select! {
                () = cancel.cancelled() => break,
                stats = store.refresh_sweep() => {
                    if stats.updated > 0 || stats.failed > 0 {
                        info!("🔄 [Refresh #{}] {}", iteration, stats);
                    } else {
                        debug!("[Refresh #{}] {}", iteration, stats);
                    }
                }
            }
        }

        debug!("Identity refresh loop exited after {} ticks", iteration);
    })
}
