//! Reload coordination against the daemon. The daemon reload is global
//! (one process, all domains), so concurrent rule mutations must not
//! fire overlapping reloads. A single-flight mutex serializes cycles
//! and a generation counter coalesces waiters: a cycle that began after
//! a waiter's request satisfies that waiter without a second reload.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{ProxymanError, Result};
use crate::nginx::process::NginxProcess;

pub struct ReloadCoordinator {
    process: Arc<NginxProcess>,
    cycle: Mutex<()>,
    /// Highest reload ticket handed out
    pending: AtomicU64,
    /// Highest ticket covered by a finished reload cycle
    completed: AtomicU64,
    max_wait: Duration,
}

impl ReloadCoordinator {
    pub fn new(process: Arc<NginxProcess>, max_wait: Duration) -> Self {
        Self {
            process,
            cycle: Mutex::new(()),
            pending: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            max_wait,
        }
    }

    /// Request that the daemon pick up the configuration on disk.
    ///
    /// The contract is test-then-reload: the configuration is validated
    /// first and `ConfigTestFailed` is returned without touching the
    /// daemon when it does not pass. Waiting for an in-flight cycle is
    /// bounded by `max_wait`; on expiry the caller gets `ReloadTimeout`
    /// while the in-flight cycle keeps running.
    pub async fn request_reload(&self) -> Result<()> {
        let ticket = self.pending.fetch_add(1, Ordering::SeqCst) + 1;

        let _guard = tokio::time::timeout(self.max_wait, self.cycle.lock())
            .await
            .map_err(|_| ProxymanError::ReloadTimeout(self.max_wait.as_secs()))?;

        if self.completed.load(Ordering::SeqCst) >= ticket {
            debug!(ticket, "reload already covered by a finished cycle");
            return Ok(());
        }

        // Everything requested up to this point is covered by this cycle.
        let generation = self.pending.load(Ordering::SeqCst);

        let test = self.process.test_configuration().await?;
        if !test.valid {
            return Err(ProxymanError::ConfigTestFailed(test.message));
        }

        self.process.reload().await?;
        self.completed.store(generation, Ordering::SeqCst);
        info!(generation, "daemon reloaded");

        Ok(())
    }
}
