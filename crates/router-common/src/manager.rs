//! Reconciler trait and shared defaults for manager daemons.
//!
//! Each manager daemon owns one or more [`RouteMgr`] instances (one per
//! address family) and drives them from a periodic tick loop. A failed
//! pass is surfaced, logged and retried on the next tick; managers never
//! retry internally.

use async_trait::async_trait;

use crate::error::RouteMgrResult;

/// Default values for manager daemons.
pub mod defaults {
    /// Reconciliation tick period in milliseconds.
    pub const TICK_INTERVAL_MS: u64 = 60_000;
}

/// Base trait for the routing controller's reconciler daemons.
///
/// A reconciliation pass converges the kernel packet-filter table on the
/// state derived from the manager's configuration snapshot. Passes must be
/// safe to re-run: every create is idempotent and every delete is
/// existence-gated, so blind re-invocation on the next tick needs no
/// backoff state.
#[async_trait]
pub trait RouteMgr: Send + Sync {
    /// Returns the daemon name (e.g., "egressmgrd") for logging.
    fn daemon_name(&self) -> &str;

    /// Runs one reconciliation pass.
    ///
    /// Errors are returned to the tick loop; the next tick is the retry.
    async fn reconcile(&mut self) -> RouteMgrResult<()>;
}
