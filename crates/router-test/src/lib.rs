//! Test infrastructure for cluster-router manager daemons
//!
//! Provides:
//! - An in-memory packet-filter double with raw table dumps and per-rule
//!   failure injection
//! - Verification helpers for asserting on chain contents

mod mock_iptables;
mod verification;

pub use mock_iptables::MockIptables;
pub use verification::*;
