//! Common infrastructure for cluster-router manager daemons.
//!
//! This crate provides shared functionality for the routing controller's
//! reconciler daemons (egressmgrd and friends):
//!
//! - [`shell`]: Safe shell command execution with proper quoting
//! - [`iptables`]: Packet-filter handle for NAT rule management
//! - [`RouteMgr`]: Base trait for reconciler daemons
//! - [`error`]: Error types for manager operations
//!
//! # Architecture
//!
//! Manager daemons follow this pattern:
//!
//! 1. Derive an immutable configuration snapshot at startup
//! 2. Run a periodic reconciliation tick per enabled address family
//! 3. Execute `iptables`/`ip6tables` commands to converge the kernel's
//!    packet-filter table on the desired state
//! 4. Surface failures to the tick loop; the next tick is the retry
//!
//! The kernel table is the system of record. Nothing is cached across
//! reconciliation passes.
//!
//! # Example
//!
//! ```ignore
//! use router_common::{IptablesCmd, IptablesHandle, AddressFamily};
//!
//! async fn ensure_rule(rule: &[String]) -> router_common::RouteMgrResult<()> {
//!     let ipt = IptablesCmd::new(AddressFamily::Ipv4);
//!     ipt.append_unique("nat", "POSTROUTING", rule).await
//! }
//! ```

pub mod error;
pub mod iptables;
pub mod manager;
pub mod shell;

// Re-export commonly used items at crate root
pub use error::{RouteMgrError, RouteMgrResult};
pub use iptables::{AddressFamily, IptablesCmd, IptablesHandle};
pub use manager::{defaults, RouteMgr};
