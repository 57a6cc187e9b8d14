//! Egress NAT manager daemon for the cluster routing controller
//!
//! Guarantees that outbound traffic from pods is source-translated as it
//! leaves the node: masqueraded to the node's address, or SNAT'd to a
//! configured egress address. Runs one manager per address family and
//! sweeps superseded rule variants left behind by earlier releases.

mod egress_mgr;
mod rules;
mod types;

pub use egress_mgr::{EgressMgr, LegacyOutcome, LegacySweep};
pub use rules::*;
pub use types::*;
