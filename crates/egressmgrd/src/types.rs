//! Type definitions for egressmgrd

use std::net::IpAddr;

use router_common::{AddressFamily, RouteMgrError, RouteMgrResult};
use serde::{Deserialize, Serialize};

/// Packet-filter table holding the egress NAT rule
pub const NAT_TABLE: &str = "nat";

/// Chain the egress NAT rule is appended to
pub const POSTROUTING_CHAIN: &str = "POSTROUTING";

/// ipset listing all pod subnet CIDRs (maintained by the ipset manager)
pub const POD_SUBNETS_SET: &str = "cluster-router-pod-subnets";

/// ipset listing all node addresses (maintained by the ipset manager)
pub const NODE_ADDRS_SET: &str = "cluster-router-node-addrs";

/// Family qualifier prepended to set references in IPv6 rules
pub const INET6_SET_PREFIX: &str = "inet6:";

/// How egress traffic from pods is source-translated at the node boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationMode {
    /// Rewrite the source to the outgoing interface's address
    Masquerade,
    /// Rewrite the source to a fixed configured address
    SourceNat(IpAddr),
}

/// Immutable egress configuration snapshot for one address family
///
/// Derived once from controller configuration; the active rule spec is
/// rebuilt from it on every reconciliation pass. Presence of an egress
/// address selects SNAT, absence selects masquerade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EgressConfig {
    /// Address family this snapshot applies to
    pub family: AddressFamily,
    /// Optional fixed egress source address
    pub egress_addr: Option<IpAddr>,
}

impl EgressConfig {
    /// Builds a snapshot, validating the egress address if one is set.
    ///
    /// Rejects an unparsable address or an address whose family does not
    /// match `family`, so a malformed rule can never be derived later.
    pub fn new(family: AddressFamily, egress_addr: Option<&str>) -> RouteMgrResult<Self> {
        let egress_addr = match egress_addr {
            None => None,
            Some(raw) => {
                let addr: IpAddr = raw.trim().parse().map_err(|_| {
                    RouteMgrError::invalid_config(
                        "egress_addr",
                        format!("'{}' is not a valid IP address", raw),
                    )
                })?;
                if !family_matches(family, addr) {
                    return Err(RouteMgrError::invalid_config(
                        "egress_addr",
                        format!("'{}' is not an {} address", addr, family),
                    ));
                }
                Some(addr)
            }
        };

        Ok(Self {
            family,
            egress_addr,
        })
    }

    /// Returns the active translation mode for this snapshot.
    pub fn mode(&self) -> TranslationMode {
        match self.egress_addr {
            Some(addr) => TranslationMode::SourceNat(addr),
            None => TranslationMode::Masquerade,
        }
    }
}

/// True if `addr` belongs to `family`.
pub(crate) fn family_matches(family: AddressFamily, addr: IpAddr) -> bool {
    matches!(
        (family, addr),
        (AddressFamily::Ipv4, IpAddr::V4(_)) | (AddressFamily::Ipv6, IpAddr::V6(_))
    )
}
