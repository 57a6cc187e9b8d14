//! Packet-filter handle for NAT rule management.
//!
//! [`IptablesHandle`] is the boundary the reconcilers program against;
//! [`IptablesCmd`] is the production adapter that shells out to
//! `iptables`/`ip6tables`. Tests use the stateful double from the
//! `router-test` crate.
//!
//! # Contracts
//!
//! Rule identity in the kernel table is the exact ordered argument sequence;
//! there is no weaker match. The adapter contracts are:
//!
//! - [`IptablesHandle::append_unique`]: the rule is present exactly once
//!   afterwards; calling it when the rule is already installed is a no-op.
//!   The iptables binary has no native append-unique, so the adapter
//!   emulates it with an existence check followed by an append. The window
//!   between the two is covered by the daemon serializing its own callers
//!   and by `-w` serializing against other processes at the xtables lock.
//! - [`IptablesHandle::exists`]: `iptables -C`; exit 0 means present,
//!   exit 1 means absent, anything else is an error.
//! - [`IptablesHandle::delete`]: `iptables -D`; deleting a rule that is not
//!   present is an **error**. Callers check `exists` first.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{RouteMgrError, RouteMgrResult};
use crate::shell::{self, shellquote, IP6TABLES_CMD, IPTABLES_CMD};

/// Address family a packet-filter handle operates on.
///
/// Fixed for the lifetime of a manager instance; a dual-stack deployment
/// runs one manager per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressFamily {
    /// IPv4 (`iptables`)
    Ipv4,
    /// IPv6 (`ip6tables`)
    Ipv6,
}

impl AddressFamily {
    /// Returns the packet-filter binary for this family.
    pub fn iptables_cmd(&self) -> &'static str {
        match self {
            AddressFamily::Ipv4 => IPTABLES_CMD,
            AddressFamily::Ipv6 => IP6TABLES_CMD,
        }
    }

    /// Returns the family name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressFamily::Ipv4 => "IPv4",
            AddressFamily::Ipv6 => "IPv6",
        }
    }
}

impl std::fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command-execution boundary against the kernel packet-filter table.
///
/// All methods take the rule as its exact ordered token sequence. See the
/// module docs for the per-operation contracts.
#[async_trait]
pub trait IptablesHandle: Send + Sync {
    /// Ensures `rule` is present in `chain` exactly once.
    /// Safe to call when the rule is already installed.
    async fn append_unique(&self, table: &str, chain: &str, rule: &[String])
        -> RouteMgrResult<()>;

    /// Checks for `rule` in `chain` by exact full-sequence match.
    async fn exists(&self, table: &str, chain: &str, rule: &[String]) -> RouteMgrResult<bool>;

    /// Removes `rule` from `chain`. Deleting an absent rule is an error;
    /// callers gate on [`IptablesHandle::exists`].
    async fn delete(&self, table: &str, chain: &str, rule: &[String]) -> RouteMgrResult<()>;
}

// A borrowed handle is itself a handle. Lets a manager under test share
// the in-memory double with the assertions that inspect it afterwards.
#[async_trait]
impl<'a, H> IptablesHandle for &'a H
where
    H: IptablesHandle + ?Sized,
{
    async fn append_unique(
        &self,
        table: &str,
        chain: &str,
        rule: &[String],
    ) -> RouteMgrResult<()> {
        (**self).append_unique(table, chain, rule).await
    }

    async fn exists(&self, table: &str, chain: &str, rule: &[String]) -> RouteMgrResult<bool> {
        (**self).exists(table, chain, rule).await
    }

    async fn delete(&self, table: &str, chain: &str, rule: &[String]) -> RouteMgrResult<()> {
        (**self).delete(table, chain, rule).await
    }
}

/// Production packet-filter handle shelling out to `iptables`/`ip6tables`.
///
/// Stateless; exclusivity over the table belongs to the calling loop, not
/// the adapter. Every invocation carries `-w` so concurrent callers from
/// other processes wait on the xtables lock instead of failing.
#[derive(Debug, Clone, Copy)]
pub struct IptablesCmd {
    family: AddressFamily,
}

impl IptablesCmd {
    /// Creates a handle for the given address family.
    pub fn new(family: AddressFamily) -> Self {
        Self { family }
    }

    /// Returns the address family this handle drives.
    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// Builds the full command line for one rule operation.
    /// `op` is the iptables action flag: `-A`, `-C` or `-D`.
    fn rule_cmd(&self, op: &str, table: &str, chain: &str, rule: &[String]) -> String {
        let mut cmd = format!(
            "{} -w -t {} {} {}",
            self.family.iptables_cmd(),
            shellquote(table),
            op,
            shellquote(chain)
        );
        for token in rule {
            cmd.push(' ');
            cmd.push_str(&shellquote(token));
        }
        cmd
    }
}

#[async_trait]
impl IptablesHandle for IptablesCmd {
    async fn append_unique(
        &self,
        table: &str,
        chain: &str,
        rule: &[String],
    ) -> RouteMgrResult<()> {
        if self.exists(table, chain, rule).await? {
            tracing::debug!(
                family = %self.family,
                chain = chain,
                "Rule already present, skipping append"
            );
            return Ok(());
        }
        shell::exec_or_throw(&self.rule_cmd("-A", table, chain, rule)).await?;
        Ok(())
    }

    async fn exists(&self, table: &str, chain: &str, rule: &[String]) -> RouteMgrResult<bool> {
        let cmd = self.rule_cmd("-C", table, chain, rule);
        let result = shell::exec(&cmd).await?;
        match result.exit_code {
            0 => Ok(true),
            1 => Ok(false),
            code => Err(RouteMgrError::ShellCommandFailed {
                command: cmd,
                exit_code: code,
                output: result.combined_output(),
            }),
        }
    }

    async fn delete(&self, table: &str, chain: &str, rule: &[String]) -> RouteMgrResult<()> {
        shell::exec_or_throw(&self.rule_cmd("-D", table, chain, rule)).await?;
        Ok(())
    }
}
