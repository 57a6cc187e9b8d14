//! Egress NAT manager - reconciles the pod egress translation rule

use async_trait::async_trait;
use router_common::{
    AddressFamily, IptablesHandle, RouteMgr, RouteMgrError, RouteMgrResult,
};
use tracing::{debug, info, instrument, warn};

use crate::rules::{build_egress_rule, legacy_egress_rules, RuleSpec};
use crate::types::{
    EgressConfig, TranslationMode, NAT_TABLE, NODE_ADDRS_SET, POD_SUBNETS_SET, POSTROUTING_CHAIN,
};

/// Outcome of one legacy-variant cleanup attempt
#[derive(Debug)]
pub enum LegacyOutcome {
    /// The entry was installed and has been deleted
    Removed,
    /// The entry was not installed
    AlreadyAbsent,
    /// Lookup or delete failed; the remaining entries were still attempted
    Failed(RouteMgrError),
}

/// Per-entry results of a legacy-variant sweep
#[derive(Debug, Default)]
pub struct LegacySweep {
    /// One outcome per catalog entry, in catalog order
    pub outcomes: Vec<(RuleSpec, LegacyOutcome)>,
}

impl LegacySweep {
    /// Entries whose cleanup failed this pass.
    pub fn failures(&self) -> impl Iterator<Item = (&RuleSpec, &RouteMgrError)> {
        self.outcomes.iter().filter_map(|(rule, outcome)| match outcome {
            LegacyOutcome::Failed(err) => Some((rule, err)),
            _ => None,
        })
    }

    /// Number of entries actually deleted this pass.
    pub fn removed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, LegacyOutcome::Removed))
            .count()
    }

    /// True if no entry failed.
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Egress NAT manager
///
/// Owns the install/remove paths for the current egress rule and the
/// legacy-variant sweep, for one address family. The active rule spec is
/// rebuilt from the configuration snapshot on every call; the kernel table
/// is the only state.
pub struct EgressMgr<H> {
    family: AddressFamily,
    mode: TranslationMode,
    handle: H,
}

impl<H: IptablesHandle> EgressMgr<H> {
    /// Creates a manager from a validated configuration snapshot.
    pub fn new(config: &EgressConfig, handle: H) -> Self {
        if let TranslationMode::SourceNat(addr) = config.mode() {
            info!(
                "Using SNAT to '{}' instead of MASQUERADE for outbound traffic from pods",
                addr
            );
        }
        Self {
            family: config.family,
            mode: config.mode(),
            handle,
        }
    }

    /// Address family this manager reconciles.
    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// Installs the egress NAT rule for the active family and mode.
    ///
    /// Safe to call on every pass; the handle guarantees the rule ends up
    /// present exactly once. A failure here is connectivity-critical.
    #[instrument(skip(self), fields(family = %self.family))]
    pub async fn create_egress_rule(&self) -> RouteMgrResult<()> {
        let rule = self.current_rule()?;
        self.handle
            .append_unique(NAT_TABLE, POSTROUTING_CHAIN, &rule)
            .await
            .map_err(|e| RouteMgrError::egress_install(POSTROUTING_CHAIN, e.to_string()))?;

        debug!("Added iptables rule for outbound traffic from pods");
        Ok(())
    }

    /// Removes the egress NAT rule if installed.
    ///
    /// Removing an already-absent rule is a successful no-op. The delete is
    /// gated on an existence check because the handle's delete errors on a
    /// missing rule.
    #[instrument(skip(self), fields(family = %self.family))]
    pub async fn delete_egress_rule(&self) -> RouteMgrResult<()> {
        let rule = self.current_rule()?;
        let exists = self
            .handle
            .exists(NAT_TABLE, POSTROUTING_CHAIN, &rule)
            .await
            .map_err(|e| RouteMgrError::egress_lookup(POSTROUTING_CHAIN, e.to_string()))?;

        if exists {
            self.handle
                .delete(NAT_TABLE, POSTROUTING_CHAIN, &rule)
                .await
                .map_err(|e| RouteMgrError::egress_delete(POSTROUTING_CHAIN, e.to_string()))?;
            info!("Deleted iptables rule for outbound traffic from pods");
        }

        Ok(())
    }

    /// Check-then-deletes every legacy rule variant for the active family.
    ///
    /// Entries are independent: a failure is recorded in the returned sweep
    /// and the remaining entries are still attempted.
    #[instrument(skip(self), fields(family = %self.family))]
    pub async fn sweep_legacy_rules(&self) -> LegacySweep {
        self.sweep_rules(legacy_egress_rules(self.family, POD_SUBNETS_SET))
            .await
    }

    /// One full reconciliation pass: install the current rule, then sweep
    /// legacy variants.
    ///
    /// The sweep runs only after the install succeeds, so a sweep failure
    /// can never leave the node without the current rule. Sweep failures
    /// are carried in the returned report, not escalated.
    pub async fn reconcile_pass(&self) -> RouteMgrResult<LegacySweep> {
        self.create_egress_rule().await?;
        Ok(self.sweep_legacy_rules().await)
    }

    async fn sweep_rules(&self, rules: Vec<RuleSpec>) -> LegacySweep {
        let mut sweep = LegacySweep::default();
        for rule in rules {
            let outcome = self.remove_if_present(&rule).await;
            match &outcome {
                LegacyOutcome::Removed => {
                    info!("Deleted old egress NAT rule variant");
                }
                LegacyOutcome::AlreadyAbsent => {}
                LegacyOutcome::Failed(err) => {
                    debug!(rule = %rule.join(" "), %err, "Legacy rule cleanup failed");
                }
            }
            sweep.outcomes.push((rule, outcome));
        }
        sweep
    }

    async fn remove_if_present(&self, rule: &RuleSpec) -> LegacyOutcome {
        match self.handle.exists(NAT_TABLE, POSTROUTING_CHAIN, rule).await {
            Ok(false) => LegacyOutcome::AlreadyAbsent,
            Ok(true) => match self.handle.delete(NAT_TABLE, POSTROUTING_CHAIN, rule).await {
                Ok(()) => LegacyOutcome::Removed,
                Err(e) => LegacyOutcome::Failed(RouteMgrError::egress_delete(
                    POSTROUTING_CHAIN,
                    e.to_string(),
                )),
            },
            Err(e) => LegacyOutcome::Failed(RouteMgrError::egress_lookup(
                POSTROUTING_CHAIN,
                e.to_string(),
            )),
        }
    }

    fn current_rule(&self) -> RouteMgrResult<RuleSpec> {
        build_egress_rule(self.family, self.mode, POD_SUBNETS_SET, NODE_ADDRS_SET)
    }
}

#[async_trait]
impl<H: IptablesHandle> RouteMgr for EgressMgr<H> {
    fn daemon_name(&self) -> &str {
        "egressmgrd"
    }

    async fn reconcile(&mut self) -> RouteMgrResult<()> {
        let sweep = self.reconcile_pass().await?;
        for (rule, err) in sweep.failures() {
            warn!(
                rule = %rule.join(" "),
                %err,
                "Legacy egress rule cleanup failed; will retry next pass"
            );
        }
        Ok(())
    }
}
