//! End-to-end reconciliation scenarios against the in-memory packet-filter
//! double: upgrade migration, repeated passes, mode switches and dual-stack
//! isolation.

use router_common::AddressFamily;
use router_egressmgrd::{
    build_egress_rule, legacy_egress_rules, EgressConfig, EgressMgr, TranslationMode, NAT_TABLE,
    NODE_ADDRS_SET, POD_SUBNETS_SET, POSTROUTING_CHAIN,
};
use router_test::{assert_chain_exactly, assert_rule_absent, assert_rule_present, MockIptables};

fn current_rule(family: AddressFamily, mode: TranslationMode) -> Vec<String> {
    build_egress_rule(family, mode, POD_SUBNETS_SET, NODE_ADDRS_SET).unwrap()
}

fn mgr<'a>(
    family: AddressFamily,
    egress_addr: Option<&str>,
    ipt: &'a MockIptables,
) -> EgressMgr<&'a MockIptables> {
    let config = EgressConfig::new(family, egress_addr).unwrap();
    EgressMgr::new(&config, ipt)
}

#[tokio::test]
async fn migration_removes_every_legacy_variant() {
    let ipt = MockIptables::new();
    let current = current_rule(AddressFamily::Ipv4, TranslationMode::Masquerade);

    // Upgrade scenario: every legacy variant installed, interleaved around
    // the current rule
    let legacy = legacy_egress_rules(AddressFamily::Ipv4, POD_SUBNETS_SET);
    for rule in &legacy {
        ipt.seed_rule(NAT_TABLE, POSTROUTING_CHAIN, rule);
    }
    ipt.seed_rule(NAT_TABLE, POSTROUTING_CHAIN, &current);

    let sweep = mgr(AddressFamily::Ipv4, None, &ipt)
        .reconcile_pass()
        .await
        .unwrap();

    assert!(sweep.is_clean());
    assert_eq!(sweep.removed(), legacy.len());
    assert_chain_exactly(&ipt, NAT_TABLE, POSTROUTING_CHAIN, &[current]);
}

#[tokio::test]
async fn migration_handles_legacy_before_or_after_current() {
    let legacy = &legacy_egress_rules(AddressFamily::Ipv4, POD_SUBNETS_SET)[0];
    let current = current_rule(AddressFamily::Ipv4, TranslationMode::Masquerade);

    // Legacy installed first
    let ipt = MockIptables::new();
    ipt.seed_rule(NAT_TABLE, POSTROUTING_CHAIN, legacy);
    ipt.seed_rule(NAT_TABLE, POSTROUTING_CHAIN, &current);
    mgr(AddressFamily::Ipv4, None, &ipt)
        .reconcile_pass()
        .await
        .unwrap();
    assert_chain_exactly(&ipt, NAT_TABLE, POSTROUTING_CHAIN, &[current.clone()]);

    // Legacy installed last
    let ipt = MockIptables::new();
    ipt.seed_rule(NAT_TABLE, POSTROUTING_CHAIN, &current);
    ipt.seed_rule(NAT_TABLE, POSTROUTING_CHAIN, legacy);
    mgr(AddressFamily::Ipv4, None, &ipt)
        .reconcile_pass()
        .await
        .unwrap();
    assert_chain_exactly(&ipt, NAT_TABLE, POSTROUTING_CHAIN, &[current]);
}

#[tokio::test]
async fn repeated_passes_are_idempotent() {
    let ipt = MockIptables::new();
    let m = mgr(AddressFamily::Ipv4, None, &ipt);

    for _ in 0..3 {
        m.reconcile_pass().await.unwrap();
    }

    assert_rule_present(
        &ipt,
        NAT_TABLE,
        POSTROUTING_CHAIN,
        &current_rule(AddressFamily::Ipv4, TranslationMode::Masquerade),
    );
}

#[tokio::test]
async fn snat_pass_installs_snat_not_masquerade() {
    let ipt = MockIptables::new();
    mgr(AddressFamily::Ipv4, Some("203.0.113.5"), &ipt)
        .reconcile_pass()
        .await
        .unwrap();

    let snat = current_rule(
        AddressFamily::Ipv4,
        TranslationMode::SourceNat("203.0.113.5".parse().unwrap()),
    );
    assert_rule_present(&ipt, NAT_TABLE, POSTROUTING_CHAIN, &snat);
    assert_rule_absent(
        &ipt,
        NAT_TABLE,
        POSTROUTING_CHAIN,
        &current_rule(AddressFamily::Ipv4, TranslationMode::Masquerade),
    );
}

#[tokio::test]
async fn legacy_failure_does_not_block_install() {
    let ipt = MockIptables::new();
    let legacy = &legacy_egress_rules(AddressFamily::Ipv4, POD_SUBNETS_SET)[0];
    ipt.seed_rule(NAT_TABLE, POSTROUTING_CHAIN, legacy);
    ipt.fail_delete_of(legacy);

    let sweep = mgr(AddressFamily::Ipv4, None, &ipt)
        .reconcile_pass()
        .await
        .unwrap();

    assert_eq!(sweep.failures().count(), 1);
    assert_rule_present(
        &ipt,
        NAT_TABLE,
        POSTROUTING_CHAIN,
        &current_rule(AddressFamily::Ipv4, TranslationMode::Masquerade),
    );
    // The stuck legacy rule survives until a later pass succeeds
    assert_rule_present(&ipt, NAT_TABLE, POSTROUTING_CHAIN, legacy);
}

#[tokio::test]
async fn dual_stack_families_are_isolated() {
    // iptables and ip6tables are distinct kernel tables
    let ipt4 = MockIptables::new();
    let ipt6 = MockIptables::new();

    mgr(AddressFamily::Ipv4, None, &ipt4)
        .reconcile_pass()
        .await
        .unwrap();
    mgr(AddressFamily::Ipv6, Some("2001:db8::9"), &ipt6)
        .reconcile_pass()
        .await
        .unwrap();

    let v4 = current_rule(AddressFamily::Ipv4, TranslationMode::Masquerade);
    let v6 = current_rule(
        AddressFamily::Ipv6,
        TranslationMode::SourceNat("2001:db8::9".parse().unwrap()),
    );
    assert_rule_present(&ipt4, NAT_TABLE, POSTROUTING_CHAIN, &v4);
    assert_rule_present(&ipt6, NAT_TABLE, POSTROUTING_CHAIN, &v6);

    assert!(v4.iter().all(|t| !t.contains("inet6:")));
    assert!(v6
        .iter()
        .filter(|t| t.contains(POD_SUBNETS_SET) || t.contains(NODE_ADDRS_SET))
        .all(|t| t.starts_with("inet6:")));
}

#[tokio::test]
async fn cleanup_removes_rule_and_is_repeatable() {
    let ipt = MockIptables::new();
    let m = mgr(AddressFamily::Ipv4, None, &ipt);

    m.reconcile_pass().await.unwrap();
    m.delete_egress_rule().await.unwrap();
    // Second cleanup is a no-op, not an error
    m.delete_egress_rule().await.unwrap();

    assert_rule_absent(
        &ipt,
        NAT_TABLE,
        POSTROUTING_CHAIN,
        &current_rule(AddressFamily::Ipv4, TranslationMode::Masquerade),
    );
}
