//! Egress NAT rule construction
//!
//! Pure builders for the packet-filter argument sequences egressmgrd
//! installs and removes. Rule identity in the nat table is the exact
//! ordered token sequence, so builders must be deterministic.

use router_common::{AddressFamily, RouteMgrError, RouteMgrResult};

use crate::types::{family_matches, TranslationMode, INET6_SET_PREFIX};

/// Ordered packet-filter argument sequence identifying one rule.
///
/// Two specs are equal only if every token matches in order; the nat table
/// imposes no weaker equality.
pub type RuleSpec = Vec<String>;

/// Qualifies a set reference for the rule's address family.
fn set_ref(family: AddressFamily, set_name: &str) -> String {
    match family {
        AddressFamily::Ipv4 => set_name.to_string(),
        AddressFamily::Ipv6 => format!("{}{}", INET6_SET_PREFIX, set_name),
    }
}

/// Match clauses shared by every egress rule variant: source inside the pod
/// set, destination outside both the pod set and the node set.
fn egress_match_clauses(family: AddressFamily, pod_set: &str, node_set: &str) -> RuleSpec {
    let pod = set_ref(family, pod_set);
    let node = set_ref(family, node_set);
    vec![
        "-m".into(),
        "set".into(),
        "--match-set".into(),
        pod.clone(),
        "src".into(),
        "-m".into(),
        "set".into(),
        "!".into(),
        "--match-set".into(),
        pod,
        "dst".into(),
        "-m".into(),
        "set".into(),
        "!".into(),
        "--match-set".into(),
        node,
        "dst".into(),
    ]
}

/// Builds the egress NAT rule for one family and translation mode.
///
/// The SNAT variant differs from the masquerade variant only in the
/// terminal action tokens; the match clauses are identical. An SNAT target
/// whose family does not match `family` is rejected rather than emitted as
/// a rule the kernel would misapply.
pub fn build_egress_rule(
    family: AddressFamily,
    mode: TranslationMode,
    pod_set: &str,
    node_set: &str,
) -> RouteMgrResult<RuleSpec> {
    let mut args = egress_match_clauses(family, pod_set, node_set);
    match mode {
        TranslationMode::Masquerade => {
            args.push("-j".into());
            args.push("MASQUERADE".into());
        }
        TranslationMode::SourceNat(addr) => {
            if !family_matches(family, addr) {
                return Err(RouteMgrError::invalid_config(
                    "egress_addr",
                    format!("SNAT target '{}' is not an {} address", addr, family),
                ));
            }
            args.push("-j".into());
            args.push("SNAT".into());
            args.push("--to".into());
            args.push(addr.to_string());
        }
    }
    Ok(args)
}

/// Previously-shipped egress rule variants for one family, kept solely so
/// upgrades can locate and remove them. Never installed.
///
/// The current catalog holds the early rule that lacked the node-address
/// destination exclusion, which masqueraded pod-to-node traffic.
pub fn legacy_egress_rules(family: AddressFamily, pod_set: &str) -> Vec<RuleSpec> {
    let pod = set_ref(family, pod_set);
    vec![vec![
        "-m".into(),
        "set".into(),
        "--match-set".into(),
        pod.clone(),
        "src".into(),
        "-m".into(),
        "set".into(),
        "!".into(),
        "--match-set".into(),
        pod,
        "dst".into(),
        "-j".into(),
        "MASQUERADE".into(),
    ]]
}
