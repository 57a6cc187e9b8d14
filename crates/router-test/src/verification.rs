//! Assertion helpers over the in-memory packet-filter double

use crate::MockIptables;

/// Panics unless `rule` is present in the chain exactly once.
pub fn assert_rule_present(ipt: &MockIptables, table: &str, chain: &str, rule: &[String]) {
    let count = ipt.count(table, chain, rule);
    assert_eq!(
        count, 1,
        "expected rule present exactly once in {}/{} (found {}): {}",
        table,
        chain,
        count,
        rule.join(" ")
    );
}

/// Panics if `rule` appears anywhere in the chain.
pub fn assert_rule_absent(ipt: &MockIptables, table: &str, chain: &str, rule: &[String]) {
    let count = ipt.count(table, chain, rule);
    assert_eq!(
        count, 0,
        "expected rule absent from {}/{} (found {}): {}",
        table,
        chain,
        count,
        rule.join(" ")
    );
}

/// Panics unless the chain contains exactly `expected`, in order.
pub fn assert_chain_exactly(
    ipt: &MockIptables,
    table: &str,
    chain: &str,
    expected: &[Vec<String>],
) {
    let dump = ipt.dump(table, chain);
    assert_eq!(
        dump, expected,
        "unexpected contents of {}/{}",
        table, chain
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_assert_rule_present() {
        let ipt = MockIptables::new();
        let r = rule(&["-j", "MASQUERADE"]);
        ipt.seed_rule("nat", "POSTROUTING", &r);

        assert_rule_present(&ipt, "nat", "POSTROUTING", &r);
    }

    #[test]
    #[should_panic(expected = "expected rule present exactly once")]
    fn test_assert_rule_present_panics_on_duplicate() {
        let ipt = MockIptables::new();
        let r = rule(&["-j", "MASQUERADE"]);
        ipt.seed_rule("nat", "POSTROUTING", &r);
        ipt.seed_rule("nat", "POSTROUTING", &r);

        assert_rule_present(&ipt, "nat", "POSTROUTING", &r);
    }

    #[test]
    fn test_assert_rule_absent() {
        let ipt = MockIptables::new();
        assert_rule_absent(&ipt, "nat", "POSTROUTING", &rule(&["-j", "MASQUERADE"]));
    }

    #[test]
    fn test_assert_chain_exactly() {
        let ipt = MockIptables::new();
        let first = rule(&["-j", "SNAT", "--to", "10.0.0.9"]);
        let second = rule(&["-j", "MASQUERADE"]);
        ipt.seed_rule("nat", "POSTROUTING", &first);
        ipt.seed_rule("nat", "POSTROUTING", &second);

        assert_chain_exactly(
            &ipt,
            "nat",
            "POSTROUTING",
            &[first, second],
        );
    }
}
