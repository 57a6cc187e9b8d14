//! Stateful in-memory stand-in for the packet-filter command adapter

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use router_common::{IptablesHandle, RouteMgrError, RouteMgrResult};

type ChainKey = (String, String);

/// In-memory packet-filter double.
///
/// Keeps one ordered rule list per (table, chain), mirroring the kernel's
/// flat table, and honors the production adapter's contracts: `delete` of
/// an absent rule errors, `append_unique` is a no-op when the rule is
/// already present. Failures are injected per exact rule so tests can
/// simulate one operation failing while the rest of a pass proceeds.
#[derive(Debug, Default)]
pub struct MockIptables {
    chains: Mutex<HashMap<ChainKey, Vec<Vec<String>>>>,
    fail_exists: Mutex<Vec<Vec<String>>>,
    fail_append: Mutex<Vec<Vec<String>>>,
    fail_delete: Mutex<Vec<Vec<String>>>,
}

impl MockIptables {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule at the end of a chain, bypassing the handle contract.
    /// Duplicates are allowed, as in the kernel table.
    pub fn seed_rule(&self, table: &str, chain: &str, rule: &[String]) {
        self.chains
            .lock()
            .unwrap()
            .entry(key(table, chain))
            .or_default()
            .push(rule.to_vec());
    }

    /// Raw ordered dump of a chain.
    pub fn dump(&self, table: &str, chain: &str) -> Vec<Vec<String>> {
        self.chains
            .lock()
            .unwrap()
            .get(&key(table, chain))
            .cloned()
            .unwrap_or_default()
    }

    /// Number of entries in a chain exactly matching `rule`.
    pub fn count(&self, table: &str, chain: &str, rule: &[String]) -> usize {
        self.dump(table, chain)
            .iter()
            .filter(|r| r.as_slice() == rule)
            .count()
    }

    /// Makes every existence check of this exact rule fail.
    pub fn fail_exists_of(&self, rule: &[String]) {
        self.fail_exists.lock().unwrap().push(rule.to_vec());
    }

    /// Makes every append of this exact rule fail.
    pub fn fail_append_of(&self, rule: &[String]) {
        self.fail_append.lock().unwrap().push(rule.to_vec());
    }

    /// Makes every delete of this exact rule fail.
    pub fn fail_delete_of(&self, rule: &[String]) {
        self.fail_delete.lock().unwrap().push(rule.to_vec());
    }

    fn injected(list: &Mutex<Vec<Vec<String>>>, rule: &[String]) -> bool {
        list.lock().unwrap().iter().any(|r| r.as_slice() == rule)
    }

    fn busy(op: &str, rule: &[String]) -> RouteMgrError {
        RouteMgrError::ShellCommandFailed {
            command: format!("iptables -w -t nat {} POSTROUTING {}", op, rule.join(" ")),
            exit_code: 4,
            output: "Resource temporarily unavailable".to_string(),
        }
    }
}

#[async_trait]
impl IptablesHandle for MockIptables {
    async fn append_unique(
        &self,
        table: &str,
        chain: &str,
        rule: &[String],
    ) -> RouteMgrResult<()> {
        if Self::injected(&self.fail_append, rule) {
            return Err(Self::busy("-A", rule));
        }
        let mut chains = self.chains.lock().unwrap();
        let rules = chains.entry(key(table, chain)).or_default();
        if !rules.iter().any(|r| r.as_slice() == rule) {
            rules.push(rule.to_vec());
        }
        Ok(())
    }

    async fn exists(&self, table: &str, chain: &str, rule: &[String]) -> RouteMgrResult<bool> {
        if Self::injected(&self.fail_exists, rule) {
            return Err(Self::busy("-C", rule));
        }
        Ok(self.count(table, chain, rule) > 0)
    }

    async fn delete(&self, table: &str, chain: &str, rule: &[String]) -> RouteMgrResult<()> {
        if Self::injected(&self.fail_delete, rule) {
            return Err(Self::busy("-D", rule));
        }
        let mut chains = self.chains.lock().unwrap();
        let rules = chains.entry(key(table, chain)).or_default();
        match rules.iter().position(|r| r.as_slice() == rule) {
            Some(pos) => {
                rules.remove(pos);
                Ok(())
            }
            // Same contract as `iptables -D` against a missing rule
            None => Err(RouteMgrError::ShellCommandFailed {
                command: format!("iptables -w -t {} -D {} {}", table, chain, rule.join(" ")),
                exit_code: 1,
                output: "Bad rule (does a matching rule exist in that chain?)".to_string(),
            }),
        }
    }
}

fn key(table: &str, chain: &str) -> ChainKey {
    (table.to_string(), chain.to_string())
}
