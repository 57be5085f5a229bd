//! Prefix-keyed comparison of desired and observed policy rules
//!
//! A rule is identified by its path up to the first `*`, so `secret/*` and
//! `secret/` address the same rule. Capabilities compare as sets.

use crate::controller::ManagedError;
use crate::provider::PolicyRule;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Index rules by prefix; a later rule replaces an earlier one with the same prefix
pub fn index_by_prefix(rules: &[PolicyRule]) -> BTreeMap<&str, &PolicyRule> {
    let mut index = BTreeMap::new();
    for rule in rules {
        if let Some(previous) = index.insert(rule.prefix(), rule) {
            debug!(
                prefix = rule.prefix(),
                replaced = %previous.path,
                path = %rule.path,
                "Rules share a prefix, keeping the later one"
            );
        }
    }
    index
}

/// Reject desired rules where two paths reduce to the same prefix
///
/// # Errors
/// `DuplicateRulePrefix` naming the first clashing pair.
pub fn ensure_unique_prefixes(rules: &[PolicyRule]) -> Result<(), ManagedError> {
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    for rule in rules {
        match seen.entry(rule.prefix()) {
            Entry::Vacant(slot) => {
                slot.insert(&rule.path);
            }
            Entry::Occupied(slot) => {
                return Err(ManagedError::DuplicateRulePrefix {
                    prefix: rule.prefix().to_string(),
                    first: (*slot.get()).to_string(),
                    second: rule.path.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Whether `observed` already grants exactly what `desired` asks for
pub fn is_up_to_date(desired: &[PolicyRule], observed: &[PolicyRule]) -> bool {
    let desired = index_by_prefix(desired);
    let observed = index_by_prefix(observed);

    if desired.len() != observed.len() {
        return false;
    }

    observed.iter().all(|(prefix, observed_rule)| {
        desired
            .get(prefix)
            .is_some_and(|desired_rule| capabilities_match(desired_rule, observed_rule))
    })
}

fn capabilities_match(desired: &PolicyRule, observed: &PolicyRule) -> bool {
    let desired: BTreeSet<&str> = desired.capability_set();
    let observed: BTreeSet<&str> = observed.capability_set();
    desired.len() == observed.len() && observed.is_subset(&desired)
}

/// Prefixes of `rules`, used to prune rules dropped from the spec
pub fn prefixes(rules: &[PolicyRule]) -> BTreeSet<String> {
    rules.iter().map(|r| r.prefix().to_string()).collect()
}
