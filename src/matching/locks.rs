//! Locked-player tracking.
//!
//! A locked player is shown by the fantasy site but cannot be picked.
//! The set is a plain value: each cycle takes a snapshot in, unions the
//! observations from that cycle's scrapes, and hands a new snapshot out.
//! Nothing is shared between sports, so parallel sport runs never race.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::normalize::normalize;

/// Names (in the fantasy site's display convention) known to be locked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockedPlayerSet {
    names: BTreeSet<String>,
}

impl LockedPlayerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty set, used for the explicit reset at the start of a cycle.
    pub fn cleared() -> Self {
        Self::default()
    }

    /// Union this snapshot with newly observed names.
    pub fn union<I, S>(&self, observed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names = self.names.clone();
        names.extend(
            observed
                .into_iter()
                .map(|n| {
                    let n: String = n.into();
                    n.trim().to_string()
                })
                .filter(|n| !n.is_empty()),
        );
        Self { names }
    }

    /// Union with another snapshot.
    pub fn merge(&self, other: &LockedPlayerSet) -> Self {
        self.union(other.names.iter().cloned())
    }

    /// Whether `player` is locked, comparing both sides in normalized form.
    pub fn contains(&self, player: &str) -> bool {
        let key = normalize(player);
        self.names.iter().any(|n| normalize(n) == key)
    }

    /// The set's names in normalized form, for bulk lookups.
    pub fn normalized(&self) -> BTreeSet<String> {
        self.names.iter().map(|n| normalize(n)).collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for LockedPlayerSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        LockedPlayerSet::new().union(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_compares_normalized() {
        let locked: LockedPlayerSet = ["J. Smith"].into_iter().collect();
        assert!(locked.contains("John Smith"));
        assert!(locked.contains("J. Smith"));
        assert!(!locked.contains("John Smithson"));
    }

    #[test]
    fn test_union_is_monotonic_and_pure() {
        let before: LockedPlayerSet = ["A. One"].into_iter().collect();
        let after = before.union(["B. Two", "A. One", "  "]);
        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 2);
        assert!(after.iter().any(|n| n == "B. Two"));
    }

    #[test]
    fn test_merge_two_snapshots() {
        let a: LockedPlayerSet = ["A. One"].into_iter().collect();
        let b: LockedPlayerSet = ["B. Two"].into_iter().collect();
        let merged = a.merge(&b);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_cleared_is_empty() {
        assert!(LockedPlayerSet::cleared().is_empty());
    }

    #[test]
    fn test_serializes_as_sorted_list() {
        let locked: LockedPlayerSet = ["Z. Last", "A. First"].into_iter().collect();
        let json = serde_json::to_string(&locked).unwrap();
        assert_eq!(json, r#"["A. First","Z. Last"]"#);
        let back: LockedPlayerSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, locked);
    }
}
