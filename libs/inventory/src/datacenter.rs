//! Normalized datacenter sets.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A normalized set of datacenter codes.
///
/// Codes are trimmed, lower-cased, deduplicated, and kept sorted, so two sets
/// naming the same datacenters in any order compare and encode identically.
/// The empty set means "any datacenter".
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct DatacenterSet(Vec<String>);

impl DatacenterSet {
    /// The empty set, matching any datacenter.
    pub fn any() -> Self {
        Self(Vec::new())
    }

    /// Build a set from arbitrary codes.
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = codes
            .into_iter()
            .map(|c| c.as_ref().trim().to_ascii_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        Self(set.into_iter().collect())
    }

    /// Parse a comma separated list such as `gra,rbx`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// Returns true if the set matches any datacenter.
    pub fn is_any(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of datacenters in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the codes in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns true if the code is a member (or the set matches any).
    pub fn matches(&self, code: &str) -> bool {
        self.is_any() || self.0.iter().any(|c| c.eq_ignore_ascii_case(code))
    }

    /// Canonical comma separated encoding; empty for "any".
    pub fn to_query(&self) -> String {
        self.0.join(",")
    }
}

impl fmt::Display for DatacenterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            write!(f, "any datacenter")
        } else {
            write!(f, "{}", self.0.join(", "))
        }
    }
}

impl From<Vec<String>> for DatacenterSet {
    fn from(codes: Vec<String>) -> Self {
        Self::new(codes)
    }
}

impl From<DatacenterSet> for Vec<String> {
    fn from(set: DatacenterSet) -> Self {
        set.0
    }
}
