//! Set comparison over canonical keys
//!
//! Every comparison in the crate goes through [`IdentitySet`], which is built
//! from raw names and never contains the empty key. Blank rows therefore can
//! not show up as matches or duplicates.

use crate::normalize::{normalize, CanonicalKey};
use serde::{Deserialize, Serialize};
use std::collections::{btree_set, BTreeMap, BTreeSet};

/// A set of canonical keys materialized from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentitySet {
    keys: BTreeSet<CanonicalKey>,
}

impl IdentitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize every name and collect the non-empty keys.
    pub fn from_names<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        names.into_iter().map(normalize).collect()
    }

    /// Insert a key. The empty key is ignored; returns whether it was added.
    pub fn insert(&mut self, key: CanonicalKey) -> bool {
        if key.is_empty() {
            return false;
        }
        self.keys.insert(key)
    }

    pub fn contains(&self, key: &CanonicalKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, CanonicalKey> {
        self.keys.iter()
    }

    pub fn union(&self, other: &IdentitySet) -> IdentitySet {
        Self {
            keys: self.keys.union(&other.keys).cloned().collect(),
        }
    }

    pub fn intersection(&self, other: &IdentitySet) -> IdentitySet {
        Self {
            keys: self.keys.intersection(&other.keys).cloned().collect(),
        }
    }

    pub fn difference(&self, other: &IdentitySet) -> IdentitySet {
        Self {
            keys: self.keys.difference(&other.keys).cloned().collect(),
        }
    }
}

impl FromIterator<CanonicalKey> for IdentitySet {
    fn from_iter<T: IntoIterator<Item = CanonicalKey>>(iter: T) -> Self {
        let mut set = IdentitySet::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

impl Extend<CanonicalKey> for IdentitySet {
    fn extend<T: IntoIterator<Item = CanonicalKey>>(&mut self, iter: T) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl IntoIterator for IdentitySet {
    type Item = CanonicalKey;
    type IntoIter = btree_set::IntoIter<CanonicalKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter()
    }
}

impl<'a> IntoIterator for &'a IdentitySet {
    type Item = &'a CanonicalKey;
    type IntoIter = btree_set::Iter<'a, CanonicalKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

/// Keys present in both sources (informational cross-source duplicates).
pub fn cross_source_matches(a: &IdentitySet, b: &IdentitySet) -> IdentitySet {
    a.intersection(b)
}

/// Keys that occur two or more times within one source.
///
/// Blank names are not counted, so a column of empty cells is never reported
/// as duplicated.
pub fn internal_duplicates<'a, I>(names: I) -> IdentitySet
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts: BTreeMap<CanonicalKey, usize> = BTreeMap::new();
    for key in names.into_iter().map(normalize) {
        if key.is_empty() {
            continue;
        }
        *counts.entry(key).or_default() += 1;
    }

    counts
        .into_iter()
        .filter(|(_, count)| *count >= 2)
        .map(|(key, _)| key)
        .collect()
}
