//! Directory vs staffing roster comparison

use crate::compare::IdentitySet;
use crate::normalize::normalize;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reason recorded for every directory identity missing from the roster.
pub const MISSING_FROM_ROSTER_REASON: &str = "Активен в AD, но отсутствует в штатном расписании";

/// One directory identity that the staffing roster does not list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RosterGap {
    /// Name as it appears in the directory (first occurrence)
    pub original_name: String,
    pub reason: String,
}

/// List directory names whose canonical key is absent from the roster.
///
/// An empty roster yields no rows: a roster that failed to load must not
/// turn every directory identity into a gap. Rows follow directory input
/// order, one per key; the first spelling seen for a key is reported.
pub fn find_missing_from_roster<'a, I>(directory_names: I, roster: &IdentitySet) -> Vec<RosterGap>
where
    I: IntoIterator<Item = &'a str>,
{
    if roster.is_empty() {
        return Vec::new();
    }

    let mut reported = IdentitySet::new();
    let mut gaps = Vec::new();

    for name in directory_names {
        let key = normalize(Some(name));
        if key.is_empty() || roster.contains(&key) {
            continue;
        }
        if reported.insert(key) {
            gaps.push(RosterGap {
                original_name: name.to_string(),
                reason: MISSING_FROM_ROSTER_REASON.to_string(),
            });
        }
    }

    gaps
}
