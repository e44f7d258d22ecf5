//! Orphan-account detection
//!
//! An orphan is an active account in an external service whose name has no
//! match among the directory's valid identities. Disabled accounts are never
//! reported: they need no remediation.

use crate::compare::IdentitySet;
use crate::normalize::normalize;

/// A record that carries a free-form full name.
pub trait IdentityRecord {
    fn full_name(&self) -> Option<&str>;
}

impl IdentityRecord for String {
    fn full_name(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl IdentityRecord for &str {
    fn full_name(&self) -> Option<&str> {
        Some(*self)
    }
}

/// Find the active records whose canonical key is not in `valid`.
///
/// Records with a blank name are skipped. `is_active` is the service's own
/// activity rule, so the same detector serves date-based and flag-based
/// services. Output keeps input order and returns the records untouched.
pub fn find_orphans<'a, R, P>(records: &'a [R], valid: &IdentitySet, is_active: P) -> Vec<&'a R>
where
    R: IdentityRecord,
    P: Fn(&R) -> bool,
{
    records
        .iter()
        .filter(|record| {
            let key = normalize(record.full_name());
            !key.is_empty() && !valid.contains(&key)
        })
        .filter(|record| is_active(*record))
        .collect()
}
