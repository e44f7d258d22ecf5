//! Smoke test to verify basic functionality

use idrecon::service::{default_services, ServiceRecord};
use idrecon::{
    find_missing_from_roster, find_orphans, internal_duplicates, normalize_str, IdentityRecord,
    IdentitySet, MISSING_FROM_ROSTER_REASON,
};
use std::path::Path;

#[test]
fn smoke_test_internal_duplicates() {
    let dups = internal_duplicates(vec![
        Some("Ivan Petrov"),
        Some("IVAN PETROV"),
        Some("Ivan Sidorov"),
    ]);
    assert_eq!(dups.len(), 1);
    assert!(dups.contains(&normalize_str("IVAN PETROV")));
}

#[derive(Debug, PartialEq)]
struct Account {
    name: &'static str,
    active: bool,
}

impl IdentityRecord for Account {
    fn full_name(&self) -> Option<&str> {
        Some(self.name)
    }
}

#[test]
fn smoke_test_orphans() {
    let valid = IdentitySet::from_names(vec![Some("Ivan Petrov")]);
    let accounts = vec![
        Account { name: "Ivan Petrov", active: true },
        Account { name: "Petr Smirnov", active: true },
        Account { name: "Petr Smirnov", active: false },
    ];

    let orphans = find_orphans(&accounts, &valid, |a| a.active);
    assert_eq!(orphans, vec![&accounts[1]]);
}

#[test]
fn smoke_test_service_orphans() {
    let kontur = default_services(Path::new("in"))
        .into_iter()
        .find(|s| s.id == "kontur")
        .unwrap();
    let record = |row: usize, name: &str, blocked: Option<&str>| ServiceRecord {
        row,
        full_name: Some(name.to_string()),
        status: blocked.map(str::to_string),
        admin: None,
    };
    let records = vec![
        record(2, "Ivan Petrov", None),
        record(3, "Petr Smirnov", None),
        record(4, "Petr Smirnov", Some("2024-05-01")),
    ];
    let valid = IdentitySet::from_names(vec![Some("Ivan Petrov")]);

    let orphans = find_orphans(&records, &valid, |r| kontur.is_active(r));
    assert_eq!(orphans, vec![&records[1]]);
}

#[test]
fn smoke_test_roster_gaps() {
    let roster = IdentitySet::from_names(vec![Some("Ivan Petrov")]);
    let gaps = find_missing_from_roster(vec!["Ivan Petrov", "Anna Ivanova"], &roster);
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].original_name, "Anna Ivanova");
    assert_eq!(gaps[0].reason, MISSING_FROM_ROSTER_REASON);

    assert!(find_missing_from_roster(vec!["Ivan Petrov", "Anna Ivanova"], &IdentitySet::new()).is_empty());
}
