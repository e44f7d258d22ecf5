//! Property-based tests for name normalization and set comparison
//!
//! Uses proptest to generate names and verify the matching invariants

use idrecon::{cross_source_matches, internal_duplicates, normalize, normalize_str, IdentitySet};
use proptest::prelude::*;

fn name_token() -> impl Strategy<Value = String> {
    "[a-zA-Zа-яА-ЯёЁ]{1,8}"
}

fn name() -> impl Strategy<Value = String> {
    prop::collection::vec(name_token(), 0..4).prop_map(|tokens| tokens.join(" "))
}

fn spaced(tokens: &[String], gaps: &[usize]) -> String {
    let mut out = " ".repeat(gaps[0]);
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            out.push_str(&" ".repeat(gaps[i].max(1)));
        }
        out.push_str(token);
    }
    out.push_str(&" ".repeat(gaps[tokens.len()]));
    out
}

proptest! {
    #[test]
    fn test_normalize_is_deterministic(raw in name()) {
        prop_assert_eq!(normalize_str(&raw), normalize_str(&raw));
    }

    #[test]
    fn test_normalize_is_idempotent(raw in name()) {
        let once = normalize_str(&raw);
        prop_assert_eq!(normalize_str(once.as_str()), once);
    }

    #[test]
    fn test_whitespace_and_case_do_not_matter(
        tokens in prop::collection::vec(name_token(), 1..4),
        gaps in prop::collection::vec(0usize..4, 5),
    ) {
        let plain = tokens.join(" ");
        let messy = spaced(&tokens, &gaps).to_lowercase();
        prop_assert_eq!(normalize_str(&messy), normalize_str(&plain.to_uppercase()));
    }

    #[test]
    fn test_yo_folds_to_ye(raw in name()) {
        let folded = raw.replace('ё', "е").replace('Ё', "Е");
        prop_assert_eq!(normalize_str(&raw), normalize_str(&folded));
    }

    #[test]
    fn test_patronymic_is_ignored(
        first in name_token(),
        last in name_token(),
        middle in name_token(),
    ) {
        let short = format!("{} {}", first, last);
        let long = format!("{} {} {}", first, last, middle);
        prop_assert_eq!(normalize_str(&short), normalize_str(&long));
    }

    #[test]
    fn test_key_has_at_most_two_tokens(raw in name()) {
        let key = normalize_str(&raw);
        prop_assert!(key.as_str().split(' ').filter(|t| !t.is_empty()).count() <= 2);
    }

    #[test]
    fn test_cross_source_matches_symmetric(
        a in prop::collection::vec(name(), 0..12),
        b in prop::collection::vec(name(), 0..12),
    ) {
        let a = IdentitySet::from_names(a.iter().map(|n| Some(n.as_str())));
        let b = IdentitySet::from_names(b.iter().map(|n| Some(n.as_str())));
        prop_assert_eq!(cross_source_matches(&a, &b), cross_source_matches(&b, &a));
    }

    #[test]
    fn test_sets_never_hold_the_empty_key(names in prop::collection::vec(name(), 0..12)) {
        let set = IdentitySet::from_names(names.iter().map(|n| Some(n.as_str())));
        let dups = internal_duplicates(names.iter().map(|n| Some(n.as_str())));
        prop_assert!(set.iter().all(|k| !k.is_empty()));
        prop_assert!(dups.iter().all(|k| !k.is_empty()));
    }

    #[test]
    fn test_internal_duplicates_order_independent(names in prop::collection::vec(name(), 0..12)) {
        let forward = internal_duplicates(names.iter().map(|n| Some(n.as_str())));
        let backward = internal_duplicates(names.iter().rev().map(|n| Some(n.as_str())));
        prop_assert_eq!(forward, backward);
    }
}

#[test]
fn test_blank_and_missing_are_empty() {
    assert!(normalize(None).is_empty());
    assert!(normalize_str("").is_empty());
    assert!(normalize_str("   \t ").is_empty());
    assert_eq!(normalize(None), normalize_str(""));
}

#[test]
fn test_documented_examples() {
    assert_eq!(normalize_str("Пётр Иванов"), normalize_str("Петр Иванов"));
    assert_eq!(normalize_str(" ivan   petrov "), normalize_str("IVAN PETROV"));
    assert_eq!(normalize_str("Madonna").as_str(), "MADONNA");
}
