//! Name normalization
//!
//! Maps free-form full-name strings ("Фамилия Имя Отчество" in any case and
//! spacing) to a [`CanonicalKey`]: the first two whitespace-separated tokens,
//! uppercased, after folding `ё`/`Ё` to `е`/`Е`. The patronymic or middle
//! name is dropped so that spelling and completeness variants of the same
//! person collapse to one key.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Letter pairs folded before tokenizing: accented form to plain form.
const LETTER_FOLDS: [(char, char); 2] = [('ё', 'е'), ('Ё', 'Е')];

/// Normalized first+last name used as the sole identity-matching key.
///
/// The empty key is what blank input normalizes to. It is never a valid
/// match target; [`crate::compare::IdentitySet`] refuses to hold it.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Replace every accented letter from [`LETTER_FOLDS`] with its plain form.
///
/// # Examples
/// ```
/// use idrecon::normalize::fold_letters;
/// assert_eq!(fold_letters("Пётр Ёлкин"), "Петр Елкин");
/// ```
pub fn fold_letters(text: &str) -> String {
    text.chars()
        .map(|c| {
            LETTER_FOLDS
                .iter()
                .find(|(from, _)| *from == c)
                .map_or(c, |(_, to)| *to)
        })
        .collect()
}

/// Normalize a raw full name into its canonical key.
///
/// `None` and blank strings produce the empty key. A single token (a name
/// with no surname) is a complete key on its own.
///
/// # Examples
/// ```
/// use idrecon::normalize::normalize;
/// assert_eq!(normalize(Some(" ivan   petrov  sergeevich")).as_str(), "IVAN PETROV");
/// assert_eq!(normalize(Some("Пётр Иванов")), normalize(Some("Петр Иванов")));
/// assert!(normalize(None).is_empty());
/// ```
pub fn normalize(raw: Option<&str>) -> CanonicalKey {
    let Some(raw) = raw else {
        return CanonicalKey::default();
    };

    let folded = fold_letters(raw);
    let mut tokens = folded.split_whitespace();

    let key = match (tokens.next(), tokens.next()) {
        (Some(first), Some(second)) => format!("{} {}", first, second),
        (Some(only), None) => only.to_string(),
        _ => String::new(),
    };

    CanonicalKey(key.to_uppercase())
}

/// Shorthand for normalizing a name that is known to be present.
pub fn normalize_str(raw: &str) -> CanonicalKey {
    normalize(Some(raw))
}
