// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Natural ordering of device names: `r2 < r11 < r12 < r21`.

/// Structured sort key for a device name.
///
/// A name made of a digit-free stem followed by a decimal suffix (`"r11"`,
/// `"10"`) compares by stem and then by the suffix as a number. Any other
/// name (`"as1r2"`, `"core"`) keeps the whole string as its stem and sorts
/// lexically. The derived ordering is total, so mixing both kinds
/// in one sort is well defined.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NaturalKey {
    stem: String,
    number: Option<u64>,
    raw: String,
}

impl NaturalKey {
    /// The numeric suffix, when the name decomposed.
    #[must_use]
    pub fn number(&self) -> Option<u64> {
        self.number
    }

    /// The non-numeric stem (the whole name when it did not decompose).
    #[must_use]
    pub fn stem(&self) -> &str {
        &self.stem
    }
}

/// Builds the natural sort key of `name`.
#[must_use]
pub fn natural_key(name: &str) -> NaturalKey {
    let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let digits = &name[stem.len()..];
    let decomposed = if digits.is_empty() || stem.chars().any(|c| c.is_ascii_digit()) {
        None
    } else {
        digits.parse::<u64>().ok()
    };
    match decomposed {
        Some(number) => NaturalKey {
            stem: stem.to_owned(),
            number: Some(number),
            raw: name.to_owned(),
        },
        None => NaturalKey {
            stem: name.to_owned(),
            number: None,
            raw: name.to_owned(),
        },
    }
}
