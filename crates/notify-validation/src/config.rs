//! Validator configuration.
//!
//! Backends differ in which weekday and month spellings they accept, so the
//! token vocabulary is a configuration value rather than a constant.

use serde::{Deserialize, Serialize};

/// Full weekday names, Sunday first.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "sunday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

/// Three-letter weekday abbreviations, Sunday first.
pub const WEEKDAY_ABBREVIATIONS: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Full month names, January first.
pub const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Three-letter month abbreviations, January first.
pub const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Which weekday and month spellings the list validators accept.
///
/// Full English names are always accepted, case-insensitively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListVocabulary {
    /// Accept `mon`, `tue`, ... in weekday lists.
    pub weekday_abbreviations: bool,
    /// Accept `jan`, `feb`, ... in month lists.
    pub month_abbreviations: bool,
}

impl ListVocabulary {
    /// Vocabulary accepting full names only.
    #[must_use]
    pub const fn full_names() -> Self {
        Self {
            weekday_abbreviations: false,
            month_abbreviations: false,
        }
    }

    /// Vocabulary accepting full names and three-letter abbreviations.
    #[must_use]
    pub const fn with_abbreviations() -> Self {
        Self {
            weekday_abbreviations: true,
            month_abbreviations: true,
        }
    }

    /// Looks up a lower-cased weekday token, returning days since Sunday.
    #[must_use]
    pub fn weekday_index(&self, token: &str) -> Option<u32> {
        find_index(&WEEKDAY_NAMES, token).or_else(|| {
            self.weekday_abbreviations
                .then(|| find_index(&WEEKDAY_ABBREVIATIONS, token))
                .flatten()
        })
    }

    /// Looks up a lower-cased month token, returning the month number (1-12).
    #[must_use]
    pub fn month_number(&self, token: &str) -> Option<u32> {
        find_index(&MONTH_NAMES, token)
            .or_else(|| {
                self.month_abbreviations
                    .then(|| find_index(&MONTH_ABBREVIATIONS, token))
                    .flatten()
            })
            .map(|index| index + 1)
    }
}

fn find_index(names: &[&str], token: &str) -> Option<u32> {
    names
        .iter()
        .position(|name| *name == token)
        .and_then(|index| u32::try_from(index).ok())
}

/// Top-level validator configuration, loadable from JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Accepted weekday/month spellings.
    pub vocabulary: ListVocabulary,
}
