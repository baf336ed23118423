//! Case handling applied to both strings before comparison.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Case handling for distance computations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseMode {
    /// Compare characters as they are
    #[default]
    Sensitive,
    /// Fold both strings to lowercase before comparing
    Insensitive,
}

impl CaseMode {
    pub fn from_sensitive(case_sensitive: bool) -> Self {
        if case_sensitive {
            Self::Sensitive
        } else {
            Self::Insensitive
        }
    }

    pub fn is_sensitive(self) -> bool {
        self == Self::Sensitive
    }

    /// Apply this mode to a single string, borrowing when nothing changes.
    #[must_use]
    pub fn apply(self, s: &str) -> Cow<'_, str> {
        match self {
            Self::Sensitive => Cow::Borrowed(s),
            Self::Insensitive => fold_case(s),
        }
    }
}

/// Lowercase `s`, skipping the allocation when no character changes.
///
/// Titlecase letters such as `ǅ` are not uppercase but still fold.
#[must_use]
pub fn fold_case(s: &str) -> Cow<'_, str> {
    if s.chars().any(|c| c.to_lowercase().ne(std::iter::once(c))) {
        Cow::Owned(s.to_lowercase())
    } else {
        Cow::Borrowed(s)
    }
}
