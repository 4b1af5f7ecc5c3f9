//! Repository visibility.

use serde::{Deserialize, Serialize};

/// Repository visibility, normalized across forges.
///
/// GitLab's `internal` level has no counterpart elsewhere and is read as
/// [`Visibility::Private`] since it is not world-readable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    #[inline]
    #[must_use]
    pub fn from_private(private: bool) -> Self {
        if private { Self::Private } else { Self::Public }
    }

    #[inline]
    #[must_use]
    pub fn is_private(self) -> bool {
        matches!(self, Self::Private)
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_public() {
        assert_eq!(Visibility::default(), Visibility::Public);
    }

    #[test]
    fn display_outputs_expected_strings() {
        assert_eq!(Visibility::Public.to_string(), "public");
        assert_eq!(Visibility::Private.to_string(), "private");
    }

    #[test]
    fn from_private_round_trips_flag() {
        assert!(Visibility::from_private(true).is_private());
        assert!(!Visibility::from_private(false).is_private());
    }
}
