//! Normalized comparison of last-modified timestamps.
//!
//! The remote side reports modification times in several textual shapes
//! (`2021-10-14`, `2021-10-14T07:40:29Z`, `2021-10-14 07:40:29.74`, with or
//! without a zone suffix). Two values are compared by stripping every
//! separator and looking only at the leading `YYYYMMDDhhmmss` digits.

use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// Number of significant digits kept after normalization.
pub const SIGNIFICANT_DIGITS: usize = 14;

const SEPARATORS: [char; 6] = ['-', ':', '.', 'T', 'Z', ' '];

/// Errors from timestamp normalization.
#[derive(Debug, Error, Diagnostic)]
pub enum TimestampError {
    #[error(
        "timestamp \"{value}\" has only {digits} significant digits, need {need}",
        need = SIGNIFICANT_DIGITS
    )]
    #[diagnostic(
        code(chunky::timestamp::too_short),
        help(
            "Timestamps must carry date and time down to the second, e.g. \
             `2021-10-14T07:40:29Z` or `2021-10-14 07:40:29.74`. \
             A date-only value is not accepted."
        )
    )]
    TooShort { value: String, digits: usize },
}

pub type TimestampResult<T> = std::result::Result<T, TimestampError>;

/// A timestamp reduced to its 14-digit `YYYYMMDDhhmmss` prefix.
///
/// Ordering is the lexicographic ordering of the digit string, which for a
/// fixed-width numeric prefix is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalizedTimestamp([u8; SIGNIFICANT_DIGITS]);

impl NormalizedTimestamp {
    /// Normalize a raw timestamp string.
    pub fn parse(raw: &str) -> TimestampResult<Self> {
        let mut digits = [0u8; SIGNIFICANT_DIGITS];
        let mut count = 0;

        for c in raw.trim().chars().filter(|c| !SEPARATORS.contains(c)) {
            if count == SIGNIFICANT_DIGITS || !c.is_ascii_digit() {
                break;
            }
            digits[count] = c as u8;
            count += 1;
        }

        if count < SIGNIFICANT_DIGITS {
            return Err(TimestampError::TooShort {
                value: raw.to_string(),
                digits: count,
            });
        }
        Ok(Self(digits))
    }

    /// The normalized digits as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ASCII digits are ever stored.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Whether `self` is strictly later than `other`.
    pub fn is_after(&self, other: &Self) -> bool {
        self > other
    }
}

impl fmt::Display for NormalizedTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NormalizedTimestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Normalize an optional last-modified value.
///
/// `None` stays `None`; a present but malformed value is an error.
pub fn normalize_optional(raw: Option<&str>) -> TimestampResult<Option<NormalizedTimestamp>> {
    raw.map(NormalizedTimestamp::parse).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_and_space_forms_compare_equal() {
        let a = NormalizedTimestamp::parse("2021-10-14T07:40:29Z").unwrap();
        let b = NormalizedTimestamp::parse("2021-10-14 07:40:29.74").unwrap();
        assert_eq!(a.as_str(), "20211014074029");
        assert_eq!(a, b);
    }

    #[test]
    fn fractional_seconds_are_truncated() {
        let a = NormalizedTimestamp::parse("2021-10-14T07:40:29.999Z").unwrap();
        let b = NormalizedTimestamp::parse("2021-10-14T07:40:29.001").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zone_offset_is_ignored_after_prefix() {
        let a = NormalizedTimestamp::parse("2021-10-14T07:40:29+02:00").unwrap();
        assert_eq!(a.to_string(), "20211014074029");
    }

    #[test]
    fn ordering_is_chronological() {
        let earlier = NormalizedTimestamp::parse("2021-10-14 07:40:29").unwrap();
        let later = NormalizedTimestamp::parse("2021-10-14T07:40:30Z").unwrap();
        assert!(later.is_after(&earlier));
        assert!(!earlier.is_after(&later));
        assert!(!earlier.is_after(&earlier));
    }

    #[test]
    fn date_only_is_too_short() {
        let err = NormalizedTimestamp::parse("2021-10-14").unwrap_err();
        assert!(matches!(err, TimestampError::TooShort { digits: 8, .. }));
    }

    #[test]
    fn garbage_is_too_short() {
        let err = "yesterday".parse::<NormalizedTimestamp>().unwrap_err();
        assert!(matches!(err, TimestampError::TooShort { digits: 0, .. }));
    }

    #[test]
    fn optional_passes_none_through() {
        assert_eq!(normalize_optional(None).unwrap(), None);
        assert!(normalize_optional(Some("2021")).is_err());
    }
}
