use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;

/// Sentinel the source site emits for works it has no publication date for.
pub const NO_DATE_PLACEHOLDER: &str = "0000-00-00";

/// A publication date as resolved from a scraped string.
///
/// `Unknown` covers the empty string, the site's `0000-00-00` placeholder, and
/// anything that fails to parse as `YYYY-MM-DD`. It sorts after every known
/// date so undated works end up at the bottom of the exported table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishedDate {
    Known(NaiveDate),
    Unknown,
}

impl PublishedDate {
    /// Total: never fails, every malformed input resolves to `Unknown`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == NO_DATE_PLACEHOLDER {
            return Self::Unknown;
        }

        match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            Ok(date) => Self::Known(date),
            Err(_) => Self::Unknown,
        }
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// ISO form for export, or `None` for unknown dates. The placeholder and
    /// any far-future stand-in never leave this type.
    pub fn as_iso(self) -> Option<String> {
        match self {
            Self::Known(date) => Some(date.format("%Y-%m-%d").to_string()),
            Self::Unknown => None,
        }
    }
}

impl Ord for PublishedDate {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Known(a), Self::Known(b)) => a.cmp(b),
            (Self::Known(_), Self::Unknown) => Ordering::Less,
            (Self::Unknown, Self::Known(_)) => Ordering::Greater,
            (Self::Unknown, Self::Unknown) => Ordering::Equal,
        }
    }
}

impl PartialOrd for PublishedDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PublishedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Unknown => Ok(()),
        }
    }
}
