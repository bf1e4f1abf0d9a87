use std::collections::BTreeSet;
use std::fmt;

use crate::date::PublishedDate;

/// Fixed vocabulary of release formats tracked per work. `Ord` keeps format
/// sets (`BTreeSet<Format>`) in the same column order the exports use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Format {
    Hardcover,
    Paperback,
    Ebook,
    Audiobook,
    Movie,
    Miniseries,
}

impl Format {
    pub const ALL: [Format; 6] = [
        Format::Hardcover,
        Format::Paperback,
        Format::Ebook,
        Format::Audiobook,
        Format::Movie,
        Format::Miniseries,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Format::Hardcover => "Hardcover",
            Format::Paperback => "Paperback",
            Format::Ebook => "Ebook",
            Format::Audiobook => "Audiobook",
            Format::Movie => "Movie",
            Format::Miniseries => "Miniseries",
        }
    }

    /// Lowercase phrases whose presence on a work's page indicates this
    /// format is available.
    pub fn indicators(self) -> &'static [&'static str] {
        match self {
            Format::Hardcover => &["hardcover", "hard cover", "hard-cover", "hardback"],
            Format::Paperback => &[
                "paperback",
                "soft cover",
                "soft-cover",
                "trade paperback",
                "mass market",
            ],
            Format::Ebook => &["ebook", "e-book", "kindle", "digital", "nook", "electronic"],
            Format::Audiobook => &["audiobook", "audio book", "audible", "audio"],
            Format::Movie => &["movie", "film", "feature film", "motion picture"],
            Format::Miniseries => &[
                "tv series",
                "television series",
                "miniseries",
                "mini-series",
                "mini series",
            ],
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Union of two format sets. Idempotent: merging a set with itself (or
/// re-merging an already-merged set) is a no-op.
pub fn merge_formats(a: &BTreeSet<Format>, b: &BTreeSet<Format>) -> BTreeSet<Format> {
    a.union(b).copied().collect()
}

/// One scraped occurrence of a work, before reconciliation. The same work
/// typically shows up several times across the listing (variant editions,
/// re-releases), each occurrence possibly missing fields the others have.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    /// Title as scraped, edition suffixes and all. Never empty for records
    /// that reach the reconciler; the fetch layer filters blank titles out.
    pub title: String,
    pub url: String,
    /// As scraped: ISO `YYYY-MM-DD`, empty, or the `0000-00-00` placeholder.
    pub published_date: String,
    pub work_type: String,
    pub collection_name: Option<String>,
    pub collection_url: Option<String>,
    pub formats: BTreeSet<Format>,
}

/// Merged, reconciled representation of one distinct work.
#[derive(Debug, Clone)]
pub struct CanonicalRecord {
    pub title: String,
    pub url: String,
    pub published_date: PublishedDate,
    pub work_type: String,
    pub collection_name: Option<String>,
    pub collection_url: Option<String>,
    pub formats: BTreeSet<Format>,
}

impl CanonicalRecord {
    pub fn from_raw(raw: RawRecord) -> Self {
        Self {
            title: raw.title,
            url: raw.url,
            published_date: PublishedDate::parse(&raw.published_date),
            work_type: raw.work_type,
            collection_name: raw.collection_name,
            collection_url: raw.collection_url,
            formats: raw.formats,
        }
    }
}
