use std::collections::HashMap;
use std::collections::hash_map::Entry;

use thiserror::Error;

use crate::date::PublishedDate;
use crate::model::{CanonicalRecord, RawRecord, merge_formats};
use crate::normalize;
use crate::propagate;

#[derive(Debug, Error)]
pub enum IngestError {
    /// The fetch layer is responsible for filtering blank titles before they
    /// get here; a record that slips through is rejected, not merged.
    #[error("raw record has an empty title (url: {url})")]
    EmptyTitle { url: String },
}

/// Stateful aggregator that folds the raw record stream into one canonical
/// record per distinct work, keyed by normalized title.
///
/// Owns its key → record map for the duration of one run: construct, `ingest`
/// every raw record in input order, then `finalize` to propagate collection
/// dates and drain the sorted result.
#[derive(Debug, Default)]
pub struct Reconciler {
    works: HashMap<String, CanonicalRecord>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct works seen so far.
    pub fn len(&self) -> usize {
        self.works.len()
    }

    pub fn is_empty(&self) -> bool {
        self.works.is_empty()
    }

    /// Fold one raw occurrence into the canonical map.
    ///
    /// Merge policy for an already-known work:
    /// - title/url: an incoming "complete"/"uncut"/"expanded" variant replaces
    ///   the stored title, so the last qualifying variant wins;
    /// - date: earliest known date wins, unknown never overwrites known;
    /// - formats: set union;
    /// - collection fields: first write wins;
    /// - work type: first-seen value is kept.
    pub fn ingest(&mut self, raw: RawRecord) -> Result<(), IngestError> {
        if raw.title.trim().is_empty() {
            return Err(IngestError::EmptyTitle { url: raw.url });
        }

        let key = normalize::canonical_key(&raw.title);
        let existing = match self.works.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(CanonicalRecord::from_raw(raw));
                return Ok(());
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        if prefers_variant_title(&raw.title) {
            existing.title = raw.title;
            existing.url = raw.url;
        }

        let incoming = PublishedDate::parse(&raw.published_date);
        if !incoming.is_unknown()
            && (existing.published_date.is_unknown() || incoming < existing.published_date)
        {
            existing.published_date = incoming;
        }

        existing.formats = merge_formats(&existing.formats, &raw.formats);

        if existing.collection_name.is_none() && raw.collection_name.is_some() {
            existing.collection_name = raw.collection_name;
            existing.collection_url = raw.collection_url;
        }

        Ok(())
    }

    /// Run the post-ingestion passes and drain the canonical records.
    ///
    /// Collection-date propagation has to wait until every raw record is in: a
    /// collection's own date may arrive after its member works.
    pub fn finalize(self) -> Vec<CanonicalRecord> {
        let mut records: Vec<CanonicalRecord> = self.works.into_values().collect();

        let inherited = propagate::collection_dates(&mut records);
        if inherited > 0 {
            tracing::debug!(inherited, "filled missing dates from collections");
        }

        sort_records(&mut records);
        records
    }
}

/// Whether an incoming title should displace the stored one as the display
/// title for its group.
fn prefers_variant_title(title: &str) -> bool {
    let lowered = title.to_lowercase();
    ["complete", "uncut", "expanded"]
        .iter()
        .any(|token| lowered.contains(token))
}

/// Output ordering: works with known dates first in chronological order, then
/// undated works; ties broken by title, byte-wise.
pub fn sort_records(records: &mut [CanonicalRecord]) {
    records.sort_by(|a, b| {
        a.published_date
            .cmp(&b.published_date)
            .then_with(|| a.title.cmp(&b.title))
    });
}
