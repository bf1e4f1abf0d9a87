use std::collections::HashMap;

use crate::date::PublishedDate;
use crate::model::CanonicalRecord;
use crate::normalize;

/// Work types whose records can lend their date to member works.
const COLLECTION_TYPES: [&str; 3] = ["collection", "anthology", "story collection"];

fn is_collection_type(work_type: &str) -> bool {
    let lowered = work_type.trim().to_lowercase();
    COLLECTION_TYPES.contains(&lowered.as_str())
}

/// Fill missing publication dates from parent collections.
///
/// Builds an index of dated collection records (keyed by raw and normalized
/// title), then gives every undated record that names a collection the
/// collection's date. A member whose collection is absent or undated keeps its
/// unknown date; that is not an error. Returns the number of records updated.
///
/// Must run only after ingestion completes: a collection's own date may arrive
/// after its member works do.
pub fn collection_dates(records: &mut [CanonicalRecord]) -> usize {
    let mut index: HashMap<String, PublishedDate> = HashMap::new();
    for record in records.iter() {
        if !is_collection_type(&record.work_type) || record.published_date.is_unknown() {
            continue;
        }
        index.insert(record.title.clone(), record.published_date);
        index.insert(normalize::canonical_key(&record.title), record.published_date);
    }

    let mut updated = 0;
    for record in records.iter_mut() {
        if !record.published_date.is_unknown() {
            continue;
        }
        let Some(collection_name) = record.collection_name.as_deref() else {
            continue;
        };
        if collection_name.is_empty() {
            continue;
        }

        let inherited = index
            .get(collection_name)
            .or_else(|| index.get(&normalize::canonical_key(collection_name)));
        if let Some(date) = inherited {
            tracing::debug!(
                title = %record.title,
                collection = collection_name,
                date = %date,
                "inheriting collection date"
            );
            record.published_date = *date;
            updated += 1;
        }
    }

    updated
}
