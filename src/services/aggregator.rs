//! Per-section aggregation of transaction records
//!
//! Records are grouped by section id. Each group's position is taken from
//! the first record seen; positions are assumed constant within a section
//! and are not checked.

use crate::domain::types::{StopSummary, TransactionRecord, TypeCodes};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Group records by section and count boarding/alighting codes
///
/// Output follows first-seen section order. Callers that need ascending
/// section order use [`sort_by_section`].
pub fn aggregate_by_section(records: &[TransactionRecord], codes: &TypeCodes) -> Vec<StopSummary> {
    let mut index: FxHashMap<_, usize> = FxHashMap::default();
    let mut stops: Vec<StopSummary> = Vec::new();

    for record in records {
        let slot = *index.entry(record.section).or_insert_with(|| {
            stops.push(StopSummary {
                section: record.section,
                position: record.position,
                boarding_count: 0,
                alighting_count: 0,
            });
            stops.len() - 1
        });

        let stop = &mut stops[slot];
        if record.type_code == codes.boarding {
            stop.boarding_count += 1;
        } else if record.type_code == codes.alighting {
            stop.alighting_count += 1;
        }
    }

    debug!(records = %records.len(), stops = %stops.len(), "sections_aggregated");
    stops
}

/// Sort stops ascending by section id
pub fn sort_by_section(stops: &mut [StopSummary]) {
    stops.sort_by_key(|s| s.section);
}
