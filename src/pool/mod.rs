//! Retention pools
//!
//! Pools borrow the caller's result vectors for the duration of one search
//! and decide what each admitted record becomes:
//!
//! - [`CandidatePool`]: fixed total capacity shared by both polarities, with
//!   capacity moving to whichever side holds the better matches.
//! - [`GraduatePool`]: unbounded, fed only with records above a threshold.
//!
//! Both drop near-duplicates: a record closer than the diversity distance to
//! the most recent same-polarity entry either replaces it (when stronger) or
//! is discarded. Scans walk time monotonically, so duplicates always arrive
//! next to each other.

pub mod candidate;
pub mod graduate;

pub use candidate::CandidatePool;
pub use graduate::GraduatePool;

use crate::record::MatchRecord;

/// Append `record` unless it is a near-duplicate of `latest`, in which case
/// the stronger of the two is kept at `latest`. Returns true on mutation.
pub(crate) fn admit_diverse<R: MatchRecord>(
    records: &mut Vec<R>,
    latest: Option<usize>,
    record: R,
    distance: usize,
) -> bool {
    match latest {
        Some(index) if records[index].time_distance(&record) < distance => {
            if record.similarity() > records[index].similarity() {
                records[index] = record;
                true
            } else {
                false
            }
        }
        _ => {
            records.push(record);
            true
        }
    }
}
