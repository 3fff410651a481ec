//! Fixed-capacity, dual-polarity candidate pool

use super::admit_diverse;
use crate::record::{MatchRecord, Polarity};

/// Bottom of an empty side, above any reachable similarity
const EMPTY_BOTTOM: f64 = 2.0;

/// One polarity's records plus cached bookkeeping
#[derive(Debug)]
struct Side<'a, R> {
    records: &'a mut Vec<R>,
    bottom: f64,
    worst: Option<usize>,
    latest: Option<usize>,
}

impl<'a, R: MatchRecord> Side<'a, R> {
    fn new(records: &'a mut Vec<R>) -> Self {
        let mut side = Self {
            records,
            bottom: EMPTY_BOTTOM,
            worst: None,
            latest: None,
        };
        side.refresh();
        side
    }

    /// Recompute bottom/worst (first index on ties) and latest
    fn refresh(&mut self) {
        self.bottom = EMPTY_BOTTOM;
        self.worst = None;
        self.latest = None;

        let mut newest = None;
        for (index, record) in self.records.iter().enumerate() {
            if record.similarity() < self.bottom {
                self.bottom = record.similarity();
                self.worst = Some(index);
            }
            let key = record.timeline_key();
            if newest.map_or(true, |n| key > n) {
                newest = Some(key);
                self.latest = Some(index);
            }
        }
    }

    /// Near-duplicate of the most recent entry
    fn is_near_latest(&self, record: &R, distance: usize) -> bool {
        self.latest
            .is_some_and(|index| self.records[index].time_distance(record) < distance)
    }

    fn admit(&mut self, record: R, distance: usize) -> bool {
        admit_diverse(self.records, self.latest, record, distance)
    }

    fn replace_worst(&mut self, record: R) {
        if let Some(index) = self.worst {
            self.records[index] = record;
        }
    }

    fn evict_worst(&mut self) {
        if let Some(index) = self.worst {
            self.records.remove(index);
            self.refresh();
        }
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// Keeps the `capacity` best records across both polarities.
///
/// Callers must only add a record while [`admits`](Self::admits) holds for
/// its similarity; the pool does not re-check.
#[derive(Debug)]
pub struct CandidatePool<'a, R> {
    capacity: usize,
    distance: usize,
    positive: Side<'a, R>,
    negative: Side<'a, R>,
}

impl<'a, R: MatchRecord> CandidatePool<'a, R> {
    /// Bind to the caller's result vectors for one search
    pub fn new(
        positives: &'a mut Vec<R>,
        negatives: &'a mut Vec<R>,
        capacity: usize,
        distance: usize,
    ) -> Self {
        Self {
            capacity,
            distance,
            positive: Side::new(positives),
            negative: Side::new(negatives),
        }
    }

    /// Admission guard: room left, or better than the current worst
    #[inline]
    pub fn admits(&self, similarity: f64) -> bool {
        self.len() < self.capacity || similarity > self.worst_similarity()
    }

    pub fn add_positive(&mut self, record: R) {
        self.add(Polarity::Positive, record);
    }

    pub fn add_negative(&mut self, record: R) {
        self.add(Polarity::Negative, record);
    }

    pub fn add(&mut self, polarity: Polarity, record: R) {
        debug_assert!(
            self.admits(record.similarity()),
            "record added outside the admission guard"
        );

        let distance = self.distance;
        let full = self.len() >= self.capacity;
        // Ties between the two bottoms are settled on the negative side
        let negative_is_weaker = self.negative.bottom <= self.positive.bottom;

        let (own, other) = match polarity {
            Polarity::Positive => (&mut self.positive, &mut self.negative),
            Polarity::Negative => (&mut self.negative, &mut self.positive),
        };
        let own_is_weaker = match polarity {
            Polarity::Positive => !negative_is_weaker,
            Polarity::Negative => negative_is_weaker,
        };

        let changed = if !full || own.is_near_latest(&record, distance) {
            own.admit(record, distance)
        } else if own_is_weaker {
            own.replace_worst(record);
            true
        } else {
            other.evict_worst();
            own.records.push(record);
            true
        };

        if changed {
            own.refresh();
        }
    }

    /// Records held across both sides
    #[inline]
    pub fn len(&self) -> usize {
        self.positive.len() + self.negative.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lowest similarity held, 2.0 when empty
    #[inline]
    pub fn worst_similarity(&self) -> f64 {
        self.positive.bottom.min(self.negative.bottom)
    }
}
