//! Unbounded, threshold-gated graduate pool

use super::admit_diverse;
use crate::record::{MatchRecord, Polarity};

/// Keeps every record that cleared the threshold, minus near-duplicates.
///
/// The threshold gate belongs to the caller; the pool only checks it in
/// debug builds.
#[derive(Debug)]
pub struct GraduatePool<'a, R> {
    distance: usize,
    threshold: f64,
    positives: &'a mut Vec<R>,
    negatives: &'a mut Vec<R>,
}

impl<'a, R: MatchRecord> GraduatePool<'a, R> {
    pub fn new(
        positives: &'a mut Vec<R>,
        negatives: &'a mut Vec<R>,
        distance: usize,
        threshold: f64,
    ) -> Self {
        Self {
            distance,
            threshold,
            positives,
            negatives,
        }
    }

    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[inline]
    pub fn admits(&self, similarity: f64) -> bool {
        similarity >= self.threshold
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
            "graduate below threshold"
        );
        let records = match polarity {
            Polarity::Positive => &mut *self.positives,
            Polarity::Negative => &mut *self.negatives,
        };
        // Records arrive in timeline order, so the last one is the latest
        let latest = records.len().checked_sub(1);
        admit_diverse(records, latest, record, self.distance);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positives.len() + self.negatives.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
