//! Property-based tests for patterns, windowing and retention pools.

use proptest::prelude::*;

use precedent::prelude::*;

// ==================== Generators ====================

/// Random low/high bars around positive prices
fn arb_bars(len: usize) -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec((1.0..1000.0_f64, 0.0..5.0_f64), len)
        .prop_map(|data| {
            data.into_iter()
                .map(|(low, spread)| Bar::new(low, low + spread))
                .collect::<Vec<_>>()
        })
}

/// Candidate stream in timeline order: (day, spot, similarity, polarity)
fn arb_stream(max_len: usize) -> impl Strategy<Value = Vec<(usize, usize, f64, Polarity)>> {
    prop::collection::vec(
        (prop::bool::weighted(0.05), 0usize..12, -1.0..1.0_f64, prop::bool::ANY),
        1..=max_len,
    )
    .prop_map(|steps| {
        let (mut day, mut spot) = (0usize, 0usize);
        steps
            .into_iter()
            .map(|(next_day, step, similarity, mirror)| {
                if next_day {
                    day += 1;
                    spot = 0;
                }
                spot += step;
                let polarity = if mirror { Polarity::Negative } else { Polarity::Positive };
                (day, spot, similarity, polarity)
            })
            .collect::<Vec<_>>()
    })
}

fn record(day: usize, trade_time_spot: usize, similarity: f64) -> ScanRecord {
    ScanRecord {
        day,
        trade_time_spot,
        similarity,
        scale_factor: 1.0,
        last_low: 0.0,
        last_high: 0.0,
        best_buy: 0.0,
        best_sell: 0.0,
    }
}

fn assert_diverse(
    records: &[ScanRecord],
    distance: usize,
) -> std::result::Result<(), TestCaseError> {
    for (i, a) in records.iter().enumerate() {
        for b in &records[i + 1..] {
            prop_assert!(
                a.day != b.day || a.trade_time_spot.abs_diff(b.trade_time_spot) >= distance,
                "{:?} and {:?} closer than {}", a, b, distance
            );
        }
    }
    Ok(())
}

// ==================== Pattern Properties ====================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Mirroring twice gives the pattern back
    #[test]
    fn prop_mirror_round_trip(bars in arb_bars(24), first in 0.0..=1.0_f64) {
        let coefficients = Coefficients::linear(first, 12);
        if let Ok(pattern) = NormalizedPattern::build(&bars, 2, &coefficients) {
            prop_assert_eq!(pattern.mirror().mirror(), pattern);
        }
    }

    /// A pattern is fully similar to itself and bounded against any other
    #[test]
    fn prop_similarity_bounds(a in arb_bars(20), b in arb_bars(20), first in 0.0..=1.0_f64) {
        let coefficients = Coefficients::linear(first, 20);
        let (Ok(pa), Ok(pb)) = (
            NormalizedPattern::build(&a, 1, &coefficients),
            NormalizedPattern::build(&b, 1, &coefficients),
        ) else {
            return Ok(());
        };

        prop_assert!((pa.similarity(&pa, &coefficients) - 1.0).abs() < 1e-9);
        let s = pa.similarity(&pb, &coefficients);
        prop_assert!(s.abs() <= 1.0 + 1e-9, "similarity {} out of bounds", s);
        prop_assert!((s - pb.similarity(&pa, &coefficients)).abs() < 1e-12);
    }

    /// Similarity ignores price level and positive scale
    #[test]
    fn prop_shift_scale_invariance(
        bars in arb_bars(15),
        scale in 0.1..10.0_f64,
        shift in -500.0..500.0_f64,
    ) {
        let coefficients = Coefficients::linear(0.5, 15);
        let moved: Vec<Bar> = bars
            .iter()
            .map(|b| Bar::new(b.low * scale + shift, b.high * scale + shift))
            .collect();
        if let (Ok(p), Ok(q)) = (
            NormalizedPattern::build(&bars, 1, &coefficients),
            NormalizedPattern::build(&moved, 1, &coefficients),
        ) {
            prop_assert!((p.similarity(&q, &coefficients) - 1.0).abs() < 1e-6);
            prop_assert!((q.norm() / p.norm() - scale).abs() < 1e-6 * scale);
        }
    }

    /// Linear coefficients run from `first` to 1.0 without decreasing
    #[test]
    fn prop_linear_coefficients(first in 0.0..=1.0_f64, n in 2usize..120) {
        let coefficients = Coefficients::linear(first, n);
        let weights = coefficients.weights();
        prop_assert_eq!(weights.len(), n);
        prop_assert!((weights[0] - first).abs() < 1e-12);
        prop_assert!((weights[n - 1] - 1.0).abs() < 1e-9);
        prop_assert!(weights.windows(2).all(|w| w[1] >= w[0] - 1e-12));
    }
}

// ==================== Windowing Properties ====================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Live ranges never invert and never leave the pattern list
    #[test]
    fn prop_live_range_in_bounds(
        day_len in 0usize..25_000,
        window in 1usize..500,
        scope in 0usize..5_000,
        now in 0.0..=1.0_f64,
    ) {
        let index = DayIndex::new(day_len.saturating_sub(window), day_len);
        let range = index.range(ScanPosition::from_fraction(now), scope, window);
        prop_assert!(range.start <= range.end);
        prop_assert!(range.end <= index.pattern_count);
    }
}

// ==================== Pool Properties ====================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Capacity, diversity and a non-decreasing worst score at capacity
    #[test]
    fn prop_candidate_pool_invariants(
        stream in arb_stream(200),
        capacity in 1usize..12,
        distance in 1usize..20,
    ) {
        let (mut positives, mut negatives) = (Vec::new(), Vec::new());
        {
            let mut pool = CandidatePool::new(&mut positives, &mut negatives, capacity, distance);
            for (day, spot, similarity, polarity) in stream {
                if !pool.admits(similarity) {
                    continue;
                }
                let full_before = pool.len() == capacity;
                let worst_before = pool.worst_similarity();

                pool.add(polarity, record(day, spot, similarity));

                prop_assert!(pool.len() <= capacity);
                if full_before {
                    prop_assert!(pool.worst_similarity() >= worst_before);
                }
            }
        }
        assert_diverse(&positives, distance)?;
        assert_diverse(&negatives, distance)?;
    }

    /// Graduates all clear the threshold and stay diverse
    #[test]
    fn prop_graduate_pool_invariants(
        stream in arb_stream(200),
        threshold in -0.5..0.9_f64,
        distance in 1usize..20,
    ) {
        let (mut positives, mut negatives) = (Vec::new(), Vec::new());
        {
            let mut pool = GraduatePool::new(&mut positives, &mut negatives, distance, threshold);
            for (day, spot, similarity, polarity) in stream {
                if pool.admits(similarity) {
                    pool.add(polarity, record(day, spot, similarity));
                }
            }
        }
        prop_assert!(positives.iter().chain(&negatives).all(|r| r.similarity >= threshold));
        assert_diverse(&positives, distance)?;
        assert_diverse(&negatives, distance)?;
    }
}
