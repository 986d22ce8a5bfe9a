//! Fit-to-data windows over a set of activity records.

use serde::{Deserialize, Serialize};

use crate::model::{ActivityRecord, TimeRange};

const PAD_RATIO: f64 = 0.08;
const SINGLE_INSTANT_PAD_MS: f64 = 3_600_000.0;
const DENSE_MIN_SAMPLES: usize = 5;

/// Which window computation fit-to-data uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FitMode {
    #[default]
    Padded,
    Dense,
}

impl FitMode {
    pub fn range(self, records: &[ActivityRecord]) -> Option<TimeRange> {
        match self {
            FitMode::Padded => padded_range(records),
            FitMode::Dense => dense_range(records),
        }
    }
}

/// Min/max over every known departure and arrival, padded by 8% of the span.
pub fn padded_range(records: &[ActivityRecord]) -> Option<TimeRange> {
    let mut bounds: Option<(i64, i64)> = None;
    for ms in records
        .iter()
        .flat_map(|r| [r.departure_ms(), r.arrival_ms()])
        .flatten()
    {
        bounds = Some(match bounds {
            None => (ms, ms),
            Some((lo, hi)) => (lo.min(ms), hi.max(ms)),
        });
    }

    let (min, max) = bounds?;
    let (min, max) = (min as f64, max as f64);
    if min == max {
        return Some(TimeRange::new(
            min - SINGLE_INSTANT_PAD_MS,
            max + SINGLE_INSTANT_PAD_MS,
        ));
    }
    let pad = ((max - min) * PAD_RATIO).floor();
    Some(TimeRange::new(min - pad, max + pad))
}

/// Window around the 10th..90th percentile of leg midpoints, centred on that slice.
///
/// Falls back to [`padded_range`] with fewer than five well-formed legs.
pub fn dense_range(records: &[ActivityRecord]) -> Option<TimeRange> {
    let mut mids: Vec<f64> = records
        .iter()
        .filter_map(|r| match (r.departure_ms(), r.arrival_ms()) {
            (Some(dep), Some(arr)) if dep > 0 && arr > 0 && arr > dep => {
                Some((dep as f64 + arr as f64) / 2.0)
            }
            _ => None,
        })
        .collect();

    if mids.len() < DENSE_MIN_SAMPLES {
        return padded_range(records);
    }

    mids.sort_by(|a, b| a.total_cmp(b));
    let n = mids.len() as f64;
    let lo = (n * 0.1).floor() as usize;
    let hi = ((n * 0.9).ceil() as usize).min(mids.len());
    let slice = &mids[lo..hi];

    let min = slice.first().copied()?;
    let max = slice.last().copied()?;
    let span = max - min;
    let pad = (span * PAD_RATIO).floor();
    let center = (min + max) / 2.0;
    let half = (span + 2.0 * pad) / 2.0;
    Some(TimeRange::new(center - half, center + half))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;

    fn at(ms: i64) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(ms)
    }

    fn leg(dep: i64, arr: i64) -> ActivityRecord {
        ActivityRecord {
            departure_time: at(dep),
            arrival_time: at(arr),
            ..Default::default()
        }
    }

    #[test]
    fn empty_or_timeless_input_has_no_range() {
        assert_eq!(padded_range(&[]), None);
        assert_eq!(padded_range(&[ActivityRecord::default()]), None);
        assert_eq!(dense_range(&[ActivityRecord::default()]), None);
    }

    #[test]
    fn single_instant_gets_two_hour_window() {
        let rec = ActivityRecord {
            departure_time: at(10_000_000),
            ..Default::default()
        };
        let r = padded_range(&[rec]).unwrap();
        assert_eq!(r.end - r.start, 7_200_000.0);
        assert_eq!(r.start, 10_000_000.0 - 3_600_000.0);
    }

    #[test]
    fn padding_is_floored_eight_percent() {
        let r = padded_range(&[leg(1_000, 2_001)]).unwrap();
        // 1001 * 0.08 = 80.08
        assert_eq!(r, TimeRange::new(920.0, 2_081.0));
    }

    #[test]
    fn dense_falls_back_with_few_legs() {
        let legs = vec![leg(1_000, 2_000), leg(5_000, 9_000)];
        assert_eq!(dense_range(&legs), padded_range(&legs));
    }

    #[test]
    fn dense_ignores_outliers() {
        let hour = 3_600_000;
        let mut legs: Vec<_> = (0..9)
            .map(|i| leg(1_000_000_000 + i * hour, 1_000_000_000 + i * hour + hour))
            .collect();
        legs.push(leg(9_000_000_000, 9_000_000_000 + hour));
        let dense = dense_range(&legs).unwrap();
        let padded = padded_range(&legs).unwrap();
        assert!(dense.end < 9_000_000_000.0);
        assert!(padded.end > 9_000_000_000.0);
    }

    proptest! {
        #[test]
        fn padded_range_bounds_every_timestamp(
            stamps in prop::collection::vec((1i64..4_000_000_000_000, prop::option::of(0i64..100_000_000)), 1..40)
        ) {
            let records: Vec<_> = stamps
                .iter()
                .map(|(dep, dur)| ActivityRecord {
                    departure_time: at(*dep),
                    arrival_time: dur.map(|d| dep + d).and_then(at),
                    ..Default::default()
                })
                .collect();
            let range = padded_range(&records).unwrap();
            for r in &records {
                for ms in [r.departure_ms(), r.arrival_ms()].into_iter().flatten() {
                    prop_assert!(range.start <= ms as f64 && ms as f64 <= range.end);
                }
            }
        }

        #[test]
        fn dense_range_is_centred_on_trimmed_slice(
            legs in prop::collection::vec((1i64..4_000_000_000_000, 1i64..100_000_000), 5..60)
        ) {
            let records: Vec<_> = legs.iter().map(|(dep, dur)| leg(*dep, dep + dur)).collect();
            let range = dense_range(&records).unwrap();

            let mut mids: Vec<f64> = legs
                .iter()
                .map(|(dep, dur)| (*dep as f64 + (dep + dur) as f64) / 2.0)
                .collect();
            mids.sort_by(|a, b| a.total_cmp(b));
            let n = mids.len() as f64;
            let slice = &mids[(n * 0.1).floor() as usize..(n * 0.9).ceil() as usize];
            let (min, max) = (slice[0], slice[slice.len() - 1]);
            let span = max - min;
            let pad = (span * 0.08).floor();

            prop_assert!(((range.end - range.start) - (span + 2.0 * pad)).abs() < 0.01);
            prop_assert!((range.center() - (min + max) / 2.0).abs() < 0.01);
        }
    }
}
