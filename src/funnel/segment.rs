use crate::funnel::aggregate::aggregate;
use crate::funnel::report::{compute_metrics, FunnelError, FunnelReport};
use crate::funnel::stage::{self, FunnelStage};
use crate::model::{DeviceCategory, Session, TrafficSource};
use serde::Serialize;
use std::collections::BTreeMap;

/// Partition a session snapshot by `key` and compute an independent funnel
/// report per partition.
///
/// Sessions for which `key` returns `None` (unrecognized on this axis) are
/// left out of the breakdown entirely. Every recognized value observed in
/// the input appears as a key, even when its partition converts nothing.
/// Partitions never see each other's sessions, so per-segment reports can
/// be compared without cross-contamination. Keys are `Ord` and the result a
/// `BTreeMap`, which keeps breakdown serialization order stable across runs.
pub fn segment_report<'a, K, F, I>(
    sessions: I,
    key: F,
) -> Result<BTreeMap<K, FunnelReport>, FunnelError>
where
    K: Ord,
    F: Fn(&Session) -> Option<K>,
    I: IntoIterator<Item = &'a Session>,
{
    let mut partitions: BTreeMap<K, Vec<&Session>> = BTreeMap::new();
    for session in sessions {
        if let Some(value) = key(session) {
            partitions.entry(value).or_default().push(session);
        }
    }

    let mut reports = BTreeMap::new();
    for (value, partition) in partitions {
        let report = compute_metrics(aggregate(partition.iter().copied()))?;
        reports.insert(value, report);
    }
    Ok(reports)
}

/// Funnel breakdown by device category.
pub fn report_by_device(
    sessions: &[Session],
) -> Result<BTreeMap<DeviceCategory, FunnelReport>, FunnelError> {
    segment_report(sessions, |s| s.device)
}

/// Funnel breakdown by traffic source.
pub fn report_by_source(
    sessions: &[Session],
) -> Result<BTreeMap<TrafficSource, FunnelReport>, FunnelError> {
    segment_report(sessions, |s| s.source)
}

/// Compact per-segment performance row: how many sessions a segment carried
/// and how many of them completed a purchase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummary {
    pub segment: String,
    /// All sessions in the segment, including ones that never entered the
    /// funnel.
    pub sessions: u64,
    pub purchases: u64,
    pub conversion_rate: f64,
}

/// Per-segment purchase conversion summary for one axis, best-converting
/// segments first (segment name breaks ties).
fn summarize<K, F>(sessions: &[Session], key: F) -> Vec<SegmentSummary>
where
    K: Ord + std::fmt::Display,
    F: Fn(&Session) -> Option<K>,
{
    let mut totals: BTreeMap<K, (u64, u64)> = BTreeMap::new();
    for session in sessions {
        if let Some(value) = key(session) {
            let entry = totals.entry(value).or_insert((0, 0));
            entry.0 += 1;
            if stage::reach(session) == Some(FunnelStage::Purchase) {
                entry.1 += 1;
            }
        }
    }

    let mut rows: Vec<SegmentSummary> = totals
        .into_iter()
        .map(|(value, (sessions, purchases))| SegmentSummary {
            segment: value.to_string(),
            sessions,
            purchases,
            conversion_rate: purchase_rate(purchases, sessions),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.conversion_rate
            .total_cmp(&a.conversion_rate)
            .then_with(|| a.segment.cmp(&b.segment))
    });
    rows
}

fn purchase_rate(purchases: u64, sessions: u64) -> f64 {
    if sessions == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = purchases as f64 / sessions as f64;
    rate
}

/// Device performance summary.
pub fn summary_by_device(sessions: &[Session]) -> Vec<SegmentSummary> {
    summarize(sessions, |s| s.device)
}

/// Traffic-source performance summary.
pub fn summary_by_source(sessions: &[Session]) -> Vec<SegmentSummary> {
    summarize(sessions, |s| s.source)
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use crate::model::StageEvent;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn arbitrary_session(i: usize, device: usize, rank: usize) -> Session {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        Session {
            id: format!("s{i}"),
            device: Some(DeviceCategory::ALL[device % DeviceCategory::ALL.len()]),
            source: Some(TrafficSource::ALL[i % TrafficSource::ALL.len()]),
            events: vec![StageEvent {
                stage: FunnelStage::from_rank(rank).unwrap(),
                timestamp: base,
            }],
        }
    }

    proptest! {
        /// For a snapshot where every session is recognized on an axis, the
        /// per-segment entry counts partition the global entry count.
        #[test]
        fn prop_segments_partition_global(
            shape in prop::collection::vec((0usize..3, 0usize..8), 0..150)
        ) {
            let sessions: Vec<Session> = shape
                .into_iter()
                .enumerate()
                .map(|(i, (d, r))| arbitrary_session(i, d, r))
                .collect();
            let global = aggregate(&sessions).entered();
            let by_device: u64 = report_by_device(&sessions)
                .unwrap()
                .values()
                .map(|r| r.stages[0].sessions)
                .sum();
            let by_source: u64 = report_by_source(&sessions)
                .unwrap()
                .values()
                .map(|r| r.stages[0].sessions)
                .sum();
            prop_assert_eq!(by_device, global);
            prop_assert_eq!(by_source, global);
        }
    }
}
