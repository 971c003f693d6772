use crate::funnel::stage::{self, FunnelStage, STAGE_COUNT};
use crate::model::Session;
use serde::Serialize;

/// Per-stage session counts for one cohort, in funnel order.
///
/// `counts[i]` is the number of sessions whose reach is at or beyond the
/// stage with rank `i`, so the array is non-increasing by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    counts: [u64; STAGE_COUNT],
}

impl StageCounts {
    pub const fn zero() -> Self {
        Self {
            counts: [0; STAGE_COUNT],
        }
    }

    /// Number of sessions that reached at least `stage`.
    pub const fn get(self, stage: FunnelStage) -> u64 {
        self.counts[stage.rank()]
    }

    /// Sessions that entered the funnel (reached the first stage).
    pub const fn entered(self) -> u64 {
        self.counts[0]
    }

    pub const fn as_array(&self) -> &[u64; STAGE_COUNT] {
        &self.counts
    }

    #[cfg(test)]
    pub(crate) const fn from_array(counts: [u64; STAGE_COUNT]) -> Self {
        Self { counts }
    }
}

/// Aggregate a session snapshot into cumulative per-stage counts.
///
/// A session reaching stage `r` increments every count from the first stage
/// up to and including `r`; a session with no events contributes nothing.
/// Pure function over an immutable snapshot: recomputed fresh on every
/// analysis run, never updated incrementally.
pub fn aggregate<'a, I>(sessions: I) -> StageCounts
where
    I: IntoIterator<Item = &'a Session>,
{
    let mut counts = [0u64; STAGE_COUNT];
    for session in sessions {
        if let Some(furthest) = stage::reach(session) {
            for count in &mut counts[..=furthest.rank()] {
                *count += 1;
            }
        }
    }
    StageCounts { counts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StageEvent;
    use chrono::{TimeZone, Utc};

    pub(crate) fn session_reaching(id: &str, furthest: FunnelStage) -> Session {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        Session {
            id: id.to_string(),
            device: None,
            source: None,
            events: FunnelStage::ALL[..=furthest.rank()]
                .iter()
                .enumerate()
                .map(|(i, &stage)| StageEvent {
                    stage,
                    timestamp: base + chrono::Duration::seconds(i64::try_from(i).unwrap() * 15),
                })
                .collect(),
        }
    }

    fn empty_session(id: &str) -> Session {
        Session {
            id: id.to_string(),
            device: None,
            source: None,
            events: Vec::new(),
        }
    }

    #[test]
    fn test_aggregate_empty_snapshot() {
        let counts = aggregate(&[]);
        assert_eq!(counts, StageCounts::zero());
    }

    #[test]
    fn test_aggregate_is_cumulative() {
        // One session all the way to Payment: all counts up to rank 6 are 1.
        let sessions = vec![session_reaching("s1", FunnelStage::Payment)];
        let counts = aggregate(&sessions);
        assert_eq!(counts.as_array(), &[1, 1, 1, 1, 1, 1, 1, 0]);
    }

    #[test]
    fn test_aggregate_sessions_without_events_count_nowhere() {
        let sessions = vec![
            empty_session("s1"),
            session_reaching("s2", FunnelStage::HomepageVisit),
        ];
        let counts = aggregate(&sessions);
        assert_eq!(counts.entered(), 1);
        assert_eq!(counts.get(FunnelStage::CategoryPageVisit), 0);
    }

    #[test]
    fn test_aggregate_counts_reach_not_traversal() {
        // Events recorded out of order with gaps still count every stage up
        // to the furthest one.
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let session = Session {
            id: "gappy".to_string(),
            device: None,
            source: None,
            events: vec![
                StageEvent {
                    stage: FunnelStage::CartView,
                    timestamp: base,
                },
                StageEvent {
                    stage: FunnelStage::CategoryPageVisit,
                    timestamp: base + chrono::Duration::seconds(5),
                },
            ],
        };
        let counts = aggregate(std::iter::once(&session));
        assert_eq!(counts.as_array(), &[1, 1, 1, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn test_aggregate_scenario_hundred_sessions() {
        // 100 enter, 40 reach Add to Cart, 10 of those reach Purchase.
        let mut sessions = Vec::new();
        for i in 0..60 {
            sessions.push(session_reaching(&format!("top-{i}"), FunnelStage::ProductPageVisit));
        }
        for i in 0..30 {
            sessions.push(session_reaching(&format!("cart-{i}"), FunnelStage::AddToCart));
        }
        for i in 0..10 {
            sessions.push(session_reaching(&format!("buy-{i}"), FunnelStage::Purchase));
        }
        let counts = aggregate(&sessions);
        assert_eq!(counts.entered(), 100);
        assert_eq!(counts.get(FunnelStage::AddToCart), 40);
        assert_eq!(counts.get(FunnelStage::Purchase), 10);
        // Monotonic non-increase across the whole array.
        for pair in counts.as_array().windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    #[test]
    fn test_aggregate_idempotent() {
        let sessions = vec![
            session_reaching("s1", FunnelStage::Checkout),
            session_reaching("s2", FunnelStage::HomepageVisit),
        ];
        assert_eq!(aggregate(&sessions), aggregate(&sessions));
    }
}

#[cfg(test)]
mod prop_tests {
    use super::tests::session_reaching;
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Counts are non-increasing along the funnel for any mix of reaches.
        #[test]
        fn prop_counts_monotonic_non_increasing(ranks in prop::collection::vec(0usize..8, 0..200)) {
            let sessions: Vec<Session> = ranks
                .iter()
                .enumerate()
                .map(|(i, &r)| {
                    session_reaching(&format!("s{i}"), FunnelStage::from_rank(r).unwrap())
                })
                .collect();
            let counts = aggregate(&sessions);
            for pair in counts.as_array().windows(2) {
                prop_assert!(pair[0] >= pair[1]);
            }
        }

        /// Every session with at least one event is counted at the first stage.
        #[test]
        fn prop_entered_equals_sessions_with_events(ranks in prop::collection::vec(0usize..8, 0..200)) {
            let sessions: Vec<Session> = ranks
                .iter()
                .enumerate()
                .map(|(i, &r)| {
                    session_reaching(&format!("s{i}"), FunnelStage::from_rank(r).unwrap())
                })
                .collect();
            let counts = aggregate(&sessions);
            prop_assert_eq!(counts.entered(), ranks.len() as u64);
        }
    }
}
