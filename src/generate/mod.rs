//! Synthetic clickstream producer for demo deployments.
//!
//! Emits sessions with the journey shape of real e-commerce traffic: a small
//! share of complete funnels that thin out at checkout and payment, and a
//! long tail of short browsing visits biased toward the top of the funnel.
//! Fully deterministic under a fixed seed.

use crate::funnel::stage::FunnelStage;
use crate::model::{DeviceCategory, Session, StageEvent, TrafficSource};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Share of sessions that attempt the full funnel.
const COMPLETE_FUNNEL_RATE: f64 = 0.15;
/// Of those, the share that continues from the cart to checkout.
const CHECKOUT_RATE: f64 = 0.75;
/// Of those, the share that completes the purchase at payment.
const PURCHASE_RATE: f64 = 0.70;

/// Event-count weights for partial sessions (1..=7 events).
const PARTIAL_LENGTH_WEIGHTS: [u32; 7] = [30, 25, 20, 10, 8, 5, 2];
/// Stage weights for partial-session events, biased toward early stages.
const PARTIAL_STAGE_WEIGHTS: [u32; 8] = [30, 24, 18, 10, 8, 5, 3, 2];

/// How far back in time generated sessions are spread.
const LOOKBACK_SECS: i64 = 30 * 24 * 60 * 60;

/// Seeded producer of synthetic sessions.
pub struct SessionGenerator {
    rng: StdRng,
}

impl SessionGenerator {
    /// With `seed` set the output is reproducible; otherwise the generator
    /// is seeded from the OS.
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64),
        }
    }

    /// Generate a batch of independent sessions ending at or before `now`.
    pub fn batch(&mut self, count: usize, now: DateTime<Utc>) -> Vec<Session> {
        (0..count).map(|_| self.session(now)).collect()
    }

    fn session(&mut self, now: DateTime<Utc>) -> Session {
        // Start at least an hour back so the whole journey fits before `now`.
        let start = now - Duration::seconds(self.rng.random_range(3600..LOOKBACK_SECS));
        let events = if self.rng.random_bool(COMPLETE_FUNNEL_RATE) {
            self.full_funnel_events(start)
        } else {
            self.partial_events(start)
        };

        Session {
            id: uuid::Uuid::new_v4().to_string(),
            device: Some(self.pick(&DeviceCategory::ALL)),
            source: Some(self.pick(&TrafficSource::ALL)),
            events,
        }
    }

    /// A session that walks the funnel in order, with attrition at checkout
    /// and payment.
    fn full_funnel_events(&mut self, start: DateTime<Utc>) -> Vec<StageEvent> {
        let mut events = Vec::with_capacity(8);
        let mut at = start;
        for &stage in &FunnelStage::ALL[..=FunnelStage::CartView.rank()] {
            events.push(StageEvent {
                stage,
                timestamp: at,
            });
            at += Duration::seconds(self.rng.random_range(5..=30));
        }

        if self.rng.random_bool(CHECKOUT_RATE) {
            for &stage in &[FunnelStage::Checkout, FunnelStage::Payment] {
                events.push(StageEvent {
                    stage,
                    timestamp: at,
                });
                at += Duration::seconds(self.rng.random_range(5..=30));
            }
            if self.rng.random_bool(PURCHASE_RATE) {
                events.push(StageEvent {
                    stage: FunnelStage::Purchase,
                    timestamp: at,
                });
            }
        }
        events
    }

    /// A short browsing visit: 1-7 events over stages biased toward the top
    /// of the funnel, in no guaranteed order.
    fn partial_events(&mut self, start: DateTime<Utc>) -> Vec<StageEvent> {
        let count = 1 + self.weighted_index(&PARTIAL_LENGTH_WEIGHTS);
        let mut at = start;
        (0..count)
            .map(|_| {
                let rank = self.weighted_index(&PARTIAL_STAGE_WEIGHTS);
                let event = StageEvent {
                    stage: FunnelStage::ALL[rank],
                    timestamp: at,
                };
                at += Duration::seconds(self.rng.random_range(1..=120));
                event
            })
            .collect()
    }

    fn pick<T: Copy>(&mut self, choices: &[T]) -> T {
        choices[self.rng.random_range(0..choices.len())]
    }

    /// Index into `weights` with probability proportional to each weight.
    fn weighted_index(&mut self, weights: &[u32]) -> usize {
        let total: u32 = weights.iter().sum();
        let mut roll = self.rng.random_range(0..total);
        for (i, &weight) in weights.iter().enumerate() {
            if roll < weight {
                return i;
            }
            roll -= weight;
        }
        weights.len() - 1
    }
}
