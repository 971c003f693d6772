//! Normalized representation of a customer session and its stage events.
//!
//! Raw records arrive from the event producer with free-form category
//! strings; `normalize` maps them onto the closed `DeviceCategory` and
//! `TrafficSource` sets. A session with an unrecognized value on an axis
//! stays in the dataset (global counts are unaffected) but carries `None`
//! on that axis and is skipped by segment breakdowns over it.

use crate::funnel::stage::FunnelStage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Device category a session originated from. Closed set; anything else is
/// treated as unrecognized.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DeviceCategory {
    Desktop,
    Mobile,
    Tablet,
}

impl DeviceCategory {
    pub const ALL: [Self; 3] = [Self::Desktop, Self::Mobile, Self::Tablet];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "desktop" => Some(Self::Desktop),
            "mobile" => Some(Self::Mobile),
            "tablet" => Some(Self::Tablet),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
        }
    }
}

impl std::fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acquisition channel a session arrived through. Closed set; older feeds
/// use longer aliases (`organic_search`, `social_media`), accepted here so a
/// producer upgrade is not a breaking change.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TrafficSource {
    Organic,
    Paid,
    Social,
    Direct,
    Referral,
    Email,
}

impl TrafficSource {
    pub const ALL: [Self; 6] = [
        Self::Organic,
        Self::Paid,
        Self::Social,
        Self::Direct,
        Self::Referral,
        Self::Email,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "organic" | "organic_search" => Some(Self::Organic),
            "paid" | "paid_search" => Some(Self::Paid),
            "social" | "social_media" => Some(Self::Social),
            "direct" => Some(Self::Direct),
            "referral" => Some(Self::Referral),
            "email" => Some(Self::Email),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Organic => "organic",
            Self::Paid => "paid",
            Self::Social => "social",
            Self::Direct => "direct",
            Self::Referral => "referral",
            Self::Email => "email",
        }
    }
}

impl std::fmt::Display for TrafficSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single timestamped funnel-stage event within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEvent {
    pub stage: FunnelStage,
    pub timestamp: DateTime<Utc>,
}

/// A validated customer visit. Immutable once produced by `normalize` (or
/// the demo generator); the engine only ever reads it.
///
/// `device`/`source` are `None` when the raw value was not in the recognized
/// set for that axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: String,
    pub device: Option<DeviceCategory>,
    pub source: Option<TrafficSource>,
    pub events: Vec<StageEvent>,
}

/// Raw session record as submitted by the event producer.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSession {
    pub id: String,
    pub device: String,
    pub traffic_source: String,
    #[serde(default)]
    pub events: Vec<RawStageEvent>,
}

/// Raw stage event naming one of the eight funnel stages.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStageEvent {
    pub stage: String,
    pub timestamp: DateTime<Utc>,
}

/// Maximum accepted length for a session identifier.
const MAX_ID_LEN: usize = 256;

/// Validate and normalize a batch of raw session records.
///
/// Best-effort, never fatal:
/// - a session with an empty, oversized, or duplicate id is skipped;
/// - an event naming an unknown stage is dropped from its session;
/// - an unrecognized device or traffic-source value becomes `None` on that
///   axis only.
/// Each recovered issue is logged as a data-quality warning.
pub fn normalize(raw_sessions: Vec<RawSession>) -> Vec<Session> {
    let mut seen_ids: HashSet<String> = HashSet::with_capacity(raw_sessions.len());
    let mut sessions = Vec::with_capacity(raw_sessions.len());

    for raw in raw_sessions {
        if raw.id.is_empty() || raw.id.len() > MAX_ID_LEN {
            tracing::warn!("Skipping session with invalid id");
            continue;
        }
        if !seen_ids.insert(raw.id.clone()) {
            tracing::warn!(session_id = %raw.id, "Skipping duplicate session id");
            continue;
        }

        let device = DeviceCategory::parse(&raw.device);
        if device.is_none() {
            tracing::warn!(
                session_id = %raw.id,
                device = %raw.device,
                "Unrecognized device category; session excluded from device breakdowns"
            );
        }
        let source = TrafficSource::parse(&raw.traffic_source);
        if source.is_none() {
            tracing::warn!(
                session_id = %raw.id,
                traffic_source = %raw.traffic_source,
                "Unrecognized traffic source; session excluded from source breakdowns"
            );
        }

        let mut events = Vec::with_capacity(raw.events.len());
        for event in &raw.events {
            match FunnelStage::parse(&event.stage) {
                Some(stage) => events.push(StageEvent {
                    stage,
                    timestamp: event.timestamp,
                }),
                None => {
                    tracing::warn!(
                        session_id = %raw.id,
                        stage = %event.stage,
                        "Dropping event with unknown funnel stage"
                    );
                }
            }
        }

        sessions.push(Session {
            id: raw.id,
            device,
            source,
            events,
        });
    }

    sessions
}

/// Restrict a session snapshot to events within `[start, end)`.
///
/// Sessions left with no in-window events drop out of the filtered snapshot,
/// so filtered global and segment counts are computed over the same set.
pub fn filter_window(
    sessions: &[Session],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<Session> {
    sessions
        .iter()
        .filter_map(|session| {
            let events: Vec<StageEvent> = session
                .events
                .iter()
                .copied()
                .filter(|e| e.timestamp >= start && e.timestamp < end)
                .collect();
            if events.is_empty() {
                None
            } else {
                Some(Session {
                    id: session.id.clone(),
                    device: session.device,
                    source: session.source,
                    events,
                })
            }
        })
        .collect()
}
