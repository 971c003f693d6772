use crate::funnel::aggregate::StageCounts;
use crate::funnel::stage::FunnelStage;
use serde::Serialize;

/// Drop-off rate above which a transition is flagged High severity.
const HIGH_DROP_THRESHOLD: f64 = 0.30;
/// Drop-off rate above which a transition is flagged Medium severity.
const MEDIUM_DROP_THRESHOLD: f64 = 0.15;

/// Operational severity of a funnel transition's drop-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    fn from_drop_rate(rate: f64) -> Self {
        if rate > HIGH_DROP_THRESHOLD {
            Self::High
        } else if rate > MEDIUM_DROP_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Per-stage row of a funnel report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRow {
    pub stage: FunnelStage,
    pub label: &'static str,
    /// Sessions that reached at least this stage.
    pub sessions: u64,
    /// Fraction of funnel entrants that reached this stage; 0.0 when nothing
    /// entered the funnel.
    pub conversion_rate: f64,
}

/// One adjacent stage transition with its session loss.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub from: FunnelStage,
    pub to: FunnelStage,
    pub sessions_lost: u64,
    /// Fractional loss between the two stages; 0.0 when the upstream stage
    /// has no sessions to lose.
    pub drop_rate: f64,
    pub severity: Severity,
}

/// Complete funnel metrics for one cohort.
///
/// `stages` and `transitions` are in funnel order; `bottlenecks` holds the
/// same transitions ranked by descending drop-off, earlier stage first on
/// ties. Empty cohorts produce all-zero rows and an empty ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelReport {
    pub stages: Vec<StageRow>,
    pub transitions: Vec<Transition>,
    pub bottlenecks: Vec<Transition>,
}

/// Structural failure of the funnel computation.
///
/// Aggregation guarantees non-increasing counts, so a violation here means
/// corrupted counts reached the calculator. It is surfaced instead of
/// clamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunnelError {
    MonotonicityViolation {
        stage: FunnelStage,
        count: u64,
        upstream_count: u64,
    },
}

impl std::fmt::Display for FunnelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MonotonicityViolation {
                stage,
                count,
                upstream_count,
            } => write!(
                f,
                "Stage count invariant violated: {stage} has {count} sessions but its upstream stage has {upstream_count}"
            ),
        }
    }
}

impl std::error::Error for FunnelError {}

/// Derive conversion rates, drop-off rates, and the bottleneck ranking from
/// aggregated stage counts.
pub fn compute_metrics(counts: StageCounts) -> Result<FunnelReport, FunnelError> {
    let stage_counts = counts.as_array();

    // Counts must be non-increasing along the funnel before any rate math.
    for (i, pair) in stage_counts.windows(2).enumerate() {
        if pair[1] > pair[0] {
            return Err(FunnelError::MonotonicityViolation {
                stage: FunnelStage::ALL[i + 1],
                count: pair[1],
                upstream_count: pair[0],
            });
        }
    }

    let entered = counts.entered();
    let stages = FunnelStage::ALL
        .iter()
        .map(|&stage| StageRow {
            stage,
            label: stage.label(),
            sessions: counts.get(stage),
            conversion_rate: ratio(counts.get(stage), entered),
        })
        .collect();

    let transitions: Vec<Transition> = stage_counts
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let drop_rate = if pair[0] == 0 {
                0.0
            } else {
                (1.0 - ratio(pair[1], pair[0])).clamp(0.0, 1.0)
            };
            Transition {
                from: FunnelStage::ALL[i],
                to: FunnelStage::ALL[i + 1],
                sessions_lost: pair[0] - pair[1],
                drop_rate,
                severity: Severity::from_drop_rate(drop_rate),
            }
        })
        .collect();

    let bottlenecks = if entered == 0 {
        Vec::new()
    } else {
        let mut ranked = transitions.clone();
        ranked.sort_by(|a, b| {
            b.drop_rate
                .total_cmp(&a.drop_rate)
                .then_with(|| a.from.rank().cmp(&b.from.rank()))
        });
        ranked
    };

    Ok(FunnelReport {
        stages,
        transitions,
        bottlenecks,
    })
}

/// `numerator / denominator` clamped to [0.0, 1.0]; 0.0 on a zero
/// denominator (an empty basis is "nothing to compare against", not an
/// error).
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = numerator as f64 / denominator as f64;
    rate.clamp(0.0, 1.0)
}
