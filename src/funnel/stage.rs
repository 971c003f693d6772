use crate::model::Session;
use serde::{Deserialize, Serialize};

/// Number of stages in the conversion funnel.
pub const STAGE_COUNT: usize = 8;

/// One step of the fixed e-commerce conversion funnel.
///
/// The declaration order is the funnel order: each variant logically precedes
/// the next, and `rank` exposes that order as a stable index. Comparisons
/// between stages go through `Ord`, never through incidental collection order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStage {
    HomepageVisit,
    CategoryPageVisit,
    ProductPageVisit,
    AddToCart,
    CartView,
    Checkout,
    Payment,
    Purchase,
}

impl FunnelStage {
    /// All stages in funnel order.
    pub const ALL: [Self; STAGE_COUNT] = [
        Self::HomepageVisit,
        Self::CategoryPageVisit,
        Self::ProductPageVisit,
        Self::AddToCart,
        Self::CartView,
        Self::Checkout,
        Self::Payment,
        Self::Purchase,
    ];

    /// Zero-based position of this stage in the funnel.
    pub const fn rank(self) -> usize {
        self as usize
    }

    /// Stage at the given rank, if in range.
    pub fn from_rank(rank: usize) -> Option<Self> {
        Self::ALL.get(rank).copied()
    }

    /// Human-readable label, as shown in reports.
    pub const fn label(self) -> &'static str {
        match self {
            Self::HomepageVisit => "Homepage Visit",
            Self::CategoryPageVisit => "Category Page Visit",
            Self::ProductPageVisit => "Product Page Visit",
            Self::AddToCart => "Add to Cart",
            Self::CartView => "Cart View",
            Self::Checkout => "Checkout",
            Self::Payment => "Payment",
            Self::Purchase => "Purchase",
        }
    }

    /// Parse a stage name from the event stream.
    ///
    /// Accepts the canonical snake_case names used on the wire.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "homepage_visit" => Some(Self::HomepageVisit),
            "category_page_visit" => Some(Self::CategoryPageVisit),
            "product_page_visit" => Some(Self::ProductPageVisit),
            "add_to_cart" => Some(Self::AddToCart),
            "cart_view" => Some(Self::CartView),
            "checkout" => Some(Self::Checkout),
            "payment" => Some(Self::Payment),
            "purchase" => Some(Self::Purchase),
            _ => None,
        }
    }
}

impl std::fmt::Display for FunnelStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Furthest stage a session reached: the highest-ordered stage with at least
/// one recorded event, or `None` for a session with no events.
///
/// This is the only place the reach policy lives. Instrumentation gaps are
/// tolerated: a session with events for Payment and Category Page but nothing
/// in between still counts as having reached Payment. Counts derived from
/// this measure reach, not strict sequential traversal.
pub fn reach(session: &Session) -> Option<FunnelStage> {
    session.events.iter().map(|e| e.stage).max()
}
