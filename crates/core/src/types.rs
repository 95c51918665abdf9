//! Shared data model for the arbitrage core.
//!
//! Every cross-component value is a tagged record with explicit optionals,
//! never a loosely-typed map, so a missing field is a compile error rather
//! than a silent `None` read at an unrelated call site.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Opaque base-asset identifier, e.g. `"BTC"`.
///
/// Venue-specific forms are obtained from a [`crate::traits::VenueAdapter`],
/// never hard-coded here — the core only ever reasons about the base symbol.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Which of the two venues a leg belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    A,
    B,
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("venue_a"),
            Self::B => f.write_str("venue_b"),
        }
    }
}

/// Position side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Side selection rule shared by open and close: a venue whose
    /// normalised funding rate is positive is SHORT (collects funding from
    /// longs); negative is LONG. Applied independently per venue.
    #[must_use]
    pub fn from_funding_sign(funding: Decimal) -> Self {
        if funding > Decimal::ZERO {
            Self::Short
        } else {
            Self::Long
        }
    }

    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => f.write_str("LONG"),
            Self::Short => f.write_str("SHORT"),
        }
    }
}

/// Order type understood by a venue adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
}

/// A single order-book price level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

/// One side of an order book. Bids are expected sorted descending, asks
/// ascending, but consumers re-sort defensively (see `funding-arb-slippage`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

/// Snapshot of both venues' price/funding state for one symbol, plus
/// slippage enrichment computed by the scheduler before evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: Symbol,
    pub price_a: Decimal,
    pub price_b: Decimal,
    /// Venue A's native-cadence funding rate.
    pub funding_a: Decimal,
    /// Venue B's native-cadence (1h) funding rate, pre-normalisation.
    pub funding_b_raw: Decimal,
    /// `funding_b_raw * normalization_factor` — the only form ever compared
    /// against `funding_a`.
    pub funding_b_norm: Decimal,
    pub valid: bool,
    pub orderbook_a: Option<OrderBook>,
    pub orderbook_b: Option<OrderBook>,
    /// Enrichment written by the scheduler after running the slippage
    /// analyzer; absent until the first slippage pass for this symbol.
    pub total_slippage_pct: Option<Decimal>,
    pub long_slippage_pct: Option<Decimal>,
    pub short_slippage_pct: Option<Decimal>,
    pub long_venue: Option<Venue>,
    pub short_venue: Option<Venue>,
}

impl MarketSnapshot {
    #[must_use]
    pub fn price_diff_pct(&self) -> Decimal {
        (self.price_a - self.price_b) / self.price_b * Decimal::from(100)
    }

    #[must_use]
    pub fn funding_diff(&self) -> Decimal {
        self.funding_a - self.funding_b_norm
    }
}

/// A queried position on one venue. Never cached as source of truth across
/// cycles — callers re-query every cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub venue: Venue,
    pub symbol: Symbol,
    pub side: Side,
    pub size: Decimal,
    pub entry_price: Option<Decimal>,
}

/// Positions on both venues for a symbol, keyed by venue for close decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionPair {
    pub venue_a: Position,
    pub venue_b: Position,
}

/// Map of venue-symbol -> position, as returned by a venue adapter's
/// `positions()` call.
pub type PositionMap = HashMap<String, Position>;

/// An intent to open a paired position, emitted by the evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenCandidate {
    pub symbol: Symbol,
    pub funding_diff: Decimal,
    pub funding_a: Decimal,
    pub funding_b_norm: Decimal,
    pub price_diff_pct: Decimal,
    pub size: Decimal,
    pub reason: String,
}

/// An intent to close an existing paired position, emitted by the evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseCandidate {
    pub symbol: Symbol,
    pub position_pair: PositionPair,
    pub reason: String,
}

/// At most one of these is ever emitted per symbol per cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Candidate {
    Open(OpenCandidate),
    Close(CloseCandidate),
}

/// The sign of a measured quantity at the moment a position was opened,
/// persisted durably so the evaluator can detect reversal at close time.
///
/// `price_sign` is `None` for a record that predates price-sign tracking
/// (or was otherwise written with only the funding sign known); the
/// evaluator lazily fills it in on the first close evaluation that
/// observes one, but never overwrites a sign that is already recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRecord {
    pub funding_sign: i8,
    #[serde(default)]
    pub price_sign: Option<i8>,
}

impl SignRecord {
    /// Signs are always +1 or -1, never 0.
    #[must_use]
    pub fn new(funding_sign: i8, price_sign: i8) -> Self {
        debug_assert!(funding_sign == 1 || funding_sign == -1);
        debug_assert!(price_sign == 1 || price_sign == -1);
        Self {
            funding_sign,
            price_sign: Some(price_sign),
        }
    }

    /// A record with only the funding sign known; `price_sign` is captured
    /// later, the first time the evaluator observes one.
    #[must_use]
    pub fn funding_only(funding_sign: i8) -> Self {
        debug_assert!(funding_sign == 1 || funding_sign == -1);
        Self {
            funding_sign,
            price_sign: None,
        }
    }
}

/// Sign helper used throughout evaluation: returns `1` for values `> 0`,
/// `-1` otherwise — a signed zero never occurs in practice, and ties go
/// negative rather than panicking or returning an `Option`.
#[must_use]
pub fn decimal_sign(value: Decimal) -> i8 {
    if value > Decimal::ZERO {
        1
    } else {
        -1
    }
}

/// The action a [`crate::traits::Notifier`] is told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderAction {
    Open,
    Close,
}

/// Outcome of submitting an order to venue B, whose response shape is
/// polymorphic. Always reconciled against the pre/post position diff before
/// being trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderResult {
    Filled { id: String, price: Option<Decimal> },
    Accepted { id: String },
    Rejected { reason: String },
    Unknown { raw: String },
}

impl OrderResult {
    /// Best-effort, non-authoritative read of the response. The pre/post
    /// position diff is what actually decides execution outcome.
    #[must_use]
    pub fn looks_filled(&self) -> bool {
        match self {
            Self::Filled { .. } => true,
            Self::Accepted { .. } | Self::Rejected { .. } => false,
            Self::Unknown { raw } => raw.contains("filled"),
        }
    }

    #[must_use]
    pub fn order_id(&self) -> Option<&str> {
        match self {
            Self::Filled { id, .. } | Self::Accepted { id } => Some(id),
            Self::Rejected { .. } | Self::Unknown { .. } => None,
        }
    }
}

/// A timestamped record of a submitted order, for logging/notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub venue: Venue,
    pub symbol: Symbol,
    pub side: Side,
    pub size: Decimal,
    pub price: Option<Decimal>,
    pub order_type: OrderType,
    pub placed_at: DateTime<Utc>,
}
