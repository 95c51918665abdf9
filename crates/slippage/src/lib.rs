//! Slippage Analyzer: walks a venue orderbook to estimate execution
//! slippage for a notional USD size.
//!
//! This is a guard, not a price predictor — on any structural defect it
//! returns a conservative default rather than propagating an error, so a
//! malformed book blocks a trade instead of crashing the cycle.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::Value;

use funding_arb_core::PriceLevel;

/// Structural default returned when the input cannot be parsed into usable
/// levels at all (missing side, empty book, unknown level shape).
pub const DEFAULT_SLIPPAGE_PCT: Decimal = dec!(0.10);

const MIN_SLIPPAGE_PCT: Decimal = dec!(0.01);
const MAX_SLIPPAGE_PCT: Decimal = dec!(0.5);
const MAX_LEVELS: usize = 10;
const PARTIAL_FILL_THRESHOLD: Decimal = dec!(0.8);
const INSUFFICIENT_FILL_PENALTY_CAP: Decimal = dec!(0.2);

/// Which side of the book a level walk should consume, matching the side
/// of the *trade* being simulated (buying walks asks, selling walks bids).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkSide {
    Buy,
    Sell,
}

/// Accepts `{px,sz}`, `{price,size}`, or `[p,s]` level shapes, matching the
/// heterogeneous payloads venues actually send.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLevel {
    PriceSize { price: Decimal, size: Decimal },
    PxSz { px: Decimal, sz: Decimal },
    Tuple(Decimal, Decimal),
}

impl From<RawLevel> for PriceLevel {
    fn from(raw: RawLevel) -> Self {
        match raw {
            RawLevel::PriceSize { price, size } => Self { price, size },
            RawLevel::PxSz { px, sz } => Self { price: px, size: sz },
            RawLevel::Tuple(p, s) => Self { price: p, size: s },
        }
    }
}

/// Parse a raw JSON array of levels into [`PriceLevel`]s, rejecting the
/// whole side if any entry has an unrecognised shape.
#[must_use]
pub fn parse_levels(raw: &Value) -> Option<Vec<PriceLevel>> {
    let arr = raw.as_array()?;
    if arr.is_empty() {
        return None;
    }
    arr.iter()
        .map(|v| serde_json::from_value::<RawLevel>(v.clone()).ok().map(PriceLevel::from))
        .collect()
}

/// Estimate the percentage slippage of filling `notional_usd` against one
/// side of a book, relative to `mid_price`.
///
/// Levels are re-sorted defensively (descending for [`WalkSide::Sell`],
/// ascending for [`WalkSide::Buy`]) regardless of input order, then walked
/// up to 10 levels.
#[must_use]
pub fn estimate_slippage(levels: &[PriceLevel], side: WalkSide, notional_usd: Decimal, mid_price: Decimal) -> Decimal {
    if levels.is_empty() || notional_usd <= Decimal::ZERO || mid_price <= Decimal::ZERO {
        tracing::debug!("slippage analyzer: structural defect, returning default");
        return DEFAULT_SLIPPAGE_PCT;
    }

    let mut sorted: Vec<PriceLevel> = levels.to_vec();
    match side {
        WalkSide::Buy => sorted.sort_by(|a, b| a.price.cmp(&b.price)),
        WalkSide::Sell => sorted.sort_by(|a, b| b.price.cmp(&a.price)),
    }

    let mut filled_usd = Decimal::ZERO;
    let mut weighted_px = Decimal::ZERO;
    let mut last_level_price = Decimal::ZERO;

    for level in sorted.iter().take(MAX_LEVELS) {
        if filled_usd >= notional_usd {
            break;
        }
        let level_notional = level.price * level.size;
        let remaining = notional_usd - filled_usd;

        if level_notional >= remaining {
            let size_consumed = remaining / level.price;
            weighted_px += level.price * size_consumed;
            filled_usd += remaining;
            last_level_price = level.price;
            break;
        }

        weighted_px += level.price * level.size;
        filled_usd += level_notional;
        last_level_price = level.price;
    }

    if last_level_price == Decimal::ZERO {
        return DEFAULT_SLIPPAGE_PCT;
    }

    let fill_ratio = filled_usd / notional_usd;
    if fill_ratio < PARTIAL_FILL_THRESHOLD {
        let penalty = (Decimal::ONE - fill_ratio).min(INSUFFICIENT_FILL_PENALTY_CAP);
        tracing::debug!(%fill_ratio, "slippage analyzer: insufficient depth, applying penalty");
        return clamp(penalty);
    }

    let size_filled = filled_usd / last_level_price;
    if size_filled <= Decimal::ZERO {
        return DEFAULT_SLIPPAGE_PCT;
    }
    let avg_price = weighted_px / size_filled;
    let slippage_pct = ((avg_price - mid_price) / mid_price).abs() * Decimal::from(100);
    clamp(slippage_pct)
}

fn clamp(pct: Decimal) -> Decimal {
    pct.max(MIN_SLIPPAGE_PCT).min(MAX_SLIPPAGE_PCT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn book(levels: &[(Decimal, Decimal)]) -> Vec<PriceLevel> {
        levels.iter().map(|(price, size)| PriceLevel { price: *price, size: *size }).collect()
    }

    #[test]
    fn full_fill_single_level_has_zero_effective_slippage_clamped_to_min() {
        let asks = book(&[(dec!(100), dec!(10))]);
        let pct = estimate_slippage(&asks, WalkSide::Buy, dec!(500), dec!(100));
        assert_eq!(pct, MIN_SLIPPAGE_PCT);
    }

    #[test]
    fn walk_consumes_multiple_levels_and_computes_weighted_average() {
        let asks = book(&[(dec!(100), dec!(5)), (dec!(101), dec!(5)), (dec!(102), dec!(5))]);
        // target 1000 usd: level1 500usd(5@100), remaining 500 at 101 -> size 500/101
        let pct = estimate_slippage(&asks, WalkSide::Buy, dec!(1000), dec!(100));
        assert!(pct >= MIN_SLIPPAGE_PCT && pct <= MAX_SLIPPAGE_PCT);
    }

    #[test]
    fn insufficient_depth_returns_conservative_penalty() {
        let asks = book(&[(dec!(100), dec!(1))]);
        let pct = estimate_slippage(&asks, WalkSide::Buy, dec!(10_000), dec!(100));
        // fill_ratio = 100/10000 = 0.01, penalty = min(0.2, 0.99) = 0.2
        assert_eq!(pct, dec!(0.2));
    }

    #[test]
    fn empty_book_returns_structural_default() {
        let pct = estimate_slippage(&[], WalkSide::Buy, dec!(100), dec!(100));
        assert_eq!(pct, DEFAULT_SLIPPAGE_PCT);
    }

    #[test]
    fn zero_notional_returns_structural_default() {
        let asks = book(&[(dec!(100), dec!(10))]);
        let pct = estimate_slippage(&asks, WalkSide::Buy, dec!(0), dec!(100));
        assert_eq!(pct, DEFAULT_SLIPPAGE_PCT);
    }

    #[test]
    fn result_always_within_clamp_bounds() {
        let asks = book(&[(dec!(50), dec!(1000))]);
        let pct = estimate_slippage(&asks, WalkSide::Buy, dec!(1), dec!(50));
        assert!(pct >= MIN_SLIPPAGE_PCT);
        assert!(pct <= MAX_SLIPPAGE_PCT);
    }

    #[test]
    fn parses_price_size_shape() {
        let raw = json!([{"price": "100.0", "size": "5.0"}]);
        let levels = parse_levels(&raw).unwrap();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].price, dec!(100.0));
    }

    #[test]
    fn parses_px_sz_shape() {
        let raw = json!([{"px": "100.0", "sz": "5.0"}]);
        let levels = parse_levels(&raw).unwrap();
        assert_eq!(levels[0].size, dec!(5.0));
    }

    #[test]
    fn parses_tuple_shape() {
        let raw = json!([["100.0", "5.0"]]);
        let levels = parse_levels(&raw).unwrap();
        assert_eq!(levels[0].price, dec!(100.0));
    }

    #[test]
    fn rejects_unknown_shape() {
        let raw = json!([{"foo": "bar"}]);
        assert!(parse_levels(&raw).is_none());
    }

    #[test]
    fn rejects_empty_array() {
        let raw = json!([]);
        assert!(parse_levels(&raw).is_none());
    }

    #[test]
    fn sorts_unsorted_asks_ascending_before_walking() {
        let asks = book(&[(dec!(102), dec!(5)), (dec!(100), dec!(5)), (dec!(101), dec!(5))]);
        let pct = estimate_slippage(&asks, WalkSide::Buy, dec!(500), dec!(100));
        // Should consume the 100 level first, so slippage stays at the floor.
        assert_eq!(pct, MIN_SLIPPAGE_PCT);
    }

    #[test]
    fn sell_side_walks_bids_descending() {
        let bids = book(&[(dec!(98), dec!(5)), (dec!(100), dec!(5)), (dec!(99), dec!(5))]);
        let pct = estimate_slippage(&bids, WalkSide::Sell, dec!(500), dec!(100));
        assert_eq!(pct, MIN_SLIPPAGE_PCT);
    }
}
