//! Paired Executor: dispatches both legs of an open or close
//! concurrently, re-queries positions to verify what actually happened,
//! and unwinds a lone filled leg rather than leaving the account
//! directionally exposed.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use funding_arb_core::{
    CloseCandidate, EngineConstants, OpenCandidate, OrderResult, OrderType, Position, Side,
    TradingPairConfig, VenueAdapter,
};

/// Result of attempting to unwind a single filled leg.
#[derive(Debug, Clone)]
pub struct UnwindResult {
    pub success: bool,
    pub error: Option<String>,
}

impl UnwindResult {
    #[must_use]
    pub fn success() -> Self {
        Self { success: true, error: None }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()) }
    }
}

/// Outcome of a paired open or close attempt.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// Both legs confirmed changed by the pre/post diff.
    Success,
    /// Venue A's leg changed but B's did not; A was unwound.
    UnwindA { reason: String, unwind: UnwindResult },
    /// Venue B's leg changed but A's did not; B was unwound.
    UnwindB { reason: String, unwind: UnwindResult },
    /// Neither leg changed; venues are untouched.
    BothFailed { reason_a: String, reason_b: String },
}

impl ExecutionOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Coordinates order dispatch across two venue adapters. Both adapters
/// implement the same contract ([`VenueAdapter`]); which is "A" and which
/// is "B" is purely a matter of which one this instance was built with.
pub struct PairedExecutor {
    venue_a: Arc<dyn VenueAdapter>,
    venue_b: Arc<dyn VenueAdapter>,
    constants: EngineConstants,
}

impl PairedExecutor {
    #[must_use]
    pub fn new(venue_a: Arc<dyn VenueAdapter>, venue_b: Arc<dyn VenueAdapter>, constants: EngineConstants) -> Self {
        Self { venue_a, venue_b, constants }
    }

    /// Opens both legs of `candidate`, verifying fills against the
    /// configured pair parameters.
    pub async fn open_pair(&self, candidate: &OpenCandidate, pair: &TradingPairConfig) -> ExecutionOutcome {
        let symbol = &candidate.symbol;
        let size = clamp_size(candidate.size, Decimal::try_from(pair.min_volume).unwrap_or(Decimal::ZERO), Decimal::try_from(pair.max_position_size).unwrap_or(candidate.size));

        let side_a = Side::from_funding_sign(candidate.funding_a);
        let side_b = Side::from_funding_sign(candidate.funding_b_norm);

        let pre_a = find_position(&self.venue_a.positions().await.unwrap_or_default(), symbol);
        let pre_b = find_position(&self.venue_b.positions().await.unwrap_or_default(), symbol);

        let limit_price_b = match self.venue_b.price(symbol).await {
            Ok(mid) => Some(aggressive_limit_price(mid, side_b, self.constants.limit_price_aggression, pair)),
            Err(_) => None,
        };

        let (result_a, result_b) = tokio::join!(
            self.venue_a.place_order(symbol, side_a, size, OrderType::Market, None),
            self.venue_b.place_order(symbol, side_b, size, OrderType::Limit, limit_price_b)
        );

        tokio::time::sleep(Duration::from_secs(self.constants.settlement_delay_secs)).await;

        let post_a = find_position(&self.venue_a.positions().await.unwrap_or_default(), symbol);
        let post_b = find_position(&self.venue_b.positions().await.unwrap_or_default(), symbol);

        let changed_a = result_a.is_ok() && leg_opened(pre_a.as_ref(), post_a.as_ref(), size, self.constants.open_fill_threshold);
        let changed_b = result_b.is_ok() && leg_opened(pre_b.as_ref(), post_b.as_ref(), size, self.constants.open_fill_threshold);

        self.reconcile(changed_a, changed_b, symbol, size, result_a, result_b).await
    }

    /// Closes both legs of `candidate`.
    pub async fn close_pair(&self, candidate: &CloseCandidate) -> ExecutionOutcome {
        let symbol = &candidate.symbol;
        let size_a = candidate.position_pair.venue_a.size;
        let size_b = candidate.position_pair.venue_b.size;

        let pre_a = find_position(&self.venue_a.positions().await.unwrap_or_default(), symbol);
        let pre_b = find_position(&self.venue_b.positions().await.unwrap_or_default(), symbol);

        let (result_a, result_b) = tokio::join!(
            self.venue_a.close_position(symbol, size_a),
            self.venue_b.close_position(symbol, size_b)
        );

        tokio::time::sleep(Duration::from_secs(self.constants.settlement_delay_secs)).await;

        let post_a = find_position(&self.venue_a.positions().await.unwrap_or_default(), symbol);
        let post_b = find_position(&self.venue_b.positions().await.unwrap_or_default(), symbol);

        let changed_a = result_a.is_ok() && leg_closed(pre_a.as_ref(), post_a.as_ref(), self.constants.close_fill_threshold);
        let changed_b = result_b.is_ok() && leg_closed(pre_b.as_ref(), post_b.as_ref(), self.constants.close_fill_threshold);

        self.reconcile(changed_a, changed_b, symbol, size_a.max(size_b), result_a, result_b).await
    }

    async fn reconcile(
        &self,
        changed_a: bool,
        changed_b: bool,
        symbol: &funding_arb_core::Symbol,
        size: Decimal,
        result_a: funding_arb_core::Result<OrderResult>,
        result_b: funding_arb_core::Result<OrderResult>,
    ) -> ExecutionOutcome {
        match (changed_a, changed_b) {
            (true, true) => {
                tracing::info!(%symbol, "paired executor: both legs confirmed");
                ExecutionOutcome::Success
            }
            (true, false) => {
                let reason = error_text(result_b, "venue B leg did not change");
                tracing::warn!(%symbol, %reason, "paired executor: unwinding venue A");
                let unwind = match self.venue_a.close_position(symbol, size).await {
                    Ok(_) => UnwindResult::success(),
                    Err(err) => UnwindResult::failure(err.to_string()),
                };
                ExecutionOutcome::UnwindA { reason, unwind }
            }
            (false, true) => {
                let reason = error_text(result_a, "venue A leg did not change");
                tracing::warn!(%symbol, %reason, "paired executor: unwinding venue B");
                let unwind = match self.venue_b.close_position(symbol, size).await {
                    Ok(_) => UnwindResult::success(),
                    Err(err) => UnwindResult::failure(err.to_string()),
                };
                ExecutionOutcome::UnwindB { reason, unwind }
            }
            (false, false) => {
                let reason_a = error_text(result_a, "venue A leg did not change");
                let reason_b = error_text(result_b, "venue B leg did not change");
                tracing::debug!(%symbol, %reason_a, %reason_b, "paired executor: both legs failed, no change");
                ExecutionOutcome::BothFailed { reason_a, reason_b }
            }
        }
    }
}

fn error_text(result: funding_arb_core::Result<OrderResult>, fallback: &str) -> String {
    match result {
        Ok(r) if !r.looks_filled() => format!("{fallback} (order reported: {r:?})"),
        Ok(_) => fallback.to_string(),
        Err(err) => err.to_string(),
    }
}

fn find_position(positions: &[Position], symbol: &funding_arb_core::Symbol) -> Option<Position> {
    positions.iter().find(|p| &p.symbol == symbol).cloned()
}

/// Open-leg fill check: either a fresh position appeared, or
/// size moved by at least `threshold` of the target.
fn leg_opened(pre: Option<&Position>, post: Option<&Position>, target_size: Decimal, threshold: f64) -> bool {
    let threshold = Decimal::try_from(threshold).unwrap_or(dec!(0.8));
    match (pre, post) {
        (None, Some(_)) => true,
        (Some(pre), Some(post)) => (post.size - pre.size).abs() >= threshold * target_size,
        _ => false,
    }
}

/// Close-leg fill check: either the position disappeared, or
/// it shrank by at least `threshold` of its pre-close size.
fn leg_closed(pre: Option<&Position>, post: Option<&Position>, threshold: f64) -> bool {
    let threshold = Decimal::try_from(threshold).unwrap_or(dec!(0.9));
    match (pre, post) {
        (Some(_), None) => true,
        (Some(pre), Some(post)) if pre.size > Decimal::ZERO => (pre.size - post.size) / pre.size >= threshold,
        _ => false,
    }
}

fn clamp_size(size: Decimal, min_volume: Decimal, max_position_size: Decimal) -> Decimal {
    size.max(min_volume).min(max_position_size)
}

/// Venue B limit price: ±0.5% aggressive off mid, snapped to `tick_size`
/// and rounded to `price_precision`.
fn aggressive_limit_price(mid: Decimal, side: Side, aggression: f64, pair: &TradingPairConfig) -> Decimal {
    let aggression = Decimal::try_from(aggression).unwrap_or(dec!(0.005));
    let raw = match side {
        Side::Short => mid * (Decimal::ONE - aggression),
        Side::Long => mid * (Decimal::ONE + aggression),
    };
    let tick = Decimal::try_from(pair.tick_size).unwrap_or(Decimal::ZERO);
    let snapped = snap_to_tick(raw, tick);
    snapped.round_dp(pair.price_precision)
}

fn snap_to_tick(price: Decimal, tick_size: Decimal) -> Decimal {
    if tick_size <= Decimal::ZERO {
        return price;
    }
    (price / tick_size).round() * tick_size
}
