//! Cycle Scheduler: the single-task loop that ties market data,
//! evaluation, and paired execution together.
//!
//! ```text
//! while running:
//!   for sym in configured_symbols (stable order):
//!     snapshot = build_snapshot(sym)
//!     evaluate(sym) -> opens / closes
//!   for c in opens:  execute open_pair(c);  sleep 500ms
//!   for c in closes: execute close_pair(c); sleep 500ms
//!   sleep check_interval
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;

use funding_arb_core::{
    decimal_sign, MarketSnapshot, OrderBook, PositionPair, Side, StrategyConfig, Symbol, Venue,
    VenueAdapter,
};
use funding_arb_evaluator::{evaluate_close, evaluate_open, has_position, CloseInputs, OpenInputs};
use funding_arb_executor::PairedExecutor;
use funding_arb_signstore::SignStore;
use funding_arb_slippage::{estimate_slippage, WalkSide};

/// How long the scheduler backs off after an error in the cycle body
/// itself (as opposed to a per-symbol evaluation error, which is logged
/// and skipped without backing off).
const CYCLE_ERROR_BACKOFF: Duration = Duration::from_secs(5);
const INTER_CANDIDATE_PACING: Duration = Duration::from_millis(500);

pub struct CycleScheduler {
    venue_a: Arc<dyn VenueAdapter>,
    venue_b: Arc<dyn VenueAdapter>,
    sign_store: Arc<SignStore>,
    executor: PairedExecutor,
    config: StrategyConfig,
    should_stop: Arc<AtomicBool>,
}

impl CycleScheduler {
    #[must_use]
    pub fn new(
        venue_a: Arc<dyn VenueAdapter>,
        venue_b: Arc<dyn VenueAdapter>,
        sign_store: Arc<SignStore>,
        config: StrategyConfig,
    ) -> Self {
        let executor = PairedExecutor::new(venue_a.clone(), venue_b.clone(), config.constants.clone());
        Self {
            venue_a,
            venue_b,
            sign_store,
            executor,
            config,
            should_stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A clone of the stop flag; setting it requests a graceful shutdown
    /// after the current in-flight paired execution finishes.
    #[must_use]
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.should_stop)
    }

    /// Runs the scheduler loop until the stop flag is set.
    pub async fn run(&self) {
        tracing::info!(symbols = ?self.config.symbols, "cycle scheduler: starting");
        loop {
            if self.should_stop.load(Ordering::SeqCst) {
                tracing::info!("cycle scheduler: stop requested, exiting");
                return;
            }

            if let Err(err) = self.run_cycle().await {
                tracing::error!(%err, "cycle scheduler: cycle body failed, backing off");
                tokio::time::sleep(CYCLE_ERROR_BACKOFF).await;
                continue;
            }

            tokio::time::sleep(Duration::from_secs(self.config.check_interval_secs)).await;
        }
    }

    async fn run_cycle(&self) -> funding_arb_core::Result<()> {
        let positions_a = self.venue_a.positions().await?;
        let positions_b = self.venue_b.positions().await?;

        let mut opens = Vec::new();
        let mut closes = Vec::new();

        for symbol_str in &self.config.symbols {
            let symbol = Symbol::new(symbol_str.clone());
            let snapshot = match self.build_snapshot(&symbol).await {
                Ok(s) => s,
                Err(err) => {
                    tracing::warn!(%symbol, %err, "cycle scheduler: snapshot failed for symbol, skipping");
                    continue;
                }
            };
            if !snapshot.valid {
                continue;
            }

            let pos_a = positions_a.iter().find(|p| p.symbol == symbol);
            let pos_b = positions_b.iter().find(|p| p.symbol == symbol);

            let Some(pair_config) = self.config.trading_pair(symbol_str) else {
                tracing::warn!(%symbol, "cycle scheduler: no trading pair config, skipping");
                continue;
            };

            if !has_position(&symbol, pos_a, pos_b) {
                let distinct_symbols = distinct_symbol_count(&positions_a, &positions_b);
                let inputs = OpenInputs {
                    snapshot: &snapshot,
                    conditions: &self.config.open_conditions,
                    current_size: Decimal::ZERO,
                    max_position_size: Decimal::try_from(pair_config.max_position_size).unwrap_or(Decimal::ZERO),
                    distinct_symbol_count: distinct_symbols,
                    max_positions_count: self.config.max_positions_count,
                };
                if let Some(candidate) = evaluate_open(&inputs) {
                    opens.push(candidate);
                }
            } else if let (Some(pos_a), Some(pos_b)) = (pos_a, pos_b) {
                let stored_sign = self.sign_store.get(symbol_str);
                let position_pair = PositionPair { venue_a: pos_a.clone(), venue_b: pos_b.clone() };
                let inputs = CloseInputs {
                    snapshot: &snapshot,
                    conditions: &self.config.close_conditions,
                    position_pair: &position_pair,
                    stored_sign,
                };
                let outcome = evaluate_close(&inputs);
                if let Some(price_sign) = outcome.lazy_price_sign_capture {
                    if let Err(err) = self.sign_store.set_price_sign(symbol_str, price_sign) {
                        tracing::warn!(%symbol, %err, "cycle scheduler: failed to persist lazy price sign");
                    }
                }
                if let Some(candidate) = outcome.candidate {
                    closes.push(candidate);
                }
            }
        }

        for candidate in &opens {
            let Some(pair_config) = self.config.trading_pair(candidate.symbol.as_str()) else {
                continue;
            };
            let outcome = self.executor.open_pair(candidate, pair_config).await;
            if outcome.is_success() {
                let funding_sign = decimal_sign(candidate.funding_diff);
                let price_sign = decimal_sign(candidate.price_diff_pct);
                if let Err(err) = self.sign_store.set(candidate.symbol.as_str(), funding_sign, price_sign) {
                    tracing::error!(symbol = %candidate.symbol, %err, "cycle scheduler: failed to persist sign after open");
                }
            } else {
                tracing::warn!(symbol = %candidate.symbol, ?outcome, "cycle scheduler: open_pair did not succeed");
            }
            tokio::time::sleep(INTER_CANDIDATE_PACING).await;
        }

        for candidate in &closes {
            let outcome = self.executor.close_pair(candidate).await;
            if outcome.is_success() {
                if let Err(err) = self.sign_store.clear(candidate.symbol.as_str()) {
                    tracing::error!(symbol = %candidate.symbol, %err, "cycle scheduler: failed to clear sign after close");
                }
            } else {
                tracing::warn!(symbol = %candidate.symbol, ?outcome, "cycle scheduler: close_pair did not succeed");
            }
            tokio::time::sleep(INTER_CANDIDATE_PACING).await;
        }

        Ok(())
    }

    async fn build_snapshot(&self, symbol: &Symbol) -> funding_arb_core::Result<MarketSnapshot> {
        let price_a = self.venue_a.price(symbol).await?;
        let price_b = self.venue_b.price(symbol).await?;
        let funding_a = self.venue_a.funding_rate(symbol).await?;
        let funding_b_raw = self.venue_b.funding_rate(symbol).await?;
        let funding_b_norm = funding_b_raw * Decimal::try_from(self.config.constants.funding_normalization_factor).unwrap_or(Decimal::from(8));

        let orderbook_a = self.venue_a.orderbook(symbol).await.ok();
        let orderbook_b = self.venue_b.orderbook(symbol).await.ok();

        let side_a = Side::from_funding_sign(funding_a);
        let side_b = Side::from_funding_sign(funding_b_norm);

        let notional = self.config.trade_size_usd(symbol.as_str());
        let notional = Decimal::try_from(notional).unwrap_or(Decimal::from(100));

        let slip_a = orderbook_a.as_ref().map(|book| slippage_for_side(book, side_a, notional, price_a));
        let slip_b = orderbook_b.as_ref().map(|book| slippage_for_side(book, side_b, notional, price_b));
        let total_slippage_pct = match (slip_a, slip_b) {
            (Some(a), Some(b)) => Some(a + b),
            _ => None,
        };

        let (long_venue, short_venue) = match (side_a, side_b) {
            (Side::Long, Side::Short) => (Some(Venue::A), Some(Venue::B)),
            (Side::Short, Side::Long) => (Some(Venue::B), Some(Venue::A)),
            _ => (None, None),
        };

        Ok(MarketSnapshot {
            symbol: symbol.clone(),
            price_a,
            price_b,
            funding_a,
            funding_b_raw,
            funding_b_norm,
            valid: price_a > Decimal::ZERO && price_b > Decimal::ZERO,
            orderbook_a,
            orderbook_b,
            total_slippage_pct,
            long_slippage_pct: slip_a,
            short_slippage_pct: slip_b,
            long_venue,
            short_venue,
        })
    }
}

fn slippage_for_side(book: &OrderBook, side: Side, notional: Decimal, mid: Decimal) -> Decimal {
    let walk_side = match side {
        Side::Long => WalkSide::Buy,
        Side::Short => WalkSide::Sell,
    };
    let levels: Vec<_> = match walk_side {
        WalkSide::Buy => book.asks.clone(),
        WalkSide::Sell => book.bids.clone(),
    };
    estimate_slippage(&levels, walk_side, notional, mid)
}

/// Distinct base symbols held across both venues, for the global
/// position cap check — the cap counts symbols, not raw positions.
fn distinct_symbol_count(positions_a: &[funding_arb_core::Position], positions_b: &[funding_arb_core::Position]) -> usize {
    let mut symbols: HashMap<&str, ()> = HashMap::new();
    for p in positions_a.iter().chain(positions_b.iter()) {
        symbols.insert(p.symbol.as_str(), ());
    }
    symbols.len()
}
