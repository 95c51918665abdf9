//! Opportunity Evaluator: for a symbol with a valid market snapshot,
//! decides whether to open, close, or do nothing — never both in the same
//! cycle. Pure and deterministic: identical inputs always produce an
//! identical decision.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use funding_arb_core::{
    decimal_sign, CloseCandidate, CloseConditions, ConditionType, MarketSnapshot, OpenCandidate,
    OpenConditions, PositionPair, SignRecord, Symbol,
};

/// Fallback used when a symbol has no slippage reading yet (distinct from
/// the analyzer's own structural-defect default).
const MISSING_SLIPPAGE_DEFAULT_PCT: Decimal = dec!(0.5);

/// Inputs for an open-side evaluation, gathered by the caller from the
/// current snapshot and position maps.
#[derive(Debug, Clone)]
pub struct OpenInputs<'a> {
    pub snapshot: &'a MarketSnapshot,
    pub conditions: &'a OpenConditions,
    /// Current size already held on this symbol (0 if none).
    pub current_size: Decimal,
    pub max_position_size: Decimal,
    /// Count of distinct symbols held across both venues, including this
    /// one only if already held (it isn't, here, since open implies none).
    pub distinct_symbol_count: usize,
    pub max_positions_count: usize,
}

/// Inputs for a close-side evaluation.
#[derive(Debug, Clone)]
pub struct CloseInputs<'a> {
    pub snapshot: &'a MarketSnapshot,
    pub conditions: &'a CloseConditions,
    pub position_pair: &'a PositionPair,
    pub stored_sign: Option<SignRecord>,
}

/// Result of a close evaluation: the candidate (if any) plus an optional
/// lazy price-sign to persist when no sign was on record yet.
#[derive(Debug, Clone, Default)]
pub struct CloseOutcome {
    pub candidate: Option<CloseCandidate>,
    pub lazy_price_sign_capture: Option<i8>,
}

/// Evaluate the open side. Returns `None` on any guard failure or if the
/// combined condition does not hold.
#[must_use]
pub fn evaluate_open(inputs: &OpenInputs<'_>) -> Option<OpenCandidate> {
    let snapshot = inputs.snapshot;

    if inputs.distinct_symbol_count >= inputs.max_positions_count {
        tracing::debug!(symbol = %snapshot.symbol, "evaluator: global position cap reached");
        return None;
    }

    if inputs.current_size >= inputs.max_position_size {
        tracing::debug!(symbol = %snapshot.symbol, "evaluator: per-symbol cap reached");
        return None;
    }
    let available_size = inputs.max_position_size - inputs.current_size;

    let total_slippage = snapshot.total_slippage_pct.unwrap_or(MISSING_SLIPPAGE_DEFAULT_PCT);
    if total_slippage > Decimal::try_from(inputs.conditions.max_slippage_percent).unwrap_or(MISSING_SLIPPAGE_DEFAULT_PCT)
        && !inputs.conditions.ignore_high_slippage
    {
        tracing::debug!(symbol = %snapshot.symbol, %total_slippage, "evaluator: open slippage guard tripped");
        return None;
    }

    let price_diff_pct = snapshot.price_diff_pct();
    let funding_diff = snapshot.funding_diff();

    let min_price = pct(inputs.conditions.min_price_diff_percent);
    let max_price = pct(inputs.conditions.max_price_diff_percent);
    let min_funding = Decimal::try_from(inputs.conditions.min_funding_diff).unwrap_or(Decimal::ZERO);

    let price_cond = price_diff_pct.abs() >= min_price && price_diff_pct.abs() <= max_price;
    let funding_cond = funding_diff.abs() >= min_funding;
    let direction_ok = decimal_sign(price_diff_pct) == decimal_sign(funding_diff);

    if !combine(inputs.conditions.condition_type, price_cond, funding_cond, direction_ok, inputs.conditions.check_direction_consistency) {
        return None;
    }

    Some(OpenCandidate {
        symbol: snapshot.symbol.clone(),
        funding_diff,
        funding_a: snapshot.funding_a,
        funding_b_norm: snapshot.funding_b_norm,
        price_diff_pct,
        size: available_size,
        reason: format!(
            "funding_diff={funding_diff} price_diff_pct={price_diff_pct} condition_type={:?}",
            inputs.conditions.condition_type
        ),
    })
}

/// Evaluate the close side for a symbol with both legs present.
#[must_use]
pub fn evaluate_close(inputs: &CloseInputs<'_>) -> CloseOutcome {
    let snapshot = inputs.snapshot;

    let total_slippage = snapshot.total_slippage_pct.unwrap_or(MISSING_SLIPPAGE_DEFAULT_PCT);
    if total_slippage > pct(inputs.conditions.max_close_slippage_percent) && !inputs.conditions.ignore_close_slippage {
        tracing::debug!(symbol = %snapshot.symbol, %total_slippage, "evaluator: close slippage guard tripped");
        return CloseOutcome::default();
    }

    let price_diff_pct = snapshot.price_diff_pct();
    let funding_diff = snapshot.funding_diff();
    let current_funding_sign = decimal_sign(funding_diff);
    let current_price_sign = decimal_sign(price_diff_pct);

    // Lazy legacy capture: a stored record with no price sign means a
    // position believed-open across a restart with no recorded price sign
    // yet; record the current one now. Never fires when a price sign is
    // already on record, so it can never overwrite one.
    let lazy_capture = match inputs.stored_sign {
        Some(s) if s.price_sign.is_none() => Some(current_price_sign),
        _ => None,
    };

    let funding_sign_changed = inputs
        .stored_sign
        .map(|s| s.funding_sign != current_funding_sign)
        .unwrap_or(false);
    let price_sign_changed = inputs
        .stored_sign
        .and_then(|s| s.price_sign)
        .map(|p| p != current_price_sign)
        .unwrap_or(false);

    let min_funding = Decimal::try_from(inputs.conditions.min_funding_diff).unwrap_or(Decimal::ZERO);
    let funding_cond = funding_sign_changed && funding_diff.abs() >= min_funding;

    let min_profit = pct(inputs.conditions.min_profit_percent);
    let price_cond = if inputs.conditions.price_diff_sign_change {
        price_sign_changed && price_diff_pct.abs() >= min_profit
    } else {
        price_diff_pct.abs() < min_profit
    };

    let direction_ok = decimal_sign(price_diff_pct) == decimal_sign(funding_diff);

    let should_close = combine(
        inputs.conditions.condition_type,
        price_cond,
        funding_cond,
        direction_ok,
        inputs.conditions.check_direction_consistency,
    );

    if !should_close {
        return CloseOutcome {
            candidate: None,
            lazy_price_sign_capture: lazy_capture,
        };
    }

    let reason = if !inputs.conditions.price_diff_sign_change && price_cond {
        format!("basis converged: price_diff_pct={price_diff_pct} min_profit_percent={min_profit}")
    } else {
        format!(
            "funding_sign_changed={funding_sign_changed} price_sign_changed={price_sign_changed} condition_type={:?}",
            inputs.conditions.condition_type
        )
    };

    let candidate = CloseCandidate {
        symbol: snapshot.symbol.clone(),
        position_pair: inputs.position_pair.clone(),
        reason,
    };

    CloseOutcome {
        candidate: Some(candidate),
        lazy_price_sign_capture: lazy_capture,
    }
}

fn combine(condition_type: ConditionType, price_cond: bool, funding_cond: bool, direction_ok: bool, check_direction: bool) -> bool {
    let direction_gate = !check_direction || direction_ok;
    let core = match condition_type {
        ConditionType::FundingOnly => funding_cond,
        ConditionType::PriceOnly => price_cond,
        ConditionType::All => price_cond && funding_cond,
        ConditionType::Any => price_cond || funding_cond,
    };
    core && direction_gate
}

fn pct(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}

/// Convenience used by `funding-arb-scheduler`: resolves whether a symbol
/// currently has any position on either venue, without re-deriving the
/// open/close branch logic at the call site. Kept here rather than in
/// `funding-arb-core` since it encodes the evaluator's own `has_position`
/// definition.
#[must_use]
pub fn has_position(symbol: &Symbol, position_a: Option<&funding_arb_core::Position>, position_b: Option<&funding_arb_core::Position>) -> bool {
    position_a.map(|p| &p.symbol == symbol).unwrap_or(false) || position_b.map(|p| &p.symbol == symbol).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use funding_arb_core::Venue;
    use rust_decimal_macros::dec;

    fn snapshot(price_a: Decimal, price_b: Decimal, funding_a: Decimal, funding_b_norm: Decimal) -> MarketSnapshot {
        MarketSnapshot {
            symbol: Symbol::new("BTC"),
            price_a,
            price_b,
            funding_a,
            funding_b_raw: funding_b_norm / dec!(8),
            funding_b_norm,
            valid: true,
            orderbook_a: None,
            orderbook_b: None,
            total_slippage_pct: None,
            long_slippage_pct: None,
            short_slippage_pct: None,
            long_venue: None,
            short_venue: None,
        }
    }

    #[test]
    fn open_blocked_by_global_cap() {
        let snap = snapshot(dec!(100), dec!(99), dec!(0.001), dec!(0));
        let conditions = OpenConditions::default();
        let inputs = OpenInputs {
            snapshot: &snap,
            conditions: &conditions,
            current_size: dec!(0),
            max_position_size: dec!(1000),
            distinct_symbol_count: 5,
            max_positions_count: 5,
        };
        assert!(evaluate_open(&inputs).is_none());
    }

    #[test]
    fn open_blocked_by_per_symbol_cap() {
        let snap = snapshot(dec!(100), dec!(99), dec!(0.001), dec!(0));
        let conditions = OpenConditions::default();
        let inputs = OpenInputs {
            snapshot: &snap,
            conditions: &conditions,
            current_size: dec!(1000),
            max_position_size: dec!(1000),
            distinct_symbol_count: 0,
            max_positions_count: 5,
        };
        assert!(evaluate_open(&inputs).is_none());
    }

    #[test]
    fn open_blocked_by_slippage_guard() {
        let mut snap = snapshot(dec!(100), dec!(99.5), dec!(0.001), dec!(0));
        snap.total_slippage_pct = Some(dec!(0.3));
        let conditions = OpenConditions {
            max_slippage_percent: 0.15,
            ignore_high_slippage: false,
            ..OpenConditions::default()
        };
        let inputs = OpenInputs {
            snapshot: &snap,
            conditions: &conditions,
            current_size: dec!(0),
            max_position_size: dec!(1000),
            distinct_symbol_count: 0,
            max_positions_count: 5,
        };
        assert!(evaluate_open(&inputs).is_none());
    }

    #[test]
    fn open_ignores_slippage_guard_when_configured() {
        let mut snap = snapshot(dec!(100), dec!(99.5), dec!(0.01), dec!(0));
        snap.total_slippage_pct = Some(dec!(0.3));
        let conditions = OpenConditions {
            condition_type: ConditionType::FundingOnly,
            max_slippage_percent: 0.15,
            ignore_high_slippage: true,
            min_funding_diff: 0.00001,
            ..OpenConditions::default()
        };
        let inputs = OpenInputs {
            snapshot: &snap,
            conditions: &conditions,
            current_size: dec!(0),
            max_position_size: dec!(1000),
            distinct_symbol_count: 0,
            max_positions_count: 5,
        };
        assert!(evaluate_open(&inputs).is_some());
    }

    #[test]
    fn open_funding_only_requires_funding_threshold() {
        let snap = snapshot(dec!(100), dec!(100), dec!(0.000001), dec!(0));
        let conditions = OpenConditions {
            condition_type: ConditionType::FundingOnly,
            min_funding_diff: 0.00001,
            ..OpenConditions::default()
        };
        let inputs = OpenInputs {
            snapshot: &snap,
            conditions: &conditions,
            current_size: dec!(0),
            max_position_size: dec!(1000),
            distinct_symbol_count: 0,
            max_positions_count: 5,
        };
        assert!(evaluate_open(&inputs).is_none());
    }

    #[test]
    fn open_any_passes_on_price_alone() {
        let snap = snapshot(dec!(101), dec!(100), dec!(0), dec!(0));
        let conditions = OpenConditions {
            condition_type: ConditionType::Any,
            min_price_diff_percent: 0.2,
            max_price_diff_percent: 5.0,
            min_funding_diff: 1.0,
            ..OpenConditions::default()
        };
        let inputs = OpenInputs {
            snapshot: &snap,
            conditions: &conditions,
            current_size: dec!(0),
            max_position_size: dec!(1000),
            distinct_symbol_count: 0,
            max_positions_count: 5,
        };
        assert!(evaluate_open(&inputs).is_some());
    }

    #[test]
    fn open_available_size_is_cap_minus_current() {
        let snap = snapshot(dec!(100), dec!(100), dec!(0.001), dec!(0));
        let conditions = OpenConditions {
            condition_type: ConditionType::FundingOnly,
            min_funding_diff: 0.00001,
            ..OpenConditions::default()
        };
        let inputs = OpenInputs {
            snapshot: &snap,
            conditions: &conditions,
            current_size: dec!(200),
            max_position_size: dec!(1000),
            distinct_symbol_count: 0,
            max_positions_count: 5,
        };
        let candidate = evaluate_open(&inputs).unwrap();
        assert_eq!(candidate.size, dec!(800));
    }

    fn position_pair() -> PositionPair {
        use funding_arb_core::{Position, Side};
        PositionPair {
            venue_a: Position { venue: Venue::A, symbol: Symbol::new("BTC"), side: Side::Short, size: dec!(100), entry_price: Some(dec!(100)) },
            venue_b: Position { venue: Venue::B, symbol: Symbol::new("BTC"), side: Side::Long, size: dec!(100), entry_price: Some(dec!(100)) },
        }
    }

    #[test]
    fn close_on_funding_sign_flip() {
        let snap = snapshot(dec!(100), dec!(100), dec!(-0.001), dec!(0));
        let conditions = CloseConditions {
            condition_type: ConditionType::Any,
            funding_diff_sign_change: true,
            min_funding_diff: 0.000005,
            ..CloseConditions::default()
        };
        let pair = position_pair();
        let inputs = CloseInputs {
            snapshot: &snap,
            conditions: &conditions,
            position_pair: &pair,
            stored_sign: Some(SignRecord::new(1, 1)),
        };
        let outcome = evaluate_close(&inputs);
        assert!(outcome.candidate.is_some());
    }

    #[test]
    fn close_no_signal_when_basis_has_not_converged_and_sign_unchanged() {
        let snap = snapshot(dec!(105), dec!(100), dec!(0.001), dec!(0));
        let conditions = CloseConditions {
            condition_type: ConditionType::Any,
            min_profit_percent: 0.1,
            price_diff_sign_change: false,
            funding_diff_sign_change: true,
            min_funding_diff: 0.000005,
            ..CloseConditions::default()
        };
        let pair = position_pair();
        let inputs = CloseInputs {
            snapshot: &snap,
            conditions: &conditions,
            position_pair: &pair,
            stored_sign: Some(SignRecord::new(1, 1)),
        };
        let outcome = evaluate_close(&inputs);
        assert!(outcome.candidate.is_none());
    }

    #[test]
    fn close_lazy_price_sign_capture_when_only_funding_sign_stored() {
        let snap = snapshot(dec!(101), dec!(100), dec!(0.001), dec!(0));
        let conditions = CloseConditions::default();
        let pair = position_pair();
        let inputs = CloseInputs {
            snapshot: &snap,
            conditions: &conditions,
            position_pair: &pair,
            stored_sign: Some(SignRecord::funding_only(1)),
        };
        let outcome = evaluate_close(&inputs);
        assert_eq!(outcome.lazy_price_sign_capture, Some(1));
    }

    #[test]
    fn close_does_not_recapture_an_already_recorded_price_sign() {
        let snap = snapshot(dec!(101), dec!(100), dec!(0.001), dec!(0));
        let conditions = CloseConditions::default();
        let pair = position_pair();
        let inputs = CloseInputs {
            snapshot: &snap,
            conditions: &conditions,
            position_pair: &pair,
            stored_sign: Some(SignRecord::new(1, -1)),
        };
        let outcome = evaluate_close(&inputs);
        assert_eq!(outcome.lazy_price_sign_capture, None);
    }

    #[test]
    fn close_slippage_guard_blocks_even_valid_signal() {
        let mut snap = snapshot(dec!(100), dec!(100), dec!(-0.001), dec!(0));
        snap.total_slippage_pct = Some(dec!(0.4));
        let conditions = CloseConditions {
            max_close_slippage_percent: 0.25,
            ignore_close_slippage: false,
            ..CloseConditions::default()
        };
        let pair = position_pair();
        let inputs = CloseInputs {
            snapshot: &snap,
            conditions: &conditions,
            position_pair: &pair,
            stored_sign: Some(SignRecord::new(1, 1)),
        };
        let outcome = evaluate_close(&inputs);
        assert!(outcome.candidate.is_none());
    }

    #[test]
    fn has_position_true_when_either_venue_holds_symbol() {
        use funding_arb_core::{Position, Side};
        let symbol = Symbol::new("BTC");
        let pos_a = Position { venue: Venue::A, symbol: symbol.clone(), side: Side::Long, size: dec!(1), entry_price: None };
        assert!(has_position(&symbol, Some(&pos_a), None));
        assert!(!has_position(&symbol, None, None));
    }
}
