//! Strategy configuration schema, exposing design-level constants as
//! configurable defaults rather than burying them in code.

use serde::{Deserialize, Serialize};

/// Constants that tune engine behavior without changing the strategy
/// itself; these are configurable rather than hard-coded so they can be
/// tuned per deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConstants {
    /// Seconds to wait after dispatching a paired order before re-querying
    /// positions to verify fills.
    pub settlement_delay_secs: u64,
    /// Milliseconds to wait between dispatching successive candidates
    /// within the same cycle.
    pub inter_order_pacing_ms: u64,
    /// Lower clamp for slippage estimates, percent.
    pub min_slippage_pct: f64,
    /// Upper clamp for slippage estimates, percent.
    pub max_slippage_clamp_pct: f64,
    /// Maximum order-book levels walked by the slippage analyzer.
    pub depth_levels: usize,
    /// Fraction of target size that must change for an open leg to count
    /// as filled (0.8 = 80%).
    pub open_fill_threshold: f64,
    /// Fraction of a position that must be reduced for a close leg to
    /// count as closed (0.9 = 90%).
    pub close_fill_threshold: f64,
    /// Aggression applied to venue B limit-order pricing, as a fraction
    /// (0.005 = 0.5%).
    pub limit_price_aggression: f64,
    /// Multiplier applied to venue B's native funding rate so it compares
    /// on the same cadence as venue A's (default 8, i.e. 1h -> 8h).
    pub funding_normalization_factor: f64,
}

impl Default for EngineConstants {
    fn default() -> Self {
        Self {
            settlement_delay_secs: 3,
            inter_order_pacing_ms: 500,
            min_slippage_pct: 0.01,
            max_slippage_clamp_pct: 0.5,
            depth_levels: 10,
            open_fill_threshold: 0.8,
            close_fill_threshold: 0.9,
            limit_price_aggression: 0.005,
            funding_normalization_factor: 8.0,
        }
    }
}

/// Per-symbol trading parameters (`strategy.trading_pairs[]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPairConfig {
    pub symbol: String,
    pub max_position_size: f64,
    pub min_volume: f64,
    pub tick_size: f64,
    pub price_precision: u32,
}

/// `strategy.open_conditions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenConditions {
    pub condition_type: ConditionType,
    pub min_funding_diff: f64,
    pub min_price_diff_percent: f64,
    pub max_price_diff_percent: f64,
    pub max_slippage_percent: f64,
    pub ignore_high_slippage: bool,
    pub check_direction_consistency: bool,
}

impl Default for OpenConditions {
    fn default() -> Self {
        Self {
            condition_type: ConditionType::FundingOnly,
            min_funding_diff: 0.00001,
            min_price_diff_percent: 0.2,
            max_price_diff_percent: 1.0,
            max_slippage_percent: 0.15,
            ignore_high_slippage: false,
            check_direction_consistency: false,
        }
    }
}

/// `strategy.close_conditions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloseConditions {
    pub condition_type: ConditionType,
    pub funding_diff_sign_change: bool,
    pub price_diff_sign_change: bool,
    pub min_funding_diff: f64,
    pub min_profit_percent: f64,
    pub max_loss_percent: f64,
    pub max_close_slippage_percent: f64,
    pub ignore_close_slippage: bool,
    /// Parsed and carried through for config-surface completeness; never
    /// consulted to gate a close decision on elapsed holding time.
    pub max_position_time_secs: u64,
    pub check_direction_consistency: bool,
}

impl Default for CloseConditions {
    fn default() -> Self {
        Self {
            condition_type: ConditionType::Any,
            funding_diff_sign_change: true,
            price_diff_sign_change: false,
            min_funding_diff: 0.000005,
            min_profit_percent: 0.1,
            max_loss_percent: 0.3,
            max_close_slippage_percent: 0.25,
            ignore_close_slippage: false,
            max_position_time_secs: 28_800,
            check_direction_consistency: false,
        }
    }
}

/// How multiple boolean conditions combine into a single open/close
/// decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    FundingOnly,
    PriceOnly,
    All,
    Any,
}

impl Default for ConditionType {
    fn default() -> Self {
        Self::FundingOnly
    }
}

/// Top-level `strategy` config block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub symbols: Vec<String>,
    pub trading_pairs: Vec<TradingPairConfig>,
    pub max_positions_count: usize,
    pub check_interval_secs: u64,
    pub open_conditions: OpenConditions,
    pub close_conditions: CloseConditions,
    pub trade_size_usd: std::collections::HashMap<String, f64>,
    pub constants: EngineConstants,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            trading_pairs: Vec::new(),
            max_positions_count: 5,
            check_interval_secs: 5,
            open_conditions: OpenConditions::default(),
            close_conditions: CloseConditions::default(),
            trade_size_usd: std::collections::HashMap::new(),
            constants: EngineConstants::default(),
        }
    }
}

impl StrategyConfig {
    #[must_use]
    pub fn trading_pair(&self, symbol: &str) -> Option<&TradingPairConfig> {
        self.trading_pairs.iter().find(|p| p.symbol == symbol)
    }

    #[must_use]
    pub fn trade_size_usd(&self, symbol: &str) -> f64 {
        self.trade_size_usd.get(symbol).copied().unwrap_or(100.0)
    }
}

/// Whole-app config. Additional top-level blocks (server, database, ...)
/// are left to the binary that embeds this crate; the core only owns the
/// `strategy` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub strategy: StrategyConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let strategy = StrategyConfig::default();
        assert_eq!(strategy.open_conditions.min_funding_diff, 0.00001);
        assert_eq!(strategy.open_conditions.min_price_diff_percent, 0.2);
        assert_eq!(strategy.open_conditions.max_price_diff_percent, 1.0);
        assert_eq!(strategy.open_conditions.max_slippage_percent, 0.15);
        assert_eq!(strategy.close_conditions.max_close_slippage_percent, 0.25);
        assert_eq!(strategy.close_conditions.min_profit_percent, 0.1);
        assert_eq!(strategy.close_conditions.max_loss_percent, 0.3);
        assert_eq!(strategy.close_conditions.max_position_time_secs, 28_800);
        assert_eq!(strategy.open_conditions.condition_type, ConditionType::FundingOnly);
        assert_eq!(strategy.close_conditions.condition_type, ConditionType::Any);
        assert!(strategy.close_conditions.funding_diff_sign_change);
        assert!(!strategy.close_conditions.price_diff_sign_change);
    }

    #[test]
    fn close_min_funding_diff_defaults_to_half_open_threshold() {
        // Carried as an independent numeric default rather than derived at
        // runtime, since the two conditions blocks deserialize independently.
        let strategy = StrategyConfig::default();
        assert!(
            (strategy.close_conditions.min_funding_diff
                - strategy.open_conditions.min_funding_diff / 2.0)
                .abs()
                < 1e-12
        );
    }

    #[test]
    fn engine_constants_defaults() {
        let c = EngineConstants::default();
        assert_eq!(c.settlement_delay_secs, 3);
        assert_eq!(c.inter_order_pacing_ms, 500);
        assert_eq!(c.depth_levels, 10);
        assert!((c.min_slippage_pct - 0.01).abs() < f64::EPSILON);
        assert!((c.max_slippage_clamp_pct - 0.5).abs() < f64::EPSILON);
        assert!((c.open_fill_threshold - 0.8).abs() < f64::EPSILON);
        assert!((c.close_fill_threshold - 0.9).abs() < f64::EPSILON);
        assert!((c.funding_normalization_factor - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn trading_pair_lookup() {
        let mut strategy = StrategyConfig::default();
        strategy.trading_pairs.push(TradingPairConfig {
            symbol: "BTC".into(),
            max_position_size: 1000.0,
            min_volume: 10.0,
            tick_size: 0.1,
            price_precision: 1,
        });
        assert!(strategy.trading_pair("BTC").is_some());
        assert!(strategy.trading_pair("ETH").is_none());
    }

    #[test]
    fn trade_size_usd_defaults_to_100() {
        let strategy = StrategyConfig::default();
        assert_eq!(strategy.trade_size_usd("BTC"), 100.0);
    }
}
