//! Shared types, traits, and configuration schema for the cross-venue
//! funding-rate arbitrage engine.

pub mod config;
pub mod config_loader;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{AppConfig, CloseConditions, ConditionType, EngineConstants, OpenConditions, StrategyConfig, TradingPairConfig};
pub use config_loader::ConfigLoader;
pub use error::{Result, VenueError};
pub use traits::{DataManager, Notifier, VenueAdapter};
pub use types::{
    Candidate, CloseCandidate, OpenCandidate, OrderAction, OrderBook, OrderRecord, OrderResult,
    OrderType, Position, PositionMap, PositionPair, PriceLevel, Side, SignRecord, Symbol, Venue,
    MarketSnapshot,
};
