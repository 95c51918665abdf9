//! External interfaces: the contracts a venue integration and a
//! notification sink must satisfy to plug into the engine.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{OrderAction, OrderBook, OrderRecord, OrderResult, OrderType, Position, Side, Symbol};

/// One venue's read/write surface. Implementations own their own
/// authentication, rate limiting, and wire format; the engine only ever
/// sees the types in [`crate::types`].
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    /// All open positions on this venue, keyed however the adapter likes
    /// internally but returned as a flat list. Always a live query —
    /// never served from a cache.
    async fn positions(&self) -> Result<Vec<Position>>;

    /// Current mark/mid price for `symbol`.
    async fn price(&self, symbol: &Symbol) -> Result<rust_decimal::Decimal>;

    /// This venue's own funding rate for `symbol`, at its native cadence
    /// (not normalised — that happens in the caller).
    async fn funding_rate(&self, symbol: &Symbol) -> Result<rust_decimal::Decimal>;

    /// Order book for `symbol`, used by the slippage analyzer.
    async fn orderbook(&self, symbol: &Symbol) -> Result<OrderBook>;

    /// Submit an order. `price` is `None` for market orders.
    async fn place_order(
        &self,
        symbol: &Symbol,
        side: Side,
        size: rust_decimal::Decimal,
        order_type: OrderType,
        price: Option<rust_decimal::Decimal>,
    ) -> Result<OrderResult>;

    /// Close an existing position outright, where the venue exposes a
    /// dedicated reduce-only call. Adapters without one may implement this
    /// as a market order on the opposite side of the current position.
    async fn close_position(&self, symbol: &Symbol, size: rust_decimal::Decimal) -> Result<OrderResult>;
}

/// Read-only access to whatever market data backs a venue — live adapter,
/// cached feed, or test fixture.
#[async_trait]
pub trait DataManager: Send + Sync {
    /// Most recent price/funding pair for `symbol`, if any has been
    /// observed yet.
    async fn get(&self, symbol: &Symbol) -> Option<(rust_decimal::Decimal, rust_decimal::Decimal)>;

    /// All symbols this manager currently has data for.
    async fn get_all(&self) -> Vec<Symbol>;

    /// Whether the data for `symbol` is fresh enough to evaluate on.
    async fn is_valid(&self, symbol: &Symbol) -> bool;
}

/// Sink for human-facing notifications about order activity. Failure to
/// notify never blocks or fails the cycle that triggered it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_order(&self, action: OrderAction, record: &OrderRecord);
}
