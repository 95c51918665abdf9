//! In-memory venue fixture wired into `funding-arb run`.
//!
//! Real venue REST/WS clients are out of scope here; this gives the engine
//! something deterministic to drive end to end.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use funding_arb_core::{OrderBook, OrderResult, OrderType, Position, PriceLevel, Result, Side, Symbol, VenueAdapter};

#[derive(Debug, Clone, Copy)]
pub struct SymbolQuote {
    pub price: Decimal,
    pub funding_rate: Decimal,
}

pub struct FixtureVenue {
    name: String,
    quotes: HashMap<String, SymbolQuote>,
    positions: Mutex<Vec<Position>>,
}

impl FixtureVenue {
    #[must_use]
    pub fn new(name: impl Into<String>, quotes: HashMap<String, SymbolQuote>) -> Self {
        Self {
            name: name.into(),
            quotes,
            positions: Mutex::new(Vec::new()),
        }
    }

    fn quote(&self, symbol: &Symbol) -> SymbolQuote {
        self.quotes.get(symbol.as_str()).copied().unwrap_or(SymbolQuote { price: dec!(100), funding_rate: dec!(0) })
    }

    fn synthesize_book(&self, mid: Decimal) -> OrderBook {
        let spread = mid * dec!(0.0005);
        let mut bids = Vec::new();
        let mut asks = Vec::new();
        for i in 1..=10 {
            let step = spread * Decimal::from(i);
            bids.push(PriceLevel { price: mid - step, size: dec!(50) * Decimal::from(i) });
            asks.push(PriceLevel { price: mid + step, size: dec!(50) * Decimal::from(i) });
        }
        OrderBook { bids, asks }
    }
}

#[async_trait]
impl VenueAdapter for FixtureVenue {
    async fn positions(&self) -> Result<Vec<Position>> {
        Ok(self.positions.lock().expect("fixture venue lock poisoned").clone())
    }

    async fn price(&self, symbol: &Symbol) -> Result<Decimal> {
        Ok(self.quote(symbol).price)
    }

    async fn funding_rate(&self, symbol: &Symbol) -> Result<Decimal> {
        Ok(self.quote(symbol).funding_rate)
    }

    async fn orderbook(&self, symbol: &Symbol) -> Result<OrderBook> {
        Ok(self.synthesize_book(self.quote(symbol).price))
    }

    async fn place_order(
        &self,
        symbol: &Symbol,
        side: Side,
        size: Decimal,
        _order_type: OrderType,
        price: Option<Decimal>,
    ) -> Result<OrderResult> {
        let fill_price = price.unwrap_or_else(|| self.quote(symbol).price);
        let mut positions = self.positions.lock().expect("fixture venue lock poisoned");
        positions.retain(|p| &p.symbol != symbol);
        positions.push(Position {
            venue: venue_tag(&self.name),
            symbol: symbol.clone(),
            side,
            size,
            entry_price: Some(fill_price),
        });
        tracing::info!(venue = %self.name, %symbol, %side, %size, price = %fill_price, "fixture: order filled");
        Ok(OrderResult::Filled { id: format!("{}-{}", self.name, symbol), price: Some(fill_price) })
    }

    async fn close_position(&self, symbol: &Symbol, _size: Decimal) -> Result<OrderResult> {
        let mut positions = self.positions.lock().expect("fixture venue lock poisoned");
        let had = positions.iter().any(|p| &p.symbol == symbol);
        positions.retain(|p| &p.symbol != symbol);
        tracing::info!(venue = %self.name, %symbol, had_position = had, "fixture: position closed");
        Ok(OrderResult::Filled { id: format!("{}-{}-close", self.name, symbol), price: None })
    }
}

fn venue_tag(name: &str) -> funding_arb_core::Venue {
    if name.eq_ignore_ascii_case("venue_a") {
        funding_arb_core::Venue::A
    } else {
        funding_arb_core::Venue::B
    }
}
