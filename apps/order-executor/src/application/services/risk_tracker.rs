//! Live exposure bookkeeping for pre-trade risk checks.
//!
//! Tracks signed positions from fills, the number of orders sent today and
//! the last traded price per symbol. `snapshot` freezes these for the
//! validator.
//!
//! `admit` runs the pre-trade check and reserves an open-order slot in one
//! critical section, so concurrent creates cannot all pass the open-order
//! limit before any of them is stored.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::domain::order_execution::Fill;
use crate::domain::risk_management::RiskSnapshot;
use crate::domain::shared::Symbol;

#[derive(Debug)]
struct RiskBook {
    positions: HashMap<Symbol, Decimal>,
    reference_prices: HashMap<Symbol, Decimal>,
    trading_day: NaiveDate,
    daily_orders: u32,
    in_flight: u32,
}

impl RiskBook {
    fn roll_day(&mut self, today: NaiveDate) {
        if today != self.trading_day {
            tracing::info!(
                from = %self.trading_day,
                to = %today,
                daily_orders = self.daily_orders,
                "Trading day rolled over"
            );
            self.trading_day = today;
            self.daily_orders = 0;
        }
    }

    fn view(&self, symbol: &Symbol, stored_open_orders: usize) -> RiskSnapshot {
        let stored = u32::try_from(stored_open_orders).unwrap_or(u32::MAX);
        RiskSnapshot {
            position: self.positions.get(symbol).copied().unwrap_or_default(),
            daily_orders: self.daily_orders,
            open_orders: stored.saturating_add(self.in_flight),
            reference_price: self.reference_prices.get(symbol).copied(),
        }
    }
}

/// Position, order-count and reference-price tracker.
#[derive(Debug)]
pub struct RiskTracker {
    book: Mutex<RiskBook>,
}

impl Default for RiskTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskTracker {
    /// Create an empty tracker for the current UTC day.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_on(Utc::now().date_naive())
    }

    /// Create an empty tracker for `day`.
    #[must_use]
    pub fn starting_on(day: NaiveDate) -> Self {
        Self {
            book: Mutex::new(RiskBook {
                positions: HashMap::new(),
                reference_prices: HashMap::new(),
                trading_day: day,
                daily_orders: 0,
                in_flight: 0,
            }),
        }
    }

    /// Exposure view for an order in `symbol`.
    ///
    /// `open_orders` is the stored open-order count; reserved slots are added
    /// to it.
    pub fn snapshot(&self, symbol: &Symbol, open_orders: usize) -> RiskSnapshot {
        self.snapshot_on(symbol, open_orders, Utc::now().date_naive())
    }

    /// Exposure view as of `today`.
    pub fn snapshot_on(&self, symbol: &Symbol, open_orders: usize, today: NaiveDate) -> RiskSnapshot {
        let mut book = self
            .book
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        book.roll_day(today);
        book.view(symbol, open_orders)
    }

    /// Run `check` against a fresh snapshot and reserve an open-order slot if
    /// it passes.
    ///
    /// `open_orders` is read under the tracker lock. The slot is counted in
    /// every later snapshot until it is dropped, which the caller does once
    /// the order is stored or has failed.
    ///
    /// # Errors
    ///
    /// Returns the error from `check`; no slot is reserved.
    pub fn admit<E>(
        &self,
        symbol: &Symbol,
        open_orders: impl FnOnce() -> usize,
        check: impl FnOnce(&RiskSnapshot) -> Result<(), E>,
    ) -> Result<OpenOrderSlot<'_>, E> {
        let mut book = self
            .book
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        book.roll_day(Utc::now().date_naive());

        let snapshot = book.view(symbol, open_orders());
        check(&snapshot)?;
        book.in_flight = book.in_flight.saturating_add(1);

        Ok(OpenOrderSlot { tracker: self })
    }

    /// Number of reserved open-order slots.
    pub fn in_flight(&self) -> u32 {
        self.book
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .in_flight
    }

    /// Count one order sent to the exchange today.
    pub fn record_order_sent(&self) {
        self.record_order_sent_on(Utc::now().date_naive());
    }

    /// Count one order sent to the exchange on `today`.
    pub fn record_order_sent_on(&self, today: NaiveDate) {
        let mut book = self
            .book
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        book.roll_day(today);
        book.daily_orders = book.daily_orders.saturating_add(1);
    }

    /// Apply a fill to the symbol position and reference price.
    pub fn record_fill(&self, fill: &Fill) {
        let mut book = self
            .book
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *book.positions.entry(fill.symbol.clone()).or_default() += fill.side.signed(fill.quantity);
        book.reference_prices.insert(fill.symbol.clone(), fill.price);
    }

    /// Set the reference price for `symbol` from an external mark.
    pub fn set_reference_price(&self, symbol: &Symbol, price: Decimal) {
        self.book
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .reference_prices
            .insert(symbol.clone(), price);
    }

    /// Current signed position in `symbol`.
    pub fn position(&self, symbol: &Symbol) -> Decimal {
        self.book
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .positions
            .get(symbol)
            .copied()
            .unwrap_or_default()
    }
}

/// An open-order slot reserved by [`RiskTracker::admit`]; released on drop.
#[must_use = "the open-order slot is released as soon as it is dropped"]
#[derive(Debug)]
pub struct OpenOrderSlot<'a> {
    tracker: &'a RiskTracker,
}

impl Drop for OpenOrderSlot<'_> {
    fn drop(&mut self) {
        let mut book = self
            .tracker
            .book
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        book.in_flight = book.in_flight.saturating_sub(1);
    }
}
