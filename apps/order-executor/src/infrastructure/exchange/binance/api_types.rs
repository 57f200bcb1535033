//! Binance USDⓈ-M futures REST wire types.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::ports::{ExchangeOrder, ExchangeOrderStatus};
use crate::domain::risk_management::SymbolRule;
use crate::domain::shared::{ClientOrderId, ExchangeOrderId, Symbol, Timestamp};

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceErrorResponse {
    /// Exchange error code (negative).
    pub code: i64,
    /// Error message.
    pub msg: String,
}

/// Order response for create, cancel and query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceOrderResponse {
    /// Exchange order ID.
    pub order_id: i64,
    /// Symbol.
    pub symbol: String,
    /// Order status.
    pub status: BinanceOrderStatus,
    /// Client order ID.
    pub client_order_id: String,
    /// Limit price.
    #[serde(default)]
    pub price: Decimal,
    /// Average fill price ("0" until something executes).
    #[serde(default)]
    pub avg_price: Decimal,
    /// Original quantity.
    #[serde(default)]
    pub orig_qty: Decimal,
    /// Executed quantity.
    #[serde(default)]
    pub executed_qty: Decimal,
    /// Order type.
    #[serde(default, rename = "type")]
    pub order_type: String,
    /// Side.
    #[serde(default)]
    pub side: String,
    /// Time in force.
    #[serde(default)]
    pub time_in_force: String,
    /// Last update time (epoch millis).
    #[serde(default)]
    pub update_time: i64,
}

/// Exchange order status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BinanceOrderStatus {
    /// Resting on the book.
    New,
    /// Partially executed.
    PartiallyFilled,
    /// Fully executed.
    Filled,
    /// Canceled by the user.
    Canceled,
    /// Rejected by the matching engine.
    Rejected,
    /// Expired by time in force or a post-only cross.
    Expired,
    /// Expired by self-trade prevention.
    ExpiredInMatch,
}

impl From<BinanceOrderStatus> for ExchangeOrderStatus {
    fn from(status: BinanceOrderStatus) -> Self {
        match status {
            BinanceOrderStatus::New => Self::New,
            BinanceOrderStatus::PartiallyFilled => Self::PartiallyFilled,
            BinanceOrderStatus::Filled => Self::Filled,
            BinanceOrderStatus::Canceled => Self::Canceled,
            BinanceOrderStatus::Rejected => Self::Rejected,
            BinanceOrderStatus::Expired | BinanceOrderStatus::ExpiredInMatch => Self::Expired,
        }
    }
}

impl From<BinanceOrderResponse> for ExchangeOrder {
    fn from(response: BinanceOrderResponse) -> Self {
        Self {
            exchange_order_id: ExchangeOrderId::new(response.order_id.to_string()),
            client_order_id: ClientOrderId::new(response.client_order_id),
            symbol: Symbol::new(response.symbol),
            status: response.status.into(),
            executed_qty: response.executed_qty,
            avg_price: (response.avg_price > Decimal::ZERO).then_some(response.avg_price),
            update_time: Timestamp::from_unix_millis(response.update_time),
        }
    }
}

/// `GET /fapi/v1/exchangeInfo` response (fields the adapter uses).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceExchangeInfo {
    /// Listed symbols.
    #[serde(default)]
    pub symbols: Vec<BinanceSymbolInfo>,
}

/// Trading rules for one symbol.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinanceSymbolInfo {
    /// Symbol.
    pub symbol: String,
    /// Trading status (`TRADING` when open).
    pub status: String,
    /// Price decimal places.
    #[serde(default)]
    pub price_precision: u32,
    /// Quantity decimal places.
    #[serde(default)]
    pub quantity_precision: u32,
    /// Symbol filters.
    #[serde(default)]
    pub filters: Vec<BinanceSymbolFilter>,
}

/// Symbol filter, tagged by `filterType`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "filterType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BinanceSymbolFilter {
    /// Price increment.
    #[serde(rename_all = "camelCase")]
    PriceFilter {
        /// Minimum price increment.
        tick_size: Decimal,
    },
    /// Quantity bounds and increment.
    #[serde(rename_all = "camelCase")]
    LotSize {
        /// Minimum quantity.
        min_qty: Decimal,
        /// Maximum quantity.
        max_qty: Decimal,
        /// Quantity increment.
        step_size: Decimal,
    },
    /// Minimum order notional.
    MinNotional {
        /// Minimum notional (`notional` on futures, `minNotional` on spot).
        #[serde(alias = "minNotional")]
        notional: Decimal,
    },
    /// Any filter the adapter does not use.
    #[serde(other)]
    Other,
}

impl BinanceSymbolInfo {
    /// Build a symbol rule. Missing filters leave their constraint unset
    /// (zero increments, unbounded maximum).
    #[must_use]
    pub fn to_symbol_rule(&self) -> SymbolRule {
        let mut rule = SymbolRule {
            symbol: Symbol::new(self.symbol.as_str()),
            tick_size: Decimal::ZERO,
            step_size: Decimal::ZERO,
            min_qty: Decimal::ZERO,
            max_qty: Decimal::MAX,
            min_notional: Decimal::ZERO,
            price_precision: self.price_precision,
            quantity_precision: self.quantity_precision,
            tradable: self.status == "TRADING",
        };

        for filter in &self.filters {
            match filter {
                BinanceSymbolFilter::PriceFilter { tick_size } => rule.tick_size = *tick_size,
                BinanceSymbolFilter::LotSize {
                    min_qty,
                    max_qty,
                    step_size,
                } => {
                    rule.min_qty = *min_qty;
                    rule.max_qty = *max_qty;
                    rule.step_size = *step_size;
                }
                BinanceSymbolFilter::MinNotional { notional } => rule.min_notional = *notional,
                BinanceSymbolFilter::Other => {}
            }
        }

        rule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const ORDER_JSON: &str = r#"{
        "orderId": 8389765,
        "symbol": "BTCUSDT",
        "status": "NEW",
        "clientOrderId": "ord-1",
        "price": "45000.00",
        "avgPrice": "0.00000",
        "origQty": "0.001",
        "executedQty": "0",
        "cumQuote": "0",
        "timeInForce": "GTC",
        "type": "LIMIT",
        "reduceOnly": false,
        "side": "BUY",
        "positionSide": "BOTH",
        "updateTime": 1717000000000
    }"#;

    #[test]
    fn parses_order_response() {
        let response: BinanceOrderResponse = serde_json::from_str(ORDER_JSON).unwrap();
        assert_eq!(response.order_id, 8_389_765);
        assert_eq!(response.status, BinanceOrderStatus::New);
        assert_eq!(response.price, dec!(45000));

        let order: ExchangeOrder = response.into();
        assert_eq!(order.exchange_order_id.as_str(), "8389765");
        assert_eq!(order.status, ExchangeOrderStatus::New);
        assert!(order.avg_price.is_none());
        assert_eq!(order.update_time.unix_millis(), 1_717_000_000_000);
    }

    #[test]
    fn expired_in_match_maps_to_expired() {
        let status: BinanceOrderStatus = serde_json::from_str(r#""EXPIRED_IN_MATCH""#).unwrap();
        assert_eq!(ExchangeOrderStatus::from(status), ExchangeOrderStatus::Expired);
    }

    #[test]
    fn parses_symbol_filters() {
        let json = r#"{
            "symbols": [{
                "symbol": "BTCUSDT",
                "status": "TRADING",
                "pricePrecision": 2,
                "quantityPrecision": 3,
                "filters": [
                    {"filterType": "PRICE_FILTER", "minPrice": "556.80", "maxPrice": "4529764", "tickSize": "0.10"},
                    {"filterType": "LOT_SIZE", "minQty": "0.001", "maxQty": "1000", "stepSize": "0.001"},
                    {"filterType": "MARKET_LOT_SIZE", "minQty": "0.001", "maxQty": "120", "stepSize": "0.001"},
                    {"filterType": "MAX_NUM_ORDERS", "limit": 200},
                    {"filterType": "MIN_NOTIONAL", "notional": "100"},
                    {"filterType": "PERCENT_PRICE", "multiplierUp": "1.0500", "multiplierDown": "0.9500", "multiplierDecimal": "4"}
                ]
            }, {
                "symbol": "OLDUSDT",
                "status": "SETTLING",
                "filters": []
            }]
        }"#;

        let info: BinanceExchangeInfo = serde_json::from_str(json).unwrap();
        let rules: Vec<SymbolRule> = info.symbols.iter().map(BinanceSymbolInfo::to_symbol_rule).collect();

        let btc = &rules[0];
        assert_eq!(btc.tick_size, dec!(0.10));
        assert_eq!(btc.step_size, dec!(0.001));
        assert_eq!(btc.min_qty, dec!(0.001));
        assert_eq!(btc.max_qty, dec!(1000));
        assert_eq!(btc.min_notional, dec!(100));
        assert_eq!(btc.price_precision, 2);
        assert!(btc.tradable);

        assert!(!rules[1].tradable);
        assert_eq!(rules[1].max_qty, Decimal::MAX);
    }

    #[test]
    fn spot_style_min_notional_alias() {
        let filter: BinanceSymbolFilter =
            serde_json::from_str(r#"{"filterType": "MIN_NOTIONAL", "minNotional": "5"}"#).unwrap();
        assert!(matches!(filter, BinanceSymbolFilter::MinNotional { notional } if notional == dec!(5)));
    }

    #[test]
    fn parses_error_body() {
        let err: BinanceErrorResponse =
            serde_json::from_str(r#"{"code": -2019, "msg": "Margin is insufficient."}"#).unwrap();
        assert_eq!(err.code, -2019);
    }
}
