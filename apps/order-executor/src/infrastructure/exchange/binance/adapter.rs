//! Binance futures adapter implementing ExchangePort.

use async_trait::async_trait;

use crate::application::ports::{
    ExchangeError, ExchangeOrder, ExchangeOrderRef, ExchangePort, PlaceOrderRequest,
};
use crate::domain::order_execution::value_objects::{OrderType, TimeInForce};
use crate::domain::risk_management::SymbolRule;

use super::api_types::{BinanceExchangeInfo, BinanceOrderResponse, BinanceSymbolInfo};
use super::config::{BinanceConfig, BinanceEnvironment};
use super::error::BinanceError;
use super::http_client::BinanceHttpClient;
use super::signer::SignedParams;

const ORDER_PATH: &str = "/fapi/v1/order";
const EXCHANGE_INFO_PATH: &str = "/fapi/v1/exchangeInfo";

/// Binance USDⓈ-M futures exchange adapter.
#[derive(Debug, Clone)]
pub struct BinanceExchangeAdapter {
    client: BinanceHttpClient,
    environment: BinanceEnvironment,
}

impl BinanceExchangeAdapter {
    /// Create a new adapter.
    pub fn new(config: &BinanceConfig) -> Result<Self, BinanceError> {
        let client = BinanceHttpClient::new(config)?;
        Ok(Self {
            client,
            environment: config.environment,
        })
    }

    /// Check if we're in live trading mode.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.environment.is_live()
    }

    /// Order placement parameters.
    ///
    /// Post-only orders go out as `LIMIT` with `timeInForce=GTX`. Market
    /// orders carry neither price nor time in force.
    fn order_params(request: &PlaceOrderRequest) -> SignedParams {
        let (order_type, time_in_force) = match request.order_type {
            OrderType::Market => ("MARKET", None),
            OrderType::PostOnly => ("LIMIT", Some(TimeInForce::Gtx)),
            OrderType::Limit if request.post_only => ("LIMIT", Some(TimeInForce::Gtx)),
            OrderType::Limit => ("LIMIT", Some(request.time_in_force.unwrap_or(TimeInForce::Gtc))),
        };

        let price = if request.order_type.requires_price() {
            request.price.map(|p| p.normalize())
        } else {
            None
        };

        SignedParams::new()
            .with("symbol", request.symbol.as_str())
            .with("side", request.side.as_str())
            .with("type", order_type)
            .with("quantity", request.quantity.normalize())
            .with("newClientOrderId", request.client_order_id.as_str())
            .with_opt("price", price)
            .with_opt("timeInForce", time_in_force.map(|tif| tif.as_str()))
            .with_opt("reduceOnly", request.reduce_only.then_some("true"))
    }

    /// Cancel/query parameters. The exchange order ID wins when known.
    fn order_ref_params(order: &ExchangeOrderRef) -> SignedParams {
        let params = SignedParams::new().with("symbol", order.symbol.as_str());
        match &order.exchange_order_id {
            Some(id) => params.with("orderId", id.as_str()),
            None => params.with("origClientOrderId", order.client_order_id.as_str()),
        }
    }
}

#[async_trait]
impl ExchangePort for BinanceExchangeAdapter {
    async fn create_order(
        &self,
        request: &PlaceOrderRequest,
    ) -> Result<ExchangeOrder, ExchangeError> {
        if self.is_live() {
            tracing::warn!(
                client_order_id = %request.client_order_id,
                symbol = %request.symbol,
                "Submitting LIVE order - this will execute real trades"
            );
        }

        let params = Self::order_params(request);

        tracing::info!(
            client_order_id = %request.client_order_id,
            symbol = %request.symbol,
            side = %request.side,
            order_type = params.get("type").unwrap_or_default(),
            time_in_force = params.get("timeInForce").unwrap_or_default(),
            quantity = %request.quantity,
            price = ?request.price,
            "Submitting order to Binance"
        );

        let response: BinanceOrderResponse = self
            .client
            .post_signed(ORDER_PATH, &params)
            .await
            .map_err(ExchangeError::from)?;

        tracing::info!(
            client_order_id = %request.client_order_id,
            exchange_order_id = response.order_id,
            status = ?response.status,
            "Order acknowledged by Binance"
        );

        Ok(response.into())
    }

    async fn cancel_order(&self, order: &ExchangeOrderRef) -> Result<ExchangeOrder, ExchangeError> {
        tracing::info!(
            client_order_id = %order.client_order_id,
            symbol = %order.symbol,
            "Canceling order on Binance"
        );

        let response: BinanceOrderResponse = self
            .client
            .delete_signed(ORDER_PATH, &Self::order_ref_params(order))
            .await
            .map_err(ExchangeError::from)?;

        Ok(response.into())
    }

    async fn query_order(&self, order: &ExchangeOrderRef) -> Result<ExchangeOrder, ExchangeError> {
        let response: BinanceOrderResponse = self
            .client
            .get_signed(ORDER_PATH, &Self::order_ref_params(order))
            .await
            .map_err(ExchangeError::from)?;

        Ok(response.into())
    }

    async fn get_exchange_info(&self) -> Result<Vec<SymbolRule>, ExchangeError> {
        let info: BinanceExchangeInfo = self
            .client
            .get_public(EXCHANGE_INFO_PATH, &SignedParams::new())
            .await
            .map_err(ExchangeError::from)?;

        tracing::debug!(symbols = info.symbols.len(), "Fetched exchange info");

        Ok(info
            .symbols
            .iter()
            .map(BinanceSymbolInfo::to_symbol_rule)
            .collect())
    }
}
