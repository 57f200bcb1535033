//! Binance USDⓈ-M Futures Adapter
//!
//! Implementation of `ExchangePort` for the Binance futures REST API with:
//! - HMAC-SHA256 request signing over the sorted query string
//! - Retry with jittered exponential backoff for cancel and query
//! - Error code mapping into the exchange error categories
//! - Environment-aware safety checks (TESTNET vs LIVE)

mod adapter;
mod api_types;
mod config;
mod error;
mod http_client;
mod signer;

pub use adapter::BinanceExchangeAdapter;
pub use config::{BinanceConfig, BinanceEnvironment, RetryConfig};
pub use error::{BinanceError, error_kind};
pub use http_client::{API_KEY_HEADER, BinanceHttpClient};
pub use signer::{RequestSigner, SignedParams};
