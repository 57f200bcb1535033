//! Exchange adapters implementing `ExchangePort`.

pub mod binance;

pub use binance::{BinanceConfig, BinanceEnvironment, BinanceError, BinanceExchangeAdapter};
