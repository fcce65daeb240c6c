//! Market-data source trait
//!
//! The scanner only ever talks to the exchange through this trait. The
//! production implementation is [`GateioClient`](super::gateio::GateioClient);
//! tests use in-memory fakes.

use super::error::ScanError;
use super::types::{Candle, TickerDetail, TickerSnapshot, Trade};
use async_trait::async_trait;

/// Candle interval used by the stability scan
pub const STABILITY_CANDLE_INTERVAL: &str = "15m";

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// All tickers quoted in the configured currency, blacklist applied
    ///
    /// Items that fail to parse are skipped, not reported.
    async fn get_all_tickers(&self) -> Result<Vec<TickerSnapshot>, ScanError>;

    /// Fresh ticker for one pair
    ///
    /// Returns `Ok(None)` when the exchange does not know the pair.
    async fn get_ticker_detail(&self, pair: &str) -> Result<Option<TickerDetail>, ScanError>;

    /// Most recent trades for a pair (newest first as the exchange returns them)
    async fn get_trade_history(&self, pair: &str, limit: usize) -> Result<Vec<Trade>, ScanError>;

    /// Most recent candles for a pair, `limit` at most
    async fn get_candles(
        &self,
        pair: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, ScanError>;
}
