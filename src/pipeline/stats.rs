//! Trade-history statistics and snapshot bucketing
//!
//! Pure functions over fetched market data. The only async piece,
//! [`collect_trade_context`], wraps a single trade-history fetch and never
//! fails: a fetch error yields an empty excerpt and zero cash.

use super::format;
use super::market::MarketDataSource;
use super::types::{TickerSnapshot, Trade};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

/// Trades fetched per signal
pub const TRADE_HISTORY_LIMIT: usize = 100;

/// Max lines in the trade-history excerpt
pub const MAX_HISTORY_LINES: usize = 10;

/// Window of the short-term cash estimate
pub const CASH_WINDOW_SECS: i64 = 300;

/// Window of the trade-history excerpt
pub const HISTORY_WINDOW_SECS: i64 = 86_400;

/// One significant trade prepared for display
#[derive(Debug, Clone, PartialEq)]
pub struct TradeHighlight {
    pub time: i64,
    pub value: f64,
    /// Price change (%) of the preceding trade vs. the oldest fetched trade
    pub before_change: f64,
    /// Price change (%) of this trade vs. the oldest fetched trade
    pub after_change: f64,
    /// Share (%) of this trade in the fetched window's total value
    pub share_pct: f64,
}

/// Trade-derived context attached to a signal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeContext {
    pub history: Vec<String>,
    pub cash_5min: f64,
}

/// Significant trades (value >= `min_amount`) from the last 24h, newest first
///
/// Returns at most [`MAX_HISTORY_LINES`] entries.
pub fn trade_highlights(trades: &[Trade], now: i64, min_amount: f64) -> Vec<TradeHighlight> {
    let mut ordered: Vec<&Trade> = trades.iter().collect();
    ordered.sort_by_key(|t| t.time);

    let reference = match ordered.first() {
        Some(t) if t.price > 0.0 => t.price,
        _ => return Vec::new(),
    };
    let total_value: f64 = ordered.iter().map(|t| t.value()).sum();
    let change = |price: f64| (price - reference) / reference * 100.0;

    let mut highlights: Vec<TradeHighlight> = ordered
        .iter()
        .enumerate()
        .filter(|(_, t)| now - t.time <= HISTORY_WINDOW_SECS)
        .filter(|(_, t)| t.value() >= min_amount)
        .map(|(i, t)| {
            let before_price = if i == 0 { t.price } else { ordered[i - 1].price };
            TradeHighlight {
                time: t.time,
                value: t.value(),
                before_change: change(before_price),
                after_change: change(t.price),
                share_pct: if total_value > 0.0 {
                    t.value() / total_value * 100.0
                } else {
                    0.0
                },
            }
        })
        .collect();

    highlights.sort_by(|a, b| b.time.cmp(&a.time));
    highlights.truncate(MAX_HISTORY_LINES);
    highlights
}

/// Sum of trade values in the last `window_secs` seconds
pub fn cash_in_window(trades: &[Trade], now: i64, window_secs: i64) -> f64 {
    trades
        .iter()
        .filter(|t| now - t.time <= window_secs)
        .map(|t| t.value())
        .sum()
}

/// Fetch trade history once and derive the excerpt and cash estimate
pub async fn collect_trade_context(
    market: &dyn MarketDataSource,
    pair: &str,
    now: i64,
    min_trade_amount: f64,
    offset: FixedOffset,
) -> TradeContext {
    match market.get_trade_history(pair, TRADE_HISTORY_LIMIT).await {
        Ok(trades) => {
            let highlights = trade_highlights(&trades, now, min_trade_amount);
            TradeContext {
                history: format::trade_history_lines(&highlights, offset),
                cash_5min: cash_in_window(&trades, now, CASH_WINDOW_SECS),
            }
        }
        Err(e) => {
            log::warn!("⚠️  Trade history unavailable for {}: {}", pair, e);
            TradeContext::default()
        }
    }
}

/// Bucket of the raw-snapshot listing (fixed bounds, independent of config)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotBucket {
    /// < 300k
    Low,
    /// 300k .. 1M
    Medium,
    /// >= 1M
    High,
}

impl SnapshotBucket {
    pub fn of(volume: f64) -> Self {
        if volume < 300_000.0 {
            SnapshotBucket::Low
        } else if volume < 1_000_000.0 {
            SnapshotBucket::Medium
        } else {
            SnapshotBucket::High
        }
    }
}

/// One row of the raw-snapshot listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketedCoin {
    pub symbol: String,
    pub pair: String,
    pub price: f64,
    pub change_pct: f64,
    pub volume: f64,
    /// Tracker's signal count when tracked, otherwise 1
    pub signal_count: u32,
}

/// Latest snapshot split by 24h volume, each bucket sorted by change desc
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeBuckets {
    pub low: Vec<BucketedCoin>,
    pub medium: Vec<BucketedCoin>,
    pub high: Vec<BucketedCoin>,
}

impl VolumeBuckets {
    pub fn total(&self) -> usize {
        self.low.len() + self.medium.len() + self.high.len()
    }
}

/// Bucket a raw snapshot by volume
///
/// # Arguments
/// * `snapshot` - latest tickers
/// * `signal_count_of` - lookup of a symbol's tracker signal count
pub fn bucket_snapshot<F>(snapshot: &[TickerSnapshot], signal_count_of: F) -> VolumeBuckets
where
    F: Fn(&str) -> Option<u32>,
{
    let mut buckets = VolumeBuckets::default();

    for ticker in snapshot {
        let coin = BucketedCoin {
            symbol: ticker.symbol.clone(),
            pair: ticker.pair.clone(),
            price: ticker.last_price,
            change_pct: ticker.change_pct,
            volume: ticker.quote_volume,
            signal_count: signal_count_of(&ticker.symbol).unwrap_or(1),
        };
        match SnapshotBucket::of(ticker.quote_volume) {
            SnapshotBucket::Low => buckets.low.push(coin),
            SnapshotBucket::Medium => buckets.medium.push(coin),
            SnapshotBucket::High => buckets.high.push(coin),
        }
    }

    for bucket in [&mut buckets.low, &mut buckets.medium, &mut buckets.high] {
        bucket.sort_by(|a, b| b.change_pct.total_cmp(&a.change_pct));
    }

    buckets
}
