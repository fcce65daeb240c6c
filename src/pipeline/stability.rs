//! Flat-then-breakout ("stability") alerts
//!
//! Independent of the tracking table. A symbol alerts when its 24h change
//! is at least [`STABILITY_MIN_CHANGE`] and each of its last
//! [`STABILITY_CANDLES`] 15-minute candles stayed within
//! [`MAX_CANDLE_RANGE`] percent. Stability alerts never create a tracker.
//!
//! Repeat alerts for the same symbol are suppressed for
//! `STABILITY_COOLDOWN_SECS` after a delivered alert. With the default of 0
//! a symbol alerts on every pass while it qualifies.

use super::config::ScannerConfig;
use super::format;
use super::market::{MarketDataSource, STABILITY_CANDLE_INTERVAL};
use super::notifier::SignalSink;
use super::types::{Candle, SignalKind, SignalRecord, TickerSnapshot, VolumeCategory};
use std::collections::HashMap;

/// Minimum 24h change (%) to be considered
pub const STABILITY_MIN_CHANGE: f64 = 20.0;

/// Candles required (24h of 15m candles, minus the breakout hour)
pub const STABILITY_CANDLES: usize = 95;

/// Each candle's (high - low) / low must stay strictly below this (%)
pub const MAX_CANDLE_RANGE: f64 = 19.0;

/// True if the candle set is long enough and every candle is flat
///
/// Fewer than [`STABILITY_CANDLES`] candles is insufficient history. A
/// candle with an undefined range (non-positive low) counts as a violation.
pub fn is_stable(candles: &[Candle]) -> bool {
    if candles.len() < STABILITY_CANDLES {
        return false;
    }

    candles
        .iter()
        .all(|c| matches!(c.range_pct(), Some(range) if range < MAX_CANDLE_RANGE))
}

/// Record handed to observers for a delivered stability alert
pub fn stability_record(ticker: &TickerSnapshot, category: VolumeCategory, now: i64) -> SignalRecord {
    SignalRecord {
        symbol: ticker.symbol.clone(),
        pair: ticker.pair.clone(),
        kind: SignalKind::Stability,
        signal_number: 1,
        price: ticker.last_price,
        percentage: ticker.change_pct,
        initial_percentage: ticker.change_pct,
        previous_percentage: ticker.change_pct,
        volume_24h: ticker.quote_volume,
        volume_category: category,
        trades_history: Vec::new(),
        cash_5min: 0.0,
        created_at: now,
    }
}

pub struct StabilityDetector {
    cooldown_secs: i64,
    low_volume_threshold: f64,
    medium_volume_threshold: f64,
    /// Symbol → time of the last delivered stability alert
    last_alert: HashMap<String, i64>,
}

impl StabilityDetector {
    pub fn new(cooldown_secs: u64, low_volume_threshold: f64, medium_volume_threshold: f64) -> Self {
        Self {
            cooldown_secs: cooldown_secs as i64,
            low_volume_threshold,
            medium_volume_threshold,
            last_alert: HashMap::new(),
        }
    }

    pub fn from_config(config: &ScannerConfig) -> Self {
        Self::new(
            config.stability_cooldown_secs,
            config.low_volume_threshold,
            config.medium_volume_threshold,
        )
    }

    fn in_cooldown(&self, symbol: &str, now: i64) -> bool {
        self.cooldown_secs > 0
            && self
                .last_alert
                .get(symbol)
                .map(|at| now - at < self.cooldown_secs)
                .unwrap_or(false)
    }

    /// Tickers worth fetching candles for
    pub fn candidates<'a>(&self, snapshot: &'a [TickerSnapshot], now: i64) -> Vec<&'a TickerSnapshot> {
        snapshot
            .iter()
            .filter(|t| t.change_pct >= STABILITY_MIN_CHANGE)
            .filter(|t| !self.in_cooldown(&t.symbol, now))
            .collect()
    }

    /// Run one stability pass
    ///
    /// # Returns
    /// Number of alerts delivered
    pub async fn run(
        &mut self,
        snapshot: &[TickerSnapshot],
        market: &dyn MarketDataSource,
        sink: &SignalSink,
        now: i64,
    ) -> usize {
        let candidates = self.candidates(snapshot, now);
        let mut sent = 0;

        for ticker in candidates {
            let candles = match market
                .get_candles(&ticker.pair, STABILITY_CANDLE_INTERVAL, STABILITY_CANDLES)
                .await
            {
                Ok(candles) => candles,
                Err(e) => {
                    log::warn!("⚠️  Candle fetch failed for {}: {}", ticker.pair, e);
                    continue;
                }
            };

            if !is_stable(&candles) {
                continue;
            }

            let category = VolumeCategory::classify(
                ticker.quote_volume,
                self.low_volume_threshold,
                self.medium_volume_threshold,
            );
            let text = format::stability_message(ticker, category);

            if sink.deliver(&stability_record(ticker, category, now), &text).await {
                self.last_alert.insert(ticker.symbol.clone(), now);
                sent += 1;
            }
        }

        sent
    }

    /// Forget cooldown entries that can no longer suppress anything
    pub fn prune(&mut self, now: i64) {
        let cooldown = self.cooldown_secs;
        self.last_alert.retain(|_, at| now - *at < cooldown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn flat_candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| Candle {
                timestamp: NOW - (i as i64) * 900,
                open: 100.0,
                high: 105.0,
                low: 100.0,
                close: 102.0,
                volume: 100.0,
            })
            .collect()
    }

    fn ticker(symbol: &str, change: f64) -> TickerSnapshot {
        TickerSnapshot {
            symbol: symbol.to_string(),
            pair: format!("{}_USDT", symbol),
            last_price: 1.0,
            change_pct: change,
            quote_volume: 10_000.0,
        }
    }

    #[test]
    fn test_exactly_95_flat_candles_is_stable() {
        assert!(is_stable(&flat_candles(95)));
    }

    #[test]
    fn test_94_candles_is_insufficient() {
        assert!(!is_stable(&flat_candles(94)));
        assert!(!is_stable(&[]));
    }

    #[test]
    fn test_single_violation_rejects() {
        let mut candles = flat_candles(95);
        candles[40].high = 119.0; // exactly 19%
        assert!(!is_stable(&candles));

        let mut candles = flat_candles(95);
        candles[40].high = 118.99;
        assert!(is_stable(&candles));
    }

    #[test]
    fn test_non_positive_low_rejects() {
        let mut candles = flat_candles(95);
        candles[0].low = 0.0;
        assert!(!is_stable(&candles));
    }

    #[test]
    fn test_candidates_fixed_threshold() {
        let detector = StabilityDetector::new(0, 100_000.0, 300_000.0);
        let snapshot = vec![ticker("AAA", 19.99), ticker("BBB", 20.0)];
        let symbols: Vec<&str> = detector
            .candidates(&snapshot, NOW)
            .iter()
            .map(|t| t.symbol.as_str())
            .collect();
        assert_eq!(symbols, vec!["BBB"]);
    }

    #[test]
    fn test_cooldown() {
        let mut detector = StabilityDetector::new(600, 100_000.0, 300_000.0);
        detector.last_alert.insert("BBB".to_string(), NOW);
        let snapshot = vec![ticker("BBB", 25.0)];

        assert!(detector.candidates(&snapshot, NOW + 599).is_empty());
        assert_eq!(detector.candidates(&snapshot, NOW + 600).len(), 1);

        detector.prune(NOW + 600);
        assert!(detector.last_alert.is_empty());
    }

    #[test]
    fn test_stability_record() {
        let record = stability_record(&ticker("FLAT", 22.0), VolumeCategory::Low, NOW);
        assert_eq!(record.kind, SignalKind::Stability);
        assert_eq!(record.signal_type(), "stability");
        assert_eq!(record.percentage, 22.0);
        assert!(record.trades_history.is_empty());
    }

    #[test]
    fn test_zero_cooldown_never_suppresses() {
        let mut detector = StabilityDetector::new(0, 100_000.0, 300_000.0);
        detector.last_alert.insert("BBB".to_string(), NOW);
        assert_eq!(detector.candidates(&[ticker("BBB", 25.0)], NOW).len(), 1);
    }
}
