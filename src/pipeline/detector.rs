//! First-signal detection over the latest snapshot

use super::config::ScannerConfig;
use super::market::MarketDataSource;
use super::notifier::SignalSink;
use super::stats;
use super::tracking::{TrackedCoin, TrackingTable};
use super::types::{SignalKind, SignalRecord, TickerSnapshot, VolumeCategory};

pub struct PumpDetector {
    initial_threshold: f64,
    low_volume_threshold: f64,
    medium_volume_threshold: f64,
    min_trade_amount: f64,
}

impl PumpDetector {
    pub fn new(
        initial_threshold: f64,
        low_volume_threshold: f64,
        medium_volume_threshold: f64,
        min_trade_amount: f64,
    ) -> Self {
        Self {
            initial_threshold,
            low_volume_threshold,
            medium_volume_threshold,
            min_trade_amount,
        }
    }

    pub fn from_config(config: &ScannerConfig) -> Self {
        Self::new(
            config.initial_pump_threshold,
            config.low_volume_threshold,
            config.medium_volume_threshold,
            config.min_trade_amount,
        )
    }

    /// Tickers that qualify for a first signal
    ///
    /// A ticker qualifies when its change is at or above the initial
    /// threshold and its symbol has no active episode. Inert entries left
    /// behind by the drop rule do not block a new episode.
    ///
    /// Returns candidates sorted by change, strongest first.
    pub fn find_candidates<'a>(
        &self,
        snapshot: &'a [TickerSnapshot],
        table: &TrackingTable,
    ) -> Vec<&'a TickerSnapshot> {
        let mut candidates: Vec<&TickerSnapshot> = snapshot
            .iter()
            .filter(|t| t.change_pct >= self.initial_threshold)
            .filter(|t| !table.has_active_episode(&t.symbol))
            .collect();
        candidates.sort_by(|a, b| b.change_pct.total_cmp(&a.change_pct));
        candidates
    }

    /// Build the first-signal record for a candidate
    pub fn build_record(
        &self,
        ticker: &TickerSnapshot,
        context: stats::TradeContext,
        now: i64,
    ) -> SignalRecord {
        SignalRecord {
            symbol: ticker.symbol.clone(),
            pair: ticker.pair.clone(),
            kind: SignalKind::New,
            signal_number: 1,
            price: ticker.last_price,
            percentage: ticker.change_pct,
            initial_percentage: ticker.change_pct,
            previous_percentage: ticker.change_pct,
            volume_24h: ticker.quote_volume,
            volume_category: VolumeCategory::classify(
                ticker.quote_volume,
                self.low_volume_threshold,
                self.medium_volume_threshold,
            ),
            trades_history: context.history,
            cash_5min: context.cash_5min,
            created_at: now,
        }
    }

    /// Run one detection pass
    ///
    /// A tracker is created only after the notifier confirms delivery. A
    /// failed delivery leaves the symbol untracked so the next pass retries.
    ///
    /// # Returns
    /// Number of first signals delivered
    pub async fn run(
        &self,
        snapshot: &[TickerSnapshot],
        table: &mut TrackingTable,
        market: &dyn MarketDataSource,
        sink: &SignalSink,
        now: i64,
    ) -> usize {
        let candidates = self.find_candidates(snapshot, table);
        if candidates.is_empty() {
            return 0;
        }

        log::info!("🔍 {} pump candidate(s)", candidates.len());

        let mut sent = 0;
        for ticker in candidates {
            // Same symbol listed twice in one snapshot
            if table.has_active_episode(&ticker.symbol) {
                continue;
            }

            log::info!(
                "   ├─ {} {:+.2}% (vol {:.0})",
                ticker.symbol,
                ticker.change_pct,
                ticker.quote_volume
            );

            let context = stats::collect_trade_context(
                market,
                &ticker.pair,
                now,
                self.min_trade_amount,
                sink.display_offset(),
            )
            .await;
            let record = self.build_record(ticker, context, now);

            if sink.dispatch(&record).await {
                table.start_episode(TrackedCoin::new_episode(
                    &ticker.symbol,
                    &ticker.pair,
                    ticker.last_price,
                    ticker.change_pct,
                    ticker.quote_volume,
                    now,
                ));
                sent += 1;
            }
        }

        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn ticker(symbol: &str, change: f64) -> TickerSnapshot {
        TickerSnapshot {
            symbol: symbol.to_string(),
            pair: format!("{}_USDT", symbol),
            last_price: 1.0,
            change_pct: change,
            quote_volume: 50_000.0,
        }
    }

    fn detector() -> PumpDetector {
        PumpDetector::from_config(&ScannerConfig::default())
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let snapshot = vec![ticker("AAA", 34.99), ticker("BBB", 35.0), ticker("CCC", 80.0)];
        let table = TrackingTable::new();

        let candidates = detector().find_candidates(&snapshot, &table);
        let symbols: Vec<&str> = candidates.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["CCC", "BBB"]);
    }

    #[test]
    fn test_active_episode_blocks_candidate() {
        let snapshot = vec![ticker("XYZ", 50.0)];
        let mut table = TrackingTable::new();
        table.start_episode(TrackedCoin::new_episode("XYZ", "XYZ_USDT", 1.0, 40.0, 0.0, NOW));

        assert!(detector().find_candidates(&snapshot, &table).is_empty());

        table.stop_following("XYZ");
        assert_eq!(detector().find_candidates(&snapshot, &table).len(), 1);
    }

    #[test]
    fn test_build_record() {
        let record = detector().build_record(
            &ticker("XYZ", 40.0),
            stats::TradeContext {
                history: vec!["line".to_string()],
                cash_5min: 1234.0,
            },
            NOW,
        );

        assert_eq!(record.kind, SignalKind::New);
        assert_eq!(record.signal_number, 1);
        assert_eq!(record.signal_type(), "new");
        assert_eq!(record.initial_percentage, 40.0);
        assert_eq!(record.previous_percentage, 40.0);
        assert_eq!(record.volume_category, VolumeCategory::Low);
        assert_eq!(record.trades_history, vec!["line"]);
        assert_eq!(record.cash_5min, 1234.0);
        assert_eq!(record.created_at, NOW);
    }
}
