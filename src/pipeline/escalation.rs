//! Follow-up checks on tracked episodes
//!
//! For every tracker whose follow-up is due, a fresh ticker is fetched and
//! one of three things happens:
//!
//! ```text
//! change < drop          → stop following (entry becomes inert)
//! change >= required(R)  → signal n + 1, tracker updated on delivery
//! otherwise              → hold
//! ```
//!
//! `last_scan_time` advances on every completed check. A failed fetch is
//! not a check: the tracker stays due and is retried on the next tick.

use super::config::ScannerConfig;
use super::market::MarketDataSource;
use super::notifier::SignalSink;
use super::stats;
use super::thresholds::{self, LadderSteps};
use super::tracking::{TrackedCoin, TrackingTable};
use super::types::{SignalKind, SignalRecord, TickerDetail, VolumeCategory};

/// Outcome of evaluating one tracker against a fresh change percentage
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FollowUpDecision {
    Drop,
    Fire { required: f64 },
    Hold { required: f64 },
}

/// Counters of one follow-up pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EscalationSummary {
    pub checked: usize,
    pub escalated: usize,
    pub dropped: usize,
    /// Trackers whose ticker could not be fetched
    pub skipped: usize,
}

pub struct EscalationEngine {
    drop_threshold: f64,
    steps: LadderSteps,
    followup_interval_secs: u64,
    low_volume_threshold: f64,
    medium_volume_threshold: f64,
    min_trade_amount: f64,
}

impl EscalationEngine {
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            drop_threshold: config.drop_threshold,
            steps: LadderSteps::from_config(config),
            followup_interval_secs: config.followup_interval_secs,
            low_volume_threshold: config.low_volume_threshold,
            medium_volume_threshold: config.medium_volume_threshold,
            min_trade_amount: config.min_trade_amount,
        }
    }

    /// Decide what a fresh change percentage means for a tracker
    pub fn evaluate(&self, coin: &TrackedCoin, change_pct: f64) -> FollowUpDecision {
        if change_pct < self.drop_threshold {
            return FollowUpDecision::Drop;
        }

        let required =
            thresholds::next_signal_threshold(coin.initial_percentage, coin.signal_count, self.steps);
        if change_pct >= required {
            FollowUpDecision::Fire { required }
        } else {
            FollowUpDecision::Hold { required }
        }
    }

    /// Build the escalation record for signal `signal_count + 1`
    ///
    /// The displayed range starts at the initial percentage for signal 2 and
    /// at the tracker's previous-signal percentage from signal 3 on.
    pub fn build_record(
        &self,
        coin: &TrackedCoin,
        detail: &TickerDetail,
        context: stats::TradeContext,
        now: i64,
    ) -> SignalRecord {
        let signal_number = coin.signal_count + 1;
        let previous_percentage = if signal_number >= 3 {
            coin.previous_signal_percentage
        } else {
            coin.initial_percentage
        };

        SignalRecord {
            symbol: coin.symbol.clone(),
            pair: coin.pair.clone(),
            kind: SignalKind::FollowUp,
            signal_number,
            price: detail.last_price,
            percentage: detail.change_pct,
            initial_percentage: coin.initial_percentage,
            previous_percentage,
            volume_24h: detail.quote_volume,
            volume_category: VolumeCategory::classify(
                detail.quote_volume,
                self.low_volume_threshold,
                self.medium_volume_threshold,
            ),
            trades_history: context.history,
            cash_5min: context.cash_5min,
            created_at: now,
        }
    }

    /// Run follow-up checks for every due tracker
    pub async fn run(
        &self,
        table: &mut TrackingTable,
        market: &dyn MarketDataSource,
        sink: &SignalSink,
        now: i64,
    ) -> EscalationSummary {
        let mut summary = EscalationSummary::default();

        for symbol in table.due_for_followup(now, self.followup_interval_secs) {
            let Some(pair) = table.get(&symbol).map(|c| c.pair.clone()) else {
                continue;
            };

            let detail = match market.get_ticker_detail(&pair).await {
                Ok(Some(detail)) => detail,
                Ok(None) => {
                    log::debug!("No ticker for {}, retrying next tick", pair);
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => {
                    log::warn!("⚠️  Follow-up fetch failed for {}: {}", pair, e);
                    summary.skipped += 1;
                    continue;
                }
            };

            summary.checked += 1;
            let Some(coin) = table.get_mut(&symbol) else {
                continue;
            };
            coin.last_scan_time = now;
            coin.volume_24h = detail.quote_volume;

            match self.evaluate(coin, detail.change_pct) {
                FollowUpDecision::Drop => {
                    log::info!(
                        "📉 {} dropped to {:.2}% (< {:.2}%), no longer following",
                        symbol,
                        detail.change_pct,
                        self.drop_threshold
                    );
                    table.stop_following(&symbol);
                    summary.dropped += 1;
                }
                FollowUpDecision::Hold { required } => {
                    log::debug!(
                        "{} at {:.2}%, next signal at {:.2}%",
                        symbol,
                        detail.change_pct,
                        required
                    );
                }
                FollowUpDecision::Fire { required } => {
                    log::info!(
                        "🎯 {} signal {} triggered ({:.2}% >= {:.2}%)",
                        symbol,
                        coin.signal_count + 1,
                        detail.change_pct,
                        required
                    );

                    let context = stats::collect_trade_context(
                        market,
                        &pair,
                        now,
                        self.min_trade_amount,
                        sink.display_offset(),
                    )
                    .await;
                    let record = self.build_record(coin, &detail, context, now);

                    if sink.dispatch(&record).await {
                        coin.record_escalation(detail.last_price, detail.change_pct, now);
                        summary.escalated += 1;
                    }
                }
            }
        }

        summary
    }
}
