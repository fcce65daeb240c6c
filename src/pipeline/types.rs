//! Core data types for the scanning pipeline
//!
//! Everything here is plain data: snapshots come in from a
//! [`MarketDataSource`](super::market::MarketDataSource), signal records go
//! out through a [`SignalSink`](super::notifier::SignalSink).

use serde::{Deserialize, Serialize};

/// One ticker row from the latest all-tickers snapshot
///
/// Already filtered to the configured quote currency and blacklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSnapshot {
    /// Base symbol (e.g. `XYZ` for `XYZ_USDT`)
    pub symbol: String,
    /// Exchange currency pair (e.g. `XYZ_USDT`)
    pub pair: String,
    pub last_price: f64,
    /// 24h change in percent (35.0 == +35%)
    pub change_pct: f64,
    /// 24h volume in quote currency
    pub quote_volume: f64,
}

/// Fresh ticker data for a single pair (follow-up checks)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerDetail {
    pub pair: String,
    pub last_price: f64,
    pub change_pct: f64,
    pub quote_volume: f64,
}

/// Executed trade from the exchange trade history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unix timestamp (seconds)
    pub time: i64,
    pub price: f64,
    pub amount: f64,
}

impl Trade {
    /// Trade value in quote currency (price × amount)
    pub fn value(&self) -> f64 {
        self.price * self.amount
    }
}

/// OHLCV candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Candle open time, Unix seconds
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Intracandle range in percent: (high - low) / low * 100
    ///
    /// Returns `None` when `low` is not positive (range undefined).
    pub fn range_pct(&self) -> Option<f64> {
        if self.low <= 0.0 {
            return None;
        }
        Some((self.high - self.low) / self.low * 100.0)
    }
}

/// Volume classification used in message headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolumeCategory {
    Low,
    Medium,
    High,
}

impl VolumeCategory {
    /// Classify a 24h quote volume against the configured thresholds
    ///
    /// `< low` → Low, `< medium` → Medium, otherwise High.
    pub fn classify(volume: f64, low_threshold: f64, medium_threshold: f64) -> Self {
        if volume < low_threshold {
            VolumeCategory::Low
        } else if volume < medium_threshold {
            VolumeCategory::Medium
        } else {
            VolumeCategory::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeCategory::Low => "low",
            VolumeCategory::Medium => "medium",
            VolumeCategory::High => "high",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VolumeCategory::Low => "--- Low Volume ---",
            VolumeCategory::Medium => "--- Medium Volume ---",
            VolumeCategory::High => "--- High Volume ---",
        }
    }
}

/// Kind of emitted signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    /// First signal of an episode (signal_number == 1)
    New,
    /// Escalation re-alert (signal_number >= 2)
    FollowUp,
    /// Flat-then-breakout alert, never tracked
    Stability,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::New => "NEW",
            SignalKind::FollowUp => "FOLLOW_UP",
            SignalKind::Stability => "STABILITY",
        }
    }
}

/// Ordinal label for a signal number (`new`, `second`, ... `ninth`, `tenth+`)
pub fn signal_type_label(signal_number: u32) -> &'static str {
    const LABELS: [&str; 10] = [
        "", "new", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth",
    ];
    LABELS
        .get(signal_number as usize)
        .copied()
        .filter(|label| !label.is_empty())
        .unwrap_or("tenth+")
}

/// Immutable record of one dispatched signal
///
/// The same value is rendered into the outgoing message and handed to every
/// registered observer after a successful dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub symbol: String,
    pub pair: String,
    pub kind: SignalKind,
    /// 1 for the first signal of an episode, n+1 for escalations
    pub signal_number: u32,
    pub price: f64,
    /// Observed 24h change at dispatch time
    pub percentage: f64,
    pub initial_percentage: f64,
    /// Left side of the displayed "from → to" range
    pub previous_percentage: f64,
    pub volume_24h: f64,
    pub volume_category: VolumeCategory,
    pub trades_history: Vec<String>,
    pub cash_5min: f64,
    /// Unix seconds
    pub created_at: i64,
}

impl SignalRecord {
    pub fn signal_type(&self) -> &'static str {
        match self.kind {
            SignalKind::Stability => "stability",
            _ => signal_type_label(self.signal_number),
        }
    }
}
