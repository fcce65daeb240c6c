//! Per-symbol tracker table
//!
//! One [`TrackedCoin`] per symbol, keyed by base symbol. The table is owned
//! by the scan loop; removals are always two-phase (collect keys, then
//! remove) so no entry is deleted while the map is being iterated.
//!
//! Lifecycle of an entry:
//! - created (or replaced) by the pump detector when a new episode starts
//! - mutated only by the escalation engine
//! - made inert (`is_following = false`) by the drop rule
//! - evicted by the 24h sweep, regardless of `is_following`

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Seconds after the last signal at which a tracker is evicted
pub const TRACKER_EXPIRY_SECS: i64 = 86_400;

/// State of one symbol's current (or last) pump episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedCoin {
    pub symbol: String,
    pub pair: String,
    /// Price at first detection
    pub base_price: f64,
    pub current_price: f64,
    /// 24h change at the first signal
    pub initial_percentage: f64,
    /// 24h change at the latest signal
    pub current_percentage: f64,
    /// 24h change at the signal before the latest one
    pub previous_signal_percentage: f64,
    /// Signals sent in this episode (>= 1)
    pub signal_count: u32,
    /// Unix seconds
    pub last_signal_time: i64,
    /// Unix seconds of the last follow-up check
    pub last_scan_time: i64,
    pub is_following: bool,
    pub volume_24h: f64,
}

impl TrackedCoin {
    /// Fresh episode after a successful first signal
    pub fn new_episode(
        symbol: &str,
        pair: &str,
        price: f64,
        percentage: f64,
        volume_24h: f64,
        now: i64,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            pair: pair.to_string(),
            base_price: price,
            current_price: price,
            initial_percentage: percentage,
            current_percentage: percentage,
            previous_signal_percentage: percentage,
            signal_count: 1,
            last_signal_time: now,
            last_scan_time: now,
            is_following: true,
            volume_24h,
        }
    }

    /// Record a successfully dispatched escalation signal
    pub fn record_escalation(&mut self, price: f64, percentage: f64, now: i64) {
        self.previous_signal_percentage = self.current_percentage;
        self.signal_count += 1;
        self.current_price = price;
        self.current_percentage = percentage;
        self.last_signal_time = now;
    }

    pub fn is_due_for_followup(&self, now: i64, followup_interval_secs: u64) -> bool {
        self.is_following && now - self.last_scan_time >= followup_interval_secs as i64
    }

    /// True once more than 24h have passed since the last signal
    pub fn is_expired(&self, now: i64) -> bool {
        now - self.last_signal_time > TRACKER_EXPIRY_SECS
    }
}

/// Aggregate view over the table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingStats {
    /// Entries with `is_following == true`
    pub active_tracking: usize,
    /// Entries currently in the table (active + inert)
    pub tracked: usize,
    /// Episodes started since the process began
    pub total_episodes: u64,
    /// Most recent `last_signal_time` in the table
    pub last_signal_time: Option<i64>,
}

/// Keyed store of trackers
#[derive(Debug, Clone, Default)]
pub struct TrackingTable {
    coins: HashMap<String, TrackedCoin>,
    total_episodes: u64,
}

impl TrackingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &str) -> Option<&TrackedCoin> {
        self.coins.get(symbol)
    }

    pub fn get_mut(&mut self, symbol: &str) -> Option<&mut TrackedCoin> {
        self.coins.get_mut(symbol)
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    /// True if the symbol is in an active (following) episode
    pub fn has_active_episode(&self, symbol: &str) -> bool {
        self.coins.get(symbol).map(|c| c.is_following).unwrap_or(false)
    }

    /// Start a new episode, replacing any inert entry for the symbol
    ///
    /// Re-arm semantics: a previous episode is never resumed, the new entry
    /// starts again at `signal_count == 1`.
    pub fn start_episode(&mut self, coin: TrackedCoin) {
        if let Some(previous) = self.coins.get(&coin.symbol) {
            log::debug!(
                "🔁 {} re-armed (previous episode ended at signal {})",
                coin.symbol,
                previous.signal_count
            );
        }
        self.coins.insert(coin.symbol.clone(), coin);
        self.total_episodes += 1;
    }

    /// Mark an episode as no longer followed
    ///
    /// Returns false if the symbol is not tracked.
    pub fn stop_following(&mut self, symbol: &str) -> bool {
        match self.coins.get_mut(symbol) {
            Some(coin) => {
                coin.is_following = false;
                true
            }
            None => false,
        }
    }

    /// Symbols whose follow-up check is due
    pub fn due_for_followup(&self, now: i64, followup_interval_secs: u64) -> Vec<String> {
        let mut due: Vec<String> = self
            .coins
            .values()
            .filter(|c| c.is_due_for_followup(now, followup_interval_secs))
            .map(|c| c.symbol.clone())
            .collect();
        due.sort();
        due
    }

    /// Evict every tracker silent for more than 24h
    ///
    /// Returns the evicted symbols.
    pub fn sweep_expired(&mut self, now: i64) -> Vec<String> {
        let expired: Vec<String> = self
            .coins
            .values()
            .filter(|c| c.is_expired(now))
            .map(|c| c.symbol.clone())
            .collect();

        for symbol in &expired {
            self.coins.remove(symbol);
        }

        expired
    }

    pub fn stats(&self) -> TrackingStats {
        TrackingStats {
            active_tracking: self.coins.values().filter(|c| c.is_following).count(),
            tracked: self.coins.len(),
            total_episodes: self.total_episodes,
            last_signal_time: self.coins.values().map(|c| c.last_signal_time).max(),
        }
    }

    /// Copy of every tracker, sorted by symbol
    pub fn snapshot(&self) -> Vec<TrackedCoin> {
        let mut coins: Vec<TrackedCoin> = self.coins.values().cloned().collect();
        coins.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        coins
    }

    pub fn signal_count_of(&self, symbol: &str) -> Option<u32> {
        self.coins.get(symbol).map(|c| c.signal_count)
    }
}
