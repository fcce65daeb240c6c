//! Scanner configuration from environment variables
//!
//! Built once at startup and passed by reference into every component.
//! Nothing in the pipeline reads the environment on its own.

use super::error::ScanError;
use chrono::FixedOffset;
use std::env;
use std::str::FromStr;

/// Default symbol patterns excluded from scanning (stablecoins, leveraged tokens)
pub const DEFAULT_BLACKLIST: &[&str] = &[
    "USDT", "USDC", "BUSD", "DAI", "3S", "3L", "5S", "5L", "BEAR", "BULL",
];

/// Configuration for the scanner runtime
///
/// Loaded from environment variables with the bot's historical defaults.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Main scan (and stability scan) cadence in seconds
    pub scan_interval_secs: u64,

    /// Minimum seconds between follow-up checks of one tracker
    pub followup_interval_secs: u64,

    /// 24h change (%) that opens a new episode
    pub initial_pump_threshold: f64,

    /// Extra change (%) over the initial level required for signal 2
    pub second_signal_threshold: f64,

    /// Step (%) per signal beyond the second, and the <100% ladder step
    pub next_signal_threshold: f64,

    /// 24h change (%) below which a tracker stops following
    pub drop_threshold: f64,

    /// Quote volume below this is "low"
    pub low_volume_threshold: f64,

    /// Quote volume below this (and >= low) is "medium"
    pub medium_volume_threshold: f64,

    /// Minimum trade value shown in the trade-history excerpt
    pub min_trade_amount: f64,

    /// Case-insensitive symbol substrings excluded from every snapshot
    pub blacklist: Vec<String>,

    /// Quote currency of scanned pairs (`XYZ_<quote>`)
    pub quote_currency: String,

    /// Gate.io REST base URL
    pub gateio_base_url: String,

    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,

    /// Fixed UTC offset used only when rendering timestamps in messages
    pub display_utc_offset_hours: i32,

    /// Per-symbol quiet period after a stability alert (0 = alert every pass)
    pub stability_cooldown_secs: u64,

    /// Path to the SQLite signal log
    pub db_path: String,

    /// Directory containing `*.sql` schema files
    pub schema_dir: String,

    /// How often the runtime logs aggregate stats
    pub status_log_interval_secs: u64,

    /// Keys that were set but failed to parse; [`validate`](Self::validate) rejects them
    pub unparseable: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Key lookup that remembers which values failed to parse
struct LookupReader<F> {
    lookup: F,
    unparseable: Vec<String>,
}

impl<F> LookupReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn text(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
    }

    fn parse<T: FromStr>(&mut self, key: &str, default: T) -> T {
        let Some(raw) = (self.lookup)(key) else {
            return default;
        };
        match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                self.unparseable.push(format!("{}={:?}", key, raw));
                default
            }
        }
    }
}

impl ScannerConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables (defaults in parentheses):
    /// - `SCAN_INTERVAL` (15), `FOLLOWUP_INTERVAL` (45)
    /// - `INITIAL_PUMP_THRESHOLD` (35), `SECOND_SIGNAL_THRESHOLD` (20),
    ///   `NEXT_SIGNAL_THRESHOLD` (10), `DROP_THRESHOLD` (25)
    /// - `LOW_VOLUME_THRESHOLD` (100000), `MEDIUM_VOLUME_THRESHOLD` (300000)
    /// - `MIN_TRADE_AMOUNT` (100)
    /// - `BLACKLISTED_PATTERNS` (comma-separated, see [`DEFAULT_BLACKLIST`])
    /// - `QUOTE_CURRENCY` (USDT), `GATEIO_BASE_URL`
    /// - `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_ID` (no default)
    /// - `DISPLAY_UTC_OFFSET_HOURS` (3)
    /// - `STABILITY_COOLDOWN_SECS` (0)
    /// - `PUMPWATCH_DB_PATH` (pumpwatch.db), `PUMPWATCH_SCHEMA_DIR` (sql)
    /// - `STATUS_LOG_INTERVAL` (300)
    ///
    /// Unparseable values are recorded in `unparseable` and keep the default
    /// only until [`validate`](Self::validate) rejects them; call it before
    /// starting the loop.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut reader = LookupReader {
            lookup,
            unparseable: Vec::new(),
        };

        let blacklist = reader
            .text("BLACKLISTED_PATTERNS")
            .map(|s| {
                s.split(',')
                    .map(|p| p.trim().to_uppercase())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| DEFAULT_BLACKLIST.iter().map(|p| p.to_string()).collect());

        Self {
            scan_interval_secs: reader.parse("SCAN_INTERVAL", 15),
            followup_interval_secs: reader.parse("FOLLOWUP_INTERVAL", 45),
            initial_pump_threshold: reader.parse("INITIAL_PUMP_THRESHOLD", 35.0),
            second_signal_threshold: reader.parse("SECOND_SIGNAL_THRESHOLD", 20.0),
            next_signal_threshold: reader.parse("NEXT_SIGNAL_THRESHOLD", 10.0),
            drop_threshold: reader.parse("DROP_THRESHOLD", 25.0),
            low_volume_threshold: reader.parse("LOW_VOLUME_THRESHOLD", 100_000.0),
            medium_volume_threshold: reader.parse("MEDIUM_VOLUME_THRESHOLD", 300_000.0),
            min_trade_amount: reader.parse("MIN_TRADE_AMOUNT", 100.0),
            blacklist,
            quote_currency: reader
                .text("QUOTE_CURRENCY")
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "USDT".to_string()),
            gateio_base_url: reader
                .text("GATEIO_BASE_URL")
                .unwrap_or_else(|| "https://api.gateio.ws/api/v4".to_string()),
            telegram_bot_token: reader.text("TELEGRAM_BOT_TOKEN").filter(|s| !s.is_empty()),
            telegram_chat_id: reader.text("TELEGRAM_CHAT_ID").filter(|s| !s.is_empty()),
            display_utc_offset_hours: reader.parse("DISPLAY_UTC_OFFSET_HOURS", 3),
            stability_cooldown_secs: reader.parse("STABILITY_COOLDOWN_SECS", 0),
            db_path: reader.text("PUMPWATCH_DB_PATH").unwrap_or_else(|| "pumpwatch.db".to_string()),
            schema_dir: reader.text("PUMPWATCH_SCHEMA_DIR").unwrap_or_else(|| "sql".to_string()),
            status_log_interval_secs: reader.parse("STATUS_LOG_INTERVAL", 300),
            unparseable: reader.unparseable,
        }
    }

    /// Reject configurations the scanner cannot run with
    pub fn validate(&self) -> Result<(), ScanError> {
        if !self.unparseable.is_empty() {
            return Err(ScanError::Configuration(format!(
                "unparseable values for: {}",
                self.unparseable.join(", ")
            )));
        }

        if self.scan_interval_secs == 0 || self.followup_interval_secs == 0 {
            return Err(ScanError::Configuration(
                "SCAN_INTERVAL and FOLLOWUP_INTERVAL must be positive".into(),
            ));
        }

        let thresholds = [
            ("INITIAL_PUMP_THRESHOLD", self.initial_pump_threshold),
            ("SECOND_SIGNAL_THRESHOLD", self.second_signal_threshold),
            ("NEXT_SIGNAL_THRESHOLD", self.next_signal_threshold),
            ("DROP_THRESHOLD", self.drop_threshold),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value <= 0.0 {
                return Err(ScanError::Configuration(format!(
                    "{} must be a positive percentage (got {})",
                    name, value
                )));
            }
        }

        if self.drop_threshold >= self.initial_pump_threshold {
            return Err(ScanError::Configuration(format!(
                "DROP_THRESHOLD ({}) must be below INITIAL_PUMP_THRESHOLD ({})",
                self.drop_threshold, self.initial_pump_threshold
            )));
        }

        if !(self.low_volume_threshold < self.medium_volume_threshold) {
            return Err(ScanError::Configuration(format!(
                "LOW_VOLUME_THRESHOLD ({}) must be below MEDIUM_VOLUME_THRESHOLD ({})",
                self.low_volume_threshold, self.medium_volume_threshold
            )));
        }

        if self.min_trade_amount < 0.0 {
            return Err(ScanError::Configuration("MIN_TRADE_AMOUNT must not be negative".into()));
        }

        self.display_offset()?;
        Ok(())
    }

    /// Display timezone for message timestamps
    pub fn display_offset(&self) -> Result<FixedOffset, ScanError> {
        FixedOffset::east_opt(self.display_utc_offset_hours * 3600).ok_or_else(|| {
            ScanError::Configuration(format!(
                "DISPLAY_UTC_OFFSET_HOURS out of range: {}",
                self.display_utc_offset_hours
            ))
        })
    }
}
