//! Gate.io spot REST integration
//!
//! Implements [`MarketDataSource`] against the public v4 API:
//! - `GET /spot/tickers` - all tickers (or one with `currency_pair`)
//! - `GET /spot/trades` - recent trades
//! - `GET /spot/candlesticks` - OHLCV rows
//!
//! Gate.io encodes numbers as strings. Every batch is decoded item by item:
//! an item with a missing or unparseable field is logged and skipped, the
//! rest of the batch is kept.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let client = GateioClient::new("https://api.gateio.ws/api/v4", blocklist)?;
//! let tickers = client.get_all_tickers().await?;
//! ```

use super::blocklist::Blocklist;
use super::error::ScanError;
use super::market::MarketDataSource;
use super::types::{Candle, TickerDetail, TickerSnapshot, Trade};
use async_trait::async_trait;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Per-request timeout for every exchange call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Number that may arrive as a JSON string or a JSON number
fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(f64),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s.trim().parse::<f64>().map_err(de::Error::custom)?,
        Raw::Number(n) => n,
    };
    if value.is_finite() {
        Ok(value)
    } else {
        Err(de::Error::custom("non-finite number"))
    }
}

/// `/spot/tickers` item
#[derive(Debug, Clone, Deserialize)]
pub struct GateTicker {
    pub currency_pair: String,
    #[serde(deserialize_with = "number")]
    pub last: f64,
    #[serde(rename = "change_percentage", deserialize_with = "number")]
    pub change_pct: f64,
    /// Absent volume is reported as zero
    #[serde(default, deserialize_with = "number")]
    pub quote_volume: f64,
}

impl From<GateTicker> for TickerDetail {
    fn from(ticker: GateTicker) -> Self {
        TickerDetail {
            pair: ticker.currency_pair,
            last_price: ticker.last,
            change_pct: ticker.change_pct,
            quote_volume: ticker.quote_volume,
        }
    }
}

/// `/spot/trades` item
#[derive(Debug, Clone, Deserialize)]
pub struct GateTrade {
    #[serde(deserialize_with = "number")]
    pub create_time: f64,
    #[serde(deserialize_with = "number")]
    pub price: f64,
    #[serde(deserialize_with = "number")]
    pub amount: f64,
}

/// First six columns of a `/spot/candlesticks` row: `[t, quote_volume, close, high, low, open]`
#[derive(Debug, Clone, Deserialize)]
struct GateCandleRow(
    #[serde(deserialize_with = "number")] f64,
    #[serde(deserialize_with = "number")] f64,
    #[serde(deserialize_with = "number")] f64,
    #[serde(deserialize_with = "number")] f64,
    #[serde(deserialize_with = "number")] f64,
    #[serde(deserialize_with = "number")] f64,
);

const CANDLE_COLUMNS: usize = 6;

/// Gate.io REST client
pub struct GateioClient {
    http: reqwest::Client,
    base_url: String,
    blocklist: Blocklist,
}

impl GateioClient {
    /// Create a client with the fixed request timeout
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. `https://api.gateio.ws/api/v4`
    /// * `blocklist` - quote-currency and symbol filter applied to all-tickers
    pub fn new(base_url: &str, blocklist: Blocklist) -> Result<Self, ScanError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ScanError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            blocklist,
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ScanError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).query(query).send().await?;

        if !response.status().is_success() {
            return Err(ScanError::TransientFetch(format!(
                "Gate.io API error on {}: {}",
                path,
                response.status()
            )));
        }

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl MarketDataSource for GateioClient {
    async fn get_all_tickers(&self) -> Result<Vec<TickerSnapshot>, ScanError> {
        let body = self.get_json("/spot/tickers", &[]).await?;
        Ok(parse_tickers(body, &self.blocklist))
    }

    async fn get_ticker_detail(&self, pair: &str) -> Result<Option<TickerDetail>, ScanError> {
        let body = self
            .get_json("/spot/tickers", &[("currency_pair", pair.to_string())])
            .await?;

        let Value::Array(items) = body else {
            return Err(ScanError::MalformedData("expected a JSON array".into()));
        };
        match items.into_iter().next() {
            Some(item) => parse_ticker_detail(item).map(Some),
            None => Ok(None),
        }
    }

    async fn get_trade_history(&self, pair: &str, limit: usize) -> Result<Vec<Trade>, ScanError> {
        let body = self
            .get_json(
                "/spot/trades",
                &[("currency_pair", pair.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(parse_trades(body))
    }

    async fn get_candles(
        &self,
        pair: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, ScanError> {
        let body = self
            .get_json(
                "/spot/candlesticks",
                &[
                    ("currency_pair", pair.to_string()),
                    ("interval", interval.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(parse_candles(body))
    }
}

/// Decode every item of an array body, skipping the ones that fail
fn decode_items<T: DeserializeOwned>(body: Value, what: &str) -> Vec<T> {
    let Value::Array(items) = body else {
        log::warn!("⚠️  {} response is not an array", what);
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                log::debug!("Skipping {} item: {}", what, e);
                None
            }
        })
        .collect()
}

/// Decode the all-tickers response, applying the blocklist
///
/// Non-array bodies yield an empty snapshot.
pub fn parse_tickers(body: Value, blocklist: &Blocklist) -> Vec<TickerSnapshot> {
    decode_items::<GateTicker>(body, "tickers")
        .into_iter()
        .filter_map(|ticker| {
            let symbol = blocklist.admit(&ticker.currency_pair)?.to_string();
            Some(TickerSnapshot {
                symbol,
                pair: ticker.currency_pair,
                last_price: ticker.last,
                change_pct: ticker.change_pct,
                quote_volume: ticker.quote_volume,
            })
        })
        .collect()
}

/// Decode one ticker object
pub fn parse_ticker_detail(item: Value) -> Result<TickerDetail, ScanError> {
    let ticker: GateTicker = serde_json::from_value(item)?;
    Ok(ticker.into())
}

/// Decode the trades response
pub fn parse_trades(body: Value) -> Vec<Trade> {
    decode_items::<GateTrade>(body, "trades")
        .into_iter()
        .map(|t| Trade {
            time: t.create_time as i64,
            price: t.price,
            amount: t.amount,
        })
        .collect()
}

/// Decode candlestick rows
///
/// Columns past the sixth (base volume, window-closed flag) are ignored. A
/// row that is short or has an unparseable column is dropped, so the
/// returned set can be shorter than requested.
pub fn parse_candles(body: Value) -> Vec<Candle> {
    decode_items::<Vec<Value>>(body, "candles")
        .into_iter()
        .filter_map(|mut cols| {
            if cols.len() < CANDLE_COLUMNS {
                log::debug!("Skipping candle: short row");
                return None;
            }
            cols.truncate(CANDLE_COLUMNS);

            match serde_json::from_value::<GateCandleRow>(Value::Array(cols)) {
                Ok(GateCandleRow(t, volume, close, high, low, open)) => Some(Candle {
                    timestamp: t as i64,
                    open,
                    high,
                    low,
                    close,
                    volume,
                }),
                Err(e) => {
                    log::debug!("Skipping candle: {}", e);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blocklist() -> Blocklist {
        Blocklist::new(["USDC", "BULL"], "USDT")
    }

    #[test]
    fn test_parse_tickers_filters_and_skips_malformed() {
        let body = json!([
            {"currency_pair": "XYZ_USDT", "last": "0.0123", "change_percentage": "40.5", "quote_volume": "50000"},
            {"currency_pair": "XYZ_BTC", "last": "0.1", "change_percentage": "90", "quote_volume": "1"},
            {"currency_pair": "USDC_USDT", "last": "1", "change_percentage": "0.1", "quote_volume": "9"},
            {"currency_pair": "ETHBULL_USDT", "last": "1", "change_percentage": "50", "quote_volume": "9"},
            {"currency_pair": "BAD_USDT", "last": "n/a", "change_percentage": "50", "quote_volume": "9"},
            {"last": "1"},
            {"currency_pair": "ABC_USDT", "last": 2.5, "change_percentage": "-3"}
        ]);

        let tickers = parse_tickers(body, &blocklist());
        assert_eq!(tickers.len(), 2);

        assert_eq!(tickers[0].symbol, "XYZ");
        assert_eq!(tickers[0].pair, "XYZ_USDT");
        assert_eq!(tickers[0].last_price, 0.0123);
        assert_eq!(tickers[0].change_pct, 40.5);
        assert_eq!(tickers[0].quote_volume, 50_000.0);

        assert_eq!(tickers[1].symbol, "ABC");
        assert_eq!(tickers[1].quote_volume, 0.0);
    }

    #[test]
    fn test_parse_tickers_non_array() {
        assert!(parse_tickers(json!({"label": "ERR"}), &blocklist()).is_empty());
    }

    #[test]
    fn test_parse_ticker_detail_missing_change() {
        let err = parse_ticker_detail(json!({"currency_pair": "XYZ_USDT", "last": "1"})).unwrap_err();
        assert!(matches!(err, ScanError::MalformedData(_)));
    }

    #[test]
    fn test_parse_trades() {
        let body = json!([
            {"id": "1", "create_time": "1700000000", "price": "0.5", "amount": "300"},
            {"id": "2", "create_time": "1700000010", "price": "oops", "amount": "1"},
            {"id": "3", "create_time": "1700000020", "price": "0.6", "amount": "10"}
        ]);

        let trades = parse_trades(body);
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].time, 1_700_000_000);
        assert_eq!(trades[0].value(), 150.0);
        assert_eq!(trades[1].price, 0.6);
    }

    #[test]
    fn test_parse_candles() {
        let body = json!([
            ["1700000000", "1000.5", "1.05", "1.10", "1.00", "1.02", "950", "true"],
            ["1700000900", "900"],
            ["1700001800", "800", "1.0", "x", "0.9", "0.95"]
        ]);

        let candles = parse_candles(body);
        assert_eq!(candles.len(), 1);
        let c = &candles[0];
        assert_eq!(c.timestamp, 1_700_000_000);
        assert_eq!(c.volume, 1000.5);
        assert_eq!(c.close, 1.05);
        assert_eq!(c.high, 1.10);
        assert_eq!(c.low, 1.00);
        assert_eq!(c.open, 1.02);
    }

    #[test]
    fn test_gate_ticker_accepts_strings_and_numbers() {
        let ticker: GateTicker = serde_json::from_value(json!({
            "currency_pair": "XYZ_USDT",
            "last": 0.5,
            "change_percentage": " 12.5 ",
            "quote_volume": "1e3",
            "high_24h": "0.6"
        }))
        .unwrap();
        assert_eq!(ticker.last, 0.5);
        assert_eq!(ticker.change_pct, 12.5);
        assert_eq!(ticker.quote_volume, 1000.0);

        let err = serde_json::from_value::<GateTicker>(json!({
            "currency_pair": "XYZ_USDT", "last": "NaN", "change_percentage": "1"
        }));
        assert!(err.is_err());
    }

    #[test]
    fn test_one_bad_candle_row_shortens_the_set() {
        let mut rows: Vec<Value> = (0..95)
            .map(|i| json!([(1_700_000_000 + i * 900).to_string(), "10", "101", "104", "100", "100", "0.1", "true"]))
            .collect();
        rows[50] = json!(["1700045000", "10", "101", "n/a", "100", "100"]);

        let candles = parse_candles(Value::Array(rows));
        assert_eq!(candles.len(), 94);
        assert!(!crate::pipeline::stability::is_stable(&candles));
    }

    #[tokio::test]
    #[ignore] // Run only when testing with live API
    async fn test_fetch_live_tickers() {
        let client = GateioClient::new("https://api.gateio.ws/api/v4", blocklist()).unwrap();
        let tickers = client.get_all_tickers().await.unwrap();
        assert!(!tickers.is_empty());
        assert!(tickers.iter().all(|t| t.pair.ends_with("_USDT")));
    }
}
