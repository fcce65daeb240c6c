//! Error taxonomy for the scanning pipeline
//!
//! - `TransientFetch`: network/timeout talking to the exchange or notifier.
//!   The current step is skipped; the next tick retries.
//! - `MalformedData`: one item of a batch could not be parsed. The item is
//!   skipped, the batch continues.
//! - `Configuration`: invalid settings at startup. Fatal.
//! - `Database`: signal log failures (observer side, never fatal to the loop).
//! - `Io`: schema files could not be read at startup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("transient fetch error: {0}")]
    TransientFetch(String),

    #[error("malformed data: {0}")]
    MalformedData(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ScanError::TransientFetch(_))
    }
}

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        // Body decode failures mean the exchange answered with something we
        // cannot read; everything else is connectivity.
        if err.is_decode() {
            ScanError::MalformedData(err.to_string())
        } else {
            ScanError::TransientFetch(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        ScanError::MalformedData(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_is_malformed() {
        let err: ScanError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, ScanError::MalformedData(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_display() {
        let err = ScanError::Configuration("DROP_THRESHOLD must be below INITIAL_PUMP_THRESHOLD".into());
        assert!(err.to_string().starts_with("configuration error"));
    }
}
