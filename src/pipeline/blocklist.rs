//! Symbol filtering applied to every ticker snapshot
//!
//! Two rules, both applied before any detector sees a ticker:
//! - the pair must be quoted in the configured currency (`XYZ_USDT`)
//! - the base symbol must not contain any blacklisted pattern
//!   (case-insensitive substring, e.g. `BULL` blocks `ETHBULL`)

use super::config::ScannerConfig;

/// Quote-currency + pattern filter
#[derive(Debug, Clone)]
pub struct Blocklist {
    /// Upper-cased patterns
    patterns: Vec<String>,
    /// Pair suffix including separator, e.g. `_USDT`
    quote_suffix: String,
}

impl Blocklist {
    pub fn new<I, S>(patterns: I, quote_currency: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().trim().to_uppercase())
                .filter(|p| !p.is_empty())
                .collect(),
            quote_suffix: format!("_{}", quote_currency.to_uppercase()),
        }
    }

    pub fn from_config(config: &ScannerConfig) -> Self {
        Self::new(&config.blacklist, &config.quote_currency)
    }

    /// Returns true if the symbol matches any blacklisted pattern
    pub fn is_blocked(&self, symbol: &str) -> bool {
        let upper = symbol.to_uppercase();
        self.patterns.iter().any(|p| upper.contains(p.as_str()))
    }

    /// Base symbol for a pair quoted in the configured currency
    ///
    /// Returns `None` for pairs in any other quote currency.
    pub fn symbol_for_pair<'a>(&self, pair: &'a str) -> Option<&'a str> {
        pair.strip_suffix(self.quote_suffix.as_str())
            .filter(|symbol| !symbol.is_empty())
    }

    /// Pair name for a base symbol
    pub fn pair_for_symbol(&self, symbol: &str) -> String {
        format!("{}{}", symbol, self.quote_suffix)
    }

    /// Combined check: returns the symbol if the pair should be scanned
    pub fn admit<'a>(&self, pair: &'a str) -> Option<&'a str> {
        self.symbol_for_pair(pair).filter(|symbol| !self.is_blocked(symbol))
    }
}
