//! Signal delivery
//!
//! Two seams:
//! - [`Notifier`] delivers plain text to the user (Telegram in production).
//! - [`SignalObserver`] receives every successfully delivered
//!   [`SignalRecord`] (the SQLite signal log is one).
//!
//! [`SignalSink`] ties them together. A record is rendered once, sent once,
//! and only on a confirmed delivery is it handed to the observers. Observer
//! failures are logged and never change the delivery result.

use super::error::ScanError;
use super::format;
use super::types::SignalRecord;
use async_trait::async_trait;
use chrono::FixedOffset;
use std::sync::Arc;

/// Outbound text channel
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message
    ///
    /// Returns true only when the channel confirmed delivery. Network and
    /// API failures are reported as false, never raised.
    async fn send_message(&self, text: &str) -> bool;
}

/// Consumer of dispatched signals
pub trait SignalObserver: Send + Sync {
    fn on_signal(&self, record: &SignalRecord) -> Result<(), ScanError>;
}

/// Renders, delivers and fans out signal records
#[derive(Clone)]
pub struct SignalSink {
    notifier: Arc<dyn Notifier>,
    observers: Vec<Arc<dyn SignalObserver>>,
    offset: FixedOffset,
}

impl SignalSink {
    pub fn new(notifier: Arc<dyn Notifier>, offset: FixedOffset) -> Self {
        Self {
            notifier,
            observers: Vec::new(),
            offset,
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn SignalObserver>) {
        self.observers.push(observer);
    }

    pub fn with_observer(mut self, observer: Arc<dyn SignalObserver>) -> Self {
        self.add_observer(observer);
        self
    }

    pub fn display_offset(&self) -> FixedOffset {
        self.offset
    }

    /// Render and deliver a signal record
    ///
    /// # Returns
    /// true if the notifier confirmed delivery. Callers must only mutate
    /// tracker state on true.
    pub async fn dispatch(&self, record: &SignalRecord) -> bool {
        let text = format::signal_message(record, self.offset);
        self.deliver(record, &text).await
    }

    /// Deliver pre-rendered text for a record, then fan out on success
    pub async fn deliver(&self, record: &SignalRecord, text: &str) -> bool {
        if !self.notifier.send_message(text).await {
            log::warn!("⚠️  Delivery failed: {}", format::signal_label(record));
            return false;
        }

        log::info!("📨 Signal sent: {}", format::signal_label(record));
        self.notify_observers(record);
        true
    }

    /// Startup connectivity check
    ///
    /// Sends a short status message and reports whether it went through.
    pub async fn check_connectivity(&self, now: i64) -> bool {
        let text = format!(
            "🤖 Pump scanner started\n🕐 {} • Gate.io",
            format::clock(now, self.offset)
        );
        self.notifier.send_message(&text).await
    }

    fn notify_observers(&self, record: &SignalRecord) {
        for observer in &self.observers {
            if let Err(e) = observer.on_signal(record) {
                log::error!("❌ Signal observer failed for {}: {}", record.symbol, e);
            }
        }
    }
}
