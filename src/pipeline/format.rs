//! Message rendering
//!
//! The only place that knows about the display timezone. Detection and
//! tracking work on Unix seconds; the offset is applied here, at the
//! formatting boundary.

use super::stats::TradeHighlight;
use super::tracking::TrackedCoin;
use super::types::{SignalKind, SignalRecord, TickerSnapshot, VolumeCategory};
use chrono::{DateTime, FixedOffset, Utc};

const SEPARATOR: &str = "----------------------------";

/// Convert Unix seconds to the display timezone
pub fn to_display_time(timestamp: i64, offset: FixedOffset) -> DateTime<FixedOffset> {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .with_timezone(&offset)
}

/// `HH:MM:SS` in the display timezone
pub fn clock(timestamp: i64, offset: FixedOffset) -> String {
    to_display_time(timestamp, offset).format("%H:%M:%S").to_string()
}

/// Human-readable volume: `1.2M`, `350k`, `999`
pub fn format_volume(volume: f64) -> String {
    if volume >= 1_000_000.0 {
        format!("{:.1}M", volume / 1_000_000.0)
    } else if volume >= 1_000.0 {
        format!("{:.0}k", volume / 1_000.0)
    } else {
        format!("{:.0}", volume)
    }
}

/// Fixed-decimal number with `,` thousands separators
pub fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// Keycap emoji for a signal number; numbers >= 10 are rendered digit by digit
pub fn signal_number_emoji(signal_number: u32) -> String {
    const KEYCAPS: [&str; 10] = ["0️⃣", "1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣", "6️⃣", "7️⃣", "8️⃣", "9️⃣"];
    signal_number
        .to_string()
        .chars()
        .filter_map(|d| d.to_digit(10))
        .map(|d| KEYCAPS[d as usize])
        .collect()
}

/// Displayed percentage range of a signal
///
/// First signals show the change alone; later signals show
/// `from --> to` where `from` is the record's previous percentage.
pub fn percentage_line(record: &SignalRecord) -> String {
    if record.signal_number <= 1 {
        format!("Gain: %+{:.2}", record.percentage)
    } else {
        format!(
            "Gain: %+{:.2} --> %{:.2}",
            record.previous_percentage, record.percentage
        )
    }
}

/// Render the trade-history excerpt
///
/// Format: `dd.mm HH:MM    +value  before% => after% - V: % share`
pub fn trade_history_lines(highlights: &[TradeHighlight], offset: FixedOffset) -> Vec<String> {
    highlights
        .iter()
        .map(|h| {
            let at = to_display_time(h.time, offset);
            format!(
                "{}    +{}  {:.1}% => {:.1}% - V: % {:.1}",
                at.format("%d.%m %H:%M"),
                group_thousands(h.value, 2),
                h.before_change,
                h.after_change,
                h.share_pct
            )
        })
        .collect()
}

/// Full signal message for the notification channel
pub fn signal_message(record: &SignalRecord, offset: FixedOffset) -> String {
    let header = if record.signal_number <= 1 {
        format!("#{} • 🆕 Signal", record.symbol)
    } else {
        format!("#{} • {}. Signal", record.symbol, signal_number_emoji(record.signal_number))
    };

    let mut parts: Vec<String> = vec![
        record.volume_category.label().to_string(),
        String::new(),
        header,
        percentage_line(record),
    ];

    if record.signal_number > 1 {
        parts.push(format!("First Signal: %{:.2}", record.initial_percentage));
    }

    parts.extend([
        String::new(),
        format!("🎯 Price: ${:.8}", record.price),
        format!("💰 5m Cash: ${}", group_thousands(record.cash_5min, 0)),
        format!("📊 24h Volume: {}", format_volume(record.volume_24h)),
    ]);

    // Trade excerpt only for low/medium volume coins
    if record.volume_category != VolumeCategory::High {
        parts.push(String::new());
        parts.push(SEPARATOR.to_string());
        parts.extend(record.trades_history.iter().cloned());
    }

    parts.push(String::new());
    parts.push(format!("🕐 Analysis: {} • Gate.io", clock(record.created_at, offset)));

    parts.join("\n")
}

/// Flat-then-breakout alert text
pub fn stability_message(ticker: &TickerSnapshot, category: VolumeCategory) -> String {
    // 24h = 288 five-minute slots
    let volume_5m = ticker.quote_volume / 288.0;
    let category_name = match category {
        VolumeCategory::Low => "Low Volume",
        VolumeCategory::Medium => "Medium Volume",
        VolumeCategory::High => "High Volume",
    };

    [
        "🪤 STABILITY BREAKOUT DETECTED!".to_string(),
        String::new(),
        format!("#{} • STABILITY SIGNAL", ticker.symbol),
        "Unusual move after a flat period".to_string(),
        String::new(),
        "〰️ 24h Volatility: below 19%".to_string(),
        format!("🚀 Sudden Gain: {:.2}%", ticker.change_pct),
        format!("💰 Price: ${:.6}", ticker.last_price),
        format!("📊 5m Volume: ${}", group_thousands(volume_5m, 0)),
        format!("📈 24h Volume: ${}", group_thousands(ticker.quote_volume, 0)),
        format!("🏷️ Volume: {}", category_name),
        String::new(),
        "⚠️ This coin traded flat for the last 24 hours!".to_string(),
    ]
    .join("\n")
}

/// One-line summary of a tracker for the latest-signals listing
pub fn latest_signal_line(coin: &TrackedCoin, offset: FixedOffset) -> String {
    let marker = if coin.signal_count <= 1 {
        "🆕".to_string()
    } else {
        format!("{}.", signal_number_emoji(coin.signal_count))
    };
    format!(
        "{}  #{} • {} Signal - Gain: {:.1}% (first {:.1}%){}",
        clock(coin.last_signal_time, offset),
        coin.symbol,
        marker,
        coin.current_percentage,
        coin.initial_percentage,
        if coin.is_following { "" } else { " [dropped]" }
    )
}

/// Short label used in log lines
pub fn signal_label(record: &SignalRecord) -> String {
    match record.kind {
        SignalKind::Stability => format!("{} stability", record.symbol),
        _ => format!("{} #{} ({})", record.symbol, record.signal_number, record.signal_type()),
    }
}
