pub mod card_detail;
pub mod cards;
pub mod dashboard;
pub mod stats;
pub mod study;

use chrono::DateTime;
use ratatui::style::Color;

/// Char-aware truncation with a trailing ellipsis.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

pub fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn format_date(date_str: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        dt.format("%b %d %H:%M").to_string()
    } else {
        date_str.chars().take(10).collect()
    }
}

/// Ten-cell bar for a 0-100 percentage.
pub fn percent_bar(percent: i64) -> String {
    let filled = (percent.clamp(0, 100) / 10) as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled))
}

pub fn rate_color(percent: i64) -> Color {
    if percent >= 70 {
        Color::Green
    } else if percent >= 40 {
        Color::Yellow
    } else {
        Color::Red
    }
}
