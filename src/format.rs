//! Display formatting for the HUD and leaderboard panels

use chrono::DateTime;

/// Seconds as `m:ss`
pub fn format_duration(total_secs: u32) -> String {
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// `0x1234…abcd`, or `--` when absent
pub fn format_address(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => shorten(v, "…"),
        _ => "--".to_string(),
    }
}

/// `0x1234...abcd`, or empty when absent
pub fn format_tx_hash(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => shorten(v, "..."),
        _ => String::new(),
    }
}

/// Unix seconds as `yyyy-MM-dd HH:mm` (UTC); zero reads as `--`
pub fn format_timestamp(secs: u64) -> String {
    if secs == 0 {
        return "--".to_string();
    }
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "--".to_string())
}

fn shorten(value: &str, ellipsis: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 10 {
        return value.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, ellipsis, tail)
}
