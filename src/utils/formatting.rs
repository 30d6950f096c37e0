use chrono::{DateTime, Local, TimeZone};

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Renders a Slack `<seconds>.<micros>` timestamp in local time.
/// Unparseable input is returned as-is.
pub fn format_slack_ts(ts: &str) -> String {
    let seconds = ts.split('.').next().unwrap_or_default();
    match seconds.parse::<i64>() {
        Ok(seconds) => format_unix(seconds).unwrap_or_else(|| ts.to_string()),
        Err(_) => ts.to_string(),
    }
}

pub fn format_unix(seconds: i64) -> Option<String> {
    DateTime::from_timestamp(seconds, 0)
        .map(|utc| Local.from_utc_datetime(&utc.naive_utc()))
        .map(|local| local.format(DISPLAY_FORMAT).to_string())
}

/// Flattens newlines and cuts to `max` characters, ending in `...` when cut.
pub fn truncate_text(text: &str, max: usize) -> String {
    let flat = text.replace(['\r', '\n'], " ");
    if flat.chars().count() <= max {
        return flat;
    }
    if max <= 3 {
        return flat.chars().take(max).collect();
    }
    let mut out: String = flat.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

pub fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
