use cadence_core::error::CoreError;
use cadence_core::timezone::parse_timezone;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Detect system timezone
pub fn detect_system_timezone() -> String {
    if let Ok(tz) = std::env::var("TZ") {
        if !tz.is_empty() && parse_timezone(&tz).is_ok() {
            return tz;
        }
    }

    if let Ok(tz) = iana_time_zone::get_timezone() {
        if parse_timezone(&tz).is_ok() {
            return tz;
        }
    }

    "UTC".to_string()
}

fn common_timezones() -> &'static [&'static str] {
    &[
        "UTC",
        "America/New_York",
        "America/Chicago",
        "America/Denver",
        "America/Los_Angeles",
        "America/Toronto",
        "America/Sao_Paulo",
        "Europe/London",
        "Europe/Paris",
        "Europe/Berlin",
        "Europe/Madrid",
        "Europe/Amsterdam",
        "Asia/Tokyo",
        "Asia/Shanghai",
        "Asia/Singapore",
        "Asia/Kolkata",
        "Asia/Dubai",
        "Australia/Sydney",
        "Pacific/Auckland",
    ]
}

/// Common zones whose name contains the input or one of its parts
pub fn suggest_timezone(invalid: &str) -> Vec<&'static str> {
    let invalid_lower = invalid.to_lowercase();
    let parts: Vec<&str> = invalid_lower
        .split(['/', '_', ' '])
        .filter(|part| part.len() >= 3)
        .collect();
    let mut matches: Vec<_> = common_timezones()
        .iter()
        .copied()
        .filter(|tz| {
            let tz_lower = tz.to_lowercase();
            tz_lower.contains(&invalid_lower) || parts.iter().any(|part| tz_lower.contains(part))
        })
        .collect();
    matches.truncate(5);
    matches
}

/// Convert user-friendly timezone input to a zone
pub fn normalize_timezone_input(input: &str) -> Result<Tz, CoreError> {
    if let Ok(tz) = parse_timezone(input) {
        return Ok(tz);
    }

    let alias = match input.to_lowercase().as_str() {
        "est" | "eastern" => "America/New_York",
        "cst" | "central" => "America/Chicago",
        "mst" | "mountain" => "America/Denver",
        "pst" | "pacific" => "America/Los_Angeles",
        "gmt" | "utc" => "UTC",
        "london" => "Europe/London",
        "cet" | "paris" => "Europe/Paris",
        "jst" | "tokyo" => "Asia/Tokyo",
        _ => {
            let suggestions = suggest_timezone(input);
            return Err(CoreError::InvalidTimezone(if suggestions.is_empty() {
                format!("'{}'. Use IANA names like 'America/New_York'", input)
            } else {
                format!("'{}'. Did you mean: {}?", input, suggestions.join(", "))
            }));
        }
    };
    parse_timezone(alias)
}

/// `2025-08-20 09:30 CEST`
pub fn format_local(datetime: DateTime<Utc>, timezone: &Tz) -> String {
    datetime.with_timezone(timezone).format("%Y-%m-%d %H:%M %Z").to_string()
}
