use anyhow::{anyhow, Result};
use cadence_core::recurrence::{Pattern, RecurrenceRule, WeekdaySet};
use cadence_core::timezone::resolve_local;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_english::{parse_date_string, Dialect};
use chrono_tz::Tz;

use crate::cli::{RecurrenceArgs, RecurrenceShortcut};

/// Parse a natural-language date relative to now in `timezone`.
pub fn parse_due_date(date_str: &str, timezone: &Tz) -> Result<DateTime<Utc>> {
    let now = Utc::now().with_timezone(timezone);
    parse_date_string(date_str, now, Dialect::Us)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| anyhow!("Failed to parse due date '{}': {}", date_str, e))
}

/// Parse a time of day ("09:30", "9:30", "9:30 PM", "9pm") into `HH:MM`.
pub fn parse_time_of_day(input: &str) -> Result<String> {
    let compact = input.trim().to_uppercase().replace(' ', "");
    // "9PM" -> "9:00PM"
    let compact = if compact.contains(':') {
        compact
    } else {
        let split = compact
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(compact.len());
        format!("{}:00{}", &compact[..split], &compact[split..])
    };
    ["%H:%M", "%I:%M%p"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(&compact, format).ok())
        .map(|time| time.format("%H:%M").to_string())
        .ok_or_else(|| anyhow!("Failed to parse time '{}', expected e.g. '09:30' or '9:30 PM'", input))
}

/// Moves `due` to the local time of day `hh_mm` on the same local date.
pub fn apply_time_of_day(due: DateTime<Utc>, hh_mm: &str, timezone: &Tz) -> Result<DateTime<Utc>> {
    let time = NaiveTime::parse_from_str(hh_mm, "%H:%M")?;
    let date: NaiveDate = due.with_timezone(timezone).date_naive();
    Ok(resolve_local(timezone, date.and_time(time)))
}

fn parse_weekday(day: &str) -> Result<Weekday> {
    day.trim()
        .parse::<Weekday>()
        .map_err(|_| anyhow!("Unknown weekday '{}', expected mon,tue,wed,thu,fri,sat,sun", day.trim()))
}

/// Parse "mon,wed,fri" into a weekday set.
pub fn parse_weekdays(input: &str) -> Result<WeekdaySet> {
    let days = input
        .split(',')
        .filter(|day| !day.trim().is_empty())
        .map(parse_weekday)
        .collect::<Result<Vec<_>>>()?;
    Ok(WeekdaySet::from_weekdays(days)?)
}

/// Build a recurrence rule from command-line options. `None` when no
/// `--every` was given.
pub fn build_rule(args: &RecurrenceArgs, timezone: &Tz) -> Result<Option<RecurrenceRule>> {
    let Some(every) = args.every else {
        return Ok(None);
    };
    let interval = args.interval.unwrap_or(1);

    if args.on.is_some() && every != RecurrenceShortcut::Weekly {
        return Err(anyhow!("--on only applies to '--every weekly'"));
    }
    if args.day_of_month.is_some() && every != RecurrenceShortcut::Monthly {
        return Err(anyhow!("--day-of-month only applies to '--every monthly'"));
    }

    let pattern = match every {
        RecurrenceShortcut::Daily => Pattern::daily(interval)?,
        RecurrenceShortcut::Weekly => {
            Pattern::weekly(interval, args.on.as_deref().map(parse_weekdays).transpose()?)?
        }
        RecurrenceShortcut::Monthly => Pattern::monthly(interval, args.day_of_month)?,
        RecurrenceShortcut::Yearly => Pattern::yearly(interval)?,
        RecurrenceShortcut::Weekdays => Pattern::weekly(
            interval,
            Some(WeekdaySet::from_weekdays([
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ])?),
        )?,
        RecurrenceShortcut::Weekends => {
            Pattern::weekly(interval, Some(WeekdaySet::from_weekdays([Weekday::Sat, Weekday::Sun])?))?
        }
    };

    let mut rule = RecurrenceRule::new(pattern);
    if let Some(until) = &args.until {
        rule = rule.until(parse_due_date(until, timezone)?);
    }
    if let Some(count) = args.count {
        rule = rule.with_max_occurrences(count)?;
    }
    Ok(Some(rule))
}

/// One-line human description of a rule, e.g. "every 2 weeks on Mon, Thu".
pub fn describe_rule(rule: &RecurrenceRule) -> String {
    const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

    let unit = |n: u32, singular: &str| {
        if n == 1 {
            format!("every {}", singular)
        } else {
            format!("every {} {}s", n, singular)
        }
    };
    let mut text = match &rule.pattern {
        Pattern::Daily { interval } => unit(interval.get(), "day"),
        Pattern::Weekly { days: Some(days), .. } => {
            let names: Vec<&str> = days.iter().map(|d| DAY_NAMES[usize::from(d)]).collect();
            format!("weekly on {}", names.join(", "))
        }
        Pattern::Weekly { interval, days: None } => unit(interval.get(), "week"),
        Pattern::Monthly { interval, day_of_month } => match day_of_month {
            Some(day) => format!("{} on day {}", unit(interval.get(), "month"), day.get()),
            None => unit(interval.get(), "month"),
        },
        Pattern::Yearly { interval } => unit(interval.get(), "year"),
    };
    if let Some(end) = rule.end_date {
        text.push_str(&format!(" until {}", end.format("%Y-%m-%d")));
    }
    if let Some(max) = rule.max_occurrences {
        text.push_str(&format!(", at most {} instances", max));
    }
    if rule.paused {
        text.push_str(" (paused)");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("09:30", "09:30")]
    #[case("9:30", "09:30")]
    #[case("9:30 PM", "21:30")]
    #[case("9pm", "21:00")]
    #[case("12:00 am", "00:00")]
    fn test_parse_time_of_day(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(parse_time_of_day(input).unwrap(), expected);
    }

    #[test]
    fn test_parse_time_rejects_garbage() {
        assert!(parse_time_of_day("teatime").is_err());
        assert!(parse_time_of_day("25:00").is_err());
    }

    #[test]
    fn test_parse_weekdays() {
        let days = parse_weekdays("mon, wed,fri").unwrap();
        assert_eq!(days.iter().collect::<Vec<_>>(), vec![1, 3, 5]);
        assert!(parse_weekdays("funday").is_err());
        assert!(parse_weekdays("").is_err());
    }

    #[test]
    fn test_build_rule_shortcuts() {
        let args = RecurrenceArgs {
            every: Some(RecurrenceShortcut::Weekdays),
            ..Default::default()
        };
        let rule = build_rule(&args, &Tz::UTC).unwrap().unwrap();
        assert_eq!(describe_rule(&rule), "weekly on Mon, Tue, Wed, Thu, Fri");

        let args = RecurrenceArgs {
            every: Some(RecurrenceShortcut::Monthly),
            interval: Some(2),
            day_of_month: Some(15),
            count: Some(6),
            ..Default::default()
        };
        let rule = build_rule(&args, &Tz::UTC).unwrap().unwrap();
        assert_eq!(describe_rule(&rule), "every 2 months on day 15, at most 6 instances");

        assert!(build_rule(&RecurrenceArgs::default(), &Tz::UTC).unwrap().is_none());
    }

    #[test]
    fn test_build_rule_rejects_mismatched_options() {
        let args = RecurrenceArgs {
            every: Some(RecurrenceShortcut::Daily),
            on: Some("mon".to_string()),
            ..Default::default()
        };
        assert!(build_rule(&args, &Tz::UTC).is_err());

        let args = RecurrenceArgs {
            every: Some(RecurrenceShortcut::Daily),
            interval: Some(0),
            ..Default::default()
        };
        assert!(build_rule(&args, &Tz::UTC).is_err());
    }

    #[test]
    fn test_apply_time_of_day_uses_local_date() {
        let tz: Tz = "America/New_York".parse().unwrap();
        // 2025-03-01 03:00 UTC is still Feb 28 in New York
        let due = chrono::TimeZone::with_ymd_and_hms(&Utc, 2025, 3, 1, 3, 0, 0).unwrap();
        let moved = apply_time_of_day(due, "09:00", &tz).unwrap();
        assert_eq!(moved, chrono::TimeZone::with_ymd_and_hms(&Utc, 2025, 2, 28, 14, 0, 0).unwrap());
    }
}
