use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::str::FromStr;

use crate::error::CoreError;
use crate::models::Todo;
use crate::timezone::resolve_local;

/// Instances generated on template creation when the rule sets no `maxOccurrences`.
pub const DEFAULT_MAX_INSTANCES: u32 = 50;
/// How far ahead rules without an end date are materialized.
pub const DEFAULT_HORIZON_DAYS: i64 = 365;
/// Batch size for a manual "generate more".
pub const DEFAULT_GENERATE_MORE_COUNT: u32 = 10;
/// Batch size when a changed rule regenerates future instances.
pub const DEFAULT_REGENERATE_COUNT: u32 = 50;

// ============================================================================
// Rule types
// ============================================================================

/// The `type` tag of a recurrence rule as it appears on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceKind {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    /// Accepted by the decoder only so it can be rejected with a clear error.
    Custom,
}

impl std::fmt::Display for RecurrenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecurrenceKind::Daily => write!(f, "daily"),
            RecurrenceKind::Weekly => write!(f, "weekly"),
            RecurrenceKind::Monthly => write!(f, "monthly"),
            RecurrenceKind::Yearly => write!(f, "yearly"),
            RecurrenceKind::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for RecurrenceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" | "day" => Ok(RecurrenceKind::Daily),
            "weekly" | "week" => Ok(RecurrenceKind::Weekly),
            "monthly" | "month" => Ok(RecurrenceKind::Monthly),
            "yearly" | "year" | "annually" => Ok(RecurrenceKind::Yearly),
            "custom" => Ok(RecurrenceKind::Custom),
            _ => Err(CoreError::InvalidRecurrence(format!("unknown recurrence type '{}'", s))),
        }
    }
}

/// A non-empty set of weekdays, numbered 0 (Sunday) through 6 (Saturday).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekdaySet(BTreeSet<u8>);

impl WeekdaySet {
    pub fn new<I: IntoIterator<Item = u8>>(days: I) -> Result<Self, CoreError> {
        let days: BTreeSet<u8> = days.into_iter().collect();
        if days.is_empty() {
            return Err(CoreError::InvalidRecurrence(
                "weekly rule needs at least one weekday".to_string(),
            ));
        }
        if let Some(day) = days.iter().find(|day| **day > 6) {
            return Err(CoreError::InvalidRecurrence(format!(
                "weekday {} is out of range 0-6",
                day
            )));
        }
        Ok(Self(days))
    }

    pub fn from_weekdays<I: IntoIterator<Item = Weekday>>(days: I) -> Result<Self, CoreError> {
        Self::new(days.into_iter().map(|day| day.num_days_from_sunday() as u8))
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0.contains(&(weekday.num_days_from_sunday() as u8))
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }

    /// Days from `from` to the next listed weekday, in `1..=7`.
    fn days_until_next(&self, from: Weekday) -> u64 {
        let start = u64::from(from.num_days_from_sunday());
        // The set is never empty, so one of the seven offsets always matches.
        (1..=7u64)
            .find(|offset| self.0.contains(&(((start + offset) % 7) as u8)))
            .unwrap_or(7)
    }
}

/// A day of the month in `1..=31`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayOfMonth(u8);

impl DayOfMonth {
    pub fn new(day: u8) -> Result<Self, CoreError> {
        if (1..=31).contains(&day) {
            Ok(Self(day))
        } else {
            Err(CoreError::InvalidRecurrence(format!(
                "day of month {} is out of range 1-31",
                day
            )))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// How often a template repeats. Each variant carries only the fields it uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Daily {
        interval: NonZeroU32,
    },
    Weekly {
        interval: NonZeroU32,
        /// When set, the interval is not applied: the next occurrence is the
        /// next listed weekday.
        days: Option<WeekdaySet>,
    },
    Monthly {
        interval: NonZeroU32,
        day_of_month: Option<DayOfMonth>,
    },
    Yearly {
        interval: NonZeroU32,
    },
}

fn non_zero(interval: u32) -> Result<NonZeroU32, CoreError> {
    NonZeroU32::new(interval)
        .ok_or_else(|| CoreError::InvalidRecurrence("interval must be a positive integer".to_string()))
}

impl Pattern {
    pub fn daily(interval: u32) -> Result<Self, CoreError> {
        Ok(Pattern::Daily { interval: non_zero(interval)? })
    }

    pub fn weekly(interval: u32, days: Option<WeekdaySet>) -> Result<Self, CoreError> {
        Ok(Pattern::Weekly { interval: non_zero(interval)?, days })
    }

    pub fn monthly(interval: u32, day_of_month: Option<u8>) -> Result<Self, CoreError> {
        Ok(Pattern::Monthly {
            interval: non_zero(interval)?,
            day_of_month: day_of_month.map(DayOfMonth::new).transpose()?,
        })
    }

    pub fn yearly(interval: u32) -> Result<Self, CoreError> {
        Ok(Pattern::Yearly { interval: non_zero(interval)? })
    }

    pub fn kind(&self) -> RecurrenceKind {
        match self {
            Pattern::Daily { .. } => RecurrenceKind::Daily,
            Pattern::Weekly { .. } => RecurrenceKind::Weekly,
            Pattern::Monthly { .. } => RecurrenceKind::Monthly,
            Pattern::Yearly { .. } => RecurrenceKind::Yearly,
        }
    }

    pub fn interval(&self) -> u32 {
        match self {
            Pattern::Daily { interval }
            | Pattern::Weekly { interval, .. }
            | Pattern::Monthly { interval, .. }
            | Pattern::Yearly { interval } => interval.get(),
        }
    }

    /// Calendar step from one occurrence to the next. Time of day is kept.
    fn advance(&self, current: NaiveDateTime) -> NaiveDateTime {
        let date = current.date();
        let next = match self {
            Pattern::Daily { interval } => add_days(date, u64::from(interval.get())),
            Pattern::Weekly { interval, days: None } => add_days(date, 7 * u64::from(interval.get())),
            Pattern::Weekly { days: Some(days), .. } => add_days(date, days.days_until_next(date.weekday())),
            Pattern::Monthly { interval, day_of_month } => {
                let shifted = add_months(date, interval.get());
                match day_of_month {
                    Some(day) => clamp_day(shifted, day.get()),
                    None => shifted,
                }
            }
            Pattern::Yearly { interval } => add_months(date, interval.get().saturating_mul(12)),
        };
        next.and_time(current.time())
    }
}

// chrono's month arithmetic clamps to the last day of the target month.
fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(NaiveDate::MAX)
}

fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

fn clamp_day(date: NaiveDate, day: u8) -> NaiveDate {
    let day = u32::from(day).min(last_day_of_month(date.year(), date.month()));
    date.with_day(day).unwrap_or(date)
}

/// A validated recurrence rule as embedded in a template task.
///
/// Serialized through [`RecurrenceSpec`], so every decoded rule has passed the
/// same validation as one built in code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecurrenceSpec", into = "RecurrenceSpec")]
pub struct RecurrenceRule {
    pub pattern: Pattern,
    pub end_date: Option<DateTime<Utc>>,
    pub max_occurrences: Option<NonZeroU32>,
    pub paused: bool,
}

impl RecurrenceRule {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            end_date: None,
            max_occurrences: None,
            paused: false,
        }
    }

    pub fn until(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_max_occurrences(mut self, max: u32) -> Result<Self, CoreError> {
        self.max_occurrences = Some(NonZeroU32::new(max).ok_or_else(|| {
            CoreError::InvalidRecurrence("maxOccurrences must be a positive integer".to_string())
        })?);
        Ok(self)
    }

    pub fn with_paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }

    /// The next occurrence on the local calendar.
    pub fn next_after(&self, current: NaiveDateTime) -> NaiveDateTime {
        self.pattern.advance(current)
    }

    /// Last instant an occurrence may fall on: the end date when set,
    /// otherwise `now + horizon_days`, saturating at the latest representable instant.
    pub fn effective_end(&self, now: DateTime<Utc>, horizon_days: i64) -> DateTime<Utc> {
        self.end_date.unwrap_or_else(|| {
            Duration::try_days(horizon_days)
                .and_then(|horizon| now.checked_add_signed(horizon))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        })
    }

    /// Whether two rules produce the same schedule. The paused flag is not
    /// part of the schedule.
    pub fn same_schedule(&self, other: &RecurrenceRule) -> bool {
        self.pattern == other.pattern
            && self.end_date == other.end_date
            && self.max_occurrences == other.max_occurrences
    }

    /// Occurrences strictly after `seed`, bounded by `end` and `max_count`.
    pub fn occurrences(
        &self,
        seed: DateTime<Utc>,
        end: DateTime<Utc>,
        max_count: u32,
        timezone: Tz,
    ) -> Occurrences<'_> {
        Occurrences {
            rule: self,
            timezone,
            current: seed,
            end,
            remaining: max_count,
        }
    }
}

/// Wire shape of a recurrence rule, e.g.
/// `{"type":"weekly","interval":1,"daysOfWeek":[1,3,5],"endDate":1767225600000}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceSpec {
    #[serde(rename = "type")]
    pub kind: RecurrenceKind,
    pub interval: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u8>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_occurrences: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub paused: bool,
}

impl TryFrom<RecurrenceSpec> for RecurrenceRule {
    type Error = CoreError;

    fn try_from(spec: RecurrenceSpec) -> Result<Self, Self::Error> {
        if spec.days_of_week.is_some() && spec.kind != RecurrenceKind::Weekly {
            return Err(CoreError::InvalidRecurrence(
                "daysOfWeek only applies to weekly rules".to_string(),
            ));
        }
        if spec.day_of_month.is_some() && spec.kind != RecurrenceKind::Monthly {
            return Err(CoreError::InvalidRecurrence(
                "dayOfMonth only applies to monthly rules".to_string(),
            ));
        }

        let pattern = match spec.kind {
            RecurrenceKind::Daily => Pattern::daily(spec.interval)?,
            RecurrenceKind::Weekly => Pattern::weekly(
                spec.interval,
                spec.days_of_week.map(WeekdaySet::new).transpose()?,
            )?,
            RecurrenceKind::Monthly => Pattern::monthly(spec.interval, spec.day_of_month)?,
            RecurrenceKind::Yearly => Pattern::yearly(spec.interval)?,
            RecurrenceKind::Custom => {
                return Err(CoreError::InvalidRecurrence(
                    "custom recurrence rules are not supported".to_string(),
                ))
            }
        };

        let mut rule = RecurrenceRule::new(pattern).with_paused(spec.paused);
        rule.end_date = spec.end_date;
        if let Some(max) = spec.max_occurrences {
            rule = rule.with_max_occurrences(max)?;
        }
        Ok(rule)
    }
}

impl From<RecurrenceRule> for RecurrenceSpec {
    fn from(rule: RecurrenceRule) -> Self {
        let (days_of_week, day_of_month) = match &rule.pattern {
            Pattern::Weekly { days, .. } => (days.as_ref().map(|d| d.iter().collect()), None),
            Pattern::Monthly { day_of_month, .. } => (None, day_of_month.map(DayOfMonth::get)),
            _ => (None, None),
        };
        RecurrenceSpec {
            kind: rule.pattern.kind(),
            interval: rule.pattern.interval(),
            days_of_week,
            day_of_month,
            end_date: rule.end_date,
            max_occurrences: rule.max_occurrences.map(NonZeroU32::get),
            paused: rule.paused,
        }
    }
}

// ============================================================================
// Occurrence calculator
// ============================================================================

/// Next occurrence after `current`, computed on the UTC calendar.
pub fn next_occurrence(current: DateTime<Utc>, rule: &RecurrenceRule) -> DateTime<Utc> {
    rule.next_after(current.naive_utc()).and_utc()
}

/// Next occurrence after `current`, computed on the calendar of `timezone` so
/// that the local time of day survives DST changes.
pub fn next_occurrence_in<Z: TimeZone>(
    current: DateTime<Utc>,
    rule: &RecurrenceRule,
    timezone: &Z,
) -> DateTime<Utc> {
    let local = current.with_timezone(timezone).naive_local();
    resolve_local(timezone, rule.next_after(local))
}

/// Bounded, strictly increasing run of occurrences. See [`RecurrenceRule::occurrences`].
#[derive(Debug)]
pub struct Occurrences<'a> {
    rule: &'a RecurrenceRule,
    timezone: Tz,
    current: DateTime<Utc>,
    end: DateTime<Utc>,
    remaining: u32,
}

impl Iterator for Occurrences<'_> {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 || self.current > self.end {
            return None;
        }
        let next = next_occurrence_in(self.current, self.rule, &self.timezone);
        // `next <= current` only happens once the calendar saturates.
        if next > self.end || next <= self.current {
            self.remaining = 0;
            return None;
        }
        self.current = next;
        self.remaining -= 1;
        Some(next)
    }
}

// ============================================================================
// Reconciliation decisions
// ============================================================================

/// Which instance mutation a template update calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePlan {
    /// Delete future instances and materialize again with the new rule.
    Regenerate,
    /// Copy the changed non-recurrence fields onto future instances.
    PatchFuture,
    /// Leave instances alone.
    TemplateOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileFlags {
    pub update_future_instances: bool,
    pub regenerate_instances: bool,
}

/// True when `incoming` is present and schedules differently from `stored`.
pub fn pattern_changed(stored: Option<&RecurrenceRule>, incoming: Option<&RecurrenceRule>) -> bool {
    match (stored, incoming) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(stored), Some(incoming)) => !stored.same_schedule(incoming),
    }
}

pub fn plan_reconciliation(pattern_changed: bool, flags: ReconcileFlags) -> ReconcilePlan {
    if pattern_changed && flags.regenerate_instances {
        ReconcilePlan::Regenerate
    } else if flags.update_future_instances && !pattern_changed {
        ReconcilePlan::PatchFuture
    } else {
        ReconcilePlan::TemplateOnly
    }
}

/// An instance is in the future when it is incomplete and due after `now`.
/// A missing due date counts as the epoch.
pub fn is_future_instance(instance: &Todo, now: DateTime<Utc>) -> bool {
    !instance.completed && instance.due_date.map_or(false, |due| due > now)
}

/// Splits instances into `(future, past)`.
pub fn partition_instances(instances: Vec<Todo>, now: DateTime<Utc>) -> (Vec<Todo>, Vec<Todo>) {
    instances
        .into_iter()
        .partition(|instance| is_future_instance(instance, now))
}

/// Seed for regeneration: the latest past instance, else the template's due
/// date. Past instances without a due date count as the template's due date.
/// `None` when the template itself has no due date.
pub fn regeneration_seed(past: &[Todo], template_due: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    let template_due = template_due?;
    Some(
        past.iter()
            .map(|instance| instance.due_date.unwrap_or(template_due))
            .max()
            .unwrap_or(template_due),
    )
}

/// Seed for "generate more": the latest instance's due date, else the
/// template's due date.
pub fn continuation_seed(instances: &[Todo], template_due: DateTime<Utc>) -> DateTime<Utc> {
    instances
        .iter()
        .filter_map(|instance| instance.due_date)
        .max()
        .unwrap_or(template_due)
}

// ============================================================================
// Configuration
// ============================================================================

/// Bounds and calendar used when materializing instances.
#[derive(Debug, Clone)]
pub struct MaterializationConfig {
    /// Batch size on creation when the rule sets no `maxOccurrences`
    pub default_max_instances: u32,
    /// Materialization horizon for rules without an end date
    pub horizon_days: i64,
    /// Default batch for "generate more"
    pub generate_more_count: u32,
    /// Batch size when a rule change regenerates instances
    pub regenerate_count: u32,
    /// Calendar for day/month arithmetic
    pub timezone: Tz,
}

impl Default for MaterializationConfig {
    fn default() -> Self {
        Self {
            default_max_instances: DEFAULT_MAX_INSTANCES,
            horizon_days: DEFAULT_HORIZON_DAYS,
            generate_more_count: DEFAULT_GENERATE_MORE_COUNT,
            regenerate_count: DEFAULT_REGENERATE_COUNT,
            timezone: Tz::UTC,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TodoPriority;
    use proptest::prelude::*;
    use rstest::rstest;
    use uuid::Uuid;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
    }

    fn rule(pattern: Pattern) -> RecurrenceRule {
        RecurrenceRule::new(pattern)
    }

    fn instance(due: Option<DateTime<Utc>>, completed: bool) -> Todo {
        Todo {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            title: "Water plants".to_string(),
            description: None,
            completed,
            priority: TodoPriority::Medium,
            due_date: due,
            due_time: None,
            project_id: None,
            tag_ids: vec![],
            is_recurring: false,
            recurrence: None,
            parent_template_id: Some(Uuid::now_v7()),
            original_due_date: due,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    mod calculator_tests {
        use super::*;

        #[rstest]
        #[case(1, at(2025, 3, 10), at(2025, 3, 11))]
        #[case(3, at(2025, 3, 30), at(2025, 4, 2))]
        #[case(1, at(2024, 12, 31), at(2025, 1, 1))]
        fn test_daily_advances_by_interval(
            #[case] interval: u32,
            #[case] current: DateTime<Utc>,
            #[case] expected: DateTime<Utc>,
        ) {
            let daily = rule(Pattern::daily(interval).unwrap());
            assert_eq!(next_occurrence(current, &daily), expected);
        }

        #[test]
        fn test_weekly_without_days_advances_whole_weeks() {
            let weekly = rule(Pattern::weekly(2, None).unwrap());
            assert_eq!(next_occurrence(at(2025, 3, 3), &weekly), at(2025, 3, 17));
        }

        #[rstest]
        // 2025-03-03 is a Monday
        #[case(at(2025, 3, 3), at(2025, 3, 5))]
        #[case(at(2025, 3, 5), at(2025, 3, 7))]
        #[case(at(2025, 3, 7), at(2025, 3, 10))]
        #[case(at(2025, 3, 8), at(2025, 3, 10))]
        fn test_weekly_with_days_picks_next_listed_weekday(
            #[case] current: DateTime<Utc>,
            #[case] expected: DateTime<Utc>,
        ) {
            let days = WeekdaySet::new([1, 3, 5]).unwrap();
            let weekly = rule(Pattern::weekly(1, Some(days)).unwrap());
            assert_eq!(next_occurrence(current, &weekly), expected);
        }

        #[test]
        fn test_weekly_single_day_same_weekday_is_a_week_later() {
            let days = WeekdaySet::from_weekdays([Weekday::Mon]).unwrap();
            let weekly = rule(Pattern::weekly(1, Some(days)).unwrap());
            assert_eq!(next_occurrence(at(2025, 3, 3), &weekly), at(2025, 3, 10));
        }

        #[rstest]
        #[case(at(2025, 1, 31), at(2025, 2, 28))]
        #[case(at(2024, 1, 31), at(2024, 2, 29))]
        #[case(at(2025, 2, 28), at(2025, 3, 31))]
        #[case(at(2025, 4, 15), at(2025, 5, 31))]
        fn test_monthly_day_31_clamps_to_month_end(
            #[case] current: DateTime<Utc>,
            #[case] expected: DateTime<Utc>,
        ) {
            let monthly = rule(Pattern::monthly(1, Some(31)).unwrap());
            assert_eq!(next_occurrence(current, &monthly), expected);
        }

        #[test]
        fn test_monthly_without_day_keeps_day_and_clamps() {
            let monthly = rule(Pattern::monthly(1, None).unwrap());
            assert_eq!(next_occurrence(at(2025, 5, 15), &monthly), at(2025, 6, 15));
            assert_eq!(next_occurrence(at(2025, 1, 31), &monthly), at(2025, 2, 28));
        }

        #[test]
        fn test_monthly_interval_crosses_year() {
            let quarterly = rule(Pattern::monthly(3, Some(1)).unwrap());
            assert_eq!(next_occurrence(at(2025, 11, 20), &quarterly), at(2026, 2, 1));
        }

        #[test]
        fn test_yearly_leap_day_clamps() {
            let yearly = rule(Pattern::yearly(1).unwrap());
            assert_eq!(next_occurrence(at(2024, 2, 29), &yearly), at(2025, 2, 28));
            assert_eq!(next_occurrence(at(2025, 6, 1), &rule(Pattern::yearly(2).unwrap())), at(2027, 6, 1));
        }

        #[test]
        fn test_local_time_survives_dst_change() {
            let tz: Tz = "America/New_York".parse().unwrap();
            // 09:00 EST on the Saturday before the March 2025 change
            let current = tz.with_ymd_and_hms(2025, 3, 8, 9, 0, 0).unwrap().with_timezone(&Utc);
            let daily = rule(Pattern::daily(1).unwrap());

            let next = next_occurrence_in(current, &daily, &tz).with_timezone(&tz);
            assert_eq!(next.naive_local(), NaiveDate::from_ymd_opt(2025, 3, 9).unwrap().and_hms_opt(9, 0, 0).unwrap());
        }

        #[test]
        fn test_nonexistent_local_time_moves_forward() {
            let tz: Tz = "America/New_York".parse().unwrap();
            // 02:30 does not exist on 2025-03-09
            let current = tz.with_ymd_and_hms(2025, 3, 8, 2, 30, 0).unwrap().with_timezone(&Utc);
            let daily = rule(Pattern::daily(1).unwrap());

            let next = next_occurrence_in(current, &daily, &tz).with_timezone(&tz);
            assert_eq!(next.naive_local(), NaiveDate::from_ymd_opt(2025, 3, 9).unwrap().and_hms_opt(3, 30, 0).unwrap());
        }

        proptest! {
            #[test]
            fn prop_daily_is_exact(days in 0i64..40_000, interval in 1u32..400) {
                let current = at(1990, 1, 1) + Duration::days(days);
                let daily = rule(Pattern::daily(interval).unwrap());
                prop_assert_eq!(next_occurrence(current, &daily), current + Duration::days(i64::from(interval)));
            }

            #[test]
            fn prop_every_rule_moves_forward(
                days in 0i64..40_000,
                kind in 0u8..5,
                interval in 1u32..24,
                weekdays in proptest::collection::btree_set(0u8..7, 1..7),
                day_of_month in 1u8..=31,
            ) {
                let current = at(1990, 1, 1) + Duration::days(days);
                let pattern = match kind {
                    0 => Pattern::daily(interval).unwrap(),
                    1 => Pattern::weekly(interval, None).unwrap(),
                    2 => Pattern::weekly(interval, Some(WeekdaySet::new(weekdays).unwrap())).unwrap(),
                    3 => Pattern::monthly(interval, Some(day_of_month)).unwrap(),
                    _ => Pattern::yearly(interval).unwrap(),
                };
                let next = next_occurrence(current, &rule(pattern));
                prop_assert!(next > current);
            }
        }
    }

    mod rule_tests {
        use super::*;

        #[test]
        fn test_rejects_invalid_fields() {
            assert!(matches!(Pattern::daily(0), Err(CoreError::InvalidRecurrence(_))));
            assert!(matches!(WeekdaySet::new([]), Err(CoreError::InvalidRecurrence(_))));
            assert!(matches!(WeekdaySet::new([7]), Err(CoreError::InvalidRecurrence(_))));
            assert!(matches!(Pattern::monthly(1, Some(0)), Err(CoreError::InvalidRecurrence(_))));
            assert!(matches!(Pattern::monthly(1, Some(32)), Err(CoreError::InvalidRecurrence(_))));
            assert!(RecurrenceRule::new(Pattern::daily(1).unwrap()).with_max_occurrences(0).is_err());
        }

        #[test]
        fn test_decodes_wire_shape() {
            let json = r#"{"type":"weekly","interval":1,"daysOfWeek":[5,1,3],"endDate":1767225600000,"maxOccurrences":12}"#;
            let decoded: RecurrenceRule = serde_json::from_str(json).unwrap();

            let expected = RecurrenceRule::new(
                Pattern::weekly(1, Some(WeekdaySet::new([1, 3, 5]).unwrap())).unwrap(),
            )
            .until(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
            .with_max_occurrences(12)
            .unwrap();
            assert_eq!(decoded, expected);

            let encoded = serde_json::to_value(&decoded).unwrap();
            assert_eq!(encoded["daysOfWeek"], serde_json::json!([1, 3, 5]));
            assert!(encoded.get("paused").is_none());
        }

        #[test]
        fn test_rejects_custom_and_mismatched_fields() {
            let custom = serde_json::from_str::<RecurrenceRule>(r#"{"type":"custom","interval":1}"#);
            assert!(custom.is_err());

            let spec = RecurrenceSpec {
                kind: RecurrenceKind::Daily,
                interval: 1,
                days_of_week: Some(vec![1]),
                day_of_month: None,
                end_date: None,
                max_occurrences: None,
                paused: false,
            };
            assert!(matches!(RecurrenceRule::try_from(spec), Err(CoreError::InvalidRecurrence(_))));

            let empty_week = serde_json::from_str::<RecurrenceRule>(r#"{"type":"weekly","interval":1,"daysOfWeek":[]}"#);
            assert!(empty_week.is_err());
        }

        #[test]
        fn test_occurrences_stop_at_end_and_count() {
            let daily = rule(Pattern::daily(1).unwrap());
            let seed = at(2025, 1, 1);

            let capped: Vec<_> = daily.occurrences(seed, at(2026, 1, 1), 5, Tz::UTC).collect();
            assert_eq!(capped, (1..=5).map(|d| at(2025, 1, 1 + d)).collect::<Vec<_>>());

            let ended: Vec<_> = daily.occurrences(seed, at(2025, 1, 3), 50, Tz::UTC).collect();
            assert_eq!(ended, vec![at(2025, 1, 2), at(2025, 1, 3)]);
        }
    }

    mod reconciliation_tests {
        use super::*;

        #[test]
        fn test_pattern_changed_ignores_order_and_pause() {
            let a = rule(Pattern::weekly(1, Some(WeekdaySet::new([1, 3]).unwrap())).unwrap());
            let b = rule(Pattern::weekly(1, Some(WeekdaySet::new([3, 1]).unwrap())).unwrap()).with_paused(true);
            let c = rule(Pattern::weekly(1, Some(WeekdaySet::new([1, 4]).unwrap())).unwrap());

            assert!(!pattern_changed(Some(&a), Some(&b)));
            assert!(pattern_changed(Some(&a), Some(&c)));
            assert!(!pattern_changed(Some(&a), None));
            assert!(pattern_changed(None, Some(&a)));
            assert!(pattern_changed(Some(&a), Some(&a.clone().until(at(2026, 1, 1)))));
        }

        #[rstest]
        #[case(true, true, true, ReconcilePlan::Regenerate)]
        #[case(true, false, true, ReconcilePlan::Regenerate)]
        #[case(true, true, false, ReconcilePlan::TemplateOnly)]
        #[case(false, true, true, ReconcilePlan::PatchFuture)]
        #[case(false, true, false, ReconcilePlan::PatchFuture)]
        #[case(false, false, true, ReconcilePlan::TemplateOnly)]
        #[case(false, false, false, ReconcilePlan::TemplateOnly)]
        fn test_plan_reconciliation(
            #[case] changed: bool,
            #[case] update_future_instances: bool,
            #[case] regenerate_instances: bool,
            #[case] expected: ReconcilePlan,
        ) {
            let flags = ReconcileFlags { update_future_instances, regenerate_instances };
            assert_eq!(plan_reconciliation(changed, flags), expected);
        }

        #[test]
        fn test_partition_instances() {
            let now = at(2025, 6, 1);
            let instances = vec![
                instance(Some(at(2025, 6, 2)), false),
                instance(Some(at(2025, 6, 2)), true),
                instance(Some(now), false),
                instance(None, false),
                instance(Some(at(2025, 5, 1)), false),
            ];
            let (future, past) = partition_instances(instances, now);
            assert_eq!(future.len(), 1);
            assert_eq!(past.len(), 4);
            assert!(future.iter().all(|i| !i.completed));
        }

        #[test]
        fn test_effective_end_saturates() {
            let now = at(2025, 1, 1);
            let open = rule(Pattern::daily(1).unwrap());
            assert_eq!(open.effective_end(now, 10), at(2025, 1, 11));
            assert_eq!(open.effective_end(now, 1_000_000_000), DateTime::<Utc>::MAX_UTC);
            assert_eq!(open.effective_end(now, i64::MAX), DateTime::<Utc>::MAX_UTC);

            let bounded = open.until(at(2025, 3, 1));
            assert_eq!(bounded.effective_end(now, 1_000_000_000), at(2025, 3, 1));
        }

        #[test]
        fn test_seeds() {
            let template_due = at(2025, 1, 1);
            let past = vec![
                instance(Some(at(2025, 1, 5)), true),
                instance(Some(at(2025, 1, 3)), false),
            ];
            assert_eq!(regeneration_seed(&past, Some(template_due)), Some(at(2025, 1, 5)));
            assert_eq!(regeneration_seed(&[], Some(template_due)), Some(template_due));
            assert_eq!(regeneration_seed(&past, None), None);

            assert_eq!(continuation_seed(&past, template_due), at(2025, 1, 5));
            assert_eq!(continuation_seed(&[instance(None, false)], template_due), template_due);
        }
    }
}
