// SPDX-License-Identifier: MIT

//! Schedule Engine (§4.5): parses an RFC-5545-flavored recurrence rule and
//! expands it into fire times. Supports the fields the specification names
//! explicitly — `FREQ`, `INTERVAL`, `BYHOUR`, `BYMINUTE`, `BYDAY`, `COUNT`,
//! `UNTIL` — rather than the full RFC 5545 grammar (no `BYSETPOS`, no
//! combined multi-frequency `RDATE`/`EXDATE` overlays).

use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;

/// Bound on how many candidate instants `next_after` will examine before
/// giving up, so a pathological rule (e.g. `BYDAY` naming a day the month
/// never has) fails closed instead of looping forever.
const MAX_CANDIDATES: u32 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub freq: Frequency,
    pub interval: u32,
    /// Hours of day a fire is permitted at; empty means "any", resolved to
    /// midnight for daily/weekly/monthly rules with no explicit time.
    pub by_hour: Vec<u32>,
    pub by_minute: Vec<u32>,
    /// Day-of-week constraint for `WEEKLY`/`MONTHLY` rules (RFC 5545 `BYDAY`
    /// without the leading ordinal — "first Tuesday of the month" style
    /// ordinals are not supported).
    pub by_weekday: Vec<Weekday>,
    pub count: Option<u32>,
    pub until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRuleError(String);

impl fmt::Display for RecurrenceRuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for RecurrenceRuleError {}

impl RecurrenceRule {
    /// Parse a `KEY=VALUE;KEY=VALUE` recurrence string (the semicolon-joined
    /// `RRULE` body, without the `RRULE:` prefix).
    pub fn parse(source: &str) -> Result<Self, RecurrenceRuleError> {
        let mut freq = None;
        let mut interval = 1u32;
        let mut by_hour = Vec::new();
        let mut by_minute = Vec::new();
        let mut by_weekday = Vec::new();
        let mut count = None;
        let mut until = None;

        for part in source.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| RecurrenceRuleError(format!("malformed rule segment {part:?}")))?;
            match key.to_ascii_uppercase().as_str() {
                "FREQ" => {
                    freq = Some(match value.to_ascii_uppercase().as_str() {
                        "HOURLY" => Frequency::Hourly,
                        "DAILY" => Frequency::Daily,
                        "WEEKLY" => Frequency::Weekly,
                        "MONTHLY" => Frequency::Monthly,
                        other => return Err(RecurrenceRuleError(format!("unsupported FREQ {other:?}"))),
                    });
                }
                "INTERVAL" => {
                    interval = value
                        .parse()
                        .map_err(|_| RecurrenceRuleError(format!("invalid INTERVAL {value:?}")))?;
                    if interval == 0 {
                        return Err(RecurrenceRuleError("INTERVAL must be >= 1".into()));
                    }
                }
                "BYHOUR" => {
                    for h in value.split(',') {
                        by_hour.push(
                            h.parse()
                                .map_err(|_| RecurrenceRuleError(format!("invalid BYHOUR {h:?}")))?,
                        );
                    }
                }
                "BYMINUTE" => {
                    for m in value.split(',') {
                        by_minute.push(
                            m.parse()
                                .map_err(|_| RecurrenceRuleError(format!("invalid BYMINUTE {m:?}")))?,
                        );
                    }
                }
                "BYDAY" | "BYWEEKDAY" => {
                    for d in value.split(',') {
                        by_weekday.push(parse_weekday(d)?);
                    }
                }
                "COUNT" => {
                    count = Some(
                        value
                            .parse()
                            .map_err(|_| RecurrenceRuleError(format!("invalid COUNT {value:?}")))?,
                    );
                }
                "UNTIL" => {
                    until = Some(parse_until(value)?);
                }
                other => return Err(RecurrenceRuleError(format!("unsupported rule field {other:?}"))),
            }
        }

        Ok(Self {
            freq: freq.ok_or_else(|| RecurrenceRuleError("FREQ is required".into()))?,
            interval,
            by_hour,
            by_minute,
            by_weekday,
            count,
            until,
        })
    }

    fn times_of_day(&self) -> Vec<(u32, u32)> {
        let hours = if self.by_hour.is_empty() { vec![0] } else { self.by_hour.clone() };
        let minutes = if self.by_minute.is_empty() { vec![0] } else { self.by_minute.clone() };
        let mut times: Vec<(u32, u32)> = hours
            .iter()
            .flat_map(|h| minutes.iter().map(move |m| (*h, *m)))
            .collect();
        times.sort_unstable();
        times
    }

    /// First instant strictly greater than `after` that this rule matches,
    /// in `tz`. Returns `None` if `until` has already passed or no matching
    /// instant is found within [`MAX_CANDIDATES`] probes.
    pub fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        if let Some(until) = self.until {
            if after >= until {
                return None;
            }
        }
        let local_after = after.with_timezone(&tz);

        match self.freq {
            Frequency::Hourly => self.next_hourly(local_after, tz),
            Frequency::Daily => self.next_by_day_step(local_after, tz, 1),
            Frequency::Weekly => self.next_weekly(local_after, tz),
            Frequency::Monthly => self.next_monthly(local_after, tz),
        }
        .filter(|candidate| self.until.is_none_or(|until| *candidate < until))
    }

    fn next_hourly(&self, local_after: chrono::DateTime<Tz>, tz: Tz) -> Option<DateTime<Utc>> {
        let minute = self.by_minute.first().copied().unwrap_or(0);
        let mut candidate = local_after
            .date_naive()
            .and_hms_opt(local_after.hour(), minute, 0)?;
        if candidate <= local_after.naive_local() {
            candidate += Duration::hours(1);
        }
        for step in 0..MAX_CANDIDATES {
            let stepped = candidate + Duration::hours((step * self.interval) as i64);
            if let Some(resolved) = resolve_local(tz, stepped) {
                return Some(resolved);
            }
        }
        None
    }

    fn next_by_day_step(&self, local_after: chrono::DateTime<Tz>, tz: Tz, day_step: u32) -> Option<DateTime<Utc>> {
        let times = self.times_of_day();
        let mut day = local_after.date_naive();
        for _ in 0..MAX_CANDIDATES {
            for (hour, minute) in &times {
                if let Some(naive) = day.and_hms_opt(*hour, *minute, 0) {
                    if naive > local_after.naive_local() {
                        if let Some(resolved) = resolve_local(tz, naive) {
                            return Some(resolved);
                        }
                    }
                }
            }
            day += Duration::days((day_step * self.interval) as i64);
        }
        None
    }

    fn next_weekly(&self, local_after: chrono::DateTime<Tz>, tz: Tz) -> Option<DateTime<Utc>> {
        if self.by_weekday.is_empty() {
            return self.next_by_day_step(local_after, tz, 7);
        }
        let times = self.times_of_day();
        let mut day = local_after.date_naive();
        for _ in 0..MAX_CANDIDATES {
            if self.by_weekday.contains(&day.weekday()) {
                for (hour, minute) in &times {
                    if let Some(naive) = day.and_hms_opt(*hour, *minute, 0) {
                        if naive > local_after.naive_local() {
                            if let Some(resolved) = resolve_local(tz, naive) {
                                return Some(resolved);
                            }
                        }
                    }
                }
            }
            day += Duration::days(1);
        }
        None
    }

    fn next_monthly(&self, local_after: chrono::DateTime<Tz>, tz: Tz) -> Option<DateTime<Utc>> {
        let times = self.times_of_day();
        let anchor_day_of_month = local_after.day();
        let mut year = local_after.year();
        let mut month = local_after.month();

        for _ in 0..MAX_CANDIDATES {
            if let Some(day) = NaiveDate::from_ymd_opt(year, month, anchor_day_of_month.min(days_in_month(year, month))) {
                if self.by_weekday.is_empty() || self.by_weekday.contains(&day.weekday()) {
                    for (hour, minute) in &times {
                        if let Some(naive) = day.and_hms_opt(*hour, *minute, 0) {
                            if naive > local_after.naive_local() {
                                if let Some(resolved) = resolve_local(tz, naive) {
                                    return Some(resolved);
                                }
                            }
                        }
                    }
                }
            }
            month += self.interval;
            while month > 12 {
                month -= 12;
                year += 1;
            }
        }
        None
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next_month_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next_month_first
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// Resolve a naive local time against a timezone, handling the
/// spring-forward gap (§4.5: "the following valid minute fires once") by
/// advancing one minute at a time until a valid or unambiguous offset is
/// found, and fall-back ambiguity by taking the earlier offset.
fn resolve_local(tz: Tz, naive: chrono::NaiveDateTime) -> Option<DateTime<Utc>> {
    use chrono::LocalResult;
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, _later) => Some(earlier.with_timezone(&Utc)),
        LocalResult::None => {
            let mut probe = naive + Duration::minutes(1);
            for _ in 0..120 {
                if let LocalResult::Single(dt) = tz.from_local_datetime(&probe) {
                    return Some(dt.with_timezone(&Utc));
                }
                probe += Duration::minutes(1);
            }
            None
        }
    }
}

fn parse_weekday(s: &str) -> Result<Weekday, RecurrenceRuleError> {
    match s.trim().to_ascii_uppercase().as_str() {
        "MO" => Ok(Weekday::Mon),
        "TU" => Ok(Weekday::Tue),
        "WE" => Ok(Weekday::Wed),
        "TH" => Ok(Weekday::Thu),
        "FR" => Ok(Weekday::Fri),
        "SA" => Ok(Weekday::Sat),
        "SU" => Ok(Weekday::Sun),
        other => Err(RecurrenceRuleError(format!("invalid BYDAY value {other:?}"))),
    }
}

fn parse_until(value: &str) -> Result<DateTime<Utc>, RecurrenceRuleError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%SZ")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| RecurrenceRuleError(format!("invalid UNTIL {value:?}")))
}

/// Recompute an automation's `next_scheduled_at`/`execution_count` after a
/// fire, auto-disabling when `COUNT` is exhausted (§4.5).
pub fn advance_schedule(
    rule: &RecurrenceRule,
    fired_at: DateTime<Utc>,
    tz: Tz,
    execution_count_after_fire: u32,
) -> Option<DateTime<Utc>> {
    if let Some(count) = rule.count {
        if execution_count_after_fire >= count {
            return None;
        }
    }
    rule.next_after(fired_at, tz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_rule_fires_at_configured_time_next_day() {
        let rule = RecurrenceRule::parse("FREQ=DAILY;BYHOUR=9;BYMINUTE=30").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        let next = rule.next_after(after, chrono_tz::UTC).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 2, 9, 30, 0).unwrap());
    }

    #[test]
    fn weekly_rule_respects_byday() {
        let rule = RecurrenceRule::parse("FREQ=WEEKLY;BYDAY=MO,WE;BYHOUR=8").unwrap();
        // 2026-01-01 is a Thursday.
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let next = rule.next_after(after, chrono_tz::UTC).unwrap();
        assert_eq!(next.weekday(), Weekday::Mon);
    }

    #[test]
    fn count_exhaustion_stops_advancement() {
        let rule = RecurrenceRule::parse("FREQ=DAILY;COUNT=2").unwrap();
        let fired_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert!(advance_schedule(&rule, fired_at, chrono_tz::UTC, 1).is_some());
        assert!(advance_schedule(&rule, fired_at, chrono_tz::UTC, 2).is_none());
    }

    #[test]
    fn until_in_the_past_yields_no_next_fire() {
        let rule = RecurrenceRule::parse("FREQ=DAILY;UNTIL=20250101T000000Z").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert!(rule.next_after(after, chrono_tz::UTC).is_none());
    }

    #[test]
    fn malformed_frequency_is_rejected() {
        assert!(RecurrenceRule::parse("FREQ=FORTNIGHTLY").is_err());
    }
}
