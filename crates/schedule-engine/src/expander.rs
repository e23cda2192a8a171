//! Weekly rule expansion -- turns recurrence rules into concrete occurrences.
//!
//! Each rule is handed to the `rrule` crate as an RFC 5545
//! `FREQ=WEEKLY;BYDAY=..` rule. Expansion runs in floating wall-clock time
//! (declared as UTC to the `rrule` crate) so a 10:00 class stays at 10:00 on
//! every date regardless of the tenant's DST transitions.

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use rrule::RRuleSet;

use crate::error::{Result, ScheduleError};
use crate::model::{Occurrence, OccurrenceOrigin, RecurrenceRule};
use crate::time::{weekday_from_index, weekday_index};

const BYDAY: [&str; 7] = ["SU", "MO", "TU", "WE", "TH", "FR", "SA"];

fn ical(dt: NaiveDateTime) -> String {
    dt.format("%Y%m%dT%H%M%S").to_string()
}

/// Expand one rule over `[start_date, end_date]`, inclusive.
///
/// # Errors
/// `InvalidInput` for a weekday above 6 or a reversed range, `Expansion` if the
/// generated RRULE is rejected.
pub fn expand_rule(
    rule: &RecurrenceRule,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<Occurrence>> {
    if weekday_from_index(rule.weekday).is_none() {
        return Err(ScheduleError::invalid(format!(
            "rule {} has weekday {}, expected 0..=6",
            rule.id, rule.weekday
        )));
    }
    if end_date < start_date {
        return Err(ScheduleError::invalid(format!(
            "end date {} is before start date {}",
            end_date, start_date
        )));
    }

    // DTSTART must itself match BYDAY, so start from the first matching date.
    let offset = (i64::from(rule.weekday) - i64::from(weekday_index(start_date))).rem_euclid(7);
    let first = start_date + Duration::days(offset);
    if first > end_date {
        return Ok(Vec::new());
    }

    let dtstart = first.and_time(rule.start_time);
    let until = end_date.and_time(rule.start_time);
    let rrule_text = format!(
        "DTSTART;TZID=UTC:{}\nRRULE:FREQ=WEEKLY;BYDAY={};UNTIL={}Z",
        ical(dtstart),
        BYDAY[usize::from(rule.weekday)],
        ical(until)
    );

    let rrule_set: RRuleSet = rrule_text
        .parse()
        .map_err(|e| ScheduleError::Expansion(format!("rule {}: {}", rule.id, e)))?;

    let weeks = (end_date - first).num_days() / 7 + 1;
    let limit = u16::try_from(weeks).unwrap_or(u16::MAX);

    let occurrences = rrule_set
        .all(limit)
        .dates
        .into_iter()
        .map(|dt| {
            let start = dt.with_timezone(&Utc).naive_utc();
            Occurrence::new(
                rule.resource_id,
                start,
                rule.duration_minutes,
                OccurrenceOrigin::Recurring,
            )
        })
        .collect();

    Ok(occurrences)
}

/// Expand every rule over `[start_date, end_date]`, sorted by `(start, resource_id)`.
///
/// Resources without rules simply contribute nothing.
pub fn expand_rules(
    rules: &[RecurrenceRule],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<Occurrence>> {
    let mut occurrences = Vec::new();
    for rule in rules {
        occurrences.extend(expand_rule(rule, start_date, end_date)?);
    }
    occurrences.sort_by_key(|o| (o.start, o.resource_id));
    Ok(occurrences)
}
