//! Search for slots a class could move to.
//!
//! Walks each day of the horizon, takes the teacher's free intervals, and
//! enumerates snap-aligned starts long enough for the class. Slots in the past
//! or clashing with another resource in the same room are dropped. Teacher
//! clashes need no separate check: the slots come from free time.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::availability::teacher_day;
use crate::conflict::RoomBookings;
use crate::context::ScheduleContext;
use crate::error::{Result, ScheduleError};
use crate::model::{Override, RecurrenceRule, Resource, ResourceId, RoomId, TeacherId};
use crate::overrides::effective_overrides;
use crate::time::{snap_up, weekday_index};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub teacher_id: TeacherId,
    pub resource_id: ResourceId,
    pub anchor_date: NaiveDate,
    /// Days to search from `anchor_date`; the configured default when absent.
    #[serde(default)]
    pub horizon_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescheduleSlot {
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: u32,
    pub room_id: Option<RoomId>,
    /// The teacher's total busy minutes on that day.
    pub day_busy_minutes: i64,
    pub is_best_earliest: bool,
    pub is_best_low_load: bool,
}

/// Duration a moved class would have on `date`: that date's override
/// duration, else the rule for that weekday, else the resource default.
pub fn candidate_duration(
    resource: &Resource,
    rules: &[RecurrenceRule],
    overrides: &[Override],
    date: NaiveDate,
) -> u32 {
    let from_override = effective_overrides(overrides)
        .get(&(resource.id, date))
        .and_then(|o| o.new_duration_minutes);
    let weekday = weekday_index(date);
    let from_rule = rules
        .iter()
        .filter(|r| r.resource_id == resource.id && r.weekday == weekday)
        .min_by_key(|r| r.start_time)
        .map(|r| r.duration_minutes);

    from_override
        .or(from_rule)
        .unwrap_or(resource.default_duration_minutes)
}

/// Mark the earliest slot and every slot on the least-loaded day(s), then sort
/// by `(start, day_busy_minutes)`.
pub fn rank_slots(mut slots: Vec<RescheduleSlot>) -> Vec<RescheduleSlot> {
    slots.sort_by_key(|s| (s.start, s.day_busy_minutes));
    if let Some(first) = slots.first_mut() {
        first.is_best_earliest = true;
    }
    if let Some(min_busy) = slots.iter().map(|s| s.day_busy_minutes).min() {
        for slot in slots.iter_mut().filter(|s| s.day_busy_minutes == min_busy) {
            slot.is_best_low_load = true;
        }
    }
    slots
}

/// All valid reschedule slots for `request`, ranked.
///
/// # Errors
/// `NotFound` for an unknown teacher or resource, `InvalidInput` for a horizon
/// of zero or beyond the configured maximum range.
pub fn search(ctx: &ScheduleContext<'_>, request: &RescheduleRequest) -> Result<Vec<RescheduleSlot>> {
    let horizon = request
        .horizon_days
        .unwrap_or(ctx.config.default_horizon_days);
    if horizon == 0 || horizon > ctx.config.max_range_days {
        return Err(ScheduleError::invalid(format!(
            "horizon of {} days is outside 1..={}",
            horizon, ctx.config.max_range_days
        )));
    }

    let resource = ctx.resource(request.resource_id)?;
    let last_day = request.anchor_date + Duration::days(i64::from(horizon) - 1);

    let ids = [resource.id];
    let rules = ctx.store.rules_for(&ids)?;
    let overrides = ctx
        .store
        .overrides_between(&ids, request.anchor_date, last_day)?;

    let room = match resource.room_id {
        Some(room_id) => Some(RoomBookings::load(
            ctx,
            room_id,
            request.anchor_date.and_time(chrono::NaiveTime::MIN),
            (last_day + Duration::days(1)).and_time(chrono::NaiveTime::MIN),
            Some(resource.id),
        )?),
        None => None,
    };

    let mut slots = Vec::new();
    for date in crate::time::dates_between(request.anchor_date, last_day) {
        if date < ctx.today() {
            continue;
        }
        let day = teacher_day(ctx, request.teacher_id, date)?;
        let duration = candidate_duration(&resource, &rules, &overrides, date);
        let length = Duration::minutes(i64::from(duration));
        let step = Duration::minutes(i64::from(day.snap_minutes));

        for free in &day.free_intervals {
            let mut start = snap_up(free.start, day.snap_minutes);
            while start + length <= free.end {
                let end = start + length;
                let in_future = start > ctx.now;
                let room_free = room.as_ref().is_none_or(|r| r.is_free(start, end));
                if in_future && room_free {
                    slots.push(RescheduleSlot {
                        date,
                        start,
                        end,
                        duration_minutes: duration,
                        room_id: resource.room_id,
                        day_busy_minutes: day.total_busy_minutes,
                        is_best_earliest: false,
                        is_best_low_load: false,
                    });
                }
                start += step;
            }
        }
    }

    tracing::debug!(
        teacher_id = request.teacher_id,
        resource_id = request.resource_id,
        horizon,
        slots = slots.len(),
        "reschedule search finished"
    );
    Ok(rank_slots(slots))
}
