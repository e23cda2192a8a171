//! Per-teacher, per-day availability.
//!
//! Three busy streams feed one merge: the teacher's class occurrences, booked
//! sessions, and manual unavailability blocks. Merged busy time is subtracted
//! from the working window, so busy and free intervals partition the window
//! exactly.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::context::{ScheduleContext, WorkWindow};
use crate::error::Result;
use crate::interval::{self, BusySource, Interval};
use crate::model::{Resource, TeacherId, UNASSIGNED_TEACHER};

/// A teacher's busy/free picture for one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayAvailability {
    pub teacher_id: TeacherId,
    pub date: NaiveDate,
    pub work_window: WorkWindow,
    pub snap_minutes: u32,
    /// Snapped start of the analysed window.
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
    /// Merged busy blocks (sorted, non-overlapping), tagged with their sources.
    pub busy_intervals: Vec<Interval>,
    /// Gaps between busy blocks inside the window.
    pub free_intervals: Vec<Interval>,
    pub total_busy_minutes: i64,
    pub total_free_minutes: i64,
}

/// Merge `busy` into a day's availability. Pure; no store access.
///
/// A degenerate window (end not after the snapped start) yields no busy and no
/// free time.
pub fn compute_day(
    teacher_id: TeacherId,
    date: NaiveDate,
    window: WorkWindow,
    busy: &[Interval],
) -> DayAvailability {
    let (window_start, window_end) = window.on(date);

    let (busy_intervals, free_intervals) = if window_start < window_end {
        (
            interval::merge(busy, window_start, window_end),
            interval::subtract(window_start, window_end, busy),
        )
    } else {
        (Vec::new(), Vec::new())
    };

    DayAvailability {
        teacher_id,
        date,
        work_window: window,
        snap_minutes: window.snap_minutes,
        window_start,
        window_end,
        total_busy_minutes: interval::total_minutes(&busy_intervals),
        total_free_minutes: interval::total_minutes(&free_intervals),
        busy_intervals,
        free_intervals,
    }
}

/// Gather a teacher's busy intervals touching `date` from all three sources.
///
/// `resources` are the active resources the teacher is bound to. Unassigned
/// sessions count only when they belong to one of those resources.
pub fn collect_busy(
    ctx: &ScheduleContext<'_>,
    teacher_id: TeacherId,
    resources: &[Resource],
    date: NaiveDate,
) -> Result<Vec<Interval>> {
    let day_start = date.and_time(chrono::NaiveTime::MIN);
    let day_end = day_start + Duration::days(1);

    // Yesterday's late classes can run past midnight.
    let mut busy: Vec<Interval> = ctx
        .occurrences(resources, date - Duration::days(1), date)?
        .into_iter()
        .filter(|o| interval::overlaps(o.start, o.end, day_start, day_end))
        .map(|o| Interval::tagged(o.start, o.end, BusySource::Class))
        .collect();
    busy.extend(
        ctx.store
            .sessions_overlapping(ctx.tenant_id, day_start, day_end)?
            .into_iter()
            .filter(|s| !s.is_cancelled())
            .filter(|s| {
                s.assigned_teacher_id == teacher_id
                    || (s.assigned_teacher_id == UNASSIGNED_TEACHER
                        && resources.iter().any(|r| r.id == s.resource_id))
            })
            .map(|s| Interval::tagged(s.scheduled_start, s.end(), BusySource::Session)),
    );

    busy.extend(
        ctx.store
            .blocks_on(teacher_id, date)?
            .into_iter()
            .map(|b| Interval::tagged(b.start(), b.end(), BusySource::Block)),
    );

    Ok(busy)
}

/// Availability of `teacher_id` on `date`.
///
/// # Errors
/// `NotFound` when the teacher is not part of the context's tenant.
pub fn teacher_day(
    ctx: &ScheduleContext<'_>,
    teacher_id: TeacherId,
    date: NaiveDate,
) -> Result<DayAvailability> {
    let teacher = ctx.teacher(teacher_id)?;
    let window = ctx.work_window(&teacher);
    let resources = ctx.teacher_resources(teacher_id)?;
    let busy = collect_busy(ctx, teacher_id, &resources, date)?;
    let day = compute_day(teacher_id, date, window, &busy);

    tracing::trace!(
        teacher_id,
        %date,
        busy = day.total_busy_minutes,
        free = day.total_free_minutes,
        "computed day availability"
    );
    Ok(day)
}
