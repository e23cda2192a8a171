//! Compose the calendar: occurrences joined with sessions, rooms and counts.
//!
//! Each occurrence is matched to the booked session nearest its start
//! (an exact start wins; otherwise the closest within the tolerance; equal
//! distances go to the most recently created session). Sessions no occurrence
//! claimed are listed as ad hoc items. Every item finally gets a conflict
//! score: how many other live items share its room at overlapping times.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::context::ScheduleContext;
use crate::error::Result;
use crate::interval::overlaps;
use crate::model::{
    BookedSession, Holiday, OccurrenceOrigin, Resource, ResourceCounts, ResourceId,
    RoomId, SessionId, SessionStatus, TeacherId, TeacherPreferences, ViewKind,
};
use crate::roster::{HolidaySource, RosterStats};
use crate::time::check_range;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub view: ViewKind,
    /// Restrict to one teacher's resources; `None` means the whole tenant.
    #[serde(default)]
    pub teacher_id: Option<TeacherId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Live,
    Upcoming,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    /// No session has been opened for this class.
    NotOpened,
    Pending,
    Taken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOrigin {
    Recurring,
    Adjusted,
    Extra,
    /// A booked session with no matching occurrence.
    Adhoc,
}

impl From<OccurrenceOrigin> for ItemOrigin {
    fn from(origin: OccurrenceOrigin) -> Self {
        match origin {
            OccurrenceOrigin::Recurring => ItemOrigin::Recurring,
            OccurrenceOrigin::Adjusted => ItemOrigin::Adjusted,
            OccurrenceOrigin::Extra => ItemOrigin::Extra,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarItem {
    pub resource_id: ResourceId,
    pub resource_name: String,
    pub room_id: Option<RoomId>,
    pub room_name: Option<String>,
    pub teacher_ids: Vec<TeacherId>,
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: u32,
    pub origin: ItemOrigin,
    pub session_id: Option<SessionId>,
    pub status: DisplayStatus,
    pub attendance_status: AttendanceStatus,
    pub counts: ResourceCounts,
    pub conflict_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarView {
    pub view: ViewKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub teacher_id: Option<TeacherId>,
    pub items: Vec<CalendarItem>,
    pub holidays: Vec<Holiday>,
    pub preferences: Option<TeacherPreferences>,
}

/// Pick the session standing for an occurrence starting at `start`.
///
/// `sessions` should already be limited to the occurrence's resource and date.
pub fn match_session<'a>(
    start: NaiveDateTime,
    sessions: &[&'a BookedSession],
    tolerance_minutes: u32,
) -> Option<&'a BookedSession> {
    let tolerance = i64::from(tolerance_minutes);
    sessions
        .iter()
        .map(|s| ((s.scheduled_start - start).num_minutes().abs(), *s))
        .filter(|(distance, _)| *distance <= tolerance)
        // Smallest distance first; among equals the highest id.
        .min_by_key(|(distance, s)| (*distance, std::cmp::Reverse(s.id)))
        .map(|(_, s)| s)
}

/// Display status of a class running `[start, end)` as seen at `now`.
pub fn display_status(
    start: NaiveDateTime,
    end: NaiveDateTime,
    session: Option<&BookedSession>,
    now: NaiveDateTime,
) -> DisplayStatus {
    match session.map(|s| s.status) {
        Some(SessionStatus::Cancelled) => DisplayStatus::Cancelled,
        Some(SessionStatus::Completed) => DisplayStatus::Completed,
        _ if now >= end => DisplayStatus::Completed,
        _ if now >= start => DisplayStatus::Live,
        _ => DisplayStatus::Upcoming,
    }
}

pub fn attendance_status(session: Option<&BookedSession>) -> AttendanceStatus {
    match session {
        None => AttendanceStatus::NotOpened,
        Some(s) if s.attendance_taken => AttendanceStatus::Taken,
        Some(_) => AttendanceStatus::Pending,
    }
}

/// Fill in `conflict_score` for every item. Cancelled items neither score nor
/// count against others.
pub fn score_conflicts(items: &mut [CalendarItem]) {
    let scores: Vec<u32> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let Some(room) = item.room_id else { return 0 };
            if item.status == DisplayStatus::Cancelled {
                return 0;
            }
            items
                .iter()
                .enumerate()
                .filter(|(j, other)| {
                    *j != i
                        && other.room_id == Some(room)
                        && other.status != DisplayStatus::Cancelled
                        && overlaps(item.start, item.end, other.start, other.end)
                })
                .count() as u32
        })
        .collect();
    for (item, score) in items.iter_mut().zip(scores) {
        item.conflict_score = score;
    }
}

/// Compose the calendar for `resources` over the request's range.
///
/// `resources` is the caller's already-scoped resource list; retired ones are
/// skipped.
pub fn compose(
    ctx: &ScheduleContext<'_>,
    request: &CalendarRequest,
    resources: &[Resource],
    roster: &dyn RosterStats,
    holidays: &dyn HolidaySource,
    preferences: Option<TeacherPreferences>,
) -> Result<CalendarView> {
    check_range(request.start_date, request.end_date, ctx.config.max_range_days)?;

    let resources: Vec<Resource> = resources.iter().filter(|r| r.active).cloned().collect();
    let by_id: HashMap<ResourceId, &Resource> = resources.iter().map(|r| (r.id, r)).collect();
    let ids: Vec<ResourceId> = resources.iter().map(|r| r.id).collect();

    let occurrences = ctx.occurrences(&resources, request.start_date, request.end_date)?;

    let range_start = request.start_date.and_time(NaiveTime::MIN);
    let range_end = (request.end_date + Duration::days(1)).and_time(NaiveTime::MIN);
    let sessions: Vec<BookedSession> = ctx
        .store
        .sessions_overlapping(ctx.tenant_id, range_start, range_end)?
        .into_iter()
        .filter(|s| by_id.contains_key(&s.resource_id))
        .filter(|s| s.scheduled_start >= range_start && s.scheduled_start < range_end)
        .collect();

    let counts = roster.counts(ctx.tenant_id, &ids)?;
    let mut room_names: HashMap<RoomId, Option<String>> = HashMap::new();
    for room_id in resources.iter().filter_map(|r| r.room_id) {
        if !room_names.contains_key(&room_id) {
            let name = ctx.store.room(ctx.tenant_id, room_id)?.map(|r| r.name);
            room_names.insert(room_id, name);
        }
    }

    let item_for = |resource: &Resource,
                    start: NaiveDateTime,
                    end: NaiveDateTime,
                    duration_minutes: u32,
                    origin: ItemOrigin,
                    session: Option<&BookedSession>| CalendarItem {
        resource_id: resource.id,
        resource_name: resource.name.clone(),
        room_id: resource.room_id,
        room_name: resource
            .room_id
            .and_then(|id| room_names.get(&id).cloned().flatten()),
        teacher_ids: resource.teacher_ids.clone(),
        date: start.date(),
        start,
        end,
        duration_minutes,
        origin,
        session_id: session.map(|s| s.id),
        status: display_status(start, end, session, ctx.now),
        attendance_status: attendance_status(session),
        counts: counts.get(&resource.id).copied().unwrap_or_default(),
        conflict_score: 0,
    };

    let mut matched: HashSet<SessionId> = HashSet::new();
    let mut items: Vec<CalendarItem> = Vec::with_capacity(occurrences.len());
    for occ in &occurrences {
        let Some(&resource) = by_id.get(&occ.resource_id) else {
            continue;
        };
        let candidates: Vec<&BookedSession> = sessions
            .iter()
            .filter(|s| s.resource_id == occ.resource_id && s.scheduled_start.date() == occ.date())
            // A session stands for one occurrence at most.
            .filter(|s| !matched.contains(&s.id))
            .collect();
        let session = match_session(
            occ.start,
            &candidates,
            ctx.config.session_match_tolerance_minutes,
        );
        if let Some(s) = session {
            matched.insert(s.id);
        }
        items.push(item_for(
            resource,
            occ.start,
            occ.end,
            occ.duration_minutes,
            occ.origin.into(),
            session,
        ));
    }

    for session in sessions.iter().filter(|s| !matched.contains(&s.id)) {
        if let Some(&resource) = by_id.get(&session.resource_id) {
            items.push(item_for(
                resource,
                session.scheduled_start,
                session.end(),
                session.duration_minutes,
                ItemOrigin::Adhoc,
                Some(session),
            ));
        }
    }

    items.sort_by_key(|i| (i.start, i.resource_id));
    score_conflicts(&mut items);

    tracing::debug!(
        tenant_id = ctx.tenant_id,
        start = %request.start_date,
        end = %request.end_date,
        view = request.view.as_str(),
        items = items.len(),
        "composed calendar"
    );

    Ok(CalendarView {
        view: request.view,
        start_date: request.start_date,
        end_date: request.end_date,
        teacher_id: request.teacher_id,
        items,
        holidays: holidays.holidays(request.start_date, request.end_date)?,
        preferences,
    })
}
