//! Detect bookings that collide with a candidate window.
//!
//! Two independent checks, both half-open overlap tests
//! (`a.start < b.end && b.start < a.end`): the teacher's own booked sessions,
//! and, when a room is given, every session or class occurrence of the other
//! resources sharing that room. Back-to-back bookings are not conflicts.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::context::ScheduleContext;
use crate::error::{Result, ScheduleError};
use crate::interval::overlaps;
use crate::model::{BookedSession, ResourceId, RoomId, TeacherId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// The teacher already has a booked session then.
    TeacherSession,
    /// Another resource has a booked session in the room.
    RoomSession,
    /// Another resource has a scheduled class in the room.
    RoomClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    /// Session id for session conflicts, resource id for class conflicts.
    pub entity_id: u64,
    pub resource_id: ResourceId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub overlap_minutes: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub ok: bool,
    pub conflicts: Vec<Conflict>,
}

impl ConflictReport {
    pub fn from_conflicts(conflicts: Vec<Conflict>) -> Self {
        Self {
            ok: conflicts.is_empty(),
            conflicts,
        }
    }
}

/// The window being checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub teacher_id: TeacherId,
    pub room_id: Option<RoomId>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Resource whose own bookings never count against the room.
    pub excluding_resource_id: Option<ResourceId>,
}

#[derive(Debug, Clone)]
struct Booking {
    kind: ConflictKind,
    entity_id: u64,
    resource_id: ResourceId,
    resource_name: String,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl Booking {
    fn conflict(&self, start: NaiveDateTime, end: NaiveDateTime) -> Option<Conflict> {
        if !overlaps(self.start, self.end, start, end) {
            return None;
        }
        let overlap_minutes = (self.end.min(end) - self.start.max(start)).num_minutes();
        let what = match self.kind {
            ConflictKind::TeacherSession => "teacher is booked in session",
            ConflictKind::RoomSession => "room is used by session",
            ConflictKind::RoomClass => "room is used by a class of",
        };
        let subject = match self.kind {
            ConflictKind::RoomClass => self.resource_name.clone(),
            _ => format!("{} ({})", self.entity_id, self.resource_name),
        };
        Some(Conflict {
            kind: self.kind,
            entity_id: self.entity_id,
            resource_id: self.resource_id,
            start: self.start,
            end: self.end,
            overlap_minutes,
            message: format!(
                "{} {} from {} to {}",
                what,
                subject,
                self.start.format("%Y-%m-%d %H:%M"),
                self.end.format("%H:%M")
            ),
        })
    }
}

/// Everything occupying one room over a time range, loaded once and then
/// probed for many candidate windows.
#[derive(Debug, Clone)]
pub struct RoomBookings {
    pub room_id: RoomId,
    bookings: Vec<Booking>,
}

impl RoomBookings {
    /// Load sessions and class occurrences in `room_id` overlapping `[start, end)`.
    pub fn load(
        ctx: &ScheduleContext<'_>,
        room_id: RoomId,
        start: NaiveDateTime,
        end: NaiveDateTime,
        excluding_resource_id: Option<ResourceId>,
    ) -> Result<Self> {
        let resources: Vec<_> = ctx
            .store
            .resources(ctx.tenant_id)?
            .into_iter()
            .filter(|r| r.room_id == Some(room_id) && Some(r.id) != excluding_resource_id)
            .collect();
        let name_of = |id: ResourceId| {
            resources
                .iter()
                .find(|r| r.id == id)
                .map(|r| r.name.clone())
                .unwrap_or_default()
        };

        // Whether a session stands for a class is decided over whole days,
        // from the day before (classes may run past midnight) through the last
        // day touched, never over the probed window alone.
        let first_day = start.date() - Duration::days(1);
        let last_day = (end - Duration::seconds(1)).date().max(start.date());
        let sessions: Vec<BookedSession> = ctx
            .store
            .sessions_overlapping(
                ctx.tenant_id,
                first_day.and_time(NaiveTime::MIN),
                (last_day + Duration::days(1)).and_time(NaiveTime::MIN),
            )?
            .into_iter()
            .filter(|s| !s.is_cancelled() && resources.iter().any(|r| r.id == s.resource_id))
            .collect();

        let classes: Vec<Booking> = ctx
            .occurrences(&resources, first_day, last_day)?
            .into_iter()
            .filter(|o| {
                !sessions
                    .iter()
                    .any(|s| s.resource_id == o.resource_id && s.scheduled_start == o.start)
            })
            .filter(|o| overlaps(o.start, o.end, start, end))
            .map(|o| Booking {
                kind: ConflictKind::RoomClass,
                entity_id: o.resource_id,
                resource_id: o.resource_id,
                resource_name: name_of(o.resource_id),
                start: o.start,
                end: o.end,
            })
            .collect();

        let mut bookings: Vec<Booking> = sessions
            .into_iter()
            .filter(|s| overlaps(s.scheduled_start, s.end(), start, end))
            .map(|s| Booking {
                kind: ConflictKind::RoomSession,
                entity_id: s.id,
                resource_id: s.resource_id,
                resource_name: name_of(s.resource_id),
                start: s.scheduled_start,
                end: s.end(),
            })
            .collect();
        bookings.extend(classes);
        bookings.sort_by_key(|b| (b.start, b.entity_id));

        Ok(Self { room_id, bookings })
    }

    pub fn conflicts_with(&self, start: NaiveDateTime, end: NaiveDateTime) -> Vec<Conflict> {
        self.bookings
            .iter()
            .filter_map(|b| b.conflict(start, end))
            .collect()
    }

    pub fn is_free(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        !self
            .bookings
            .iter()
            .any(|b| overlaps(b.start, b.end, start, end))
    }
}

/// The teacher's non-cancelled booked sessions overlapping `[start, end)`.
pub fn teacher_conflicts(
    ctx: &ScheduleContext<'_>,
    teacher_id: TeacherId,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<Conflict>> {
    let sessions = ctx.store.sessions_overlapping(ctx.tenant_id, start, end)?;
    let mut conflicts = Vec::new();
    for s in sessions
        .into_iter()
        .filter(|s| !s.is_cancelled() && s.assigned_teacher_id == teacher_id)
    {
        let resource_name = ctx
            .store
            .resource(ctx.tenant_id, s.resource_id)?
            .map(|r| r.name)
            .unwrap_or_default();
        let booking = Booking {
            kind: ConflictKind::TeacherSession,
            entity_id: s.id,
            resource_id: s.resource_id,
            resource_name,
            start: s.scheduled_start,
            end: s.end(),
        };
        conflicts.extend(booking.conflict(start, end));
    }
    Ok(conflicts)
}

/// Run the teacher check and, if a room is given, the room check.
///
/// # Errors
/// `InvalidInput` when the candidate window is empty or reversed.
pub fn detect_conflicts(ctx: &ScheduleContext<'_>, candidate: &Candidate) -> Result<ConflictReport> {
    if candidate.end <= candidate.start {
        return Err(ScheduleError::invalid(format!(
            "candidate window {} - {} is empty",
            candidate.start, candidate.end
        )));
    }

    let mut conflicts = teacher_conflicts(ctx, candidate.teacher_id, candidate.start, candidate.end)?;
    if let Some(room_id) = candidate.room_id {
        let room = RoomBookings::load(
            ctx,
            room_id,
            candidate.start,
            candidate.end,
            candidate.excluding_resource_id,
        )?;
        conflicts.extend(room.conflicts_with(candidate.start, candidate.end));
    }
    Ok(ConflictReport::from_conflicts(conflicts))
}
