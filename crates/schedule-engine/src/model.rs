//! Persisted rows and the derived [`Occurrence`].
//!
//! Times of day are wall-clock `NaiveTime` in the tenant's timezone and
//! serialize as `"HH:MM"`.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::time::{hhmm, hhmm_opt};

pub type TenantId = u64;
pub type TeacherId = u64;
pub type ResourceId = u64;
pub type RoomId = u64;
pub type RuleId = u64;
pub type OverrideId = u64;
pub type SessionId = u64;
pub type BlockId = u64;

/// `assigned_teacher_id` of a session nobody has been assigned to.
pub const UNASSIGNED_TEACHER: TeacherId = 0;

fn default_true() -> bool {
    true
}

fn default_duration() -> u32 {
    60
}

/// A weekly class slot of a resource (batch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub id: RuleId,
    pub resource_id: ResourceId,
    /// `0 = Sunday … 6 = Saturday`.
    pub weekday: u8,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
}

/// A per-date exception for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Override {
    pub id: OverrideId,
    pub resource_id: ResourceId,
    pub date: NaiveDate,
    #[serde(default, with = "hhmm_opt")]
    pub new_start_time: Option<NaiveTime>,
    #[serde(default)]
    pub new_duration_minutes: Option<u32>,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Scheduled,
    Live,
    Completed,
    Cancelled,
}

/// A concrete, persisted class instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedSession {
    pub id: SessionId,
    pub resource_id: ResourceId,
    pub scheduled_start: NaiveDateTime,
    pub duration_minutes: u32,
    #[serde(default)]
    pub assigned_teacher_id: TeacherId,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub attendance_taken: bool,
}

impl BookedSession {
    pub fn end(&self) -> NaiveDateTime {
        self.scheduled_start + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == SessionStatus::Cancelled
    }
}

/// A manual "not available" window on a teacher's day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailabilityBlock {
    pub id: BlockId,
    pub teacher_id: TeacherId,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub reason: String,
}

impl UnavailabilityBlock {
    pub fn start(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn end(&self) -> NaiveDateTime {
        self.date.and_time(self.end_time)
    }
}

/// A batch: the unit that owns recurrence rules and sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub tenant_id: TenantId,
    pub name: String,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub max_occupancy: Option<u32>,
    #[serde(default = "default_duration")]
    pub default_duration_minutes: u32,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub teacher_ids: Vec<TeacherId>,
}

impl Resource {
    pub fn is_taught_by(&self, teacher_id: TeacherId) -> bool {
        self.teacher_ids.contains(&teacher_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub tenant_id: TenantId,
    pub name: String,
    pub capacity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Day,
    #[default]
    Week,
    Month,
    Agenda,
}

impl ViewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::Day => "day",
            ViewKind::Week => "week",
            ViewKind::Month => "month",
            ViewKind::Agenda => "agenda",
        }
    }
}

impl std::str::FromStr for ViewKind {
    type Err = crate::error::ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(ViewKind::Day),
            "week" => Ok(ViewKind::Week),
            "month" => Ok(ViewKind::Month),
            "agenda" => Ok(ViewKind::Agenda),
            other => Err(crate::error::ScheduleError::InvalidInput(format!(
                "unknown view '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    #[default]
    H24,
    H12,
}

/// Calendar display settings returned alongside a calendar view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeacherPreferences {
    pub default_view: ViewKind,
    /// Same numbering as [`RecurrenceRule::weekday`].
    pub week_starts_on: u8,
    pub time_format: TimeFormat,
}

impl Default for TeacherPreferences {
    fn default() -> Self {
        Self {
            default_view: ViewKind::Week,
            week_starts_on: 1,
            time_format: TimeFormat::H24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherProfile {
    pub id: TeacherId,
    pub tenant_id: TenantId,
    pub name: String,
    #[serde(default, with = "hhmm_opt")]
    pub work_start: Option<NaiveTime>,
    #[serde(default, with = "hhmm_opt")]
    pub work_end: Option<NaiveTime>,
    #[serde(default)]
    pub snap_minutes: Option<u32>,
    #[serde(default)]
    pub preferences: TeacherPreferences,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceOrigin {
    /// Straight from a weekly rule.
    Recurring,
    /// A rule occurrence moved or resized by an override.
    Adjusted,
    /// Added by an override on a day without a rule.
    Extra,
}

/// A concrete class instance derived from rules and overrides. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub resource_id: ResourceId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: u32,
    pub origin: OccurrenceOrigin,
}

impl Occurrence {
    pub fn new(
        resource_id: ResourceId,
        start: NaiveDateTime,
        duration_minutes: u32,
        origin: OccurrenceOrigin,
    ) -> Self {
        Self {
            resource_id,
            start,
            end: start + Duration::minutes(i64::from(duration_minutes)),
            duration_minutes,
            origin,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

/// Per-resource figures supplied by the enrollment/fee/risk services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceCounts {
    pub active_enrollment: u32,
    pub unpaid_fee_count: u32,
    pub at_risk_count: u32,
}

// ── Write payloads ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRule {
    pub resource_id: ResourceId,
    pub weekday: u8,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
}

impl NewRule {
    pub fn into_row(self, id: RuleId) -> RecurrenceRule {
        RecurrenceRule {
            id,
            resource_id: self.resource_id,
            weekday: self.weekday,
            start_time: self.start_time,
            duration_minutes: self.duration_minutes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOverride {
    pub resource_id: ResourceId,
    pub date: NaiveDate,
    #[serde(default, with = "hhmm_opt")]
    pub new_start_time: Option<NaiveTime>,
    #[serde(default)]
    pub new_duration_minutes: Option<u32>,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub reason: String,
}

impl NewOverride {
    pub fn into_row(self, id: OverrideId) -> Override {
        Override {
            id,
            resource_id: self.resource_id,
            date: self.date,
            new_start_time: self.new_start_time,
            new_duration_minutes: self.new_duration_minutes,
            cancelled: self.cancelled,
            reason: self.reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBlock {
    pub teacher_id: TeacherId,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub reason: String,
}

impl NewBlock {
    pub fn into_row(self, id: BlockId) -> UnavailabilityBlock {
        UnavailabilityBlock {
            id,
            teacher_id: self.teacher_id,
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            reason: self.reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSession {
    pub resource_id: ResourceId,
    pub scheduled_start: NaiveDateTime,
    pub duration_minutes: u32,
    pub assigned_teacher_id: TeacherId,
}

impl NewSession {
    pub fn into_row(self, id: SessionId) -> BookedSession {
        BookedSession {
            id,
            resource_id: self.resource_id,
            scheduled_start: self.scheduled_start,
            duration_minutes: self.duration_minutes,
            assigned_teacher_id: self.assigned_teacher_id,
            status: SessionStatus::Scheduled,
            attendance_taken: false,
        }
    }
}
