//! Shared fixtures for the integration tests.
//!
//! The fixture center (tenant 1) has two rooms and three batches:
//!
//! | resource | name      | room       | teachers | rules                 |
//! |----------|-----------|------------|----------|-----------------------|
//! | 10       | Algebra   | 100 Room A | 7        | Mon 10:00-11:00       |
//! | 11       | Physics   | 100 Room A | 8        | Wed 16:00-17:30       |
//! | 12       | Chemistry | 101 Lab    | 7        | none                  |
//!
//! 2026-02-16 is a Monday.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use schedule_engine::clock::FixedClock;
use schedule_engine::model::{
    BookedSession, Override, RecurrenceRule, Resource, Room, SessionStatus, TeacherPreferences,
    TeacherProfile, UnavailabilityBlock,
};
use schedule_engine::{EngineConfig, MemoryStore, ScheduleEngine, Snapshot};

pub const TENANT: u64 = 1;
pub const OTHER_TENANT: u64 = 2;

pub const ROOM_A: u64 = 100;
pub const LAB: u64 = 101;

pub const ASHA: u64 = 7;
pub const BILAL: u64 = 8;

pub const ALGEBRA: u64 = 10;
pub const PHYSICS: u64 = 11;
pub const CHEMISTRY: u64 = 12;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn at(day: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
    day.and_time(hm(h, m))
}

pub fn monday() -> NaiveDate {
    date(2026, 2, 16)
}

pub fn room(id: u64, name: &str, capacity: u32) -> Room {
    Room {
        id,
        tenant_id: TENANT,
        name: name.to_string(),
        capacity,
    }
}

pub fn resource(id: u64, name: &str, room_id: Option<u64>, teacher_ids: &[u64]) -> Resource {
    Resource {
        id,
        tenant_id: TENANT,
        name: name.to_string(),
        room_id,
        max_occupancy: None,
        default_duration_minutes: 60,
        active: true,
        teacher_ids: teacher_ids.to_vec(),
    }
}

pub fn teacher(id: u64, name: &str) -> TeacherProfile {
    TeacherProfile {
        id,
        tenant_id: TENANT,
        name: name.to_string(),
        work_start: None,
        work_end: None,
        snap_minutes: None,
        preferences: TeacherPreferences::default(),
    }
}

pub fn rule(id: u64, resource_id: u64, weekday: u8, start: (u32, u32), minutes: u32) -> RecurrenceRule {
    RecurrenceRule {
        id,
        resource_id,
        weekday,
        start_time: hm(start.0, start.1),
        duration_minutes: minutes,
    }
}

pub fn cancel(id: u64, resource_id: u64, day: NaiveDate) -> Override {
    Override {
        id,
        resource_id,
        date: day,
        new_start_time: None,
        new_duration_minutes: None,
        cancelled: true,
        reason: "holiday".to_string(),
    }
}

pub fn retime(
    id: u64,
    resource_id: u64,
    day: NaiveDate,
    start: Option<(u32, u32)>,
    minutes: Option<u32>,
) -> Override {
    Override {
        id,
        resource_id,
        date: day,
        new_start_time: start.map(|(h, m)| hm(h, m)),
        new_duration_minutes: minutes,
        cancelled: false,
        reason: String::new(),
    }
}

pub fn session(
    id: u64,
    resource_id: u64,
    start: NaiveDateTime,
    minutes: u32,
    teacher_id: u64,
) -> BookedSession {
    BookedSession {
        id,
        resource_id,
        scheduled_start: start,
        duration_minutes: minutes,
        assigned_teacher_id: teacher_id,
        status: SessionStatus::Scheduled,
        attendance_taken: false,
    }
}

pub fn block(id: u64, teacher_id: u64, day: NaiveDate, start: (u32, u32), end: (u32, u32)) -> UnavailabilityBlock {
    UnavailabilityBlock {
        id,
        teacher_id,
        date: day,
        start_time: hm(start.0, start.1),
        end_time: hm(end.0, end.1),
        reason: String::new(),
    }
}

/// The center described in the module docs. Ids of added rows should start
/// at 1000 to stay clear of these.
pub fn center() -> Snapshot {
    let mut physics = resource(PHYSICS, "Physics", Some(ROOM_A), &[BILAL]);
    physics.max_occupancy = Some(15);
    Snapshot {
        rooms: vec![room(ROOM_A, "Room A", 20), room(LAB, "Lab", 12)],
        resources: vec![
            resource(ALGEBRA, "Algebra", Some(ROOM_A), &[ASHA]),
            physics,
            resource(CHEMISTRY, "Chemistry", Some(LAB), &[ASHA]),
        ],
        teachers: vec![teacher(ASHA, "Asha"), teacher(BILAL, "Bilal")],
        rules: vec![
            rule(20, ALGEBRA, 1, (10, 0), 60),
            rule(21, PHYSICS, 3, (16, 0), 90),
        ],
        ..Snapshot::default()
    }
}

pub fn store(snapshot: Snapshot) -> MemoryStore {
    MemoryStore::from_snapshot(snapshot)
}

/// An engine over `snapshot` whose clock is frozen at `now` (UTC tenant).
pub fn engine(snapshot: Snapshot, now: NaiveDateTime) -> ScheduleEngine {
    ScheduleEngine::new(EngineConfig::default(), Arc::new(store(snapshot)))
        .unwrap()
        .with_clock(Arc::new(FixedClock(now.and_utc())))
}
