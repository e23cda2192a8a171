//! Tests for calendar composition.

mod common;

use chrono::{NaiveDate, NaiveDateTime};
use common::*;
use schedule_engine::calendar::{
    compose, AttendanceStatus, CalendarItem, CalendarRequest, DisplayStatus, ItemOrigin,
};
use schedule_engine::context::ScheduleContext;
use schedule_engine::model::{Holiday, ResourceCounts, SessionStatus, ViewKind};
use schedule_engine::roster::{StaticHolidays, StaticStats};
use schedule_engine::store::ResourceCountsEntry;
use schedule_engine::{CalendarView, EngineConfig, ScheduleError, Scope, Snapshot};

fn compose_at(snapshot: Snapshot, now: NaiveDateTime, start: NaiveDate, end: NaiveDate) -> CalendarView {
    let stats = StaticStats::from_snapshot(&snapshot);
    let holidays = StaticHolidays::new(snapshot.holidays.clone());
    let resources = snapshot.resources.clone();
    let store = store(snapshot);
    let config = EngineConfig::default();
    let ctx = ScheduleContext::new(&store, &config, TENANT, now);
    let request = CalendarRequest {
        start_date: start,
        end_date: end,
        view: ViewKind::Week,
        teacher_id: None,
    };
    compose(&ctx, &request, &resources, &stats, &holidays, None).unwrap()
}

fn items_for(view: &CalendarView, resource_id: u64) -> Vec<&CalendarItem> {
    view.items
        .iter()
        .filter(|i| i.resource_id == resource_id)
        .collect()
}

fn sunday_morning() -> NaiveDateTime {
    at(date(2026, 2, 15), 8, 0)
}

#[test]
fn cancelled_monday_leaves_next_monday_intact() {
    let mut snapshot = center();
    snapshot.overrides = vec![cancel(1000, ALGEBRA, monday())];

    let view = compose_at(snapshot.clone(), sunday_morning(), monday(), monday());
    assert!(items_for(&view, ALGEBRA).is_empty());

    let next = date(2026, 2, 23);
    let view = compose_at(snapshot, sunday_morning(), next, next);
    let items = items_for(&view, ALGEBRA);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].start, at(next, 10, 0));
    assert_eq!(items[0].end, at(next, 11, 0));
}

#[test]
fn composing_twice_gives_the_same_view() {
    let mut snapshot = center();
    snapshot.sessions = vec![session(1000, ALGEBRA, at(monday(), 10, 5), 60, ASHA)];
    let first = compose_at(snapshot.clone(), sunday_morning(), monday(), date(2026, 2, 22));
    let second = compose_at(snapshot, sunday_morning(), monday(), date(2026, 2, 22));
    assert_eq!(first, second);
}

#[test]
fn items_carry_room_and_resource_metadata() {
    let mut snapshot = center();
    snapshot.counts = vec![ResourceCountsEntry {
        resource_id: ALGEBRA,
        counts: ResourceCounts {
            active_enrollment: 14,
            unpaid_fee_count: 2,
            at_risk_count: 1,
        },
    }];
    let view = compose_at(snapshot, sunday_morning(), monday(), monday());
    let item = items_for(&view, ALGEBRA)[0];

    assert_eq!(item.resource_name, "Algebra");
    assert_eq!(item.room_name.as_deref(), Some("Room A"));
    assert_eq!(item.teacher_ids, vec![ASHA]);
    assert_eq!(item.counts.active_enrollment, 14);
    assert_eq!(item.counts.unpaid_fee_count, 2);
    assert_eq!(item.origin, ItemOrigin::Recurring);
    assert_eq!(item.status, DisplayStatus::Upcoming);
    assert_eq!(item.attendance_status, AttendanceStatus::NotOpened);
}

#[test]
fn extra_class_appears_on_override_date() {
    let thursday = date(2026, 2, 19);
    let mut snapshot = center();
    snapshot.overrides = vec![retime(1000, CHEMISTRY, thursday, Some((18, 0)), None)];

    let view = compose_at(snapshot, sunday_morning(), monday(), date(2026, 2, 22));
    let items = items_for(&view, CHEMISTRY);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].origin, ItemOrigin::Extra);
    assert_eq!(items[0].start, at(thursday, 18, 0));
}

#[test]
fn status_follows_now_and_session() {
    let mut snapshot = center();
    let wednesday = date(2026, 2, 18);
    let mut done = session(1000, PHYSICS, at(wednesday, 16, 0), 90, BILAL);
    done.status = SessionStatus::Completed;
    done.attendance_taken = true;
    snapshot.sessions = vec![done];

    // Monday 10:30: Algebra is in progress.
    let view = compose_at(snapshot.clone(), at(monday(), 10, 30), monday(), wednesday);
    assert_eq!(items_for(&view, ALGEBRA)[0].status, DisplayStatus::Live);
    let physics = items_for(&view, PHYSICS)[0];
    assert_eq!(physics.status, DisplayStatus::Completed);
    assert_eq!(physics.attendance_status, AttendanceStatus::Taken);
    assert_eq!(physics.session_id, Some(1000));

    // Monday 11:00: the class just ended without a session.
    let view = compose_at(snapshot, at(monday(), 11, 0), monday(), monday());
    assert_eq!(items_for(&view, ALGEBRA)[0].status, DisplayStatus::Completed);
}

#[test]
fn cancelled_session_marks_item_cancelled() {
    let mut snapshot = center();
    let mut s = session(1000, ALGEBRA, at(monday(), 10, 0), 60, ASHA);
    s.status = SessionStatus::Cancelled;
    snapshot.sessions = vec![s];

    let view = compose_at(snapshot, sunday_morning(), monday(), monday());
    let item = items_for(&view, ALGEBRA)[0];
    assert_eq!(item.status, DisplayStatus::Cancelled);
    assert_eq!(item.attendance_status, AttendanceStatus::Pending);
}

#[test]
fn sessions_match_within_tolerance_else_show_as_adhoc() {
    let mut snapshot = center();
    snapshot.sessions = vec![
        // 40 minutes late: still the 10:00 class.
        session(1000, ALGEBRA, at(monday(), 10, 40), 60, ASHA),
        // Another resource entirely: ad hoc.
        session(1001, CHEMISTRY, at(monday(), 15, 0), 60, ASHA),
    ];

    let view = compose_at(snapshot, sunday_morning(), monday(), monday());
    assert_eq!(items_for(&view, ALGEBRA)[0].session_id, Some(1000));
    let adhoc = items_for(&view, CHEMISTRY);
    assert_eq!(adhoc.len(), 1);
    assert_eq!(adhoc[0].origin, ItemOrigin::Adhoc);
    assert_eq!(adhoc[0].session_id, Some(1001));
}

#[test]
fn session_beyond_tolerance_is_not_matched() {
    let mut snapshot = center();
    snapshot.sessions = vec![session(1000, ALGEBRA, at(monday(), 10, 50), 60, ASHA)];

    let view = compose_at(snapshot, sunday_morning(), monday(), monday());
    let items = items_for(&view, ALGEBRA);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].session_id, None);
    assert_eq!(items[1].origin, ItemOrigin::Adhoc);
}

#[test]
fn exact_start_wins_and_ties_go_to_newest() {
    let mut snapshot = center();
    snapshot.sessions = vec![
        session(1000, ALGEBRA, at(monday(), 9, 50), 60, ASHA),
        session(1001, ALGEBRA, at(monday(), 10, 10), 60, ASHA),
        session(1002, ALGEBRA, at(monday(), 10, 0), 60, ASHA),
    ];
    let view = compose_at(snapshot.clone(), sunday_morning(), monday(), monday());
    let class = items_for(&view, ALGEBRA)
        .into_iter()
        .find(|i| i.origin == ItemOrigin::Recurring)
        .unwrap();
    assert_eq!(class.session_id, Some(1002));

    // Without the exact row, 09:50 and 10:10 are equally far: newest wins.
    snapshot.sessions.pop();
    let view = compose_at(snapshot, sunday_morning(), monday(), monday());
    let class = items_for(&view, ALGEBRA)
        .into_iter()
        .find(|i| i.origin == ItemOrigin::Recurring)
        .unwrap();
    assert_eq!(class.session_id, Some(1001));
}

#[test]
fn one_session_is_claimed_by_one_occurrence() {
    let mut snapshot = center();
    snapshot.rules.push(rule(30, CHEMISTRY, 1, (10, 0), 30));
    snapshot.rules.push(rule(31, CHEMISTRY, 1, (10, 30), 30));
    // 15 minutes from both classes.
    snapshot.sessions = vec![session(1000, CHEMISTRY, at(monday(), 10, 15), 30, ASHA)];

    let view = compose_at(snapshot, sunday_morning(), monday(), monday());
    let items = items_for(&view, CHEMISTRY);
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.origin == ItemOrigin::Recurring));
    let claimed: Vec<_> = items.iter().filter_map(|i| i.session_id).collect();
    assert_eq!(claimed, vec![1000]);
}

#[test]
fn conflict_score_counts_other_overlapping_items_in_room() {
    let mut snapshot = center();
    // Two extra classes in Room A overlapping Algebra's Monday class.
    snapshot.sessions = vec![
        session(1000, PHYSICS, at(monday(), 10, 30), 60, BILAL),
        session(1001, PHYSICS, at(monday(), 10, 45), 30, BILAL),
    ];
    let view = compose_at(snapshot.clone(), sunday_morning(), monday(), monday());
    let algebra = items_for(&view, ALGEBRA)[0];
    assert_eq!(algebra.conflict_score, 2);
    for physics in items_for(&view, PHYSICS) {
        assert_eq!(physics.conflict_score, 2);
    }

    // A cancelled session stops counting.
    snapshot.sessions[1].status = SessionStatus::Cancelled;
    let view = compose_at(snapshot, sunday_morning(), monday(), monday());
    assert_eq!(items_for(&view, ALGEBRA)[0].conflict_score, 1);
}

#[test]
fn holidays_in_range_are_listed() {
    let mut snapshot = center();
    snapshot.holidays = vec![
        Holiday { date: date(2026, 2, 17), name: "Carnival".to_string() },
        Holiday { date: date(2026, 3, 17), name: "Later".to_string() },
    ];
    let view = compose_at(snapshot, sunday_morning(), monday(), date(2026, 2, 22));
    assert_eq!(view.holidays.len(), 1);
    assert_eq!(view.holidays[0].name, "Carnival");
}

#[test]
fn teacher_calendar_is_scoped_to_own_resources() {
    let engine = engine(center(), sunday_morning());
    let scope = Scope::Teacher { tenant_id: TENANT, teacher_id: BILAL };
    let request = CalendarRequest {
        start_date: monday(),
        end_date: date(2026, 2, 22),
        view: ViewKind::Week,
        teacher_id: None,
    };

    let view = engine.calendar_view(&scope, &request).unwrap();
    assert_eq!(view.teacher_id, Some(BILAL));
    assert!(view.items.iter().all(|i| i.resource_id == PHYSICS));
    assert_eq!(view.items.len(), 1);
    assert!(view.preferences.is_some());

    let err = engine
        .calendar_view(&scope, &CalendarRequest { teacher_id: Some(ASHA), ..request })
        .unwrap_err();
    assert!(matches!(err, ScheduleError::Forbidden(_)));
}

#[test]
fn oversized_or_reversed_range_is_rejected() {
    let engine = engine(center(), sunday_morning());
    let admin = Scope::Admin { tenant_id: TENANT, actor_id: 1 };
    for (start, end) in [(monday(), date(2026, 2, 1)), (monday(), date(2026, 6, 1))] {
        let err = engine
            .calendar_view(
                &admin,
                &CalendarRequest { start_date: start, end_date: end, view: ViewKind::Month, teacher_id: None },
            )
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidInput(_)));
    }
}
