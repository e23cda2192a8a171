//! Tests for the half-open interval algebra.

mod common;

use std::collections::BTreeSet;

use common::{at, monday};
use schedule_engine::interval::{merge, normalize, overlaps, subtract, total_minutes};
use schedule_engine::{BusySource, Interval};

fn busy(start: (u32, u32), end: (u32, u32), source: BusySource) -> Interval {
    Interval::tagged(
        at(monday(), start.0, start.1),
        at(monday(), end.0, end.1),
        source,
    )
}

#[test]
fn touching_intervals_do_not_overlap() {
    let d = monday();
    assert!(!overlaps(at(d, 9, 0), at(d, 10, 0), at(d, 10, 0), at(d, 11, 0)));
    assert!(overlaps(at(d, 9, 0), at(d, 10, 1), at(d, 10, 0), at(d, 11, 0)));
}

#[test]
fn adjacent_intervals_merge_and_union_tags() {
    // 10:00-11:00 class and 11:00-11:30 block touch, so they fold into one.
    let merged = merge(
        &[
            busy((11, 0), (11, 30), BusySource::Block),
            busy((10, 0), (11, 0), BusySource::Class),
        ],
        at(monday(), 7, 0),
        at(monday(), 20, 0),
    );

    assert_eq!(merged.len(), 1, "touching intervals should merge");
    assert_eq!(merged[0].start, at(monday(), 10, 0));
    assert_eq!(merged[0].end, at(monday(), 11, 30));
    assert_eq!(
        merged[0].sources,
        BTreeSet::from([BusySource::Class, BusySource::Block])
    );
}

#[test]
fn contained_interval_is_absorbed() {
    let merged = merge(
        &[
            busy((9, 0), (12, 0), BusySource::Session),
            busy((10, 0), (10, 30), BusySource::Class),
        ],
        at(monday(), 7, 0),
        at(monday(), 20, 0),
    );
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].end, at(monday(), 12, 0));
}

#[test]
fn normalize_clips_to_window_and_drops_empties() {
    let window = (at(monday(), 7, 0), at(monday(), 20, 0));
    let clipped = normalize(
        &[
            busy((6, 0), (8, 0), BusySource::Block),
            busy((12, 0), (12, 0), BusySource::Block),
            busy((20, 0), (21, 0), BusySource::Block),
            busy((19, 30), (21, 0), BusySource::Block),
        ],
        window.0,
        window.1,
    );
    assert_eq!(clipped.len(), 2);
    assert_eq!(clipped[0].start, at(monday(), 7, 0));
    assert_eq!(clipped[0].end, at(monday(), 8, 0));
    assert_eq!(clipped[1].start, at(monday(), 19, 30));
    assert_eq!(clipped[1].end, at(monday(), 20, 0));
}

#[test]
fn subtract_yields_gaps_between_busy_blocks() {
    // Window 08:00-17:00, busy 10:00-11:00 and 13:00-14:00.
    let free = subtract(
        at(monday(), 8, 0),
        at(monday(), 17, 0),
        &[
            busy((13, 0), (14, 0), BusySource::Session),
            busy((10, 0), (11, 0), BusySource::Class),
        ],
    );
    let spans: Vec<_> = free.iter().map(|i| (i.start, i.end, i.minutes())).collect();
    assert_eq!(
        spans,
        vec![
            (at(monday(), 8, 0), at(monday(), 10, 0), 120),
            (at(monday(), 11, 0), at(monday(), 13, 0), 120),
            (at(monday(), 14, 0), at(monday(), 17, 0), 180),
        ]
    );
    assert!(free.iter().all(|i| i.sources.is_empty()));
}

#[test]
fn busy_at_window_edges_leaves_no_sliver() {
    let free = subtract(
        at(monday(), 8, 0),
        at(monday(), 10, 0),
        &[
            busy((7, 0), (8, 30), BusySource::Block),
            busy((9, 30), (11, 0), BusySource::Block),
        ],
    );
    assert_eq!(free.len(), 1);
    assert_eq!(free[0].start, at(monday(), 8, 30));
    assert_eq!(free[0].end, at(monday(), 9, 30));
}

#[test]
fn fully_busy_window_has_no_free_time() {
    let free = subtract(
        at(monday(), 9, 0),
        at(monday(), 10, 0),
        &[busy((8, 0), (11, 0), BusySource::Session)],
    );
    assert!(free.is_empty());
}

#[test]
fn degenerate_window_has_no_free_time() {
    let free = subtract(at(monday(), 10, 0), at(monday(), 10, 0), &[]);
    assert!(free.is_empty());
    let free = subtract(at(monday(), 11, 0), at(monday(), 10, 0), &[]);
    assert!(free.is_empty());
}

#[test]
fn empty_busy_list_frees_whole_window() {
    let free = subtract(at(monday(), 7, 0), at(monday(), 20, 0), &[]);
    assert_eq!(total_minutes(&free), 780);
}
