//! Interval algebra over half-open `[start, end)` wall-clock ranges.
//!
//! Busy periods are clipped to a window, sorted, and merged (overlapping *or*
//! adjacent periods fold together, tags are unioned). Free time is the set of
//! gaps between merged busy periods inside the window. For busy periods lying
//! inside the window, merged busy minutes plus free minutes always equal the
//! window's minutes.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Where a busy interval came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusySource {
    /// An expanded (and override-adjusted) class occurrence.
    Class,
    /// A booked session.
    Session,
    /// A manual unavailability block.
    Block,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Empty for free intervals.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub sources: BTreeSet<BusySource>,
}

impl Interval {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start,
            end,
            sources: BTreeSet::new(),
        }
    }

    pub fn tagged(start: NaiveDateTime, end: NaiveDateTime, source: BusySource) -> Self {
        Self {
            start,
            end,
            sources: BTreeSet::from([source]),
        }
    }

    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes().max(0)
    }

    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        overlaps(self.start, self.end, start, end)
    }
}

/// Half-open overlap test. Touching ranges (`a.end == b.start`) do not overlap.
pub fn overlaps(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Drop empty or out-of-window intervals and clip the rest to the window.
pub fn normalize(
    intervals: &[Interval],
    range_start: NaiveDateTime,
    range_end: NaiveDateTime,
) -> Vec<Interval> {
    intervals
        .iter()
        .filter(|i| i.start < i.end && i.start < range_end && i.end > range_start)
        .map(|i| Interval {
            start: i.start.max(range_start),
            end: i.end.min(range_end),
            sources: i.sources.clone(),
        })
        .collect()
}

/// Normalize, sort by start, then fold overlapping or adjacent intervals.
///
/// Returns a sorted, non-overlapping, non-touching list.
pub fn merge(
    intervals: &[Interval],
    range_start: NaiveDateTime,
    range_end: NaiveDateTime,
) -> Vec<Interval> {
    let mut clipped = normalize(intervals, range_start, range_end);
    clipped.sort_by_key(|i| (i.start, i.end));

    let mut merged: Vec<Interval> = Vec::with_capacity(clipped.len());
    for interval in clipped {
        if let Some(last) = merged.last_mut() {
            if interval.start <= last.end {
                last.end = last.end.max(interval.end);
                last.sources.extend(interval.sources);
                continue;
            }
        }
        merged.push(interval);
    }
    merged
}

/// Free intervals of `[window_start, window_end)` once `busy` is taken out.
///
/// A degenerate window (`end <= start`) has no free time.
pub fn subtract(
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
    busy: &[Interval],
) -> Vec<Interval> {
    if window_end <= window_start {
        return Vec::new();
    }

    let mut free = Vec::new();
    let mut cursor = window_start;
    for b in merge(busy, window_start, window_end) {
        if cursor < b.start {
            free.push(Interval::new(cursor, b.start));
        }
        cursor = cursor.max(b.end);
    }
    if cursor < window_end {
        free.push(Interval::new(cursor, window_end));
    }
    free
}

/// Sum of interval lengths in minutes. Assumes the intervals do not overlap.
pub fn total_minutes(intervals: &[Interval]) -> i64 {
    intervals.iter().map(Interval::minutes).sum()
}
