//! Apply per-date overrides onto expanded occurrences.
//!
//! Occurrences are grouped by `(resource_id, date)`. Only the latest-created
//! override (highest id) per key takes effect:
//!
//! - `cancelled` clears the key, whatever else the row says;
//! - otherwise existing occurrences get the new start and/or duration;
//! - a key with no occurrence gains an extra one when a new start is given;
//! - anything else is a no-op.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::model::{Occurrence, OccurrenceOrigin, Override, ResourceId};

/// Keep the highest-id override per `(resource_id, date)`.
pub fn effective_overrides(overrides: &[Override]) -> BTreeMap<(ResourceId, NaiveDate), &Override> {
    let mut effective: BTreeMap<(ResourceId, NaiveDate), &Override> = BTreeMap::new();
    for o in overrides {
        let key = (o.resource_id, o.date);
        match effective.get(&key) {
            Some(existing) if existing.id > o.id => {}
            _ => {
                effective.insert(key, o);
            }
        }
    }
    effective
}

/// Merge `overrides` into `occurrences`.
///
/// The caller passes only overrides for resources and dates it expanded;
/// an override for a date outside that range would otherwise synthesize an
/// extra class there. `extra_duration_minutes` sizes extra classes whose
/// override carries no duration.
pub fn apply_overrides(
    occurrences: Vec<Occurrence>,
    overrides: &[Override],
    extra_duration_minutes: u32,
) -> Vec<Occurrence> {
    let mut grouped: BTreeMap<(ResourceId, NaiveDate), Vec<Occurrence>> = BTreeMap::new();
    for occ in occurrences {
        grouped
            .entry((occ.resource_id, occ.date()))
            .or_default()
            .push(occ);
    }

    for ((resource_id, date), o) in effective_overrides(overrides) {
        let slot = grouped.entry((resource_id, date)).or_default();

        if o.cancelled {
            slot.clear();
            continue;
        }

        if !slot.is_empty() {
            if o.new_start_time.is_none() && o.new_duration_minutes.is_none() {
                continue;
            }
            for occ in slot.iter_mut() {
                let start = o
                    .new_start_time
                    .map(|t| date.and_time(t))
                    .unwrap_or(occ.start);
                let duration = o.new_duration_minutes.unwrap_or(occ.duration_minutes);
                *occ = Occurrence::new(resource_id, start, duration, OccurrenceOrigin::Adjusted);
            }
        } else if let Some(start_time) = o.new_start_time {
            let duration = o.new_duration_minutes.unwrap_or(extra_duration_minutes);
            slot.push(Occurrence::new(
                resource_id,
                date.and_time(start_time),
                duration,
                OccurrenceOrigin::Extra,
            ));
        }
    }

    let mut merged: Vec<Occurrence> = grouped.into_values().flatten().collect();
    merged.sort_by_key(|o| (o.start, o.resource_id));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ovr(id: u64, cancelled: bool) -> Override {
        Override {
            id,
            resource_id: 1,
            date: NaiveDate::from_ymd_opt(2026, 2, 16).unwrap(),
            new_start_time: None,
            new_duration_minutes: None,
            cancelled,
            reason: String::new(),
        }
    }

    #[test]
    fn latest_override_per_key_wins() {
        let rows = vec![ovr(3, false), ovr(7, true), ovr(5, false)];
        let effective = effective_overrides(&rows);
        assert_eq!(effective.len(), 1);
        assert_eq!(effective.values().next().unwrap().id, 7);
    }
}
