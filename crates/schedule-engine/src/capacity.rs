//! Seats filled versus seats available, per batch.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::context::ScheduleContext;
use crate::error::Result;
use crate::load::round2;
use crate::model::{Resource, ResourceId, RoomId};
use crate::roster::RosterStats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityRow {
    pub resource_id: ResourceId,
    pub resource_name: String,
    pub room_id: Option<RoomId>,
    pub room_name: Option<String>,
    pub enrolled: u32,
    /// `max_occupancy`, else the room's capacity. Unknown when neither is set.
    pub capacity: Option<u32>,
    pub available_seats: Option<u32>,
    pub utilization_percentage: Option<f64>,
}

/// `enrolled / capacity * 100`, two decimals. `None` for an unknown or zero
/// capacity.
pub fn seat_utilization(enrolled: u32, capacity: Option<u32>) -> Option<f64> {
    match capacity {
        Some(c) if c > 0 => Some(round2(f64::from(enrolled) / f64::from(c) * 100.0)),
        _ => None,
    }
}

/// One row per active resource in `resources`, ordered by name then id.
pub fn batch_capacity(
    ctx: &ScheduleContext<'_>,
    resources: &[Resource],
    roster: &dyn RosterStats,
) -> Result<Vec<CapacityRow>> {
    let resources: Vec<&Resource> = resources.iter().filter(|r| r.active).collect();
    let ids: Vec<ResourceId> = resources.iter().map(|r| r.id).collect();
    let counts = roster.counts(ctx.tenant_id, &ids)?;

    let mut rooms = HashMap::new();
    for room_id in resources.iter().filter_map(|r| r.room_id) {
        if !rooms.contains_key(&room_id) {
            rooms.insert(room_id, ctx.store.room(ctx.tenant_id, room_id)?);
        }
    }

    let mut rows: Vec<CapacityRow> = resources
        .into_iter()
        .map(|resource| {
            let room = resource.room_id.and_then(|id| rooms.get(&id).cloned().flatten());
            let enrolled = counts
                .get(&resource.id)
                .map(|c| c.active_enrollment)
                .unwrap_or(0);
            let capacity = resource
                .max_occupancy
                .or_else(|| room.as_ref().map(|r| r.capacity));
            CapacityRow {
                resource_id: resource.id,
                resource_name: resource.name.clone(),
                room_id: resource.room_id,
                room_name: room.map(|r| r.name),
                enrolled,
                capacity,
                available_seats: capacity.map(|c| c.saturating_sub(enrolled)),
                utilization_percentage: seat_utilization(enrolled, capacity),
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        a.resource_name
            .cmp(&b.resource_name)
            .then(a.resource_id.cmp(&b.resource_id))
    });
    Ok(rows)
}
