//! Enrollment, fee and risk figures per resource, and the public-holiday list.
//!
//! Both come from services outside this engine; it only reads them.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::Result;
use crate::model::{Holiday, ResourceCounts, ResourceId, TenantId};
use crate::store::Snapshot;

pub trait RosterStats: Send + Sync {
    /// Counts for each requested resource. Missing entries mean all zeros.
    fn counts(
        &self,
        tenant_id: TenantId,
        resource_ids: &[ResourceId],
    ) -> Result<HashMap<ResourceId, ResourceCounts>>;
}

pub trait HolidaySource: Send + Sync {
    /// Holidays dated within `[start, end]`.
    fn holidays(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Holiday>>;
}

/// Fixed counts, e.g. loaded from a snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticStats {
    counts: HashMap<ResourceId, ResourceCounts>,
}

impl StaticStats {
    pub fn new(counts: HashMap<ResourceId, ResourceCounts>) -> Self {
        Self { counts }
    }

    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self::new(
            snapshot
                .counts
                .iter()
                .map(|e| (e.resource_id, e.counts))
                .collect(),
        )
    }
}

impl RosterStats for StaticStats {
    fn counts(
        &self,
        _tenant_id: TenantId,
        resource_ids: &[ResourceId],
    ) -> Result<HashMap<ResourceId, ResourceCounts>> {
        Ok(resource_ids
            .iter()
            .filter_map(|id| self.counts.get(id).map(|c| (*id, *c)))
            .collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticHolidays {
    holidays: Vec<Holiday>,
}

impl StaticHolidays {
    pub fn new(mut holidays: Vec<Holiday>) -> Self {
        holidays.sort_by_key(|h| h.date);
        Self { holidays }
    }
}

impl HolidaySource for StaticHolidays {
    fn holidays(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Holiday>> {
        Ok(self
            .holidays
            .iter()
            .filter(|h| h.date >= start && h.date <= end)
            .cloned()
            .collect())
    }
}
