//! Everything a single computation reads from: the store, the configuration,
//! the tenant and a frozen "now".

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::config::{clamp_snap, EngineConfig};
use crate::error::{Result, ScheduleError};
use crate::expander::expand_rules;
use crate::model::{Occurrence, Resource, ResourceId, TeacherId, TeacherProfile, TenantId};
use crate::overrides::apply_overrides;
use crate::store::ScheduleStore;
use crate::time::{hhmm, snap_up};

/// A teacher's resolved daily working hours and snap granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkWindow {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
    pub snap_minutes: u32,
}

impl WorkWindow {
    /// The window on `date`, start rounded up to the snap boundary.
    pub fn on(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        (
            snap_up(date.and_time(self.start), self.snap_minutes),
            date.and_time(self.end),
        )
    }

    /// Minutes in one day's snapped window; zero or negative when degenerate.
    pub fn minutes_per_day(&self) -> i64 {
        let (start, end) = self.on(NaiveDate::default());
        (end - start).num_minutes()
    }
}

#[derive(Clone, Copy)]
pub struct ScheduleContext<'a> {
    pub store: &'a dyn ScheduleStore,
    pub config: &'a EngineConfig,
    pub tenant_id: TenantId,
    /// Tenant wall-clock time when the operation started.
    pub now: NaiveDateTime,
}

impl<'a> ScheduleContext<'a> {
    pub fn new(
        store: &'a dyn ScheduleStore,
        config: &'a EngineConfig,
        tenant_id: TenantId,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            store,
            config,
            tenant_id,
            now,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }

    pub fn teacher(&self, id: TeacherId) -> Result<TeacherProfile> {
        self.store
            .teacher(self.tenant_id, id)?
            .ok_or_else(|| ScheduleError::not_found("teacher", id))
    }

    pub fn resource(&self, id: ResourceId) -> Result<Resource> {
        self.store
            .resource(self.tenant_id, id)?
            .ok_or_else(|| ScheduleError::not_found("resource", id))
    }

    pub fn active_resources(&self) -> Result<Vec<Resource>> {
        Ok(self
            .store
            .resources(self.tenant_id)?
            .into_iter()
            .filter(|r| r.active)
            .collect())
    }

    /// Active resources `teacher_id` is bound to.
    pub fn teacher_resources(&self, teacher_id: TeacherId) -> Result<Vec<Resource>> {
        Ok(self
            .active_resources()?
            .into_iter()
            .filter(|r| r.is_taught_by(teacher_id))
            .collect())
    }

    pub fn work_window(&self, teacher: &TeacherProfile) -> WorkWindow {
        WorkWindow {
            start: teacher.work_start.unwrap_or(self.config.default_work_start),
            end: teacher.work_end.unwrap_or(self.config.default_work_end),
            snap_minutes: clamp_snap(
                teacher
                    .snap_minutes
                    .unwrap_or(self.config.default_snap_minutes),
            ),
        }
    }

    /// Expanded, override-adjusted occurrences of the active `resources`
    /// within `[start, end]`.
    pub fn occurrences(
        &self,
        resources: &[Resource],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Occurrence>> {
        let ids: Vec<ResourceId> = resources.iter().filter(|r| r.active).map(|r| r.id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rules = self.store.rules_for(&ids)?;
        let expanded = expand_rules(&rules, start, end)?;
        let overrides = self.store.overrides_between(&ids, start, end)?;
        Ok(apply_overrides(
            expanded,
            &overrides,
            self.config.extra_class_minutes,
        ))
    }
}
