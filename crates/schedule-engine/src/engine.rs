//! [`ScheduleEngine`]: the entry point every caller goes through.
//!
//! The engine owns its collaborators behind `Arc`s and is itself `Send + Sync`.
//! Each read operation checks the caller's [`Scope`], consults the cache, and
//! on a miss builds a [`ScheduleContext`] with a frozen tenant-local "now" and
//! runs the pure computation. Each write checks scope and input, hands the row
//! to the store, and drops the tenant's whole cache namespace.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::availability::{teacher_day, DayAvailability};
use crate::cache::{cache_key, namespace, Cache, MemoryCache};
use crate::calendar::{self, match_session, CalendarRequest, CalendarView};
use crate::capacity::{self, CapacityRow};
use crate::clock::{local_now, Clock, SystemClock};
use crate::config::EngineConfig;
use crate::conflict::{detect_conflicts, Candidate, ConflictReport};
use crate::context::ScheduleContext;
use crate::error::{Result, ScheduleError};
use crate::load::{self, WeeklyLoad};
use crate::model::{
    BlockId, BookedSession, NewBlock, NewOverride, NewRule, NewSession, Override, OverrideId,
    RecurrenceRule, Resource, ResourceId, RoomId, RuleId, TeacherId, TenantId,
    UnavailabilityBlock, UNASSIGNED_TEACHER,
};
use crate::reschedule::{self, RescheduleRequest, RescheduleSlot};
use crate::roster::{HolidaySource, RosterStats, StaticHolidays, StaticStats};
use crate::scope::Scope;
use crate::store::ScheduleStore;
use crate::time::{check_duration, check_range, hhmm, weekday_from_index};

/// Input of [`ScheduleEngine::validate_conflicts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictCheck {
    pub teacher_id: TeacherId,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    /// The resource being moved; its own room bookings are ignored.
    #[serde(default)]
    pub excluding_resource_id: Option<ResourceId>,
}

pub struct ScheduleEngine {
    config: EngineConfig,
    tz: Tz,
    store: Arc<dyn ScheduleStore>,
    cache: Arc<dyn Cache>,
    clock: Arc<dyn Clock>,
    roster: Arc<dyn RosterStats>,
    holidays: Arc<dyn HolidaySource>,
    /// The cache is the built-in `MemoryCache` and follows `with_clock`.
    default_cache: bool,
}

impl ScheduleEngine {
    /// Build an engine over `store` with the system clock, an in-process
    /// cache, and empty roster figures and holidays.
    ///
    /// # Errors
    /// `InvalidInput` if the configuration does not validate.
    pub fn new(config: EngineConfig, store: Arc<dyn ScheduleStore>) -> Result<Self> {
        config.validate()?;
        let tz = config.tz()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Ok(Self {
            config,
            tz,
            store,
            cache: Arc::new(MemoryCache::new(Arc::clone(&clock))),
            clock,
            roster: Arc::new(StaticStats::default()),
            holidays: Arc::new(StaticHolidays::default()),
            default_cache: true,
        })
    }

    /// Replace the clock. The built-in cache is rebuilt on it so entries
    /// expire by the same clock; a cache given to `with_cache` is kept.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        if self.default_cache {
            self.cache = Arc::new(MemoryCache::new(Arc::clone(&clock)));
        }
        self.clock = clock;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = cache;
        self.default_cache = false;
        self
    }

    pub fn with_roster(mut self, roster: Arc<dyn RosterStats>) -> Self {
        self.roster = roster;
        self
    }

    pub fn with_holidays(mut self, holidays: Arc<dyn HolidaySource>) -> Self {
        self.holidays = holidays;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Tenant wall-clock time right now.
    pub fn now(&self) -> NaiveDateTime {
        local_now(self.clock.as_ref(), self.tz)
    }

    fn context(&self, tenant_id: TenantId) -> ScheduleContext<'_> {
        ScheduleContext::new(self.store.as_ref(), &self.config, tenant_id, self.now())
    }

    /// Serve `operation` from the cache or compute and store it.
    ///
    /// Values that fail to round-trip through JSON are recomputed rather than
    /// reported; the cache never turns into an error source.
    fn cached<T, F>(&self, scope: &Scope, operation: &str, parts: &[String], compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&ScheduleContext<'_>) -> Result<T>,
    {
        let key = cache_key(scope, operation, parts);
        if let Some(hit) = self.cache.get(&key) {
            match serde_json::from_value(hit) {
                Ok(value) => {
                    tracing::trace!(%key, "cache hit");
                    return Ok(value);
                }
                Err(e) => tracing::warn!(%key, error = %e, "discarding unreadable cache entry"),
            }
        }
        tracing::trace!(%key, "cache miss");

        let ctx = self.context(scope.tenant_id());
        let value = compute(&ctx)?;
        match serde_json::to_value(&value) {
            Ok(json) => self.cache.set(&key, json, self.config.cache_ttl()),
            Err(e) => tracing::warn!(%key, error = %e, "result not cached"),
        }
        Ok(value)
    }

    fn invalidate(&self, tenant_id: TenantId) {
        self.cache.invalidate_prefix(&namespace(tenant_id));
    }

    // ── Reads ───────────────────────────────────────────────────────────────

    /// Calendar items for the range, for one teacher or the whole tenant.
    ///
    /// A teacher scope always sees its own calendar; admins see everyone's
    /// unless they name a teacher.
    #[tracing::instrument(skip(self, scope), fields(tenant_id = scope.tenant_id(), role = scope.role()))]
    pub fn calendar_view(&self, scope: &Scope, request: &CalendarRequest) -> Result<CalendarView> {
        let teacher_id = scope.teacher_filter(request.teacher_id)?;
        check_range(request.start_date, request.end_date, self.config.max_range_days)?;
        let request = CalendarRequest {
            teacher_id,
            ..request.clone()
        };
        let parts = vec![
            teacher_id.map_or_else(|| "all".to_string(), |t| t.to_string()),
            request.start_date.to_string(),
            request.end_date.to_string(),
            request.view.as_str().to_string(),
        ];

        self.cached(scope, "calendar", &parts, |ctx| {
            let (resources, preferences) = match teacher_id {
                Some(id) => {
                    let teacher = ctx.teacher(id)?;
                    (ctx.teacher_resources(id)?, Some(teacher.preferences))
                }
                None => (ctx.active_resources()?, None),
            };
            calendar::compose(
                ctx,
                &request,
                &resources,
                self.roster.as_ref(),
                self.holidays.as_ref(),
                preferences,
            )
        })
    }

    #[tracing::instrument(skip(self, scope), fields(tenant_id = scope.tenant_id(), role = scope.role()))]
    pub fn availability(
        &self,
        scope: &Scope,
        teacher_id: TeacherId,
        date: NaiveDate,
    ) -> Result<DayAvailability> {
        scope.require_teacher(teacher_id)?;
        let parts = vec![teacher_id.to_string(), date.to_string()];
        self.cached(scope, "availability", &parts, |ctx| {
            teacher_day(ctx, teacher_id, date)
        })
    }

    /// Enrollment against capacity for every active resource in scope.
    #[tracing::instrument(skip(self, scope), fields(tenant_id = scope.tenant_id(), role = scope.role()))]
    pub fn batch_capacity(
        &self,
        scope: &Scope,
        teacher_id: Option<TeacherId>,
    ) -> Result<Vec<CapacityRow>> {
        let teacher_id = scope.teacher_filter(teacher_id)?;
        let parts = vec![teacher_id.map_or_else(|| "all".to_string(), |t| t.to_string())];
        self.cached(scope, "capacity", &parts, |ctx| {
            let resources = match teacher_id {
                Some(id) => {
                    ctx.teacher(id)?;
                    ctx.teacher_resources(id)?
                }
                None => ctx.active_resources()?,
            };
            capacity::batch_capacity(ctx, &resources, self.roster.as_ref())
        })
    }

    #[tracing::instrument(skip(self, scope), fields(tenant_id = scope.tenant_id(), role = scope.role()))]
    pub fn reschedule_options(
        &self,
        scope: &Scope,
        request: &RescheduleRequest,
    ) -> Result<Vec<RescheduleSlot>> {
        scope.require_teacher(request.teacher_id)?;
        let horizon = request
            .horizon_days
            .unwrap_or(self.config.default_horizon_days);
        let parts = vec![
            request.teacher_id.to_string(),
            request.resource_id.to_string(),
            request.anchor_date.to_string(),
            horizon.to_string(),
        ];
        self.cached(scope, "reschedule", &parts, |ctx| {
            let resource = ctx.resource(request.resource_id)?;
            scope.require_resource(&resource)?;
            reschedule::search(ctx, request)
        })
    }

    #[tracing::instrument(skip(self, scope), fields(tenant_id = scope.tenant_id(), role = scope.role()))]
    pub fn weekly_load(
        &self,
        scope: &Scope,
        teacher_id: TeacherId,
        week_start: NaiveDate,
    ) -> Result<WeeklyLoad> {
        scope.require_teacher(teacher_id)?;
        let parts = vec![teacher_id.to_string(), week_start.to_string()];
        self.cached(scope, "weekly_load", &parts, |ctx| {
            load::weekly_load(ctx, teacher_id, week_start)
        })
    }

    /// Check a proposed class window against the teacher's sessions and,
    /// when a room is given, everything else booked in that room.
    #[tracing::instrument(skip(self, scope), fields(tenant_id = scope.tenant_id(), role = scope.role()))]
    pub fn validate_conflicts(&self, scope: &Scope, check: &ConflictCheck) -> Result<ConflictReport> {
        scope.require_teacher(check.teacher_id)?;
        let duration = check_duration(check.duration_minutes)?;
        let start = check.date.and_time(check.start_time);
        let candidate = Candidate {
            teacher_id: check.teacher_id,
            room_id: check.room_id,
            start,
            end: start + Duration::minutes(i64::from(duration)),
            excluding_resource_id: check.excluding_resource_id,
        };
        let optional = |id: Option<u64>| id.map_or_else(|| "-".to_string(), |v| v.to_string());
        let parts = vec![
            check.teacher_id.to_string(),
            start.format("%Y-%m-%dT%H:%M").to_string(),
            duration.to_string(),
            optional(check.room_id),
            optional(check.excluding_resource_id),
        ];

        self.cached(scope, "conflicts", &parts, |ctx| {
            ctx.teacher(check.teacher_id)?;
            if let Some(room_id) = check.room_id {
                if ctx.store.room(ctx.tenant_id, room_id)?.is_none() {
                    return Err(ScheduleError::not_found("room", room_id));
                }
            }
            detect_conflicts(ctx, &candidate)
        })
    }

    // ── Writes ──────────────────────────────────────────────────────────────

    /// Resource of the tenant that `scope` may change.
    fn writable_resource(&self, scope: &Scope, resource_id: ResourceId) -> Result<Resource> {
        let resource = self.context(scope.tenant_id()).resource(resource_id)?;
        scope.require_resource(&resource)?;
        Ok(resource)
    }

    /// Resolve a row's owning resource, reporting a foreign tenant's row as
    /// missing.
    fn owning_resource(
        &self,
        scope: &Scope,
        resource_id: ResourceId,
        entity: &'static str,
        id: u64,
    ) -> Result<Resource> {
        let resource = self
            .store
            .resource(scope.tenant_id(), resource_id)?
            .ok_or_else(|| ScheduleError::not_found(entity, id))?;
        scope.require_resource(&resource)?;
        Ok(resource)
    }

    #[tracing::instrument(skip(self, scope), fields(tenant_id = scope.tenant_id(), role = scope.role()))]
    pub fn create_override(&self, scope: &Scope, row: NewOverride) -> Result<Override> {
        validate_override(&row)?;
        self.writable_resource(scope, row.resource_id)?;
        let created = self.store.insert_override(row)?;
        self.invalidate(scope.tenant_id());
        tracing::info!(override_id = created.id, resource_id = created.resource_id, date = %created.date, "override created");
        Ok(created)
    }

    #[tracing::instrument(skip(self, scope), fields(tenant_id = scope.tenant_id(), role = scope.role()))]
    pub fn update_override(&self, scope: &Scope, id: OverrideId, row: NewOverride) -> Result<Override> {
        validate_override(&row)?;
        let existing = self
            .store
            .override_by_id(id)?
            .ok_or_else(|| ScheduleError::not_found("override", id))?;
        self.owning_resource(scope, existing.resource_id, "override", id)?;
        if row.resource_id != existing.resource_id {
            self.writable_resource(scope, row.resource_id)?;
        }
        let updated = self.store.update_override(id, row)?;
        self.invalidate(scope.tenant_id());
        tracing::info!(override_id = id, "override updated");
        Ok(updated)
    }

    #[tracing::instrument(skip(self, scope), fields(tenant_id = scope.tenant_id(), role = scope.role()))]
    pub fn delete_override(&self, scope: &Scope, id: OverrideId) -> Result<()> {
        let existing = self
            .store
            .override_by_id(id)?
            .ok_or_else(|| ScheduleError::not_found("override", id))?;
        self.owning_resource(scope, existing.resource_id, "override", id)?;
        self.store.delete_override(id)?;
        self.invalidate(scope.tenant_id());
        tracing::info!(override_id = id, "override deleted");
        Ok(())
    }

    /// Block out part of a teacher's day.
    ///
    /// # Errors
    /// `InvalidInput` for an empty or reversed window, `Conflict` when it
    /// overlaps an existing block of the same teacher and date.
    #[tracing::instrument(skip(self, scope), fields(tenant_id = scope.tenant_id(), role = scope.role()))]
    pub fn create_block(&self, scope: &Scope, block: NewBlock) -> Result<UnavailabilityBlock> {
        scope.require_teacher(block.teacher_id)?;
        if block.end_time <= block.start_time {
            return Err(ScheduleError::invalid(format!(
                "block end {} must be after start {}",
                block.end_time.format("%H:%M"),
                block.start_time.format("%H:%M")
            )));
        }
        self.context(scope.tenant_id()).teacher(block.teacher_id)?;
        let created = self.store.insert_block(block)?;
        self.invalidate(scope.tenant_id());
        tracing::info!(block_id = created.id, teacher_id = created.teacher_id, date = %created.date, "block created");
        Ok(created)
    }

    #[tracing::instrument(skip(self, scope), fields(tenant_id = scope.tenant_id(), role = scope.role()))]
    pub fn delete_block(&self, scope: &Scope, id: BlockId) -> Result<()> {
        let block = self
            .store
            .block(id)?
            .ok_or_else(|| ScheduleError::not_found("unavailability_block", id))?;
        if self.store.teacher(scope.tenant_id(), block.teacher_id)?.is_none() {
            return Err(ScheduleError::not_found("unavailability_block", id));
        }
        scope.require_teacher(block.teacher_id)?;
        self.store.delete_block(id)?;
        self.invalidate(scope.tenant_id());
        tracing::info!(block_id = id, "block deleted");
        Ok(())
    }

    #[tracing::instrument(skip(self, scope), fields(tenant_id = scope.tenant_id(), role = scope.role()))]
    pub fn create_rule(&self, scope: &Scope, rule: NewRule) -> Result<RecurrenceRule> {
        validate_rule(&rule)?;
        self.writable_resource(scope, rule.resource_id)?;
        let created = self.store.insert_rule(rule)?;
        self.invalidate(scope.tenant_id());
        tracing::info!(rule_id = created.id, resource_id = created.resource_id, "recurrence rule created");
        Ok(created)
    }

    #[tracing::instrument(skip(self, scope), fields(tenant_id = scope.tenant_id(), role = scope.role()))]
    pub fn update_rule(&self, scope: &Scope, id: RuleId, rule: NewRule) -> Result<RecurrenceRule> {
        validate_rule(&rule)?;
        let existing = self
            .store
            .rule(id)?
            .ok_or_else(|| ScheduleError::not_found("recurrence_rule", id))?;
        self.owning_resource(scope, existing.resource_id, "recurrence_rule", id)?;
        if rule.resource_id != existing.resource_id {
            self.writable_resource(scope, rule.resource_id)?;
        }
        let updated = self.store.update_rule(id, rule)?;
        self.invalidate(scope.tenant_id());
        tracing::info!(rule_id = id, "recurrence rule updated");
        Ok(updated)
    }

    #[tracing::instrument(skip(self, scope), fields(tenant_id = scope.tenant_id(), role = scope.role()))]
    pub fn delete_rule(&self, scope: &Scope, id: RuleId) -> Result<()> {
        let existing = self
            .store
            .rule(id)?
            .ok_or_else(|| ScheduleError::not_found("recurrence_rule", id))?;
        self.owning_resource(scope, existing.resource_id, "recurrence_rule", id)?;
        self.store.delete_rule(id)?;
        self.invalidate(scope.tenant_id());
        tracing::info!(rule_id = id, "recurrence rule deleted");
        Ok(())
    }

    /// Return the session standing for the class at `start`, creating one if
    /// none matches.
    ///
    /// A new session takes the duration of the occurrence starting exactly at
    /// `start`, else the resource default, and is assigned to the resource's
    /// first teacher.
    #[tracing::instrument(skip(self, scope), fields(tenant_id = scope.tenant_id(), role = scope.role()))]
    pub fn open_session(
        &self,
        scope: &Scope,
        resource_id: ResourceId,
        start: NaiveDateTime,
    ) -> Result<BookedSession> {
        let resource = self.writable_resource(scope, resource_id)?;
        if !resource.active {
            return Err(ScheduleError::invalid(format!(
                "resource {} is not active",
                resource.id
            )));
        }
        let ctx = self.context(scope.tenant_id());
        let date = start.date();

        let day_start = date.and_time(NaiveTime::MIN);
        let sessions: Vec<BookedSession> = ctx
            .store
            .sessions_overlapping(ctx.tenant_id, day_start, day_start + Duration::days(1))?
            .into_iter()
            .filter(|s| s.resource_id == resource_id && s.scheduled_start.date() == date)
            .collect();
        let candidates: Vec<&BookedSession> = sessions.iter().collect();
        if let Some(existing) =
            match_session(start, &candidates, self.config.session_match_tolerance_minutes)
        {
            tracing::debug!(session_id = existing.id, "session already open");
            return Ok(existing.clone());
        }

        let duration = ctx
            .occurrences(std::slice::from_ref(&resource), date, date)?
            .into_iter()
            .find(|o| o.start == start)
            .map_or(resource.default_duration_minutes, |o| o.duration_minutes);
        let created = self.store.insert_session(NewSession {
            resource_id,
            scheduled_start: start,
            duration_minutes: check_duration(duration)?,
            assigned_teacher_id: resource
                .teacher_ids
                .first()
                .copied()
                .unwrap_or(UNASSIGNED_TEACHER),
        })?;
        self.invalidate(scope.tenant_id());
        tracing::info!(session_id = created.id, resource_id, start = %start, "session opened");
        Ok(created)
    }
}

fn validate_override(row: &NewOverride) -> Result<()> {
    if let Some(minutes) = row.new_duration_minutes {
        check_duration(minutes)?;
    }
    Ok(())
}

fn validate_rule(rule: &NewRule) -> Result<()> {
    if weekday_from_index(rule.weekday).is_none() {
        return Err(ScheduleError::invalid(format!(
            "weekday {} is outside 0..=6",
            rule.weekday
        )));
    }
    check_duration(rule.duration_minutes)?;
    Ok(())
}
