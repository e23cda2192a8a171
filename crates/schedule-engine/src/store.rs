//! Relational read/write interface the engine consumes, plus an in-memory
//! implementation seeded from a JSON [`Snapshot`].
//!
//! Overlap-checked inserts (`insert_rule`, `update_rule`, `insert_block`) must
//! check and write atomically: two concurrent writers may not both pass the
//! check. [`MemoryStore`] holds its write lock across both steps; a SQL
//! backend would use an exclusion constraint or a serializable transaction.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::interval::overlaps;
use crate::model::{
    BlockId, BookedSession, Holiday, NewBlock, NewOverride, NewRule, NewSession, Override,
    OverrideId, RecurrenceRule, Resource, ResourceCounts, ResourceId, Room, RoomId, RuleId,
    TeacherId, TeacherProfile, TenantId, UnavailabilityBlock,
};

pub trait ScheduleStore: Send + Sync {
    fn teacher(&self, tenant_id: TenantId, id: TeacherId) -> Result<Option<TeacherProfile>>;
    fn resource(&self, tenant_id: TenantId, id: ResourceId) -> Result<Option<Resource>>;
    /// All resources of the tenant, retired ones included.
    fn resources(&self, tenant_id: TenantId) -> Result<Vec<Resource>>;
    fn room(&self, tenant_id: TenantId, id: RoomId) -> Result<Option<Room>>;

    fn rules_for(&self, resource_ids: &[ResourceId]) -> Result<Vec<RecurrenceRule>>;
    fn rule(&self, id: RuleId) -> Result<Option<RecurrenceRule>>;

    /// Overrides for the resources dated within `[start, end]`.
    fn overrides_between(
        &self,
        resource_ids: &[ResourceId],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Override>>;
    fn override_by_id(&self, id: OverrideId) -> Result<Option<Override>>;

    /// Sessions of the tenant's resources overlapping `[start, end)`,
    /// cancelled ones included.
    fn sessions_overlapping(
        &self,
        tenant_id: TenantId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<BookedSession>>;

    fn blocks_on(&self, teacher_id: TeacherId, date: NaiveDate) -> Result<Vec<UnavailabilityBlock>>;
    fn block(&self, id: BlockId) -> Result<Option<UnavailabilityBlock>>;

    /// Insert unless it overlaps a rule of the same resource on the same weekday.
    fn insert_rule(&self, rule: NewRule) -> Result<RecurrenceRule>;
    fn update_rule(&self, id: RuleId, rule: NewRule) -> Result<RecurrenceRule>;
    fn delete_rule(&self, id: RuleId) -> Result<()>;

    fn insert_override(&self, row: NewOverride) -> Result<Override>;
    fn update_override(&self, id: OverrideId, row: NewOverride) -> Result<Override>;
    fn delete_override(&self, id: OverrideId) -> Result<()>;

    /// Insert unless it overlaps a block of the same teacher on the same date.
    fn insert_block(&self, block: NewBlock) -> Result<UnavailabilityBlock>;
    fn delete_block(&self, id: BlockId) -> Result<()>;

    fn insert_session(&self, session: NewSession) -> Result<BookedSession>;
}

/// Per-resource counts as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCountsEntry {
    pub resource_id: ResourceId,
    #[serde(flatten)]
    pub counts: ResourceCounts,
}

/// A full dump of the tables the engine reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub rooms: Vec<Room>,
    pub resources: Vec<Resource>,
    pub teachers: Vec<TeacherProfile>,
    pub rules: Vec<RecurrenceRule>,
    pub overrides: Vec<Override>,
    pub sessions: Vec<BookedSession>,
    pub blocks: Vec<UnavailabilityBlock>,
    pub holidays: Vec<Holiday>,
    pub counts: Vec<ResourceCountsEntry>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ScheduleError::invalid(format!("invalid snapshot: {}", e)))
    }
}

#[derive(Debug, Default)]
struct Tables {
    rooms: Vec<Room>,
    resources: Vec<Resource>,
    teachers: Vec<TeacherProfile>,
    rules: Vec<RecurrenceRule>,
    overrides: Vec<Override>,
    sessions: Vec<BookedSession>,
    blocks: Vec<UnavailabilityBlock>,
    next_id: u64,
}

impl Tables {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn resource_tenant(&self, resource_id: ResourceId) -> Option<TenantId> {
        self.resources
            .iter()
            .find(|r| r.id == resource_id)
            .map(|r| r.tenant_id)
    }

    fn rule_conflict(&self, candidate: &NewRule, skip: Option<RuleId>) -> Option<&RecurrenceRule> {
        // Compare on an arbitrary shared date; only weekday and time of day matter.
        let day = NaiveDate::default();
        let start = day.and_time(candidate.start_time);
        let end = start + Duration::minutes(i64::from(candidate.duration_minutes));
        self.rules.iter().find(|r| {
            Some(r.id) != skip
                && r.resource_id == candidate.resource_id
                && r.weekday == candidate.weekday
                && {
                    let r_start = day.and_time(r.start_time);
                    let r_end = r_start + Duration::minutes(i64::from(r.duration_minutes));
                    overlaps(start, end, r_start, r_end)
                }
        })
    }
}

/// In-process [`ScheduleStore`]. Ids are allocated from one counter shared by
/// all tables, so ids also reflect creation order across tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let next_id = [
            snapshot.rooms.iter().map(|r| r.id).max(),
            snapshot.resources.iter().map(|r| r.id).max(),
            snapshot.teachers.iter().map(|t| t.id).max(),
            snapshot.rules.iter().map(|r| r.id).max(),
            snapshot.overrides.iter().map(|o| o.id).max(),
            snapshot.sessions.iter().map(|s| s.id).max(),
            snapshot.blocks.iter().map(|b| b.id).max(),
        ]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(0);

        Self {
            tables: RwLock::new(Tables {
                rooms: snapshot.rooms,
                resources: snapshot.resources,
                teachers: snapshot.teachers,
                rules: snapshot.rules,
                overrides: snapshot.overrides,
                sessions: snapshot.sessions,
                blocks: snapshot.blocks,
                next_id,
            }),
        }
    }

    pub fn add_room(&self, room: Room) -> Result<()> {
        self.write()?.rooms.push(room);
        Ok(())
    }

    pub fn add_resource(&self, resource: Resource) -> Result<()> {
        self.write()?.resources.push(resource);
        Ok(())
    }

    pub fn add_teacher(&self, teacher: TeacherProfile) -> Result<()> {
        self.write()?.teachers.push(teacher);
        Ok(())
    }

    /// Store a session as-is, bypassing id allocation. For seeding fixtures.
    pub fn add_session(&self, session: BookedSession) -> Result<()> {
        let mut tables = self.write()?;
        tables.next_id = tables.next_id.max(session.id);
        tables.sessions.push(session);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| ScheduleError::Store("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| ScheduleError::Store("store lock poisoned".to_string()))
    }
}

impl ScheduleStore for MemoryStore {
    fn teacher(&self, tenant_id: TenantId, id: TeacherId) -> Result<Option<TeacherProfile>> {
        Ok(self
            .read()?
            .teachers
            .iter()
            .find(|t| t.id == id && t.tenant_id == tenant_id)
            .cloned())
    }

    fn resource(&self, tenant_id: TenantId, id: ResourceId) -> Result<Option<Resource>> {
        Ok(self
            .read()?
            .resources
            .iter()
            .find(|r| r.id == id && r.tenant_id == tenant_id)
            .cloned())
    }

    fn resources(&self, tenant_id: TenantId) -> Result<Vec<Resource>> {
        Ok(self
            .read()?
            .resources
            .iter()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    fn room(&self, tenant_id: TenantId, id: RoomId) -> Result<Option<Room>> {
        Ok(self
            .read()?
            .rooms
            .iter()
            .find(|r| r.id == id && r.tenant_id == tenant_id)
            .cloned())
    }

    fn rules_for(&self, resource_ids: &[ResourceId]) -> Result<Vec<RecurrenceRule>> {
        Ok(self
            .read()?
            .rules
            .iter()
            .filter(|r| resource_ids.contains(&r.resource_id))
            .cloned()
            .collect())
    }

    fn rule(&self, id: RuleId) -> Result<Option<RecurrenceRule>> {
        Ok(self.read()?.rules.iter().find(|r| r.id == id).cloned())
    }

    fn overrides_between(
        &self,
        resource_ids: &[ResourceId],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Override>> {
        Ok(self
            .read()?
            .overrides
            .iter()
            .filter(|o| resource_ids.contains(&o.resource_id) && o.date >= start && o.date <= end)
            .cloned()
            .collect())
    }

    fn override_by_id(&self, id: OverrideId) -> Result<Option<Override>> {
        Ok(self.read()?.overrides.iter().find(|o| o.id == id).cloned())
    }

    fn sessions_overlapping(
        &self,
        tenant_id: TenantId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<BookedSession>> {
        let tables = self.read()?;
        Ok(tables
            .sessions
            .iter()
            .filter(|s| tables.resource_tenant(s.resource_id) == Some(tenant_id))
            .filter(|s| overlaps(s.scheduled_start, s.end(), start, end))
            .cloned()
            .collect())
    }

    fn blocks_on(&self, teacher_id: TeacherId, date: NaiveDate) -> Result<Vec<UnavailabilityBlock>> {
        Ok(self
            .read()?
            .blocks
            .iter()
            .filter(|b| b.teacher_id == teacher_id && b.date == date)
            .cloned()
            .collect())
    }

    fn block(&self, id: BlockId) -> Result<Option<UnavailabilityBlock>> {
        Ok(self.read()?.blocks.iter().find(|b| b.id == id).cloned())
    }

    fn insert_rule(&self, rule: NewRule) -> Result<RecurrenceRule> {
        let mut tables = self.write()?;
        if let Some(existing) = tables.rule_conflict(&rule, None) {
            return Err(ScheduleError::Conflict {
                entity: "recurrence_rule",
                id: existing.id,
                message: format!(
                    "resource {} already has a class at {} on weekday {}",
                    existing.resource_id,
                    existing.start_time.format("%H:%M"),
                    existing.weekday
                ),
            });
        }
        let id = tables.allocate_id();
        let row = rule.into_row(id);
        tables.rules.push(row.clone());
        Ok(row)
    }

    fn update_rule(&self, id: RuleId, rule: NewRule) -> Result<RecurrenceRule> {
        let mut tables = self.write()?;
        if !tables.rules.iter().any(|r| r.id == id) {
            return Err(ScheduleError::not_found("recurrence_rule", id));
        }
        if let Some(existing) = tables.rule_conflict(&rule, Some(id)) {
            return Err(ScheduleError::Conflict {
                entity: "recurrence_rule",
                id: existing.id,
                message: format!(
                    "resource {} already has a class at {} on weekday {}",
                    existing.resource_id,
                    existing.start_time.format("%H:%M"),
                    existing.weekday
                ),
            });
        }
        let row = rule.into_row(id);
        if let Some(slot) = tables.rules.iter_mut().find(|r| r.id == id) {
            *slot = row.clone();
        }
        Ok(row)
    }

    fn delete_rule(&self, id: RuleId) -> Result<()> {
        let mut tables = self.write()?;
        let before = tables.rules.len();
        tables.rules.retain(|r| r.id != id);
        if tables.rules.len() == before {
            return Err(ScheduleError::not_found("recurrence_rule", id));
        }
        Ok(())
    }

    fn insert_override(&self, row: NewOverride) -> Result<Override> {
        let mut tables = self.write()?;
        let id = tables.allocate_id();
        let row = row.into_row(id);
        tables.overrides.push(row.clone());
        Ok(row)
    }

    fn update_override(&self, id: OverrideId, row: NewOverride) -> Result<Override> {
        let mut tables = self.write()?;
        let slot = tables
            .overrides
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| ScheduleError::not_found("override", id))?;
        *slot = row.into_row(id);
        Ok(slot.clone())
    }

    fn delete_override(&self, id: OverrideId) -> Result<()> {
        let mut tables = self.write()?;
        let before = tables.overrides.len();
        tables.overrides.retain(|o| o.id != id);
        if tables.overrides.len() == before {
            return Err(ScheduleError::not_found("override", id));
        }
        Ok(())
    }

    fn insert_block(&self, block: NewBlock) -> Result<UnavailabilityBlock> {
        let mut tables = self.write()?;
        let start = block.date.and_time(block.start_time);
        let end = block.date.and_time(block.end_time);
        if let Some(existing) = tables.blocks.iter().find(|b| {
            b.teacher_id == block.teacher_id
                && b.date == block.date
                && overlaps(start, end, b.start(), b.end())
        }) {
            return Err(ScheduleError::Conflict {
                entity: "unavailability_block",
                id: existing.id,
                message: format!(
                    "teacher {} is already blocked {}-{} on {}",
                    existing.teacher_id,
                    existing.start_time.format("%H:%M"),
                    existing.end_time.format("%H:%M"),
                    existing.date
                ),
            });
        }
        let id = tables.allocate_id();
        let row = block.into_row(id);
        tables.blocks.push(row.clone());
        Ok(row)
    }

    fn delete_block(&self, id: BlockId) -> Result<()> {
        let mut tables = self.write()?;
        let before = tables.blocks.len();
        tables.blocks.retain(|b| b.id != id);
        if tables.blocks.len() == before {
            return Err(ScheduleError::not_found("unavailability_block", id));
        }
        Ok(())
    }

    fn insert_session(&self, session: NewSession) -> Result<BookedSession> {
        let mut tables = self.write()?;
        let id = tables.allocate_id();
        let row = session.into_row(id);
        tables.sessions.push(row.clone());
        Ok(row)
    }
}
