//! Who is asking. Passed into every engine operation in place of a role string.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::model::{Resource, TeacherId, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Scope {
    /// Sees and manages every teacher and resource of the tenant.
    Admin { tenant_id: TenantId, actor_id: u64 },
    /// Sees only its own schedule and the resources it teaches.
    Teacher {
        tenant_id: TenantId,
        teacher_id: TeacherId,
    },
}

impl Scope {
    pub fn tenant_id(&self) -> TenantId {
        match self {
            Scope::Admin { tenant_id, .. } | Scope::Teacher { tenant_id, .. } => *tenant_id,
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Scope::Admin { .. } => "admin",
            Scope::Teacher { .. } => "teacher",
        }
    }

    pub fn actor_id(&self) -> u64 {
        match self {
            Scope::Admin { actor_id, .. } => *actor_id,
            Scope::Teacher { teacher_id, .. } => *teacher_id,
        }
    }

    /// Resolve an optional teacher filter.
    ///
    /// Admins get what they asked for (`None` = everyone). Teachers always
    /// resolve to themselves and may not name anyone else.
    pub fn teacher_filter(&self, requested: Option<TeacherId>) -> Result<Option<TeacherId>> {
        match (self, requested) {
            (Scope::Admin { .. }, requested) => Ok(requested),
            (Scope::Teacher { teacher_id, .. }, None) => Ok(Some(*teacher_id)),
            (Scope::Teacher { .. }, Some(requested)) => self.require_teacher(requested).map(Some),
        }
    }

    /// Check the caller may act for `teacher_id`.
    pub fn require_teacher(&self, teacher_id: TeacherId) -> Result<TeacherId> {
        match self {
            Scope::Admin { .. } => Ok(teacher_id),
            Scope::Teacher { teacher_id: own, .. } if *own == teacher_id => Ok(teacher_id),
            Scope::Teacher { teacher_id: own, .. } => Err(ScheduleError::Forbidden(format!(
                "teacher {} may not act for teacher {}",
                own, teacher_id
            ))),
        }
    }

    /// Check the caller may change `resource`'s schedule.
    pub fn require_resource(&self, resource: &Resource) -> Result<()> {
        match self {
            Scope::Admin { .. } => Ok(()),
            Scope::Teacher { teacher_id, .. } if resource.is_taught_by(*teacher_id) => Ok(()),
            Scope::Teacher { teacher_id, .. } => Err(ScheduleError::Forbidden(format!(
                "teacher {} does not teach resource {}",
                teacher_id, resource.id
            ))),
        }
    }
}
