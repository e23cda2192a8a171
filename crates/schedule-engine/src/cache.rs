//! Key/value cache for read results.
//!
//! The cache is supplementary: a miss only costs a recomputation. Keys live
//! under a per-tenant namespace so one prefix invalidation drops everything a
//! write could have made stale.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::clock::Clock;
use crate::model::TenantId;
use crate::scope::Scope;

pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value, ttl: Duration);
    fn invalidate_prefix(&self, prefix: &str);
}

/// Prefix shared by every key of one tenant.
pub fn namespace(tenant_id: TenantId) -> String {
    format!("schedule:{}:", tenant_id)
}

/// Key for one read operation, scoped by tenant, role and actor so an
/// admin-wide answer is never served to a teacher and vice versa.
pub fn cache_key(scope: &Scope, operation: &str, parts: &[String]) -> String {
    let mut key = format!(
        "{}{}:{}:{}",
        namespace(scope.tenant_id()),
        scope.role(),
        scope.actor_id(),
        operation
    );
    for part in parts {
        key.push(':');
        key.push_str(part);
    }
    key
}

/// Never stores anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl Cache for NoCache {
    fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    fn set(&self, _key: &str, _value: Value, _ttl: Duration) {}

    fn invalidate_prefix(&self, _prefix: &str) {}
}

/// Process-local TTL cache. Expiry is judged against the injected clock.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Value, DateTime<Utc>)>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().ok()?;
        let now = self.clock.now();
        match entries.get(key) {
            Some((value, expires)) if *expires > now => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), (value, self.clock.now() + ttl));
        }
    }

    fn invalidate_prefix(&self, prefix: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|k, _| !k.starts_with(prefix));
        }
    }
}
