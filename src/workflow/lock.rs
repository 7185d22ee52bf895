use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::error::WorkflowError;
use super::types::{BoreholeId, UserId, WorkgroupId};

/// Single-holder edit marker on a borehole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditLock {
    pub holder: UserId,
    pub acquired_at: DateTime<Utc>,
}

impl EditLock {
    pub fn new(holder: UserId, acquired_at: DateTime<Utc>) -> Self {
        Self { holder, acquired_at }
    }

    /// A lock older than `timeout` is stale and held by nobody. A deadline
    /// past the representable range never expires.
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.acquired_at
            .checked_add_signed(timeout)
            .is_some_and(|deadline| deadline <= now)
    }

    pub fn is_held_by(&self, user: UserId, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.holder == user && !self.is_expired(now, timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borehole {
    pub id: BoreholeId,
    pub workgroup_id: WorkgroupId,
    #[serde(default)]
    pub lock: Option<EditLock>,
}

impl Borehole {
    pub fn new(id: BoreholeId, workgroup_id: WorkgroupId) -> Self {
        Self {
            id,
            workgroup_id,
            lock: None,
        }
    }

    /// Unlocked boreholes, stale locks and locks held by others all count
    /// as not editable by `user`
    pub fn is_locked_by(&self, user: UserId, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.lock
            .is_some_and(|lock| lock.is_held_by(user, now, timeout))
    }
}

/// Read port onto the borehole/lock manager. Acquisition and release of
/// locks happen outside the engine.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BoreholeSource: Send + Sync {
    async fn borehole(&self, id: BoreholeId) -> Result<Option<Borehole>, WorkflowError>;
}
