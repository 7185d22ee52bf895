// In-process identity, role and lock directory.
// Stands in for the external identity store and borehole/lock manager.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

use super::error::WorkflowError;
use super::lock::{Borehole, BoreholeSource, EditLock};
use super::roles::{Role, RoleGrantSource, Workgroup, WorkgroupRoleGrant};
use super::types::{BoreholeId, UserId, WorkgroupId};

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    workgroups: RwLock<HashMap<WorkgroupId, Workgroup>>,
    grants: RwLock<Vec<WorkgroupRoleGrant>>,
    boreholes: RwLock<HashMap<BoreholeId, Borehole>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_workgroup(&self, workgroup: Workgroup) {
        self.workgroups.write().await.insert(workgroup.id, workgroup);
    }

    pub async fn set_workgroup_enabled(&self, id: WorkgroupId, enabled: bool) -> bool {
        match self.workgroups.write().await.get_mut(&id) {
            Some(group) => {
                group.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub async fn grant(&self, user: UserId, workgroup: WorkgroupId, role: Role) {
        self.add_grant(WorkgroupRoleGrant {
            user_id: user,
            workgroup_id: workgroup,
            role,
            active: true,
        })
        .await;
    }

    pub async fn add_grant(&self, grant: WorkgroupRoleGrant) {
        self.grants.write().await.push(grant);
    }

    /// Mark every matching grant inactive; returns how many were affected
    pub async fn deactivate(&self, user: UserId, workgroup: WorkgroupId, role: Role) -> usize {
        let mut grants = self.grants.write().await;
        let mut affected = 0;
        for grant in grants
            .iter_mut()
            .filter(|g| g.user_id == user && g.workgroup_id == workgroup && g.role == role)
        {
            grant.active = false;
            affected += 1;
        }
        affected
    }

    pub async fn add_borehole(&self, borehole: Borehole) {
        self.boreholes.write().await.insert(borehole.id, borehole);
    }

    /// Place (or replace) the edit lock on a borehole
    pub async fn lock(
        &self,
        borehole: BoreholeId,
        holder: UserId,
        acquired_at: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        let mut boreholes = self.boreholes.write().await;
        let entry = boreholes
            .get_mut(&borehole)
            .ok_or(WorkflowError::BoreholeNotFound(borehole))?;
        entry.lock = Some(EditLock::new(holder, acquired_at));
        info!(borehole = %borehole, holder = %holder, "Edit lock acquired");
        Ok(())
    }

    pub async fn unlock(&self, borehole: BoreholeId) -> Result<(), WorkflowError> {
        let mut boreholes = self.boreholes.write().await;
        let entry = boreholes
            .get_mut(&borehole)
            .ok_or(WorkflowError::BoreholeNotFound(borehole))?;
        entry.lock = None;
        info!(borehole = %borehole, "Edit lock released");
        Ok(())
    }
}

#[async_trait]
impl RoleGrantSource for InMemoryDirectory {
    async fn workgroup(&self, id: WorkgroupId) -> Result<Option<Workgroup>, WorkflowError> {
        Ok(self.workgroups.read().await.get(&id).cloned())
    }

    async fn grants(
        &self,
        user: UserId,
        workgroup: WorkgroupId,
    ) -> Result<Vec<WorkgroupRoleGrant>, WorkflowError> {
        Ok(self
            .grants
            .read()
            .await
            .iter()
            .filter(|g| g.user_id == user && g.workgroup_id == workgroup)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BoreholeSource for InMemoryDirectory {
    async fn borehole(&self, id: BoreholeId) -> Result<Option<Borehole>, WorkflowError> {
        Ok(self.boreholes.read().await.get(&id).cloned())
    }
}
