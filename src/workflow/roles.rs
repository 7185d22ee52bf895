use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use super::error::WorkflowError;
use super::types::{UserId, WorkgroupId};

/// Role a user can be granted within a workgroup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Read-only; never authorizes mutation
    View,
    Editor,
    Controller,
    Validator,
    Publisher,
}

impl Role {
    /// Privilege tier of this role, `None` for read-only access
    pub fn level(self) -> Option<RoleLevel> {
        match self {
            Role::View => None,
            Role::Editor => Some(RoleLevel::Editor),
            Role::Controller => Some(RoleLevel::Controller),
            Role::Validator => Some(RoleLevel::Validator),
            Role::Publisher => Some(RoleLevel::Publisher),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "view" => Ok(Role::View),
            other => other.parse::<RoleLevel>().map(Role::from),
        }
    }
}

impl From<RoleLevel> for Role {
    fn from(level: RoleLevel) -> Self {
        match level {
            RoleLevel::Editor => Role::Editor,
            RoleLevel::Controller => Role::Controller,
            RoleLevel::Validator => Role::Validator,
            RoleLevel::Publisher => Role::Publisher,
        }
    }
}

/// Ordered privilege tiers scoped to a workgroup.
/// Higher values = more privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoleLevel {
    Editor = 1,
    Controller = 2,
    Validator = 3,
    Publisher = 4,
}

impl RoleLevel {
    /// Highest tier among the active grants, ignoring View and inactive grants
    pub fn highest<'a>(grants: impl IntoIterator<Item = &'a WorkgroupRoleGrant>) -> Option<Self> {
        let mut highest: Option<RoleLevel> = None;

        for grant in grants {
            if !grant.active {
                continue;
            }
            let Some(level) = grant.role.level() else {
                continue;
            };
            if highest.map_or(true, |current| level > current) {
                highest = Some(level);
            }
        }

        highest
    }
}

impl fmt::Display for RoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RoleLevel::Editor => "Editor",
            RoleLevel::Controller => "Controller",
            RoleLevel::Validator => "Validator",
            RoleLevel::Publisher => "Publisher",
        };
        write!(f, "{}", label)
    }
}

impl FromStr for RoleLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "editor" => Ok(RoleLevel::Editor),
            "controller" => Ok(RoleLevel::Controller),
            "validator" => Ok(RoleLevel::Validator),
            "publisher" => Ok(RoleLevel::Publisher),
            _ => Err(format!("unknown role '{s}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workgroup {
    pub id: WorkgroupId,
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkgroupRoleGrant {
    pub user_id: UserId,
    pub workgroup_id: WorkgroupId,
    pub role: Role,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Read port onto the identity/role store. The engine never mutates grants.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RoleGrantSource: Send + Sync {
    async fn workgroup(&self, id: WorkgroupId) -> Result<Option<Workgroup>, WorkflowError>;

    /// All grants (active or not) the user holds in the workgroup
    async fn grants(
        &self,
        user: UserId,
        workgroup: WorkgroupId,
    ) -> Result<Vec<WorkgroupRoleGrant>, WorkflowError>;
}

/// Resolves a user's effective privilege within a workgroup
#[derive(Clone)]
pub struct RoleAuthority {
    source: Arc<dyn RoleGrantSource>,
}

impl fmt::Debug for RoleAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleAuthority").finish_non_exhaustive()
    }
}

impl RoleAuthority {
    pub fn new(source: Arc<dyn RoleGrantSource>) -> Self {
        Self { source }
    }

    /// Highest active role the user holds in the workgroup.
    /// A disabled or unknown workgroup grants nothing.
    pub async fn effective_privilege(
        &self,
        user: UserId,
        workgroup: WorkgroupId,
    ) -> Result<Option<RoleLevel>, WorkflowError> {
        match self.source.workgroup(workgroup).await? {
            Some(group) if group.enabled => {}
            _ => {
                debug!(user = %user, workgroup = %workgroup, "Workgroup missing or disabled");
                return Ok(None);
            }
        }

        let grants = self.source.grants(user, workgroup).await?;
        let level = RoleLevel::highest(
            grants
                .iter()
                .filter(|g| g.user_id == user && g.workgroup_id == workgroup),
        );

        debug!(user = %user, workgroup = %workgroup, privilege = ?level, "Resolved effective privilege");
        Ok(level)
    }

    pub async fn meets_threshold(
        &self,
        user: UserId,
        workgroup: WorkgroupId,
        threshold: RoleLevel,
    ) -> Result<bool, WorkflowError> {
        Ok(self
            .effective_privilege(user, workgroup)
            .await?
            .is_some_and(|level| level >= threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn grant(role: Role, active: bool) -> WorkgroupRoleGrant {
        WorkgroupRoleGrant {
            user_id: UserId(7),
            workgroup_id: WorkgroupId(1),
            role,
            active,
        }
    }

    fn enabled_group() -> Workgroup {
        Workgroup {
            id: WorkgroupId(1),
            name: "Geology".to_string(),
            enabled: true,
        }
    }

    #[test]
    fn test_role_level_ordering() {
        assert!(RoleLevel::Editor < RoleLevel::Controller);
        assert!(RoleLevel::Controller < RoleLevel::Validator);
        assert!(RoleLevel::Validator < RoleLevel::Publisher);
    }

    #[test]
    fn test_highest_picks_max_active_grant() {
        let grants = vec![
            grant(Role::Controller, true),
            grant(Role::Validator, true),
            grant(Role::Publisher, false),
            grant(Role::View, true),
        ];

        assert_eq!(RoleLevel::highest(&grants), Some(RoleLevel::Validator));
    }

    #[test]
    fn test_view_only_grants_confer_no_privilege() {
        let grants = vec![grant(Role::View, true)];
        assert_eq!(RoleLevel::highest(&grants), None);
        assert_eq!(RoleLevel::highest(&[]), None);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("view".parse::<Role>().unwrap(), Role::View);
        assert_eq!("Publisher".parse::<Role>().unwrap(), Role::Publisher);
        assert_eq!("controller".parse::<RoleLevel>().unwrap(), RoleLevel::Controller);
        assert!("admin".parse::<Role>().is_err());
    }

    #[tokio::test]
    async fn test_effective_privilege_uses_grant_source() {
        let mut source = MockRoleGrantSource::new();
        source
            .expect_workgroup()
            .with(eq(WorkgroupId(1)))
            .returning(|_| Ok(Some(enabled_group())));
        source
            .expect_grants()
            .with(eq(UserId(7)), eq(WorkgroupId(1)))
            .returning(|_, _| Ok(vec![grant(Role::Editor, true), grant(Role::Controller, true)]));

        let authority = RoleAuthority::new(Arc::new(source));

        assert_eq!(
            authority.effective_privilege(UserId(7), WorkgroupId(1)).await.unwrap(),
            Some(RoleLevel::Controller)
        );
        assert!(authority
            .meets_threshold(UserId(7), WorkgroupId(1), RoleLevel::Controller)
            .await
            .unwrap());
        assert!(!authority
            .meets_threshold(UserId(7), WorkgroupId(1), RoleLevel::Publisher)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_disabled_workgroup_grants_nothing() {
        let mut source = MockRoleGrantSource::new();
        source.expect_workgroup().returning(|_| {
            Ok(Some(Workgroup {
                enabled: false,
                ..enabled_group()
            }))
        });
        source.expect_grants().never();

        let authority = RoleAuthority::new(Arc::new(source));

        assert_eq!(
            authority.effective_privilege(UserId(7), WorkgroupId(1)).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_no_grant_is_not_an_error() {
        let mut source = MockRoleGrantSource::new();
        source.expect_workgroup().returning(|_| Ok(Some(enabled_group())));
        source.expect_grants().returning(|_, _| Ok(vec![]));

        let authority = RoleAuthority::new(Arc::new(source));

        assert!(!authority
            .meets_threshold(UserId(99), WorkgroupId(1), RoleLevel::Editor)
            .await
            .unwrap());
    }
}
