// Core types for the borehole review and publication workflow

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::audit::AuditTrail;
use super::checklist::TabChecklist;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// Identity of a user as supplied by the identity store
    UserId
);
id_type!(
    /// Organizational unit owning boreholes
    WorkgroupId
);
id_type!(BoreholeId);
id_type!(WorkflowId);

/// Approval status of a borehole
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    Draft,
    InReview,
    Reviewed,
    Published,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Draft,
        Status::InReview,
        Status::Reviewed,
        Status::Published,
    ];

    /// Next status on the forward path, if any
    pub fn next(self) -> Option<Status> {
        match self {
            Status::Draft => Some(Status::InReview),
            Status::InReview => Some(Status::Reviewed),
            Status::Reviewed => Some(Status::Published),
            Status::Published => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Draft => "Draft",
            Status::InReview => "InReview",
            Status::Reviewed => "Reviewed",
            Status::Published => "Published",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "draft" => Ok(Status::Draft),
            "inreview" => Ok(Status::InReview),
            "reviewed" => Ok(Status::Reviewed),
            "published" => Ok(Status::Published),
            _ => Err(format!("unknown workflow status '{s}'")),
        }
    }
}

/// Which of the two per-section checklists an update targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChecklistKind {
    Review,
    Publication,
}

impl fmt::Display for ChecklistKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecklistKind::Review => f.write_str("review"),
            ChecklistKind::Publication => f.write_str("publication"),
        }
    }
}

impl FromStr for ChecklistKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "review" => Ok(ChecklistKind::Review),
            "publication" => Ok(ChecklistKind::Publication),
            _ => Err(format!("unknown checklist kind '{s}'")),
        }
    }
}

/// Review and publication state attached to one borehole
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub borehole_id: BoreholeId,
    pub status: Status,
    pub has_requested_changes: bool,
    pub assignee_id: Option<UserId>,
    pub review_checklist: TabChecklist,
    pub publication_checklist: TabChecklist,
    pub history: AuditTrail,
    /// Bumped on every persisted mutation; used for compare-and-swap
    pub version: u64,
}

impl Workflow {
    /// Initial state created alongside a new borehole
    pub fn new(id: WorkflowId, borehole_id: BoreholeId) -> Self {
        Self {
            id,
            borehole_id,
            status: Status::Draft,
            has_requested_changes: false,
            assignee_id: None,
            review_checklist: TabChecklist::default(),
            publication_checklist: TabChecklist::default(),
            history: AuditTrail::new(),
            version: 0,
        }
    }

    pub fn checklist(&self, kind: ChecklistKind) -> &TabChecklist {
        match kind {
            ChecklistKind::Review => &self.review_checklist,
            ChecklistKind::Publication => &self.publication_checklist,
        }
    }

    pub fn checklist_mut(&mut self, kind: ChecklistKind) -> &mut TabChecklist {
        match kind {
            ChecklistKind::Review => &mut self.review_checklist,
            ChecklistKind::Publication => &mut self.publication_checklist,
        }
    }

    pub fn is_fully_reviewed(&self) -> bool {
        self.review_checklist.is_complete()
    }

    pub fn is_fully_published(&self) -> bool {
        self.publication_checklist.is_complete()
    }
}

/// Change submitted by a caller against one borehole's workflow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub new_assignee_id: Option<UserId>,
    #[serde(default)]
    pub new_status: Option<Status>,
    #[serde(default)]
    pub has_requested_changes: Option<bool>,
}

impl ChangeRequest {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.new_status = Some(status);
        self
    }

    pub fn with_assignee(mut self, assignee: UserId) -> Self {
        self.new_assignee_id = Some(assignee);
        self
    }

    pub fn with_requested_changes(mut self, requested: bool) -> Self {
        self.has_requested_changes = Some(requested);
        self
    }

    pub fn has_comment(&self) -> bool {
        !self.comment.trim().is_empty()
    }
}
