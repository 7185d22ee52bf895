// Allowed-move table and role thresholds for workflow changes

use serde::{Deserialize, Serialize};

use super::roles::RoleLevel;
use super::types::{ChecklistKind, Status};

/// Kind of status move a request performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    /// One step along Draft -> InReview -> Reviewed -> Published
    Advance,
    /// InReview or Reviewed back to Draft with requested changes
    Reject,
    /// Published back to Draft
    Restart,
}

impl Move {
    /// Classify `from -> to`; `None` when no defined move connects them
    pub fn classify(from: Status, to: Status) -> Option<Move> {
        match (from, to) {
            (from, to) if from.next() == Some(to) => Some(Move::Advance),
            (Status::InReview | Status::Reviewed, Status::Draft) => Some(Move::Reject),
            (Status::Published, Status::Draft) => Some(Move::Restart),
            _ => None,
        }
    }
}

/// Role thresholds for every gated effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub in_review: RoleLevel,
    pub reviewed: RoleLevel,
    pub published: RoleLevel,
    pub reject: RoleLevel,
    pub restart: RoleLevel,
    pub review_checklist: RoleLevel,
    pub publication_checklist: RoleLevel,
    /// Minimum level a user must hold to be assigned
    pub assignee: RoleLevel,
    /// Minimum level for any mutating request
    pub edit: RoleLevel,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            in_review: RoleLevel::Editor,
            reviewed: RoleLevel::Controller,
            published: RoleLevel::Publisher,
            reject: RoleLevel::Controller,
            restart: RoleLevel::Publisher,
            review_checklist: RoleLevel::Controller,
            publication_checklist: RoleLevel::Publisher,
            assignee: RoleLevel::Controller,
            edit: RoleLevel::Editor,
        }
    }
}

impl Thresholds {
    /// Threshold for advancing into `status`. Draft is only entered through
    /// Reject or Restart, so it maps to the reject threshold.
    pub fn status_threshold(&self, status: Status) -> RoleLevel {
        match status {
            Status::Draft => self.reject,
            Status::InReview => self.in_review,
            Status::Reviewed => self.reviewed,
            Status::Published => self.published,
        }
    }

    pub fn move_threshold(&self, kind: Move, target: Status) -> RoleLevel {
        match kind {
            Move::Advance => self.status_threshold(target),
            Move::Reject => self.reject,
            Move::Restart => self.restart,
        }
    }

    pub fn checklist_threshold(&self, kind: ChecklistKind) -> RoleLevel {
        match kind {
            ChecklistKind::Review => self.review_checklist,
            ChecklistKind::Publication => self.publication_checklist,
        }
    }
}
