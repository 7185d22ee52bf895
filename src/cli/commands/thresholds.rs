use anyhow::Result;

use crate::config::WorkflowSettings;
use crate::workflow::{RoleLevel, Thresholds};

pub struct ThresholdsCommand {
    settings: WorkflowSettings,
}

impl ThresholdsCommand {
    pub fn new(settings: WorkflowSettings) -> Self {
        Self { settings }
    }

    /// Rows of (action, minimum role) in display order
    pub fn rows(&self) -> Vec<(&'static str, RoleLevel)> {
        let Thresholds {
            in_review,
            reviewed,
            published,
            reject,
            restart,
            review_checklist,
            publication_checklist,
            assignee,
            edit,
        } = self.settings.thresholds.clone();

        vec![
            ("any change", edit),
            ("Draft -> InReview", in_review),
            ("InReview -> Reviewed", reviewed),
            ("Reviewed -> Published", published),
            ("reject to Draft", reject),
            ("restart from Published", restart),
            ("review checklist", review_checklist),
            ("publication checklist", publication_checklist),
            ("be assigned", assignee),
        ]
    }

    pub async fn execute(&self) -> Result<()> {
        println!("🔐 ROLE THRESHOLDS");
        println!("==================");
        for (action, level) in self.rows() {
            println!("   {:<24} {}", action, level);
        }
        println!();
        println!("🔒 Edit locks expire after {} minutes", self.settings.lock_timeout_minutes);
        if self.settings.require_complete_publication_checklist {
            println!("📋 Publishing requires a complete publication checklist");
        }
        Ok(())
    }
}
