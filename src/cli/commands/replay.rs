use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::WorkflowSettings;
use crate::observability::workflow_metrics;
use crate::workflow::{
    Borehole, BoreholeId, ChangeRequest, ChecklistKind, InMemoryDirectory, InMemoryWorkflowStore,
    Status, UserId, Workflow, WorkflowError, WorkflowStateMachine, WorkgroupId, Workgroup,
    WorkgroupRoleGrant,
};

/// Scenario file: the directory to seed and the requests to replay in order
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Scenario {
    #[serde(default)]
    pub workgroups: Vec<Workgroup>,
    #[serde(default)]
    pub grants: Vec<WorkgroupRoleGrant>,
    #[serde(default)]
    pub boreholes: Vec<ScenarioBorehole>,
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioBorehole {
    pub id: BoreholeId,
    pub workgroup_id: WorkgroupId,
    #[serde(default)]
    pub locked_by: Option<UserId>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioStep {
    Lock {
        borehole: BoreholeId,
        user: UserId,
        /// Backdate the lock, e.g. to exercise expiry
        #[serde(default)]
        minutes_ago: i64,
    },
    Unlock {
        borehole: BoreholeId,
    },
    Change {
        actor: UserId,
        borehole: BoreholeId,
        #[serde(default)]
        comment: String,
        #[serde(default)]
        status: Option<Status>,
        #[serde(default)]
        assignee: Option<UserId>,
        #[serde(default)]
        has_requested_changes: Option<bool>,
    },
    Checklist {
        actor: UserId,
        borehole: BoreholeId,
        kind: ChecklistKind,
        tabs: BTreeMap<String, bool>,
    },
}

impl ScenarioStep {
    fn name(&self) -> &'static str {
        match self {
            ScenarioStep::Lock { .. } => "lock",
            ScenarioStep::Unlock { .. } => "unlock",
            ScenarioStep::Change { .. } => "change",
            ScenarioStep::Checklist { .. } => "checklist",
        }
    }

    fn borehole(&self) -> BoreholeId {
        match self {
            ScenarioStep::Lock { borehole, .. }
            | ScenarioStep::Unlock { borehole }
            | ScenarioStep::Change { borehole, .. }
            | ScenarioStep::Checklist { borehole, .. } => *borehole,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub action: String,
    pub borehole: BoreholeId,
    /// Workflow status after the step, when it succeeded
    pub status: Option<Status>,
    pub error_code: Option<String>,
    pub exit_code: Option<i32>,
    pub message: Option<String>,
}

impl StepOutcome {
    pub fn succeeded(&self) -> bool {
        self.error_code.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub outcomes: Vec<StepOutcome>,
    pub workflows: Vec<Workflow>,
}

impl ReplayReport {
    pub fn first_failure(&self) -> Option<&StepOutcome> {
        self.outcomes.iter().find(|o| !o.succeeded())
    }

    /// Exit code of the first rejected step, or 0
    pub fn exit_code(&self) -> i32 {
        self.first_failure()
            .and_then(|o| o.exit_code)
            .unwrap_or(0)
    }
}

impl Scenario {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Seed an in-memory directory, create a workflow per borehole and run
    /// every step. With `stop_on_failure` the replay ends at the first rejection.
    pub async fn replay(
        &self,
        settings: WorkflowSettings,
        stop_on_failure: bool,
    ) -> Result<ReplayReport> {
        let directory = Arc::new(InMemoryDirectory::new());
        for workgroup in &self.workgroups {
            directory.add_workgroup(workgroup.clone()).await;
        }
        for grant in &self.grants {
            directory.add_grant(grant.clone()).await;
        }

        let engine = WorkflowStateMachine::new(
            Arc::new(InMemoryWorkflowStore::new()),
            directory.clone(),
            directory.clone(),
            settings,
        );

        for borehole in &self.boreholes {
            directory
                .add_borehole(Borehole::new(borehole.id, borehole.workgroup_id))
                .await;
            if let Some(holder) = borehole.locked_by {
                directory.lock(borehole.id, holder, Utc::now()).await?;
            }
            engine.create_workflow(borehole.id).await?;
        }

        let mut outcomes = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            let result = run_step(&engine, &directory, step)
                .await
                .with_context(|| format!("step {} ({})", index + 1, step.name()))?;
            let outcome = match result {
                Ok(status) => StepOutcome {
                    step: index + 1,
                    action: step.name().to_string(),
                    borehole: step.borehole(),
                    status,
                    error_code: None,
                    exit_code: None,
                    message: None,
                },
                Err(error) => StepOutcome {
                    step: index + 1,
                    action: step.name().to_string(),
                    borehole: step.borehole(),
                    status: None,
                    error_code: Some(error.code().to_string()),
                    exit_code: Some(error.exit_code()),
                    message: Some(error.to_string()),
                },
            };
            let failed = !outcome.succeeded();
            outcomes.push(outcome);
            if failed && stop_on_failure {
                break;
            }
        }

        let mut workflows = Vec::with_capacity(self.boreholes.len());
        for borehole in &self.boreholes {
            workflows.push(engine.workflow(borehole.id).await?);
        }

        info!(
            steps = outcomes.len(),
            rejected = outcomes.iter().filter(|o| !o.succeeded()).count(),
            "Scenario replay finished"
        );
        Ok(ReplayReport { outcomes, workflows })
    }
}

/// `minutes_ago` before now, or None when that instant is not representable
fn backdated(minutes_ago: i64) -> Option<DateTime<Utc>> {
    TimeDelta::try_minutes(minutes_ago).and_then(|ago| Utc::now().checked_sub_signed(ago))
}

/// Run one step. The outer error aborts the replay because the scenario
/// itself is broken; the inner one is a rejection to record.
async fn run_step(
    engine: &WorkflowStateMachine,
    directory: &InMemoryDirectory,
    step: &ScenarioStep,
) -> Result<Result<Option<Status>, WorkflowError>> {
    match step {
        ScenarioStep::Lock {
            borehole,
            user,
            minutes_ago,
        } => {
            let acquired_at = backdated(*minutes_ago)
                .with_context(|| format!("minutes_ago = {minutes_ago} is out of range"))?;
            Ok(directory
                .lock(*borehole, *user, acquired_at)
                .await
                .map(|()| None))
        }
        ScenarioStep::Unlock { borehole } => Ok(directory.unlock(*borehole).await.map(|()| None)),
        ScenarioStep::Change {
            actor,
            borehole,
            comment,
            status,
            assignee,
            has_requested_changes,
        } => {
            let request = ChangeRequest {
                comment: comment.clone(),
                new_assignee_id: *assignee,
                new_status: *status,
                has_requested_changes: *has_requested_changes,
            };
            Ok(engine
                .request_change(*actor, *borehole, request)
                .await
                .map(|workflow| Some(workflow.status)))
        }
        ScenarioStep::Checklist {
            actor,
            borehole,
            kind,
            tabs,
        } => {
            let changes = tabs
                .iter()
                .map(|(name, value)| (name.clone(), *value))
                .collect();
            Ok(engine
                .update_checklist_many(*actor, *borehole, *kind, changes)
                .await
                .map(|workflow| Some(workflow.status)))
        }
    }
}

pub struct ReplayCommand {
    pub scenario: PathBuf,
    pub json: bool,
    pub strict: bool,
    settings: WorkflowSettings,
}

impl ReplayCommand {
    pub fn new(scenario: PathBuf, settings: WorkflowSettings) -> Self {
        Self {
            scenario,
            json: false,
            strict: false,
            settings,
        }
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub async fn execute(&self) -> Result<ReplayReport> {
        let content = tokio::fs::read_to_string(&self.scenario)
            .await
            .with_context(|| format!("reading scenario {}", self.scenario.display()))?;
        let scenario = Scenario::from_toml(&content)
            .with_context(|| format!("parsing scenario {}", self.scenario.display()))?;

        let report = scenario.replay(self.settings.clone(), self.strict).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        workflow_metrics().log_stats();

        Ok(report)
    }
}

fn print_report(report: &ReplayReport) {
    println!("🔁 SCENARIO REPLAY");
    println!("==================");
    for outcome in &report.outcomes {
        match (&outcome.error_code, &outcome.message) {
            (Some(code), Some(message)) => println!(
                "❌ step {} {} borehole {}: {} ({})",
                outcome.step, outcome.action, outcome.borehole, code, message
            ),
            _ => match outcome.status {
                Some(status) => println!(
                    "✅ step {} {} borehole {} -> {}",
                    outcome.step, outcome.action, outcome.borehole, status
                ),
                None => println!(
                    "✅ step {} {} borehole {}",
                    outcome.step, outcome.action, outcome.borehole
                ),
            },
        }
    }

    println!();
    println!("📋 FINAL STATE");
    println!("──────────────");
    for workflow in &report.workflows {
        println!(
            "   borehole {}: {} (requested changes: {}, assignee: {})",
            workflow.borehole_id,
            workflow.status,
            workflow.has_requested_changes,
            workflow
                .assignee_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "none".to_string())
        );
        println!(
            "      review {}/15, publication {}/15, {} audit entries",
            workflow.review_checklist.completed_count(),
            workflow.publication_checklist.completed_count(),
            workflow.history.len()
        );
        for entry in workflow.history.all() {
            println!(
                "      #{} {} -> {} by {}{}",
                entry.sequence,
                entry
                    .from_status
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                entry.to_status,
                entry.created_by,
                entry
                    .comment
                    .as_deref()
                    .map(|c| format!(": {c}"))
                    .unwrap_or_default()
            );
        }
    }
}
