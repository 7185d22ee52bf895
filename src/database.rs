#[cfg(feature = "database")]
use async_trait::async_trait;
#[cfg(feature = "database")]
use chrono::{DateTime, Utc};
#[cfg(feature = "database")]
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Row, SqlitePool};
#[cfg(feature = "database")]
use tracing::info;

#[cfg(feature = "database")]
use crate::config::DatabaseConfig;
#[cfg(feature = "database")]
use crate::workflow::{
    AuditEntry, AuditTrail, BoreholeId, Status, TabChecklist, UserId, Workflow, WorkflowError,
    WorkflowId, WorkflowStore,
};

#[cfg(feature = "database")]
fn store_error(err: impl std::fmt::Display) -> WorkflowError {
    WorkflowError::Store(err.to_string())
}

#[cfg(feature = "database")]
fn parse_status(value: &str) -> Result<Status, WorkflowError> {
    value.parse::<Status>().map_err(WorkflowError::Store)
}

#[cfg(feature = "database")]
/// SQLite-backed workflow store. The version column guards every update.
pub struct SqliteWorkflowStore {
    pool: SqlitePool,
}

#[cfg(feature = "database")]
impl SqliteWorkflowStore {
    /// Open the database, creating it and running migrations when configured
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        if !sqlx::Sqlite::database_exists(&config.url).await? {
            info!("Creating database at {}", config.url);
            sqlx::Sqlite::create_database(&config.url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect(&config.url)
            .await?;

        if config.auto_migrate {
            info!("Running database migrations...");
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Database migrations completed");
        }

        Ok(Self { pool })
    }

    /// Get database pool for queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_history(&self, workflow_id: WorkflowId) -> Result<AuditTrail, WorkflowError> {
        let rows = sqlx::query(
            r#"
            SELECT id, sequence, comment, from_status, to_status, created_by, created_at, assignee_id
            FROM workflow_changes
            WHERE workflow_id = ?1
            ORDER BY sequence ASC
            "#,
        )
        .bind(workflow_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id").map_err(store_error)?;
            let sequence: i64 = row.try_get("sequence").map_err(store_error)?;
            let from_status: Option<String> = row.try_get("from_status").map_err(store_error)?;
            let to_status: String = row.try_get("to_status").map_err(store_error)?;
            let created_at: DateTime<Utc> = row.try_get("created_at").map_err(store_error)?;

            entries.push(AuditEntry {
                id: uuid::Uuid::parse_str(&id).map_err(store_error)?,
                sequence: sequence as u64,
                comment: row.try_get("comment").map_err(store_error)?,
                from_status: from_status.as_deref().map(parse_status).transpose()?,
                to_status: parse_status(&to_status)?,
                created_by: UserId(row.try_get("created_by").map_err(store_error)?),
                created_at,
                assignee_id: row
                    .try_get::<Option<i64>, _>("assignee_id")
                    .map_err(store_error)?
                    .map(UserId),
            });
        }

        AuditTrail::from_entries(entries).map_err(WorkflowError::Store)
    }

    /// Close database connections gracefully
    pub async fn shutdown(&self) {
        info!("Shutting down database connections...");
        self.pool.close().await;
        info!("Database connections closed");
    }
}

#[cfg(feature = "database")]
#[async_trait]
impl WorkflowStore for SqliteWorkflowStore {
    async fn create(&self, borehole_id: BoreholeId) -> Result<Workflow, WorkflowError> {
        let empty = serde_json::to_string(&TabChecklist::default()).map_err(store_error)?;
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO workflows
                (borehole_id, status, has_requested_changes, assignee_id,
                 review_checklist, publication_checklist, version)
            VALUES (?1, ?2, 0, NULL, ?3, ?3, 0)
            "#,
        )
        .bind(borehole_id.0)
        .bind(Status::Draft.as_str())
        .bind(&empty)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        self.load(borehole_id)
            .await?
            .ok_or(WorkflowError::WorkflowNotFound(borehole_id))
    }

    async fn load(&self, borehole_id: BoreholeId) -> Result<Option<Workflow>, WorkflowError> {
        let row = sqlx::query(
            r#"
            SELECT id, status, has_requested_changes, assignee_id,
                   review_checklist, publication_checklist, version
            FROM workflows
            WHERE borehole_id = ?1
            "#,
        )
        .bind(borehole_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id = WorkflowId(row.try_get("id").map_err(store_error)?);
        let status: String = row.try_get("status").map_err(store_error)?;
        let review: String = row.try_get("review_checklist").map_err(store_error)?;
        let publication: String = row.try_get("publication_checklist").map_err(store_error)?;
        let version: i64 = row.try_get("version").map_err(store_error)?;

        Ok(Some(Workflow {
            id,
            borehole_id,
            status: parse_status(&status)?,
            has_requested_changes: row.try_get("has_requested_changes").map_err(store_error)?,
            assignee_id: row
                .try_get::<Option<i64>, _>("assignee_id")
                .map_err(store_error)?
                .map(UserId),
            review_checklist: serde_json::from_str(&review).map_err(store_error)?,
            publication_checklist: serde_json::from_str(&publication).map_err(store_error)?,
            history: self.load_history(id).await?,
            version: version as u64,
        }))
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        mut workflow: Workflow,
    ) -> Result<Workflow, WorkflowError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        let updated = sqlx::query(
            r#"
            UPDATE workflows
            SET status = ?1, has_requested_changes = ?2, assignee_id = ?3,
                review_checklist = ?4, publication_checklist = ?5, version = version + 1
            WHERE borehole_id = ?6 AND version = ?7
            "#,
        )
        .bind(workflow.status.as_str())
        .bind(workflow.has_requested_changes)
        .bind(workflow.assignee_id.map(|u| u.0))
        .bind(serde_json::to_string(&workflow.review_checklist).map_err(store_error)?)
        .bind(serde_json::to_string(&workflow.publication_checklist).map_err(store_error)?)
        .bind(workflow.borehole_id.0)
        .bind(expected_version as i64)
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(store_error)?;
            return Err(match self.load(workflow.borehole_id).await? {
                Some(_) => WorkflowError::ConcurrentModification {
                    borehole: workflow.borehole_id,
                    expected: expected_version,
                },
                None => WorkflowError::WorkflowNotFound(workflow.borehole_id),
            });
        }

        let persisted: i64 = sqlx::query("SELECT COUNT(*) AS n FROM workflow_changes WHERE workflow_id = ?1")
            .bind(workflow.id.0)
            .fetch_one(&mut *tx)
            .await
            .map_err(store_error)?
            .try_get("n")
            .map_err(store_error)?;

        for entry in workflow.history.since(persisted as u64) {
            sqlx::query(
                r#"
                INSERT INTO workflow_changes
                    (workflow_id, sequence, id, comment, from_status, to_status,
                     created_by, created_at, assignee_id)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(workflow.id.0)
            .bind(entry.sequence as i64)
            .bind(entry.id.to_string())
            .bind(entry.comment.as_deref())
            .bind(entry.from_status.map(Status::as_str))
            .bind(entry.to_status.as_str())
            .bind(entry.created_by.0)
            .bind(entry.created_at)
            .bind(entry.assignee_id.map(|u| u.0))
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;
        }

        tx.commit().await.map_err(store_error)?;

        workflow.version = expected_version + 1;
        Ok(workflow)
    }
}

#[cfg(all(test, feature = "database"))]
mod tests {
    use super::*;
    use crate::workflow::{AuditTrail, NewAuditEntry};

    async fn memory_store() -> SqliteWorkflowStore {
        SqliteWorkflowStore::connect(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            auto_migrate: true,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_history_survives_round_trip() {
        let store = memory_store().await;
        let created = store.create(BoreholeId(5)).await.unwrap();
        assert_eq!(created.status, Status::Draft);

        let mut next = created.clone();
        next.status = Status::InReview;
        next.review_checklist.geometry = true;
        next.history.append(NewAuditEntry {
            comment: Some("ready".to_string()),
            from_status: Some(Status::Draft),
            to_status: Status::InReview,
            created_by: UserId(1),
            created_at: Utc::now(),
            assignee_id: Some(UserId(2)),
        });
        store.compare_and_swap(0, next).await.unwrap();

        let loaded = store.load(BoreholeId(5)).await.unwrap().unwrap();
        assert_eq!(loaded.status, Status::InReview);
        assert_eq!(loaded.version, 1);
        assert!(loaded.review_checklist.geometry);
        assert_eq!(loaded.history.len(), 1);
        assert_eq!(loaded.history.all()[0].assignee_id, Some(UserId(2)));
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let store = memory_store().await;
        let created = store.create(BoreholeId(6)).await.unwrap();

        store.compare_and_swap(0, created.clone()).await.unwrap();
        let err = store.compare_and_swap(0, created).await.unwrap_err();

        assert!(matches!(err, WorkflowError::ConcurrentModification { .. }));
        assert_eq!(
            store.load(BoreholeId(6)).await.unwrap().unwrap().history,
            AuditTrail::new()
        );
    }
}
