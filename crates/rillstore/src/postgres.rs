use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rillcore::{
    EdgeRepository, LogRepository, LogStatus, LogUpdate, NodeRepository, NodeRunLog,
    RunRepository, RunStatus, StoreError, WorkflowEdge, WorkflowNode, WorkflowRun,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

// Postgres SQLSTATE classes mapped to semantic store errors
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";
const NOT_NULL_VIOLATION: &str = "23502";

/// PostgreSQL implementation of every repository contract.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

/// Convert a driver error into the semantic error taxonomy. No SQL
/// details beyond the constraint category leak upward.
fn parse_db_error(err: sqlx::Error, resource: &'static str) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound(resource),
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) => StoreError::AlreadyExists,
            Some(FOREIGN_KEY_VIOLATION) => {
                StoreError::InvalidReference(db.constraint().unwrap_or("unknown").to_string())
            }
            Some(CHECK_VIOLATION) | Some(NOT_NULL_VIOLATION) => {
                StoreError::InvalidInput(db.message().to_string())
            }
            _ => StoreError::Database(db.message().to_string()),
        },
        other => StoreError::Database(other.to_string()),
    }
}

fn run_from_row(row: &PgRow) -> Result<WorkflowRun, StoreError> {
    let status: String = row
        .try_get("status")
        .map_err(|e| StoreError::Database(e.to_string()))?;
    Ok(WorkflowRun {
        id: get(row, "id")?,
        workflow_id: get(row, "workflow_id")?,
        status: status.parse().map_err(StoreError::Database)?,
        started_at: get(row, "started_at")?,
        finished_at: get(row, "finished_at")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn log_from_row(row: &PgRow) -> Result<NodeRunLog, StoreError> {
    let status: String = get(row, "status")?;
    Ok(NodeRunLog {
        id: get(row, "id")?,
        run_id: get(row, "run_id")?,
        node_id: get(row, "node_id")?,
        status: status.parse().map_err(StoreError::Database)?,
        log_output: get(row, "log_output")?,
        error_msg: get(row, "error_msg")?,
        started_at: get(row, "started_at")?,
        finished_at: get(row, "finished_at")?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Database(e.to_string()))
}

#[async_trait]
impl RunRepository for PostgresStore {
    async fn create(&self, workflow_id: Uuid) -> Result<WorkflowRun, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO workflow_runs (id, workflow_id, status, started_at, created_at, updated_at)
            VALUES (gen_random_uuid(), $1, $2, now(), now(), now())
            RETURNING id, workflow_id, status, started_at, finished_at, created_at, updated_at
            "#,
        )
        .bind(workflow_id)
        .bind(RunStatus::Running.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| parse_db_error(e, "workflow run"))?;

        run_from_row(&row)
    }

    async fn get(&self, id: Uuid) -> Result<WorkflowRun, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, workflow_id, status, started_at, finished_at, created_at, updated_at
            FROM workflow_runs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| parse_db_error(e, "workflow run"))?;

        run_from_row(&row)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: RunStatus,
        finished_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE workflow_runs
            SET status = $1, finished_at = $2, updated_at = now()
            WHERE id = $3
            "#,
        )
        .bind(status.as_str())
        .bind(finished_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| parse_db_error(e, "workflow run"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("workflow run"));
        }
        Ok(())
    }

    async fn list_by_workflow(
        &self,
        workflow_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<WorkflowRun>, i64), StoreError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM workflow_runs WHERE workflow_id = $1",
        )
        .bind(workflow_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| parse_db_error(e, "workflow run"))?;

        let rows = sqlx::query(
            r#"
            SELECT id, workflow_id, status, started_at, finished_at, created_at, updated_at
            FROM workflow_runs
            WHERE workflow_id = $1
            ORDER BY started_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(workflow_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| parse_db_error(e, "workflow run"))?;

        let runs = rows
            .iter()
            .map(run_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((runs, total))
    }
}

#[async_trait]
impl LogRepository for PostgresStore {
    async fn create(
        &self,
        run_id: Uuid,
        node_id: Uuid,
        status: LogStatus,
    ) -> Result<NodeRunLog, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO node_run_logs (id, run_id, node_id, status, started_at, created_at, updated_at)
            VALUES (gen_random_uuid(), $1, $2, $3, now(), now(), now())
            RETURNING id, run_id, node_id, status, log_output, error_msg,
                      started_at, finished_at, created_at, updated_at
            "#,
        )
        .bind(run_id)
        .bind(node_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| parse_db_error(e, "node run log"))?;

        log_from_row(&row)
    }

    async fn get(&self, id: Uuid) -> Result<NodeRunLog, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, run_id, node_id, status, log_output, error_msg,
                   started_at, finished_at, created_at, updated_at
            FROM node_run_logs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| parse_db_error(e, "node run log"))?;

        log_from_row(&row)
    }

    async fn list_by_run(&self, run_id: Uuid) -> Result<Vec<NodeRunLog>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, run_id, node_id, status, log_output, error_msg,
                   started_at, finished_at, created_at, updated_at
            FROM node_run_logs
            WHERE run_id = $1
            ORDER BY started_at ASC
            "#,
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| parse_db_error(e, "node run log"))?;

        rows.iter().map(log_from_row).collect()
    }

    async fn update(&self, id: Uuid, update: LogUpdate) -> Result<(), StoreError> {
        // Empty fields leave the column unchanged; finished_at is
        // stamped server-side on the first terminal transition.
        let status = update.status.map(|s| s.as_str()).unwrap_or("");
        let result = sqlx::query(
            r#"
            UPDATE node_run_logs
            SET status = COALESCE(NULLIF($1, ''), status),
                log_output = COALESCE(NULLIF($2, ''), log_output),
                error_msg = COALESCE(NULLIF($3, ''), error_msg),
                finished_at = CASE
                    WHEN $1 IN ('completed', 'failed', 'skipped') AND finished_at IS NULL THEN now()
                    ELSE finished_at
                END,
                updated_at = now()
            WHERE id = $4
            "#,
        )
        .bind(status)
        .bind(&update.log_output)
        .bind(&update.error_msg)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| parse_db_error(e, "node run log"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("node run log"));
        }
        Ok(())
    }
}

#[async_trait]
impl NodeRepository for PostgresStore {
    async fn list_by_workflow(&self, workflow_id: Uuid) -> Result<Vec<WorkflowNode>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, workflow_id, template_id, position_x, position_y, data
            FROM workflow_nodes
            WHERE workflow_id = $1
            "#,
        )
        .bind(workflow_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| parse_db_error(e, "workflow node"))?;

        rows.iter()
            .map(|row| {
                let data: serde_json::Value = get(row, "data")?;
                Ok(WorkflowNode {
                    id: get(row, "id")?,
                    workflow_id: get(row, "workflow_id")?,
                    template_id: get(row, "template_id")?,
                    position_x: get(row, "position_x")?,
                    position_y: get(row, "position_y")?,
                    data: data.as_object().cloned().unwrap_or_default(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl EdgeRepository for PostgresStore {
    async fn list_by_workflow(&self, workflow_id: Uuid) -> Result<Vec<WorkflowEdge>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, workflow_id, source_node_id, target_node_id, source_handle, target_handle
            FROM workflow_edges
            WHERE workflow_id = $1
            "#,
        )
        .bind(workflow_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| parse_db_error(e, "workflow edge"))?;

        rows.iter()
            .map(|row| {
                Ok(WorkflowEdge {
                    id: get(row, "id")?,
                    workflow_id: get(row, "workflow_id")?,
                    source_node_id: get(row, "source_node_id")?,
                    target_node_id: get(row, "target_node_id")?,
                    source_handle: get(row, "source_handle")?,
                    target_handle: get(row, "target_handle")?,
                })
            })
            .collect()
    }
}
