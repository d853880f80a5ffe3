//! libSQL backend — async `OnboardingStore` implementation.
//!
//! Records are stored as one row per record: a JSON `data` column holding
//! the full aggregate plus a handful of mirrored columns (employee, status,
//! progress, version) that carry the UNIQUE constraint, the list/stats
//! queries, and the compare-and-swap predicate.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;
use uuid::Uuid;

use crate::error::StoreError;
use crate::onboarding::model::{OnboardingRecord, RecordStatus};
use crate::store::migrations;
use crate::store::traits::{ListFilter, OnboardingStore, RecordPage, StatsOverview};

/// libSQL store backend.
///
/// Holds a single connection reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(&store.conn).await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                StoreError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(&store.conn).await?;
        Ok(store)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// DB string for a record status. Matches the serde kebab-case names.
fn status_to_str(status: RecordStatus) -> &'static str {
    match status {
        RecordStatus::NotStarted => "not-started",
        RecordStatus::InProgress => "in-progress",
        RecordStatus::Completed => "completed",
        RecordStatus::OnHold => "on-hold",
    }
}

/// Map a row's `data` and `version` columns back to a record. The version
/// column is authoritative over whatever the JSON snapshot carries.
fn row_to_record(row: &libsql::Row) -> Result<OnboardingRecord, StoreError> {
    let data: String = row
        .get(0)
        .map_err(|e| StoreError::Query(format!("Missing data column: {e}")))?;
    let version: i64 = row
        .get(1)
        .map_err(|e| StoreError::Query(format!("Missing version column: {e}")))?;

    let mut record: OnboardingRecord = serde_json::from_str(&data)?;
    record.version = version as u64;
    Ok(record)
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Whether a libsql error is a UNIQUE-constraint violation.
fn is_unique_violation(err: &libsql::Error) -> bool {
    err.to_string().contains("UNIQUE constraint failed")
}

#[async_trait]
impl OnboardingStore for LibSqlStore {
    async fn run_migrations(&self) -> Result<(), StoreError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn insert(&self, record: &OnboardingRecord) -> Result<(), StoreError> {
        let data = serde_json::to_string(record)?;
        self.conn()
            .execute(
                "INSERT INTO onboardings
                 (id, employee, status, overall_progress, assigned_hr, assigned_buddy,
                  expected_completion_date, version, data, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.id.to_string(),
                    record.employee.clone(),
                    status_to_str(record.status),
                    record.overall_progress as i64,
                    record.assigned_hr.clone(),
                    opt_text(record.assigned_buddy.as_deref()),
                    record.expected_completion_date.to_rfc3339(),
                    record.version as i64,
                    data,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicateEmployee(record.employee.clone())
                } else {
                    StoreError::Query(format!("Insert failed: {e}"))
                }
            })?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<OnboardingRecord>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT data, version FROM onboardings WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Get failed: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
        {
            Some(row) => Ok(Some(row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_by_employee(
        &self,
        employee: &str,
    ) -> Result<Option<OnboardingRecord>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT data, version FROM onboardings WHERE employee = ?1",
                params![employee],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Get by employee failed: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
        {
            Some(row) => Ok(Some(row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, record: &OnboardingRecord) -> Result<u64, StoreError> {
        let new_version = record.version + 1;
        let mut snapshot = record.clone();
        snapshot.version = new_version;
        let data = serde_json::to_string(&snapshot)?;

        let affected = self
            .conn()
            .execute(
                "UPDATE onboardings
                 SET status = ?1, overall_progress = ?2, assigned_buddy = ?3,
                     expected_completion_date = ?4, version = ?5, data = ?6,
                     updated_at = ?7
                 WHERE id = ?8 AND version = ?9",
                params![
                    status_to_str(snapshot.status),
                    snapshot.overall_progress as i64,
                    opt_text(snapshot.assigned_buddy.as_deref()),
                    snapshot.expected_completion_date.to_rfc3339(),
                    new_version as i64,
                    data,
                    snapshot.updated_at.to_rfc3339(),
                    snapshot.id.to_string(),
                    record.version as i64,
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Update failed: {e}")))?;

        if affected == 0 {
            return Err(StoreError::VersionConflict(record.id));
        }
        Ok(new_version)
    }

    async fn list(
        &self,
        filter: &ListFilter,
        page: u32,
        limit: u32,
    ) -> Result<RecordPage, StoreError> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);

        // Build the WHERE clause from the optional filters.
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<libsql::Value> = Vec::new();
        if let Some(status) = filter.status {
            args.push(libsql::Value::Text(status_to_str(status).to_string()));
            clauses.push(format!("status = ?{}", args.len()));
        }
        if let Some(ref hr) = filter.assigned_hr {
            args.push(libsql::Value::Text(hr.clone()));
            clauses.push(format!("assigned_hr = ?{}", args.len()));
        }
        if let Some(ref buddy) = filter.assigned_buddy {
            args.push(libsql::Value::Text(buddy.clone()));
            clauses.push(format!("assigned_buddy = ?{}", args.len()));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM onboardings{where_sql}");
        let mut rows = self
            .conn()
            .query(&count_sql, args.clone())
            .await
            .map_err(|e| StoreError::Query(format!("Count failed: {e}")))?;
        let total = match rows
            .next()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
        {
            Some(row) => row
                .get::<i64>(0)
                .map_err(|e| StoreError::Query(e.to_string()))? as u64,
            None => 0,
        };

        let list_sql = format!(
            "SELECT data, version FROM onboardings{where_sql}
             ORDER BY created_at DESC LIMIT ?{} OFFSET ?{}",
            args.len() + 1,
            args.len() + 2
        );
        // Widen before multiplying: page is caller-supplied and u32
        // arithmetic would overflow for large page numbers.
        let offset = (page as i64 - 1) * limit as i64;
        args.push(libsql::Value::Integer(limit as i64));
        args.push(libsql::Value::Integer(offset));

        let mut rows = self
            .conn()
            .query(&list_sql, args)
            .await
            .map_err(|e| StoreError::Query(format!("List failed: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
        {
            records.push(row_to_record(&row)?);
        }

        Ok(RecordPage {
            records,
            total,
            page,
            limit,
        })
    }

    async fn stats(&self) -> Result<StatsOverview, StoreError> {
        let mut stats = StatsOverview::default();

        let mut rows = self
            .conn()
            .query(
                "SELECT status, COUNT(*), COALESCE(AVG(overall_progress), 0)
                 FROM onboardings GROUP BY status",
                (),
            )
            .await
            .map_err(|e| StoreError::Query(format!("Stats failed: {e}")))?;

        let mut progress_weighted = 0.0;
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
        {
            let status: String = row.get(0).map_err(|e| StoreError::Query(e.to_string()))?;
            let count: i64 = row.get(1).map_err(|e| StoreError::Query(e.to_string()))?;
            let avg: f64 = row.get(2).map_err(|e| StoreError::Query(e.to_string()))?;
            let count = count as u64;
            match status.as_str() {
                "not-started" => stats.not_started = count,
                "in-progress" => stats.in_progress = count,
                "completed" => stats.completed = count,
                "on-hold" => stats.on_hold = count,
                _ => {}
            }
            stats.total += count;
            progress_weighted += avg * count as f64;
        }
        if stats.total > 0 {
            stats.average_progress = progress_weighted / stats.total as f64;
        }

        let now = chrono::Utc::now().to_rfc3339();
        let mut rows = self
            .conn()
            .query(
                "SELECT COUNT(*) FROM onboardings
                 WHERE expected_completion_date < ?1 AND status != 'completed'",
                params![now],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Overdue count failed: {e}")))?;
        if let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
        {
            stats.overdue = row
                .get::<i64>(0)
                .map_err(|e| StoreError::Query(e.to_string()))? as u64;
        }

        Ok(stats)
    }
}
