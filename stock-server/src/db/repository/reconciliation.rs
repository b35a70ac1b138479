//! Reconciliation Issue Repository

use super::{RepoError, RepoResult};
use shared::models::{ReconciliationIssue, ReconciliationStatus};
use sqlx::SqlitePool;
use sqlx::types::Json;

const COLUMNS: &str = "id, kind, channel, order_reference, message, details, status, resolution_note, resolved_by, resolved_at, created_at";

#[derive(Debug, Clone)]
pub struct NewIssue {
    pub kind: String,
    pub channel: Option<String>,
    pub order_reference: Option<String>,
    pub message: String,
    pub details: serde_json::Value,
    pub created_at: i64,
}

pub async fn create(pool: &SqlitePool, issue: &NewIssue) -> RepoResult<ReconciliationIssue> {
    let sql = format!(
        "INSERT INTO reconciliation_issue (id, kind, channel, order_reference, message, details, status, created_at) VALUES (?, ?, ?, ?, ?, ?, 'open', ?) RETURNING {COLUMNS}"
    );
    let created = sqlx::query_as::<_, ReconciliationIssue>(&sql)
        .bind(shared::util::snowflake_id())
        .bind(&issue.kind)
        .bind(&issue.channel)
        .bind(&issue.order_reference)
        .bind(&issue.message)
        .bind(Json(&issue.details))
        .bind(issue.created_at)
        .fetch_one(pool)
        .await?;
    Ok(created)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<ReconciliationIssue>> {
    let sql = format!("SELECT {COLUMNS} FROM reconciliation_issue WHERE id = ?");
    let issue = sqlx::query_as::<_, ReconciliationIssue>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(issue)
}

/// Newest first
pub async fn list(
    pool: &SqlitePool,
    status: Option<ReconciliationStatus>,
) -> RepoResult<Vec<ReconciliationIssue>> {
    let issues = match status {
        Some(status) => {
            let sql = format!(
                "SELECT {COLUMNS} FROM reconciliation_issue WHERE status = ? ORDER BY created_at DESC, id DESC"
            );
            sqlx::query_as::<_, ReconciliationIssue>(&sql)
                .bind(status)
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!(
                "SELECT {COLUMNS} FROM reconciliation_issue ORDER BY created_at DESC, id DESC"
            );
            sqlx::query_as::<_, ReconciliationIssue>(&sql)
                .fetch_all(pool)
                .await?
        }
    };
    Ok(issues)
}

/// Close an open issue; `Duplicate` if it was already resolved
pub async fn resolve(
    pool: &SqlitePool,
    id: i64,
    note: &str,
    resolved_by: &str,
    now: i64,
) -> RepoResult<ReconciliationIssue> {
    let sql = format!(
        "UPDATE reconciliation_issue SET status = 'resolved', resolution_note = ?, resolved_by = ?, resolved_at = ? WHERE id = ? AND status = 'open' RETURNING {COLUMNS}"
    );
    let updated = sqlx::query_as::<_, ReconciliationIssue>(&sql)
        .bind(note)
        .bind(resolved_by)
        .bind(now)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match updated {
        Some(issue) => Ok(issue),
        None => match find_by_id(pool, id).await? {
            Some(_) => Err(RepoError::Duplicate(format!(
                "reconciliation issue {id} is already resolved"
            ))),
            None => Err(RepoError::NotFound(format!(
                "reconciliation issue {id} not found"
            ))),
        },
    }
}
