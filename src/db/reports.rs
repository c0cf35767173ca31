use super::{from_json, parse_column, to_json, OptionalRow, Pool, StoreError};
use crate::model::{Report, ReportProcessingStatus, ReportType};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

const COLUMNS: &str = "id, user_id, report_id, report_type, processing_status, \
                       report_document_id, marketplace_ids, created_at, updated_at";

fn from_row(row: &SqliteRow) -> Result<Report, StoreError> {
    let marketplace_ids: String = row.try_get("marketplace_ids")?;
    Ok(Report {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        report_id: row.try_get("report_id")?,
        report_type: parse_column(
            "reports",
            "report_type",
            row.try_get("report_type")?,
            ReportType::parse,
        )?,
        processing_status: parse_column(
            "reports",
            "processing_status",
            row.try_get("processing_status")?,
            ReportProcessingStatus::parse,
        )?,
        report_document_id: row.try_get("report_document_id")?,
        marketplace_ids: from_json(&marketplace_ids)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Newest first.
#[instrument(skip_all)]
pub async fn list_reports(pool: &Pool, user_id: Uuid) -> Result<Vec<Report>, StoreError> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM reports WHERE user_id = ? ORDER BY created_at DESC, rowid DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(from_row).collect()
}

/// Look up by the Amazon-assigned report id.
#[instrument(skip_all)]
pub async fn find_report(
    pool: &Pool,
    user_id: Uuid,
    report_id: &str,
) -> Result<Option<Report>, StoreError> {
    let row = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM reports WHERE user_id = ? AND report_id = ?"
    ))
    .bind(user_id)
    .bind(report_id)
    .fetch_one(pool)
    .await
    .optional()?;
    row.as_ref().map(from_row).transpose()
}

/// Record a report request freshly accepted by Amazon; it starts `IN_QUEUE`.
#[instrument(skip_all)]
pub async fn insert_report(
    pool: &Pool,
    user_id: Uuid,
    report_id: &str,
    report_type: ReportType,
    marketplace_ids: &[String],
) -> Result<Report, StoreError> {
    let now = Utc::now();
    let row = sqlx::query(&format!(
        "INSERT INTO reports ({COLUMNS}) VALUES (?, ?, ?, ?, ?, NULL, ?, ?, ?) RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(report_id)
    .bind(report_type.as_str())
    .bind(ReportProcessingStatus::InQueue.as_str())
    .bind(to_json(&marketplace_ids)?)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;
    from_row(&row)
}

#[instrument(skip_all)]
pub async fn update_report_status(
    pool: &Pool,
    user_id: Uuid,
    report_id: &str,
    status: ReportProcessingStatus,
    report_document_id: Option<&str>,
) -> Result<Option<Report>, StoreError> {
    let row = sqlx::query(&format!(
        "UPDATE reports SET processing_status = ?, \
           report_document_id = COALESCE(?, report_document_id), updated_at = ? \
         WHERE user_id = ? AND report_id = ? RETURNING {COLUMNS}"
    ))
    .bind(status.as_str())
    .bind(report_document_id)
    .bind(Utc::now())
    .bind(user_id)
    .bind(report_id)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(from_row).transpose()
}
