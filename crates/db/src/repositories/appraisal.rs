use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use appraisy_core::domain::appraisal::{Appraisal, AppraisalId, AppraisalStatus, FormId};
use appraisy_core::domain::employee::EmployeeId;

use super::{AppraisalRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAppraisalRepository {
    pool: DbPool,
}

impl SqlAppraisalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub fn appraisal_status_as_str(status: &AppraisalStatus) -> &'static str {
    match status {
        AppraisalStatus::Draft => "draft",
        AppraisalStatus::Submitted => "submitted",
        AppraisalStatus::InReview => "in_review",
        AppraisalStatus::Completed => "completed",
        AppraisalStatus::Cancelled => "cancelled",
    }
}

pub fn parse_appraisal_status(s: &str) -> Result<AppraisalStatus, RepositoryError> {
    match s {
        "draft" => Ok(AppraisalStatus::Draft),
        "submitted" => Ok(AppraisalStatus::Submitted),
        "in_review" => Ok(AppraisalStatus::InReview),
        "completed" => Ok(AppraisalStatus::Completed),
        "cancelled" => Ok(AppraisalStatus::Cancelled),
        other => Err(RepositoryError::Decode(format!("unknown appraisal status `{other}`"))),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("bad timestamp `{raw}`: {e}")))
}

fn row_to_appraisal(row: &sqlx::sqlite::SqliteRow) -> Result<Appraisal, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let employee_id: String =
        row.try_get("employee_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let form_id: String =
        row.try_get("form_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let current_approval_level: Option<i64> = row
        .try_get("current_approval_level")
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let grade: Option<String> =
        row.try_get("grade").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let total_score_str: Option<String> =
        row.try_get("total_score").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let submitted_at_str: Option<String> =
        row.try_get("submitted_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let reviewed_at_str: Option<String> =
        row.try_get("reviewed_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let total_score = total_score_str
        .map(|raw| {
            raw.parse::<Decimal>()
                .map_err(|e| RepositoryError::Decode(format!("bad total_score `{raw}`: {e}")))
        })
        .transpose()?;
    let submitted_at = submitted_at_str.as_deref().map(parse_timestamp).transpose()?;
    let reviewed_at = reviewed_at_str.as_deref().map(parse_timestamp).transpose()?;

    Ok(Appraisal {
        id: AppraisalId(id),
        employee_id: EmployeeId(employee_id),
        form_id: FormId(form_id),
        status: parse_appraisal_status(&status_str)?,
        current_approval_level: current_approval_level.map(|level| level as u32),
        grade,
        total_score,
        submitted_at,
        reviewed_at,
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}

const SELECT_COLUMNS: &str = "id, employee_id, form_id, status, current_approval_level,
                              grade, total_score, submitted_at, reviewed_at,
                              created_at, updated_at";

#[async_trait::async_trait]
impl AppraisalRepository for SqlAppraisalRepository {
    async fn find_by_id(&self, id: &AppraisalId) -> Result<Option<Appraisal>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM appraisal WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_appraisal(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, appraisal: Appraisal) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO appraisal (id, employee_id, form_id, status, current_approval_level,
                                    grade, total_score, submitted_at, reviewed_at,
                                    created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 status = excluded.status,
                 current_approval_level = excluded.current_approval_level,
                 grade = excluded.grade,
                 total_score = excluded.total_score,
                 submitted_at = excluded.submitted_at,
                 reviewed_at = excluded.reviewed_at,
                 updated_at = excluded.updated_at",
        )
        .bind(&appraisal.id.0)
        .bind(&appraisal.employee_id.0)
        .bind(&appraisal.form_id.0)
        .bind(appraisal_status_as_str(&appraisal.status))
        .bind(appraisal.current_approval_level.map(|level| level as i64))
        .bind(&appraisal.grade)
        .bind(appraisal.total_score.map(|score| score.to_string()))
        .bind(appraisal.submitted_at.map(|dt| dt.to_rfc3339()))
        .bind(appraisal.reviewed_at.map(|dt| dt.to_rfc3339()))
        .bind(appraisal.created_at.to_rfc3339())
        .bind(appraisal.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn pending_for_approver(
        &self,
        approver_id: &EmployeeId,
    ) -> Result<Vec<Appraisal>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM appraisal
             WHERE status IN ('submitted', 'in_review')
               AND EXISTS (
                 SELECT 1 FROM appraisal_approvals a
                 WHERE a.appraisal_id = appraisal.id
                   AND a.approver_id = ?
                   AND a.status = 'pending'
                   AND a.level = (
                     SELECT MIN(level) FROM appraisal_approvals
                     WHERE appraisal_id = appraisal.id AND status = 'pending'
                   )
               )
             ORDER BY submitted_at ASC"
        ))
        .bind(&approver_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_appraisal).collect::<Result<Vec<_>, _>>()
    }
}
