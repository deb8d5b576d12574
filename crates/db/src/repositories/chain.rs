use chrono::{DateTime, Utc};
use sqlx::Row;

use appraisy_core::domain::appraisal::AppraisalId;
use appraisy_core::domain::employee::EmployeeId;
use appraisy_core::domain::level::{ApprovalLevel, LevelStatus};

use super::{ChainRepository, RepositoryError};
use crate::DbPool;

pub struct SqlChainRepository {
    pool: DbPool,
}

impl SqlChainRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub fn level_status_as_str(status: &LevelStatus) -> &'static str {
    match status {
        LevelStatus::Pending => "pending",
        LevelStatus::Approved => "approved",
        LevelStatus::Rejected => "rejected",
    }
}

pub fn parse_level_status(s: &str) -> Result<LevelStatus, RepositoryError> {
    match s {
        "pending" => Ok(LevelStatus::Pending),
        "approved" => Ok(LevelStatus::Approved),
        "rejected" => Ok(LevelStatus::Rejected),
        other => Err(RepositoryError::Decode(format!("unknown level status `{other}`"))),
    }
}

fn row_to_level(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalLevel, RepositoryError> {
    let appraisal_id: String =
        row.try_get("appraisal_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let level: i64 = row.try_get("level").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_id: String =
        row.try_get("approver_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_role: String =
        row.try_get("approver_role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let can_rate: i64 =
        row.try_get("can_rate").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_final_approver: i64 =
        row.try_get("is_final_approver").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let comments: Option<String> =
        row.try_get("comments").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let acted_at_str: Option<String> =
        row.try_get("acted_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let acted_at = acted_at_str
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| RepositoryError::Decode(format!("bad acted_at `{raw}`: {e}")))
        })
        .transpose()?;

    Ok(ApprovalLevel {
        appraisal_id: AppraisalId(appraisal_id),
        level: level as u32,
        approver_id: EmployeeId(approver_id),
        approver_role,
        can_rate: can_rate != 0,
        is_final_approver: is_final_approver != 0,
        status: parse_level_status(&status_str)?,
        comments,
        acted_at,
    })
}

async fn insert_levels(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    levels: &[ApprovalLevel],
) -> Result<(), RepositoryError> {
    for level in levels {
        sqlx::query(
            "INSERT INTO appraisal_approvals (appraisal_id, level, approver_id, approver_role,
                                              can_rate, is_final_approver, status, comments,
                                              acted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&level.appraisal_id.0)
        .bind(level.level as i64)
        .bind(&level.approver_id.0)
        .bind(&level.approver_role)
        .bind(level.can_rate as i64)
        .bind(level.is_final_approver as i64)
        .bind(level_status_as_str(&level.status))
        .bind(&level.comments)
        .bind(level.acted_at.map(|dt| dt.to_rfc3339()))
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl ChainRepository for SqlChainRepository {
    async fn levels_for(
        &self,
        appraisal_id: &AppraisalId,
    ) -> Result<Vec<ApprovalLevel>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT appraisal_id, level, approver_id, approver_role, can_rate,
                    is_final_approver, status, comments, acted_at
             FROM appraisal_approvals WHERE appraisal_id = ? ORDER BY level ASC",
        )
        .bind(&appraisal_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_level).collect::<Result<Vec<_>, _>>()
    }

    async fn insert_chain(&self, levels: &[ApprovalLevel]) -> Result<(), RepositoryError> {
        let Some(first) = levels.first() else {
            return Ok(());
        };

        let mut tx = self.pool.begin().await?;

        // Existence check inside the transaction; the composite primary key
        // backs it up if two builders race past this point.
        let existing: i64 = sqlx::query(
            "SELECT COUNT(*) AS count FROM appraisal_approvals WHERE appraisal_id = ?",
        )
        .bind(&first.appraisal_id.0)
        .fetch_one(&mut *tx)
        .await?
        .get("count");

        if existing > 0 {
            return Err(RepositoryError::Conflict(format!(
                "appraisal `{}` already has {existing} chain rows",
                first.appraisal_id.0
            )));
        }

        insert_levels(&mut tx, levels).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn replace_chain(
        &self,
        appraisal_id: &AppraisalId,
        levels: &[ApprovalLevel],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM appraisal_approvals WHERE appraisal_id = ?")
            .bind(&appraisal_id.0)
            .execute(&mut *tx)
            .await?;

        insert_levels(&mut tx, levels).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn record_decision(
        &self,
        appraisal_id: &AppraisalId,
        level: u32,
        status: &LevelStatus,
        comments: Option<&str>,
        acted_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE appraisal_approvals
             SET status = ?, comments = ?, acted_at = ?
             WHERE appraisal_id = ? AND level = ? AND status = 'pending'",
        )
        .bind(level_status_as_str(status))
        .bind(comments)
        .bind(acted_at.to_rfc3339())
        .bind(&appraisal_id.0)
        .bind(level as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "level {level} of appraisal `{}` is no longer pending",
                appraisal_id.0
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use appraisy_core::domain::appraisal::{Appraisal, AppraisalId, AppraisalStatus, FormId};
    use appraisy_core::domain::employee::{Employee, EmployeeId, EmployeeType};
    use appraisy_core::domain::level::{ApprovalLevel, LevelStatus};

    use super::SqlChainRepository;
    use crate::repositories::{
        AppraisalRepository, ChainRepository, EmployeeRepository, RepositoryError,
        SqlAppraisalRepository, SqlEmployeeRepository,
    };
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let employees = SqlEmployeeRepository::new(pool.clone());
        for id in ["emp-e", "emp-s1", "emp-s2"] {
            employees
                .save(Employee {
                    id: EmployeeId(id.to_string()),
                    name: id.to_string(),
                    employee_type: EmployeeType::Worker,
                    department: "Assembly".to_string(),
                    position: "line_operator".to_string(),
                    direct_superior: None,
                    company: "Initrode".to_string(),
                })
                .await
                .expect("insert employee");
        }

        let now = Utc::now();
        let appraisals = SqlAppraisalRepository::new(pool.clone());
        appraisals
            .save(Appraisal {
                id: AppraisalId("APR-001".to_string()),
                employee_id: EmployeeId("emp-e".to_string()),
                form_id: FormId("form-2026-h1".to_string()),
                status: AppraisalStatus::Submitted,
                current_approval_level: Some(1),
                grade: None,
                total_score: None,
                submitted_at: Some(now),
                reviewed_at: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("insert appraisal");

        pool
    }

    fn two_level_chain() -> Vec<ApprovalLevel> {
        let appraisal_id = AppraisalId("APR-001".to_string());
        let mut first = ApprovalLevel::pending(
            appraisal_id.clone(),
            1,
            EmployeeId("emp-s1".to_string()),
            "direct_manager",
        );
        first.can_rate = true;
        let mut second = ApprovalLevel::pending(
            appraisal_id,
            2,
            EmployeeId("emp-s2".to_string()),
            "general_manager",
        );
        second.is_final_approver = true;
        vec![first, second]
    }

    #[tokio::test]
    async fn insert_and_fetch_preserves_order_and_flags() {
        let pool = setup().await;
        let repo = SqlChainRepository::new(pool);

        repo.insert_chain(&two_level_chain()).await.expect("insert chain");

        let levels =
            repo.levels_for(&AppraisalId("APR-001".to_string())).await.expect("fetch levels");
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].level, 1);
        assert!(levels[0].can_rate);
        assert!(!levels[0].is_final_approver);
        assert_eq!(levels[1].level, 2);
        assert!(levels[1].is_final_approver);
        assert_eq!(levels[1].status, LevelStatus::Pending);
    }

    #[tokio::test]
    async fn double_insert_is_a_conflict() {
        let pool = setup().await;
        let repo = SqlChainRepository::new(pool);

        repo.insert_chain(&two_level_chain()).await.expect("first insert");
        let error = repo.insert_chain(&two_level_chain()).await.expect_err("second insert");
        assert!(matches!(error, RepositoryError::Conflict(_)));

        let levels =
            repo.levels_for(&AppraisalId("APR-001".to_string())).await.expect("fetch levels");
        assert_eq!(levels.len(), 2, "failed rebuild must not duplicate rows");
    }

    #[tokio::test]
    async fn replace_chain_clears_previous_rows() {
        let pool = setup().await;
        let repo = SqlChainRepository::new(pool);
        let appraisal_id = AppraisalId("APR-001".to_string());

        repo.insert_chain(&two_level_chain()).await.expect("insert chain");
        repo.record_decision(&appraisal_id, 1, &LevelStatus::Rejected, Some("redo"), Utc::now())
            .await
            .expect("reject level 1");

        let mut replacement = ApprovalLevel::pending(
            appraisal_id.clone(),
            1,
            EmployeeId("emp-s1".to_string()),
            "direct_manager",
        );
        replacement.can_rate = true;
        replacement.is_final_approver = true;
        repo.replace_chain(&appraisal_id, &[replacement]).await.expect("replace chain");

        let levels = repo.levels_for(&appraisal_id).await.expect("fetch levels");
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].status, LevelStatus::Pending);
        assert!(levels[0].is_final_approver);
    }

    #[tokio::test]
    async fn record_decision_stamps_comments_and_timestamp() {
        let pool = setup().await;
        let repo = SqlChainRepository::new(pool);
        let appraisal_id = AppraisalId("APR-001".to_string());

        repo.insert_chain(&two_level_chain()).await.expect("insert chain");
        let acted_at = Utc::now();
        repo.record_decision(
            &appraisal_id,
            1,
            &LevelStatus::Approved,
            Some("solid half"),
            acted_at,
        )
        .await
        .expect("approve level 1");

        let levels = repo.levels_for(&appraisal_id).await.expect("fetch levels");
        assert_eq!(levels[0].status, LevelStatus::Approved);
        assert_eq!(levels[0].comments.as_deref(), Some("solid half"));
        assert!(levels[0].acted_at.is_some());
        assert_eq!(levels[1].status, LevelStatus::Pending);
    }

    #[tokio::test]
    async fn deciding_an_already_decided_level_is_a_conflict() {
        let pool = setup().await;
        let repo = SqlChainRepository::new(pool);
        let appraisal_id = AppraisalId("APR-001".to_string());

        repo.insert_chain(&two_level_chain()).await.expect("insert chain");
        repo.record_decision(&appraisal_id, 1, &LevelStatus::Approved, None, Utc::now())
            .await
            .expect("first decision");

        let error = repo
            .record_decision(&appraisal_id, 1, &LevelStatus::Rejected, None, Utc::now())
            .await
            .expect_err("second decision on same level");
        assert!(matches!(error, RepositoryError::Conflict(_)));

        let levels = repo.levels_for(&appraisal_id).await.expect("fetch levels");
        assert_eq!(levels[0].status, LevelStatus::Approved, "losing write must not overwrite");
    }

    #[tokio::test]
    async fn deciding_a_missing_level_is_a_conflict() {
        let pool = setup().await;
        let repo = SqlChainRepository::new(pool);

        let error = repo
            .record_decision(
                &AppraisalId("APR-001".to_string()),
                7,
                &LevelStatus::Approved,
                None,
                Utc::now(),
            )
            .await
            .expect_err("no such level");
        assert!(matches!(error, RepositoryError::Conflict(_)));
    }
}
