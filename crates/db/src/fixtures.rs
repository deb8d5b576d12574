use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::Row;

use appraisy_core::domain::appraisal::{Appraisal, AppraisalId, AppraisalStatus, FormId};
use appraisy_core::domain::employee::{Employee, EmployeeId, EmployeeType};
use appraisy_core::domain::level::{ApprovalLevel, LevelStatus};

use crate::repositories::{
    AppraisalRepository, ChainRepository, EmployeeRepository, RepositoryError,
    SqlAppraisalRepository, SqlChainRepository, SqlEmployeeRepository,
};
use crate::DbPool;

const SEED_FORM_ID: &str = "form-2026-h1";

const SEED_EMPLOYEE_IDS: &[&str] =
    &["emp-ceo", "emp-gm", "emp-mgr", "emp-worker-1", "emp-worker-2", "emp-analyst-1"];

const SEED_APPRAISAL_IDS: &[&str] = &["apr-draft-001", "apr-review-001", "apr-complete-001"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub employees: usize,
    pub appraisals: usize,
    pub chain_levels: usize,
}

#[derive(Clone, Debug)]
pub struct SeedVerification {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

/// Deterministic demo dataset: one small org and one appraisal in each of
/// the three interesting lifecycle positions (draft, mid-review,
/// completed). Loading is idempotent.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let employees = SqlEmployeeRepository::new(pool.clone());
        let appraisals = SqlAppraisalRepository::new(pool.clone());
        let chains = SqlChainRepository::new(pool.clone());

        let org = seed_employees();
        for employee in &org {
            employees.save(employee.clone()).await?;
        }

        let now = Utc::now();
        let base = |id: &str, employee_id: &str, status: AppraisalStatus| Appraisal {
            id: AppraisalId(id.to_string()),
            employee_id: EmployeeId(employee_id.to_string()),
            form_id: FormId(SEED_FORM_ID.to_string()),
            status,
            current_approval_level: None,
            grade: None,
            total_score: None,
            submitted_at: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        };

        let draft = base("apr-draft-001", "emp-worker-1", AppraisalStatus::Draft);

        let mut in_review = base("apr-review-001", "emp-analyst-1", AppraisalStatus::InReview);
        in_review.current_approval_level = Some(2);
        in_review.submitted_at = Some(now);

        let mut completed = base("apr-complete-001", "emp-worker-2", AppraisalStatus::Completed);
        completed.current_approval_level = Some(2);
        completed.grade = Some("B".to_string());
        completed.total_score = Some(Decimal::new(82, 0));
        completed.submitted_at = Some(now);
        completed.reviewed_at = Some(now);

        let seeded_appraisals = [draft, in_review, completed];
        for appraisal in &seeded_appraisals {
            appraisals.save(appraisal.clone()).await?;
        }

        let review_chain = seed_chain(
            "apr-review-001",
            &[("emp-mgr", "direct_manager", LevelStatus::Approved), ("emp-gm", "general_manager", LevelStatus::Pending)],
        );
        let complete_chain = seed_chain(
            "apr-complete-001",
            &[("emp-mgr", "direct_manager", LevelStatus::Approved), ("emp-gm", "general_manager", LevelStatus::Approved)],
        );

        // replace_chain keeps re-seeding idempotent.
        chains.replace_chain(&AppraisalId("apr-review-001".to_string()), &review_chain).await?;
        chains.replace_chain(&AppraisalId("apr-complete-001".to_string()), &complete_chain).await?;

        Ok(SeedResult {
            employees: org.len(),
            appraisals: seeded_appraisals.len(),
            chain_levels: review_chain.len() + complete_chain.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<SeedVerification, RepositoryError> {
        let employee_count: i64 = count_in(pool, "employee", "id", SEED_EMPLOYEE_IDS).await?;
        let appraisal_count: i64 = count_in(pool, "appraisal", "id", SEED_APPRAISAL_IDS).await?;
        let level_count: i64 = sqlx::query(
            "SELECT COUNT(*) AS count FROM appraisal_approvals
             WHERE appraisal_id IN ('apr-review-001', 'apr-complete-001')",
        )
        .fetch_one(pool)
        .await?
        .get("count");

        let checks = vec![
            ("employees", employee_count == SEED_EMPLOYEE_IDS.len() as i64),
            ("appraisals", appraisal_count == SEED_APPRAISAL_IDS.len() as i64),
            ("chain_levels", level_count == 4),
        ];
        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(SeedVerification { all_present, checks })
    }
}

fn seed_employees() -> Vec<Employee> {
    let employee = |id: &str,
                    name: &str,
                    employee_type: EmployeeType,
                    department: &str,
                    position: &str,
                    superior: Option<&str>| Employee {
        id: EmployeeId(id.to_string()),
        name: name.to_string(),
        employee_type,
        department: department.to_string(),
        position: position.to_string(),
        direct_superior: superior.map(|s| EmployeeId(s.to_string())),
        company: "Initrode".to_string(),
    };

    vec![
        employee("emp-ceo", "Avery Okafor", EmployeeType::Management, "Executive", "top_management", None),
        employee("emp-gm", "Jordan Blake", EmployeeType::Management, "Operations", "general_manager", Some("emp-ceo")),
        employee("emp-mgr", "Sam Ferreira", EmployeeType::Management, "Assembly", "direct_manager", Some("emp-gm")),
        employee("emp-worker-1", "Dana Reyes", EmployeeType::Worker, "Assembly", "line_operator", Some("emp-mgr")),
        employee("emp-worker-2", "Kai Tanaka", EmployeeType::Worker, "Assembly", "line_operator", Some("emp-mgr")),
        employee("emp-analyst-1", "Noa Lindqvist", EmployeeType::General, "Operations", "analyst", Some("emp-mgr")),
    ]
}

fn seed_chain(
    appraisal_id: &str,
    entries: &[(&str, &str, LevelStatus)],
) -> Vec<ApprovalLevel> {
    let now = Utc::now();
    entries
        .iter()
        .enumerate()
        .map(|(index, (approver, role, status))| {
            let mut level = ApprovalLevel::pending(
                AppraisalId(appraisal_id.to_string()),
                index as u32 + 1,
                EmployeeId(approver.to_string()),
                *role,
            );
            level.is_final_approver = index == entries.len() - 1;
            level.status = status.clone();
            if *status != LevelStatus::Pending {
                level.acted_at = Some(now);
            }
            level
        })
        .collect()
}

async fn count_in(
    pool: &DbPool,
    table: &str,
    column: &str,
    ids: &[&str],
) -> Result<i64, RepositoryError> {
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql =
        format!("SELECT COUNT(*) AS count FROM {table} WHERE {column} IN ({placeholders})");
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }
    Ok(query.fetch_one(pool).await?.get("count"))
}
