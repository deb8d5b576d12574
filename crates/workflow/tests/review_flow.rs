use chrono::Utc;
use rust_decimal::Decimal;

use appraisy_core::audit::InMemoryAuditSink;
use appraisy_core::chain::ChainPolicy;
use appraisy_core::domain::appraisal::{Appraisal, AppraisalId, AppraisalStatus, FormId};
use appraisy_core::domain::employee::{Employee, EmployeeId, EmployeeType};
use appraisy_core::domain::level::{Decision, LevelStatus};
use appraisy_core::notify::{InMemorySender, NotificationEvent};
use appraisy_core::scoring::FixedScoring;
use appraisy_db::repositories::{
    AppraisalRepository, ChainRepository, EmployeeRepository, SqlAppraisalRepository,
    SqlAuditSink, SqlChainRepository, SqlEmployeeRepository,
};
use appraisy_db::{connect_with_settings, migrations, DbPool};
use appraisy_workflow::ReviewService;

type SqliteService = ReviewService<
    SqlEmployeeRepository,
    SqlAppraisalRepository,
    SqlChainRepository,
    InMemorySender,
    SqlAuditSink,
    FixedScoring,
>;

struct Env {
    pool: DbPool,
    service: SqliteService,
    notifier: InMemorySender,
}

fn employee(id: &str, position: &str, superior: Option<&str>) -> Employee {
    Employee {
        id: EmployeeId(id.to_string()),
        name: id.to_string(),
        employee_type: EmployeeType::Worker,
        department: "Assembly".to_string(),
        position: position.to_string(),
        direct_superior: superior.map(|s| EmployeeId(s.to_string())),
        company: "Initrode".to_string(),
    }
}

fn draft_appraisal(id: &str, employee_id: &str) -> Appraisal {
    let now = Utc::now();
    Appraisal {
        id: AppraisalId(id.to_string()),
        employee_id: EmployeeId(employee_id.to_string()),
        form_id: FormId("form-2026-h1".to_string()),
        status: AppraisalStatus::Draft,
        current_approval_level: None,
        grade: None,
        total_score: None,
        submitted_at: None,
        reviewed_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// Org for the canonical scenario: E reports to S1, S1 reports to S2,
/// S2 is the top of the hierarchy.
async fn setup(policy: ChainPolicy) -> Env {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrations");

    let employees = SqlEmployeeRepository::new(pool.clone());
    employees.save(employee("emp-e", "line_operator", Some("emp-s1"))).await.expect("seed");
    employees.save(employee("emp-s1", "direct_manager", Some("emp-s2"))).await.expect("seed");
    employees.save(employee("emp-s2", "general_manager", None)).await.expect("seed");

    let appraisals = SqlAppraisalRepository::new(pool.clone());
    appraisals.save(draft_appraisal("APR-1", "emp-e")).await.expect("seed appraisal");

    let notifier = InMemorySender::default();
    let service = ReviewService::new(
        SqlEmployeeRepository::new(pool.clone()),
        SqlAppraisalRepository::new(pool.clone()),
        SqlChainRepository::new(pool.clone()),
        notifier.clone(),
        SqlAuditSink::new(pool.clone()),
        FixedScoring::default(),
        policy,
    );

    Env { pool, service, notifier }
}

fn id(raw: &str) -> AppraisalId {
    AppraisalId(raw.to_string())
}

fn user(raw: &str) -> EmployeeId {
    EmployeeId(raw.to_string())
}

#[tokio::test]
async fn two_level_chain_walks_submission_approval_and_completion() {
    let env = setup(ChainPolicy::default()).await;

    let levels = env.service.submit(&id("APR-1"), &user("emp-e")).await.expect("submit");
    assert_eq!(levels.len(), 2);
    assert_eq!(levels[0].approver_id.0, "emp-s1");
    assert!(levels[0].can_rate);
    assert!(!levels[0].is_final_approver);
    assert_eq!(levels[1].approver_id.0, "emp-s2");
    assert!(!levels[1].can_rate);
    assert!(levels[1].is_final_approver);

    // S1 approves level 1: appraisal moves to in_review and S2 is notified.
    env.service
        .record_decision(&id("APR-1"), &user("emp-s1"), Decision::Approve, Some("good half"), None)
        .await
        .expect("level 1 approval");

    let appraisals = SqlAppraisalRepository::new(env.pool.clone());
    let appraisal =
        appraisals.find_by_id(&id("APR-1")).await.expect("find").expect("exists");
    assert_eq!(appraisal.status, AppraisalStatus::InReview);
    assert_eq!(appraisal.current_approval_level, Some(2));

    let pending_notice = env.notifier.sent();
    let last = pending_notice.last().expect("notification sent");
    assert_eq!(last.event, NotificationEvent::ReviewPending);
    assert_eq!(last.recipient.0, "emp-s2");

    // S2 approves the final level: completed, scored, no pending level.
    env.service
        .record_decision(&id("APR-1"), &user("emp-s2"), Decision::Approve, None, None)
        .await
        .expect("final approval");

    let appraisal =
        appraisals.find_by_id(&id("APR-1")).await.expect("find").expect("exists");
    assert_eq!(appraisal.status, AppraisalStatus::Completed);
    assert_eq!(appraisal.total_score, Some(Decimal::new(85, 0)));
    assert_eq!(appraisal.grade.as_deref(), Some("B"));
    assert!(appraisal.reviewed_at.is_some());
    assert!(env.service.current_level(&id("APR-1")).await.expect("current").is_none());

    let chains = SqlChainRepository::new(env.pool.clone());
    let persisted = chains.levels_for(&id("APR-1")).await.expect("levels");
    assert!(persisted.iter().all(|level| level.status == LevelStatus::Approved));
}

#[tokio::test]
async fn depth_one_policy_yields_a_single_final_rating_level() {
    let policy = ChainPolicy { worker_max_depth: 1, ..ChainPolicy::default() };
    let env = setup(policy).await;

    let levels = env.service.submit(&id("APR-1"), &user("emp-e")).await.expect("submit");
    assert_eq!(levels.len(), 1);
    assert_eq!(levels[0].approver_id.0, "emp-s1");
    assert!(levels[0].can_rate);
    assert!(levels[0].is_final_approver);

    env.service
        .record_decision(&id("APR-1"), &user("emp-s1"), Decision::Approve, None, None)
        .await
        .expect("single-level approval completes");

    let appraisals = SqlAppraisalRepository::new(env.pool.clone());
    let appraisal =
        appraisals.find_by_id(&id("APR-1")).await.expect("find").expect("exists");
    assert_eq!(appraisal.status, AppraisalStatus::Completed);
}

#[tokio::test]
async fn final_level_rejection_reverts_to_draft_without_scoring() {
    let env = setup(ChainPolicy::default()).await;
    env.service.submit(&id("APR-1"), &user("emp-e")).await.expect("submit");
    env.service
        .record_decision(&id("APR-1"), &user("emp-s1"), Decision::Approve, None, None)
        .await
        .expect("level 1 approval");

    env.service
        .record_decision(&id("APR-1"), &user("emp-s2"), Decision::Reject, Some("expand goals"), None)
        .await
        .expect("rejection");

    let appraisals = SqlAppraisalRepository::new(env.pool.clone());
    let appraisal =
        appraisals.find_by_id(&id("APR-1")).await.expect("find").expect("exists");
    assert_eq!(appraisal.status, AppraisalStatus::Draft);
    assert_eq!(appraisal.total_score, None);
    assert_eq!(appraisal.grade, None);

    let chains = SqlChainRepository::new(env.pool.clone());
    let levels = chains.levels_for(&id("APR-1")).await.expect("levels");
    assert_eq!(levels[1].status, LevelStatus::Rejected);
    assert_eq!(levels[1].comments.as_deref(), Some("expand goals"));

    let rejected_notice = env.notifier.sent();
    let last = rejected_notice.last().expect("notification sent");
    assert_eq!(last.event, NotificationEvent::ReviewRejected);
    assert_eq!(last.recipient.0, "emp-e");
}

#[tokio::test]
async fn repeated_submission_never_duplicates_chain_rows() {
    let env = setup(ChainPolicy::default()).await;

    let first = env.service.submit(&id("APR-1"), &user("emp-e")).await.expect("first submit");
    let second = env.service.submit(&id("APR-1"), &user("emp-e")).await.expect("second submit");
    assert_eq!(first, second);

    let chains = SqlChainRepository::new(env.pool.clone());
    assert_eq!(chains.levels_for(&id("APR-1")).await.expect("levels").len(), 2);
}

#[tokio::test]
async fn resubmission_after_rejection_starts_a_clean_chain() {
    let env = setup(ChainPolicy::default()).await;
    env.service.submit(&id("APR-1"), &user("emp-e")).await.expect("submit");
    env.service
        .record_decision(&id("APR-1"), &user("emp-s1"), Decision::Reject, None, None)
        .await
        .expect("rejection at level 1");

    let levels = env.service.submit(&id("APR-1"), &user("emp-e")).await.expect("resubmit");
    assert_eq!(levels.len(), 2);
    assert!(levels.iter().all(|level| level.status == LevelStatus::Pending));

    let appraisals = SqlAppraisalRepository::new(env.pool.clone());
    let appraisal =
        appraisals.find_by_id(&id("APR-1")).await.expect("find").expect("exists");
    assert_eq!(appraisal.status, AppraisalStatus::Submitted);
    assert_eq!(appraisal.current_approval_level, Some(1));
}

#[tokio::test]
async fn every_state_change_lands_in_the_audit_trail() {
    let env = setup(ChainPolicy::default()).await;
    env.service.submit(&id("APR-1"), &user("emp-e")).await.expect("submit");
    env.service
        .record_decision(&id("APR-1"), &user("emp-s1"), Decision::Approve, None, None)
        .await
        .expect("level 1 approval");
    env.service
        .record_decision(&id("APR-1"), &user("emp-s2"), Decision::Approve, None, None)
        .await
        .expect("final approval");

    let sink = SqlAuditSink::new(env.pool.clone());
    let events = sink.events_for_entity("appraisal", "APR-1").await.expect("audit trail");
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].action, "appraisal.submitted");
    assert_eq!(events[1].action, "appraisal.decision_recorded");
    assert_eq!(events[1].actor_id, "emp-s1");
    assert_eq!(events[2].actor_id, "emp-s2");
}

#[tokio::test]
async fn approver_inbox_follows_the_chain() {
    let env = setup(ChainPolicy::default()).await;
    env.service.submit(&id("APR-1"), &user("emp-e")).await.expect("submit");

    assert_eq!(env.service.pending_inbox(&user("emp-s1")).await.expect("inbox").len(), 1);
    assert!(env.service.pending_inbox(&user("emp-s2")).await.expect("inbox").is_empty());

    env.service
        .record_decision(&id("APR-1"), &user("emp-s1"), Decision::Approve, None, None)
        .await
        .expect("advance");

    assert!(env.service.pending_inbox(&user("emp-s1")).await.expect("inbox").is_empty());
    assert_eq!(env.service.pending_inbox(&user("emp-s2")).await.expect("inbox").len(), 1);
}
