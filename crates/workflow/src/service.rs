use chrono::Utc;
use tracing::{info, warn};

use appraisy_core::audit::{AuditEvent, AuditOutcome, AuditSink};
use appraisy_core::chain::{ChainBuildError, ChainBuilder, ChainPolicy};
use appraisy_core::directory::OrgSnapshot;
use appraisy_core::domain::appraisal::{Appraisal, AppraisalId, AppraisalStatus};
use appraisy_core::domain::employee::EmployeeId;
use appraisy_core::domain::level::{ApprovalLevel, Decision};
use appraisy_core::errors::WorkflowError;
use appraisy_core::notify::{NotificationEvent, NotificationSender};
use appraisy_core::review::{self, DecisionOutcome, RatingEntry, ReviewError};
use appraisy_core::scoring::FinalScoring;
use appraisy_db::repositories::{
    AppraisalRepository, ChainRepository, EmployeeRepository, RepositoryError,
};

/// Drives appraisals through submission, multi-level review, and
/// completion. Every operation takes the acting user explicitly; nothing
/// is read from ambient session state.
pub struct ReviewService<E, A, C, N, S, F> {
    employees: E,
    appraisals: A,
    chains: C,
    notifier: N,
    audit: S,
    scoring: F,
    policy: ChainPolicy,
}

impl<E, A, C, N, S, F> ReviewService<E, A, C, N, S, F>
where
    E: EmployeeRepository,
    A: AppraisalRepository,
    C: ChainRepository,
    N: NotificationSender,
    S: AuditSink,
    F: FinalScoring,
{
    pub fn new(
        employees: E,
        appraisals: A,
        chains: C,
        notifier: N,
        audit: S,
        scoring: F,
        policy: ChainPolicy,
    ) -> Self {
        Self { employees, appraisals, chains, notifier, audit, scoring, policy }
    }

    /// Submits a draft appraisal: builds the approval chain from the org
    /// hierarchy, persists it all-or-nothing, and activates level 1.
    ///
    /// Calling this for an appraisal that is already under review is a
    /// no-op returning the existing chain. After a rejection the stale
    /// chain is cleared and rebuilt, since the hierarchy may have changed
    /// between submissions.
    pub async fn submit(
        &self,
        appraisal_id: &AppraisalId,
        actor: &EmployeeId,
    ) -> Result<Vec<ApprovalLevel>, WorkflowError> {
        let mut appraisal = self.load_appraisal(appraisal_id).await?;

        if appraisal.employee_id != *actor {
            return Err(ReviewError::NotAuthorized {
                appraisal_id: appraisal_id.0.clone(),
                user_id: actor.0.clone(),
            }
            .into());
        }

        match appraisal.status {
            AppraisalStatus::Draft => {}
            AppraisalStatus::Submitted | AppraisalStatus::InReview => {
                let levels = self.chains.levels_for(appraisal_id).await.map_err(persistence)?;
                info!(
                    event_name = "appraisal.submit_noop",
                    appraisal_id = %appraisal_id.0,
                    levels = levels.len(),
                    "chain already built, submission is a no-op"
                );
                return Ok(levels);
            }
            AppraisalStatus::Completed | AppraisalStatus::Cancelled => {
                return Err(ReviewError::InvalidState {
                    appraisal_id: appraisal_id.0.clone(),
                    reason: format!("status is {:?}", appraisal.status),
                }
                .into());
            }
        }

        let employees = self.employees.list_all().await.map_err(persistence)?;
        let snapshot = OrgSnapshot::new(employees);
        let builder = ChainBuilder::new(snapshot, self.policy.clone());
        let levels = builder.build(appraisal_id, &appraisal.employee_id)?;

        let existing = self.chains.levels_for(appraisal_id).await.map_err(persistence)?;
        if existing.is_empty() {
            match self.chains.insert_chain(&levels).await {
                Ok(()) => {}
                Err(RepositoryError::Conflict(_)) => {
                    return Err(ChainBuildError::ChainAlreadyBuilt {
                        appraisal_id: appraisal_id.0.clone(),
                    }
                    .into());
                }
                Err(error) => return Err(persistence(error)),
            }
        } else {
            // Leftover chain from a rejected round: clear and rebuild.
            self.chains.replace_chain(appraisal_id, &levels).await.map_err(persistence)?;
        }

        let now = Utc::now();
        appraisal.transition_to(AppraisalStatus::Submitted).map_err(WorkflowError::Domain)?;
        appraisal.current_approval_level = Some(1);
        appraisal.submitted_at = Some(now);
        appraisal.reviewed_at = None;
        appraisal.grade = None;
        appraisal.total_score = None;
        appraisal.updated_at = now;
        self.appraisals.save(appraisal).await.map_err(persistence)?;

        info!(
            event_name = "appraisal.submitted",
            appraisal_id = %appraisal_id.0,
            actor = %actor.0,
            levels = levels.len(),
            "appraisal submitted and approval chain built"
        );

        if let Some(first) = levels.first() {
            self.notify_best_effort(
                &first.approver_id,
                NotificationEvent::ReviewPending,
                appraisal_id,
            )
            .await;
        }
        self.audit_best_effort(
            AuditEvent::new(
                actor.0.clone(),
                "appraisal.submitted",
                "appraisal",
                appraisal_id.0.clone(),
                AuditOutcome::Success,
            )
            .with_before("draft")
            .with_after("submitted")
            .with_note(format!("approval chain built with {} levels", levels.len())),
        )
        .await;

        Ok(levels)
    }

    /// Lowest-numbered pending level for the appraisal, if any.
    pub async fn current_level(
        &self,
        appraisal_id: &AppraisalId,
    ) -> Result<Option<ApprovalLevel>, WorkflowError> {
        let levels = self.chains.levels_for(appraisal_id).await.map_err(persistence)?;
        Ok(review::current_level(&levels).cloned())
    }

    pub async fn can_decide(
        &self,
        appraisal_id: &AppraisalId,
        user_id: &EmployeeId,
    ) -> Result<bool, WorkflowError> {
        let levels = self.chains.levels_for(appraisal_id).await.map_err(persistence)?;
        Ok(review::can_decide(&levels, user_id))
    }

    /// Appraisals whose active level is waiting on this approver.
    pub async fn pending_inbox(
        &self,
        approver_id: &EmployeeId,
    ) -> Result<Vec<Appraisal>, WorkflowError> {
        self.appraisals.pending_for_approver(approver_id).await.map_err(persistence)
    }

    /// Records an approve/reject decision at the appraisal's current level
    /// and advances the lifecycle. The level write is conditional on the
    /// level still being pending, so two racing approvers cannot both win.
    pub async fn record_decision(
        &self,
        appraisal_id: &AppraisalId,
        actor: &EmployeeId,
        decision: Decision,
        comments: Option<&str>,
        ratings: Option<&[RatingEntry]>,
    ) -> Result<DecisionOutcome, WorkflowError> {
        let mut appraisal = self.load_appraisal(appraisal_id).await?;
        let levels = self.chains.levels_for(appraisal_id).await.map_err(persistence)?;

        let Some(current) = review::current_level(&levels) else {
            return Err(ReviewError::InvalidState {
                appraisal_id: appraisal_id.0.clone(),
                reason: "no pending approval level".to_string(),
            }
            .into());
        };

        let outcome =
            review::evaluate_decision(&appraisal, current, actor, decision, ratings.is_some())?;

        let now = Utc::now();
        match self
            .chains
            .record_decision(appraisal_id, outcome.decided_level, &outcome.level_status, comments, now)
            .await
        {
            Ok(()) => {}
            Err(RepositoryError::Conflict(_)) => {
                return Err(ReviewError::PersistenceConflict {
                    appraisal_id: appraisal_id.0.clone(),
                    level: outcome.decided_level,
                }
                .into());
            }
            Err(error) => return Err(persistence(error)),
        }

        let before_status = appraisal.status.clone();
        appraisal
            .transition_to(outcome.appraisal_status.clone())
            .map_err(WorkflowError::Domain)?;
        appraisal.current_approval_level = match outcome.appraisal_status {
            AppraisalStatus::Draft => None,
            _ => outcome.next_approval_level.or(Some(outcome.decided_level)),
        };

        if outcome.finalize_scores {
            appraisal.reviewed_at = Some(now);
            match self.scoring.compute(appraisal_id).await {
                Ok(summary) => {
                    appraisal.total_score = Some(summary.total_score);
                    appraisal.grade = Some(summary.grade);
                }
                Err(error) => {
                    warn!(
                        event_name = "scoring.compute_failed",
                        appraisal_id = %appraisal_id.0,
                        error = %error,
                        "final scoring failed, grade left unset"
                    );
                }
            }
        }
        appraisal.updated_at = now;
        self.appraisals.save(appraisal.clone()).await.map_err(persistence)?;

        info!(
            event_name = "appraisal.decision_recorded",
            appraisal_id = %appraisal_id.0,
            actor = %actor.0,
            level = outcome.decided_level,
            decision = ?decision,
            status = ?appraisal.status,
            "decision recorded"
        );

        let recipient = match outcome.notification {
            NotificationEvent::ReviewPending => outcome
                .next_approval_level
                .and_then(|next| levels.iter().find(|level| level.level == next))
                .map(|level| level.approver_id.clone()),
            NotificationEvent::ReviewCompleted | NotificationEvent::ReviewRejected => {
                Some(appraisal.employee_id.clone())
            }
        };
        if let Some(recipient) = recipient {
            self.notify_best_effort(&recipient, outcome.notification, appraisal_id).await;
        }

        self.audit_best_effort(
            AuditEvent::new(
                actor.0.clone(),
                "appraisal.decision_recorded",
                "appraisal",
                appraisal_id.0.clone(),
                AuditOutcome::Success,
            )
            .with_before(format!("{before_status:?}"))
            .with_after(format!("{:?}", appraisal.status))
            .with_note(format!(
                "level {} {:?}{}",
                outcome.decided_level,
                outcome.level_status,
                comments.map(|c| format!(": {c}")).unwrap_or_default()
            )),
        )
        .await;

        Ok(outcome)
    }

    /// Cancels a draft appraisal. Only the subject employee may cancel,
    /// and only before submission.
    pub async fn cancel(
        &self,
        appraisal_id: &AppraisalId,
        actor: &EmployeeId,
    ) -> Result<(), WorkflowError> {
        let mut appraisal = self.load_appraisal(appraisal_id).await?;

        if appraisal.employee_id != *actor {
            return Err(ReviewError::NotAuthorized {
                appraisal_id: appraisal_id.0.clone(),
                user_id: actor.0.clone(),
            }
            .into());
        }

        let before_status = appraisal.status.clone();
        appraisal.transition_to(AppraisalStatus::Cancelled).map_err(WorkflowError::Domain)?;
        appraisal.updated_at = Utc::now();
        self.appraisals.save(appraisal).await.map_err(persistence)?;

        self.audit_best_effort(
            AuditEvent::new(
                actor.0.clone(),
                "appraisal.cancelled",
                "appraisal",
                appraisal_id.0.clone(),
                AuditOutcome::Success,
            )
            .with_before(format!("{before_status:?}"))
            .with_after("Cancelled"),
        )
        .await;

        Ok(())
    }

    async fn load_appraisal(&self, appraisal_id: &AppraisalId) -> Result<Appraisal, WorkflowError> {
        self.appraisals
            .find_by_id(appraisal_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| {
                ReviewError::InvalidState {
                    appraisal_id: appraisal_id.0.clone(),
                    reason: "appraisal not found".to_string(),
                }
                .into()
            })
    }

    async fn notify_best_effort(
        &self,
        recipient: &EmployeeId,
        event: NotificationEvent,
        appraisal_id: &AppraisalId,
    ) {
        if let Err(error) = self.notifier.notify(recipient, event, appraisal_id).await {
            warn!(
                event_name = "notification.dispatch_failed",
                appraisal_id = %appraisal_id.0,
                recipient = %recipient.0,
                notification = event.as_str(),
                error = %error,
                "notification failure ignored"
            );
        }
    }

    async fn audit_best_effort(&self, event: AuditEvent) {
        if let Err(error) = self.audit.record(event).await {
            warn!(
                event_name = "audit.record_failed",
                error = %error,
                "audit sink failure ignored"
            );
        }
    }
}

fn persistence(error: RepositoryError) -> WorkflowError {
    WorkflowError::Persistence(error.to_string())
}
