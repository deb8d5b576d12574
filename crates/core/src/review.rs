use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::appraisal::{Appraisal, AppraisalStatus};
use crate::domain::employee::EmployeeId;
use crate::domain::level::{ApprovalLevel, Decision, LevelStatus};
use crate::notify::NotificationEvent;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReviewError {
    #[error("appraisal `{appraisal_id}` is not in a reviewable status ({reason})")]
    InvalidState { appraisal_id: String, reason: String },
    #[error("user `{user_id}` is not the pending approver for appraisal `{appraisal_id}`")]
    NotAuthorized { appraisal_id: String, user_id: String },
    #[error("level {level} of appraisal `{appraisal_id}` does not accept ratings")]
    RatingNotAllowed { appraisal_id: String, level: u32 },
    #[error("level {level} of appraisal `{appraisal_id}` was decided concurrently")]
    PersistenceConflict { appraisal_id: String, level: u32 },
}

/// Per-question rating attached by the level-1 (rating) approver. Rating
/// persistence belongs to the forms layer; the workflow only polices who
/// may attach them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatingEntry {
    pub question_id: String,
    pub score: Decimal,
}

/// Everything the persistence layer must apply after a decision is
/// accepted. Computed purely so the transition table is testable without a
/// database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub decided_level: u32,
    pub level_status: LevelStatus,
    pub appraisal_status: AppraisalStatus,
    pub next_approval_level: Option<u32>,
    pub finalize_scores: bool,
    pub notification: NotificationEvent,
}

/// The appraisal state machine's single transition point. `current` must be
/// the lowest-numbered pending level for the appraisal; callers resolve it
/// before evaluating.
pub fn evaluate_decision(
    appraisal: &Appraisal,
    current: &ApprovalLevel,
    actor: &EmployeeId,
    decision: Decision,
    ratings_attached: bool,
) -> Result<DecisionOutcome, ReviewError> {
    if !appraisal.status.is_decidable() {
        return Err(ReviewError::InvalidState {
            appraisal_id: appraisal.id.0.clone(),
            reason: format!("status is {:?}", appraisal.status),
        });
    }

    if current.status != LevelStatus::Pending {
        return Err(ReviewError::InvalidState {
            appraisal_id: appraisal.id.0.clone(),
            reason: format!("level {} already {:?}", current.level, current.status),
        });
    }

    if current.approver_id != *actor {
        return Err(ReviewError::NotAuthorized {
            appraisal_id: appraisal.id.0.clone(),
            user_id: actor.0.clone(),
        });
    }

    if ratings_attached && !current.can_rate {
        return Err(ReviewError::RatingNotAllowed {
            appraisal_id: appraisal.id.0.clone(),
            level: current.level,
        });
    }

    let outcome = match decision {
        Decision::Approve if current.is_final_approver => DecisionOutcome {
            decided_level: current.level,
            level_status: LevelStatus::Approved,
            appraisal_status: AppraisalStatus::Completed,
            next_approval_level: None,
            finalize_scores: true,
            notification: NotificationEvent::ReviewCompleted,
        },
        Decision::Approve => DecisionOutcome {
            decided_level: current.level,
            level_status: LevelStatus::Approved,
            appraisal_status: AppraisalStatus::InReview,
            next_approval_level: Some(current.level + 1),
            finalize_scores: false,
            notification: NotificationEvent::ReviewPending,
        },
        Decision::Reject => DecisionOutcome {
            decided_level: current.level,
            level_status: LevelStatus::Rejected,
            appraisal_status: AppraisalStatus::Draft,
            next_approval_level: None,
            finalize_scores: false,
            notification: NotificationEvent::ReviewRejected,
        },
    };

    Ok(outcome)
}

/// Lowest-numbered pending level, the only one an approver may act on.
pub fn current_level(levels: &[ApprovalLevel]) -> Option<&ApprovalLevel> {
    levels
        .iter()
        .filter(|level| level.status == LevelStatus::Pending)
        .min_by_key(|level| level.level)
}

pub fn can_decide(levels: &[ApprovalLevel], user_id: &EmployeeId) -> bool {
    current_level(levels).map(|level| level.approver_id == *user_id).unwrap_or(false)
}
