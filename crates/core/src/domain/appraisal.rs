use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::employee::EmployeeId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppraisalId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppraisalStatus {
    Draft,
    Submitted,
    InReview,
    Completed,
    Cancelled,
}

impl AppraisalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Statuses in which an approver decision may be recorded.
    pub fn is_decidable(&self) -> bool {
        matches!(self, Self::Submitted | Self::InReview)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Appraisal {
    pub id: AppraisalId,
    pub employee_id: EmployeeId,
    pub form_id: FormId,
    pub status: AppraisalStatus,
    pub current_approval_level: Option<u32>,
    pub grade: Option<String>,
    pub total_score: Option<Decimal>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appraisal {
    pub fn can_transition_to(&self, next: &AppraisalStatus) -> bool {
        matches!(
            (&self.status, next),
            (AppraisalStatus::Draft, AppraisalStatus::Submitted)
                | (AppraisalStatus::Submitted, AppraisalStatus::InReview)
                | (AppraisalStatus::Submitted, AppraisalStatus::Completed)
                | (AppraisalStatus::Submitted, AppraisalStatus::Draft)
                | (AppraisalStatus::InReview, AppraisalStatus::InReview)
                | (AppraisalStatus::InReview, AppraisalStatus::Completed)
                | (AppraisalStatus::InReview, AppraisalStatus::Draft)
                | (AppraisalStatus::Draft, AppraisalStatus::Cancelled)
        )
    }

    pub fn transition_to(&mut self, next: AppraisalStatus) -> Result<(), DomainError> {
        if self.can_transition_to(&next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidAppraisalTransition { from: self.status.clone(), to: next })
    }
}
