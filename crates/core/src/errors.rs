use thiserror::Error;

use crate::chain::ChainBuildError;
use crate::domain::appraisal::AppraisalStatus;
use crate::review::ReviewError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid appraisal transition from {from:?} to {to:?}")]
    InvalidAppraisalTransition { from: AppraisalStatus, to: AppraisalStatus },
    #[error(transparent)]
    ChainBuild(#[from] ChainBuildError),
    #[error(transparent)]
    Review(#[from] ReviewError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<ChainBuildError> for WorkflowError {
    fn from(value: ChainBuildError) -> Self {
        Self::Domain(DomainError::ChainBuild(value))
    }
}

impl From<ReviewError> for WorkflowError {
    fn from(value: ReviewError) -> Self {
        Self::Domain(DomainError::Review(value))
    }
}
