use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use appraisy_core::domain::appraisal::{Appraisal, AppraisalId};
use appraisy_core::domain::employee::{Employee, EmployeeId};
use appraisy_core::domain::level::{ApprovalLevel, LevelStatus};

pub mod appraisal;
pub mod audit;
pub mod chain;
pub mod employee;
pub mod memory;

pub use appraisal::SqlAppraisalRepository;
pub use audit::SqlAuditSink;
pub use chain::SqlChainRepository;
pub use employee::SqlEmployeeRepository;
pub use memory::{InMemoryAppraisalRepository, InMemoryChainRepository, InMemoryEmployeeRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError>;
    async fn list_all(&self) -> Result<Vec<Employee>, RepositoryError>;
    async fn save(&self, employee: Employee) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AppraisalRepository: Send + Sync {
    async fn find_by_id(&self, id: &AppraisalId) -> Result<Option<Appraisal>, RepositoryError>;
    async fn save(&self, appraisal: Appraisal) -> Result<(), RepositoryError>;
    /// Appraisals whose lowest pending level names this approver: the
    /// "pending your review" inbox.
    async fn pending_for_approver(
        &self,
        approver_id: &EmployeeId,
    ) -> Result<Vec<Appraisal>, RepositoryError>;
}

/// Persistence for approval chains. Implementations must make chain
/// creation all-or-nothing and decision writes conditional, so concurrent
/// submissions and racing approvers are serialized at the data layer.
#[async_trait]
pub trait ChainRepository: Send + Sync {
    async fn levels_for(
        &self,
        appraisal_id: &AppraisalId,
    ) -> Result<Vec<ApprovalLevel>, RepositoryError>;

    /// Inserts a full chain in one transaction. Fails with
    /// [`RepositoryError::Conflict`] if any chain rows already exist for
    /// the appraisal.
    async fn insert_chain(&self, levels: &[ApprovalLevel]) -> Result<(), RepositoryError>;

    /// Clears any existing chain and inserts the replacement in the same
    /// transaction. Used on resubmission after a rejection.
    async fn replace_chain(
        &self,
        appraisal_id: &AppraisalId,
        levels: &[ApprovalLevel],
    ) -> Result<(), RepositoryError>;

    /// Stamps a decision onto one level, conditional on the level still
    /// being pending. A zero-row update means another decision won the
    /// race and surfaces as [`RepositoryError::Conflict`].
    async fn record_decision(
        &self,
        appraisal_id: &AppraisalId,
        level: u32,
        status: &LevelStatus,
        comments: Option<&str>,
        acted_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}
