use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use appraisy_core::domain::appraisal::{Appraisal, AppraisalId};
use appraisy_core::domain::employee::{Employee, EmployeeId};
use appraisy_core::domain::level::{ApprovalLevel, LevelStatus};

use super::{AppraisalRepository, ChainRepository, EmployeeRepository, RepositoryError};

#[derive(Clone, Default)]
pub struct InMemoryEmployeeRepository {
    employees: Arc<RwLock<HashMap<String, Employee>>>,
}

#[async_trait::async_trait]
impl EmployeeRepository for InMemoryEmployeeRepository {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let employees = self.employees.read().await;
        Ok(employees.get(&id.0).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Employee>, RepositoryError> {
        let employees = self.employees.read().await;
        let mut all: Vec<Employee> = employees.values().cloned().collect();
        all.sort_by(|left, right| left.id.0.cmp(&right.id.0));
        Ok(all)
    }

    async fn save(&self, employee: Employee) -> Result<(), RepositoryError> {
        let mut employees = self.employees.write().await;
        employees.insert(employee.id.0.clone(), employee);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryChainRepository {
    chains: Arc<RwLock<HashMap<String, Vec<ApprovalLevel>>>>,
}

#[async_trait::async_trait]
impl ChainRepository for InMemoryChainRepository {
    async fn levels_for(
        &self,
        appraisal_id: &AppraisalId,
    ) -> Result<Vec<ApprovalLevel>, RepositoryError> {
        let chains = self.chains.read().await;
        let mut levels = chains.get(&appraisal_id.0).cloned().unwrap_or_default();
        levels.sort_by_key(|level| level.level);
        Ok(levels)
    }

    async fn insert_chain(&self, levels: &[ApprovalLevel]) -> Result<(), RepositoryError> {
        let Some(first) = levels.first() else {
            return Ok(());
        };

        let mut chains = self.chains.write().await;
        if chains.get(&first.appraisal_id.0).map(|existing| !existing.is_empty()).unwrap_or(false) {
            return Err(RepositoryError::Conflict(format!(
                "appraisal `{}` already has chain rows",
                first.appraisal_id.0
            )));
        }
        chains.insert(first.appraisal_id.0.clone(), levels.to_vec());
        Ok(())
    }

    async fn replace_chain(
        &self,
        appraisal_id: &AppraisalId,
        levels: &[ApprovalLevel],
    ) -> Result<(), RepositoryError> {
        let mut chains = self.chains.write().await;
        chains.insert(appraisal_id.0.clone(), levels.to_vec());
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
        let mut chains = self.chains.write().await;
        let target = chains
            .get_mut(&appraisal_id.0)
            .and_then(|levels| levels.iter_mut().find(|candidate| candidate.level == level))
            .filter(|candidate| candidate.status == LevelStatus::Pending);

        let Some(target) = target else {
            return Err(RepositoryError::Conflict(format!(
                "level {level} of appraisal `{}` is no longer pending",
                appraisal_id.0
            )));
        };

        target.status = status.clone();
        target.comments = comments.map(|c| c.to_string());
        target.acted_at = Some(acted_at);
        Ok(())
    }
}

/// In-memory appraisal store. Holds a handle to the chain store so the
/// approver inbox query can resolve current levels the way the SQL
/// implementation joins them.
#[derive(Clone, Default)]
pub struct InMemoryAppraisalRepository {
    appraisals: Arc<RwLock<HashMap<String, Appraisal>>>,
    chains: InMemoryChainRepository,
}

impl InMemoryAppraisalRepository {
    pub fn with_chains(chains: InMemoryChainRepository) -> Self {
        Self { appraisals: Arc::default(), chains }
    }
}

#[async_trait::async_trait]
impl AppraisalRepository for InMemoryAppraisalRepository {
    async fn find_by_id(&self, id: &AppraisalId) -> Result<Option<Appraisal>, RepositoryError> {
        let appraisals = self.appraisals.read().await;
        Ok(appraisals.get(&id.0).cloned())
    }

    async fn save(&self, appraisal: Appraisal) -> Result<(), RepositoryError> {
        let mut appraisals = self.appraisals.write().await;
        appraisals.insert(appraisal.id.0.clone(), appraisal);
        Ok(())
    }

    async fn pending_for_approver(
        &self,
        approver_id: &EmployeeId,
    ) -> Result<Vec<Appraisal>, RepositoryError> {
        let appraisals = self.appraisals.read().await;
        let mut inbox = Vec::new();
        for appraisal in appraisals.values() {
            if !appraisal.status.is_decidable() {
                continue;
            }
            let levels = self.chains.levels_for(&appraisal.id).await?;
            let current = appraisy_core::review::current_level(&levels);
            if current.map(|level| level.approver_id == *approver_id).unwrap_or(false) {
                inbox.push(appraisal.clone());
            }
        }
        inbox.sort_by_key(|appraisal| appraisal.submitted_at);
        Ok(inbox)
    }
}
