use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::directory::OrgDirectory;
use crate::domain::appraisal::AppraisalId;
use crate::domain::employee::{EmployeeId, EmployeeType};
use crate::domain::level::ApprovalLevel;

/// Chain construction rules: how far up the hierarchy the walk may go for
/// each employee type, and which roles terminate the walk early.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainPolicy {
    pub worker_max_depth: u32,
    pub general_max_depth: u32,
    pub management_max_depth: u32,
    pub terminal_roles: Vec<String>,
}

impl Default for ChainPolicy {
    fn default() -> Self {
        Self {
            worker_max_depth: 2,
            general_max_depth: 3,
            management_max_depth: 2,
            terminal_roles: vec!["top_management".to_string()],
        }
    }
}

impl ChainPolicy {
    pub fn max_depth(&self, employee_type: EmployeeType) -> u32 {
        let depth = match employee_type {
            EmployeeType::Worker => self.worker_max_depth,
            EmployeeType::General => self.general_max_depth,
            EmployeeType::Management => self.management_max_depth,
        };
        depth.max(1)
    }

    pub fn is_terminal_role(&self, role: &str) -> bool {
        let role = normalize_key(role);
        self.terminal_roles.iter().any(|terminal| normalize_key(terminal) == role)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ChainBuildError {
    #[error("employee `{employee_id}` is not present in the org directory")]
    UnknownEmployee { employee_id: String },
    #[error("employee `{employee_id}` has no direct superior to review the appraisal")]
    NoSupervisor { employee_id: String },
    #[error("appraisal `{appraisal_id}` already has an approval chain")]
    ChainAlreadyBuilt { appraisal_id: String },
}

/// Computes the ordered approval chain for one appraisal by walking the
/// supervisor graph upward from the subject employee.
#[derive(Clone, Debug)]
pub struct ChainBuilder<D> {
    directory: D,
    policy: ChainPolicy,
}

impl<D> ChainBuilder<D>
where
    D: OrgDirectory,
{
    pub fn new(directory: D, policy: ChainPolicy) -> Self {
        Self { directory, policy }
    }

    /// Produces levels `1..=N`: level 1 is the direct supervisor and the
    /// only rating level; the last level produced is the final approver.
    /// The walk stops at the policy depth for the subject's employee type,
    /// at the top of the hierarchy, at a terminal role, or on revisiting
    /// an approver already in the chain (cyclic or flat org data).
    pub fn build(
        &self,
        appraisal_id: &AppraisalId,
        employee_id: &EmployeeId,
    ) -> Result<Vec<ApprovalLevel>, ChainBuildError> {
        let employee_type = self.directory.employee_type_of(employee_id).ok_or_else(|| {
            ChainBuildError::UnknownEmployee { employee_id: employee_id.0.clone() }
        })?;
        let max_depth = self.policy.max_depth(employee_type);

        let mut levels: Vec<ApprovalLevel> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(employee_id.0.clone());

        let mut cursor = self.directory.supervisor_of(employee_id);
        while let Some(approver_id) = cursor {
            if !visited.insert(approver_id.0.clone()) {
                break;
            }

            let role = self
                .directory
                .role_label_of(&approver_id)
                .filter(|label| !label.trim().is_empty())
                .unwrap_or_else(|| "manager".to_string());
            let level_number = levels.len() as u32 + 1;
            levels.push(ApprovalLevel::pending(
                appraisal_id.clone(),
                level_number,
                approver_id.clone(),
                role.clone(),
            ));

            if level_number >= max_depth || self.policy.is_terminal_role(&role) {
                break;
            }

            cursor = self.directory.supervisor_of(&approver_id);
        }

        let Some(last) = levels.last_mut() else {
            return Err(ChainBuildError::NoSupervisor { employee_id: employee_id.0.clone() });
        };
        last.is_final_approver = true;

        Ok(levels)
    }
}

fn normalize_key(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}
