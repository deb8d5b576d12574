use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::appraisal::AppraisalId;
use crate::domain::employee::EmployeeId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelStatus {
    Pending,
    Approved,
    Rejected,
}

/// One rung of an appraisal's approval chain. Identity is
/// (appraisal_id, level); level numbering starts at 1 and is contiguous.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalLevel {
    pub appraisal_id: AppraisalId,
    pub level: u32,
    pub approver_id: EmployeeId,
    pub approver_role: String,
    pub can_rate: bool,
    pub is_final_approver: bool,
    pub status: LevelStatus,
    pub comments: Option<String>,
    pub acted_at: Option<DateTime<Utc>>,
}

impl ApprovalLevel {
    pub fn pending(
        appraisal_id: AppraisalId,
        level: u32,
        approver_id: EmployeeId,
        approver_role: impl Into<String>,
    ) -> Self {
        Self {
            appraisal_id,
            level,
            approver_id,
            approver_role: approver_role.into(),
            can_rate: level == 1,
            is_final_approver: false,
            status: LevelStatus::Pending,
            comments: None,
            acted_at: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

#[cfg(test)]
mod tests {
    use crate::domain::appraisal::AppraisalId;
    use crate::domain::employee::EmployeeId;

    use super::{ApprovalLevel, LevelStatus};

    #[test]
    fn pending_constructor_marks_only_level_one_as_rating() {
        let first = ApprovalLevel::pending(
            AppraisalId("APR-1".to_string()),
            1,
            EmployeeId("emp-mgr".to_string()),
            "direct_manager",
        );
        let second = ApprovalLevel::pending(
            AppraisalId("APR-1".to_string()),
            2,
            EmployeeId("emp-gm".to_string()),
            "general_manager",
        );

        assert!(first.can_rate);
        assert!(!second.can_rate);
        assert_eq!(first.status, LevelStatus::Pending);
        assert!(first.acted_at.is_none());
    }
}
