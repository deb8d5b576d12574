use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub String);

/// Employment category. Chain depth policy keys off this.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeType {
    Worker,
    General,
    Management,
}

impl EmployeeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Worker => "worker",
            Self::General => "general",
            Self::Management => "management",
        }
    }
}

/// Employee master data. Owned by external user management; the workflow
/// core only reads it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub employee_type: EmployeeType,
    pub department: String,
    pub position: String,
    pub direct_superior: Option<EmployeeId>,
    pub company: String,
}
