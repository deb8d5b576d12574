use std::collections::HashMap;

use crate::domain::employee::{Employee, EmployeeId, EmployeeType};

/// Organizational hierarchy lookup. The supervisor relation is a weak
/// reference: implementations resolve ids, they never own employee objects.
pub trait OrgDirectory {
    fn supervisor_of(&self, employee_id: &EmployeeId) -> Option<EmployeeId>;
    fn employee_type_of(&self, employee_id: &EmployeeId) -> Option<EmployeeType>;
    fn role_label_of(&self, employee_id: &EmployeeId) -> Option<String>;
}

/// In-memory snapshot of the employee directory, keyed by id. Loaded once
/// per operation from the employee store, so chain construction sees a
/// consistent view of the hierarchy.
#[derive(Clone, Debug, Default)]
pub struct OrgSnapshot {
    employees_by_id: HashMap<String, Employee>,
}

impl OrgSnapshot {
    pub fn new(employees: Vec<Employee>) -> Self {
        let employees_by_id =
            employees.into_iter().map(|employee| (employee.id.0.clone(), employee)).collect();
        Self { employees_by_id }
    }

    pub fn get(&self, employee_id: &EmployeeId) -> Option<&Employee> {
        self.employees_by_id.get(&employee_id.0)
    }
}

impl OrgDirectory for OrgSnapshot {
    fn supervisor_of(&self, employee_id: &EmployeeId) -> Option<EmployeeId> {
        self.get(employee_id).and_then(|employee| employee.direct_superior.clone())
    }

    fn employee_type_of(&self, employee_id: &EmployeeId) -> Option<EmployeeType> {
        self.get(employee_id).map(|employee| employee.employee_type)
    }

    fn role_label_of(&self, employee_id: &EmployeeId) -> Option<String> {
        self.get(employee_id).map(|employee| employee.position.clone())
    }
}
