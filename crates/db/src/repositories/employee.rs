use sqlx::Row;

use appraisy_core::domain::employee::{Employee, EmployeeId, EmployeeType};

use super::{EmployeeRepository, RepositoryError};
use crate::DbPool;

pub struct SqlEmployeeRepository {
    pool: DbPool,
}

impl SqlEmployeeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_employee_type(s: &str) -> Result<EmployeeType, RepositoryError> {
    match s {
        "worker" => Ok(EmployeeType::Worker),
        "general" => Ok(EmployeeType::General),
        "management" => Ok(EmployeeType::Management),
        other => Err(RepositoryError::Decode(format!("unknown employee type `{other}`"))),
    }
}

fn row_to_employee(row: &sqlx::sqlite::SqliteRow) -> Result<Employee, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let employee_type: String =
        row.try_get("employee_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let department: String =
        row.try_get("department").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let position: String =
        row.try_get("position").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let direct_superior: Option<String> =
        row.try_get("direct_superior").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let company: String =
        row.try_get("company").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Employee {
        id: EmployeeId(id),
        name,
        employee_type: parse_employee_type(&employee_type)?,
        department,
        position,
        direct_superior: direct_superior.map(EmployeeId),
        company,
    })
}

#[async_trait::async_trait]
impl EmployeeRepository for SqlEmployeeRepository {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, employee_type, department, position, direct_superior, company
             FROM employee WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_employee(r)?)),
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<Employee>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, name, employee_type, department, position, direct_superior, company
             FROM employee ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_employee).collect::<Result<Vec<_>, _>>()
    }

    async fn save(&self, employee: Employee) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO employee (id, name, employee_type, department, position,
                                   direct_superior, company)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 employee_type = excluded.employee_type,
                 department = excluded.department,
                 position = excluded.position,
                 direct_superior = excluded.direct_superior,
                 company = excluded.company",
        )
        .bind(&employee.id.0)
        .bind(&employee.name)
        .bind(employee.employee_type.as_str())
        .bind(&employee.department)
        .bind(&employee.position)
        .bind(employee.direct_superior.as_ref().map(|id| id.0.as_str()))
        .bind(&employee.company)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
