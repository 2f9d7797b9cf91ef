use std::{collections::HashMap, str::FromStr};

use chrono::NaiveDate;
use entity::{department, employee, project};
use platform_authz::{Identity, PolicyEngine, ResourceKind, Role};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    employee::policy_role,
    error::{HrError, HrResult},
    money::money,
    scope::ScopeFilter,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReportKind {
    EmployeesByDepartment,
    SalaryCostPerDepartment,
    ActiveProjects,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::EmployeesByDepartment => "employees_by_department",
            ReportKind::SalaryCostPerDepartment => "salary_cost_per_department",
            ReportKind::ActiveProjects => "active_projects",
        }
    }

    /// Parses the `type` query parameter.
    pub fn parse(raw: Option<&str>) -> HrResult<Self> {
        raw.ok_or_else(unknown_report)?.parse()
    }
}

impl FromStr for ReportKind {
    type Err = HrError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "employees_by_department" => Ok(ReportKind::EmployeesByDepartment),
            "salary_cost_per_department" => Ok(ReportKind::SalaryCostPerDepartment),
            "active_projects" => Ok(ReportKind::ActiveProjects),
            _ => Err(unknown_report()),
        }
    }
}

fn unknown_report() -> HrError {
    HrError::validation("Unknown or missing report 'type'.")
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeadcountMember {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub salary: Decimal,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DepartmentHeadcount {
    /// Department name.
    pub department: String,
    pub count: usize,
    pub employees: Vec<HeadcountMember>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DepartmentSalaryCost {
    pub id: Uuid,
    pub name: String,
    /// `None` when the department has no employees.
    pub total_salary: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActiveProject {
    pub id: Uuid,
    pub name: String,
    pub department_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
    EmployeesByDepartment(Vec<DepartmentHeadcount>),
    SalaryCostPerDepartment(Vec<DepartmentSalaryCost>),
    ActiveProjects(Vec<ActiveProject>),
}

pub struct ReportService<'a> {
    db: &'a DatabaseConnection,
    policy: PolicyEngine,
}

impl<'a> ReportService<'a> {
    pub fn new(db: &'a DatabaseConnection, policy: PolicyEngine) -> Self {
        Self { db, policy }
    }

    #[instrument(
        name = "hr.reports.run",
        skip_all,
        fields(kind = kind.as_str(), role = identity.role.as_str())
    )]
    pub async fn run(&self, identity: &Identity, kind: ReportKind) -> HrResult<Report> {
        match kind {
            ReportKind::EmployeesByDepartment => self
                .employees_by_department(identity)
                .await
                .map(Report::EmployeesByDepartment),
            ReportKind::SalaryCostPerDepartment => self
                .salary_cost_per_department(identity)
                .await
                .map(Report::SalaryCostPerDepartment),
            ReportKind::ActiveProjects => self
                .active_projects(identity)
                .await
                .map(Report::ActiveProjects),
        }
    }

    pub async fn employees_by_department(
        &self,
        identity: &Identity,
    ) -> HrResult<Vec<DepartmentHeadcount>> {
        let (departments, mut staff) = self.departments_with_staff(identity).await?;
        Ok(departments
            .into_iter()
            .map(|dept| {
                let employees: Vec<HeadcountMember> = staff
                    .remove(&dept.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|row| HeadcountMember {
                        id: row.id,
                        username: row.username,
                        email: row.email,
                        role: policy_role(row.role),
                        salary: money(row.salary),
                        title: row.title,
                    })
                    .collect();
                DepartmentHeadcount {
                    department: dept.name,
                    count: employees.len(),
                    employees,
                }
            })
            .collect())
    }

    pub async fn salary_cost_per_department(
        &self,
        identity: &Identity,
    ) -> HrResult<Vec<DepartmentSalaryCost>> {
        let (departments, mut staff) = self.departments_with_staff(identity).await?;
        Ok(departments
            .into_iter()
            .map(|dept| {
                let total_salary = staff.remove(&dept.id).and_then(|rows| {
                    rows.iter()
                        .map(|row| row.salary)
                        .reduce(|total, salary| total + salary)
                        .map(money)
                });
                DepartmentSalaryCost {
                    id: dept.id,
                    name: dept.name,
                    total_salary,
                }
            })
            .collect())
    }

    pub async fn active_projects(&self, identity: &Identity) -> HrResult<Vec<ActiveProject>> {
        let scope = self.policy.visibility(identity, ResourceKind::Project);
        let rows = project::Entity::find()
            .filter(project::Column::IsActive.eq(true))
            .filter(project::Entity::scope_condition(scope))
            .order_by(project::Column::Name, Order::Asc)
            .all(self.db)
            .await?;
        let names = department_names(self.db).await?;
        Ok(rows
            .into_iter()
            .map(|row| ActiveProject {
                id: row.id,
                department_name: row
                    .department_id
                    .and_then(|id| names.get(&id).cloned()),
                name: row.name,
                start_date: row.start_date,
                end_date: row.end_date,
            })
            .collect())
    }

    /// Visible departments ordered by name, plus their employees keyed by department id.
    async fn departments_with_staff(
        &self,
        identity: &Identity,
    ) -> HrResult<(
        Vec<department::Model>,
        HashMap<Uuid, Vec<employee::Model>>,
    )> {
        let scope = self.policy.visibility(identity, ResourceKind::Department);
        let departments = department::Entity::find()
            .filter(department::Entity::scope_condition(scope))
            .order_by(department::Column::Name, Order::Asc)
            .all(self.db)
            .await?;
        let ids: Vec<Uuid> = departments.iter().map(|dept| dept.id).collect();
        let mut staff: HashMap<Uuid, Vec<employee::Model>> = HashMap::new();
        if ids.is_empty() {
            return Ok((departments, staff));
        }
        let rows = employee::Entity::find()
            .filter(employee::Column::DepartmentId.is_in(ids))
            .order_by(employee::Column::Username, Order::Asc)
            .all(self.db)
            .await?;
        for row in rows {
            if let Some(department_id) = row.department_id {
                staff.entry(department_id).or_default().push(row);
            }
        }
        Ok((departments, staff))
    }
}

pub(crate) async fn department_names(
    db: &DatabaseConnection,
) -> HrResult<HashMap<Uuid, String>> {
    let rows = department::Entity::find().all(db).await?;
    Ok(rows.into_iter().map(|row| (row.id, row.name)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_kinds_parse() {
        assert_eq!(
            ReportKind::parse(Some("active_projects")).unwrap(),
            ReportKind::ActiveProjects
        );
        let err = ReportKind::parse(Some("bogus")).unwrap_err();
        assert_eq!(err.to_string(), "Unknown or missing report 'type'.");
        assert!(ReportKind::parse(None).is_err());
    }

    #[test]
    fn empty_department_serializes_null_total() {
        let row = DepartmentSalaryCost {
            id: Uuid::nil(),
            name: "Sales".into(),
            total_salary: None,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert!(json["total_salary"].is_null());
    }
}
