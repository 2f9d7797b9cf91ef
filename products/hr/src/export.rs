use std::{collections::HashMap, str::FromStr};

use chrono::{NaiveDate, SecondsFormat, Utc};
use entity::{department, employee, project};
use platform_authz::{Identity, PolicyEngine, ResourceKind};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder};
use tracing::info;
use uuid::Uuid;

use crate::{
    employee::policy_role,
    error::{HrError, HrResult},
    money::money,
    project::load_members,
    report::department_names,
    scope::ScopeFilter,
};

pub const CSV_CONTENT_TYPE: &str = "text/csv";

const EMPLOYEE_HEADER: [&str; 8] = [
    "id",
    "username",
    "email",
    "role",
    "department",
    "salary",
    "title",
    "is_active",
];
const PROJECT_HEADER: [&str; 7] = [
    "id",
    "name",
    "department",
    "is_active",
    "start_date",
    "end_date",
    "employee_count",
];
const DEPARTMENT_HEADER: [&str; 6] = [
    "id",
    "name",
    "budget",
    "created_at",
    "employee_count",
    "project_count",
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExportKind {
    Employees,
    Projects,
    Departments,
}

impl ExportKind {
    pub fn filename(self) -> &'static str {
        match self {
            ExportKind::Employees => "employees.csv",
            ExportKind::Projects => "projects.csv",
            ExportKind::Departments => "departments.csv",
        }
    }

    /// Parses the `type` query parameter.
    pub fn parse(raw: Option<&str>) -> HrResult<Self> {
        raw.ok_or_else(unknown_export)?.parse()
    }
}

impl FromStr for ExportKind {
    type Err = HrError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "employees_csv" => Ok(ExportKind::Employees),
            "projects_csv" => Ok(ExportKind::Projects),
            "departments_csv" => Ok(ExportKind::Departments),
            _ => Err(unknown_export()),
        }
    }
}

fn unknown_export() -> HrError {
    HrError::validation("Unknown export type.")
}

/// A rendered attachment.
#[derive(Clone, Debug)]
pub struct ExportFile {
    pub filename: &'static str,
    pub body: Vec<u8>,
}

impl ExportFile {
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

pub struct ExportService<'a> {
    db: &'a DatabaseConnection,
    policy: PolicyEngine,
}

impl<'a> ExportService<'a> {
    pub fn new(db: &'a DatabaseConnection, policy: PolicyEngine) -> Self {
        Self { db, policy }
    }

    pub async fn run(&self, identity: &Identity, kind: ExportKind) -> HrResult<ExportFile> {
        let rows = match kind {
            ExportKind::Employees => self.employee_rows(identity).await?,
            ExportKind::Projects => self.project_rows(identity).await?,
            ExportKind::Departments => self.department_rows(identity).await?,
        };
        info!(
            kind = kind.filename(),
            rows = rows.len() - 1,
            employee_id = %identity.employee_id,
            "export rendered"
        );
        Ok(ExportFile {
            filename: kind.filename(),
            body: render(rows)?,
        })
    }

    async fn employee_rows(&self, identity: &Identity) -> HrResult<Vec<Vec<String>>> {
        let scope = self.policy.visibility(identity, ResourceKind::Employee);
        let employees = employee::Entity::find()
            .filter(employee::Entity::scope_condition(scope))
            .order_by(employee::Column::Username, Order::Asc)
            .all(self.db)
            .await?;
        let names = department_names(self.db).await?;
        let mut rows = vec![header(&EMPLOYEE_HEADER)];
        rows.extend(employees.into_iter().map(|row| {
            vec![
                row.id.to_string(),
                row.username,
                row.email,
                policy_role(row.role).as_str().to_string(),
                department_cell(&names, row.department_id),
                money(row.salary).to_string(),
                row.title,
                row.is_active.to_string(),
            ]
        }));
        Ok(rows)
    }

    async fn project_rows(&self, identity: &Identity) -> HrResult<Vec<Vec<String>>> {
        let scope = self.policy.visibility(identity, ResourceKind::Project);
        let projects = project::Entity::find()
            .filter(project::Entity::scope_condition(scope))
            .order_by(project::Column::Name, Order::Asc)
            .all(self.db)
            .await?;
        let ids: Vec<Uuid> = projects.iter().map(|row| row.id).collect();
        let members = load_members(self.db, &ids).await?;
        let names = department_names(self.db).await?;
        let mut rows = vec![header(&PROJECT_HEADER)];
        rows.extend(projects.into_iter().map(|row| {
            let count = members.get(&row.id).map_or(0, Vec::len);
            vec![
                row.id.to_string(),
                row.name,
                department_cell(&names, row.department_id),
                row.is_active.to_string(),
                date_cell(row.start_date),
                date_cell(row.end_date),
                count.to_string(),
            ]
        }));
        Ok(rows)
    }

    async fn department_rows(&self, identity: &Identity) -> HrResult<Vec<Vec<String>>> {
        let scope = self.policy.visibility(identity, ResourceKind::Department);
        let departments = department::Entity::find()
            .filter(department::Entity::scope_condition(scope))
            .order_by(department::Column::Name, Order::Asc)
            .all(self.db)
            .await?;
        let ids: Vec<Uuid> = departments.iter().map(|row| row.id).collect();
        let staff = count_by_department(
            employee::Entity::find()
                .filter(employee::Column::DepartmentId.is_in(ids.clone()))
                .all(self.db)
                .await?
                .into_iter()
                .filter_map(|row| row.department_id),
        );
        let projects = count_by_department(
            project::Entity::find()
                .filter(project::Column::DepartmentId.is_in(ids))
                .all(self.db)
                .await?
                .into_iter()
                .filter_map(|row| row.department_id),
        );
        let mut rows = vec![header(&DEPARTMENT_HEADER)];
        rows.extend(departments.into_iter().map(|row| {
            vec![
                row.id.to_string(),
                row.name,
                money(row.budget).to_string(),
                row.created_at
                    .with_timezone(&Utc)
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
                staff.get(&row.id).copied().unwrap_or(0).to_string(),
                projects.get(&row.id).copied().unwrap_or(0).to_string(),
            ]
        }));
        Ok(rows)
    }
}

fn header(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|column| column.to_string()).collect()
}

fn department_cell(names: &HashMap<Uuid, String>, id: Option<Uuid>) -> String {
    id.and_then(|id| names.get(&id).cloned()).unwrap_or_default()
}

fn date_cell(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn count_by_department(ids: impl Iterator<Item = Uuid>) -> HashMap<Uuid, usize> {
    let mut counts = HashMap::new();
    for id in ids {
        *counts.entry(id).or_insert(0) += 1;
    }
    counts
}

fn render(rows: Vec<Vec<String>>) -> HrResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.write_record(&row)?;
    }
    writer
        .into_inner()
        .map_err(|err| HrError::Csv(csv::Error::from(err.into_error())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_kinds_parse() {
        assert_eq!(
            ExportKind::parse(Some("departments_csv")).unwrap(),
            ExportKind::Departments
        );
        assert_eq!(
            ExportKind::parse(Some("nope")).unwrap_err().to_string(),
            "Unknown export type."
        );
        assert_eq!(ExportKind::Projects.filename(), "projects.csv");
    }

    #[test]
    fn cells_render_plainly() {
        let rows = vec![
            header(&PROJECT_HEADER),
            vec![
                "1".into(),
                "Launch, phase 2".into(),
                String::new(),
                true.to_string(),
                date_cell(NaiveDate::from_ymd_opt(2024, 1, 9)),
                date_cell(None),
                "0".into(),
            ],
        ];
        let body = String::from_utf8(render(rows).unwrap()).unwrap();
        assert_eq!(
            body,
            "id,name,department,is_active,start_date,end_date,employee_count\n1,\"Launch, phase 2\",,true,2024-01-09,,0\n"
        );
    }
}
