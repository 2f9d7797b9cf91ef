use std::collections::HashMap;

use chrono::NaiveDate;
use entity::{employee, project, project_employee};
use platform_authz::{Action, Identity, PolicyEngine, ResourceKind};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    employee::ensure_department,
    error::{HrError, HrResult, unique_violation},
    params::{ListParams, apply_ordering, nullable, paginate, search_condition, validate_required},
    scope::ScopeFilter,
};

const NAME_MAX: usize = 200;
const DUPLICATE_NAME: &str = "name: project with this name already exists.";

const ORDERING: &[(&str, project::Column)] = &[
    ("name", project::Column::Name),
    ("start_date", project::Column::StartDate),
    ("end_date", project::Column::EndDate),
    ("is_active", project::Column::IsActive),
];

const SEARCH: &[project::Column] = &[project::Column::Name, project::Column::Description];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProjectView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub department: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    /// Member ids, sorted.
    pub employees: Vec<Uuid>,
}

impl ProjectView {
    fn new(model: project::Model, mut employees: Vec<Uuid>) -> Self {
        employees.sort_unstable();
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            department: model.department_id,
            start_date: model.start_date,
            end_date: model.end_date,
            is_active: model.is_active,
            employees,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub department: Option<Uuid>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub employees: Vec<Uuid>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub department: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub end_date: Option<Option<NaiveDate>>,
    pub is_active: Option<bool>,
    /// Replaces the whole member set when present.
    pub employees: Option<Vec<Uuid>>,
}

pub struct ProjectService<'a> {
    db: &'a DatabaseConnection,
    policy: PolicyEngine,
}

impl<'a> ProjectService<'a> {
    pub fn new(db: &'a DatabaseConnection, policy: PolicyEngine) -> Self {
        Self { db, policy }
    }

    #[instrument(
        name = "hr.projects.list",
        skip_all,
        fields(role = identity.role.as_str(), has_search = params.search.is_some())
    )]
    pub async fn list(
        &self,
        identity: &Identity,
        params: &ListParams,
    ) -> HrResult<Vec<ProjectView>> {
        let scope = self.policy.visibility(identity, ResourceKind::Project);
        let mut query = project::Entity::find().filter(project::Entity::scope_condition(scope));
        if let Some(condition) = search_condition(params, SEARCH) {
            query = query.filter(condition);
        }
        let query = apply_ordering(
            query,
            params,
            ORDERING,
            project::Column::Name,
            project::Column::Id,
        )?;
        let rows = paginate(query, params).all(self.db).await?;
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut members = load_members(self.db, &ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let employees = members.remove(&row.id).unwrap_or_default();
                ProjectView::new(row, employees)
            })
            .collect())
    }

    pub async fn retrieve(&self, identity: &Identity, id: Uuid) -> HrResult<ProjectView> {
        let row = self.find_visible(identity, id).await?;
        let employees = load_members(self.db, &[row.id])
            .await?
            .remove(&row.id)
            .unwrap_or_default();
        Ok(ProjectView::new(row, employees))
    }

    pub async fn create(&self, identity: &Identity, input: NewProject) -> HrResult<ProjectView> {
        self.policy
            .check(identity, ResourceKind::Project, Action::Create)?;
        let name = validate_required("name", &input.name, NAME_MAX)?;
        let department_id = self.policy.project_department(identity, input.department);
        if let Some(department_id) = department_id {
            ensure_department(self.db, department_id).await?;
        }
        validate_dates(input.start_date, input.end_date)?;
        let employees = ensure_employees(self.db, input.employees).await?;

        let txn = self.db.begin().await?;
        let record = project::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            description: Set(input.description.unwrap_or_default()),
            department_id: Set(department_id),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            is_active: Set(input.is_active.unwrap_or(true)),
        }
        .insert(&txn)
        .await
        .map_err(|err| unique_violation(err, DUPLICATE_NAME))?;
        replace_members(&txn, record.id, &employees).await?;
        txn.commit().await?;

        info!(project_id = %record.id, name = %record.name, "project created");
        Ok(ProjectView::new(record, employees))
    }

    /// Partial update; a present `employees` list replaces the member set.
    pub async fn update(
        &self,
        identity: &Identity,
        id: Uuid,
        changes: ProjectChanges,
    ) -> HrResult<ProjectView> {
        self.policy
            .check(identity, ResourceKind::Project, Action::Update)?;
        let existing = self.find_visible(identity, id).await?;
        self.policy.check_project_update(identity)?;

        let start_date = changes.start_date.unwrap_or(existing.start_date);
        let end_date = changes.end_date.unwrap_or(existing.end_date);
        validate_dates(start_date, end_date)?;

        let mut active: project::ActiveModel = existing.into();
        if let Some(name) = changes.name {
            active.name = Set(validate_required("name", &name, NAME_MAX)?);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(requested) = changes.department {
            let department_id = self.policy.project_department(identity, requested);
            if let Some(department_id) = department_id {
                ensure_department(self.db, department_id).await?;
            }
            active.department_id = Set(department_id);
        }
        active.start_date = Set(start_date);
        active.end_date = Set(end_date);
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        let employees = match changes.employees {
            Some(employees) => Some(ensure_employees(self.db, employees).await?),
            None => None,
        };

        let txn = self.db.begin().await?;
        let record = active
            .update(&txn)
            .await
            .map_err(|err| unique_violation(err, DUPLICATE_NAME))?;
        if let Some(employees) = &employees {
            replace_members(&txn, record.id, employees).await?;
        }
        let members = load_members(&txn, &[record.id])
            .await?
            .remove(&record.id)
            .unwrap_or_default();
        txn.commit().await?;

        Ok(ProjectView::new(record, members))
    }

    pub async fn delete(&self, identity: &Identity, id: Uuid) -> HrResult<()> {
        self.policy
            .check(identity, ResourceKind::Project, Action::Delete)?;
        let existing = self.find_visible(identity, id).await?;

        let txn = self.db.begin().await?;
        project_employee::Entity::delete_many()
            .filter(project_employee::Column::ProjectId.eq(existing.id))
            .exec(&txn)
            .await?;
        project::Entity::delete_by_id(existing.id).exec(&txn).await?;
        txn.commit().await?;

        info!(project_id = %existing.id, "project deleted");
        Ok(())
    }

    async fn find_visible(&self, identity: &Identity, id: Uuid) -> HrResult<project::Model> {
        let scope = self.policy.visibility(identity, ResourceKind::Project);
        project::Entity::find_by_id(id)
            .filter(project::Entity::scope_condition(scope))
            .one(self.db)
            .await?
            .ok_or(HrError::NotFound)
    }
}

/// Member ids keyed by project id.
pub(crate) async fn load_members<C>(
    conn: &C,
    project_ids: &[Uuid],
) -> HrResult<HashMap<Uuid, Vec<Uuid>>>
where
    C: ConnectionTrait,
{
    if project_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = project_employee::Entity::find()
        .filter(project_employee::Column::ProjectId.is_in(project_ids.to_vec()))
        .all(conn)
        .await?;
    let mut map: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for row in rows {
        map.entry(row.project_id).or_default().push(row.employee_id);
    }
    Ok(map)
}

async fn replace_members<C>(conn: &C, project_id: Uuid, employees: &[Uuid]) -> HrResult<()>
where
    C: ConnectionTrait,
{
    project_employee::Entity::delete_many()
        .filter(project_employee::Column::ProjectId.eq(project_id))
        .exec(conn)
        .await?;
    if employees.is_empty() {
        return Ok(());
    }
    let rows = employees
        .iter()
        .map(|employee_id| project_employee::ActiveModel {
            project_id: Set(project_id),
            employee_id: Set(*employee_id),
        });
    project_employee::Entity::insert_many(rows)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Deduplicates the requested members and rejects unknown ids.
async fn ensure_employees<C>(conn: &C, mut ids: Vec<Uuid>) -> HrResult<Vec<Uuid>>
where
    C: ConnectionTrait,
{
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(ids);
    }
    let found = employee::Entity::find()
        .filter(employee::Column::Id.is_in(ids.clone()))
        .all(conn)
        .await?;
    if let Some(missing) = ids.iter().find(|id| !found.iter().any(|row| row.id == **id)) {
        return Err(HrError::validation(format!(
            "employees: Invalid pk \"{missing}\" - object does not exist."
        )));
    }
    Ok(ids)
}

fn validate_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> HrResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(HrError::validation(
                "end_date: End date cannot be before start date.",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_before_start_is_rejected() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1);
        let end = NaiveDate::from_ymd_opt(2024, 4, 1);
        assert!(validate_dates(start, end).is_err());
        assert!(validate_dates(end, start).is_ok());
        assert!(validate_dates(None, end).is_ok());
    }

    #[test]
    fn member_ids_are_sorted_in_views() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let model = project::Model {
            id: Uuid::new_v4(),
            name: "ERP Core".into(),
            description: String::new(),
            department_id: None,
            start_date: None,
            end_date: None,
            is_active: true,
        };
        let view = ProjectView::new(model, vec![a.max(b), a.min(b)]);
        assert_eq!(view.employees, vec![a.min(b), a.max(b)]);
    }

    #[test]
    fn null_dates_clear_the_field() {
        let changes: ProjectChanges =
            serde_json::from_str(r#"{"end_date": null, "employees": []}"#).unwrap();
        assert_eq!(changes.end_date, Some(None));
        assert_eq!(changes.start_date, None);
        assert_eq!(changes.employees, Some(vec![]));
    }
}
