use std::collections::HashMap;

use entity::{department, employee, project_employee};
use platform_authn::{hash_password, unusable_password};
use platform_authz::{
    Action, EmployeeChange, EmployeeTarget, Identity, PolicyEngine, ResourceKind, Role,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    department::DepartmentView,
    error::{HrError, HrResult, unique_violation},
    money::{money, validate_money},
    params::{
        ListParams, apply_ordering, nullable, paginate, search_condition, validate_length,
        validate_required,
    },
    scope::ScopeFilter,
};

const USERNAME_MAX: usize = 150;
const NAME_MAX: usize = 150;
const EMAIL_MAX: usize = 254;
const TITLE_MAX: usize = 120;
const SALARY_DIGITS: u32 = 10;
const DUPLICATE_USERNAME: &str = "username: A user with that username already exists.";

const ORDERING: &[(&str, employee::Column)] = &[
    ("username", employee::Column::Username),
    ("salary", employee::Column::Salary),
    ("role", employee::Column::Role),
];

const SEARCH: &[employee::Column] = &[
    employee::Column::Username,
    employee::Column::Email,
    employee::Column::FirstName,
    employee::Column::LastName,
    employee::Column::Title,
    employee::Column::Role,
];

pub(crate) fn policy_role(role: employee::Role) -> Role {
    match role {
        employee::Role::Admin => Role::Admin,
        employee::Role::Manager => Role::Manager,
        employee::Role::Employee => Role::Employee,
    }
}

pub(crate) fn stored_role(role: Role) -> employee::Role {
    match role {
        Role::Admin => employee::Role::Admin,
        Role::Manager => employee::Role::Manager,
        Role::Employee => employee::Role::Employee,
    }
}

/// The identity an employee record acts as.
pub fn identity_of(model: &employee::Model) -> Identity {
    Identity::new(model.id, policy_role(model.role), model.department_id)
}

/// Read projection: the department is expanded.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EmployeeView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub department: Option<DepartmentView>,
    pub salary: Decimal,
    pub title: String,
    pub is_active: bool,
}

impl EmployeeView {
    fn new(model: employee::Model, department: Option<DepartmentView>) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            role: policy_role(model.role),
            department,
            salary: money(model.salary),
            title: model.title,
            is_active: model.is_active,
        }
    }
}

/// Write projection: echoes the department reference as an id.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EmployeeRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub department: Option<Uuid>,
    pub salary: Decimal,
    pub title: String,
    pub is_active: bool,
}

impl From<employee::Model> for EmployeeRecord {
    fn from(model: employee::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            role: policy_role(model.role),
            department: model.department_id,
            salary: money(model.salary),
            title: model.title,
            is_active: model.is_active,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewEmployee {
    pub username: String,
    /// Write-only. Absent or empty leaves the account without a usable password.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub department: Option<Uuid>,
    #[serde(default)]
    pub salary: Option<Decimal>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct EmployeeChanges {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "nullable")]
    pub department: Option<Option<Uuid>>,
    pub salary: Option<Decimal>,
    pub title: Option<String>,
    pub is_active: Option<bool>,
}

impl EmployeeChanges {
    /// Names of the fields present in the payload.
    pub fn touched(&self) -> Vec<&'static str> {
        [
            ("username", self.username.is_some()),
            ("password", self.password.is_some()),
            ("email", self.email.is_some()),
            ("first_name", self.first_name.is_some()),
            ("last_name", self.last_name.is_some()),
            ("role", self.role.is_some()),
            ("department", self.department.is_some()),
            ("salary", self.salary.is_some()),
            ("title", self.title.is_some()),
            ("is_active", self.is_active.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

pub struct EmployeeService<'a> {
    db: &'a DatabaseConnection,
    policy: PolicyEngine,
}

impl<'a> EmployeeService<'a> {
    pub fn new(db: &'a DatabaseConnection, policy: PolicyEngine) -> Self {
        Self { db, policy }
    }

    #[instrument(
        name = "hr.employees.list",
        skip_all,
        fields(role = identity.role.as_str(), has_search = params.search.is_some())
    )]
    pub async fn list(
        &self,
        identity: &Identity,
        params: &ListParams,
    ) -> HrResult<Vec<EmployeeView>> {
        let scope = self.policy.visibility(identity, ResourceKind::Employee);
        let mut query = employee::Entity::find().filter(employee::Entity::scope_condition(scope));
        if let Some(condition) = search_condition(params, SEARCH) {
            query = query.filter(condition);
        }
        let query = apply_ordering(
            query,
            params,
            ORDERING,
            employee::Column::Username,
            employee::Column::Id,
        )?;
        let rows = paginate(query, params).all(self.db).await?;
        let departments = load_departments(self.db, &rows).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let department = row
                    .department_id
                    .and_then(|id| departments.get(&id).cloned());
                EmployeeView::new(row, department)
            })
            .collect())
    }

    pub async fn retrieve(&self, identity: &Identity, id: Uuid) -> HrResult<EmployeeView> {
        let scope = self.policy.visibility(identity, ResourceKind::Employee);
        let row = employee::Entity::find_by_id(id)
            .filter(employee::Entity::scope_condition(scope))
            .one(self.db)
            .await?
            .ok_or(HrError::NotFound)?;
        let department = match row.department_id {
            Some(department_id) => department::Entity::find_by_id(department_id)
                .one(self.db)
                .await?
                .map(DepartmentView::from),
            None => None,
        };
        Ok(EmployeeView::new(row, department))
    }

    pub async fn create(
        &self,
        identity: &Identity,
        input: NewEmployee,
    ) -> HrResult<EmployeeRecord> {
        self.policy
            .check(identity, ResourceKind::Employee, Action::Create)?;
        let username = validate_username(&input.username)?;
        if let Some(department_id) = input.department {
            ensure_department(self.db, department_id).await?;
        }
        let password_hash = match input.password.as_deref() {
            Some(password) if !password.is_empty() => hash_password(password)?,
            _ => unusable_password(),
        };
        let salary = match input.salary {
            Some(salary) => validate_money("salary", salary, SALARY_DIGITS)?,
            None => money(Decimal::ZERO),
        };
        let record = employee::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username),
            password_hash: Set(password_hash),
            email: Set(validate_email(input.email.as_deref().unwrap_or_default())?),
            first_name: Set(validate_optional_text(
                "first_name",
                input.first_name,
                NAME_MAX,
            )?),
            last_name: Set(validate_optional_text(
                "last_name",
                input.last_name,
                NAME_MAX,
            )?),
            role: Set(stored_role(input.role.unwrap_or(Role::Employee))),
            department_id: Set(input.department),
            salary: Set(salary),
            title: Set(validate_optional_text("title", input.title, TITLE_MAX)?),
            is_active: Set(input.is_active.unwrap_or(true)),
        }
        .insert(self.db)
        .await
        .map_err(|err| unique_violation(err, DUPLICATE_USERNAME))?;
        info!(employee_id = %record.id, username = %record.username, "employee created");
        Ok(record.into())
    }

    /// Partial update; both PUT and PATCH land here.
    ///
    /// The target is looked up without the read scope so that out-of-reach
    /// records answer with an explicit denial rather than a missing record.
    pub async fn update(
        &self,
        identity: &Identity,
        id: Uuid,
        changes: EmployeeChanges,
    ) -> HrResult<EmployeeRecord> {
        self.policy
            .check(identity, ResourceKind::Employee, Action::Update)?;
        let existing = employee::Entity::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or(HrError::NotFound)?;
        let touched = changes.touched();
        let target = EmployeeTarget {
            id: existing.id,
            department_id: existing.department_id,
        };
        let change = EmployeeChange {
            role: changes.role,
            fields: &touched,
        };
        self.policy
            .check_employee_update(identity, &target, &change)?;

        let mut active: employee::ActiveModel = existing.into();
        if let Some(username) = changes.username {
            active.username = Set(validate_username(&username)?);
        }
        if let Some(password) = changes.password.filter(|p| !p.is_empty()) {
            active.password_hash = Set(hash_password(&password)?);
        }
        if let Some(email) = changes.email {
            active.email = Set(validate_email(&email)?);
        }
        if let Some(first_name) = changes.first_name {
            active.first_name = Set(validate_optional_text(
                "first_name",
                Some(first_name),
                NAME_MAX,
            )?);
        }
        if let Some(last_name) = changes.last_name {
            active.last_name = Set(validate_optional_text(
                "last_name",
                Some(last_name),
                NAME_MAX,
            )?);
        }
        if let Some(role) = changes.role {
            active.role = Set(stored_role(role));
        }
        if let Some(department) = changes.department {
            if let Some(department_id) = department {
                ensure_department(self.db, department_id).await?;
            }
            active.department_id = Set(department);
        }
        if let Some(salary) = changes.salary {
            active.salary = Set(validate_money("salary", salary, SALARY_DIGITS)?);
        }
        if let Some(title) = changes.title {
            active.title = Set(validate_optional_text("title", Some(title), TITLE_MAX)?);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        let record = active
            .update(self.db)
            .await
            .map_err(|err| unique_violation(err, DUPLICATE_USERNAME))?;
        Ok(record.into())
    }

    pub async fn delete(&self, identity: &Identity, id: Uuid) -> HrResult<()> {
        self.policy
            .check(identity, ResourceKind::Employee, Action::Delete)?;
        let scope = self.policy.visibility(identity, ResourceKind::Employee);
        let existing = employee::Entity::find_by_id(id)
            .filter(employee::Entity::scope_condition(scope))
            .one(self.db)
            .await?
            .ok_or(HrError::NotFound)?;

        let txn = self.db.begin().await?;
        project_employee::Entity::delete_many()
            .filter(project_employee::Column::EmployeeId.eq(existing.id))
            .exec(&txn)
            .await?;
        employee::Entity::delete_by_id(existing.id)
            .exec(&txn)
            .await?;
        txn.commit().await?;

        info!(employee_id = %existing.id, "employee deleted");
        Ok(())
    }
}

pub(crate) async fn load_departments<C>(
    conn: &C,
    employees: &[employee::Model],
) -> HrResult<HashMap<Uuid, DepartmentView>>
where
    C: ConnectionTrait,
{
    let mut ids: Vec<Uuid> = employees.iter().filter_map(|e| e.department_id).collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = department::Entity::find()
        .filter(department::Column::Id.is_in(ids))
        .all(conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| (row.id, DepartmentView::from(row)))
        .collect())
}

pub(crate) async fn ensure_department<C>(conn: &C, id: Uuid) -> HrResult<()>
where
    C: ConnectionTrait,
{
    department::Entity::find_by_id(id)
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| {
            HrError::validation(format!(
                "department: Invalid pk \"{id}\" - object does not exist."
            ))
        })
}

fn validate_username(value: &str) -> HrResult<String> {
    let username = validate_required("username", value, USERNAME_MAX)?;
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !username.chars().all(allowed) {
        return Err(HrError::validation(
            "username: Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    Ok(username)
}

fn validate_email(value: &str) -> HrResult<String> {
    let email = value.trim();
    if email.is_empty() {
        return Ok(String::new());
    }
    validate_length("email", email, EMAIL_MAX)?;
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        });
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(HrError::validation("email: Enter a valid email address."));
    }
    Ok(email.to_string())
}

fn validate_optional_text(field: &str, value: Option<String>, max: usize) -> HrResult<String> {
    let value = value.unwrap_or_default();
    let trimmed = value.trim();
    validate_length(field, trimmed, max)?;
    Ok(trimmed.to_string())
}
