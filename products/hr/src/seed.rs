use std::str::FromStr;

use chrono::Utc;
use entity::{department, employee, project, project_employee};
use platform_authn::hash_password;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use crate::error::{HrError, HrResult};

/// Records guaranteed to exist after [`seed_hr_demo`].
#[derive(Clone, Debug)]
pub struct SeededHrRecords {
    pub departments: Vec<department::Model>,
    pub employees: Vec<employee::Model>,
    pub projects: Vec<project::Model>,
}

impl SeededHrRecords {
    pub fn department_named(&self, name: &str) -> Option<&department::Model> {
        self.departments.iter().find(|d| d.name == name)
    }

    pub fn employee_named(&self, username: &str) -> Option<&employee::Model> {
        self.employees.iter().find(|e| e.username == username)
    }

    pub fn project_named(&self, name: &str) -> Option<&project::Model> {
        self.projects.iter().find(|p| p.name == name)
    }
}

struct SeedUser<'a> {
    username: &'a str,
    password: &'a str,
    email: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    role: employee::Role,
    department_id: Option<Uuid>,
    salary: &'a str,
}

/// Demo departments, users and projects. Safe to run repeatedly.
pub async fn seed_hr_demo(db: &DatabaseConnection) -> HrResult<SeededHrRecords> {
    let engineering = ensure_department(db, "Engineering", "1000000.00").await?;
    let hr = ensure_department(db, "HR", "200000.00").await?;
    let sales = ensure_department(db, "Sales", "500000.00").await?;

    let admin = ensure_employee(
        db,
        SeedUser {
            username: "admin",
            password: "admin123",
            email: "admin@example.com",
            first_name: "",
            last_name: "",
            role: employee::Role::Admin,
            department_id: None,
            salary: "0.00",
        },
    )
    .await?;
    let manager = ensure_employee(
        db,
        SeedUser {
            username: "manager",
            password: "manager123",
            email: "manager@example.com",
            first_name: "Manny",
            last_name: "Ger",
            role: employee::Role::Manager,
            department_id: Some(engineering.id),
            salary: "1500000.00",
        },
    )
    .await?;
    let staff = ensure_employee(
        db,
        SeedUser {
            username: "employee",
            password: "employee123",
            email: "employee@example.com",
            first_name: "Emp",
            last_name: "Loyee",
            role: employee::Role::Employee,
            department_id: Some(engineering.id),
            salary: "800000.00",
        },
    )
    .await?;

    let erp = ensure_project(db, "ERP Core", "Core services", engineering.id, true).await?;
    let mobile = ensure_project(db, "Mobile App", "iOS/Android App", engineering.id, true).await?;
    let recruitment =
        ensure_project(db, "Recruitment Drive", "Campus hiring", hr.id, false).await?;

    set_members(db, erp.id, &[manager.id, staff.id]).await?;
    set_members(db, mobile.id, &[staff.id]).await?;
    set_members(db, recruitment.id, &[]).await?;

    info!("hr demo seed ready");
    Ok(SeededHrRecords {
        departments: vec![engineering, hr, sales],
        employees: vec![admin, manager, staff],
        projects: vec![erp, mobile, recruitment],
    })
}

async fn ensure_department(
    db: &DatabaseConnection,
    name: &str,
    budget: &str,
) -> HrResult<department::Model> {
    if let Some(existing) = department::Entity::find()
        .filter(department::Column::Name.eq(name))
        .one(db)
        .await?
    {
        return Ok(existing);
    }
    let record = department::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        budget: Set(amount(budget)?),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;
    info!(name, "seeded department");
    Ok(record)
}

async fn ensure_employee(db: &DatabaseConnection, user: SeedUser<'_>) -> HrResult<employee::Model> {
    if let Some(existing) = employee::Entity::find()
        .filter(employee::Column::Username.eq(user.username))
        .one(db)
        .await?
    {
        return Ok(existing);
    }
    let record = employee::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(user.username.to_string()),
        password_hash: Set(hash_password(user.password)?),
        email: Set(user.email.to_string()),
        first_name: Set(user.first_name.to_string()),
        last_name: Set(user.last_name.to_string()),
        role: Set(user.role),
        department_id: Set(user.department_id),
        salary: Set(amount(user.salary)?),
        title: Set(String::new()),
        is_active: Set(true),
    }
    .insert(db)
    .await?;
    info!(username = user.username, "seeded employee");
    Ok(record)
}

async fn ensure_project(
    db: &DatabaseConnection,
    name: &str,
    description: &str,
    department_id: Uuid,
    is_active: bool,
) -> HrResult<project::Model> {
    if let Some(existing) = project::Entity::find()
        .filter(project::Column::Name.eq(name))
        .one(db)
        .await?
    {
        return Ok(existing);
    }
    let record = project::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(description.to_string()),
        department_id: Set(Some(department_id)),
        start_date: Set(None),
        end_date: Set(None),
        is_active: Set(is_active),
    }
    .insert(db)
    .await?;
    info!(name, "seeded project");
    Ok(record)
}

async fn set_members(db: &DatabaseConnection, project_id: Uuid, members: &[Uuid]) -> HrResult<()> {
    let txn = db.begin().await?;
    project_employee::Entity::delete_many()
        .filter(project_employee::Column::ProjectId.eq(project_id))
        .exec(&txn)
        .await?;
    for employee_id in members {
        project_employee::ActiveModel {
            project_id: Set(project_id),
            employee_id: Set(*employee_id),
        }
        .insert(&txn)
        .await?;
    }
    txn.commit().await?;
    Ok(())
}

fn amount(raw: &str) -> HrResult<Decimal> {
    Decimal::from_str(raw).map_err(|err| HrError::validation(format!("bad seed amount {raw}: {err}")))
}
