use chrono::{DateTime, Utc};
use entity::{department, employee, project};
use platform_authz::{Action, Identity, PolicyEngine, ResourceKind};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    error::{HrError, HrResult, unique_violation},
    money::{money, validate_money},
    params::{ListParams, apply_ordering, paginate, search_condition, validate_required},
    scope::ScopeFilter,
};

const NAME_MAX: usize = 120;
const BUDGET_DIGITS: u32 = 12;
const DUPLICATE_NAME: &str = "name: department with this name already exists.";

const ORDERING: &[(&str, department::Column)] = &[
    ("name", department::Column::Name),
    ("budget", department::Column::Budget),
    ("created_at", department::Column::CreatedAt),
];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DepartmentView {
    pub id: Uuid,
    pub name: String,
    pub budget: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<department::Model> for DepartmentView {
    fn from(model: department::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            budget: money(model.budget),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewDepartment {
    pub name: String,
    #[serde(default)]
    pub budget: Option<Decimal>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DepartmentChanges {
    pub name: Option<String>,
    pub budget: Option<Decimal>,
}

pub struct DepartmentService<'a> {
    db: &'a DatabaseConnection,
    policy: PolicyEngine,
}

impl<'a> DepartmentService<'a> {
    pub fn new(db: &'a DatabaseConnection, policy: PolicyEngine) -> Self {
        Self { db, policy }
    }

    #[instrument(
        name = "hr.departments.list",
        skip_all,
        fields(role = identity.role.as_str(), has_search = params.search.is_some())
    )]
    pub async fn list(
        &self,
        identity: &Identity,
        params: &ListParams,
    ) -> HrResult<Vec<DepartmentView>> {
        let scope = self.policy.visibility(identity, ResourceKind::Department);
        let mut query =
            department::Entity::find().filter(department::Entity::scope_condition(scope));
        if let Some(condition) = search_condition(params, &[department::Column::Name]) {
            query = query.filter(condition);
        }
        let query = apply_ordering(
            query,
            params,
            ORDERING,
            department::Column::Name,
            department::Column::Id,
        )?;
        let rows = paginate(query, params).all(self.db).await?;
        Ok(rows.into_iter().map(DepartmentView::from).collect())
    }

    pub async fn retrieve(&self, identity: &Identity, id: Uuid) -> HrResult<DepartmentView> {
        self.find_visible(identity, id).await.map(DepartmentView::from)
    }

    pub async fn create(
        &self,
        identity: &Identity,
        input: NewDepartment,
    ) -> HrResult<DepartmentView> {
        self.policy
            .check(identity, ResourceKind::Department, Action::Create)?;
        let name = validate_required("name", &input.name, NAME_MAX)?;
        let budget = match input.budget {
            Some(budget) => validate_money("budget", budget, BUDGET_DIGITS)?,
            None => money(Decimal::ZERO),
        };
        let record = department::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            budget: Set(budget),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.db)
        .await
        .map_err(|err| unique_violation(err, DUPLICATE_NAME))?;
        info!(department_id = %record.id, name = %record.name, "department created");
        Ok(record.into())
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: Uuid,
        changes: DepartmentChanges,
    ) -> HrResult<DepartmentView> {
        self.policy
            .check(identity, ResourceKind::Department, Action::Update)?;
        let existing = self.find_visible(identity, id).await?;
        let mut active: department::ActiveModel = existing.into();
        if let Some(name) = changes.name {
            active.name = Set(validate_required("name", &name, NAME_MAX)?);
        }
        if let Some(budget) = changes.budget {
            active.budget = Set(validate_money("budget", budget, BUDGET_DIGITS)?);
        }
        let record = active
            .update(self.db)
            .await
            .map_err(|err| unique_violation(err, DUPLICATE_NAME))?;
        Ok(record.into())
    }

    /// Deletes a department, detaching its employees and projects first.
    pub async fn delete(&self, identity: &Identity, id: Uuid) -> HrResult<()> {
        self.policy
            .check(identity, ResourceKind::Department, Action::Delete)?;
        let existing = self.find_visible(identity, id).await?;

        let txn = self.db.begin().await?;
        employee::Entity::update_many()
            .col_expr(
                employee::Column::DepartmentId,
                Expr::value(Option::<Uuid>::None),
            )
            .filter(employee::Column::DepartmentId.eq(existing.id))
            .exec(&txn)
            .await?;
        project::Entity::update_many()
            .col_expr(
                project::Column::DepartmentId,
                Expr::value(Option::<Uuid>::None),
            )
            .filter(project::Column::DepartmentId.eq(existing.id))
            .exec(&txn)
            .await?;
        department::Entity::delete_by_id(existing.id)
            .exec(&txn)
            .await?;
        txn.commit().await?;

        info!(department_id = %existing.id, "department deleted");
        Ok(())
    }

    async fn find_visible(&self, identity: &Identity, id: Uuid) -> HrResult<department::Model> {
        let scope = self.policy.visibility(identity, ResourceKind::Department);
        department::Entity::find_by_id(id)
            .filter(department::Entity::scope_condition(scope))
            .one(self.db)
            .await?
            .ok_or(HrError::NotFound)
    }
}
