use entity::{department, employee, project, project_employee};
use platform_authz::Scope;
use sea_orm::{
    ColumnTrait, Condition,
    sea_query::{Expr, Query},
};

/// Translates a read scope into a row filter for one entity.
pub(crate) trait ScopeFilter {
    fn scope_condition(scope: Scope) -> Condition;
}

fn nothing() -> Condition {
    Condition::all().add(Expr::val(1).eq(0))
}

impl ScopeFilter for department::Entity {
    fn scope_condition(scope: Scope) -> Condition {
        match scope {
            Scope::All => Condition::all(),
            Scope::Department(id) | Scope::Only(id) => {
                Condition::all().add(department::Column::Id.eq(id))
            }
            Scope::Nothing | Scope::MemberOf(_) => nothing(),
        }
    }
}

impl ScopeFilter for employee::Entity {
    fn scope_condition(scope: Scope) -> Condition {
        match scope {
            Scope::All => Condition::all(),
            Scope::Department(id) => Condition::all().add(employee::Column::DepartmentId.eq(id)),
            Scope::Only(id) => Condition::all().add(employee::Column::Id.eq(id)),
            Scope::Nothing | Scope::MemberOf(_) => nothing(),
        }
    }
}

impl ScopeFilter for project::Entity {
    fn scope_condition(scope: Scope) -> Condition {
        match scope {
            Scope::All => Condition::all(),
            Scope::Department(id) => Condition::all().add(project::Column::DepartmentId.eq(id)),
            Scope::Only(id) => Condition::all().add(project::Column::Id.eq(id)),
            Scope::MemberOf(employee_id) => {
                let memberships = Query::select()
                    .column(project_employee::Column::ProjectId)
                    .from(project_employee::Entity)
                    .and_where(project_employee::Column::EmployeeId.eq(employee_id))
                    .to_owned();
                Condition::all().add(project::Column::Id.in_subquery(memberships))
            }
            Scope::Nothing => nothing(),
        }
    }
}
