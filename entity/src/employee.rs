use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "employee")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    /// argon2 PHC string, or a `!`-prefixed marker for a locked account.
    pub password_hash: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[sea_orm(indexed)]
    pub department_id: Option<Uuid>,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub salary: Decimal,
    pub title: String,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id",
        on_delete = "SetNull"
    )]
    Department,
    #[sea_orm(has_many = "super::project_employee::Entity")]
    ProjectEmployee,
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        super::project_employee::Relation::Project.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::project_employee::Relation::Employee.def().rev())
    }
}

#[derive(
    Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[sea_orm(string_value = "ADMIN")]
    Admin,
    #[sea_orm(string_value = "MANAGER")]
    Manager,
    #[sea_orm(string_value = "EMPLOYEE")]
    Employee,
}

impl ActiveModelBehavior for ActiveModel {}
