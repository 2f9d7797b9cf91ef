use sea_orm_migration::prelude::*;

use crate::m20240101_000001_departments_employees::{Department, Employee};

#[derive(DeriveIden)]
enum Project {
    Table,
    Id,
    Name,
    Description,
    DepartmentId,
    StartDate,
    EndDate,
    IsActive,
}

#[derive(DeriveIden)]
enum ProjectEmployee {
    Table,
    ProjectId,
    EmployeeId,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Project::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Project::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Project::Name)
                            .string_len(200)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Project::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Project::DepartmentId).uuid())
                    .col(ColumnDef::new(Project::StartDate).date())
                    .col(ColumnDef::new(Project::EndDate).date())
                    .col(
                        ColumnDef::new(Project::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_department")
                            .from(Project::Table, Project::DepartmentId)
                            .to(Department::Table, Department::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_project_department")
                    .table(Project::Table)
                    .col(Project::DepartmentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProjectEmployee::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ProjectEmployee::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(ProjectEmployee::EmployeeId).uuid().not_null())
                    .primary_key(
                        Index::create()
                            .col(ProjectEmployee::ProjectId)
                            .col(ProjectEmployee::EmployeeId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_employee_project")
                            .from(ProjectEmployee::Table, ProjectEmployee::ProjectId)
                            .to(Project::Table, Project::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_employee_employee")
                            .from(ProjectEmployee::Table, ProjectEmployee::EmployeeId)
                            .to(Employee::Table, Employee::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_project_employee_employee")
                    .table(ProjectEmployee::Table)
                    .col(ProjectEmployee::EmployeeId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(ProjectEmployee::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Project::Table).if_exists().to_owned())
            .await
    }
}
