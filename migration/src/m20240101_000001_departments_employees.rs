use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
pub(crate) enum Department {
    Table,
    Id,
    Name,
    Budget,
    CreatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum Employee {
    Table,
    Id,
    Username,
    PasswordHash,
    Email,
    FirstName,
    LastName,
    Role,
    DepartmentId,
    Salary,
    Title,
    IsActive,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Department::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Department::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Department::Name)
                            .string_len(120)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Department::Budget)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Department::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Employee::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Employee::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Employee::Username)
                            .string_len(150)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Employee::PasswordHash)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Employee::Email)
                            .string_len(254)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Employee::FirstName)
                            .string_len(150)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Employee::LastName)
                            .string_len(150)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Employee::Role)
                            .string_len(20)
                            .not_null()
                            .default("EMPLOYEE"),
                    )
                    .col(ColumnDef::new(Employee::DepartmentId).uuid())
                    .col(
                        ColumnDef::new(Employee::Salary)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Employee::Title)
                            .string_len(120)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Employee::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_employee_department")
                            .from(Employee::Table, Employee::DepartmentId)
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
                    .name("idx_employee_department")
                    .table(Employee::Table)
                    .col(Employee::DepartmentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Employee::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Department::Table).if_exists().to_owned())
            .await
    }
}
