#![allow(dead_code)]

use migration::{Migrator, MigratorTrait};
use platform_authz::{Identity, Role};
use products_hr::{HrModule, SeededHrRecords, employee::identity_of, seed_hr_demo};
use sea_orm::Database;
use uuid::Uuid;

pub struct HrTestContext {
    pub hr: HrModule,
    pub seeded: SeededHrRecords,
}

impl HrTestContext {
    pub async fn new_seeded() -> Self {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let seeded = seed_hr_demo(&db).await.unwrap();
        Self {
            hr: HrModule::new(db),
            seeded,
        }
    }

    pub fn admin(&self) -> Identity {
        self.identity("admin")
    }

    pub fn manager(&self) -> Identity {
        self.identity("manager")
    }

    pub fn staff(&self) -> Identity {
        self.identity("employee")
    }

    pub fn identity(&self, username: &str) -> Identity {
        identity_of(self.seeded.employee_named(username).unwrap())
    }

    pub fn department_id(&self, name: &str) -> Uuid {
        self.seeded.department_named(name).unwrap().id
    }

    pub fn project_id(&self, name: &str) -> Uuid {
        self.seeded.project_named(name).unwrap().id
    }

    /// A manager heading `department`, created through the admin surface.
    pub async fn manager_of(&self, username: &str, department: &str) -> Identity {
        let record = self
            .hr
            .employees()
            .create(
                &self.admin(),
                products_hr::NewEmployee {
                    username: username.into(),
                    password: Some(format!("{username}-pass")),
                    role: Some(Role::Manager),
                    department: Some(self.department_id(department)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        self.hr.identity(record.id).await.unwrap()
    }
}
