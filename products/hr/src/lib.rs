//! HR vertical slice: departments, employees, projects, reports and exports.
//!
//! Every entry point takes the calling [`Identity`] explicitly; reads are
//! narrowed by the policy's visibility scope and writes are checked before
//! anything is persisted.

pub mod department;
pub mod employee;
pub mod error;
pub mod export;
pub mod money;
pub mod params;
pub mod project;
pub mod report;
mod scope;
pub mod seed;
pub mod session;

use platform_authn::TokenConfig;
use platform_authz::{Identity, PolicyEngine};
use sea_orm::DatabaseConnection;

pub use department::{DepartmentChanges, DepartmentService, DepartmentView, NewDepartment};
pub use employee::{EmployeeChanges, EmployeeRecord, EmployeeService, EmployeeView, NewEmployee};
pub use error::{HrError, HrResult};
pub use export::{CSV_CONTENT_TYPE, ExportFile, ExportKind, ExportService};
pub use params::ListParams;
pub use project::{NewProject, ProjectChanges, ProjectService, ProjectView};
pub use report::{Report, ReportKind, ReportService};
pub use seed::{SeededHrRecords, seed_hr_demo};
pub use session::{AccessToken, SessionService, load_identity};

/// Entry point bundling the connection with the authorization policy.
#[derive(Clone)]
pub struct HrModule {
    db: DatabaseConnection,
    policy: PolicyEngine,
}

impl HrModule {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            policy: PolicyEngine,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn departments(&self) -> DepartmentService<'_> {
        DepartmentService::new(&self.db, self.policy)
    }

    pub fn employees(&self) -> EmployeeService<'_> {
        EmployeeService::new(&self.db, self.policy)
    }

    pub fn projects(&self) -> ProjectService<'_> {
        ProjectService::new(&self.db, self.policy)
    }

    pub fn reports(&self) -> ReportService<'_> {
        ReportService::new(&self.db, self.policy)
    }

    pub fn exports(&self) -> ExportService<'_> {
        ExportService::new(&self.db, self.policy)
    }

    pub fn sessions<'a>(&'a self, tokens: &'a TokenConfig) -> SessionService<'a> {
        SessionService::new(&self.db, tokens)
    }

    pub async fn identity(&self, employee_id: uuid::Uuid) -> HrResult<Identity> {
        load_identity(&self.db, employee_id).await
    }
}
