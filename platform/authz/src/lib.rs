//! Authorization primitives for the HR modules.
//!
//! Everything in this crate is pure: decisions depend only on the
//! [`Identity`] making the request and on the attributes of the record being
//! touched. Persistence-backed services ask [`PolicyEngine`] for a [`Scope`]
//! before reading and for a verdict before writing.

mod identity;
mod scope;

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

pub use identity::{Identity, Role};
pub use scope::Scope;

const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";

/// Fields an employee may change on their own record.
pub const SELF_SERVICE_FIELDS: &[&str] = &["email", "first_name", "last_name", "password"];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceKind {
    Department,
    Employee,
    Project,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Department => "department",
            ResourceKind::Employee => "employee",
            ResourceKind::Project => "project",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum AuthzError {
    #[error("{reason}")]
    Denied {
        action: Action,
        resource: ResourceKind,
        reason: &'static str,
    },
}

impl AuthzError {
    fn denied(action: Action, resource: ResourceKind, reason: &'static str) -> Self {
        AuthzError::Denied {
            action,
            resource,
            reason,
        }
    }
}

/// The stored attributes of an employee that update rules inspect.
#[derive(Clone, Copy, Debug)]
pub struct EmployeeTarget {
    pub id: Uuid,
    pub department_id: Option<Uuid>,
}

/// What an employee update request is trying to change.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmployeeChange<'a> {
    /// Role requested by the payload, if any.
    pub role: Option<Role>,
    /// Names of every field present in the payload.
    pub fields: &'a [&'static str],
}

#[derive(Default, Debug, Clone, Copy)]
pub struct PolicyEngine;

impl PolicyEngine {
    /// Rows of `resource` that `identity` may read.
    pub fn visibility(&self, identity: &Identity, resource: ResourceKind) -> Scope {
        match (identity.role, resource) {
            (Role::Admin, _) => Scope::All,
            (Role::Manager | Role::Employee, ResourceKind::Department) => {
                Scope::department(identity.department_id)
            }
            (Role::Manager, ResourceKind::Employee | ResourceKind::Project) => {
                Scope::department(identity.department_id)
            }
            (Role::Employee, ResourceKind::Employee) => Scope::Only(identity.employee_id),
            (Role::Employee, ResourceKind::Project) => Scope::MemberOf(identity.employee_id),
        }
    }

    /// Coarse gate evaluated before any record is loaded.
    pub fn check(
        &self,
        identity: &Identity,
        resource: ResourceKind,
        action: Action,
    ) -> Result<(), AuthzError> {
        let allowed = match (resource, action) {
            (_, Action::Read) => true,
            (ResourceKind::Department, Action::Create | Action::Update | Action::Delete) => {
                identity.is_admin()
            }
            (ResourceKind::Employee, Action::Create | Action::Delete) => identity.is_admin(),
            // Record-level rules live in `check_employee_update`.
            (ResourceKind::Employee, Action::Update) => true,
            (ResourceKind::Project, Action::Delete) => identity.is_admin(),
            (ResourceKind::Project, Action::Create | Action::Update) => true,
        };
        if allowed {
            Ok(())
        } else {
            Err(AuthzError::denied(action, resource, PERMISSION_DENIED))
        }
    }

    /// Record-level rules for changing an existing employee.
    pub fn check_employee_update(
        &self,
        identity: &Identity,
        target: &EmployeeTarget,
        change: &EmployeeChange<'_>,
    ) -> Result<(), AuthzError> {
        let deny = |reason: &'static str| -> Result<(), AuthzError> {
            Err(AuthzError::denied(
                Action::Update,
                ResourceKind::Employee,
                reason,
            ))
        };
        match identity.role {
            Role::Admin => Ok(()),
            Role::Manager => {
                if identity.department_id.is_none() || target.department_id != identity.department_id
                {
                    return deny("Forbidden: different department.");
                }
                if change.role == Some(Role::Admin) {
                    return deny("Forbidden: cannot set ADMIN role.");
                }
                Ok(())
            }
            Role::Employee => {
                if target.id != identity.employee_id {
                    return deny("Forbidden: employees can only update their own profile.");
                }
                if change
                    .fields
                    .iter()
                    .any(|field| !SELF_SERVICE_FIELDS.contains(field))
                {
                    return deny(
                        "Forbidden: employees may only change email, first_name, last_name and password.",
                    );
                }
                Ok(())
            }
        }
    }

    /// Record-level rule for editing a project that is already visible.
    pub fn check_project_update(&self, identity: &Identity) -> Result<(), AuthzError> {
        match identity.role {
            Role::Admin | Role::Manager => Ok(()),
            Role::Employee => Err(AuthzError::denied(
                Action::Update,
                ResourceKind::Project,
                "Forbidden: employees cannot edit projects.",
            )),
        }
    }

    /// Department a project is stored under when `identity` writes it.
    ///
    /// Managers always write into their own department, whatever the payload says.
    pub fn project_department(
        &self,
        identity: &Identity,
        requested: Option<Uuid>,
    ) -> Option<Uuid> {
        match identity.role {
            Role::Manager => identity.department_id,
            Role::Admin | Role::Employee => requested,
        }
    }
}
