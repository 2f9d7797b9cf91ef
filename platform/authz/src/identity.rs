use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three roles an employee record can carry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Employee => "EMPLOYEE",
        }
    }
}

/// The authenticated actor behind a request.
///
/// Built once per request from the bearer token's subject and passed
/// explicitly into every policy and service call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Identity {
    pub employee_id: Uuid,
    pub role: Role,
    pub department_id: Option<Uuid>,
}

impl Identity {
    pub fn new(employee_id: Uuid, role: Role, department_id: Option<Uuid>) -> Self {
        Self {
            employee_id,
            role,
            department_id,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}
