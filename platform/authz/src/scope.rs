use uuid::Uuid;

/// Read scope of an identity over one resource kind.
///
/// `Scope` does not know about any storage technology; services translate it
/// into their own query conditions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Scope {
    All,
    Nothing,
    /// Records attached to this department.
    Department(Uuid),
    /// Exactly the record with this id.
    Only(Uuid),
    /// Records whose member set contains this employee.
    MemberOf(Uuid),
}

impl Scope {
    /// Scope restricted to one department, or nothing when the department is unknown.
    pub fn department(department_id: Option<Uuid>) -> Self {
        department_id.map_or(Scope::Nothing, Scope::Department)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_department_narrows_scope() {
        let dept = Uuid::new_v4();
        assert_eq!(Scope::department(Some(dept)), Scope::Department(dept));
    }

    #[test]
    fn missing_department_collapses_to_nothing() {
        assert_eq!(Scope::department(None), Scope::Nothing);
    }
}
