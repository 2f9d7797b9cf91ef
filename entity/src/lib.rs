//! Persisted HR aggregates. Every table is an independently addressable root;
//! the only owned rows are the `project_employee` membership links.

pub mod department;
pub mod employee;
pub mod project;
pub mod project_employee;
