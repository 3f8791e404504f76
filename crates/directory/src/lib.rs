//! Employee directory for CrewAgent.
//!
//! The pipeline reads and mutates employee records through the
//! [`EmployeeStore`] trait only. [`MemoryDirectory`] is the shipped
//! implementation: an in-memory map with optional JSON write-through
//! persistence. Field validation and duplicate-detection policies live
//! here too, next to the records they judge.

pub mod duplicate;
pub mod store;
pub mod validate;

pub use duplicate::{DuplicatePolicy, NameEmailPolicy, NoDuplicateCheck};
pub use store::{EmployeeDraft, EmployeeStore, MemoryDirectory};
pub use validate::{check_fields, FieldCheck, ALLOWED_FIELDS};
