//! Employee store trait and the in-memory reference implementation.
//!
//! Persists the directory in a single JSON file when configured, loaded on
//! boot and rewritten on every mutation. Identifiers are assigned from a
//! monotonic counter and never reused, so a deleted employee's id stays
//! dead.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use ca_domain::error::{Error, Result};
use ca_domain::types::{Employee, EmployeeId, FieldMap};

use crate::validate::ALLOWED_FIELDS;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Narrow query interface the pipeline consumes. A relational backend
/// implements exactly these six operations and nothing more.
#[async_trait::async_trait]
pub trait EmployeeStore: Send + Sync {
    async fn find_by_id(&self, id: EmployeeId) -> Result<Option<Employee>>;

    /// Case-insensitive containment match over display names, sorted by id
    /// ascending.
    async fn find_by_name_contains(&self, text: &str) -> Result<Vec<Employee>>;

    /// Insert a new record; the store assigns the identifier.
    async fn insert(&self, draft: EmployeeDraft) -> Result<Employee>;

    /// Apply a field map to an existing record as one atomic write.
    async fn update(&self, id: EmployeeId, fields: &FieldMap) -> Result<Employee>;

    async fn delete(&self, id: EmployeeId) -> Result<Employee>;

    async fn list_all(&self) -> Result<Vec<Employee>>;
}

/// A record about to be created, before the store assigns its id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeDraft {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub raw_text: Option<String>,
}

impl EmployeeDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Build a draft from a validated proposal field map. The caller has
    /// already run the allow-list check; a missing name is still rejected
    /// here because it is a data invariant, not a parse concern.
    pub fn from_field_map(fields: &FieldMap) -> Result<Self> {
        let name = fields
            .get("name")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Validation(vec!["create requires a name".into()]))?;

        Ok(Self {
            name,
            email: fields.get("email").cloned(),
            phone: fields.get("phone").cloned(),
            department: fields.get("department").cloned(),
            position: fields.get("position").cloned(),
            raw_text: fields.get("raw_text").cloned(),
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-memory directory
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Default, Serialize, Deserialize)]
struct DirectoryState {
    next_id: u32,
    employees: BTreeMap<u32, Employee>,
}

/// Reference [`EmployeeStore`]: a map behind a `RwLock`, optionally
/// persisted to a JSON file on every mutation.
pub struct MemoryDirectory {
    state: RwLock<DirectoryState>,
    persist_path: Option<PathBuf>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(DirectoryState {
                next_id: 1,
                employees: BTreeMap::new(),
            }),
            persist_path: None,
        }
    }

    /// Load or create a persisted directory at `path`.
    pub fn with_persistence(path: &Path) -> Result<Self> {
        let state = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
            match serde_json::from_str::<DirectoryState>(&raw) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "directory file unreadable, starting empty"
                    );
                    DirectoryState {
                        next_id: 1,
                        employees: BTreeMap::new(),
                    }
                }
            }
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(Error::Io)?;
            }
            DirectoryState {
                next_id: 1,
                employees: BTreeMap::new(),
            }
        };

        tracing::info!(
            employees = state.employees.len(),
            path = %path.display(),
            "employee directory loaded"
        );

        Ok(Self {
            state: RwLock::new(state),
            persist_path: Some(path.to_path_buf()),
        })
    }

    pub fn len(&self) -> usize {
        self.state.read().employees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().employees.is_empty()
    }

    /// Write-through while still holding the write lock, so readers never
    /// observe a state the file does not.
    fn flush_locked(&self, state: &DirectoryState) -> Result<()> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| Error::Store(format!("serializing directory: {e}")))?;
        std::fs::write(path, json).map_err(Error::Io)?;
        Ok(())
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EmployeeStore for MemoryDirectory {
    async fn find_by_id(&self, id: EmployeeId) -> Result<Option<Employee>> {
        Ok(self.state.read().employees.get(&id.as_u32()).cloned())
    }

    async fn find_by_name_contains(&self, text: &str) -> Result<Vec<Employee>> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let state = self.state.read();
        // BTreeMap iteration order gives id-ascending results for free.
        let matches = state
            .employees
            .values()
            .filter(|e| e.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        Ok(matches)
    }

    async fn insert(&self, draft: EmployeeDraft) -> Result<Employee> {
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::Validation(vec!["name must not be empty".into()]));
        }

        let mut state = self.state.write();
        let id = EmployeeId(state.next_id);
        state.next_id += 1;

        let mut employee = Employee::new(id, name);
        employee.email = draft.email;
        employee.phone = draft.phone;
        employee.department = draft.department;
        employee.position = draft.position;
        employee.raw_text = draft.raw_text;

        state.employees.insert(id.as_u32(), employee.clone());
        self.flush_locked(&state)?;
        Ok(employee)
    }

    async fn update(&self, id: EmployeeId, fields: &FieldMap) -> Result<Employee> {
        let mut state = self.state.write();
        let employee = state
            .employees
            .get_mut(&id.as_u32())
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        for (key, value) in fields {
            match key.as_str() {
                "name" => {
                    let trimmed = value.trim();
                    if trimmed.is_empty() {
                        return Err(Error::Validation(vec!["name must not be empty".into()]));
                    }
                    employee.name = trimmed.to_string();
                }
                "email" => employee.email = Some(value.clone()),
                "phone" => employee.phone = Some(value.clone()),
                "department" => employee.department = Some(value.clone()),
                "position" => employee.position = Some(value.clone()),
                "raw_text" => employee.raw_text = Some(value.clone()),
                other => {
                    return Err(Error::Store(format!(
                        "unknown field {other:?} (allowed: {})",
                        ALLOWED_FIELDS.join(", ")
                    )));
                }
            }
        }

        let updated = employee.clone();
        self.flush_locked(&state)?;
        Ok(updated)
    }

    async fn delete(&self, id: EmployeeId) -> Result<Employee> {
        let mut state = self.state.write();
        let removed = state
            .employees
            .remove(&id.as_u32())
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        self.flush_locked(&state)?;
        Ok(removed)
    }

    async fn list_all(&self) -> Result<Vec<Employee>> {
        Ok(self.state.read().employees.values().cloned().collect())
    }
}
