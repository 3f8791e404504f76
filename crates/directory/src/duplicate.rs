//! Pluggable duplicate detection for create proposals.
//!
//! The store never enforces uniqueness itself. Validation consults a
//! policy and turns a hit into a proposal error, so swapping the policy
//! changes behavior without touching the state machine.

use std::sync::Arc;

use ca_domain::config::DuplicatePolicyKind;
use ca_domain::types::Employee;

use crate::store::EmployeeDraft;

/// Decides whether a draft collides with an existing record. Returns a
/// human-readable reason on collision, `None` when the create may proceed.
pub trait DuplicatePolicy: Send + Sync {
    fn check(&self, draft: &EmployeeDraft, existing: &[Employee]) -> Option<String>;
}

/// Default policy: anything goes. Two John Smiths are two people.
pub struct NoDuplicateCheck;

impl DuplicatePolicy for NoDuplicateCheck {
    fn check(&self, _draft: &EmployeeDraft, _existing: &[Employee]) -> Option<String> {
        None
    }
}

/// Flags a create when an existing record matches on exact name (case
/// folded) and email.
pub struct NameEmailPolicy;

impl DuplicatePolicy for NameEmailPolicy {
    fn check(&self, draft: &EmployeeDraft, existing: &[Employee]) -> Option<String> {
        let email = draft.email.as_deref()?;
        let name = draft.name.trim().to_lowercase();
        let email = email.trim().to_lowercase();

        existing
            .iter()
            .find(|e| {
                e.name.trim().to_lowercase() == name
                    && e.email
                        .as_deref()
                        .is_some_and(|have| have.trim().to_lowercase() == email)
            })
            .map(|e| format!("{} already exists as {}", e.name, e.id))
    }
}

pub fn policy_for(kind: DuplicatePolicyKind) -> Arc<dyn DuplicatePolicy> {
    match kind {
        DuplicatePolicyKind::Off => Arc::new(NoDuplicateCheck),
        DuplicatePolicyKind::NameEmail => Arc::new(NameEmailPolicy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ca_domain::types::EmployeeId;

    fn existing() -> Vec<Employee> {
        let mut john = Employee::new(EmployeeId(1), "John Smith");
        john.email = Some("john@example.com".into());
        vec![john]
    }

    #[test]
    fn off_policy_never_flags() {
        let draft = EmployeeDraft {
            name: "John Smith".into(),
            email: Some("john@example.com".into()),
            ..Default::default()
        };
        assert!(NoDuplicateCheck.check(&draft, &existing()).is_none());
    }

    #[test]
    fn name_email_policy_flags_exact_pair() {
        let draft = EmployeeDraft {
            name: "john smith".into(),
            email: Some("JOHN@example.com".into()),
            ..Default::default()
        };
        let hit = NameEmailPolicy.check(&draft, &existing()).unwrap();
        assert!(hit.contains("000001"));
    }

    #[test]
    fn name_alone_is_not_a_duplicate() {
        let draft = EmployeeDraft {
            name: "John Smith".into(),
            email: Some("other@example.com".into()),
            ..Default::default()
        };
        assert!(NameEmailPolicy.check(&draft, &existing()).is_none());
    }

    #[test]
    fn draft_without_email_is_never_a_duplicate() {
        let draft = EmployeeDraft::named("John Smith");
        assert!(NameEmailPolicy.check(&draft, &existing()).is_none());
    }

    #[test]
    fn policy_for_maps_config_kinds() {
        let draft = EmployeeDraft {
            name: "John Smith".into(),
            email: Some("john@example.com".into()),
            ..Default::default()
        };
        assert!(policy_for(DuplicatePolicyKind::Off)
            .check(&draft, &existing())
            .is_none());
        assert!(policy_for(DuplicatePolicyKind::NameEmail)
            .check(&draft, &existing())
            .is_some());
    }
}
