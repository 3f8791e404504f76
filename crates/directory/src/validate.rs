//! Field-level validation for proposed employee mutations.
//!
//! Two severities: errors block a proposal, warnings ride along on it.
//! Format problems in optional contact fields are warnings so a sloppy
//! email never blocks an otherwise sound create; unknown fields and an
//! empty name are hard errors.

use std::sync::OnceLock;

use regex::Regex;

use ca_domain::types::{CrudAction, FieldMap};

/// The only fields a proposal may touch. Everything else is rejected
/// before validation even looks at values.
pub const ALLOWED_FIELDS: [&str; 6] = [
    "name",
    "email",
    "phone",
    "department",
    "position",
    "raw_text",
];

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Permissive on purpose: local@domain.tld with at least one dot.
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap()
    })
}

/// Outcome of checking one proposal's field map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldCheck {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl FieldCheck {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check a field map against the allow-list and per-field formats.
///
/// `action` decides whether a name is mandatory: creates must carry one,
/// updates may touch any subset of fields.
pub fn check_fields(action: CrudAction, fields: &FieldMap) -> FieldCheck {
    let mut check = FieldCheck::default();

    for (key, value) in fields {
        if !ALLOWED_FIELDS.contains(&key.as_str()) {
            check
                .errors
                .push(format!("unknown field {key:?} is not allowed"));
            continue;
        }
        match key.as_str() {
            "name" => {
                if value.trim().is_empty() {
                    check.errors.push("name must not be empty".into());
                }
            }
            "email" => {
                if !email_re().is_match(value.trim()) {
                    check
                        .warnings
                        .push(format!("email {value:?} does not look valid"));
                }
            }
            "phone" => {
                let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
                if !(7..=15).contains(&digits) {
                    check
                        .warnings
                        .push(format!("phone {value:?} does not look valid"));
                }
            }
            _ => {}
        }
    }

    if action == CrudAction::Create && !fields.contains_key("name") {
        check.errors.push("create requires a name".into());
    }

    check
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn unknown_field_is_an_error() {
        let check = check_fields(CrudAction::Update, &map(&[("salary", "100")]));
        assert_eq!(check.errors.len(), 1);
        assert!(check.errors[0].contains("salary"));
    }

    #[test]
    fn bad_email_is_a_warning_not_an_error() {
        let check = check_fields(
            CrudAction::Update,
            &map(&[("email", "not-an-email")]),
        );
        assert!(check.is_clean());
        assert_eq!(check.warnings.len(), 1);
    }

    #[test]
    fn good_email_passes() {
        let check = check_fields(
            CrudAction::Update,
            &map(&[("email", "jane@example.com")]),
        );
        assert!(check.is_clean());
        assert!(check.warnings.is_empty());
    }

    #[test]
    fn phone_length_bounds() {
        let ok = check_fields(CrudAction::Update, &map(&[("phone", "+1 (555) 123-4567")]));
        assert!(ok.warnings.is_empty());

        let short = check_fields(CrudAction::Update, &map(&[("phone", "123")]));
        assert_eq!(short.warnings.len(), 1);

        let long = check_fields(
            CrudAction::Update,
            &map(&[("phone", "1234567890123456789")]),
        );
        assert_eq!(long.warnings.len(), 1);
    }

    #[test]
    fn create_without_name_is_an_error() {
        let check = check_fields(CrudAction::Create, &map(&[("department", "HR")]));
        assert!(!check.is_clean());
        assert!(check.errors[0].contains("name"));
    }

    #[test]
    fn update_without_name_is_fine() {
        let check = check_fields(CrudAction::Update, &map(&[("department", "HR")]));
        assert!(check.is_clean());
    }

    #[test]
    fn empty_name_is_an_error_for_any_action() {
        let check = check_fields(CrudAction::Update, &map(&[("name", "  ")]));
        assert!(!check.is_clean());
    }
}
