//! CRUD proposal lifecycle: parse, validate, hold for confirmation,
//! apply.
//!
//! Parsing is the only model-dependent step in the CRUD flow; the
//! prompts and the tolerant decoder live here, and the orchestrator
//! drives the two model calls (first attempt plus one stricter retry).
//! Validation never calls the model; it checks the field map, resolves
//! the target record, and consults the duplicate policy. A proposal
//! that validates clean waits in [`ProposalStore`] until the user
//! confirms; one with errors is rejected on the spot and can never be
//! applied afterwards.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use ca_directory::{check_fields, DuplicatePolicy, EmployeeDraft, EmployeeStore, ALLOWED_FIELDS};
use ca_domain::error::{Error, Result};
use ca_domain::types::{
    CrudAction, Employee, EmployeeId, FieldMap, ModelOutput, ParsedProposal, Proposal,
    ProposalState,
};
use ca_providers::json::parse_json_object;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Extraction prompt for the first parse attempt.
pub fn parse_prompt(utterance: &str) -> String {
    format!(
        r#"Extract the employee operation from the user's message as a JSON object.

Schema:
- "action": one of "create", "read", "update", "delete"
- "employee_id": the numeric employee id if the user gave one, else null
- "employee_name": the employee's name if the user gave one, else null
- "fields": object of the fields being set; allowed keys: {fields}

Examples:
Message: "Update Arun from IT to HR department"
JSON: {{"action": "update", "employee_id": null, "employee_name": "Arun", "fields": {{"department": "HR"}}}}

Message: "Update employee 123 email to x@y.com"
JSON: {{"action": "update", "employee_id": 123, "employee_name": null, "fields": {{"email": "x@y.com"}}}}

Message: "Create employee John in IT"
JSON: {{"action": "create", "employee_id": null, "employee_name": "John", "fields": {{"name": "John", "department": "IT"}}}}

Message: "Delete John Smith"
JSON: {{"action": "delete", "employee_id": null, "employee_name": "John Smith", "fields": {{}}}}

Message: "Show employee 42"
JSON: {{"action": "read", "employee_id": 42, "employee_name": null, "fields": {{}}}}

Message: "{utterance}"
JSON:"#,
        fields = ALLOWED_FIELDS.join(", ")
    )
}

/// Second-attempt prompt after an unparseable first answer.
pub fn retry_prompt(utterance: &str) -> String {
    format!(
        r#"Your previous answer was not valid JSON. Respond with ONLY one JSON object and nothing else: no prose, no code fences.

The object must have exactly these keys:
"action" (one of "create", "read", "update", "delete"), "employee_id" (number or null), "employee_name" (string or null), "fields" (object; allowed keys: {fields}).

Message: "{utterance}"
JSON:"#,
        fields = ALLOWED_FIELDS.join(", ")
    )
}

/// Lenient decode of whatever the model answered. Tolerates numeric ids
/// given as strings, fenced output, and scalar field values; drops null
/// fields instead of erroring.
pub fn proposal_from_text(raw: &str) -> Result<ParsedProposal> {
    let value = parse_json_object(raw)?;
    let Value::Object(map) = value else {
        return Err(Error::Extraction("proposal is not a JSON object".into()));
    };

    let action: CrudAction = map
        .get("action")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Extraction("proposal has no action".into()))?
        .parse()
        .map_err(Error::Extraction)?;

    let employee_id = match map.get("employee_id") {
        Some(Value::Number(n)) => n.as_u64().map(|n| EmployeeId(n as u32)),
        Some(Value::String(s)) => s.parse::<EmployeeId>().ok(),
        _ => None,
    };

    let employee_name = map
        .get("employee_name")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let mut fields = FieldMap::new();
    if let Some(Value::Object(raw_fields)) = map.get("fields") {
        for (key, value) in raw_fields {
            let rendered = match value {
                Value::Null => continue,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            fields.insert(key.clone(), rendered);
        }
    }

    // Models often put the new name only in employee_name; a create
    // needs it in the field map where validation looks for it.
    if action == CrudAction::Create && !fields.contains_key("name") {
        if let Some(name) = &employee_name {
            fields.insert("name".into(), name.clone());
        }
    }

    Ok(ParsedProposal {
        action,
        employee_id,
        employee_name,
        fields,
    })
}

/// Classify a raw extraction reply in one place, so the orchestrator
/// matches on [`ModelOutput`] instead of re-inspecting the text. Prose
/// with no JSON payload is [`ModelOutput::Text`]; a payload that does
/// not decode keeps the raw text and the decode failure for logging.
pub fn interpret_extraction(raw: &str) -> ModelOutput {
    if !raw.contains('{') {
        return ModelOutput::Text(raw.to_string());
    }
    match proposal_from_text(raw) {
        Ok(parsed) => ModelOutput::Proposal(parsed),
        Err(Error::Extraction(reason)) => ModelOutput::ParseFailure {
            raw: raw.to_string(),
            reason,
        },
        Err(other) => ModelOutput::ParseFailure {
            raw: raw.to_string(),
            reason: other.to_string(),
        },
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Validate a parsed proposal against the directory.
///
/// `fallback_target` is the session's active entity; an update or
/// delete that names nobody explicitly falls back to it. The returned
/// proposal is `Validated` or `Rejected`; store failures are the only
/// `Err`.
pub async fn validate(
    parsed: ParsedProposal,
    store: &dyn EmployeeStore,
    duplicates: &dyn DuplicatePolicy,
    fallback_target: Option<EmployeeId>,
    session_id: &str,
) -> Result<Proposal> {
    let check = check_fields(parsed.action, &parsed.fields);
    let mut errors = check.errors;
    let warnings = check.warnings;

    let mut target_id = None;
    match parsed.action {
        CrudAction::Create => {
            if errors.is_empty() {
                if let Ok(draft) = EmployeeDraft::from_field_map(&parsed.fields) {
                    let existing = store.list_all().await?;
                    if let Some(reason) = duplicates.check(&draft, &existing) {
                        errors.push(format!("duplicate record: {reason}"));
                    }
                }
            }
        }
        CrudAction::Update | CrudAction::Delete | CrudAction::Read => {
            target_id = resolve_target(&parsed, store, fallback_target, &mut errors).await?;
        }
    }

    let state = if errors.is_empty() {
        ProposalState::Validated
    } else {
        ProposalState::Rejected
    };

    Ok(Proposal {
        id: Uuid::new_v4(),
        session_id: session_id.to_string(),
        state,
        parsed,
        target_id,
        errors,
        warnings,
        created_at: Utc::now(),
    })
}

async fn resolve_target(
    parsed: &ParsedProposal,
    store: &dyn EmployeeStore,
    fallback: Option<EmployeeId>,
    errors: &mut Vec<String>,
) -> Result<Option<EmployeeId>> {
    if let Some(id) = parsed.employee_id {
        if store.find_by_id(id).await?.is_some() {
            return Ok(Some(id));
        }
        errors.push(not_found_message(parsed));
        return Ok(None);
    }

    if let Some(name) = &parsed.employee_name {
        let matches = store.find_by_name_contains(name).await?;
        return Ok(match matches.len() {
            0 => {
                errors.push(not_found_message(parsed));
                None
            }
            1 => Some(matches[0].id),
            _ => {
                errors.push(format!(
                    "There are multiple employees named '{name}'. Please use the employee ID."
                ));
                None
            }
        });
    }

    // Nothing named: the turn's active entity carries the reference, if
    // the record still exists.
    if let Some(id) = fallback {
        if store.find_by_id(id).await?.is_some() {
            return Ok(Some(id));
        }
    }
    errors.push("I couldn't tell which employee you meant. Please give a name or ID.".into());
    Ok(None)
}

fn not_found_message(parsed: &ParsedProposal) -> String {
    match (&parsed.employee_name, parsed.employee_id) {
        (Some(name), Some(id)) => format!(
            "I couldn't find an employee named '{name}' or with ID {id}. Could you provide more details?"
        ),
        (Some(name), None) => {
            format!("I couldn't find an employee named '{name}'. Could you provide more details?")
        }
        (None, Some(id)) => {
            format!("I couldn't find an employee with ID {id}. Could you provide more details?")
        }
        (None, None) => {
            "I couldn't tell which employee you meant. Could you provide more details?".to_string()
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pending-proposal store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Validated mutations awaiting confirmation, keyed by proposal id.
/// Confirmation consumes the entry, so a proposal applies at most once
/// no matter how many confirm requests race for it.
#[derive(Default)]
pub struct ProposalStore {
    inner: RwLock<HashMap<Uuid, Proposal>>,
}

impl ProposalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, proposal: Proposal) {
        self.inner.write().insert(proposal.id, proposal);
    }

    /// Remove and return the proposal. The first caller wins.
    pub fn take(&self, id: Uuid) -> Option<Proposal> {
        self.inner.write().remove(&id)
    }

    pub fn remove(&self, id: Uuid) -> bool {
        self.inner.write().remove(&id).is_some()
    }

    /// Drop proposals older than the TTL; returns how many went.
    pub fn sweep_expired(&self, ttl_minutes: i64) -> usize {
        let cutoff = Utc::now() - chrono::Duration::minutes(ttl_minutes);
        let mut inner = self.inner.write();
        let before = inner.len();
        inner.retain(|_, p| p.created_at > cutoff);
        before - inner.len()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Application & rendering
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Apply a confirmed mutation. Returns the user-facing confirmation
/// text and the id the session should treat as active afterwards.
pub async fn apply(
    proposal: &Proposal,
    store: &dyn EmployeeStore,
) -> Result<(String, Option<EmployeeId>)> {
    if !proposal.is_applicable() {
        return Err(Error::Validation(proposal.errors.clone()));
    }

    match proposal.parsed.action {
        CrudAction::Create => {
            let draft = EmployeeDraft::from_field_map(&proposal.parsed.fields)?;
            let created = store.insert(draft).await?;
            let reply = match &created.department {
                Some(dept) => format!(
                    "Created new employee **{}** (ID: {}) in {}.",
                    created.name, created.id, dept
                ),
                None => format!("Created new employee **{}** (ID: {}).", created.name, created.id),
            };
            Ok((reply, Some(created.id)))
        }
        CrudAction::Update => {
            let id = target_of(proposal)?;
            let before = store
                .find_by_id(id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("employee {id}")))?;
            let after = store.update(id, &proposal.parsed.fields).await?;

            let mut reply = format!("Updated employee **{}** (ID: {}):", after.name, after.id);
            for (field, new_value) in &proposal.parsed.fields {
                reply.push_str(&format!(
                    "\n- {field}: '{}' -> '{new_value}'",
                    field_of(&before, field)
                ));
            }
            Ok((reply, Some(id)))
        }
        CrudAction::Delete => {
            let id = target_of(proposal)?;
            let gone = store.delete(id).await?;
            Ok((
                format!("Deleted employee **{}** (ID: {}).", gone.name, gone.id),
                Some(id),
            ))
        }
        CrudAction::Read => Err(Error::Validation(vec![
            "read requests are answered directly, not applied".into(),
        ])),
    }
}

fn target_of(proposal: &Proposal) -> Result<EmployeeId> {
    proposal
        .target_id
        .ok_or_else(|| Error::Validation(vec!["proposal has no resolved target".into()]))
}

fn field_of(employee: &Employee, field: &str) -> String {
    let value = match field {
        "name" => Some(employee.name.clone()),
        "email" => employee.email.clone(),
        "phone" => employee.phone.clone(),
        "department" => employee.department.clone(),
        "position" => employee.position.clone(),
        "raw_text" => employee.raw_text.clone(),
        _ => None,
    };
    value.unwrap_or_else(|| "N/A".to_string())
}

/// Confirmation text shown when a validated mutation is parked pending
/// the user's go-ahead.
pub fn confirmation_message(proposal: &Proposal) -> String {
    let mut out = format!(
        "Here's the change I'm ready to make:\n- action: {}",
        proposal.parsed.action.as_str()
    );
    if let Some(name) = &proposal.parsed.employee_name {
        out.push_str(&format!("\n- employee: {name}"));
    }
    if let Some(id) = proposal.target_id {
        out.push_str(&format!("\n- target ID: {id}"));
    }
    for (field, value) in &proposal.parsed.fields {
        out.push_str(&format!("\n- {field}: {value}"));
    }
    for warning in &proposal.warnings {
        out.push_str(&format!("\n- note: {warning}"));
    }
    out.push_str("\n\nReply \"confirm\" to apply it, or \"cancel\" to discard.");
    out
}

/// Full record card for direct read answers.
pub fn render_record(employee: &Employee) -> String {
    let mut out = String::new();
    out.push_str(&format!("**Name:** {}\n", employee.name));
    out.push_str(&format!("**ID:** {}\n", employee.id));
    out.push_str(&format!("**Email:** {}\n", opt(&employee.email)));
    out.push_str(&format!("**Phone:** {}\n", opt(&employee.phone)));
    out.push_str(&format!("**Department:** {}\n", opt(&employee.department)));
    out.push_str(&format!("**Position:** {}", opt(&employee.position)));
    if !employee.skills.is_empty() {
        out.push_str(&format!("\n**Skills:** {}", employee.skills.join(", ")));
    }
    if !employee.experience.is_empty() {
        out.push_str(&format!("\n**Experience:** {}", employee.experience.join("; ")));
    }
    if !employee.education.is_empty() {
        out.push_str(&format!("\n**Education:** {}", employee.education.join("; ")));
    }
    out
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("N/A")
}
