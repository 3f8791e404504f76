use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Employee identity & record
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Stable employee identifier. Rendered fixed-width and zero-padded
/// (`000042`) everywhere a human sees it; immutable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EmployeeId(pub u32);

impl EmployeeId {
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

impl FromStr for EmployeeId {
    type Err = String;

    /// Accepts both padded (`000042`) and bare (`42`) forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("invalid employee id: {s:?}"));
        }
        trimmed
            .parse::<u32>()
            .map(EmployeeId)
            .map_err(|e| format!("invalid employee id {s:?}: {e}"))
    }
}

impl Serialize for EmployeeId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EmployeeId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl serde::de::Visitor<'_> for IdVisitor {
            type Value = EmployeeId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an employee id as a digit string or integer")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<EmployeeId, E> {
                v.parse().map_err(serde::de::Error::custom)
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<EmployeeId, E> {
                u32::try_from(v)
                    .map(EmployeeId)
                    .map_err(|_| serde::de::Error::custom(format!("employee id out of range: {v}")))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// An employee record. `name` is required; everything else is optional and
/// only ever changed through the validated CRUD path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<String>,
    #[serde(default)]
    pub education: Vec<String>,
    #[serde(default)]
    pub raw_text: Option<String>,
}

impl Employee {
    pub fn new(id: EmployeeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: None,
            phone: None,
            department: None,
            position: None,
            skills: Vec::new(),
            experience: Vec::new(),
            education: Vec::new(),
            raw_text: None,
        }
    }

    /// One-line summary used in disambiguation and not-found messages.
    pub fn summary_line(&self) -> String {
        match &self.department {
            Some(dept) => format!("{} {} ({dept})", self.id, self.name),
            None => format!("{} {}", self.id, self.name),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation history
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry in a session's rolling history window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Exchange {
    pub fn now(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Intent
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrudAction {
    Create,
    Read,
    Update,
    Delete,
}

impl CrudAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrudAction::Create => "create",
            CrudAction::Read => "read",
            CrudAction::Update => "update",
            CrudAction::Delete => "delete",
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, CrudAction::Read)
    }
}

impl FromStr for CrudAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(CrudAction::Create),
            "read" => Ok(CrudAction::Read),
            "update" => Ok(CrudAction::Update),
            "delete" => Ok(CrudAction::Delete),
            other => Err(format!("unknown action: {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialKind {
    Greeting,
    Thanks,
    Farewell,
}

/// Utterance category, in precedence order (CRUD wins over everything,
/// ambiguous is the fallback).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum IntentLabel {
    Crud(CrudAction),
    ListAll,
    Search,
    Social(SocialKind),
    Ambiguous,
}

impl IntentLabel {
    pub fn is_crud(&self) -> bool {
        matches!(self, IntentLabel::Crud(_))
    }

    pub fn is_social(&self) -> bool {
        matches!(self, IntentLabel::Social(_))
    }

    /// Whether the category only makes sense with a concrete employee in
    /// hand. Create is excluded: a new record needs no existing entity.
    /// Ambiguous is included so that an anchorless unclear utterance is
    /// clarified rather than guessed at.
    pub fn requires_entity(&self) -> bool {
        match self {
            IntentLabel::Crud(action) => !matches!(action, CrudAction::Create),
            IntentLabel::Ambiguous => true,
            IntentLabel::ListAll | IntentLabel::Search | IntentLabel::Social(_) => false,
        }
    }

    pub fn label(&self) -> String {
        match self {
            IntentLabel::Crud(action) => format!("crud_{}", action.as_str()),
            IntentLabel::ListAll => "list_all".into(),
            IntentLabel::Search => "search".into(),
            IntentLabel::Social(kind) => format!("social_{kind:?}").to_ascii_lowercase(),
            IntentLabel::Ambiguous => "ambiguous".into(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Mention & resolution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What the utterance points at, extracted lexically before any store or
/// model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mention {
    Id(EmployeeId),
    Name(String),
    /// A pronoun referring to the session's active entity.
    Pronoun,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStatus {
    None,
    One,
    Many,
}

/// Outcome of entity resolution for one utterance. Transient: produced
/// fresh per turn, never persisted.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub status: ResolutionStatus,
    pub candidates: Vec<Employee>,
    /// True when resolution went through the pronoun → active-entity path.
    pub via_pronoun: bool,
}

impl Resolution {
    pub fn none() -> Self {
        Self {
            status: ResolutionStatus::None,
            candidates: Vec::new(),
            via_pronoun: false,
        }
    }

    pub fn one(employee: Employee) -> Self {
        Self {
            status: ResolutionStatus::One,
            candidates: vec![employee],
            via_pronoun: false,
        }
    }

    /// Candidates are sorted by id ascending so disambiguation prompts are
    /// deterministic.
    pub fn many(mut candidates: Vec<Employee>) -> Self {
        candidates.sort_by_key(|e| e.id);
        Self {
            status: ResolutionStatus::Many,
            candidates,
            via_pronoun: false,
        }
    }

    pub fn via_pronoun(mut self) -> Self {
        self.via_pronoun = true;
        self
    }

    pub fn single(&self) -> Option<&Employee> {
        match self.status {
            ResolutionStatus::One => self.candidates.first(),
            _ => None,
        }
    }

    pub fn resolved_id(&self) -> Option<EmployeeId> {
        self.single().map(|e| e.id)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Model output & CRUD proposals
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Field-value map carried by a proposal. BTreeMap keeps rendering and
/// test assertions order-stable.
pub type FieldMap = BTreeMap<String, String>;

/// What came back from the language model, made explicit instead of being
/// sniffed out of raw text at each call site.
#[derive(Debug, Clone)]
pub enum ModelOutput {
    /// A decodable operation object.
    Proposal(ParsedProposal),
    /// A reply with no JSON payload at all; the model chatted instead of
    /// extracting.
    Text(String),
    /// A JSON-looking reply that does not decode to an operation.
    ParseFailure { raw: String, reason: String },
}

/// The structured form a CRUD utterance is parsed into before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedProposal {
    pub action: CrudAction,
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
    #[serde(default)]
    pub employee_name: Option<String>,
    #[serde(default)]
    pub fields: FieldMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalState {
    Parsed,
    Validated,
    Rejected,
    Applied,
}

/// A parsed, not-yet-applied mutation. A proposal with any validation
/// error is frozen in `Rejected` and can never be applied; a fresh
/// utterance must restart the flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: Uuid,
    pub session_id: String,
    pub state: ProposalState,
    pub parsed: ParsedProposal,
    /// Resolved target, filled in during validation for update/delete.
    pub target_id: Option<EmployeeId>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Proposal {
    pub fn is_applicable(&self) -> bool {
        self.state == ProposalState::Validated && self.errors.is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Decomposition
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One unit of a decomposed compound utterance. `kind` is whatever label
/// the segmentation model chose; execution only cares about `depends_on`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    #[serde(alias = "task_id")]
    pub id: String,
    #[serde(alias = "query")]
    pub text: String,
    #[serde(default, alias = "type")]
    pub kind: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn surface
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One inbound utterance plus addressing.
#[derive(Debug, Clone, Deserialize)]
pub struct TurnRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub utterance: String,
    /// Explicit target (UI row selection). Skips name extraction entirely.
    #[serde(default)]
    pub explicit_entity_id: Option<EmployeeId>,
}

impl TurnRequest {
    pub fn new(utterance: impl Into<String>) -> Self {
        Self {
            session_id: None,
            utterance: utterance.into(),
            explicit_entity_id: None,
        }
    }

    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn targeting(mut self, id: EmployeeId) -> Self {
        self.explicit_entity_id = Some(id);
        self
    }
}

/// How a turn ended, for callers and tests that care about more than the
/// reply text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    Answered,
    Clarification,
    ProposalPending,
    ProposalApplied,
    ProposalRejected,
    Social,
}

impl TurnOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnOutcome::Answered => "answered",
            TurnOutcome::Clarification => "clarification",
            TurnOutcome::ProposalPending => "proposal_pending",
            TurnOutcome::ProposalApplied => "proposal_applied",
            TurnOutcome::ProposalRejected => "proposal_rejected",
            TurnOutcome::Social => "social",
        }
    }
}

/// The single result every turn produces, whatever path it took.
#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub reply: String,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_entity_id: Option<EmployeeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_proposal_id: Option<Uuid>,
    pub outcome: TurnOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employee_id_renders_zero_padded() {
        assert_eq!(EmployeeId(1).to_string(), "000001");
        assert_eq!(EmployeeId(123_456).to_string(), "123456");
        assert_eq!(EmployeeId(1_234_567).to_string(), "1234567");
    }

    #[test]
    fn employee_id_parses_padded_and_bare() {
        assert_eq!("000042".parse::<EmployeeId>().unwrap(), EmployeeId(42));
        assert_eq!("42".parse::<EmployeeId>().unwrap(), EmployeeId(42));
        assert!("".parse::<EmployeeId>().is_err());
        assert!("42a".parse::<EmployeeId>().is_err());
        assert!("-1".parse::<EmployeeId>().is_err());
    }

    #[test]
    fn employee_id_serde_round_trip() {
        let id = EmployeeId(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"000007\"");
        let back: EmployeeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        // Numeric form tolerated on input.
        let from_num: EmployeeId = serde_json::from_str("7").unwrap();
        assert_eq!(from_num, id);
    }

    #[test]
    fn resolution_many_sorts_by_id() {
        let resolution = Resolution::many(vec![
            Employee::new(EmployeeId(9), "John B"),
            Employee::new(EmployeeId(2), "John A"),
        ]);
        let ids: Vec<u32> = resolution.candidates.iter().map(|e| e.id.as_u32()).collect();
        assert_eq!(ids, vec![2, 9]);
        assert_eq!(resolution.status, ResolutionStatus::Many);
        assert!(resolution.single().is_none());
    }

    #[test]
    fn requires_entity_matrix() {
        assert!(IntentLabel::Crud(CrudAction::Update).requires_entity());
        assert!(IntentLabel::Crud(CrudAction::Delete).requires_entity());
        assert!(IntentLabel::Crud(CrudAction::Read).requires_entity());
        assert!(!IntentLabel::Crud(CrudAction::Create).requires_entity());
        assert!(IntentLabel::Ambiguous.requires_entity());
        assert!(!IntentLabel::ListAll.requires_entity());
        assert!(!IntentLabel::Search.requires_entity());
        assert!(!IntentLabel::Social(SocialKind::Greeting).requires_entity());
    }

    #[test]
    fn subtask_accepts_original_field_names() {
        let raw = r#"{"task_id": "t1", "query": "find Java devs", "type": "search", "depends_on": []}"#;
        let task: Subtask = serde_json::from_str(raw).unwrap();
        assert_eq!(task.id, "t1");
        assert_eq!(task.text, "find Java devs");
        assert_eq!(task.kind, "search");
        assert!(task.depends_on.is_empty());
    }

    #[test]
    fn proposal_applicable_only_when_validated_and_clean() {
        let parsed = ParsedProposal {
            action: CrudAction::Update,
            employee_id: Some(EmployeeId(1)),
            employee_name: None,
            fields: FieldMap::new(),
        };
        let mut proposal = Proposal {
            id: Uuid::new_v4(),
            session_id: "s".into(),
            state: ProposalState::Validated,
            parsed,
            target_id: Some(EmployeeId(1)),
            errors: Vec::new(),
            warnings: Vec::new(),
            created_at: Utc::now(),
        };
        assert!(proposal.is_applicable());
        proposal.state = ProposalState::Rejected;
        assert!(!proposal.is_applicable());
    }
}
