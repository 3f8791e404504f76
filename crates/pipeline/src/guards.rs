//! Pre-flight guard chain.
//!
//! Guards run after classification and resolution but before any model
//! call, so a turn that is going to end in a clarification never costs
//! an inference round-trip. The chain order in [`GUARD_CHAIN`] is
//! load-bearing: an ambiguous name must win over a short-utterance
//! complaint, and a missing entity must be reported as "not found"
//! rather than the blander "no context" when the user actually named
//! someone.
//!
//! Leading-question and urgency detection are annotations on a
//! proceeding turn, never blocks. An urgent utterance with a missing
//! entity still clarifies; urgency buys nobody a skipped check.

use ca_domain::types::{CrudAction, IntentLabel, Mention, Resolution, ResolutionStatus};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct GuardInput<'a> {
    pub utterance: &'a str,
    pub intent: IntentLabel,
    pub resolution: &'a Resolution,
    pub mention: &'a Mention,
    pub has_active_entity: bool,
    /// Known directory names, used for "did you mean" suggestions.
    pub known_names: &'a [String],
    pub min_chars: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Annotations {
    pub leading_question: bool,
    pub urgent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    AmbiguousEntity,
    ShortUtterance,
    EntityNotFound,
    NoContext,
}

impl GuardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardKind::AmbiguousEntity => "ambiguous_entity",
            GuardKind::ShortUtterance => "short_utterance",
            GuardKind::EntityNotFound => "entity_not_found",
            GuardKind::NoContext => "no_context",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Proceed(Annotations),
    Clarify { kind: GuardKind, message: String },
}

type GuardFn = fn(&GuardInput) -> Option<(GuardKind, String)>;

/// Ordered chain; first tripped guard ends the turn.
pub const GUARD_CHAIN: &[(&str, GuardFn)] = &[
    ("ambiguous_entity", guard_ambiguous_entity),
    ("short_utterance", guard_short_utterance),
    ("entity_not_found", guard_entity_not_found),
    ("no_context", guard_no_context),
];

pub fn evaluate(input: &GuardInput) -> GuardOutcome {
    for (_, guard) in GUARD_CHAIN {
        if let Some((kind, message)) = guard(input) {
            return GuardOutcome::Clarify { kind, message };
        }
    }
    GuardOutcome::Proceed(annotate(input.utterance))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Guards
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn guard_ambiguous_entity(input: &GuardInput) -> Option<(GuardKind, String)> {
    if input.resolution.status != ResolutionStatus::Many || !input.intent.requires_entity() {
        return None;
    }
    let mut message =
        String::from("I found multiple employees matching that name. Which one did you mean?\n");
    for candidate in &input.resolution.candidates {
        message.push_str(&format!("- {}\n", candidate.summary_line()));
    }
    Some((GuardKind::AmbiguousEntity, message.trim_end().to_string()))
}

fn guard_short_utterance(input: &GuardInput) -> Option<(GuardKind, String)> {
    if input.intent.is_social() {
        return None;
    }
    if input.utterance.trim().chars().count() >= input.min_chars {
        return None;
    }
    Some((
        GuardKind::ShortUtterance,
        "Could you give me a bit more detail? A few words about what you need helps me \
         answer accurately."
            .to_string(),
    ))
}

fn guard_entity_not_found(input: &GuardInput) -> Option<(GuardKind, String)> {
    let named_someone = matches!(input.mention, Mention::Id(_) | Mention::Name(_));
    let targeted_crud = matches!(
        input.intent,
        IntentLabel::Crud(CrudAction::Update)
            | IntentLabel::Crud(CrudAction::Delete)
            | IntentLabel::Crud(CrudAction::Read)
    );
    if !named_someone || input.resolution.status != ResolutionStatus::None || !targeted_crud {
        return None;
    }

    let wanted = match input.mention {
        Mention::Id(id) => format!("ID {id}"),
        Mention::Name(name) => format!("\"{name}\""),
        _ => return None,
    };
    let message = if input.known_names.is_empty() {
        format!(
            "I couldn't find an employee matching {wanted}. There are no employees on record yet."
        )
    } else {
        format!(
            "I couldn't find an employee matching {wanted}. Did you mean one of: {}?",
            input.known_names.join(", ")
        )
    };
    Some((GuardKind::EntityNotFound, message))
}

fn guard_no_context(input: &GuardInput) -> Option<(GuardKind, String)> {
    if !input.intent.requires_entity()
        || input.resolution.status != ResolutionStatus::None
        || input.has_active_entity
    {
        return None;
    }
    Some((
        GuardKind::NoContext,
        "Please specify which employee you mean, by name or ID.".to_string(),
    ))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Annotations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const LEADING_CUES: &[&str] = &[
    "right?",
    "correct?",
    "isn't it",
    "isn't she",
    "isn't he",
    "doesn't he",
    "doesn't she",
    "didn't",
    "confirm that",
    "verify that",
    "just to confirm",
];

const URGENCY_CUES: &[&str] = &[
    "urgent",
    "urgently",
    "asap",
    "immediately",
    "right now",
    "emergency",
    "critical",
];

/// Flags that shape the grounded prompt without blocking the turn.
pub fn annotate(utterance: &str) -> Annotations {
    let lowered = utterance.to_lowercase();
    Annotations {
        leading_question: LEADING_CUES.iter().any(|cue| lowered.contains(cue)),
        urgent: URGENCY_CUES.iter().any(|cue| lowered.contains(cue)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ca_domain::types::{Employee, EmployeeId, SocialKind};

    fn employee(id: u32, name: &str, dept: &str) -> Employee {
        let mut e = Employee::new(EmployeeId(id), name);
        e.department = Some(dept.to_string());
        e
    }

    fn input<'a>(
        utterance: &'a str,
        intent: IntentLabel,
        resolution: &'a Resolution,
        mention: &'a Mention,
    ) -> GuardInput<'a> {
        GuardInput {
            utterance,
            intent,
            resolution,
            mention,
            has_active_entity: false,
            known_names: &[],
            min_chars: 10,
        }
    }

    #[test]
    fn chain_order_is_fixed() {
        let names: Vec<&str> = GUARD_CHAIN.iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec![
                "ambiguous_entity",
                "short_utterance",
                "entity_not_found",
                "no_context"
            ]
        );
    }

    #[test]
    fn ambiguous_entity_lists_candidates() {
        let resolution = Resolution::many(vec![
            employee(2, "John Doe", "QA"),
            employee(1, "John Smith", "IT"),
        ]);
        let mention = Mention::Name("John".into());
        let outcome = evaluate(&input(
            "show John's record",
            IntentLabel::Crud(CrudAction::Read),
            &resolution,
            &mention,
        ));
        match outcome {
            GuardOutcome::Clarify { kind, message } => {
                assert_eq!(kind, GuardKind::AmbiguousEntity);
                assert!(message.contains("Which one did you mean?"));
                // Sorted by id, so Smith (1) precedes Doe (2).
                let smith = message.find("John Smith").expect("smith listed");
                let doe = message.find("John Doe").expect("doe listed");
                assert!(smith < doe);
            }
            other => panic!("expected clarify, got {other:?}"),
        }
    }

    #[test]
    fn ambiguity_outranks_short_utterance() {
        let resolution = Resolution::many(vec![
            employee(1, "Jo A", "IT"),
            employee(2, "Jo B", "QA"),
        ]);
        let mention = Mention::Name("Jo".into());
        // Seven chars: short AND ambiguous. Ambiguity must win.
        let outcome = evaluate(&input(
            "edit Jo",
            IntentLabel::Crud(CrudAction::Update),
            &resolution,
            &mention,
        ));
        assert!(matches!(
            outcome,
            GuardOutcome::Clarify {
                kind: GuardKind::AmbiguousEntity,
                ..
            }
        ));
    }

    #[test]
    fn ambiguity_ignored_when_intent_needs_no_entity() {
        let resolution = Resolution::many(vec![
            employee(1, "John Smith", "IT"),
            employee(2, "John Doe", "QA"),
        ]);
        let mention = Mention::Name("John".into());
        let outcome = evaluate(&input(
            "who on the John team knows python?",
            IntentLabel::Search,
            &resolution,
            &mention,
        ));
        assert!(matches!(outcome, GuardOutcome::Proceed(_)));
    }

    #[test]
    fn short_utterance_clarifies() {
        let resolution = Resolution::none();
        let outcome = evaluate(&input(
            "python?",
            IntentLabel::Search,
            &resolution,
            &Mention::None,
        ));
        assert!(matches!(
            outcome,
            GuardOutcome::Clarify {
                kind: GuardKind::ShortUtterance,
                ..
            }
        ));
    }

    #[test]
    fn short_social_is_exempt() {
        let resolution = Resolution::none();
        let outcome = evaluate(&input(
            "hi",
            IntentLabel::Social(SocialKind::Greeting),
            &resolution,
            &Mention::None,
        ));
        assert!(matches!(outcome, GuardOutcome::Proceed(_)));
    }

    #[test]
    fn boundary_length_passes() {
        let resolution = Resolution::none();
        // Exactly ten chars.
        let outcome = evaluate(&input(
            "0123456789",
            IntentLabel::ListAll,
            &resolution,
            &Mention::None,
        ));
        assert!(matches!(outcome, GuardOutcome::Proceed(_)));
    }

    #[test]
    fn entity_not_found_suggests_names() {
        let resolution = Resolution::none();
        let mention = Mention::Name("Jhon".into());
        let names = vec!["John Smith".to_string(), "Priya Patel".to_string()];
        let mut inp = input(
            "delete Jhon from the directory",
            IntentLabel::Crud(CrudAction::Delete),
            &resolution,
            &mention,
        );
        inp.known_names = &names;
        let outcome = evaluate(&inp);
        match outcome {
            GuardOutcome::Clarify { kind, message } => {
                assert_eq!(kind, GuardKind::EntityNotFound);
                assert!(message.contains("\"Jhon\""));
                assert!(message.contains("John Smith"));
            }
            other => panic!("expected clarify, got {other:?}"),
        }
    }

    #[test]
    fn entity_not_found_with_empty_directory() {
        let resolution = Resolution::none();
        let mention = Mention::Id(EmployeeId(42));
        let outcome = evaluate(&input(
            "show employee 42 for me",
            IntentLabel::Crud(CrudAction::Read),
            &resolution,
            &mention,
        ));
        match outcome {
            GuardOutcome::Clarify { kind, message } => {
                assert_eq!(kind, GuardKind::EntityNotFound);
                assert!(message.contains("no employees on record"));
            }
            other => panic!("expected clarify, got {other:?}"),
        }
    }

    #[test]
    fn create_with_unknown_name_is_not_a_miss() {
        // Creating someone new: the name is SUPPOSED to be absent.
        let resolution = Resolution::none();
        let mention = Mention::Name("Newcomer Nadia".into());
        let outcome = evaluate(&input(
            "create employee Newcomer Nadia in IT",
            IntentLabel::Crud(CrudAction::Create),
            &resolution,
            &mention,
        ));
        assert!(matches!(outcome, GuardOutcome::Proceed(_)));
    }

    #[test]
    fn no_context_fires_for_bare_pronoun() {
        let resolution = Resolution::none();
        let outcome = evaluate(&input(
            "update his email please",
            IntentLabel::Crud(CrudAction::Update),
            &resolution,
            &Mention::Pronoun,
        ));
        assert!(matches!(
            outcome,
            GuardOutcome::Clarify {
                kind: GuardKind::NoContext,
                ..
            }
        ));
    }

    #[test]
    fn active_entity_satisfies_context() {
        let resolution = Resolution::none();
        let mut inp = input(
            "update his email please",
            IntentLabel::Crud(CrudAction::Update),
            &resolution,
            &Mention::Pronoun,
        );
        inp.has_active_entity = true;
        assert!(matches!(evaluate(&inp), GuardOutcome::Proceed(_)));
    }

    #[test]
    fn urgency_never_skips_a_guard() {
        let resolution = Resolution::none();
        let outcome = evaluate(&input(
            "URGENT: update their salary immediately",
            IntentLabel::Crud(CrudAction::Update),
            &resolution,
            &Mention::Pronoun,
        ));
        // Still a clarification; urgency does not unblock.
        assert!(matches!(
            outcome,
            GuardOutcome::Clarify {
                kind: GuardKind::NoContext,
                ..
            }
        ));
    }

    #[test]
    fn leading_question_proceeds_with_flag() {
        let resolution = Resolution::none();
        let outcome = evaluate(&input(
            "John left the company already, right?",
            IntentLabel::Search,
            &resolution,
            &Mention::None,
        ));
        match outcome {
            GuardOutcome::Proceed(ann) => {
                assert!(ann.leading_question);
                assert!(!ann.urgent);
            }
            other => panic!("expected proceed, got {other:?}"),
        }
    }

    #[test]
    fn annotations_detect_urgency() {
        let ann = annotate("need this ASAP, it's urgent");
        assert!(ann.urgent);
        assert!(!ann.leading_question);
    }
}
