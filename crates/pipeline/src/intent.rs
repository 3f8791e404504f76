//! Lexical intent classification.
//!
//! Pure keyword matching over the lowercased utterance; no model call.
//! Precedence is held in [`INTENT_RULES`], an ordered table walked first
//! match wins, so the ordering itself is testable data rather than a
//! stack of if/else branches.
//!
//! CRUD sits first because a create/update payload may itself be long
//! free text (pasted resume content, an "X and Y" update clause) that
//! the later rules would happily misread as a compound query. The CRUD
//! predicate excludes bulk list-all phrasings so "show all employees"
//! still lands on list-all rather than on the read verb "show".

use ca_domain::types::{CrudAction, IntentLabel, SocialKind};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Lexicons
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const CREATE_VERBS: &[&str] = &["create", "add", "new", "insert", "register"];
const UPDATE_VERBS: &[&str] = &["update", "change", "modify", "edit", "set"];
const DELETE_VERBS: &[&str] = &["delete", "remove", "fire", "terminate"];
const READ_VERBS: &[&str] = &["show", "get", "display", "view", "details"];

const LIST_ALL_PHRASES: &[&str] = &[
    "all employees",
    "every employee",
    "all the employees",
    "list employees",
    "list all employees",
    "employee list",
    "list of employees",
    "all records",
    "everyone",
    "whole team",
];

/// Cues that mark a single-entity or filtered lookup: skills, tenure,
/// contact details, departments, locations, and counting/comparison
/// phrasing.
const SEARCH_CUES: &[&str] = &[
    "skill",
    "skills",
    "experience",
    "experienced",
    "worked",
    "works",
    "years",
    "department",
    "position",
    "role",
    "title",
    "email",
    "phone",
    "contact",
    "who",
    "which",
    "find",
    "search",
    "filter",
    "count",
    "compare",
    "located",
    "location",
    "city",
    "hired",
    "joined",
];

const MULTI_WORD_SEARCH_CUES: &[&str] = &["how many", "tell me about", "what about"];

const PRONOUNS: &[&str] = &[
    "his", "her", "their", "he", "she", "him", "them", "they", "its",
];

const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "yo",
    "greetings",
    "good morning",
    "good afternoon",
    "good evening",
];
const THANKS: &[&str] = &["thanks", "thank you", "thx", "cheers", "appreciate it"];
const FAREWELLS: &[&str] = &["bye", "goodbye", "see you", "good night", "later"];

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Rule table
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Rule predicate: lowercased utterance + whether the session has an
/// active entity. Returns the label when the rule fires.
type RuleFn = fn(&str, bool) -> Option<IntentLabel>;

pub struct IntentRule {
    pub name: &'static str,
    pub matches: RuleFn,
}

/// Ordered precedence table. `classify` walks it top to bottom and the
/// first hit wins; nothing below a matching rule is consulted.
pub const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        name: "crud_verb",
        matches: rule_crud,
    },
    IntentRule {
        name: "list_all",
        matches: rule_list_all,
    },
    IntentRule {
        name: "search_cue",
        matches: rule_search,
    },
    IntentRule {
        name: "social",
        matches: rule_social,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentDecision {
    pub label: IntentLabel,
    /// Name of the table rule that fired (`"fallback"` when none did).
    pub rule: &'static str,
}

pub fn classify(utterance: &str, has_active_entity: bool) -> IntentDecision {
    let lowered = utterance.trim().to_lowercase();
    for rule in INTENT_RULES {
        if let Some(label) = (rule.matches)(&lowered, has_active_entity) {
            return IntentDecision {
                label,
                rule: rule.name,
            };
        }
    }
    IntentDecision {
        label: IntentLabel::Ambiguous,
        rule: "fallback",
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Rules
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn rule_crud(lowered: &str, _has_active: bool) -> Option<IntentLabel> {
    if is_list_all(lowered) {
        return None;
    }
    crud_action(lowered).map(IntentLabel::Crud)
}

fn rule_list_all(lowered: &str, _has_active: bool) -> Option<IntentLabel> {
    is_list_all(lowered).then_some(IntentLabel::ListAll)
}

fn rule_search(lowered: &str, has_active: bool) -> Option<IntentLabel> {
    if MULTI_WORD_SEARCH_CUES.iter().any(|cue| lowered.contains(cue)) {
        return Some(IntentLabel::Search);
    }
    if SEARCH_CUES.iter().any(|cue| contains_word(lowered, cue)) {
        return Some(IntentLabel::Search);
    }
    // A bare pronoun follow-up ("and what about him?") is a lookup on
    // the active entity, not an ambiguity.
    if has_active && PRONOUNS.iter().any(|p| contains_word(lowered, p)) {
        return Some(IntentLabel::Search);
    }
    None
}

fn rule_social(lowered: &str, _has_active: bool) -> Option<IntentLabel> {
    let normalized = normalize_social(lowered);
    for (set, kind) in [
        (GREETINGS, SocialKind::Greeting),
        (THANKS, SocialKind::Thanks),
        (FAREWELLS, SocialKind::Farewell),
    ] {
        for phrase in set {
            if normalized == *phrase
                || (normalized.starts_with(phrase) && normalized.split_whitespace().count() <= 3)
            {
                return Some(IntentLabel::Social(kind));
            }
        }
    }
    None
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn is_list_all(lowered: &str) -> bool {
    LIST_ALL_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

/// Earliest action verb in the utterance decides the action; ties at the
/// same position break in create/update/delete/read order. "change the
/// email, then show it" is an update, not a read.
fn crud_action(lowered: &str) -> Option<CrudAction> {
    let groups: [(&[&str], CrudAction); 4] = [
        (CREATE_VERBS, CrudAction::Create),
        (UPDATE_VERBS, CrudAction::Update),
        (DELETE_VERBS, CrudAction::Delete),
        (READ_VERBS, CrudAction::Read),
    ];

    let mut best: Option<(usize, CrudAction)> = None;
    for (verbs, action) in groups {
        for verb in verbs {
            if let Some(pos) = find_word(lowered, verb) {
                if best.map_or(true, |(seen, _)| pos < seen) {
                    best = Some((pos, action));
                }
            }
        }
    }
    best.map(|(_, action)| action)
}

/// Word-boundary containment: "within" must not match "with", and
/// "details?" must still match "details".
fn contains_word(haystack: &str, word: &str) -> bool {
    find_word(haystack, word).is_some()
}

fn find_word(haystack: &str, word: &str) -> Option<usize> {
    let mut offset = 0;
    for token in haystack.split(|c: char| !c.is_alphanumeric()) {
        if token == word {
            return Some(offset);
        }
        offset += token.len() + 1;
    }
    None
}

/// Strip trailing punctuation so "hi!" and "thanks." hit the exact sets.
fn normalize_social(lowered: &str) -> String {
    lowered
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '!' | '.' | ',' | '?'))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label_of(utterance: &str) -> IntentLabel {
        classify(utterance, false).label
    }

    #[test]
    fn rule_table_order_is_fixed() {
        let names: Vec<&str> = INTENT_RULES.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["crud_verb", "list_all", "search_cue", "social"]);
    }

    #[test]
    fn crud_verbs_map_to_actions() {
        assert_eq!(
            label_of("create a new record for Priya"),
            IntentLabel::Crud(CrudAction::Create)
        );
        assert_eq!(
            label_of("update John's email to j@corp.io"),
            IntentLabel::Crud(CrudAction::Update)
        );
        assert_eq!(
            label_of("fire Bob from the team"),
            IntentLabel::Crud(CrudAction::Delete)
        );
        assert_eq!(
            label_of("show me the details for employee 42"),
            IntentLabel::Crud(CrudAction::Read)
        );
    }

    #[test]
    fn crud_wins_over_search_cues() {
        // "department" is a search cue, but the update verb takes it.
        assert_eq!(
            label_of("update John's department to HR"),
            IntentLabel::Crud(CrudAction::Update)
        );
    }

    #[test]
    fn earliest_verb_decides_the_action() {
        assert_eq!(
            label_of("change the phone number, then show the record"),
            IntentLabel::Crud(CrudAction::Update)
        );
        assert_eq!(
            label_of("show the record before you change it"),
            IntentLabel::Crud(CrudAction::Read)
        );
    }

    #[test]
    fn list_all_beats_the_read_verb() {
        assert_eq!(label_of("show all employees"), IntentLabel::ListAll);
        assert_eq!(label_of("list all employees please"), IntentLabel::ListAll);
        assert_eq!(label_of("can I see the employee list"), IntentLabel::ListAll);
    }

    #[test]
    fn search_cues_fire_for_lookups() {
        assert_eq!(label_of("what's his email?"), IntentLabel::Search);
        assert_eq!(label_of("who knows kubernetes?"), IntentLabel::Search);
        assert_eq!(label_of("how many people joined in 2023"), IntentLabel::Search);
        assert_eq!(
            label_of("compare the QA team's experience"),
            IntentLabel::Search
        );
    }

    #[test]
    fn word_boundaries_respected_in_cues() {
        // "within" contains "with" but neither is a cue; "whoever" must
        // not trip the "who" cue.
        assert_eq!(label_of("whoever wants coffee is welcome"), IntentLabel::Ambiguous);
    }

    #[test]
    fn bare_pronoun_is_search_only_with_active_entity() {
        assert_eq!(
            classify("and what about him?", true).label,
            IntentLabel::Search
        );
        // Without context the same words stay search because of the
        // multi-word cue; a truly bare pronoun falls through.
        assert_eq!(classify("about him then", false).label, IntentLabel::Ambiguous);
        assert_eq!(classify("about him then", true).label, IntentLabel::Search);
    }

    #[test]
    fn social_exact_and_short_trailing_forms() {
        assert_eq!(
            label_of("hi"),
            IntentLabel::Social(SocialKind::Greeting)
        );
        assert_eq!(
            label_of("Hello there!"),
            IntentLabel::Social(SocialKind::Greeting)
        );
        assert_eq!(
            label_of("thanks a lot"),
            IntentLabel::Social(SocialKind::Thanks)
        );
        assert_eq!(
            label_of("good night"),
            IntentLabel::Social(SocialKind::Farewell)
        );
    }

    #[test]
    fn long_sentence_starting_with_greeting_is_not_social() {
        // Four words and a lookup cue: the greeting prefix must not
        // swallow a real question.
        assert_eq!(
            label_of("hey can you find Java developers"),
            IntentLabel::Search
        );
    }

    #[test]
    fn ambiguous_is_the_fallback() {
        assert_eq!(label_of("hmm interesting stuff"), IntentLabel::Ambiguous);
        assert_eq!(label_of(""), IntentLabel::Ambiguous);
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(
            label_of("UPDATE John's DEPARTMENT to HR"),
            IntentLabel::Crud(CrudAction::Update)
        );
        assert_eq!(label_of("SHOW ALL EMPLOYEES"), IntentLabel::ListAll);
    }
}
