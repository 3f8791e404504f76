//! Entity mention extraction and resolution against the directory.
//!
//! Extraction is lexical: an explicit id from the request wins, then an
//! id-shaped token in the text, then a run of capitalized words, then a
//! possessive, then a pronoun. Resolution turns the mention into zero,
//! one, or many candidates; the caller's guard chain decides what a
//! MANY or NONE means for the turn.

use std::sync::OnceLock;

use regex::Regex;

use ca_directory::EmployeeStore;
use ca_domain::error::Result;
use ca_domain::types::{EmployeeId, Mention, Resolution};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Mention extraction
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Sentence-position capitals that are not names. Keeps "Update Arun"
/// from resolving to an employee called Update.
const NAME_STOPWORDS: &[&str] = &[
    "create", "add", "new", "insert", "register", "update", "change", "modify", "edit", "set",
    "delete", "remove", "fire", "terminate", "show", "get", "display", "view", "details", "what",
    "who", "which", "where", "when", "how", "why", "is", "are", "does", "do", "did", "can",
    "could", "would", "will", "please", "the", "a", "an", "tell", "give", "find", "list", "i",
    "we", "my", "hi", "hello", "hey", "thanks", "thank", "good", "ok", "okay", "yes", "no",
    "employee",
];

const PRONOUNS: &[&str] = &[
    "his", "her", "their", "he", "she", "him", "them", "they", "its",
];

fn id_phrase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:employee|emp|id)\s*#?\s*(\d+)\b").unwrap())
}

fn bare_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Six digits is the directory's display width; shorter bare numbers
    // are too likely to be years or counts.
    RE.get_or_init(|| Regex::new(r"\b(\d{6})\b").unwrap())
}

fn possessive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b([A-Za-z]+)'s\b").unwrap())
}

/// Pick the most specific entity reference out of the utterance.
pub fn extract_mention(utterance: &str, explicit_id: Option<EmployeeId>) -> Mention {
    if let Some(id) = explicit_id {
        return Mention::Id(id);
    }

    if let Some(caps) = id_phrase_re().captures(utterance) {
        if let Ok(n) = caps[1].parse::<u32>() {
            return Mention::Id(EmployeeId(n));
        }
    }
    if let Some(caps) = bare_id_re().captures(utterance) {
        if let Ok(n) = caps[1].parse::<u32>() {
            return Mention::Id(EmployeeId(n));
        }
    }

    if let Some(name) = capitalized_run(utterance) {
        return Mention::Name(name);
    }

    // Lowercased possessive still names somebody: "john's email".
    if let Some(caps) = possessive_re().captures(utterance) {
        let word = caps[1].to_lowercase();
        if !NAME_STOPWORDS.contains(&word.as_str()) && !PRONOUNS.contains(&word.as_str()) {
            return Mention::Name(caps[1].to_string());
        }
    }

    let lowered = utterance.to_lowercase();
    if PRONOUNS
        .iter()
        .any(|p| lowered.split(|c: char| !c.is_alphanumeric()).any(|t| t == *p))
    {
        return Mention::Pronoun;
    }

    Mention::None
}

/// First contiguous run of capitalized tokens that are not stopwords.
/// Possessive suffixes and trailing punctuation are stripped; short
/// all-caps tokens (IT, HR, QA) are department codes, not names.
fn capitalized_run(utterance: &str) -> Option<String> {
    let mut run: Vec<String> = Vec::new();
    for raw in utterance.split_whitespace() {
        let token = raw
            .trim_end_matches(|c: char| !c.is_alphanumeric())
            .trim_start_matches(|c: char| !c.is_alphanumeric());
        let token = token.strip_suffix("'s").unwrap_or(token);

        let is_name_token = token
            .chars()
            .next()
            .map_or(false, |c| c.is_uppercase())
            && !NAME_STOPWORDS.contains(&token.to_lowercase().as_str())
            && !(token.len() <= 3 && token.chars().all(|c| c.is_uppercase()));

        if is_name_token {
            run.push(token.to_string());
        } else if !run.is_empty() {
            break;
        }
    }
    if run.is_empty() {
        None
    } else {
        Some(run.join(" "))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Resolution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Map a mention to directory candidates. Pronouns resolve through the
/// session's active entity; an id only resolves if the record exists.
pub async fn resolve(
    mention: &Mention,
    active: Option<EmployeeId>,
    store: &dyn EmployeeStore,
) -> Result<Resolution> {
    match mention {
        Mention::Id(id) => Ok(match store.find_by_id(*id).await? {
            Some(e) => Resolution::one(e),
            None => Resolution::none(),
        }),
        Mention::Name(name) => {
            let mut matches = store.find_by_name_contains(name).await?;
            Ok(match matches.len() {
                0 => Resolution::none(),
                1 => Resolution::one(matches.remove(0)),
                _ => Resolution::many(matches),
            })
        }
        Mention::Pronoun => {
            let Some(id) = active else {
                return Ok(Resolution::none());
            };
            Ok(match store.find_by_id(id).await? {
                Some(e) => Resolution::one(e).via_pronoun(),
                None => Resolution::none(),
            })
        }
        Mention::None => Ok(Resolution::none()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ca_directory::{EmployeeDraft, MemoryDirectory};
    use ca_domain::types::ResolutionStatus;

    #[test]
    fn explicit_id_wins_over_text() {
        let m = extract_mention("update John's email", Some(EmployeeId(7)));
        assert_eq!(m, Mention::Id(EmployeeId(7)));
    }

    #[test]
    fn id_phrases_are_extracted() {
        assert_eq!(
            extract_mention("update employee 123 email to x@y.com", None),
            Mention::Id(EmployeeId(123))
        );
        assert_eq!(
            extract_mention("delete emp #42", None),
            Mention::Id(EmployeeId(42))
        );
        assert_eq!(
            extract_mention("show 000042", None),
            Mention::Id(EmployeeId(42))
        );
    }

    #[test]
    fn short_bare_numbers_are_not_ids() {
        // "2023" is a year, not a record.
        assert_eq!(extract_mention("who joined in 2023", None), Mention::None);
    }

    #[test]
    fn capitalized_runs_become_names() {
        assert_eq!(
            extract_mention("Update Arun from IT to HR department", None),
            Mention::Name("Arun".to_string())
        );
        assert_eq!(
            extract_mention("Create employee John Smith in IT", None),
            Mention::Name("John Smith".to_string())
        );
        assert_eq!(
            extract_mention("create John", None),
            Mention::Name("John".to_string())
        );
    }

    #[test]
    fn possessives_name_the_entity() {
        assert_eq!(
            extract_mention("update John's department to HR", None),
            Mention::Name("John".to_string())
        );
        assert_eq!(
            extract_mention("what is john's email", None),
            Mention::Name("john".to_string())
        );
    }

    #[test]
    fn department_codes_are_not_names() {
        // IT and HR are all-caps short tokens; Arun is the only name.
        assert_eq!(
            extract_mention("move Arun to IT", None),
            Mention::Name("Arun".to_string())
        );
    }

    #[test]
    fn pronouns_fall_through_to_pronoun_mention() {
        assert_eq!(extract_mention("what's his email?", None), Mention::Pronoun);
        assert_eq!(
            extract_mention("show their phone number", None),
            Mention::Pronoun
        );
    }

    #[test]
    fn no_reference_yields_none() {
        assert_eq!(extract_mention("list all employees", None), Mention::None);
        assert_eq!(extract_mention("thanks", None), Mention::None);
    }

    async fn seeded_store() -> MemoryDirectory {
        let store = MemoryDirectory::new();
        for name in ["John Smith", "John Doe", "Priya Patel"] {
            store
                .insert(EmployeeDraft::named(name))
                .await
                .expect("seed insert");
        }
        store
    }

    #[tokio::test]
    async fn id_resolution_round_trips() {
        let store = seeded_store().await;
        let all = store.list_all().await.expect("list");
        let id = all[0].id;

        let r = resolve(&Mention::Id(id), None, &store).await.expect("resolve");
        assert_eq!(r.status, ResolutionStatus::One);
        assert_eq!(r.resolved_id(), Some(id));

        let r = resolve(&Mention::Id(EmployeeId(999_999)), None, &store)
            .await
            .expect("resolve");
        assert_eq!(r.status, ResolutionStatus::None);
    }

    #[tokio::test]
    async fn name_resolution_handles_one_and_many() {
        let store = seeded_store().await;

        let r = resolve(&Mention::Name("Priya".into()), None, &store)
            .await
            .expect("resolve");
        assert_eq!(r.status, ResolutionStatus::One);

        let r = resolve(&Mention::Name("John".into()), None, &store)
            .await
            .expect("resolve");
        assert_eq!(r.status, ResolutionStatus::Many);
        assert_eq!(r.candidates.len(), 2);
        // Candidates come back ordered by id so clarification lists are
        // stable across turns.
        assert!(r.candidates[0].id.0 < r.candidates[1].id.0);
    }

    #[tokio::test]
    async fn name_matching_is_case_insensitive() {
        let store = seeded_store().await;
        let r = resolve(&Mention::Name("priya".into()), None, &store)
            .await
            .expect("resolve");
        assert_eq!(r.status, ResolutionStatus::One);
    }

    #[tokio::test]
    async fn pronoun_resolves_through_active_entity() {
        let store = seeded_store().await;
        let all = store.list_all().await.expect("list");
        let id = all[2].id;

        let r = resolve(&Mention::Pronoun, Some(id), &store)
            .await
            .expect("resolve");
        assert_eq!(r.status, ResolutionStatus::One);
        assert!(r.via_pronoun);
        assert_eq!(r.resolved_id(), Some(id));
    }

    #[tokio::test]
    async fn pronoun_without_active_entity_is_none() {
        let store = seeded_store().await;
        let r = resolve(&Mention::Pronoun, None, &store).await.expect("resolve");
        assert_eq!(r.status, ResolutionStatus::None);
        assert!(!r.via_pronoun);
    }

    #[tokio::test]
    async fn resolution_is_idempotent() {
        let store = seeded_store().await;
        let first = resolve(&Mention::Name("John".into()), None, &store)
            .await
            .expect("resolve");
        let second = resolve(&Mention::Name("John".into()), None, &store)
            .await
            .expect("resolve");
        assert_eq!(first.status, second.status);
        let ids = |r: &Resolution| r.candidates.iter().map(|e| e.id).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }
}
