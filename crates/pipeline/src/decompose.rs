//! Compound-utterance decomposition.
//!
//! Detection is purely lexical and deliberately conservative: a model
//! round-trip to segment a question that was never compound is the
//! most expensive false positive in the pipeline. CRUD turns are never
//! decomposed regardless of surface shape; an update payload like
//! "change the email and the phone" is one mutation, and splitting it
//! would turn a single confirmable proposal into two half-applied ones.

use ca_domain::types::{IntentLabel, Subtask};
use ca_providers::json::parse_json_array;
use serde_json::Value;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Detection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Conjunction fragments that chain a second request onto the first.
const TASK_CONJUNCTIONS: &[&str] = &[
    "and what",
    "and who",
    "and how",
    "and count",
    "and compare",
    "and tell",
    "and show",
    "and list",
    "and find",
    "also tell",
    "also show",
    "also find",
    ", compare",
    ", then",
];

const QUESTION_WORDS: &[&str] = &[
    "what", "who", "how many", "count", "compare", "list", "show", "find",
];

const POSSESSIVE_TOPICS: &[&str] = &["skills", "email", "phone", "experience", "education"];

/// True when the utterance carries more than one askable thing.
///
/// Three independent signals: an explicit task conjunction, three or
/// more question words, or two or more "X's skills"-style possessive
/// references (two different people's fields in one breath).
pub fn is_compound(utterance: &str, intent: IntentLabel) -> bool {
    if intent.is_crud() {
        return false;
    }
    let lowered = utterance.to_lowercase();

    if TASK_CONJUNCTIONS.iter().any(|c| lowered.contains(c)) {
        return true;
    }

    let question_hits: usize = QUESTION_WORDS
        .iter()
        .filter(|w| {
            if w.contains(' ') {
                lowered.contains(*w)
            } else {
                lowered
                    .split(|c: char| !c.is_alphanumeric())
                    .any(|t| t == **w)
            }
        })
        .count();
    if question_hits >= 3 {
        return true;
    }

    possessive_reference_count(&lowered) >= 2
}

fn possessive_reference_count(lowered: &str) -> usize {
    // "<name>'s <topic>" pairs, counted by scanning tokens; a regex
    // would work too but the token walk keeps this allocation-free.
    let tokens: Vec<&str> = lowered.split_whitespace().collect();
    tokens
        .windows(2)
        .filter(|pair| {
            pair[0].ends_with("'s")
                && pair[0].len() > 2
                && POSSESSIVE_TOPICS
                    .iter()
                    .any(|topic| pair[1].trim_matches(|c: char| !c.is_alphanumeric()) == *topic)
        })
        .count()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Segmentation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Extraction-mode prompt asking the model to split the utterance into
/// an ordered JSON task array.
pub fn segmentation_prompt(utterance: &str) -> String {
    format!(
        r#"Break the user's request into separate subtasks.

Rules:
1. Each subtask must be a single, focused question.
2. Preserve the order the user asked in.
3. Label each subtask's type as "search", "count", or "compare".
4. If a subtask needs the result of an earlier one, set "depends_on" to that task's id (or a list of ids). Otherwise use null.
5. Return ONLY the JSON array, nothing else.

Example request: "What are Priya's skills, and how many people are in QA? Compare her experience with Marcus."
Example output:
[
  {{"task_id": 1, "query": "What are Priya's skills?", "type": "search", "depends_on": null}},
  {{"task_id": 2, "query": "How many people are in QA?", "type": "count", "depends_on": null}},
  {{"task_id": 3, "query": "Compare Priya's experience with Marcus's experience", "type": "compare", "depends_on": 1}}
]

User request: "{utterance}"

JSON array:"#
    )
}

/// Parse the model's segmentation answer into subtasks, tolerating the
/// numeric ids and scalar `depends_on` values models actually emit.
/// Anything unparseable degrades to a single task holding the whole
/// utterance, so a bad segmentation never loses the question.
pub fn parse_subtasks(raw: &str, utterance: &str, max: usize) -> Vec<Subtask> {
    let items = match parse_json_array(raw) {
        Ok(items) => items,
        Err(_) => return vec![whole_utterance_task(utterance)],
    };

    let mut subtasks = Vec::new();
    for item in items {
        let Value::Object(map) = item else { continue };
        let Some(text) = string_field(&map, "query").or_else(|| string_field(&map, "text")) else {
            continue;
        };
        if text.trim().is_empty() {
            continue;
        }
        let id = map
            .get("task_id")
            .or_else(|| map.get("id"))
            .map(scalar_to_string)
            .unwrap_or_else(|| (subtasks.len() + 1).to_string());
        let kind = string_field(&map, "type")
            .or_else(|| string_field(&map, "kind"))
            .unwrap_or_default();
        let depends_on = match map.get("depends_on") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(deps)) => deps.iter().map(scalar_to_string).collect(),
            Some(other) => vec![scalar_to_string(other)],
        };
        subtasks.push(Subtask {
            id,
            text,
            kind,
            depends_on,
        });
        if subtasks.len() == max {
            break;
        }
    }

    if subtasks.is_empty() {
        return vec![whole_utterance_task(utterance)];
    }
    subtasks
}

fn whole_utterance_task(utterance: &str) -> Subtask {
    Subtask {
        id: "1".to_string(),
        text: utterance.to_string(),
        kind: String::new(),
        depends_on: Vec::new(),
    }
}

fn string_field(map: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Planning
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug)]
pub struct PlannedTask<'a> {
    pub subtask: &'a Subtask,
    /// Rounds this task waited on unfinished dependencies. Only used
    /// for tracing.
    pub deferred_rounds: usize,
}

/// Order subtasks so that dependencies run first. Tasks whose deps are
/// all satisfied run in listed order within a round; a round that makes
/// no progress (dependency cycle or a dangling id) drains the remainder
/// in listed order rather than stalling.
pub fn plan(subtasks: &[Subtask]) -> Vec<PlannedTask<'_>> {
    let mut done: Vec<&str> = Vec::new();
    let mut pending: Vec<(usize, &Subtask)> = subtasks.iter().enumerate().collect();
    let mut ordered = Vec::with_capacity(subtasks.len());
    let mut rounds = 0usize;

    while !pending.is_empty() {
        let (ready, deferred): (Vec<_>, Vec<_>) = pending.into_iter().partition(|(_, task)| {
            task.depends_on
                .iter()
                .all(|dep| done.iter().any(|d| d == dep))
        });

        if ready.is_empty() {
            for (_, task) in deferred {
                ordered.push(PlannedTask {
                    subtask: task,
                    deferred_rounds: rounds,
                });
            }
            break;
        }

        for (_, task) in ready {
            done.push(task.id.as_str());
            ordered.push(PlannedTask {
                subtask: task,
                deferred_rounds: rounds,
            });
        }
        pending = deferred;
        rounds += 1;
    }

    ordered
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Aggregation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Prompt that folds per-subtask results back into one reply.
pub fn aggregation_prompt(original: &str, results: &[(String, String)]) -> String {
    let mut blocks = String::new();
    for (i, (query, response)) in results.iter().enumerate() {
        blocks.push_str(&format!("[Task {}] {}\nResult: {}\n\n", i + 1, query, response));
    }
    format!(
        r#"The user asked: "{original}"

The question was answered in parts:

{blocks}Rules:
1. Combine the results into one organized answer.
2. Use bullet points where they help.
3. If a part compared things, state the conclusion of the comparison.
4. Be concise; do not repeat the task structure back.
5. If a part failed or had no result, say so briefly.

Provide a natural, conversational response:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ca_domain::types::CrudAction;

    #[test]
    fn conjunctions_mark_compound() {
        assert!(is_compound(
            "what are Priya's skills and who else knows python?",
            IntentLabel::Search
        ));
        assert!(is_compound(
            "list QA engineers, then count the whole department",
            IntentLabel::Search
        ));
    }

    #[test]
    fn three_question_words_mark_compound() {
        assert!(is_compound(
            "who is in QA, what do they work on, and how many joined this year?",
            IntentLabel::Search
        ));
        // Two question words are a normal single query.
        assert!(!is_compound(
            "who knows what framework?",
            IntentLabel::Search
        ));
    }

    #[test]
    fn two_possessive_references_mark_compound() {
        assert!(is_compound(
            "give me Priya's skills alongside Marcus's experience",
            IntentLabel::Search
        ));
        assert!(!is_compound("give me Priya's skills", IntentLabel::Search));
    }

    #[test]
    fn crud_is_never_compound() {
        // Every detection signal present, still not compound.
        let loaded =
            "update Priya's email and what is Marcus's phone, and compare and count and list";
        for action in [
            CrudAction::Create,
            CrudAction::Read,
            CrudAction::Update,
            CrudAction::Delete,
        ] {
            assert!(!is_compound(loaded, IntentLabel::Crud(action)));
        }
        assert!(is_compound(loaded, IntentLabel::Search));
    }

    #[test]
    fn segmentation_prompt_carries_the_utterance() {
        let p = segmentation_prompt("what are Ana's skills and who manages QA?");
        assert!(p.contains("what are Ana's skills and who manages QA?"));
        assert!(p.contains("ONLY the JSON array"));
    }

    #[test]
    fn parse_accepts_numeric_ids_and_scalar_deps() {
        let raw = r#"[
            {"task_id": 1, "query": "first", "type": "search", "depends_on": null},
            {"task_id": 2, "query": "second", "type": "compare", "depends_on": 1},
            {"task_id": 3, "query": "third", "type": "count", "depends_on": [1, 2]}
        ]"#;
        let tasks = parse_subtasks(raw, "orig", 5);
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].id, "1");
        assert!(tasks[0].depends_on.is_empty());
        assert_eq!(tasks[1].depends_on, vec!["1".to_string()]);
        assert_eq!(tasks[2].depends_on, vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn parse_survives_fences_and_prose() {
        let raw = "Sure! Here are the subtasks:\n```json\n[{\"task_id\": 1, \"query\": \"only one\", \"type\": \"search\", \"depends_on\": null}]\n```";
        let tasks = parse_subtasks(raw, "orig", 5);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "only one");
    }

    #[test]
    fn parse_caps_at_max() {
        let raw = r#"[
            {"task_id": 1, "query": "a"}, {"task_id": 2, "query": "b"},
            {"task_id": 3, "query": "c"}, {"task_id": 4, "query": "d"}
        ]"#;
        let tasks = parse_subtasks(raw, "orig", 2);
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn unparseable_answers_fall_back_to_whole_utterance() {
        let tasks = parse_subtasks("no json here", "the original question", 5);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "the original question");
        assert_eq!(tasks[0].id, "1");

        let empty = parse_subtasks("[]", "the original question", 5);
        assert_eq!(empty.len(), 1);
        assert_eq!(empty[0].text, "the original question");
    }

    #[test]
    fn items_without_text_are_skipped() {
        let raw = r#"[{"task_id": 1}, {"task_id": 2, "query": "real"}]"#;
        let tasks = parse_subtasks(raw, "orig", 5);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "real");
    }

    fn task(id: &str, deps: &[&str]) -> Subtask {
        Subtask {
            id: id.to_string(),
            text: format!("task {id}"),
            kind: String::new(),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn plan_runs_dependencies_first() {
        // t2 depends on t3, which is listed after it.
        let tasks = vec![task("2", &["3"]), task("3", &[])];
        let ordered = plan(&tasks);
        assert_eq!(ordered[0].subtask.id, "3");
        assert_eq!(ordered[0].deferred_rounds, 0);
        assert_eq!(ordered[1].subtask.id, "2");
        assert_eq!(ordered[1].deferred_rounds, 1);
    }

    #[test]
    fn plan_preserves_listed_order_for_independent_tasks() {
        let tasks = vec![task("1", &[]), task("2", &[]), task("3", &[])];
        let ids: Vec<&str> = plan(&tasks).iter().map(|p| p.subtask.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn cyclic_dependencies_degrade_to_listed_order() {
        let tasks = vec![task("1", &["2"]), task("2", &["1"])];
        let ids: Vec<&str> = plan(&tasks).iter().map(|p| p.subtask.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn dangling_dependency_does_not_stall() {
        let tasks = vec![task("1", &[]), task("2", &["99"])];
        let ordered = plan(&tasks);
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[0].subtask.id, "1");
        assert_eq!(ordered[1].subtask.id, "2");
    }

    #[test]
    fn aggregation_prompt_numbers_the_parts() {
        let results = vec![
            ("skills of Ana".to_string(), "Rust, Go".to_string()),
            ("QA headcount".to_string(), "4".to_string()),
        ];
        let p = aggregation_prompt("tell me about Ana and QA", &results);
        assert!(p.contains("[Task 1] skills of Ana"));
        assert!(p.contains("Result: Rust, Go"));
        assert!(p.contains("[Task 2] QA headcount"));
        assert!(p.contains("tell me about Ana and QA"));
    }
}
