//! Grounded prompt assembly.
//!
//! Block order inside the prompt is fixed: instruction, entity record,
//! retrieved excerpts, conversation history, then the question. The
//! anti-fabrication instruction comes first so it governs everything
//! the model reads after it, and the question comes last so the model
//! answers the user instead of summarizing the context.

use ca_domain::types::{Employee, Exchange, SocialKind};
use ca_retrieval::Passage;

/// How much of a record's raw source text rides along in the prompt.
const RAW_TEXT_LIMIT: usize = 1000;

pub struct PromptContext<'a> {
    pub utterance: &'a str,
    /// The resolved entity, when the turn has exactly one.
    pub entity: Option<&'a Employee>,
    pub passages: &'a [Passage],
    pub history: &'a [Exchange],
    pub leading_question: bool,
    pub via_pronoun: bool,
    /// Full-directory context for list-flavored questions that resolved
    /// no single entity.
    pub record_set: Option<&'a [Employee]>,
}

impl<'a> PromptContext<'a> {
    pub fn new(utterance: &'a str) -> Self {
        Self {
            utterance,
            entity: None,
            passages: &[],
            history: &[],
            leading_question: false,
            via_pronoun: false,
            record_set: None,
        }
    }
}

/// Assemble the grounded prompt for a conversational answer.
pub fn build_grounded(ctx: &PromptContext) -> String {
    let mut out = String::from(
        "You are an assistant answering questions about employee records.\n\
         Answer using only information from the context below. Do not invent or assume \
         any detail that is not explicitly present. If the context does not contain \
         enough information to answer, say so plainly.\n",
    );
    if ctx.leading_question {
        out.push_str(
            "The user's message may assert something as fact. Verify it against the \
             context; if it is not supported, correct the user rather than agreeing.\n",
        );
    }
    if ctx.via_pronoun {
        out.push_str(
            "When the user says 'he', 'she' or 'they', they mean the employee shown in \
             the record below.\n",
        );
    }

    if let Some(entity) = ctx.entity {
        out.push_str("\nEmployee record:\n");
        out.push_str(&record_block(entity));
    } else if let Some(records) = ctx.record_set {
        out.push_str("\nEmployee records:\n");
        for record in records {
            out.push_str(&format!("- {}\n", record.summary_line()));
        }
    }

    if !ctx.passages.is_empty() {
        out.push_str("\nRelevant excerpts:\n");
        for passage in ctx.passages {
            out.push_str(&format!("- {}\n", passage.text.trim()));
        }
    }

    if !ctx.history.is_empty() {
        out.push_str("\nConversation so far:\n");
        for exchange in ctx.history {
            out.push_str(&format!("{}: {}\n", exchange.role.as_str(), exchange.text));
        }
    }

    out.push_str(&format!("\nUser question:\n{}", ctx.utterance));
    out
}

fn record_block(entity: &Employee) -> String {
    let mut block = format!("Name: {}\nID: {}\n", entity.name, entity.id);
    if let Some(email) = &entity.email {
        block.push_str(&format!("Email: {email}\n"));
    }
    if let Some(phone) = &entity.phone {
        block.push_str(&format!("Phone: {phone}\n"));
    }
    if let Some(department) = &entity.department {
        block.push_str(&format!("Department: {department}\n"));
    }
    if let Some(position) = &entity.position {
        block.push_str(&format!("Position: {position}\n"));
    }
    if !entity.skills.is_empty() {
        block.push_str(&format!("Skills: {}\n", entity.skills.join(", ")));
    }
    if !entity.experience.is_empty() {
        block.push_str(&format!("Experience: {}\n", entity.experience.join("; ")));
    }
    if !entity.education.is_empty() {
        block.push_str(&format!("Education: {}\n", entity.education.join("; ")));
    }
    if let Some(raw) = &entity.raw_text {
        block.push_str(&format!("Source text: {}\n", truncate_chars(raw, RAW_TEXT_LIMIT)));
    }
    block
}

/// Char-boundary-safe prefix; a byte slice could split a multibyte
/// character.
fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Conversational prompt for social turns; no grounding context needed.
pub fn build_social(kind: SocialKind) -> String {
    let cue = match kind {
        SocialKind::Greeting => {
            "The user greeted you. Greet them back in one short sentence and offer to \
             help with employee records."
        }
        SocialKind::Thanks => {
            "The user thanked you. Acknowledge briefly in one short sentence."
        }
        SocialKind::Farewell => {
            "The user is saying goodbye. Close the conversation in one short sentence."
        }
    };
    format!(
        "You are a friendly assistant for an employee directory.\n{cue}\nDo not invent \
         any employee information."
    )
}

/// Direct list-all answer. No model call involved.
pub fn render_employee_list(employees: &[Employee]) -> String {
    if employees.is_empty() {
        return "There are no employees on record yet.".to_string();
    }
    let mut out = format!("Here are all employees ({}):\n", employees.len());
    for employee in employees {
        out.push_str(&format!("- {}\n", employee.summary_line()));
    }
    out.trim_end().to_string()
}
