//! Turn orchestration.
//!
//! [`Pipeline::handle_turn`] runs the full stage sequence for one
//! utterance: classify, extract and resolve the mention, evaluate the
//! guard chain, then branch into the social, list-all, CRUD, or
//! grounded-answer flow. Session state changes accumulate in a
//! [`TurnCommit`] and land in one atomic store call at the end; an
//! `Err` anywhere (including cancellation) commits nothing, so a failed
//! turn leaves the conversation exactly where it was.
//!
//! Model and retrieval calls go through two chokepoints, `generate` and
//! `search`, which check the cancel token, bound the call with a
//! timeout, and emit the trace event. No other code in this crate talks
//! to those services directly.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use ca_directory::duplicate::policy_for;
use ca_directory::{DuplicatePolicy, EmployeeStore};
use ca_domain::config::Config;
use ca_domain::error::{Error, Result};
use ca_domain::trace::TraceEvent;
use ca_domain::types::{
    CrudAction, Employee, EmployeeId, Exchange, IntentLabel, ModelOutput, Proposal, Resolution,
    ResolutionStatus, SocialKind, Subtask, TurnOutcome, TurnReply, TurnRequest,
};
use ca_providers::{GenerateRequest, GenerateResponse, LanguageModel};
use ca_retrieval::{Passage, RetrievalService};
use ca_sessions::{Session, SessionStore, TranscriptWriter, TurnCommit};

use crate::cancel::{CancelMap, CancelToken};
use crate::decompose;
use crate::guards::{self, Annotations, GuardInput, GuardOutcome};
use crate::intent;
use crate::prompt::{self, PromptContext};
use crate::proposal::{self, ProposalStore};
use crate::resolve;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pipeline
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Pipeline {
    model: Arc<dyn LanguageModel>,
    store: Arc<dyn EmployeeStore>,
    retrieval: Arc<dyn RetrievalService>,
    sessions: Arc<dyn SessionStore>,
    transcripts: Option<Arc<TranscriptWriter>>,
    proposals: ProposalStore,
    cancels: CancelMap,
    duplicates: Arc<dyn DuplicatePolicy>,
    config: Config,
}

impl Pipeline {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        store: Arc<dyn EmployeeStore>,
        retrieval: Arc<dyn RetrievalService>,
        sessions: Arc<dyn SessionStore>,
        config: Config,
    ) -> Self {
        let duplicates = policy_for(config.directory.duplicate_policy);
        Self {
            model,
            store,
            retrieval,
            sessions,
            transcripts: None,
            proposals: ProposalStore::new(),
            cancels: CancelMap::new(),
            duplicates,
            config,
        }
    }

    pub fn with_transcripts(mut self, writer: Arc<TranscriptWriter>) -> Self {
        self.transcripts = Some(writer);
        self
    }

    pub fn with_duplicate_policy(mut self, policy: Arc<dyn DuplicatePolicy>) -> Self {
        self.duplicates = policy;
        self
    }

    /// Request cancellation of the session's in-flight turn, if any.
    pub fn cancel(&self, session_id: &str) -> bool {
        self.cancels.cancel(session_id)
    }

    /// Drop pending proposals past their TTL. The gateway calls this on
    /// a background interval.
    pub fn sweep_proposals(&self) -> usize {
        self.proposals
            .sweep_expired(i64::from(self.config.pipeline.pending_proposal_ttl_minutes))
    }

    // ──────────────────────────────────────────────────────────────
    // Entry points
    // ──────────────────────────────────────────────────────────────

    /// Run one utterance through the full pipeline.
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnReply> {
        let started = Instant::now();
        let (session, _) = self
            .sessions
            .resolve_or_create(request.session_id.as_deref())
            .await;
        let session_id = session.session_id.clone();

        let token = self.cancels.register(&session_id);
        let result = self
            .run_turn(&session, &request, &token)
            .instrument(info_span!("turn", session_id = %session_id))
            .await;
        self.cancels.remove(&session_id);

        let plan = match result {
            Ok(plan) => plan,
            Err(e) => {
                TraceEvent::TurnFailed {
                    session_id: session_id.clone(),
                    error: e.to_string(),
                }
                .emit();
                return Err(e);
            }
        };

        self.finish_turn(&session_id, plan, started).await
    }

    /// Consume a pending proposal by id and apply it. Used by the
    /// confirmation endpoint; conversational "confirm" replies route
    /// through [`handle_turn`] instead.
    pub async fn confirm_proposal(&self, proposal_id: Uuid) -> Result<TurnReply> {
        let started = Instant::now();
        let Some(pending) = self.proposals.take(proposal_id) else {
            return Err(Error::ProposalNotFound(proposal_id.to_string()));
        };
        let (session, _) = self
            .sessions
            .resolve_or_create(Some(&pending.session_id))
            .await;
        let session_id = session.session_id.clone();

        let plan = self.apply_proposal(&session, "confirm", pending).await?;
        self.finish_turn(&session_id, plan, started).await
    }

    /// Commit the plan, write the transcript, emit the completion event,
    /// and shape the reply. Shared tail of both entry points.
    async fn finish_turn(
        &self,
        session_id: &str,
        plan: TurnPlan,
        started: Instant,
    ) -> Result<TurnReply> {
        let appends = plan.commit.appends.clone();
        self.sessions.commit(session_id, plan.commit).await?;

        if let Some(transcripts) = &self.transcripts {
            if !appends.is_empty() {
                // Audit trail, not conversation state: log and move on.
                if let Err(e) = transcripts.append_exchanges(session_id, &appends).await {
                    tracing::warn!(error = %e, "transcript append failed");
                }
            }
        }

        TraceEvent::TurnCompleted {
            session_id: session_id.to_string(),
            outcome: plan.outcome.as_str().to_string(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();

        Ok(TurnReply {
            reply: plan.reply,
            session_id: session_id.to_string(),
            resolved_entity_id: plan.resolved_entity_id,
            pending_proposal_id: plan.pending_proposal_id,
            outcome: plan.outcome,
        })
    }

    // ──────────────────────────────────────────────────────────────
    // Stage sequence
    // ──────────────────────────────────────────────────────────────

    async fn run_turn(
        &self,
        session: &Session,
        request: &TurnRequest,
        cancel: &CancelToken,
    ) -> Result<TurnPlan> {
        let utterance = request.utterance.trim();
        let session_id = session.session_id.as_str();

        // A pending proposal intercepts bare confirm/discard replies
        // before classification would misread them.
        if let Some(pending_id) = session.pending_proposal {
            if let Some(word) = pending_word(utterance) {
                return self.settle_pending(session, utterance, pending_id, word).await;
            }
        }

        let decision = intent::classify(utterance, session.has_active_entity());
        TraceEvent::IntentClassified {
            session_id: session_id.to_string(),
            intent: decision.label.label(),
            rule: decision.rule.to_string(),
        }
        .emit();

        let mention = resolve::extract_mention(utterance, request.explicit_entity_id);
        let resolution =
            resolve::resolve(&mention, session.active_entity, self.store.as_ref()).await?;
        TraceEvent::EntityResolved {
            session_id: session_id.to_string(),
            status: status_str(resolution.status).to_string(),
            candidates: resolution.candidates.len(),
            via_pronoun: resolution.via_pronoun,
        }
        .emit();

        let known_names = self.name_sample().await?;
        let outcome = guards::evaluate(&GuardInput {
            utterance,
            intent: decision.label,
            resolution: &resolution,
            mention: &mention,
            has_active_entity: session.has_active_entity(),
            known_names: &known_names,
            min_chars: self.config.pipeline.short_utterance_min_chars,
        });
        let annotations = match outcome {
            GuardOutcome::Clarify { kind, message } => {
                TraceEvent::GuardTripped {
                    session_id: session_id.to_string(),
                    guard: kind.as_str().to_string(),
                }
                .emit();
                return Ok(TurnPlan::exchange(utterance, message, TurnOutcome::Clarification));
            }
            GuardOutcome::Proceed(annotations) => annotations,
        };

        match decision.label {
            IntentLabel::Social(kind) => self.social_turn(session_id, utterance, kind, cancel).await,
            IntentLabel::ListAll => self.list_all_turn(utterance).await,
            IntentLabel::Crud(action) => {
                self.crud_turn(session, utterance, action, cancel).await
            }
            IntentLabel::Search | IntentLabel::Ambiguous => {
                self.informational_turn(session, utterance, decision.label, &resolution, annotations, cancel)
                    .await
            }
        }
    }

    // ──────────────────────────────────────────────────────────────
    // Informational flow
    // ──────────────────────────────────────────────────────────────

    async fn informational_turn(
        &self,
        session: &Session,
        utterance: &str,
        label: IntentLabel,
        resolution: &Resolution,
        annotations: Annotations,
        cancel: &CancelToken,
    ) -> Result<TurnPlan> {
        if decompose::is_compound(utterance, label) {
            return self.compound_turn(session, utterance, resolution, cancel).await;
        }

        let session_id = session.session_id.as_str();
        let entity = resolution.single();
        let passages = match entity {
            Some(e) => self.search(session_id, utterance, Some(e.id), cancel).await?,
            None => Vec::new(),
        };

        let history: Vec<Exchange> = session.history.iter().cloned().collect();
        let records;
        let mut ctx = PromptContext::new(utterance);
        ctx.entity = entity;
        ctx.passages = &passages;
        ctx.history = &history;
        ctx.leading_question = annotations.leading_question;
        ctx.via_pronoun = resolution.via_pronoun;
        if entity.is_none() {
            // No single record to scope to: ground in the full record set.
            records = self.store.list_all().await?;
            ctx.record_set = Some(&records);
        }

        let reply = self
            .generate(
                session_id,
                GenerateRequest::conversational(prompt::build_grounded(&ctx)),
                cancel,
            )
            .await?
            .text;

        let mut plan = TurnPlan::exchange(utterance, reply, TurnOutcome::Answered);
        if let Some(e) = entity {
            plan = plan.with_entity(e.id);
        }
        Ok(plan)
    }

    async fn compound_turn(
        &self,
        session: &Session,
        utterance: &str,
        resolution: &Resolution,
        cancel: &CancelToken,
    ) -> Result<TurnPlan> {
        let session_id = session.session_id.as_str();
        let segmentation = self
            .generate(
                session_id,
                GenerateRequest::extraction(decompose::segmentation_prompt(utterance)),
                cancel,
            )
            .await?;
        let subtasks = decompose::parse_subtasks(
            &segmentation.text,
            utterance,
            self.config.pipeline.max_subtasks,
        );
        TraceEvent::DecompositionStarted {
            session_id: session_id.to_string(),
            subtasks: subtasks.len(),
        }
        .emit();

        let anchor = resolution.single();
        let mut results: Vec<(String, String)> = Vec::new();
        for task in decompose::plan(&subtasks) {
            let answer = self
                .subtask_answer(session, task.subtask, &results, anchor, cancel)
                .await?;
            TraceEvent::SubtaskFinished {
                session_id: session_id.to_string(),
                task_id: task.subtask.id.clone(),
                deferred_rounds: task.deferred_rounds,
            }
            .emit();
            results.push((task.subtask.text.clone(), answer));
        }

        let aggregate = self
            .generate(
                session_id,
                GenerateRequest::conversational(decompose::aggregation_prompt(utterance, &results)),
                cancel,
            )
            .await?
            .text;

        let mut plan = TurnPlan::exchange(utterance, aggregate, TurnOutcome::Answered);
        if let Some(e) = resolution.single() {
            plan = plan.with_entity(e.id);
        }
        Ok(plan)
    }

    /// Answer one subtask. Each part re-resolves its own mention so the
    /// halves of a comparison each see the right record; a part that
    /// names nobody inherits the turn's anchor entity, and results of
    /// completed dependencies ride along in the question text.
    async fn subtask_answer(
        &self,
        session: &Session,
        subtask: &Subtask,
        prior: &[(String, String)],
        anchor: Option<&Employee>,
        cancel: &CancelToken,
    ) -> Result<String> {
        let session_id = session.session_id.as_str();
        let mention = resolve::extract_mention(&subtask.text, None);
        let resolution =
            resolve::resolve(&mention, session.active_entity, self.store.as_ref()).await?;
        let entity = resolution.single().or(anchor);

        let passages = match entity {
            Some(e) => {
                self.search(session_id, &subtask.text, Some(e.id), cancel)
                    .await?
            }
            None => Vec::new(),
        };

        let mut question = subtask.text.clone();
        if !subtask.depends_on.is_empty() && !prior.is_empty() {
            question.push_str("\n\nResults from earlier parts:\n");
            for (query, answer) in prior {
                question.push_str(&format!("- {query}: {answer}\n"));
            }
        }

        let records;
        let mut ctx = PromptContext::new(&question);
        ctx.entity = entity;
        ctx.passages = &passages;
        if entity.is_none() {
            records = self.store.list_all().await?;
            ctx.record_set = Some(&records);
        }

        let reply = self
            .generate(
                session_id,
                GenerateRequest::conversational(prompt::build_grounded(&ctx)),
                cancel,
            )
            .await?;
        Ok(reply.text)
    }

    // ──────────────────────────────────────────────────────────────
    // Social & list-all
    // ──────────────────────────────────────────────────────────────

    async fn social_turn(
        &self,
        session_id: &str,
        utterance: &str,
        kind: SocialKind,
        cancel: &CancelToken,
    ) -> Result<TurnPlan> {
        let reply = self
            .generate(
                session_id,
                GenerateRequest::conversational(prompt::build_social(kind)),
                cancel,
            )
            .await?
            .text;
        Ok(TurnPlan::exchange(utterance, reply, TurnOutcome::Social))
    }

    /// Directory listing is deterministic; no model call.
    async fn list_all_turn(&self, utterance: &str) -> Result<TurnPlan> {
        let employees = self.store.list_all().await?;
        let reply = prompt::render_employee_list(&employees);
        Ok(TurnPlan::exchange(utterance, reply, TurnOutcome::Answered))
    }

    // ──────────────────────────────────────────────────────────────
    // CRUD flow
    // ──────────────────────────────────────────────────────────────

    async fn crud_turn(
        &self,
        session: &Session,
        utterance: &str,
        action: CrudAction,
        cancel: &CancelToken,
    ) -> Result<TurnPlan> {
        let session_id = session.session_id.as_str();

        let first = self
            .generate(
                session_id,
                GenerateRequest::extraction(proposal::parse_prompt(utterance)),
                cancel,
            )
            .await?;
        let (parsed, retried) = match proposal::interpret_extraction(&first.text) {
            ModelOutput::Proposal(parsed) => (parsed, false),
            failed => {
                if let ModelOutput::ParseFailure { reason, .. } = &failed {
                    tracing::debug!(%reason, "extraction reply did not decode; retrying once");
                } else {
                    tracing::debug!("extraction reply was prose, not JSON; retrying once");
                }
                let second = self
                    .generate(
                        session_id,
                        GenerateRequest::extraction(proposal::retry_prompt(utterance)),
                        cancel,
                    )
                    .await?;
                match proposal::interpret_extraction(&second.text) {
                    ModelOutput::Proposal(parsed) => (parsed, true),
                    // Extraction exhausted; recover into a clarification
                    // rather than failing the turn.
                    _ => {
                        return Ok(TurnPlan::exchange(
                            utterance,
                            "I couldn't understand that request. Could you rephrase it?"
                                .to_string(),
                            TurnOutcome::Clarification,
                        ));
                    }
                }
            }
        };

        let validated = proposal::validate(
            parsed,
            self.store.as_ref(),
            self.duplicates.as_ref(),
            session.active_entity,
            session_id,
        )
        .await?;
        TraceEvent::ProposalParsed {
            session_id: session_id.to_string(),
            proposal_id: validated.id.to_string(),
            action: validated.parsed.action.as_str().to_string(),
            retried,
        }
        .emit();

        if !validated.errors.is_empty() {
            TraceEvent::ProposalRejected {
                session_id: session_id.to_string(),
                proposal_id: validated.id.to_string(),
                errors: validated.errors.len(),
            }
            .emit();
            let message = validated.errors.join(" ");
            let outcome = if action == CrudAction::Read {
                TurnOutcome::Clarification
            } else {
                TurnOutcome::ProposalRejected
            };
            return Ok(TurnPlan::exchange(utterance, message, outcome));
        }

        TraceEvent::ProposalValidated {
            session_id: session_id.to_string(),
            proposal_id: validated.id.to_string(),
            warnings: validated.warnings.len(),
        }
        .emit();

        // Reads are answered on the spot; only mutations wait for a
        // confirmation.
        if action == CrudAction::Read {
            return self.read_turn(utterance, &validated).await;
        }

        let proposal_id = validated.id;
        let target = validated.target_id;
        let reply = proposal::confirmation_message(&validated);

        // A newer proposal supersedes whatever was pending.
        if let Some(old) = session.pending_proposal {
            self.proposals.remove(old);
        }
        self.proposals.insert(validated);

        let mut plan = TurnPlan::exchange(utterance, reply, TurnOutcome::ProposalPending);
        plan.pending_proposal_id = Some(proposal_id);
        plan.commit = plan.commit.pending(proposal_id);
        if let Some(target) = target {
            // Point the session at the target now so pronouns work while
            // the confirmation is pending.
            plan = plan.with_entity(target);
        }
        Ok(plan)
    }

    async fn read_turn(&self, utterance: &str, validated: &Proposal) -> Result<TurnPlan> {
        let Some(target) = validated.target_id else {
            return Ok(TurnPlan::exchange(
                utterance,
                "I couldn't tell which employee you meant. Please give a name or ID.".to_string(),
                TurnOutcome::Clarification,
            ));
        };
        let Some(employee) = self.store.find_by_id(target).await? else {
            return Ok(TurnPlan::exchange(
                utterance,
                format!("I couldn't find an employee with ID {target}."),
                TurnOutcome::Clarification,
            ));
        };
        let reply = proposal::render_record(&employee);
        Ok(TurnPlan::exchange(utterance, reply, TurnOutcome::Answered).with_entity(target))
    }

    // ──────────────────────────────────────────────────────────────
    // Confirmation
    // ──────────────────────────────────────────────────────────────

    async fn settle_pending(
        &self,
        session: &Session,
        utterance: &str,
        pending_id: Uuid,
        word: PendingWord,
    ) -> Result<TurnPlan> {
        match word {
            PendingWord::Confirm => match self.proposals.take(pending_id) {
                Some(pending) => self.apply_proposal(session, utterance, pending).await,
                None => {
                    let mut plan = TurnPlan::exchange(
                        utterance,
                        "That proposal has expired. Please state the change again.".to_string(),
                        TurnOutcome::Clarification,
                    );
                    plan.commit = plan.commit.clear_pending();
                    Ok(plan)
                }
            },
            PendingWord::Discard => {
                self.proposals.remove(pending_id);
                let mut plan = TurnPlan::exchange(
                    utterance,
                    "Discarded the pending change.".to_string(),
                    TurnOutcome::Answered,
                );
                plan.commit = plan.commit.clear_pending();
                Ok(plan)
            }
        }
    }

    async fn apply_proposal(
        &self,
        session: &Session,
        utterance: &str,
        pending: Proposal,
    ) -> Result<TurnPlan> {
        match proposal::apply(&pending, self.store.as_ref()).await {
            Ok((reply, entity_id)) => {
                TraceEvent::ProposalApplied {
                    proposal_id: pending.id.to_string(),
                    action: pending.parsed.action.as_str().to_string(),
                    entity_id: entity_id.map(|id| id.to_string()),
                }
                .emit();

                let mut plan =
                    TurnPlan::exchange(utterance, reply, TurnOutcome::ProposalApplied);
                plan.commit = plan.commit.clear_pending();
                match pending.parsed.action {
                    CrudAction::Delete => {
                        // The record is gone; a stale active pointer would
                        // resolve pronouns to a ghost.
                        if session.active_entity.is_some() && session.active_entity == entity_id {
                            plan.commit = plan.commit.deactivate();
                        }
                    }
                    _ => {
                        if let Some(id) = entity_id {
                            plan = plan.with_entity(id);
                        }
                    }
                }
                Ok(plan)
            }
            // The target vanished between proposing and confirming.
            Err(Error::NotFound(_)) => {
                let mut plan = TurnPlan::exchange(
                    utterance,
                    "That employee no longer exists; nothing was changed.".to_string(),
                    TurnOutcome::ProposalRejected,
                );
                plan.commit = plan.commit.clear_pending();
                Ok(plan)
            }
            Err(e) => Err(e),
        }
    }

    // ──────────────────────────────────────────────────────────────
    // Service chokepoints
    // ──────────────────────────────────────────────────────────────

    async fn generate(
        &self,
        session_id: &str,
        request: GenerateRequest,
        cancel: &CancelToken,
    ) -> Result<GenerateResponse> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let mode = request.mode.as_str().to_string();
        let started = Instant::now();
        let response = timeout(
            Duration::from_millis(self.config.llm.timeout_ms),
            self.model.generate(request),
        )
        .instrument(info_span!("model_call"))
        .await
        .map_err(|_| Error::Timeout(format!("model call exceeded {}ms", self.config.llm.timeout_ms)))??;

        TraceEvent::ModelCall {
            session_id: session_id.to_string(),
            provider: self.model.provider_id().to_string(),
            mode,
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();
        Ok(response)
    }

    async fn search(
        &self,
        session_id: &str,
        query: &str,
        entity_filter: Option<EmployeeId>,
        cancel: &CancelToken,
    ) -> Result<Vec<Passage>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let started = Instant::now();
        let passages = timeout(
            Duration::from_millis(self.config.retrieval.timeout_ms),
            self.retrieval
                .search(query, self.config.retrieval.top_k, entity_filter),
        )
        .instrument(info_span!("retrieval"))
        .await
        .map_err(|_| {
            Error::Timeout(format!(
                "retrieval exceeded {}ms",
                self.config.retrieval.timeout_ms
            ))
        })??;

        TraceEvent::RetrievalDone {
            session_id: session_id.to_string(),
            passages: passages.len(),
            entity_filter: entity_filter.map(|id| id.to_string()),
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();
        Ok(passages)
    }

    /// Bounded, id-ordered sample of names for "did you mean" hints.
    async fn name_sample(&self) -> Result<Vec<String>> {
        let all = self.store.list_all().await?;
        Ok(all
            .into_iter()
            .take(self.config.pipeline.name_suggestion_limit)
            .map(|e| e.name)
            .collect())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn plan
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything a finished stage sequence hands back: the reply plus the
/// deferred session-state changes, committed only after the whole turn
/// succeeded.
struct TurnPlan {
    reply: String,
    outcome: TurnOutcome,
    commit: TurnCommit,
    resolved_entity_id: Option<EmployeeId>,
    pending_proposal_id: Option<Uuid>,
}

impl TurnPlan {
    fn exchange(utterance: &str, reply: String, outcome: TurnOutcome) -> Self {
        Self {
            commit: TurnCommit::new().user(utterance).assistant(reply.clone()),
            reply,
            outcome,
            resolved_entity_id: None,
            pending_proposal_id: None,
        }
    }

    fn with_entity(mut self, id: EmployeeId) -> Self {
        let commit = std::mem::take(&mut self.commit);
        self.commit = commit.activate(id);
        self.resolved_entity_id = Some(id);
        self
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

enum PendingWord {
    Confirm,
    Discard,
}

fn pending_word(utterance: &str) -> Option<PendingWord> {
    let normalized = utterance
        .trim()
        .trim_end_matches(['.', '!', '?'])
        .to_lowercase();
    match normalized.as_str() {
        "confirm" | "yes" | "yes please" | "apply" | "do it" | "go ahead" => {
            Some(PendingWord::Confirm)
        }
        "cancel" | "no" | "discard" | "never mind" | "nevermind" | "don't" => {
            Some(PendingWord::Discard)
        }
        _ => None,
    }
}

fn status_str(status: ResolutionStatus) -> &'static str {
    match status {
        ResolutionStatus::None => "none",
        ResolutionStatus::One => "one",
        ResolutionStatus::Many => "many",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_words_cover_both_directions() {
        assert!(matches!(pending_word("confirm"), Some(PendingWord::Confirm)));
        assert!(matches!(pending_word("  Yes! "), Some(PendingWord::Confirm)));
        assert!(matches!(pending_word("go ahead"), Some(PendingWord::Confirm)));
        assert!(matches!(pending_word("cancel"), Some(PendingWord::Discard)));
        assert!(matches!(pending_word("Never mind."), Some(PendingWord::Discard)));
        assert!(pending_word("yes, but change the email first").is_none());
        assert!(pending_word("update his email").is_none());
    }

    #[test]
    fn status_strings_are_stable() {
        assert_eq!(status_str(ResolutionStatus::None), "none");
        assert_eq!(status_str(ResolutionStatus::One), "one");
        assert_eq!(status_str(ResolutionStatus::Many), "many");
    }
}
