use crate::config::{ConversationSettings, OllamaSettings};
use crate::error::{GoalpostError, Result};
use crate::followup::{
    build_continuation_prompt, build_follow_up_prompt, parse_continuation_decision, ContinuationDecision,
    FollowUp, FollowUpMode, CONTINUATION_FOCUS, CONTINUATION_ROUNDS, MAX_FOLLOW_UP_ROUNDS,
};
use crate::goals::Goal;
use crate::logging::{log_error, log_generation, log_routing};
use crate::manager::GoalsManager;
use crate::memory::{ConversationMemory, TurnRecord};
use crate::ollama::{GenerationOptions, OllamaClient};
use crate::personas::PersonaRegistry;
use crate::prompt::{build_enhanced_prompt, build_suggestion_prompt, build_thinking_prompt, PromptExtras};
use crate::ranker::relevant_goals;
use crate::router::{route, RouteDecision};
use crate::suggestions::{parse_goal_suggestions, GoalProposal};
use crate::vision::VisionProcessor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Thread entries shown to each follow-up round.
const FOLLOW_UP_THREAD: usize = 3;
/// Thread entries shown to the continuation decision.
const DECISION_THREAD: usize = 5;
/// First round number used by auto-continuation.
const CONTINUATION_FIRST_ROUND: u32 = 5;

// ============ Turn Types ============

/// One inbound chat message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnRequest {
    pub message: String,
    /// Explicit persona pick; unknown ids fall back to routing.
    #[serde(default)]
    pub persona_id: Option<String>,
    /// Raw bytes of an attached image.
    #[serde(skip)]
    pub image: Option<Vec<u8>>,
}

impl TurnRequest {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            ..Default::default()
        }
    }

    pub fn with_persona(mut self, persona_id: Option<String>) -> Self {
        self.persona_id = persona_id;
        self
    }

    pub fn with_image(mut self, image: Option<Vec<u8>>) -> Self {
        self.image = image;
        self
    }
}

/// Streamed output of a turn, in the order it is produced.
#[derive(Debug, Clone, Copy)]
pub enum TurnEvent<'a> {
    Thinking(&'a str),
    Text(&'a str),
    FollowUp(&'a FollowUp),
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnResult {
    pub persona_id: String,
    pub persona_name: String,
    pub persona_emoji: String,
    pub route: RouteDecision,
    pub thinking: String,
    pub response: String,
    pub relevant_goals: Vec<Goal>,
    pub suggestions: Vec<GoalProposal>,
    pub follow_ups: Vec<FollowUp>,
    pub response_time_ms: u64,
    /// Set when the runtime failed and `response` holds a notice instead of an answer.
    pub generation_error: Option<String>,
}

fn ignore_event(_: TurnEvent<'_>) {}

// ============ Orchestrator ============

pub struct Orchestrator {
    client: OllamaClient,
    vision: VisionProcessor,
    settings: OllamaSettings,
    conversation: ConversationSettings,
    registry: Arc<PersonaRegistry>,
    memory: Mutex<ConversationMemory>,
}

impl Orchestrator {
    pub fn new(
        settings: &OllamaSettings,
        conversation: &ConversationSettings,
        registry: Arc<PersonaRegistry>,
    ) -> Self {
        Self {
            client: OllamaClient::new(settings),
            vision: VisionProcessor::new(settings),
            settings: settings.clone(),
            conversation: conversation.clone(),
            registry,
            memory: Mutex::new(ConversationMemory::new(
                conversation.thread_capacity,
                conversation.rollup_every,
            )),
        }
    }

    fn memory(&self) -> MutexGuard<'_, ConversationMemory> {
        self.memory.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the session memory.
    pub fn memory_snapshot(&self) -> ConversationMemory {
        self.memory().clone()
    }

    /// Disarm auto-continuation until the next answered turn.
    pub fn stop_continuation(&self) {
        self.memory().stop_continuation();
        log_generation(None, "Auto-continuation stopped");
    }

    /// Route, rank, describe any image, think, stream the persona response, then collect
    /// goal proposals and follow-up rounds. Runtime failures never fail the turn; only goal
    /// storage errors do.
    pub async fn process_message<F>(
        &self,
        goals: &GoalsManager,
        request: &TurnRequest,
        mut on_event: F,
    ) -> Result<TurnResult>
    where
        F: FnMut(TurnEvent<'_>),
    {
        let started = Instant::now();
        self.memory().stop_continuation();

        let decision = route(&request.message, request.persona_id.as_deref(), &self.registry);
        log_routing(Some(&decision.persona_id), &decision.describe());
        let persona = self
            .registry
            .get(&decision.persona_id)
            .unwrap_or_else(|| self.registry.default_persona());

        let active = goals.get_active_goals()?;
        let ranked = relevant_goals(&persona.id, &active);
        log_routing(
            Some(&persona.id),
            &format!("{} of {} active goals in context", ranked.len(), active.len()),
        );

        let mut image_context = String::new();
        let mut images = Vec::new();
        if let Some(bytes) = &request.image {
            let context = self.vision.describe(&self.client, bytes).await;
            if context.attach {
                images.push(bytes.clone());
            }
            image_context = context.text;
        }

        let thinking = if self.conversation.thinking {
            self.think(&request.message, &persona.id, ranked.len(), &mut on_event)
                .await
        } else {
            String::new()
        };

        let memory_block = self.memory().format_for_prompt(self.conversation.memory_turns);
        let extras = PromptExtras {
            memory: &memory_block,
            image: &image_context,
            thinking: &thinking,
        };
        let prompt = build_enhanced_prompt(persona, &request.message, &ranked, extras);
        let options = GenerationOptions::from_settings(&self.settings);
        log_generation(
            Some(&persona.id),
            &format!(
                "Generating with {} ({} prompt chars, {} images)",
                self.settings.primary_model,
                prompt.len(),
                images.len()
            ),
        );

        let generated = self
            .client
            .generate_stream(&self.settings.primary_model, &prompt, &options, &images, |fragment| {
                on_event(TurnEvent::Text(fragment))
            })
            .await;

        let (response, generation_error) = match generated {
            Ok(text) => (text, None),
            Err(e) => {
                let err = GoalpostError::Collaborator(e.to_string());
                log_error(Some(&persona.id), &err.to_string());
                let notice = format!(
                    "⚠️ I couldn't reach the local model ({}). Check that Ollama is running at {} and try again.",
                    e, self.settings.base_url
                );
                on_event(TurnEvent::Text(&notice));
                (notice, Some(err.to_string()))
            }
        };

        let mut suggestions = Vec::new();
        let mut follow_ups = Vec::new();
        if generation_error.is_none() {
            let turn = TurnRecord {
                timestamp: Utc::now().to_rfc3339(),
                user_message: request.message.clone(),
                response: response.clone(),
                persona_id: persona.id.clone(),
                goal_titles: ranked.iter().map(|g| g.title.clone()).collect(),
            };
            if let Some(rollup) = self.memory().record_turn(turn.clone(), Utc::now()) {
                log_generation(
                    Some(&persona.id),
                    &format!("Rolled {} turns into permanent memory", rollup.key_insights.len()),
                );
            }

            if self.settings.suggest_goals {
                suggestions = self.suggest_goals(&request.message, &response, &persona.id, &active).await;
            }

            let rounds = self.conversation.follow_up_rounds.min(MAX_FOLLOW_UP_ROUNDS);
            if rounds > 0 {
                let plan = (1..=rounds).map(|r| (r, FollowUpMode::for_round(r))).collect();
                follow_ups = self
                    .run_follow_ups(&turn, &ranked, plan, false, &mut on_event)
                    .await;
            }

            if self.conversation.auto_continue {
                self.memory().arm_continuation(Utc::now());
            }
        }

        let response_time_ms = started.elapsed().as_millis() as u64;
        log_generation(
            Some(&persona.id),
            &format!(
                "Turn finished in {}ms with {} suggestions and {} follow-ups",
                response_time_ms,
                suggestions.len(),
                follow_ups.len()
            ),
        );

        Ok(TurnResult {
            persona_id: persona.id.clone(),
            persona_name: persona.name.clone(),
            persona_emoji: persona.emoji.clone(),
            route: decision,
            thinking,
            response,
            relevant_goals: ranked,
            suggestions,
            follow_ups,
            response_time_ms,
            generation_error,
        })
    }

    /// Strategic notes for the persona prompt. A failed pass yields no notes.
    async fn think<F>(&self, message: &str, persona_id: &str, goal_count: usize, on_event: &mut F) -> String
    where
        F: FnMut(TurnEvent<'_>),
    {
        let prompt = build_thinking_prompt(message, persona_id, goal_count);
        let options = GenerationOptions::for_thinking(&self.settings);
        let thought = self
            .client
            .generate_stream(&self.settings.thinking_model, &prompt, &options, &[], |fragment| {
                on_event(TurnEvent::Thinking(fragment))
            })
            .await;

        match thought {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                log_error(Some(persona_id), &format!("Thinking pass failed: {}", e));
                String::new()
            }
        }
    }

    /// Goal proposals for the finished exchange. Any failure yields an empty list.
    pub async fn suggest_goals(
        &self,
        user_message: &str,
        response: &str,
        persona_id: &str,
        existing: &[Goal],
    ) -> Vec<GoalProposal> {
        let prompt = build_suggestion_prompt(user_message, response, persona_id, existing);
        let options = GenerationOptions::for_suggestions(&self.settings);

        match self
            .client
            .generate(&self.settings.suggestion_model, &prompt, &options, &[])
            .await
        {
            Ok(text) => parse_goal_suggestions(&text),
            Err(e) => {
                log_error(Some(persona_id), &format!("Goal suggestion failed: {}", e));
                Vec::new()
            }
        }
    }

    /// Generate each planned round in order. Failed or blank rounds are skipped; the rest
    /// are added to the thread so later rounds build on them.
    async fn run_follow_ups<F>(
        &self,
        turn: &TurnRecord,
        goals: &[Goal],
        plan: Vec<(u32, FollowUpMode)>,
        auto: bool,
        on_event: &mut F,
    ) -> Vec<FollowUp>
    where
        F: FnMut(TurnEvent<'_>),
    {
        let options = GenerationOptions::for_follow_ups(&self.settings);
        let mut produced = Vec::new();

        for (round, mode) in plan {
            let thread = self.memory().recent_contents(FOLLOW_UP_THREAD);
            let prompt = build_follow_up_prompt(turn, mode, goals, &thread, round);
            let generated = self
                .client
                .generate(&self.settings.follow_up_model, &prompt, &options, &[])
                .await;

            match generated {
                Ok(text) if !text.trim().is_empty() => {
                    let now = Utc::now();
                    let follow_up = FollowUp {
                        round,
                        mode,
                        content: text.trim().to_string(),
                        timestamp: now.format("%H:%M:%S").to_string(),
                        auto,
                    };
                    self.memory()
                        .record_follow_up(round, mode.as_str(), &follow_up.content, now);
                    on_event(TurnEvent::FollowUp(&follow_up));
                    produced.push(follow_up);
                }
                Ok(_) => log_generation(
                    Some(&turn.persona_id),
                    &format!("Follow-up round {} came back empty", round),
                ),
                Err(e) => log_error(
                    Some(&turn.persona_id),
                    &format!("Follow-up round {} failed: {}", round, e),
                ),
            }
        }
        produced
    }

    pub async fn check_auto_continuation(&self, goals: &GoalsManager) -> Result<Vec<FollowUp>> {
        self.check_auto_continuation_at(goals, Utc::now()).await
    }

    /// Ask the decision model whether an idle thread should hear more. Nothing happens
    /// before the check interval has passed, and a thread idle past the limit is dropped.
    pub async fn check_auto_continuation_at(
        &self,
        goals: &GoalsManager,
        now: DateTime<Utc>,
    ) -> Result<Vec<FollowUp>> {
        if !self.conversation.auto_continue {
            return Ok(Vec::new());
        }

        let (last_proactive, turn, thread) = {
            let memory = self.memory();
            (
                memory.last_proactive(),
                memory.last_turn().cloned(),
                memory.recent_contents(DECISION_THREAD),
            )
        };
        let (Some(last_proactive), Some(turn)) = (last_proactive, turn) else {
            return Ok(Vec::new());
        };

        let idle_secs = (now - last_proactive).num_seconds();
        if idle_secs < self.conversation.auto_continue_interval_secs as i64 {
            return Ok(Vec::new());
        }
        if idle_secs > self.conversation.auto_continue_max_idle_secs as i64 {
            self.memory().stop_continuation();
            log_generation(
                Some(&turn.persona_id),
                &format!("Thread idle for {}s, auto-continuation stopped", idle_secs),
            );
            return Ok(Vec::new());
        }

        let ranked = relevant_goals(&turn.persona_id, &goals.get_active_goals()?);
        let prompt = build_continuation_prompt(&turn, idle_secs, &thread, &ranked);
        let options = GenerationOptions::for_decisions(&self.settings);
        let decided = self
            .client
            .generate(&self.settings.decision_model, &prompt, &options, &[])
            .await;

        let text = match decided {
            Ok(text) => text,
            Err(e) => {
                log_error(Some(&turn.persona_id), &format!("Continuation decision failed: {}", e));
                self.memory().arm_continuation(now);
                return Ok(Vec::new());
            }
        };

        match parse_continuation_decision(&text) {
            ContinuationDecision::Stop(reason) => {
                self.memory().stop_continuation();
                log_generation(Some(&turn.persona_id), &format!("Continuation declined: {}", reason));
                Ok(Vec::new())
            }
            ContinuationDecision::Continue(reason) => {
                log_generation(Some(&turn.persona_id), &format!("Continuing thread: {}", reason));
                let plan = (0..CONTINUATION_ROUNDS)
                    .map(|i| {
                        let mode = CONTINUATION_FOCUS[i as usize % CONTINUATION_FOCUS.len()];
                        (CONTINUATION_FIRST_ROUND + i, mode)
                    })
                    .collect();
                let follow_ups = self
                    .run_follow_ups(&turn, &ranked, plan, true, &mut ignore_event)
                    .await;
                self.memory().arm_continuation(now);
                Ok(follow_ups)
            }
        }
    }
}
