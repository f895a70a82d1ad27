// Decision brain: routes each request to the hosted model or the local
// policy, substitutes fallbacks on failure, and owns the lesson log.

pub mod action;
pub mod llm;
pub mod parse;
pub mod policy;
pub mod prompt;
pub mod reflection;
pub mod state;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::memory::{render_lessons, MemoryEntry, MemoryLog};
use crate::metrics;
use llm::ModelClient;
use parse::parse_decision;
use policy::{PolicyProfile, ProfileKind};
use reflection::{BattleSummary, LearningHistory, MatchReflection, Outcome, Reflection};
use state::{AgentState, CoachingProfile, Decision, EnemyState, Environment};

/// Lessons included in a decision prompt.
pub const PROMPT_LESSONS: usize = 5;

pub const NO_COACHING: &str = "No custom coaching set";

/// Everything a decision may look at.
#[derive(Debug, Clone, Default)]
pub struct DecideInput {
    pub agent: AgentState,
    pub enemy: EnemyState,
    pub environment: Environment,
    pub user_prompt: String,
    pub coaching: CoachingProfile,
    /// Client-side recollection, oldest first.
    pub memory: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum ReflectInput {
    Battle {
        summary: BattleSummary,
        outcome: Outcome,
    },
    Match {
        survival_time: f64,
        final_hp: f64,
        coaching: CoachingProfile,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReflectOutput {
    Lesson(Reflection),
    Match(MatchReflection),
}

pub struct Brain {
    profile: PolicyProfile,
    client: Option<Arc<dyn ModelClient>>,
    memory: Arc<MemoryLog>,
    custom_coaching: Mutex<Option<String>>,
    history: Mutex<LearningHistory>,
    rng: Mutex<StdRng>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl Brain {
    pub fn new(profile: PolicyProfile, client: Option<Arc<dyn ModelClient>>, memory: MemoryLog) -> Self {
        Self {
            profile,
            client,
            memory: Arc::new(memory),
            custom_coaching: Mutex::new(None),
            history: Mutex::new(LearningHistory::default()),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Fix the random source, for reproducible runs.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn profile(&self) -> &PolicyProfile {
        &self.profile
    }

    pub fn kind(&self) -> ProfileKind {
        self.profile.kind
    }

    /// Model name, or `None` when running the local policy.
    pub fn model_name(&self) -> Option<&str> {
        self.client.as_deref().map(|c| c.name())
    }

    // ── Decisions ─────────────────────────────────────────────────────

    pub async fn decide(&self, input: &DecideInput) -> Decision {
        let (decision, source) = match &self.client {
            None => {
                let mut rng = lock(&self.rng);
                let d = self.profile.decide(&input.agent, &input.enemy, &mut *rng);
                (d, "policy")
            }
            Some(client) => self.model_decision(client.as_ref(), input).await,
        };

        metrics::DECISIONS_TOTAL
            .with_label_values(&[self.profile.kind.as_str(), decision.action.as_str(), source])
            .inc();
        tracing::debug!(
            action = %decision.action,
            confidence = decision.confidence,
            source,
            "Decision made"
        );
        decision
    }

    async fn model_decision(&self, client: &dyn ModelClient, input: &DecideInput) -> (Decision, &'static str) {
        let prompt = self.decision_prompt(input);
        match client.generate(&prompt).await {
            Ok(text) => match parse_decision(&text, &self.profile) {
                Ok(decision) => (decision, "model"),
                Err(e) => {
                    tracing::warn!("Could not parse model decision: {e}");
                    metrics::MODEL_FAILURES_TOTAL.with_label_values(&["unparseable"]).inc();
                    (self.profile.parse_fallback_decision(), "fallback")
                }
            },
            Err(e) => {
                tracing::warn!(model = client.name(), "Model call failed: {e}");
                metrics::MODEL_FAILURES_TOTAL.with_label_values(&[e.kind()]).inc();
                (self.profile.error_fallback_decision(&e), "fallback")
            }
        }
    }

    fn decision_prompt(&self, input: &DecideInput) -> String {
        match self.profile.kind {
            ProfileKind::Narrative => {
                let lessons = if input.memory.is_empty() {
                    let recent: Vec<String> = self
                        .memory
                        .recent(PROMPT_LESSONS)
                        .into_iter()
                        .map(|e| e.text)
                        .collect();
                    render_lessons(&recent)
                } else {
                    let start = input.memory.len().saturating_sub(PROMPT_LESSONS);
                    render_lessons(&input.memory[start..])
                };
                prompt::narrative_prompt(
                    &self.profile,
                    &input.agent,
                    &input.enemy,
                    &input.environment,
                    &input.user_prompt,
                    &lessons,
                )
            }
            ProfileKind::Coaching => {
                let custom = lock(&self.custom_coaching).clone();
                prompt::coaching_prompt(
                    &input.agent,
                    &input.enemy,
                    &input.coaching,
                    custom.as_deref(),
                    &input.memory,
                )
            }
        }
    }

    // ── Reflection ────────────────────────────────────────────────────

    /// Reflect on a finished fight and remember the lesson.
    pub async fn reflect(&self, input: ReflectInput) -> ReflectOutput {
        match input {
            ReflectInput::Battle { summary, outcome } => {
                metrics::REFLECTIONS_TOTAL
                    .with_label_values(&[outcome.as_str()])
                    .inc();
                let reflection = self.battle_reflection(&summary, outcome).await;
                self.append_lesson(reflection.lesson.clone()).await;
                ReflectOutput::Lesson(reflection)
            }
            ReflectInput::Match {
                survival_time,
                final_hp,
                coaching,
            } => {
                let outcome = Outcome::from_final_hp(final_hp);
                metrics::REFLECTIONS_TOTAL
                    .with_label_values(&[outcome.as_str()])
                    .inc();
                let result = {
                    let mut history = lock(&self.history);
                    let result = history.record(survival_time, final_hp, coaching);
                    tracing::info!(
                        outcome = outcome.as_str(),
                        survival_time,
                        matches = history.matches().len(),
                        next_run = result.run_number,
                        "Match recorded"
                    );
                    result
                };
                self.append_lesson(result.reflection.clone()).await;
                ReflectOutput::Match(result)
            }
        }
    }

    async fn battle_reflection(&self, summary: &BattleSummary, outcome: Outcome) -> Reflection {
        if let Some(client) = &self.client {
            let prompt = prompt::reflection_prompt(summary, outcome);
            match client.generate(&prompt).await {
                Ok(text) => match reflection::parse_reflection(&text) {
                    Some(r) => return r,
                    None => tracing::warn!("Could not parse model reflection"),
                },
                Err(e) => {
                    tracing::warn!(model = client.name(), "Reflection call failed: {e}");
                    metrics::MODEL_FAILURES_TOTAL.with_label_values(&[e.kind()]).inc();
                }
            }
        }
        let mut rng = lock(&self.rng);
        reflection::reflect(summary, outcome, &mut *rng)
    }

    /// Forget the match history and restart the run counter. The lesson log
    /// is kept.
    pub fn reset(&self) {
        lock(&self.history).reset();
        tracing::info!("Learning history reset");
    }

    pub fn run_number(&self) -> u32 {
        lock(&self.history).run_number()
    }

    // ── Coaching ──────────────────────────────────────────────────────

    pub fn set_coaching(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!(prompt = %text, "Custom coaching set");
        *lock(&self.custom_coaching) = Some(text);
    }

    /// Current instruction, or [`NO_COACHING`].
    pub fn coaching(&self) -> String {
        lock(&self.custom_coaching)
            .clone()
            .unwrap_or_else(|| NO_COACHING.to_string())
    }

    pub fn clear_coaching(&self) {
        *lock(&self.custom_coaching) = None;
        tracing::info!("Custom coaching cleared");
    }

    // ── Memory ────────────────────────────────────────────────────────

    pub async fn remember(&self, text: impl Into<String>) -> MemoryEntry {
        self.append_lesson(text.into()).await
    }

    pub fn memory(&self) -> Vec<MemoryEntry> {
        self.memory.all()
    }

    /// Append on the blocking pool; the log rewrites its file under its lock.
    async fn append_lesson(&self, text: String) -> MemoryEntry {
        let log = Arc::clone(&self.memory);
        let fallback = text.clone();
        match tokio::task::spawn_blocking(move || log.append(text)).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::error!("Memory append task failed: {e}");
                MemoryEntry::now(fallback)
            }
        }
    }
}
