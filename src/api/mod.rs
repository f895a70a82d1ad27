// HTTP API routes (decisions, reflection, memory, coaching, world data).

pub mod world;

use axum::{
    extract::{rejection::JsonRejection, Json, MatchedPath, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

use crate::brain::reflection::{BattleSummary, Outcome};
use crate::brain::state::{AgentState, CoachingProfile, EnemyState, Environment};
use crate::brain::{Brain, DecideInput, ReflectInput};
use crate::metrics;
use crate::world::WorldCatalog;

// ── Request types ─────────────────────────────────────────────────────

/// Coaching arrives either as numeric dials or as a free-text instruction.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum CoachingField {
    Dials(CoachingProfile),
    Text(String),
}

#[derive(Deserialize)]
pub struct DecideRequest {
    #[serde(default)]
    pub agent: AgentState,
    #[serde(default)]
    pub enemy: EnemyState,
    #[serde(default)]
    pub environment: Environment,
    pub user_prompt: Option<String>,
    pub coaching: Option<CoachingField>,
    /// Top-level distance, sent by the arena client instead of `enemy.distance`.
    pub distance: Option<f64>,
    /// Either lesson strings or `{action, reasoning}` records.
    #[serde(default)]
    pub memory: Vec<Value>,
}

/// Flatten one client-side memory item into a prompt line.
fn memory_line(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        Value::Object(map) => {
            let action = map.get("action").and_then(Value::as_str).unwrap_or("UNKNOWN");
            let reasoning = map
                .get("reasoning")
                .and_then(Value::as_str)
                .unwrap_or("No reason");
            format!("{action}: {reasoning}")
        }
        other => other.to_string(),
    }
}

impl DecideRequest {
    pub fn into_input(self) -> DecideInput {
        let mut enemy = self.enemy;
        enemy.distance = enemy.distance.or(self.distance);

        let (coaching, coaching_text) = match self.coaching {
            Some(CoachingField::Dials(dials)) => (dials, None),
            Some(CoachingField::Text(text)) => (CoachingProfile::default(), Some(text)),
            None => (CoachingProfile::default(), None),
        };

        DecideInput {
            agent: self.agent,
            enemy,
            environment: self.environment,
            user_prompt: self.user_prompt.or(coaching_text).unwrap_or_default(),
            coaching,
            memory: self.memory.iter().map(memory_line).collect(),
        }
    }
}

/// Accepts both the battle-summary shape and the arena match shape.
#[derive(Deserialize)]
pub struct ReflectRequest {
    pub battle_data: Option<BattleSummary>,
    pub outcome: Option<String>,
    pub survival_time: Option<f64>,
    pub final_hp: Option<f64>,
    pub coaching: Option<CoachingProfile>,
}

impl ReflectRequest {
    pub fn into_input(self) -> ReflectInput {
        if self.battle_data.is_some() || self.outcome.is_some() {
            ReflectInput::Battle {
                summary: self.battle_data.unwrap_or_default(),
                outcome: Outcome::from_tag(self.outcome.as_deref().unwrap_or_default()),
            }
        } else {
            ReflectInput::Match {
                survival_time: self.survival_time.unwrap_or(0.0),
                final_hp: self.final_hp.unwrap_or(0.0),
                coaching: self.coaching.unwrap_or_default(),
            }
        }
    }
}

#[derive(Deserialize)]
pub struct AddMemoryRequest {
    #[serde(default)]
    pub memory: String,
}

#[derive(Deserialize)]
pub struct CoachRequest {
    #[serde(default)]
    pub prompt: String,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub brain: Arc<Brain>,
    pub world: WorldCatalog,
}

// ── Error helper ──────────────────────────────────────────────────────

fn json_error(status: StatusCode, msg: &str) -> impl IntoResponse {
    (status, Json(json!({ "status": "error", "message": msg })))
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(brain: Arc<Brain>) -> Router {
    let state = AppState {
        brain,
        world: WorldCatalog::new(),
    };

    Router::new()
        .route("/api/health", get(health))
        // Decisions
        .route("/api/decide", post(decide))
        .route("/api/reflect", post(reflect))
        .route("/api/reset", post(reset))
        // Memory
        .route("/api/memory", get(get_memory).post(add_memory))
        // Coaching
        .route(
            "/api/coach",
            get(get_coaching).post(set_coaching).delete(clear_coaching),
        )
        // World data
        .route("/api/world/biome", get(world::get_biome))
        .route("/api/world/biome/enemies", get(world::get_biome_enemies))
        .route("/api/world/enemies", get(world::get_enemies))
        .route("/metrics", get(get_metrics))
        .route_layer(middleware::from_fn(track_metrics))
        .with_state(state)
}

async fn track_metrics(req: Request, next: Next) -> Response {
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = req.method().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    metrics::API_REQUEST_DURATION_SECONDS
        .with_label_values(&[&endpoint])
        .observe(start.elapsed().as_secs_f64());
    metrics::API_REQUESTS_TOTAL
        .with_label_values(&[&method, &endpoint, response.status().as_str()])
        .inc();
    response
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "message": "Hollow Zoo API is running",
        "profile": state.brain.kind(),
        "model": state.brain.model_name(),
    }))
}

async fn decide(
    State(state): State<AppState>,
    payload: Result<Json<DecideRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("Error in /api/decide: {e}");
            let fallback = state.brain.profile().error_fallback_decision(&"malformed request");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "action": fallback.action,
                    "reasoning": fallback.reasoning,
                    "confidence": fallback.confidence,
                    "error": e.body_text(),
                })),
            )
                .into_response();
        }
    };

    let decision = state.brain.decide(&req.into_input()).await;
    (StatusCode::OK, Json(json!(decision))).into_response()
}

async fn reflect(
    State(state): State<AppState>,
    payload: Result<Json<ReflectRequest>, JsonRejection>,
) -> impl IntoResponse {
    match payload {
        Ok(Json(req)) => {
            let reflection = state.brain.reflect(req.into_input()).await;
            (StatusCode::OK, Json(json!(reflection))).into_response()
        }
        Err(e) => {
            tracing::error!("Error in /api/reflect: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "reflection": "Unable to reflect on this match",
                    "run_number": 1,
                    "error": e.body_text(),
                })),
            )
                .into_response()
        }
    }
}

async fn reset(State(state): State<AppState>) -> impl IntoResponse {
    state.brain.reset();
    Json(json!({ "status": "success", "message": "Memory reset" }))
}

async fn get_memory(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "memory": state.brain.memory() }))
}

async fn add_memory(
    State(state): State<AppState>,
    payload: Result<Json<AddMemoryRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(e) => {
            tracing::error!("Error in /api/memory: {e}");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.body_text()).into_response();
        }
    };
    if req.memory.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "memory text is required").into_response();
    }
    let entry = state.brain.remember(req.memory).await;
    (
        StatusCode::OK,
        Json(json!({ "status": "success", "entry": entry })),
    )
        .into_response()
}

async fn set_coaching(
    State(state): State<AppState>,
    payload: Result<Json<CoachRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(e) => {
            tracing::error!("Error in /api/coach: {e}");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.body_text()).into_response();
        }
    };
    if req.prompt.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "No coaching prompt provided").into_response();
    }
    state.brain.set_coaching(req.prompt.clone());
    Json(json!({
        "status": "success",
        "message": "Coaching prompt applied",
        "prompt": req.prompt,
    }))
    .into_response()
}

async fn get_coaching(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "status": "success", "prompt": state.brain.coaching() }))
}

async fn clear_coaching(State(state): State<AppState>) -> impl IntoResponse {
    state.brain.clear_coaching();
    Json(json!({ "status": "success", "message": "Custom coaching cleared" }))
}

async fn get_metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}
