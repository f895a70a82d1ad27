// Read-only world data endpoints. Unknown names get placeholder records.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use super::AppState;

#[derive(Deserialize)]
pub struct NameQuery {
    #[serde(default)]
    pub name: String,
}

pub async fn get_biome(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> impl IntoResponse {
    Json(state.world.biome(&query.name))
}

pub async fn get_biome_enemies(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> impl IntoResponse {
    Json(json!({ "enemies": state.world.biome_enemies(&query.name) }))
}

pub async fn get_enemies(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "enemies": state.world.enemies() }))
}
