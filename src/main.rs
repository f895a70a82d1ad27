use std::sync::Arc;
use tower_http::cors::CorsLayer;

use hollowzoo_backend::brain::llm::{GeminiClient, ModelClient};
use hollowzoo_backend::brain::policy::PolicyProfile;
use hollowzoo_backend::brain::Brain;
use hollowzoo_backend::config::Config;
use hollowzoo_backend::memory::MemoryLog;
use hollowzoo_backend::{api, metrics};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    metrics::register_metrics();

    let client: Option<Arc<dyn ModelClient>> = match config.gemini() {
        Some(gemini) => match GeminiClient::new(gemini) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::error!("Failed to build model client: {e}");
                std::process::exit(1);
            }
        },
        None => None,
    };

    match &client {
        Some(c) => tracing::info!(profile = %config.profile, model = c.name(), "Using hosted model"),
        None => tracing::info!(profile = %config.profile, "No model configured, using local policy"),
    }

    let memory = MemoryLog::open(config.memory_path.clone());
    tracing::info!(
        path = %config.memory_path.display(),
        entries = memory.len(),
        "Lesson log loaded"
    );

    let brain = Arc::new(Brain::new(
        PolicyProfile::for_kind(config.profile),
        client,
        memory,
    ));

    let app = api::router(brain).layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to {addr}: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!("Hollow Zoo backend listening on port {}", config.port);
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {e}");
    }
}
