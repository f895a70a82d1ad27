// Application configuration, loaded from environment variables and CLI flags.

use std::path::PathBuf;
use std::time::Duration;

use crate::brain::llm::{GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::brain::policy::ProfileKind;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} profile requires GEMINI_API_KEY (or GOOGLE_API_KEY) to be set")]
    MissingApiKey(ProfileKind),
    #[error("{0}")]
    InvalidProfile(String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Which decision profile to run.
    pub profile: ProfileKind,
    /// JSON file holding the lesson log.
    pub memory_path: PathBuf,
    /// Hosted model API key. `None` selects the local policy.
    pub api_key: Option<String>,
    pub model: String,
    pub model_base_url: String,
    pub model_timeout: Duration,
    /// When false the hosted model is never called, even with a key.
    pub use_real_ai: bool,
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `PORT` - HTTP server port (default: 5000)
    /// - `BRAIN_PROFILE` - `narrative` (default) or `coaching`
    /// - `MEMORY_PATH` - lesson log file (default: `memory.json`)
    /// - `GEMINI_API_KEY` / `GOOGLE_API_KEY` - hosted model key
    /// - `GEMINI_MODEL` - model name (default: `gemini-2.0-flash`)
    /// - `GEMINI_BASE_URL` - API root
    /// - `LLM_TIMEOUT_SECS` - model call timeout (default: 30)
    /// - `USE_REAL_AI` - set to `false` to force the local policy
    ///
    /// CLI flags:
    /// - `--port <PORT>`
    /// - `--profile <narrative|coaching>`
    /// - `--memory-path <FILE>`
    /// - `--offline` - same as `USE_REAL_AI=false`
    pub fn load() -> Result<Self, ConfigError> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    /// Build from explicit argument and environment sources.
    pub fn from_sources<F>(args: &[String], env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // CLI flag takes precedence, then env var, then default
        let port = Self::parse_cli_value(args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| env("PORT").and_then(|v| v.parse().ok()))
            .unwrap_or(5000);

        let profile = match Self::parse_cli_value(args, "--profile").or_else(|| env("BRAIN_PROFILE")) {
            Some(raw) => raw.parse().map_err(ConfigError::InvalidProfile)?,
            None => ProfileKind::Narrative,
        };

        let memory_path = Self::parse_cli_value(args, "--memory-path")
            .or_else(|| env("MEMORY_PATH"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("memory.json"));

        let api_key = env("GEMINI_API_KEY")
            .or_else(|| env("GOOGLE_API_KEY"))
            .filter(|k| !k.trim().is_empty());

        let model = env("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let model_base_url = env("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model_timeout = env("LLM_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        let use_real_ai = !args.contains(&"--offline".to_string())
            && env("USE_REAL_AI")
                .map(|v| !(v.eq_ignore_ascii_case("false") || v == "0"))
                .unwrap_or(true);

        if profile.requires_model() && api_key.is_none() {
            return Err(ConfigError::MissingApiKey(profile));
        }

        Ok(Config {
            port,
            profile,
            memory_path,
            api_key,
            model,
            model_base_url,
            model_timeout,
            use_real_ai,
        })
    }

    /// Model settings, when the hosted model should be used.
    pub fn gemini(&self) -> Option<GeminiConfig> {
        if !self.use_real_ai {
            return None;
        }
        self.api_key.as_ref().map(|key| GeminiConfig {
            api_key: key.clone(),
            model: self.model.clone(),
            base_url: self.model_base_url.clone(),
            timeout: self.model_timeout,
        })
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}
