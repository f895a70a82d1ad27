// Tolerant parsing of free-text model output into a decision.
//
// Two shapes are accepted: a JSON object (`action`, `reasoning`,
// `confidence`) somewhere in the text, or `ACTION: <name>` / `REASON: <text>`
// lines. Anything else is a `ParseError`, which callers turn into the
// profile's fallback decision.

use serde::Deserialize;
use serde_json::Value;

use super::action::Action;
use super::policy::PolicyProfile;
use super::state::Decision;

/// Confidence assigned when the model does not state one.
pub const DEFAULT_MODEL_CONFIDENCE: f64 = 0.85;

const DEFAULT_REASONING: &str = "Analyzing situation and executing strategy...";

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("no decision found in response")]
    NotFound,
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing action")]
    MissingAction,
    #[error("action {0:?} is not available to this profile")]
    ForeignAction(String),
}

#[derive(Deserialize)]
struct RawDecision {
    action: Option<String>,
    reasoning: Option<String>,
    confidence: Option<Value>,
}

/// Slice from the first `{` to the last `}`, if both exist in that order.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn resolve_action(name: &str, profile: &PolicyProfile) -> Result<Action, ParseError> {
    name.parse::<Action>()
        .ok()
        .filter(|a| profile.allows(*a))
        .ok_or_else(|| ParseError::ForeignAction(name.to_string()))
}

/// Models sometimes quote the number. Non-finite values are ignored.
fn confidence_value(value: Option<Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|c| c.is_finite())
        .unwrap_or(DEFAULT_MODEL_CONFIDENCE)
}

fn parse_json(block: &str, profile: &PolicyProfile) -> Result<Decision, ParseError> {
    let raw: RawDecision = serde_json::from_str(block)?;
    let name = raw.action.ok_or(ParseError::MissingAction)?;
    let action = resolve_action(&name, profile)?;
    let reasoning = raw
        .reasoning
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_REASONING.to_string());
    Ok(Decision::new(action, reasoning, confidence_value(raw.confidence)))
}

/// Value after a `KEY:` prefix, matched case-insensitively at line start.
fn labelled_line<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines().find_map(|line| {
        let line = line.trim_start();
        let head = line.get(..key.len())?;
        if !head.eq_ignore_ascii_case(key) {
            return None;
        }
        line[key.len()..].trim_start().strip_prefix(':').map(str::trim)
    })
}

fn parse_lines(text: &str, profile: &PolicyProfile) -> Result<Decision, ParseError> {
    let value = labelled_line(text, "ACTION").ok_or(ParseError::NotFound)?;
    // Only the first token names the action; models like to append commentary.
    let name = value
        .split(|c: char| c.is_whitespace() || c == ',' || c == '.')
        .find(|t| !t.is_empty())
        .ok_or(ParseError::MissingAction)?;
    let action = resolve_action(name, profile)?;
    let reasoning = labelled_line(text, "REASON")
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_REASONING);
    Ok(Decision::new(action, reasoning, DEFAULT_MODEL_CONFIDENCE))
}

/// Parse model output for `profile`. A JSON block takes precedence over
/// labelled lines.
pub fn parse_decision(text: &str, profile: &PolicyProfile) -> Result<Decision, ParseError> {
    match extract_json_object(text) {
        Some(block) => parse_json(block, profile),
        None => parse_lines(text, profile),
    }
}
