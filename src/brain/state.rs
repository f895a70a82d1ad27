// Game-state snapshots received per request, and the decision returned.

use serde::{Deserialize, Deserializer, Serialize};

use super::action::Action;

fn default_stat() -> f64 {
    100.0
}

/// Render a health or energy value: whole numbers without decimals,
/// everything else to one decimal place.
pub fn display_stat(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

/// The player-controlled fighter. Rebuilt from each request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// Fractional: the clients regenerate energy and scale damage per frame.
    #[serde(default = "default_stat")]
    pub health: f64,
    #[serde(default = "default_stat")]
    pub energy: f64,
    #[serde(rename = "onGround", default)]
    pub grounded: bool,
}

impl Default for AgentState {
    fn default() -> Self {
        Self {
            health: 100.0,
            energy: 100.0,
            grounded: false,
        }
    }
}

/// What the enemy is currently doing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EnemyActivity {
    #[default]
    Idle,
    Attacking,
    Other(String),
}

impl From<String> for EnemyActivity {
    fn from(s: String) -> Self {
        match s.as_str() {
            "idle" => EnemyActivity::Idle,
            "attacking" => EnemyActivity::Attacking,
            _ => EnemyActivity::Other(s),
        }
    }
}

impl From<EnemyActivity> for String {
    fn from(a: EnemyActivity) -> Self {
        match a {
            EnemyActivity::Idle => "idle".to_string(),
            EnemyActivity::Attacking => "attacking".to_string(),
            EnemyActivity::Other(s) => s,
        }
    }
}

impl EnemyActivity {
    pub fn as_str(&self) -> &str {
        match self {
            EnemyActivity::Idle => "idle",
            EnemyActivity::Attacking => "attacking",
            EnemyActivity::Other(s) => s,
        }
    }
}

fn default_enemy_type() -> String {
    "Unknown".to_string()
}

/// The opponent as seen by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyState {
    #[serde(rename = "type", default = "default_enemy_type")]
    pub kind: String,
    #[serde(default = "default_stat")]
    pub health: f64,
    /// Absent in the coaching client's payload, which sends `distance` at the
    /// top level instead.
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(rename = "state", default)]
    pub activity: EnemyActivity,
}

impl Default for EnemyState {
    fn default() -> Self {
        Self {
            kind: default_enemy_type(),
            health: 100.0,
            distance: None,
            activity: EnemyActivity::Idle,
        }
    }
}

impl EnemyState {
    pub const DEFAULT_DISTANCE: f64 = 100.0;

    /// Distance in abstract units, never negative.
    pub fn distance(&self) -> f64 {
        self.distance.unwrap_or(Self::DEFAULT_DISTANCE).max(0.0)
    }
}

fn default_zone() -> String {
    "Unknown".to_string()
}

fn default_lighting() -> String {
    "normal".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Hazards arrive as a list, or as a single label such as `"dynamic"`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) if s.trim().is_empty() => Vec::new(),
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default = "default_zone")]
    pub zone: String,
    #[serde(default = "default_lighting")]
    pub lighting: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub hazards: Vec<String>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            zone: default_zone(),
            lighting: default_lighting(),
            hazards: Vec::new(),
        }
    }
}

fn default_dial() -> u8 {
    50
}

/// Numeric coaching dials sent by the arena client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachingProfile {
    #[serde(default = "default_dial")]
    pub aggression: u8,
    #[serde(default = "default_dial")]
    pub caution: u8,
}

impl Default for CoachingProfile {
    fn default() -> Self {
        Self {
            aggression: 50,
            caution: 50,
        }
    }
}

impl CoachingProfile {
    /// Style line derived from the dials. Aggression is checked first.
    pub fn style(&self) -> &'static str {
        if self.aggression > 70 {
            "VERY AGGRESSIVE - prioritize attacking and finishing the opponent quickly"
        } else if self.aggression > 50 {
            "AGGRESSIVE - favor offensive actions when opportunities arise"
        } else if self.caution > 70 {
            "VERY DEFENSIVE - prioritize survival and safe positioning"
        } else if self.caution > 50 {
            "DEFENSIVE - play it safe and protect yourself"
        } else {
            "BALANCED - mix offense and defense based on situation"
        }
    }
}

/// An action with its justification. Confidence is always within [0, 1];
/// a NaN becomes 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub reasoning: String,
    pub confidence: f64,
}

impl Decision {
    pub fn new(action: Action, reasoning: impl Into<String>, confidence: f64) -> Self {
        Self {
            action,
            reasoning: reasoning.into(),
            confidence: if confidence.is_nan() {
                0.0
            } else {
                confidence.clamp(0.0, 1.0)
            },
        }
    }
}
