// Post-battle reflection: turns a battle summary into a short lesson.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::parse::extract_json_object;
use super::policy::weighted_choice;
use super::state::CoachingProfile;

const MAX_IMPROVEMENTS: usize = 2;
/// Fights longer than this many seconds earn a "finish faster" note.
const LONG_FIGHT_SECS: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Victory,
    Defeat,
}

impl Outcome {
    /// `"victory"` in any case is a win; every other tag is a loss.
    pub fn from_tag(tag: &str) -> Self {
        if tag.trim().eq_ignore_ascii_case("victory") {
            Outcome::Victory
        } else {
            Outcome::Defeat
        }
    }

    pub fn from_final_hp(final_hp: f64) -> Self {
        if final_hp > 0.0 {
            Outcome::Victory
        } else {
            Outcome::Defeat
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Victory => "victory",
            Outcome::Defeat => "defeat",
        }
    }
}

/// Direction the agent's self-assessment moved after a fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceChange {
    #[serde(rename = "Much more confident")]
    MuchMore,
    #[serde(rename = "More confident")]
    More,
    #[serde(rename = "Less confident")]
    Less,
    #[serde(rename = "Same")]
    Same,
}

impl ConfidenceChange {
    fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        if label.contains("much more") {
            Some(ConfidenceChange::MuchMore)
        } else if label.contains("more") {
            Some(ConfidenceChange::More)
        } else if label.contains("less") {
            Some(ConfidenceChange::Less)
        } else if label.contains("same") {
            Some(ConfidenceChange::Same)
        } else {
            None
        }
    }
}

fn default_enemy() -> String {
    "enemy".to_string()
}

/// Actions used in a fight: their names, or only how many there were.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionLog {
    Count(u64),
    Names(Vec<String>),
}

impl Default for ActionLog {
    fn default() -> Self {
        ActionLog::Names(Vec::new())
    }
}

impl fmt::Display for ActionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionLog::Count(n) => write!(f, "{n} actions"),
            ActionLog::Names(names) if names.is_empty() => f.write_str("none"),
            ActionLog::Names(names) => f.write_str(&names.join(", ")),
        }
    }
}

/// What happened in a finished battle. Damage fields also accept the
/// camelCase names the narrative client sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSummary {
    #[serde(default = "default_enemy")]
    pub enemy_type: String,
    /// Seconds.
    #[serde(default)]
    pub duration: f64,
    #[serde(default, alias = "damageTaken")]
    pub damage_taken: f64,
    #[serde(default, alias = "damageDealt")]
    pub damage_dealt: f64,
    #[serde(default)]
    pub actions: ActionLog,
}

impl Default for BattleSummary {
    fn default() -> Self {
        Self {
            enemy_type: default_enemy(),
            duration: 0.0,
            damage_taken: 0.0,
            damage_dealt: 0.0,
            actions: ActionLog::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub lesson: String,
    pub improvements: Vec<String>,
    pub confidence_change: ConfidenceChange,
}

/// Templated lesson keyed by outcome and damage bucket.
pub fn reflect<R: Rng + ?Sized>(summary: &BattleSummary, outcome: Outcome, rng: &mut R) -> Reflection {
    let enemy = &summary.enemy_type;
    let (lesson, mut improvements): (String, Vec<&str>) = match outcome {
        Outcome::Victory if summary.damage_taken < 20.0 => (
            format!("Dominated {enemy} with minimal damage"),
            vec!["Maintain aggressive positioning"],
        ),
        Outcome::Victory if summary.damage_taken < 50.0 => (
            format!("Defeated {enemy} effectively"),
            vec!["Could dodge more incoming attacks"],
        ),
        Outcome::Victory => (
            format!("Hard-fought victory against {enemy}"),
            vec!["Need better defensive timing", "Watch for attack patterns"],
        ),
        Outcome::Defeat if summary.damage_dealt < 30.0 => (
            format!("Learned from defeat against {enemy}"),
            vec!["Must be more aggressive", "Close distance faster"],
        ),
        Outcome::Defeat => (
            format!("Learned from defeat against {enemy}"),
            vec!["Better retreat timing needed", "Monitor own health more carefully"],
        ),
    };

    if summary.duration > LONG_FIGHT_SECS {
        improvements.push("End fights faster - too drawn out");
    }
    improvements.truncate(MAX_IMPROVEMENTS);

    let weights: &[(f64, ConfidenceChange)] = match outcome {
        Outcome::Victory => &[(0.5, ConfidenceChange::More), (0.5, ConfidenceChange::MuchMore)],
        Outcome::Defeat => &[(0.5, ConfidenceChange::Less), (0.5, ConfidenceChange::Same)],
    };
    let confidence_change = weighted_choice(weights, rng)
        .copied()
        .unwrap_or(ConfidenceChange::Same);

    Reflection {
        lesson,
        improvements: improvements.into_iter().map(String::from).collect(),
        confidence_change,
    }
}

#[derive(Deserialize)]
struct RawReflection {
    lesson: Option<String>,
    #[serde(default)]
    improvements: Vec<String>,
    confidence_change: Option<String>,
}

/// Parse a model-written reflection. `None` when unusable.
pub fn parse_reflection(text: &str) -> Option<Reflection> {
    let block = extract_json_object(text)?;
    let raw: RawReflection = serde_json::from_str(block).ok()?;
    let lesson = raw.lesson.filter(|l| !l.trim().is_empty())?;
    let mut improvements = raw.improvements;
    improvements.truncate(MAX_IMPROVEMENTS);
    let confidence_change = raw
        .confidence_change
        .as_deref()
        .and_then(ConfidenceChange::from_label)
        .unwrap_or(ConfidenceChange::Same);
    Some(Reflection {
        lesson,
        improvements,
        confidence_change,
    })
}

// ── Match records (coaching arena) ────────────────────────────────────

/// One finished arena match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub run: u32,
    pub outcome: Outcome,
    pub survival_time: f64,
    pub coaching: CoachingProfile,
}

/// Matches played since the last reset.
#[derive(Debug, Clone, PartialEq)]
pub struct LearningHistory {
    run_number: u32,
    records: Vec<MatchRecord>,
}

impl Default for LearningHistory {
    fn default() -> Self {
        Self {
            run_number: 1,
            records: Vec::new(),
        }
    }
}

/// Reflection text plus the run number of the next match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReflection {
    pub reflection: String,
    pub run_number: u32,
}

impl LearningHistory {
    pub fn run_number(&self) -> u32 {
        self.run_number
    }

    /// Matches recorded since the last reset, oldest first.
    pub fn matches(&self) -> &[MatchRecord] {
        &self.records
    }

    /// Record a match and advance the run counter.
    pub fn record(&mut self, survival_time: f64, final_hp: f64, coaching: CoachingProfile) -> MatchReflection {
        let outcome = Outcome::from_final_hp(final_hp);
        self.records.push(MatchRecord {
            run: self.run_number,
            outcome,
            survival_time,
            coaching,
        });

        let reflection = match outcome {
            Outcome::Victory => format!(
                "Victory! The coaching strategy worked. Survived {survival_time}s with aggressive plays."
            ),
            Outcome::Defeat => format!(
                "Defeated after {survival_time}s. Need to adjust strategy based on coaching parameters."
            ),
        };

        self.run_number += 1;
        MatchReflection {
            reflection,
            run_number: self.run_number,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
