// Combat action vocabulary shared by both decision profiles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One label from the combat-action set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Attack,
    Defend,
    Dodge,
    Block,
    Jump,
    JumpAttack,
    Retreat,
    MoveCloser,
    MoveAway,
    WaitAndObserve,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Action::Attack,
        Action::Defend,
        Action::Dodge,
        Action::Block,
        Action::Jump,
        Action::JumpAttack,
        Action::Retreat,
        Action::MoveCloser,
        Action::MoveAway,
        Action::WaitAndObserve,
    ];

    /// Wire name, e.g. `JUMP_ATTACK`.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Attack => "ATTACK",
            Action::Defend => "DEFEND",
            Action::Dodge => "DODGE",
            Action::Block => "BLOCK",
            Action::Jump => "JUMP",
            Action::JumpAttack => "JUMP_ATTACK",
            Action::Retreat => "RETREAT",
            Action::MoveCloser => "MOVE_CLOSER",
            Action::MoveAway => "MOVE_AWAY",
            Action::WaitAndObserve => "WAIT_AND_OBSERVE",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    /// Case-insensitive; spaces and dashes are treated as underscores.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        Action::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == normalized)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}
