//! Shared enumerations.

use serde::{Deserialize, Serialize};

/// The two coexisting game modes (§1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Turn-based mode: alternating single-action turns with a per-turn deadline.
    Simple,
    /// Continuous mode: free-form deployment on a tick-driven battle map.
    Enhanced,
}

/// Troop archetype, used to decide aggro behavior and special abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TroopKind {
    Melee,
    Ranged,
    Tank,
    Healer,
}

/// A troop's preference for attacking towers vs. enemy troops (§4.9 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggroPriority {
    Tower,
    Troop,
}

/// Tower archetype — determines base stats before per-player scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TowerKind {
    King,
    Guard,
}

/// A tower's slot within a player's three towers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TowerRole {
    King,
    Guard1,
    Guard2,
}

impl TowerRole {
    pub fn kind(self) -> TowerKind {
        match self {
            TowerRole::King => TowerKind::King,
            TowerRole::Guard1 | TowerRole::Guard2 => TowerKind::Guard,
        }
    }

    /// Parse the wire-protocol target string (`"guard1"`, `"guard2"`, `"king"`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "king" => Some(TowerRole::King),
            "guard1" => Some(TowerRole::Guard1),
            "guard2" => Some(TowerRole::Guard2),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TowerRole::King => "king",
            TowerRole::Guard1 => "guard1",
            TowerRole::Guard2 => "guard2",
        }
    }
}

/// Cosmetic rarity tier, presentation-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

/// Which of the two seats in a room a player occupies. Drives lane
/// orientation and mirroring (§4.9 spawn contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    Player1,
    Player2,
}

/// Outcome of a finished match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MatchOutcome {
    Winner { username: String },
    Draw,
}
