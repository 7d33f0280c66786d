//! Mutable match state — players, towers, troops, and the battle map.
//!
//! Every struct here is plain data: no locking, no I/O, no timers beyond the
//! odd `std::time::Instant` bookmark that pure engine functions compare
//! against an explicit `now` parameter. The session runtime (`rk-session`)
//! is the only place a `GameState` is wrapped in a lock.

use std::collections::VecDeque;
use std::time::Instant;

use crate::enums::{AggroPriority, GameMode, TowerKind, TowerRole, TroopKind};
use crate::ids::Username;

// =============================================================================
// Geometry
// =============================================================================

/// A point on the 21x21 battle grid (tick mode). Not clamped by construction —
/// callers clamp explicitly after movement (§4.9 step 5).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// An axis-aligned tower footprint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn center(self) -> Position {
        Position::new((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Nearest point on the rectangle's boundary (or interior) to `p`.
    /// Used so troops can attack from the footprint's edge (§4.9 step 2).
    pub fn nearest_point(self, p: Position) -> Position {
        Position::new(
            p.x.clamp(self.x0.min(self.x1), self.x0.max(self.x1)),
            p.y.clamp(self.y0.min(self.y1), self.y0.max(self.y1)),
        )
    }

    pub fn edge_distance(self, p: Position) -> f64 {
        self.nearest_point(p).distance_to(p)
    }

    pub fn contains(self, p: Position) -> bool {
        let (xmin, xmax) = (self.x0.min(self.x1), self.x0.max(self.x1));
        let (ymin, ymax) = (self.y0.min(self.y1), self.y0.max(self.y1));
        p.x >= xmin && p.x <= xmax && p.y >= ymin && p.y <= ymax
    }
}

// =============================================================================
// User (persisted)
// =============================================================================

/// A registered account. Mutated only at registration and at match
/// conclusion (EXP/wins/gold), per §3.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct User {
    pub id: crate::ids::UserId,
    pub username: Username,
    pub password_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_login: chrono::DateTime<chrono::Utc>,
    pub is_active: bool,
    pub level: u32,
    pub exp: u32,
    pub games_played: u32,
    pub games_won: u32,
    pub gold: u64,
    pub avatar: String,
}

impl User {
    pub fn new(id: crate::ids::UserId, username: Username, password_hash: String) -> Self {
        let now = chrono::Utc::now();
        Self {
            id,
            username,
            password_hash,
            created_at: now,
            last_login: now,
            is_active: true,
            level: 1,
            exp: 0,
            games_played: 0,
            games_won: 0,
            gold: 0,
            avatar: "default".to_string(),
        }
    }

    /// EXP required to advance past the current level.
    pub fn max_exp_for_level(level: u32) -> u32 {
        (100.0 * 1.5f64.powi(level as i32 - 1)).round() as u32
    }

    /// Add EXP, carrying overflow into as many level-ups as it covers.
    pub fn add_exp(&mut self, amount: u32) {
        self.exp += amount;
        loop {
            let needed = Self::max_exp_for_level(self.level);
            if self.exp >= needed {
                self.exp -= needed;
                self.level += 1;
            } else {
                break;
            }
        }
    }
}

// =============================================================================
// Catalog templates (immutable)
// =============================================================================

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TroopTemplate {
    pub name: String,
    pub max_hp: f64,
    pub atk: f64,
    pub dmg: f64,
    pub def: f64,
    pub mana_cost: u8,
    pub crit_percent: f64,
    pub exp_reward: u32,
    pub speed: f64,
    pub range: f64,
    pub attack_speed: f64,
    pub kind: TroopKind,
    pub aggro_priority: AggroPriority,
    pub rarity: crate::enums::Rarity,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TowerTemplate {
    pub kind: TowerKind,
    pub max_hp: f64,
    pub atk: f64,
    pub def: f64,
    pub crit_percent: f64,
    pub exp_reward: u32,
    pub range: f64,
    pub attack_speed: f64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AvatarTemplate {
    pub name: String,
    #[serde(default)]
    pub icon: String,
}

// =============================================================================
// Towers (per-player instances)
// =============================================================================

/// A player's tower, scaled from `TowerTemplate` at match start. `area` and
/// `last_attack_at` are populated only in tick mode; turn mode leaves them
/// `None` and never reads them.
#[derive(Debug, Clone)]
pub struct Tower {
    pub role: TowerRole,
    pub max_hp: f64,
    pub hp: f64,
    pub atk: f64,
    pub def: f64,
    pub crit_percent: f64,
    pub exp_reward: u32,
    pub range: f64,
    pub attack_speed: f64,
    pub area: Option<Rect>,
    pub last_attack_at: Option<Instant>,
    pub is_destroyed: bool,
}

impl Tower {
    pub fn from_template(role: TowerRole, template: &TowerTemplate) -> Self {
        let max_hp = template.max_hp;
        Self {
            role,
            max_hp,
            hp: max_hp,
            atk: template.atk,
            def: template.def,
            crit_percent: template.crit_percent,
            exp_reward: template.exp_reward,
            range: template.range,
            attack_speed: template.attack_speed,
            area: None,
            last_attack_at: None,
            is_destroyed: false,
        }
    }

    /// Damage the tower, clamping HP to `[0, max_hp]` (invariant 2). Marks
    /// `is_destroyed` once HP reaches 0; a destroyed tower can never be
    /// healed or revived regardless of later calls.
    pub fn apply_damage(&mut self, amount: f64) {
        if self.is_destroyed {
            return;
        }
        self.hp = (self.hp - amount.max(0.0)).max(0.0);
        if self.hp <= 0.0 {
            self.hp = 0.0;
            self.is_destroyed = true;
        }
    }

    /// Heal the tower, clamping to `max_hp`. No-op once destroyed.
    pub fn apply_heal(&mut self, amount: f64) -> f64 {
        if self.is_destroyed {
            return 0.0;
        }
        let before = self.hp;
        self.hp = (self.hp + amount.max(0.0)).min(self.max_hp);
        self.hp - before
    }
}

/// The three towers every player starts a match with.
#[derive(Debug, Clone)]
pub struct Towers {
    pub king: Tower,
    pub guard1: Tower,
    pub guard2: Tower,
}

impl Towers {
    pub fn get(&self, role: TowerRole) -> &Tower {
        match role {
            TowerRole::King => &self.king,
            TowerRole::Guard1 => &self.guard1,
            TowerRole::Guard2 => &self.guard2,
        }
    }

    pub fn get_mut(&mut self, role: TowerRole) -> &mut Tower {
        match role {
            TowerRole::King => &mut self.king,
            TowerRole::Guard1 => &mut self.guard1,
            TowerRole::Guard2 => &mut self.guard2,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tower> {
        [&self.king, &self.guard1, &self.guard2].into_iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Tower> {
        [&mut self.king, &mut self.guard1, &mut self.guard2].into_iter()
    }

    /// Both guard towers destroyed — the king becomes a legal attack target.
    pub fn king_exposed(&self) -> bool {
        self.guard1.hp <= 0.0 && self.guard2.hp <= 0.0
    }

    pub fn destroyed_count(&self) -> usize {
        self.iter().filter(|t| t.is_destroyed).count()
    }

    /// The lowest-HP *living* tower, ties broken by iteration order
    /// (king, guard1, guard2) via strict-less comparison (§4.8 tie-break
    /// rule).
    pub fn lowest_hp_mut(&mut self) -> Option<&mut Tower> {
        let king_hp = self.king.hp;
        let guard1_hp = self.guard1.hp;
        let guard2_hp = self.guard2.hp;

        let mut best_role = None;
        let mut best_hp = f64::INFINITY;
        for (role, hp) in [
            (TowerRole::King, king_hp),
            (TowerRole::Guard1, guard1_hp),
            (TowerRole::Guard2, guard2_hp),
        ] {
            if hp > 0.0 && hp < best_hp {
                best_hp = hp;
                best_role = Some(role);
            }
        }
        best_role.map(|r| self.get_mut(r))
    }
}

// =============================================================================
// Troop — a playable hand/queue card
// =============================================================================

/// A card the player can play: a deep copy of a `TroopTemplate`'s mutable
/// subset, reset to full HP each time it's drawn (§3 Troop).
#[derive(Debug, Clone)]
pub struct Troop {
    pub name: String,
    pub max_hp: f64,
    pub hp: f64,
    pub atk: f64,
    pub dmg: f64,
    pub def: f64,
    pub mana_cost: u8,
    pub crit_percent: f64,
    pub exp_reward: u32,
    pub kind: TroopKind,
    pub aggro_priority: AggroPriority,
    pub speed: f64,
    pub range: f64,
    pub attack_speed: f64,
}

impl From<&TroopTemplate> for Troop {
    fn from(t: &TroopTemplate) -> Self {
        Self {
            name: t.name.clone(),
            max_hp: t.max_hp,
            hp: t.max_hp,
            atk: t.atk,
            dmg: t.dmg,
            def: t.def,
            mana_cost: t.mana_cost,
            crit_percent: t.crit_percent,
            exp_reward: t.exp_reward,
            kind: t.kind,
            aggro_priority: t.aggro_priority,
            speed: t.speed,
            range: t.range,
            attack_speed: t.attack_speed,
        }
    }
}

// =============================================================================
// TroopInstance — a spawned map unit (tick mode only)
// =============================================================================

#[derive(Debug, Clone)]
pub struct TroopInstance {
    pub id: crate::ids::TroopInstanceId,
    pub name: String,
    pub owner: crate::enums::Seat,
    pub position: Position,
    pub max_hp: f64,
    pub hp: f64,
    pub atk: f64,
    pub dmg: f64,
    pub def: f64,
    pub speed: f64,
    pub range: f64,
    pub attack_speed: f64,
    pub kind: TroopKind,
    pub aggro_priority: AggroPriority,
    pub exp_reward: u32,
    pub crit_percent: f64,
    pub level: u32,
    pub last_attack_at: Option<Instant>,
    pub is_dead: bool,
}

impl TroopInstance {
    /// `level` is the owning player's match level at spawn time — tick-mode
    /// troops don't level up mid-match, so it's captured once here the same
    /// way `calculateHeal`/`calculateDamage` take the player's level directly
    /// in turn mode.
    pub fn spawn(
        id: crate::ids::TroopInstanceId,
        card: &Troop,
        owner: crate::enums::Seat,
        position: Position,
        level: u32,
    ) -> Self {
        Self {
            id,
            name: card.name.clone(),
            owner,
            position,
            max_hp: card.max_hp,
            hp: card.max_hp,
            atk: card.atk,
            dmg: card.dmg,
            def: card.def,
            speed: card.speed,
            range: card.range,
            attack_speed: card.attack_speed,
            kind: card.kind,
            aggro_priority: card.aggro_priority,
            exp_reward: card.exp_reward,
            crit_percent: card.crit_percent,
            level,
            last_attack_at: None,
            is_dead: false,
        }
    }

    pub fn apply_damage(&mut self, amount: f64) {
        if self.is_dead {
            return;
        }
        self.hp = (self.hp - amount.max(0.0)).max(0.0);
        if self.hp <= 0.0 {
            self.hp = 0.0;
            self.is_dead = true;
        }
    }

    pub fn apply_heal(&mut self, amount: f64) {
        if self.is_dead {
            return;
        }
        self.hp = (self.hp + amount.max(0.0)).min(self.max_hp);
    }

    pub fn hp_fraction(&self) -> f64 {
        if self.max_hp <= 0.0 {
            0.0
        } else {
            self.hp / self.max_hp
        }
    }
}

// =============================================================================
// Battle map — shared container of live troop instances (tick mode)
// =============================================================================

/// Holds every live troop on the board, both players' together — towers are
/// addressed through each `Player`'s `Towers` directly since there are only
/// ever three per side. See `rk-engine::battle_system` for the operations
/// (add / iterate / cleanup-dead) that act on this container.
#[derive(Debug, Clone, Default)]
pub struct BattleMap {
    pub troops: Vec<TroopInstance>,
}

// =============================================================================
// Player
// =============================================================================

#[derive(Debug, Clone)]
pub struct Player {
    pub user: Username,
    pub seat: crate::enums::Seat,
    pub level: u32,
    pub mana: f64,
    pub towers: Towers,
    pub hand: Vec<Troop>,
    pub queue: VecDeque<Troop>,
    pub turn_count: u32,
    pub gold_this_match: u64,
    pub last_mana_regen_at: Option<Instant>,
}

pub const MAX_MANA: f64 = 10.0;
pub const INITIAL_MANA: f64 = 5.0;

impl Player {
    /// Deduct `cost` mana if affordable; returns `false` (no-op) if not.
    pub fn try_spend_mana(&mut self, cost: f64) -> bool {
        if self.mana < cost {
            return false;
        }
        self.mana -= cost;
        true
    }

    pub fn refund_mana(&mut self, amount: f64) {
        self.mana = (self.mana + amount).min(MAX_MANA);
    }

    pub fn gain_mana(&mut self, amount: f64) {
        self.mana = (self.mana + amount).min(MAX_MANA);
    }

    /// Rotate a played card: move it to the tail of the reserve queue and
    /// bring the queue's head into its place in hand (§3 Troop/queue).
    pub fn rotate_hand(&mut self, hand_index: usize, replacement: Troop) {
        let played = std::mem::replace(&mut self.hand[hand_index], replacement);
        self.queue.push_back(played);
    }

    pub fn find_hand_index(&self, troop_name: &str) -> Option<usize> {
        self.hand.iter().position(|t| t.name == troop_name)
    }
}

// =============================================================================
// Game state
// =============================================================================

#[derive(Debug, Clone)]
pub struct TurnPhase {
    pub current: crate::enums::Seat,
    pub armed_at: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct TickPhase {
    pub start_at: Instant,
    pub max_duration: std::time::Duration,
    pub battle: BattleMap,
}

#[derive(Debug, Clone)]
pub enum Phase {
    Turn(TurnPhase),
    Tick(TickPhase),
}

#[derive(Debug, Clone)]
pub struct GameState {
    pub mode: GameMode,
    pub player1: Player,
    pub player2: Player,
    pub phase: Phase,
    pub winner_declared: bool,
}

impl GameState {
    pub fn player(&self, seat: crate::enums::Seat) -> &Player {
        match seat {
            crate::enums::Seat::Player1 => &self.player1,
            crate::enums::Seat::Player2 => &self.player2,
        }
    }

    pub fn player_mut(&mut self, seat: crate::enums::Seat) -> &mut Player {
        match seat {
            crate::enums::Seat::Player1 => &mut self.player1,
            crate::enums::Seat::Player2 => &mut self.player2,
        }
    }

    pub fn opponent_seat(seat: crate::enums::Seat) -> crate::enums::Seat {
        match seat {
            crate::enums::Seat::Player1 => crate::enums::Seat::Player2,
            crate::enums::Seat::Player2 => crate::enums::Seat::Player1,
        }
    }

    pub fn seat_of(&self, username: &Username) -> Option<crate::enums::Seat> {
        if &self.player1.user == username {
            Some(crate::enums::Seat::Player1)
        } else if &self.player2.user == username {
            Some(crate::enums::Seat::Player2)
        } else {
            None
        }
    }
}
