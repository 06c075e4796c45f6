use std::collections::BTreeMap;

use arena_shared::math::Vec2;
use arena_shared::protocol::{EntityKind, Facing, SkillKind};

use crate::ai::AiBrain;
use crate::error::{ActionError, AuthError};

/// Entity id. For human players this is the id of their connection.
pub type EntityId = u32;

pub const PLAYER_MAX_HEALTH: u32 = 100;
pub const PLAYER_MAX_MANA: u32 = 100;

/// A validated player identity (`0x` + 40 hex digits).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(String);

impl Identity {
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let raw = raw.trim();
        let hex = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .ok_or(AuthError::InvalidIdentity)?;
        if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AuthError::InvalidIdentity);
        }
        Ok(Self(raw.to_string()))
    }

    /// `Warrior_` plus the last four characters.
    pub fn display_name(&self) -> String {
        format!("Warrior_{}", &self.0[self.0.len() - 4..])
    }

    /// First six and last four characters, e.g. `0x5290...9EE7`.
    pub fn short_tag(&self) -> String {
        format!("{}...{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

/// Result of applying damage to one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageOutcome {
    /// Health actually removed (0 when shielded or already down)
    pub dealt: u32,
    /// True only on the hit that took health to 0
    pub defeated: bool,
}

/// A combatant: human player or enemy.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub tag: String,
    pub position: Vec2,
    pub health: u32,
    pub max_health: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub level: u32,
    pub alive: bool,
    /// Persistent entities respawn after defeat; others are removed.
    pub persistent: bool,
    pub last_movement: Option<u64>,
    pub last_attack: Option<u64>,
    pub shield_until: Option<u64>,
    pub facing: Facing,
    pub moving: bool,
    pub attacking: bool,
    pub casting: bool,
    /// Absolute expiry per skill
    cooldowns: BTreeMap<SkillKind, u64>,
    pub brain: Option<AiBrain>,
}

impl Entity {
    pub fn player(id: EntityId, identity: &Identity, position: Vec2) -> Self {
        Self {
            id,
            kind: EntityKind::Player,
            name: identity.display_name(),
            tag: identity.short_tag(),
            position,
            health: PLAYER_MAX_HEALTH,
            max_health: PLAYER_MAX_HEALTH,
            mana: PLAYER_MAX_MANA,
            max_mana: PLAYER_MAX_MANA,
            level: 1,
            alive: true,
            persistent: true,
            last_movement: None,
            last_attack: None,
            shield_until: None,
            facing: Facing::default(),
            moving: false,
            attacking: false,
            casting: false,
            cooldowns: BTreeMap::new(),
            brain: None,
        }
    }

    pub fn enemy(id: EntityId, brain: AiBrain, position: Vec2) -> Self {
        let stats = brain.stats();
        let kind = brain.archetype.kind();
        Self {
            id,
            kind,
            name: format!("{}_{}", brain.archetype.label(), id),
            tag: String::new(),
            position,
            health: stats.max_health,
            max_health: stats.max_health,
            mana: 0,
            max_mana: 0,
            level: stats.level,
            alive: true,
            persistent: false,
            last_movement: None,
            last_attack: None,
            shield_until: None,
            facing: Facing::default(),
            moving: false,
            attacking: false,
            casting: false,
            cooldowns: BTreeMap::new(),
            brain: Some(brain),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive && self.health > 0
    }

    pub fn is_shielded(&self, now: u64) -> bool {
        self.shield_until.is_some_and(|until| now < until)
    }

    /// Remove up to `amount` health. Shielded or downed entities take nothing.
    pub fn take_damage(&mut self, amount: u32, now: u64) -> DamageOutcome {
        if !self.is_alive() || self.is_shielded(now) {
            return DamageOutcome {
                dealt: 0,
                defeated: false,
            };
        }
        let dealt = amount.min(self.health);
        self.health -= dealt;
        let defeated = self.health == 0;
        if defeated {
            self.alive = false;
            self.moving = false;
        }
        let health = self.health;
        if let Some(brain) = self.brain.as_mut() {
            brain.on_damaged(health, now);
        }
        DamageOutcome { dealt, defeated }
    }

    /// Restore up to `amount` health, returning what was actually restored.
    pub fn heal(&mut self, amount: u32) -> u32 {
        if !self.is_alive() {
            return 0;
        }
        let restored = amount.min(self.max_health - self.health);
        self.health += restored;
        restored
    }

    pub fn restore_mana(&mut self, amount: u32) {
        self.mana = self.mana.saturating_add(amount).min(self.max_mana);
    }

    /// Deduct `cost` mana, or fail without touching anything.
    pub fn spend_mana(&mut self, cost: u32) -> Result<(), ActionError> {
        if self.mana < cost {
            return Err(ActionError::InsufficientMana {
                required: cost,
                available: self.mana,
            });
        }
        self.mana -= cost;
        Ok(())
    }

    pub fn cooldown_expiry(&self, skill: SkillKind) -> Option<u64> {
        self.cooldowns.get(&skill).copied()
    }

    /// Milliseconds left on `skill`, `None` when ready.
    pub fn cooldown_remaining(&self, skill: SkillKind, now: u64) -> Option<u64> {
        self.cooldown_expiry(skill)
            .filter(|&expiry| now < expiry)
            .map(|expiry| expiry - now)
    }

    pub fn start_cooldown(&mut self, skill: SkillKind, expiry: u64) {
        self.cooldowns.insert(skill, expiry);
    }

    /// Turn towards the dominant axis of `delta`. Zero deltas keep the facing.
    pub fn face_towards(&mut self, delta: Vec2) {
        if delta.x == 0.0 && delta.y == 0.0 {
            return;
        }
        self.facing = if delta.x.abs() >= delta.y.abs() {
            if delta.x > 0.0 {
                Facing::Right
            } else {
                Facing::Left
            }
        } else if delta.y > 0.0 {
            Facing::Down
        } else {
            Facing::Up
        };
    }

    /// Bring a defeated entity back in place with full vitals.
    pub fn revive(&mut self, position: Vec2) {
        self.health = self.max_health;
        self.mana = self.max_mana;
        self.alive = true;
        self.position = position;
        self.shield_until = None;
        self.last_movement = None;
        self.moving = false;
        self.attacking = false;
        self.casting = false;
    }
}
