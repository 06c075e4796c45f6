use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::WorldConfig;

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Chat lines are cut to this many characters after markup is stripped.
pub const MAX_CHAT_LEN: usize = 100;

// === Shared enums ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Player,
    Goblin,
    Orc,
    Skeleton,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "snake_case")]
pub enum TerrainKind {
    Wall,
    Grass,
    Rock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    Fireball,
    Heal,
    Shield,
}

impl SkillKind {
    pub fn name(self) -> &'static str {
        match self {
            SkillKind::Fireball => "fireball",
            SkillKind::Heal => "heal",
            SkillKind::Shield => "shield",
        }
    }
}

/// Anything an entity can visibly do, used for client effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    Melee,
    Fireball,
    Heal,
    Shield,
}

impl From<SkillKind> for Ability {
    fn from(skill: SkillKind) -> Self {
        match skill {
            SkillKind::Fireball => Ability::Fireball,
            SkillKind::Heal => Ability::Heal,
            SkillKind::Shield => Ability::Shield,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "snake_case")]
pub enum LeaveReason {
    Disconnected,
    Defeated,
}

// === Server -> Client ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "authenticated")]
    Authenticated(AuthenticatedMsg),
    #[serde(rename = "auth_error")]
    AuthError(ErrorMsg),
    #[serde(rename = "existing_players")]
    ExistingPlayers(ExistingPlayersMsg),
    #[serde(rename = "player_joined")]
    PlayerJoined(EntityMsg),
    #[serde(rename = "player_left")]
    PlayerLeft(PlayerLeftMsg),
    #[serde(rename = "player_moved")]
    PlayerMoved(PlayerMovedMsg),
    #[serde(rename = "player_respawned")]
    PlayerRespawned(EntityMsg),
    #[serde(rename = "entity_damaged")]
    EntityDamaged(EntityDamagedMsg),
    #[serde(rename = "entity_healed")]
    EntityHealed(EntityHealedMsg),
    #[serde(rename = "entity_defeated")]
    EntityDefeated(EntityDefeatedMsg),
    #[serde(rename = "shield_activated")]
    ShieldActivated(ShieldActivatedMsg),
    #[serde(rename = "ability_used")]
    AbilityUsed(AbilityUsedMsg),
    #[serde(rename = "terrain_damaged")]
    TerrainDamaged(TerrainDamagedMsg),
    #[serde(rename = "terrain_destroyed")]
    TerrainDestroyed(TerrainDestroyedMsg),
    #[serde(rename = "terrain_spawned")]
    TerrainSpawned(TerrainSpawnedMsg),
    #[serde(rename = "chat_message")]
    ChatMessage(ChatBroadcastMsg),
    #[serde(rename = "server_update")]
    ServerUpdate(ServerUpdateMsg),
    #[serde(rename = "vitals")]
    Vitals(VitalsMsg),
    #[serde(rename = "action_rejected")]
    ActionRejected(ErrorMsg),
    #[serde(rename = "error")]
    Error(ErrorMsg),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedMsg {
    pub protocol_version: u32,
    pub entity: EntityWire,
    pub world_config: WorldConfig,
    pub terrain: Vec<TerrainWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct ErrorMsg {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct ExistingPlayersMsg {
    pub players: Vec<EntityWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct EntityMsg {
    pub entity: EntityWire,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeftMsg {
    pub entity_id: u32,
    pub reason: LeaveReason,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct PlayerMovedMsg {
    pub entity_id: u32,
    pub x: f64,
    pub y: f64,
    pub facing: Facing,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct EntityDamagedMsg {
    pub entity_id: u32,
    pub source_id: Option<u32>,
    pub amount: u32,
    pub health: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct EntityHealedMsg {
    pub entity_id: u32,
    pub amount: u32,
    pub health: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct EntityDefeatedMsg {
    pub entity_id: u32,
    pub by_id: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct ShieldActivatedMsg {
    pub entity_id: u32,
    pub expires_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct AbilityUsedMsg {
    pub entity_id: u32,
    pub ability: Ability,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct TerrainDamagedMsg {
    pub feature_id: u32,
    pub health: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct TerrainDestroyedMsg {
    pub feature_id: u32,
    pub kind: TerrainKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct TerrainSpawnedMsg {
    pub feature: TerrainWire,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct ChatBroadcastMsg {
    pub entity_id: u32,
    pub name: String,
    pub message: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct ServerUpdateMsg {
    pub timestamp: u64,
    pub player_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
pub struct VitalsMsg {
    pub health: u32,
    pub mana: u32,
    pub shielded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct EntityWire {
    pub id: u32,
    pub kind: EntityKind,
    pub name: String,
    /// Short form of the identity, empty for enemies
    pub tag: String,
    pub x: f64,
    pub y: f64,
    pub health: u32,
    pub max_health: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub level: u32,
    pub is_alive: bool,
    pub shielded: bool,
    pub facing: Facing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct TerrainWire {
    pub id: u32,
    pub kind: TerrainKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// `None` for indestructible walls
    pub health: Option<u32>,
    pub max_health: Option<u32>,
}

// === Client -> Server ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "authenticate")]
    Authenticate {
        #[serde(alias = "walletAddress")]
        identity: String,
    },
    #[serde(rename = "move")]
    Move { x: f64, y: f64 },
    #[serde(rename = "chat_message")]
    ChatMessage { message: String },
    #[serde(rename = "attack")]
    Attack { x: f64, y: f64 },
    #[serde(rename = "cast_skill")]
    CastSkill { skill: SkillKind },
}
