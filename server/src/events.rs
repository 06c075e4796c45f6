//! Events produced by the core and their delivery targets.

use arena_shared::math::Vec2;
use arena_shared::protocol::{
    Ability, AbilityUsedMsg, ChatBroadcastMsg, EntityDamagedMsg, EntityDefeatedMsg,
    EntityHealedMsg, EntityMsg, EntityWire, ErrorMsg, Facing, LeaveReason, PlayerLeftMsg,
    PlayerMovedMsg, ServerMsg, ServerUpdateMsg, ShieldActivatedMsg, TerrainDamagedMsg,
    TerrainDestroyedMsg, TerrainKind, TerrainSpawnedMsg, TerrainWire,
};

use crate::entity::EntityId;
use crate::terrain::FeatureId;

/// A change to the shared world that every observer must see.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    EntityJoined(EntityWire),
    EntityLeft {
        id: EntityId,
        reason: LeaveReason,
    },
    EntityMoved {
        id: EntityId,
        position: Vec2,
        facing: Facing,
    },
    EntityDamaged {
        id: EntityId,
        source: Option<EntityId>,
        amount: u32,
        health: u32,
    },
    EntityHealed {
        id: EntityId,
        amount: u32,
        health: u32,
    },
    EntityDefeated {
        id: EntityId,
        by: Option<EntityId>,
    },
    EntityRespawned(EntityWire),
    ShieldActivated {
        id: EntityId,
        expires_at: u64,
    },
    AbilityUsed {
        id: EntityId,
        ability: Ability,
        at: Vec2,
    },
    TerrainDamaged {
        feature_id: FeatureId,
        health: u32,
    },
    TerrainDestroyed {
        feature_id: FeatureId,
        kind: TerrainKind,
    },
    TerrainSpawned(TerrainWire),
    ChatMessage {
        id: EntityId,
        name: String,
        message: String,
        timestamp: u64,
    },
    Snapshot {
        timestamp: u64,
        player_count: u32,
    },
}

impl GameEvent {
    pub fn into_server_msg(self) -> ServerMsg {
        match self {
            GameEvent::EntityJoined(entity) => ServerMsg::PlayerJoined(EntityMsg { entity }),
            GameEvent::EntityLeft { id, reason } => ServerMsg::PlayerLeft(PlayerLeftMsg {
                entity_id: id,
                reason,
            }),
            GameEvent::EntityMoved {
                id,
                position,
                facing,
            } => ServerMsg::PlayerMoved(PlayerMovedMsg {
                entity_id: id,
                x: position.x,
                y: position.y,
                facing,
            }),
            GameEvent::EntityDamaged {
                id,
                source,
                amount,
                health,
            } => ServerMsg::EntityDamaged(EntityDamagedMsg {
                entity_id: id,
                source_id: source,
                amount,
                health,
            }),
            GameEvent::EntityHealed { id, amount, health } => {
                ServerMsg::EntityHealed(EntityHealedMsg {
                    entity_id: id,
                    amount,
                    health,
                })
            }
            GameEvent::EntityDefeated { id, by } => ServerMsg::EntityDefeated(EntityDefeatedMsg {
                entity_id: id,
                by_id: by,
            }),
            GameEvent::EntityRespawned(entity) => ServerMsg::PlayerRespawned(EntityMsg { entity }),
            GameEvent::ShieldActivated { id, expires_at } => {
                ServerMsg::ShieldActivated(ShieldActivatedMsg {
                    entity_id: id,
                    expires_at,
                })
            }
            GameEvent::AbilityUsed { id, ability, at } => ServerMsg::AbilityUsed(AbilityUsedMsg {
                entity_id: id,
                ability,
                x: at.x,
                y: at.y,
            }),
            GameEvent::TerrainDamaged { feature_id, health } => {
                ServerMsg::TerrainDamaged(TerrainDamagedMsg { feature_id, health })
            }
            GameEvent::TerrainDestroyed { feature_id, kind } => {
                ServerMsg::TerrainDestroyed(TerrainDestroyedMsg { feature_id, kind })
            }
            GameEvent::TerrainSpawned(feature) => {
                ServerMsg::TerrainSpawned(TerrainSpawnedMsg { feature })
            }
            GameEvent::ChatMessage {
                id,
                name,
                message,
                timestamp,
            } => ServerMsg::ChatMessage(ChatBroadcastMsg {
                entity_id: id,
                name,
                message,
                timestamp,
            }),
            GameEvent::Snapshot {
                timestamp,
                player_count,
            } => ServerMsg::ServerUpdate(ServerUpdateMsg {
                timestamp,
                player_count,
            }),
        }
    }
}

/// Which connections receive a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    /// Everyone but the sender
    AllExcept(EntityId),
    Only(EntityId),
}

impl Audience {
    pub fn includes(&self, connection_id: EntityId) -> bool {
        match *self {
            Audience::All => true,
            Audience::AllExcept(excluded) => excluded != connection_id,
            Audience::Only(target) => target == connection_id,
        }
    }
}

/// A message on its way out of the game loop.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub audience: Audience,
    pub msg: ServerMsg,
}

impl Outbound {
    pub fn all(event: GameEvent) -> Self {
        Self {
            audience: Audience::All,
            msg: event.into_server_msg(),
        }
    }

    pub fn all_except(sender: EntityId, event: GameEvent) -> Self {
        Self {
            audience: Audience::AllExcept(sender),
            msg: event.into_server_msg(),
        }
    }

    pub fn only(connection_id: EntityId, msg: ServerMsg) -> Self {
        Self {
            audience: Audience::Only(connection_id),
            msg,
        }
    }

    pub fn rejected(connection_id: EntityId, message: impl ToString) -> Self {
        Self::only(
            connection_id,
            ServerMsg::ActionRejected(ErrorMsg {
                message: message.to_string(),
            }),
        )
    }
}
