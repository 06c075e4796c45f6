use arena_shared::config::WorldConfig;
use arena_shared::math::Vec2;
use arena_shared::protocol::{
    AuthenticatedMsg, ExistingPlayersMsg, LeaveReason, ServerMsg, SkillKind, MAX_CHAT_LEN,
    PROTOCOL_VERSION,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::ai::{self, Archetype};
use crate::combat;
use crate::config::ServerConfig;
use crate::entity::{EntityId, Identity};
use crate::error::{ActionError, AuthError};
use crate::events::{GameEvent, Outbound};
use crate::movement::propose_move;
use crate::protocol::{entity_wire, terrain_wire, vitals};
use crate::registry::{find_spawn_point, EntityRegistry};
use crate::terrain::Terrain;

/// Aggregate counts for the stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldStats {
    pub total_players: usize,
    pub enemies: usize,
    pub walls: usize,
    pub grass: usize,
    pub rocks: usize,
}

/// A successful authentication.
#[derive(Debug)]
pub struct Joined {
    pub id: EntityId,
    /// `authenticated` then `existing_players`, for the new connection only
    pub replies: Vec<ServerMsg>,
    pub broadcasts: Vec<Outbound>,
}

/// Strip `<...>` tags, trim, and cut to [`MAX_CHAT_LEN`] characters.
pub fn sanitize_chat(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        match rest[open..].find('>') {
            Some(close) => rest = &rest[open + close + 1..],
            None => {
                rest = &rest[open..];
                break;
            }
        }
    }
    out.push_str(rest);
    out.trim().chars().take(MAX_CHAT_LEN).collect()
}

/// Central game state owned by the game loop task.
pub struct GameState {
    pub world: WorldConfig,
    pub entities: EntityRegistry,
    pub terrain: Terrain,
    pub rng: ChaCha8Rng,
    enemies_per_archetype: usize,
    grass_regrowth_chance: f64,
}

impl GameState {
    pub fn new(server_config: &ServerConfig) -> Self {
        let world = server_config.world;
        let mut rng = ChaCha8Rng::seed_from_u64(server_config.rng_seed);
        let terrain = Terrain::generate(world.world_width, world.world_height, world.wall_thickness, &mut rng);
        tracing::info!(
            "Generated terrain: {} walls, {} grass, {} rocks",
            terrain.walls().len(),
            terrain.grass().len(),
            terrain.rocks().len()
        );

        let mut state = Self {
            world,
            entities: EntityRegistry::new(),
            terrain,
            rng,
            enemies_per_archetype: server_config.enemies_per_archetype,
            grass_regrowth_chance: server_config.grass_regrowth_chance,
        };
        state.replenish_enemies();
        state
    }

    /// Top up every archetype to its target population.
    fn replenish_enemies(&mut self) -> Vec<Outbound> {
        let mut out = Vec::new();
        for archetype in Archetype::ALL {
            let present = self
                .entities
                .iter()
                .filter(|e| e.brain.as_ref().is_some_and(|b| b.archetype == archetype))
                .count();
            for _ in present..self.enemies_per_archetype {
                let Some(id) = self.entities.add_enemy(archetype, &self.terrain, &self.world, &mut self.rng) else {
                    tracing::warn!("No spawn point for {:?}", archetype);
                    break;
                };
                if let Some(enemy) = self.entities.get(id) {
                    out.push(Outbound::all(GameEvent::EntityJoined(entity_wire(enemy, 0))));
                }
            }
        }
        out
    }

    /// Register a player for a validated identity.
    pub fn authenticate(&mut self, raw_identity: &str, now: u64) -> Result<Joined, AuthError> {
        let identity = Identity::parse(raw_identity)?;
        let id = self.entities.allocate_id();
        let entity = self
            .entities
            .add_entity(id, &identity, &self.terrain, &self.world, &mut self.rng)?;
        let wire = entity_wire(entity, now);
        tracing::info!("Player {} authenticated as {}", id, entity.name);

        let others = self
            .entities
            .iter()
            .filter(|e| e.id != id)
            .map(|e| entity_wire(e, now))
            .collect();

        let replies = vec![
            ServerMsg::Authenticated(AuthenticatedMsg {
                protocol_version: PROTOCOL_VERSION,
                entity: wire.clone(),
                world_config: self.world,
                terrain: self.terrain.features().map(terrain_wire).collect(),
            }),
            ServerMsg::ExistingPlayers(ExistingPlayersMsg { players: others }),
        ];
        let broadcasts = vec![Outbound::all_except(id, GameEvent::EntityJoined(wire))];
        Ok(Joined { id, replies, broadcasts })
    }

    /// Validated move. Rejections are silent to everyone.
    pub fn handle_move(&mut self, id: EntityId, target: Vec2, now: u64) -> Vec<Outbound> {
        let Some(entity) = self.entities.get_mut(id) else {
            return Vec::new();
        };
        match propose_move(entity, target, now, &self.terrain, &self.world) {
            Ok(position) => vec![Outbound::all_except(
                id,
                GameEvent::EntityMoved {
                    id,
                    position,
                    facing: entity.facing,
                },
            )],
            Err(reason) => {
                tracing::debug!("Move from {} dropped: {}", id, reason);
                Vec::new()
            }
        }
    }

    pub fn handle_chat(&mut self, id: EntityId, raw: &str, now: u64) -> Vec<Outbound> {
        let Some(entity) = self.entities.get(id) else {
            return Vec::new();
        };
        let message = sanitize_chat(raw);
        if message.is_empty() {
            return Vec::new();
        }
        vec![Outbound::all(GameEvent::ChatMessage {
            id,
            name: entity.name.clone(),
            message,
            timestamp: now,
        })]
    }

    pub fn handle_attack(&mut self, id: EntityId, target: Vec2, now: u64) -> Vec<Outbound> {
        if !self.entities.contains(id) {
            return Vec::new();
        }
        let result = combat::melee_attack(&mut self.entities, &mut self.terrain, &self.world, id, target, now);
        self.finish_action(id, result, now)
    }

    pub fn handle_cast(&mut self, id: EntityId, skill: SkillKind, now: u64) -> Vec<Outbound> {
        if !self.entities.contains(id) {
            return Vec::new();
        }
        let result = combat::cast_skill(&mut self.entities, &mut self.terrain, &self.world, id, skill, now);
        self.finish_action(id, result, now)
    }

    fn finish_action(
        &mut self,
        id: EntityId,
        result: Result<Vec<GameEvent>, ActionError>,
        now: u64,
    ) -> Vec<Outbound> {
        match result {
            Ok(events) => {
                let mut out: Vec<Outbound> = events.into_iter().map(Outbound::all).collect();
                out.extend(self.reap_defeated());
                if let Some(entity) = self.entities.get(id) {
                    out.push(Outbound::only(id, vitals(entity, now)));
                }
                out
            }
            Err(err) => {
                tracing::debug!("Action from {} rejected: {}", id, err);
                vec![Outbound::rejected(id, err)]
            }
        }
    }

    /// Remove defeated enemies and announce their departure.
    fn reap_defeated(&mut self) -> Vec<Outbound> {
        self.entities
            .reap_defeated()
            .into_iter()
            .map(|e| {
                Outbound::all(GameEvent::EntityLeft {
                    id: e.id,
                    reason: LeaveReason::Defeated,
                })
            })
            .collect()
    }

    /// Remove a connection's entity. Unknown ids are ignored.
    pub fn disconnect(&mut self, id: EntityId) -> Vec<Outbound> {
        match self.entities.remove_entity(id) {
            Some(entity) => {
                tracing::info!("Player {} ({}) left", id, entity.name);
                vec![Outbound::all(GameEvent::EntityLeft {
                    id,
                    reason: LeaveReason::Disconnected,
                })]
            }
            None => Vec::new(),
        }
    }

    /// Enemy simulation step.
    pub fn step(&mut self, now: u64, dt_secs: f64) -> Vec<Outbound> {
        let events = ai::step_enemies(&mut self.entities, &self.terrain, &self.world, now, dt_secs);
        let struck: Vec<EntityId> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::EntityDamaged { id, .. } => Some(*id),
                _ => None,
            })
            .collect();
        let mut out: Vec<Outbound> = events.into_iter().map(Outbound::all).collect();
        out.extend(self.reap_defeated());
        for id in struck {
            if let Some(entity) = self.entities.get(id).filter(|e| e.persistent) {
                out.push(Outbound::only(id, vitals(entity, now)));
            }
        }
        out
    }

    /// Once-per-second housekeeping: mana, respawns, regrowth, enemy
    /// population, then the snapshot and per-player vitals.
    pub fn heartbeat(&mut self, now: u64) -> Vec<Outbound> {
        let mut out = Vec::new();

        combat::regenerate_mana(&mut self.entities, self.world.mana_regen_per_tick);

        for id in self.entities.take_due_respawns(now) {
            let Some(position) = find_spawn_point(&self.terrain, &self.world, &mut self.rng) else {
                tracing::warn!("No spawn point for respawn of {}, retrying", id);
                self.entities.schedule_respawn(id, now + self.world.respawn_time_ms);
                continue;
            };
            if let Some(entity) = self.entities.get_mut(id) {
                entity.revive(position);
                tracing::info!("Player {} respawned", id);
                out.push(Outbound::all(GameEvent::EntityRespawned(entity_wire(entity, now))));
            }
        }

        let (w, h) = (self.world.world_width, self.world.world_height);
        if let Some(feature) = self
            .terrain
            .maybe_regrow_grass(self.grass_regrowth_chance, w, h, &mut self.rng)
        {
            out.push(Outbound::all(GameEvent::TerrainSpawned(terrain_wire(feature))));
        }

        out.extend(self.replenish_enemies());

        out.push(Outbound::all(GameEvent::Snapshot {
            timestamp: now,
            player_count: self.entities.player_count() as u32,
        }));
        for player in self.entities.players() {
            out.push(Outbound::only(player.id, vitals(player, now)));
        }
        out
    }

    pub fn stats(&self) -> WorldStats {
        WorldStats {
            total_players: self.entities.player_count(),
            enemies: self.entities.enemy_count(),
            walls: self.terrain.walls().len(),
            grass: self.terrain.grass().len(),
            rocks: self.terrain.rocks().len(),
        }
    }

    /// Drop every pending respawn. Called on shutdown.
    pub fn shutdown(&mut self) {
        let cancelled = self.entities.cancel_all_respawns();
        tracing::info!("Cancelled {} pending respawns", cancelled);
    }
}
