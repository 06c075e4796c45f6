//! Authoritative store of entities, keyed by connection id for players.
//!
//! Defeated players stay registered with `alive == false` and a respawn entry
//! `{entity_id, fire_at}`; the heartbeat polls [`EntityRegistry::take_due_respawns`].
//! Removing an entity drops its respawn entry, so a removed entity can never
//! be brought back.

use std::collections::BTreeMap;

use arena_shared::config::WorldConfig;
use arena_shared::math::Vec2;
use rand::Rng;

use crate::ai::{AiBrain, Archetype};
use crate::entity::{Entity, EntityId, Identity};
use crate::error::AuthError;
use crate::terrain::Terrain;

/// Spawn sampling gives up after this many blocked draws.
pub const MAX_SPAWN_ATTEMPTS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RespawnEntry {
    pub entity_id: EntityId,
    pub fire_at: u64,
}

#[derive(Debug)]
pub struct EntityRegistry {
    entities: BTreeMap<EntityId, Entity>,
    respawns: Vec<RespawnEntry>,
    next_id: EntityId,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Draw random points until one is clear of every wall.
pub fn find_spawn_point(terrain: &Terrain, config: &WorldConfig, rng: &mut impl Rng) -> Option<Vec2> {
    (0..MAX_SPAWN_ATTEMPTS).find_map(|_| {
        let p = Vec2::new(
            rng.gen::<f64>() * config.world_width,
            rng.gen::<f64>() * config.world_height,
        );
        (!terrain.is_position_blocked(p, config.entity_size)).then_some(p)
    })
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            respawns: Vec::new(),
            next_id: 1,
        }
    }

    /// Reserve a fresh id for a connection or an enemy.
    pub fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Create a player for `connection_id` at a random free position.
    pub fn add_entity(
        &mut self,
        connection_id: EntityId,
        identity: &Identity,
        terrain: &Terrain,
        config: &WorldConfig,
        rng: &mut impl Rng,
    ) -> Result<&Entity, AuthError> {
        if self.entities.contains_key(&connection_id) {
            return Err(AuthError::AlreadyAuthenticated);
        }
        if self.player_count() >= config.max_players_per_room as usize {
            return Err(AuthError::RoomFull);
        }
        let position = find_spawn_point(terrain, config, rng).ok_or(AuthError::NoSpawnPoint)?;
        let entity = Entity::player(connection_id, identity, position);
        self.next_id = self.next_id.max(connection_id + 1);
        Ok(self.entities.entry(connection_id).or_insert(entity))
    }

    /// Spawn an enemy of `archetype` at a random free position.
    pub fn add_enemy(
        &mut self,
        archetype: Archetype,
        terrain: &Terrain,
        config: &WorldConfig,
        rng: &mut impl Rng,
    ) -> Option<EntityId> {
        let position = find_spawn_point(terrain, config, rng)?;
        let id = self.allocate_id();
        let brain = AiBrain::new(archetype, position);
        self.entities.insert(id, Entity::enemy(id, brain, position));
        Some(id)
    }

    /// Insert a prepared entity, replacing any with the same id.
    pub fn insert(&mut self, entity: Entity) {
        self.next_id = self.next_id.max(entity.id + 1);
        self.entities.insert(entity.id, entity);
    }

    /// Remove an entity and cancel its pending respawn. Idempotent.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.cancel_respawn(id);
        self.entities.remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Visit alive entities only; anything with health 0 is skipped.
    pub fn for_each_alive(&self, mut f: impl FnMut(&Entity)) {
        for entity in self.entities.values().filter(|e| e.is_alive()) {
            f(entity);
        }
    }

    pub fn alive_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut().filter(|e| e.is_alive())
    }

    /// Human players (persistent entities), alive or awaiting respawn.
    pub fn players(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(|e| e.persistent)
    }

    pub fn player_count(&self) -> usize {
        self.players().count()
    }

    pub fn enemy_count(&self) -> usize {
        self.entities.values().filter(|e| !e.persistent).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn schedule_respawn(&mut self, entity_id: EntityId, fire_at: u64) {
        self.cancel_respawn(entity_id);
        self.respawns.push(RespawnEntry { entity_id, fire_at });
    }

    pub fn cancel_respawn(&mut self, entity_id: EntityId) -> bool {
        let before = self.respawns.len();
        self.respawns.retain(|r| r.entity_id != entity_id);
        before != self.respawns.len()
    }

    /// Drop every pending respawn, returning how many were cancelled.
    pub fn cancel_all_respawns(&mut self) -> usize {
        let n = self.respawns.len();
        self.respawns.clear();
        n
    }

    pub fn pending_respawns(&self) -> &[RespawnEntry] {
        &self.respawns
    }

    /// Pop entries whose time has come, in scheduling order. Entries for
    /// entities no longer registered are discarded.
    pub fn take_due_respawns(&mut self, now: u64) -> Vec<EntityId> {
        let (due, pending): (Vec<_>, Vec<_>) = self.respawns.drain(..).partition(|r| r.fire_at <= now);
        self.respawns = pending;
        due.into_iter()
            .map(|r| r.entity_id)
            .filter(|id| self.entities.contains_key(id))
            .collect()
    }

    /// Remove defeated non-persistent entities and return them.
    pub fn reap_defeated(&mut self) -> Vec<Entity> {
        let dead: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| !e.persistent && !e.is_alive())
            .map(|e| e.id)
            .collect();
        dead.into_iter().filter_map(|id| self.remove_entity(id)).collect()
    }
}
