//! Enemy behaviour.
//!
//! Every archetype runs the same four-state machine:
//! - `Patrol` orbits the spawn point on a slowly rotating radius
//! - `Chase` closes in on the nearest player inside the chase range
//! - `Attack` strikes the target whenever the archetype cooldown allows
//! - `Flee` runs away for a fixed time after health drops below a threshold,
//!   then falls back to `Patrol`
//!
//! Archetypes differ only in their [`ArchetypeStats`] row.

use arena_shared::config::WorldConfig;
use arena_shared::math::{clamp_to_world, distance, Vec2};
use arena_shared::protocol::{Ability, EntityKind};

use crate::combat::apply_damage;
use crate::entity::{Entity, EntityId};
use crate::events::GameEvent;
use crate::registry::EntityRegistry;
use crate::terrain::Terrain;

const PATROL_RADIUS: f64 = 60.0;
/// Patrol orbit angular speed (rad/s)
const PATROL_TURN_RATE: f64 = 0.5;
/// How far ahead a fleeing enemy aims
const FLEE_LOOKAHEAD: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Archetype {
    Goblin,
    Orc,
    Skeleton,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArchetypeStats {
    pub max_health: u32,
    pub level: u32,
    /// px/s
    pub speed: f64,
    pub chase_range: f64,
    pub attack_range: f64,
    pub attack_cooldown_ms: u64,
    pub damage: u32,
    /// Flee once health falls strictly below this
    pub flee_below: u32,
    pub flee_duration_ms: u64,
}

const GOBLIN: ArchetypeStats = ArchetypeStats {
    max_health: 60,
    level: 1,
    speed: 120.0,
    chase_range: 250.0,
    attack_range: 30.0,
    attack_cooldown_ms: 1000,
    damage: 8,
    flee_below: 30,
    flee_duration_ms: 3000,
};

const ORC: ArchetypeStats = ArchetypeStats {
    max_health: 150,
    level: 3,
    speed: 60.0,
    chase_range: 200.0,
    attack_range: 40.0,
    attack_cooldown_ms: 2500,
    damage: 25,
    flee_below: 25,
    flee_duration_ms: 3000,
};

const SKELETON: ArchetypeStats = ArchetypeStats {
    max_health: 90,
    level: 2,
    speed: 90.0,
    chase_range: 220.0,
    attack_range: 35.0,
    attack_cooldown_ms: 1500,
    damage: 15,
    flee_below: 20,
    flee_duration_ms: 3000,
};

impl Archetype {
    pub const ALL: [Archetype; 3] = [Archetype::Goblin, Archetype::Orc, Archetype::Skeleton];

    pub fn stats(self) -> &'static ArchetypeStats {
        match self {
            Archetype::Goblin => &GOBLIN,
            Archetype::Orc => &ORC,
            Archetype::Skeleton => &SKELETON,
        }
    }

    pub fn kind(self) -> EntityKind {
        match self {
            Archetype::Goblin => EntityKind::Goblin,
            Archetype::Orc => EntityKind::Orc,
            Archetype::Skeleton => EntityKind::Skeleton,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Archetype::Goblin => "Goblin",
            Archetype::Orc => "Orc",
            Archetype::Skeleton => "Skeleton",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AiState {
    Patrol,
    Chase { target: EntityId },
    Attack { target: EntityId },
    Flee { until: u64 },
}

/// What the brain wants to do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AiIntent {
    pub destination: Option<Vec2>,
    pub strike: Option<EntityId>,
}

#[derive(Debug, Clone)]
pub struct AiBrain {
    pub archetype: Archetype,
    pub state: AiState,
    pub spawn: Vec2,
    patrol_angle: f64,
    last_strike: Option<u64>,
    threat: Option<Vec2>,
}

impl AiBrain {
    pub fn new(archetype: Archetype, spawn: Vec2) -> Self {
        Self {
            archetype,
            state: AiState::Patrol,
            spawn,
            patrol_angle: 0.0,
            last_strike: None,
            threat: None,
        }
    }

    pub fn stats(&self) -> &'static ArchetypeStats {
        self.archetype.stats()
    }

    /// Called after every hit. Any non-lethal hit that leaves health below
    /// the flee threshold starts a flee, unless one is already running.
    pub fn on_damaged(&mut self, health: u32, now: u64) {
        let stats = self.stats();
        if health > 0 && health < stats.flee_below && !matches!(self.state, AiState::Flee { .. }) {
            self.state = AiState::Flee {
                until: now + stats.flee_duration_ms,
            };
        }
    }

    fn strike_ready(&self, now: u64) -> bool {
        self.last_strike
            .map_or(true, |t| now.saturating_sub(t) >= self.stats().attack_cooldown_ms)
    }

    /// Advance the state machine. `target` is the nearest alive player.
    pub fn think(
        &mut self,
        position: Vec2,
        target: Option<(EntityId, Vec2)>,
        now: u64,
        dt_secs: f64,
    ) -> AiIntent {
        let stats = self.stats();
        if let Some((_, pos)) = target {
            self.threat = Some(pos);
        }

        if let AiState::Flee { until } = self.state {
            if now < until {
                let destination = self.threat.map(|threat| {
                    let away = (position - threat).normalize_or_zero();
                    position + away * FLEE_LOOKAHEAD
                });
                return AiIntent {
                    destination,
                    strike: None,
                };
            }
            self.state = AiState::Patrol;
        }

        match target {
            Some((id, pos)) if distance(position, pos) <= stats.attack_range => {
                self.state = AiState::Attack { target: id };
                let strike = self.strike_ready(now).then(|| {
                    self.last_strike = Some(now);
                    id
                });
                AiIntent {
                    destination: None,
                    strike,
                }
            }
            Some((id, pos)) if distance(position, pos) <= stats.chase_range => {
                self.state = AiState::Chase { target: id };
                AiIntent {
                    destination: Some(pos),
                    strike: None,
                }
            }
            _ => {
                self.state = AiState::Patrol;
                self.patrol_angle = (self.patrol_angle + PATROL_TURN_RATE * dt_secs) % std::f64::consts::TAU;
                let waypoint = self.spawn
                    + Vec2::new(self.patrol_angle.cos(), self.patrol_angle.sin()) * PATROL_RADIUS;
                AiIntent {
                    destination: Some(waypoint),
                    strike: None,
                }
            }
        }
    }
}

/// Move from `from` towards `to` by at most `max_step`.
pub fn step_towards(from: Vec2, to: Vec2, max_step: f64) -> Vec2 {
    let delta = to - from;
    let len = delta.length();
    if len <= max_step {
        return to;
    }
    from + delta.normalize_or_zero() * max_step
}

/// Run one simulation step for every alive enemy.
pub fn step_enemies(
    registry: &mut EntityRegistry,
    terrain: &Terrain,
    config: &WorldConfig,
    now: u64,
    dt_secs: f64,
) -> Vec<GameEvent> {
    let mut events = Vec::new();

    let players: Vec<(EntityId, Vec2)> = registry
        .players()
        .filter(|p| p.is_alive())
        .map(|p| (p.id, p.position))
        .collect();

    let enemy_ids: Vec<EntityId> = registry
        .iter()
        .filter(|e| e.brain.is_some() && e.is_alive())
        .map(|e| e.id)
        .collect();

    for id in enemy_ids {
        let Some(position) = registry.get(id).map(|e| e.position) else {
            continue;
        };
        // Players downed earlier in this step are no longer targets.
        let nearest = players
            .iter()
            .copied()
            .filter(|(pid, _)| registry.get(*pid).is_some_and(Entity::is_alive))
            .min_by(|a, b| distance(position, a.1).total_cmp(&distance(position, b.1)));
        let Some(enemy) = registry.get_mut(id) else {
            continue;
        };
        enemy.attacking = false;
        let Some(brain) = enemy.brain.as_mut() else {
            continue;
        };
        let speed = brain.stats().speed;
        let damage = brain.stats().damage;
        let intent = brain.think(position, nearest, now, dt_secs);

        if let Some(destination) = intent.destination {
            let next = step_towards(position, destination, speed * dt_secs);
            let next = clamp_to_world(next, config.world_width, config.world_height, config.entity_size / 2.0);
            if next != position && !terrain.is_position_blocked(next, config.entity_size) {
                enemy.face_towards(next - position);
                enemy.position = next;
                enemy.moving = true;
                events.push(GameEvent::EntityMoved {
                    id,
                    position: next,
                    facing: enemy.facing,
                });
            } else {
                enemy.moving = false;
            }
        }

        if let Some(target) = intent.strike {
            enemy.attacking = true;
            enemy.last_attack = Some(now);
            let Some(target_pos) = registry.get(target).map(|t| t.position) else {
                continue;
            };
            events.push(GameEvent::AbilityUsed {
                id,
                ability: Ability::Melee,
                at: target_pos,
            });
            events.extend(apply_damage(registry, target, damage, Some(id), now, config));
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Identity;

    fn goblin_at(p: Vec2) -> Entity {
        Entity::enemy(10, AiBrain::new(Archetype::Goblin, p), p)
    }

    #[test]
    fn archetypes_differ_only_by_data() {
        let speeds: Vec<f64> = Archetype::ALL.iter().map(|a| a.stats().speed).collect();
        assert!(speeds[0] > speeds[2] && speeds[2] > speeds[1]);
        let damage: Vec<u32> = Archetype::ALL.iter().map(|a| a.stats().damage).collect();
        assert!(damage[0] < damage[2] && damage[2] < damage[1]);
    }

    #[test]
    fn patrol_when_nobody_is_near() {
        let mut brain = AiBrain::new(Archetype::Goblin, Vec2::new(500.0, 500.0));
        let intent = brain.think(Vec2::new(500.0, 500.0), Some((1, Vec2::new(1500.0, 500.0))), 0, 0.1);
        assert_eq!(brain.state, AiState::Patrol);
        let dest = intent.destination.unwrap();
        assert!((distance(dest, Vec2::new(500.0, 500.0)) - PATROL_RADIUS).abs() < 1e-9);
        assert_eq!(intent.strike, None);
    }

    #[test]
    fn chase_then_attack_with_cooldown() {
        let mut brain = AiBrain::new(Archetype::Goblin, Vec2::new(0.0, 0.0));
        let here = Vec2::new(100.0, 100.0);

        let intent = brain.think(here, Some((1, Vec2::new(300.0, 100.0))), 0, 0.1);
        assert_eq!(brain.state, AiState::Chase { target: 1 });
        assert_eq!(intent.destination, Some(Vec2::new(300.0, 100.0)));

        let close = Some((1, Vec2::new(120.0, 100.0)));
        assert_eq!(brain.think(here, close, 1_000, 0.1).strike, Some(1));
        assert_eq!(brain.state, AiState::Attack { target: 1 });
        assert_eq!(brain.think(here, close, 1_500, 0.1).strike, None);
        assert_eq!(brain.think(here, close, 2_000, 0.1).strike, Some(1));
    }

    #[test]
    fn wounded_goblin_flees_then_patrols() {
        let mut goblin = goblin_at(Vec2::new(100.0, 100.0));
        let player = Some((1, Vec2::new(110.0, 100.0)));
        goblin.brain.as_mut().unwrap().think(goblin.position, player, 0, 0.1);
        assert!(matches!(goblin.brain.as_ref().unwrap().state, AiState::Attack { .. }));

        goblin.take_damage(31, 5_000);
        assert_eq!(goblin.health, 29);
        assert_eq!(goblin.brain.as_ref().unwrap().state, AiState::Flee { until: 8_000 });

        let brain = goblin.brain.as_mut().unwrap();
        let intent = brain.think(goblin.position, player, 7_999, 0.1);
        assert_eq!(brain.state, AiState::Flee { until: 8_000 });
        assert_eq!(intent.strike, None);
        assert!(intent.destination.unwrap().x < goblin.position.x);

        let far = Some((1, Vec2::new(900.0, 900.0)));
        brain.think(goblin.position, far, 8_000, 0.1);
        assert_eq!(brain.state, AiState::Patrol);
    }

    #[test]
    fn lethal_hit_does_not_start_flee() {
        let mut goblin = goblin_at(Vec2::new(100.0, 100.0));
        goblin.take_damage(60, 0);
        assert_eq!(goblin.brain.as_ref().unwrap().state, AiState::Patrol);
        assert!(!goblin.is_alive());
    }

    #[test]
    fn step_towards_never_overshoots() {
        let p = step_towards(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), 4.0);
        assert_eq!(p, Vec2::new(4.0, 0.0));
        let p = step_towards(Vec2::new(0.0, 0.0), Vec2::new(3.0, 0.0), 4.0);
        assert_eq!(p, Vec2::new(3.0, 0.0));
    }

    #[test]
    fn enemies_strike_nearby_players() {
        let config = WorldConfig::default();
        let terrain = Terrain::empty();
        let mut registry = EntityRegistry::new();
        let identity = Identity::parse("0x52908400098527886E0F7030069857D2E4169EE7").unwrap();
        registry.insert(Entity::player(1, &identity, Vec2::new(500.0, 500.0)));
        let orc_at = Vec2::new(520.0, 500.0);
        registry.insert(Entity::enemy(2, AiBrain::new(Archetype::Orc, orc_at), orc_at));

        let events = step_enemies(&mut registry, &terrain, &config, 1_000, 0.1);

        assert_eq!(registry.get(1).unwrap().health, 75);
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::EntityDamaged { id: 1, source: Some(2), amount: 25, health: 75 }
        )));
    }

    #[test]
    fn chasing_enemy_moves_towards_player() {
        let config = WorldConfig::default();
        let terrain = Terrain::empty();
        let mut registry = EntityRegistry::new();
        let identity = Identity::parse("0x52908400098527886E0F7030069857D2E4169EE7").unwrap();
        registry.insert(Entity::player(1, &identity, Vec2::new(700.0, 500.0)));
        registry.insert(goblin_at(Vec2::new(500.0, 500.0)));

        let events = step_enemies(&mut registry, &terrain, &config, 1_000, 0.5);

        assert_eq!(registry.get(10).unwrap().position, Vec2::new(560.0, 500.0));
        assert!(events.iter().any(|e| matches!(e, GameEvent::EntityMoved { id: 10, .. })));
    }

    fn player_at(id: EntityId, p: Vec2) -> Entity {
        let identity = Identity::parse("0x52908400098527886E0F7030069857D2E4169EE7").unwrap();
        Entity::player(id, &identity, p)
    }

    #[test]
    fn downed_player_is_not_struck_again_in_the_same_step() {
        let config = WorldConfig::default();
        let terrain = Terrain::empty();
        let mut registry = EntityRegistry::new();
        let mut player = player_at(1, Vec2::new(500.0, 500.0));
        player.health = 5;
        registry.insert(player);
        for (id, x) in [(2, 480.0), (3, 520.0)] {
            let at = Vec2::new(x, 500.0);
            registry.insert(Entity::enemy(id, AiBrain::new(Archetype::Orc, at), at));
        }

        let events = step_enemies(&mut registry, &terrain, &config, 1_000, 0.1);

        let strikes: Vec<EntityId> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::AbilityUsed { id, .. } => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(strikes, vec![2]);
        assert!(!registry.get(1).unwrap().is_alive());
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::EntityDefeated { id: 1, by: Some(2) })));
        let late = registry.get(3).unwrap();
        assert!(!late.attacking);
        assert_eq!(late.brain.as_ref().unwrap().state, AiState::Patrol);

        // The second orc kept its cooldown for the next living player.
        let fresh = Vec2::new(525.0, 500.0);
        registry.insert(player_at(4, fresh));
        let events = step_enemies(&mut registry, &terrain, &config, 1_100, 0.1);
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::EntityDamaged { id: 4, source: Some(3), amount: 25, .. })));
    }

    #[test]
    fn shielded_player_takes_no_damage_from_enemies() {
        let config = WorldConfig::default();
        let terrain = Terrain::empty();
        let mut registry = EntityRegistry::new();
        let mut player = player_at(1, Vec2::new(500.0, 500.0));
        player.shield_until = Some(5_000);
        registry.insert(player);
        let orc_at = Vec2::new(520.0, 500.0);
        registry.insert(Entity::enemy(2, AiBrain::new(Archetype::Orc, orc_at), orc_at));

        let events = step_enemies(&mut registry, &terrain, &config, 1_000, 0.1);

        assert_eq!(registry.get(1).unwrap().health, 100);
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::AbilityUsed { id: 2, ability: Ability::Melee, .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::EntityDamaged { id: 1, source: Some(2), amount: 0, health: 100 }
        )));
        assert!(!events.iter().any(|e| matches!(e, GameEvent::EntityDefeated { .. })));
    }

    #[test]
    fn later_hit_below_threshold_restarts_flee() {
        let mut goblin = goblin_at(Vec2::new(100.0, 100.0));
        goblin.take_damage(31, 0);
        let brain = goblin.brain.as_mut().unwrap();
        brain.think(goblin.position, None, 3_000, 0.1);
        assert_eq!(brain.state, AiState::Patrol);

        goblin.take_damage(5, 4_000);
        assert_eq!(goblin.health, 24);
        assert_eq!(goblin.brain.as_ref().unwrap().state, AiState::Flee { until: 7_000 });

        // A hit during a running flee does not extend it.
        goblin.take_damage(5, 5_000);
        assert_eq!(goblin.brain.as_ref().unwrap().state, AiState::Flee { until: 7_000 });
    }
}
