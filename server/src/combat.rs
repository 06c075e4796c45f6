//! Attack and skill resolution.
//!
//! Every action validates first and mutates only once validation passed, so
//! a rejected action leaves mana, cooldowns, health and terrain untouched.

use arena_shared::config::WorldConfig;
use arena_shared::math::{distance, Vec2};
use arena_shared::protocol::{Ability, SkillKind};

use crate::entity::EntityId;
use crate::error::ActionError;
use crate::events::GameEvent;
use crate::registry::EntityRegistry;
use crate::terrain::{DamageType, Terrain, TerrainDamage};

const SHIELD_DURATION_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillEffect {
    /// Damage every other alive entity around the caster
    AreaDamage { damage: u32 },
    SelfHeal { amount: u32 },
    SelfShield { duration_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkillDef {
    pub kind: SkillKind,
    pub mana_cost: u32,
    pub cooldown_ms: u64,
    pub radius: f64,
    pub effect: SkillEffect,
}

const SKILLS: [SkillDef; 3] = [
    SkillDef {
        kind: SkillKind::Fireball,
        mana_cost: 40,
        cooldown_ms: 3000,
        radius: 80.0,
        effect: SkillEffect::AreaDamage { damage: 60 },
    },
    SkillDef {
        kind: SkillKind::Heal,
        mana_cost: 30,
        cooldown_ms: 5000,
        radius: 0.0,
        effect: SkillEffect::SelfHeal { amount: 35 },
    },
    SkillDef {
        kind: SkillKind::Shield,
        mana_cost: 35,
        cooldown_ms: 8000,
        radius: 0.0,
        effect: SkillEffect::SelfShield {
            duration_ms: SHIELD_DURATION_MS,
        },
    },
];

pub fn skill_def(kind: SkillKind) -> &'static SkillDef {
    match kind {
        SkillKind::Fireball => &SKILLS[0],
        SkillKind::Heal => &SKILLS[1],
        SkillKind::Shield => &SKILLS[2],
    }
}

/// Apply `amount` damage to `target`. A defeated persistent entity gets a
/// respawn entry; non-persistent ones are left for the reaper.
pub fn apply_damage(
    registry: &mut EntityRegistry,
    target: EntityId,
    amount: u32,
    source: Option<EntityId>,
    now: u64,
    config: &WorldConfig,
) -> Vec<GameEvent> {
    let Some(entity) = registry.get_mut(target) else {
        return Vec::new();
    };
    if !entity.is_alive() {
        return Vec::new();
    }
    let outcome = entity.take_damage(amount, now);
    let persistent = entity.persistent;
    let mut events = vec![GameEvent::EntityDamaged {
        id: target,
        source,
        amount: outcome.dealt,
        health: entity.health,
    }];

    if outcome.defeated {
        tracing::info!("entity {} defeated by {:?}", target, source);
        events.push(GameEvent::EntityDefeated { id: target, by: source });
        if persistent {
            registry.schedule_respawn(target, now + config.respawn_time_ms);
        }
    }
    events
}

/// Damage every alive entity except `exclude` within `radius` of `center`.
fn damage_area(
    registry: &mut EntityRegistry,
    center: Vec2,
    radius: f64,
    damage: u32,
    exclude: EntityId,
    now: u64,
    config: &WorldConfig,
) -> Vec<GameEvent> {
    let mut targets = Vec::new();
    registry.for_each_alive(|e| {
        if e.id != exclude && distance(e.position, center) <= radius {
            targets.push(e.id);
        }
    });
    targets
        .into_iter()
        .flat_map(|id| apply_damage(registry, id, damage, Some(exclude), now, config))
        .collect()
}

fn terrain_events(hit: TerrainDamage) -> impl Iterator<Item = GameEvent> {
    let damaged = hit
        .damaged
        .into_iter()
        .map(|(feature_id, health)| GameEvent::TerrainDamaged { feature_id, health });
    let destroyed = hit.destroyed.into_iter().map(|f| GameEvent::TerrainDestroyed {
        feature_id: f.id,
        kind: f.kind,
    });
    damaged.chain(destroyed)
}

/// Swing at a point: sword hit on terrain, then fixed damage to every other
/// alive entity within the melee radius of that point.
pub fn melee_attack(
    registry: &mut EntityRegistry,
    terrain: &mut Terrain,
    config: &WorldConfig,
    attacker: EntityId,
    target: Vec2,
    now: u64,
) -> Result<Vec<GameEvent>, ActionError> {
    let entity = registry.get_mut(attacker).ok_or(ActionError::NotAlive)?;
    if !entity.is_alive() {
        return Err(ActionError::NotAlive);
    }
    entity.spend_mana(config.melee_mana_cost)?;
    entity.face_towards(target - entity.position);
    entity.attacking = true;
    entity.last_attack = Some(now);

    let mut events = vec![GameEvent::AbilityUsed {
        id: attacker,
        ability: Ability::Melee,
        at: target,
    }];
    events.extend(terrain_events(terrain.damage(
        target,
        config.melee_radius,
        DamageType::Sword,
    )));
    events.extend(damage_area(
        registry,
        target,
        config.melee_radius,
        config.melee_damage,
        attacker,
        now,
        config,
    ));
    Ok(events)
}

/// Cast `skill`. Cooldown is checked before mana; both are committed before
/// the effect runs.
pub fn cast_skill(
    registry: &mut EntityRegistry,
    terrain: &mut Terrain,
    config: &WorldConfig,
    caster: EntityId,
    skill: SkillKind,
    now: u64,
) -> Result<Vec<GameEvent>, ActionError> {
    let def = skill_def(skill);
    let entity = registry.get_mut(caster).ok_or(ActionError::NotAlive)?;
    if !entity.is_alive() {
        return Err(ActionError::NotAlive);
    }
    if let Some(remaining_ms) = entity.cooldown_remaining(skill, now) {
        return Err(ActionError::OnCooldown { skill, remaining_ms });
    }
    entity.spend_mana(def.mana_cost)?;
    entity.start_cooldown(skill, now + def.cooldown_ms);
    entity.casting = true;
    let origin = entity.position;

    let mut events = vec![GameEvent::AbilityUsed {
        id: caster,
        ability: Ability::from(skill),
        at: origin,
    }];

    match def.effect {
        SkillEffect::AreaDamage { damage } => {
            events.extend(terrain_events(terrain.damage(
                origin,
                def.radius,
                DamageType::Fireball,
            )));
            events.extend(damage_area(
                registry, origin, def.radius, damage, caster, now, config,
            ));
        }
        SkillEffect::SelfHeal { amount } => {
            let restored = entity.heal(amount);
            events.push(GameEvent::EntityHealed {
                id: caster,
                amount: restored,
                health: entity.health,
            });
        }
        SkillEffect::SelfShield { duration_ms } => {
            let expires_at = now + duration_ms;
            entity.shield_until = Some(expires_at);
            events.push(GameEvent::ShieldActivated {
                id: caster,
                expires_at,
            });
        }
    }
    Ok(events)
}

/// Heartbeat regeneration for every alive entity. Also clears the
/// per-action animation flags set since the previous heartbeat.
pub fn regenerate_mana(registry: &mut EntityRegistry, amount: u32) {
    for entity in registry.alive_mut() {
        entity.restore_mana(amount);
        entity.moving = false;
        entity.casting = false;
        entity.attacking = false;
    }
}
