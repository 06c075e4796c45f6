//! Wire conversions for core types.
//!
//! Message definitions live in `arena_shared::protocol` so clients can share
//! them; this module maps server-side state onto those shapes.

pub use arena_shared::protocol::*;

use crate::entity::Entity;
use crate::terrain::TerrainFeature;

pub fn entity_wire(entity: &Entity, now: u64) -> EntityWire {
    EntityWire {
        id: entity.id,
        kind: entity.kind,
        name: entity.name.clone(),
        tag: entity.tag.clone(),
        x: entity.position.x,
        y: entity.position.y,
        health: entity.health,
        max_health: entity.max_health,
        mana: entity.mana,
        max_mana: entity.max_mana,
        level: entity.level,
        is_alive: entity.is_alive(),
        shielded: entity.is_shielded(now),
        facing: entity.facing,
    }
}

pub fn terrain_wire(feature: &TerrainFeature) -> TerrainWire {
    let (health, max_health) = if feature.is_destructible() {
        (Some(feature.health), Some(feature.max_health))
    } else {
        (None, None)
    };
    TerrainWire {
        id: feature.id,
        kind: feature.kind,
        x: feature.rect.x,
        y: feature.rect.y,
        width: feature.rect.width,
        height: feature.rect.height,
        health,
        max_health,
    }
}

pub fn vitals(entity: &Entity, now: u64) -> ServerMsg {
    ServerMsg::Vitals(VitalsMsg {
        health: entity.health,
        mana: entity.mana,
        shielded: entity.is_shielded(now),
    })
}
