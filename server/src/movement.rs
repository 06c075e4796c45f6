//! Server-side validation of client-proposed positions.

use arena_shared::config::WorldConfig;
use arena_shared::math::{in_world_bounds, Rect, Vec2};

use crate::entity::Entity;
use crate::error::MoveRejection;
use crate::terrain::Terrain;

/// Validate and apply a move. On rejection the entity is left untouched;
/// there is no partial slide along walls.
pub fn propose_move(
    entity: &mut Entity,
    target: Vec2,
    now: u64,
    terrain: &Terrain,
    config: &WorldConfig,
) -> Result<Vec2, MoveRejection> {
    if !entity.is_alive() {
        return Err(MoveRejection::NotAlive);
    }
    if let Some(last) = entity.last_movement {
        if now.saturating_sub(last) < config.movement_interval_ms {
            return Err(MoveRejection::TooSoon);
        }
    }
    if !in_world_bounds(target, config.world_width, config.world_height) {
        return Err(MoveRejection::OutOfBounds);
    }
    if terrain.check_collision(&Rect::centered(target, config.entity_size)) {
        return Err(MoveRejection::Blocked);
    }

    entity.face_towards(target - entity.position);
    entity.position = target;
    entity.last_movement = Some(now);
    entity.moving = true;
    Ok(target)
}
