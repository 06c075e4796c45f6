//! Destructible terrain.
//!
//! Walls frame and partition the world and never take damage. Grass and rock
//! features have health; a hit subtracts an amount looked up in
//! [`damage_amount`], and features that reach 0 are dropped from the active
//! set straight after the hit is applied.

use arena_shared::math::{distance, Rect, Vec2};
use arena_shared::protocol::TerrainKind;
use rand::Rng;

pub type FeatureId = u32;

pub const INTERIOR_WALLS: usize = 8;
pub const GRASS_PATCHES: usize = 15;
pub const ROCKS: usize = 5;
pub const MAX_GRASS_PATCHES: usize = 20;

const INTERIOR_WALL_THICKNESS: f64 = 20.0;
const GRASS_HEALTH: u32 = 100;
const REGROWN_GRASS_HEALTH: u32 = 50;
const ROCK_SIZE: f64 = 25.0;
const ROCK_HEALTH: u32 = 200;

/// Kind of hit applied to terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageType {
    Sword,
    Fire,
    Fireball,
}

/// Health removed from a feature of `kind` by one hit of `damage`.
/// `None` means the feature is immune.
pub fn damage_amount(kind: TerrainKind, damage: DamageType) -> Option<u32> {
    match (kind, damage) {
        (TerrainKind::Wall, _) => None,
        (TerrainKind::Grass, DamageType::Sword) => Some(25),
        (TerrainKind::Grass, DamageType::Fire) => Some(80),
        (TerrainKind::Grass, DamageType::Fireball) => Some(100),
        (TerrainKind::Rock, DamageType::Sword) => Some(40),
        (TerrainKind::Rock, DamageType::Fire) => Some(80),
        (TerrainKind::Rock, DamageType::Fireball) => Some(120),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TerrainFeature {
    pub id: FeatureId,
    pub kind: TerrainKind,
    pub rect: Rect,
    /// Always 0 for walls
    pub health: u32,
    pub max_health: u32,
}

impl TerrainFeature {
    pub fn is_destructible(&self) -> bool {
        self.kind != TerrainKind::Wall
    }
}

/// Outcome of one area hit on the terrain.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TerrainDamage {
    /// `(id, health after the hit)` for every feature that was hit
    pub damaged: Vec<(FeatureId, u32)>,
    /// Features whose health went from above 0 to 0 in this hit
    pub destroyed: Vec<TerrainFeature>,
}

#[derive(Debug, Default, Clone)]
pub struct Terrain {
    walls: Vec<TerrainFeature>,
    grass: Vec<TerrainFeature>,
    rocks: Vec<TerrainFeature>,
    next_id: FeatureId,
}

/// `rng * span + offset`, or `None` when the span is empty.
fn random_in(rng: &mut impl Rng, span: f64, offset: f64) -> Option<f64> {
    if span <= 0.0 {
        return None;
    }
    Some(rng.gen::<f64>() * span + offset)
}

impl Terrain {
    pub fn empty() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Generate a map: border walls, interior bars, then grass and rocks.
    /// Each later category is dropped where it overlaps an earlier one.
    pub fn generate(width: f64, height: f64, wall_thickness: f64, rng: &mut impl Rng) -> Self {
        let mut terrain = Self::empty();

        if wall_thickness > 0.0 {
            let t = wall_thickness;
            for rect in [
                Rect::new(0.0, 0.0, width, t),
                Rect::new(0.0, 0.0, t, height),
                Rect::new(width - t, 0.0, t, height),
                Rect::new(0.0, height - t, width, t),
            ] {
                terrain.add_wall(rect);
            }
        }

        for _ in 0..INTERIOR_WALLS {
            let vertical = rng.gen_bool(0.5);
            let (Some(x), Some(y)) = (
                random_in(rng, width - 200.0, 100.0),
                random_in(rng, height - 200.0, 100.0),
            ) else {
                continue;
            };
            let length = 100.0 + rng.gen::<f64>() * 100.0;
            let rect = if vertical {
                Rect::new(x, y, INTERIOR_WALL_THICKNESS, length)
            } else {
                Rect::new(x, y, length, INTERIOR_WALL_THICKNESS)
            };
            if rect.is_degenerate() || rect.x + rect.width > width || rect.y + rect.height > height {
                continue;
            }
            terrain.add_wall(rect);
        }

        for _ in 0..GRASS_PATCHES {
            let (Some(x), Some(y)) = (
                random_in(rng, width - 100.0, 50.0),
                random_in(rng, height - 100.0, 50.0),
            ) else {
                continue;
            };
            let w = 30.0 + rng.gen::<f64>() * 40.0;
            let h = 30.0 + rng.gen::<f64>() * 40.0;
            let rect = Rect::new(x, y, w, h);
            if !terrain.check_collision(&rect) {
                terrain.add_destructible(TerrainKind::Grass, rect, GRASS_HEALTH, GRASS_HEALTH);
            }
        }

        for _ in 0..ROCKS {
            let (Some(x), Some(y)) = (
                random_in(rng, width - 100.0, 50.0),
                random_in(rng, height - 100.0, 50.0),
            ) else {
                continue;
            };
            let rect = Rect::new(x, y, ROCK_SIZE, ROCK_SIZE);
            if !terrain.check_collision(&rect) && !terrain.overlaps_grass(&rect) {
                terrain.add_destructible(TerrainKind::Rock, rect, ROCK_HEALTH, ROCK_HEALTH);
            }
        }

        terrain
    }

    fn allocate_id(&mut self) -> FeatureId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    pub fn add_wall(&mut self, rect: Rect) -> FeatureId {
        let id = self.allocate_id();
        self.walls.push(TerrainFeature {
            id,
            kind: TerrainKind::Wall,
            rect,
            health: 0,
            max_health: 0,
        });
        id
    }

    /// Add a grass patch or rock. Walls go through [`Terrain::add_wall`].
    pub fn add_destructible(
        &mut self,
        kind: TerrainKind,
        rect: Rect,
        health: u32,
        max_health: u32,
    ) -> FeatureId {
        let id = self.allocate_id();
        let feature = TerrainFeature {
            id,
            kind,
            rect,
            health: health.min(max_health),
            max_health,
        };
        match kind {
            TerrainKind::Grass => self.grass.push(feature),
            TerrainKind::Rock => self.rocks.push(feature),
            TerrainKind::Wall => {
                tracing::warn!("add_destructible called with a wall, adding as wall");
                self.walls.push(TerrainFeature {
                    health: 0,
                    max_health: 0,
                    ..feature
                });
            }
        }
        id
    }

    pub fn walls(&self) -> &[TerrainFeature] {
        &self.walls
    }

    pub fn grass(&self) -> &[TerrainFeature] {
        &self.grass
    }

    pub fn rocks(&self) -> &[TerrainFeature] {
        &self.rocks
    }

    /// All active features: walls, then grass, then rocks.
    pub fn features(&self) -> impl Iterator<Item = &TerrainFeature> {
        self.walls.iter().chain(&self.grass).chain(&self.rocks)
    }

    pub fn get(&self, id: FeatureId) -> Option<&TerrainFeature> {
        self.features().find(|f| f.id == id)
    }

    /// True if `bounds` overlaps any wall. Grass and rocks never block.
    pub fn check_collision(&self, bounds: &Rect) -> bool {
        self.walls.iter().any(|wall| bounds.overlaps(&wall.rect))
    }

    /// Wall test for an entity-sized square centered on `p`.
    pub fn is_position_blocked(&self, p: Vec2, size: f64) -> bool {
        self.check_collision(&Rect::centered(p, size))
    }

    fn overlaps_grass(&self, bounds: &Rect) -> bool {
        self.grass.iter().any(|g| bounds.overlaps(&g.rect))
    }

    /// Every active feature whose rectangle contains `p`.
    pub fn terrain_at(&self, p: Vec2) -> Vec<&TerrainFeature> {
        self.features().filter(|f| f.rect.contains(p)).collect()
    }

    /// Hit every destructible feature whose center lies within `radius` of
    /// `center`. Destroyed features are removed from the active set.
    pub fn damage(&mut self, center: Vec2, radius: f64, damage: DamageType) -> TerrainDamage {
        let mut result = TerrainDamage::default();

        for feature in self.grass.iter_mut().chain(self.rocks.iter_mut()) {
            if feature.health == 0 || distance(center, feature.rect.center()) > radius {
                continue;
            }
            let Some(amount) = damage_amount(feature.kind, damage) else {
                continue;
            };
            let before = feature.health;
            feature.health = feature.health.saturating_sub(amount);
            result.damaged.push((feature.id, feature.health));
            if before > 0 && feature.health == 0 {
                result.destroyed.push(feature.clone());
            }
        }

        if !result.destroyed.is_empty() {
            let grass_before = self.grass.len();
            let rocks_before = self.rocks.len();
            self.grass.retain(|f| f.health > 0);
            self.rocks.retain(|f| f.health > 0);
            tracing::debug!(
                "terrain destroyed: grass {} -> {}, rocks {} -> {}",
                grass_before,
                self.grass.len(),
                rocks_before,
                self.rocks.len()
            );
        }

        result
    }

    /// With probability `chance`, grow a new half-health grass patch.
    /// Returns the new feature if one was placed.
    pub fn maybe_regrow_grass(
        &mut self,
        chance: f64,
        width: f64,
        height: f64,
        rng: &mut impl Rng,
    ) -> Option<&TerrainFeature> {
        if chance <= 0.0 || self.grass.len() >= MAX_GRASS_PATCHES || !rng.gen_bool(chance.min(1.0)) {
            return None;
        }
        let x = random_in(rng, width - 100.0, 50.0)?;
        let y = random_in(rng, height - 100.0, 50.0)?;
        let w = 20.0 + rng.gen::<f64>() * 30.0;
        let h = 20.0 + rng.gen::<f64>() * 30.0;
        let rect = Rect::new(x, y, w, h);
        if self.check_collision(&rect) {
            return None;
        }
        self.add_destructible(TerrainKind::Grass, rect, REGROWN_GRASS_HEALTH, GRASS_HEALTH);
        self.grass.last()
    }
}
