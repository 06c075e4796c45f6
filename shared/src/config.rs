/// World configuration. Sent to every client on authentication so that
/// local prediction uses the same bounds and rates as the server.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../web/src/generated/")]
#[serde(rename_all = "camelCase")]
pub struct WorldConfig {
    pub world_width: f64,
    pub world_height: f64,
    pub max_players_per_room: u32,
    /// Client movement speed (px/s); the server does not integrate player motion
    pub player_speed: f64,
    /// Side of the square bounding box used for wall collision
    pub entity_size: f64,
    /// Minimum time between accepted moves of one entity (ms)
    pub movement_interval_ms: u64,
    /// Delay before a defeated player comes back (ms)
    pub respawn_time_ms: u64,
    /// Radius around the click point hit by a melee attack
    pub melee_radius: f64,
    pub melee_damage: u32,
    pub melee_mana_cost: u32,
    /// Mana restored to each alive entity per heartbeat
    pub mana_regen_per_tick: u32,
    /// Thickness of the border walls framing the world
    pub wall_thickness: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            world_width: 2000.0,
            world_height: 2000.0,
            max_players_per_room: 50,
            player_speed: 200.0,
            entity_size: 24.0,
            movement_interval_ms: 50,
            respawn_time_ms: 5000,
            melee_radius: 25.0,
            melee_damage: 30,
            melee_mana_cost: 15,
            mana_regen_per_tick: 1,
            wall_thickness: 20.0,
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.world_width.is_finite() || self.world_width <= 0.0 {
            return Err("world_width must be finite and > 0".to_string());
        }
        if !self.world_height.is_finite() || self.world_height <= 0.0 {
            return Err("world_height must be finite and > 0".to_string());
        }
        if self.max_players_per_room == 0 {
            return Err("max_players_per_room must be > 0".to_string());
        }
        if !self.player_speed.is_finite() || self.player_speed < 0.0 {
            return Err("player_speed must be finite and >= 0".to_string());
        }
        if !self.entity_size.is_finite() || self.entity_size <= 0.0 {
            return Err("entity_size must be finite and > 0".to_string());
        }
        if self.entity_size >= self.world_width.min(self.world_height) {
            return Err("entity_size must be smaller than the world".to_string());
        }
        if !self.melee_radius.is_finite() || self.melee_radius < 0.0 {
            return Err("melee_radius must be finite and >= 0".to_string());
        }
        if !self.wall_thickness.is_finite() || self.wall_thickness < 0.0 {
            return Err("wall_thickness must be finite and >= 0".to_string());
        }
        if self.wall_thickness * 2.0 + self.entity_size >= self.world_width.min(self.world_height)
        {
            return Err("border walls leave no room for entities".to_string());
        }
        Ok(())
    }
}
