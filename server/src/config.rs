use std::str::FromStr;

use arena_shared::config::WorldConfig;

use crate::error::ConfigError;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Enemy simulation rate
    pub tick_rate_hz: u32,
    /// Mana regen, respawns, regrowth and `server_update`
    pub heartbeat_interval_ms: u64,
    pub rng_seed: u64,
    /// Text frames above this size are dropped
    pub max_message_bytes: usize,
    /// Enemies kept alive per archetype
    pub enemies_per_archetype: usize,
    /// Per-heartbeat probability of a new grass patch
    pub grass_regrowth_chance: f64,
    pub world: WorldConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            tick_rate_hz: 10,
            heartbeat_interval_ms: 1000,
            rng_seed: 42,
            max_message_bytes: 1024,
            enemies_per_archetype: 3,
            grass_regrowth_chance: 0.05,
            world: WorldConfig::default(),
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, value: String, expected: &'static str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { name, value, expected })
}

impl ServerConfig {
    /// Defaults overlaid with environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an injectable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            let port: u16 = parse_var("PORT", port, "port number")?;
            config.listen_addr = format!("0.0.0.0:{}", port);
        }
        if let Some(addr) = lookup("ARENA_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(seed) = lookup("ARENA_RNG_SEED") {
            config.rng_seed = parse_var("ARENA_RNG_SEED", seed, "u64")?;
        }
        if let Some(w) = lookup("ARENA_WORLD_WIDTH") {
            config.world.world_width = parse_var("ARENA_WORLD_WIDTH", w, "number")?;
        }
        if let Some(h) = lookup("ARENA_WORLD_HEIGHT") {
            config.world.world_height = parse_var("ARENA_WORLD_HEIGHT", h, "number")?;
        }
        if let Some(n) = lookup("ARENA_MAX_PLAYERS") {
            config.world.max_players_per_room = parse_var("ARENA_MAX_PLAYERS", n, "u32")?;
        }

        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.world.validate().map_err(ConfigError::World)?;

        if self.tick_rate_hz == 0 {
            return Err(ConfigError::Server("tick_rate_hz must be > 0".into()));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::Server("heartbeat_interval_ms must be > 0".into()));
        }
        let tick_ms = 1000.0 / self.tick_rate_hz as f64;
        if (self.heartbeat_interval_ms as f64) < tick_ms {
            return Err(ConfigError::Server(format!(
                "heartbeat_interval_ms ({}) is shorter than one tick ({:.1} ms)",
                self.heartbeat_interval_ms, tick_ms
            )));
        }
        if self.max_message_bytes == 0 {
            return Err(ConfigError::Server("max_message_bytes must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.grass_regrowth_chance) {
            return Err(ConfigError::Server(format!(
                "grass_regrowth_chance must be within [0, 1], got {}",
                self.grass_regrowth_chance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
        assert_eq!(config.world.world_width, 2000.0);
        assert_eq!(config.world.max_players_per_room, 50);
    }

    #[test]
    fn env_overrides_apply() {
        let config = ServerConfig::from_vars(vars(&[
            ("PORT", "4000"),
            ("ARENA_RNG_SEED", "7"),
            ("ARENA_WORLD_WIDTH", "500"),
            ("ARENA_MAX_PLAYERS", "2"),
        ]))
        .unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:4000");
        assert_eq!(config.rng_seed, 7);
        assert_eq!(config.world.world_width, 500.0);
        assert_eq!(config.world.world_height, 2000.0);
        assert_eq!(config.world.max_players_per_room, 2);
    }

    #[test]
    fn explicit_listen_addr_beats_port() {
        let config = ServerConfig::from_vars(vars(&[
            ("PORT", "4000"),
            ("ARENA_LISTEN_ADDR", "127.0.0.1:5000"),
        ]))
        .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:5000");
    }

    #[test]
    fn unparsable_env_value_is_reported() {
        let err = ServerConfig::from_vars(vars(&[("ARENA_RNG_SEED", "banana")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { name: "ARENA_RNG_SEED", .. }));
    }

    #[test]
    fn zero_tick_rate_fails() {
        let config = ServerConfig {
            tick_rate_hz: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn heartbeat_shorter_than_tick_fails() {
        let config = ServerConfig {
            tick_rate_hz: 10,
            heartbeat_interval_ms: 50,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn regrowth_chance_out_of_range_fails() {
        let config = ServerConfig {
            grass_regrowth_chance: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_world_fails() {
        let mut config = ServerConfig::default();
        config.world.world_width = f64::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::World(_))));
    }
}
