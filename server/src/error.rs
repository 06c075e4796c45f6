//! Error types for the arena server.
//!
//! Only [`ConfigError`] is fatal. Everything else is a rejected request that is
//! reported back to the acting connection and leaves the world untouched.

use arena_shared::protocol::SkillKind;
use thiserror::Error;

/// Invalid or unreadable startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// World parameters failed validation.
    #[error("invalid world config: {0}")]
    World(String),

    /// Server parameters failed validation.
    #[error("invalid server config: {0}")]
    Server(String),

    /// An environment override could not be parsed.
    #[error("environment variable {name}={value:?} is not a valid {expected}")]
    Env {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Why an `authenticate` request was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid wallet address")]
    InvalidIdentity,

    #[error("Room is full")]
    RoomFull,

    #[error("No free spawn point")]
    NoSpawnPoint,

    #[error("Already authenticated")]
    AlreadyAuthenticated,
}

/// Why a proposed move was dropped. Never reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveRejection {
    #[error("entity is not alive")]
    NotAlive,

    #[error("moved again within the debounce interval")]
    TooSoon,

    #[error("target outside the world")]
    OutOfBounds,

    #[error("target overlaps a wall")]
    Blocked,
}

/// Why an attack or skill cast was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("You are defeated")]
    NotAlive,

    #[error("Not enough mana (need {required}, have {available})")]
    InsufficientMana { required: u32, available: u32 },

    #[error("{} on cooldown for {}s", .skill.name(), .remaining_ms.div_ceil(1000))]
    OnCooldown { skill: SkillKind, remaining_ms: u64 },
}
