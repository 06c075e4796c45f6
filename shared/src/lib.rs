//! Wire contract and spatial helpers shared by the arena server and its clients.

pub mod config;
pub mod math;
pub mod protocol;
