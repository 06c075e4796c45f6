use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arena_shared::math::Vec2;
use arena_shared::protocol::{ServerMsg, SkillKind};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::ServerConfig;
use crate::entity::EntityId;
use crate::error::AuthError;
use crate::events::Outbound;
use crate::state::{GameState, WorldStats};

/// Broadcasts from game loop to all clients; each connection filters by audience.
pub type GameBroadcast = Outbound;

/// Handed back to a connection that authenticated.
#[derive(Debug)]
pub struct Session {
    pub id: EntityId,
    /// Sent to this connection before anything from `events`
    pub replies: Vec<ServerMsg>,
    /// Subscribed inside the game loop, so no event after the join is missed
    pub events: broadcast::Receiver<GameBroadcast>,
}

/// Commands from client connections to the game loop
#[derive(Debug)]
pub enum GameCommand {
    Authenticate {
        identity: String,
        response: oneshot::Sender<Result<Session, AuthError>>,
    },
    Move {
        id: EntityId,
        x: f64,
        y: f64,
    },
    Chat {
        id: EntityId,
        message: String,
    },
    Attack {
        id: EntityId,
        x: f64,
        y: f64,
    },
    CastSkill {
        id: EntityId,
        skill: SkillKind,
    },
    Leave {
        id: EntityId,
    },
    Stats {
        response: oneshot::Sender<WorldStats>,
    },
}

/// Wall-clock milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

fn publish(broadcast_tx: &broadcast::Sender<GameBroadcast>, out: Vec<Outbound>) {
    for msg in out {
        // No receivers is fine: nobody is connected.
        let _ = broadcast_tx.send(msg);
    }
}

/// Run the main game loop. Owns all game state.
pub async fn run_game_loop(
    mut cmd_rx: mpsc::Receiver<GameCommand>,
    broadcast_tx: broadcast::Sender<GameBroadcast>,
    server_config: ServerConfig,
) {
    let mut state = GameState::new(&server_config);

    let dt = 1.0 / server_config.tick_rate_hz as f64;
    let mut tick_interval = tokio::time::interval(Duration::from_secs_f64(dt));
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut heartbeat = tokio::time::interval(Duration::from_millis(server_config.heartbeat_interval_ms));
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                publish(&broadcast_tx, state.step(now_ms(), dt));
            }

            _ = heartbeat.tick() => {
                publish(&broadcast_tx, state.heartbeat(now_ms()));
            }

            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    break;
                };
                let now = now_ms();
                match cmd {
                    GameCommand::Authenticate { identity, response } => {
                        let result = state.authenticate(&identity, now).map(|joined| {
                            let events = broadcast_tx.subscribe();
                            publish(&broadcast_tx, joined.broadcasts);
                            Session {
                                id: joined.id,
                                replies: joined.replies,
                                events,
                            }
                        });
                        if let Err(err) = &result {
                            tracing::info!("Authentication refused: {}", err);
                        }
                        if let Err(Ok(session)) = response.send(result) {
                            // Connection went away while we were registering it.
                            publish(&broadcast_tx, state.disconnect(session.id));
                        }
                    }
                    GameCommand::Move { id, x, y } => {
                        publish(&broadcast_tx, state.handle_move(id, Vec2::new(x, y), now));
                    }
                    GameCommand::Chat { id, message } => {
                        publish(&broadcast_tx, state.handle_chat(id, &message, now));
                    }
                    GameCommand::Attack { id, x, y } => {
                        publish(&broadcast_tx, state.handle_attack(id, Vec2::new(x, y), now));
                    }
                    GameCommand::CastSkill { id, skill } => {
                        publish(&broadcast_tx, state.handle_cast(id, skill, now));
                    }
                    GameCommand::Leave { id } => {
                        publish(&broadcast_tx, state.disconnect(id));
                    }
                    GameCommand::Stats { response } => {
                        let _ = response.send(state.stats());
                    }
                }
            }
        }
    }

    state.shutdown();
    tracing::info!("Game loop ended");
}
