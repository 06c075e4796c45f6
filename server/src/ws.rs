use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::entity::EntityId;
use crate::game_loop::{GameCommand, Session};
use crate::protocol::{ClientMsg, ErrorMsg, ServerMsg};

/// Shared app state passed to each WebSocket and HTTP handler
#[derive(Clone)]
pub struct AppState {
    pub game_tx: mpsc::Sender<GameCommand>,
    pub max_message_bytes: usize,
}

type WsSink = SplitSink<WebSocket, Message>;
type WsStream = SplitStream<WebSocket>;

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, app_state))
}

async fn send_msg(sink: &mut WsSink, msg: &ServerMsg) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize {:?}: {}", msg, e);
            return true;
        }
    };
    sink.send(Message::Text(json.into())).await.is_ok()
}

async fn send_error(sink: &mut WsSink, message: &str) -> bool {
    send_msg(
        sink,
        &ServerMsg::Error(ErrorMsg {
            message: message.to_string(),
        }),
    )
    .await
}

/// Outcome of reading one frame from the client.
enum Incoming {
    Msg(ClientMsg),
    /// Frame is ignored; the caller answers with this `error` message
    Rejected(&'static str),
    Skip,
    Closed,
}

/// Read and classify the next frame. Only touches the stream, so it is
/// safe to cancel inside `select!`.
async fn next_client_msg(stream: &mut WsStream, max_bytes: usize) -> Incoming {
    match stream.next().await {
        Some(Ok(Message::Text(text))) => {
            if text.len() > max_bytes {
                tracing::warn!("Dropping {} byte message (limit {})", text.len(), max_bytes);
                return Incoming::Rejected("Message too large");
            }
            match serde_json::from_str::<ClientMsg>(&text) {
                Ok(msg) => Incoming::Msg(msg),
                Err(e) => {
                    tracing::debug!("Malformed client message: {}", e);
                    Incoming::Rejected("Invalid message format")
                }
            }
        }
        Some(Ok(Message::Close(_))) | None | Some(Err(_)) => Incoming::Closed,
        Some(Ok(_)) => Incoming::Skip, // Ignore ping/pong/binary
    }
}

async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let (mut sink, mut stream) = socket.split();

    let Some(session) = authenticate(&mut sink, &mut stream, &app_state).await else {
        return;
    };
    let id = session.id;

    play(&mut sink, &mut stream, &app_state, session).await;

    // Cleanup on disconnect
    let _ = app_state.game_tx.send(GameCommand::Leave { id }).await;
    tracing::info!("Player {} disconnected", id);
}

/// Pre-auth phase: only `authenticate` is accepted.
async fn authenticate(sink: &mut WsSink, stream: &mut WsStream, app_state: &AppState) -> Option<Session> {
    loop {
        let identity = match next_client_msg(stream, app_state.max_message_bytes).await {
            Incoming::Msg(ClientMsg::Authenticate { identity }) => identity,
            Incoming::Msg(_) => {
                if !send_error(sink, "Not authenticated").await {
                    return None;
                }
                continue;
            }
            Incoming::Rejected(reason) => {
                if !send_error(sink, reason).await {
                    return None;
                }
                continue;
            }
            Incoming::Skip => continue,
            Incoming::Closed => return None,
        };

        let (resp_tx, resp_rx) = oneshot::channel();
        if app_state
            .game_tx
            .send(GameCommand::Authenticate {
                identity,
                response: resp_tx,
            })
            .await
            .is_err()
        {
            tracing::error!("Failed to send Authenticate command");
            return None;
        }

        match resp_rx.await {
            Ok(Ok(session)) => {
                for reply in &session.replies {
                    if !send_msg(sink, reply).await {
                        let _ = app_state.game_tx.send(GameCommand::Leave { id: session.id }).await;
                        return None;
                    }
                }
                tracing::info!("Player {} connected", session.id);
                return Some(session);
            }
            Ok(Err(err)) => {
                let msg = ServerMsg::AuthError(ErrorMsg {
                    message: err.to_string(),
                });
                if !send_msg(sink, &msg).await {
                    return None;
                }
            }
            Err(_) => {
                tracing::error!("Game loop dropped the authentication request");
                return None;
            }
        }
    }
}

fn to_command(id: EntityId, msg: ClientMsg) -> Option<GameCommand> {
    match msg {
        ClientMsg::Authenticate { .. } => None,
        ClientMsg::Move { x, y } => Some(GameCommand::Move { id, x, y }),
        ClientMsg::ChatMessage { message } => Some(GameCommand::Chat { id, message }),
        ClientMsg::Attack { x, y } => Some(GameCommand::Attack { id, x, y }),
        ClientMsg::CastSkill { skill } => Some(GameCommand::CastSkill { id, skill }),
    }
}

async fn play(sink: &mut WsSink, stream: &mut WsStream, app_state: &AppState, mut session: Session) {
    let id = session.id;
    loop {
        tokio::select! {
            // Client -> Server
            incoming = next_client_msg(stream, app_state.max_message_bytes) => {
                match incoming {
                    Incoming::Msg(msg) => match to_command(id, msg) {
                        Some(cmd) => {
                            if app_state.game_tx.send(cmd).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            if !send_error(sink, "Already authenticated").await {
                                break;
                            }
                        }
                    },
                    Incoming::Rejected(reason) => {
                        if !send_error(sink, reason).await {
                            break;
                        }
                    }
                    Incoming::Skip => {}
                    Incoming::Closed => break,
                }
            }

            // Server -> Client (broadcast)
            result = session.events.recv() => {
                match result {
                    Ok(out) => {
                        if out.audience.includes(id) && !send_msg(sink, &out.msg).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Player {} lagged by {} messages", id, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}
