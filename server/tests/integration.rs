//! Integration tests for the arena server.
//!
//! These tests start a real server instance and connect via WebSocket
//! to verify end-to-end behavior.

use arena_server::config::ServerConfig;
use arena_server::game_loop::{run_game_loop, GameBroadcast, GameCommand};
use arena_server::router;
use arena_server::ws::AppState;
use arena_shared::protocol::{ClientMsg, ServerMsg};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message};

type Ws = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>;

const ADDR_A: &str = "0x52908400098527886E0F7030069857D2E4169EE7";
const ADDR_B: &str = "0x8617E340B3D01FA5F11F306F4090FD50E238070D";

fn test_config() -> ServerConfig {
    ServerConfig {
        rng_seed: 12345,
        enemies_per_archetype: 0,
        grass_regrowth_chance: 0.0,
        ..Default::default()
    }
}

/// Start a test server on a random available port and return its address.
async fn start_test_server(mut config: ServerConfig) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listen_addr = addr.to_string();

    let (game_tx, game_rx) = mpsc::channel::<GameCommand>(256);
    let (broadcast_tx, _) = broadcast::channel::<GameBroadcast>(256);

    let app = router(AppState {
        game_tx,
        max_message_bytes: config.max_message_bytes,
    });

    tokio::spawn(async move {
        run_game_loop(game_rx, broadcast_tx, config).await;
    });
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr.to_string()
}

async fn connect(addr: &str) -> Ws {
    let (ws, _) = connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("Failed to connect");
    ws
}

async fn send(ws: &mut Ws, msg: &ClientMsg) {
    let json = serde_json::to_string(msg).unwrap();
    ws.send(Message::Text(json.into())).await.unwrap();
}

/// Read the next text message and parse as ServerMsg.
async fn recv_msg(ws: &mut Ws) -> ServerMsg {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(&text).expect("Failed to parse server message");
            }
            Some(Ok(_)) => continue, // Skip ping/pong
            Some(Err(e)) => panic!("WebSocket error: {}", e),
            None => panic!("WebSocket closed unexpectedly"),
        }
    }
}

/// Read messages until one matches, giving up after `timeout`.
async fn recv_until<T>(ws: &mut Ws, timeout: Duration, mut pick: impl FnMut(ServerMsg) -> Option<T>) -> Option<T> {
    tokio::time::timeout(timeout, async {
        loop {
            if let Some(found) = pick(recv_msg(ws).await) {
                return found;
            }
        }
    })
    .await
    .ok()
}

/// Authenticate and return own entity id, draining `existing_players`.
async fn join(ws: &mut Ws, identity: &str) -> u32 {
    send(ws, &ClientMsg::Authenticate { identity: identity.to_string() }).await;
    let id = match recv_msg(ws).await {
        ServerMsg::Authenticated(msg) => msg.entity.id,
        other => panic!("Expected Authenticated, got {:?}", other),
    };
    match recv_msg(ws).await {
        ServerMsg::ExistingPlayers(_) => {}
        other => panic!("Expected ExistingPlayers, got {:?}", other),
    }
    id
}

async fn http_get(addr: &str, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n", path, addr);
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

fn json_body(response: &str) -> serde_json::Value {
    let body = response.split("\r\n\r\n").nth(1).expect("no body");
    serde_json::from_str(body).expect("body is not JSON")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_authenticate_receives_world() {
    let addr = start_test_server(test_config()).await;
    let mut ws = connect(&addr).await;

    send(&mut ws, &ClientMsg::Authenticate { identity: ADDR_A.to_string() }).await;

    match recv_msg(&mut ws).await {
        ServerMsg::Authenticated(msg) => {
            assert_eq!(msg.protocol_version, 1);
            assert_eq!(msg.entity.name, "Warrior_9EE7");
            assert_eq!(msg.entity.health, 100);
            assert_eq!(msg.world_config.world_width, 2000.0);
            assert!(msg.terrain.len() >= 4, "border walls should be present");
        }
        other => panic!("Expected Authenticated, got {:?}", other),
    }
    match recv_msg(&mut ws).await {
        ServerMsg::ExistingPlayers(msg) => assert!(msg.players.is_empty()),
        other => panic!("Expected ExistingPlayers, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_identity_gets_auth_error_and_may_retry() {
    let addr = start_test_server(test_config()).await;
    let mut ws = connect(&addr).await;

    send(&mut ws, &ClientMsg::Authenticate { identity: "0x1234".to_string() }).await;
    match recv_msg(&mut ws).await {
        ServerMsg::AuthError(e) => assert_eq!(e.message, "Invalid wallet address"),
        other => panic!("Expected AuthError, got {:?}", other),
    }

    join(&mut ws, ADDR_A).await;
}

#[tokio::test]
async fn test_legacy_wallet_address_field_is_accepted() {
    let addr = start_test_server(test_config()).await;
    let mut ws = connect(&addr).await;

    let raw = format!(r#"{{"type":"authenticate","walletAddress":"{}"}}"#, ADDR_B);
    ws.send(Message::Text(raw.into())).await.unwrap();

    assert!(matches!(recv_msg(&mut ws).await, ServerMsg::Authenticated(_)));
}

#[tokio::test]
async fn test_room_full() {
    let mut config = test_config();
    config.world.max_players_per_room = 1;
    let addr = start_test_server(config).await;

    let mut ws1 = connect(&addr).await;
    join(&mut ws1, ADDR_A).await;

    let mut ws2 = connect(&addr).await;
    send(&mut ws2, &ClientMsg::Authenticate { identity: ADDR_B.to_string() }).await;
    match recv_msg(&mut ws2).await {
        ServerMsg::AuthError(e) => assert_eq!(e.message, "Room is full"),
        other => panic!("Expected AuthError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_actions_before_authentication_are_refused() {
    let addr = start_test_server(test_config()).await;
    let mut ws = connect(&addr).await;

    send(&mut ws, &ClientMsg::Move { x: 100.0, y: 100.0 }).await;
    match recv_msg(&mut ws).await {
        ServerMsg::Error(e) => assert_eq!(e.message, "Not authenticated"),
        other => panic!("Expected Error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_second_player_sees_first_and_is_announced() {
    let addr = start_test_server(test_config()).await;
    let mut ws1 = connect(&addr).await;
    let id1 = join(&mut ws1, ADDR_A).await;

    let mut ws2 = connect(&addr).await;
    send(&mut ws2, &ClientMsg::Authenticate { identity: ADDR_B.to_string() }).await;
    let id2 = match recv_msg(&mut ws2).await {
        ServerMsg::Authenticated(msg) => msg.entity.id,
        other => panic!("Expected Authenticated, got {:?}", other),
    };
    match recv_msg(&mut ws2).await {
        ServerMsg::ExistingPlayers(msg) => {
            assert_eq!(msg.players.len(), 1);
            assert_eq!(msg.players[0].id, id1);
        }
        other => panic!("Expected ExistingPlayers, got {:?}", other),
    }
    assert_ne!(id1, id2, "Each client should get a unique ID");

    let joined = recv_until(&mut ws1, Duration::from_secs(2), |msg| match msg {
        ServerMsg::PlayerJoined(m) => Some(m.entity.id),
        _ => None,
    })
    .await;
    assert_eq!(joined, Some(id2));
}

#[tokio::test]
async fn test_move_is_broadcast_to_others_only() {
    let addr = start_test_server(test_config()).await;
    let mut ws1 = connect(&addr).await;
    let id1 = join(&mut ws1, ADDR_A).await;
    let mut ws2 = connect(&addr).await;
    join(&mut ws2, ADDR_B).await;

    // Interior walls never sit within 100 px of the border, so just inside
    // the border wall is always free.
    send(&mut ws1, &ClientMsg::Move { x: 60.0, y: 60.0 }).await;

    let moved = recv_until(&mut ws2, Duration::from_secs(2), |msg| match msg {
        ServerMsg::PlayerMoved(m) => Some((m.entity_id, m.x, m.y)),
        _ => None,
    })
    .await;
    assert_eq!(moved, Some((id1, 60.0, 60.0)));

    let echoed = recv_until(&mut ws1, Duration::from_millis(300), |msg| match msg {
        ServerMsg::PlayerMoved(m) if m.entity_id == id1 => Some(()),
        _ => None,
    })
    .await;
    assert!(echoed.is_none(), "Mover should not receive its own move");
}

#[tokio::test]
async fn test_move_into_wall_is_dropped() {
    let addr = start_test_server(test_config()).await;
    let mut ws1 = connect(&addr).await;
    join(&mut ws1, ADDR_A).await;
    let mut ws2 = connect(&addr).await;
    join(&mut ws2, ADDR_B).await;

    send(&mut ws1, &ClientMsg::Move { x: 10.0, y: 10.0 }).await;

    let moved = recv_until(&mut ws2, Duration::from_millis(300), |msg| match msg {
        ServerMsg::PlayerMoved(_) => Some(()),
        _ => None,
    })
    .await;
    assert!(moved.is_none());
}

#[tokio::test]
async fn test_chat_is_sanitized_and_broadcast() {
    let addr = start_test_server(test_config()).await;
    let mut ws1 = connect(&addr).await;
    join(&mut ws1, ADDR_A).await;
    let mut ws2 = connect(&addr).await;
    join(&mut ws2, ADDR_B).await;

    send(&mut ws1, &ClientMsg::ChatMessage { message: "<b>hello</b> arena".to_string() }).await;

    for ws in [&mut ws1, &mut ws2] {
        let chat = recv_until(ws, Duration::from_secs(2), |msg| match msg {
            ServerMsg::ChatMessage(m) => Some((m.name, m.message)),
            _ => None,
        })
        .await;
        assert_eq!(chat, Some(("Warrior_9EE7".to_string(), "hello arena".to_string())));
    }
}

#[tokio::test]
async fn test_disconnect_announces_player_left() {
    let addr = start_test_server(test_config()).await;
    let mut ws1 = connect(&addr).await;
    let id1 = join(&mut ws1, ADDR_A).await;
    let mut ws2 = connect(&addr).await;
    join(&mut ws2, ADDR_B).await;

    ws1.close(None).await.unwrap();

    let left = recv_until(&mut ws2, Duration::from_secs(2), |msg| match msg {
        ServerMsg::PlayerLeft(m) => Some(m.entity_id),
        _ => None,
    })
    .await;
    assert_eq!(left, Some(id1));
}

#[tokio::test]
async fn test_malformed_json_keeps_connection_open() {
    let addr = start_test_server(test_config()).await;
    let mut ws = connect(&addr).await;
    join(&mut ws, ADDR_A).await;

    ws.send(Message::Text("not valid json".into())).await.unwrap();
    let err = recv_until(&mut ws, Duration::from_secs(2), |msg| match msg {
        ServerMsg::Error(e) => Some(e.message),
        _ => None,
    })
    .await;
    assert_eq!(err.as_deref(), Some("Invalid message format"));

    // Still usable afterwards
    send(&mut ws, &ClientMsg::ChatMessage { message: "still here".to_string() }).await;
    let chat = recv_until(&mut ws, Duration::from_secs(2), |msg| match msg {
        ServerMsg::ChatMessage(m) => Some(m.message),
        _ => None,
    })
    .await;
    assert_eq!(chat.as_deref(), Some("still here"));
}

#[tokio::test]
async fn test_malformed_json_before_authentication_is_answered() {
    let addr = start_test_server(test_config()).await;
    let mut ws = connect(&addr).await;

    ws.send(Message::Text("{\"type\":".into())).await.unwrap();
    match recv_msg(&mut ws).await {
        ServerMsg::Error(e) => assert_eq!(e.message, "Invalid message format"),
        other => panic!("Expected Error, got {:?}", other),
    }

    // The connection can still authenticate
    join(&mut ws, ADDR_A).await;
}

#[tokio::test]
async fn test_oversized_message_is_rejected() {
    let addr = start_test_server(test_config()).await;
    let mut ws = connect(&addr).await;
    join(&mut ws, ADDR_A).await;

    let huge = format!(r#"{{"type":"chat_message","message":"{}"}}"#, "x".repeat(2000));
    ws.send(Message::Text(huge.into())).await.unwrap();

    let err = recv_until(&mut ws, Duration::from_secs(2), |msg| match msg {
        ServerMsg::Error(e) => Some(e.message),
        ServerMsg::ChatMessage(_) => Some("chat delivered".to_string()),
        _ => None,
    })
    .await;
    assert_eq!(err.as_deref(), Some("Message too large"));
}

#[tokio::test]
async fn test_skill_without_cooldown_then_rejected() {
    let addr = start_test_server(test_config()).await;
    let mut ws = connect(&addr).await;
    join(&mut ws, ADDR_A).await;

    send(&mut ws, &ClientMsg::CastSkill { skill: arena_shared::protocol::SkillKind::Shield }).await;
    let shield = recv_until(&mut ws, Duration::from_secs(2), |msg| match msg {
        ServerMsg::ShieldActivated(m) => Some(m.expires_at),
        _ => None,
    })
    .await;
    assert!(shield.is_some());

    send(&mut ws, &ClientMsg::CastSkill { skill: arena_shared::protocol::SkillKind::Shield }).await;
    let rejected = recv_until(&mut ws, Duration::from_secs(2), |msg| match msg {
        ServerMsg::ActionRejected(e) => Some(e.message),
        _ => None,
    })
    .await;
    assert!(rejected.unwrap().starts_with("shield on cooldown"));
}

#[tokio::test]
async fn test_server_update_heartbeat() {
    let addr = start_test_server(test_config()).await;
    let mut ws = connect(&addr).await;
    join(&mut ws, ADDR_A).await;

    let count = recv_until(&mut ws, Duration::from_secs(3), |msg| match msg {
        ServerMsg::ServerUpdate(m) => Some(m.player_count),
        _ => None,
    })
    .await;
    assert_eq!(count, Some(1));
}

#[tokio::test]
async fn test_health_and_stats_endpoints() {
    let addr = start_test_server(test_config()).await;
    let mut ws = connect(&addr).await;
    join(&mut ws, ADDR_A).await;

    let health = http_get(&addr, "/api/health").await;
    assert!(health.starts_with("HTTP/1.1 200"));
    let body = json_body(&health);
    assert_eq!(body["status"], "online");
    assert_eq!(body["players"], 1);
    assert!(body["timestamp"].as_u64().unwrap() > 0);

    let stats = json_body(&http_get(&addr, "/api/stats").await);
    assert_eq!(stats["totalPlayers"], 1);
    assert_eq!(stats["enemies"], 0);
    assert!(stats["walls"].as_u64().unwrap() >= 4);
}
