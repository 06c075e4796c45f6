//! Load test for the arena server.
//!
//! Spawns multiple fake WebSocket clients that:
//! - Authenticate with a random address
//! - Send random-walk moves at 10 Hz, clamped to the world
//! - Occasionally chat
//! - Count what the server sends back
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --clients N      Number of clients to spawn (default: 40)
//!   --duration S     Test duration in seconds (default: 30)
//!   --url URL        Server URL (default: ws://127.0.0.1:3000/ws)

use arena_shared::config::WorldConfig;
use arena_shared::math::{clamp_to_world, Vec2};
use arena_shared::protocol::ClientMsg;
use futures_util::{SinkExt, StreamExt};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

const MOVE_INTERVAL: Duration = Duration::from_millis(100);
const MOVE_STEP: f64 = 15.0;
const CHAT_CHANCE: f64 = 0.01;

// === Metrics ===

#[derive(Default)]
struct Metrics {
    connected: AtomicU64,
    auth_errors: AtomicU64,
    messages_received: AtomicU64,
    moves_sent: AtomicU64,
    moves_seen: AtomicU64,
    chats_sent: AtomicU64,
    chats_seen: AtomicU64,
    snapshots: AtomicU64,
    errors: AtomicU64,
}

fn random_address(rng: &mut impl Rng) -> String {
    let bytes: [u8; 20] = rng.gen();
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!("0x{}", hex)
}

fn message_type(text: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()?
        .get("type")?
        .as_str()
        .map(str::to_string)
}

fn encode(msg: &ClientMsg) -> Option<Message> {
    serde_json::to_string(msg).ok().map(|json| Message::Text(json.into()))
}

// === Client task ===

async fn run_client(client_id: u32, url: String, duration: Duration, metrics: Arc<Metrics>) {
    let mut rng = ChaCha8Rng::seed_from_u64(client_id as u64 * 12345 + 67890);

    let (mut ws, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            if client_id < 5 {
                eprintln!("Client {} failed to connect: {}", client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let Some(auth) = encode(&ClientMsg::Authenticate {
        identity: random_address(&mut rng),
    }) else {
        return;
    };
    if ws.send(auth).await.is_err() {
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        return;
    }

    // Wait for the authenticated reply before doing anything else
    let auth_result = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = ws.next().await {
            let Ok(Message::Text(text)) = msg else {
                continue;
            };
            metrics.messages_received.fetch_add(1, Ordering::Relaxed);
            match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(v) if v["type"] == "authenticated" => {
                    let x = v["entity"]["x"].as_f64().unwrap_or(0.0);
                    let y = v["entity"]["y"].as_f64().unwrap_or(0.0);
                    let config: WorldConfig = serde_json::from_value(v["worldConfig"].clone()).ok()?;
                    return Some((Vec2::new(x, y), config));
                }
                Ok(v) if v["type"] == "auth_error" => return None,
                _ => {}
            }
        }
        None
    })
    .await;

    let (mut position, world) = match auth_result {
        Ok(Some(joined)) => joined,
        _ => {
            metrics.auth_errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    let mut move_timer = tokio::time::interval(MOVE_INTERVAL);
    move_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let test_end = Instant::now() + duration;

    while Instant::now() < test_end {
        tokio::select! {
            _ = move_timer.tick() => {
                let step = Vec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)) * MOVE_STEP;
                position = clamp_to_world(position + step, world.world_width, world.world_height, world.entity_size);
                let mut outgoing = vec![ClientMsg::Move { x: position.x, y: position.y }];
                if rng.gen_bool(CHAT_CHANCE) {
                    outgoing.push(ClientMsg::ChatMessage {
                        message: format!("hello from {}", client_id),
                    });
                }
                for msg in outgoing {
                    let is_chat = matches!(msg, ClientMsg::ChatMessage { .. });
                    let Some(frame) = encode(&msg) else { continue };
                    if ws.send(frame).await.is_err() {
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    let counter = if is_chat { &metrics.chats_sent } else { &metrics.moves_sent };
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        match message_type(&text).as_deref() {
                            Some("player_moved") => metrics.moves_seen.fetch_add(1, Ordering::Relaxed),
                            Some("chat_message") => metrics.chats_seen.fetch_add(1, Ordering::Relaxed),
                            Some("server_update") => metrics.snapshots.fetch_add(1, Ordering::Relaxed),
                            _ => 0,
                        };
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        if client_id < 3 {
                            eprintln!("Client {} error: {}", client_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

// === Main ===

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_clients: u32 = 40;
    let mut duration_secs: u64 = 30;
    let mut url = "ws://127.0.0.1:3000/ws".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--clients" => {
                i += 1;
                num_clients = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(40);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    println!("=== Arena Server Load Test ===");
    println!("Clients: {}", num_clients);
    println!("Duration: {}s", duration_secs);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::default());
    let duration = Duration::from_secs(duration_secs);

    let mut handles = Vec::with_capacity(num_clients as usize);
    let spawn_start = Instant::now();

    for client_id in 0..num_clients {
        let url = url.clone();
        let metrics = Arc::clone(&metrics);
        handles.push(tokio::spawn(async move {
            run_client(client_id, url, duration, metrics).await;
        }));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 20 == 19 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
    println!("All clients spawned in {:?}", spawn_start.elapsed());

    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();
        loop {
            interval.tick().await;
            println!(
                "[{:3}s] connected={}, msgs={}, moves_sent={}, moves_seen={}, errors={}",
                start.elapsed().as_secs(),
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.messages_received.load(Ordering::Relaxed),
                metrics_clone.moves_sent.load(Ordering::Relaxed),
                metrics_clone.moves_seen.load(Ordering::Relaxed),
                metrics_clone.errors.load(Ordering::Relaxed),
            );
        }
    });

    for handle in handles {
        let _ = handle.await;
    }
    stats_handle.abort();

    println!();
    println!("=== Final Results ===");
    let msgs = metrics.messages_received.load(Ordering::Relaxed);
    let snapshots = metrics.snapshots.load(Ordering::Relaxed);
    println!("Total messages received: {}", msgs);
    println!("Auth errors: {}", metrics.auth_errors.load(Ordering::Relaxed));
    println!("Moves sent / seen: {} / {}", metrics.moves_sent.load(Ordering::Relaxed), metrics.moves_seen.load(Ordering::Relaxed));
    println!("Chats sent / seen: {} / {}", metrics.chats_sent.load(Ordering::Relaxed), metrics.chats_seen.load(Ordering::Relaxed));
    println!("Total errors: {}", metrics.errors.load(Ordering::Relaxed));
    println!();
    println!("Messages/sec (total): {:.0}", msgs as f64 / duration_secs.max(1) as f64);
    println!(
        "server_update per client: {:.1} (expected ~{})",
        snapshots as f64 / num_clients.max(1) as f64,
        duration_secs
    );
}
