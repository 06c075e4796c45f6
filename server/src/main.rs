use arena_server::config::ServerConfig;
use arena_server::game_loop::{run_game_loop, GameBroadcast, GameCommand};
use arena_server::router;
use arena_server::ws::AppState;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid server configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Validate configuration before starting
    if let Err(e) = config.validate() {
        eprintln!("Invalid server configuration: {}", e);
        std::process::exit(1);
    }

    let listen_addr = config.listen_addr.clone();
    let max_message_bytes = config.max_message_bytes;

    let (game_tx, game_rx) = mpsc::channel::<GameCommand>(256);
    let (broadcast_tx, _) = broadcast::channel::<GameBroadcast>(256);

    // Spawn game loop
    let game = tokio::spawn(async move {
        run_game_loop(game_rx, broadcast_tx, config).await;
    });

    let app = router(AppState {
        game_tx,
        max_message_bytes,
    });

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", listen_addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting arena server on {}", listen_addr);
    println!("Arena server listening on {}", listen_addr);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
        tracing::info!("Shutting down");
    };

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
        tracing::error!("Server error: {}", e);
    }

    // Open sockets still hold command senders; don't wait on them forever.
    match tokio::time::timeout(Duration::from_secs(2), game).await {
        Ok(Err(e)) => tracing::error!("Game loop task failed: {}", e),
        Err(_) => tracing::warn!("Game loop still busy with open connections, exiting"),
        Ok(Ok(())) => {}
    }
}
