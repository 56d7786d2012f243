mod api;
mod blockchain;
mod config;
mod error;
mod network;
mod node;
mod transaction;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::{info, warn};

use config::Config;
use node::Node;

/// Seconds workers get to finish in-flight requests after a stop signal.
const SHUTDOWN_TIMEOUT_SECS: u64 = 5;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = Config::from_env();
    let node = Node::new(&config);

    for peer in &config.peers {
        if let Err(e) = node.register_node(peer).await {
            warn!("ignoring bootstrap peer: {e}");
        }
    }

    println!(
        "⛓️ Starting ledger node {} at http://{}:{} (difficulty {})",
        node.id(),
        config.host,
        config.port,
        config.difficulty
    );

    let state = web::Data::new(node);

    // Pending /mine/ requests must not hold the server past its stop signal.
    let shutdown_state = state.clone();
    actix_web::rt::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let cancelled = shutdown_state.cancel_mining();
            info!("shutdown: cancelled {cancelled} mining jobs");
        }
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .shutdown_timeout(SHUTDOWN_TIMEOUT_SECS)
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
